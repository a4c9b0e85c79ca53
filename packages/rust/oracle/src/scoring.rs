//! Parsing of the oracle's ranking response.
//!
//! The ranking call asks for one `N. Score: X - explanation` line per title.
//! The model does not always comply; any line that cannot be parsed keeps the
//! neutral score so that every submitted title receives exactly one score.

use std::sync::LazyLock;

use paperdigest_shared::NEUTRAL_SCORE;
use regex::Regex;

/// Scores are on a 1-10 scale; anything above is clamped.
const MAX_SCORE: u8 = 10;

static SCORE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Score:\s*(\d{1,3})").expect("static regex"));

/// Parse a ranking response into exactly `expected` scores, one per
/// submitted title, in submission order. Missing or malformed lines get
/// [`NEUTRAL_SCORE`]; surplus lines are ignored.
pub fn parse_scores(response: &str, expected: usize) -> Vec<u8> {
    let mut scores = vec![NEUTRAL_SCORE; expected];

    let lines = response
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty());

    for (i, line) in lines.take(expected).enumerate() {
        if let Some(caps) = SCORE_LINE.captures(line) {
            if let Ok(score) = caps[1].parse::<u32>() {
                scores[i] = score.min(u32::from(MAX_SCORE)) as u8;
            }
        }
    }

    scores
}

/// Select the indices of the top `k` scores, descending, stable in input
/// order for ties.
pub fn top_k_indices(scores: &[u8], k: usize) -> Vec<usize> {
    let mut ranked: Vec<usize> = (0..scores.len()).collect();
    // sort_by_key is stable, so equal scores keep response order
    ranked.sort_by_key(|&i| std::cmp::Reverse(scores[i]));
    ranked.truncate(k);
    ranked
}
