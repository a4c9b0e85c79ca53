//! Relevance oracle: LLM-backed ranking and enrichment.
//!
//! Two operations feed the pipeline: scoring a batch of titles to pick the
//! most interesting papers, and producing a long-form multi-section summary
//! for one paper. Both go through an OpenAI-compatible chat endpoint. The
//! pipeline consumes the [`RelevanceOracle`] trait so tests can stub it.

mod client;
mod scoring;

use async_trait::async_trait;
use paperdigest_shared::{PaperMeta, Result};
use tracing::instrument;

use client::ChatClient;
pub use scoring::{parse_scores, top_k_indices};

/// Upper bound on PDF excerpt characters included in the enrichment prompt.
const PDF_EXCERPT_CHARS: usize = 2_000;

/// Upper bound on PDF characters for the dedicated PDF analysis prompt.
const PDF_ANALYSIS_CHARS: usize = 8_000;

// ---------------------------------------------------------------------------
// RelevanceOracle
// ---------------------------------------------------------------------------

/// Scoring and enrichment operations consumed by the generation pipeline.
#[async_trait]
pub trait RelevanceOracle: Send + Sync {
    /// Score each title on a 1-10 scale. Always returns exactly one score
    /// per submitted title, in submission order; unparseable responses fall
    /// back to the neutral score per line, never drop an item.
    async fn score_titles(&self, titles: &[String]) -> Result<Vec<u8>>;

    /// Produce the long-form multi-section summary for one paper, optionally
    /// grounded in extracted PDF text.
    async fn summarize_paper(&self, paper: &PaperMeta, pdf_text: Option<&str>) -> Result<String>;

    /// Produce a summary grounded purely in extracted PDF content (used by
    /// the on-demand PDF analysis path).
    async fn summarize_pdf(&self, title: &str, authors: &str, pdf_text: &str) -> Result<String>;
}

// ---------------------------------------------------------------------------
// OpenAiOracle
// ---------------------------------------------------------------------------

/// [`RelevanceOracle`] backed by an OpenAI-compatible chat API.
pub struct OpenAiOracle {
    client: ChatClient,
    model: String,
}

impl OpenAiOracle {
    pub fn new(api_key: &str, model: &str, base_url: &str) -> Self {
        Self {
            client: ChatClient::new(api_key, base_url),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl RelevanceOracle for OpenAiOracle {
    #[instrument(skip_all, fields(titles = titles.len()))]
    async fn score_titles(&self, titles: &[String]) -> Result<Vec<u8>> {
        if titles.is_empty() {
            return Ok(Vec::new());
        }

        let listing: String = titles
            .iter()
            .enumerate()
            .map(|(i, title)| format!("{}. {title}\n", i + 1))
            .collect();

        let prompt = format!(
            "Below are research paper titles. Score each title from 1-10 based on:\n\
             - Innovation and novelty (new methods, approaches, or findings)\n\
             - Potential impact in the field\n\
             - Technical significance\n\
             - Clarity and specificity of the contribution\n\n\
             Papers:\n{listing}\n\
             Format your response as:\n\
             1. Score: X - One sentence explanation\n\
             2. Score: X - One sentence explanation\n\
             ...\n\n\
             Only output the scores and explanations, nothing else."
        );

        let response = self
            .client
            .complete(
                &self.model,
                "You are a research expert who evaluates paper significance.",
                &prompt,
                200,
            )
            .await?;

        Ok(parse_scores(&response, titles.len()))
    }

    #[instrument(skip_all, fields(arxiv_id = %paper.arxiv_id))]
    async fn summarize_paper(&self, paper: &PaperMeta, pdf_text: Option<&str>) -> Result<String> {
        let pdf_section = match pdf_text {
            Some(text) if !text.trim().is_empty() => format!(
                "\nAdditional Content from PDF Introduction:\n{}\n",
                truncate_chars(text, PDF_EXCERPT_CHARS)
            ),
            _ => String::new(),
        };

        let prompt = format!(
            "Title: {title}\n\
             Authors: {authors}\n\
             Abstract: {abstract_text}\n\
             {pdf_section}\n\
             Please provide a comprehensive analysis of this research paper covering:\n\
             1. Main objective and motivation\n\
             2. Key methodology or approach\n\
             3. Most significant findings or contributions\n\
             4. Technical details and implementation insights\n\
             5. Potential impact and applications\n\n\
             Format the response as:\n\
             SUMMARY: [200-word detailed summary]\n\
             METHODOLOGY: [Key technical approaches]\n\
             FINDINGS: [Main results and contributions]\n\
             TECHNICAL_DETAILS: [Important implementation details]\n\
             IMPACT: [Potential applications and significance]",
            title = paper.title,
            authors = paper.authors.join(", "),
            abstract_text = paper.abstract_text,
        );

        self.client
            .complete(
                &self.model,
                "You are a research expert who provides detailed paper analysis.",
                &prompt,
                1000,
            )
            .await
    }

    #[instrument(skip_all)]
    async fn summarize_pdf(&self, title: &str, authors: &str, pdf_text: &str) -> Result<String> {
        let prompt = format!(
            "Title: {title}\n\
             Authors: {authors}\n\n\
             PDF CONTENT:\n{excerpt}\n\n\
             Please provide a comprehensive analysis of this research paper based on the PDF \
             content. Include:\n\
             1. Main objective and research question addressed\n\
             2. Key methodology or approach (based on the full text, not just abstract)\n\
             3. Most significant findings, results, or contributions\n\
             4. Technical details found in the paper (algorithms, models, datasets)\n\
             5. Evaluation methods and metrics\n\
             6. Potential applications and implications\n\n\
             Format your response as a well-structured essay with markdown formatting.\n\
             Focus on details that are only available in the full paper text.",
            excerpt = truncate_chars(pdf_text, PDF_ANALYSIS_CHARS),
        );

        self.client
            .complete(
                &self.model,
                "You are a research expert who analyzes academic papers in detail.",
                &prompt,
                2000,
            )
            .await
    }
}

/// Truncate to at most `max_chars` characters on a char boundary.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
