//! Core domain types for the paperdigest pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Neutral ranking score assigned when an oracle score line cannot be parsed.
pub const NEUTRAL_SCORE: u8 = 5;

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// One arXiv category: an independently schedulable unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// arXiv category code (e.g. `cs.LG`).
    pub code: String,
    /// Human-readable name (e.g. `Machine Learning`).
    pub name: String,
}

impl Category {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }

    /// URL-friendly slug derived from the human name.
    pub fn slug(&self) -> String {
        slugify(&self.name)
    }
}

// ---------------------------------------------------------------------------
// PaperMeta
// ---------------------------------------------------------------------------

/// A candidate paper as returned by the arXiv catalog. Immutable; consumed
/// read-only by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperMeta {
    /// arXiv entry id (e.g. `http://arxiv.org/abs/2401.01234v1`). Globally unique.
    pub arxiv_id: String,
    /// Paper title.
    pub title: String,
    /// Author names, in catalog order.
    pub authors: Vec<String>,
    /// Abstract text.
    pub abstract_text: String,
    /// Submission timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<DateTime<Utc>>,
    /// Primary category code.
    pub primary_category: String,
    /// Direct PDF link, when the feed provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
}

impl PaperMeta {
    /// Bare arXiv identifier without the `http://arxiv.org/abs/` prefix,
    /// suitable for `id_list` queries.
    pub fn bare_id(&self) -> &str {
        match self.arxiv_id.rfind("/abs/") {
            Some(idx) => &self.arxiv_id[idx + 5..],
            None => &self.arxiv_id,
        }
    }
}

// ---------------------------------------------------------------------------
// PaperRecord
// ---------------------------------------------------------------------------

/// The persisted unit: one enriched paper, upserted by `arxiv_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperRecord {
    /// Row id (UUID v7). Preserved on upsert-update.
    pub id: String,
    /// arXiv entry id — the unique upsert key.
    pub arxiv_id: String,
    /// Paper title.
    pub title: String,
    /// URL-friendly slug derived from the title.
    pub slug: String,
    /// Comma-joined author names.
    pub authors: String,
    /// Category code the paper was processed under.
    pub category_code: String,
    /// Human-readable category name.
    pub category_name: String,
    /// Category slug.
    pub category_slug: String,
    /// Long-form enrichment artifact (multi-section narrative text).
    pub summary_sections: String,
    /// Abstract page URL.
    pub url: String,
    /// Local path of the downloaded PDF, if the download succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_path: Option<String>,
    /// Outcome of the PDF download/extraction path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_status: Option<String>,
    /// Whether the summary was grounded in extracted PDF text.
    pub has_pdf_analysis: bool,
    /// Submission timestamp from the catalog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<DateTime<Utc>>,
    /// When the enrichment ran.
    pub generation_date: DateTime<Utc>,
    /// Day bucket (`YYYY-MM-DD`, UTC) of the processing run.
    pub processed_date: String,
    /// Wall-clock enrichment time for this paper.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<u64>,
}

// ---------------------------------------------------------------------------
// Slugs and day buckets
// ---------------------------------------------------------------------------

/// Convert text into a URL-friendly slug: lowercase, whitespace to hyphens,
/// non-alphanumerics stripped, runs of hyphens collapsed and trimmed.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut prev_hyphen = true; // suppress leading hyphens
    for ch in text.to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
            prev_hyphen = false;
        } else if (ch.is_whitespace() || ch == '-') && !prev_hyphen {
            slug.push('-');
            prev_hyphen = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Current day bucket as a `YYYY-MM-DD` string, always in UTC so cache
/// checks do not shift across host timezones.
pub fn today_utc() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}
