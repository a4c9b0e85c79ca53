//! arXiv catalog client: candidate discovery for the generation pipeline.
//!
//! Queries the arXiv Atom API for recent submissions in a category, newest
//! first, filtered to a recency window. The pipeline consumes this through
//! the [`DocumentSource`] trait so tests can substitute a stub catalog.

mod parser;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use paperdigest_shared::{PaperdigestError, PaperMeta, Result};
use reqwest::Client;
use tracing::{debug, info, instrument};

pub use parser::parse_feed;

/// Production arXiv query endpoint.
pub const ARXIV_API_URL: &str = "https://export.arxiv.org/api/query";

/// User-Agent string for catalog requests.
const USER_AGENT: &str = concat!("paperdigest/", env!("CARGO_PKG_VERSION"));

/// Default timeout in seconds for catalog requests.
const FETCH_TIMEOUT_SECS: u64 = 30;

/// Fetch this many times more entries than requested so that enough survive
/// the recency filter and the already-processed dedup downstream.
const OVERFETCH_FACTOR: usize = 5;

// ---------------------------------------------------------------------------
// DocumentSource
// ---------------------------------------------------------------------------

/// A source of candidate paper descriptors for one category.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Fetch recent candidates for `category`, newest first. `want` is the
    /// number of candidates the caller intends to work with; implementations
    /// may return more (over-fetch) or fewer (thin category).
    async fn fetch_recent(&self, category: &str, want: usize) -> Result<Vec<PaperMeta>>;

    /// Look up a single paper by arXiv id (full entry URL or bare id).
    async fn fetch_by_id(&self, arxiv_id: &str) -> Result<Option<PaperMeta>>;
}

// ---------------------------------------------------------------------------
// ArxivCatalog
// ---------------------------------------------------------------------------

/// HTTP client for the arXiv Atom API.
pub struct ArxivCatalog {
    client: Client,
    base_url: String,
    days_back: i64,
}

impl ArxivCatalog {
    /// Create a catalog client with the given recency window in days.
    pub fn new(days_back: u32) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(FETCH_TIMEOUT_SECS))
            .build()
            .map_err(|e| PaperdigestError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: ARXIV_API_URL.to_string(),
            days_back: i64::from(days_back),
        })
    }

    /// Point the client at a different endpoint (tests, mirrors).
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    async fn query(&self, params: &[(&str, String)]) -> Result<Vec<PaperMeta>> {
        let response = self
            .client
            .get(&self.base_url)
            .query(params)
            .send()
            .await
            .map_err(|e| PaperdigestError::Network(format!("{}: {e}", self.base_url)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PaperdigestError::Network(format!(
                "{}: HTTP {status}",
                self.base_url
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| PaperdigestError::Network(format!("body read failed: {e}")))?;

        parse_feed(&body)
    }
}

#[async_trait]
impl DocumentSource for ArxivCatalog {
    #[instrument(skip(self), fields(category = %category, want))]
    async fn fetch_recent(&self, category: &str, want: usize) -> Result<Vec<PaperMeta>> {
        let max_results = want.max(1) * OVERFETCH_FACTOR;
        let papers = self
            .query(&[
                ("search_query", format!("cat:{category}")),
                ("sortBy", "submittedDate".to_string()),
                ("sortOrder", "descending".to_string()),
                ("start", "0".to_string()),
                ("max_results", max_results.to_string()),
            ])
            .await?;

        let cutoff = Utc::now() - Duration::days(self.days_back);
        let recent: Vec<PaperMeta> = papers
            .into_iter()
            .filter(|paper| paper.published.is_some_and(|ts| ts >= cutoff))
            .collect();

        info!(found = recent.len(), "fetched recent candidates");
        Ok(recent)
    }

    #[instrument(skip(self), fields(arxiv_id = %arxiv_id))]
    async fn fetch_by_id(&self, arxiv_id: &str) -> Result<Option<PaperMeta>> {
        let bare = bare_id(arxiv_id);
        debug!(%bare, "looking up single paper");

        let papers = self
            .query(&[
                ("id_list", bare.to_string()),
                ("max_results", "1".to_string()),
            ])
            .await?;

        Ok(papers.into_iter().next())
    }
}

/// Strip the `http(s)://arxiv.org/abs/` prefix when present.
fn bare_id(arxiv_id: &str) -> &str {
    match arxiv_id.rfind("/abs/") {
        Some(idx) => &arxiv_id[idx + 5..],
        None => arxiv_id,
    }
}
