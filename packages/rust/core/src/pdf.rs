//! Best-effort PDF side channel: download with a fixed retry budget, plus
//! the text-extraction collaborator boundary.
//!
//! Extraction itself is external to this crate — callers inject a
//! [`PdfTextExtractor`] and the pipeline offloads it to a blocking thread so
//! CPU-bound parsing never stalls the scheduler. Every failure along this
//! path ends up as a `pdf_status` string on the record, never as a pipeline
//! error.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use paperdigest_shared::{PaperdigestError, Result};
use reqwest::Client;
use tracing::{debug, warn};

/// User-Agent string for PDF downloads.
const USER_AGENT: &str = concat!("paperdigest/", env!("CARGO_PKG_VERSION"));

/// Retries after the first failed download attempt.
const DOWNLOAD_RETRIES: usize = 2;

/// Per-request timeout for PDF downloads.
const DOWNLOAD_TIMEOUT_SECS: u64 = 60;

/// Truncation length for filesystem-safe file stems.
const MAX_STEM_CHARS: usize = 50;

// ---------------------------------------------------------------------------
// Extraction collaborator
// ---------------------------------------------------------------------------

/// Extracts plain text from PDF bytes. CPU-bound; always invoked through
/// [`extract_text`] so it runs off the async scheduler.
pub trait PdfTextExtractor: Send + Sync {
    fn extract_text(&self, bytes: &[u8]) -> Result<String>;
}

/// Run an extractor on a blocking thread.
pub async fn extract_text(
    extractor: Arc<dyn PdfTextExtractor>,
    bytes: Vec<u8>,
) -> Result<String> {
    tokio::task::spawn_blocking(move || extractor.extract_text(&bytes))
        .await
        .map_err(|e| PaperdigestError::parse(format!("extraction task failed: {e}")))?
}

// ---------------------------------------------------------------------------
// PdfFetcher
// ---------------------------------------------------------------------------

/// Downloads PDFs into a local directory.
pub struct PdfFetcher {
    client: Client,
    dir: PathBuf,
}

impl PdfFetcher {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
            .build()
            .map_err(|e| PaperdigestError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            dir: dir.into(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Download `url` into the fetch directory as `<file_stem>.pdf`,
    /// retrying a fixed number of times. Returns the written path and the
    /// raw bytes (for extraction) on success.
    pub async fn download(&self, url: &str, file_stem: &str) -> Result<(PathBuf, Vec<u8>)> {
        let mut last_error = None;

        for attempt in 0..=DOWNLOAD_RETRIES {
            match self.fetch_bytes(url).await {
                Ok(bytes) => {
                    std::fs::create_dir_all(&self.dir)
                        .map_err(|e| PaperdigestError::io(&self.dir, e))?;
                    let path = self.dir.join(format!("{file_stem}.pdf"));
                    tokio::fs::write(&path, &bytes)
                        .await
                        .map_err(|e| PaperdigestError::io(&path, e))?;
                    debug!(%url, path = %path.display(), bytes = bytes.len(), "pdf downloaded");
                    return Ok((path, bytes));
                }
                Err(e) => {
                    warn!(%url, attempt, error = %e, "pdf download attempt failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| PaperdigestError::Network(format!("{url}: download failed"))))
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PaperdigestError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PaperdigestError::Network(format!("{url}: HTTP {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PaperdigestError::Network(format!("{url}: body read failed: {e}")))?;

        Ok(bytes.to_vec())
    }
}

/// Reduce a paper title to a filesystem-safe file stem.
pub fn safe_file_stem(title: &str) -> String {
    let stem: String = title
        .chars()
        .filter(|ch| ch.is_alphanumeric() || matches!(ch, ' ' | '-' | '_'))
        .take(MAX_STEM_CHARS)
        .collect();

    let stem = stem.trim().to_string();
    if stem.is_empty() { "paper".into() } else { stem }
}
