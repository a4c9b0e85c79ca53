//! Shared collaborator handles threaded through the pipeline.

use std::sync::Arc;

use paperdigest_catalog::DocumentSource;
use paperdigest_oracle::RelevanceOracle;
use paperdigest_storage::Storage;

use crate::pdf::{PdfFetcher, PdfTextExtractor};
use crate::tracker::InProgress;

/// Everything a pipeline run needs. Built once at startup and shared.
pub struct PipelineDeps {
    /// Durable paper store.
    pub storage: Arc<Storage>,
    /// Candidate catalog.
    pub source: Arc<dyn DocumentSource>,
    /// Ranking/enrichment oracle.
    pub oracle: Arc<dyn RelevanceOracle>,
    /// Volatile per-category in-progress flags.
    pub tracker: Arc<InProgress>,
    /// PDF download path. `None` disables the PDF side channel entirely.
    pub pdf_fetcher: Option<Arc<PdfFetcher>>,
    /// PDF text extraction collaborator. `None` means summaries are built
    /// from catalog metadata only.
    pub pdf_extractor: Option<Arc<dyn PdfTextExtractor>>,
    /// How many categories may be processed simultaneously.
    pub category_concurrency: usize,
}
