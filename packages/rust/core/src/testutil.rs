//! Stub collaborators shared by the pipeline tests. Storage is always a real
//! temp-file database; only the external services are stubbed.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use paperdigest_catalog::DocumentSource;
use paperdigest_oracle::RelevanceOracle;
use paperdigest_shared::{NEUTRAL_SCORE, PaperMeta, PaperdigestError, Result};
use paperdigest_storage::Storage;
use uuid::Uuid;

use crate::deps::PipelineDeps;
use crate::tracker::InProgress;

pub(crate) async fn temp_storage() -> Arc<Storage> {
    let tmp = std::env::temp_dir().join(format!("pd_core_test_{}.db", Uuid::now_v7()));
    Arc::new(Storage::open(&tmp).await.expect("open test db"))
}

pub(crate) fn paper(arxiv_id: &str, title: &str, category: &str) -> PaperMeta {
    PaperMeta {
        arxiv_id: arxiv_id.into(),
        title: title.into(),
        authors: vec!["Test Author".into()],
        abstract_text: format!("Abstract of {title}."),
        published: Some(Utc::now()),
        primary_category: category.into(),
        pdf_url: None,
    }
}

// ---------------------------------------------------------------------------
// StubOracle
// ---------------------------------------------------------------------------

#[derive(Default)]
pub(crate) struct StubOracle {
    scores: Option<Vec<u8>>,
    fail_ranking: bool,
    fail_titles: Vec<String>,
    ranking_calls: AtomicUsize,
    summary_calls: AtomicUsize,
}

impl StubOracle {
    pub fn with_scores(scores: Vec<u8>) -> Self {
        Self {
            scores: Some(scores),
            ..Self::default()
        }
    }

    pub fn failing_ranking(mut self) -> Self {
        self.fail_ranking = true;
        self
    }

    pub fn failing_summary_for(mut self, title: &str) -> Self {
        self.fail_titles.push(title.into());
        self
    }

    pub fn ranking_calls(&self) -> usize {
        self.ranking_calls.load(Ordering::SeqCst)
    }

    pub fn summary_calls(&self) -> usize {
        self.summary_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RelevanceOracle for StubOracle {
    async fn score_titles(&self, titles: &[String]) -> Result<Vec<u8>> {
        self.ranking_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_ranking {
            return Err(PaperdigestError::Oracle("ranking unavailable".into()));
        }
        let mut scores = self.scores.clone().unwrap_or_default();
        scores.resize(titles.len(), NEUTRAL_SCORE);
        Ok(scores)
    }

    async fn summarize_paper(&self, paper: &PaperMeta, _pdf_text: Option<&str>) -> Result<String> {
        self.summary_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_titles.contains(&paper.title) {
            return Err(PaperdigestError::Oracle(format!(
                "enrichment refused for {}",
                paper.title
            )));
        }
        Ok(format!("SUMMARY: {}", paper.title))
    }

    async fn summarize_pdf(&self, title: &str, _authors: &str, _pdf_text: &str) -> Result<String> {
        Ok(format!("PDF ANALYSIS: {title}"))
    }
}

// ---------------------------------------------------------------------------
// StubSource
// ---------------------------------------------------------------------------

#[derive(Default)]
pub(crate) struct StubSource {
    papers: HashMap<String, Vec<PaperMeta>>,
    failing: Vec<String>,
}

impl StubSource {
    pub fn with_category(mut self, category: &str, papers: Vec<PaperMeta>) -> Self {
        self.papers.insert(category.into(), papers);
        self
    }

    pub fn failing_category(mut self, category: &str) -> Self {
        self.failing.push(category.into());
        self
    }
}

#[async_trait]
impl DocumentSource for StubSource {
    async fn fetch_recent(&self, category: &str, _want: usize) -> Result<Vec<PaperMeta>> {
        if self.failing.iter().any(|c| c == category) {
            return Err(PaperdigestError::Network("catalog unreachable".into()));
        }
        Ok(self.papers.get(category).cloned().unwrap_or_default())
    }

    async fn fetch_by_id(&self, arxiv_id: &str) -> Result<Option<PaperMeta>> {
        Ok(self
            .papers
            .values()
            .flatten()
            .find(|paper| paper.arxiv_id == arxiv_id)
            .cloned())
    }
}

// ---------------------------------------------------------------------------
// Deps assembly
// ---------------------------------------------------------------------------

pub(crate) async fn test_deps(oracle: StubOracle) -> (Arc<PipelineDeps>, Arc<StubOracle>) {
    test_deps_with(oracle, StubSource::default()).await
}

pub(crate) async fn test_deps_with(
    oracle: StubOracle,
    source: StubSource,
) -> (Arc<PipelineDeps>, Arc<StubOracle>) {
    let oracle = Arc::new(oracle);
    let deps = Arc::new(PipelineDeps {
        storage: temp_storage().await,
        source: Arc::new(source),
        oracle: Arc::clone(&oracle) as Arc<dyn RelevanceOracle>,
        tracker: Arc::new(InProgress::new()),
        pdf_fetcher: None,
        pdf_extractor: None,
        category_concurrency: 3,
    });
    (deps, oracle)
}
