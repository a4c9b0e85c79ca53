//! Partition Processor: turn one category's candidates into persisted
//! records.
//!
//! Dedup happens-before ranking happens-before per-item dispatch. Each
//! selected paper is enriched and upserted by its own task, so one paper's
//! failure can neither block nor erase a sibling's persisted result.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use paperdigest_oracle::top_k_indices;
use paperdigest_shared::{Category, PaperMeta, PaperRecord, slugify};
use tokio::task::JoinSet;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::deps::PipelineDeps;
use crate::pdf;

/// Outcome of one item worker. The processor aggregates `Processed` results
/// and logs the rest; nothing here propagates to sibling items.
#[derive(Debug)]
pub enum ItemOutcome {
    Processed(Box<PaperRecord>),
    Skipped(&'static str),
    Failed(String),
}

/// Process one category: dedup against the store, rank, select top
/// `max_select`, enrich and persist each selection concurrently.
///
/// Infallible by contract — every failure mode inside is contained and
/// reported as a smaller result, so the caller's other categories are never
/// affected.
#[instrument(skip_all, fields(category = %category.code, candidates = candidates.len()))]
pub async fn process_category(
    deps: &Arc<PipelineDeps>,
    category: &Category,
    candidates: Vec<PaperMeta>,
    day_bucket: &str,
    max_select: usize,
) -> Vec<PaperRecord> {
    if candidates.is_empty() {
        return Vec::new();
    }

    // Dedup against everything ever persisted, by identity.
    let existing: HashSet<String> = match deps.storage.list_arxiv_ids().await {
        Ok(ids) => ids.into_iter().collect(),
        Err(e) => {
            warn!(error = %e, "could not load stored ids, skipping category");
            return Vec::new();
        }
    };

    let fresh: Vec<PaperMeta> = candidates
        .into_iter()
        .filter(|paper| !existing.contains(&paper.arxiv_id))
        .collect();

    if fresh.is_empty() {
        info!("no new unprocessed papers");
        return Vec::new();
    }

    // Rank. A malformed response still yields one score per title (neutral
    // default); only a failed call falls back to catalog order.
    let titles: Vec<String> = fresh.iter().map(|paper| paper.title.clone()).collect();
    let selected = match deps.oracle.score_titles(&titles).await {
        Ok(scores) => top_k_indices(&scores, max_select),
        Err(e) => {
            warn!(error = %e, "ranking failed, falling back to catalog order");
            (0..fresh.len().min(max_select)).collect()
        }
    };

    info!(fresh = fresh.len(), selected = selected.len(), "selection complete");

    // Fan out one worker per selection; K is small, no extra cap needed.
    let mut tasks = JoinSet::new();
    for idx in selected {
        let deps = Arc::clone(deps);
        let paper = fresh[idx].clone();
        let category = category.clone();
        let day_bucket = day_bucket.to_string();
        tasks.spawn(async move { enrich_and_store(&deps, paper, &category, &day_bucket).await });
    }

    let mut records = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(ItemOutcome::Processed(record)) => records.push(*record),
            Ok(ItemOutcome::Skipped(reason)) => info!(reason, "paper skipped"),
            Ok(ItemOutcome::Failed(error)) => warn!(%error, "paper dropped"),
            Err(e) => warn!(error = %e, "item worker panicked"),
        }
    }

    records
}

/// Enrich one paper and persist the result immediately.
///
/// Shared between the batch pipeline and the on-demand single-paper route.
/// The PDF path is best-effort: its outcome lands in `pdf_status` and never
/// fails the item.
#[instrument(skip_all, fields(arxiv_id = %paper.arxiv_id))]
pub async fn enrich_and_store(
    deps: &Arc<PipelineDeps>,
    paper: PaperMeta,
    category: &Category,
    day_bucket: &str,
) -> ItemOutcome {
    if paper.arxiv_id.is_empty() {
        return ItemOutcome::Skipped("missing arxiv id");
    }

    let start = Instant::now();

    let mut pdf_path = None;
    let mut pdf_status = None;
    let mut pdf_text: Option<String> = None;

    if let Some(fetcher) = &deps.pdf_fetcher {
        match &paper.pdf_url {
            Some(url) => {
                match fetcher.download(url, &pdf::safe_file_stem(&paper.title)).await {
                    Ok((path, bytes)) => {
                        pdf_path = Some(path.display().to_string());
                        pdf_status = Some("downloaded".to_string());
                        if let Some(extractor) = &deps.pdf_extractor {
                            match pdf::extract_text(Arc::clone(extractor), bytes).await {
                                Ok(text) if !text.trim().is_empty() => pdf_text = Some(text),
                                Ok(_) => {}
                                Err(e) => {
                                    warn!(error = %e, "pdf text extraction failed");
                                    pdf_status = Some(format!("extraction failed: {e}"));
                                }
                            }
                        }
                    }
                    Err(e) => pdf_status = Some(format!("download failed: {e}")),
                }
            }
            None => pdf_status = Some("no pdf link".to_string()),
        }
    }

    let summary = match deps.oracle.summarize_paper(&paper, pdf_text.as_deref()).await {
        Ok(summary) => summary,
        Err(e) => return ItemOutcome::Failed(format!("enrichment: {e}")),
    };

    let record = PaperRecord {
        id: Uuid::now_v7().to_string(),
        arxiv_id: paper.arxiv_id.clone(),
        title: paper.title.clone(),
        slug: slugify(&paper.title),
        authors: paper.authors.join(", "),
        category_code: category.code.clone(),
        category_name: category.name.clone(),
        category_slug: category.slug(),
        summary_sections: summary,
        url: paper.arxiv_id.clone(),
        pdf_path,
        pdf_status,
        has_pdf_analysis: pdf_text.is_some(),
        published_date: paper.published,
        generation_date: Utc::now(),
        processed_date: day_bucket.to_string(),
        processing_time_ms: Some(start.elapsed().as_millis() as u64),
    };

    // Persist per item, not per batch: a sibling's later failure cannot
    // undo this write.
    if let Err(e) = deps.storage.upsert_paper(&record).await {
        return ItemOutcome::Failed(format!("persist: {e}"));
    }

    info!(
        title = %record.title,
        elapsed_ms = record.processing_time_ms.unwrap_or_default(),
        "processed and saved paper"
    );

    ItemOutcome::Processed(Box::new(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{StubOracle, paper, test_deps};

    fn category() -> Category {
        Category::new("cs.LG", "Machine Learning")
    }

    #[tokio::test]
    async fn empty_candidates_touch_nothing() {
        let (deps, oracle) = test_deps(StubOracle::default()).await;
        let records = process_category(&deps, &category(), vec![], "2026-08-07", 3).await;
        assert!(records.is_empty());
        assert_eq!(oracle.ranking_calls(), 0);
        assert_eq!(oracle.summary_calls(), 0);
    }

    #[tokio::test]
    async fn selects_top_k_by_score() {
        let stub = StubOracle::with_scores(vec![2, 9, 5]);
        let (deps, oracle) = test_deps(stub).await;

        let candidates = vec![
            paper("http://arxiv.org/abs/1v1", "Low", "cs.LG"),
            paper("http://arxiv.org/abs/2v1", "High", "cs.LG"),
            paper("http://arxiv.org/abs/3v1", "Mid", "cs.LG"),
        ];

        let records = process_category(&deps, &category(), candidates, "2026-08-07", 2).await;

        let mut titles: Vec<&str> = records.iter().map(|r| r.title.as_str()).collect();
        titles.sort_unstable();
        assert_eq!(titles, vec!["High", "Mid"]);
        assert_eq!(oracle.ranking_calls(), 1);
        assert_eq!(oracle.summary_calls(), 2);
    }

    #[tokio::test]
    async fn top_k_bounded_by_candidate_count() {
        let (deps, _oracle) = test_deps(StubOracle::default()).await;
        let candidates = vec![paper("http://arxiv.org/abs/1v1", "Only", "cs.LG")];

        let records = process_category(&deps, &category(), candidates, "2026-08-07", 10).await;
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn second_run_with_same_candidates_is_empty() {
        let (deps, oracle) = test_deps(StubOracle::default()).await;
        let candidates = vec![
            paper("http://arxiv.org/abs/1v1", "A", "cs.LG"),
            paper("http://arxiv.org/abs/2v1", "B", "cs.LG"),
        ];

        let first =
            process_category(&deps, &category(), candidates.clone(), "2026-08-07", 5).await;
        assert_eq!(first.len(), 2);

        let second = process_category(&deps, &category(), candidates, "2026-08-07", 5).await;
        assert!(second.is_empty());
        // Dedup idempotence: the second run made no oracle calls at all.
        assert_eq!(oracle.ranking_calls(), 1);
        assert_eq!(oracle.summary_calls(), 2);

        let ids = deps.storage.list_arxiv_ids().await.unwrap();
        assert_eq!(ids.len(), 2);
    }

    #[tokio::test]
    async fn one_failing_item_does_not_affect_siblings() {
        let stub = StubOracle::default().failing_summary_for("Cursed");
        let (deps, _oracle) = test_deps(stub).await;

        let candidates = vec![
            paper("http://arxiv.org/abs/1v1", "Fine One", "cs.LG"),
            paper("http://arxiv.org/abs/2v1", "Cursed", "cs.LG"),
            paper("http://arxiv.org/abs/3v1", "Fine Two", "cs.LG"),
        ];

        let records = process_category(&deps, &category(), candidates, "2026-08-07", 3).await;
        assert_eq!(records.len(), 2);

        // Workers #1 and #3 persisted despite #2 failing.
        let ids = deps.storage.list_arxiv_ids().await.unwrap();
        assert_eq!(ids.len(), 2);
        assert!(!ids.contains(&"http://arxiv.org/abs/2v1".to_string()));
    }

    #[tokio::test]
    async fn ranking_outage_falls_back_to_catalog_order() {
        let stub = StubOracle::default().failing_ranking();
        let (deps, _oracle) = test_deps(stub).await;

        let candidates = vec![
            paper("http://arxiv.org/abs/1v1", "First", "cs.LG"),
            paper("http://arxiv.org/abs/2v1", "Second", "cs.LG"),
            paper("http://arxiv.org/abs/3v1", "Third", "cs.LG"),
        ];

        let records = process_category(&deps, &category(), candidates, "2026-08-07", 2).await;
        let mut titles: Vec<&str> = records.iter().map(|r| r.title.as_str()).collect();
        titles.sort_unstable();
        assert_eq!(titles, vec!["First", "Second"]);
    }

    #[tokio::test]
    async fn record_fields_are_derived_from_candidate() {
        let (deps, _oracle) = test_deps(StubOracle::default()).await;
        let candidates = vec![paper(
            "http://arxiv.org/abs/2608.42v1",
            "Attention Is Overrated!",
            "cs.LG",
        )];

        let records = process_category(&deps, &category(), candidates, "2026-08-07", 1).await;
        let record = &records[0];
        assert_eq!(record.slug, "attention-is-overrated");
        assert_eq!(record.category_slug, "machine-learning");
        assert_eq!(record.processed_date, "2026-08-07");
        assert!(record.summary_sections.starts_with("SUMMARY:"));
        assert!(!record.has_pdf_analysis);

        let stored = deps
            .storage
            .get_by_slug("attention-is-overrated")
            .await
            .unwrap();
        assert!(stored.is_some());
    }
}
