//! Pipeline Orchestrator: fan out partition runs under a global cap.
//!
//! Callers claim each category on the tracker (`try_begin`) before handing
//! it to [`run`], so the in-progress flag is visible to status readers the
//! moment work is scheduled, not once a worker gets around to it. `run` owns
//! releasing the flags: every category handed in ends with its flag cleared,
//! whether it produced records, had nothing to do, or blew up.

use std::sync::Arc;

use paperdigest_shared::{Category, PaperMeta, PaperRecord};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, instrument, warn};

use crate::deps::PipelineDeps;
use crate::processor::process_category;
use crate::tracker::ClearGuard;

/// Candidates requested per category, as a multiple of the selection size.
const CANDIDATE_MULTIPLE: usize = 3;

/// Run the generation pipeline over `categories` for one day bucket.
///
/// Never fails as a whole: a category whose fetch or processing fails
/// contributes an empty result and a log line. Returns the concatenation of
/// all categories' successfully persisted records.
#[instrument(skip_all, fields(day = %day_bucket, categories = categories.len()))]
pub async fn run(
    deps: Arc<PipelineDeps>,
    day_bucket: String,
    categories: Vec<Category>,
    max_per_category: usize,
) -> Vec<PaperRecord> {
    // Candidate fetches are sequential: the catalog is cheap to call but not
    // assumed to tolerate concurrent hammering.
    let mut fetched: Vec<(Category, Vec<PaperMeta>)> = Vec::new();
    for category in categories {
        match deps
            .source
            .fetch_recent(&category.code, max_per_category * CANDIDATE_MULTIPLE)
            .await
        {
            Ok(papers) if !papers.is_empty() => fetched.push((category, papers)),
            Ok(_) => {
                info!(category = %category.code, "no recent candidates");
                deps.tracker.clear(&category.code);
            }
            Err(e) => {
                warn!(category = %category.code, error = %e, "candidate fetch failed");
                deps.tracker.clear(&category.code);
            }
        }
    }

    if fetched.is_empty() {
        return Vec::new();
    }

    // Global cap on simultaneous partition runs; order of completion is
    // unspecified.
    let semaphore = Arc::new(Semaphore::new(deps.category_concurrency.max(1)));
    let mut runs = JoinSet::new();

    for (category, papers) in fetched {
        let deps = Arc::clone(&deps);
        let semaphore = Arc::clone(&semaphore);
        let day_bucket = day_bucket.clone();

        runs.spawn(async move {
            // Guard first: the flag clears even if this task panics.
            let _guard = ClearGuard::new(Arc::clone(&deps.tracker), category.code.clone());
            let _permit = match semaphore.acquire().await {
                Ok(permit) => permit,
                Err(_) => return Vec::new(),
            };
            process_category(&deps, &category, papers, &day_bucket, max_per_category).await
        });
    }

    let mut records = Vec::new();
    while let Some(joined) = runs.join_next().await {
        match joined {
            Ok(batch) => records.extend(batch),
            Err(e) => warn!(error = %e, "category run panicked"),
        }
    }

    info!(records = records.len(), "pipeline run complete");
    records
}
