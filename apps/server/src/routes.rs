//! HTTP surface: thin JSON handlers over the pipeline, store, and tracker.
//!
//! Every list endpoint returns a structured response even on partial
//! failure; only a whole-request failure (unknown paper, dead store)
//! surfaces as a 404/500 with a message.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use paperdigest_core::{ItemOutcome, PipelineDeps, enrich_and_store, orchestrator, pdf, status};
use paperdigest_shared::{Category, PaperRecord, today_utc};
use paperdigest_storage::{PaperQuery, SortField, SortOrder};

/// Page size used when returning a completed category's cached papers.
const CACHED_PAGE_SIZE: u32 = 100;

type ApiError = (StatusCode, String);

fn internal(err: impl std::fmt::Display) -> ApiError {
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub(crate) struct AppState {
    pub deps: Arc<PipelineDeps>,
    pub categories: Vec<Category>,
    pub default_max_papers: usize,
}

impl AppState {
    /// Categories selected by an optional `category` query parameter.
    fn select_categories(&self, filter: Option<&str>) -> Result<Vec<Category>, ApiError> {
        match filter {
            None => Ok(self.categories.clone()),
            Some(code) => self
                .categories
                .iter()
                .find(|category| category.code == code)
                .cloned()
                .map(|category| vec![category])
                .ok_or((
                    StatusCode::NOT_FOUND,
                    format!("unknown category: {code}"),
                )),
        }
    }
}

pub(crate) fn build_router(state: AppState) -> Router {
    // The digest is public, read-mostly data; allow any origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/generate", get(generate))
        .route("/api/categories", get(list_categories))
        .route("/api/category/{slug}", get(papers_by_category))
        .route("/api/papers", get(list_papers))
        .route("/api/paper/{slug}", get(paper_by_slug))
        .route("/api/generation-status", get(generation_status))
        .route("/api/fetch-document", post(fetch_document))
        .route("/api/pdf-analysis/{arxiv_id}", post(pdf_analysis))
        .route("/health", get(health))
        .layer(cors)
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

// ---------------------------------------------------------------------------
// /api/generate
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GenerateParams {
    category: Option<String>,
    max_papers: Option<usize>,
}

#[derive(Debug, Serialize)]
struct GenerateResponse {
    existing_papers: BTreeMap<String, Vec<PaperRecord>>,
    generation_status: BTreeMap<String, &'static str>,
    categories_processing: Vec<String>,
    timestamp: String,
}

/// Kick off generation for categories lacking today's records and return
/// immediately: cached records for completed categories, a status map for
/// the rest. The orchestrator run is detached — its results land in the
/// store, not in this response.
async fn generate(
    State(state): State<AppState>,
    Query(params): Query<GenerateParams>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let day = today_utc();
    let max_papers = params.max_papers.unwrap_or(state.default_max_papers).max(1);
    let categories = state.select_categories(params.category.as_deref())?;

    let mut existing_papers = BTreeMap::new();
    let mut generation_status = BTreeMap::new();
    let mut to_process = Vec::new();

    for category in categories {
        if state.deps.tracker.is_running(&category.code) {
            generation_status.insert(category.code.clone(), "in_progress");
            continue;
        }

        let today_count = state
            .deps
            .storage
            .count_for_category_on(&category.code, &day)
            .await
            .map_err(internal)?;

        if today_count > 0 {
            let page = state
                .deps
                .storage
                .list_papers(&PaperQuery {
                    category: Some(category.code.clone()),
                    date: Some(day.clone()),
                    per_page: CACHED_PAGE_SIZE,
                    ..Default::default()
                })
                .await
                .map_err(internal)?;
            existing_papers.insert(category.code.clone(), page.papers);
            generation_status.insert(category.code.clone(), "completed");
            continue;
        }

        // Claim before dispatch so readers see the flag immediately. Losing
        // the claim means another trigger beat us to it.
        if state.deps.tracker.try_begin(&category.code) {
            generation_status.insert(category.code.clone(), "starting");
            to_process.push(category);
        } else {
            generation_status.insert(category.code.clone(), "in_progress");
        }
    }

    let categories_processing: Vec<String> =
        to_process.iter().map(|category| category.code.clone()).collect();

    if !to_process.is_empty() {
        info!(categories = to_process.len(), max_papers, "dispatching generation");
        let deps = Arc::clone(&state.deps);
        tokio::spawn(orchestrator::run(deps, day, to_process, max_papers));
    }

    Ok(Json(GenerateResponse {
        existing_papers,
        generation_status,
        categories_processing,
        timestamp: Utc::now().to_rfc3339(),
    }))
}

// ---------------------------------------------------------------------------
// /api/categories
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct CategoryInfo {
    code: String,
    name: String,
    slug: String,
    paper_count: u64,
}

async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryInfo>>, ApiError> {
    let mut out = Vec::with_capacity(state.categories.len());
    for category in &state.categories {
        let paper_count = state
            .deps
            .storage
            .count_for_category(&category.code)
            .await
            .map_err(internal)?;
        out.push(CategoryInfo {
            code: category.code.clone(),
            name: category.name.clone(),
            slug: category.slug(),
            paper_count,
        });
    }
    Ok(Json(out))
}

// ---------------------------------------------------------------------------
// Paper listings
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct PageParams {
    date: Option<String>,
    #[serde(default = "default_page")]
    page: u32,
    #[serde(default = "default_per_page")]
    per_page: u32,
}

fn default_page() -> u32 {
    1
}
fn default_per_page() -> u32 {
    10
}

#[derive(Debug, Serialize)]
struct PaperListResponse {
    papers: Vec<PaperRecord>,
    total: u64,
    page: u32,
    per_page: u32,
    total_pages: u64,
}

fn total_pages(total: u64, per_page: u32) -> u64 {
    total.div_ceil(u64::from(per_page.max(1)))
}

async fn papers_by_category(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Json<PaperListResponse>, ApiError> {
    let page = state
        .deps
        .storage
        .list_papers(&PaperQuery {
            category: Some(slug),
            date: params.date,
            page: params.page,
            per_page: params.per_page,
            ..Default::default()
        })
        .await
        .map_err(internal)?;

    Ok(Json(PaperListResponse {
        total_pages: total_pages(page.total, params.per_page),
        total: page.total,
        page: params.page,
        per_page: params.per_page,
        papers: page.papers,
    }))
}

#[derive(Debug, Deserialize)]
struct PapersParams {
    category: Option<String>,
    date: Option<String>,
    #[serde(default = "default_page")]
    page: u32,
    #[serde(default = "default_per_page")]
    per_page: u32,
    #[serde(default)]
    sort_by: String,
    #[serde(default)]
    sort_order: String,
}

#[derive(Debug, Serialize)]
struct PapersResponse {
    date: String,
    category: Option<String>,
    papers: Vec<PaperRecord>,
    count: usize,
    total: u64,
    page: u32,
    per_page: u32,
    total_pages: u64,
    sort_by: &'static str,
    sort_order: &'static str,
    timestamp: String,
}

/// Day-filtered paper listing. The sort field is restricted to an
/// allow-list; anything unrecognized silently becomes the default.
async fn list_papers(
    State(state): State<AppState>,
    Query(params): Query<PapersParams>,
) -> Result<Json<PapersResponse>, ApiError> {
    let date = params.date.unwrap_or_else(today_utc);
    let sort_by = SortField::from_param(&params.sort_by);
    let sort_order = SortOrder::from_param(&params.sort_order);

    let page = state
        .deps
        .storage
        .list_papers(&PaperQuery {
            category: params.category.clone(),
            date: Some(date.clone()),
            page: params.page,
            per_page: params.per_page,
            sort_by,
            sort_order,
        })
        .await
        .map_err(internal)?;

    Ok(Json(PapersResponse {
        date,
        category: params.category,
        count: page.papers.len(),
        total: page.total,
        page: params.page,
        per_page: params.per_page,
        total_pages: total_pages(page.total, params.per_page),
        sort_by: match sort_by {
            SortField::PublishedDate => "published_date",
            SortField::Title => "title",
            SortField::GenerationDate => "generation_date",
        },
        sort_order: match sort_order {
            SortOrder::Desc => "desc",
            SortOrder::Asc => "asc",
        },
        timestamp: Utc::now().to_rfc3339(),
        papers: page.papers,
    }))
}

async fn paper_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PaperRecord>, ApiError> {
    state
        .deps
        .storage
        .get_by_slug(&slug)
        .await
        .map_err(internal)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "paper not found".into()))
}

// ---------------------------------------------------------------------------
// /api/generation-status
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct StatusParams {
    category: Option<String>,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    date: String,
    status: BTreeMap<String, status::CategoryStatus>,
    timestamp: String,
}

async fn generation_status(
    State(state): State<AppState>,
    Query(params): Query<StatusParams>,
) -> Result<Json<StatusResponse>, ApiError> {
    let day = today_utc();
    let categories = state.select_categories(params.category.as_deref())?;

    let snapshot = status::generation_status(&state.deps, &categories, &day)
        .await
        .map_err(internal)?;

    Ok(Json(StatusResponse {
        date: day,
        status: snapshot,
        timestamp: Utc::now().to_rfc3339(),
    }))
}

// ---------------------------------------------------------------------------
// On-demand single-paper paths
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FetchDocumentRequest {
    arxiv_id: String,
}

/// Fetch, enrich, and persist one paper immediately, bypassing the batch
/// orchestrator but sharing its item-worker logic.
async fn fetch_document(
    State(state): State<AppState>,
    Json(request): Json<FetchDocumentRequest>,
) -> Result<Json<PaperRecord>, ApiError> {
    let paper = state
        .deps
        .source
        .fetch_by_id(&request.arxiv_id)
        .await
        .map_err(internal)?
        .ok_or((
            StatusCode::NOT_FOUND,
            format!("no catalog entry for {}", request.arxiv_id),
        ))?;

    let category = state
        .categories
        .iter()
        .find(|category| category.code == paper.primary_category)
        .cloned()
        .unwrap_or_else(|| {
            Category::new(paper.primary_category.clone(), paper.primary_category.clone())
        });

    match enrich_and_store(&state.deps, paper, &category, &today_utc()).await {
        ItemOutcome::Processed(record) => Ok(Json(*record)),
        ItemOutcome::Skipped(reason) => Err((StatusCode::UNPROCESSABLE_ENTITY, reason.into())),
        ItemOutcome::Failed(error) => {
            warn!(%error, "on-demand enrichment failed");
            Err(internal(error))
        }
    }
}

/// Re-analyze a stored paper from its full PDF text and update the record.
async fn pdf_analysis(
    State(state): State<AppState>,
    Path(arxiv_id): Path<String>,
) -> Result<Json<PaperRecord>, ApiError> {
    let mut record = state
        .deps
        .storage
        .get_by_arxiv_id(&arxiv_id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "paper not found".into()))?;

    let fetcher = state.deps.pdf_fetcher.as_ref().ok_or((
        StatusCode::INTERNAL_SERVER_ERROR,
        "PDF downloads are not configured".into(),
    ))?;
    let extractor = state.deps.pdf_extractor.as_ref().ok_or((
        StatusCode::INTERNAL_SERVER_ERROR,
        "no PDF text extractor configured".into(),
    ))?;

    let pdf_url = record.url.replace("/abs/", "/pdf/");
    let (path, bytes) = fetcher
        .download(&pdf_url, &pdf::safe_file_stem(&record.title))
        .await
        .map_err(internal)?;

    let text = pdf::extract_text(Arc::clone(extractor), bytes)
        .await
        .map_err(internal)?;

    let summary = state
        .deps
        .oracle
        .summarize_pdf(&record.title, &record.authors, &text)
        .await
        .map_err(internal)?;

    record.summary_sections = summary;
    record.pdf_path = Some(path.display().to_string());
    record.pdf_status = Some("downloaded".into());
    record.has_pdf_analysis = true;

    state
        .deps
        .storage
        .upsert_paper(&record)
        .await
        .map_err(internal)?;

    Ok(Json(record))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        // A zero per_page must not divide by zero
        assert_eq!(total_pages(5, 0), 5);
    }
}
