//! libSQL storage layer for enriched papers.
//!
//! The [`Storage`] struct wraps a local libSQL database holding one row per
//! arXiv identity. All writes go through [`Storage::upsert_paper`], which is
//! keyed on `arxiv_id` — re-processing a paper can only ever update its row,
//! never duplicate it.

mod migrations;

use std::path::Path;

use chrono::{DateTime, Utc};
use libsql::{Connection, Database, params};
use paperdigest_shared::{PaperRecord, PaperdigestError, Result};

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

/// Sort fields exposed on the read API. Unrecognized request parameters fall
/// back to the default rather than erroring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    PublishedDate,
    Title,
    GenerationDate,
}

impl SortField {
    /// Parse a request parameter, falling back to `published_date`.
    pub fn from_param(param: &str) -> Self {
        match param {
            "title" => Self::Title,
            "generation_date" => Self::GenerationDate,
            _ => Self::PublishedDate,
        }
    }

    fn column(self) -> &'static str {
        match self {
            Self::PublishedDate => "published_date",
            Self::Title => "title",
            Self::GenerationDate => "generation_date",
        }
    }
}

/// Sort direction; anything other than `asc` means descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Desc,
    Asc,
}

impl SortOrder {
    pub fn from_param(param: &str) -> Self {
        if param.eq_ignore_ascii_case("asc") {
            Self::Asc
        } else {
            Self::Desc
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            Self::Desc => "DESC",
            Self::Asc => "ASC",
        }
    }
}

/// Filter/pagination/sort parameters for [`Storage::list_papers`].
#[derive(Debug, Clone)]
pub struct PaperQuery {
    /// Matches either `category_code` or `category_slug`.
    pub category: Option<String>,
    /// Day bucket filter (`YYYY-MM-DD`).
    pub date: Option<String>,
    /// 1-based page number.
    pub page: u32,
    pub per_page: u32,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
}

impl Default for PaperQuery {
    fn default() -> Self {
        Self {
            category: None,
            date: None,
            page: 1,
            per_page: 10,
            sort_by: SortField::default(),
            sort_order: SortOrder::default(),
        }
    }
}

/// One page of query results plus the unpaginated total.
#[derive(Debug)]
pub struct PaperPage {
    pub papers: Vec<PaperRecord>,
    pub total: u64,
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

const RECORD_COLUMNS: &str = "id, arxiv_id, title, slug, authors, category_code, category_name, \
     category_slug, summary_sections, url, pdf_path, pdf_status, has_pdf_analysis, \
     published_date, generation_date, processed_date, processing_time_ms";

impl Storage {
    /// Open or create a database at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PaperdigestError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| PaperdigestError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| PaperdigestError::Storage(e.to_string()))?;

        let storage = Self { db, conn };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    PaperdigestError::Storage(format!(
                        "migration v{} failed: {e}",
                        migration.version
                    ))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Insert or update a paper, keyed by `arxiv_id`. The row id of an
    /// existing record is preserved; everything else is overwritten.
    pub async fn upsert_paper(&self, record: &PaperRecord) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO papers (id, arxiv_id, title, slug, authors, category_code, \
                 category_name, category_slug, summary_sections, url, pdf_path, pdf_status, \
                 has_pdf_analysis, published_date, generation_date, processed_date, processing_time_ms)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
                 ON CONFLICT(arxiv_id) DO UPDATE SET
                   title = excluded.title,
                   slug = excluded.slug,
                   authors = excluded.authors,
                   category_code = excluded.category_code,
                   category_name = excluded.category_name,
                   category_slug = excluded.category_slug,
                   summary_sections = excluded.summary_sections,
                   url = excluded.url,
                   pdf_path = excluded.pdf_path,
                   pdf_status = excluded.pdf_status,
                   has_pdf_analysis = excluded.has_pdf_analysis,
                   published_date = excluded.published_date,
                   generation_date = excluded.generation_date,
                   processed_date = excluded.processed_date,
                   processing_time_ms = excluded.processing_time_ms",
                params![
                    record.id.as_str(),
                    record.arxiv_id.as_str(),
                    record.title.as_str(),
                    record.slug.as_str(),
                    record.authors.as_str(),
                    record.category_code.as_str(),
                    record.category_name.as_str(),
                    record.category_slug.as_str(),
                    record.summary_sections.as_str(),
                    record.url.as_str(),
                    record.pdf_path.as_deref(),
                    record.pdf_status.as_deref(),
                    record.has_pdf_analysis as i64,
                    record.published_date.map(|ts| ts.to_rfc3339()),
                    record.generation_date.to_rfc3339(),
                    record.processed_date.as_str(),
                    record.processing_time_ms.map(|ms| ms as i64),
                ],
            )
            .await
            .map_err(|e| PaperdigestError::Storage(e.to_string()))?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// All stored arXiv ids — the dedup projection used before ranking.
    pub async fn list_arxiv_ids(&self) -> Result<Vec<String>> {
        let mut rows = self
            .conn
            .query("SELECT arxiv_id FROM papers", params![])
            .await
            .map_err(|e| PaperdigestError::Storage(e.to_string()))?;

        let mut ids = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            ids.push(
                row.get::<String>(0)
                    .map_err(|e| PaperdigestError::Storage(e.to_string()))?,
            );
        }
        Ok(ids)
    }

    /// Get one paper by its slug.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<PaperRecord>> {
        self.get_one("slug", slug).await
    }

    /// Get one paper by its arXiv id.
    pub async fn get_by_arxiv_id(&self, arxiv_id: &str) -> Result<Option<PaperRecord>> {
        self.get_one("arxiv_id", arxiv_id).await
    }

    async fn get_one(&self, column: &str, value: &str) -> Result<Option<PaperRecord>> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM papers WHERE {column} = ?1");
        let mut rows = self
            .conn
            .query(&sql, params![value])
            .await
            .map_err(|e| PaperdigestError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_record(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(PaperdigestError::Storage(e.to_string())),
        }
    }

    /// Total papers stored for a category.
    pub async fn count_for_category(&self, code: &str) -> Result<u64> {
        self.count_where(
            "SELECT COUNT(*) FROM papers WHERE category_code = ?1",
            params![code],
        )
        .await
    }

    /// Papers stored for a category on a specific day bucket.
    pub async fn count_for_category_on(&self, code: &str, day: &str) -> Result<u64> {
        self.count_where(
            "SELECT COUNT(*) FROM papers WHERE category_code = ?1 AND processed_date = ?2",
            params![code, day],
        )
        .await
    }

    async fn count_where(&self, sql: &str, args: impl libsql::params::IntoParams) -> Result<u64> {
        let mut rows = self
            .conn
            .query(sql, args)
            .await
            .map_err(|e| PaperdigestError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(row.get::<i64>(0).unwrap_or(0).max(0) as u64),
            _ => Ok(0),
        }
    }

    /// Filtered, paginated, sorted read over stored papers.
    ///
    /// The sort column comes from the [`SortField`] allow-list, never from
    /// raw request input.
    pub async fn list_papers(&self, query: &PaperQuery) -> Result<PaperPage> {
        let filter = "(?1 IS NULL OR category_code = ?1 OR category_slug = ?1) \
             AND (?2 IS NULL OR processed_date = ?2)";

        let total = self
            .count_where(
                &format!("SELECT COUNT(*) FROM papers WHERE {filter}"),
                params![query.category.as_deref(), query.date.as_deref()],
            )
            .await?;

        let offset = u64::from(query.page.saturating_sub(1)) * u64::from(query.per_page);
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM papers WHERE {filter} \
             ORDER BY {column} {order} LIMIT ?3 OFFSET ?4",
            column = query.sort_by.column(),
            order = query.sort_order.keyword(),
        );

        let mut rows = self
            .conn
            .query(
                &sql,
                params![
                    query.category.as_deref(),
                    query.date.as_deref(),
                    i64::from(query.per_page),
                    offset as i64,
                ],
            )
            .await
            .map_err(|e| PaperdigestError::Storage(e.to_string()))?;

        let mut papers = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            papers.push(row_to_record(&row)?);
        }

        Ok(PaperPage { papers, total })
    }
}

/// Convert a database row to a [`PaperRecord`].
fn row_to_record(row: &libsql::Row) -> Result<PaperRecord> {
    let get_text = |idx: i32| -> Result<String> {
        row.get::<String>(idx)
            .map_err(|e| PaperdigestError::Storage(e.to_string()))
    };

    let parse_ts = |s: String| -> Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&s)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(|e| PaperdigestError::Storage(format!("invalid date: {e}")))
    };

    Ok(PaperRecord {
        id: get_text(0)?,
        arxiv_id: get_text(1)?,
        title: get_text(2)?,
        slug: get_text(3)?,
        authors: get_text(4)?,
        category_code: get_text(5)?,
        category_name: get_text(6)?,
        category_slug: get_text(7)?,
        summary_sections: get_text(8)?,
        url: get_text(9)?,
        pdf_path: row.get::<String>(10).ok(),
        pdf_status: row.get::<String>(11).ok(),
        has_pdf_analysis: row.get::<i64>(12).unwrap_or(0) != 0,
        published_date: match row.get::<String>(13).ok() {
            Some(s) => Some(parse_ts(s)?),
            None => None,
        },
        generation_date: parse_ts(get_text(14)?)?,
        processed_date: get_text(15)?,
        processing_time_ms: row.get::<i64>(16).ok().map(|ms| ms as u64),
    })
}
