//! SQL migration definitions for the paperdigest database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a set of SQL statements executed within a transaction.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: papers",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Enriched papers, one row per arXiv identity
CREATE TABLE IF NOT EXISTS papers (
    id                 TEXT PRIMARY KEY,
    arxiv_id           TEXT NOT NULL UNIQUE,
    title              TEXT NOT NULL,
    slug               TEXT NOT NULL,
    authors            TEXT NOT NULL,
    category_code      TEXT NOT NULL,
    category_name      TEXT NOT NULL,
    category_slug      TEXT NOT NULL,
    summary_sections   TEXT NOT NULL,
    url                TEXT NOT NULL,
    pdf_path           TEXT,
    pdf_status         TEXT,
    has_pdf_analysis   INTEGER NOT NULL DEFAULT 0,
    published_date     TEXT,
    generation_date    TEXT NOT NULL,
    processed_date     TEXT NOT NULL,
    processing_time_ms INTEGER
);

CREATE INDEX IF NOT EXISTS idx_papers_category_code ON papers(category_code);
CREATE INDEX IF NOT EXISTS idx_papers_category_slug ON papers(category_slug);
CREATE INDEX IF NOT EXISTS idx_papers_processed_date ON papers(processed_date);
CREATE INDEX IF NOT EXISTS idx_papers_slug ON papers(slug);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
