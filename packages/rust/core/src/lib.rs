//! Concurrent generation pipeline: per-category discovery, ranking,
//! enrichment, and idempotent persistence.
//!
//! The [`orchestrator`] runs one [`processor`] per category under a global
//! concurrency cap, with a volatile [`tracker::InProgress`] flag preventing
//! overlapping runs on the same category. The [`status`] module provides the
//! read-only point-in-time view consumed by the HTTP surface.

pub mod deps;
pub mod orchestrator;
pub mod pdf;
pub mod processor;
pub mod status;
pub mod tracker;

pub use deps::PipelineDeps;
pub use processor::{ItemOutcome, enrich_and_store, process_category};
pub use tracker::{ClearGuard, InProgress};

#[cfg(test)]
pub(crate) mod testutil;
