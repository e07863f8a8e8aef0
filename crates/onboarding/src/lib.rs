//! Guided setup wizard for a ragkit knowledge base.
//!
//! Flow: welcome → system check → expertise → profile → source → parsing →
//! chunking → embedding → vector store → search type → (semantic | lexical |
//! hybrid steps, depending on the chosen strategy) → reranking → generation.
//!
//! Also computes effective folder statistics once the user excludes
//! subfolders from ingestion.

pub mod error;
pub mod scanner;
pub mod service;
pub mod state;
pub mod store;
pub mod tree_stats;
pub mod wizard;

pub use {
    error::{Error, Result},
    scanner::FsScanner,
    service::{SourceScan, WizardController},
    state::{WizardStep, next_step, prev_step},
    store::FileProgressStore,
    tree_stats::{EffectiveStats, ExclusionSet, TreeInvariantError, effective_stats, validate_tree},
};
