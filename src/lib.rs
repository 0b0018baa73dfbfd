//! dualsync - conflict-aware two-way directory synchronizer
//!
//! Reconciles a local tree with a second tree reachable through an ordinary
//! path (typically a mounted cloud drive), deciding per file whether to copy
//! in either direction or skip, and committing every copy with an atomic
//! rename.

pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod models;

pub use crate::core::{
    decide, FileMetadata, FileOutcome, OutcomeStatus, RunReport, RunSummary, SyncConfig,
    SyncEngine,
};
pub use error::{CopyError, ProbeError, SyncError, TraversalError};
pub use models::{SyncDecision, SyncMode};
