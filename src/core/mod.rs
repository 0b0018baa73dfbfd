pub mod comparator;
pub mod engine;
pub mod file_state;
pub mod report;
pub mod scanner;
pub mod transfer;

pub use comparator::{decide, CompareConfig, FileComparator, FileRelation};
pub use engine::{ProgressCallback, SyncConfig, SyncEngine};
pub use file_state::{calculate_file_hash, calculate_hash, probe, probe_pair, FileMetadata};
pub use report::{FileOutcome, OutcomeStatus, RunReport, RunSummary};
pub use scanner::{DiffResult, FileScanner, ScanConfig};
pub use transfer::{copy_atomic, write_atomic};
