//! Batch Module
//!
//! Bulk repository operations and the sequencing helpers built on them.
//! Nothing here is transactional: partial progress is never rolled back.

mod operations;
mod sequence;

pub use operations::{BatchOperations, BatchUpdateFailure, CleanupRequest, UpdateOutcome};
pub use sequence::{execute_sequence, run_chunked, SequenceStep};
