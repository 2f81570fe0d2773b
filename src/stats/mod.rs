//! Session statistics for the motion activity agent.
//!
//! Counts what the pipeline ingested and decided so a running agent can be
//! inspected and its totals carried across sessions.

pub mod log;

// Re-export commonly used types
pub use log::{
    create_shared_log, create_shared_log_with_persistence, SessionLog, SessionStats,
    SharedSessionLog,
};
