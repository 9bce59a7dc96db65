//! On-disk layout for log files
//!
//! Provides directory creation with retention sweeps and the naming scheme for
//! capture and per-call files.

mod paths;
mod retention;

pub use paths::{
    call_file_name, capture_file_name, catalog_dir, default_catalog, ACCURATE_TIME_FORMAT,
    BRIEF_TIME_FORMAT, FALLBACK_CATALOG,
};
pub use retention::{ensure_directory, sweep, SweepReport, DEFAULT_MAX_AGE_HOURS};
