//! Utility functions for display formatting.

pub mod format;

// Re-export commonly used functions at module level
pub use format::{format_audit_ratio, format_date, format_kilobytes, format_megabytes, truncate_string};
