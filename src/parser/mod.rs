pub mod report;

pub use report::{derive_group, extract_trace_marker, parse_report};
