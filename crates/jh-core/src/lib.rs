//! Core domain logic for Jira issue history exports.
//!
//! This crate contains:
//! - Timeline reconstruction: turning a raw changelog into ordered records
//!   with hold durations
//! - Aggregation: building every issue's timeline for a project through an
//!   [`IssueTracker`]
//! - Export: flattening timelines into the fixed CSV layout

pub mod aggregate;
pub mod duration;
pub mod export;
mod issue;
pub mod sentinel;
pub mod timeline;
pub mod timestamp;
mod tracker;
mod types;

pub use aggregate::{
    AggregateError, AggregateOptions, AggregateReport, FailurePolicy, IssueFailure, IssueHistory,
    IssueWarning, aggregate,
};
pub use duration::{HoldDuration, SpanParseError, format_span, parse_span};
pub use export::{
    ExportError, HistoryRow, export_csv, export_filename, export_rows, history_rows, write_csv,
};
pub use issue::{ChangeEvent, FieldTransition, Issue};
pub use timeline::{Reconstruction, TimelineRecord, TimelineWarning, reconstruct};
pub use timestamp::{Timestamp, TimestampError, format_timestamp, parse_timestamp};
pub use tracker::{IssueTracker, TrackerError};
pub use types::{IssueKey, ProjectKey, ValidationError};
