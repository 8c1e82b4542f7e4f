//! Classification, windowing, grouping and rendering of periodic job results.

mod aggregate;
mod classifier;
mod grouping;
mod render;
mod window;

pub use aggregate::{Execution, JobAggregate, RunRecord, RunStatus, DEFAULT_SUCCESS_MARKER};
pub use classifier::{
    ClassificationError, Classifier, JobIdentity, VersionRegistry, DEFAULT_PLATFORMS,
    DEFAULT_VARIANT_DELIMITER, DEFAULT_VERSION_PATTERN,
};
pub use grouping::{group, summarize, ReportTree, SummaryTotals, VersionTotals, UNKNOWN_PLATFORM};
pub use render::{
    render_headline, render_rich_blocks, render_text_summary, shrink_text_summary, Block,
    DEFAULT_CHUNK_LINES,
};
pub use window::{ExecutionWindow, Step, DEFAULT_WINDOW_HOURS};
