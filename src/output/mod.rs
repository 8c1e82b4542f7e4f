mod exports;
mod progress;
mod styling;
mod summary;
mod tables;

pub use exports::export_json;
pub use progress::PhaseProgress;
pub use styling::{dim, magenta_bold};
pub use summary::{print_jobs, print_summary};

/// Prints the periodics-report banner to stderr.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("📰 periodics-report"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("Periodic CI job digest")
    );
}
