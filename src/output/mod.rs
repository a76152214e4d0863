mod reporter;
mod styling;
mod tables;

pub use reporter::Reporter;
pub use styling::{bright_red, dim, magenta_bold};
pub use tables::jobs_table;

/// Prints the banner to stderr.
///
/// Displays the tool name, version, and description at the start of execution.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("🚀 pipeline-trigger"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("Trigger and monitor GitLab pipelines")
    );
}
