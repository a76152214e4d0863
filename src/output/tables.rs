use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

use crate::providers::gitlab::types::{Job, JobStatus};

/// Table and cell creation helpers
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn color_coded_status_cell(status: JobStatus) -> Cell {
    let cell = Cell::new(status.to_string());
    match status {
        JobStatus::Success => cell.fg(TableColor::Green),
        JobStatus::Failed => cell.fg(TableColor::Red),
        JobStatus::Manual | JobStatus::Canceled | JobStatus::Skipped => {
            cell.fg(TableColor::Yellow)
        }
        _ => cell,
    }
}

/// Summary of a pipeline's jobs, one row per job in listing order.
pub fn jobs_table(jobs: &[Job], colors: bool) -> Table {
    let mut table = create_table();
    if !colors {
        table.force_no_tty();
    }
    table.set_header(
        ["Job", "Stage", "Status"]
            .iter()
            .map(|label| Cell::new(*label).fg(TableColor::Cyan))
            .collect::<Vec<_>>(),
    );
    for job in jobs {
        table.add_row(vec![
            Cell::new(&job.name),
            Cell::new(&job.stage),
            color_coded_status_cell(job.status),
        ]);
    }
    table
}
