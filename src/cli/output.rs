use std::io::{self, Write};

use tracing::warn;

use crate::{
    error::TrackerError,
    store::projects::Projects,
    timer::{format_hours, StatusSink},
};

/// Prints totals and errors into the terminal.
pub struct TerminalSink {
    /// Overwrite the same line on each update instead of printing a new one.
    inline: bool,
}

impl TerminalSink {
    pub fn new(inline: bool) -> Self {
        Self { inline }
    }
}

impl StatusSink for TerminalSink {
    fn show_total(&mut self, hours: f64) {
        if let Err(e) = write_total(&mut io::stdout().lock(), hours, self.inline) {
            // Tracking goes on, the total is in the file anyway.
            warn!("Couldn't show the total: {e}");
        }
    }

    fn show_error(&mut self, error: &TrackerError) {
        if self.inline {
            println!();
        }
        eprintln!("Error: {error}");
    }
}

fn write_total(out: &mut impl Write, hours: f64, inline: bool) -> io::Result<()> {
    if inline {
        write!(out, "\r{}", format_hours(hours))?;
        out.flush()
    } else {
        writeln!(out, "{}", format_hours(hours))
    }
}

/// Renders every project on its own line, marking the selected one.
pub fn render_projects(projects: &Projects, selected: Option<&str>) -> String {
    if projects.is_empty() {
        return "No projects yet\n".into();
    }
    let width = projects.names().map(str::len).max().unwrap_or_default();
    projects
        .iter()
        .map(|(name, hours)| {
            let marker = if Some(name) == selected { '*' } else { ' ' };
            format!("{marker} {name:<width$}  {hours:.2}\n")
        })
        .collect()
}
