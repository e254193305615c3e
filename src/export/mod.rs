//! Calendar export boundary: `.ics` files and "add to calendar" links.

mod google;
mod ics;

pub use google::*;
pub use ics::*;

use crate::draft::ClassMeetingDraft;
use chrono_tz::Tz;

/// Custom error type for export operations
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),
    #[error("start_date after end_date for {title}")]
    InvalidRange { title: String },
    #[error(transparent)]
    Window(#[from] crate::term::WindowError),
    #[error("Failed to write calendar file: {0}")]
    Io(#[from] std::io::Error),
}

/// Look up an IANA timezone name.
pub fn resolve_timezone(name: &str) -> Result<Tz, ExportError> {
    name.trim().parse::<Tz>().map_err(|_| ExportError::UnknownTimezone(name.to_string()))
}

/// Free-text body shared by `.ics` descriptions and link details.
pub fn event_description(draft: &ClassMeetingDraft) -> Option<String> {
    let mut lines = Vec::new();
    if let Some(instructor) = &draft.instructor {
        lines.push(format!("Instructor: {}", instructor));
    }
    if let Some(notes) = &draft.notes {
        lines.push(notes.clone());
    }
    if let Some(term) = &draft.term_label {
        lines.push(format!("Term: {}", term));
    }
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}
