//! Event materialization: one draft plus a term window and timezone becomes a
//! concrete first occurrence with wall-clock timestamps.
//!
//! Times are wall-clock values in the stated timezone. Nothing here converts to
//! UTC, so a class that meets at 9am stays at 9am across daylight-saving shifts.

use crate::clock::{parse_clock_time, ClockTime};
use crate::draft::{ClassMeetingDraft, TermWindow};
use crate::occurrence::{parse_date, resolve_first_occurrence, DATE_FORMAT};
use crate::weekday::DayToken;
use chrono::{NaiveDate, NaiveDateTime};
use log::{debug, warn};
use serde::Serialize;
use std::fmt;

/// Stamp format used by calendar deep links and `.ics` date-times.
pub const STAMP_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Which time field failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeField {
    Start,
    End,
}

impl fmt::Display for TimeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeField::Start => f.write_str("start"),
            TimeField::End => f.write_str("end"),
        }
    }
}

/// Why a draft could not be materialized. Always local to that one draft.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MaterializeError {
    #[error("missing start date")]
    MissingStartDate,
    #[error("no matching weekday occurrence")]
    NoMatchingWeekday,
    #[error("invalid time: {field} time '{value}'")]
    InvalidTime { field: TimeField, value: String },
}

/// A draft resolved into a concrete, timezone-tagged event instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaterializedOccurrence {
    pub title: String,
    pub first_occurrence_date: NaiveDate,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub timezone: String,
    pub recurrence_weekdays: Vec<DayToken>,
    /// Last date the meeting recurs on, when known
    pub until: Option<NaiveDate>,
}

impl MaterializedOccurrence {
    /// Start/end pair as `YYYYMMDDTHHMMSS`.
    pub fn calendar_stamps(&self) -> (String, String) {
        (
            self.start.format(STAMP_FORMAT).to_string(),
            self.end.format(STAMP_FORMAT).to_string(),
        )
    }

    /// Recognized weekdays as a comma-separated `BYDAY` value.
    pub fn byday(&self) -> String {
        self.recurrence_weekdays
            .iter()
            .filter_map(DayToken::weekday)
            .map(|code| code.as_code())
            .collect::<Vec<_>>()
            .join(",")
    }
}

fn parse_time_field(value: &str, field: TimeField) -> Result<ClockTime, MaterializeError> {
    parse_clock_time(value)
        .ok_or_else(|| MaterializeError::InvalidTime { field, value: value.to_string() })
}

/// Turn one draft into a [`MaterializedOccurrence`].
///
/// Pure: the same inputs always produce the same output.
pub fn materialize(
    draft: &ClassMeetingDraft,
    timezone: &str,
    window: &TermWindow,
) -> Result<MaterializedOccurrence, MaterializeError> {
    let term_start = window.start.map(|d| d.format(DATE_FORMAT).to_string());
    let effective_start = draft
        .start_override()
        .or(term_start.as_deref())
        .ok_or(MaterializeError::MissingStartDate)?;

    let weekdays = &draft.weekdays;

    let first = resolve_first_occurrence(effective_start, weekdays)
        .ok_or(MaterializeError::NoMatchingWeekday)?;

    let until = match draft.end_override() {
        Some(raw) => {
            let parsed = parse_date(raw);
            if parsed.is_none() {
                warn!("Ignoring unparseable end date '{}' on '{}'", raw, draft.display_title());
            }
            parsed.or(window.end)
        }
        None => window.end,
    };
    // the meeting never happens inside its own range
    if until.is_some_and(|end| first > end) {
        return Err(MaterializeError::NoMatchingWeekday);
    }

    let start_time = parse_time_field(&draft.start_time, TimeField::Start)?;
    let end_time = parse_time_field(&draft.end_time, TimeField::End)?;

    let occurrence = MaterializedOccurrence {
        title: draft.display_title().to_string(),
        first_occurrence_date: first,
        start: first.and_time(start_time.to_naive_time()),
        end: first.and_time(end_time.to_naive_time()),
        timezone: timezone.to_string(),
        recurrence_weekdays: weekdays.clone(),
        until,
    };
    debug!(
        "Materialized '{}' -> {} {}..{} ({})",
        occurrence.title, first, start_time, end_time, timezone
    );
    Ok(occurrence)
}

/// Outcome for one draft in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftOutcome {
    pub index: usize,
    pub result: Result<MaterializedOccurrence, MaterializeError>,
}

/// Serializable view of one outcome, for JSON output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeSummary {
    pub index: usize,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occurrence: Option<MaterializedOccurrence>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Results of materializing a whole draft list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterializeReport {
    pub outcomes: Vec<DraftOutcome>,
}

impl MaterializeReport {
    pub fn occurrences(&self) -> impl Iterator<Item = (usize, &MaterializedOccurrence)> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok().map(|occ| (o.index, occ)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (usize, &MaterializeError)> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().err().map(|err| (o.index, err)))
    }

    pub fn success_count(&self) -> usize {
        self.occurrences().count()
    }

    /// One summary per outcome, titled from the drafts the report was built from.
    pub fn summaries(&self, drafts: &[ClassMeetingDraft]) -> Vec<OutcomeSummary> {
        self.outcomes
            .iter()
            .map(|outcome| {
                let title = drafts
                    .get(outcome.index)
                    .map(|d| d.display_title().to_string())
                    .unwrap_or_default();
                let (occurrence, error) = match &outcome.result {
                    Ok(occ) => (Some(occ.clone()), None),
                    Err(e) => (None, Some(e.to_string())),
                };
                OutcomeSummary { index: outcome.index, title, occurrence, error }
            })
            .collect()
    }
}

/// Materialize every draft independently; one failure never stops the others.
pub fn materialize_all(
    drafts: &[ClassMeetingDraft],
    timezone: &str,
    window: &TermWindow,
) -> MaterializeReport {
    let outcomes = drafts
        .iter()
        .enumerate()
        .map(|(index, draft)| {
            let result = materialize(draft, timezone, window);
            if let Err(e) = &result {
                warn!("Skipping draft {} ('{}'): {}", index, draft.display_title(), e);
            }
            DraftOutcome { index, result }
        })
        .collect();
    MaterializeReport { outcomes }
}
