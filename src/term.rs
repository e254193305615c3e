//! Term window inference and resolution.

use crate::draft::{ClassMeetingDraft, TermWindow};
use crate::occurrence::{parse_date, DATE_FORMAT};
use chrono::{Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use log::{debug, warn};

/// Span assumed when only one end of the term is known.
pub const DEFAULT_TERM_WEEKS: i64 = 5;
/// Longest span `default_term_weeks` may ask for.
pub const MAX_TERM_WEEKS: i64 = 104;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WindowError {
    #[error("Provide start_date and end_date (either globally or per event).")]
    MissingBounds,
    #[error("start_date must be before end_date.")]
    StartAfterEnd,
}

/// Today's date in `timezone`, falling back to UTC for unknown zones.
pub fn today_in(timezone: &str) -> NaiveDate {
    let now = Utc::now();
    match timezone.parse::<Tz>() {
        Ok(tz) => now.with_timezone(&tz).date_naive(),
        Err(_) => now.date_naive(),
    }
}

/// Fill in whichever end of the term is missing with a `weeks`-long span.
///
/// With neither end known the window starts on `today`. `weeks` is clamped to
/// `1..=MAX_TERM_WEEKS`; an end that would fall outside the calendar stays unset.
pub fn infer_term_window(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    weeks: i64,
    today: NaiveDate,
) -> TermWindow {
    let clamped = weeks.clamp(1, MAX_TERM_WEEKS);
    if clamped != weeks {
        warn!("Term length of {} weeks is out of range, using {}", weeks, clamped);
    }
    let span = Duration::days(clamped * 7 - 1);
    let window = match (start, end) {
        (Some(s), Some(e)) => TermWindow::new(Some(s), Some(e)),
        (Some(s), None) => TermWindow::new(Some(s), s.checked_add_signed(span)),
        (None, Some(e)) => TermWindow::new(e.checked_sub_signed(span), Some(e)),
        (None, None) => TermWindow::new(Some(today), today.checked_add_signed(span)),
    };
    if window.is_complete() {
        debug!("Inferred term window {:?}..{:?}", window.start, window.end);
    } else {
        warn!("Term window {:?}..{:?} runs past the calendar limits", window.start, window.end);
    }
    window
}

/// Copy term bounds onto drafts that have no per-event bounds of their own.
pub fn apply_global_dates(drafts: &mut [ClassMeetingDraft], window: &TermWindow) {
    for draft in drafts.iter_mut() {
        let has_start = draft.start_override().is_some();
        let has_end = draft.end_override().is_some();
        if let (Some(start), false) = (window.start, has_start) {
            draft.event_start_date = Some(start.format(DATE_FORMAT).to_string());
        }
        if let (Some(end), false) = (window.end, has_end) {
            draft.event_end_date = Some(end.format(DATE_FORMAT).to_string());
        }
    }
}

fn override_dates<'a>(
    drafts: &'a [ClassMeetingDraft],
    pick: fn(&'a ClassMeetingDraft) -> Option<&'a str>,
) -> impl Iterator<Item = NaiveDate> + 'a {
    drafts.iter().filter_map(move |d| pick(d).and_then(parse_date))
}

/// Term window implied by the drafts' own bounds: earliest start, latest end.
pub fn window_from_drafts(drafts: &[ClassMeetingDraft]) -> TermWindow {
    TermWindow::new(
        override_dates(drafts, ClassMeetingDraft::start_override).min(),
        override_dates(drafts, ClassMeetingDraft::end_override).max(),
    )
}

/// Window for a calendar export: explicit bounds win, else the drafts' bounds.
pub fn resolve_export_window(
    drafts: &[ClassMeetingDraft],
    explicit: &TermWindow,
) -> Result<(NaiveDate, NaiveDate), WindowError> {
    let implied = window_from_drafts(drafts);
    let start = explicit.start.or(implied.start).ok_or(WindowError::MissingBounds)?;
    let end = explicit.end.or(implied.end).ok_or(WindowError::MissingBounds)?;
    if start > end {
        return Err(WindowError::StartAfterEnd);
    }
    Ok((start, end))
}

/// True when no full term window can be formed from the inputs.
pub fn needs_dates(drafts: &[ClassMeetingDraft], explicit: &TermWindow) -> bool {
    if explicit.is_complete() {
        return false;
    }
    let implied = window_from_drafts(drafts);
    explicit.start.or(implied.start).is_none() || explicit.end.or(implied.end).is_none()
}
