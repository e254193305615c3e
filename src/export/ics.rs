use super::{event_description, resolve_timezone, ExportError};
use crate::draft::{ClassMeetingDraft, TermWindow};
use crate::materialize::{materialize, MaterializedOccurrence, STAMP_FORMAT};
use crate::occurrence::parse_date;
use crate::term::resolve_export_window;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use log::{debug, info, warn};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

pub const DEFAULT_CALENDAR_NAME: &str = "Class Schedule";
const PRODID: &str = "-//Schedulify//Class Sync//EN";
const MAX_LINE_OCTETS: usize = 75;

/// A draft left out of the calendar file, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDraft {
    pub index: usize,
    pub title: String,
    pub reason: String,
}

/// Serialized calendar plus what did not make it in.
#[derive(Debug, Clone)]
pub struct IcsExport {
    pub content: String,
    pub event_count: usize,
    pub skipped: Vec<SkippedDraft>,
}

impl IcsExport {
    pub fn write_to(&self, path: &Path) -> Result<(), ExportError> {
        fs::write(path, &self.content)?;
        info!("Wrote {} events to {}", self.event_count, path.display());
        Ok(())
    }
}

/// Builds an RFC 5545 calendar with one weekly-recurring event per draft.
pub struct IcsBuilder {
    calendar_name: String,
    timezone_name: String,
    timezone: Tz,
    generated_at: DateTime<Utc>,
}

impl IcsBuilder {
    pub fn new(timezone: &str) -> Result<Self, ExportError> {
        Ok(Self {
            calendar_name: DEFAULT_CALENDAR_NAME.to_string(),
            timezone_name: timezone.trim().to_string(),
            timezone: resolve_timezone(timezone)?,
            generated_at: Utc::now(),
        })
    }

    pub fn calendar_name(mut self, name: impl Into<String>) -> Self {
        self.calendar_name = name.into();
        self
    }

    /// Fix the DTSTAMP instead of using the current time.
    pub fn generated_at(mut self, at: DateTime<Utc>) -> Self {
        self.generated_at = at;
        self
    }

    /// Serialize `drafts` for the term `start..=end`.
    ///
    /// Per-event date overrides narrow the window for that event. Drafts that
    /// cannot be materialized, or never meet inside their range, are skipped.
    /// A per-event start after its end rejects the whole export.
    pub fn build(
        &self,
        drafts: &[ClassMeetingDraft],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<IcsExport, ExportError> {
        let mut out = String::new();
        self.write_header(&mut out);

        let mut event_count = 0;
        let mut skipped = Vec::new();
        for (index, draft) in drafts.iter().enumerate() {
            let event_start = draft.start_override().and_then(parse_date).unwrap_or(start);
            let event_end = draft.end_override().and_then(parse_date).unwrap_or(end);
            if event_start > event_end {
                return Err(ExportError::InvalidRange { title: draft.display_title().to_string() });
            }

            match self.event_for(draft, event_start, event_end) {
                Ok(occurrence) => {
                    self.write_event(&mut out, draft, &occurrence);
                    event_count += 1;
                }
                Err(reason) => {
                    warn!("Leaving '{}' out of the calendar: {}", draft.display_title(), reason);
                    skipped.push(SkippedDraft {
                        index,
                        title: draft.display_title().to_string(),
                        reason,
                    });
                }
            }
        }

        push_line(&mut out, "END:VCALENDAR");
        debug!("Built calendar with {} events, {} skipped", event_count, skipped.len());
        Ok(IcsExport { content: out, event_count, skipped })
    }

    fn event_for(
        &self,
        draft: &ClassMeetingDraft,
        event_start: NaiveDate,
        event_end: NaiveDate,
    ) -> Result<MaterializedOccurrence, String> {
        let window = TermWindow::new(Some(event_start), Some(event_end));
        materialize(draft, &self.timezone_name, &window).map_err(|e| e.to_string())
    }

    fn write_header(&self, out: &mut String) {
        push_line(out, "BEGIN:VCALENDAR");
        push_line(out, &format!("PRODID:{}", PRODID));
        push_line(out, "VERSION:2.0");
        push_line(out, "CALSCALE:GREGORIAN");
        push_line(out, "METHOD:PUBLISH");
        push_line(out, &format!("X-WR-CALNAME:{}", escape_text(&self.calendar_name)));
        push_line(out, &format!("X-WR-TIMEZONE:{}", self.timezone_name));
    }

    fn write_event(&self, out: &mut String, draft: &ClassMeetingDraft, occ: &MaterializedOccurrence) {
        let (start, end) = occ.calendar_stamps();
        let tzid = &self.timezone_name;

        push_line(out, "BEGIN:VEVENT");
        push_line(out, &format!("UID:{}", event_uid(occ)));
        push_line(out, &format!("DTSTAMP:{}", self.generated_at.format("%Y%m%dT%H%M%SZ")));
        push_line(out, &format!("DTSTART;TZID={}:{}", tzid, start));
        push_line(out, &format!("DTEND;TZID={}:{}", tzid, end));
        push_line(out, &format!("SUMMARY:{}", escape_text(&occ.title)));
        if let Some(location) = &draft.location {
            push_line(out, &format!("LOCATION:{}", escape_text(location)));
        }
        if let Some(description) = event_description(draft) {
            push_line(out, &format!("DESCRIPTION:{}", escape_text(&description)));
        }
        push_line(out, &format!("RRULE:{}", weekly_rrule(occ, self.timezone)));
        push_line(out, "END:VEVENT");
    }
}

/// Resolve the term window and serialize `drafts` in one go.
pub fn export_calendar(
    drafts: &[ClassMeetingDraft],
    timezone: &str,
    explicit: &TermWindow,
    calendar_name: &str,
) -> Result<IcsExport, ExportError> {
    let builder = IcsBuilder::new(timezone)?.calendar_name(calendar_name);
    let (start, end) = resolve_export_window(drafts, explicit)?;
    builder.build(drafts, start, end)
}

/// `FREQ=WEEKLY;BYDAY=..;UNTIL=..` with UNTIL at the end of the last day, in UTC.
pub fn weekly_rrule(occ: &MaterializedOccurrence, timezone: Tz) -> String {
    let mut rule = String::from("FREQ=WEEKLY");
    let byday = occ.byday();
    if !byday.is_empty() {
        let _ = write!(rule, ";BYDAY={}", byday);
    }
    if let Some(until) = occ.until {
        let _ = write!(rule, ";UNTIL={}", until_utc(until, timezone).format("%Y%m%dT%H%M%SZ"));
    }
    rule
}

/// 23:59:59 local on `date`, converted to UTC.
pub fn until_utc(date: NaiveDate, timezone: Tz) -> DateTime<Utc> {
    let last_second = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
    let local = date.and_time(last_second);
    // no room to shift by an offset at either end of the calendar
    if date.succ_opt().is_none() || date.pred_opt().is_none() {
        return Utc.from_utc_datetime(&local);
    }
    match timezone.from_local_datetime(&local).earliest() {
        Some(dt) => dt.with_timezone(&Utc),
        None => Utc.from_utc_datetime(&local),
    }
}

fn event_uid(occ: &MaterializedOccurrence) -> String {
    let mut hasher = Sha256::new();
    hasher.update(occ.title.as_bytes());
    hasher.update(occ.start.format(STAMP_FORMAT).to_string().as_bytes());
    hasher.update(occ.byday().as_bytes());
    let digest = hasher.finalize();

    let mut uid = String::with_capacity(48);
    for byte in digest.iter().take(16) {
        let _ = write!(uid, "{:02x}", byte);
    }
    uid.push_str("@schedulify");
    uid
}

pub(crate) fn escape_text(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace(',', "\\,")
        .replace(';', "\\;")
}

/// Append a content line, folded at 75 octets without splitting characters.
fn push_line(out: &mut String, line: &str) {
    let mut width = 0;
    for ch in line.chars() {
        let len = ch.len_utf8();
        if width + len > MAX_LINE_OCTETS {
            out.push_str("\r\n ");
            width = 1;
        }
        out.push(ch);
        width += len;
    }
    out.push_str("\r\n");
}
