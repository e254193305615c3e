use super::{event_description, resolve_timezone, weekly_rrule};
use chrono_tz::Tz;
use crate::draft::{ClassMeetingDraft, TermWindow};
use crate::materialize::{materialize, MaterializeError, MaterializedOccurrence};
use serde::Serialize;
use url::form_urlencoded;

pub const GOOGLE_CALENDAR_RENDER_URL: &str = "https://calendar.google.com/calendar/render";

/// Google Calendar "create event" link for one materialized draft.
///
/// The first occurrence is the event; the weekly pattern rides along in
/// `recur` so the calendar offers a repeating event.
pub fn google_calendar_link(draft: &ClassMeetingDraft, occ: &MaterializedOccurrence) -> String {
    let (start, end) = occ.calendar_stamps();
    let dates = format!("{}/{}", start, end);

    let mut query = form_urlencoded::Serializer::new(String::new());
    query.append_pair("action", "TEMPLATE");
    query.append_pair("text", &occ.title);
    query.append_pair("dates", &dates);
    if let Some(details) = event_description(draft) {
        query.append_pair("details", &details);
    }
    if let Some(location) = &draft.location {
        query.append_pair("location", location);
    }
    query.append_pair("ctz", &occ.timezone);
    if let Some(rule) = recurrence_rule(occ) {
        query.append_pair("recur", &rule);
    }

    format!("{}?{}", GOOGLE_CALENDAR_RENDER_URL, query.finish())
}

fn recurrence_rule(occ: &MaterializedOccurrence) -> Option<String> {
    let byday = occ.byday();
    if byday.is_empty() {
        return None;
    }
    // UNTIL is the last local second of the final day, expressed in UTC
    let timezone = resolve_timezone(&occ.timezone).unwrap_or(Tz::UTC);
    Some(format!("RRULE:{}", weekly_rrule(occ, timezone)))
}

/// A link, or the reason there is none, for one draft.
#[derive(Debug, Clone, Serialize)]
pub struct CalendarLink {
    pub index: usize,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CalendarLink {
    fn from_result(index: usize, draft: &ClassMeetingDraft, result: Result<String, MaterializeError>) -> Self {
        let title = draft.display_title().to_string();
        match result {
            Ok(url) => Self { index, title, url: Some(url), error: None },
            Err(e) => Self { index, title, url: None, error: Some(e.to_string()) },
        }
    }
}

pub fn calendar_links(drafts: &[ClassMeetingDraft], timezone: &str, window: &TermWindow) -> Vec<CalendarLink> {
    drafts
        .iter()
        .enumerate()
        .map(|(index, draft)| {
            let result = materialize(draft, timezone, window).map(|occ| google_calendar_link(draft, &occ));
            CalendarLink::from_result(index, draft, result)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weekday::{DayToken, WeekdayCode};
    use chrono::NaiveDate;

    fn window() -> TermWindow {
        TermWindow::new(NaiveDate::from_ymd_opt(2024, 1, 8), NaiveDate::from_ymd_opt(2024, 3, 15))
    }

    fn lab() -> ClassMeetingDraft {
        ClassMeetingDraft {
            title: "Bio Lab".to_string(),
            weekdays: vec![DayToken::Known(WeekdayCode::Tu), DayToken::Known(WeekdayCode::Th)],
            start_time: "1:30pm".to_string(),
            end_time: "3pm".to_string(),
            location: Some("Sci 101".to_string()),
            ..ClassMeetingDraft::default()
        }
    }

    #[test]
    fn test_link_fields() {
        let occ = materialize(&lab(), "America/Chicago", &window()).unwrap();
        let link = google_calendar_link(&lab(), &occ);

        assert!(link.starts_with("https://calendar.google.com/calendar/render?action=TEMPLATE&"));
        assert!(link.contains("text=Bio+Lab"));
        assert!(link.contains("dates=20240109T133000%2F20240109T150000"));
        assert!(link.contains("location=Sci+101"));
        assert!(link.contains("ctz=America%2FChicago"));
        assert!(link.contains("recur=RRULE%3AFREQ%3DWEEKLY%3BBYDAY%3DTU%2CTH%3BUNTIL%3D20240316T045959Z"));
        assert!(!link.contains("details="));
    }

    #[test]
    fn test_until_in_utc_zone() {
        let occ = materialize(&lab(), "UTC", &window()).unwrap();
        let link = google_calendar_link(&lab(), &occ);
        assert!(link.contains("UNTIL%3D20240315T235959Z"));
    }

    #[test]
    fn test_links_keep_going_past_failures() {
        let mut broken = lab();
        broken.start_time = String::new();
        let links = calendar_links(&[broken, lab()], "UTC", &window());

        assert_eq!(links.len(), 2);
        assert!(links[0].url.is_none());
        assert_eq!(links[0].error.as_deref(), Some("invalid time: start time ''"));
        assert!(links[1].url.is_some());
    }
}
