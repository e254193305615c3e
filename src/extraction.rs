//! Extraction-service boundary.
//!
//! The extraction service (OCR + field extraction, not part of this crate) hands
//! back loosely shaped JSON. This module accepts every shape it has been seen to
//! produce and turns the entries into raw [`ClassMeetingDraft`]s without
//! validating times or dates.

use crate::draft::{non_blank, ClassMeetingDraft};
use crate::weekday::{normalize_token, push_unique, DayToken, WeekdayCode, NON_ALPHA};
use chrono::NaiveDate;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Note attached to a response that lacks a usable term window.
pub const NEEDS_DATES_NOTE: &str = "Add the term's start and end dates before exporting to calendar.";

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Extraction payload is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("Unexpected extraction payload: {0}")]
    UnexpectedShape(String),
}

/// `days` arrives either as one string ("MWF", "Mon/Wed") or a list of strings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum DaysField {
    One(String),
    Many(Vec<String>),
}

/// One class entry exactly as the extraction service produced it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RawClassEntry {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub days: Option<DaysField>,
    /// Legacy single-day key
    #[serde(default)]
    pub day: Option<DaysField>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub instructor: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default, rename = "termLabel")]
    pub term_label: Option<String>,
}

impl RawClassEntry {
    pub fn into_draft(self) -> ClassMeetingDraft {
        let weekdays = match self.days.or(self.day) {
            Some(DaysField::One(text)) => extracted_days(&[text]),
            Some(DaysField::Many(list)) => extracted_days(&list),
            None => Vec::new(),
        };
        let clean = |v: Option<String>| non_blank(v.as_deref()).map(str::to_string);

        ClassMeetingDraft {
            title: self.title.map(|t| t.trim().to_string()).unwrap_or_default(),
            weekdays,
            start_time: self.start_time.unwrap_or_default(),
            end_time: self.end_time.unwrap_or_default(),
            location: clean(self.location),
            instructor: clean(self.instructor),
            notes: clean(self.notes),
            event_start_date: clean(self.start_date),
            event_end_date: clean(self.end_date),
            term_label: clean(self.term_label),
        }
    }
}

/// The extraction service response: drafts plus whatever context it inferred.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ExtractionResponse {
    #[serde(default)]
    pub events: Vec<RawClassEntry>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub inferred_start: Option<NaiveDate>,
    #[serde(default)]
    pub inferred_end: Option<NaiveDate>,
    #[serde(default)]
    pub needs_dates: bool,
    #[serde(default)]
    pub note: Option<String>,
}

impl ExtractionResponse {
    pub fn into_drafts(self) -> Vec<ClassMeetingDraft> {
        self.events.into_iter().map(RawClassEntry::into_draft).collect()
    }
}

/// Parse any known extraction payload shape.
///
/// Accepts a bare array of entries, a full response object, or an object with
/// the entries under `classes`, `events` or `items`.
pub fn parse_extraction_payload(json: &str) -> Result<ExtractionResponse, ExtractionError> {
    let value: Value = serde_json::from_str(json)?;

    let response = match value {
        Value::Array(items) => ExtractionResponse { events: entries_from(items)?, ..Default::default() },
        Value::Object(mut map) => {
            let list = ["classes", "events", "items"]
                .iter()
                .find_map(|key| map.remove(*key))
                .unwrap_or(Value::Array(Vec::new()));
            let Value::Array(items) = list else {
                return Err(ExtractionError::UnexpectedShape(
                    "expected a list under 'classes'/'events'/'items'".to_string(),
                ));
            };
            let mut response: ExtractionResponse = serde_json::from_value(Value::Object(map))?;
            response.events = entries_from(items)?;
            response
        }
        other => {
            return Err(ExtractionError::UnexpectedShape(format!(
                "expected a list or an object, got {}",
                other
            )))
        }
    };

    info!("Extraction payload contained {} class entries", response.events.len());
    Ok(response)
}

fn entries_from(items: Vec<Value>) -> Result<Vec<RawClassEntry>, ExtractionError> {
    let mut entries = Vec::with_capacity(items.len());
    for item in items {
        if !item.is_object() {
            warn!("Skipping non-object extraction entry: {}", item);
            continue;
        }
        entries.push(serde_json::from_value(item)?);
    }
    Ok(entries)
}

// Compact runs are tried digraph-first so "tuth" reads as Tu+Th, not T+U+T+H.
const COMPACT_DIGRAPHS: [(&str, WeekdayCode); 7] = [
    ("th", WeekdayCode::Th),
    ("tu", WeekdayCode::Tu),
    ("su", WeekdayCode::Su),
    ("sa", WeekdayCode::Sa),
    ("mo", WeekdayCode::Mo),
    ("we", WeekdayCode::We),
    ("fr", WeekdayCode::Fr),
];

const COMPACT_SINGLES: [(char, WeekdayCode); 4] = [
    ('m', WeekdayCode::Mo),
    ('t', WeekdayCode::Tu),
    ('w', WeekdayCode::We),
    ('f', WeekdayCode::Fr),
];

/// Expand a compact day run such as `mwf` or `tuth`.
///
/// Returns `None` unless every character is consumed by a known shorthand.
pub fn expand_compact_days(token: &str) -> Option<Vec<WeekdayCode>> {
    let lowered = token.trim().to_lowercase();
    if lowered.len() < 2 || !lowered.is_ascii() {
        return None;
    }

    let mut out = Vec::new();
    let mut rest = lowered.as_str();
    while !rest.is_empty() {
        if let Some((pattern, code)) = COMPACT_DIGRAPHS.iter().find(|(p, _)| rest.starts_with(p)) {
            out.push(*code);
            rest = &rest[pattern.len()..];
            continue;
        }
        let first = rest.chars().next()?;
        let (_, code) = COMPACT_SINGLES.iter().find(|(c, _)| *c == first)?;
        out.push(*code);
        rest = &rest[1..];
    }
    Some(out)
}

/// Day strings from the extraction service into tokens: table lookup, then
/// compact expansion, then the usual best-effort guess.
pub fn extracted_days<S: AsRef<str>>(raw: &[S]) -> Vec<DayToken> {
    let mut out = Vec::new();
    for text in raw {
        for piece in NON_ALPHA.split(text.as_ref()) {
            let lowered = piece.trim().to_lowercase();
            if lowered.is_empty() {
                continue;
            }
            if let Some(day) = crate::weekday::classify_token(&lowered) {
                push_unique(&mut out, day);
            } else if let Some(codes) = expand_compact_days(&lowered) {
                debug!("Expanded compact days '{}' -> {:?}", piece, codes);
                for code in codes {
                    push_unique(&mut out, DayToken::Known(code));
                }
            } else if let Some(day) = normalize_token(&lowered) {
                push_unique(&mut out, day);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn known(codes: &[WeekdayCode]) -> Vec<DayToken> {
        codes.iter().copied().map(DayToken::Known).collect()
    }

    #[test]
    fn test_compact_expansion() {
        use WeekdayCode::*;
        assert_eq!(expand_compact_days("MWF"), Some(vec![Mo, We, Fr]));
        assert_eq!(expand_compact_days("TuTh"), Some(vec![Tu, Th]));
        assert_eq!(expand_compact_days("TTh"), Some(vec![Tu, Th]));
        assert_eq!(expand_compact_days("MTWThF"), Some(vec![Mo, Tu, We, Th, Fr]));
        assert_eq!(expand_compact_days("xyz"), None);
        assert_eq!(expand_compact_days("M"), None);
    }

    #[test]
    fn test_extracted_days_shapes() {
        use WeekdayCode::*;
        assert_eq!(extracted_days(&["Mon/Wed/Fri"]), known(&[Mo, We, Fr]));
        assert_eq!(extracted_days(&["MWF"]), known(&[Mo, We, Fr]));
        assert_eq!(extracted_days(&["Tu", "Th", "tuesday"]), known(&[Tu, Th]));
        assert_eq!(extracted_days(&["Friday"]), known(&[Fr]));
        assert_eq!(extracted_days(&["Zzz"]), vec![DayToken::Unrecognized("ZZ".to_string())]);
    }

    #[test]
    fn test_bare_array_payload() {
        let json = r#"[
            {"title": "CS 4661", "days": "F", "start_time": "12:00PM", "end_time": "2:45PM", "location": "ASCB 132"},
            "noise",
            {"title": "Bio", "day": "Tue", "start_time": "9", "end_time": "10"}
        ]"#;
        let response = parse_extraction_payload(json).unwrap();
        assert_eq!(response.events.len(), 2);

        let drafts = response.into_drafts();
        assert_eq!(drafts[0].location.as_deref(), Some("ASCB 132"));
        assert_eq!(drafts[0].weekdays, known(&[WeekdayCode::Fr]));
        assert_eq!(drafts[1].weekdays, known(&[WeekdayCode::Tu]));
    }

    #[test]
    fn test_full_response_payload() {
        let json = r#"{
            "events": [{"title": "Calc I", "days": ["MO", "WE", "FR"], "start_time": "9", "end_time": "9:50", "termLabel": "Winter"}],
            "timezone": "America/Los_Angeles",
            "inferred_start": "2024-01-08",
            "needs_dates": true,
            "note": "Add dates"
        }"#;
        let response = parse_extraction_payload(json).unwrap();
        assert_eq!(response.timezone.as_deref(), Some("America/Los_Angeles"));
        assert_eq!(response.inferred_start, NaiveDate::from_ymd_opt(2024, 1, 8));
        assert!(response.needs_dates);

        let drafts = response.into_drafts();
        assert_eq!(drafts[0].term_label.as_deref(), Some("Winter"));
        assert_eq!(drafts[0].start_time, "9");
    }

    #[test]
    fn test_legacy_classes_key() {
        let json = r#"{"classes": [{"title": " Chem ", "days": "TuTh"}]}"#;
        let drafts = parse_extraction_payload(json).unwrap().into_drafts();
        assert_eq!(drafts[0].title, "Chem");
        assert_eq!(drafts[0].weekdays, known(&[WeekdayCode::Tu, WeekdayCode::Th]));
        // Times stay blank until the user fills them in
        assert!(drafts[0].start_time.is_empty());
    }

    #[test]
    fn test_rejects_other_shapes() {
        assert!(matches!(parse_extraction_payload("42"), Err(ExtractionError::UnexpectedShape(_))));
        assert!(matches!(
            parse_extraction_payload(r#"{"classes": "MWF"}"#),
            Err(ExtractionError::UnexpectedShape(_))
        ));
        assert!(matches!(parse_extraction_payload("{"), Err(ExtractionError::InvalidJson(_))));
    }
}
