//! Class-meeting drafts and the editor that owns them.
//
// A draft may be incomplete while the user is editing it, so nothing here
// validates times or dates. That happens lazily when a draft is materialized.

use crate::weekday::{deserialize_day_list, normalize_day_tokens, DayToken};
use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};

/// Label used when a draft has no usable title.
pub const DEFAULT_TITLE: &str = "Class";

/// One recurring class session as currently understood by the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassMeetingDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default, rename = "days", deserialize_with = "deserialize_day_list")]
    pub weekdays: Vec<DayToken>,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, rename = "start_date", skip_serializing_if = "Option::is_none")]
    pub event_start_date: Option<String>,
    #[serde(default, rename = "end_date", skip_serializing_if = "Option::is_none")]
    pub event_end_date: Option<String>,
    #[serde(default, rename = "termLabel", skip_serializing_if = "Option::is_none")]
    pub term_label: Option<String>,
}

impl ClassMeetingDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into(), ..Self::default() }
    }

    /// Title to show or export, falling back to [`DEFAULT_TITLE`].
    pub fn display_title(&self) -> &str {
        let trimmed = self.title.trim();
        if trimmed.is_empty() {
            DEFAULT_TITLE
        } else {
            trimmed
        }
    }

    /// Per-event start override, if present and non-blank.
    pub fn start_override(&self) -> Option<&str> {
        non_blank(self.event_start_date.as_deref())
    }

    /// Per-event end override, if present and non-blank.
    pub fn end_override(&self) -> Option<&str> {
        non_blank(self.event_end_date.as_deref())
    }

    /// True when some day token is only a guess.
    pub fn has_unrecognized_days(&self) -> bool {
        self.weekdays.iter().any(|day| !day.is_recognized())
    }
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Term-wide date range used when a draft has no override.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermWindow {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl TermWindow {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn is_complete(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }
}

/// A single field-level edit.
#[derive(Debug, Clone, PartialEq)]
pub enum DraftField {
    Title(String),
    /// Free text, normalized into day tokens on the way in
    Days(String),
    StartTime(String),
    EndTime(String),
    Location(Option<String>),
    Instructor(Option<String>),
    Notes(Option<String>),
    StartDate(Option<String>),
    EndDate(Option<String>),
    TermLabel(Option<String>),
}

impl DraftField {
    /// Build an edit from a field name and raw value, as typed in the editor.
    ///
    /// A blank value clears optional fields.
    pub fn parse(name: &str, value: &str) -> Result<Self, EditorError> {
        let optional = || non_blank(Some(value)).map(str::to_string);
        let field = match name.trim().to_lowercase().as_str() {
            "title" => DraftField::Title(value.to_string()),
            "days" | "day" | "weekdays" => DraftField::Days(value.to_string()),
            "start" | "start_time" => DraftField::StartTime(value.to_string()),
            "end" | "end_time" => DraftField::EndTime(value.to_string()),
            "location" | "room" => DraftField::Location(optional()),
            "instructor" => DraftField::Instructor(optional()),
            "notes" => DraftField::Notes(optional()),
            "start_date" | "from" => DraftField::StartDate(optional()),
            "end_date" | "until" => DraftField::EndDate(optional()),
            "term" | "term_label" => DraftField::TermLabel(optional()),
            other => return Err(EditorError::UnknownField(other.to_string())),
        };
        Ok(field)
    }

    fn apply(self, draft: &mut ClassMeetingDraft) {
        match self {
            DraftField::Title(v) => draft.title = v,
            DraftField::Days(v) => draft.weekdays = normalize_day_tokens(&v),
            DraftField::StartTime(v) => draft.start_time = v,
            DraftField::EndTime(v) => draft.end_time = v,
            DraftField::Location(v) => draft.location = v,
            DraftField::Instructor(v) => draft.instructor = v,
            DraftField::Notes(v) => draft.notes = v,
            DraftField::StartDate(v) => draft.event_start_date = v,
            DraftField::EndDate(v) => draft.event_end_date = v,
            DraftField::TermLabel(v) => draft.term_label = v,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EditorError {
    #[error("No draft at position {index} (have {len})")]
    NoSuchDraft { index: usize, len: usize },
    #[error("Unknown draft field: {0}")]
    UnknownField(String),
}

/// Owns the editable list of drafts. Single writer; every mutation is visible
/// to the next materialization.
#[derive(Debug, Clone, Default)]
pub struct DraftEditor {
    drafts: Vec<ClassMeetingDraft>,
}

impl DraftEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_drafts(drafts: Vec<ClassMeetingDraft>) -> Self {
        Self { drafts }
    }

    pub fn drafts(&self) -> &[ClassMeetingDraft] {
        &self.drafts
    }

    pub fn get(&self, index: usize) -> Option<&ClassMeetingDraft> {
        self.drafts.get(index)
    }

    pub fn len(&self) -> usize {
        self.drafts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }

    /// Append a blank draft and return its index.
    pub fn add_empty(&mut self) -> usize {
        self.push(ClassMeetingDraft::default())
    }

    pub fn push(&mut self, draft: ClassMeetingDraft) -> usize {
        self.drafts.push(draft);
        debug!("Draft list now has {} entries", self.drafts.len());
        self.drafts.len() - 1
    }

    pub fn update(&mut self, index: usize, field: DraftField) -> Result<(), EditorError> {
        let len = self.drafts.len();
        let draft = self.drafts.get_mut(index).ok_or(EditorError::NoSuchDraft { index, len })?;
        debug!("Updating draft {}: {:?}", index, field);
        field.apply(draft);
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<ClassMeetingDraft, EditorError> {
        let len = self.drafts.len();
        if index >= len {
            return Err(EditorError::NoSuchDraft { index, len });
        }
        Ok(self.drafts.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weekday::WeekdayCode;

    #[test]
    fn test_display_title_fallback() {
        assert_eq!(ClassMeetingDraft::new("  ").display_title(), DEFAULT_TITLE);
        assert_eq!(ClassMeetingDraft::new(" Calc I ").display_title(), "Calc I");
    }

    #[test]
    fn test_blank_overrides_are_absent() {
        let mut draft = ClassMeetingDraft::new("Bio");
        draft.event_start_date = Some("   ".to_string());
        draft.event_end_date = Some("2024-05-01".to_string());
        assert_eq!(draft.start_override(), None);
        assert_eq!(draft.end_override(), Some("2024-05-01"));
    }

    #[test]
    fn test_editor_add_update_remove() {
        let mut editor = DraftEditor::new();
        let idx = editor.add_empty();
        assert_eq!(idx, 0);

        editor.update(idx, DraftField::Title("Chem".to_string())).unwrap();
        editor.update(idx, DraftField::Days("Tue/Thurs, tue".to_string())).unwrap();
        editor.update(idx, DraftField::Location(Some("Room 5".to_string()))).unwrap();

        let draft = editor.get(idx).unwrap();
        assert_eq!(draft.title, "Chem");
        assert_eq!(
            draft.weekdays,
            vec![DayToken::Known(WeekdayCode::Tu), DayToken::Known(WeekdayCode::Th)]
        );
        assert_eq!(draft.location.as_deref(), Some("Room 5"));

        let removed = editor.remove(idx).unwrap();
        assert_eq!(removed.title, "Chem");
        assert!(editor.is_empty());
    }

    #[test]
    fn test_out_of_range_index() {
        let mut editor = DraftEditor::new();
        assert_eq!(
            editor.update(3, DraftField::Title("x".to_string())),
            Err(EditorError::NoSuchDraft { index: 3, len: 0 })
        );
        assert!(editor.remove(0).is_err());
    }

    #[test]
    fn test_field_parse() {
        assert_eq!(
            DraftField::parse("start", "9:30").unwrap(),
            DraftField::StartTime("9:30".to_string())
        );
        assert_eq!(DraftField::parse("Location", "  ").unwrap(), DraftField::Location(None));
        assert!(matches!(DraftField::parse("color", "red"), Err(EditorError::UnknownField(_))));
    }

    #[test]
    fn test_draft_json_shape() {
        let json = r#"{"title":"Calc I","days":["MO","WE"],"start_time":"9","end_time":"9:50","start_date":"2024-01-08"}"#;
        let draft: ClassMeetingDraft = serde_json::from_str(json).unwrap();
        assert_eq!(draft.weekdays.len(), 2);
        assert_eq!(draft.start_override(), Some("2024-01-08"));
        assert!(draft.location.is_none());
    }

    #[test]
    fn test_draft_days_are_normalized() {
        let json = r#"{"title":"Bio","days":["Mon/Wed","mon"],"start_time":"9","end_time":"10"}"#;
        let draft: ClassMeetingDraft = serde_json::from_str(json).unwrap();
        assert_eq!(draft.weekdays, vec![DayToken::Known(WeekdayCode::Mo), DayToken::Known(WeekdayCode::We)]);

        let json = r#"{"title":"Bio","days":"Tue, Thu"}"#;
        let draft: ClassMeetingDraft = serde_json::from_str(json).unwrap();
        assert_eq!(draft.weekdays, vec![DayToken::Known(WeekdayCode::Tu), DayToken::Known(WeekdayCode::Th)]);
    }
}
