use chrono::{NaiveDate, NaiveTime};
use pretty_assertions::assert_eq;
use schedulify::{
    first_occurrence_on_or_after, materialize, materialize_all, normalize_day_tokens, parse_clock_time,
    ClassMeetingDraft, DayToken, DraftEditor, DraftField, MaterializeError, TermWindow, WeekdayCode,
};
use test_case::test_case;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn days(codes: &[WeekdayCode]) -> Vec<DayToken> {
    codes.iter().copied().map(DayToken::Known).collect()
}

#[test_case("Mon", WeekdayCode::Mo)]
#[test_case("monday", WeekdayCode::Mo)]
#[test_case("M", WeekdayCode::Mo)]
#[test_case("Wed", WeekdayCode::We)]
#[test_case("W", WeekdayCode::We)]
#[test_case("Thu", WeekdayCode::Th)]
#[test_case("Th", WeekdayCode::Th)]
#[test_case("T", WeekdayCode::Tu)]
#[test_case("Sa", WeekdayCode::Sa)]
#[test_case("Su", WeekdayCode::Su)]
fn well_formed_day_tokens(input: &str, expected: WeekdayCode) {
    assert_eq!(normalize_day_tokens(input), days(&[expected]));
}

#[test]
fn duplicate_days_collapse_in_first_seen_order() {
    use WeekdayCode::*;
    assert_eq!(normalize_day_tokens("Fri, mon; Friday / M / wed"), days(&[Fr, Mo, We]));
    assert!(normalize_day_tokens(" ,;/ ").is_empty());
}

#[test_case("9:30 PM", 21, 30)]
#[test_case("12:00 AM", 0, 0)]
#[test_case("12:30 PM", 12, 30)]
#[test_case("09:05", 9, 5)]
#[test_case("9", 9, 0)]
fn valid_clock_times(input: &str, hour: u32, minute: u32) {
    let time = parse_clock_time(input).unwrap();
    assert_eq!((time.hour(), time.minute()), (hour, minute));
}

#[test_case("25:00")]
#[test_case("13:60 PM")]
#[test_case("")]
#[test_case("abc")]
fn invalid_clock_times(input: &str) {
    assert_eq!(parse_clock_time(input), None);
}

#[test]
fn first_occurrence_examples() {
    use WeekdayCode::*;
    assert_eq!(first_occurrence_on_or_after(date(2024, 1, 1), &days(&[Mo, We])), Some(date(2024, 1, 1)));
    assert_eq!(first_occurrence_on_or_after(date(2024, 1, 2), &days(&[Mo])), Some(date(2024, 1, 8)));
    assert_eq!(first_occurrence_on_or_after(date(2024, 1, 2), &[]), None);
}

#[test]
fn calc_one_end_to_end() {
    use WeekdayCode::*;
    let draft = ClassMeetingDraft {
        title: "Calc I".to_string(),
        weekdays: days(&[Mo, We, Fr]),
        start_time: "9".to_string(),
        end_time: "9:50".to_string(),
        ..ClassMeetingDraft::default()
    };
    let window = TermWindow::new(Some(date(2024, 1, 8)), None);

    let occ = materialize(&draft, "America/Los_Angeles", &window).unwrap();
    assert_eq!(occ.first_occurrence_date, date(2024, 1, 8));
    assert_eq!(occ.start, date(2024, 1, 8).and_time(NaiveTime::from_hms_opt(9, 0, 0).unwrap()));
    assert_eq!(occ.end, date(2024, 1, 8).and_time(NaiveTime::from_hms_opt(9, 50, 0).unwrap()));

    // Same inputs, same output
    assert_eq!(materialize(&draft, "America/Los_Angeles", &window), Ok(occ));
}

#[test]
fn no_start_date_anywhere_is_no_result() {
    let draft = ClassMeetingDraft {
        weekdays: days(&[WeekdayCode::Tu]),
        start_time: "10".to_string(),
        end_time: "11".to_string(),
        ..ClassMeetingDraft::default()
    };
    assert_eq!(materialize(&draft, "UTC", &TermWindow::default()), Err(MaterializeError::MissingStartDate));
}

#[test]
fn editor_changes_flow_into_materialization() {
    let mut editor = DraftEditor::new();
    let index = editor.add_empty();
    editor.update(index, DraftField::parse("title", "Physics").unwrap()).unwrap();
    editor.update(index, DraftField::parse("days", "Tue/Thu").unwrap()).unwrap();
    editor.update(index, DraftField::parse("start", "2:00 pm").unwrap()).unwrap();
    editor.update(index, DraftField::parse("end", "3:15 pm").unwrap()).unwrap();

    let window = TermWindow::new(Some(date(2024, 1, 8)), Some(date(2024, 3, 15)));
    let report = materialize_all(editor.drafts(), "America/New_York", &window);
    assert_eq!(report.success_count(), 1);

    let (_, occ) = report.occurrences().next().unwrap();
    assert_eq!(occ.title, "Physics");
    assert_eq!(occ.first_occurrence_date, date(2024, 1, 9));
    assert_eq!(occ.byday(), "TU,TH");

    editor.update(index, DraftField::parse("end", "3:75").unwrap()).unwrap();
    let report = materialize_all(editor.drafts(), "America/New_York", &window);
    assert_eq!(report.success_count(), 0);
}
