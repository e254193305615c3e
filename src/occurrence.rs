//! First-occurrence resolution: the soonest meeting on or after a window start.

use crate::weekday::DayToken;
use chrono::{Datelike, Days, NaiveDate};
use log::debug;

/// Date format used for every date that crosses a boundary as text.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a `YYYY-MM-DD` date, ignoring surrounding whitespace.
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT).ok()
}

/// Earliest date on or after `start` whose weekday is in `weekdays`.
///
/// Unrecognized tokens are ignored. Returns `None` when no recognized weekday
/// remains, or when every candidate lies past the last representable date.
pub fn first_occurrence_on_or_after(start: NaiveDate, weekdays: &[DayToken]) -> Option<NaiveDate> {
    let start_index = start.weekday().num_days_from_sunday() as i64;

    weekdays
        .iter()
        .filter_map(DayToken::weekday)
        .filter_map(|target| {
            let offset = (target.index() as i64 - start_index + 7) % 7;
            start.checked_add_days(Days::new(offset as u64))
        })
        .min()
}

/// Same as [`first_occurrence_on_or_after`] but takes the window start as text.
pub fn resolve_first_occurrence(window_start: &str, weekdays: &[DayToken]) -> Option<NaiveDate> {
    let Some(start) = parse_date(window_start) else {
        debug!("Unparseable window start '{}'", window_start);
        return None;
    };
    first_occurrence_on_or_after(start, weekdays)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weekday::WeekdayCode;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn days(codes: &[WeekdayCode]) -> Vec<DayToken> {
        codes.iter().copied().map(DayToken::Known).collect()
    }

    #[test]
    fn test_start_day_itself_matches() {
        // 2024-01-01 is a Monday
        let found = first_occurrence_on_or_after(
            date(2024, 1, 1),
            &days(&[WeekdayCode::Mo, WeekdayCode::We]),
        );
        assert_eq!(found, Some(date(2024, 1, 1)));
    }

    #[test]
    fn test_wraps_to_next_week() {
        // 2024-01-02 is a Tuesday, next Monday is six days later
        let found = first_occurrence_on_or_after(date(2024, 1, 2), &days(&[WeekdayCode::Mo]));
        assert_eq!(found, Some(date(2024, 1, 8)));
    }

    #[test]
    fn test_picks_soonest_not_first_listed() {
        let found = first_occurrence_on_or_after(
            date(2024, 1, 3),
            &days(&[WeekdayCode::Mo, WeekdayCode::Fr, WeekdayCode::Th]),
        );
        assert_eq!(found, Some(date(2024, 1, 4)));
    }

    #[test]
    fn test_empty_or_unrecognized_set() {
        assert_eq!(first_occurrence_on_or_after(date(2024, 1, 1), &[]), None);
        let guesses = vec![DayToken::Unrecognized("MW".to_string())];
        assert_eq!(first_occurrence_on_or_after(date(2024, 1, 1), &guesses), None);
    }

    #[test]
    fn test_text_window_start() {
        let mo = days(&[WeekdayCode::Mo]);
        assert_eq!(resolve_first_occurrence(" 2024-01-02 ", &mo), Some(date(2024, 1, 8)));
        assert_eq!(resolve_first_occurrence("01/02/2024", &mo), None);
        assert_eq!(resolve_first_occurrence("", &mo), None);
    }

    #[test]
    fn test_crosses_year_boundary() {
        // 2024-12-31 is a Tuesday
        let found = first_occurrence_on_or_after(date(2024, 12, 31), &days(&[WeekdayCode::Su]));
        assert_eq!(found, Some(date(2025, 1, 5)));
    }

    #[test]
    fn test_last_representable_date() {
        let all = days(&WeekdayCode::ALL);
        assert_eq!(first_occurrence_on_or_after(NaiveDate::MAX, &all), Some(NaiveDate::MAX));

        // only the weekday of the last date itself can still be reached
        let reachable = WeekdayCode::ALL
            .iter()
            .filter(|code| first_occurrence_on_or_after(NaiveDate::MAX, &days(&[**code])).is_some())
            .count();
        assert_eq!(reachable, 1);
    }
}
