//! Weekday codes and the free-text day-token normalizer.
//
// Class schedules spell meeting days in every way imaginable ("Mon/Wed",
// "T Th", "thurs"). Everything downstream works on the seven canonical
// two-letter codes, so this module is the single place that maps text to codes.

use chrono::Weekday;
use log::{debug, warn};
use once_cell::sync::Lazy;
use phf::phf_map;
use regex::Regex;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Canonical weekday code, ordered SU=0 .. SA=6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WeekdayCode {
    Su,
    Mo,
    Tu,
    We,
    Th,
    Fr,
    Sa,
}

impl WeekdayCode {
    pub const ALL: [WeekdayCode; 7] = [
        WeekdayCode::Su,
        WeekdayCode::Mo,
        WeekdayCode::Tu,
        WeekdayCode::We,
        WeekdayCode::Th,
        WeekdayCode::Fr,
        WeekdayCode::Sa,
    ];

    /// Two-letter RFC 5545 form, e.g. `MO`
    pub fn as_code(self) -> &'static str {
        match self {
            WeekdayCode::Su => "SU",
            WeekdayCode::Mo => "MO",
            WeekdayCode::Tu => "TU",
            WeekdayCode::We => "WE",
            WeekdayCode::Th => "TH",
            WeekdayCode::Fr => "FR",
            WeekdayCode::Sa => "SA",
        }
    }

    /// Parse one of the seven canonical codes, case-insensitive.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "SU" => Some(WeekdayCode::Su),
            "MO" => Some(WeekdayCode::Mo),
            "TU" => Some(WeekdayCode::Tu),
            "WE" => Some(WeekdayCode::We),
            "TH" => Some(WeekdayCode::Th),
            "FR" => Some(WeekdayCode::Fr),
            "SA" => Some(WeekdayCode::Sa),
            _ => None,
        }
    }

    /// Index with Sunday as 0.
    pub fn index(self) -> u32 {
        self as u32
    }

    pub fn to_chrono(self) -> Weekday {
        match self {
            WeekdayCode::Su => Weekday::Sun,
            WeekdayCode::Mo => Weekday::Mon,
            WeekdayCode::Tu => Weekday::Tue,
            WeekdayCode::We => Weekday::Wed,
            WeekdayCode::Th => Weekday::Thu,
            WeekdayCode::Fr => Weekday::Fri,
            WeekdayCode::Sa => Weekday::Sat,
        }
    }

    pub fn from_chrono(weekday: Weekday) -> Self {
        WeekdayCode::ALL[weekday.num_days_from_sunday() as usize]
    }
}

impl fmt::Display for WeekdayCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

/// A normalized day token.
///
/// Unrecognized input is kept as a best-effort two-letter guess so the user can
/// see it and fix it; it is never rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DayToken {
    Known(WeekdayCode),
    Unrecognized(String),
}

impl DayToken {
    pub fn is_recognized(&self) -> bool {
        matches!(self, DayToken::Known(_))
    }

    pub fn weekday(&self) -> Option<WeekdayCode> {
        match self {
            DayToken::Known(code) => Some(*code),
            DayToken::Unrecognized(_) => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            DayToken::Known(code) => code.as_code(),
            DayToken::Unrecognized(guess) => guess,
        }
    }
}

impl fmt::Display for DayToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<WeekdayCode> for DayToken {
    fn from(code: WeekdayCode) -> Self {
        DayToken::Known(code)
    }
}

// Serialized as the plain code string so drafts round-trip through the
// extraction JSON unchanged.
impl Serialize for DayToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DayToken {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match normalize_day_tokens(&raw).as_slice() {
            [day] => Ok(day.clone()),
            [] => Err(de::Error::custom(format!("no day in '{}'", raw))),
            _ => Err(de::Error::custom(format!("expected a single day, got '{}'", raw))),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDays {
    One(String),
    Many(Vec<String>),
}

/// Serde `deserialize_with` helper for day lists.
///
/// Accepts one string or a list of strings and normalizes them together, so
/// `["Mon/Wed", "mon"]` and `"Mon/Wed"` both become `[MO, WE]`.
pub fn deserialize_day_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<DayToken>, D::Error> {
    Ok(match RawDays::deserialize(deserializer)? {
        RawDays::One(text) => normalize_day_tokens(&text),
        RawDays::Many(list) => normalize_day_list(&list),
    })
}

/// Synonyms for each weekday. Saturday, Sunday and Thursday need at least two
/// letters; a lone `t` is Tuesday.
static DAY_SYNONYMS: phf::Map<&'static str, WeekdayCode> = phf_map! {
    "m" => WeekdayCode::Mo,
    "mo" => WeekdayCode::Mo,
    "mon" => WeekdayCode::Mo,
    "mond" => WeekdayCode::Mo,
    "monday" => WeekdayCode::Mo,
    "t" => WeekdayCode::Tu,
    "tu" => WeekdayCode::Tu,
    "tue" => WeekdayCode::Tu,
    "tues" => WeekdayCode::Tu,
    "tuesday" => WeekdayCode::Tu,
    "w" => WeekdayCode::We,
    "we" => WeekdayCode::We,
    "wed" => WeekdayCode::We,
    "weds" => WeekdayCode::We,
    "wednesday" => WeekdayCode::We,
    "th" => WeekdayCode::Th,
    "thu" => WeekdayCode::Th,
    "thur" => WeekdayCode::Th,
    "thurs" => WeekdayCode::Th,
    "thursday" => WeekdayCode::Th,
    "f" => WeekdayCode::Fr,
    "fr" => WeekdayCode::Fr,
    "fri" => WeekdayCode::Fr,
    "friday" => WeekdayCode::Fr,
    "sa" => WeekdayCode::Sa,
    "sat" => WeekdayCode::Sa,
    "satu" => WeekdayCode::Sa,
    "saturday" => WeekdayCode::Sa,
    "su" => WeekdayCode::Su,
    "sun" => WeekdayCode::Su,
    "sund" => WeekdayCode::Su,
    "sunday" => WeekdayCode::Su,
};

pub(crate) static NON_ALPHA: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z]+").unwrap());

/// Look a lowercased token up in the synonym table.
pub(crate) fn classify_token(token: &str) -> Option<DayToken> {
    DAY_SYNONYMS.get(token).map(|code| DayToken::Known(*code))
}

fn fallback_guess(token: &str) -> DayToken {
    let guess: String = token.trim().chars().take(2).collect::<String>().to_uppercase();
    match WeekdayCode::from_code(&guess) {
        Some(code) => DayToken::Known(code),
        None => DayToken::Unrecognized(guess),
    }
}

/// Normalize one token that already contains no separators.
pub(crate) fn normalize_token(token: &str) -> Option<DayToken> {
    let lowered = token.trim().to_lowercase();
    if lowered.is_empty() {
        return None;
    }
    match classify_token(&lowered) {
        Some(day) => Some(day),
        None => {
            let guess = fallback_guess(&lowered);
            warn!("Unrecognized day token '{}', keeping '{}'", token, guess);
            Some(guess)
        }
    }
}

/// Push `day` unless an equal token was already emitted.
pub(crate) fn push_unique(out: &mut Vec<DayToken>, day: DayToken) {
    if !out.contains(&day) {
        out.push(day);
    }
}

/// Normalize free text such as `"Mon/Wed, Fri"` into ordered, de-duplicated tokens.
///
/// # Arguments
///
/// * `input` - Day mentions separated by any non-letter characters
///
/// # Returns
///
/// * `Vec<DayToken>` - Tokens in first-seen order; empty for empty or punctuation-only input
pub fn normalize_day_tokens(input: &str) -> Vec<DayToken> {
    let mut out = Vec::new();
    for token in NON_ALPHA.split(input) {
        if let Some(day) = normalize_token(token) {
            push_unique(&mut out, day);
        }
    }
    debug!("Normalized days '{}' -> {:?}", input, out);
    out
}

/// Normalize a list of day strings as if they were one input.
pub fn normalize_day_list<S: AsRef<str>>(tokens: &[S]) -> Vec<DayToken> {
    let mut out = Vec::new();
    for raw in tokens {
        for day in normalize_day_tokens(raw.as_ref()) {
            push_unique(&mut out, day);
        }
    }
    out
}

/// Render tokens the way the editor shows them: `MO, WE, FR`.
pub fn format_day_tokens(days: &[DayToken]) -> String {
    days.iter().map(DayToken::as_str).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known(codes: &[WeekdayCode]) -> Vec<DayToken> {
        codes.iter().copied().map(DayToken::Known).collect()
    }

    #[test]
    fn test_common_tokens() {
        let cases = vec![
            ("Mon", WeekdayCode::Mo),
            ("monday", WeekdayCode::Mo),
            ("M", WeekdayCode::Mo),
            ("Wed", WeekdayCode::We),
            ("W", WeekdayCode::We),
            ("Thu", WeekdayCode::Th),
            ("Th", WeekdayCode::Th),
            ("T", WeekdayCode::Tu),
            ("Thurs", WeekdayCode::Th),
            ("Su", WeekdayCode::Su),
            ("SATURDAY", WeekdayCode::Sa),
        ];

        for (input, expected) in cases {
            assert_eq!(
                normalize_day_tokens(input),
                vec![DayToken::Known(expected)],
                "Failed for input: {}",
                input
            );
        }
    }

    #[test]
    fn test_duplicates_collapse_in_first_seen_order() {
        let days = normalize_day_tokens("Wed, Mon / wednesday  M");
        assert_eq!(days, known(&[WeekdayCode::We, WeekdayCode::Mo]));
    }

    #[test]
    fn test_empty_and_punctuation() {
        assert!(normalize_day_tokens("").is_empty());
        assert!(normalize_day_tokens("  ,/ - ;").is_empty());
    }

    #[test]
    fn test_unrecognized_falls_back_to_two_letters() {
        let days = normalize_day_tokens("xyz");
        assert_eq!(days, vec![DayToken::Unrecognized("XY".to_string())]);
        assert!(!days[0].is_recognized());

        // A bare "s" is ambiguous and stays a guess
        assert_eq!(normalize_day_tokens("s"), vec![DayToken::Unrecognized("S".to_string())]);
    }

    #[test]
    fn test_fallback_can_land_on_real_code() {
        // "frid" is not in the table but its first two letters are a code
        assert_eq!(normalize_day_tokens("frid"), known(&[WeekdayCode::Fr]));
    }

    #[test]
    fn test_list_normalization() {
        let days = normalize_day_list(&["MO", "we", "Mon", "F"]);
        assert_eq!(days, known(&[WeekdayCode::Mo, WeekdayCode::We, WeekdayCode::Fr]));
    }

    #[test]
    fn test_code_round_trip_and_ordering() {
        for code in WeekdayCode::ALL {
            assert_eq!(WeekdayCode::from_code(code.as_code()), Some(code));
            assert_eq!(WeekdayCode::from_chrono(code.to_chrono()), code);
        }
        assert!(WeekdayCode::Su < WeekdayCode::Sa);
        assert_eq!(WeekdayCode::Sa.index(), 6);
    }

    #[test]
    fn test_serde_as_plain_strings() {
        let days: Vec<DayToken> = serde_json::from_str(r#"["MO","thursday","zz"]"#).unwrap();
        assert_eq!(
            days,
            vec![
                DayToken::Known(WeekdayCode::Mo),
                DayToken::Known(WeekdayCode::Th),
                DayToken::Unrecognized("ZZ".to_string()),
            ]
        );
        assert_eq!(serde_json::to_string(&days).unwrap(), r#"["MO","TH","ZZ"]"#);
    }

    #[test]
    fn test_single_token_rejects_lists() {
        assert!(serde_json::from_str::<DayToken>(r#""Mon/Wed""#).is_err());
        assert!(serde_json::from_str::<DayToken>(r#""--""#).is_err());
        assert_eq!(serde_json::from_str::<DayToken>(r#"" Tues ""#).unwrap(), DayToken::Known(WeekdayCode::Tu));
    }
}
