//! Clock-time parsing for free-text class times ("9", "9:30", "9:30 PM").

use chrono::NaiveTime;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static CLOCK_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(\d{1,2})(?::(\d{2}))?\s*(am|pm)?$").unwrap());

/// Wall-clock time of day in 24-hour form.
///
/// Only [`parse_clock_time`] builds one, so both fields are always in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime {
    hour: u32,
    minute: u32,
}

impl ClockTime {
    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    pub fn to_naive_time(self) -> NaiveTime {
        // In range by construction
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or(NaiveTime::MIN)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Parse a time string like "9:30 PM" into a 24-hour [`ClockTime`]
///
/// # Arguments
///
/// * `input` - The time string to parse (e.g., "9", "09:05", "12:00 am")
///
/// # Returns
///
/// * `Option<ClockTime>` - `None` when the text does not match or is out of range
pub fn parse_clock_time(input: &str) -> Option<ClockTime> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    let caps = CLOCK_TIME.captures(trimmed)?;
    let mut hour: u32 = caps.get(1)?.as_str().parse().ok()?;
    let minute: u32 = caps.get(2).map_or(Ok(0), |m| m.as_str().parse()).ok()?;

    // 12-hour convention applies only when a suffix is present
    match caps.get(3).map(|m| m.as_str().to_ascii_lowercase()).as_deref() {
        Some("pm") if hour != 12 => hour += 12,
        Some("am") if hour == 12 => hour = 0,
        _ => {}
    }

    if hour > 23 || minute > 59 {
        debug!("Rejected out-of-range time '{}' ({}:{:02})", input, hour, minute);
        return None;
    }

    Some(ClockTime { hour, minute })
}
