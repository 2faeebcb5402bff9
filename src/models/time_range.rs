use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// Start and end clock times of a booked slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeRange {
    /// Parses "9:00 AM - 11:00 AM" and the looser variants the booking form
    /// has produced over time ("9:00AM-11:00AM", "9 am - 11 am", "09:00-11:00").
    pub fn parse(s: &str) -> Option<Self> {
        let (start, end) = s.split_once(['-', '–'])?;
        Some(Self {
            start: parse_clock(start)?,
            end: parse_clock(end)?,
        })
    }

    pub fn is_morning(&self) -> bool {
        self.start.hour() < 12
    }
}

fn parse_clock(raw: &str) -> Option<NaiveTime> {
    let s: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '.')
        .collect::<String>()
        .to_uppercase();

    let (digits, pm) = if let Some(rest) = s.strip_suffix("AM") {
        (rest, Some(false))
    } else if let Some(rest) = s.strip_suffix("PM") {
        (rest, Some(true))
    } else {
        (s.as_str(), None)
    };

    let (hour, minute): (u32, u32) = match digits.split_once(':') {
        Some((h, m)) => (h.parse().ok()?, m.parse().ok()?),
        None => (digits.parse().ok()?, 0),
    };

    let hour = match pm {
        Some(pm) => {
            if !(1..=12).contains(&hour) {
                return None;
            }
            hour % 12 + if pm { 12 } else { 0 }
        }
        None => hour,
    };

    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// The `time` field of a booking. The raw label is kept so it round-trips
/// unchanged; the structured range is computed once when the record is read.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct BookingTime {
    label: String,
    range: Option<TimeRange>,
}

impl BookingTime {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn range(&self) -> Option<TimeRange> {
        self.range
    }

    /// Morning/afternoon for an unparsable label falls back to an AM/PM
    /// substring test.
    pub fn is_morning(&self) -> bool {
        match self.range {
            Some(range) => range.is_morning(),
            None => self.label.to_uppercase().contains("AM"),
        }
    }
}

impl From<String> for BookingTime {
    fn from(label: String) -> Self {
        let range = TimeRange::parse(&label);
        if range.is_none() && !label.trim().is_empty() {
            tracing::debug!(label = %label, "unparsed booking time range");
        }
        Self { label, range }
    }
}

impl From<&str> for BookingTime {
    fn from(label: &str) -> Self {
        Self::from(label.to_string())
    }
}

impl From<BookingTime> for String {
    fn from(time: BookingTime) -> Self {
        time.label
    }
}
