//! Dose scheduling: map a human-readable frequency label to the next
//! dose instant.

use chrono::{DateTime, Duration, Utc};

/// Recognized dosing frequencies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    EveryHour,
    Every2Hours,
    Every4Hours,
    Every6Hours,
    Every8Hours,
    Every12Hours,
    OnceADay,
    OnceAWeek,
}

impl Frequency {
    /// Parse a frequency label as stored on a medication entry.
    /// Unknown labels are not an error, they just yield `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Every hour" => Some(Frequency::EveryHour),
            "Every 2 hours" => Some(Frequency::Every2Hours),
            "Every 4 hours" => Some(Frequency::Every4Hours),
            "Every 6 hours" => Some(Frequency::Every6Hours),
            "Every 8 hours" => Some(Frequency::Every8Hours),
            "Every 12 hours" => Some(Frequency::Every12Hours),
            "Once a day" => Some(Frequency::OnceADay),
            "Once a week" => Some(Frequency::OnceAWeek),
            _ => None,
        }
    }

    pub fn as_label(&self) -> &'static str {
        match self {
            Frequency::EveryHour => "Every hour",
            Frequency::Every2Hours => "Every 2 hours",
            Frequency::Every4Hours => "Every 4 hours",
            Frequency::Every6Hours => "Every 6 hours",
            Frequency::Every8Hours => "Every 8 hours",
            Frequency::Every12Hours => "Every 12 hours",
            Frequency::OnceADay => "Once a day",
            Frequency::OnceAWeek => "Once a week",
        }
    }

    /// Fixed dosing interval in hours
    pub fn interval_hours(&self) -> i64 {
        match self {
            Frequency::EveryHour => 1,
            Frequency::Every2Hours => 2,
            Frequency::Every4Hours => 4,
            Frequency::Every6Hours => 6,
            Frequency::Every8Hours => 8,
            Frequency::Every12Hours => 12,
            Frequency::OnceADay => 24,
            Frequency::OnceAWeek => 168,
        }
    }
}

/// Compute the next dose instant: reference time plus the fixed interval
/// for the label. Returns `None` when the label is not recognized; the
/// caller must leave the next-dose field unset rather than fail.
pub fn next_dose(reference: DateTime<Utc>, label: &str) -> Option<DateTime<Utc>> {
    let freq = Frequency::from_label(label)?;
    Some(reference + Duration::hours(freq.interval_hours()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_all_labels_advance_by_fixed_offset() {
        let cases = [
            ("Every hour", 1),
            ("Every 2 hours", 2),
            ("Every 4 hours", 4),
            ("Every 6 hours", 6),
            ("Every 8 hours", 8),
            ("Every 12 hours", 12),
            ("Once a day", 24),
            ("Once a week", 168),
        ];

        for (label, hours) in cases {
            let next = next_dose(reference(), label).unwrap();
            assert_eq!(next, reference() + Duration::hours(hours), "{}", label);
        }
    }

    #[test]
    fn test_unknown_label_yields_none() {
        assert_eq!(next_dose(reference(), "Twice a fortnight"), None);
        assert_eq!(next_dose(reference(), ""), None);
        // Case-sensitive, matching the stored labels exactly
        assert_eq!(next_dose(reference(), "every hour"), None);
    }

    #[test]
    fn test_label_roundtrip() {
        let freq = Frequency::from_label("Once a week").unwrap();
        assert_eq!(freq.as_label(), "Once a week");
        assert_eq!(freq.interval_hours(), 168);
    }
}
