//! Date window models

use chrono::{DateTime, NaiveDate, SubsecRound, Utc};

/// Format the statistics API expects for `date_from` / `date_to`
pub const WIRE_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A UTC window with second resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl DateRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            from: from.trunc_subsecs(0),
            to: to.trunc_subsecs(0),
        }
    }

    pub fn date_from_wire(&self) -> String {
        self.from.format(WIRE_DATE_FORMAT).to_string()
    }

    pub fn date_to_wire(&self) -> String {
        self.to.format(WIRE_DATE_FORMAT).to_string()
    }
}

/// Extract the calendar day from an echoed wire date ("2024-05-01 00:00:00")
pub fn parse_wire_day(value: &str) -> Option<NaiveDate> {
    let day_part = value.split_whitespace().next()?;
    NaiveDate::parse_from_str(day_part, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn wire_format_uses_space_separator() {
        let from = Utc.with_ymd_and_hms(2024, 3, 9, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 3, 9, 23, 59, 59).unwrap();
        let range = DateRange::new(from, to);

        assert_eq!(range.date_from_wire(), "2024-03-09 00:00:00");
        assert_eq!(range.date_to_wire(), "2024-03-09 23:59:59");
    }

    #[test]
    fn new_drops_subsecond_precision() {
        let to = Utc.with_ymd_and_hms(2024, 3, 9, 12, 30, 15).unwrap()
            + chrono::Duration::milliseconds(750);
        let range = DateRange::new(to, to);
        assert_eq!(range.date_to_wire(), "2024-03-09 12:30:15");
    }

    #[test]
    fn parse_wire_day_reads_date_part() {
        assert_eq!(
            parse_wire_day("2024-02-29 00:00:00"),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );
        assert_eq!(parse_wire_day("garbage"), None);
        assert_eq!(parse_wire_day(""), None);
    }
}
