//! Chart models

use chrono::NaiveDate;

/// A single day on the 30-day markup chart
#[derive(Debug, Clone, PartialEq)]
pub struct DailySeriesPoint {
    pub date: NaiveDate,
    pub markup_usd: f64,
}

impl DailySeriesPoint {
    pub fn new(date: NaiveDate, markup_usd: f64) -> Self {
        Self { date, markup_usd }
    }
}
