//! Outstanding statistics request models

use chrono::NaiveDate;

use super::date_range::DateRange;
use super::stats::AggregateKind;

/// What a request identifier stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestSlot {
    /// One day of the 30-day series; `offset` 0 is the reference day
    SeriesDay { offset: u32, day: NaiveDate },
    Aggregate(AggregateKind),
}

/// A statistics request sent and not yet answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutstandingRequest {
    pub req_id: u32,
    pub slot: RequestSlot,
    pub range: DateRange,
}
