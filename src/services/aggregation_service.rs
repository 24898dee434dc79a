use chrono::NaiveDate;
use tracing::debug;

use crate::models::{AggregateKind, AggregateStats, DailySeriesPoint, PortfolioState};
use crate::services::projection_service;

/// Latest aggregates and the daily series for one session.
///
/// Every slot is last-write-wins; nothing is merged or averaged.
#[derive(Debug, Clone)]
pub struct AggregationStore {
    reference_day: NaiveDate,
    daily: AggregateStats,
    weekly: AggregateStats,
    monthly: AggregateStats,
    current_month: f64,
    series: Vec<DailySeriesPoint>,
    series_complete: bool,
}

impl AggregationStore {
    /// `reference_day` fixes the month used for the projection
    pub fn new(reference_day: NaiveDate) -> Self {
        Self {
            reference_day,
            daily: AggregateStats::default(),
            weekly: AggregateStats::default(),
            monthly: AggregateStats::default(),
            current_month: 0.0,
            series: Vec::new(),
            series_complete: false,
        }
    }

    pub fn set_reference_day(&mut self, reference_day: NaiveDate) {
        self.reference_day = reference_day;
    }

    pub fn apply_aggregate(&mut self, kind: AggregateKind, markup_usd: f64, transaction_count: u64) {
        let stats = AggregateStats::new(markup_usd, transaction_count);
        match kind {
            AggregateKind::Daily => self.daily = stats,
            AggregateKind::Weekly => self.weekly = stats,
            AggregateKind::Monthly => {
                self.monthly = stats;
                self.current_month = markup_usd;
            }
        }
        debug!("📊 Updated {} statistics: {:?}", kind, stats);
    }

    /// Append in arrival order; ordering is fixed by [`Self::complete_series`]
    pub fn apply_series_point(&mut self, date: NaiveDate, markup_usd: f64) {
        self.series.push(DailySeriesPoint::new(date, markup_usd));
    }

    /// Sort the series by date and mark it chartable
    pub fn complete_series(&mut self) {
        self.series.sort_by_key(|point| point.date);
        self.series_complete = true;
        debug!("📊 All {}-day data collected", self.series.len());
    }

    pub fn snapshot(&self) -> PortfolioState {
        PortfolioState {
            daily: self.daily,
            weekly: self.weekly,
            monthly: self.monthly,
            current_month: self.current_month,
            projected_month: projection_service::project(&self.series, self.reference_day),
            series: self.series.clone(),
            series_complete: self.series_complete,
        }
    }
}
