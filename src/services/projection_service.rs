use chrono::{Datelike, NaiveDate};
use tracing::{debug, warn};

use crate::models::DailySeriesPoint;

/// Number of days in the month containing `date`
pub fn days_in_month(date: NaiveDate) -> u32 {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };

    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first_of_next| first_of_next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(30)
}

/// Naive full-month estimate: mean daily markup times days in the month.
///
/// No weighting and no exclusion of the partial current day.
pub fn project(points: &[DailySeriesPoint], reference: NaiveDate) -> f64 {
    if points.is_empty() {
        warn!("⚠ No data available for prediction.");
        return 0.0;
    }

    let total: f64 = points.iter().map(|p| p.markup_usd).sum();
    let average = total / points.len() as f64;
    let projected = average * f64::from(days_in_month(reference));

    debug!("📊 Predicted current month markup: {}", projected);
    projected
}
