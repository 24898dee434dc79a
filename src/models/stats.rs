//! Markup statistics models

use super::chart::DailySeriesPoint;

/// The three rolling aggregate windows shown on the widget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AggregateKind {
    Daily,
    Weekly,
    Monthly,
}

impl AggregateKind {
    pub const ALL: [AggregateKind; 3] = [
        AggregateKind::Daily,
        AggregateKind::Weekly,
        AggregateKind::Monthly,
    ];

    /// Fixed request identifier for this window
    pub fn req_id(self) -> u32 {
        match self {
            AggregateKind::Daily => 100,
            AggregateKind::Weekly => 101,
            AggregateKind::Monthly => 102,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AggregateKind::Daily => "daily",
            AggregateKind::Weekly => "weekly",
            AggregateKind::Monthly => "monthly",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            AggregateKind::Daily => "Daily Performance",
            AggregateKind::Weekly => "Weekly Performance",
            AggregateKind::Monthly => "Monthly Performance",
        }
    }

    pub fn period_label(self) -> &'static str {
        match self {
            AggregateKind::Daily => "Today",
            AggregateKind::Weekly => "7 Days",
            AggregateKind::Monthly => "30 Days",
        }
    }
}

impl std::fmt::Display for AggregateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Markup total and transaction count for one window
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AggregateStats {
    pub markup_usd: f64,
    pub transaction_count: u64,
}

impl AggregateStats {
    pub fn new(markup_usd: f64, transaction_count: u64) -> Self {
        Self {
            markup_usd,
            transaction_count,
        }
    }
}

/// Point-in-time copy of everything the widget renders
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortfolioState {
    pub daily: AggregateStats,
    pub weekly: AggregateStats,
    pub monthly: AggregateStats,
    /// Always the last monthly markup received
    pub current_month: f64,
    pub projected_month: f64,
    pub series: Vec<DailySeriesPoint>,
    pub series_complete: bool,
}

impl PortfolioState {
    pub fn aggregate(&self, kind: AggregateKind) -> AggregateStats {
        match kind {
            AggregateKind::Daily => self.daily,
            AggregateKind::Weekly => self.weekly,
            AggregateKind::Monthly => self.monthly,
        }
    }
}
