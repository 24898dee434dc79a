//! Exchange rate models

/// Which link of the fallback chain produced a rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateOrigin {
    Primary,
    Fallback,
    Default,
}

/// How recent the rate is, as reported by the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FreshnessLabel {
    /// Timestamp string exactly as the rate service sent it
    Reported(String),
    /// No source answered; the configured default is in use
    DefaultRate,
}

/// A rate as returned by a single source
#[derive(Debug, Clone, PartialEq)]
pub struct RateQuote {
    pub value: f64,
    pub last_updated: Option<String>,
}

/// Base-to-local conversion rate currently used for display
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeRate {
    pub value: f64,
    pub last_updated: Option<FreshnessLabel>,
    pub origin: RateOrigin,
}

impl ExchangeRate {
    /// Startup value before any refresh has finished
    pub fn initial(default_value: f64) -> Self {
        Self {
            value: default_value,
            last_updated: None,
            origin: RateOrigin::Default,
        }
    }

    /// Last resort once every source has failed
    pub fn fallback_default(default_value: f64) -> Self {
        Self {
            value: default_value,
            last_updated: Some(FreshnessLabel::DefaultRate),
            origin: RateOrigin::Default,
        }
    }

    pub fn from_quote(quote: RateQuote, origin: RateOrigin) -> Self {
        Self {
            value: quote.value,
            last_updated: quote.last_updated.map(FreshnessLabel::Reported),
            origin,
        }
    }

    /// Convert a base-currency amount. No rounding happens here.
    pub fn to_local(&self, base_amount: f64) -> f64 {
        base_amount * self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_local_multiplies_by_rate() {
        let rate = ExchangeRate::initial(130.0);
        assert_eq!(rate.to_local(100.0), 13000.0);
        assert_eq!(rate.to_local(0.0), 0.0);
    }

    #[test]
    fn fallback_default_carries_sentinel() {
        let rate = ExchangeRate::fallback_default(130.0);
        assert_eq!(rate.last_updated, Some(FreshnessLabel::DefaultRate));
        assert_eq!(rate.origin, RateOrigin::Default);
    }
}
