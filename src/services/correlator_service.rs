//! Request/response correlation for the markup statistics fan-out.
//!
//! Identifiers 1..=30 are the daily series (id `i` is the reference day minus
//! `i - 1` days) and 100/101/102 are the daily/weekly/monthly aggregates. The
//! mapping is stored explicitly per request, so nothing depends on send order.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;

use crate::api::deriv::InboundMessage;
use crate::models::{
    parse_wire_day, AggregateKind, AggregateStats, OutstandingRequest, RequestSlot,
};
use crate::services::date_range_service::{aggregate_window, trailing_day_windows};

pub const SERIES_DAYS: u32 = 30;

const MSG_AUTHORIZE: &str = "authorize";
const MSG_MARKUP_STATISTICS: &str = "app_markup_statistics";

/// The 30 per-day requests, ids 1..=30, newest day first
pub fn build_daily_series_requests(reference: DateTime<Utc>) -> Vec<OutstandingRequest> {
    trailing_day_windows(reference, SERIES_DAYS)
        .into_iter()
        .zip(0u32..)
        .map(|((day, range), offset)| OutstandingRequest {
            req_id: offset + 1,
            slot: RequestSlot::SeriesDay { offset, day },
            range,
        })
        .collect()
}

pub fn build_aggregate_request(kind: AggregateKind, reference: DateTime<Utc>) -> OutstandingRequest {
    OutstandingRequest {
        req_id: kind.req_id(),
        slot: RequestSlot::Aggregate(kind),
        range: aggregate_window(kind, reference),
    }
}

/// What an inbound frame means to the session
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    Authorized,
    AuthorizationFailed(String),
    Statistics {
        req_id: u32,
        echoed_day: Option<NaiveDate>,
        stats: AggregateStats,
        error: Option<String>,
    },
    Ignored(String),
}

/// Dispatch on `(msg_type, req_id)`
pub fn classify_message(message: &InboundMessage, target_app_id: u64) -> InboundEvent {
    match (message.msg_type.as_deref(), message.req_id) {
        (Some(MSG_AUTHORIZE), _) => match &message.error {
            Some(error) => InboundEvent::AuthorizationFailed(error.to_string()),
            None => InboundEvent::Authorized,
        },
        (Some(MSG_MARKUP_STATISTICS), Some(req_id)) => InboundEvent::Statistics {
            req_id,
            echoed_day: message
                .echo_req
                .as_ref()
                .and_then(|echo| echo.date_from.as_deref())
                .and_then(parse_wire_day),
            stats: extract_app_stats(message, target_app_id),
            error: message.error.as_ref().map(|e| e.to_string()),
        },
        (Some(MSG_MARKUP_STATISTICS), None) => {
            InboundEvent::Ignored("statistics response without req_id".to_string())
        }
        (Some(other), _) => InboundEvent::Ignored(format!("unhandled msg_type '{}'", other)),
        (None, _) => InboundEvent::Ignored("frame without msg_type".to_string()),
    }
}

/// Markup and transaction count of `target_app_id`, zero when absent
pub fn extract_app_stats(message: &InboundMessage, target_app_id: u64) -> AggregateStats {
    let Some(breakdown) = message
        .app_markup_statistics
        .as_ref()
        .and_then(|stats| stats.breakdown.as_ref())
    else {
        debug!("⚠ No breakdown data available in response");
        return AggregateStats::default();
    };

    match breakdown
        .iter()
        .find(|entry| entry.app_id == Some(target_app_id))
    {
        Some(entry) => AggregateStats::new(
            entry.app_markup_usd.unwrap_or(0.0),
            entry.transactions_count.unwrap_or(0),
        ),
        None => {
            debug!("⚠ No data found for app_id {} in breakdown", target_app_id);
            AggregateStats::default()
        }
    }
}

/// Outcome of matching a response identifier against the pending set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Series response; `day` is the day the request was built for
    SeriesPoint { day: NaiveDate },
    Aggregate(AggregateKind),
    /// Identifier already answered
    Duplicate,
    /// Identifier never sent
    Unknown,
}

/// Outstanding requests of one fan-out, pinned to a single reference instant
#[derive(Debug, Clone)]
pub struct RequestCorrelator {
    requests: BTreeMap<u32, OutstandingRequest>,
    pending: BTreeSet<u32>,
    series_received: u32,
}

impl RequestCorrelator {
    /// Build all 33 requests against one `reference`
    pub fn fan_out(reference: DateTime<Utc>) -> Self {
        let requests: BTreeMap<u32, OutstandingRequest> = build_daily_series_requests(reference)
            .into_iter()
            .chain(
                AggregateKind::ALL
                    .into_iter()
                    .map(|kind| build_aggregate_request(kind, reference)),
            )
            .map(|request| (request.req_id, request))
            .collect();
        let pending = requests.keys().copied().collect();

        Self {
            requests,
            pending,
            series_received: 0,
        }
    }

    /// Every request of the fan-out in identifier order
    pub fn requests(&self) -> impl Iterator<Item = &OutstandingRequest> {
        self.requests.values()
    }

    pub fn resolve(&mut self, req_id: u32) -> Resolution {
        let Some(request) = self.requests.get(&req_id) else {
            return Resolution::Unknown;
        };
        if !self.pending.remove(&req_id) {
            return Resolution::Duplicate;
        }

        match request.slot {
            RequestSlot::SeriesDay { day, .. } => {
                self.series_received += 1;
                Resolution::SeriesPoint { day }
            }
            RequestSlot::Aggregate(kind) => Resolution::Aggregate(kind),
        }
    }

    /// True once all 30 distinct series identifiers have answered
    pub fn is_series_complete(&self) -> bool {
        self.series_received == SERIES_DAYS
    }

    pub fn series_received(&self) -> u32 {
        self.series_received
    }

    /// True when nothing is left pending
    pub fn is_settled(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn pending_ids(&self) -> Vec<u32> {
        self.pending.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 14, 23, 59, 58).unwrap()
    }

    fn frame(json: &str) -> InboundMessage {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn series_requests_cover_one_day_each() {
        let requests = build_daily_series_requests(reference());
        assert_eq!(requests.len(), 30);

        for (i, request) in requests.iter().enumerate() {
            let expected_day = reference().date_naive() - Duration::days(i as i64);
            assert_eq!(request.req_id, i as u32 + 1);
            assert_eq!(request.range.from.date_naive(), expected_day);
            assert_eq!(request.range.to.date_naive(), expected_day);
            assert_eq!(
                request.slot,
                RequestSlot::SeriesDay {
                    offset: i as u32,
                    day: expected_day
                }
            );
        }
    }

    #[test]
    fn fan_out_uses_fixed_identifiers() {
        let correlator = RequestCorrelator::fan_out(reference());
        let ids: Vec<u32> = correlator.requests().map(|r| r.req_id).collect();
        let mut expected: Vec<u32> = (1..=30).collect();
        expected.extend([100, 101, 102]);
        assert_eq!(ids, expected);
        assert_eq!(correlator.pending_ids().len(), 33);
    }

    #[test]
    fn resolve_routes_by_identifier() {
        let mut correlator = RequestCorrelator::fan_out(reference());
        assert_eq!(
            correlator.resolve(3),
            Resolution::SeriesPoint {
                day: NaiveDate::from_ymd_opt(2024, 3, 12).unwrap()
            }
        );
        assert_eq!(correlator.resolve(101), Resolution::Aggregate(AggregateKind::Weekly));
        assert_eq!(correlator.resolve(55), Resolution::Unknown);
    }

    #[test]
    fn duplicate_series_response_does_not_count_twice() {
        let mut correlator = RequestCorrelator::fan_out(reference());
        for id in 1..=29 {
            correlator.resolve(id);
        }
        assert_eq!(correlator.resolve(29), Resolution::Duplicate);
        assert!(!correlator.is_series_complete());

        correlator.resolve(30);
        assert!(correlator.is_series_complete());
        assert!(!correlator.is_settled());

        for kind in AggregateKind::ALL {
            correlator.resolve(kind.req_id());
        }
        assert!(correlator.is_settled());
    }

    #[test]
    fn classify_dispatches_on_type_and_identifier() {
        assert_eq!(
            classify_message(&frame(r#"{"msg_type": "authorize", "authorize": {}}"#), 1),
            InboundEvent::Authorized
        );
        assert!(matches!(
            classify_message(
                &frame(r#"{"msg_type": "authorize", "error": {"code": "InvalidToken", "message": "The token is invalid."}}"#),
                1
            ),
            InboundEvent::AuthorizationFailed(msg) if msg.contains("InvalidToken")
        ));
        assert!(matches!(
            classify_message(&frame(r#"{"msg_type": "ping"}"#), 1),
            InboundEvent::Ignored(_)
        ));
        assert!(matches!(
            classify_message(&frame(r#"{"msg_type": "app_markup_statistics"}"#), 1),
            InboundEvent::Ignored(_)
        ));
    }

    #[test]
    fn statistics_frame_picks_target_app_entry() {
        let message = frame(
            r#"{
                "msg_type": "app_markup_statistics",
                "req_id": 4,
                "echo_req": {"date_from": "2024-03-11 00:00:00", "date_to": "2024-03-11 23:59:59"},
                "app_markup_statistics": {"breakdown": [
                    {"app_id": 1, "app_markup_usd": 99.0, "transactions_count": 9},
                    {"app_id": 92303, "app_markup_usd": 2.5, "transactions_count": 4}
                ]}
            }"#,
        );

        assert_eq!(
            classify_message(&message, 92303),
            InboundEvent::Statistics {
                req_id: 4,
                echoed_day: NaiveDate::from_ymd_opt(2024, 3, 11),
                stats: AggregateStats::new(2.5, 4),
                error: None,
            }
        );
    }

    #[test]
    fn unmatched_app_id_yields_zeros() {
        let message = frame(
            r#"{
                "msg_type": "app_markup_statistics",
                "req_id": 100,
                "app_markup_statistics": {"breakdown": [{"app_id": 1, "app_markup_usd": 99.0, "transactions_count": 9}]}
            }"#,
        );
        assert_eq!(extract_app_stats(&message, 92303), AggregateStats::default());

        let no_breakdown = frame(r#"{"msg_type": "app_markup_statistics", "req_id": 100}"#);
        assert_eq!(extract_app_stats(&no_breakdown, 92303), AggregateStats::default());
    }
}
