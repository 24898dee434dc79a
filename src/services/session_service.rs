//! One wallet session: authorize, fan out, fold responses, render.
//!
//! `WalletSession` is the only owner of mutable state. `run` drives it from a
//! single task that selects over socket frames, the rate refresh result and
//! the pending-request deadline.

use chrono::{DateTime, NaiveDate, Utc};
use futures_util::StreamExt;
use reqwest::Client as HttpClient;
use tokio::sync::oneshot;
use tokio::time::{sleep, Instant};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::api::deriv::{
    connect_stream, send_message, AuthorizeRequest, InboundMessage, MarkupStatisticsRequest,
    OutboundMessage,
};
use crate::config::Settings;
use crate::models::{ExchangeRate, OutstandingRequest, PortfolioState};
use crate::services::aggregation_service::AggregationStore;
use crate::services::correlator_service::{
    classify_message, InboundEvent, RequestCorrelator, Resolution, SERIES_DAYS,
};
use crate::services::rate_service::RateProvider;
use crate::services::render_service::WidgetRenderer;
use crate::utils::AppError;

/// What the driver has to do after feeding the session one event
#[derive(Debug, Default)]
pub struct SessionStep {
    pub outbound: Vec<OutboundMessage>,
    pub render_widget: bool,
    pub render_chart: bool,
    /// Every outstanding request has been answered
    pub finished: bool,
}

pub struct WalletSession {
    target_app_id: u64,
    api_token: String,
    login_id: String,
    store: AggregationStore,
    correlator: Option<RequestCorrelator>,
    rate: ExchangeRate,
}

impl WalletSession {
    pub fn new(settings: &Settings, today: NaiveDate) -> Self {
        Self {
            target_app_id: settings.markup_app_id,
            api_token: settings.api_token.clone(),
            login_id: settings.login_id.clone(),
            store: AggregationStore::new(today),
            correlator: None,
            rate: ExchangeRate::initial(settings.default_rate),
        }
    }

    pub fn on_open(&self) -> OutboundMessage {
        OutboundMessage::Authorize(AuthorizeRequest {
            authorize: self.api_token.clone(),
        })
    }

    /// Fold one text frame. Only a rejected authorization is an error; a
    /// frame that does not parse is dropped.
    pub fn on_text(&mut self, text: &str, now: DateTime<Utc>) -> Result<SessionStep, AppError> {
        let message: InboundMessage = match serde_json::from_str(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("⚠ Dropping malformed frame: {}", e);
                return Ok(SessionStep::default());
            }
        };

        match classify_message(&message, self.target_app_id) {
            InboundEvent::Authorized => Ok(self.on_authorized(now)),
            InboundEvent::AuthorizationFailed(reason) => {
                error!("❌ Authorization failed: {}", reason);
                Err(AppError::Authorization(reason))
            }
            InboundEvent::Statistics {
                req_id,
                echoed_day,
                stats,
                error,
            } => {
                let Some(correlator) = self.correlator.as_mut() else {
                    warn!("⚠ Statistics for req_id {} arrived before authorization", req_id);
                    return Ok(SessionStep::default());
                };
                if let Some(error) = error {
                    warn!("⚠ Statistics request {} failed: {}", req_id, error);
                }

                let mut step = SessionStep::default();
                match correlator.resolve(req_id) {
                    Resolution::SeriesPoint { day } => {
                        let day = echoed_day.unwrap_or(day);
                        self.store.apply_series_point(day, stats.markup_usd);
                        debug!(
                            "Series point {}/{}: {} = {}",
                            correlator.series_received(),
                            SERIES_DAYS,
                            day,
                            stats.markup_usd
                        );
                        if correlator.is_series_complete() {
                            self.store.complete_series();
                            step.render_chart = true;
                        }
                        step.render_widget = true;
                    }
                    Resolution::Aggregate(kind) => {
                        self.store
                            .apply_aggregate(kind, stats.markup_usd, stats.transaction_count);
                        step.render_widget = true;
                    }
                    Resolution::Duplicate => {
                        warn!("⚠ Ignoring duplicate response for req_id {}", req_id);
                    }
                    Resolution::Unknown => {
                        warn!("⚠ Ignoring response for unknown req_id {}", req_id);
                    }
                }

                step.finished = correlator.is_settled();
                Ok(step)
            }
            InboundEvent::Ignored(reason) => {
                debug!("Ignoring frame: {}", reason);
                Ok(SessionStep::default())
            }
        }
    }

    fn on_authorized(&mut self, now: DateTime<Utc>) -> SessionStep {
        if self.correlator.is_some() {
            debug!("Already authorized; not fanning out again");
            return SessionStep::default();
        }

        info!("✅ Authorized, requesting markup statistics");
        let correlator = RequestCorrelator::fan_out(now);
        self.store.set_reference_day(now.date_naive());
        let outbound = correlator
            .requests()
            .map(|request| self.statistics_request(request))
            .collect();
        self.correlator = Some(correlator);

        SessionStep {
            outbound,
            ..SessionStep::default()
        }
    }

    fn statistics_request(&self, request: &OutstandingRequest) -> OutboundMessage {
        OutboundMessage::MarkupStatistics(MarkupStatisticsRequest {
            app_markup_statistics: 1,
            date_from: request.range.date_from_wire(),
            date_to: request.range.date_to_wire(),
            loginid: self.login_id.clone(),
            req_id: request.req_id,
        })
    }

    pub fn on_rate(&mut self, rate: ExchangeRate) -> SessionStep {
        self.rate = rate;
        SessionStep {
            render_widget: true,
            ..SessionStep::default()
        }
    }

    /// Give up on whatever is still pending
    pub fn on_timeout(&mut self) {
        let Some(correlator) = &self.correlator else {
            warn!("⏱ Timed out waiting for the authorization reply");
            return;
        };

        warn!(
            "⏱ Timed out waiting for {} response(s): {:?}",
            correlator.pending_ids().len(),
            correlator.pending_ids()
        );
        if !correlator.is_series_complete() {
            warn!(
                "⚠ Daily series incomplete ({}/{}), chart not drawn",
                correlator.series_received(),
                SERIES_DAYS
            );
        }
    }

    pub fn rate(&self) -> &ExchangeRate {
        &self.rate
    }

    pub fn snapshot(&self) -> PortfolioState {
        self.store.snapshot()
    }
}

fn publish(renderer: &WidgetRenderer, session: &WalletSession, step: &SessionStep) {
    if !step.render_widget && !step.render_chart {
        return;
    }
    let state = session.snapshot();
    if step.render_chart {
        match renderer.write_chart(&state) {
            Ok(()) => info!("📈 Chart drawn for {} days", state.series.len()),
            Err(e) => error!("❌ Failed to draw chart: {}", e),
        }
    }
    if let Err(e) = renderer.write_widget(&state, session.rate()) {
        error!("❌ Failed to write widget: {}", e);
    }
}

/// Run one session to completion: every response in, the deadline hit, or
/// the server gone.
pub async fn run(settings: &Settings, http_client: HttpClient) -> Result<(), AppError> {
    let renderer = WidgetRenderer::new(
        settings.markup_app_id,
        &settings.base_currency,
        &settings.local_currency,
        settings.output_path.clone(),
        settings.chart_path.clone(),
    );
    if let Err(e) = renderer.write_loading() {
        warn!("⚠ Failed to write loading widget: {}", e);
    }

    let provider = RateProvider::from_settings(settings, http_client);
    let (rate_tx, mut rate_rx) = oneshot::channel();
    tokio::spawn(async move {
        let _ = rate_tx.send(provider.refresh().await);
    });

    let mut stream = connect_stream(&settings.ws_url, settings.app_id).await?;
    info!("🔌 Connected to {}", settings.ws_url);

    let mut session = WalletSession::new(settings, Utc::now().date_naive());
    send_message(&mut stream, &session.on_open()).await?;

    // Covers the authorize reply first, then restarts at fan-out
    let deadline = sleep(settings.stats_timeout);
    tokio::pin!(deadline);
    let mut rate_pending = true;

    loop {
        tokio::select! {
            frame = stream.next() => {
                let text = match frame {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(close))) => {
                        warn!("🔌 Server closed the connection: {:?}", close);
                        break;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        warn!("🔌 Connection lost: {}", e);
                        break;
                    }
                    None => {
                        warn!("🔌 Connection ended");
                        break;
                    }
                };

                let step = session.on_text(&text, Utc::now())?;
                if !step.outbound.is_empty() {
                    for message in &step.outbound {
                        send_message(&mut stream, message).await?;
                    }
                    debug!("Sent {} statistics requests", step.outbound.len());
                    deadline.as_mut().reset(Instant::now() + settings.stats_timeout);
                }
                publish(&renderer, &session, &step);

                if step.finished {
                    info!("✅ All statistics received");
                    break;
                }
            }
            rate = &mut rate_rx, if rate_pending => {
                rate_pending = false;
                match rate {
                    Ok(rate) => {
                        let step = session.on_rate(rate);
                        publish(&renderer, &session, &step);
                    }
                    Err(_) => warn!("⚠ Rate refresh task ended without a result"),
                }
            }
            () = &mut deadline => {
                session.on_timeout();
                break;
            }
        }
    }

    if let Err(e) = stream.close(None).await {
        debug!("Close handshake failed: {}", e);
    }

    if rate_pending {
        if let Ok(rate) = rate_rx.await {
            let step = session.on_rate(rate);
            publish(&renderer, &session, &step);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AggregateKind, AggregateStats};
    use chrono::{Duration, TimeZone};
    use futures_util::SinkExt;
    use tokio::net::TcpListener;

    fn settings(extra: &[(&str, String)]) -> Settings {
        let mut pairs = vec![
            ("DERIV_APP_ID", "92303".to_string()),
            ("DERIV_LOGIN_ID", "CR0000001".to_string()),
            ("DERIV_API_TOKEN", "tok".to_string()),
        ];
        pairs.extend(extra.iter().cloned());
        Settings::from_lookup(move |name| {
            pairs
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.clone())
        })
        .unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 10, 12, 0, 0).unwrap()
    }

    fn authorized_session() -> WalletSession {
        let mut session = WalletSession::new(&settings(&[]), now().date_naive());
        let step = session
            .on_text(r#"{"msg_type": "authorize", "authorize": {"loginid": "CR0000001"}}"#, now())
            .unwrap();
        assert_eq!(step.outbound.len(), 33);
        session
    }

    fn stats_frame(req_id: u32, date_from: Option<&str>, markup: f64, count: u64) -> String {
        let echo = match date_from {
            Some(from) => format!(r#","echo_req": {{"date_from": "{}"}}"#, from),
            None => String::new(),
        };
        format!(
            r#"{{"msg_type": "app_markup_statistics", "req_id": {}{}, "app_markup_statistics": {{"breakdown": [{{"app_id": 92303, "app_markup_usd": {}, "transactions_count": {}}}]}}}}"#,
            req_id, echo, markup, count
        )
    }

    #[test]
    fn open_sends_authorize() {
        let session = WalletSession::new(&settings(&[]), now().date_naive());
        assert_eq!(
            serde_json::to_string(&session.on_open()).unwrap(),
            r#"{"authorize":"tok"}"#
        );
    }

    #[test]
    fn authorize_fans_out_series_then_aggregates() {
        let mut session = WalletSession::new(&settings(&[]), now().date_naive());
        let step = session
            .on_text(r#"{"msg_type": "authorize", "authorize": {}}"#, now())
            .unwrap();

        let ids: Vec<u32> = step
            .outbound
            .iter()
            .filter_map(|m| match m {
                OutboundMessage::MarkupStatistics(request) => Some(request.req_id),
                OutboundMessage::Authorize(_) => None,
            })
            .collect();
        let mut expected: Vec<u32> = (1..=30).collect();
        expected.extend([100, 101, 102]);
        assert_eq!(ids, expected);

        let OutboundMessage::MarkupStatistics(first) = &step.outbound[0] else {
            panic!("expected a statistics request");
        };
        assert_eq!(first.date_from, "2024-04-10 00:00:00");
        assert_eq!(first.date_to, "2024-04-10 23:59:59");
        assert_eq!(first.loginid, "CR0000001");

        let again = session
            .on_text(r#"{"msg_type": "authorize", "authorize": {}}"#, now())
            .unwrap();
        assert!(again.outbound.is_empty());
    }

    #[test]
    fn rejected_authorization_ends_session() {
        let mut session = WalletSession::new(&settings(&[]), now().date_naive());
        let result = session.on_text(
            r#"{"msg_type": "authorize", "error": {"code": "InvalidToken", "message": "The token is invalid."}}"#,
            now(),
        );
        assert!(matches!(result, Err(AppError::Authorization(_))));
    }

    #[test]
    fn aggregates_fill_the_snapshot() {
        let mut session = authorized_session();
        for (req_id, markup, count) in [(100, 5.0, 3), (101, 20.0, 10), (102, 80.0, 40)] {
            let step = session
                .on_text(&stats_frame(req_id, None, markup, count), now())
                .unwrap();
            assert!(step.render_widget);
            assert!(!step.render_chart);
        }

        let state = session.snapshot();
        assert_eq!(state.aggregate(AggregateKind::Daily), AggregateStats::new(5.0, 3));
        assert_eq!(state.aggregate(AggregateKind::Weekly), AggregateStats::new(20.0, 10));
        assert_eq!(state.aggregate(AggregateKind::Monthly), AggregateStats::new(80.0, 40));
        assert_eq!(state.current_month, 80.0);
        assert_eq!(session.rate().to_local(state.current_month), 10400.0);
    }

    #[test]
    fn chart_only_after_thirty_distinct_series_responses() {
        let mut session = authorized_session();
        for req_id in 1..=29u32 {
            let step = session
                .on_text(&stats_frame(req_id, None, 10.0, 1), now())
                .unwrap();
            assert!(!step.render_chart);
        }

        let duplicate = session.on_text(&stats_frame(29, None, 10.0, 1), now()).unwrap();
        assert!(!duplicate.render_chart);
        assert!(!session.snapshot().series_complete);

        let last = session.on_text(&stats_frame(30, None, 10.0, 1), now()).unwrap();
        assert!(last.render_chart);
        assert!(!last.finished);

        let state = session.snapshot();
        assert!(state.series_complete);
        assert_eq!(state.series.len(), 30);
        assert!(state.series.windows(2).all(|pair| pair[0].date < pair[1].date));
        assert_eq!(state.projected_month, 300.0);
    }

    #[test]
    fn series_day_prefers_echoed_date() {
        let mut session = authorized_session();
        session
            .on_text(&stats_frame(1, Some("2024-04-02 00:00:00"), 1.0, 1), now())
            .unwrap();
        session.on_text(&stats_frame(2, Some("garbage"), 2.0, 1), now()).unwrap();

        let dates: Vec<NaiveDate> = session.snapshot().series.iter().map(|p| p.date).collect();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 4, 2).unwrap(),
                now().date_naive() - Duration::days(1),
            ]
        );
    }

    #[test]
    fn finished_once_everything_answered() {
        let mut session = authorized_session();
        let mut last = SessionStep::default();
        for req_id in (1..=30u32).chain([100, 101, 102]) {
            last = session.on_text(&stats_frame(req_id, None, 1.0, 1), now()).unwrap();
        }
        assert!(last.finished);
    }

    #[test]
    fn malformed_and_unknown_frames_change_nothing() {
        let mut session = authorized_session();
        let before = session.snapshot();

        let step = session.on_text("{not json", now()).unwrap();
        assert!(!step.render_widget);
        let step = session.on_text(&stats_frame(77, None, 9.0, 9), now()).unwrap();
        assert!(!step.render_widget);
        let step = session.on_text(r#"{"msg_type": "ping", "ping": "pong"}"#, now()).unwrap();
        assert!(!step.render_widget);

        assert_eq!(session.snapshot(), before);
    }

    #[test]
    fn statistics_before_authorize_are_ignored() {
        let mut session = WalletSession::new(&settings(&[]), now().date_naive());
        let step = session.on_text(&stats_frame(100, None, 5.0, 1), now()).unwrap();
        assert!(!step.render_widget);
        assert_eq!(session.snapshot().daily, AggregateStats::default());
    }

    #[test]
    fn rate_update_triggers_render() {
        let mut session = authorized_session();
        let step = session.on_rate(ExchangeRate::fallback_default(125.0));
        assert!(step.render_widget);
        assert_eq!(session.rate().value, 125.0);
    }

    type ServerStream = tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>;

    /// Accept one client, answer its authorize and collect the 33 request ids
    async fn accept_authorized(listener: &TcpListener) -> (ServerStream, Vec<u32>) {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();

        let authorize = ws.next().await.unwrap().unwrap();
        assert!(authorize.to_text().unwrap().contains("authorize"));
        ws.send(Message::Text(r#"{"msg_type": "authorize", "authorize": {}}"#.to_string()))
            .await
            .unwrap();

        let mut req_ids = Vec::new();
        while req_ids.len() < 33 {
            let frame = ws.next().await.unwrap().unwrap();
            let value: serde_json::Value = serde_json::from_str(frame.to_text().unwrap()).unwrap();
            req_ids.push(value["req_id"].as_u64().unwrap() as u32);
        }
        (ws, req_ids)
    }

    /// Settings pointed at a local server, writing into a fresh temp dir
    fn local_settings(port: u16, name: &str, timeout_secs: u64) -> (Settings, std::path::PathBuf) {
        let dir = std::env::temp_dir().join(format!("markup-wallet-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let settings = settings(&[
            ("DERIV_WS_URL", format!("ws://127.0.0.1:{}/websockets/v3", port)),
            ("FALLBACK_RATE_URL", "http://127.0.0.1:9/{base}".to_string()),
            ("WALLET_OUTPUT_PATH", dir.join("wallet.html").to_string_lossy().into_owned()),
            ("WALLET_CHART_PATH", dir.join("chart.png").to_string_lossy().into_owned()),
            ("STATS_TIMEOUT_SECS", timeout_secs.to_string()),
        ]);
        (settings, dir)
    }

    fn read_widget(dir: &std::path::Path) -> String {
        let html = std::fs::read_to_string(dir.join("wallet.html")).unwrap();
        let _ = std::fs::remove_dir_all(dir);
        html
    }

    #[tokio::test]
    async fn run_against_local_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut ws, req_ids) = accept_authorized(&listener).await;
            for req_id in req_ids {
                let markup = if req_id == 102 { 80.0 } else { 2.0 };
                ws.send(Message::Text(stats_frame(req_id, None, markup, 4)))
                    .await
                    .unwrap();
            }
            while let Some(Ok(_)) = ws.next().await {}
        });

        let (settings, dir) = local_settings(port, "complete", 5);
        run(&settings, HttpClient::new()).await.unwrap();
        server.await.unwrap();

        let html = read_widget(&dir);
        assert!(html.contains("$80.00"));
        assert!(html.contains("Updated: Default rate"));
    }

    #[tokio::test]
    async fn deadline_ends_session_with_partial_data() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut ws, _) = accept_authorized(&listener).await;
            ws.send(Message::Text(stats_frame(100, None, 5.0, 3)))
                .await
                .unwrap();
            while let Some(Ok(_)) = ws.next().await {}
        });

        let (settings, dir) = local_settings(port, "deadline", 1);
        run(&settings, HttpClient::new()).await.unwrap();
        server.await.unwrap();

        let html = read_widget(&dir);
        assert!(html.contains("$5.00"));
        assert!(html.contains("Transactions: 0"));
        assert!(!html.contains("markupGraph"));
    }

    #[tokio::test]
    async fn dropped_connection_is_not_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut ws, _) = accept_authorized(&listener).await;
            ws.send(Message::Text(stats_frame(100, None, 5.0, 3)))
                .await
                .unwrap();
            // no close frame
            drop(ws);
        });

        let (settings, dir) = local_settings(port, "dropped", 5);
        run(&settings, HttpClient::new()).await.unwrap();
        server.await.unwrap();

        let html = read_widget(&dir);
        assert!(html.contains("$5.00"));
        assert!(html.contains("Updated: Default rate"));
    }

    #[tokio::test]
    async fn silent_authorize_hits_deadline() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            while let Some(Ok(_)) = ws.next().await {}
        });

        let (settings, dir) = local_settings(port, "silent", 1);
        run(&settings, HttpClient::new()).await.unwrap();
        server.await.unwrap();

        let html = read_widget(&dir);
        assert!(html.contains("Updated: Default rate"));
        assert!(!html.contains("markupGraph"));
    }
}
