//! Widget markup and console summary. Presentation only; every number comes
//! from a `PortfolioState` snapshot and an `ExchangeRate`.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::models::{AggregateKind, ExchangeRate, PortfolioState};
use crate::services::{chart_service, rate_service};
use crate::utils::{format_local, format_usd, AppError, Table};

const CHART_WIDTH: u32 = 1024;
const CHART_HEIGHT: u32 = 400;

/// Currency labels and the app id shown in the footer
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub target_app_id: u64,
    pub base_currency: String,
    pub local_currency: String,
    /// `src` of the chart image, relative to the widget file
    pub chart_src: String,
}

impl RenderContext {
    fn local(&self, amount: f64) -> String {
        format_local(amount, &self.local_currency)
    }
}

/// Markup shown before any data has arrived
pub fn render_loading(context: &RenderContext) -> String {
    format!(
        r#"<div class="wallet">
    <div class="wallet-header">Portfolio Overview - App ID {}</div>
    <div class="loading">Loading data...</div>
</div>
"#,
        context.target_app_id
    )
}

fn summary_card(title: &str, usd: f64, rate: &ExchangeRate, context: &RenderContext) -> String {
    format!(
        r#"        <div class="summary-card">
            <h3>{}</h3>
            <div class="usd">{}</div>
            <div class="kes">{}</div>
        </div>
"#,
        title,
        format_usd(usd),
        context.local(rate.to_local(usd))
    )
}

fn stat_block(
    kind: AggregateKind,
    state: &PortfolioState,
    rate: &ExchangeRate,
    context: &RenderContext,
) -> String {
    let stats = state.aggregate(kind);
    format!(
        r#"        <div class="stat">
            <div class="stat-header">
                <div class="stat-title">{title}</div>
                <div class="stat-period">{period}</div>
            </div>
            <div class="stat-values">
                <div class="stat-value">
                    <div class="label">{base}</div>
                    <div class="amount usd">{usd}</div>
                </div>
                <div class="stat-value">
                    <div class="label">{local_code}</div>
                    <div class="amount kes">{local}</div>
                </div>
            </div>
            <div class="stat-runs">Transactions: {runs}</div>
        </div>
"#,
        title = kind.title(),
        period = kind.period_label(),
        base = context.base_currency,
        usd = format_usd(stats.markup_usd),
        local_code = context.local_currency,
        local = context.local(rate.to_local(stats.markup_usd)),
        runs = stats.transaction_count,
    )
}

/// Full widget markup for the current snapshot
pub fn render_widget(
    state: &PortfolioState,
    rate: &ExchangeRate,
    context: &RenderContext,
    now: DateTime<Utc>,
) -> String {
    let mut html = String::from(
        "<div class=\"wallet\">\n    <div class=\"wallet-header\">Portfolio Overview</div>\n\n",
    );

    html.push_str("    <div class=\"summary-cards\">\n");
    html.push_str(&summary_card("Current Month", state.current_month, rate, context));
    html.push_str(&summary_card("Predicted Month", state.projected_month, rate, context));
    html.push_str("    </div>\n\n");

    html.push_str("    <div class=\"stats-grid\">\n");
    for kind in AggregateKind::ALL {
        html.push_str(&stat_block(kind, state, rate, context));
    }
    html.push_str("    </div>\n\n");

    if state.series_complete {
        html.push_str(&format!(
            "    <div class=\"chart\"><img id=\"markupGraph\" src=\"{}\" alt=\"Daily Markup ({})\"></div>\n\n",
            context.chart_src, context.base_currency
        ));
    }

    html.push_str(&format!(
        "    <div class=\"wallet-footer\">\n        Exchange Rate: 1 {} = {:.2} {}<br>\n        <span class=\"note\">Showing data filtered for App ID {}</span>\n",
        context.base_currency, rate.value, context.local_currency, context.target_app_id
    ));
    if let Some(label) = &rate.last_updated {
        html.push_str(&format!(
            "        <br><span class=\"note\">Updated: {}</span>\n",
            rate_service::format_freshness(label, now)
        ));
    }
    html.push_str("    </div>\n</div>\n");

    html
}

/// Period | USD | KES | Transactions table for the console
pub fn render_text_summary(
    state: &PortfolioState,
    rate: &ExchangeRate,
    context: &RenderContext,
) -> String {
    let mut table = Table::new(&[
        "Period",
        &context.base_currency,
        &context.local_currency,
        "Transactions",
    ]);

    for (label, usd, runs) in [
        ("Current Month", state.current_month, None),
        ("Predicted Month", state.projected_month, None),
        ("Today", state.daily.markup_usd, Some(state.daily.transaction_count)),
        ("7 Days", state.weekly.markup_usd, Some(state.weekly.transaction_count)),
        ("30 Days", state.monthly.markup_usd, Some(state.monthly.transaction_count)),
    ] {
        table.add_row(vec![
            label.to_string(),
            format_usd(usd),
            context.local(rate.to_local(usd)),
            runs.map(|r| r.to_string()).unwrap_or_default(),
        ]);
    }

    table.render()
}

/// Writes the widget file wholesale on every update, and the chart once
pub struct WidgetRenderer {
    context: RenderContext,
    output_path: PathBuf,
    chart_path: PathBuf,
}

impl WidgetRenderer {
    pub fn new(target_app_id: u64, base_currency: &str, local_currency: &str, output_path: PathBuf, chart_path: PathBuf) -> Self {
        let chart_src = chart_src_for(&output_path, &chart_path);
        Self {
            context: RenderContext {
                target_app_id,
                base_currency: base_currency.to_string(),
                local_currency: local_currency.to_string(),
                chart_src,
            },
            output_path,
            chart_path,
        }
    }

    pub fn write_loading(&self) -> Result<(), AppError> {
        fs::write(&self.output_path, render_loading(&self.context))?;
        Ok(())
    }

    pub fn write_widget(&self, state: &PortfolioState, rate: &ExchangeRate) -> Result<(), AppError> {
        let html = render_widget(state, rate, &self.context, Utc::now());
        fs::write(&self.output_path, html)?;
        debug!("Widget written to {}", self.output_path.display());
        info!(
            "📊 Wallet summary:\n{}",
            render_text_summary(state, rate, &self.context)
        );
        Ok(())
    }

    pub fn write_chart(&self, state: &PortfolioState) -> Result<(), AppError> {
        if !state.series_complete {
            warn!("Chart requested before the series completed; skipping");
            return Ok(());
        }
        chart_service::render_series_chart(&state.series, &self.chart_path, CHART_WIDTH, CHART_HEIGHT)
            .map_err(AppError::Chart)
    }
}

/// Chart path relative to the widget's directory when possible
fn chart_src_for(output_path: &Path, chart_path: &Path) -> String {
    let relative = output_path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .and_then(|dir| chart_path.strip_prefix(dir).ok())
        .unwrap_or(chart_path);
    relative.to_string_lossy().into_owned()
}
