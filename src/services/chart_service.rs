use std::path::Path;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use plotters::prelude::*;
use tracing::debug;

use crate::models::DailySeriesPoint;

const LINE_COLOR: RGBColor = RGBColor(102, 126, 234);
const AXIS_TEXT_COLOR: RGBColor = RGBColor(102, 102, 102);

fn point_time(point: &DailySeriesPoint) -> DateTime<Utc> {
    point.date.and_time(NaiveTime::MIN).and_utc()
}

/// X range of the chart; a single day is padded so the range is never empty
fn time_bounds(points: &[DailySeriesPoint]) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let first = points.iter().map(point_time).min()?;
    let last = points.iter().map(point_time).max()?;
    if first == last {
        Some((first - Duration::hours(12), last + Duration::hours(12)))
    } else {
        Some((first, last))
    }
}

/// Y range from zero to the largest markup plus 10% headroom
fn value_bounds(points: &[DailySeriesPoint]) -> (f64, f64) {
    let max_markup = points
        .iter()
        .map(|p| p.markup_usd)
        .fold(0.0_f64, f64::max);
    let y_max = if max_markup > 0.0 { max_markup * 1.1 } else { 1.0 };
    (0.0, y_max)
}

/// Render the daily markup series as a PNG line chart at `path`
pub fn render_series_chart(
    points: &[DailySeriesPoint],
    path: &Path,
    width: u32,
    height: u32,
) -> Result<(), String> {
    let (x_min, x_max) =
        time_bounds(points).ok_or_else(|| "No data provided to chart".to_string())?;
    let (y_min, y_max) = value_bounds(points);

    {
        let backend = BitMapBackend::new(path, (width, height));
        let root = backend.into_drawing_area();
        root.fill(&WHITE)
            .map_err(|e| format!("Failed to fill canvas: {}", e))?;

        let mut chart = ChartBuilder::on(&root)
            .caption("Daily Markup (USD)", ("sans-serif", 28.0).into_font())
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(x_min..x_max, y_min..y_max)
            .map_err(|e| format!("Failed to build chart: {}", e))?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .light_line_style(LINE_COLOR.mix(0.1))
            .label_style(("sans-serif", 12).into_font().color(&AXIS_TEXT_COLOR))
            .x_label_formatter(&|x: &DateTime<Utc>| x.format("%b %-d").to_string())
            .y_label_formatter(&|y: &f64| format!("${:.0}", y))
            .draw()
            .map_err(|e| format!("Failed to draw mesh: {}", e))?;

        chart
            .draw_series(AreaSeries::new(
                points.iter().map(|p| (point_time(p), p.markup_usd)),
                0.0,
                LINE_COLOR.mix(0.1),
            ))
            .map_err(|e| format!("Failed to draw area: {}", e))?;

        chart
            .draw_series(LineSeries::new(
                points.iter().map(|p| (point_time(p), p.markup_usd)),
                LINE_COLOR.stroke_width(3),
            ))
            .map_err(|e| format!("Failed to draw line: {}", e))?;

        chart
            .draw_series(
                points
                    .iter()
                    .map(|p| Circle::new((point_time(p), p.markup_usd), 5, LINE_COLOR.filled())),
            )
            .map_err(|e| format!("Failed to draw points: {}", e))?;

        root.present()
            .map_err(|e| format!("Failed to render chart: {}", e))?;
    }

    debug!("📊 Chart written to {} ({} points)", path.display(), points.len());
    Ok(())
}
