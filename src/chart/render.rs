//! Chart rendering to SVG and to the terminal.
//!
//! Every chart gets the same post-processing: the value axis is labelled in
//! billions with one decimal place, and each bar carries its value rounded
//! to a whole number.

use super::spec::{ChartKind, ChartSpec};
use super::ChartError;
use crate::analysis::aggregator::{ensure_column, partition};
use crate::dataset::Dataset;
use serde::Serialize;
use std::fmt::Write as _;
use tracing::debug;

const SVG_MARGIN_LEFT: f64 = 90.0;
const SVG_MARGIN_RIGHT: f64 = 30.0;
const SVG_MARGIN_TOP: f64 = 50.0;
const SVG_MARGIN_BOTTOM: f64 = 100.0;
const BAR_LABEL_PADDING: f64 = 3.0;
const TEXT_BAR_WIDTH: usize = 40;

/// One plotted category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
}

/// A rendered chart.
#[derive(Debug, Clone, Serialize)]
pub struct RenderedChart {
    pub title: String,
    pub spec: ChartSpec,
    pub points: Vec<ChartPoint>,
    /// Standalone SVG document.
    #[serde(skip)]
    pub svg: String,
    /// Terminal rendering.
    #[serde(skip)]
    pub text: String,
}

/// Canvas size for SVG output.
#[derive(Debug, Clone, Copy)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self {
            width: 800,
            height: 480,
        }
    }
}

/// Value axis tick label: billions with one decimal place.
pub fn format_billions(value: f64) -> String {
    format!("{:.1}B", value * 1e-9)
}

/// Bar value label: rounded to a whole number.
pub fn bar_label(value: f64) -> String {
    format!("{:.0}", value)
}

/// Evaluate a chart specification against the dataset.
///
/// Bar charts are ordered by value, largest first; line charts follow the
/// category order (chronological for dates). `top` keeps the first N points
/// of that order.
pub fn build_points(dataset: &Dataset, spec: &ChartSpec) -> Result<Vec<ChartPoint>, ChartError> {
    ensure_column(dataset, spec.group_by)?;

    let mut points: Vec<ChartPoint> = partition(dataset.records(), spec.group_by)
        .into_iter()
        .map(|(label, totals)| ChartPoint {
            label,
            value: spec.aggregation.apply(&totals),
        })
        .collect();

    if spec.chart_type.has_bars() {
        points.sort_by(|a, b| b.value.total_cmp(&a.value));
    }
    if let Some(top) = spec.top {
        points.truncate(top);
    }

    if points.is_empty() {
        return Err(ChartError::NoData(spec.group_by.column().to_string()));
    }
    Ok(points)
}

/// Build and render a chart.
pub fn render_chart(
    dataset: &Dataset,
    spec: &ChartSpec,
    size: CanvasSize,
) -> Result<RenderedChart, ChartError> {
    let points = build_points(dataset, spec)?;
    let title = spec.display_title();
    debug!("Rendering {} chart with {} points", spec.chart_type.name(), points.len());

    let svg = render_svg(&title, spec, &points, size);
    let text = render_text(&title, spec, &points);

    Ok(RenderedChart {
        title,
        spec: spec.clone(),
        points,
        svg,
        text,
    })
}

/// Tick values from zero to at least `max`, on a 1/2/5 step grid.
pub fn axis_ticks(max: f64) -> Vec<f64> {
    if max <= 0.0 || !max.is_finite() {
        return vec![0.0, 1.0];
    }

    let raw_step = max / 5.0;
    let magnitude = 10f64.powi(raw_step.log10().floor() as i32);
    let step = [1.0, 2.0, 5.0, 10.0]
        .iter()
        .map(|m| m * magnitude)
        .find(|s| *s >= raw_step)
        .unwrap_or(10.0 * magnitude);

    let count = (max / step).ceil() as usize;
    (0..=count).map(|i| i as f64 * step).collect()
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn render_svg(title: &str, spec: &ChartSpec, points: &[ChartPoint], size: CanvasSize) -> String {
    let width = size.width as f64;
    let height = size.height as f64;
    let plot_w = (width - SVG_MARGIN_LEFT - SVG_MARGIN_RIGHT).max(1.0);
    let plot_h = (height - SVG_MARGIN_TOP - SVG_MARGIN_BOTTOM).max(1.0);
    let left = SVG_MARGIN_LEFT;
    let top = SVG_MARGIN_TOP;
    let bottom = top + plot_h;

    let max_value = points.iter().map(|p| p.value.max(0.0)).fold(0.0, f64::max);
    let ticks = axis_ticks(max_value);
    let axis_max = ticks.last().copied().unwrap_or(1.0).max(f64::MIN_POSITIVE);
    let scale = |v: f64| v.max(0.0) / axis_max;

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif" font-size="12">"#,
        w = size.width,
        h = size.height
    );
    let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);
    let _ = writeln!(
        svg,
        r#"<text x="{:.1}" y="28" text-anchor="middle" font-size="16" font-weight="bold">{}</text>"#,
        width / 2.0,
        escape_xml(title)
    );

    let horizontal = spec.chart_type == ChartKind::HorizontalBar;
    let n = points.len().max(1) as f64;

    // Value axis grid and billions tick labels.
    for tick in &ticks {
        let label = format_billions(*tick);
        if horizontal {
            let x = left + scale(*tick) * plot_w;
            let _ = writeln!(
                svg,
                r##"<line x1="{x:.1}" y1="{top:.1}" x2="{x:.1}" y2="{bottom:.1}" stroke="#dddddd"/>"##
            );
            let _ = writeln!(
                svg,
                r#"<text x="{x:.1}" y="{:.1}" text-anchor="middle">{label}</text>"#,
                bottom + 16.0
            );
        } else {
            let y = bottom - scale(*tick) * plot_h;
            let _ = writeln!(
                svg,
                r##"<line x1="{left:.1}" y1="{y:.1}" x2="{:.1}" y2="{y:.1}" stroke="#dddddd"/>"##,
                left + plot_w
            );
            let _ = writeln!(
                svg,
                r#"<text x="{:.1}" y="{:.1}" text-anchor="end">{label}</text>"#,
                left - 6.0,
                y + 4.0
            );
        }
    }

    match spec.chart_type {
        ChartKind::Bar => {
            let slot = plot_w / n;
            for (i, point) in points.iter().enumerate() {
                let bar_h = scale(point.value) * plot_h;
                let x = left + i as f64 * slot + slot * 0.15;
                let y = bottom - bar_h;
                let bar_w = slot * 0.7;
                let _ = writeln!(
                    svg,
                    r##"<rect x="{x:.1}" y="{y:.1}" width="{bar_w:.1}" height="{bar_h:.1}" fill="#088f8f"/>"##
                );
                let _ = writeln!(
                    svg,
                    r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="10">{}</text>"#,
                    x + bar_w / 2.0,
                    y - BAR_LABEL_PADDING,
                    bar_label(point.value)
                );
                let cx = x + bar_w / 2.0;
                let ly = bottom + 14.0;
                let _ = writeln!(
                    svg,
                    r#"<text x="{cx:.1}" y="{ly:.1}" text-anchor="end" transform="rotate(-30 {cx:.1} {ly:.1})">{}</text>"#,
                    escape_xml(&point.label)
                );
            }
        }
        ChartKind::HorizontalBar => {
            let slot = plot_h / n;
            for (i, point) in points.iter().enumerate() {
                let bar_w = scale(point.value) * plot_w;
                let y = top + i as f64 * slot + slot * 0.15;
                let bar_h = slot * 0.7;
                let _ = writeln!(
                    svg,
                    r##"<rect x="{left:.1}" y="{y:.1}" width="{bar_w:.1}" height="{bar_h:.1}" fill="#088f8f"/>"##
                );
                let _ = writeln!(
                    svg,
                    r#"<text x="{:.1}" y="{:.1}" font-size="10">{}</text>"#,
                    left + bar_w + BAR_LABEL_PADDING,
                    y + bar_h / 2.0 + 4.0,
                    bar_label(point.value)
                );
                let _ = writeln!(
                    svg,
                    r#"<text x="{:.1}" y="{:.1}" text-anchor="end">{}</text>"#,
                    left - 6.0,
                    y + bar_h / 2.0 + 4.0,
                    escape_xml(&point.label)
                );
            }
        }
        ChartKind::Line => {
            let slot = plot_w / n;
            let coords: Vec<(f64, f64)> = points
                .iter()
                .enumerate()
                .map(|(i, p)| {
                    (
                        left + i as f64 * slot + slot / 2.0,
                        bottom - scale(p.value) * plot_h,
                    )
                })
                .collect();
            let path = coords
                .iter()
                .map(|(x, y)| format!("{:.1},{:.1}", x, y))
                .collect::<Vec<_>>()
                .join(" ");
            let _ = writeln!(
                svg,
                r##"<polyline points="{path}" fill="none" stroke="#088f8f" stroke-width="2"/>"##
            );
            for ((x, y), point) in coords.iter().zip(points) {
                let _ = writeln!(
                    svg,
                    r##"<circle cx="{x:.1}" cy="{y:.1}" r="3" fill="#088f8f"/>"##
                );
                let ly = bottom + 14.0;
                let _ = writeln!(
                    svg,
                    r#"<text x="{x:.1}" y="{ly:.1}" text-anchor="end" transform="rotate(-30 {x:.1} {ly:.1})">{}</text>"#,
                    escape_xml(&point.label)
                );
            }
        }
    }

    // Axes.
    let _ = writeln!(
        svg,
        r#"<line x1="{left:.1}" y1="{top:.1}" x2="{left:.1}" y2="{bottom:.1}" stroke="black"/>"#
    );
    let _ = writeln!(
        svg,
        r#"<line x1="{left:.1}" y1="{bottom:.1}" x2="{:.1}" y2="{bottom:.1}" stroke="black"/>"#,
        left + plot_w
    );
    let _ = writeln!(
        svg,
        r#"<text x="16" y="{:.1}" text-anchor="middle" transform="rotate(-90 16 {:.1})">{}</text>"#,
        top + plot_h / 2.0,
        top + plot_h / 2.0,
        if horizontal {
            escape_xml(spec.group_by.column())
        } else {
            escape_xml(spec.value_label())
        }
    );
    svg.push_str("</svg>\n");

    svg
}

fn render_text(title: &str, spec: &ChartSpec, points: &[ChartPoint]) -> String {
    let max_value = points.iter().map(|p| p.value.max(0.0)).fold(0.0, f64::max);
    let label_width = points
        .iter()
        .map(|p| p.label.chars().count())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(out, "{}", "=".repeat(title.chars().count()));

    for point in points {
        let cells = if max_value > 0.0 {
            ((point.value.max(0.0) / max_value) * TEXT_BAR_WIDTH as f64).round() as usize
        } else {
            0
        };
        let bar = if spec.chart_type.has_bars() {
            "█".repeat(cells)
        } else {
            format!("{}●", "─".repeat(cells.saturating_sub(1)))
        };
        let _ = writeln!(
            out,
            "{:<width$} │{} {}",
            point.label,
            bar,
            bar_label(point.value),
            width = label_width
        );
    }

    let ticks = axis_ticks(max_value);
    let _ = write!(
        out,
        "{:<width$} └ {} .. {}",
        "",
        format_billions(0.0),
        format_billions(ticks.last().copied().unwrap_or(0.0)),
        width = label_width
    );

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::spec::Aggregation;
    use crate::dataset::fixtures::regional;
    use crate::models::GroupingDimension;

    fn spec(kind: ChartKind, group_by: GroupingDimension, aggregation: Aggregation) -> ChartSpec {
        ChartSpec {
            chart_type: kind,
            group_by,
            aggregation,
            title: None,
            top: None,
        }
    }

    #[test]
    fn test_format_billions() {
        assert_eq!(format_billions(0.0), "0.0B");
        assert_eq!(format_billions(3_200_000_000.0), "3.2B");
        assert_eq!(format_billions(1_260_000_000.0), "1.3B");
        assert_eq!(format_billions(420_000_000.0), "0.4B");
    }

    #[test]
    fn test_bar_label_rounds() {
        assert_eq!(bar_label(1234.4), "1234");
        assert_eq!(bar_label(1234.6), "1235");
        assert_eq!(bar_label(3_200_000_000.0), "3200000000");
    }

    #[test]
    fn test_axis_ticks() {
        assert_eq!(axis_ticks(3_200_000_000.0).last().copied(), Some(4_000_000_000.0));
        let ticks = axis_ticks(10.0);
        assert_eq!(ticks, vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
        assert_eq!(axis_ticks(0.0), vec![0.0, 1.0]);
    }

    #[test]
    fn test_bar_points_sorted_descending() {
        let points = build_points(
            &regional(),
            &spec(ChartKind::Bar, GroupingDimension::Region, Aggregation::Sum),
        )
        .unwrap();

        let labels: Vec<&str> = points.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["Sindh", "Punjab", "Capital"]);
        assert_eq!(points[0].value, 3_200_000_000.0);
    }

    #[test]
    fn test_line_points_keep_category_order_and_top() {
        let mut line = spec(ChartKind::Line, GroupingDimension::City, Aggregation::Count);
        line.top = Some(2);
        let points = build_points(&regional(), &line).unwrap();

        let labels: Vec<&str> = points.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["Islamabad", "Karachi"]);
        assert_eq!(points[1].value, 2.0);
    }

    #[test]
    fn test_missing_column_is_chart_error() {
        let dataset = Dataset::new(
            regional().records().to_vec(),
            vec!["transaction_id".to_string(), "deposit_amount".to_string()],
        );
        let err = build_points(
            &dataset,
            &spec(ChartKind::Bar, GroupingDimension::Region, Aggregation::Sum),
        )
        .unwrap_err();
        assert!(matches!(err, ChartError::Analysis(_)));
    }

    #[test]
    fn test_empty_dataset_has_no_data() {
        let err = build_points(
            &Dataset::from_records(Vec::new()),
            &spec(ChartKind::Bar, GroupingDimension::Region, Aggregation::Sum),
        )
        .unwrap_err();
        assert!(matches!(err, ChartError::NoData(_)));
    }

    #[test]
    fn test_svg_post_processing() {
        let chart = render_chart(
            &regional(),
            &spec(ChartKind::Bar, GroupingDimension::Region, Aggregation::Sum),
            CanvasSize::default(),
        )
        .unwrap();

        assert!(chart.svg.starts_with("<svg"));
        assert!(chart.svg.trim_end().ends_with("</svg>"));
        assert!(chart.svg.contains(">4.0B</text>"));
        assert!(chart.svg.contains(">3200000000</text>"));
        assert!(chart.svg.contains(">Capital</text>"));
        assert_eq!(chart.svg.matches("fill=\"#088f8f\"").count(), 3);
        assert_eq!(chart.title, "Total deposits by region");
    }

    #[test]
    fn test_line_chart_has_no_bar_labels() {
        let chart = render_chart(
            &regional(),
            &spec(ChartKind::Line, GroupingDimension::Region, Aggregation::Sum),
            CanvasSize::default(),
        )
        .unwrap();

        assert!(chart.svg.contains("<polyline"));
        assert!(!chart.svg.contains(">3200000000</text>"));
    }

    #[test]
    fn test_labels_are_escaped() {
        let mut records = regional().records().to_vec();
        records[0].region = "North & <West>".to_string();
        let chart = render_chart(
            &Dataset::from_records(records),
            &spec(ChartKind::HorizontalBar, GroupingDimension::Region, Aggregation::Sum),
            CanvasSize::default(),
        )
        .unwrap();

        assert!(chart.svg.contains("North &amp; &lt;West&gt;"));
        assert!(!chart.svg.contains("<West>"));
    }

    #[test]
    fn test_text_rendering() {
        let chart = render_chart(
            &regional(),
            &spec(ChartKind::Bar, GroupingDimension::Region, Aggregation::Sum),
            CanvasSize::default(),
        )
        .unwrap();

        let lines: Vec<&str> = chart.text.lines().collect();
        assert_eq!(lines[0], "Total deposits by region");
        assert!(lines[2].starts_with("Sindh"));
        assert!(lines[2].contains(&"█".repeat(TEXT_BAR_WIDTH)));
        assert!(lines[2].ends_with("3200000000"));
        assert!(chart.text.contains("0.0B .. 4.0B"));
    }
}
