//! Waterfall chart model for per-segment total effects.
//!
//! Each segment is a floating bar that starts where the previous one ended;
//! a final net bar spans from zero to the table's total effect. The model is
//! renderer agnostic: [`WaterfallChart::to_plotly`] emits a Plotly figure and
//! [`WaterfallChart::render_lines`] a plain-text rendering.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::attribution::engine::AttributionTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarKind {
    Increase,
    Decrease,
    Flat,
    Net,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterfallBar {
    pub label: String,
    pub delta: f64,
    /// Running total before this bar
    pub base: f64,
    /// Running total after this bar
    pub end: f64,
    pub kind: BarKind,
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterfallStyle {
    pub title: String,
    pub totals_label: String,
    pub increasing_color: String,
    pub decreasing_color: String,
    pub totals_color: String,
    pub connector_color: String,
    pub height: u32,
}

impl Default for WaterfallStyle {
    fn default() -> Self {
        Self {
            title: "Brinson Waterfall: Fund vs Benchmark".into(),
            totals_label: "Net Attribution".into(),
            increasing_color: "green".into(),
            decreasing_color: "red".into(),
            totals_color: "rgb(70, 100, 140)".into(),
            connector_color: "rgb(63, 63, 63)".into(),
            height: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaterfallChart {
    pub title: String,
    /// Segment bars in table order, followed by the net bar
    pub bars: Vec<WaterfallBar>,
    pub net: f64,
    pub style: WaterfallStyle,
}

impl WaterfallChart {
    pub fn from_table(table: &AttributionTable, style: &WaterfallStyle) -> Self {
        let mut bars = Vec::with_capacity(table.rows.len() + 1);
        let mut running = 0.0;

        for row in &table.rows {
            let delta = row.total_effect;
            let kind = if delta > 0.0 {
                BarKind::Increase
            } else if delta < 0.0 {
                BarKind::Decrease
            } else {
                BarKind::Flat
            };
            let color = match kind {
                BarKind::Decrease => style.decreasing_color.clone(),
                _ => style.increasing_color.clone(),
            };
            bars.push(WaterfallBar {
                label: row.segment_id.clone(),
                delta,
                base: running,
                end: running + delta,
                kind,
                color,
            });
            running += delta;
        }

        let net = table.totals.total_effect;
        bars.push(WaterfallBar {
            label: style.totals_label.clone(),
            delta: net,
            base: 0.0,
            end: net,
            kind: BarKind::Net,
            color: style.totals_color.clone(),
        });

        Self {
            title: style.title.clone(),
            bars,
            net,
            style: style.clone(),
        }
    }

    /// Segment bars only, without the trailing net bar.
    pub fn segment_bars(&self) -> &[WaterfallBar] {
        &self.bars[..self.bars.len().saturating_sub(1)]
    }

    /// Plotly figure JSON with a single `waterfall` trace.
    pub fn to_plotly(&self) -> Value {
        let measure: Vec<&str> = self
            .bars
            .iter()
            .map(|b| match b.kind {
                BarKind::Net => "total",
                _ => "relative",
            })
            .collect();
        let x: Vec<&str> = self.bars.iter().map(|b| b.label.as_str()).collect();
        let y: Vec<f64> = self.bars.iter().map(|b| b.delta).collect();

        json!({
            "data": [{
                "type": "waterfall",
                "name": "Attribution",
                "orientation": "v",
                "measure": measure,
                "x": x,
                "y": y,
                "connector": { "line": { "color": self.style.connector_color } },
                "increasing": { "marker": { "color": self.style.increasing_color } },
                "decreasing": { "marker": { "color": self.style.decreasing_color } },
                "totals": { "marker": { "color": self.style.totals_color } },
            }],
            "layout": {
                "title": { "text": self.title },
                "height": self.style.height,
            },
        })
    }

    /// One text line per bar, scaled to `width` plot columns.
    ///
    /// Increases are drawn with `+`, decreases with `-`, the net bar with `=`
    /// and zero-height bars with `.`. Each line ends with the signed delta.
    pub fn render_lines(&self, width: usize) -> Vec<String> {
        let width = width.max(2);
        let (lo, hi) = self.bars.iter().fold((0.0f64, 0.0f64), |(lo, hi), b| {
            (lo.min(b.base).min(b.end), hi.max(b.base).max(b.end))
        });
        let span = hi - lo;
        let column = |v: f64| -> usize {
            if span <= 0.0 {
                0
            } else {
                (((v - lo) / span) * (width - 1) as f64).round() as usize
            }
        };
        let label_width = self
            .bars
            .iter()
            .map(|b| b.label.chars().count())
            .max()
            .unwrap_or(0);

        self.bars
            .iter()
            .map(|b| {
                let start = column(b.base.min(b.end));
                let stop = column(b.base.max(b.end));
                let glyph = match b.kind {
                    BarKind::Increase => '+',
                    BarKind::Decrease => '-',
                    BarKind::Net => '=',
                    BarKind::Flat => '.',
                };
                let mut plot = " ".repeat(start);
                plot.extend(std::iter::repeat(glyph).take(stop - start + 1));
                plot.push_str(&" ".repeat(width - stop - 1));
                format!(
                    "{:<label_width$} |{plot}| {:+.6}",
                    b.label, b.delta
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{compute, SegmentRecord};
    use pretty_assertions::assert_eq;

    fn chart() -> WaterfallChart {
        let table = compute(&[
            SegmentRecord::new("Tech", 0.30, 0.20, 0.10, 0.05),
            SegmentRecord::new("Energy", 0.10, 0.20, -0.05, 0.02),
            SegmentRecord::new("Cash", 0.10, 0.10, 0.01, 0.01),
        ])
        .unwrap();
        WaterfallChart::from_table(&table, &WaterfallStyle::default())
    }

    #[test]
    fn test_bars_follow_table_order_then_net() {
        let c = chart();
        let labels: Vec<&str> = c.bars.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["Tech", "Energy", "Cash", "Net Attribution"]);
        assert_eq!(c.segment_bars().len(), 3);
    }

    #[test]
    fn test_running_totals_chain() {
        let c = chart();
        let segments = c.segment_bars();
        assert_eq!(segments[0].base, 0.0);
        for pair in segments.windows(2) {
            assert_eq!(pair[1].base, pair[0].end);
        }
        let last = segments.last().unwrap();
        assert!((last.end - c.net).abs() < 1e-12);
    }

    #[test]
    fn test_kinds_and_colors() {
        let c = chart();
        assert_eq!(c.bars[0].kind, BarKind::Increase);
        assert_eq!(c.bars[0].color, "green");
        assert_eq!(c.bars[1].kind, BarKind::Decrease);
        assert_eq!(c.bars[1].color, "red");
        // Equal weights and returns give an exact zero
        assert_eq!(c.bars[2].kind, BarKind::Flat);
        assert_eq!(c.bars[3].kind, BarKind::Net);
        assert_eq!(c.bars[3].base, 0.0);
    }

    #[test]
    fn test_plotly_trace() {
        let fig = chart().to_plotly();
        let trace = &fig["data"][0];
        assert_eq!(trace["type"], "waterfall");
        assert_eq!(
            trace["measure"],
            json!(["relative", "relative", "relative", "total"])
        );
        assert_eq!(trace["x"][3], "Net Attribution");
        assert_eq!(trace["connector"]["line"]["color"], "rgb(63, 63, 63)");
        assert_eq!(fig["layout"]["height"], 500);
    }

    #[test]
    fn test_text_rendering() {
        let lines = chart().render_lines(40);
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with(&format!("{:<15} |", "Tech")));
        assert!(lines[0].contains('+'));
        assert!(lines[1].contains('-'));
        assert!(lines[3].contains('='));
        let plot_widths: Vec<usize> = lines
            .iter()
            .map(|l| l.split('|').nth(1).unwrap().chars().count())
            .collect();
        assert!(plot_widths.iter().all(|w| *w == 40));
    }

    #[test]
    fn test_custom_style() {
        let table = compute(&[SegmentRecord::new("A", 0.5, 0.4, 0.1, 0.1)]).unwrap();
        let style = WaterfallStyle {
            totals_label: "Active".into(),
            ..WaterfallStyle::default()
        };
        let c = WaterfallChart::from_table(&table, &style);
        assert_eq!(c.bars.last().unwrap().label, "Active");
    }
}
