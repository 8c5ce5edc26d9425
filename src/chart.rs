//! Price chart geometry
//!
//! Projects a `(timestamp, value)` series into SVG plot coordinates and
//! summarizes it for the chart header.

use serde::Serialize;

use crate::model::ChartPoint;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartSummary {
    pub first: f64,
    pub last: f64,
    pub min: f64,
    pub max: f64,
    pub change: f64,
    pub change_pct: f64,
    pub is_positive: bool,
}

impl ChartSummary {
    pub fn from_series(points: &[ChartPoint]) -> Option<Self> {
        let (_, first) = *points.first()?;
        let (_, last) = *points.last()?;

        let (min, max) = points.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY),
            |(min, max), (_, value)| (min.min(*value), max.max(*value)),
        );

        let change = last - first;
        let change_pct = if first == 0.0 {
            0.0
        } else {
            change / first * 100.0
        };

        Some(ChartSummary {
            first,
            last,
            min,
            max,
            change,
            change_pct,
            is_positive: last >= first,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlotPoint {
    pub x: f64,
    pub y: f64,
    pub timestamp: i64,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartLayout {
    pub width: f64,
    pub height: f64,
    pub padding: f64,
}

impl Default for ChartLayout {
    fn default() -> Self {
        ChartLayout {
            width: 600.0,
            height: 300.0,
            padding: 40.0,
        }
    }
}

impl ChartLayout {
    pub fn plot_width(&self) -> f64 {
        self.width - self.padding * 2.0
    }

    pub fn plot_height(&self) -> f64 {
        self.height - self.padding * 2.0
    }

    /// `x` spreads points evenly left to right, `y` puts the maximum on top.
    /// A single point sits on the left edge, a flat series mid-height.
    pub fn project(&self, points: &[ChartPoint]) -> Vec<PlotPoint> {
        let Some(summary) = ChartSummary::from_series(points) else {
            return vec![];
        };

        let range = summary.max - summary.min;
        let steps = points.len().saturating_sub(1);

        points
            .iter()
            .enumerate()
            .map(|(index, (timestamp, value))| {
                let x = match steps {
                    0 => self.padding,
                    _ => {
                        self.padding
                            + index as f64 / steps as f64 * self.plot_width()
                    },
                };

                let y = if range == 0.0 {
                    self.padding + self.plot_height() / 2.0
                } else {
                    self.padding
                        + (summary.max - value) / range * self.plot_height()
                };

                PlotPoint {
                    x,
                    y,
                    timestamp: *timestamp,
                    value: *value,
                }
            })
            .collect()
    }

    /// SVG path data: `M x y L x y ...`
    pub fn line_path(&self, points: &[ChartPoint]) -> String {
        self.project(points)
            .iter()
            .enumerate()
            .map(|(index, point)| {
                let command = if index == 0 { "M" } else { "L" };
                format!("{} {} {}", command, coord(point.x), coord(point.y))
            })
            .collect::<Vec<String>>()
            .join(" ")
    }

    /// Line path closed along the bottom of the plot, for the fill.
    pub fn area_path(&self, points: &[ChartPoint]) -> String {
        let projected = self.project(points);
        let Some(last) = projected.last() else {
            return String::new();
        };

        let bottom = coord(self.padding + self.plot_height());
        format!(
            "{} L {} {} L {} {} Z",
            self.line_path(points),
            coord(last.x),
            bottom,
            coord(self.padding),
            bottom
        )
    }
}

fn coord(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
