use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::PipelineError;

pub const DEFAULT_COLOR: &str = "#1f77b4";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Scatter,
    Bar,
    Area,
    Histogram,
    Box,
    Violin,
    Pie,
}

impl ChartKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChartKind::Line => "line",
            ChartKind::Scatter => "scatter",
            ChartKind::Bar => "bar",
            ChartKind::Area => "area",
            ChartKind::Histogram => "histogram",
            ChartKind::Box => "box",
            ChartKind::Violin => "violin",
            ChartKind::Pie => "pie",
        }
    }

    /// Kinds drawn per calendar month, January to December.
    pub fn is_month_bucketed(self) -> bool {
        matches!(self, ChartKind::Bar | ChartKind::Box | ChartKind::Violin | ChartKind::Pie)
    }

    /// Month-bucketed kinds that plot one mean per month rather than the distribution.
    pub fn uses_monthly_mean(self) -> bool {
        matches!(self, ChartKind::Bar | ChartKind::Pie)
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "line" => Ok(ChartKind::Line),
            "scatter" => Ok(ChartKind::Scatter),
            "bar" => Ok(ChartKind::Bar),
            "area" => Ok(ChartKind::Area),
            "histogram" => Ok(ChartKind::Histogram),
            "box" => Ok(ChartKind::Box),
            "violin" => Ok(ChartKind::Violin),
            "pie" => Ok(ChartKind::Pie),
            _ => Err(PipelineError::UnsupportedChartKind(s.to_string())),
        }
    }
}

/// What to draw: one column of an assembled series, how, and in which color.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotSpec {
    pub column: String,
    pub chart_kind: ChartKind,
    pub color: String,
    pub title: Option<String>,
}

impl PlotSpec {
    pub fn new(column: &str, chart_kind: &str, color: Option<&str>, title: Option<&str>) -> Result<Self, PipelineError> {
        let color = color.map(str::trim).filter(|c| !c.is_empty()).unwrap_or(DEFAULT_COLOR);
        Ok(Self {
            column: column.to_string(),
            chart_kind: chart_kind.parse()?,
            color: color.to_string(),
            title: title.map(str::trim).filter(|t| !t.is_empty()).map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_kind_is_rejected() {
        assert_eq!(
            "heatmap".parse::<ChartKind>().unwrap_err(),
            PipelineError::UnsupportedChartKind("heatmap".into())
        );
        assert_eq!("Violin".parse::<ChartKind>().unwrap(), ChartKind::Violin);
    }

    #[test]
    fn test_plot_spec_defaults() {
        let spec = PlotSpec::new("ghi", "pie", None, Some("  ")).unwrap();
        assert_eq!(spec.color, DEFAULT_COLOR);
        assert_eq!(spec.title, None);
        assert!(spec.chart_kind.uses_monthly_mean());
        assert!(!ChartKind::Box.uses_monthly_mean());
        assert!(ChartKind::Box.is_month_bucketed());
    }
}
