use serde_json::{json, Value};

use crate::errors::PipelineError;
use crate::models::plot::{ChartKind, PlotSpec};
use crate::models::series::{mean, WeatherSeries};

const MONTH_NAMES: [&str; 12] = [
    "January", "February", "March", "April", "May", "June",
    "July", "August", "September", "October", "November", "December",
];

/// Qualitative palette for per-month traces and slices.
const SET1: [&str; 9] = [
    "#E41A1C", "#377EB8", "#4DAF4A", "#984EA3", "#FF7F00", "#FFFF33", "#A65628", "#F781BF", "#999999",
];

const CHART_HEIGHT: u32 = 700;
const HISTOGRAM_BINS: u32 = 20;

/// Resolved title and axis labels of a chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Labels {
    pub title: String,
    pub x: String,
    pub y: String,
}

/// Title and axis labels derived from the column name and chart kind.
pub fn auto_labels(column: &str, kind: ChartKind) -> Labels {
    let y = capitalize(column);
    let (title, x, y_label) = match kind {
        ChartKind::Line => (format!("Time Series of {}", column), "Date".to_string(), y),
        ChartKind::Scatter => (format!("Scatter Plot of {} by Month", column), "Date".to_string(), y),
        ChartKind::Area => (format!("Cumulative Area of {} Over Time", column), "Date".to_string(), format!("Cumulative {}", y)),
        ChartKind::Bar => (format!("Bar Plot of Mean {} by Month", column), "Month".to_string(), y),
        ChartKind::Histogram => (format!("Histogram of {}", column), y, "Frequency".to_string()),
        ChartKind::Box => (format!("Box Plot of {} by Month", column), "Month".to_string(), y),
        ChartKind::Violin => (format!("Violin Plot of {} by Month", column), "Month".to_string(), y),
        ChartKind::Pie => (format!("Pie Chart of {} by Month", column), "Month".to_string(), y),
    };
    Labels { title, x, y: y_label }
}

/// First letter upper case, the rest lower case.
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Plotly figure (`{data, layout}`) for one column of `series`.
pub fn build_figure(series: &WeatherSeries, spec: &PlotSpec) -> Result<Value, PipelineError> {
    let mut labels = auto_labels(&spec.column, spec.chart_kind);
    if let Some(title) = &spec.title {
        labels.title = title.clone();
    }

    let column = series.column(&spec.column)?;
    let times: Vec<String> = series
        .index()
        .iter()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .collect();
    let values: Vec<Option<f64>> = column.to_vec();

    let data = if spec.chart_kind.uses_monthly_mean() {
        let (months, means) = monthly_means(series, &spec.column)?;
        vec![monthly_mean_trace(spec, months, means)]
    } else {
        match spec.chart_kind {
            ChartKind::Line => vec![json!({
                "type": "scatter", "mode": "lines", "name": spec.column,
                "x": times, "y": values, "line": { "color": spec.color },
            })],
            ChartKind::Area => vec![json!({
                "type": "scatter", "mode": "lines", "fill": "tozeroy", "name": spec.column,
                "x": times, "y": values, "line": { "color": spec.color },
            })],
            ChartKind::Histogram => vec![json!({
                "type": "histogram", "name": spec.column, "x": values,
                "nbinsx": HISTOGRAM_BINS, "marker": { "color": spec.color },
            })],
            ChartKind::Scatter => scatter_by_month(series, &times, column),
            ChartKind::Box | ChartKind::Violin | ChartKind::Bar | ChartKind::Pie => {
                let trace_type = if spec.chart_kind == ChartKind::Violin { "violin" } else { "box" };
                series
                    .month_groups(&spec.column)?
                    .into_iter()
                    .enumerate()
                    .map(|(i, (month, vals))| {
                        json!({
                            "type": trace_type, "name": month_name(month), "y": vals,
                            "marker": { "color": SET1[i % SET1.len()] },
                        })
                    })
                    .collect()
            }
        }
    };

    let mut layout = json!({
        "title": { "text": labels.title },
        "height": CHART_HEIGHT,
        "xaxis": { "title": { "text": labels.x } },
        "yaxis": { "title": { "text": labels.y } },
    });
    if spec.chart_kind.is_month_bucketed() && spec.chart_kind != ChartKind::Pie {
        layout["xaxis"]["categoryorder"] = json!("array");
        layout["xaxis"]["categoryarray"] = json!(MONTH_NAMES);
    }

    Ok(json!({ "data": data, "layout": layout }))
}

/// Embeddable markup: a container div plus the `Plotly.newPlot` call. The page
/// is expected to load plotly.js.
pub fn render(series: &WeatherSeries, spec: &PlotSpec) -> Result<String, PipelineError> {
    let figure = build_figure(series, spec)?;
    let id = format!("chart-{}", uuid::Uuid::new_v4());
    let payload = serde_json::to_string(&figure)
        .map_err(|e| PipelineError::invalid(format!("chart encoding failed: {}", e)))?
        .replace("</", "<\\/");
    Ok(format!(
        "<div id=\"{id}\" style=\"height:{height}px\"></div>\n\
         <script>(function(){{var fig={payload};Plotly.newPlot(\"{id}\",fig.data,fig.layout,{{responsive:true}});}})();</script>",
        id = id,
        height = CHART_HEIGHT,
        payload = payload,
    ))
}

/// One bar per month, or one slice per month for pie charts.
fn monthly_mean_trace(spec: &PlotSpec, months: Vec<&'static str>, means: Vec<f64>) -> Value {
    if spec.chart_kind == ChartKind::Pie {
        json!({
            "type": "pie", "labels": months, "values": means,
            "marker": { "colors": SET1 }, "sort": false, "direction": "clockwise",
        })
    } else {
        json!({
            "type": "bar", "name": spec.column, "x": months, "y": means,
            "marker": { "color": spec.color },
        })
    }
}

fn month_name(month: u32) -> &'static str {
    MONTH_NAMES.get(month as usize - 1).copied().unwrap_or("Unknown")
}

/// Month names and the mean of each month, January first.
pub fn monthly_means(series: &WeatherSeries, column: &str) -> Result<(Vec<&'static str>, Vec<f64>), PipelineError> {
    let groups = series.month_groups(column)?;
    Ok(groups
        .into_iter()
        .filter_map(|(month, vals)| Some((month_name(month), mean(&vals)?)))
        .unzip())
}

fn scatter_by_month(series: &WeatherSeries, times: &[String], column: &[Option<f64>]) -> Vec<Value> {
    use chrono::Datelike;

    let mut by_month: std::collections::BTreeMap<u32, (Vec<&str>, Vec<Option<f64>>)> = Default::default();
    for ((t, label), v) in series.index().iter().zip(times).zip(column) {
        let entry = by_month.entry(t.month()).or_default();
        entry.0.push(label.as_str());
        entry.1.push(*v);
    }
    by_month
        .into_iter()
        .enumerate()
        .map(|(i, (month, (x, y)))| {
            json!({
                "type": "scatter", "mode": "markers", "name": month_name(month),
                "x": x, "y": y, "marker": { "color": SET1[i % SET1.len()] },
            })
        })
        .collect()
}
