//! The three analysis views shown next to the sidebar.
//!
//! Each view is derived from scratch on every call from the listings of the
//! selected model, then emitted as a plotly figure for the page to draw.

use serde::Serialize;
use serde_json::{json, Value};

use crate::dataset::DatasetStore;
use crate::types::ListingRecord;

pub const CHART_PLACEHOLDER: &str = "Select a car model to view this chart.";
pub const TREND_PLACEHOLDER: &str = "Select a car model to view the average resale price chart.";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ChartView {
    Figure { title: String, figure: Value },
    Placeholder { message: String },
}

impl ChartView {
    fn placeholder(message: &str) -> Self {
        ChartView::Placeholder {
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPanel {
    pub distribution: ChartView,
    pub relationship: ChartView,
    pub trend: ChartView,
}

/// Tukey box statistics for one brand.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxSummary {
    pub brand: String,
    pub count: usize,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub lower_whisker: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterSeries {
    pub fuel_type: String,
    /// (kms_driven, resale_price)
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub year: i32,
    pub mean_price: f64,
}

pub fn render_charts(store: &DatasetStore, model: Option<&str>) -> ChartPanel {
    let Some(model) = model else {
        return ChartPanel {
            distribution: ChartView::placeholder(CHART_PLACEHOLDER),
            relationship: ChartView::placeholder(CHART_PLACEHOLDER),
            trend: ChartView::placeholder(TREND_PLACEHOLDER),
        };
    };

    let rows: Vec<&ListingRecord> = store.rows_for_model(model).collect();
    tracing::debug!(model, rows = rows.len(), "rendering charts");

    ChartPanel {
        distribution: distribution_figure(model, &price_distribution(&rows)),
        relationship: relationship_figure(model, &price_vs_kms(&rows)),
        trend: trend_figure(model, &price_trend(store, model)),
    }
}

/// Resale price distribution per brand, brands in first-appearance order.
pub fn price_distribution(rows: &[&ListingRecord]) -> Vec<BoxSummary> {
    group_in_order(rows, |r| &r.brand)
        .into_iter()
        .filter_map(|(brand, group)| {
            let prices: Vec<f64> = group.iter().map(|r| r.resale_price).collect();
            box_summary(brand, prices)
        })
        .collect()
}

/// Distance driven against resale price, one series per fuel type.
pub fn price_vs_kms(rows: &[&ListingRecord]) -> Vec<ScatterSeries> {
    group_in_order(rows, |r| &r.fuel_type)
        .into_iter()
        .map(|(fuel_type, group)| ScatterSeries {
            fuel_type,
            points: group.iter().map(|r| (r.kms_driven, r.resale_price)).collect(),
        })
        .collect()
}

/// Mean resale price per registered year, ascending.
pub fn price_trend(store: &DatasetStore, model: &str) -> Vec<TrendPoint> {
    store
        .mean_price_by_year(model)
        .into_iter()
        .map(|(year, mean_price)| TrendPoint { year, mean_price })
        .collect()
}

fn group_in_order<'a>(
    rows: &[&'a ListingRecord],
    key: impl Fn(&ListingRecord) -> &String,
) -> Vec<(String, Vec<&'a ListingRecord>)> {
    let mut groups: Vec<(String, Vec<&'a ListingRecord>)> = Vec::new();
    for &r in rows {
        let k = key(r);
        match groups.iter_mut().find(|(g, _)| g == k) {
            Some((_, members)) => members.push(r),
            None => groups.push((k.clone(), vec![r])),
        }
    }
    groups
}

fn box_summary(brand: String, mut prices: Vec<f64>) -> Option<BoxSummary> {
    if prices.is_empty() {
        return None;
    }
    prices.sort_by(f64::total_cmp);

    let q1 = quantile(&prices, 0.25);
    let median = quantile(&prices, 0.5);
    let q3 = quantile(&prices, 0.75);
    let iqr = q3 - q1;
    let (lo_fence, hi_fence) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);

    let inside = || prices.iter().copied().filter(|p| *p >= lo_fence && *p <= hi_fence);
    let lower_whisker = inside().fold(f64::INFINITY, f64::min);
    let upper_whisker = inside().fold(f64::NEG_INFINITY, f64::max);
    let outliers = prices
        .iter()
        .copied()
        .filter(|p| *p < lo_fence || *p > hi_fence)
        .collect();

    Some(BoxSummary {
        brand,
        count: prices.len(),
        q1,
        median,
        q3,
        lower_whisker,
        upper_whisker,
        outliers,
    })
}

/// Linear-interpolated quantile of an ascending, non-empty slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

fn layout(title: &str, x_label: &str, y_label: &str) -> Value {
    json!({
        "title": { "text": title },
        "xaxis": { "title": { "text": x_label } },
        "yaxis": { "title": { "text": y_label } },
    })
}

fn distribution_figure(model: &str, boxes: &[BoxSummary]) -> ChartView {
    let mut data = Vec::with_capacity(boxes.len() * 2);
    for b in boxes {
        data.push(json!({
            "type": "box",
            "name": b.brand,
            "legendgroup": b.brand,
            "x": [b.brand],
            "q1": [b.q1],
            "median": [b.median],
            "q3": [b.q3],
            "lowerfence": [b.lower_whisker],
            "upperfence": [b.upper_whisker],
        }));
        if !b.outliers.is_empty() {
            data.push(json!({
                "type": "scatter",
                "mode": "markers",
                "name": format!("{} outliers", b.brand),
                "legendgroup": b.brand,
                "showlegend": false,
                "x": vec![b.brand.as_str(); b.outliers.len()],
                "y": b.outliers,
            }));
        }
    }

    let title = format!("Resale Price Distribution for {}", model);
    ChartView::Figure {
        figure: json!({
            "data": data,
            "layout": layout(&title, "Car Brand", "Resale Price (₹)"),
        }),
        title,
    }
}

fn relationship_figure(model: &str, series: &[ScatterSeries]) -> ChartView {
    let data: Vec<Value> = series
        .iter()
        .map(|s| {
            let (x, y): (Vec<f64>, Vec<f64>) = s.points.iter().copied().unzip();
            json!({
                "type": "scatter",
                "mode": "markers",
                "name": s.fuel_type,
                "x": x,
                "y": y,
            })
        })
        .collect();

    let title = format!("Resale Price vs. Kilometers Driven for {}", model);
    ChartView::Figure {
        figure: json!({
            "data": data,
            "layout": layout(&title, "Kilometers Driven", "Resale Price (₹)"),
        }),
        title,
    }
}

fn trend_figure(model: &str, points: &[TrendPoint]) -> ChartView {
    let years: Vec<i32> = points.iter().map(|p| p.year).collect();
    let means: Vec<f64> = points.iter().map(|p| p.mean_price).collect();

    let title = format!("Average Resale Price Over the Years for {}", model);
    ChartView::Figure {
        figure: json!({
            "data": [{ "type": "scatter", "mode": "lines", "x": years, "y": means }],
            "layout": layout(&title, "Registered Year", "Average Resale Price (₹)"),
        }),
        title,
    }
}
