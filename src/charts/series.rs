//! Chart series output structures

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One bucket's value in a series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub label: String,
    pub y: f64,
    pub tooltip: String,
}

/// Values of one item, category or total across the buckets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSeries {
    pub item: String,
    pub data_points: Vec<DataPoint>,
}

impl ChartSeries {
    pub fn values(&self) -> Vec<f64> {
        self.data_points.iter().map(|p| p.y).collect()
    }
}

/// Every chart produced for one window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartBundle {
    pub labels: Vec<String>,
    pub expenses: Vec<ChartSeries>,
    pub incomes: Vec<ChartSeries>,
    pub assets: Vec<ChartSeries>,
    pub debts: Vec<ChartSeries>,
    pub tax: Vec<ChartSeries>,
}

impl ChartBundle {
    /// Series of a chart by item name
    pub fn find<'a>(series: &'a [ChartSeries], item: &str) -> Option<&'a ChartSeries> {
        series.iter().find(|s| s.item == item)
    }
}

/// Per-key bucket values, accumulated then turned into series
#[derive(Debug, Clone, Default)]
pub(crate) struct SeriesTable {
    buckets: usize,
    rows: BTreeMap<String, Vec<f64>>,
}

impl SeriesTable {
    pub fn new(buckets: usize) -> Self {
        Self {
            buckets,
            rows: BTreeMap::new(),
        }
    }

    pub fn add(&mut self, key: &str, bucket: usize, amount: f64) {
        let buckets = self.buckets;
        let row = self
            .rows
            .entry(key.to_string())
            .or_insert_with(|| vec![0.0; buckets]);
        row[bucket] += amount;
    }

    /// Add a whole row of bucket values under `key`
    pub fn add_row(&mut self, key: &str, values: &[f64]) {
        for (bucket, value) in values.iter().enumerate().take(self.buckets) {
            self.add(key, bucket, *value);
        }
    }

    /// Build series, negating when asked and dropping rows that are zero throughout
    pub fn into_series(self, labels: &[String], negate: bool) -> Vec<ChartSeries> {
        let sign = if negate { -1.0 } else { 1.0 };
        self.rows
            .into_iter()
            .filter(|(_, values)| values.iter().any(|v| *v != 0.0))
            .map(|(item, values)| {
                let data_points = labels
                    .iter()
                    .zip(values)
                    .map(|(label, value)| {
                        let y = sign * value;
                        DataPoint {
                            label: label.clone(),
                            y,
                            tooltip: format!("{} {}: {:.2}", label, item, y),
                        }
                    })
                    .collect();
                ChartSeries { item, data_points }
            })
            .collect()
    }
}
