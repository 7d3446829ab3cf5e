//! Aggregation pipeline: evaluations into bucketed chart series
//!
//! Incomes, expenses and tax are flows: values are summed within each bucket.
//! Assets and debts are levels: each bucket shows the latest value, carried forward
//! from earlier buckets (or from before the window). In the additions, reductions and
//! delta views asset and debt changes are attributed to their cause instead, so a
//! growth step shows up under `growth␟<asset>` and a transfer under its transaction.
//!
//! Debt series are negated for display. Series that are zero in every bucket are dropped.

mod buckets;
mod series;
mod view;

use std::collections::{BTreeMap, HashMap};

pub use buckets::{Buckets, Slot};
pub use series::{ChartBundle, ChartSeries, DataPoint};
pub use view::{
    DetailLevel, Focus, ViewMode, ViewSettings, ASSET_VIEW, DEBT_VIEW, FOCUS_ASSETS,
    FOCUS_DEBTS, FOCUS_EXPENSES, FOCUS_INCOMES, SHOW_NET, TAX_PERSON, TAX_TYPE, VIEW_DETAIL,
    VIEW_FREQUENCY,
};

use series::SeriesTable;

use crate::model::{ItemKind, Model, NameIndex};
use crate::projection::{EvaluationSource, ProjectionResult};

/// Name of the single series in total detail
pub const TOTAL: &str = "Total";

/// Bucket a projection result into chart series
pub fn aggregate(result: &ProjectionResult, model: &Model, view: &ViewSettings) -> ChartBundle {
    let buckets = Buckets::new(result.interval, view.frequency);
    let labels = buckets.labels();
    let index = NameIndex::build(model);

    let mut bundle = ChartBundle {
        labels: labels.clone(),
        ..ChartBundle::default()
    };
    if buckets.is_empty() {
        return bundle;
    }

    let pipeline = Pipeline {
        result,
        index: &index,
        buckets: &buckets,
        detail: view.detail,
    };
    bundle.incomes = pipeline
        .flows(ItemKind::Income, &view.focus_incomes)
        .into_series(&labels, false);
    bundle.expenses = pipeline
        .flows(ItemKind::Expense, &view.focus_expenses)
        .into_series(&labels, false);
    bundle.assets = pipeline
        .holdings(ItemKind::Asset, &view.focus_assets, view.asset_view)
        .into_series(&labels, false);
    bundle.debts = pipeline
        .holdings(ItemKind::Debt, &view.focus_debts, view.debt_view)
        .into_series(&labels, true);
    bundle.tax = pipeline.tax(view).into_series(&labels, false);
    bundle
}

struct Pipeline<'a> {
    result: &'a ProjectionResult,
    index: &'a NameIndex<'a>,
    buckets: &'a Buckets,
    detail: DetailLevel,
}

impl Pipeline<'_> {
    fn group(&self, key: &str) -> String {
        match self.detail {
            DetailLevel::Fine => key.to_string(),
            DetailLevel::Coarse => self.index.categorise(key),
            DetailLevel::Total => TOTAL.to_string(),
        }
    }

    fn admits(&self, name: &str, kind: ItemKind, focus: &Focus) -> bool {
        self.index.kind(name) == Some(kind) && focus.admits(name, self.index.category_of(name))
    }

    /// Sum occurrences per bucket; revaluations are not flows
    fn flows(&self, kind: ItemKind, focus: &Focus) -> SeriesTable {
        let mut table = SeriesTable::new(self.buckets.len());
        for evaluation in &self.result.evaluations {
            if evaluation.source.is_revaluation() || !self.admits(&evaluation.name, kind, focus) {
                continue;
            }
            if let Slot::In(bucket) = self.buckets.slot(evaluation.date) {
                table.add(&self.group(&evaluation.name), bucket, evaluation.value);
            }
        }
        table
    }

    fn holdings(&self, kind: ItemKind, focus: &Focus, mode: ViewMode) -> SeriesTable {
        match mode {
            ViewMode::Value => self.levels(kind, focus),
            _ => self.changes(kind, focus, mode),
        }
    }

    /// Latest value per bucket, carried forward
    fn levels(&self, kind: ItemKind, focus: &Focus) -> SeriesTable {
        let n = self.buckets.len();
        let mut marks: BTreeMap<&str, (Option<f64>, Vec<Option<f64>>)> = BTreeMap::new();

        for evaluation in &self.result.evaluations {
            if !self.admits(&evaluation.name, kind, focus) {
                continue;
            }
            let (before, in_window) = marks
                .entry(evaluation.name.as_str())
                .or_insert_with(|| (None, vec![None; n]));
            match self.buckets.slot(evaluation.date) {
                Slot::Before => *before = Some(evaluation.value),
                Slot::In(bucket) => in_window[bucket] = Some(evaluation.value),
                Slot::After => {}
            }
        }

        let mut table = SeriesTable::new(n);
        for (name, (before, in_window)) in marks {
            let mut level = before.unwrap_or(0.0);
            let row: Vec<f64> = in_window
                .into_iter()
                .map(|mark| {
                    if let Some(value) = mark {
                        level = value;
                    }
                    level
                })
                .collect();
            table.add_row(&self.group(name), &row);
        }
        table
    }

    /// Changes per bucket attributed to their cause
    fn changes(&self, kind: ItemKind, focus: &Focus, mode: ViewMode) -> SeriesTable {
        let mut table = SeriesTable::new(self.buckets.len());
        let mut previous: HashMap<&str, f64> = HashMap::new();

        for evaluation in &self.result.evaluations {
            if !self.admits(&evaluation.name, kind, focus) {
                continue;
            }
            let before = previous
                .insert(evaluation.name.as_str(), evaluation.value)
                .unwrap_or(0.0);
            let delta = evaluation.value - before;
            if delta == 0.0 || !mode.admits(delta) {
                continue;
            }
            if let Slot::In(bucket) = self.buckets.slot(evaluation.date) {
                let cause = evaluation.source.cause_key(&evaluation.name);
                table.add(&self.group(&cause), bucket, delta);
            }
        }
        table
    }

    /// Tax due (and optionally net) per person and kind
    fn tax(&self, view: &ViewSettings) -> SeriesTable {
        let mut table = SeriesTable::new(self.buckets.len());
        for evaluation in &self.result.evaluations {
            let EvaluationSource::Tax { person, kind, net } = &evaluation.source else {
                continue;
            };
            // Cash debits at settlement carry the same source
            if self.index.kind(&evaluation.name).is_some() {
                continue;
            }
            if *net && !view.show_net {
                continue;
            }
            if view.tax_person.as_ref().is_some_and(|p| p != person)
                || view.tax_kind.is_some_and(|k| k != *kind)
            {
                continue;
            }
            if let Slot::In(bucket) = self.buckets.slot(evaluation.date) {
                table.add(&evaluation.name, bucket, evaluation.value);
            }
        }
        table
    }
}
