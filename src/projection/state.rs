//! Per-run scratch state for a projection
//!
//! Running values live here for the duration of one run and are discarded afterwards;
//! the model snapshot itself is never touched.

use std::collections::HashMap;

use chrono::NaiveDate;

use super::evaluations::{Diagnostic, Evaluation, EvaluationSource};
use crate::model::Model;
use crate::resolve::SettingSource;

/// Running state of one asset or debt
#[derive(Debug, Clone, Default)]
pub struct AssetState {
    /// Current value (debts are negative)
    pub value: f64,

    /// Resolved START, `None` when the date could not be resolved
    pub start: Option<NaiveDate>,

    /// Whether the START moment has been processed
    pub started: bool,

    /// Dropped from the run after a resolution failure
    pub excluded: bool,

    /// Last date a revaluation overrode the value
    pub revalued_on: Option<NaiveDate>,
}

impl AssetState {
    /// Whether the asset can take part in transfers and revaluations
    pub fn is_live(&self) -> bool {
        self.started && !self.excluded
    }
}

/// Running state of one income or expense
#[derive(Debug, Clone, Default)]
pub struct FlowState {
    /// Current inflated amount per occurrence
    pub value: f64,

    pub start: Option<NaiveDate>,

    /// Exclusive end of the occurrences
    pub end: Option<NaiveDate>,

    /// Whether the base amount has been resolved
    pub started: bool,

    pub excluded: bool,
}

impl FlowState {
    pub fn is_live(&self) -> bool {
        self.started && !self.excluded
    }
}

/// Scratch table of every item's running value
#[derive(Debug, Clone)]
pub struct ProjectionState {
    /// Setting values as of the date being processed
    pub settings: HashMap<String, String>,

    pub assets: Vec<AssetState>,
    pub incomes: Vec<FlowState>,
    pub expenses: Vec<FlowState>,

    /// Evaluations in processing order
    pub evaluations: Vec<Evaluation>,

    pub diagnostics: Vec<Diagnostic>,
}

impl ProjectionState {
    /// Initialize state from a model at run start
    pub fn from_model(model: &Model) -> Self {
        let mut settings = HashMap::new();
        for setting in &model.settings {
            settings
                .entry(setting.name.clone())
                .or_insert_with(|| setting.value.clone());
        }

        Self {
            settings,
            assets: vec![AssetState::default(); model.assets.len()],
            incomes: vec![FlowState::default(); model.incomes.len()],
            expenses: vec![FlowState::default(); model.expenses.len()],
            evaluations: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Append an evaluation
    pub fn record(&mut self, name: &str, date: NaiveDate, value: f64, source: EvaluationSource) {
        self.evaluations.push(Evaluation {
            name: name.to_string(),
            date,
            value,
            source,
        });
    }

    /// Report a recoverable failure against an item
    pub fn diagnose(&mut self, item: &str, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{}: {}", item, message);
        self.diagnostics.push(Diagnostic {
            item: item.to_string(),
            message,
            systemic: false,
        });
    }
}

impl SettingSource for ProjectionState {
    fn setting_text(&self, name: &str) -> Option<&str> {
        self.settings.get(name).map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Asset, Setting};
    use crate::resolve::resolve_number;

    #[test]
    fn test_state_from_model() {
        let model = Model::new()
            .with_setting(Setting::new("rate", "4"))
            .with_setting(Setting::new("rate", "9"))
            .with_asset(Asset::new("ISA", "2018-01-01", "100"));
        let mut state = ProjectionState::from_model(&model);

        assert_eq!(state.assets.len(), 1);
        assert!(!state.assets[0].is_live());
        // First definition wins, matching name lookup
        assert_eq!(resolve_number("2rate", &state), Ok(8.0));

        state.diagnose("ISA", "bad growth");
        assert_eq!(state.diagnostics.len(), 1);
        assert!(!state.diagnostics[0].systemic);
    }
}
