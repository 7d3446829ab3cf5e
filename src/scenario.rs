//! Scenario runner for batch projections
//!
//! Holds one base model and runs it under many configurations, or runs many models
//! under one configuration. Runs are independent and each owns its scratch state,
//! so batches are spread across threads with rayon.

use std::path::Path;

use rayon::prelude::*;

use crate::model::{load_model, Interval, Model, ModelError};
use crate::projection::{ProjectionConfig, ProjectionEngine, ProjectionResult};

/// Pre-loaded scenario runner for batch projections
///
/// # Example
/// ```ignore
/// let runner = ScenarioRunner::from_path("model.json")?;
///
/// for step in [Frequency::Weekly, Frequency::Monthly] {
///     let config = ProjectionConfig { step, ..ProjectionConfig::default() };
///     let result = runner.run(interval, config);
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScenarioRunner {
    /// Base model shared by every run
    base_model: Model,
}

impl ScenarioRunner {
    pub fn new(model: Model) -> Self {
        Self { base_model: model }
    }

    /// Create runner by loading the base model from a JSON file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        Ok(Self {
            base_model: load_model(path)?,
        })
    }

    /// Run the base model with the given config
    pub fn run(&self, interval: Interval, config: ProjectionConfig) -> ProjectionResult {
        ProjectionEngine::new(config).project(&self.base_model, interval)
    }

    /// Run several models with the same config
    pub fn run_batch(
        models: &[Model],
        interval: Interval,
        config: ProjectionConfig,
    ) -> Vec<ProjectionResult> {
        let engine = ProjectionEngine::new(config);
        models
            .par_iter()
            .map(|model| engine.project(model, interval))
            .collect()
    }

    /// Run the base model under several configs
    pub fn run_scenarios(&self, interval: Interval, configs: &[ProjectionConfig]) -> Vec<ProjectionResult> {
        configs
            .par_iter()
            .map(|config| ProjectionEngine::new(config.clone()).project(&self.base_model, interval))
            .collect()
    }

    /// Get reference to the base model for inspection
    pub fn model(&self) -> &Model {
        &self.base_model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Asset, Setting};
    use crate::resolve::Frequency;
    use chrono::NaiveDate;

    fn interval() -> Interval {
        Interval::new(
            NaiveDate::from_ymd_opt(2018, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2028, 1, 1).unwrap(),
        )
    }

    fn model(growth: &str) -> Model {
        Model::new()
            .with_setting(Setting::new("cpi", "2"))
            .with_asset(Asset::new("ISA", "2018-01-01", "10000").with_growth(growth))
    }

    #[test]
    fn test_scenario_runner_batch() {
        let models: Vec<Model> = ["1", "4", "8"].iter().map(|g| model(g)).collect();

        let results = ScenarioRunner::run_batch(&models, interval(), ProjectionConfig::default());
        assert_eq!(results.len(), 3);

        // Higher growth should result in a higher final value
        let last = |r: &ProjectionResult| r.evaluations.last().map(|e| e.value).unwrap();
        assert!(last(&results[2]) > last(&results[1]));
        assert!(last(&results[1]) > last(&results[0]));
    }

    #[test]
    fn test_scenarios_match_single_runs() {
        let runner = ScenarioRunner::new(model("5"));
        let configs: Vec<ProjectionConfig> = [Frequency::Weekly, Frequency::Monthly, Frequency::Annually]
            .into_iter()
            .map(|step| ProjectionConfig {
                step,
                ..ProjectionConfig::default()
            })
            .collect();

        let results = runner.run_scenarios(interval(), &configs);

        assert_eq!(results.len(), 3);
        for (config, result) in configs.iter().zip(&results) {
            let single = runner.run(interval(), config.clone());
            assert_eq!(single.evaluations, result.evaluations);
        }
        assert!(results[0].evaluations.len() > results[1].evaluations.len());
    }
}
