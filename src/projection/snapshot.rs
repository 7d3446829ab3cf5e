//! Today's values: every item's latest value as of a focus date

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::engine::ProjectionEngine;
use crate::model::{Model, SettingType};

/// Value of one item at the focus date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodaysValue {
    pub value: f64,
    pub category: String,
    /// Recurrence text, for incomes and expenses
    pub frequency: Option<String>,
    pub has_started: bool,
    pub has_ended: bool,
}

/// Values of all items at one focus date
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TodaysValues {
    pub focus: Option<NaiveDate>,
    pub assets: BTreeMap<String, TodaysValue>,
    pub debts: BTreeMap<String, TodaysValue>,
    pub incomes: BTreeMap<String, TodaysValue>,
    pub expenses: BTreeMap<String, TodaysValue>,
    /// Setting text as of the focus date (view-only settings omitted)
    pub settings: BTreeMap<String, String>,
}

impl ProjectionEngine {
    /// Run the model up to and including `focus` and report every item's latest value
    ///
    /// Uses the same run as [`ProjectionEngine::project`], stopped after the focus date, so
    /// values agree with the full sequence up to that date. Items excluded by a resolution
    /// failure are left out.
    pub fn todays_values(&self, model: &Model, focus: NaiveDate) -> TodaysValues {
        let end = focus.succ_opt().unwrap_or(focus);
        let state = self.run(model, end);

        let mut latest: HashMap<&str, f64> = HashMap::new();
        for evaluation in &state.evaluations {
            latest.insert(evaluation.name.as_str(), evaluation.value);
        }

        let mut today = TodaysValues {
            focus: Some(focus),
            ..TodaysValues::default()
        };

        for (asset, running) in model.assets.iter().zip(&state.assets) {
            let Some(start) = running.start.filter(|_| !running.excluded) else {
                continue;
            };
            let value = TodaysValue {
                value: latest.get(asset.name.as_str()).copied().unwrap_or(0.0),
                category: asset.category.clone(),
                frequency: None,
                has_started: start <= focus,
                has_ended: false,
            };
            let table = if asset.is_a_debt { &mut today.debts } else { &mut today.assets };
            table.entry(asset.name.clone()).or_insert(value);
        }

        let incomes = model
            .incomes
            .iter()
            .map(|i| (&i.name, &i.category, &i.recurrence))
            .zip(&state.incomes);
        let expenses = model
            .expenses
            .iter()
            .map(|e| (&e.name, &e.category, &e.recurrence))
            .zip(&state.expenses);
        for (table, flows) in [
            (&mut today.incomes, incomes.collect::<Vec<_>>()),
            (&mut today.expenses, expenses.collect::<Vec<_>>()),
        ] {
            for ((name, category, recurrence), running) in flows {
                let Some(start) = running.start.filter(|_| !running.excluded) else {
                    continue;
                };
                let value = TodaysValue {
                    value: latest.get(name.as_str()).copied().unwrap_or(0.0),
                    category: category.clone(),
                    frequency: Some(recurrence.clone()).filter(|r| !r.is_empty()),
                    has_started: start <= focus,
                    has_ended: running.end.is_some_and(|end| end <= focus),
                };
                table.entry(name.clone()).or_insert(value);
            }
        }

        for setting in &model.settings {
            if setting.setting_type == SettingType::ViewOnly {
                continue;
            }
            if let Some(text) = state.settings.get(&setting.name) {
                today.settings.insert(setting.name.clone(), text.clone());
            }
        }

        today
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Asset, Expense, Income, Interval, Setting, Transaction, TransactionKind};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn model() -> Model {
        Model::new()
            .with_setting(Setting::new("cpi", "3"))
            .with_setting(Setting::new("rate", "5"))
            .with_setting(Setting::view("View frequency", "Annually"))
            .with_asset(Asset::new("Cash", "2018-01-01", "1000"))
            .with_asset(Asset::new("ISA", "2018-01-01", "5000").with_growth("rate").with_category("investments"))
            .with_asset(Asset::debt("Loan", "2018-06-01", "-2000"))
            .with_income(Income::new("Salary", "2000", "2018-01-01", "2019-01-01", "1m"))
            .with_expense(Expense::new("Holiday", "800", "2018-07-01", "", ""))
            .with_transaction(Transaction::revalue(
                TransactionKind::RevalueSetting,
                "rate change",
                "rate",
                "2",
                "2018-03-01",
            ))
    }

    #[test]
    fn test_snapshot_matches_full_run() {
        let model = model();
        let engine = ProjectionEngine::default();
        let full = engine.project(&model, Interval::new(date(2018, 1, 1), date(2020, 1, 1)));
        let focus = date(2018, 5, 1);

        let today = engine.todays_values(&model, focus);

        for name in ["Cash", "ISA"] {
            assert_eq!(
                Some(today.assets[name].value),
                full.latest_value(name, focus),
                "{} disagrees",
                name
            );
        }
        assert_eq!(Some(today.incomes["Salary"].value), full.latest_value("Salary", focus));
    }

    #[test]
    fn test_snapshot_flags() {
        let model = model();
        let today = ProjectionEngine::default().todays_values(&model, date(2018, 5, 1));

        assert!(today.assets["ISA"].has_started);
        assert_eq!(today.assets["ISA"].category, "investments");
        assert!(!today.debts["Loan"].has_started);
        assert_eq!(today.debts["Loan"].value, 0.0);
        assert_eq!(today.incomes["Salary"].frequency.as_deref(), Some("1m"));
        assert!(!today.incomes["Salary"].has_ended);
        assert!(!today.expenses["Holiday"].has_started);
        assert_eq!(today.expenses["Holiday"].frequency, None);

        assert_eq!(today.settings["rate"], "2");
        assert!(!today.settings.contains_key("View frequency"));
    }
}
