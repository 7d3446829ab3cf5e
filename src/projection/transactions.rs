//! Transfers between items and revaluations of item values
//!
//! Each occurrence either applies in full, recording one evaluation per touched item,
//! or is skipped with a [`TransactionSkip`] describing why. There are no partial transfers.

use chrono::NaiveDate;

use super::evaluations::EvaluationSource;
use super::state::ProjectionState;
use crate::model::{NameIndex, Transaction, TransactionKind, LIST_SEPARATOR};
use crate::resolve::{resolve_number, resolve_proportion, ResolveError, SettingSource};

/// Reason a transaction occurrence was not applied
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransactionSkip {
    #[error("unknown item '{0}'")]
    UnknownItem(String),
    #[error("'{0}' has not started")]
    NotStarted(String),
    #[error("'{item}' cannot cover {needed:.2} from {available:.2}")]
    InsufficientFunds {
        item: String,
        needed: f64,
        available: f64,
    },
    #[error("debt '{0}' is already cleared")]
    DebtCleared(String),
    #[error("no amount to transfer")]
    NoAmount,
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

impl TransactionSkip {
    /// Skips that are part of normal operation rather than model mistakes
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            TransactionSkip::NotStarted(_)
                | TransactionSkip::InsufficientFunds { .. }
                | TransactionSkip::DebtCleared(_)
        )
    }
}

/// Assets named by a FROM/TO field: an item, an asset category, or a `/`-separated list
fn asset_targets(field: &str, index: &NameIndex) -> Result<Vec<usize>, TransactionSkip> {
    let field = field.trim();
    if field.is_empty() {
        return Ok(Vec::new());
    }
    if let Some((i, _)) = index.asset(field) {
        return Ok(vec![i]);
    }
    let category = index.assets_in_category(field);
    if !category.is_empty() {
        return Ok(category.to_vec());
    }
    field
        .split(LIST_SEPARATOR)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| {
            index
                .asset(name)
                .map(|(i, _)| i)
                .ok_or_else(|| TransactionSkip::UnknownItem(name.to_string()))
        })
        .collect()
}

fn names(field: &str) -> impl Iterator<Item = &str> {
    field
        .split(LIST_SEPARATOR)
        .map(str::trim)
        .filter(|name| !name.is_empty())
}

/// Apply one occurrence of a transfer
pub fn apply_transfer(
    txn: &Transaction,
    index: &NameIndex,
    state: &mut ProjectionState,
    date: NaiveDate,
    tolerance: f64,
) -> Result<(), TransactionSkip> {
    let assets = &index.model().assets;
    let sources = asset_targets(&txn.from, index)?;
    let receivers = asset_targets(&txn.to, index)?;
    if sources.is_empty() && receivers.is_empty() {
        return Err(TransactionSkip::NoAmount);
    }
    if let Some(&i) = sources
        .iter()
        .chain(&receivers)
        .find(|&&i| !state.assets[i].is_live())
    {
        return Err(TransactionSkip::NotStarted(assets[i].name.clone()));
    }

    // Amounts leaving each source, from pre-transfer values
    let mut outs = vec![0.0; sources.len()];
    if !sources.is_empty() {
        if txn.from_absolute {
            let mut remaining = resolve_number(&txn.from_value, &*state)?;
            for (k, &i) in sources.iter().enumerate() {
                let last = k + 1 == sources.len();
                let take = if last || assets[i].allows_negative() {
                    remaining
                } else {
                    remaining.min(state.assets[i].value.max(0.0))
                };
                outs[k] = take;
                remaining -= take;
            }
        } else {
            let proportion = resolve_proportion(&txn.from_value, &*state)?;
            for (k, &i) in sources.iter().enumerate() {
                outs[k] = proportion * state.assets[i].value;
            }
        }
    }
    let total_out: f64 = outs.iter().sum();

    // Amounts arriving at each receiver, from pre-transfer values
    let mut credits = vec![0.0; receivers.len()];
    if !receivers.is_empty() {
        if txn.to_absolute {
            let amount = if txn.to_value.trim().is_empty() {
                if sources.is_empty() {
                    return Err(TransactionSkip::NoAmount);
                }
                total_out
            } else {
                resolve_number(&txn.to_value, &*state)?
            };
            let share = amount / receivers.len() as f64;
            credits.iter_mut().for_each(|c| *c = share);
        } else {
            let proportion = resolve_proportion(&txn.to_value, &*state)?;
            for (k, &r) in receivers.iter().enumerate() {
                credits[k] = proportion * state.assets[r].value;
            }
        }

        // A debt credit stops at zero
        let requested: f64 = credits.iter().sum();
        for (k, &r) in receivers.iter().enumerate() {
            if assets[r].is_a_debt && credits[k] > 0.0 {
                let debited: f64 = sources
                    .iter()
                    .zip(&outs)
                    .filter(|&(&s, _)| s == r)
                    .map(|(_, out)| out)
                    .sum();
                let room = (debited - state.assets[r].value).max(0.0);
                credits[k] = if room <= tolerance { 0.0 } else { credits[k].min(room) };
            }
        }
        let granted: f64 = credits.iter().sum();
        if requested > 0.0 && granted < requested {
            if granted <= 0.0 {
                return Err(TransactionSkip::DebtCleared(assets[receivers[0]].name.clone()));
            }
            let scale = granted / requested;
            outs.iter_mut().for_each(|o| *o *= scale);
        }
    }

    // An item on both sides gives up its credit with the debit and then receives it back
    let debits: Vec<f64> = sources
        .iter()
        .zip(&outs)
        .map(|(&i, out)| {
            let returned: f64 = receivers
                .iter()
                .zip(&credits)
                .filter(|&(&r, _)| r == i)
                .map(|(_, credit)| credit)
                .sum();
            out + returned
        })
        .collect();

    for (k, &i) in sources.iter().enumerate() {
        let available = state.assets[i].value;
        if !assets[i].allows_negative() && available - debits[k] < -tolerance {
            return Err(TransactionSkip::InsufficientFunds {
                item: assets[i].name.clone(),
                needed: debits[k],
                available,
            });
        }
    }

    for (k, &i) in sources.iter().enumerate() {
        if debits[k] != 0.0 {
            state.assets[i].value -= debits[k];
            let value = state.assets[i].value;
            state.record(&assets[i].name, date, value, EvaluationSource::Transaction(txn.name.clone()));
        }
    }
    for (k, &i) in receivers.iter().enumerate() {
        if credits[k] != 0.0 {
            state.assets[i].value += credits[k];
            let value = state.assets[i].value;
            state.record(&assets[i].name, date, value, EvaluationSource::Transaction(txn.name.clone()));
        }
    }
    Ok(())
}

/// New value for a revaluation target currently worth `current`
fn revalued(txn: &Transaction, current: f64, state: &ProjectionState) -> Result<f64, ResolveError> {
    if txn.to_absolute {
        resolve_number(&txn.to_value, state)
    } else {
        Ok(resolve_proportion(&txn.to_value, state)? * current)
    }
}

/// Apply one occurrence of a revaluation
pub fn apply_revaluation(
    txn: &Transaction,
    index: &NameIndex,
    state: &mut ProjectionState,
    date: NaiveDate,
) -> Result<(), TransactionSkip> {
    let source = || EvaluationSource::Revaluation(txn.name.clone());
    let model = index.model();

    match txn.kind {
        TransactionKind::RevalueAsset | TransactionKind::Custom => {
            let targets = asset_targets(&txn.to, index)?;
            let mut updates = Vec::with_capacity(targets.len());
            for &i in &targets {
                if !state.assets[i].is_live() {
                    return Err(TransactionSkip::NotStarted(model.assets[i].name.clone()));
                }
                updates.push((i, revalued(txn, state.assets[i].value, state)?));
            }
            for (i, value) in updates {
                state.assets[i].value = value;
                state.assets[i].revalued_on = Some(date);
                state.record(&model.assets[i].name, date, value, source());
            }
        }
        TransactionKind::RevalueIncome | TransactionKind::RevalueExpense => {
            let income = txn.kind == TransactionKind::RevalueIncome;
            let mut updates = Vec::new();
            for name in names(&txn.to) {
                let found = if income {
                    index.income(name).map(|(i, _)| i)
                } else {
                    index.expense(name).map(|(i, _)| i)
                };
                let i = found.ok_or_else(|| TransactionSkip::UnknownItem(name.to_string()))?;
                let flow = if income { &state.incomes[i] } else { &state.expenses[i] };
                if !flow.is_live() {
                    return Err(TransactionSkip::NotStarted(name.to_string()));
                }
                updates.push((i, name, revalued(txn, flow.value, state)?));
            }
            for (i, name, value) in updates {
                let flow = if income { &mut state.incomes[i] } else { &mut state.expenses[i] };
                flow.value = value;
                state.record(name, date, value, source());
            }
        }
        TransactionKind::RevalueSetting => {
            let mut updates: Vec<(&str, String)> = Vec::new();
            for name in names(&txn.to) {
                if index.setting(name).is_none() {
                    return Err(TransactionSkip::UnknownItem(name.to_string()));
                }
                let text = if txn.to_absolute {
                    match resolve_number(&txn.to_value, &*state) {
                        Ok(value) => value.to_string(),
                        // Non-numeric settings (dates, labels) are stored as written
                        Err(_) => txn.to_value.trim().to_string(),
                    }
                } else {
                    let current = resolve_number(name, &*state)?;
                    (resolve_proportion(&txn.to_value, &*state)? * current).to_string()
                };
                updates.push((name, text));
            }
            let repriced = reprice_quantities(&updates, index, state)?;

            for (name, text) in updates {
                let numeric = text.parse::<f64>().ok();
                state.settings.insert(name.to_string(), text);
                if let Some(value) = numeric {
                    state.record(name, date, value, source());
                }
            }
            for (i, value) in repriced {
                state.assets[i].value = value;
                state.assets[i].revalued_on = Some(date);
                state.record(&model.assets[i].name, date, value, source());
            }
        }
    }
    Ok(())
}

/// Settings as they will read once pending revaluations land
struct PendingSettings<'s> {
    state: &'s ProjectionState,
    updates: &'s [(&'s str, String)],
}

impl SettingSource for PendingSettings<'_> {
    fn setting_text(&self, name: &str) -> Option<&str> {
        self.updates
            .iter()
            .rev()
            .find(|(pending, _)| *pending == name)
            .map(|(_, text)| text.as_str())
            .or_else(|| self.state.setting_text(name))
    }
}

/// New values of live quantity-holding assets whose VALUE is one of the revalued settings
fn reprice_quantities(
    updates: &[(&str, String)],
    index: &NameIndex,
    state: &ProjectionState,
) -> Result<Vec<(usize, f64)>, TransactionSkip> {
    let pending = PendingSettings { state, updates };
    let mut repriced = Vec::new();
    for (i, asset) in index.model().assets.iter().enumerate() {
        let Some(quantity) = asset.quantity else {
            continue;
        };
        let priced_by_update = updates.iter().any(|(name, _)| asset.value.trim() == *name);
        if !priced_by_update || !state.assets[i].is_live() {
            continue;
        }
        repriced.push((i, quantity * resolve_number(&asset.value, &pending)?));
    }
    Ok(repriced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Asset, Expense, Model, Setting};
    use approx::assert_abs_diff_eq;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2018, 1, 1).unwrap()
    }

    fn live_state(model: &Model, values: &[f64]) -> ProjectionState {
        let mut state = ProjectionState::from_model(model);
        for (asset, value) in state.assets.iter_mut().zip(values) {
            asset.value = *value;
            asset.started = true;
        }
        state
    }

    #[test]
    fn test_absolute_transfer() {
        let model = Model::new()
            .with_asset(Asset::new("Cash", "2018-01-01", "100"))
            .with_asset(Asset::new("ISA", "2018-01-01", "0"));
        let index = NameIndex::build(&model);
        let mut state = live_state(&model, &[100.0, 0.0]);
        let txn = Transaction::transfer("save", "Cash", "ISA", "40", "2018-01-01");

        apply_transfer(&txn, &index, &mut state, date(), 1e-6).unwrap();

        assert_abs_diff_eq!(state.assets[0].value, 60.0);
        assert_abs_diff_eq!(state.assets[1].value, 40.0);
        assert_eq!(state.evaluations.len(), 2);
        assert_eq!(state.evaluations[0].name, "Cash");
    }

    #[test]
    fn test_proportional_self_transfer_is_not_cancelling() {
        let model = Model::new().with_asset(Asset::new("Savings", "2018-01-01", "222"));
        let index = NameIndex::build(&model);
        let mut state = live_state(&model, &[222.0]);
        let txn = Transaction::transfer("churn", "Savings", "Savings", "", "2018-01-01")
            .proportional_from("0.5")
            .proportional_to("50%");

        apply_transfer(&txn, &index, &mut state, date(), 1e-6).unwrap();

        let values: Vec<f64> = state.evaluations.iter().map(|e| e.value).collect();
        assert_eq!(values, vec![0.0, 111.0]);
        assert_abs_diff_eq!(state.assets[0].value, 111.0);
    }

    #[test]
    fn test_overdraft_skips_whole_transfer() {
        let model = Model::new()
            .with_asset(Asset::new("Cash", "2018-01-01", "10"))
            .with_asset(Asset::new("ISA", "2018-01-01", "0"));
        let index = NameIndex::build(&model);
        let mut state = live_state(&model, &[10.0, 0.0]);
        let txn = Transaction::transfer("save", "Cash", "ISA", "40", "2018-01-01");

        let skip = apply_transfer(&txn, &index, &mut state, date(), 1e-6).unwrap_err();

        assert!(matches!(skip, TransactionSkip::InsufficientFunds { .. }));
        assert!(skip.is_expected());
        assert!(state.evaluations.is_empty());
        assert_abs_diff_eq!(state.assets[0].value, 10.0);
    }

    #[test]
    fn test_absolute_draw_across_list() {
        let model = Model::new()
            .with_asset(Asset::new("A", "2018-01-01", "30"))
            .with_asset(Asset::new("B", "2018-01-01", "50"))
            .with_asset(Asset::new("C", "2018-01-01", "0"));
        let index = NameIndex::build(&model);
        let mut state = live_state(&model, &[30.0, 50.0, 0.0]);
        let txn = Transaction::transfer("merge", "A/B", "C", "60", "2018-01-01");

        apply_transfer(&txn, &index, &mut state, date(), 1e-6).unwrap();

        assert_abs_diff_eq!(state.assets[0].value, 0.0);
        assert_abs_diff_eq!(state.assets[1].value, 20.0);
        assert_abs_diff_eq!(state.assets[2].value, 60.0);
    }

    #[test]
    fn test_debt_payment_is_capped() {
        let model = Model::new()
            .with_asset(Asset::new("Cash", "2018-01-01", "500"))
            .with_asset(Asset::debt("Loan", "2018-01-01", "-100"));
        let index = NameIndex::build(&model);
        let mut state = live_state(&model, &[500.0, -100.0]);
        let txn = Transaction::transfer("repay", "Cash", "Loan", "150", "2018-01-01");

        apply_transfer(&txn, &index, &mut state, date(), 1e-6).unwrap();
        assert_abs_diff_eq!(state.assets[0].value, 400.0);
        assert_abs_diff_eq!(state.assets[1].value, 0.0);

        let skip = apply_transfer(&txn, &index, &mut state, date(), 1e-6).unwrap_err();
        assert_eq!(skip, TransactionSkip::DebtCleared("Loan".to_string()));
    }

    #[test]
    fn test_unknown_and_unstarted_items() {
        let model = Model::new()
            .with_asset(Asset::new("Cash", "2018-01-01", "100"))
            .with_asset(Asset::new("Later", "2030-01-01", "0"));
        let index = NameIndex::build(&model);
        let mut state = live_state(&model, &[100.0]);

        let missing = Transaction::transfer("t", "Cash", "Nowhere", "1", "2018-01-01");
        assert_eq!(
            apply_transfer(&missing, &index, &mut state, date(), 1e-6),
            Err(TransactionSkip::UnknownItem("Nowhere".to_string()))
        );
        let early = Transaction::transfer("t", "Cash", "Later", "1", "2018-01-01");
        assert_eq!(
            apply_transfer(&early, &index, &mut state, date(), 1e-6),
            Err(TransactionSkip::NotStarted("Later".to_string()))
        );
    }

    #[test]
    fn test_revalue_asset_and_expense() {
        let model = Model::new()
            .with_asset(Asset::new("House", "2018-01-01", "200000"))
            .with_expense(Expense::new("Rent", "900", "2018-01-01", "", "1m"));
        let index = NameIndex::build(&model);
        let mut state = live_state(&model, &[200000.0]);
        state.expenses[0].value = 900.0;
        state.expenses[0].started = true;

        let house = Transaction::revalue(TransactionKind::RevalueAsset, "valuation", "House", "0.9", "2018-01-01")
            .proportional_to("0.9");
        apply_revaluation(&house, &index, &mut state, date()).unwrap();
        assert_abs_diff_eq!(state.assets[0].value, 180000.0);
        assert_eq!(state.assets[0].revalued_on, Some(date()));

        let rent = Transaction::revalue(TransactionKind::RevalueExpense, "rent rise", "Rent", "950", "2018-01-01");
        apply_revaluation(&rent, &index, &mut state, date()).unwrap();
        assert_abs_diff_eq!(state.expenses[0].value, 950.0);
        assert!(state.evaluations.iter().all(|e| e.source.is_revaluation()));
    }

    #[test]
    fn test_revalue_setting_reprices_quantities() {
        let model = Model::new()
            .with_setting(Setting::new("sharePrice", "2"))
            .with_asset(Asset::new("Shares", "2018-01-01", "sharePrice").with_quantity(100.0));
        let index = NameIndex::build(&model);
        let mut state = live_state(&model, &[200.0]);

        let txn = Transaction::revalue(TransactionKind::RevalueSetting, "reprice", "sharePrice", "3", "2018-01-01");
        apply_revaluation(&txn, &index, &mut state, date()).unwrap();

        assert_eq!(state.settings["sharePrice"], "3");
        assert_abs_diff_eq!(state.assets[0].value, 300.0);
        let names: Vec<&str> = state.evaluations.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["sharePrice", "Shares"]);
    }

    #[test]
    fn test_failed_setting_revaluation_changes_nothing() {
        let model = Model::new()
            .with_setting(Setting::new("a", "10"))
            .with_setting(Setting::new("b", "retire"))
            .with_asset(Asset::new("Units", "2018-01-01", "a").with_quantity(2.0));
        let index = NameIndex::build(&model);
        let mut state = live_state(&model, &[20.0]);

        let txn = Transaction::revalue(TransactionKind::RevalueSetting, "halve", "a/b", "", "2018-01-01")
            .proportional_to("50%");
        let skip = apply_revaluation(&txn, &index, &mut state, date()).unwrap_err();

        assert_eq!(skip, TransactionSkip::Resolve(ResolveError::MissingSetting("retire".to_string())));
        assert_eq!(state.settings["a"], "10");
        assert_eq!(state.settings["b"], "retire");
        assert_abs_diff_eq!(state.assets[0].value, 20.0);
        assert_eq!(state.assets[0].revalued_on, None);
        assert!(state.evaluations.is_empty());
    }

    #[test]
    fn test_unpriceable_quantity_blocks_setting_revaluation() {
        let model = Model::new()
            .with_setting(Setting::new("sharePrice", "2"))
            .with_asset(Asset::new("Shares", "2018-01-01", "sharePrice").with_quantity(100.0));
        let index = NameIndex::build(&model);
        let mut state = live_state(&model, &[200.0]);

        let txn = Transaction::revalue(TransactionKind::RevalueSetting, "delist", "sharePrice", "suspended", "2018-01-01");
        assert!(apply_revaluation(&txn, &index, &mut state, date()).is_err());

        assert_eq!(state.settings["sharePrice"], "2");
        assert_abs_diff_eq!(state.assets[0].value, 200.0);
        assert!(state.evaluations.is_empty());
    }
}
