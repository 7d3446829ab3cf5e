//! Core projection engine: a discrete-event run over every item of a model
//!
//! Each item schedules its own moments (start, growth or inflation steps, occurrences,
//! transaction dates); the moments are merged in one queue and applied to a scratch
//! [`ProjectionState`]. The run is a pure function of the model snapshot and the window.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;

use super::evaluations::{Diagnostic, EvaluationSource, ProjectionResult};
use super::schedule::{Action, FlowRef, Schedule};
use super::state::{FlowState, ProjectionState};
use super::transactions::{self, TransactionSkip};
use crate::model::{Interval, Model, NameIndex};
use crate::resolve::{
    annual_to_period, parse_recurrence, period_factor, resolve_number, DateResolver, Frequency,
    ResolveError, Span,
};
use crate::tax::{parse_liabilities, NoTax, TaxKind, TaxPolicy, TaxYear};

/// Configuration for a projection run
#[derive(Debug, Clone)]
pub struct ProjectionConfig {
    /// Growth and inflation step
    pub step: Frequency,

    /// Asset credited by incomes and debited by expenses and tax
    pub cash_name: String,

    /// Setting holding the annual CPI percentage
    pub cpi_setting: String,

    /// Overdraft slack allowed on assets that cannot go negative
    pub tolerance: f64,

    /// Collaborator assessing tagged incomes and gains
    pub tax_policy: Arc<dyn TaxPolicy>,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            step: Frequency::Monthly,
            cash_name: "Cash".to_string(),
            cpi_setting: "cpi".to_string(),
            tolerance: 1e-6,
            tax_policy: Arc::new(NoTax),
        }
    }
}

/// Main projection engine
#[derive(Debug, Clone, Default)]
pub struct ProjectionEngine {
    config: ProjectionConfig,
}

impl ProjectionEngine {
    /// Create a new projection engine with the given config
    pub fn new(config: ProjectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProjectionConfig {
        &self.config
    }

    /// Run a projection of the whole model up to the end of `interval`
    ///
    /// Items are simulated from their own start dates, so evaluations before
    /// `interval.start` are included; charts use them to carry levels forward.
    pub fn project(&self, model: &Model, interval: Interval) -> ProjectionResult {
        let state = self.run(model, interval.end);
        ProjectionResult {
            interval,
            evaluations: state.evaluations,
            diagnostics: state.diagnostics,
        }
    }

    /// Process every moment strictly before `end` and return the final state
    pub(crate) fn run(&self, model: &Model, end: NaiveDate) -> ProjectionState {
        let mut run = Run::new(&self.config, model, end);
        if let Err(diagnostic) = run.check_triggers() {
            log::warn!("{}: {}", diagnostic.item, diagnostic.message);
            let mut state = ProjectionState::from_model(model);
            state.diagnostics.push(diagnostic);
            return state;
        }
        run.schedule_items();
        while let Some(moment) = run.schedule.pop() {
            run.process(moment.date, moment.action);
        }
        run.finish()
    }
}

/// Working structures owned by one run
struct Run<'a> {
    config: &'a ProjectionConfig,
    model: &'a Model,
    index: NameIndex<'a>,
    dates: DateResolver<'a>,
    state: ProjectionState,
    schedule: Schedule,
    cash: Option<usize>,
    period_fraction: f64,
    pending_tax: HashMap<(String, TaxKind, NaiveDate), (f64, f64)>,
    cpi_reported: bool,
}

impl<'a> Run<'a> {
    fn new(config: &'a ProjectionConfig, model: &'a Model, end: NaiveDate) -> Self {
        let index = NameIndex::build(model);
        let cash = index
            .asset(&config.cash_name)
            .filter(|(_, asset)| !asset.is_a_debt)
            .map(|(i, _)| i);
        Self {
            config,
            model,
            index,
            dates: DateResolver::new(&model.triggers, &model.settings),
            state: ProjectionState::from_model(model),
            schedule: Schedule::new(end),
            cash,
            period_fraction: config.step.span().year_fraction(),
            pending_tax: HashMap::new(),
            cpi_reported: false,
        }
    }

    /// Resolve every trigger up front; a cycle anywhere invalidates the run
    fn check_triggers(&self) -> Result<(), Diagnostic> {
        for trigger in &self.model.triggers {
            if let Err(err) = self.dates.resolve(&trigger.name) {
                if err.is_systemic() {
                    return Err(Diagnostic {
                        item: trigger.name.clone(),
                        message: err.to_string(),
                        systemic: true,
                    });
                }
            }
        }
        Ok(())
    }

    fn resolve_date(&mut self, item: &str, expr: &str) -> Option<NaiveDate> {
        match self.dates.resolve(expr) {
            Ok(date) => Some(date),
            Err(err) => {
                self.state.diagnose(item, err.to_string());
                None
            }
        }
    }

    fn resolve_optional_date(&mut self, item: &str, expr: &str) -> Result<Option<NaiveDate>, ()> {
        if expr.trim().is_empty() {
            return Ok(None);
        }
        self.resolve_date(item, expr).map(Some).ok_or(())
    }

    fn recurrence(&mut self, item: &str, text: &str) -> Result<Option<Span>, ()> {
        parse_recurrence(text).map_err(|err| self.state.diagnose(item, err.to_string()))
    }

    /// `start + k * step` for k >= 1, strictly before `until`
    fn schedule_steps(&mut self, start: NaiveDate, until: NaiveDate, action: impl Fn() -> Action) {
        let step = self.config.step.span();
        let until = until.min(self.schedule.end());
        let mut k = 1;
        while let Some(date) = step.add_to(start, k) {
            if date >= until || !self.schedule.push(date, action()) {
                break;
            }
            k += 1;
        }
    }

    fn schedule_occurrences(
        &mut self,
        start: NaiveDate,
        until: Option<NaiveDate>,
        recurrence: Option<Span>,
        action: Action,
    ) {
        let until = until.map_or(self.schedule.end(), |u| u.min(self.schedule.end()));
        match recurrence {
            None => {
                if start < until {
                    self.schedule.push(start, action);
                }
            }
            Some(span) => {
                for date in span.occurrences(start, until) {
                    self.schedule.push(date, action.clone());
                }
            }
        }
    }

    /// Resolve each item's dates and queue its moments
    fn schedule_items(&mut self) {
        let model = self.model;

        for (i, asset) in model.assets.iter().enumerate() {
            let Some(start) = self.resolve_date(&asset.name, &asset.start) else {
                self.state.assets[i].excluded = true;
                continue;
            };
            self.state.assets[i].start = Some(start);
            self.schedule.push(start, Action::AssetStart(i));
            self.schedule_steps(start, self.schedule.end(), || Action::Growth(i));
        }

        let flows = model
            .incomes
            .iter()
            .enumerate()
            .map(|(i, f)| (FlowRef::Income(i), &f.name, &f.start, &f.end, &f.value_set, &f.recurrence))
            .chain(model.expenses.iter().enumerate().map(|(i, f)| {
                (FlowRef::Expense(i), &f.name, &f.start, &f.end, &f.value_set, &f.recurrence)
            }));
        for (flow, name, start, end, value_set, recurrence) in flows {
            let resolved = self.resolve_date(name, start).ok_or(()).and_then(|start| {
                let end = self.resolve_optional_date(name, end)?;
                let value_set = self.resolve_optional_date(name, value_set)?.unwrap_or(start);
                let recurrence = self.recurrence(name, recurrence)?;
                Ok((start, end, value_set, recurrence))
            });
            let Ok((start, end, value_set, recurrence)) = resolved else {
                self.flow_state(flow).excluded = true;
                continue;
            };
            let state = self.flow_state(flow);
            state.start = Some(start);
            state.end = end;

            self.schedule.push(value_set.min(start), Action::FlowStart(flow));
            self.schedule_steps(value_set, end.unwrap_or(NaiveDate::MAX), || Action::Inflation(flow));
            self.schedule_occurrences(start, end, recurrence, Action::Occurrence(flow));
        }

        for (t, txn) in model.transactions.iter().enumerate() {
            let Some(date) = self.resolve_date(&txn.name, &txn.date) else {
                continue;
            };
            let Ok(stop) = self.resolve_optional_date(&txn.name, &txn.stop_date) else {
                continue;
            };
            let Ok(recurrence) = self.recurrence(&txn.name, &txn.recurrence) else {
                continue;
            };
            let action = if txn.kind.is_revaluation() {
                Action::Revaluation(t)
            } else {
                Action::Transfer(t)
            };
            self.schedule_occurrences(date, stop, recurrence, action);
        }
    }

    fn flow_state(&mut self, flow: FlowRef) -> &mut FlowState {
        match flow {
            FlowRef::Income(i) => &mut self.state.incomes[i],
            FlowRef::Expense(i) => &mut self.state.expenses[i],
        }
    }

    /// Annual CPI percent as of now; a missing setting means no inflation
    fn cpi_percent(&mut self) -> f64 {
        let name = self.config.cpi_setting.as_str();
        if !self.state.settings.contains_key(name) {
            if !self.cpi_reported {
                log::debug!("no '{}' setting, projecting without inflation", name);
                self.cpi_reported = true;
            }
            return 0.0;
        }
        match resolve_number(name, &self.state) {
            Ok(cpi) => cpi,
            Err(err) => {
                if !self.cpi_reported {
                    self.state.diagnose(name, err.to_string());
                    self.cpi_reported = true;
                }
                0.0
            }
        }
    }

    fn process(&mut self, date: NaiveDate, action: Action) {
        let model = self.model;
        match action {
            Action::AssetStart(i) => self.start_asset(i, date),
            Action::FlowStart(flow) => self.start_flow(flow),
            Action::Growth(i) => self.grow_asset(i, date),
            Action::Inflation(flow) => self.inflate_flow(flow),
            Action::Occurrence(flow) => self.flow_occurrence(flow, date),
            Action::Revaluation(t) => {
                let txn = &model.transactions[t];
                let outcome = transactions::apply_revaluation(txn, &self.index, &mut self.state, date);
                self.report_skip(&txn.name, date, outcome);
            }
            Action::Transfer(t) => {
                let txn = &model.transactions[t];
                let outcome = transactions::apply_transfer(
                    txn,
                    &self.index,
                    &mut self.state,
                    date,
                    self.config.tolerance,
                );
                self.report_skip(&txn.name, date, outcome);
            }
            Action::TaxSettlement { person, kind } => self.settle_tax(person, kind, date),
        }
    }

    fn report_skip(&mut self, name: &str, date: NaiveDate, outcome: Result<(), TransactionSkip>) {
        match outcome {
            Ok(()) => {}
            Err(skip) if skip.is_expected() => log::debug!("{} skipped on {}: {}", name, date, skip),
            Err(skip) => self.state.diagnose(name, format!("skipped on {}: {}", date, skip)),
        }
    }

    fn start_asset(&mut self, i: usize, date: NaiveDate) {
        let model = self.model;
        let asset = &model.assets[i];
        let resolved: Result<f64, ResolveError> = resolve_number(&asset.value, &self.state)
            .and_then(|value| {
                resolve_number(&asset.growth, &self.state)?;
                Ok(value * asset.quantity.unwrap_or(1.0))
            });
        match resolved {
            Ok(value) => {
                let state = &mut self.state.assets[i];
                state.value = value;
                state.started = true;
                self.state.record(&asset.name, date, value, EvaluationSource::Start);
            }
            Err(err) => {
                self.state.assets[i].excluded = true;
                self.state.diagnose(&asset.name, format!("excluded: {}", err));
            }
        }
    }

    fn start_flow(&mut self, flow: FlowRef) {
        let model = self.model;
        let (name, value) = match flow {
            FlowRef::Income(i) => (&model.incomes[i].name, &model.incomes[i].value),
            FlowRef::Expense(i) => (&model.expenses[i].name, &model.expenses[i].value),
        };
        match resolve_number(value, &self.state) {
            Ok(amount) => {
                let state = self.flow_state(flow);
                state.value = amount;
                state.started = true;
            }
            Err(err) => {
                self.flow_state(flow).excluded = true;
                self.state.diagnose(name, format!("excluded: {}", err));
            }
        }
    }

    fn grow_asset(&mut self, i: usize, date: NaiveDate) {
        let model = self.model;
        let asset = &model.assets[i];
        let running = &self.state.assets[i];
        if !running.is_live() || running.revalued_on == Some(date) {
            return;
        }
        let growth = match resolve_number(&asset.growth, &self.state) {
            Ok(growth) => growth,
            Err(err) => {
                self.state.diagnose(&asset.name, format!("growth skipped on {}: {}", date, err));
                return;
            }
        };
        let cpi = self.cpi_percent();
        let factor = period_factor(growth, asset.cpi_immune, cpi, self.period_fraction);

        let before = self.state.assets[i].value;
        let after = before * factor;
        self.state.assets[i].value = after;
        self.state.record(&asset.name, date, after, EvaluationSource::Growth);

        if after > before {
            self.forward_tax(&asset.liability, after - before, date);
        }
    }

    fn inflate_flow(&mut self, flow: FlowRef) {
        let immune = match flow {
            FlowRef::Income(i) => self.model.incomes[i].cpi_immune,
            FlowRef::Expense(i) => self.model.expenses[i].cpi_immune,
        };
        if immune || !self.flow_state(flow).is_live() {
            return;
        }
        let factor = annual_to_period(self.cpi_percent(), self.period_fraction);
        self.flow_state(flow).value *= factor;
    }

    fn flow_occurrence(&mut self, flow: FlowRef, date: NaiveDate) {
        if !self.flow_state(flow).is_live() {
            return;
        }
        let model = self.model;
        let amount = self.flow_state(flow).value;
        let (name, source, signed) = match flow {
            FlowRef::Income(i) => {
                let name = &model.incomes[i].name;
                (name, EvaluationSource::Income(name.clone()), amount)
            }
            FlowRef::Expense(i) => {
                let name = &model.expenses[i].name;
                (name, EvaluationSource::Expense(name.clone()), -amount)
            }
        };
        self.state.record(name, date, amount, source.clone());
        self.move_cash(signed, date, source);

        if let FlowRef::Income(i) = flow {
            self.forward_tax(&model.incomes[i].liability, amount, date);
        }
    }

    /// Credit (positive) or debit (negative) the cash asset
    fn move_cash(&mut self, amount: f64, date: NaiveDate, source: EvaluationSource) {
        match self.cash {
            Some(c) if self.state.assets[c].is_live() => {
                self.state.assets[c].value += amount;
                let value = self.state.assets[c].value;
                self.state.record(&self.config.cash_name, date, value, source);
            }
            _ => log::debug!("no live '{}' asset for {} on {}", self.config.cash_name, source, date),
        }
    }

    /// Hand a tagged gross amount to the tax policy, split evenly across tags
    fn forward_tax(&mut self, liability: &str, gross: f64, date: NaiveDate) {
        let tags = parse_liabilities(liability);
        if tags.is_empty() {
            return;
        }
        let share = gross / tags.len() as f64;
        for tag in tags {
            let Some(assessment) = self.config.tax_policy.assess(&tag.person, tag.kind, share, date) else {
                continue;
            };
            let due = assessment.settlement_date.max(date);
            let key = (tag.person.clone(), tag.kind, due);
            if !self.pending_tax.contains_key(&key) {
                let action = Action::TaxSettlement {
                    person: tag.person,
                    kind: tag.kind,
                };
                if !self.schedule.push(due, action) {
                    continue;
                }
            }
            let entry = self.pending_tax.entry(key).or_insert((0.0, 0.0));
            entry.0 += assessment.tax_due;
            entry.1 += assessment.net;
        }
    }

    fn settle_tax(&mut self, person: String, kind: TaxKind, date: NaiveDate) {
        let Some((tax, net)) = self.pending_tax.remove(&(person.clone(), kind, date)) else {
            return;
        };
        log::debug!("{} {} for {} settled on {}", person, kind.label(), TaxYear::from_date(date), date);
        let source = |net| EvaluationSource::Tax {
            person: person.clone(),
            kind,
            net,
        };
        self.state
            .record(&format!("{} {}", person, kind.label()), date, tax, source(false));
        self.state
            .record(&format!("{} {}", person, kind.net_label()), date, net, source(true));
        if tax != 0.0 {
            self.move_cash(-tax, date, source(false));
        }
    }

    /// Order evaluations by date with the cash item first within a date
    fn finish(self) -> ProjectionState {
        let mut state = self.state;
        let cash = self.config.cash_name.as_str();
        state
            .evaluations
            .sort_by_key(|e| (e.date, e.name != cash));
        state
    }
}
