//! Evaluation output structures for projections

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::{Interval, COMPOSITE_SEPARATOR};
use crate::tax::TaxKind;

/// What caused an evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "cause", rename_all = "camelCase")]
pub enum EvaluationSource {
    /// Asset or debt entering the model at its START
    Start,
    /// Growth/CPI step of an asset
    Growth,
    /// Income occurrence (on the income itself and on the cash it credits)
    Income(String),
    /// Expense occurrence (on the expense itself and on the cash it debits)
    Expense(String),
    /// Leg of a transfer transaction
    Transaction(String),
    /// Revaluation transaction; never accumulated as a flow
    Revaluation(String),
    /// Tax settlement; `net` marks the net-of-tax figure
    Tax {
        person: String,
        kind: TaxKind,
        net: bool,
    },
}

impl EvaluationSource {
    /// Key under which a change to `item` is attributed in delta charts
    pub fn cause_key(&self, item: &str) -> String {
        match self {
            EvaluationSource::Start => item.to_string(),
            EvaluationSource::Growth => format!("growth{}{}", COMPOSITE_SEPARATOR, item),
            EvaluationSource::Revaluation(_) => format!("revalue{}{}", COMPOSITE_SEPARATOR, item),
            EvaluationSource::Income(name)
            | EvaluationSource::Expense(name)
            | EvaluationSource::Transaction(name) => name.clone(),
            EvaluationSource::Tax { person, kind, .. } => format!("{} {}", person, kind.label()),
        }
    }

    pub fn is_revaluation(&self) -> bool {
        matches!(self, EvaluationSource::Revaluation(_))
    }
}

impl fmt::Display for EvaluationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvaluationSource::Start => write!(f, "start"),
            EvaluationSource::Growth => write!(f, "growth"),
            EvaluationSource::Income(name) => write!(f, "income:{}", name),
            EvaluationSource::Expense(name) => write!(f, "expense:{}", name),
            EvaluationSource::Transaction(name) => write!(f, "transaction:{}", name),
            EvaluationSource::Revaluation(name) => write!(f, "revaluation:{}", name),
            EvaluationSource::Tax { person, kind, net: false } => {
                write!(f, "tax:{} {}", person, kind.label())
            }
            EvaluationSource::Tax { person, kind, net: true } => {
                write!(f, "tax:{} {}", person, kind.net_label())
            }
        }
    }
}

/// One recorded value of a named item at a date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub name: String,
    pub date: NaiveDate,
    pub value: f64,
    pub source: EvaluationSource,
}

/// A recoverable failure noticed during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Item (or transaction) the failure belongs to
    pub item: String,
    pub message: String,
    /// Whether the failure invalidated the whole run
    pub systemic: bool,
}

/// Complete projection result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionResult {
    /// Window the run was asked for
    pub interval: Interval,

    /// Evaluations ordered by date, cash first within a date
    pub evaluations: Vec<Evaluation>,

    pub diagnostics: Vec<Diagnostic>,
}

impl ProjectionResult {
    pub fn new(interval: Interval) -> Self {
        Self {
            interval,
            evaluations: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Evaluations of one item, in order
    pub fn evaluations_for<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Evaluation> + 'a {
        self.evaluations.iter().filter(move |e| e.name == name)
    }

    /// Last value recorded for `name` on or before `date`
    pub fn latest_value(&self, name: &str, date: NaiveDate) -> Option<f64> {
        self.evaluations_for(name)
            .take_while(|e| e.date <= date)
            .last()
            .map(|e| e.value)
    }

    /// Whether a systemic failure emptied the run
    pub fn is_systemic_failure(&self) -> bool {
        self.diagnostics.iter().any(|d| d.systemic)
    }

    /// Get summary statistics
    pub fn summary(&self) -> ProjectionSummary {
        let mut items: Vec<&str> = self.evaluations.iter().map(|e| e.name.as_str()).collect();
        items.sort_unstable();
        items.dedup();

        ProjectionSummary {
            total_evaluations: self.evaluations.len(),
            distinct_items: items.len(),
            first_date: self.evaluations.first().map(|e| e.date),
            last_date: self.evaluations.last().map(|e| e.date),
            diagnostics: self.diagnostics.len(),
        }
    }
}

/// Summary statistics for a projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionSummary {
    pub total_evaluations: usize,
    pub distinct_items: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub diagnostics: usize,
}
