//! Model records: settings, triggers, assets, incomes, expenses and transactions
//!
//! Records are flat and reference each other only by name. The engine never
//! mutates them; running values live in the projection state table.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Separator between the cause and the item in composite chart keys (`growth␟Estate`)
pub const COMPOSITE_SEPARATOR: char = '\u{241F}';

/// Separator for item-name lists in transaction FROM/TO fields
pub const LIST_SEPARATOR: char = '/';

fn default_zero() -> String {
    "0".to_string()
}

fn default_true() -> bool {
    true
}

/// How a setting may be edited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SettingType {
    #[default]
    Constant,
    Adjustable,
    /// Presentation preference, never read by the engine
    ViewOnly,
}

/// A named value: a number, a date, or an expression referencing another setting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Setting {
    pub name: String,
    pub value: String,
    #[serde(rename = "TYPE", default)]
    pub setting_type: SettingType,
    #[serde(default)]
    pub era: Option<String>,
}

impl Setting {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            setting_type: SettingType::Constant,
            era: None,
        }
    }

    pub fn view(name: &str, value: &str) -> Self {
        Self {
            setting_type: SettingType::ViewOnly,
            ..Self::new(name, value)
        }
    }
}

/// A named date alias; DATE may be a literal, another trigger, or `name±N<unit>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Trigger {
    pub name: String,
    pub date: String,
}

impl Trigger {
    pub fn new(name: &str, date: &str) -> Self {
        Self {
            name: name.to_string(),
            date: date.to_string(),
        }
    }
}

/// An asset or debt whose value is carried forward and compounded each step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Asset {
    pub name: String,

    /// Start date or trigger name
    pub start: String,

    /// Number or setting expression; scaled by `quantity` when present
    pub value: String,

    /// Units held; the start value is `quantity * value`
    #[serde(default)]
    pub quantity: Option<f64>,

    /// Annual growth in percent, number or setting expression
    #[serde(default = "default_zero")]
    pub growth: String,

    #[serde(default)]
    pub cpi_immune: bool,

    #[serde(default)]
    pub can_be_negative: bool,

    #[serde(default)]
    pub is_a_debt: bool,

    /// Tax tags such as `Joe(CGT)|Jane(incomeTax)`
    #[serde(default)]
    pub liability: String,

    #[serde(default)]
    pub purchase_price: String,

    #[serde(default)]
    pub category: String,
}

impl Asset {
    pub fn new(name: &str, start: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            start: start.to_string(),
            value: value.to_string(),
            quantity: None,
            growth: default_zero(),
            cpi_immune: false,
            can_be_negative: false,
            is_a_debt: false,
            liability: String::new(),
            purchase_price: String::new(),
            category: String::new(),
        }
    }

    /// A debt carries a negative value and may always go negative
    pub fn debt(name: &str, start: &str, value: &str) -> Self {
        Self {
            is_a_debt: true,
            can_be_negative: true,
            ..Self::new(name, start, value)
        }
    }

    pub fn with_growth(mut self, growth: &str) -> Self {
        self.growth = growth.to_string();
        self
    }

    pub fn with_quantity(mut self, quantity: f64) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }

    pub fn with_liability(mut self, liability: &str) -> Self {
        self.liability = liability.to_string();
        self
    }

    pub fn cpi_immune(mut self) -> Self {
        self.cpi_immune = true;
        self
    }

    pub fn can_be_negative(mut self) -> Self {
        self.can_be_negative = true;
        self
    }

    /// Whether transfers out may take the value below zero
    pub fn allows_negative(&self) -> bool {
        self.can_be_negative || self.is_a_debt
    }
}

/// A recurring or one-off inflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Income {
    pub name: String,
    pub start: String,
    #[serde(default)]
    pub end: String,
    pub value: String,

    /// Date the VALUE was fixed; inflation accrues from here (defaults to START)
    #[serde(default)]
    pub value_set: String,

    /// Empty for a single occurrence at START, otherwise `Nd/Nw/Nm/Ny`
    #[serde(default)]
    pub recurrence: String,

    #[serde(default)]
    pub cpi_immune: bool,

    #[serde(default)]
    pub liability: String,

    #[serde(default)]
    pub category: String,
}

impl Income {
    pub fn new(name: &str, value: &str, start: &str, end: &str, recurrence: &str) -> Self {
        Self {
            name: name.to_string(),
            start: start.to_string(),
            end: end.to_string(),
            value: value.to_string(),
            value_set: String::new(),
            recurrence: recurrence.to_string(),
            cpi_immune: false,
            liability: String::new(),
            category: String::new(),
        }
    }

    pub fn with_value_set(mut self, value_set: &str) -> Self {
        self.value_set = value_set.to_string();
        self
    }

    pub fn with_liability(mut self, liability: &str) -> Self {
        self.liability = liability.to_string();
        self
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }

    pub fn cpi_immune(mut self) -> Self {
        self.cpi_immune = true;
        self
    }
}

/// A recurring or one-off outflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Expense {
    pub name: String,
    pub start: String,
    #[serde(default)]
    pub end: String,
    pub value: String,
    #[serde(default)]
    pub value_set: String,
    #[serde(default)]
    pub recurrence: String,
    #[serde(default)]
    pub cpi_immune: bool,
    #[serde(default)]
    pub category: String,
}

impl Expense {
    pub fn new(name: &str, value: &str, start: &str, end: &str, recurrence: &str) -> Self {
        Self {
            name: name.to_string(),
            start: start.to_string(),
            end: end.to_string(),
            value: value.to_string(),
            value_set: String::new(),
            recurrence: recurrence.to_string(),
            cpi_immune: false,
            category: String::new(),
        }
    }

    pub fn with_value_set(mut self, value_set: &str) -> Self {
        self.value_set = value_set.to_string();
        self
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }

    pub fn cpi_immune(mut self) -> Self {
        self.cpi_immune = true;
        self
    }
}

/// What a transaction does on each occurrence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransactionKind {
    /// Move funds from FROM to TO
    #[default]
    Custom,
    /// Set the value of the asset(s) named in TO
    RevalueAsset,
    RevalueIncome,
    RevalueExpense,
    RevalueSetting,
}

impl TransactionKind {
    pub fn is_revaluation(&self) -> bool {
        !matches!(self, TransactionKind::Custom)
    }
}

/// A transfer between items, or a revaluation of the item(s) named in TO
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Transaction {
    pub name: String,

    /// Source item, `/`-separated list, or asset category; empty for money entering the model
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub from_value: String,
    #[serde(default = "default_true")]
    pub from_absolute: bool,

    /// Receiving item(s); for revaluations, the item(s) being revalued
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub to_value: String,
    #[serde(default = "default_true")]
    pub to_absolute: bool,

    pub date: String,
    #[serde(default)]
    pub stop_date: String,
    #[serde(default)]
    pub recurrence: String,

    #[serde(rename = "TYPE", default)]
    pub kind: TransactionKind,

    #[serde(default)]
    pub category: String,
}

impl Transaction {
    /// An absolute transfer of `amount` from one item to another
    pub fn transfer(name: &str, from: &str, to: &str, amount: &str, date: &str) -> Self {
        Self {
            name: name.to_string(),
            from: from.to_string(),
            from_value: amount.to_string(),
            from_absolute: true,
            to: to.to_string(),
            to_value: String::new(),
            to_absolute: true,
            date: date.to_string(),
            stop_date: String::new(),
            recurrence: String::new(),
            kind: TransactionKind::Custom,
            category: String::new(),
        }
    }

    /// A revaluation of `target` to `value` (absolute) on `date`
    pub fn revalue(kind: TransactionKind, name: &str, target: &str, value: &str, date: &str) -> Self {
        Self {
            from: String::new(),
            from_value: String::new(),
            to_value: value.to_string(),
            kind,
            ..Self::transfer(name, "", target, "", date)
        }
    }

    pub fn proportional_from(mut self, proportion: &str) -> Self {
        self.from_value = proportion.to_string();
        self.from_absolute = false;
        self
    }

    pub fn proportional_to(mut self, proportion: &str) -> Self {
        self.to_value = proportion.to_string();
        self.to_absolute = false;
        self
    }

    pub fn absolute_to(mut self, amount: &str) -> Self {
        self.to_value = amount.to_string();
        self.to_absolute = true;
        self
    }

    pub fn recurring(mut self, recurrence: &str, stop_date: &str) -> Self {
        self.recurrence = recurrence.to_string();
        self.stop_date = stop_date.to_string();
        self
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }
}

/// Simulation window (region of interest); evaluations are produced strictly before `end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Interval {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }
}

/// A complete model snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Model {
    #[serde(default)]
    pub settings: Vec<Setting>,
    #[serde(default)]
    pub triggers: Vec<Trigger>,
    #[serde(default)]
    pub assets: Vec<Asset>,
    #[serde(default)]
    pub incomes: Vec<Income>,
    #[serde(default)]
    pub expenses: Vec<Expense>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_setting(mut self, setting: Setting) -> Self {
        self.settings.push(setting);
        self
    }

    pub fn with_trigger(mut self, trigger: Trigger) -> Self {
        self.triggers.push(trigger);
        self
    }

    pub fn with_asset(mut self, asset: Asset) -> Self {
        self.assets.push(asset);
        self
    }

    pub fn with_income(mut self, income: Income) -> Self {
        self.incomes.push(income);
        self
    }

    pub fn with_expense(mut self, expense: Expense) -> Self {
        self.expenses.push(expense);
        self
    }

    pub fn with_transaction(mut self, transaction: Transaction) -> Self {
        self.transactions.push(transaction);
        self
    }

    pub fn setting(&self, name: &str) -> Option<&Setting> {
        self.settings.iter().find(|s| s.name == name)
    }

    /// Names that appear more than once across all item collections
    pub fn duplicate_names(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut duplicates = Vec::new();
        let names = self
            .settings
            .iter()
            .map(|s| &s.name)
            .chain(self.triggers.iter().map(|t| &t.name))
            .chain(self.assets.iter().map(|a| &a.name))
            .chain(self.incomes.iter().map(|i| &i.name))
            .chain(self.expenses.iter().map(|e| &e.name))
            .chain(self.transactions.iter().map(|t| &t.name));
        for name in names {
            if !seen.insert(name.as_str()) && !duplicates.contains(name) {
                duplicates.push(name.clone());
            }
        }
        duplicates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_json_field_names() {
        let json = r#"{
            "NAME": "ISA",
            "START": "2018-01-01",
            "VALUE": "1000",
            "GROWTH": "isaGrowth",
            "CPI_IMMUNE": true,
            "CATEGORY": "investments"
        }"#;
        let asset: Asset = serde_json::from_str(json).unwrap();

        assert_eq!(asset.name, "ISA");
        assert_eq!(asset.growth, "isaGrowth");
        assert!(asset.cpi_immune);
        assert!(!asset.can_be_negative);
        assert!(!asset.is_a_debt);
        assert_eq!(asset.quantity, None);
    }

    #[test]
    fn test_transaction_defaults() {
        let json = r#"{ "NAME": "move", "DATE": "2018-01-01" }"#;
        let txn: Transaction = serde_json::from_str(json).unwrap();

        assert_eq!(txn.kind, TransactionKind::Custom);
        assert!(txn.from_absolute);
        assert!(txn.to_absolute);
        assert!(txn.from.is_empty());
    }

    #[test]
    fn test_transaction_kind_names() {
        let json = r#"{ "NAME": "r", "DATE": "2018-01-01", "TYPE": "revalueSetting" }"#;
        let txn: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(txn.kind, TransactionKind::RevalueSetting);
        assert!(txn.kind.is_revaluation());
    }

    #[test]
    fn test_duplicate_names() {
        let model = Model::new()
            .with_setting(Setting::new("cpi", "2"))
            .with_asset(Asset::new("Cash", "2018-01-01", "0"))
            .with_expense(Expense::new("Cash", "1", "2018-01-01", "", ""));

        assert_eq!(model.duplicate_names(), vec!["Cash".to_string()]);
    }

    #[test]
    fn test_interval_is_half_open() {
        let start = NaiveDate::from_ymd_opt(2018, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2018, 2, 1).unwrap();
        let interval = Interval::new(start, end);

        assert!(interval.contains(start));
        assert!(!interval.contains(end));
    }
}
