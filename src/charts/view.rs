//! View settings for the aggregation pipeline

use serde::{Deserialize, Serialize};

use crate::model::Model;
use crate::resolve::Frequency;
use crate::tax::TaxKind;

/// Model setting names holding view preferences
pub const VIEW_FREQUENCY: &str = "View frequency";
pub const VIEW_DETAIL: &str = "View detail";
pub const FOCUS_INCOMES: &str = "Focus incomes";
pub const FOCUS_EXPENSES: &str = "Focus expenses";
pub const FOCUS_ASSETS: &str = "Focus assets";
pub const FOCUS_DEBTS: &str = "Focus debts";
pub const ASSET_VIEW: &str = "Asset view";
pub const DEBT_VIEW: &str = "Debt view";
pub const TAX_PERSON: &str = "Tax person";
pub const TAX_TYPE: &str = "Tax type";
pub const SHOW_NET: &str = "Show net";

/// How finely series are split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DetailLevel {
    /// One series per item (or per cause in delta views)
    #[default]
    Fine,
    /// One series per category
    Coarse,
    /// A single `Total` series
    Total,
}

impl DetailLevel {
    pub fn from_str(s: &str) -> Option<DetailLevel> {
        match s.trim().to_lowercase().as_str() {
            "fine" | "detailed" | "detailed view" => Some(DetailLevel::Fine),
            "coarse" | "categorised" | "categorised view" => Some(DetailLevel::Coarse),
            "total" | "totalled" | "total view" => Some(DetailLevel::Total),
            _ => None,
        }
    }
}

/// What an asset or debt chart shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ViewMode {
    /// Level at the end of each bucket
    #[default]
    Value,
    /// Increases within each bucket, by cause
    Additions,
    /// Decreases within each bucket, by cause
    Reductions,
    /// Net change within each bucket, by cause
    Delta,
}

impl ViewMode {
    pub fn from_str(s: &str) -> Option<ViewMode> {
        match s.trim().to_lowercase().as_str() {
            "val" | "value" | "values" => Some(ViewMode::Value),
            "add" | "additions" => Some(ViewMode::Additions),
            "reduce" | "reductions" => Some(ViewMode::Reductions),
            "delta" | "deltas" => Some(ViewMode::Delta),
            _ => None,
        }
    }

    /// Whether a change of `delta` is shown in this mode
    pub fn admits(&self, delta: f64) -> bool {
        match self {
            ViewMode::Value | ViewMode::Delta => true,
            ViewMode::Additions => delta > 0.0,
            ViewMode::Reductions => delta < 0.0,
        }
    }
}

/// Focus filter: everything, or one item or category
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Focus {
    #[default]
    All,
    Named(String),
}

impl Focus {
    pub fn from_str(s: &str) -> Focus {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            Focus::All
        } else {
            Focus::Named(s.to_string())
        }
    }

    /// Whether an item with this name and category passes the filter
    pub fn admits(&self, name: &str, category: &str) -> bool {
        match self {
            Focus::All => true,
            Focus::Named(focus) => focus == name || (!category.is_empty() && focus == category),
        }
    }
}

/// Chart options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewSettings {
    pub frequency: Frequency,
    pub detail: DetailLevel,
    pub focus_incomes: Focus,
    pub focus_expenses: Focus,
    pub focus_assets: Focus,
    pub focus_debts: Focus,
    pub asset_view: ViewMode,
    pub debt_view: ViewMode,
    /// `None` shows every person
    pub tax_person: Option<String>,
    /// `None` shows both kinds
    pub tax_kind: Option<TaxKind>,
    /// Include net-of-tax series in the tax chart
    pub show_net: bool,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            frequency: Frequency::Monthly,
            detail: DetailLevel::Fine,
            focus_incomes: Focus::All,
            focus_expenses: Focus::All,
            focus_assets: Focus::All,
            focus_debts: Focus::All,
            asset_view: ViewMode::Value,
            debt_view: ViewMode::Value,
            tax_person: None,
            tax_kind: None,
            show_net: false,
        }
    }
}

impl ViewSettings {
    /// Read view settings stored in the model, defaulting anything missing or unrecognised
    pub fn from_model(model: &Model) -> Self {
        let text = |name: &str| model.setting(name).map(|s| s.value.as_str());
        let mut view = ViewSettings::default();

        if let Some(frequency) = text(VIEW_FREQUENCY).and_then(Frequency::from_str) {
            view.frequency = frequency;
        }
        if let Some(detail) = text(VIEW_DETAIL).and_then(DetailLevel::from_str) {
            view.detail = detail;
        }
        if let Some(mode) = text(ASSET_VIEW).and_then(ViewMode::from_str) {
            view.asset_view = mode;
        }
        if let Some(mode) = text(DEBT_VIEW).and_then(ViewMode::from_str) {
            view.debt_view = mode;
        }
        view.focus_incomes = text(FOCUS_INCOMES).map(Focus::from_str).unwrap_or_default();
        view.focus_expenses = text(FOCUS_EXPENSES).map(Focus::from_str).unwrap_or_default();
        view.focus_assets = text(FOCUS_ASSETS).map(Focus::from_str).unwrap_or_default();
        view.focus_debts = text(FOCUS_DEBTS).map(Focus::from_str).unwrap_or_default();

        view.tax_person = text(TAX_PERSON)
            .map(str::trim)
            .filter(|p| !p.is_empty() && !p.eq_ignore_ascii_case("all"))
            .map(str::to_string);
        view.tax_kind = text(TAX_TYPE).and_then(TaxKind::from_str);
        view.show_net = text(SHOW_NET)
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "y" | "yes" | "true"))
            .unwrap_or(false);

        view
    }
}
