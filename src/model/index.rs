//! Name lookup over a model snapshot, built once per run

use std::collections::HashMap;

use super::data::{Asset, Expense, Income, Model, Setting, COMPOSITE_SEPARATOR};

/// Kind of item a name refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Asset,
    Debt,
    Income,
    Expense,
    Setting,
    Transaction,
}

/// Index from item names (and asset categories) to positions in the model
#[derive(Debug)]
pub struct NameIndex<'a> {
    model: &'a Model,
    kinds: HashMap<&'a str, (ItemKind, usize)>,
    asset_categories: HashMap<&'a str, Vec<usize>>,
}

impl<'a> NameIndex<'a> {
    pub fn build(model: &'a Model) -> Self {
        let mut kinds = HashMap::new();
        let mut asset_categories: HashMap<&str, Vec<usize>> = HashMap::new();

        for (i, asset) in model.assets.iter().enumerate() {
            let kind = if asset.is_a_debt { ItemKind::Debt } else { ItemKind::Asset };
            kinds.entry(asset.name.as_str()).or_insert((kind, i));
            if !asset.category.is_empty() {
                asset_categories.entry(asset.category.as_str()).or_default().push(i);
            }
        }
        for (i, income) in model.incomes.iter().enumerate() {
            kinds.entry(income.name.as_str()).or_insert((ItemKind::Income, i));
        }
        for (i, expense) in model.expenses.iter().enumerate() {
            kinds.entry(expense.name.as_str()).or_insert((ItemKind::Expense, i));
        }
        for (i, setting) in model.settings.iter().enumerate() {
            kinds.entry(setting.name.as_str()).or_insert((ItemKind::Setting, i));
        }
        for (i, txn) in model.transactions.iter().enumerate() {
            kinds.entry(txn.name.as_str()).or_insert((ItemKind::Transaction, i));
        }

        Self {
            model,
            kinds,
            asset_categories,
        }
    }

    pub fn model(&self) -> &'a Model {
        self.model
    }

    pub fn kind(&self, name: &str) -> Option<ItemKind> {
        self.kinds.get(name).map(|(kind, _)| *kind)
    }

    /// Asset or debt by name
    pub fn asset(&self, name: &str) -> Option<(usize, &'a Asset)> {
        match self.kinds.get(name) {
            Some((ItemKind::Asset | ItemKind::Debt, i)) => Some((*i, &self.model.assets[*i])),
            _ => None,
        }
    }

    pub fn income(&self, name: &str) -> Option<(usize, &'a Income)> {
        match self.kinds.get(name) {
            Some((ItemKind::Income, i)) => Some((*i, &self.model.incomes[*i])),
            _ => None,
        }
    }

    pub fn expense(&self, name: &str) -> Option<(usize, &'a Expense)> {
        match self.kinds.get(name) {
            Some((ItemKind::Expense, i)) => Some((*i, &self.model.expenses[*i])),
            _ => None,
        }
    }

    pub fn setting(&self, name: &str) -> Option<&'a Setting> {
        match self.kinds.get(name) {
            Some((ItemKind::Setting, i)) => Some(&self.model.settings[*i]),
            _ => None,
        }
    }

    /// Indices of assets carrying `category`, in model order
    pub fn assets_in_category(&self, category: &str) -> &[usize] {
        self.asset_categories
            .get(category)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Category of an item; empty when the item has none or is unknown
    pub fn category_of(&self, name: &str) -> &'a str {
        match self.kinds.get(name) {
            Some((ItemKind::Asset | ItemKind::Debt, i)) => &self.model.assets[*i].category,
            Some((ItemKind::Income, i)) => &self.model.incomes[*i].category,
            Some((ItemKind::Expense, i)) => &self.model.expenses[*i].category,
            Some((ItemKind::Transaction, i)) => &self.model.transactions[*i].category,
            _ => "",
        }
    }

    /// Chart grouping for a key: composite keys use the second component's category,
    /// plain keys their own; uncategorised keys keep their name.
    pub fn categorise(&self, key: &str) -> String {
        let item = match key.split_once(COMPOSITE_SEPARATOR) {
            Some((_, item)) => item,
            None => key,
        };
        let category = self.category_of(item);
        if category.is_empty() {
            key.to_string()
        } else {
            category.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Asset, Income, Transaction};

    fn model() -> Model {
        Model::new()
            .with_asset(Asset::new("Cash", "2018-01-01", "0"))
            .with_asset(Asset::new("ISA", "2018-01-01", "100").with_category("investments"))
            .with_asset(Asset::new("GIA", "2018-01-01", "100").with_category("investments"))
            .with_asset(Asset::debt("Mortgage", "2018-01-01", "-1000"))
            .with_income(Income::new("Salary", "100", "2018-01-01", "", "1m").with_category("work"))
            .with_transaction(Transaction::transfer("save", "Cash", "ISA", "10", "2018-01-01"))
    }

    #[test]
    fn test_kinds() {
        let model = model();
        let index = NameIndex::build(&model);

        assert_eq!(index.kind("ISA"), Some(ItemKind::Asset));
        assert_eq!(index.kind("Mortgage"), Some(ItemKind::Debt));
        assert_eq!(index.kind("Salary"), Some(ItemKind::Income));
        assert_eq!(index.kind("save"), Some(ItemKind::Transaction));
        assert_eq!(index.kind("nothing"), None);
        assert!(index.asset("Mortgage").is_some());
        assert!(index.income("ISA").is_none());
    }

    #[test]
    fn test_categories_in_model_order() {
        let model = model();
        let index = NameIndex::build(&model);

        assert_eq!(index.assets_in_category("investments"), &[1, 2]);
        assert!(index.assets_in_category("missing").is_empty());
        assert_eq!(index.category_of("Salary"), "work");
    }

    #[test]
    fn test_categorise_composite_keys() {
        let model = model();
        let index = NameIndex::build(&model);

        let growth_key = format!("growth{}ISA", COMPOSITE_SEPARATOR);
        assert_eq!(index.categorise(&growth_key), "investments");
        assert_eq!(index.categorise("Salary"), "work");
        // Uncategorised items keep their own key
        assert_eq!(index.categorise("save"), "save");
        let cash_key = format!("revalue{}Cash", COMPOSITE_SEPARATOR);
        assert_eq!(index.categorise(&cash_key), cash_key);
    }
}
