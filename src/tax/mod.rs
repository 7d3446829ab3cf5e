//! Tax liability hand-off
//!
//! Income occurrences and asset gains tagged with `<Person>(incomeTax)` or `<Person>(CGT)`
//! are forwarded to a [`TaxPolicy`]. The policy decides how much is due and when it
//! settles; banding, allowances and rate tables belong to the policy, not the engine.

mod uk;

pub use uk::TaxYear;

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Kind of tax a liability tag refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaxKind {
    IncomeTax,
    Cgt,
}

impl TaxKind {
    pub fn from_str(s: &str) -> Option<TaxKind> {
        match s.trim().to_lowercase().as_str() {
            "incometax" | "income tax" | "income" => Some(TaxKind::IncomeTax),
            "cgt" => Some(TaxKind::Cgt),
            _ => None,
        }
    }

    /// Label used in tax evaluation names (`Joe income tax`)
    pub fn label(&self) -> &'static str {
        match self {
            TaxKind::IncomeTax => "income tax",
            TaxKind::Cgt => "CGT",
        }
    }

    /// Label used in net evaluation names (`Joe income (net)`)
    pub fn net_label(&self) -> &'static str {
        match self {
            TaxKind::IncomeTax => "income (net)",
            TaxKind::Cgt => "gain (net)",
        }
    }
}

impl fmt::Display for TaxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One `<Person>(kind)` entry from a LIABILITY field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiabilityTag {
    pub person: String,
    pub kind: TaxKind,
}

/// Parse a LIABILITY field such as `Joe(incomeTax)|Jane(CGT)`; malformed entries are skipped
pub fn parse_liabilities(field: &str) -> Vec<LiabilityTag> {
    field
        .split(['|', ','])
        .filter_map(|part| {
            let part = part.trim();
            let open = part.find('(')?;
            let inner = part[open + 1..].strip_suffix(')')?;
            let person = part[..open].trim();
            if person.is_empty() {
                return None;
            }
            Some(LiabilityTag {
                person: person.to_string(),
                kind: TaxKind::from_str(inner)?,
            })
        })
        .collect()
}

/// Outcome of forwarding one gross amount to a tax policy
#[derive(Debug, Clone, PartialEq)]
pub struct TaxAssessment {
    pub tax_due: f64,
    pub net: f64,
    pub settlement_date: NaiveDate,
}

/// External tax collaborator
pub trait TaxPolicy: fmt::Debug + Send + Sync {
    /// Assess tax on `gross` arising on `date`; `None` when nothing is to be recorded
    fn assess(&self, person: &str, kind: TaxKind, gross: f64, date: NaiveDate)
        -> Option<TaxAssessment>;
}

/// Records no tax at all
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTax;

impl TaxPolicy for NoTax {
    fn assess(&self, _: &str, _: TaxKind, _: f64, _: NaiveDate) -> Option<TaxAssessment> {
        None
    }
}

/// Flat rates per kind, settled on the last day of the UK tax year
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatRateTax {
    pub income_rate: f64,
    pub cgt_rate: f64,
}

impl FlatRateTax {
    pub fn new(income_rate: f64, cgt_rate: f64) -> Self {
        Self {
            income_rate,
            cgt_rate,
        }
    }
}

impl TaxPolicy for FlatRateTax {
    fn assess(&self, _person: &str, kind: TaxKind, gross: f64, date: NaiveDate) -> Option<TaxAssessment> {
        if gross <= 0.0 {
            return None;
        }
        let rate = match kind {
            TaxKind::IncomeTax => self.income_rate,
            TaxKind::Cgt => self.cgt_rate,
        };
        let tax_due = gross * rate;
        Some(TaxAssessment {
            tax_due,
            net: gross - tax_due,
            settlement_date: TaxYear::from_date(date).end_date()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_liabilities() {
        let tags = parse_liabilities("Joe(incomeTax)|Jane(CGT), Bob(income)");
        assert_eq!(
            tags,
            vec![
                LiabilityTag { person: "Joe".into(), kind: TaxKind::IncomeTax },
                LiabilityTag { person: "Jane".into(), kind: TaxKind::Cgt },
                LiabilityTag { person: "Bob".into(), kind: TaxKind::IncomeTax },
            ]
        );
    }

    #[test]
    fn test_malformed_tags_skipped() {
        assert!(parse_liabilities("").is_empty());
        assert!(parse_liabilities("Joe").is_empty());
        assert!(parse_liabilities("(CGT)").is_empty());
        assert!(parse_liabilities("Joe(VAT)").is_empty());
    }

    #[test]
    fn test_flat_rate_settles_at_tax_year_end() {
        let policy = FlatRateTax::new(0.2, 0.1);
        let date = NaiveDate::from_ymd_opt(2018, 5, 1).unwrap();

        let assessment = policy.assess("Joe", TaxKind::IncomeTax, 1000.0, date).unwrap();
        assert!((assessment.tax_due - 200.0).abs() < 1e-9);
        assert!((assessment.net - 800.0).abs() < 1e-9);
        assert_eq!(assessment.settlement_date, NaiveDate::from_ymd_opt(2019, 4, 5).unwrap());

        assert!(policy.assess("Joe", TaxKind::Cgt, -5.0, date).is_none());
        assert!(NoTax.assess("Joe", TaxKind::Cgt, 100.0, date).is_none());
    }
}
