use chrono::{Datelike, NaiveDate};

/// UK Tax Year (runs 6 April to 5 April)
/// The year value represents the end year (e.g., 2025 = 2024/25 tax year)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaxYear(pub i32);

impl TaxYear {
    /// Create a tax year from a date
    pub fn from_date(date: NaiveDate) -> Self {
        let year = date.year();
        // On or after 6 April belongs to the tax year ending next April
        if (date.month(), date.day()) >= (4, 6) {
            TaxYear(year + 1)
        } else {
            TaxYear(year)
        }
    }

    /// End date of the tax year (5 April), when liabilities for the year settle
    pub fn end_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.0, 4, 5)
    }
}

/// Displayed as "2024/25"
impl std::fmt::Display for TaxYear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{:02}", self.0 - 1, self.0 % 100)
    }
}
