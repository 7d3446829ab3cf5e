//! Calendar spans (`Nd`, `Nw`, `Nm`, `Ny`) for offsets and recurrences

use std::fmt;
use std::str::FromStr;

use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpanUnit {
    Days,
    Weeks,
    Months,
    Years,
}

/// A count of calendar units
///
/// Month and year arithmetic clamps to the end of the month, so Jan 31 + 1m is Feb 28.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub count: u32,
    pub unit: SpanUnit,
}

impl Span {
    pub fn new(count: u32, unit: SpanUnit) -> Self {
        Self { count, unit }
    }

    /// `date + times * self`, computed in one step so repeated occurrences do not drift
    pub fn add_to(&self, date: NaiveDate, times: u32) -> Option<NaiveDate> {
        let n = self.count.checked_mul(times)?;
        match self.unit {
            SpanUnit::Days => date.checked_add_days(Days::new(n as u64)),
            SpanUnit::Weeks => date.checked_add_days(Days::new(n as u64 * 7)),
            SpanUnit::Months => date.checked_add_months(Months::new(n)),
            SpanUnit::Years => date.checked_add_months(Months::new(n.checked_mul(12)?)),
        }
    }

    pub fn subtract_from(&self, date: NaiveDate) -> Option<NaiveDate> {
        match self.unit {
            SpanUnit::Days => date.checked_sub_days(Days::new(self.count as u64)),
            SpanUnit::Weeks => date.checked_sub_days(Days::new(self.count as u64 * 7)),
            SpanUnit::Months => date.checked_sub_months(Months::new(self.count)),
            SpanUnit::Years => date.checked_sub_months(Months::new(self.count.checked_mul(12)?)),
        }
    }

    /// Occurrences `start, start + self, start + 2*self, ...` strictly before `until`
    pub fn occurrences(&self, start: NaiveDate, until: NaiveDate) -> Vec<NaiveDate> {
        let mut dates = Vec::new();
        if self.count == 0 {
            if start < until {
                dates.push(start);
            }
            return dates;
        }
        let mut k = 0;
        while let Some(date) = self.add_to(start, k) {
            if date >= until {
                break;
            }
            dates.push(date);
            k += 1;
        }
        dates
    }

    /// Length of the span as a fraction of a year, used for compounding
    pub fn year_fraction(&self) -> f64 {
        let count = self.count as f64;
        match self.unit {
            SpanUnit::Days => count / 365.0,
            SpanUnit::Weeks => count / 52.0,
            SpanUnit::Months => count / 12.0,
            SpanUnit::Years => count,
        }
    }
}

impl FromStr for Span {
    type Err = ();

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let text = text.trim();
        let unit_char = text.chars().last().ok_or(())?;
        let unit = match unit_char.to_ascii_lowercase() {
            'd' => SpanUnit::Days,
            'w' => SpanUnit::Weeks,
            'm' => SpanUnit::Months,
            'y' => SpanUnit::Years,
            _ => return Err(()),
        };
        let digits = text[..text.len() - unit_char.len_utf8()].trim();
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(());
        }
        let count = digits.parse().map_err(|_| ())?;
        Ok(Span { count, unit })
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = match self.unit {
            SpanUnit::Days => 'd',
            SpanUnit::Weeks => 'w',
            SpanUnit::Months => 'm',
            SpanUnit::Years => 'y',
        };
        write!(f, "{}{}", self.count, unit)
    }
}

/// Step frequency for the simulation and for chart buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Frequency {
    Weekly,
    #[default]
    Monthly,
    Annually,
}

impl Frequency {
    pub fn span(&self) -> Span {
        match self {
            Frequency::Weekly => Span::new(1, SpanUnit::Weeks),
            Frequency::Monthly => Span::new(1, SpanUnit::Months),
            Frequency::Annually => Span::new(1, SpanUnit::Years),
        }
    }

    pub fn from_str(s: &str) -> Option<Frequency> {
        match s.trim().to_lowercase().as_str() {
            "weekly" | "week" | "w" => Some(Frequency::Weekly),
            "monthly" | "month" | "m" => Some(Frequency::Monthly),
            "annually" | "annual" | "yearly" | "y" => Some(Frequency::Annually),
            _ => None,
        }
    }
}
