//! Chart buckets: half-open date ranges stepping from the window start

use chrono::NaiveDate;

use crate::model::Interval;
use crate::resolve::Frequency;

/// Position of a date relative to the buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Before,
    In(usize),
    After,
}

/// Bucket `i` covers `[starts[i], starts[i + 1])`; the last bucket ends one step on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Buckets {
    starts: Vec<NaiveDate>,
    end: NaiveDate,
}

impl Buckets {
    pub fn new(interval: Interval, frequency: Frequency) -> Self {
        let span = frequency.span();
        let mut starts = Vec::new();
        let mut k = 0;
        let mut end = interval.end;
        while let Some(date) = span.add_to(interval.start, k) {
            if date >= interval.end {
                end = date;
                break;
            }
            starts.push(date);
            k += 1;
        }
        Self { starts, end }
    }

    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    /// ISO date labels of the bucket starts
    pub fn labels(&self) -> Vec<String> {
        self.starts.iter().map(|d| d.format("%Y-%m-%d").to_string()).collect()
    }

    pub fn slot(&self, date: NaiveDate) -> Slot {
        match self.starts.first() {
            None => Slot::After,
            Some(first) if date < *first => Slot::Before,
            Some(_) if date >= self.end => Slot::After,
            Some(_) => Slot::In(self.starts.partition_point(|start| *start <= date) - 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_monthly_buckets() {
        let buckets = Buckets::new(
            Interval::new(date(2017, 12, 1), date(2018, 4, 1)),
            Frequency::Monthly,
        );

        assert_eq!(buckets.labels(), vec!["2017-12-01", "2018-01-01", "2018-02-01", "2018-03-01"]);
        assert_eq!(buckets.slot(date(2017, 11, 30)), Slot::Before);
        assert_eq!(buckets.slot(date(2017, 12, 1)), Slot::In(0));
        assert_eq!(buckets.slot(date(2018, 1, 31)), Slot::In(1));
        assert_eq!(buckets.slot(date(2018, 3, 31)), Slot::In(3));
        assert_eq!(buckets.slot(date(2018, 4, 1)), Slot::After);
    }

    #[test]
    fn test_partial_last_bucket_runs_a_full_step() {
        let buckets = Buckets::new(
            Interval::new(date(2018, 1, 1), date(2019, 6, 1)),
            Frequency::Annually,
        );

        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets.slot(date(2019, 12, 31)), Slot::In(1));
        assert_eq!(buckets.slot(date(2020, 1, 1)), Slot::After);
    }

    #[test]
    fn test_empty_window() {
        let buckets = Buckets::new(
            Interval::new(date(2018, 1, 1), date(2018, 1, 1)),
            Frequency::Monthly,
        );
        assert!(buckets.is_empty());
        assert_eq!(buckets.slot(date(2018, 1, 1)), Slot::After);
    }
}
