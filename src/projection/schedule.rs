//! Moment queue for the discrete-event loop

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use chrono::NaiveDate;

use crate::tax::TaxKind;

/// Same-date processing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Start,
    Revaluation,
    Inflation,
    Growth,
    Income,
    Expense,
    Transfer,
    TaxSettlement,
}

/// An income or expense, by position in the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowRef {
    Income(usize),
    Expense(usize),
}

/// Work to do at a moment
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    AssetStart(usize),
    FlowStart(FlowRef),
    Revaluation(usize),
    Inflation(FlowRef),
    Growth(usize),
    Occurrence(FlowRef),
    Transfer(usize),
    TaxSettlement {
        person: String,
        kind: TaxKind,
    },
}

impl Action {
    pub fn phase(&self) -> Phase {
        match self {
            Action::AssetStart(_) | Action::FlowStart(_) => Phase::Start,
            Action::Revaluation(_) => Phase::Revaluation,
            Action::Inflation(_) => Phase::Inflation,
            Action::Growth(_) => Phase::Growth,
            Action::Occurrence(FlowRef::Income(_)) => Phase::Income,
            Action::Occurrence(FlowRef::Expense(_)) => Phase::Expense,
            Action::Transfer(_) => Phase::Transfer,
            Action::TaxSettlement { .. } => Phase::TaxSettlement,
        }
    }
}

/// A scheduled action, ordered by (date, phase, scheduling sequence)
#[derive(Debug, Clone)]
pub struct Moment {
    pub date: NaiveDate,
    pub phase: Phase,
    seq: u64,
    pub action: Action,
}

impl Moment {
    fn key(&self) -> (NaiveDate, Phase, u64) {
        (self.date, self.phase, self.seq)
    }
}

impl PartialEq for Moment {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Moment {}

impl PartialOrd for Moment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Moment {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Min-queue of moments strictly before an end date
#[derive(Debug)]
pub struct Schedule {
    heap: BinaryHeap<Reverse<Moment>>,
    next_seq: u64,
    end: NaiveDate,
}

impl Schedule {
    pub fn new(end: NaiveDate) -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
            end,
        }
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Queue an action; returns false when the date is at or after the end
    pub fn push(&mut self, date: NaiveDate, action: Action) -> bool {
        if date >= self.end {
            return false;
        }
        let moment = Moment {
            date,
            phase: action.phase(),
            seq: self.next_seq,
            action,
        };
        self.next_seq += 1;
        self.heap.push(Reverse(moment));
        true
    }

    pub fn pop(&mut self) -> Option<Moment> {
        self.heap.pop().map(|Reverse(moment)| moment)
    }
}
