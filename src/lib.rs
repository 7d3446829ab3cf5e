//! Finance Projection - discrete-event projection engine for personal finance models
//!
//! This library provides:
//! - A declarative model of assets, debts, incomes, expenses, transactions, settings and triggers
//! - Resolution of trigger dates and setting-based value expressions
//! - A projection engine producing a strictly ordered sequence of evaluations
//! - Today's-value snapshots at a focus date
//! - Aggregation of evaluations into bucketed chart series
//! - A pluggable tax collaborator and a batch scenario runner

pub mod charts;
pub mod model;
pub mod projection;
pub mod resolve;
pub mod scenario;
pub mod tax;

// Re-export commonly used types
pub use charts::{aggregate, ChartBundle, ChartSeries, ViewSettings};
pub use model::{load_model, Interval, Model};
pub use projection::{
    Evaluation, EvaluationSource, ProjectionConfig, ProjectionEngine, ProjectionResult, TodaysValues,
};
pub use scenario::ScenarioRunner;
pub use tax::{FlatRateTax, NoTax, TaxPolicy};
