//! Projection engine: evaluation sequencing, transactions and today's values

mod engine;
mod evaluations;
mod schedule;
mod snapshot;
mod state;
mod transactions;

pub use engine::{ProjectionConfig, ProjectionEngine};
pub use evaluations::{Diagnostic, Evaluation, EvaluationSource, ProjectionResult, ProjectionSummary};
pub use snapshot::{TodaysValue, TodaysValues};
pub use state::{AssetState, FlowState, ProjectionState};
pub use transactions::{apply_revaluation, apply_transfer, TransactionSkip};
