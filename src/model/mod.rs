//! Model data structures and snapshot loading

mod data;
mod index;
pub mod loader;

pub use data::{
    Asset, Expense, Income, Interval, Model, Setting, SettingType, Transaction, TransactionKind,
    Trigger, COMPOSITE_SEPARATOR, LIST_SEPARATOR,
};
pub use index::{ItemKind, NameIndex};
pub use loader::{load_model, load_model_from_reader, ModelError};
