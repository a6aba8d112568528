//! Domain managers for bot state.
//!
//! The lifecycle manager owns the persisted document and the ownership
//! index. Its operations are split by concern across these submodules,
//! all sharing one lock and one persistence path.

mod hosting;
mod lifecycle;
mod quota;
mod settings;

pub use lifecycle::{Created, LifecycleManager, Limits};
pub use settings::LangScope;
