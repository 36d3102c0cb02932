//! # Offline Sample Engine
//!
//! Evaluates a rule file locally into a table of values, without the
//! generator service. Used by `pseudogen sample` to try a rule file before
//! uploading it, and by tests as an executable description of what each data
//! source means.

pub mod engine;
pub mod providers;
pub mod value;

pub use engine::{execute, GeneratedColumn, GeneratedTable};
pub use value::Value;
