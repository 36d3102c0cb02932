pub mod client;
pub mod config;
pub mod error;
pub mod generate;
pub mod graph;
pub mod ini;
pub mod model;
pub mod output;
pub mod preview;
pub mod session;
pub mod validate;
pub mod weights;
pub mod wire;

// Re-export key types for convenience
pub use error::{PseudoGenError, Result};
pub use model::{Mode, RuleFile};
