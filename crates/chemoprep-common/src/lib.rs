//! chemoprep-common — Shared types, errors, and configuration used across all chemoprep crates.

pub mod config;
pub mod error;
pub mod records;
pub mod sandbox;

// Re-export commonly used types
pub use config::PrepConfig;
pub use error::{ChemoprepError, Result};
pub use records::{DrugRecord, ResolutionFailure, ResolvedCompound};
