//! chemoprep-pipeline — end-to-end orchestration of the feature-preparation run.

pub mod artifacts;
pub mod assemble;
pub mod input;
pub mod pipeline;

pub use assemble::{assemble, FeatureRow, FeatureTable};
pub use pipeline::{run_prep, PrepSummary};
