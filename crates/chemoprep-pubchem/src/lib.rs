//! chemoprep-pubchem — PubChem PUG REST client and the drug → compound resolver.

pub mod client;
pub mod resolver;

pub use client::{CompoundSource, PubChemClient};
pub use resolver::{resolve_drugs, ResolutionOutcome};
