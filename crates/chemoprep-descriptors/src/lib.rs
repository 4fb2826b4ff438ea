//! chemoprep-descriptors — batch descriptor computation and table cleaning.
//!
//! The external tool (PaDEL-compatible) turns a SMILES list into a wide
//! numeric table whose rows come back in arbitrary order, named with a
//! generated positional token. This crate invokes the tool, recovers the
//! input order from those tokens, and cleans/scales the result.

pub mod esd;
pub mod normalize;
pub mod padel;
pub mod table;

pub use padel::{DescriptorBackend, PadelRunner};
pub use table::{DescriptorTable, RawDescriptorTable};
