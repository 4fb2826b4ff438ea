//! Core record types flowing through the preparation pipeline.

use serde::{Deserialize, Serialize};

/// A raw drug row from the input table. Immutable source record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrugRecord {
    pub drug_id: String,
    /// Raw PubChem reference as shipped in the input table. May hold a
    /// comma-separated list of CIDs, or a placeholder like "several" or "-".
    pub pubchem: String,
    pub drug_name: String,
}

/// A drug whose structure resolved successfully.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedCompound {
    pub drug_id: String,
    pub cid: u32,
    /// Isomeric SMILES. Never empty.
    pub smiles: String,
}

/// Why a record was excluded during resolution.
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionFailure {
    pub drug_id: String,
    pub reason: String,
}
