//! Input table loading.

use chemoprep_common::config::InputConfig;
use chemoprep_common::{ChemoprepError, DrugRecord, Result};

/// Read the raw drug table. A missing required column is fatal: unlike a
/// per-record lookup failure, a malformed input table is a configuration
/// problem and nothing downstream can recover from it.
pub fn read_drug_table(cfg: &InputConfig) -> Result<Vec<DrugRecord>> {
    let mut reader = csv::Reader::from_path(&cfg.path)?;
    let headers = reader.headers()?.clone();

    let column = |name: &str| {
        headers.iter().position(|h| h == name).ok_or_else(|| {
            ChemoprepError::Config(format!(
                "input table {} is missing column {name:?}",
                cfg.path
            ))
        })
    };
    let id_col = column(&cfg.drug_id_column)?;
    let ref_col = column(&cfg.pubchem_column)?;
    let name_col = column(&cfg.name_column)?;

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record?;
        records.push(DrugRecord {
            drug_id: record.get(id_col).unwrap_or("").trim().to_string(),
            pubchem: record.get(ref_col).unwrap_or("").trim().to_string(),
            drug_name: record.get(name_col).unwrap_or("").trim().to_string(),
        });
    }
    Ok(records)
}
