//! Stage checkpoint artifacts.
//!
//! Every stage writes its result to disk before the next stage starts:
//! a line-oriented SMILES list, the drug↔CID mapping, the raw and cleaned
//! descriptor tables, the pixel table, and the final combined feature
//! table. All flat CSV/text, nothing binary.

use std::fs;
use std::path::Path;

use chemoprep_common::{ChemoprepError, ResolvedCompound, Result};
use chemoprep_descriptors::{DescriptorTable, RawDescriptorTable};
use chemoprep_pixels::PixelRow;

use crate::assemble::FeatureTable;

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// One SMILES per line, in resolution order. This is the ordering
/// contract the descriptor stage consumes.
pub fn write_smiles_list(path: &Path, compounds: &[ResolvedCompound]) -> Result<()> {
    ensure_parent(path)?;
    let mut content = String::new();
    for compound in compounds {
        content.push_str(&compound.smiles);
        content.push('\n');
    }
    fs::write(path, content)?;
    Ok(())
}

/// drug_id ↔ CID mapping, same order as the SMILES list.
pub fn write_mapping(path: &Path, compounds: &[ResolvedCompound]) -> Result<()> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["drug_id", "cid"])?;
    for compound in compounds {
        writer.write_record([compound.drug_id.as_str(), &compound.cid.to_string()])?;
    }
    writer.flush()?;
    Ok(())
}

/// The descriptor tool's output as parsed, cells untouched.
pub fn write_raw_descriptors(path: &Path, table: &RawDescriptorTable) -> Result<()> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    let mut header = vec!["Name".to_string()];
    header.extend(table.columns.iter().cloned());
    writer.write_record(&header)?;
    for (name, cells) in table.names.iter().zip(&table.cells) {
        let mut record = vec![name.clone()];
        record.extend(cells.iter().cloned());
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Cleaned/scaled descriptor table with drug ids re-attached.
pub fn write_clean_descriptors(
    path: &Path,
    table: &DescriptorTable,
    compounds: &[ResolvedCompound],
) -> Result<()> {
    if table.rows.len() != compounds.len() {
        return Err(ChemoprepError::Alignment {
            stage: "clean descriptor checkpoint",
            expected: compounds.len(),
            actual: table.rows.len(),
        });
    }
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    let mut header = vec!["drug_id".to_string()];
    header.extend(table.columns.iter().cloned());
    writer.write_record(&header)?;
    for (compound, row) in compounds.iter().zip(&table.rows) {
        let mut record = vec![compound.drug_id.clone()];
        record.extend(row.iter().map(|v| v.to_string()));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Pixel feature table: drug_id, cid, then one column per pixel.
pub fn write_pixel_table(path: &Path, rows: &[PixelRow]) -> Result<()> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    let pixel_len = rows.first().map(|r| r.pixels.len()).unwrap_or(0);
    let mut header = vec!["drug_id".to_string(), "cid".to_string()];
    header.extend((0..pixel_len).map(|i| format!("pixel_{i}")));
    writer.write_record(&header)?;
    for row in rows {
        let mut record = vec![row.drug_id.clone(), row.cid.to_string()];
        record.extend(row.pixels.iter().map(|p| p.to_string()));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// The final combined feature table.
pub fn write_feature_table(path: &Path, table: &FeatureTable) -> Result<()> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    let mut header = vec!["drug_id".to_string(), "cid".to_string()];
    header.extend(table.descriptor_columns.iter().cloned());
    header.extend((0..table.pixel_len).map(|i| format!("pixel_{i}")));
    writer.write_record(&header)?;
    for row in &table.rows {
        let mut record = vec![row.drug_id.clone(), row.cid.to_string()];
        record.extend(row.descriptors.iter().map(|v| v.to_string()));
        record.extend(row.pixels.iter().map(|p| p.to_string()));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}
