//! Final feature table assembly.

use chemoprep_common::{ChemoprepError, Result};
use chemoprep_descriptors::DescriptorTable;
use chemoprep_pixels::PixelRow;
use tracing::info;

/// One drug's complete feature vector.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub drug_id: String,
    pub cid: u32,
    pub descriptors: Vec<f64>,
    pub pixels: Vec<u8>,
}

/// The assembled feature table: identifier columns first, then scaled
/// descriptors, then pixel values.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    pub descriptor_columns: Vec<String>,
    pub pixel_len: usize,
    pub rows: Vec<FeatureRow>,
}

/// Concatenate descriptor and pixel features, aligned by row position.
///
/// Both inputs are produced in resolved-compound order; a length mismatch
/// means the stages disagree about which compounds survived, and merging
/// anyway would silently attach one drug's descriptors to another drug's
/// image. That is surfaced as a fatal alignment error instead.
pub fn assemble(descriptors: &DescriptorTable, pixels: &[PixelRow]) -> Result<FeatureTable> {
    if descriptors.rows.len() != pixels.len() {
        return Err(ChemoprepError::Alignment {
            stage: "feature assembly",
            expected: descriptors.rows.len(),
            actual: pixels.len(),
        });
    }

    let pixel_len = pixels.first().map(|p| p.pixels.len()).unwrap_or(0);
    for p in pixels {
        if p.pixels.len() != pixel_len {
            return Err(ChemoprepError::Alignment {
                stage: "feature assembly",
                expected: pixel_len,
                actual: p.pixels.len(),
            });
        }
    }

    let rows = descriptors
        .rows
        .iter()
        .zip(pixels)
        .map(|(desc, pix)| FeatureRow {
            drug_id: pix.drug_id.clone(),
            cid: pix.cid,
            descriptors: desc.clone(),
            pixels: pix.pixels.clone(),
        })
        .collect::<Vec<_>>();

    info!(
        rows = rows.len(),
        descriptor_columns = descriptors.columns.len(),
        pixel_columns = pixel_len,
        "Feature table assembled"
    );

    Ok(FeatureTable {
        descriptor_columns: descriptors.columns.clone(),
        pixel_len,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixel_row(drug_id: &str, cid: u32, len: usize) -> PixelRow {
        PixelRow {
            drug_id: drug_id.to_string(),
            cid,
            pixels: vec![0u8; len],
        }
    }

    #[test]
    fn test_assemble_keys_rows_by_drug_id() {
        let descriptors = DescriptorTable {
            columns: vec!["a".to_string(), "b".to_string()],
            rows: vec![vec![0.0, 1.0], vec![1.0, 0.5]],
        };
        let pixels = vec![pixel_row("D1", 10, 4), pixel_row("D2", 20, 4)];

        let table = assemble(&descriptors, &pixels).unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].drug_id, "D1");
        assert_eq!(table.rows[1].cid, 20);
        assert_eq!(table.rows[1].descriptors, vec![1.0, 0.5]);
        assert_eq!(table.pixel_len, 4);
    }

    #[test]
    fn test_row_count_mismatch_is_rejected() {
        let descriptors = DescriptorTable {
            columns: vec!["a".to_string()],
            rows: vec![vec![0.0], vec![1.0]],
        };
        let pixels = vec![pixel_row("D1", 10, 4)];

        let err = assemble(&descriptors, &pixels).unwrap_err();
        assert!(matches!(
            err,
            ChemoprepError::Alignment {
                stage: "feature assembly",
                expected: 2,
                actual: 1,
            }
        ));
    }

    #[test]
    fn test_ragged_pixel_rows_are_rejected() {
        let descriptors = DescriptorTable {
            columns: vec!["a".to_string()],
            rows: vec![vec![0.0], vec![1.0]],
        };
        let pixels = vec![pixel_row("D1", 10, 4), pixel_row("D2", 20, 3)];
        assert!(assemble(&descriptors, &pixels).is_err());
    }
}
