//! End-to-end pipeline run against mock external collaborators.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use async_trait::async_trait;
use image::{DynamicImage, ImageBuffer, ImageFormat, Luma};

use chemoprep_common::config::{
    ArtifactConfig, DescriptorConfig, ImageConfig, InputConfig, PrepConfig, ResolverConfig,
};
use chemoprep_common::{ChemoprepError, Result};
use chemoprep_descriptors::{DescriptorBackend, RawDescriptorTable};
use chemoprep_pipeline::run_prep;
use chemoprep_pubchem::client::CompoundSource;

// ── Mock PubChem ──────────────────────────────────────────────────────────────

struct MockPubChem {
    smiles: HashMap<u32, String>,
    names: HashMap<String, Vec<u32>>,
    /// CID whose image fetch fails, if any.
    fail_png_for: Option<u32>,
}

impl MockPubChem {
    fn new(fail_png_for: Option<u32>) -> Self {
        let mut smiles = HashMap::new();
        smiles.insert(2244, "CC(=O)OC1=CC=CC=C1C(=O)O".to_string());
        smiles.insert(5291, "CC1=C(C=C(C=C1)NC(=O)N2CCN(CC2)C)N".to_string());
        let mut names = HashMap::new();
        names.insert("Imatinib".to_string(), vec![5291]);
        Self {
            smiles,
            names,
            fail_png_for,
        }
    }
}

#[async_trait]
impl CompoundSource for MockPubChem {
    async fn smiles_for_cid(&self, cid: u32) -> Result<String> {
        self.smiles
            .get(&cid)
            .cloned()
            .ok_or_else(|| ChemoprepError::Lookup(format!("CID {cid} lookup failed: HTTP 404")))
    }

    async fn cids_for_name(&self, name: &str) -> Result<Vec<u32>> {
        Ok(self.names.get(name).cloned().unwrap_or_default())
    }

    async fn fetch_png(&self, cid: u32) -> Result<Vec<u8>> {
        if self.fail_png_for == Some(cid) {
            return Err(ChemoprepError::Lookup(format!(
                "PNG fetch for CID {cid} failed: HTTP 503"
            )));
        }
        // 60×60 rendering: background 245 with a black blob whose size
        // depends on the CID, so different compounds get different pixels.
        let blob = 10 + (cid % 7);
        let img = ImageBuffer::from_fn(60, 60, |x, y| {
            if x < blob && y < blob {
                Luma([0u8])
            } else {
                Luma([245u8])
            }
        });
        let mut bytes = Vec::new();
        DynamicImage::ImageLuma8(img)
            .write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        Ok(bytes)
    }
}

// ── Mock descriptor tool ──────────────────────────────────────────────────────

/// Emits rows in reverse order with PaDEL-style generated names, one
/// informative column, one all-zero column, and one junk column.
struct MockBackend;

#[async_trait]
impl DescriptorBackend for MockBackend {
    async fn compute(&self, smiles: &[String]) -> Result<RawDescriptorTable> {
        let n = smiles.len();
        let mut names = Vec::new();
        let mut cells = Vec::new();
        for i in (0..n).rev() {
            names.push(format!("AUTOGEN_input_{}", i + 1));
            cells.push(vec![
                format!("{}", (i + 1) * 10),
                "0".to_string(),
                "Infinity".to_string(),
            ]);
        }
        Ok(RawDescriptorTable {
            names,
            columns: vec![
                "nHeavy".to_string(),
                "zeros".to_string(),
                "junk".to_string(),
            ],
            cells,
        })
    }
}

// ── Fixtures ──────────────────────────────────────────────────────────────────

fn write_input(dir: &Path) -> String {
    let path = dir.join("drugs.csv");
    fs::write(
        &path,
        "drug_id,drug_name,pubchem\n\
         1001,Aspirin,2244\n\
         1003,Imatinib,several\n\
         1005,Nonexistium,-\n",
    )
    .unwrap();
    path.to_string_lossy().into_owned()
}

fn config(dir: &Path) -> PrepConfig {
    PrepConfig {
        input: InputConfig {
            path: write_input(dir),
            drug_id_column: "drug_id".to_string(),
            pubchem_column: "pubchem".to_string(),
            name_column: "drug_name".to_string(),
        },
        artifacts: ArtifactConfig {
            dir: dir.join("clean").to_string_lossy().into_owned(),
            ..ArtifactConfig::default()
        },
        resolver: ResolverConfig::default(),
        descriptors: DescriptorConfig::default(),
        images: ImageConfig::default(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_three_drug_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());
    let source = MockPubChem::new(None);

    let summary = run_prep(&cfg, &source, &MockBackend).await.unwrap();

    // One drug resolves numerically, one via name fallback, one not at all.
    assert_eq!(summary.drugs_in, 3);
    assert_eq!(summary.resolved, 2);
    assert_eq!(summary.resolution_failures.len(), 1);
    assert_eq!(summary.resolution_failures[0].drug_id, "1005");
    assert_eq!(summary.rows_out, 2);
    assert!(summary.pixel_failures.is_empty());

    // Zero and junk columns pruned, only the informative one survives.
    assert_eq!(summary.descriptor_columns_in, 3);
    assert_eq!(summary.descriptor_columns_kept, 1);

    // Final table keyed by drug_id in original relative input order.
    let features = fs::read_to_string(cfg.artifacts.feature_path()).unwrap();
    let lines: Vec<&str> = features.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("drug_id,cid,nHeavy,pixel_0"));
    assert!(lines[1].starts_with("1001,2244,0,"));
    assert!(lines[2].starts_with("1003,5291,1,"));

    // Checkpoints exist for every stage.
    assert!(cfg.artifacts.smiles_path().exists());
    assert!(cfg.artifacts.mapping_path().exists());
    assert!(cfg.artifacts.raw_descriptor_path().exists());
    assert!(cfg.artifacts.clean_descriptor_path().exists());
    assert!(cfg.artifacts.pixel_path().exists());

    // The SMILES list drives the descriptor stage: resolution order.
    let smiles = fs::read_to_string(cfg.artifacts.smiles_path()).unwrap();
    assert_eq!(smiles.lines().count(), 2);
    assert!(smiles.starts_with("CC(=O)OC1=CC=CC=C1C(=O)O\n"));
}

#[tokio::test]
async fn test_pixel_failure_drops_compound_from_both_sides() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());
    let source = MockPubChem::new(Some(5291));

    let summary = run_prep(&cfg, &source, &MockBackend).await.unwrap();

    assert_eq!(summary.resolved, 2);
    assert_eq!(summary.pixel_failures.len(), 1);
    assert_eq!(summary.pixel_failures[0].cid, 5291);
    assert_eq!(summary.rows_out, 1);

    let features = fs::read_to_string(cfg.artifacts.feature_path()).unwrap();
    let lines: Vec<&str> = features.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].starts_with("1001,2244,"));
}

#[tokio::test]
async fn test_nothing_resolved_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(dir.path());
    let input_path = dir.path().join("empty_refs.csv");
    fs::write(
        &input_path,
        "drug_id,drug_name,pubchem\n2001,Unknowndrugium,-\n",
    )
    .unwrap();
    cfg.input.path = input_path.to_string_lossy().into_owned();

    let source = MockPubChem::new(None);
    let err = run_prep(&cfg, &source, &MockBackend).await.unwrap_err();
    assert!(err.to_string().contains("no drug resolved"));
}
