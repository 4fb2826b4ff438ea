//! External batch descriptor tool invocation (PaDEL-compatible).

use async_trait::async_trait;
use tracing::{debug, info};

use chemoprep_common::config::DescriptorToolConfig;
use chemoprep_common::{ChemoprepError, Result};

use crate::table::RawDescriptorTable;

/// Seam for the external descriptor computation.
#[async_trait]
pub trait DescriptorBackend: Send + Sync {
    /// Compute descriptors for the given structures. The returned table
    /// must hold exactly one row per input SMILES, in any order.
    async fn compute(&self, smiles: &[String]) -> Result<RawDescriptorTable>;
}

/// Runs a PaDEL-style command line: SMILES file in, descriptor CSV out.
pub struct PadelRunner {
    cfg: DescriptorToolConfig,
}

impl PadelRunner {
    pub fn new(cfg: DescriptorToolConfig) -> Self {
        Self { cfg }
    }
}

#[async_trait]
impl DescriptorBackend for PadelRunner {
    async fn compute(&self, smiles: &[String]) -> Result<RawDescriptorTable> {
        let dir = tempfile::tempdir()?;
        let mol_path = dir.path().join("input.smi");
        let out_path = dir.path().join("descriptors.csv");
        tokio::fs::write(&mol_path, smiles.join("\n") + "\n").await?;

        let mut cmd = tokio::process::Command::new(&self.cfg.command);
        for arg in &self.cfg.extra_args {
            cmd.arg(arg);
        }
        cmd.arg("-dir").arg(&mol_path);
        cmd.arg("-file").arg(&out_path);
        if self.cfg.d_2d {
            cmd.arg("-2d");
        }
        if self.cfg.d_3d {
            cmd.arg("-3d");
        }
        if self.cfg.convert_3d {
            cmd.arg("-convert3d");
        }
        if self.cfg.retain_3d {
            cmd.arg("-retain3d");
        }
        if self.cfg.fingerprints {
            cmd.arg("-fingerprints");
        }

        info!(command = %self.cfg.command, n = smiles.len(), "Running descriptor tool");
        let output = cmd.output().await?;
        if !output.status.success() {
            return Err(ChemoprepError::Descriptor(format!(
                "descriptor tool exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let content = tokio::fs::read_to_string(&out_path).await?;
        let table = parse_descriptor_csv(&content)?;
        debug!(
            rows = table.names.len(),
            cols = table.columns.len(),
            "Descriptor tool output parsed"
        );

        // The tool preserves count but not order. A short table would make
        // the positional realignment downstream silently corrupt, so any
        // count mismatch is fatal here at the stage boundary.
        if table.names.len() != smiles.len() {
            return Err(ChemoprepError::Alignment {
                stage: "descriptor extraction",
                expected: smiles.len(),
                actual: table.names.len(),
            });
        }
        Ok(table)
    }
}

/// Parse the tool's CSV output: first column is the generated row name,
/// the rest are descriptor values kept as raw strings (the tool emits
/// "Infinity" and empty cells, which the normalizer interprets).
pub fn parse_descriptor_csv(content: &str) -> Result<RawDescriptorTable> {
    let mut reader = csv::Reader::from_reader(content.as_bytes());
    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Err(ChemoprepError::Descriptor(
            "descriptor output has no header row".to_string(),
        ));
    }

    let columns: Vec<String> = headers.iter().skip(1).map(|s| s.to_string()).collect();
    let mut names = Vec::new();
    let mut cells = Vec::new();
    for record in reader.records() {
        let record = record?;
        names.push(record.get(0).unwrap_or("").to_string());
        cells.push(record.iter().skip(1).map(|s| s.to_string()).collect());
    }

    Ok(RawDescriptorTable {
        names,
        columns,
        cells,
    })
}
