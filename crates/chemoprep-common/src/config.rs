//! Configuration loading for chemoprep.
//! Reads chemoprep.toml from the current directory or path in CHEMOPREP_CONFIG env var.
//!
//! Every constant the pipeline depends on (background intensity, clip
//! threshold, image size, timeouts, artifact paths, the descriptor tool
//! command line) lives here rather than in the stage code.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ChemoprepError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepConfig {
    pub input: InputConfig,

    #[serde(default)]
    pub artifacts: ArtifactConfig,

    #[serde(default)]
    pub resolver: ResolverConfig,

    #[serde(default)]
    pub descriptors: DescriptorConfig,

    #[serde(default)]
    pub images: ImageConfig,
}

impl PrepConfig {
    /// Load configuration from chemoprep.toml.
    /// Checks CHEMOPREP_CONFIG env var first, then the current directory.
    pub fn load() -> Result<Self> {
        let path = std::env::var("CHEMOPREP_CONFIG")
            .unwrap_or_else(|_| "chemoprep.toml".to_string());
        Self::from_path(Path::new(&path))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ChemoprepError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| ChemoprepError::Config(format!("{}: {e}", path.display())))
    }
}

// ── Input table ───────────────────────────────────────────────────────────────

/// Location and column names of the raw drug table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    pub path: String,

    #[serde(default = "default_drug_id_column")]
    pub drug_id_column: String,

    #[serde(default = "default_pubchem_column")]
    pub pubchem_column: String,

    #[serde(default = "default_name_column")]
    pub name_column: String,
}

fn default_drug_id_column() -> String { "drug_id".to_string() }
fn default_pubchem_column() -> String { "pubchem".to_string() }
fn default_name_column()    -> String { "drug_name".to_string() }

// ── Checkpoint artifacts ──────────────────────────────────────────────────────

/// File names for the per-stage checkpoint artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactConfig {
    #[serde(default = "default_artifact_dir")]
    pub dir: String,

    #[serde(default = "default_smiles_file")]
    pub smiles_file: String,

    #[serde(default = "default_mapping_file")]
    pub mapping_file: String,

    #[serde(default = "default_raw_descriptor_file")]
    pub raw_descriptor_file: String,

    #[serde(default = "default_clean_descriptor_file")]
    pub clean_descriptor_file: String,

    #[serde(default = "default_pixel_file")]
    pub pixel_file: String,

    #[serde(default = "default_feature_file")]
    pub feature_file: String,
}

fn default_artifact_dir()          -> String { "data/clean".to_string() }
fn default_smiles_file()           -> String { "smiles.smi".to_string() }
fn default_mapping_file()          -> String { "drugs_with_smiles.csv".to_string() }
fn default_raw_descriptor_file()   -> String { "descriptors_raw.csv".to_string() }
fn default_clean_descriptor_file() -> String { "descriptors_clean.csv".to_string() }
fn default_pixel_file()            -> String { "drug_pixels.csv".to_string() }
fn default_feature_file()          -> String { "drug_features.csv".to_string() }

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            dir: default_artifact_dir(),
            smiles_file: default_smiles_file(),
            mapping_file: default_mapping_file(),
            raw_descriptor_file: default_raw_descriptor_file(),
            clean_descriptor_file: default_clean_descriptor_file(),
            pixel_file: default_pixel_file(),
            feature_file: default_feature_file(),
        }
    }
}

impl ArtifactConfig {
    pub fn smiles_path(&self) -> PathBuf { Path::new(&self.dir).join(&self.smiles_file) }
    pub fn mapping_path(&self) -> PathBuf { Path::new(&self.dir).join(&self.mapping_file) }
    pub fn raw_descriptor_path(&self) -> PathBuf { Path::new(&self.dir).join(&self.raw_descriptor_file) }
    pub fn clean_descriptor_path(&self) -> PathBuf { Path::new(&self.dir).join(&self.clean_descriptor_file) }
    pub fn pixel_path(&self) -> PathBuf { Path::new(&self.dir).join(&self.pixel_file) }
    pub fn feature_path(&self) -> PathBuf { Path::new(&self.dir).join(&self.feature_file) }
}

// ── Resolver / HTTP ───────────────────────────────────────────────────────────

/// PubChem lookup behaviour: per-call timeout, retry policy and how many
/// lookups may be in flight at once. Output order is independent of
/// completion order, so concurrency is safe to raise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_timeout_secs() -> u64   { 30 }
fn default_max_retries()  -> u32   { 3 }
fn default_backoff_ms()   -> u64   { 500 }
fn default_concurrency()  -> usize { 4 }

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            backoff_ms: default_backoff_ms(),
            concurrency: default_concurrency(),
        }
    }
}

// ── Descriptors ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DescriptorConfig {
    #[serde(default)]
    pub tool: DescriptorToolConfig,

    #[serde(default)]
    pub normalize: NormalizeConfig,
}

/// Command line for the external batch descriptor tool (PaDEL-compatible).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescriptorToolConfig {
    #[serde(default = "default_tool_command")]
    pub command: String,

    #[serde(default)]
    pub extra_args: Vec<String>,

    #[serde(default = "bool_true")]
    pub d_2d: bool,

    #[serde(default = "bool_true")]
    pub d_3d: bool,

    #[serde(default = "bool_true")]
    pub convert_3d: bool,

    #[serde(default = "bool_true")]
    pub retain_3d: bool,

    #[serde(default)]
    pub fingerprints: bool,
}

fn default_tool_command() -> String { "padel-descriptor".to_string() }
fn bool_true() -> bool { true }

impl Default for DescriptorToolConfig {
    fn default() -> Self {
        Self {
            command: default_tool_command(),
            extra_args: Vec::new(),
            d_2d: true,
            d_3d: true,
            convert_3d: true,
            retain_3d: true,
            fingerprints: false,
        }
    }
}

/// Descriptor cleaning parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizeConfig {
    /// Magnitude cap applied before any column statistics are computed.
    #[serde(default = "default_clip_threshold")]
    pub clip_threshold: f64,

    /// Significance level for the generalized ESD outlier test.
    #[serde(default = "default_esd_alpha")]
    pub esd_alpha: f64,

    /// Upper bound on outliers per column, as a fraction of the row count.
    #[serde(default = "default_esd_max_outlier_fraction")]
    pub esd_max_outlier_fraction: f64,
}

fn default_clip_threshold()           -> f64 { 1e101 }
fn default_esd_alpha()                -> f64 { 0.05 }
fn default_esd_max_outlier_fraction() -> f64 { 0.1 }

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            clip_threshold: default_clip_threshold(),
            esd_alpha: default_esd_alpha(),
            esd_max_outlier_fraction: default_esd_max_outlier_fraction(),
        }
    }
}

// ── Structure images ──────────────────────────────────────────────────────────

/// Pixel feature extraction parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Flat background intensity of the renderer's grayscale output.
    /// Everything strictly below it is treated as structure.
    #[serde(default = "default_background_intensity")]
    pub background_intensity: u8,

    /// Side length of the downsampled square image.
    #[serde(default = "default_image_size")]
    pub size: u32,
}

fn default_background_intensity() -> u8  { 245 }
fn default_image_size()           -> u32 { 60 }

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            background_intensity: default_background_intensity(),
            size: default_image_size(),
        }
    }
}

impl ImageConfig {
    /// Length of the flattened pixel vector (size² entries).
    pub fn vector_len(&self) -> usize {
        (self.size as usize) * (self.size as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_fills_defaults() {
        let cfg: PrepConfig = toml::from_str(
            r#"
            [input]
            path = "data/raw/drugs.csv"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.input.drug_id_column, "drug_id");
        assert_eq!(cfg.resolver.timeout_secs, 30);
        assert_eq!(cfg.images.background_intensity, 245);
        assert_eq!(cfg.images.vector_len(), 3600);
        assert_eq!(cfg.descriptors.normalize.clip_threshold, 1e101);
        assert!(cfg.descriptors.tool.d_2d && cfg.descriptors.tool.d_3d);
        assert!(!cfg.descriptors.tool.fingerprints);
    }

    #[test]
    fn test_artifact_paths_join_dir() {
        let artifacts = ArtifactConfig {
            dir: "out".to_string(),
            ..ArtifactConfig::default()
        };
        assert_eq!(artifacts.smiles_path(), Path::new("out").join("smiles.smi"));
        assert_eq!(
            artifacts.feature_path(),
            Path::new("out").join("drug_features.csv")
        );
    }

    #[test]
    fn test_overrides_win_over_defaults() {
        let cfg: PrepConfig = toml::from_str(
            r#"
            [input]
            path = "drugs.csv"
            pubchem_column = "pubchem_id"

            [images]
            background_intensity = 240
            size = 32

            [descriptors.tool]
            command = "java"
            extra_args = ["-jar", "PaDEL-Descriptor.jar"]
            "#,
        )
        .unwrap();

        assert_eq!(cfg.input.pubchem_column, "pubchem_id");
        assert_eq!(cfg.images.size, 32);
        assert_eq!(cfg.images.vector_len(), 1024);
        assert_eq!(cfg.descriptors.tool.command, "java");
        assert_eq!(cfg.descriptors.tool.extra_args.len(), 2);
    }
}
