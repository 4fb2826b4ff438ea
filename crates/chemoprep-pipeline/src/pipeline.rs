//! End-to-end feature preparation pipeline.
//!
//! Orchestrates the full flow for one batch:
//!   1. Read the raw drug table
//!   2. Resolve drugs to CIDs + SMILES (PubChem)
//!   3. Batch-compute descriptors (external tool)
//!   4. Recover input order and clean/scale the descriptor table
//!   5. Fetch and binarize structure images
//!   6. Assemble the final combined feature table
//!
//! Each stage completes and writes its checkpoint artifact before the
//! next begins. Per-record failures never abort the batch; row-count
//! disagreements between stages always do.

use std::time::Instant;
use tracing::{info, instrument, warn};

use chemoprep_common::config::PrepConfig;
use chemoprep_common::{ChemoprepError, ResolutionFailure, Result};
use chemoprep_descriptors::normalize::{clean, sort_by_generated_index};
use chemoprep_descriptors::DescriptorBackend;
use chemoprep_pixels::{extract_pixels, PixelFailure};
use chemoprep_pubchem::client::CompoundSource;
use chemoprep_pubchem::resolver::resolve_drugs;

use crate::assemble::assemble;
use crate::{artifacts, input};

/// Counts and diagnostics from one pipeline run.
#[derive(Debug)]
pub struct PrepSummary {
    pub drugs_in: usize,
    pub resolved: usize,
    pub resolution_failures: Vec<ResolutionFailure>,
    pub descriptor_columns_in: usize,
    pub descriptor_columns_kept: usize,
    pub pixel_failures: Vec<PixelFailure>,
    pub rows_out: usize,
    pub duration_ms: u64,
}

/// Run the whole preparation pipeline for one input table.
#[instrument(skip_all)]
pub async fn run_prep<S, D>(cfg: &PrepConfig, source: &S, backend: &D) -> Result<PrepSummary>
where
    S: CompoundSource + ?Sized,
    D: DescriptorBackend + ?Sized,
{
    let t0 = Instant::now();

    let records = input::read_drug_table(&cfg.input)?;
    info!(n = records.len(), path = %cfg.input.path, "Drug table loaded");

    // ── 1. Resolve ────────────────────────────────────────────────────────────
    let outcome = resolve_drugs(source, &records, cfg.resolver.concurrency).await;
    artifacts::write_smiles_list(&cfg.artifacts.smiles_path(), &outcome.resolved)?;
    artifacts::write_mapping(&cfg.artifacts.mapping_path(), &outcome.resolved)?;

    if outcome.resolved.is_empty() {
        return Err(ChemoprepError::Lookup(
            "no drug resolved to a structure; nothing to do".to_string(),
        ));
    }

    // ── 2. Descriptors ────────────────────────────────────────────────────────
    let smiles: Vec<String> = outcome.resolved.iter().map(|c| c.smiles.clone()).collect();
    let mut raw = backend.compute(&smiles).await?;
    artifacts::write_raw_descriptors(&cfg.artifacts.raw_descriptor_path(), &raw)?;

    // ── 3. Normalize ──────────────────────────────────────────────────────────
    sort_by_generated_index(&mut raw)?;
    let descriptors = clean(&raw, &cfg.descriptors.normalize);
    if descriptors.rows.len() != outcome.resolved.len() {
        return Err(ChemoprepError::Alignment {
            stage: "descriptor cleaning",
            expected: outcome.resolved.len(),
            actual: descriptors.rows.len(),
        });
    }
    artifacts::write_clean_descriptors(
        &cfg.artifacts.clean_descriptor_path(),
        &descriptors,
        &outcome.resolved,
    )?;

    // ── 4. Pixels ─────────────────────────────────────────────────────────────
    let pixels = extract_pixels(source, &outcome.resolved, &cfg.images).await;
    artifacts::write_pixel_table(&cfg.artifacts.pixel_path(), &pixels.rows)?;

    // Compounds whose image failed are dropped from the descriptor side
    // too, so both inputs reach the assembler in the same order with the
    // same survivors.
    let descriptors = if pixels.failures.is_empty() {
        descriptors
    } else {
        warn!(
            dropped = pixels.failures.len(),
            "Dropping compounds without pixel data from the descriptor table"
        );
        descriptors.select_rows(&pixels.kept_indices)
    };

    // ── 5. Assemble ───────────────────────────────────────────────────────────
    let table = assemble(&descriptors, &pixels.rows)?;
    artifacts::write_feature_table(&cfg.artifacts.feature_path(), &table)?;

    let summary = PrepSummary {
        drugs_in: records.len(),
        resolved: outcome.resolved.len(),
        resolution_failures: outcome.failures,
        descriptor_columns_in: raw.columns.len(),
        descriptor_columns_kept: table.descriptor_columns.len(),
        pixel_failures: pixels.failures,
        rows_out: table.rows.len(),
        duration_ms: t0.elapsed().as_millis() as u64,
    };

    info!(
        drugs_in = summary.drugs_in,
        resolved = summary.resolved,
        dropped_resolution = summary.resolution_failures.len(),
        dropped_pixels = summary.pixel_failures.len(),
        columns_kept = summary.descriptor_columns_kept,
        rows_out = summary.rows_out,
        duration_ms = summary.duration_ms,
        "Feature preparation complete"
    );

    Ok(summary)
}
