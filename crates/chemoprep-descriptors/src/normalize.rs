//! Descriptor table cleaning: order recovery, sanitising, outlier
//! rejection, pruning and scaling.
//!
//! The passes run in a fixed sequence, each over whole columns:
//! sort by generated index → substitute 0 for non-finite cells → clip →
//! ESD outlier nulling → drop all-zero columns → min-max scale to [0, 1].
//! Outliers are nulled to 0, the same convention as missing values, so a
//! rerun treats them exactly like originally-missing cells.

use tracing::{debug, info};

use chemoprep_common::config::NormalizeConfig;
use chemoprep_common::{ChemoprepError, Result};

use crate::esd::esd_outliers;
use crate::table::{DescriptorTable, RawDescriptorTable};

/// Parse the positional index from a generated row name such as
/// "AUTOGEN_input_7". The index lives in the last underscore-separated
/// token and is 1-based (PaDEL numbering).
pub fn parse_row_index(name: &str) -> Result<usize> {
    name.rsplit('_')
        .next()
        .and_then(|token| token.parse::<usize>().ok())
        .filter(|&idx| idx >= 1)
        .ok_or_else(|| {
            ChemoprepError::Descriptor(format!("unparsable generated row name {name:?}"))
        })
}

/// Reorder rows into the resolver's input order using the index embedded
/// in each generated row name. The indices must form exactly {1..=n};
/// anything else means the tool dropped or duplicated a structure and the
/// positional alignment cannot be trusted. On error the table is left
/// empty; the caller aborts the batch either way.
pub fn sort_by_generated_index(raw: &mut RawDescriptorTable) -> Result<()> {
    let n = raw.names.len();
    let names = std::mem::take(&mut raw.names);
    let cells = std::mem::take(&mut raw.cells);

    let mut indexed: Vec<(usize, String, Vec<String>)> = Vec::with_capacity(n);
    for (name, row) in names.into_iter().zip(cells) {
        indexed.push((parse_row_index(&name)?, name, row));
    }
    indexed.sort_by_key(|(idx, _, _)| *idx);

    for (pos, (idx, _, _)) in indexed.iter().enumerate() {
        if *idx != pos + 1 {
            return Err(ChemoprepError::Descriptor(format!(
                "generated row indices are not a permutation of 1..={n} (saw index {idx} at sorted position {})",
                pos + 1
            )));
        }
    }

    for (_, name, row) in indexed {
        raw.names.push(name);
        raw.cells.push(row);
    }
    Ok(())
}

/// Parse one descriptor cell, substituting 0 for anything that is not a
/// finite number: empty, NaN, Infinity/-Infinity, or garbage.
pub fn sanitize_cell(cell: &str) -> f64 {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// Symmetric magnitude cap, protecting the column statistics from overflow.
pub fn clip(value: f64, threshold: f64) -> f64 {
    value.clamp(-threshold, threshold)
}

/// Run the full cleaning sequence over a raw table that is already sorted
/// into input order. Row count is preserved; columns that end up all-zero
/// are dropped, and every surviving column is rescaled to [0, 1] (a
/// constant column maps to all zeros rather than NaN).
pub fn clean(raw: &RawDescriptorTable, cfg: &NormalizeConfig) -> DescriptorTable {
    let n_rows = raw.cells.len();
    let n_cols = raw.columns.len();

    // Column-major for the per-column passes
    let mut cols: Vec<Vec<f64>> = vec![vec![0.0; n_rows]; n_cols];
    for (r, row) in raw.cells.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            cols[c][r] = clip(sanitize_cell(cell), cfg.clip_threshold);
        }
    }

    let max_outliers = ((n_rows as f64 * cfg.esd_max_outlier_fraction).ceil() as usize).max(1);
    let mut nulled = 0usize;
    for col in cols.iter_mut() {
        for idx in esd_outliers(col, cfg.esd_alpha, max_outliers) {
            col[idx] = 0.0;
            nulled += 1;
        }
    }

    let mut columns = Vec::new();
    let mut kept: Vec<Vec<f64>> = Vec::new();
    for (name, col) in raw.columns.iter().zip(cols) {
        if col.iter().any(|&v| v != 0.0) {
            columns.push(name.clone());
            kept.push(col);
        } else {
            debug!(column = %name, "Dropping all-zero descriptor column");
        }
    }

    for col in kept.iter_mut() {
        min_max_scale(col);
    }

    let mut rows = vec![Vec::with_capacity(columns.len()); n_rows];
    for col in &kept {
        for (r, &v) in col.iter().enumerate() {
            rows[r].push(v);
        }
    }

    info!(
        rows = n_rows,
        columns_in = n_cols,
        columns_kept = columns.len(),
        outliers_nulled = nulled,
        "Descriptor table cleaned"
    );

    DescriptorTable { columns, rows }
}

/// Rescale a column to [0, 1]. A constant column maps to all zeros.
fn min_max_scale(col: &mut [f64]) {
    let min = col.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = col.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if max > min {
        for v in col.iter_mut() {
            *v = (*v - min) / (max - min);
        }
    } else {
        for v in col.iter_mut() {
            *v = 0.0;
        }
    }
}
