//! Descriptor table representations.

/// Raw descriptor output as emitted by the external tool: row order is
/// arbitrary, cells are uninterpreted strings.
#[derive(Debug, Clone)]
pub struct RawDescriptorTable {
    /// Generated per-row names (e.g. "AUTOGEN_input_7").
    pub names: Vec<String>,
    /// Descriptor column names, excluding the name column.
    pub columns: Vec<String>,
    /// Row-major cells; `cells[r].len() == columns.len()`.
    pub cells: Vec<Vec<String>>,
}

/// Cleaned, input-ordered, scaled descriptor table.
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptorTable {
    pub columns: Vec<String>,
    /// Row-major values, each within [0, 1].
    pub rows: Vec<Vec<f64>>,
}

impl DescriptorTable {
    /// Keep only the rows at `keep` (in the given order). Used to drop
    /// compounds that were lost at a later stage, keeping this table
    /// row-aligned with the rest of the pipeline.
    pub fn select_rows(&self, keep: &[usize]) -> DescriptorTable {
        DescriptorTable {
            columns: self.columns.clone(),
            rows: keep.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }
}
