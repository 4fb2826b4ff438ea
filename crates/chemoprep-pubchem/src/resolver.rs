//! Order-preserving drug → compound resolution.
//!
//! Each record resolves independently: a numeric PubChem reference is used
//! directly, anything else falls back to a name search. Failures never
//! abort the batch; they are collected and reported alongside the
//! successes so nothing disappears silently.

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use chemoprep_common::{DrugRecord, ResolutionFailure, ResolvedCompound};

use crate::client::CompoundSource;

/// Outcome of resolving a batch of drug records.
#[derive(Debug)]
pub struct ResolutionOutcome {
    /// Successfully resolved compounds, in original input order.
    pub resolved: Vec<ResolvedCompound>,
    /// Records that could not be resolved, with reasons, in input order.
    pub failures: Vec<ResolutionFailure>,
}

/// First comma-separated token of the raw reference. Inputs sometimes list
/// several CIDs; the first one wins.
fn first_token(raw: &str) -> &str {
    raw.split(',').next().unwrap_or("").trim()
}

async fn resolve_one<S>(
    source: &S,
    record: &DrugRecord,
) -> std::result::Result<ResolvedCompound, String>
where
    S: CompoundSource + ?Sized,
{
    let token = first_token(&record.pubchem);
    let cid = match token.parse::<u32>() {
        Ok(cid) => cid,
        Err(_) => {
            // Placeholders like "several" or "-": fall back to a name search.
            debug!(drug_id = %record.drug_id, token, "Non-numeric reference, trying name search");
            let candidates = source
                .cids_for_name(&record.drug_name)
                .await
                .map_err(|e| e.to_string())?;
            match candidates.first() {
                Some(&cid) => cid,
                None => {
                    return Err(format!(
                        "no PubChem candidates for name {:?}",
                        record.drug_name
                    ))
                }
            }
        }
    };

    let smiles = source.smiles_for_cid(cid).await.map_err(|e| e.to_string())?;
    if smiles.is_empty() {
        return Err(format!("empty SMILES for CID {cid}"));
    }

    Ok(ResolvedCompound {
        drug_id: record.drug_id.clone(),
        cid,
        smiles,
    })
}

/// Resolve a batch of records with bounded concurrency.
///
/// Output order matches input order regardless of completion order: every
/// in-flight lookup carries its input index and both result lists are
/// re-sorted by it at the end.
pub async fn resolve_drugs<S>(
    source: &S,
    records: &[DrugRecord],
    concurrency: usize,
) -> ResolutionOutcome
where
    S: CompoundSource + ?Sized,
{
    let results: Vec<(usize, std::result::Result<ResolvedCompound, String>)> =
        stream::iter(records.iter().enumerate())
            .map(|(idx, record)| async move { (idx, resolve_one(source, record).await) })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;

    let mut ok: Vec<(usize, ResolvedCompound)> = Vec::new();
    let mut failed: Vec<(usize, ResolutionFailure)> = Vec::new();
    for (idx, result) in results {
        match result {
            Ok(compound) => ok.push((idx, compound)),
            Err(reason) => {
                let drug_id = records[idx].drug_id.clone();
                warn!(%drug_id, %reason, "Drug dropped during resolution");
                failed.push((idx, ResolutionFailure { drug_id, reason }));
            }
        }
    }
    ok.sort_by_key(|(idx, _)| *idx);
    failed.sort_by_key(|(idx, _)| *idx);

    info!(
        total = records.len(),
        resolved = ok.len(),
        dropped = failed.len(),
        "Resolution complete"
    );

    ResolutionOutcome {
        resolved: ok.into_iter().map(|(_, c)| c).collect(),
        failures: failed.into_iter().map(|(_, f)| f).collect(),
    }
}
