//! PubChem PUG REST client.
//!
//! Endpoints used:
//!   smiles: https://pubchem.ncbi.nlm.nih.gov/rest/pug/compound/cid/{cid}/property/IsomericSMILES/JSON
//!   name:   https://pubchem.ncbi.nlm.nih.gov/rest/pug/compound/name/{name}/cids/JSON
//!   image:  https://pubchem.ncbi.nlm.nih.gov/rest/pug/compound/cid/{cid}/PNG
//!
//! PUG answers 503 when busy and 404 for "no such compound"; the former is
//! retried with exponential backoff, the latter surfaces as an empty
//! candidate list (name search) or a lookup error (direct CID).

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use chemoprep_common::config::ResolverConfig;
use chemoprep_common::sandbox::SandboxClient;
use chemoprep_common::{ChemoprepError, Result};

const PUG_BASE: &str = "https://pubchem.ncbi.nlm.nih.gov/rest/pug";

/// Compound lookups needed by the resolver and the pixel extractor.
#[async_trait]
pub trait CompoundSource: Send + Sync {
    /// Fetch the isomeric SMILES for a CID.
    async fn smiles_for_cid(&self, cid: u32) -> Result<String>;

    /// Search compounds by name; returns candidate CIDs, possibly empty.
    async fn cids_for_name(&self, name: &str) -> Result<Vec<u32>>;

    /// Fetch the rendered 2D structure PNG for a CID.
    async fn fetch_png(&self, cid: u32) -> Result<Vec<u8>>;
}

pub struct PubChemClient {
    client: SandboxClient,
    max_retries: u32,
    backoff: Duration,
}

#[derive(Deserialize)]
struct PropertyResponse {
    #[serde(rename = "PropertyTable")]
    property_table: PropertyTableBody,
}

#[derive(Deserialize)]
struct PropertyTableBody {
    #[serde(rename = "Properties")]
    properties: Vec<CompoundProperties>,
}

#[derive(Deserialize)]
struct CompoundProperties {
    #[serde(rename = "CID")]
    cid: u32,
    #[serde(rename = "IsomericSMILES")]
    isomeric_smiles: Option<String>,
}

#[derive(Deserialize)]
struct IdentifierResponse {
    #[serde(rename = "IdentifierList")]
    identifier_list: IdentifierListBody,
}

#[derive(Deserialize)]
struct IdentifierListBody {
    #[serde(rename = "CID", default)]
    cid: Vec<u32>,
}

impl PubChemClient {
    pub fn new(cfg: &ResolverConfig) -> Result<Self> {
        Ok(Self {
            client: SandboxClient::with_timeout(Duration::from_secs(cfg.timeout_secs))?,
            max_retries: cfg.max_retries,
            backoff: Duration::from_millis(cfg.backoff_ms),
        })
    }

    /// GET with exponential backoff on transient failures (timeouts,
    /// connection errors, 429, 5xx). Returns the final response whether or
    /// not its status is a success; callers inspect the status themselves.
    async fn get_with_retry(&self, url: &str) -> Result<reqwest::Response> {
        let mut delay = self.backoff;
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.client.get(url)?.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    let transient = status.is_server_error()
                        || status == reqwest::StatusCode::TOO_MANY_REQUESTS;
                    if !transient || attempt > self.max_retries {
                        return Ok(resp);
                    }
                    warn!(%url, %status, attempt, "Transient PubChem error, backing off");
                }
                Err(e) if (e.is_timeout() || e.is_connect()) && attempt <= self.max_retries => {
                    warn!(%url, error = %e, attempt, "PubChem request failed, backing off");
                }
                Err(e) => return Err(e.into()),
            }
            tokio::time::sleep(delay).await;
            delay *= 2;
        }
    }
}

#[async_trait]
impl CompoundSource for PubChemClient {
    #[instrument(skip(self))]
    async fn smiles_for_cid(&self, cid: u32) -> Result<String> {
        let url = format!("{PUG_BASE}/compound/cid/{cid}/property/IsomericSMILES/JSON");
        let resp = self.get_with_retry(&url).await?;
        if !resp.status().is_success() {
            return Err(ChemoprepError::Lookup(format!(
                "CID {cid} lookup failed: HTTP {}",
                resp.status()
            )));
        }

        let body: PropertyResponse = resp.json().await?;
        let smiles = body
            .property_table
            .properties
            .into_iter()
            .next()
            .and_then(|p| {
                debug!(cid = p.cid, "PubChem property row");
                p.isomeric_smiles
            })
            .unwrap_or_default();

        if smiles.is_empty() {
            return Err(ChemoprepError::Lookup(format!("CID {cid} returned no SMILES")));
        }
        Ok(smiles)
    }

    #[instrument(skip(self))]
    async fn cids_for_name(&self, name: &str) -> Result<Vec<u32>> {
        let encoded: String = url::form_urlencoded::byte_serialize(name.as_bytes()).collect();
        let url = format!("{PUG_BASE}/compound/name/{encoded}/cids/JSON");
        let resp = self.get_with_retry(&url).await?;

        // PUG signals "no such compound" with 404, not with an empty list.
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !resp.status().is_success() {
            return Err(ChemoprepError::Lookup(format!(
                "name search for {name:?} failed: HTTP {}",
                resp.status()
            )));
        }

        let body: IdentifierResponse = resp.json().await?;
        debug!(name, n = body.identifier_list.cid.len(), "PubChem name candidates");
        Ok(body.identifier_list.cid)
    }

    #[instrument(skip(self))]
    async fn fetch_png(&self, cid: u32) -> Result<Vec<u8>> {
        let url = format!("{PUG_BASE}/compound/cid/{cid}/PNG");
        let resp = self.get_with_retry(&url).await?;
        if !resp.status().is_success() {
            return Err(ChemoprepError::Lookup(format!(
                "PNG fetch for CID {cid} failed: HTTP {}",
                resp.status()
            )));
        }
        Ok(resp.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_property_response() {
        let json = r#"{
            "PropertyTable": {
                "Properties": [
                    {"CID": 10096043, "IsomericSMILES": "CC(=O)OC1=CC=CC=C1C(=O)O"}
                ]
            }
        }"#;
        let body: PropertyResponse = serde_json::from_str(json).unwrap();
        let prop = &body.property_table.properties[0];
        assert_eq!(prop.cid, 10096043);
        assert_eq!(
            prop.isomeric_smiles.as_deref(),
            Some("CC(=O)OC1=CC=CC=C1C(=O)O")
        );
    }

    #[test]
    fn test_parse_identifier_response() {
        let json = r#"{"IdentifierList": {"CID": [2244, 5353740]}}"#;
        let body: IdentifierResponse = serde_json::from_str(json).unwrap();
        assert_eq!(body.identifier_list.cid, vec![2244, 5353740]);
    }

    #[test]
    fn test_parse_identifier_response_missing_cids() {
        let json = r#"{"IdentifierList": {}}"#;
        let body: IdentifierResponse = serde_json::from_str(json).unwrap();
        assert!(body.identifier_list.cid.is_empty());
    }
}
