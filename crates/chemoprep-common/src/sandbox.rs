use reqwest::{Client, ClientBuilder};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

use crate::error::ChemoprepError;

/// A sandbox-capped HTTP client that only allows requests to approved domains.
/// The pipeline talks to exactly one external service; anything else is a bug.
#[derive(Debug, Clone)]
pub struct SandboxClient {
    client: Client,
    allowlist: HashSet<String>,
}

impl SandboxClient {
    /// Creates a new SandboxClient with the default 30 second timeout.
    pub fn new() -> Result<Self, ChemoprepError> {
        Self::with_timeout(Duration::from_secs(30))
    }

    /// Creates a new SandboxClient with a per-request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, ChemoprepError> {
        let mut allowlist = HashSet::new();
        let domains = vec![
            "pubchem.ncbi.nlm.nih.gov", // PUG REST: compound lookup + images
            "localhost",                // test fixtures
            "127.0.0.1",                // localhost alt
        ];

        for d in domains {
            allowlist.insert(d.to_string());
        }

        let client = ClientBuilder::new()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                ChemoprepError::Config(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self { client, allowlist })
    }

    /// Appends an exact hostname to the allowlist.
    pub fn allow_domain(&mut self, domain: &str) {
        self.allowlist.insert(domain.to_string());
    }

    /// Validates if a URL is permitted under the current sandbox policy.
    pub fn is_allowed(&self, url: &str) -> bool {
        if let Ok(parsed) = Url::parse(url) {
            if let Some(host) = parsed.host_str() {
                // Exact match or a subdomain of an allowed domain
                for allowed in &self.allowlist {
                    if host == allowed || host.ends_with(&format!(".{}", allowed)) {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Exposes the inner `reqwest::Client` builder pattern safely for GET requests.
    pub fn get(&self, url: &str) -> Result<reqwest::RequestBuilder, ChemoprepError> {
        if !self.is_allowed(url) {
            return Err(ChemoprepError::Security(format!(
                "Network capabilities capped: domain not in allowlist for URL {}",
                url
            )));
        }

        Ok(self.client.get(url))
    }
}
