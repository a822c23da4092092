use reqwest::{Client, ClientBuilder};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

use crate::error::VarclassError;

/// An HTTP client that only talks to approved provider hosts.
#[derive(Debug, Clone)]
pub struct AllowlistClient {
    client: Client,
    allowlist: HashSet<String>,
}

impl AllowlistClient {
    /// Creates a client with the default provider allowlist and a 30 s timeout.
    pub fn new() -> Result<Self, VarclassError> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, VarclassError> {
        let domains = [
            "myvariant.info",                // dbNSFP aggregation
            "alphamissense.hegelab.org",     // AlphaMissense
            "cadd.gs.washington.edu",        // CADD
            "gnomad.broadinstitute.org",     // gnomAD GraphQL
            "www.cancerhotspots.org",        // Cancer Hotspots
            "rest.uniprot.org",              // UniProt
            "eutils.ncbi.nlm.nih.gov",       // ClinVar E-utilities
            "localhost",
            "127.0.0.1",
        ];
        let allowlist = domains.iter().map(|d| d.to_string()).collect();

        let client = ClientBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("varclass/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| VarclassError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, allowlist })
    }

    /// Appends an exact hostname to the allowlist.
    pub fn allow_domain(&mut self, domain: &str) {
        self.allowlist.insert(domain.to_string());
    }

    /// Validates if a URL is permitted under the current policy.
    pub fn is_allowed(&self, url: &str) -> bool {
        if let Ok(parsed) = Url::parse(url) {
            if let Some(host) = parsed.host_str() {
                // Check exact match or if it's a subdomain of an allowed domain
                for allowed in &self.allowlist {
                    if host == allowed || host.ends_with(&format!(".{}", allowed)) {
                        return true;
                    }
                }
            }
        }
        false
    }

    fn check(&self, url: &str) -> Result<(), VarclassError> {
        if self.is_allowed(url) {
            Ok(())
        } else {
            Err(VarclassError::Security(format!("host not in provider allowlist: {}", url)))
        }
    }

    pub fn get(&self, url: &str) -> Result<reqwest::RequestBuilder, VarclassError> {
        self.check(url)?;
        Ok(self.client.get(url))
    }

    pub fn post(&self, url: &str) -> Result<reqwest::RequestBuilder, VarclassError> {
        self.check(url)?;
        Ok(self.client.post(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowlist() {
        let client = AllowlistClient::new().unwrap();
        assert!(client.is_allowed("https://myvariant.info/v1/variant/chr1:g.100A>G"));
        assert!(client.is_allowed("https://gnomad.broadinstitute.org/api"));
        assert!(client.is_allowed("https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi"));
        assert!(!client.is_allowed("https://example.com/api"));
        assert!(client.get("https://evil.example.org/").is_err());
    }

    #[test]
    fn test_allow_domain() {
        let mut client = AllowlistClient::new().unwrap();
        client.allow_domain("mirror.example.org");
        assert!(client.is_allowed("https://api.mirror.example.org/x"));
    }
}
