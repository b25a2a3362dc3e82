//! Site credentials and runtime tuning, immutable once constructed.

use std::fmt;

use thiserror::Error;
use tracing::{debug, info};

/// Rejected configuration values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("sharepoint.site must not be empty")]
    EmptySite,
    #[error("runtime.chunk_size must be a positive number of bytes")]
    ZeroChunkSize,
}

/// Credentials for one Sharepoint site, plus the optional subsite chosen on the command line.
#[derive(Clone, PartialEq, Eq)]
pub struct SiteCredentials {
    tenant: String,
    client: String,
    site: String,
    secret: String,
    subsite: Option<String>,
}

impl SiteCredentials {
    pub fn new(
        tenant: impl Into<String>,
        client: impl Into<String>,
        site: impl Into<String>,
        secret: impl Into<String>,
        subsite: Option<String>,
    ) -> Result<Self, ConfigError> {
        let site = site.into();
        if site.trim().is_empty() {
            return Err(ConfigError::EmptySite);
        }
        Ok(Self {
            tenant: tenant.into(),
            client: client.into(),
            site,
            secret: secret.into(),
            subsite: subsite.filter(|s| !s.trim().is_empty()),
        })
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    pub fn client(&self) -> &str {
        &self.client
    }

    pub fn site(&self) -> &str {
        &self.site
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn subsite(&self) -> Option<&str> {
        self.subsite.as_deref()
    }

    /// The URL every request of a run is addressed to: `site` or `site/subsite`.
    pub fn target_url(&self) -> String {
        let site = self.site.trim_end_matches('/');
        match &self.subsite {
            Some(subsite) => format!("{}/{}", site, subsite.trim_matches('/')),
            None => site.to_string(),
        }
    }

    pub fn trace_loaded(&self) {
        info!(
            site = %self.site,
            subsite = self.subsite.as_deref().unwrap_or(""),
            "Loaded site credentials"
        );
        debug!(credentials = ?self, "Site credentials (full debug)");
    }
}

impl fmt::Debug for SiteCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SiteCredentials")
            .field("tenant", &self.tenant)
            .field("client", &self.client)
            .field("site", &self.site)
            .field("secret", &"<redacted>")
            .field("subsite", &self.subsite)
            .finish()
    }
}

/// Runtime knobs: debug output and the upload chunk size in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeSettings {
    debug: bool,
    chunk_size: u64,
}

impl RuntimeSettings {
    pub fn new(debug: bool, chunk_size: u64) -> Result<Self, ConfigError> {
        if chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        Ok(Self { debug, chunk_size })
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials(site: &str, subsite: Option<&str>) -> SiteCredentials {
        SiteCredentials::new("tenant", "client", site, "hunter2", subsite.map(String::from))
            .expect("valid credentials")
    }

    #[test]
    fn target_url_without_subsite_is_the_site() {
        let creds = credentials("https://contoso.sharepoint.com/sites/team", None);
        assert_eq!(creds.target_url(), "https://contoso.sharepoint.com/sites/team");
    }

    #[test]
    fn target_url_joins_subsite_with_single_slash() {
        let creds = credentials("https://contoso.sharepoint.com/sites/team/", Some("docs"));
        assert_eq!(
            creds.target_url(),
            "https://contoso.sharepoint.com/sites/team/docs"
        );
    }

    #[test]
    fn blank_subsite_counts_as_none() {
        let creds = credentials("https://contoso.sharepoint.com", Some("  "));
        assert_eq!(creds.subsite(), None);
    }

    #[test]
    fn empty_site_is_rejected() {
        let err = SiteCredentials::new("t", "c", " ", "s", None).unwrap_err();
        assert_eq!(err, ConfigError::EmptySite);
    }

    #[test]
    fn debug_output_hides_secret() {
        let rendered = format!("{:?}", credentials("https://x", None));
        assert!(!rendered.contains("hunter2"), "secret leaked: {rendered}");
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        assert_eq!(
            RuntimeSettings::new(false, 0).unwrap_err(),
            ConfigError::ZeroChunkSize
        );
        assert_eq!(RuntimeSettings::new(true, 1024).unwrap().chunk_size(), 1024);
    }
}
