/// `load_config` module: loads the site configuration document into typed settings.
///
/// This module is the only place where the YAML configuration is parsed. The
/// document has two sections and every key is required:
///
/// ```yaml
/// sharepoint:
///   tenant: 00000000-0000-0000-0000-000000000000
///   client: 11111111-1111-1111-1111-111111111111
///   site: https://contoso.sharepoint.com/sites/team
///   secret: <client secret>
/// runtime:
///   chunk_size: 10485760
/// ```
///
/// The subsite and debug flag are not part of the document; they come from
/// the command line and are merged in by [`FileConfig::into_settings`].
///
/// # Errors
/// All errors use `anyhow::Error` with the file path in context and are
/// surfaced at the CLI boundary.
use anyhow::{Context, Result};
use serde::Deserialize;
use spuppy_core::config::{RuntimeSettings, SiteCredentials};
use std::fs;
use std::path::Path;
use tracing::{error, info};

/// Default location of the configuration document, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

#[derive(Debug, Deserialize)]
pub struct FileConfig {
    pub sharepoint: SharepointSection,
    pub runtime: RuntimeSection,
}

#[derive(Deserialize)]
pub struct SharepointSection {
    pub tenant: String,
    pub client: String,
    pub site: String,
    pub secret: String,
}

impl std::fmt::Debug for SharepointSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharepointSection")
            .field("tenant", &self.tenant)
            .field("client", &self.client)
            .field("site", &self.site)
            .field("secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct RuntimeSection {
    pub chunk_size: u64,
}

impl FileConfig {
    /// Combines the document with command-line values into validated settings.
    pub fn into_settings(
        self,
        subsite: Option<String>,
        debug: bool,
    ) -> Result<(SiteCredentials, RuntimeSettings)> {
        let credentials = SiteCredentials::new(
            self.sharepoint.tenant,
            self.sharepoint.client,
            self.sharepoint.site,
            self.sharepoint.secret,
            subsite,
        )?;
        let runtime = RuntimeSettings::new(debug, self.runtime.chunk_size)?;
        Ok((credentials, runtime))
    }
}

/// Reads and parses the configuration document at `path`.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<FileConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {}: {}",
                path_ref.display(),
                e
            ));
        }
    };

    let config: FileConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!(
                "Failed to parse config YAML {}: {e}",
                path_ref.display()
            ));
        }
    };

    Ok(config)
}

/// Loads the document and merges command-line values in one step.
pub fn load_settings<P: AsRef<Path>>(
    path: P,
    subsite: Option<String>,
    debug: bool,
) -> Result<(SiteCredentials, RuntimeSettings)> {
    let path_ref = path.as_ref();
    load_config(path_ref)?
        .into_settings(subsite, debug)
        .with_context(|| format!("Invalid configuration in {}", path_ref.display()))
}
