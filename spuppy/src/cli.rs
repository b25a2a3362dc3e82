/// # spuppy CLI (module)
///
/// Command parsing and the async entrypoint for the `spuppy` binary.
///
/// All upload logic (request validation, stage ordering, progress and run
/// logging) lives in the [`spuppy-core`] crate. This module only:
/// - exposes the command-line flags through [`Cli`];
/// - opens the run's log file and installs it as the global `tracing` sink;
/// - loads the YAML configuration;
/// - wires the reqwest-backed [`SharepointClient`] into the core pipeline.
///
/// For programmatic and integration use, call [`run`] with a constructed [`Cli`].
///
/// [`spuppy-core`]: ../../spuppy-core/
/// [`SharepointClient`]: crate::sharepoint::SharepointClient
use crate::load_config::{load_settings, DEFAULT_CONFIG_PATH};
use crate::sharepoint::SharepointClient;
use anyhow::{Context, Result};
use clap::Parser;
use spuppy_core::logging::Logger;
use spuppy_core::request::UploadRequest;
use spuppy_core::upload::{upload, UploadReport};
use std::path::PathBuf;

/// Default directory for run log files, relative to the working directory.
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Upload files to a specified folder of a Sharepoint site.
#[derive(Parser, Debug)]
#[clap(
    name = "spuppy",
    version,
    about = "Upload files to a specified folder of a Sharepoint site/subsite"
)]
pub struct Cli {
    /// Print additional debug information
    #[clap(short, long)]
    pub debug: bool,

    /// Subsite of the configured site to upload to
    #[clap(short, long)]
    pub subsite: Option<String>,

    /// Folder with the files to upload (without --files, everything directly inside it)
    #[clap(short = 'i', long)]
    pub directory: Option<PathBuf>,

    /// Comma-separated list of files to upload
    #[clap(short, long)]
    pub files: Option<String>,

    /// Folder to create at the target site (defaults to the name of --directory)
    #[clap(short, long)]
    pub out: Option<String>,

    /// Path to the YAML config file
    #[clap(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Directory receiving the run's log file
    #[clap(long, default_value = DEFAULT_LOG_DIR)]
    pub log_dir: PathBuf,
}

/// Async CLI entrypoint for main() and integration tests.
///
/// Every failure has already been reported to the console and the log file
/// by the time an `Err` is returned.
pub async fn run(cli: Cli) -> Result<UploadReport> {
    let logger = match Logger::to_dir(&cli.log_dir, cli.debug) {
        Ok(logger) => logger,
        Err(e) => {
            eprintln!("Cannot create log file in {}: {e}", cli.log_dir.display());
            return Err(e).with_context(|| {
                format!("Cannot create log file in {}", cli.log_dir.display())
            });
        }
    };
    // Only the first run in a process gets to install the global sink.
    if let Err(e) = tracing::dispatcher::set_global_default(logger.dispatch().clone()) {
        logger.warning(format_args!(
            "HTTP client events are not written to this run's log file: {e}"
        ));
    }
    tracing::info!("trace_initialised");

    let (credentials, runtime) = match load_settings(&cli.config, cli.subsite, cli.debug) {
        Ok(settings) => settings,
        Err(e) => {
            logger.error(format_args!("{e:#}"));
            return Err(e);
        }
    };
    credentials.trace_loaded();

    let client = match SharepointClient::new(&credentials) {
        Ok(client) => client,
        Err(e) => {
            logger.exception(&e);
            return Err(e.into());
        }
    };

    let request = UploadRequest::new(cli.directory, cli.files.as_deref(), cli.out);
    let report = upload(&client, &credentials, &runtime, request, &logger).await?;

    match serde_json::to_string_pretty(&report) {
        Ok(json) => logger.debug(json),
        Err(e) => tracing::warn!(error = ?e, "Failed to serialise upload report"),
    }
    tracing::info!(files = report.files.len(), "Upload run completed");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;

    #[test]
    fn short_flags_map_to_fields() {
        let cli = Cli::try_parse_from([
            "spuppy", "-d", "-s", "projects", "-i", "data", "-f", "a.txt,b.txt", "-o", "reports",
            "-c", "site.yaml",
        ])
        .unwrap();
        assert!(cli.debug);
        assert_eq!(cli.subsite.as_deref(), Some("projects"));
        assert_eq!(cli.directory, Some(PathBuf::from("data")));
        assert_eq!(cli.files.as_deref(), Some("a.txt,b.txt"));
        assert_eq!(cli.out.as_deref(), Some("reports"));
        assert_eq!(cli.config, PathBuf::from("site.yaml"));
    }

    #[test]
    fn defaults_apply_when_flags_are_absent() {
        let cli = Cli::try_parse_from(["spuppy"]).unwrap();
        assert!(!cli.debug);
        assert!(cli.directory.is_none() && cli.files.is_none() && cli.out.is_none());
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        assert_eq!(cli.log_dir, PathBuf::from(DEFAULT_LOG_DIR));
    }

    fn failing_run(logs: &std::path::Path) -> Cli {
        let config = logs.join("absent.yaml");
        Cli::try_parse_from([
            OsStr::new("spuppy"),
            OsStr::new("--config"),
            config.as_os_str(),
            OsStr::new("--log-dir"),
            logs.as_os_str(),
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn second_run_in_process_warns_about_global_sink() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();

        assert!(run(failing_run(first.path())).await.is_err());
        assert!(run(failing_run(second.path())).await.is_err());

        let log = std::fs::read_dir(second.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .find(|p| p.extension().is_some_and(|ext| ext == "log"))
            .expect("log file");
        let contents = std::fs::read_to_string(log).unwrap();
        assert!(
            contents.contains("WARNING HTTP client events are not written"),
            "{contents}"
        );
        assert!(contents.contains("ERROR Failed to read config file"), "{contents}");
    }

    #[test]
    fn unknown_flag_is_rejected() {
        assert!(Cli::try_parse_from(["spuppy", "--bucket", "x"]).is_err());
    }
}
