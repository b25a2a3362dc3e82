//! # logging: console and log file output for one run
//!
//! [`Logger`] is passed explicitly to whatever needs to report to the user. Every
//! message goes to two places:
//! - the console, with a colored `WARNING:`, `FAIL:` or `SUCCESS:` prefix where
//!   the severity calls for one;
//! - a `tracing` dispatch owned by the logger, whose fmt layer writes
//!   `YYYY-MM-DD HH:MM:SS LEVEL message` lines to the log file, with `WARN`
//!   spelled `WARNING`.
//!
//! Debug messages are only emitted when the logger was created in debug mode.
//! The binary additionally installs [`Logger::dispatch`] as the global default
//! so `tracing` events from the HTTP client end up in the same file.

use std::error::Error;
use std::fmt::{self, Display};
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Local};
use console::style;
use tracing::{Dispatch, Event, Level, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, MakeWriter};
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;

/// Log file name for a run started at `started`.
pub fn log_file_name(started: DateTime<Local>) -> String {
    started.format("SPUPPY_%Y%m%d_%H%M%S.log").to_string()
}

/// Log file line: `2021-03-04 05:06:07 INFO message key=value`.
struct LineFormat;

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let level = event.metadata().level();
        let level = if *level == Level::WARN {
            "WARNING"
        } else {
            level.as_str()
        };
        write!(writer, "{} {level} ", Local::now().format("%Y-%m-%d %H:%M:%S"))?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

pub struct Logger {
    dispatch: Dispatch,
    debug: bool,
    path: Option<PathBuf>,
}

impl Logger {
    /// Creates `dir` if needed and logs to a new timestamped file inside it.
    pub fn to_dir<P: AsRef<Path>>(dir: P, debug: bool) -> io::Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(log_file_name(Local::now()));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut logger = Self::with_writer(Mutex::new(file), debug);
        logger.path = Some(path);
        Ok(logger)
    }

    /// Logs file lines to an arbitrary writer.
    pub fn with_writer<W>(writer: W, debug: bool) -> Self
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let level = if debug {
            LevelFilter::DEBUG
        } else {
            LevelFilter::INFO
        };
        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .event_format(LineFormat)
            .with_filter(level);
        let subscriber = tracing_subscriber::registry().with(file_layer);
        Self {
            dispatch: Dispatch::new(subscriber),
            debug,
            path: None,
        }
    }

    /// Console only; file lines are discarded.
    pub fn console_only(debug: bool) -> Self {
        Self::with_writer(io::sink, debug)
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Path of the log file, if this logger writes to one.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn debug(&self, msg: impl Display) {
        if !self.debug {
            return;
        }
        println!("{msg}");
        tracing::dispatcher::with_default(&self.dispatch, || tracing::debug!("{msg}"));
    }

    pub fn info(&self, msg: impl Display) {
        println!("{msg}");
        tracing::dispatcher::with_default(&self.dispatch, || tracing::info!("{msg}"));
    }

    pub fn warning(&self, msg: impl Display) {
        println!("{} {msg}", style("WARNING:").yellow());
        tracing::dispatcher::with_default(&self.dispatch, || tracing::warn!("{msg}"));
    }

    pub fn error(&self, msg: impl Display) {
        println!("{} {msg}", style("FAIL:").red());
        tracing::dispatcher::with_default(&self.dispatch, || tracing::error!("{msg}"));
    }

    pub fn success(&self, msg: impl Display) {
        println!("{} {msg}", style("SUCCESS:").green());
        tracing::dispatcher::with_default(&self.dispatch, || tracing::info!("{msg}"));
    }

    /// Logs an error together with its whole `source()` chain.
    pub fn exception(&self, err: &(dyn Error + 'static)) {
        let mut detail = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            detail.push_str(&format!("\n  caused by: {cause}"));
            source = cause.source();
        }
        println!("{} {detail}", style("FAIL:").red());
        tracing::dispatcher::with_default(&self.dispatch, || {
            tracing::error!(error = ?err, "{detail}")
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn log_file_name_uses_compact_timestamp() {
        let started = Local.with_ymd_and_hms(2021, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(log_file_name(started), "SPUPPY_20210304_050607.log");
    }

    #[test]
    fn info_logger_drops_debug_lines_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let logger = Logger::to_dir(dir.path().join("logs"), false).unwrap();
        logger.debug("hidden detail");
        logger.info("plain info");
        logger.error("went wrong");
        logger.success("all good");

        let contents = fs::read_to_string(logger.path().unwrap()).unwrap();
        assert!(!contents.contains("hidden detail"));
        assert!(contents.contains("INFO plain info"));
        assert!(contents.contains("ERROR went wrong"));
        assert!(contents.contains("INFO all good"));
    }

    #[test]
    fn file_lines_are_timestamp_level_message() {
        let dir = tempfile::tempdir().unwrap();
        let logger = Logger::to_dir(dir.path(), false).unwrap();
        logger.info("plain info");
        logger.warning("careful now");

        let contents = fs::read_to_string(logger.path().unwrap()).unwrap();
        let line = regex::Regex::new(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2} [A-Z]+ \S").unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2, "{contents}");
        for l in &lines {
            assert!(line.is_match(l), "unexpected log line {l:?}");
        }
        assert!(lines[0].ends_with(" INFO plain info"), "{}", lines[0]);
        assert!(lines[1].ends_with(" WARNING careful now"), "{}", lines[1]);
        assert!(!contents.contains("  "), "level must not be padded: {contents}");
    }

    #[test]
    fn debug_logger_keeps_debug_lines() {
        let dir = tempfile::tempdir().unwrap();
        let logger = Logger::to_dir(dir.path(), true).unwrap();
        logger.debug("resolved url");

        let contents = fs::read_to_string(logger.path().unwrap()).unwrap();
        assert!(contents.contains("DEBUG resolved url"), "{contents}");
    }

    #[test]
    fn log_file_lands_in_requested_dir() {
        let dir = tempfile::tempdir().unwrap();
        let logger = Logger::to_dir(dir.path().join("nested/logs"), false).unwrap();
        let path = logger.path().unwrap();
        assert!(path.starts_with(dir.path().join("nested/logs")));
        let name = path.file_name().unwrap().to_string_lossy();
        assert!(name.starts_with("SPUPPY_") && name.ends_with(".log"), "{name}");
    }
}
