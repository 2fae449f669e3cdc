use std::fs::OpenOptions;
use std::path::PathBuf;

use log::{SetLoggerError, info, warn};
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};
use thiserror::Error;

use crate::config::LoggingConfig;
use crate::engine::Failure;
use crate::eval::{EventContext, Verdict};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("cannot create log directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot open log file {}: {source}", path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("logger already installed: {0}")]
    Install(#[from] SetLoggerError),
}

/// Install the process logger: stderr always, plus an appended log file
/// when `[logging] file` is set. Stdout is reserved for the response.
pub fn init(config: &LoggingConfig) -> Result<(), LoggingError> {
    let level = config.level_filter();
    let format = ConfigBuilder::new().set_time_format_rfc3339().build();

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        format.clone(),
        TerminalMode::Stderr,
        ColorChoice::Never,
    )];
    if let Some(path) = config.file_path() {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| LoggingError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| LoggingError::Open {
                path: path.clone(),
                source,
            })?;
        loggers.push(WriteLogger::new(level, format, file));
    }

    CombinedLogger::init(loggers)?;
    Ok(())
}

/// One tab-separated line per decision: verdict, event, target, sender, reason.
pub fn decision_record(ctx: &EventContext, verdict: &Verdict) -> String {
    // Compact single-line reason (replace newlines with "; ")
    let reason = verdict.reason().replace('\n', "; ");
    format!(
        "{decision}\t{event}\t{repo}#{number}\t{sender}\t{reason}",
        decision = verdict.label(),
        event = ctx.event_type.as_str(),
        repo = ctx.full_name(),
        number = ctx.pr_number,
        sender = if ctx.sender.is_empty() { "-" } else { &ctx.sender },
    )
}

pub fn failure_record(failure: &Failure) -> String {
    format!(
        "FAILED\t{}\t{}",
        failure.code.as_str(),
        failure.message.replace('\n', "; ")
    )
}

pub fn log_decision(ctx: &EventContext, verdict: &Verdict) {
    info!("{}", decision_record(ctx, verdict));
}

pub fn log_failure(failure: &Failure) {
    warn!("{}", failure_record(failure));
}
