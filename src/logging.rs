//! Logger installation. Everything else in the crate only uses the `log` macros.

use std::fs::{self, File};
use std::io;

use simplelog::{
    ColorChoice, CombinedLogger, Config, LevelFilter, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};
use thiserror::Error;

use crate::config::{LogLevel, LoggingSettings};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("cannot open log file: {0}")]
    Io(#[from] io::Error),
    #[error("a logger is already installed: {0}")]
    Install(#[from] log::SetLoggerError),
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Install the global logger: the configured file if any, stderr otherwise.
///
/// Can only succeed once per process.
pub fn init(settings: &LoggingSettings) -> Result<(), LoggingError> {
    let level = LevelFilter::from(settings.level);

    let logger: Box<dyn SharedLogger> = match &settings.file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            WriteLogger::new(level, Config::default(), File::create(path)?)
        }
        None => TermLogger::new(
            level,
            Config::default(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        ),
    };

    CombinedLogger::init(vec![logger])?;
    Ok(())
}
