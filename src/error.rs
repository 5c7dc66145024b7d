use std::fmt;

use crate::config::ConfigError;

/// Errors that end the program. Audio and MIDI problems are logged and
/// survived instead.
#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Terminal(std::io::Error),
    Log(std::io::Error),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "{err}"),
            AppError::Terminal(err) => write!(f, "terminal error: {err}"),
            AppError::Log(err) => write!(f, "failed to open log file: {err}"),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Terminal(err) | AppError::Log(err) => Some(err),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Terminal(err)
    }
}
