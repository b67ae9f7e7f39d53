//! Error taxonomy
//!
//! Device errors are recoverable and never leave the device/motion layer.
//! `GameError` covers the fatal startup failures reported by the binary.

use std::path::PathBuf;

use thiserror::Error;

/// Non-fatal hub errors, absorbed at the motion mapper boundary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// No hub connected (unplugged, not found, or disabled)
    #[error("hub unavailable")]
    Unavailable,
    /// A position query was not answered in time
    #[error("hub did not answer within {0} ms")]
    Timeout(u64),
    /// No serial device looked like a hub
    #[error("no hub serial port found")]
    NotFound,
    /// Serial I/O failure; the link is dropped and retried
    #[error("serial I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for DeviceError {
    fn from(err: std::io::Error) -> Self {
        DeviceError::Io(err.to_string())
    }
}

/// Fatal errors raised before a match can start
#[derive(Debug, Error)]
pub enum GameError {
    #[error("invalid skill level {0} (expected 1-5)")]
    InvalidSkillLevel(u8),
    #[error("could not initialise the terminal: {0}")]
    RenderInit(#[source] std::io::Error),
    #[error("could not read settings from {path}: {source}")]
    SettingsIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed settings in {path}: {source}")]
    SettingsFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
