//! Error types. Derivation lookups never fail (they fall back), so only
//! loading content/config and opening audio can produce errors.

use crate::types::Category;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("reel {0} has no entries")]
    Empty(Category),

    #[error("reel {category} lists {value:?} more than once")]
    Duplicate { category: Category, value: String },

    #[error("failed to read catalog {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse catalog {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid timing: {0}")]
    Invalid(String),
}

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("no audio output device found")]
    NoDevice,

    #[error("audio stream error: {0}")]
    Stream(String),

    #[error("WAV export failed: {0}")]
    Wav(#[from] hound::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session file is empty")]
    Empty,

    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("bad session header: {0}")]
    Header(serde_json::Error),

    #[error("unknown session format: {0:?}")]
    UnknownFormat(String),

    #[error("bad event on line {line}: {source}")]
    Event {
        line: usize,
        source: serde_json::Error,
    },
}
