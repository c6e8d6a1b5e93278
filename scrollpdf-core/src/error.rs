use std::path::PathBuf;

use thiserror::Error;

/// Failure to produce document content: either the document itself or one of its pages.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {uri}: {reason}")]
    Open { uri: String, reason: String },
    #[error("failed to render page {page}: {reason}")]
    Render { page: usize, reason: String },
    #[error("page {page} rendered with zero height")]
    EmptyPage { page: usize },
    #[error("no document is loaded")]
    NoDocument,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path:?}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
