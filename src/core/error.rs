use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal, caller-visible failures. Everything else the engine meets while
/// patching (missing fields, ambiguous context, missing period anchors) is
/// reported through return values and logs instead.
#[derive(Debug, Error)]
pub enum PatchError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed document: {0}")]
    Malformed(String),
}

pub type Result<T> = std::result::Result<T, PatchError>;
