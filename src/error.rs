//! Error types shared by the counting engine

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by setup, counting and message exchange
#[derive(Debug, Error)]
pub enum SubgraphError {
    /// Inconsistent parameters or degenerate inputs; nothing was computed
    #[error("configuration error: {0}")]
    Config(String),

    /// A graph, template or assignment file could not be parsed
    #[error("malformed input {path}:{line}: {reason}")]
    Parse {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Dynamic-programming storage could not be allocated
    #[error("resource error: {0}")]
    Resource(String),

    /// A peer could not be reached or violated the exchange protocol
    #[error("transport error: {0}")]
    Transport(String),

    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),

    /// Random color sampling failed; a round cannot proceed without a valid coloring
    #[error("sampling error: {0}")]
    Sampling(String),
}

impl SubgraphError {
    pub fn config(msg: impl Into<String>) -> Self {
        SubgraphError::Config(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        SubgraphError::Transport(msg.into())
    }

    pub fn parse(path: impl Into<PathBuf>, line: usize, reason: impl Into<String>) -> Self {
        SubgraphError::Parse {
            path: path.into(),
            line,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SubgraphError>;
