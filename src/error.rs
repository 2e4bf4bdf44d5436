//! Error kinds reported by retrievers, the HTTP client and the pipelines.

use std::io;
use std::path::{Path, PathBuf};

use reqwest::{StatusCode, Url};
use thiserror::Error;

/// A fatal pipeline error. Within one pipeline only the first one reported is kept.
#[derive(Debug, Error)]
pub enum RestError {
    /// File, stdin or stdout failure.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// Malformed JSON from an `__ids` stream or from stdin.
    #[error("{context}: {source}")]
    Parse {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// A line of an id file that is not a canonical UUID.
    #[error("Found invalid ID={id} in file={}", path.display())]
    InvalidId { id: String, path: PathBuf },

    /// The server answered with a status outside the accepted range.
    #[error("{method} {url} failed: {status}: {body}")]
    Http {
        method: &'static str,
        url: String,
        status: StatusCode,
        body: String,
    },

    /// DNS, connect, TLS or mid-body I/O failure inside the HTTP stack.
    #[error("{method} {url} failed: {source}")]
    Transport {
        method: &'static str,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// A wait was interrupted because the pipeline is shutting down.
    #[error("operation cancelled")]
    Cancelled,

    /// A pipeline thread panicked instead of returning.
    #[error("{0} thread panicked")]
    Panicked(&'static str),

    /// Invalid invocation: empty or unparsable base URL, bad throttle, etc.
    #[error("{0}")]
    Config(String),
}

impl RestError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        RestError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn open_file(path: &Path, source: io::Error) -> Self {
        RestError::io(format!("Failed opening file={}", path.display()), source)
    }

    /// Classify a serde_json error: I/O underneath the decoder stays an I/O error.
    pub fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        let context = context.into();
        if source.is_io() {
            RestError::io(context, io::Error::other(source))
        } else {
            RestError::Parse { context, source }
        }
    }

    pub fn http(method: &'static str, url: &Url, status: StatusCode, body: &str) -> Self {
        RestError::Http {
            method,
            url: url.to_string(),
            status,
            body: body.trim().replace('\n', " "),
        }
    }

    pub fn transport(method: &'static str, url: &Url, source: reqwest::Error) -> Self {
        RestError::Transport {
            method,
            url: url.to_string(),
            source,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RestError::Cancelled)
    }
}
