//! Error types returned by the core data plane.
//!
//! Modelled on the teacher's `from_str::FromStrError`: one `thiserror`
//! enum per fallible boundary, never a panic for control flow.

use std::io;
use std::net::AddrParseError;
use thiserror::Error;

/// Errors raised while coercing a [`crate::dom::Value`] into a typed view.
#[derive(Error, Debug)]
pub enum ValueError {
    #[error("value '{0}' is not a valid IP network")]
    InvalidNetwork(String),

    #[error(transparent)]
    AddrParse(#[from] AddrParseError),
}

/// Errors raised while building or reading the `.rpsl` sidecars.
#[derive(Error, Debug)]
pub enum RpslError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("{0}")]
    Value(#[from] ValueError),

    #[error("no schema registered for type '{0}'")]
    SchemaNotFound(String),

    #[error("malformed sidecar line: {0}")]
    MalformedSidecar(String),

    #[error("object not found: {0:?}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, RpslError>;
