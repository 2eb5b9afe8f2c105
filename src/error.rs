//! Error handling for the tplgen generation library.
//!
//! This module defines the main error type `Error` used throughout the
//! library, along with a convenient `Result` type alias. It uses `thiserror`
//! so every fallible operation returns a typed error instead of terminating
//! the process.

use thiserror::Error;

/// Result type for tplgen generation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for tplgen generation operations
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Template parse or render error from the template engine
    #[error("template error: {0}")]
    Tera(#[from] tera::Error),

    /// Malformed numeric range specification, echoing the offending input
    #[error("invalid number range: {0}")]
    InvalidNumberRange(String),

    /// A value path was used both as a scalar leaf and as a nested map
    #[error("key conflict at {0}")]
    KeyConflict(String),

    /// An output name template rendered to the empty string
    #[error("empty output name")]
    EmptyOutputName,

    /// Failed to create an output file
    #[error("cannot create output {name}: {source}")]
    CreateOutput {
        name: String,
        source: std::io::Error,
    },

    /// Any error with the originating template file attached
    #[error("{file}: {source}")]
    InFile {
        file: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Attach the originating template file name to this error
    pub fn in_file<S: Into<String>>(self, file: S) -> Self {
        Self::InFile {
            file: file.into(),
            source: Box::new(self),
        }
    }
}
