//! Errors shared across tlsca.

use std::{fmt, io};

//------------ IoError -------------------------------------------------------

/// An I/O error together with a description of what we were trying to do.
///
/// Plain `io::Error`s rarely tell which file was involved, which makes for
/// rather puzzling log lines. So we always carry the context along.
#[derive(Debug)]
pub struct IoError {
    context: String,
    cause: io::Error,
}

impl IoError {
    pub fn new(context: impl fmt::Display, cause: io::Error) -> Self {
        IoError {
            context: context.to_string(),
            cause,
        }
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn kind(&self) -> io::ErrorKind {
        self.cause.kind()
    }
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.context, self.cause)
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

//------------ Tests ---------------------------------------------------------
