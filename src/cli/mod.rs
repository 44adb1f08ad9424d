//! The tlsca command line interface.

pub mod options;
pub mod report;
