//! The _tlsca_ library crate.
//!
//! Declarative management of self-signed certificate authorities: a
//! desired CA is compared against what exists on disk and is created,
//! replaced or removed as needed.

pub mod ca;
pub mod cli;
pub mod commons;
pub mod config;
pub mod constants;
