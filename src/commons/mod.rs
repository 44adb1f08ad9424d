//! Common types used by the various tlsca components.
pub mod error;
pub mod util;
