//! Reconciling a self-signed Certificate Authority on disk.

pub mod backend;
pub mod diff;
pub mod expiry;
pub mod openssl;
pub mod profile;
pub mod reconcile;

#[cfg(test)]
pub mod test;

pub use self::backend::{
    ActualCaInfo, BackendError, CaBackend, ChangeRecord, key_path,
};
pub use self::diff::{Attribute, CaState, ChangeSet};
pub use self::expiry::{Expiry, ExpiryError};
pub use self::openssl::OpenSslBackend;
pub use self::profile::{CaRequest, DesiredCaProfile, Subject, SubjectField};
pub use self::reconcile::{
    Outcome, ReconcileError, Reconciler, ReconcilerConfig,
};
