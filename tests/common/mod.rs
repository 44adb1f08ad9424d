//! Helpers shared by the functional tests.
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use tlsca::ca::{
    CaRequest, OpenSslBackend, Reconciler, ReconcilerConfig, Subject,
    SubjectField,
};

/// Runs the operation with a fresh, temporary storage directory.
pub fn test_under_tmp<F>(op: F)
where
    F: FnOnce(PathBuf),
{
    let dir = tempfile::tempdir().unwrap();
    op(dir.path().to_path_buf())
}

pub fn reconciler(dir: &Path) -> Reconciler<OpenSslBackend> {
    Reconciler::new(OpenSslBackend::new(dir))
}

pub fn apply() -> ReconcilerConfig {
    ReconcilerConfig::default()
}

pub fn dry_run() -> ReconcilerConfig {
    ReconcilerConfig::dry_run()
}

/// A request with a small key, so the tests don't spend their time on
/// generating primes.
pub fn request(name: &str, cn: &str) -> CaRequest {
    let mut request = CaRequest::new(name).with_subject(
        Subject::default()
            .with(SubjectField::CommonName, cn)
            .with(SubjectField::Country, "US"),
    );
    request.bits = 1024;
    request
}

pub fn cert_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(name).join(format!("{}_ca_cert.crt", name))
}

pub fn key_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(name).join(format!("{}_ca_cert.key", name))
}
