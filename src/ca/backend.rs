//! The capabilities needed from whatever keeps CAs on disk.

use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
};

use chrono::{DateTime, NaiveDate};
use serde::Serialize;

use crate::commons::error::IoError;
use crate::constants::CA_KEY_EXTENSION;

use super::profile::{DesiredCaProfile, Subject};

//------------ CaBackend -----------------------------------------------------

/// Creates, finds and inspects CA certificates and their keys.
///
/// The reconciler only decides what should happen, an implementation of
/// this trait does the actual work. All calls are synchronous.
pub trait CaBackend {
    /// Returns whether a CA with the given name exists.
    fn exists(&self, name: &str, location: Option<&Path>) -> bool;

    /// Returns the path to the certificate of the named CA.
    fn locate(&self, name: &str, location: Option<&Path>) -> PathBuf;

    /// Parses the certificate at the given path.
    fn inspect(&self, path: &Path) -> Result<ActualCaInfo, BackendError>;

    /// Creates a CA matching the profile, together with its private key.
    ///
    /// If a CA already exists it is only overwritten if `replace` is set.
    /// An empty record is returned if nothing was changed.
    fn create(
        &self,
        profile: &DesiredCaProfile,
        replace: bool,
    ) -> Result<ChangeRecord, BackendError>;

    /// Removes a single file.
    fn remove_file(&self, path: &Path) -> Result<(), IoError>;
}

/// Returns the path of the private key belonging to a CA certificate.
///
/// The key sits next to the certificate with the key file extension.
pub fn key_path(cert_path: &Path) -> PathBuf {
    cert_path.with_extension(CA_KEY_EXTENSION)
}

//------------ ActualCaInfo --------------------------------------------------

/// What an existing CA certificate looks like.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ActualCaInfo {
    subject: Subject,
    issuer: Subject,

    /// Serial number in upper case hex.
    serial: String,

    /// Start of the validity period, in seconds since the epoch.
    not_before: i64,

    /// End of the validity period, in seconds since the epoch.
    not_after: i64,
}

impl ActualCaInfo {
    pub fn new(
        subject: Subject,
        issuer: Subject,
        serial: String,
        not_before: i64,
        not_after: i64,
    ) -> Self {
        ActualCaInfo {
            subject,
            issuer,
            serial,
            not_before,
            not_after,
        }
    }

    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    pub fn issuer(&self) -> &Subject {
        &self.issuer
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    pub fn not_before(&self) -> i64 {
        self.not_before
    }

    pub fn not_after(&self) -> i64 {
        self.not_after
    }

    /// The UTC calendar date on which the certificate expires.
    ///
    /// Returns `None` if the timestamp cannot be represented.
    pub fn expires_on(&self) -> Option<NaiveDate> {
        DateTime::from_timestamp(self.not_after, 0).map(|t| t.date_naive())
    }
}

//------------ ChangeRecord --------------------------------------------------

/// What a backend changed, keyed by a short description.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ChangeRecord(BTreeMap<String, String>);

impl ChangeRecord {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.0.insert(key.into(), value.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn into_map(self) -> BTreeMap<String, String> {
        self.0
    }
}

//------------ BackendError --------------------------------------------------

#[derive(Debug)]
pub enum BackendError {
    Io(IoError),
    OpenSsl(openssl::error::ErrorStack),
    UnsupportedDigest(String),
    InvalidKeySize(u32),
    InvalidValidity(i64),
    MalformedCertificate(PathBuf, String),
}

impl BackendError {
    pub fn malformed(path: &Path, e: impl fmt::Display) -> Self {
        BackendError::MalformedCertificate(path.to_path_buf(), e.to_string())
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BackendError::Io(e) => e.fmt(f),
            BackendError::OpenSsl(e) => write!(f, "OpenSSL error: {}", e),
            BackendError::UnsupportedDigest(digest) => {
                write!(f, "Unsupported message digest: {}", digest)
            }
            BackendError::InvalidKeySize(bits) => {
                write!(f, "Invalid RSA key size: {}", bits)
            }
            BackendError::InvalidValidity(days) => write!(
                f,
                "Cannot create a certificate valid for {} days",
                days
            ),
            BackendError::MalformedCertificate(path, e) => write!(
                f,
                "Malformed certificate '{}': {}",
                path.display(),
                e
            ),
        }
    }
}

impl From<IoError> for BackendError {
    fn from(e: IoError) -> Self {
        BackendError::Io(e)
    }
}

impl From<openssl::error::ErrorStack> for BackendError {
    fn from(e: openssl::error::ErrorStack) -> Self {
        BackendError::OpenSsl(e)
    }
}

impl std::error::Error for BackendError {}

//------------ Tests ---------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commons::test;

    #[test]
    fn expiry_date_is_utc() {
        // 2040-01-01T23:30:00Z
        let info = ActualCaInfo::new(
            Subject::default(),
            Subject::default(),
            "01".to_string(),
            0,
            2209073400,
        );
        assert_eq!(info.expires_on(), Some(test::date("2040-01-01")));
    }

    #[test]
    fn key_path_replaces_extension() {
        assert_eq!(
            key_path(Path::new("/etc/pki/a.com/a.com_ca_cert.crt")),
            PathBuf::from("/etc/pki/a.com/a.com_ca_cert.key")
        );
    }

    #[test]
    fn change_record_is_empty_until_something_is_added() {
        let record = ChangeRecord::empty();
        assert!(record.is_empty());

        let record = record.with("certificate", "/etc/pki/a/a_ca_cert.crt");
        assert!(!record.is_empty());
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"certificate":"/etc/pki/a/a_ca_cert.crt"}"#
        );
    }
}
