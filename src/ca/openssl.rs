//! A CA backend keeping PEM encoded certificates and keys on disk, using
//! openssl for the crypto.
//!
//! Each CA lives in its own directory under the storage dir:
//!
//! ```text
//! <storage dir>/<name>/<name>_ca_cert.crt
//! <storage dir>/<name>/<name>_ca_cert.key
//! ```
use std::path::{Path, PathBuf};

use chrono::Utc;
use log::{debug, info};
use openssl::{
    asn1::{Asn1Time, Asn1TimeRef},
    bn::{BigNum, MsbOption},
    error::ErrorStack,
    hash::MessageDigest,
    nid::Nid,
    pkey::{PKey, Private},
    rsa::Rsa,
    x509::{
        X509, X509Name, X509NameRef,
        extension::{BasicConstraints, KeyUsage, SubjectKeyIdentifier},
    },
};

use crate::{
    commons::{error::IoError, util::file},
    constants::{CA_CERT_EXTENSION, CA_CERT_FILE_SUFFIX},
};

use super::backend::{
    ActualCaInfo, BackendError, CaBackend, ChangeRecord, key_path,
};
use super::profile::{DesiredCaProfile, Subject, SubjectField};

/// X.509 v3 is encoded as 2.
const X509_VERSION_3: i32 = 2;

/// The smallest RSA key OpenSSL is willing to generate.
const MIN_KEY_BITS: u32 = 512;

const SERIAL_BITS: i32 = 128;

//------------ OpenSslBackend ------------------------------------------------

/// Manages self-signed CAs as PEM files below a storage directory.
#[derive(Clone, Debug)]
pub struct OpenSslBackend {
    storage_dir: PathBuf,
}

impl OpenSslBackend {
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        OpenSslBackend {
            storage_dir: storage_dir.into(),
        }
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Builds a self-signed CA certificate for the key.
    fn build_certificate(
        profile: &DesiredCaProfile,
        key: &PKey<Private>,
        digest: MessageDigest,
    ) -> Result<X509, ErrorStack> {
        let mut builder = X509::builder()?;
        builder.set_version(X509_VERSION_3)?;

        let mut serial = BigNum::new()?;
        serial.rand(SERIAL_BITS, MsbOption::MAYBE_ZERO, false)?;
        let serial = serial.to_asn1_integer()?;
        builder.set_serial_number(&serial)?;

        // self-signed, so subject and issuer are the same
        let name = x509_name(profile.subject())?;
        builder.set_subject_name(&name)?;
        builder.set_issuer_name(&name)?;

        let not_before = Asn1Time::days_from_now(0)?;
        builder.set_not_before(&not_before)?;
        let not_after = Asn1Time::from_unix(not_after(profile))?;
        builder.set_not_after(&not_after)?;
        builder.set_pubkey(key)?;

        builder.append_extension(BasicConstraints::new().critical().ca().build()?)?;
        builder.append_extension(
            KeyUsage::new().critical().key_cert_sign().crl_sign().build()?,
        )?;
        let ski = SubjectKeyIdentifier::new()
            .build(&builder.x509v3_context(None, None))?;
        builder.append_extension(ski)?;

        builder.sign(key, digest)?;
        Ok(builder.build())
    }
}

impl CaBackend for OpenSslBackend {
    fn exists(&self, name: &str, location: Option<&Path>) -> bool {
        self.locate(name, location).is_file()
    }

    fn locate(&self, name: &str, location: Option<&Path>) -> PathBuf {
        let mut path = location.unwrap_or(&self.storage_dir).to_path_buf();
        path.push(name);
        path.push(format!(
            "{}{}.{}",
            name, CA_CERT_FILE_SUFFIX, CA_CERT_EXTENSION
        ));
        path
    }

    fn inspect(&self, path: &Path) -> Result<ActualCaInfo, BackendError> {
        debug!("Inspecting CA certificate '{}'", path.display());
        let pem = file::read(path)?;
        let cert =
            X509::from_pem(&pem).map_err(|e| BackendError::malformed(path, e))?;

        let subject = subject_from_name(cert.subject_name())
            .map_err(|e| BackendError::malformed(path, e))?;
        let issuer = subject_from_name(cert.issuer_name())
            .map_err(|e| BackendError::malformed(path, e))?;
        let serial = hex::encode_upper(cert.serial_number().to_bn()?.to_vec());

        Ok(ActualCaInfo::new(
            subject,
            issuer,
            serial,
            unix_time(cert.not_before())?,
            unix_time(cert.not_after())?,
        ))
    }

    fn create(
        &self,
        profile: &DesiredCaProfile,
        replace: bool,
    ) -> Result<ChangeRecord, BackendError> {
        let cert_path = self.locate(profile.name(), profile.storage_location());
        let key_path = key_path(&cert_path);

        if cert_path.exists() && !replace {
            info!(
                "CA certificate '{}' already exists, leaving it alone",
                cert_path.display()
            );
            return Ok(ChangeRecord::empty());
        }

        validity_days(profile.expiry().days())?;
        let digest = MessageDigest::from_name(profile.digest()).ok_or_else(
            || BackendError::UnsupportedDigest(profile.digest().to_string()),
        )?;
        if profile.bits() < MIN_KEY_BITS {
            return Err(BackendError::InvalidKeySize(profile.bits()));
        }

        debug!(
            "Generating {} bit RSA key for CA '{}'",
            profile.bits(),
            profile.name()
        );
        let key = PKey::from_rsa(Rsa::generate(profile.bits())?)?;
        let cert = Self::build_certificate(profile, &key, digest)?;

        // Both files are written in full before either replaces the old
        // one. The key goes last, so a failure leaves the old key in place.
        let key_tmp =
            file::stage_private(&key.private_key_to_pem_pkcs8()?, &key_path)?;
        let cert_tmp = file::stage(&cert.to_pem()?, &cert_path)?;
        file::persist(cert_tmp, &cert_path)?;
        file::persist(key_tmp, &key_path)?;

        info!(
            "{} CA certificate '{}' valid until {}",
            if replace { "Replaced" } else { "Created" },
            cert_path.display(),
            profile.expiry()
        );

        Ok(ChangeRecord::empty()
            .with("certificate", cert_path.display())
            .with("private_key", key_path.display()))
    }

    fn remove_file(&self, path: &Path) -> Result<(), IoError> {
        file::delete_file(path)
    }
}

//------------ Helpers -------------------------------------------------------

fn nid(field: SubjectField) -> Nid {
    match field {
        SubjectField::CommonName => Nid::COMMONNAME,
        SubjectField::Country => Nid::COUNTRYNAME,
        SubjectField::State => Nid::STATEORPROVINCENAME,
        SubjectField::Locality => Nid::LOCALITYNAME,
        SubjectField::Organization => Nid::ORGANIZATIONNAME,
        SubjectField::OrganizationalUnit => Nid::ORGANIZATIONALUNITNAME,
        SubjectField::EmailAddress => Nid::PKCS9_EMAILADDRESS,
    }
}

fn x509_name(subject: &Subject) -> Result<X509Name, ErrorStack> {
    let mut builder = X509Name::builder()?;
    for (field, value) in subject.entries() {
        builder.append_entry_by_nid(nid(field), value)?;
    }
    Ok(builder.build())
}

/// Maps the known entries of a name. Anything else is ignored.
fn subject_from_name(name: &X509NameRef) -> Result<Subject, ErrorStack> {
    let mut subject = Subject::default();
    for entry in name.entries() {
        let entry_nid = entry.object().nid();
        let field = SubjectField::ALL.into_iter().find(|f| nid(*f) == entry_nid);
        if let Some(field) = field {
            subject.set(field, entry.data().to_string()?);
        }
    }
    Ok(subject)
}

/// The expiry date at the current UTC time of day, as seconds since the
/// epoch.
fn not_after(profile: &DesiredCaProfile) -> i64 {
    profile
        .expiry()
        .date()
        .and_time(Utc::now().time())
        .and_utc()
        .timestamp()
}

/// Converts an ASN.1 time to seconds since the epoch.
fn unix_time(time: &Asn1TimeRef) -> Result<i64, ErrorStack> {
    let epoch = Asn1Time::from_unix(0)?;
    let diff = epoch.diff(time)?;
    Ok(i64::from(diff.days) * 86400 + i64::from(diff.secs))
}

fn validity_days(days: i64) -> Result<u32, BackendError> {
    if days <= 0 {
        return Err(BackendError::InvalidValidity(days));
    }
    u32::try_from(days).map_err(|_| BackendError::InvalidValidity(days))
}

//------------ Tests ---------------------------------------------------------
