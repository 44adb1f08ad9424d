//! The desired state of a certificate authority.

use std::{fmt, path::PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_CA_DIGEST, DEFAULT_CA_KEY_BITS};

use super::expiry::{Expiry, ExpiryError};

//------------ SubjectField --------------------------------------------------

/// A named attribute of an X.509 certificate subject.
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
pub enum SubjectField {
    #[serde(rename = "CN")]
    CommonName,

    #[serde(rename = "C")]
    Country,

    #[serde(rename = "ST")]
    State,

    #[serde(rename = "L")]
    Locality,

    #[serde(rename = "O")]
    Organization,

    #[serde(rename = "OU")]
    OrganizationalUnit,

    #[serde(rename = "emailAddress")]
    EmailAddress,
}

impl SubjectField {
    /// All fields in the order they are put in a distinguished name.
    pub const ALL: [SubjectField; 7] = [
        SubjectField::CommonName,
        SubjectField::Country,
        SubjectField::State,
        SubjectField::Locality,
        SubjectField::Organization,
        SubjectField::OrganizationalUnit,
        SubjectField::EmailAddress,
    ];

    /// The fields that are compared against an existing CA.
    ///
    /// The organization is only used when a CA is created.
    pub const COMPARED: [SubjectField; 6] = [
        SubjectField::CommonName,
        SubjectField::Country,
        SubjectField::State,
        SubjectField::Locality,
        SubjectField::OrganizationalUnit,
        SubjectField::EmailAddress,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SubjectField::CommonName => "CN",
            SubjectField::Country => "C",
            SubjectField::State => "ST",
            SubjectField::Locality => "L",
            SubjectField::Organization => "O",
            SubjectField::OrganizationalUnit => "OU",
            SubjectField::EmailAddress => "emailAddress",
        }
    }
}

impl fmt::Display for SubjectField {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//------------ Subject -------------------------------------------------------

/// The subject of a CA certificate.
///
/// Every field is optional. A field holding an empty string is treated
/// exactly like a field that was never set, except by [`Subject::or`].
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Subject {
    #[serde(rename = "CN", default, skip_serializing_if = "Option::is_none")]
    common_name: Option<String>,

    #[serde(rename = "C", default, skip_serializing_if = "Option::is_none")]
    country: Option<String>,

    #[serde(rename = "ST", default, skip_serializing_if = "Option::is_none")]
    state: Option<String>,

    #[serde(rename = "L", default, skip_serializing_if = "Option::is_none")]
    locality: Option<String>,

    #[serde(rename = "O", default, skip_serializing_if = "Option::is_none")]
    organization: Option<String>,

    #[serde(rename = "OU", default, skip_serializing_if = "Option::is_none")]
    organizational_unit: Option<String>,

    #[serde(
        rename = "emailAddress",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    email_address: Option<String>,
}

impl Subject {
    /// Returns the value of a field, if it is set to something non-empty.
    pub fn get(&self, field: SubjectField) -> Option<&str> {
        let value = match field {
            SubjectField::CommonName => &self.common_name,
            SubjectField::Country => &self.country,
            SubjectField::State => &self.state,
            SubjectField::Locality => &self.locality,
            SubjectField::Organization => &self.organization,
            SubjectField::OrganizationalUnit => &self.organizational_unit,
            SubjectField::EmailAddress => &self.email_address,
        };
        value.as_deref().filter(|v| !v.is_empty())
    }

    /// Sets a field. An empty value unsets it.
    pub fn set(&mut self, field: SubjectField, value: impl Into<String>) {
        let value = value.into();
        *self.slot_mut(field) = if value.is_empty() { None } else { Some(value) };
    }

    pub fn unset(&mut self, field: SubjectField) {
        *self.slot_mut(field) = None;
    }

    /// Sets a field and returns the subject, for chaining.
    pub fn with(mut self, field: SubjectField, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    /// Takes fields that were never given from the fallback.
    ///
    /// A field deserialized from an empty string counts as given, so it
    /// stays unset.
    pub fn or(mut self, fallback: &Subject) -> Self {
        for field in SubjectField::ALL {
            let slot = self.slot_mut(field);
            if slot.is_none() {
                *slot = fallback.get(field).map(str::to_string);
            }
        }
        self
    }

    /// Returns all set fields in distinguished name order.
    pub fn entries(&self) -> impl Iterator<Item = (SubjectField, &str)> + '_ {
        SubjectField::ALL
            .into_iter()
            .filter_map(|field| self.get(field).map(|value| (field, value)))
    }

    pub fn is_empty(&self) -> bool {
        self.entries().next().is_none()
    }

    fn slot_mut(&mut self, field: SubjectField) -> &mut Option<String> {
        match field {
            SubjectField::CommonName => &mut self.common_name,
            SubjectField::Country => &mut self.country,
            SubjectField::State => &mut self.state,
            SubjectField::Locality => &mut self.locality,
            SubjectField::Organization => &mut self.organization,
            SubjectField::OrganizationalUnit => &mut self.organizational_unit,
            SubjectField::EmailAddress => &mut self.email_address,
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (field, value) in self.entries() {
            write!(f, "/{}={}", field, value)?;
        }
        Ok(())
    }
}

//------------ CaRequest -----------------------------------------------------

/// The raw parameters describing a CA as the user declared it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CaRequest {
    pub name: String,

    /// RSA key size in bits.
    pub bits: u32,

    /// Expiry date as `YYYY-MM-DD`, `YYYYMMDD` or empty for the default.
    pub expires: String,

    pub subject: Subject,

    /// Message digest used to self-sign the certificate.
    pub digest: String,

    /// Overrides where the CA is stored.
    pub storage_location: Option<PathBuf>,
}

impl CaRequest {
    pub fn new(name: impl Into<String>) -> Self {
        CaRequest {
            name: name.into(),
            bits: DEFAULT_CA_KEY_BITS,
            expires: String::new(),
            subject: Subject::default(),
            digest: DEFAULT_CA_DIGEST.to_string(),
            storage_location: None,
        }
    }

    pub fn with_subject(mut self, subject: Subject) -> Self {
        self.subject = subject;
        self
    }

    pub fn with_expires(mut self, expires: impl Into<String>) -> Self {
        self.expires = expires.into();
        self
    }

    pub fn with_storage_location(mut self, location: PathBuf) -> Self {
        self.storage_location = Some(location);
        self
    }
}

//------------ DesiredCaProfile ----------------------------------------------

/// A validated [`CaRequest`] with its expiry normalized.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DesiredCaProfile {
    name: String,
    bits: u32,
    expiry: Expiry,
    subject: Subject,
    digest: String,
    storage_location: Option<PathBuf>,
}

impl DesiredCaProfile {
    /// Builds the profile, resolving the expiry relative to today (UTC).
    pub fn from_request(request: &CaRequest) -> Result<Self, ExpiryError> {
        let expiry = Expiry::parse(&request.expires)?;
        Ok(Self::with_expiry(request, expiry))
    }

    /// Builds the profile, resolving the expiry relative to `today`.
    pub fn from_request_at(
        request: &CaRequest,
        today: NaiveDate,
    ) -> Result<Self, ExpiryError> {
        let expiry = Expiry::parse_at(&request.expires, today)?;
        Ok(Self::with_expiry(request, expiry))
    }

    fn with_expiry(request: &CaRequest, expiry: Expiry) -> Self {
        DesiredCaProfile {
            name: request.name.clone(),
            bits: request.bits,
            expiry,
            subject: request.subject.clone(),
            digest: request.digest.clone(),
            storage_location: request.storage_location.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    pub fn expiry(&self) -> &Expiry {
        &self.expiry
    }

    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn storage_location(&self) -> Option<&std::path::Path> {
        self.storage_location.as_deref()
    }
}

//------------ Tests ---------------------------------------------------------
