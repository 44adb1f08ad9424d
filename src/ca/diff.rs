//! Computing the difference between a desired and an existing CA.

use std::{collections::BTreeMap, fmt};

use log::debug;

use super::backend::{ActualCaInfo, BackendError, CaBackend};
use super::profile::{DesiredCaProfile, SubjectField};

/// How an unset value is shown in reports.
pub const UNSET: &str = "<unset>";

//------------ Attribute -----------------------------------------------------

/// An attribute of a CA that can be out of date.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Attribute {
    Subject(SubjectField),
    Expires,
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Attribute::Subject(field) => field.fmt(f),
            Attribute::Expires => f.write_str("expires"),
        }
    }
}

//------------ ChangeSet -----------------------------------------------------

/// The attributes that differ from the desired state, with the desired
/// value for each.
///
/// A value of `None` means the attribute should not be set at all.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ChangeSet(BTreeMap<Attribute, Option<String>>);

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, attribute: Attribute) -> bool {
        self.0.contains_key(&attribute)
    }

    /// Returns the desired value for a changed attribute.
    ///
    /// The outer option tells whether the attribute changed at all.
    pub fn get(&self, attribute: Attribute) -> Option<Option<&str>> {
        self.0.get(&attribute).map(|v| v.as_deref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Attribute, Option<&str>)> {
        self.0.iter().map(|(k, v)| (*k, v.as_deref()))
    }

    /// Returns the changes as plain strings, for reporting.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.iter()
            .map(|(k, v)| (k.to_string(), v.unwrap_or(UNSET).to_string()))
            .collect()
    }

    fn record(&mut self, attribute: Attribute, desired: Option<&str>) {
        self.0.insert(attribute, desired.map(ToString::to_string));
    }
}

impl fmt::Display for ChangeSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut first = true;
        for (attribute, value) in self.iter() {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", attribute, value.unwrap_or(UNSET))?;
            first = false;
        }
        Ok(())
    }
}

//------------ CaState -------------------------------------------------------

/// The result of comparing a desired CA against the disk.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CaState {
    /// There is no CA at all.
    Absent,

    /// The CA exists. It matches if the change set is empty.
    Present(ChangeSet),
}

//------------ diff ----------------------------------------------------------

/// Compares the desired CA with whatever the backend currently holds.
///
/// This only reads. The CA is inspected afresh on every call.
pub fn diff<B: CaBackend + ?Sized>(
    profile: &DesiredCaProfile,
    backend: &B,
) -> Result<CaState, BackendError> {
    let location = profile.storage_location();
    if !backend.exists(profile.name(), location) {
        debug!("CA '{}' does not exist", profile.name());
        return Ok(CaState::Absent);
    }

    let path = backend.locate(profile.name(), location);
    let actual = backend.inspect(&path)?;
    let changes = compare(profile, &actual);

    debug!(
        "CA '{}' at '{}' differs in {} attribute(s)",
        profile.name(),
        path.display(),
        changes.len()
    );
    Ok(CaState::Present(changes))
}

/// Compares a desired CA against an inspected certificate.
///
/// A subject field differs if it is set on one side only, or set on both
/// sides to different values. Unset and empty are the same thing.
pub fn compare(profile: &DesiredCaProfile, actual: &ActualCaInfo) -> ChangeSet {
    let mut changes = ChangeSet::default();

    for field in SubjectField::COMPARED {
        let desired = profile.subject().get(field);
        if desired != actual.subject().get(field) {
            changes.record(Attribute::Subject(field), desired);
        }
    }

    let desired_expiry = profile.expiry().date();
    if actual.expires_on() != Some(desired_expiry) {
        let desired = profile.expiry().to_string();
        changes.record(Attribute::Expires, Some(&desired));
    }

    changes
}

//------------ Tests ---------------------------------------------------------
