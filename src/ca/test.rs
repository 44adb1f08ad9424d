//! An in-memory backend for testing the reconciler.
#![cfg(test)]

use std::{
    cell::{Cell, RefCell},
    io,
    path::{Path, PathBuf},
};

use chrono::NaiveDate;

use crate::commons::error::IoError;
use crate::constants::{CA_CERT_EXTENSION, CA_KEY_EXTENSION};

use super::backend::{ActualCaInfo, BackendError, CaBackend, ChangeRecord};
use super::profile::{DesiredCaProfile, Subject, SubjectField};

/// Builds the inspection result for a self-signed CA expiring at noon UTC
/// on the given date.
pub fn ca_info(subject: Subject, expires: NaiveDate) -> ActualCaInfo {
    let not_after = expires
        .and_hms_opt(12, 0, 0)
        .unwrap()
        .and_utc()
        .timestamp();
    ActualCaInfo::new(
        subject.clone(),
        subject,
        "0A1B".to_string(),
        not_after - 86400,
        not_after,
    )
}

//------------ CreateBehaviour -----------------------------------------------

/// How the mock responds to `create`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CreateBehaviour {
    /// Does what it is asked.
    Honour,

    /// Pretends success but reports that nothing changed.
    NothingChanged,

    /// Writes the new CA but keeps the old common name.
    KeepCommonName,

    /// Reports success but leaves no CA behind.
    Vanish,

    /// Reports success but leaves a CA that cannot be inspected.
    Corrupt,

    /// Fails with an error.
    Fail,
}

//------------ Mutation ------------------------------------------------------

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Mutation {
    Create { name: String, replace: bool },
    Remove(PathBuf),
}

//------------ MockBackend ---------------------------------------------------

pub struct MockBackend {
    ca: RefCell<Option<ActualCaInfo>>,
    create_behaviour: CreateBehaviour,
    inspect_fails: Cell<bool>,
    key_missing: bool,
    inspections: Cell<usize>,
    mutations: RefCell<Vec<Mutation>>,
}

impl MockBackend {
    pub fn empty() -> Self {
        MockBackend {
            ca: RefCell::new(None),
            create_behaviour: CreateBehaviour::Honour,
            inspect_fails: Cell::new(false),
            key_missing: false,
            inspections: Cell::new(0),
            mutations: RefCell::new(vec![]),
        }
    }

    pub fn with_ca(info: ActualCaInfo) -> Self {
        let backend = Self::empty();
        backend.ca.replace(Some(info));
        backend
    }

    pub fn on_create(mut self, behaviour: CreateBehaviour) -> Self {
        self.create_behaviour = behaviour;
        self
    }

    pub fn failing_inspection(self) -> Self {
        self.inspect_fails.set(true);
        self
    }

    pub fn without_key(mut self) -> Self {
        self.key_missing = true;
        self
    }

    pub fn current(&self) -> Option<ActualCaInfo> {
        self.ca.borrow().clone()
    }

    pub fn inspections(&self) -> usize {
        self.inspections.get()
    }

    pub fn mutations(&self) -> Vec<Mutation> {
        self.mutations.borrow().clone()
    }

    fn not_found(path: &Path) -> IoError {
        IoError::new(
            format!("Could not remove file: {}", path.display()),
            io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
        )
    }
}

impl CaBackend for MockBackend {
    fn exists(&self, _name: &str, _location: Option<&Path>) -> bool {
        self.ca.borrow().is_some()
    }

    fn locate(&self, name: &str, location: Option<&Path>) -> PathBuf {
        location
            .unwrap_or(Path::new("/mock"))
            .join(name)
            .join(format!("{}_ca_cert.{}", name, CA_CERT_EXTENSION))
    }

    fn inspect(&self, path: &Path) -> Result<ActualCaInfo, BackendError> {
        self.inspections.set(self.inspections.get() + 1);
        if self.inspect_fails.get() {
            return Err(BackendError::malformed(path, "not a certificate"));
        }
        self.current()
            .ok_or_else(|| BackendError::malformed(path, "missing"))
    }

    fn create(
        &self,
        profile: &DesiredCaProfile,
        replace: bool,
    ) -> Result<ChangeRecord, BackendError> {
        self.mutations.borrow_mut().push(Mutation::Create {
            name: profile.name().to_string(),
            replace,
        });

        let path = self.locate(profile.name(), profile.storage_location());
        let wanted = ca_info(profile.subject().clone(), profile.expiry().date());

        match self.create_behaviour {
            CreateBehaviour::Honour => {
                if self.ca.borrow().is_some() && !replace {
                    return Ok(ChangeRecord::empty());
                }
                self.ca.replace(Some(wanted));
            }
            CreateBehaviour::NothingChanged => return Ok(ChangeRecord::empty()),
            CreateBehaviour::KeepCommonName => {
                let mut subject = profile.subject().clone();
                match self
                    .current()
                    .and_then(|ca| {
                        ca.subject()
                            .get(SubjectField::CommonName)
                            .map(ToString::to_string)
                    }) {
                    Some(cn) => subject.set(SubjectField::CommonName, cn),
                    None => subject.unset(SubjectField::CommonName),
                }
                self.ca.replace(Some(ca_info(subject, profile.expiry().date())));
            }
            CreateBehaviour::Vanish => {
                self.ca.replace(None);
            }
            CreateBehaviour::Corrupt => {
                self.ca.replace(Some(wanted));
                self.inspect_fails.set(true);
            }
            CreateBehaviour::Fail => {
                return Err(BackendError::UnsupportedDigest(
                    profile.digest().to_string(),
                ));
            }
        }

        Ok(ChangeRecord::empty()
            .with("certificate", path.display())
            .with("private_key", path.with_extension(CA_KEY_EXTENSION).display()))
    }

    fn remove_file(&self, path: &Path) -> Result<(), IoError> {
        self.mutations
            .borrow_mut()
            .push(Mutation::Remove(path.to_path_buf()));

        let is_key = path.extension().and_then(|e| e.to_str())
            == Some(CA_KEY_EXTENSION);

        if is_key {
            if self.key_missing {
                return Err(Self::not_found(path));
            }
        } else if self.ca.replace(None).is_none() {
            return Err(Self::not_found(path));
        }
        Ok(())
    }
}
