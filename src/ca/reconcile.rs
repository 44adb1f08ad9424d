//! Bringing a CA on disk into the desired state.

use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
};

use log::{debug, info, warn};
use serde::Serialize;

use crate::commons::error::IoError;

use super::backend::{
    ActualCaInfo, BackendError, CaBackend, ChangeRecord, key_path,
};
use super::diff::{self, CaState, ChangeSet};
use super::expiry::ExpiryError;
use super::profile::{CaRequest, DesiredCaProfile};

//------------ ReconcilerConfig ----------------------------------------------

/// Options for a single reconciliation.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ReconcilerConfig {
    /// Only report what would be done.
    pub dry_run: bool,
}

impl ReconcilerConfig {
    pub fn dry_run() -> Self {
        ReconcilerConfig { dry_run: true }
    }
}

//------------ Outcome -------------------------------------------------------

/// The result of reconciling one CA.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Outcome {
    name: String,
    success: bool,
    changes: BTreeMap<String, String>,
    message: String,
}

impl Outcome {
    fn succeeded(name: &str, message: impl Into<String>) -> Self {
        Outcome {
            name: name.to_string(),
            success: true,
            changes: BTreeMap::new(),
            message: message.into(),
        }
    }

    fn failed(name: &str, message: impl Into<String>) -> Self {
        Outcome {
            success: false,
            ..Self::succeeded(name, message)
        }
    }

    fn from_error(name: &str, err: &ReconcileError) -> Self {
        let outcome = Self::failed(name, err.to_string());
        match err {
            ReconcileError::Removal {
                certificate_removed: true,
                ..
            } => outcome.with_change(name, "certificate removed"),
            _ => outcome,
        }
    }

    fn with_change(mut self, key: &str, value: &str) -> Self {
        self.changes.insert(key.to_string(), value.to_string());
        self
    }

    fn with_changes(mut self, record: ChangeRecord) -> Self {
        self.changes.extend(record.into_map());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn changes(&self) -> &BTreeMap<String, String> {
        &self.changes
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

//------------ Reconciler ----------------------------------------------------

/// Applies present and absent semantics for CAs kept by a backend.
///
/// Nothing is cached between calls: every call looks at the disk again.
pub struct Reconciler<B> {
    backend: B,
}

impl<B: CaBackend> Reconciler<B> {
    pub fn new(backend: B) -> Self {
        Reconciler { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Makes sure the requested CA exists and matches the request.
    ///
    /// Failures are never returned as errors but as an unsuccessful
    /// outcome.
    pub fn present(
        &self,
        request: &CaRequest,
        config: &ReconcilerConfig,
    ) -> Outcome {
        self.try_present(request, config)
            .unwrap_or_else(|e| Self::report_failure(&request.name, e))
    }

    /// Makes sure the named CA and its key are gone.
    pub fn absent(
        &self,
        name: &str,
        location: Option<&Path>,
        config: &ReconcilerConfig,
    ) -> Outcome {
        self.try_absent(name, location, config)
            .unwrap_or_else(|e| Self::report_failure(name, e))
    }

    /// Returns the current state of the named CA, if it exists.
    pub fn inspect(
        &self,
        name: &str,
        location: Option<&Path>,
    ) -> Result<Option<ActualCaInfo>, ReconcileError> {
        if !self.backend.exists(name, location) {
            return Ok(None);
        }
        let path = self.backend.locate(name, location);
        self.backend
            .inspect(&path)
            .map(Some)
            .map_err(ReconcileError::BackendInspection)
    }

    fn try_present(
        &self,
        request: &CaRequest,
        config: &ReconcilerConfig,
    ) -> Result<Outcome, ReconcileError> {
        let profile = DesiredCaProfile::from_request(request)?;
        let name = profile.name();

        match self.diff(&profile)? {
            CaState::Absent => self.create(&profile, config),
            CaState::Present(changes) if changes.is_empty() => {
                debug!("CA '{}' is up to date", name);
                Ok(Outcome::succeeded(
                    name,
                    format!("Root CA for {} exists in the correct state", name),
                ))
            }
            CaState::Present(changes) => {
                self.replace(&profile, changes, config)
            }
        }
    }

    fn create(
        &self,
        profile: &DesiredCaProfile,
        config: &ReconcilerConfig,
    ) -> Result<Outcome, ReconcileError> {
        let name = profile.name();
        if config.dry_run {
            return Ok(Outcome::succeeded(
                name,
                format!("CA certificate \"{}\" set to be added.", name),
            ));
        }

        let creation_failed = |cause| ReconcileError::BackendCreation {
            name: name.to_string(),
            replace: false,
            unmet: ChangeSet::default(),
            cause,
        };

        let record = self
            .backend
            .create(profile, false)
            .map_err(|e| creation_failed(Some(e)))?;
        if record.is_empty() {
            return Err(creation_failed(None));
        }

        info!("Created CA certificate '{}'", name);
        Ok(Outcome::succeeded(
            name,
            format!("Created CA certificate \"{}\"", name),
        )
        .with_changes(record))
    }

    fn replace(
        &self,
        profile: &DesiredCaProfile,
        changes: ChangeSet,
        config: &ReconcilerConfig,
    ) -> Result<Outcome, ReconcileError> {
        let name = profile.name();
        if config.dry_run {
            let mut message =
                "The following CA attributes are set to be changed:".to_string();
            for (attribute, value) in changes.iter() {
                let value = value.unwrap_or(diff::UNSET);
                message.push_str(&format!("\n{}: {}", attribute, value));
            }
            return Ok(Outcome::succeeded(name, message));
        }

        let record = match self.backend.create(profile, true) {
            Ok(record) if !record.is_empty() => record,
            Ok(_) => {
                return Err(ReconcileError::replace_failed(name, changes, None));
            }
            Err(e) => {
                return Err(ReconcileError::replace_failed(
                    name,
                    changes,
                    Some(e),
                ));
            }
        };
        info!("Replaced CA certificate '{}'", name);

        match self.diff(profile)? {
            CaState::Present(residual) if residual.is_empty() => {
                Ok(Outcome::succeeded(
                    name,
                    format!("Replaced CA certificate \"{}\"", name),
                )
                .with_changes(record))
            }
            CaState::Present(residual) => {
                warn!(
                    "CA '{}' was replaced but still differs: {}",
                    name, residual
                );
                Ok(Outcome::failed(
                    name,
                    format!("These values could not be changed: {}", residual),
                )
                .with_changes(record))
            }
            CaState::Absent => {
                Err(ReconcileError::replace_failed(name, changes, None))
            }
        }
    }

    fn try_absent(
        &self,
        name: &str,
        location: Option<&Path>,
        config: &ReconcilerConfig,
    ) -> Result<Outcome, ReconcileError> {
        if !self.backend.exists(name, location) {
            return Ok(Outcome::succeeded(
                name,
                format!("CA certificate \"{}\" is not present", name),
            ));
        }
        if config.dry_run {
            return Ok(Outcome::succeeded(
                name,
                format!("CA certificate \"{}\" set to be removed", name),
            ));
        }

        let cert = self.backend.locate(name, location);
        let key = key_path(&cert);

        self.backend.remove_file(&cert).map_err(|cause| {
            ReconcileError::Removal {
                name: name.to_string(),
                path: cert.clone(),
                cause,
                certificate_removed: false,
            }
        })?;
        self.backend.remove_file(&key).map_err(|cause| {
            ReconcileError::Removal {
                name: name.to_string(),
                path: key.clone(),
                cause,
                certificate_removed: true,
            }
        })?;

        info!("Removed CA certificate '{}' and its key", name);
        Ok(Outcome::succeeded(
            name,
            format!(
                "Removed CA certificate \"{}\" and private key \"{}\"",
                cert.display(),
                key.display()
            ),
        )
        .with_change(name, "removed"))
    }

    fn diff(
        &self,
        profile: &DesiredCaProfile,
    ) -> Result<CaState, ReconcileError> {
        diff::diff(profile, &self.backend)
            .map_err(ReconcileError::BackendInspection)
    }

    fn report_failure(name: &str, err: ReconcileError) -> Outcome {
        warn!("Reconciling CA '{}' failed: {}", name, err);
        Outcome::from_error(name, &err)
    }
}

//------------ ReconcileError ------------------------------------------------

#[derive(Debug)]
pub enum ReconcileError {
    InvalidExpiryFormat(ExpiryError),

    BackendInspection(BackendError),

    /// Creating or replacing a CA did not change anything.
    BackendCreation {
        name: String,
        replace: bool,
        unmet: ChangeSet,
        cause: Option<BackendError>,
    },

    /// A file could not be removed. If it was the key, the certificate
    /// is already gone.
    Removal {
        name: String,
        path: PathBuf,
        cause: IoError,
        certificate_removed: bool,
    },
}

impl ReconcileError {
    fn replace_failed(
        name: &str,
        unmet: ChangeSet,
        cause: Option<BackendError>,
    ) -> Self {
        ReconcileError::BackendCreation {
            name: name.to_string(),
            replace: true,
            unmet,
            cause,
        }
    }
}

impl fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ReconcileError::InvalidExpiryFormat(e) => e.fmt(f),
            ReconcileError::BackendInspection(e) => {
                write!(f, "Could not inspect CA certificate: {}", e)
            }
            ReconcileError::BackendCreation {
                name,
                replace,
                unmet,
                cause,
            } => {
                let action = if *replace { "replace" } else { "create" };
                write!(f, "Failed to {} CA certificate \"{}\"", action, name)?;
                if let Some(cause) = cause {
                    write!(f, ": {}", cause)?;
                }
                if !unmet.is_empty() {
                    write!(f, ". Unmet changes: {}", unmet)?;
                }
                Ok(())
            }
            ReconcileError::Removal {
                name,
                path,
                cause,
                certificate_removed,
            } => {
                if *certificate_removed {
                    write!(
                        f,
                        "Removed CA certificate \"{}\" but not its private key \
                         '{}': {}",
                        name,
                        path.display(),
                        cause
                    )
                } else {
                    write!(
                        f,
                        "Failed to remove CA certificate \"{}\": {}",
                        name, cause
                    )
                }
            }
        }
    }
}

impl std::error::Error for ReconcileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReconcileError::InvalidExpiryFormat(e) => Some(e),
            ReconcileError::BackendInspection(e) => Some(e),
            ReconcileError::BackendCreation { cause, .. } => {
                cause
                    .as_ref()
                    .map(|e| e as &(dyn std::error::Error + 'static))
            }
            ReconcileError::Removal { cause, .. } => Some(cause),
        }
    }
}

impl From<ExpiryError> for ReconcileError {
    fn from(e: ExpiryError) -> Self {
        ReconcileError::InvalidExpiryFormat(e)
    }
}

//------------ Tests ---------------------------------------------------------
