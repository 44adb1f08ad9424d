//! Commands managing a single CA.

use std::path::{Path, PathBuf};
use crate::ca::{
    CaRequest, OpenSslBackend, Reconciler, ReconcilerConfig, SubjectField,
};
use crate::cli::report::Report;
use crate::config::Config;


//-------- Location ----------------------------------------------------------

#[derive(clap::Args)]
pub struct Location {
    /// Directory to keep the CA in instead of the configured storage_dir
    #[arg(long = "cacert-path", value_name = "DIR")]
    pub cacert_path: Option<PathBuf>,
}

impl Location {
    fn path(&self) -> Option<&Path> {
        self.cacert_path.as_deref()
    }
}


//-------- Present -----------------------------------------------------------

#[derive(clap::Parser)]
pub struct Present {
    /// Name of the CA
    pub name: String,

    /// Size of the RSA key in bits
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub bits: Option<u32>,

    /// Expiry date as YYYY-MM-DD [default: 5478 days from today]
    #[arg(long, value_name = "DATE")]
    pub expires: Option<String>,

    /// Common name (CN)
    #[arg(long)]
    pub cn: Option<String>,

    /// Country (C)
    #[arg(long)]
    pub country: Option<String>,

    /// State or province (ST)
    #[arg(long)]
    pub state: Option<String>,

    /// Locality (L)
    #[arg(long)]
    pub locality: Option<String>,

    /// Organization (O), only used when the CA is created
    #[arg(long)]
    pub organization: Option<String>,

    /// Organizational unit (OU)
    #[arg(long)]
    pub ou: Option<String>,

    /// Email address (emailAddress)
    #[arg(long)]
    pub email: Option<String>,

    /// Message digest used for signing, only used when the CA is created
    #[arg(long)]
    pub digest: Option<String>,

    #[command(flatten)]
    pub location: Location,
}

impl Present {
    /// Builds the request from the configured defaults and the options.
    ///
    /// An option given as an empty string unsets the subject field.
    pub fn request(&self, config: &Config) -> CaRequest {
        let mut request = config.request(&self.name);

        if let Some(bits) = self.bits {
            request.bits = bits;
        }
        if let Some(digest) = &self.digest {
            request.digest = digest.clone();
        }
        if let Some(expires) = &self.expires {
            request.expires = expires.clone();
        }

        let fields = [
            (SubjectField::CommonName, &self.cn),
            (SubjectField::Country, &self.country),
            (SubjectField::State, &self.state),
            (SubjectField::Locality, &self.locality),
            (SubjectField::Organization, &self.organization),
            (SubjectField::OrganizationalUnit, &self.ou),
            (SubjectField::EmailAddress, &self.email),
        ];
        for (field, value) in fields {
            if let Some(value) = value {
                request.subject.set(field, value.as_str());
            }
        }

        if let Some(path) = self.location.path() {
            request = request.with_storage_location(path.to_path_buf());
        }
        request
    }

    pub fn run(
        self,
        reconciler: &Reconciler<OpenSslBackend>,
        config: &Config,
        reconciler_config: &ReconcilerConfig,
    ) -> Report {
        let request = self.request(config);
        Report::Outcome(reconciler.present(&request, reconciler_config))
    }
}


//-------- Absent ------------------------------------------------------------

#[derive(clap::Parser)]
pub struct Absent {
    /// Name of the CA
    pub name: String,

    #[command(flatten)]
    pub location: Location,
}

impl Absent {
    pub fn run(
        self,
        reconciler: &Reconciler<OpenSslBackend>,
        reconciler_config: &ReconcilerConfig,
    ) -> Report {
        Report::Outcome(reconciler.absent(
            &self.name,
            self.location.path(),
            reconciler_config,
        ))
    }
}


//-------- Show --------------------------------------------------------------

#[derive(clap::Parser)]
pub struct Show {
    /// Name of the CA
    pub name: String,

    #[command(flatten)]
    pub location: Location,
}

impl Show {
    pub fn run(self, reconciler: &Reconciler<OpenSslBackend>) -> Report {
        match reconciler.inspect(&self.name, self.location.path()) {
            Ok(Some(info)) => Report::CaInfo(info),
            Ok(None) => Report::error(format!(
                "CA certificate \"{}\" is not present",
                self.name
            )),
            Err(e) => Report::error(e),
        }
    }
}


//------------ Tests ---------------------------------------------------------
