//! Various tlsca-wide constants.


//------------ Binary Names -------------------------------------------------

/// The friendly name of the `tlsca` binary.
pub const TLSCA_APP: &str = "tlsca";


//------------ Config Files Paths -------------------------------------------

/// The default path to the tlsca config file.
///
/// The file is only read if it exists, the built-in defaults are used
/// otherwise.
pub const TLSCA_DEFAULT_CONFIG_FILE: &str = "/etc/tlsca.conf";


//------------ Environment Variables ----------------------------------------

/// The environment variable with the path to the config file.
pub const TLSCA_ENV_CONFIG: &str = "TLSCA_CONFIG";

/// The environment variable with the report format.
pub const TLSCA_ENV_FORMAT: &str = "TLSCA_FORMAT";

/// The environment variable with the log level.
///
/// The variable should contain the name of a [`log::LevelFilter`]. It will
/// be overwritten by the config file. The default is “warn.”
pub const TLSCA_ENV_LOG_LEVEL: &str = "TLSCA_LOG_LEVEL";


//------------ Storage Layout -----------------------------------------------

/// The default directory under which CAs are stored.
pub const DEFAULT_CA_STORAGE_DIR: &str = "/etc/pki";

/// The suffix appended to the CA name to form the certificate file stem.
pub const CA_CERT_FILE_SUFFIX: &str = "_ca_cert";

/// The extension of the CA certificate file.
pub const CA_CERT_EXTENSION: &str = "crt";

/// The extension of the CA private key file.
///
/// The key lives next to the certificate and shares its file stem.
pub const CA_KEY_EXTENSION: &str = "key";


//------------ CA Defaults --------------------------------------------------

/// The validity of a CA certificate if no expiry date was given.
///
/// This is roughly fifteen years.
pub const DEFAULT_CA_VALIDITY_DAYS: i64 = 5478;

/// The default RSA key size for new CAs.
pub const DEFAULT_CA_KEY_BITS: u32 = 2048;

/// The default message digest used to self-sign new CAs.
pub const DEFAULT_CA_DIGEST: &str = "sha256";
