//! Configuration and logging for the tlsca binary.

use std::{
    env, fmt, io,
    path::{Path, PathBuf},
    str::FromStr,
};

use log::LevelFilter;
use serde::{Deserialize, Deserializer, de};

use crate::{
    ca::profile::{CaRequest, Subject, SubjectField},
    commons::{error::IoError, util::file},
    constants::{
        DEFAULT_CA_DIGEST, DEFAULT_CA_KEY_BITS, DEFAULT_CA_STORAGE_DIR,
        TLSCA_APP, TLSCA_DEFAULT_CONFIG_FILE, TLSCA_ENV_LOG_LEVEL,
    },
};

//------------ ConfigDefaults ------------------------------------------------

pub struct ConfigDefaults;

impl ConfigDefaults {
    fn storage_dir() -> PathBuf {
        PathBuf::from(DEFAULT_CA_STORAGE_DIR)
    }

    fn log_type() -> LogType {
        LogType::Stderr
    }

    fn log_level() -> LevelFilter {
        match env::var(TLSCA_ENV_LOG_LEVEL) {
            Ok(level) => match LevelFilter::from_str(&level) {
                Ok(level) => level,
                Err(_) => {
                    eprintln!(
                        "Unrecognized value for log level in env var {}, \
                         using 'warn'",
                        TLSCA_ENV_LOG_LEVEL
                    );
                    LevelFilter::Warn
                }
            },
            _ => LevelFilter::Warn,
        }
    }

    fn log_file() -> PathBuf {
        PathBuf::from("./tlsca.log")
    }

    fn syslog_facility() -> String {
        "daemon".to_string()
    }

    fn bits() -> u32 {
        DEFAULT_CA_KEY_BITS
    }

    fn digest() -> String {
        DEFAULT_CA_DIGEST.to_string()
    }

    fn subject() -> Subject {
        Subject::default()
            .with(SubjectField::CommonName, "localhost")
            .with(SubjectField::Country, "US")
            .with(SubjectField::State, "Utah")
            .with(SubjectField::Locality, "Salt Lake City")
            .with(SubjectField::Organization, "SaltStack")
            .with(SubjectField::EmailAddress, "xyz@pdq.net")
    }
}

//------------ CaDefaults ----------------------------------------------------

/// Values used for CA parameters not given on the command line.
///
/// Subject fields missing from the config file take the built-in
/// defaults. A field set to an empty string is left unset.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(from = "CaDefaultsFile")]
pub struct CaDefaults {
    pub bits: u32,
    pub digest: String,
    pub subject: Subject,
}

impl Default for CaDefaults {
    fn default() -> Self {
        CaDefaults {
            bits: ConfigDefaults::bits(),
            digest: ConfigDefaults::digest(),
            subject: ConfigDefaults::subject(),
        }
    }
}

/// The `[defaults]` section as it appears in the config file.
#[derive(Deserialize)]
struct CaDefaultsFile {
    #[serde(default = "ConfigDefaults::bits")]
    bits: u32,

    #[serde(default = "ConfigDefaults::digest")]
    digest: String,

    #[serde(flatten)]
    subject: Subject,
}

impl From<CaDefaultsFile> for CaDefaults {
    fn from(file: CaDefaultsFile) -> Self {
        CaDefaults {
            bits: file.bits,
            digest: file.digest,
            subject: file.subject.or(&ConfigDefaults::subject()),
        }
    }
}

//------------ Config --------------------------------------------------------

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// The directory under which CAs are kept.
    #[serde(default = "ConfigDefaults::storage_dir")]
    pub storage_dir: PathBuf,

    #[serde(default = "ConfigDefaults::log_type")]
    pub log_type: LogType,

    #[serde(
        default = "ConfigDefaults::log_level",
        deserialize_with = "crate::commons::util::ext_serde::de_level_filter"
    )]
    pub log_level: LevelFilter,

    #[serde(default = "ConfigDefaults::log_file")]
    pub log_file: PathBuf,

    #[serde(default = "ConfigDefaults::syslog_facility")]
    pub syslog_facility: String,

    #[serde(default)]
    pub defaults: CaDefaults,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            storage_dir: ConfigDefaults::storage_dir(),
            log_type: ConfigDefaults::log_type(),
            log_level: ConfigDefaults::log_level(),
            log_file: ConfigDefaults::log_file(),
            syslog_facility: ConfigDefaults::syslog_facility(),
            defaults: CaDefaults::default(),
        }
    }
}

/// # Loading
impl Config {
    /// Loads the configuration.
    ///
    /// Without an explicit path the default config file is used if it
    /// exists. If it doesn't, the built-in defaults apply.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::parse(path),
            None => {
                let default = Path::new(TLSCA_DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::parse(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn parse(path: &Path) -> Result<Self, ConfigError> {
        let bytes = file::read(path)?;
        let content = String::from_utf8(bytes).map_err(|_| {
            ConfigError::Other(format!(
                "Config file '{}' is not valid UTF-8",
                path.display()
            ))
        })?;
        Self::parse_str(&content).map_err(|e| {
            ConfigError::Other(format!(
                "Error parsing config file: {}, error: {}",
                path.display(),
                e
            ))
        })
    }

    pub fn parse_str(s: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(s)?;
        config.verify()?;
        Ok(config)
    }

    fn verify(&self) -> Result<(), ConfigError> {
        if self.defaults.bits == 0 {
            return Err(ConfigError::other("bits must be bigger than 0"));
        }
        if self.defaults.digest.is_empty() {
            return Err(ConfigError::other("digest must not be empty"));
        }
        Ok(())
    }

    /// Starts a request for the named CA using the configured defaults.
    pub fn request(&self, name: &str) -> CaRequest {
        let mut request = CaRequest::new(name)
            .with_subject(self.defaults.subject.clone());
        request.bits = self.defaults.bits;
        request.digest = self.defaults.digest.clone();
        request
    }
}

/// # Logging
impl Config {
    pub fn init_logging(&self) -> Result<(), ConfigError> {
        match self.log_type {
            LogType::File => self.file_logger(&self.log_file),
            LogType::Stderr => self.stderr_logger(),
            LogType::Syslog => self.syslog_logger(),
        }
    }

    /// Creates a stderr logger.
    fn stderr_logger(&self) -> Result<(), ConfigError> {
        self.fern_logger().chain(io::stderr()).apply().map_err(|e| {
            ConfigError::Other(format!(
                "Failed to init stderr logging: {}",
                e
            ))
        })
    }

    /// Creates a file logger using the file provided by `path`.
    fn file_logger(&self, path: &Path) -> Result<(), ConfigError> {
        let file = fern::log_file(path).map_err(|e| {
            ConfigError::Other(format!(
                "Failed to open log file '{}': {}",
                path.display(),
                e
            ))
        })?;
        self.fern_logger().chain(file).apply().map_err(|e| {
            ConfigError::Other(format!("Failed to init file logging: {}", e))
        })
    }

    /// Creates a syslog logger and configures correctly.
    #[cfg(unix)]
    fn syslog_logger(&self) -> Result<(), ConfigError> {
        let facility = syslog::Facility::from_str(&self.syslog_facility)
            .map_err(|_| {
                ConfigError::Other(format!(
                    "Invalid syslog_facility: {}",
                    self.syslog_facility
                ))
            })?;
        let formatter = syslog::Formatter3164 {
            facility,
            hostname: None,
            process: TLSCA_APP.to_string(),
            pid: std::process::id(),
        };
        let logger = syslog::unix(formatter.clone())
            .or_else(|_| syslog::tcp(formatter.clone(), ("127.0.0.1", 601)))
            .or_else(|_| {
                syslog::udp(formatter, ("127.0.0.1", 0), ("127.0.0.1", 514))
            })
            .map_err(|e| {
                ConfigError::Other(format!("Cannot connect to syslog: {}", e))
            })?;
        self.fern_logger().chain(logger).apply().map_err(|e| {
            ConfigError::Other(format!("Failed to init syslog: {}", e))
        })
    }

    #[cfg(not(unix))]
    fn syslog_logger(&self) -> Result<(), ConfigError> {
        Err(ConfigError::other("syslog is only supported on Unix systems"))
    }

    /// Creates and returns a fern logger.
    fn fern_logger(&self) -> fern::Dispatch {
        // file operations trace every write
        let file_level = self.log_level.min(LevelFilter::Debug);

        let show_target = self.log_level == LevelFilter::Trace
            || self.log_level == LevelFilter::Debug;

        fern::Dispatch::new()
            .format(move |out, message, record| {
                if show_target {
                    out.finish(format_args!(
                        "{} [{}] [{}] {}",
                        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                        record.level(),
                        record.target(),
                        message
                    ))
                } else {
                    out.finish(format_args!(
                        "{} [{}] {}",
                        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                        record.level(),
                        message
                    ))
                }
            })
            .level(self.log_level)
            .level_for("tlsca::commons::util::file", file_level)
    }
}

//------------ LogType -------------------------------------------------------

/// The target to log to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LogType {
    Stderr,
    File,
    Syslog,
}

impl<'de> Deserialize<'de> for LogType {
    fn deserialize<D>(d: D) -> Result<LogType, D::Error>
    where
        D: Deserializer<'de>,
    {
        let string = String::deserialize(d)?;
        match string.as_str() {
            "stderr" => Ok(LogType::Stderr),
            "file" => Ok(LogType::File),
            "syslog" => Ok(LogType::Syslog),
            _ => Err(de::Error::custom(format!(
                "expected \"stderr\", \"file\" or \"syslog\", \
                 found: \"{}\"",
                string
            ))),
        }
    }
}

//------------ ConfigError ---------------------------------------------------

#[derive(Debug)]
pub enum ConfigError {
    IoError(IoError),
    TomlError(toml::de::Error),
    Other(String),
}

impl ConfigError {
    pub fn other(s: &str) -> ConfigError {
        ConfigError::Other(s.to_string())
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => e.fmt(f),
            ConfigError::TomlError(e) => e.fmt(f),
            ConfigError::Other(s) => s.fmt(f),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<IoError> for ConfigError {
    fn from(e: IoError) -> Self {
        ConfigError::IoError(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::TomlError(e)
    }
}

//------------ Tests ---------------------------------------------------------
