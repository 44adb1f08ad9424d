//! Formatting the results of commands for the user.

use std::{fmt, str::FromStr};

use chrono::DateTime;

use crate::ca::{ActualCaInfo, Outcome};

//------------ ReportFormat --------------------------------------------------

/// The format to use when showing results.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReportFormat {
    Text,
    Json,
}

impl FromStr for ReportFormat {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, ReportError> {
        match s {
            "text" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            _ => Err(ReportError::UnrecognisedFormat(s.to_string())),
        }
    }
}

//------------ ReportError ---------------------------------------------------

#[derive(Debug)]
pub enum ReportError {
    UnrecognisedFormat(String),
    Json(serde_json::Error),
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ReportError::UnrecognisedFormat(s) => {
                write!(f, "This report format is not recognised: {}", s)
            }
            ReportError::Json(e) => write!(f, "Cannot produce JSON: {}", e),
        }
    }
}

impl std::error::Error for ReportError {}

impl From<serde_json::Error> for ReportError {
    fn from(e: serde_json::Error) -> Self {
        ReportError::Json(e)
    }
}

//------------ Report --------------------------------------------------------

/// The result of running a command.
#[derive(Clone, Debug)]
pub enum Report {
    Outcome(Outcome),
    CaInfo(ActualCaInfo),
    Error(String),
}

impl Report {
    pub fn error(err: impl fmt::Display) -> Self {
        Report::Error(err.to_string())
    }

    /// Returns whether the command achieved what it was asked to do.
    pub fn success(&self) -> bool {
        match self {
            Report::Outcome(outcome) => outcome.success(),
            Report::CaInfo(_) => true,
            Report::Error(_) => false,
        }
    }

    pub fn render(&self, format: ReportFormat) -> Result<String, ReportError> {
        match format {
            ReportFormat::Json => self.json(),
            ReportFormat::Text => Ok(self.text()),
        }
    }

    /// Prints the report and returns the process exit status.
    ///
    /// Errors go to stderr, everything else to stdout.
    pub fn write(&self, format: ReportFormat) -> i32 {
        match (self, self.render(format)) {
            (Report::Error(_), Ok(s)) => eprintln!("{}", s),
            (_, Ok(s)) => println!("{}", s),
            (_, Err(e)) => {
                eprintln!("{}", e);
                return 1;
            }
        }
        if self.success() { 0 } else { 1 }
    }

    fn json(&self) -> Result<String, ReportError> {
        let json = match self {
            Report::Outcome(outcome) => serde_json::to_string_pretty(outcome)?,
            Report::CaInfo(info) => serde_json::to_string_pretty(info)?,
            Report::Error(msg) => {
                serde_json::to_string_pretty(&serde_json::json!({
                    "error": msg
                }))?
            }
        };
        Ok(json)
    }

    fn text(&self) -> String {
        match self {
            Report::Outcome(outcome) => {
                let mut res = String::new();
                res.push_str(&format!("Name: {}\n", outcome.name()));
                res.push_str(&format!(
                    "Result: {}\n",
                    if outcome.success() { "success" } else { "failure" }
                ));
                res.push_str(&format!("Message: {}", outcome.message()));
                if !outcome.changes().is_empty() {
                    res.push_str("\nChanges:");
                    for (key, value) in outcome.changes() {
                        res.push_str(&format!("\n  {}: {}", key, value));
                    }
                }
                res
            }
            Report::CaInfo(info) => {
                let mut res = String::new();
                res.push_str(&format!("Subject: {}\n", info.subject()));
                res.push_str(&format!("Issuer: {}\n", info.issuer()));
                res.push_str(&format!("Serial: {}\n", info.serial()));
                res.push_str(&format!(
                    "Not before: {}\n",
                    timestamp(info.not_before())
                ));
                res.push_str(&format!(
                    "Not after: {}",
                    timestamp(info.not_after())
                ));
                res
            }
            Report::Error(msg) => msg.clone(),
        }
    }
}

fn timestamp(secs: i64) -> String {
    match DateTime::from_timestamp(secs, 0) {
        Some(time) => time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => secs.to_string(),
    }
}

//------------ Tests ---------------------------------------------------------
