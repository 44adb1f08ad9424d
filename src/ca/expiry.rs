//! Normalizing the requested expiry of a CA.

use std::fmt;

use chrono::{NaiveDate, TimeDelta, Utc};

use crate::constants::DEFAULT_CA_VALIDITY_DAYS;

//------------ Expiry --------------------------------------------------------

/// The calendar date a CA certificate should expire on.
///
/// The number of days from today is kept alongside the date because new
/// certificates are created with a validity period, whereas existing ones
/// are compared by their expiry date.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Expiry {
    date: NaiveDate,
    days: i64,
}

impl Expiry {
    /// Parses the expiry relative to the current date in UTC.
    pub fn parse(input: &str) -> Result<Self, ExpiryError> {
        Self::parse_at(input, Utc::now().date_naive())
    }

    /// Parses the expiry relative to `today`.
    ///
    /// An empty input selects the default validity. Otherwise the input
    /// must be a `YYYY-MM-DD` or `YYYYMMDD` date that exists in the
    /// calendar. Dates in the past are accepted and result in a
    /// non-positive day count.
    pub fn parse_at(input: &str, today: NaiveDate) -> Result<Self, ExpiryError> {
        if input.is_empty() {
            return Ok(Expiry {
                date: today + TimeDelta::days(DEFAULT_CA_VALIDITY_DAYS),
                days: DEFAULT_CA_VALIDITY_DAYS,
            });
        }

        let date = parse_date(input)
            .ok_or_else(|| ExpiryError::InvalidFormat(input.to_string()))?;
        let days = (date - today).num_days();

        Ok(Expiry { date, days })
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn days(&self) -> i64 {
        self.days
    }
}

impl fmt::Display for Expiry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.date.format("%Y-%m-%d"))
    }
}

/// Parses `YYYY-MM-DD` or the compact `YYYYMMDD`.
fn parse_date(input: &str) -> Option<NaiveDate> {
    if !input.is_ascii() {
        return None;
    }

    let bytes = input.as_bytes();
    let (year, month, day) = match bytes.len() {
        10 if bytes[4] == b'-' && bytes[7] == b'-' => {
            (&input[0..4], &input[5..7], &input[8..10])
        }
        8 => (&input[0..4], &input[4..6], &input[6..8]),
        _ => return None,
    };

    let all_digits = [year, month, day]
        .iter()
        .all(|part| part.bytes().all(|b| b.is_ascii_digit()));
    if !all_digits {
        return None;
    }

    NaiveDate::from_ymd_opt(
        year.parse().ok()?,
        month.parse().ok()?,
        day.parse().ok()?,
    )
}

//------------ ExpiryError ---------------------------------------------------

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ExpiryError {
    InvalidFormat(String),
}

impl fmt::Display for ExpiryError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ExpiryError::InvalidFormat(input) => {
                write!(f, "Invalid expiration date: {}", input)
            }
        }
    }
}

impl std::error::Error for ExpiryError {}

//------------ Tests ---------------------------------------------------------
