use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const KEY_DATE_FORMAT: &str = "%Y-%m-%d";

/// Cache key of a sentiment request: the requested day.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestKey(String);

impl RequestKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self(date.format(KEY_DATE_FORMAT).to_string())
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RequestKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Derives the key for a request, reading the server's local clock when no
/// date was given.
pub fn derive_key(explicit_date: Option<&str>) -> RequestKey {
    derive_key_at(explicit_date, chrono::Local::now().date_naive())
}

/// Explicit dates are kept verbatim; a malformed one simply never matches a
/// derived key.
pub fn derive_key_at(explicit_date: Option<&str>, today: NaiveDate) -> RequestKey {
    match explicit_date {
        Some(date) => RequestKey(date.to_string()),
        None => RequestKey::from_date(today),
    }
}
