// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Non-empty string validation for adapter settings
//!
//! Base URLs, API versions and similar settings are meaningless when blank.
//! [`NonEmptyString`] makes that state unrepresentable: it can only be built
//! through validation, including when deserialised from a config file.
//!
//! ```rust
//! use providers::NonEmptyString;
//!
//! let version = NonEmptyString::new("202501").expect("valid version");
//! assert_eq!(version.as_str(), "202501");
//!
//! assert!(NonEmptyString::new("   ").is_err());
//! ```

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A string with at least one non-whitespace character
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NonEmptyString(Box<str>);

impl NonEmptyString {
    /// Validate and wrap `s`
    ///
    /// Leading and trailing whitespace is kept; only blank input is rejected.
    pub fn new(s: impl Into<String>) -> Result<Self, String> {
        let s = s.into();
        if s.trim().is_empty() {
            Err("String cannot be empty or whitespace-only".to_string())
        } else {
            Ok(Self(s.into_boxed_str()))
        }
    }

    /// The contained value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NonEmptyString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for NonEmptyString {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for NonEmptyString {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0.into_string()
    }
}

impl AsRef<str> for NonEmptyString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_input() {
        assert!(NonEmptyString::new("").is_err());
        assert!(NonEmptyString::new(" \t\n").is_err());
        assert_eq!(NonEmptyString::new(" a ").unwrap().as_str(), " a ");
    }

    #[test]
    fn deserialisation_validates() {
        let parsed: NonEmptyString = serde_json::from_str("\"202501\"").unwrap();
        assert_eq!(parsed.to_string(), "202501");
        assert!(serde_json::from_str::<NonEmptyString>("\"  \"").is_err());
    }
}
