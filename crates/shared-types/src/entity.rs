// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Entity kinds and resolution keys
//!
//! An [`EntityKey`] names one resolvable thing: a profile, a company, a post or
//! a search. It is the unit of caching and of in-flight deduplication, so its
//! equality is exact. Identifiers are compared byte for byte and never
//! normalised; callers that want `"Acme"` and `"acme"` to share a cache entry
//! must normalise before building the key.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The category of data being resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// A member profile
    Profile,
    /// A company or organization page
    Company,
    /// A single post or activity update
    Post,
    /// A search result page
    Search,
}

impl EntityKind {
    /// Returns the lowercase wire name of the kind
    pub const fn name(self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::Company => "company",
            Self::Post => "post",
            Self::Search => "search",
        }
    }

    /// Returns whether data of this kind goes stale quickly
    ///
    /// Volatile kinds get short cache lifetimes.
    pub const fn is_volatile(self) -> bool {
        matches!(self, Self::Post | Self::Search)
    }

    /// Returns all entity kinds
    pub const fn all() -> &'static [Self] {
        &[Self::Profile, Self::Company, Self::Post, Self::Search]
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when an entity kind string is not recognised
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntityKindParseError {
    /// The input was empty or whitespace
    #[error("entity kind cannot be empty")]
    Empty,
    /// The input did not name a known kind
    #[error("unknown entity kind: {0}")]
    Unknown(String),
}

impl FromStr for EntityKind {
    type Err = EntityKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(EntityKindParseError::Empty);
        }

        match trimmed.to_ascii_lowercase().as_str() {
            "profile" | "person" => Ok(Self::Profile),
            "company" | "organization" => Ok(Self::Company),
            "post" => Ok(Self::Post),
            "search" => Ok(Self::Search),
            _ => Err(EntityKindParseError::Unknown(s.to_string())),
        }
    }
}

/// Key identifying one resolvable entity
///
/// Keys are immutable once built. The optional sub-resource narrows the
/// entity, e.g. the `posts` of a profile or the `employees` of a company.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityKey {
    kind: EntityKind,
    identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sub_resource: Option<String>,
}

impl EntityKey {
    /// Create a key for the entity itself
    pub fn new(kind: EntityKind, identifier: impl Into<String>) -> Self {
        Self {
            kind,
            identifier: identifier.into(),
            sub_resource: None,
        }
    }

    /// Narrow the key to a sub-resource of the entity
    #[must_use]
    pub fn with_sub_resource(mut self, sub_resource: impl Into<String>) -> Self {
        self.sub_resource = Some(sub_resource.into());
        self
    }

    /// The entity kind
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// The caller-supplied identifier, verbatim
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The sub-resource, if any
    pub fn sub_resource(&self) -> Option<&str> {
        self.sub_resource.as_deref()
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.identifier)?;
        if let Some(sub) = &self.sub_resource {
            write!(f, "/{sub}")?;
        }
        Ok(())
    }
}
