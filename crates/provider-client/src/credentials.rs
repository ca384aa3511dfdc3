// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Credential lookup and per-attempt credential bundles
//!
//! Credentials are acquired and refreshed elsewhere. The resolution side only
//! asks a [`CredentialStore`] whether each required kind is present and hands
//! the resulting [`CredentialBundle`] to the provider. Secret values never
//! appear in `Debug` output.

use std::{
    collections::{BTreeSet, HashMap},
    fmt,
};

use shared_types::CredentialKind;

/// One credential value
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// OAuth bearer token
    OAuth {
        /// Access token sent as `Authorization: Bearer`
        access_token: String,
    },
    /// Browser session cookies
    Cookies {
        /// The `li_at` session cookie
        li_at: String,
        /// The `JSESSIONID` cookie, also used as CSRF token
        jsessionid: Option<String>,
    },
    /// Marketplace API key
    ApiKey {
        /// Key sent in the marketplace auth header
        key: String,
    },
}

impl Credential {
    /// Build an OAuth credential
    pub fn oauth(access_token: impl Into<String>) -> Self {
        Self::OAuth {
            access_token: access_token.into(),
        }
    }

    /// Build a cookie-session credential
    pub fn cookies(li_at: impl Into<String>, jsessionid: Option<String>) -> Self {
        Self::Cookies {
            li_at: li_at.into(),
            jsessionid,
        }
    }

    /// Build an API key credential
    pub fn api_key(key: impl Into<String>) -> Self {
        Self::ApiKey { key: key.into() }
    }

    /// The family this credential belongs to
    pub const fn kind(&self) -> CredentialKind {
        match self {
            Self::OAuth { .. } => CredentialKind::OAuth,
            Self::Cookies { .. } => CredentialKind::Cookies,
            Self::ApiKey { .. } => CredentialKind::ApiKey,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential::{}(<redacted>)", self.kind())
    }
}

/// Source of already-valid credentials
pub trait CredentialStore: Send + Sync {
    /// Look up the credential of the given kind, if one is configured
    fn lookup(&self, kind: CredentialKind) -> Option<Credential>;

    /// Whether a credential of the given kind is configured
    fn has(&self, kind: CredentialKind) -> bool {
        self.lookup(kind).is_some()
    }
}

/// In-memory credential store loaded once at startup
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    entries: HashMap<CredentialKind, Credential>,
}

impl StaticCredentials {
    /// Add or replace a credential
    #[must_use]
    pub fn with(mut self, credential: Credential) -> Self {
        self.entries.insert(credential.kind(), credential);
        self
    }

    /// Add a credential when one is available
    #[must_use]
    pub fn with_optional(self, credential: Option<Credential>) -> Self {
        match credential {
            Some(credential) => self.with(credential),
            None => self,
        }
    }

    /// Configured credential kinds
    pub fn kinds(&self) -> BTreeSet<CredentialKind> {
        self.entries.keys().copied().collect()
    }
}

impl CredentialStore for StaticCredentials {
    fn lookup(&self, kind: CredentialKind) -> Option<Credential> {
        self.entries.get(&kind).cloned()
    }
}

/// The credentials handed to one provider attempt
#[derive(Debug, Clone, Default)]
pub struct CredentialBundle {
    credentials: HashMap<CredentialKind, Credential>,
}

impl CredentialBundle {
    /// Collect every required credential from `store`
    ///
    /// # Errors
    ///
    /// Returns the missing kinds, in order, when any required kind is absent.
    pub fn collect<S>(
        store: &S,
        required: &BTreeSet<CredentialKind>,
    ) -> Result<Self, Vec<CredentialKind>>
    where
        S: CredentialStore + ?Sized,
    {
        let mut credentials = HashMap::with_capacity(required.len());
        let mut missing = Vec::new();

        for kind in required {
            match store.lookup(*kind) {
                Some(credential) => {
                    credentials.insert(*kind, credential);
                }
                None => missing.push(*kind),
            }
        }

        if missing.is_empty() {
            Ok(Self { credentials })
        } else {
            Err(missing)
        }
    }

    /// Credential of the given kind
    pub fn get(&self, kind: CredentialKind) -> Option<&Credential> {
        self.credentials.get(&kind)
    }

    /// The API key value, if present
    pub fn api_key(&self) -> Option<&str> {
        match self.get(CredentialKind::ApiKey)? {
            Credential::ApiKey { key } => Some(key),
            _ => None,
        }
    }

    /// The OAuth access token, if present
    pub fn oauth_token(&self) -> Option<&str> {
        match self.get(CredentialKind::OAuth)? {
            Credential::OAuth { access_token } => Some(access_token),
            _ => None,
        }
    }

    /// The session cookies `(li_at, jsessionid)`, if present
    pub fn cookies(&self) -> Option<(&str, Option<&str>)> {
        match self.get(CredentialKind::Cookies)? {
            Credential::Cookies { li_at, jsessionid } => Some((li_at, jsessionid.as_deref())),
            _ => None,
        }
    }
}
