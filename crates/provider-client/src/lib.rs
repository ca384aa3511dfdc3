// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Provider abstractions for professional-network data backends
//!
//! This crate defines the single contract every data source implements, so the
//! resolution engine can rank, gate and account for heterogeneous backends
//! uniformly.
//!
//! # Core Abstractions
//!
//! - **`Provider` Trait**: one canonical operation, resolve an [`EntityKey`] into a payload
//! - **`ProviderDescriptor`**: static name, rank, credential requirements and capabilities
//! - **`FailureKind`**: the closed taxonomy every transport failure is classified into
//! - **Credentials**: [`CredentialStore`] lookups assembled into a per-call [`CredentialBundle`]
//!
//! Providers only transport and classify. Fallback, caching, retries and rate
//! accounting belong to the caller.

use std::fmt::Debug;

use async_trait::async_trait;
use shared_types::EntityKey;

pub mod credentials;
pub mod descriptor;
pub mod failure;

pub use credentials::{Credential, CredentialBundle, CredentialStore, StaticCredentials};
pub use descriptor::ProviderDescriptor;
pub use failure::FailureKind;

/// Opaque provider response body
pub type Payload = serde_json::Value;

/// A data source capable of resolving a subset of entity kinds
///
/// Implementations must not retry, fall back, cache or rate-limit on their own.
/// Timeouts are enforced by the caller; a provider may still map its own
/// transport timeout to [`FailureKind::Timeout`].
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Static description of this provider
    fn descriptor(&self) -> &ProviderDescriptor;

    /// Resolve `key` using the supplied credentials
    ///
    /// The bundle always contains every credential kind listed in
    /// [`ProviderDescriptor::requires`].
    ///
    /// # Errors
    ///
    /// Returns the classified [`FailureKind`] when the backend does not yield
    /// a usable payload.
    async fn fetch(&self, key: &EntityKey, credentials: &CredentialBundle)
    -> Result<Payload, FailureKind>;

    /// Shorthand for the descriptor's name
    fn name(&self) -> &str {
        self.descriptor().name()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use shared_types::{CredentialKind, EntityKind};

    use super::*;

    #[derive(Debug)]
    struct EchoProvider {
        descriptor: ProviderDescriptor,
    }

    #[async_trait]
    impl Provider for EchoProvider {
        fn descriptor(&self) -> &ProviderDescriptor {
            &self.descriptor
        }

        async fn fetch(
            &self,
            key: &EntityKey,
            credentials: &CredentialBundle,
        ) -> Result<Payload, FailureKind> {
            let key_present = credentials.api_key().is_some();
            Ok(serde_json::json!({ "id": key.identifier(), "authed": key_present }))
        }
    }

    #[tokio::test]
    async fn provider_is_object_safe() {
        let provider: Box<dyn Provider> = Box::new(EchoProvider {
            descriptor: ProviderDescriptor::new("echo", 1)
                .requires(CredentialKind::ApiKey)
                .capable_of(EntityKind::Profile)
                .with_timeout(Duration::from_secs(2)),
        });

        let store = StaticCredentials::default().with(Credential::api_key("k"));
        let bundle = CredentialBundle::collect(&store, provider.descriptor().required())
            .expect("api key is present");

        let payload = provider
            .fetch(&EntityKey::new(EntityKind::Profile, "jane"), &bundle)
            .await
            .unwrap();

        assert_eq!(provider.name(), "echo");
        assert_eq!(payload["id"], "jane");
        assert_eq!(payload["authed"], true);
    }
}
