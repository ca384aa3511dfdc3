// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0
#![allow(missing_docs, dead_code)]

//! In-process providers and a running test server

use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use api::{Server, ServerConfig, ShutdownConfig};
use async_trait::async_trait;
use provider_client::{
    Credential, CredentialBundle, FailureKind, Payload, Provider, ProviderDescriptor,
    StaticCredentials,
};
use resolution_engine::{EngineConfig, ResolutionEngine};
use serde_json::json;
use shared_types::{CredentialKind, EntityKey, EntityKind};
use tokio_util::sync::CancellationToken;

/// Provider that always answers or always fails the same way
#[derive(Debug)]
pub struct FakeProvider {
    descriptor: ProviderDescriptor,
    failure: Option<FailureKind>,
    calls: AtomicUsize,
}

impl FakeProvider {
    pub fn answering(name: &str, rank: u32) -> Self {
        Self::new(name, rank, None)
    }

    pub fn failing(name: &str, rank: u32, kind: FailureKind) -> Self {
        Self::new(name, rank, Some(kind))
    }

    fn new(name: &str, rank: u32, failure: Option<FailureKind>) -> Self {
        Self {
            descriptor: ProviderDescriptor::new(name, rank)
                .capable_of_all([EntityKind::Profile, EntityKind::Company])
                .with_timeout(Duration::from_secs(2)),
            failure,
            calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn requiring(mut self, kind: CredentialKind) -> Self {
        self.descriptor = self.descriptor.requires(kind);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for FakeProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn fetch(
        &self,
        key: &EntityKey,
        _credentials: &CredentialBundle,
    ) -> Result<Payload, FailureKind> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.failure {
            Some(kind) => Err(kind),
            None => Ok(json!({
                "source": self.descriptor.name(),
                "identifier": key.identifier(),
                "sub_resource": key.sub_resource(),
            })),
        }
    }
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub token: CancellationToken,
    pub client: reqwest::Client,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Start a server over `providers` with an API key configured
pub async fn start(providers: &[Arc<FakeProvider>]) -> TestServer {
    let engine = ResolutionEngine::builder(EngineConfig::default())
        .providers(
            providers
                .iter()
                .map(|provider| Arc::clone(provider) as Arc<dyn Provider>),
        )
        .credentials(Arc::new(
            StaticCredentials::default().with(Credential::api_key("test-key")),
        ))
        .build()
        .expect("Failed to build engine");

    let (addr, token) =
        Server::with_engine(ServerConfig::for_testing(), ShutdownConfig::default(), engine)
            .expect("Failed to create server")
            .run_for_testing()
            .await
            .expect("Failed to start test server");

    TestServer {
        addr,
        token,
        client: reqwest::Client::new(),
    }
}
