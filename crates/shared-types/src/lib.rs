// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Shared types for the network resolver
//!
//! This crate provides the vocabulary shared by the provider adapters, the
//! resolution engine and the HTTP service: what is being resolved
//! ([`EntityKind`], [`EntityKey`]) and which credential families a backend
//! needs ([`CredentialKind`]).

pub mod credentials;
pub mod entity;

pub use credentials::{CredentialKind, CredentialKindParseError};
pub use entity::{EntityKey, EntityKind, EntityKindParseError};
