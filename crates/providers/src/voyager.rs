// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Internal web API reached with browser session cookies
//!
//! Two flavours share this client. The enhanced flavour presents a full
//! desktop Chrome fingerprint and uses the `dash` endpoints; its descriptor
//! asks the engine to space calls out with jitter. The plain session flavour
//! is the last resort: older endpoints, fewer headers, no spacing.

use std::time::Duration;

use async_trait::async_trait;
use provider_client::{CredentialBundle, FailureKind, Payload, Provider, ProviderDescriptor};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use shared_types::{CredentialKind, EntityKey, EntityKind};
use tracing::debug;

use crate::{
    error::{ProviderError, classify},
    http::{Surface, build_client, classify_landing, endpoint_url, first_element, is_empty, read_json},
    linkedin::{activity_urn, slug},
    non_empty_string::NonEmptyString,
};

const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";
const NORMALIZED_JSON: &str = "application/vnd.linkedin.normalized+json+2.1";
const RESTLI_PROTOCOL_VERSION: &str = "2.0.0";
const CLIENT_TRACKING: &str = r#"{"clientVersion":"1.13.22","mpVersion":"v2","osName":"web","timezoneOffset":-5,"timezone":"America/New_York","deviceFormFactor":"DESKTOP","mpName":"voyager-web","displayDensity":2,"displayWidth":2560,"displayHeight":1440}"#;

const BROWSER_HEADERS: [(&str, &str); 12] = [
    ("accept-language", "en-US,en;q=0.9"),
    ("x-li-lang", "en_US"),
    ("x-li-page-instance", "urn:li:page:feed_index_index;"),
    ("x-li-track", CLIENT_TRACKING),
    ("sec-ch-ua", r#""Google Chrome";v="131", "Chromium";v="131", "Not_A Brand";v="24""#),
    ("sec-ch-ua-mobile", "?0"),
    ("sec-ch-ua-platform", r#""macOS""#),
    ("sec-fetch-dest", "empty"),
    ("sec-fetch-mode", "cors"),
    ("sec-fetch-site", "same-origin"),
    ("cache-control", "no-cache"),
    ("pragma", "no-cache"),
];

const PROFILE_DECORATION: &str = "com.linkedin.voyager.dash.deco.identity.profile.WebTopCardCore-16";
const COMPANY_DECORATION: &str = "com.linkedin.voyager.deco.organization.web.WebFullCompanyMain-12";
const PAGE_SIZE: &str = "10";

const ENHANCED_MIN_INTERVAL: Duration = Duration::from_secs(1);
const ENHANCED_MAX_JITTER: Duration = Duration::from_millis(1500);

/// Which face of the web API a client presents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoyagerFlavour {
    /// Browser fingerprint, `dash` endpoints, spaced calls
    Enhanced,
    /// Plain session calls against the older endpoints
    Session,
}

/// Configuration for a session-cookie client
#[derive(Debug, Clone)]
pub struct VoyagerConfig {
    /// Base URL of the internal API, e.g. `https://www.linkedin.com/voyager/api`
    pub base_url: NonEmptyString,
    /// Transport timeout in seconds
    pub timeout_seconds: u64,
}

impl VoyagerConfig {
    /// Validate and build a config
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is blank
    pub fn new(base_url: impl Into<String>, timeout_seconds: u64) -> Result<Self, String> {
        Ok(Self {
            base_url: NonEmptyString::new(base_url)?,
            timeout_seconds,
        })
    }
}

/// How the payload is taken out of a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Extract {
    Whole,
    FirstElement,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct VoyagerRequest {
    segments: Vec<String>,
    query: Vec<(&'static str, String)>,
    extract: Extract,
}

impl VoyagerRequest {
    fn new(segments: &[&str]) -> Self {
        Self {
            segments: segments.iter().map(|segment| (*segment).to_string()).collect(),
            query: Vec::new(),
            extract: Extract::Whole,
        }
    }

    fn param(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.query.push((name, value.into()));
        self
    }

    fn first_element(mut self) -> Self {
        self.extract = Extract::FirstElement;
        self
    }
}

/// Client for the internal web API
#[derive(Debug)]
pub struct VoyagerClient {
    client: Client,
    config: VoyagerConfig,
    flavour: VoyagerFlavour,
    descriptor: ProviderDescriptor,
}

impl VoyagerClient {
    /// Registered name of the enhanced flavour
    pub const ENHANCED_NAME: &'static str = "enhanced";
    /// Default rank of the enhanced flavour
    pub const ENHANCED_RANK: u32 = 4;
    /// Registered name of the plain session flavour
    pub const SESSION_NAME: &'static str = "voyager";
    /// Default rank of the plain session flavour
    pub const SESSION_RANK: u32 = 6;

    /// Create the enhanced flavour
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created
    pub fn enhanced(config: VoyagerConfig) -> Result<Self, ProviderError> {
        Self::new(config, VoyagerFlavour::Enhanced)
    }

    /// Create the plain session flavour
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created
    pub fn session(config: VoyagerConfig) -> Result<Self, ProviderError> {
        Self::new(config, VoyagerFlavour::Session)
    }

    fn new(config: VoyagerConfig, flavour: VoyagerFlavour) -> Result<Self, ProviderError> {
        let timeout = Duration::from_secs(config.timeout_seconds);
        let client = build_client(timeout, Some(CHROME_USER_AGENT))?;

        let descriptor = match flavour {
            VoyagerFlavour::Enhanced => {
                ProviderDescriptor::new(Self::ENHANCED_NAME, Self::ENHANCED_RANK)
                    .capable_of_all(EntityKind::all().iter().copied())
                    .with_spacing(ENHANCED_MIN_INTERVAL, ENHANCED_MAX_JITTER)
            }
            VoyagerFlavour::Session => {
                ProviderDescriptor::new(Self::SESSION_NAME, Self::SESSION_RANK).capable_of_all([
                    EntityKind::Profile,
                    EntityKind::Company,
                    EntityKind::Search,
                ])
            }
        };
        let descriptor = descriptor
            .requires(CredentialKind::Cookies)
            .with_timeout(timeout);

        Ok(Self {
            client,
            config,
            flavour,
            descriptor,
        })
    }

    /// Which flavour this client presents
    pub fn flavour(&self) -> VoyagerFlavour {
        self.flavour
    }

    fn name(&self) -> &'static str {
        match self.flavour {
            VoyagerFlavour::Enhanced => Self::ENHANCED_NAME,
            VoyagerFlavour::Session => Self::SESSION_NAME,
        }
    }

    async fn lookup(
        &self,
        key: &EntityKey,
        credentials: &CredentialBundle,
    ) -> Result<Payload, ProviderError> {
        let (li_at, jsessionid) = credentials
            .cookies()
            .ok_or(ProviderError::MissingCredential(CredentialKind::Cookies))?;
        let request = route(self.flavour, key)?;

        let segments: Vec<&str> = request.segments.iter().map(String::as_str).collect();
        let url = endpoint_url(&self.config.base_url, &segments)?;
        debug!(provider = self.name(), %url, "calling session API");

        let builder = self
            .authenticate(self.client.get(url).query(&request.query), li_at, jsessionid);
        let response = builder.send().await.map_err(ProviderError::from_transport)?;
        if let Some(error) = classify_landing(response.url().path(), response.status().as_u16()) {
            return Err(error);
        }

        let body = read_json(response, Surface::Session).await?;
        match request.extract {
            Extract::FirstElement => first_element(body, "elements"),
            Extract::Whole => non_empty(body),
        }
    }

    fn authenticate(
        &self,
        builder: RequestBuilder,
        li_at: &str,
        jsessionid: Option<&str>,
    ) -> RequestBuilder {
        let mut cookie = format!("li_at={li_at}");
        let mut builder = builder
            .header("accept", NORMALIZED_JSON)
            .header("x-restli-protocol-version", RESTLI_PROTOCOL_VERSION);

        if let Some(jsessionid) = jsessionid {
            let bare = jsessionid.trim_matches('"');
            cookie.push_str(&format!("; JSESSIONID=\"{bare}\""));
            builder = builder.header("csrf-token", bare);
        }
        if self.flavour == VoyagerFlavour::Enhanced {
            for (name, value) in BROWSER_HEADERS {
                builder = builder.header(name, value);
            }
        }
        builder.header("cookie", cookie)
    }
}

fn non_empty(body: Value) -> Result<Value, ProviderError> {
    let elements_empty = body
        .get("elements")
        .is_some_and(is_empty);
    if is_empty(&body) || elements_empty {
        return Err(ProviderError::NoData);
    }
    Ok(body)
}

fn route(flavour: VoyagerFlavour, key: &EntityKey) -> Result<VoyagerRequest, ProviderError> {
    let id = key.identifier();
    let request = match (flavour, key.kind(), key.sub_resource()) {
        (VoyagerFlavour::Enhanced, EntityKind::Profile, None) => {
            VoyagerRequest::new(&["identity", "dash", "profiles"])
                .param("q", "memberIdentity")
                .param("memberIdentity", slug(id))
                .param("decorationId", PROFILE_DECORATION)
        }
        (VoyagerFlavour::Enhanced, EntityKind::Profile, Some("posts")) => {
            VoyagerRequest::new(&["feed", "updates"])
                .param("count", PAGE_SIZE)
                .param("q", "memberFeed")
                .param("memberIdentity", slug(id))
        }
        (VoyagerFlavour::Enhanced, EntityKind::Post, None) => {
            VoyagerRequest::new(&["feed", "updates", &activity_urn(id)])
        }
        (VoyagerFlavour::Session, EntityKind::Profile, None) => {
            VoyagerRequest::new(&["identity", "profiles", &slug(id), "profileView"])
        }
        (VoyagerFlavour::Session, EntityKind::Profile, Some("contact_info")) => {
            VoyagerRequest::new(&["identity", "profiles", &slug(id), "profileContactInfo"])
        }
        (VoyagerFlavour::Session, EntityKind::Profile, Some("skills")) => {
            VoyagerRequest::new(&["identity", "profiles", &slug(id), "skills"])
                .param("count", "100")
        }
        (VoyagerFlavour::Session, EntityKind::Profile, Some("network")) => {
            VoyagerRequest::new(&["identity", "profiles", &slug(id), "networkinfo"])
        }
        (VoyagerFlavour::Session, EntityKind::Company, Some("updates")) => {
            VoyagerRequest::new(&["feed", "updates"])
                .param("companyUniversalName", slug(id))
                .param("q", "companyFeedByUniversalName")
                .param("moduleKey", "member-share")
                .param("count", PAGE_SIZE)
        }
        (_, EntityKind::Company, None) => VoyagerRequest::new(&["organization", "companies"])
            .param("q", "universalName")
            .param("universalName", slug(id))
            .param("decorationId", COMPANY_DECORATION)
            .first_element(),
        (_, EntityKind::Search, None | Some("people")) => search(id, "PEOPLE"),
        (_, EntityKind::Search, Some("companies")) => search(id, "COMPANIES"),
        (_, kind, sub) => {
            return Err(ProviderError::UnsupportedRequest(match sub {
                Some(sub) => format!("{kind} sub-resource `{sub}`"),
                None => format!("{kind} lookups"),
            }));
        }
    };
    Ok(request)
}

fn search(keywords: &str, result_type: &str) -> VoyagerRequest {
    VoyagerRequest::new(&["search", "blended"])
        .param("count", PAGE_SIZE)
        .param("filters", format!("List(resultType->{result_type})"))
        .param("origin", "GLOBAL_SEARCH_HEADER")
        .param("q", "all")
        .param("keywords", keywords)
}

#[async_trait]
impl Provider for VoyagerClient {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn fetch(
        &self,
        key: &EntityKey,
        credentials: &CredentialBundle,
    ) -> Result<Payload, FailureKind> {
        self.lookup(key, credentials)
            .await
            .map_err(|error| classify(self.name(), &error))
    }
}
