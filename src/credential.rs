//! Credential resolution: which API key, and which provider endpoint.
//!
//! Two deployment modes exist and both sit behind [`CredentialResolver`]:
//!
//! * [`ServerManagedCredential`]: one key configured at startup. A missing
//!   key is a deployment error (HTTP 500), never the caller's fault.
//! * [`CallerSuppliedCredential`]: every request brings its own key in a
//!   header. A missing key is the caller's error (HTTP 401) and there is no
//!   fallback to any server default.
//!
//! Endpoint selection is a pure suffix test on the key: DeepL free-tier keys
//! end in `:fx` and must be sent to the free API host.

use crate::config::{CredentialMode, ServiceConfig, SERVER_KEY_ENV};
use crate::error::TranslateError;
use std::fmt;
use std::sync::Arc;

/// Suffix marking a free-tier account key.
pub const FREE_TIER_SUFFIX: &str = ":fx";

/// Provider account tier, derived from the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderTier {
    Free,
    Paid,
}

/// An API key. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a key, rejecting blank input.
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        let key = key.trim();
        if key.is_empty() {
            None
        } else {
            Some(Self(key.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn tier(&self) -> ProviderTier {
        tier_for(&self.0)
    }

    /// Value for the provider's `Authorization` header.
    pub fn authorization(&self) -> String {
        format!("DeepL-Auth-Key {}", self.0)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Classify a key by its suffix. No network involved.
pub fn tier_for(key: &str) -> ProviderTier {
    if key.trim_end().ends_with(FREE_TIER_SUFFIX) {
        ProviderTier::Free
    } else {
        ProviderTier::Paid
    }
}

/// The two base URLs of the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub free: String,
    pub paid: String,
}

impl Endpoints {
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            free: config.free_base_url.clone(),
            paid: config.paid_base_url.clone(),
        }
    }

    pub fn base_url(&self, tier: ProviderTier) -> &str {
        match tier {
            ProviderTier::Free => &self.free,
            ProviderTier::Paid => &self.paid,
        }
    }
}

/// A key paired with the base URL it must be sent to.
#[derive(Debug, Clone)]
pub struct ResolvedCredential {
    pub credential: Credential,
    pub base_url: String,
}

impl ResolvedCredential {
    pub fn new(credential: Credential, endpoints: &Endpoints) -> Self {
        let base_url = endpoints.base_url(credential.tier()).to_string();
        Self {
            credential,
            base_url,
        }
    }

    /// Join a provider path (e.g. `/document`) onto the base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Picks the credential for one request.
pub trait CredentialResolver: Send + Sync {
    /// Resolve using the key the caller sent, if any.
    fn resolve(&self, supplied: Option<&str>) -> Result<ResolvedCredential, TranslateError>;

    fn mode(&self) -> CredentialMode;
}

/// Server-held key, read once at startup.
pub struct ServerManagedCredential {
    key: Option<Credential>,
    endpoints: Endpoints,
}

impl ServerManagedCredential {
    pub fn new(key: Option<&str>, endpoints: Endpoints) -> Self {
        Self {
            key: key.and_then(Credential::new),
            endpoints,
        }
    }
}

impl CredentialResolver for ServerManagedCredential {
    fn resolve(&self, _supplied: Option<&str>) -> Result<ResolvedCredential, TranslateError> {
        match self.key {
            Some(ref key) => Ok(ResolvedCredential::new(key.clone(), &self.endpoints)),
            None => Err(TranslateError::ServerKeyNotConfigured {
                env_var: SERVER_KEY_ENV.to_string(),
            }),
        }
    }

    fn mode(&self) -> CredentialMode {
        CredentialMode::ServerManaged
    }
}

/// Per-request key forwarded by the caller.
pub struct CallerSuppliedCredential {
    header: String,
    endpoints: Endpoints,
}

impl CallerSuppliedCredential {
    pub fn new(header: impl Into<String>, endpoints: Endpoints) -> Self {
        Self {
            header: header.into(),
            endpoints,
        }
    }
}

impl CredentialResolver for CallerSuppliedCredential {
    fn resolve(&self, supplied: Option<&str>) -> Result<ResolvedCredential, TranslateError> {
        supplied
            .and_then(Credential::new)
            .map(|key| ResolvedCredential::new(key, &self.endpoints))
            .ok_or_else(|| TranslateError::MissingCredential {
                header: self.header.clone(),
            })
    }

    fn mode(&self) -> CredentialMode {
        CredentialMode::CallerSupplied
    }
}

/// Build the resolver for the configured deployment mode.
pub fn resolver_for(config: &ServiceConfig) -> Arc<dyn CredentialResolver> {
    let endpoints = Endpoints::from_config(config);
    match config.credential_mode {
        CredentialMode::ServerManaged => Arc::new(ServerManagedCredential::new(
            config.server_api_key.as_deref(),
            endpoints,
        )),
        CredentialMode::CallerSupplied => Arc::new(CallerSuppliedCredential::new(
            config.api_key_header.clone(),
            endpoints,
        )),
    }
}
