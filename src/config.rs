//! Configuration for the translation service.
//!
//! Everything the server and the CLI can tune lives in [`ServiceConfig`],
//! built through [`ServiceConfigBuilder`]. The config is read once at
//! startup and then shared read-only, including the server-held API key in
//! [`CredentialMode::ServerManaged`] deployments.

use crate::error::TranslateError;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// DeepL free-tier API base URL (keys ending in `:fx`).
pub const DEFAULT_FREE_BASE_URL: &str = "https://api-free.deepl.com/v2";

/// DeepL paid-tier API base URL.
pub const DEFAULT_PAID_BASE_URL: &str = "https://api.deepl.com/v2";

/// Request header carrying the caller's key in caller-supplied mode.
pub const DEFAULT_API_KEY_HEADER: &str = "X-DeepL-API-Key";

/// Environment variable holding the key in server-managed mode.
pub const SERVER_KEY_ENV: &str = "DEEPL_API_KEY";

/// Where the provider credential comes from. Chosen per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CredentialMode {
    /// One key, configured at startup, used for every request.
    ServerManaged,
    /// Each request brings its own key in a header. (default)
    #[default]
    CallerSupplied,
}

/// How the orchestrator polls the provider for completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Wait between two status checks. Default: 1 s.
    pub interval: Duration,
    /// Status checks before giving up with a timeout. Default: 60.
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1000),
            max_attempts: 60,
        }
    }
}

impl PollPolicy {
    /// Time spent sleeping between polls when every check comes back
    /// unfinished. There is no sleep after the final check.
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts.saturating_sub(1)
    }
}

/// Configuration for the translation service.
///
/// # Example
/// ```rust
/// use doctrans::{CredentialMode, ServiceConfig};
///
/// let config = ServiceConfig::builder()
///     .credential_mode(CredentialMode::ServerManaged)
///     .server_api_key("0000-0000:fx")
///     .max_poll_attempts(30)
///     .build()
///     .unwrap();
/// assert_eq!(config.poll.max_attempts, 30);
/// ```
#[derive(Clone)]
pub struct ServiceConfig {
    /// Server-managed or caller-supplied credentials.
    pub credential_mode: CredentialMode,

    /// Key used in server-managed mode. Never logged.
    pub server_api_key: Option<String>,

    /// Header name read in caller-supplied mode.
    pub api_key_header: String,

    /// Base URL for free-tier keys.
    pub free_base_url: String,

    /// Base URL for paid-tier keys.
    pub paid_base_url: String,

    /// Poll interval and attempt cap.
    pub poll: PollPolicy,

    /// Timeout for each individual provider HTTP call in seconds. Default: 120.
    ///
    /// This bounds one call, not the whole job; the job is bounded by
    /// [`PollPolicy::budget`].
    pub request_timeout_secs: u64,

    /// Directory for temporary artifacts. `None` uses the system temp dir.
    pub temp_dir: Option<PathBuf>,

    /// Maximum accepted upload body in bytes. Default: 30 MiB.
    pub max_upload_bytes: usize,

    /// Address the HTTP server listens on. Default: `0.0.0.0:3001`.
    pub bind_addr: SocketAddr,

    /// Allowed CORS origins. Empty allows any origin.
    pub cors_origins: Vec<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            credential_mode: CredentialMode::default(),
            server_api_key: None,
            api_key_header: DEFAULT_API_KEY_HEADER.to_string(),
            free_base_url: DEFAULT_FREE_BASE_URL.to_string(),
            paid_base_url: DEFAULT_PAID_BASE_URL.to_string(),
            poll: PollPolicy::default(),
            request_timeout_secs: 120,
            temp_dir: None,
            max_upload_bytes: 30 * 1024 * 1024,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3001)),
            cors_origins: Vec::new(),
        }
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("credential_mode", &self.credential_mode)
            .field(
                "server_api_key",
                &self.server_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("api_key_header", &self.api_key_header)
            .field("free_base_url", &self.free_base_url)
            .field("paid_base_url", &self.paid_base_url)
            .field("poll", &self.poll)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("temp_dir", &self.temp_dir)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("bind_addr", &self.bind_addr)
            .field("cors_origins", &self.cors_origins)
            .finish()
    }
}

impl ServiceConfig {
    /// Create a new builder for `ServiceConfig`.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Builder for [`ServiceConfig`].
#[derive(Debug)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    pub fn credential_mode(mut self, mode: CredentialMode) -> Self {
        self.config.credential_mode = mode;
        self
    }

    /// Set the server-held key. Blank keys are treated as absent.
    pub fn server_api_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.config.server_api_key = if key.trim().is_empty() {
            None
        } else {
            Some(key.trim().to_string())
        };
        self
    }

    pub fn api_key_header(mut self, header: impl Into<String>) -> Self {
        self.config.api_key_header = header.into();
        self
    }

    pub fn free_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.free_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn paid_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.paid_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll.interval = Duration::from_millis(ms);
        self
    }

    pub fn max_poll_attempts(mut self, n: u32) -> Self {
        self.config.poll.max_attempts = n;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.temp_dir = Some(dir.into());
        self
    }

    pub fn max_upload_bytes(mut self, n: usize) -> Self {
        self.config.max_upload_bytes = n;
        self
    }

    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.config.bind_addr = addr;
        self
    }

    pub fn cors_origins(mut self, origins: Vec<String>) -> Self {
        self.config.cors_origins = origins;
        self
    }

    /// Build the configuration, validating constraints.
    ///
    /// A missing server key is *not* a build error: the server still starts
    /// and answers every credentialed request with a configuration error, so
    /// `/health` keeps working while the deployment is being fixed.
    pub fn build(self) -> Result<ServiceConfig, TranslateError> {
        let c = &self.config;
        if c.poll.max_attempts == 0 {
            return Err(TranslateError::InvalidConfig(
                "Max poll attempts must be ≥ 1".into(),
            ));
        }
        for (name, url) in [("free", &c.free_base_url), ("paid", &c.paid_base_url)] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(TranslateError::InvalidConfig(format!(
                    "{name} base URL must be an HTTP/HTTPS URL, got '{url}'"
                )));
            }
        }
        if axum::http::HeaderName::from_bytes(c.api_key_header.as_bytes()).is_err() {
            return Err(TranslateError::InvalidConfig(format!(
                "'{}' is not a valid header name",
                c.api_key_header
            )));
        }
        if let Some(bad) = c
            .cors_origins
            .iter()
            .find(|o| axum::http::HeaderValue::from_str(o).is_err())
        {
            return Err(TranslateError::InvalidConfig(format!(
                "'{bad}' is not a valid CORS origin"
            )));
        }
        if c.max_upload_bytes == 0 {
            return Err(TranslateError::InvalidConfig(
                "Upload limit must be ≥ 1 byte".into(),
            ));
        }
        Ok(self.config)
    }
}
