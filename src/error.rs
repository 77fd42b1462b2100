//! Error types for the doctrans library.
//!
//! Every failure in a translation request is a [`TranslateError`]. Variants
//! fall into five [`ErrorCategory`] groups, and each group maps onto a
//! distinct HTTP status so the boundary never has to guess:
//!
//! * **Validation**: the caller's request is malformed (no file, no target
//!   language). Detected before any provider call.
//! * **Credential**: no usable API key. A missing *caller* key (401) is kept
//!   apart from a missing *server* key (500): the first is the caller's
//!   problem, the second is a deployment problem.
//! * **Upstream**: the provider answered with a non-success status, or not
//!   at all. Provider bodies are carried verbatim and never parsed.
//! * **Timeout**: the poll budget ran out. Reported apart from upstream
//!   failures because the provider may still finish the job out-of-band.
//! * **Internal**: local failures such as temp-file I/O.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Which provider call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderStage {
    /// `POST /document`
    Upload,
    /// `POST /document/{id}`
    Status,
    /// `POST /document/{id}/result`
    Result,
    /// `GET /usage`
    Usage,
    /// `GET /languages`
    Languages,
}

impl ProviderStage {
    /// Short, user-facing summary used as the `error` field of JSON bodies.
    pub fn failure_summary(self) -> &'static str {
        match self {
            ProviderStage::Upload => "Failed to upload document",
            ProviderStage::Status => "Failed to check translation status",
            ProviderStage::Result => "Failed to download translated document",
            ProviderStage::Usage => "Failed to fetch usage information",
            ProviderStage::Languages => "Failed to fetch supported languages",
        }
    }
}

impl fmt::Display for ProviderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProviderStage::Upload => "upload",
            ProviderStage::Status => "status",
            ProviderStage::Result => "result",
            ProviderStage::Usage => "usage",
            ProviderStage::Languages => "languages",
        };
        f.write_str(s)
    }
}

/// Coarse classification of a [`TranslateError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Credential,
    Upstream,
    Timeout,
    Internal,
}

/// All errors returned by the doctrans library.
#[derive(Debug, Error)]
pub enum TranslateError {
    // ── Validation errors ─────────────────────────────────────────────────
    /// The request carried no `file` part.
    #[error("No file provided")]
    MissingFile,

    /// The request carried no (or an empty) `targetLang` field.
    #[error("Target language is required")]
    MissingTargetLanguage,

    /// The request body could not be parsed.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The upload exceeded the configured body limit.
    #[error("Uploaded file is too large (limit is {limit_bytes} bytes)")]
    UploadTooLarge { limit_bytes: usize },

    // ── Credential errors ─────────────────────────────────────────────────
    /// Caller-supplied mode and the request had no key.
    #[error("API key not provided\nPlease provide a DeepL API key in the '{header}' header.")]
    MissingCredential { header: String },

    /// Server-managed mode and no key was configured at startup.
    #[error("Server API key is not configured\nSet {env_var} before starting the server.")]
    ServerKeyNotConfigured { env_var: String },

    // ── Upstream errors ───────────────────────────────────────────────────
    /// The provider answered with a non-success HTTP status.
    ///
    /// `body` is the provider's response text, passed through untouched.
    #[error("Provider {stage} request failed with HTTP {status}: {body}")]
    Upstream {
        stage: ProviderStage,
        status: u16,
        body: String,
    },

    /// The provider could not be reached (DNS, TLS, connect, read timeout).
    #[error("Provider {stage} request could not be completed: {reason}")]
    ProviderUnreachable { stage: ProviderStage, reason: String },

    /// The provider answered 2xx but the body did not match its contract.
    #[error("Provider returned an unexpected {stage} response: {detail}")]
    MalformedResponse { stage: ProviderStage, detail: String },

    /// The provider reported `status: "error"` while translating.
    #[error("Translation failed\n{}", .detail.as_deref().unwrap_or("DeepL reported an error during translation"))]
    TranslationFailed { detail: Option<String> },

    // ── Timeout ───────────────────────────────────────────────────────────
    /// The document was not ready within the poll budget.
    #[error("Translation timeout\nDocument was not ready after {attempts} status checks (~{waited_secs}s)")]
    Timeout { attempts: u32, waited_secs: u64 },

    // ── Internal errors ───────────────────────────────────────────────────
    /// Temporary artifact could not be written or read.
    #[error("Temporary file error at '{path}': {source}")]
    Artifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A local input file could not be read (CLI translations).
    #[error("Failed to read input file '{path}': {source}")]
    InputUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write the translated output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TranslateError {
    /// The group this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            TranslateError::MissingFile
            | TranslateError::MissingTargetLanguage
            | TranslateError::InvalidRequest(_)
            | TranslateError::UploadTooLarge { .. } => ErrorCategory::Validation,
            TranslateError::MissingCredential { .. }
            | TranslateError::ServerKeyNotConfigured { .. } => ErrorCategory::Credential,
            TranslateError::Upstream { .. }
            | TranslateError::ProviderUnreachable { .. }
            | TranslateError::MalformedResponse { .. }
            | TranslateError::TranslationFailed { .. } => ErrorCategory::Upstream,
            TranslateError::Timeout { .. } => ErrorCategory::Timeout,
            TranslateError::Artifact { .. }
            | TranslateError::InputUnreadable { .. }
            | TranslateError::OutputWriteFailed { .. }
            | TranslateError::InvalidConfig(_)
            | TranslateError::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// HTTP status code this error should be reported with.
    ///
    /// Upstream statuses are propagated when they are valid error codes
    /// (400–599); anything else collapses to 500.
    pub fn status_code(&self) -> u16 {
        match self {
            TranslateError::MissingFile
            | TranslateError::MissingTargetLanguage
            | TranslateError::InvalidRequest(_) => 400,
            TranslateError::UploadTooLarge { .. } => 413,
            TranslateError::MissingCredential { .. } => 401,
            TranslateError::ServerKeyNotConfigured { .. } => 500,
            TranslateError::Upstream { status, .. } if (400..=599).contains(status) => *status,
            TranslateError::Upstream { .. } => 500,
            TranslateError::Timeout { .. } => 408,
            _ => 500,
        }
    }

    /// Short summary for the `error` field of a JSON error body.
    pub fn summary(&self) -> &'static str {
        match self {
            TranslateError::MissingFile => "No file provided",
            TranslateError::MissingTargetLanguage => "Target language is required",
            TranslateError::InvalidRequest(_) => "Invalid request",
            TranslateError::UploadTooLarge { .. } => "File too large",
            TranslateError::MissingCredential { .. } => "API key not provided",
            TranslateError::ServerKeyNotConfigured { .. } => "Server misconfigured",
            TranslateError::Upstream { stage, .. }
            | TranslateError::ProviderUnreachable { stage, .. }
            | TranslateError::MalformedResponse { stage, .. } => stage.failure_summary(),
            TranslateError::TranslationFailed { .. } => "Translation failed",
            TranslateError::Timeout { .. } => "Translation timeout",
            TranslateError::Artifact { .. }
            | TranslateError::InputUnreadable { .. }
            | TranslateError::OutputWriteFailed { .. }
            | TranslateError::InvalidConfig(_)
            | TranslateError::Internal(_) => "Internal error",
        }
    }

    /// Detail text for the `message` field of a JSON error body.
    ///
    /// For upstream failures this is the provider's body, verbatim.
    pub fn detail(&self) -> String {
        match self {
            TranslateError::Upstream { body, .. } => body.clone(),
            TranslateError::ProviderUnreachable { reason, .. } => reason.clone(),
            TranslateError::MalformedResponse { detail, .. } => detail.clone(),
            TranslateError::TranslationFailed { detail } => detail
                .clone()
                .unwrap_or_else(|| "DeepL reported an error during translation".to_string()),
            TranslateError::MissingCredential { .. } => {
                "Please provide a DeepL API key".to_string()
            }
            TranslateError::Timeout { .. } => {
                "Translation took too long to complete".to_string()
            }
            other => other.to_string(),
        }
    }
}
