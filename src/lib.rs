//! # doctrans
//!
//! Translate whole documents (DOCX, PPTX, PDF, …) through the DeepL document
//! API, as a library, an HTTP relay, or a command-line tool.
//!
//! ## Why this crate?
//!
//! DeepL's document endpoint is asynchronous: you upload, poll until the
//! document is ready, then download the result with a per-document secret.
//! Browsers cannot hold the API key and should not babysit the poll loop, so
//! this crate runs that workflow server-side and hands back the finished
//! file in one request.
//!
//! ## Job Overview
//!
//! ```text
//! multipart upload
//!  │
//!  ├─ 1. Credential  server-held key or caller's X-DeepL-API-Key header
//!  ├─ 2. Stash       write the upload to a unique temp artifact
//!  ├─ 3. Upload      POST /document → document_id + document_key
//!  ├─ 4. Poll        POST /document/{id} every 1 s, at most 60 times
//!  ├─ 5. Fetch       POST /document/{id}/result
//!  └─ 6. Deliver     <stem>_<TARGET><ext>, temp artifacts removed
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use doctrans::{credential::resolver_for, Orchestrator, ServiceConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServiceConfig::builder()
//!         .credential_mode(doctrans::CredentialMode::ServerManaged)
//!         .server_api_key(std::env::var("DEEPL_API_KEY")?)
//!         .build()?;
//!     let credential = resolver_for(&config).resolve(None)?;
//!     let orchestrator = Orchestrator::from_config(&config)?;
//!     let saved = orchestrator
//!         .translate_file("report.docx", None, "FR", None, &credential)
//!         .await?;
//!     eprintln!("wrote {}", saved.path.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `doctrans` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! doctrans = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod credential;
pub mod error;
pub mod job;
pub mod pipeline;
pub mod progress;
pub mod server;
pub mod translate;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{CredentialMode, PollPolicy, ServiceConfig, ServiceConfigBuilder};
pub use credential::{CredentialResolver, ResolvedCredential};
pub use error::{ErrorCategory, ProviderStage, TranslateError};
pub use job::{JobState, SourceFile, TranslatedDocument, TranslationJob, TranslationRequest};
pub use pipeline::provider::{DocumentProvider, HttpDocumentProvider};
pub use progress::{NoopProgressCallback, ProgressCallback, TranslationProgressCallback};
pub use server::{router, serve, AppState};
pub use translate::{Orchestrator, SavedTranslation};
