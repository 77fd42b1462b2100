//! CLI binary for doctrans.
//!
//! A thin shim over the library crate: maps flags and environment variables
//! onto `ServiceConfig`, then either runs the HTTP relay or performs one
//! translation / account query directly.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use doctrans::credential::resolver_for;
use doctrans::pipeline::provider::supported_languages;
use doctrans::{
    CredentialMode, Orchestrator, ProgressCallback, ResolvedCredential, ServiceConfig,
    TranslationProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal spinner that follows a job through upload, polling and download.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl TranslationProgressCallback for CliProgressCallback {
    fn on_job_start(&self, file_name: &str, target_lang: &str) {
        self.bar.set_prefix("Uploading");
        self.bar.set_message(format!("{file_name} → {target_lang}"));
    }

    fn on_uploaded(&self) {
        self.bar.set_prefix("Translating");
        self.bar.set_message("waiting for DeepL…");
    }

    fn on_poll(&self, attempt: u32, max_attempts: u32, seconds_remaining: Option<u64>) {
        let eta = seconds_remaining
            .map(|s| format!("  ~{s}s left"))
            .unwrap_or_default();
        self.bar
            .set_message(format!("status check {attempt}/{max_attempts}{eta}"));
    }

    fn on_done(&self, billed_characters: Option<u64>) {
        let billed = billed_characters
            .map(|c| format!("  {} characters billed", c))
            .unwrap_or_default();
        self.bar
            .finish_with_message(format!("{}{}", green("done"), dim(&billed)));
    }

    fn on_failed(&self, error: &str) {
        let first_line = error.lines().next().unwrap_or(error);
        self.bar.abandon_with_message(red(first_line));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the HTTP relay; callers send their own key in X-DeepL-API-Key
  doctrans serve

  # Run the relay with one server-held key
  DEEPL_API_KEY=xxxx:fx doctrans serve --credential-mode server

  # Translate a local file (writes report_FR.docx next to it)
  doctrans translate report.docx --target FR

  # Explicit source language and output path
  doctrans translate slides.pptx --target DE --source EN -o out/slides_de.pptx

  # Account usage and supported languages
  doctrans usage
  doctrans languages --json

KEYS:
  Keys ending in ":fx" are sent to the free API (api-free.deepl.com),
  all others to the paid API (api.deepl.com).

ENVIRONMENT VARIABLES (also read from ./.env):
  DEEPL_API_KEY            DeepL authentication key
  DOCTRANS_BIND            Relay listen address (default 0.0.0.0:3001)
  PORT                     Relay listen port; overrides the port in DOCTRANS_BIND
  DOCTRANS_CREDENTIAL_MODE server | caller (default caller)
  RUST_LOG                 Override log filter (e.g. doctrans=debug)
"#;

/// Translate documents with the DeepL document API.
#[derive(Parser, Debug)]
#[command(
    name = "doctrans",
    version,
    about = "Translate documents with the DeepL document API",
    long_about = "Translate whole documents (DOCX, PPTX, PDF, …) through the DeepL document API. \
Runs as an HTTP relay for browser front-ends, or translates local files directly.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    provider: ProviderArgs,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "DOCTRANS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "DOCTRANS_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP relay.
    Serve(ServeArgs),

    /// Translate one local file.
    Translate(TranslateArgs),

    /// Show character and document usage for the key.
    Usage {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// List supported source and target languages.
    Languages {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
struct ProviderArgs {
    /// DeepL API key. Read once at startup; never logged.
    #[arg(long, global = true, env = "DEEPL_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Base URL for free-tier (":fx") keys.
    #[arg(long, global = true, env = "DOCTRANS_FREE_URL")]
    free_url: Option<String>,

    /// Base URL for paid-tier keys.
    #[arg(long, global = true, env = "DOCTRANS_PAID_URL")]
    paid_url: Option<String>,

    /// Milliseconds between status checks.
    #[arg(long, global = true, env = "DOCTRANS_POLL_INTERVAL_MS", default_value_t = 1000)]
    poll_interval_ms: u64,

    /// Status checks before giving up.
    #[arg(long, global = true, env = "DOCTRANS_MAX_POLLS", default_value_t = 60)]
    max_polls: u32,

    /// Timeout for each DeepL HTTP call in seconds.
    #[arg(long, global = true, env = "DOCTRANS_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Directory for temporary files (default: system temp dir).
    #[arg(long, global = true, env = "DOCTRANS_TEMP_DIR")]
    temp_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to listen on.
    #[arg(long, env = "DOCTRANS_BIND", default_value = "0.0.0.0:3001")]
    bind: SocketAddr,

    /// Port to listen on; replaces the port in --bind.
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Where the DeepL key comes from.
    #[arg(long, env = "DOCTRANS_CREDENTIAL_MODE", value_enum, default_value = "caller")]
    credential_mode: ModeArg,

    /// Request header carrying the caller's key in caller mode.
    #[arg(long, env = "DOCTRANS_KEY_HEADER", default_value = "X-DeepL-API-Key")]
    key_header: String,

    /// Maximum size of the uploaded file in MiB.
    #[arg(long, env = "DOCTRANS_MAX_UPLOAD_MB", default_value_t = 30)]
    max_upload_mb: usize,

    /// Allowed CORS origin; repeat for several. Default: any origin.
    #[arg(long = "cors-origin", env = "DOCTRANS_CORS_ORIGINS", value_delimiter = ',')]
    cors_origins: Vec<String>,
}

#[derive(Args, Debug)]
struct TranslateArgs {
    /// Document to translate.
    input: PathBuf,

    /// Target language code (e.g. FR, DE, EN-GB).
    #[arg(short, long)]
    target: String,

    /// Source language code; omit to auto-detect.
    #[arg(short, long)]
    source: Option<String>,

    /// Output path (default: <stem>_<TARGET><ext> next to the input).
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Server,
    Caller,
}

impl From<ModeArg> for CredentialMode {
    fn from(v: ModeArg) -> Self {
        match v {
            ModeArg::Server => CredentialMode::ServerManaged,
            ModeArg::Caller => CredentialMode::CallerSupplied,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Variables already in the environment win over ./.env.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner gives all the feedback a one-shot translation needs, so
    // library logs are quiet unless asked for. The relay logs at info.
    let show_progress = !cli.quiet && matches!(cli.command, Command::Translate(_));
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Serve(ref args) => {
            let config = build_config(&cli.provider, Some(args))?;
            doctrans::serve(config).await.context("Server failed")?;
        }
        Command::Translate(ref args) => {
            let config = build_config(&cli.provider, None)?;
            let credential = server_credential(&config)?;

            let mut orchestrator =
                Orchestrator::from_config(&config).context("Failed to create DeepL client")?;
            if show_progress {
                let cb: ProgressCallback = CliProgressCallback::new();
                orchestrator = orchestrator.with_progress(cb);
            }

            let saved = orchestrator
                .translate_file(
                    &args.input,
                    args.output.as_deref(),
                    &args.target,
                    args.source.as_deref(),
                    &credential,
                )
                .await
                .context("Translation failed")?;

            if !cli.quiet {
                eprintln!(
                    "{}  {} bytes  →  {}",
                    green("✔"),
                    saved.bytes_written,
                    bold(&saved.path.display().to_string()),
                );
            }
        }
        Command::Usage { json } => {
            let config = build_config(&cli.provider, None)?;
            let credential = server_credential(&config)?;
            let orchestrator =
                Orchestrator::from_config(&config).context("Failed to create DeepL client")?;
            let usage = orchestrator
                .provider()
                .usage(&credential)
                .await
                .context("Failed to fetch usage information")?;

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&usage).context("Failed to serialise usage")?
                );
            } else {
                println!(
                    "Characters:  {} / {}",
                    usage.character_count, usage.character_limit
                );
                println!(
                    "Documents:   {} / {}",
                    usage.document_count, usage.document_limit
                );
            }
        }
        Command::Languages { json } => {
            let config = build_config(&cli.provider, None)?;
            let credential = server_credential(&config)?;
            let orchestrator =
                Orchestrator::from_config(&config).context("Failed to create DeepL client")?;
            let languages = supported_languages(orchestrator.provider().as_ref(), &credential)
                .await
                .context("Failed to fetch supported languages")?;

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&languages)
                        .context("Failed to serialise languages")?
                );
            } else {
                println!("{}", bold("Source languages"));
                for lang in &languages.source {
                    println!("  {:<8} {}", lang.code, lang.name);
                }
                println!("{}", bold("Target languages"));
                for lang in &languages.target {
                    println!("  {:<8} {}", lang.code, lang.name);
                }
            }
        }
    }

    Ok(())
}

/// Map CLI args to `ServiceConfig`.
fn build_config(provider: &ProviderArgs, serve: Option<&ServeArgs>) -> Result<ServiceConfig> {
    let mut builder = ServiceConfig::builder()
        .poll_interval_ms(provider.poll_interval_ms)
        .max_poll_attempts(provider.max_polls)
        .request_timeout_secs(provider.api_timeout);

    if let Some(ref key) = provider.api_key {
        builder = builder.server_api_key(key.clone());
    }
    if let Some(ref url) = provider.free_url {
        builder = builder.free_base_url(url.clone());
    }
    if let Some(ref url) = provider.paid_url {
        builder = builder.paid_base_url(url.clone());
    }
    if let Some(ref dir) = provider.temp_dir {
        builder = builder.temp_dir(dir.clone());
    }

    builder = match serve {
        Some(args) => builder
            .credential_mode(args.credential_mode.into())
            .bind_addr(listen_addr(args))
            .api_key_header(args.key_header.clone())
            .max_upload_bytes(args.max_upload_mb.saturating_mul(1024 * 1024))
            .cors_origins(args.cors_origins.clone()),
        // One-shot commands always use the key given on the command line.
        None => builder.credential_mode(CredentialMode::ServerManaged),
    };

    builder.build().context("Invalid configuration")
}

fn listen_addr(args: &ServeArgs) -> SocketAddr {
    let mut addr = args.bind;
    if let Some(port) = args.port {
        addr.set_port(port);
    }
    addr
}

fn server_credential(config: &ServiceConfig) -> Result<ResolvedCredential> {
    resolver_for(config)
        .resolve(None)
        .context("No DeepL API key: pass --api-key or set DEEPL_API_KEY")
}
