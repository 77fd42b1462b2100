//! Building blocks the orchestrator composes into a translation job.
//!
//! ## Data Flow
//!
//! ```text
//! upload ──▶ artifact(input) ──▶ provider: upload → status… → result ──▶ artifact(output)
//!                                                                          │
//!                                          naming: <stem>_<TARGET><ext> ◀──┘
//! ```
//!
//! 1. [`artifact`]: temporary files for the upload and the result, removed
//!    when their handle is released or dropped
//! 2. [`provider`]: the DeepL document API behind the
//!    [`provider::DocumentProvider`] trait; the only stage with network I/O
//! 3. [`naming`]: output file names, temp-file extensions and the
//!    `Content-Disposition` header

pub mod artifact;
pub mod naming;
pub mod provider;
