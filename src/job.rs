//! Job data model: the request, the in-flight job, and the translated result.

use crate::error::TranslateError;
use crate::pipeline::artifact::ArtifactHandle;
use crate::pipeline::naming;
use crate::pipeline::provider::DocumentHandle;
use bytes::Bytes;
use std::fmt;
use std::path::PathBuf;
use tracing::debug;

/// Where a job is in the upload → poll → fetch workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Created,
    Uploaded,
    Polling,
    Done,
    /// The provider (or a provider call) reported an error.
    Failed,
    /// The poll budget ran out; the provider may still finish out-of-band.
    TimedOut,
}

impl JobState {
    /// `Failed` and `TimedOut` end a job; `Done` still allows fetching.
    pub fn is_error(self) -> bool {
        matches!(self, JobState::Failed | JobState::TimedOut)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::Created => "created",
            JobState::Uploaded => "uploaded",
            JobState::Polling => "polling",
            JobState::Done => "done",
            JobState::Failed => "failed",
            JobState::TimedOut => "timed-out",
        };
        f.write_str(s)
    }
}

/// An uploaded file as received from the caller.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub file_name: String,
    pub content: Bytes,
}

impl SourceFile {
    pub fn new(file_name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content: content.into(),
        }
    }
}

/// A validated translate request.
#[derive(Debug, Clone)]
pub struct TranslationRequest {
    pub file: SourceFile,
    pub target_lang: String,
    /// `None` means auto-detect.
    pub source_lang: Option<String>,
}

impl TranslationRequest {
    /// Validate raw request parts.
    ///
    /// The file is checked before the target language. Blank language
    /// values count as absent.
    pub fn new(
        file: Option<SourceFile>,
        target_lang: Option<String>,
        source_lang: Option<String>,
    ) -> Result<Self, TranslateError> {
        let file = file.ok_or(TranslateError::MissingFile)?;
        let target_lang =
            non_blank(target_lang).ok_or(TranslateError::MissingTargetLanguage)?;
        Ok(Self {
            file,
            target_lang,
            source_lang: non_blank(source_lang),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// One in-flight translation.
///
/// Owns its temporary artifacts: dropping the job removes them.
#[derive(Debug)]
pub struct TranslationJob {
    file_name: String,
    target_lang: String,
    source_lang: Option<String>,
    state: JobState,
    pub(crate) input: ArtifactHandle,
    pub(crate) output: Option<ArtifactHandle>,
    pub(crate) document: Option<DocumentHandle>,
    pub(crate) billed_characters: Option<u64>,
}

impl TranslationJob {
    pub(crate) fn new(request: &TranslationRequest, input: ArtifactHandle) -> Self {
        Self {
            file_name: naming::base_file_name(&request.file.file_name).to_string(),
            target_lang: request.target_lang.clone(),
            source_lang: request.source_lang.clone(),
            state: JobState::Created,
            input,
            output: None,
            document: None,
            billed_characters: None,
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn target_lang(&self) -> &str {
        &self.target_lang
    }

    pub fn source_lang(&self) -> Option<&str> {
        self.source_lang.as_deref()
    }

    pub fn billed_characters(&self) -> Option<u64> {
        self.billed_characters
    }

    /// Name the translated document is delivered under.
    pub fn output_file_name(&self) -> String {
        naming::output_file_name(&self.file_name, &self.target_lang)
    }

    /// Paths of artifacts still on disk.
    pub fn artifact_paths(&self) -> Vec<PathBuf> {
        std::iter::once(&self.input)
            .chain(self.output.as_ref())
            .filter_map(|a| a.path().map(|p| p.to_path_buf()))
            .collect()
    }

    pub(crate) fn transition(&mut self, next: JobState) {
        debug!("Job {}: {} → {}", self.file_name, self.state, next);
        self.state = next;
    }

    /// Remove every temporary file the job owns. Idempotent.
    pub fn release_artifacts(&mut self) {
        self.input.release();
        if let Some(ref mut output) = self.output {
            output.release();
        }
    }
}

/// A finished translation, ready to hand back to the caller.
#[derive(Debug, Clone)]
pub struct TranslatedDocument {
    /// `<stem>_<TARGET><ext>` of the uploaded name.
    pub file_name: String,
    pub content: Bytes,
    pub billed_characters: Option<u64>,
}
