//! Translation orchestrator: upload → poll → fetch.
//!
//! ## State machine
//!
//! ```text
//! Created ──submit──▶ Uploaded ──await──▶ Polling ──▶ Done ──fetch──▶ result
//!    │                                      │  ▲
//!    │                                      └──┘ not done yet: sleep, retry
//!    └──────────────▶ Failed  (any provider error, status "error")
//!                     TimedOut (poll budget exhausted)
//! ```
//!
//! The provider exposes no push channel, so completion is discovered by a
//! bounded poll loop. The loop is the only retry in the workflow: upload and
//! fetch failures end the job immediately and the caller resubmits as a new
//! job if it wants to.
//!
//! Every job owns its temporary artifacts. [`Orchestrator::translate`]
//! releases them before returning, and the handles release themselves on
//! drop when a job future is abandoned.

use crate::config::{PollPolicy, ServiceConfig};
use crate::credential::ResolvedCredential;
use crate::error::TranslateError;
use crate::job::{JobState, SourceFile, TranslatedDocument, TranslationJob, TranslationRequest};
use crate::pipeline::artifact::{ArtifactRole, ArtifactStore};
use crate::pipeline::naming;
use crate::pipeline::provider::{
    DocumentProvider, DocumentState, DocumentUpload, HttpDocumentProvider,
};
use crate::progress::ProgressCallback;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn, Instrument};

/// Drives translation jobs against a [`DocumentProvider`].
///
/// Holds no per-job state; one instance serves all concurrent requests.
#[derive(Clone)]
pub struct Orchestrator {
    provider: Arc<dyn DocumentProvider>,
    artifacts: ArtifactStore,
    poll: PollPolicy,
    progress: Option<ProgressCallback>,
}

impl Orchestrator {
    pub fn new(provider: Arc<dyn DocumentProvider>, artifacts: ArtifactStore, poll: PollPolicy) -> Self {
        Self {
            provider,
            artifacts,
            poll,
            progress: None,
        }
    }

    /// Build an orchestrator backed by the real HTTP provider.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, TranslateError> {
        let provider = HttpDocumentProvider::new(config.request_timeout())?;
        let artifacts = match config.temp_dir {
            Some(ref dir) => ArtifactStore::new(dir),
            None => ArtifactStore::default(),
        };
        Ok(Self::new(Arc::new(provider), artifacts, config.poll))
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn provider(&self) -> &Arc<dyn DocumentProvider> {
        &self.provider
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    pub fn poll_policy(&self) -> PollPolicy {
        self.poll
    }

    /// Stash the upload and create a job in `Created`.
    pub async fn create_job(&self, request: &TranslationRequest) -> Result<TranslationJob, TranslateError> {
        let extension = naming::artifact_extension(&request.file.file_name);
        let input = self
            .artifacts
            .stash(ArtifactRole::Input, &request.file.content, extension)
            .await?;
        let job = TranslationJob::new(request, input);
        if let Some(ref cb) = self.progress {
            cb.on_job_start(job.file_name(), job.target_lang());
        }
        Ok(job)
    }

    /// Upload the document. `Created` → `Uploaded`, or `Failed`.
    pub async fn submit(
        &self,
        job: &mut TranslationJob,
        credential: &ResolvedCredential,
    ) -> Result<(), TranslateError> {
        expect_state(job, &[JobState::Created], "submit")?;

        let content = self.artifacts.retrieve(&job.input).await?;
        let upload = DocumentUpload {
            file_name: job.file_name().to_string(),
            content,
            target_lang: job.target_lang().to_string(),
            source_lang: job.source_lang().map(str::to_string),
        };

        match self.provider.upload(credential, upload).await {
            Ok(handle) => {
                job.document = Some(handle);
                job.transition(JobState::Uploaded);
                info!("Uploaded {} for translation to {}", job.file_name(), job.target_lang());
                if let Some(ref cb) = self.progress {
                    cb.on_uploaded();
                }
                Ok(())
            }
            Err(e) => {
                job.transition(JobState::Failed);
                Err(e)
            }
        }
    }

    /// Poll until the provider reports `done`, `error`, or the budget runs out.
    ///
    /// `Uploaded` → `Polling` → `Done` | `Failed` | `TimedOut`.
    pub async fn await_completion(
        &self,
        job: &mut TranslationJob,
        credential: &ResolvedCredential,
    ) -> Result<(), TranslateError> {
        expect_state(job, &[JobState::Uploaded, JobState::Polling], "await completion")?;
        let handle = job
            .document
            .clone()
            .ok_or_else(|| TranslateError::Internal("job has no provider document".into()))?;
        job.transition(JobState::Polling);

        let started = tokio::time::Instant::now();
        let max = self.poll.max_attempts;
        for attempt in 1..=max {
            let status = match self.provider.status(credential, &handle).await {
                Ok(status) => status,
                Err(e) => {
                    job.transition(JobState::Failed);
                    return Err(e);
                }
            };

            match status.state {
                DocumentState::Done => {
                    job.billed_characters = status.billed_characters;
                    job.transition(JobState::Done);
                    info!(
                        "Translation of {} finished after {} status checks",
                        job.file_name(),
                        attempt
                    );
                    return Ok(());
                }
                DocumentState::Error => {
                    job.transition(JobState::Failed);
                    return Err(TranslateError::TranslationFailed {
                        detail: status.error_message,
                    });
                }
                ref other => {
                    debug!(
                        "Status check {}/{} for {}: {:?}, ~{:?}s remaining",
                        attempt,
                        max,
                        job.file_name(),
                        other,
                        status.seconds_remaining
                    );
                    if let Some(ref cb) = self.progress {
                        cb.on_poll(attempt, max, status.seconds_remaining);
                    }
                }
            }

            if attempt < max {
                tokio::time::sleep(self.poll.interval).await;
            }
        }

        job.transition(JobState::TimedOut);
        Err(TranslateError::Timeout {
            attempts: max,
            waited_secs: started.elapsed().as_secs(),
        })
    }

    /// Download the translated document. Only valid in `Done`.
    ///
    /// The bytes pass through an `output` artifact so the result shares the
    /// upload's cleanup guarantees.
    pub async fn fetch_result(
        &self,
        job: &mut TranslationJob,
        credential: &ResolvedCredential,
    ) -> Result<Bytes, TranslateError> {
        expect_state(job, &[JobState::Done], "fetch result")?;
        let handle = job
            .document
            .clone()
            .ok_or_else(|| TranslateError::Internal("job has no provider document".into()))?;

        let bytes = match self.provider.result(credential, &handle).await {
            Ok(bytes) => bytes,
            Err(e) => {
                job.transition(JobState::Failed);
                return Err(e);
            }
        };

        let extension = naming::artifact_extension(job.file_name());
        let output = self
            .artifacts
            .stash(ArtifactRole::Output, &bytes, extension)
            .await?;
        let content = self.artifacts.retrieve(&output).await?;
        job.output = Some(output);
        Ok(Bytes::from(content))
    }

    /// Run a whole job: create, submit, await, fetch.
    ///
    /// All temporary artifacts are gone when this returns, on every path.
    pub async fn translate(
        &self,
        request: TranslationRequest,
        credential: &ResolvedCredential,
    ) -> Result<TranslatedDocument, TranslateError> {
        let span = tracing::info_span!(
            "translate",
            file = %naming::base_file_name(&request.file.file_name),
            target = %request.target_lang
        );
        async move {
            let start = Instant::now();
            let mut job = self.create_job(&request).await?;
            drop(request);

            let outcome = self.run(&mut job, credential).await;
            job.release_artifacts();

            match outcome {
                Ok(ref doc) => {
                    info!(
                        "Delivered {} ({} bytes) in {}ms",
                        doc.file_name,
                        doc.content.len(),
                        start.elapsed().as_millis()
                    );
                    if let Some(ref cb) = self.progress {
                        cb.on_done(doc.billed_characters);
                    }
                }
                Err(ref e) => {
                    warn!("Job ended {} after {}ms: {}", job.state(), start.elapsed().as_millis(), e);
                    if let Some(ref cb) = self.progress {
                        cb.on_failed(&e.to_string());
                    }
                }
            }
            outcome
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        job: &mut TranslationJob,
        credential: &ResolvedCredential,
    ) -> Result<TranslatedDocument, TranslateError> {
        self.submit(job, credential).await?;
        self.await_completion(job, credential).await?;
        let content = self.fetch_result(job, credential).await?;
        Ok(TranslatedDocument {
            file_name: job.output_file_name(),
            content,
            billed_characters: job.billed_characters(),
        })
    }

    /// Translate a local file and write the result to disk.
    ///
    /// With no `output`, the result lands next to the input under the
    /// derived `<stem>_<TARGET><ext>` name. The write is atomic (temp file +
    /// rename) so an interrupted run never leaves a partial document.
    pub async fn translate_file(
        &self,
        input: impl AsRef<Path>,
        output: Option<&Path>,
        target_lang: &str,
        source_lang: Option<&str>,
        credential: &ResolvedCredential,
    ) -> Result<SavedTranslation, TranslateError> {
        let input = input.as_ref();
        let content = tokio::fs::read(input)
            .await
            .map_err(|e| TranslateError::InputUnreadable {
                path: input.to_path_buf(),
                source: e,
            })?;
        let file_name = input
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "document".to_string());

        let request = TranslationRequest::new(
            Some(SourceFile::new(file_name, content)),
            Some(target_lang.to_string()),
            source_lang.map(str::to_string),
        )?;
        let doc = self.translate(request, credential).await?;

        let path = match output {
            Some(p) => p.to_path_buf(),
            None => input.with_file_name(&doc.file_name),
        };
        write_atomic(&path, &doc.content).await?;

        Ok(SavedTranslation {
            path,
            bytes_written: doc.content.len(),
            billed_characters: doc.billed_characters,
        })
    }
}

/// Where [`Orchestrator::translate_file`] put its result.
#[derive(Debug, Clone)]
pub struct SavedTranslation {
    pub path: PathBuf,
    pub bytes_written: usize,
    pub billed_characters: Option<u64>,
}

fn expect_state(job: &TranslationJob, allowed: &[JobState], op: &str) -> Result<(), TranslateError> {
    if allowed.contains(&job.state()) {
        Ok(())
    } else {
        Err(TranslateError::Internal(format!(
            "cannot {op} a job in state '{}'",
            job.state()
        )))
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), TranslateError> {
    let write_err = |e| TranslateError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".part");
    let tmp_path = PathBuf::from(tmp_name);
    let written = match tokio::fs::write(&tmp_path, bytes).await {
        Ok(()) => tokio::fs::rename(&tmp_path, path).await,
        Err(e) => Err(e),
    };
    if let Err(e) = written {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_err(e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::{Credential, Endpoints};
    use crate::error::ProviderStage;
    use crate::pipeline::provider::{
        DocumentHandle, DocumentStatus, Language, LanguageType, UsageSnapshot,
    };
    use crate::progress::TranslationProgressCallback;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Provider whose answers are fixed up front.
    #[derive(Default)]
    struct Script {
        upload_status: Option<u16>,
        status_http_error: Option<u16>,
        /// States returned by successive status calls...
        statuses: Vec<&'static str>,
        /// ...and the state repeated once they run out.
        then: &'static str,
        result_status: Option<u16>,
    }

    struct StubProvider {
        script: Script,
        uploads: Mutex<Vec<DocumentUpload>>,
        status_calls: AtomicU32,
        result_calls: AtomicU32,
    }

    impl StubProvider {
        fn new(script: Script) -> Arc<Self> {
            Arc::new(Self {
                script,
                uploads: Mutex::new(Vec::new()),
                status_calls: AtomicU32::new(0),
                result_calls: AtomicU32::new(0),
            })
        }

        fn done_after(in_progress: usize) -> Arc<Self> {
            let mut statuses = vec!["translating"; in_progress];
            statuses.push("done");
            Self::new(Script {
                statuses,
                then: "done",
                ..Script::default()
            })
        }
    }

    #[async_trait]
    impl DocumentProvider for StubProvider {
        async fn upload(
            &self,
            _credential: &ResolvedCredential,
            document: DocumentUpload,
        ) -> Result<DocumentHandle, TranslateError> {
            let name = document.file_name.clone();
            self.uploads.lock().unwrap().push(document);
            if let Some(status) = self.script.upload_status {
                return Err(TranslateError::Upstream {
                    stage: ProviderStage::Upload,
                    status,
                    body: "upload rejected".into(),
                });
            }
            Ok(DocumentHandle::new(format!("id-{name}"), format!("key-{name}")))
        }

        async fn status(
            &self,
            _credential: &ResolvedCredential,
            _handle: &DocumentHandle,
        ) -> Result<DocumentStatus, TranslateError> {
            let n = self.status_calls.fetch_add(1, Ordering::SeqCst) as usize;
            if let Some(status) = self.script.status_http_error {
                return Err(TranslateError::Upstream {
                    stage: ProviderStage::Status,
                    status,
                    body: "status unavailable".into(),
                });
            }
            let state = self.script.statuses.get(n).copied().unwrap_or(self.script.then);
            let mut status = DocumentStatus::new(DocumentState::from(state));
            match status.state {
                DocumentState::Done => status.billed_characters = Some(1234),
                DocumentState::Error => status.error_message = Some("Source file is corrupt".into()),
                _ => status.seconds_remaining = Some(5),
            }
            Ok(status)
        }

        async fn result(
            &self,
            _credential: &ResolvedCredential,
            handle: &DocumentHandle,
        ) -> Result<Bytes, TranslateError> {
            self.result_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(status) = self.script.result_status {
                return Err(TranslateError::Upstream {
                    stage: ProviderStage::Result,
                    status,
                    body: "result gone".into(),
                });
            }
            Ok(Bytes::from(format!("translated:{}", handle.document_id)))
        }

        async fn usage(&self, _credential: &ResolvedCredential) -> Result<UsageSnapshot, TranslateError> {
            Ok(UsageSnapshot::default())
        }

        async fn languages(
            &self,
            _credential: &ResolvedCredential,
            _kind: LanguageType,
        ) -> Result<Vec<Language>, TranslateError> {
            Ok(Vec::new())
        }
    }

    fn credential(key: &str) -> ResolvedCredential {
        let endpoints = Endpoints {
            free: "http://free.invalid/v2".into(),
            paid: "http://paid.invalid/v2".into(),
        };
        ResolvedCredential::new(Credential::new(key).unwrap(), &endpoints)
    }

    fn fast_poll() -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(1),
            max_attempts: 60,
        }
    }

    fn orchestrator(provider: Arc<StubProvider>, dir: &TempDir) -> Orchestrator {
        Orchestrator::new(provider, ArtifactStore::new(dir.path()), fast_poll())
    }

    fn request(name: &str, source: Option<&str>) -> TranslationRequest {
        TranslationRequest::new(
            Some(SourceFile::new(name, b"original bytes".to_vec())),
            Some("FR".into()),
            source.map(str::to_string),
        )
        .unwrap()
    }

    fn assert_store_empty(dir: &TempDir) {
        let left: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert!(left.is_empty(), "artifacts left behind: {left:?}");
    }

    #[tokio::test]
    async fn completes_after_four_status_calls() {
        let dir = TempDir::new().unwrap();
        let provider = StubProvider::done_after(3);
        let orch = orchestrator(provider.clone(), &dir);

        let doc = orch.translate(request("report.docx", None), &credential("k:fx")).await.unwrap();

        assert_eq!(provider.status_calls.load(Ordering::SeqCst), 4);
        assert_eq!(provider.result_calls.load(Ordering::SeqCst), 1);
        assert_eq!(doc.file_name, "report_FR.docx");
        assert_eq!(&doc.content[..], b"translated:id-report.docx");
        assert_eq!(doc.billed_characters, Some(1234));
        assert_store_empty(&dir);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_reports_time_actually_waited() {
        let dir = TempDir::new().unwrap();
        let provider = StubProvider::new(Script {
            then: "queued",
            ..Script::default()
        });
        let poll = PollPolicy {
            interval: Duration::from_secs(1),
            max_attempts: 3,
        };
        let orch = Orchestrator::new(provider.clone(), ArtifactStore::new(dir.path()), poll);
        let cred = credential("k");

        let mut job = orch.create_job(&request("notes", None)).await.unwrap();
        orch.submit(&mut job, &cred).await.unwrap();
        let err = orch.await_completion(&mut job, &cred).await.unwrap_err();

        // Three checks, two sleeps: no sleep after the last check.
        assert!(matches!(
            err,
            TranslateError::Timeout {
                attempts: 3,
                waited_secs: 2
            }
        ));
        assert_eq!(poll.budget(), Duration::from_secs(2));
        drop(job);
        assert_store_empty(&dir);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn disk_full_leaves_no_part_file() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("report_FR.docx");
        let part = dir.path().join("report_FR.docx.part");
        // Every write to /dev/full fails with ENOSPC.
        std::os::unix::fs::symlink("/dev/full", &part).unwrap();

        let err = tokio_test::assert_err!(write_atomic(&out, b"bonjour").await);
        assert!(matches!(err, TranslateError::OutputWriteFailed { .. }));
        assert!(!out.exists());
        assert!(std::fs::symlink_metadata(&part).is_err(), ".part file left behind");
    }

    #[tokio::test]
    async fn always_in_progress_times_out_after_sixty_attempts() {
        let dir = TempDir::new().unwrap();
        let provider = StubProvider::new(Script {
            then: "translating",
            ..Script::default()
        });
        let orch = orchestrator(provider.clone(), &dir);
        let cred = credential("k");

        let mut job = orch.create_job(&request("notes", None)).await.unwrap();
        orch.submit(&mut job, &cred).await.unwrap();
        let err = orch.await_completion(&mut job, &cred).await.unwrap_err();

        assert!(matches!(err, TranslateError::Timeout { attempts: 60, .. }));
        assert_eq!(err.status_code(), 408);
        assert_eq!(job.state(), JobState::TimedOut);
        assert_eq!(provider.status_calls.load(Ordering::SeqCst), 60);
        assert_eq!(provider.result_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn error_status_fails_without_further_polling() {
        let dir = TempDir::new().unwrap();
        let provider = StubProvider::new(Script {
            then: "error",
            ..Script::default()
        });
        let orch = orchestrator(provider.clone(), &dir);

        let err = orch
            .translate(request("report.docx", None), &credential("k"))
            .await
            .unwrap_err();

        match err {
            TranslateError::TranslationFailed { detail } => {
                assert_eq!(detail.as_deref(), Some("Source file is corrupt"))
            }
            other => panic!("expected TranslationFailed, got {other:?}"),
        }
        assert_eq!(provider.status_calls.load(Ordering::SeqCst), 1);
        assert_eq!(provider.result_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn source_lang_only_sent_when_given() {
        let dir = TempDir::new().unwrap();
        let provider = StubProvider::done_after(0);
        let orch = orchestrator(provider.clone(), &dir);

        orch.translate(request("a.txt", None), &credential("k")).await.unwrap();
        orch.translate(request("b.txt", Some("EN")), &credential("k")).await.unwrap();

        let uploads = provider.uploads.lock().unwrap();
        assert_eq!(uploads[0].source_lang, None);
        assert!(uploads[0].form_fields().iter().all(|(name, _)| *name != "source_lang"));
        assert_eq!(uploads[1].source_lang.as_deref(), Some("EN"));
        assert_eq!(uploads[0].content, b"original bytes");
        assert_eq!(uploads[0].target_lang, "FR");
    }

    #[tokio::test]
    async fn submit_reaches_uploaded() {
        let dir = TempDir::new().unwrap();
        let orch = orchestrator(StubProvider::done_after(0), &dir);
        let mut job = orch.create_job(&request("report.docx", None)).await.unwrap();
        assert_eq!(job.state(), JobState::Created);
        assert_eq!(job.artifact_paths().len(), 1);

        tokio_test::assert_ok!(orch.submit(&mut job, &credential("k")).await);
        assert_eq!(job.state(), JobState::Uploaded);

        drop(job);
        assert_store_empty(&dir);
    }

    #[tokio::test]
    async fn artifacts_released_on_every_failure_path() {
        let scripts = [
            (
                "upload failure",
                Script {
                    upload_status: Some(403),
                    then: "done",
                    ..Script::default()
                },
                403,
            ),
            (
                "poll failure",
                Script {
                    status_http_error: Some(503),
                    then: "done",
                    ..Script::default()
                },
                503,
            ),
            (
                "timeout",
                Script {
                    then: "queued",
                    ..Script::default()
                },
                408,
            ),
            (
                "fetch failure",
                Script {
                    then: "done",
                    result_status: Some(404),
                    ..Script::default()
                },
                404,
            ),
        ];

        for (label, script, expected_status) in scripts {
            let dir = TempDir::new().unwrap();
            let orch = orchestrator(StubProvider::new(script), &dir);
            let err = orch
                .translate(request("report.docx", None), &credential("k"))
                .await
                .unwrap_err();
            assert_eq!(err.status_code(), expected_status, "{label}");
            assert_store_empty(&dir);
        }
    }

    #[tokio::test]
    async fn fetch_failure_is_reported_at_result_stage() {
        let dir = TempDir::new().unwrap();
        let provider = StubProvider::new(Script {
            then: "done",
            result_status: Some(500),
            ..Script::default()
        });
        let orch = orchestrator(provider, &dir);
        let cred = credential("k");

        let mut job = orch.create_job(&request("report.docx", None)).await.unwrap();
        orch.submit(&mut job, &cred).await.unwrap();
        orch.await_completion(&mut job, &cred).await.unwrap();
        let err = orch.fetch_result(&mut job, &cred).await.unwrap_err();

        assert!(matches!(
            err,
            TranslateError::Upstream {
                stage: ProviderStage::Result,
                ..
            }
        ));
        assert_eq!(job.state(), JobState::Failed);
    }

    #[tokio::test]
    async fn fetch_before_done_is_rejected() {
        let dir = TempDir::new().unwrap();
        let provider = StubProvider::done_after(0);
        let orch = orchestrator(provider.clone(), &dir);
        let cred = credential("k");

        let mut job = orch.create_job(&request("report.docx", None)).await.unwrap();
        orch.submit(&mut job, &cred).await.unwrap();
        let err = tokio_test::assert_err!(orch.fetch_result(&mut job, &cred).await);

        assert!(matches!(err, TranslateError::Internal(_)));
        assert_eq!(provider.result_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn progress_sees_each_unfinished_poll() {
        #[derive(Default)]
        struct Counter {
            polls: AtomicU32,
            done: AtomicU32,
        }
        impl TranslationProgressCallback for Counter {
            fn on_poll(&self, _attempt: u32, max: u32, remaining: Option<u64>) {
                assert_eq!(max, 60);
                assert_eq!(remaining, Some(5));
                self.polls.fetch_add(1, Ordering::SeqCst);
            }
            fn on_done(&self, billed: Option<u64>) {
                assert_eq!(billed, Some(1234));
                self.done.fetch_add(1, Ordering::SeqCst);
            }
        }

        let dir = TempDir::new().unwrap();
        let counter = Arc::new(Counter::default());
        let orch = orchestrator(StubProvider::done_after(3), &dir).with_progress(counter.clone());

        orch.translate(request("report.docx", None), &credential("k")).await.unwrap();
        assert_eq!(counter.polls.load(Ordering::SeqCst), 3);
        assert_eq!(counter.done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_jobs_do_not_interfere() {
        let dir = TempDir::new().unwrap();
        let provider = StubProvider::done_after(2);
        let orch = orchestrator(provider.clone(), &dir);

        let jobs = (0..16).map(|i| {
            let orch = orch.clone();
            async move {
                let cred = credential(&format!("key-{i}:fx"));
                orch.translate(request(&format!("doc{i}.pdf"), None), &cred).await
            }
        });
        let docs = futures::future::join_all(jobs).await;

        for (i, doc) in docs.into_iter().enumerate() {
            let doc = doc.unwrap();
            assert_eq!(doc.file_name, format!("doc{i}_FR.pdf"));
            assert_eq!(doc.content, Bytes::from(format!("translated:id-doc{i}.pdf")));
        }
        assert_store_empty(&dir);
    }

    #[tokio::test]
    async fn translate_file_writes_next_to_input() {
        let dir = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let input = work.path().join("manual.odt");
        std::fs::write(&input, b"odt").unwrap();

        let orch = orchestrator(StubProvider::done_after(1), &dir);
        let saved = orch
            .translate_file(&input, None, "DE", None, &credential("k"))
            .await
            .unwrap();

        assert_eq!(saved.path, work.path().join("manual_DE.odt"));
        assert_eq!(
            std::fs::read(&saved.path).unwrap(),
            b"translated:id-manual.odt"
        );
        assert!(!work.path().join("manual_DE.odt.part").exists());
        assert_store_empty(&dir);
    }

    #[tokio::test]
    async fn translate_file_missing_input() {
        let dir = TempDir::new().unwrap();
        let orch = orchestrator(StubProvider::done_after(0), &dir);
        let err = orch
            .translate_file(dir.path().join("nope.pdf"), None, "DE", None, &credential("k"))
            .await
            .unwrap_err();
        assert!(matches!(err, TranslateError::InputUnreadable { .. }));
    }
}
