//! Provider client: the DeepL document API behind a trait.
//!
//! The orchestrator talks to a [`DocumentProvider`], never to `reqwest`
//! directly. [`HttpDocumentProvider`] is the real implementation; tests drive
//! the orchestrator with scripted stubs instead.
//!
//! ## Wire contract
//!
//! ```text
//! POST {base}/document               multipart file, target_lang, [source_lang]
//!      → {document_id, document_key}
//! POST {base}/document/{id}          form document_key
//!      → {status, seconds_remaining?, billed_characters?, error_message?}
//! POST {base}/document/{id}/result   form document_key → bytes
//! GET  {base}/usage                  → {character_count, …}
//! GET  {base}/languages?type=…       → [{language, name}]
//! ```
//!
//! Non-success responses become [`TranslateError::Upstream`] carrying the
//! status and the body text untouched. No call here is retried.

use crate::credential::ResolvedCredential;
use crate::error::{ProviderStage, TranslateError};
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// Document sent to the provider's upload endpoint.
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub file_name: String,
    pub content: Vec<u8>,
    pub target_lang: String,
    /// `None` lets the provider auto-detect.
    pub source_lang: Option<String>,
}

impl DocumentUpload {
    /// Text fields of the upload form. `source_lang` appears only when set.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![("target_lang", self.target_lang.clone())];
        if let Some(ref source) = self.source_lang {
            fields.push(("source_lang", source.clone()));
        }
        fields
    }
}

/// Identifiers issued by the provider after upload.
///
/// Both are needed for every later call on the document. The key is a
/// secret: `Debug` redacts it and nothing serialises it back to clients.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct DocumentHandle {
    pub document_id: String,
    document_key: String,
}

impl DocumentHandle {
    pub fn new(document_id: impl Into<String>, document_key: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            document_key: document_key.into(),
        }
    }

    pub fn document_key(&self) -> &str {
        &self.document_key
    }
}

impl fmt::Debug for DocumentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentHandle")
            .field("document_id", &"<redacted>")
            .field("document_key", &"<redacted>")
            .finish()
    }
}

/// Translation progress as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentState {
    Queued,
    Translating,
    Done,
    Error,
    /// Any status this client does not know; treated as "not done yet".
    Other(String),
}

impl From<&str> for DocumentState {
    fn from(s: &str) -> Self {
        match s {
            "queued" => DocumentState::Queued,
            "translating" => DocumentState::Translating,
            "done" => DocumentState::Done,
            "error" => DocumentState::Error,
            other => DocumentState::Other(other.to_string()),
        }
    }
}

/// One answer from the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentStatus {
    pub state: DocumentState,
    pub seconds_remaining: Option<u64>,
    pub billed_characters: Option<u64>,
    pub error_message: Option<String>,
}

impl DocumentStatus {
    pub fn new(state: DocumentState) -> Self {
        Self {
            state,
            seconds_remaining: None,
            billed_characters: None,
            error_message: None,
        }
    }
}

#[derive(Deserialize)]
struct RawStatus {
    status: String,
    seconds_remaining: Option<u64>,
    billed_characters: Option<u64>,
    error_message: Option<String>,
}

impl From<RawStatus> for DocumentStatus {
    fn from(raw: RawStatus) -> Self {
        Self {
            state: DocumentState::from(raw.status.as_str()),
            seconds_remaining: raw.seconds_remaining,
            billed_characters: raw.billed_characters,
            error_message: raw.error_message,
        }
    }
}

/// Account usage. Missing provider fields read as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSnapshot {
    pub character_count: u64,
    pub character_limit: u64,
    pub document_count: u64,
    pub document_limit: u64,
}

#[derive(Deserialize)]
struct RawUsage {
    #[serde(default)]
    character_count: u64,
    #[serde(default)]
    character_limit: u64,
    #[serde(default)]
    document_count: u64,
    #[serde(default)]
    document_limit: u64,
}

impl From<RawUsage> for UsageSnapshot {
    fn from(raw: RawUsage) -> Self {
        Self {
            character_count: raw.character_count,
            character_limit: raw.character_limit,
            document_count: raw.document_count,
            document_limit: raw.document_limit,
        }
    }
}

/// A supported language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub code: String,
    pub name: String,
}

#[derive(Deserialize)]
struct RawLanguage {
    language: String,
    name: String,
}

/// Which side of a translation a language list describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageType {
    Source,
    Target,
}

impl LanguageType {
    pub fn as_str(self) -> &'static str {
        match self {
            LanguageType::Source => "source",
            LanguageType::Target => "target",
        }
    }
}

/// Source and target language lists, as served on `/languages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedLanguages {
    pub source: Vec<Language>,
    pub target: Vec<Language>,
}

/// The provider's document API.
#[async_trait]
pub trait DocumentProvider: Send + Sync {
    async fn upload(
        &self,
        credential: &ResolvedCredential,
        document: DocumentUpload,
    ) -> Result<DocumentHandle, TranslateError>;

    async fn status(
        &self,
        credential: &ResolvedCredential,
        handle: &DocumentHandle,
    ) -> Result<DocumentStatus, TranslateError>;

    async fn result(
        &self,
        credential: &ResolvedCredential,
        handle: &DocumentHandle,
    ) -> Result<Bytes, TranslateError>;

    async fn usage(&self, credential: &ResolvedCredential) -> Result<UsageSnapshot, TranslateError>;

    async fn languages(
        &self,
        credential: &ResolvedCredential,
        kind: LanguageType,
    ) -> Result<Vec<Language>, TranslateError>;
}

/// Fetch both language lists, source first.
pub async fn supported_languages(
    provider: &dyn DocumentProvider,
    credential: &ResolvedCredential,
) -> Result<SupportedLanguages, TranslateError> {
    let source = provider.languages(credential, LanguageType::Source).await?;
    let target = provider.languages(credential, LanguageType::Target).await?;
    Ok(SupportedLanguages { source, target })
}

/// [`DocumentProvider`] over HTTPS with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpDocumentProvider {
    client: reqwest::Client,
}

impl HttpDocumentProvider {
    /// Build a client whose every call is bounded by `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, TranslateError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("doctrans/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TranslateError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn send(
        &self,
        stage: ProviderStage,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, TranslateError> {
        let response = request.send().await.map_err(|e| transport_error(stage, e))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        warn!("Provider {} call returned HTTP {}", stage, status.as_u16());
        Err(TranslateError::Upstream {
            stage,
            status: status.as_u16(),
            body,
        })
    }

    async fn json<T: serde::de::DeserializeOwned>(
        stage: ProviderStage,
        response: reqwest::Response,
    ) -> Result<T, TranslateError> {
        let bytes = response.bytes().await.map_err(|e| transport_error(stage, e))?;
        serde_json::from_slice(&bytes).map_err(|e| TranslateError::MalformedResponse {
            stage,
            detail: e.to_string(),
        })
    }
}

fn transport_error(stage: ProviderStage, e: reqwest::Error) -> TranslateError {
    let reason = if e.is_timeout() {
        format!("timed out: {e}")
    } else {
        e.to_string()
    };
    TranslateError::ProviderUnreachable { stage, reason }
}

#[async_trait]
impl DocumentProvider for HttpDocumentProvider {
    async fn upload(
        &self,
        credential: &ResolvedCredential,
        document: DocumentUpload,
    ) -> Result<DocumentHandle, TranslateError> {
        let mut form = reqwest::multipart::Form::new();
        for (name, value) in document.form_fields() {
            form = form.text(name, value);
        }
        let part = reqwest::multipart::Part::bytes(document.content)
            .file_name(document.file_name);
        form = form.part("file", part);

        let request = self
            .client
            .post(credential.url("/document"))
            .header(reqwest::header::AUTHORIZATION, credential.credential.authorization())
            .multipart(form);
        let response = self.send(ProviderStage::Upload, request).await?;
        let handle: DocumentHandle = Self::json(ProviderStage::Upload, response).await?;
        debug!("Provider accepted upload");
        Ok(handle)
    }

    async fn status(
        &self,
        credential: &ResolvedCredential,
        handle: &DocumentHandle,
    ) -> Result<DocumentStatus, TranslateError> {
        let request = self
            .client
            .post(credential.url(&format!("/document/{}", handle.document_id)))
            .header(reqwest::header::AUTHORIZATION, credential.credential.authorization())
            .form(&[("document_key", handle.document_key())]);
        let response = self.send(ProviderStage::Status, request).await?;
        let raw: RawStatus = Self::json(ProviderStage::Status, response).await?;
        Ok(raw.into())
    }

    async fn result(
        &self,
        credential: &ResolvedCredential,
        handle: &DocumentHandle,
    ) -> Result<Bytes, TranslateError> {
        let request = self
            .client
            .post(credential.url(&format!("/document/{}/result", handle.document_id)))
            .header(reqwest::header::AUTHORIZATION, credential.credential.authorization())
            .form(&[("document_key", handle.document_key())]);
        let response = self.send(ProviderStage::Result, request).await?;
        response
            .bytes()
            .await
            .map_err(|e| transport_error(ProviderStage::Result, e))
    }

    async fn usage(&self, credential: &ResolvedCredential) -> Result<UsageSnapshot, TranslateError> {
        let request = self
            .client
            .get(credential.url("/usage"))
            .header(reqwest::header::AUTHORIZATION, credential.credential.authorization());
        let response = self.send(ProviderStage::Usage, request).await?;
        let raw: RawUsage = Self::json(ProviderStage::Usage, response).await?;
        Ok(raw.into())
    }

    async fn languages(
        &self,
        credential: &ResolvedCredential,
        kind: LanguageType,
    ) -> Result<Vec<Language>, TranslateError> {
        let request = self
            .client
            .get(credential.url("/languages"))
            .query(&[("type", kind.as_str())])
            .header(reqwest::header::AUTHORIZATION, credential.credential.authorization());
        let response = self.send(ProviderStage::Languages, request).await?;
        let raw: Vec<RawLanguage> = Self::json(ProviderStage::Languages, response).await?;
        Ok(raw
            .into_iter()
            .map(|l| Language {
                code: l.language,
                name: l.name,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::{Credential, Endpoints};
    use mockito::{Matcher, Server};

    fn credential_for(server: &Server, key: &str) -> ResolvedCredential {
        let endpoints = Endpoints {
            free: format!("{}/free", server.url()),
            paid: format!("{}/paid", server.url()),
        };
        ResolvedCredential::new(Credential::new(key).unwrap(), &endpoints)
    }

    fn provider() -> HttpDocumentProvider {
        HttpDocumentProvider::new(Duration::from_secs(5)).unwrap()
    }

    fn upload(source_lang: Option<&str>) -> DocumentUpload {
        DocumentUpload {
            file_name: "report.docx".into(),
            content: b"PK\x03\x04fake".to_vec(),
            target_lang: "FR".into(),
            source_lang: source_lang.map(str::to_string),
        }
    }

    #[test]
    fn form_fields_omit_absent_source_lang() {
        let fields = upload(None).form_fields();
        assert_eq!(fields, vec![("target_lang", "FR".to_string())]);
        let fields = upload(Some("EN")).form_fields();
        assert!(fields.contains(&("source_lang", "EN".to_string())));
    }

    #[test]
    fn unknown_status_is_not_terminal() {
        assert_eq!(DocumentState::from("done"), DocumentState::Done);
        assert_eq!(DocumentState::from("error"), DocumentState::Error);
        assert_eq!(
            DocumentState::from("scheduled"),
            DocumentState::Other("scheduled".into())
        );
    }

    #[test]
    fn handle_debug_hides_key() {
        let h = DocumentHandle::new("ID123", "KEY456");
        let dbg = format!("{h:?}");
        assert!(!dbg.contains("KEY456"));
        assert!(!dbg.contains("ID123"));
    }

    #[tokio::test]
    async fn upload_routes_free_key_and_parses_handle() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/free/document")
            .match_header("authorization", "DeepL-Auth-Key abc:fx")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"name="target_lang"\r\n\r\nFR"#.into()),
                Matcher::Regex(r#"filename="report.docx""#.into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"document_id":"D1","document_key":"K1"}"#)
            .create_async()
            .await;

        let cred = credential_for(&server, "abc:fx");
        let handle = provider().upload(&cred, upload(None)).await.unwrap();
        assert_eq!(handle.document_id, "D1");
        assert_eq!(handle.document_key(), "K1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn upload_error_passes_body_through() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/paid/document")
            .with_status(456)
            .with_body(r#"{"message":"Quota for this billing period has been exceeded"}"#)
            .create_async()
            .await;

        let cred = credential_for(&server, "paid-key");
        let err = provider().upload(&cred, upload(Some("EN"))).await.unwrap_err();
        match err {
            TranslateError::Upstream { stage, status, body } => {
                assert_eq!(stage, ProviderStage::Upload);
                assert_eq!(status, 456);
                assert_eq!(
                    body,
                    r#"{"message":"Quota for this billing period has been exceeded"}"#
                );
            }
            other => panic!("expected Upstream, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn status_sends_document_key() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/free/document/D1")
            .match_body(Matcher::UrlEncoded("document_key".into(), "K1".into()))
            .with_status(200)
            .with_body(r#"{"document_id":"D1","status":"translating","seconds_remaining":20}"#)
            .create_async()
            .await;

        let cred = credential_for(&server, "abc:fx");
        let status = provider()
            .status(&cred, &DocumentHandle::new("D1", "K1"))
            .await
            .unwrap();
        assert_eq!(status.state, DocumentState::Translating);
        assert_eq!(status.seconds_remaining, Some(20));
    }

    #[tokio::test]
    async fn status_garbage_is_malformed_response() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/free/document/D1")
            .with_status(200)
            .with_body("<html>oops</html>")
            .create_async()
            .await;

        let cred = credential_for(&server, "abc:fx");
        let err = provider()
            .status(&cred, &DocumentHandle::new("D1", "K1"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TranslateError::MalformedResponse {
                stage: ProviderStage::Status,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn result_returns_raw_bytes() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/free/document/D1/result")
            .match_body(Matcher::UrlEncoded("document_key".into(), "K1".into()))
            .with_status(200)
            .with_header("content-type", "application/octet-stream")
            .with_body(b"\x00translated\xff".to_vec())
            .create_async()
            .await;

        let cred = credential_for(&server, "abc:fx");
        let bytes = provider()
            .result(&cred, &DocumentHandle::new("D1", "K1"))
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"\x00translated\xff");
    }

    #[tokio::test]
    async fn usage_defaults_missing_fields_to_zero() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/paid/usage")
            .with_status(200)
            .with_body(r#"{"character_count":180118,"character_limit":1250000}"#)
            .create_async()
            .await;

        let cred = credential_for(&server, "paid-key");
        let usage = provider().usage(&cred).await.unwrap();
        assert_eq!(usage.character_count, 180118);
        assert_eq!(usage.character_limit, 1250000);
        assert_eq!(usage.document_count, 0);
        assert_eq!(usage.document_limit, 0);
    }

    #[tokio::test]
    async fn languages_are_renamed_and_queried_by_type() {
        let mut server = Server::new_async().await;
        let _source = server
            .mock("GET", "/free/languages")
            .match_query(Matcher::UrlEncoded("type".into(), "source".into()))
            .with_status(200)
            .with_body(r#"[{"language":"EN","name":"English"}]"#)
            .create_async()
            .await;
        let _target = server
            .mock("GET", "/free/languages")
            .match_query(Matcher::UrlEncoded("type".into(), "target".into()))
            .with_status(200)
            .with_body(
                r#"[{"language":"DE","name":"German","supports_formality":true},{"language":"FR","name":"French"}]"#,
            )
            .create_async()
            .await;

        let cred = credential_for(&server, "abc:fx");
        let provider = provider();
        let langs = supported_languages(&provider, &cred).await.unwrap();
        assert_eq!(
            langs.source,
            vec![Language {
                code: "EN".into(),
                name: "English".into()
            }]
        );
        assert_eq!(langs.target.len(), 2);
        assert_eq!(langs.target[1].code, "FR");
    }

    #[tokio::test]
    async fn unreachable_provider_is_reported() {
        let endpoints = Endpoints {
            free: "http://127.0.0.1:9/v2".into(),
            paid: "http://127.0.0.1:9/v2".into(),
        };
        let cred = ResolvedCredential::new(Credential::new("k").unwrap(), &endpoints);
        let err = provider().usage(&cred).await.unwrap_err();
        assert!(matches!(
            err,
            TranslateError::ProviderUnreachable {
                stage: ProviderStage::Usage,
                ..
            }
        ));
    }
}
