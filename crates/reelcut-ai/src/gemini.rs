//! Gemini client: media upload through the Files API and structured JSON generation.

use async_trait::async_trait;
use schemars::gen::SchemaSettings;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};

use reqwest::Client;
use tracing::{debug, info, warn};

use crate::error::{AiError, AiResult};
use crate::retry::{record_call, with_retry};

const SERVICE: &str = "gemini";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    /// Per-request timeout for generation calls
    pub timeout: Duration,
    /// Timeout for the media byte upload
    pub upload_timeout: Duration,
    pub poll_interval: Duration,
    /// Max time to wait for an uploaded file to become ACTIVE
    pub max_processing_wait: Duration,
}

impl GeminiConfig {
    pub fn from_env() -> AiResult<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AiError::config_error("GEMINI_API_KEY not set"))?;

        Ok(Self {
            api_key,
            model: std::env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.5-pro".to_string()),
            base_url: std::env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string()),
            timeout: Duration::from_secs(300),
            upload_timeout: Duration::from_secs(1800),
            poll_interval: Duration::from_secs(2),
            max_processing_wait: Duration::from_secs(600),
        })
    }
}

/// A file the model can read, as returned by the Files API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRef {
    /// Resource name (`files/abc123`)
    pub name: String,
    pub uri: String,
    pub mime_type: String,
}

/// One structured-output request.
#[derive(Debug, Clone)]
pub struct ModelPrompt {
    pub media: Option<MediaRef>,
    pub text: String,
    /// JSON Schema the response must follow
    pub schema: serde_json::Value,
}

/// A model that reads media and answers with schema-shaped JSON.
///
/// `generate_json` makes exactly one model call; callers own the retry policy.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn upload_media(&self, path: &Path, mime_type: &str) -> AiResult<MediaRef>;

    async fn delete_media(&self, media: &MediaRef) -> AiResult<()>;

    async fn generate_json(&self, prompt: &ModelPrompt) -> AiResult<serde_json::Value>;
}

/// JSON Schema for `T` with all subschemas inlined, as the API expects.
pub fn response_schema<T: JsonSchema>() -> serde_json::Value {
    let generator = SchemaSettings::draft07()
        .with(|s| {
            s.inline_subschemas = true;
            s.meta_schema = None;
        })
        .into_generator();
    serde_json::to_value(generator.into_root_schema_for::<T>()).unwrap_or_default()
}

/// Strip a surrounding ```json fence if the model added one.
pub fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    text.strip_suffix("```").unwrap_or(text).trim()
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    file_data: Option<FileData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileData {
    mime_type: String,
    file_uri: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_json_schema: serde_json::Value,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<ResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: FileResource,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileResource {
    name: String,
    uri: String,
    mime_type: String,
    state: Option<String>,
    error: Option<serde_json::Value>,
}

impl FileResource {
    fn media_ref(&self) -> MediaRef {
        MediaRef {
            name: self.name.clone(),
            uri: self.uri.clone(),
            mime_type: self.mime_type.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct GeminiClient {
    http: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> AiResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { http, config })
    }

    pub fn from_env() -> AiResult<Self> {
        Self::new(GeminiConfig::from_env()?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn get_file(&self, name: &str) -> AiResult<FileResource> {
        let response = self
            .http
            .get(self.url(&format!("v1beta/{}", name)))
            .header("x-goog-api-key", &self.config.api_key)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(AiError::from_response(SERVICE, response).await);
        }
        Ok(response.json().await?)
    }

    async fn wait_until_active(&self, mut file: FileResource) -> AiResult<MediaRef> {
        let started = Instant::now();
        loop {
            match file.state.as_deref() {
                Some("ACTIVE") | None => return Ok(file.media_ref()),
                Some("FAILED") => {
                    return Err(AiError::MediaNotReady(format!(
                        "{} failed processing: {}",
                        file.name,
                        file.error.map(|e| e.to_string()).unwrap_or_default()
                    )))
                }
                Some(state) => {
                    if started.elapsed() >= self.config.max_processing_wait {
                        return Err(AiError::Timeout {
                            service: SERVICE,
                            secs: self.config.max_processing_wait.as_secs(),
                        });
                    }
                    debug!(file = %file.name, state, "Waiting for uploaded media to become active");
                }
            }
            tokio::time::sleep(self.config.poll_interval).await;
            let name = file.name.clone();
            file = with_retry(SERVICE, 2, || self.get_file(&name)).await?;
        }
    }

    async fn upload_bytes(&self, path: &Path, mime_type: &str) -> AiResult<FileResource> {
        let size = tokio::fs::metadata(path).await?.len();
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "media".to_string());

        let start = self
            .http
            .post(self.url("upload/v1beta/files"))
            .header("x-goog-api-key", &self.config.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", size.to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&serde_json::json!({ "file": { "display_name": display_name } }))
            .send()
            .await?;
        if !start.status().is_success() {
            return Err(AiError::from_response(SERVICE, start).await);
        }

        let upload_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| AiError::invalid_response(SERVICE, "upload start returned no upload URL"))?;

        let file = tokio::fs::File::open(path).await?;
        let finish = self
            .http
            .post(&upload_url)
            .timeout(self.config.upload_timeout)
            .header("Content-Length", size.to_string())
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(file)
            .send()
            .await?;
        if !finish.status().is_success() {
            return Err(AiError::from_response(SERVICE, finish).await);
        }

        let uploaded: UploadResponse = finish.json().await?;
        info!(file = %uploaded.file.name, bytes = size, "Uploaded media to Gemini");
        Ok(uploaded.file)
    }

    fn build_request(prompt: &ModelPrompt) -> GenerateContentRequest {
        let mut parts = Vec::new();
        if let Some(media) = &prompt.media {
            parts.push(Part {
                file_data: Some(FileData {
                    mime_type: media.mime_type.clone(),
                    file_uri: media.uri.clone(),
                }),
                text: None,
            });
        }
        parts.push(Part {
            file_data: None,
            text: Some(prompt.text.clone()),
        });

        GenerateContentRequest {
            contents: vec![Content { role: "user", parts }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_json_schema: prompt.schema.clone(),
                temperature: 0.4,
            },
        }
    }

    fn response_text(response: GenerateContentResponse) -> AiResult<String> {
        if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(AiError::invalid_response(SERVICE, format!("prompt blocked: {}", reason)));
        }

        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| AiError::invalid_response(SERVICE, "no candidates"))?;

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(AiError::invalid_response(
                SERVICE,
                format!(
                    "empty response (finish reason {})",
                    candidate.finish_reason.as_deref().unwrap_or("unknown")
                ),
            ));
        }
        Ok(text)
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn upload_media(&self, path: &Path, mime_type: &str) -> AiResult<MediaRef> {
        let file = self.upload_bytes(path, mime_type).await?;
        self.wait_until_active(file).await
    }

    async fn delete_media(&self, media: &MediaRef) -> AiResult<()> {
        let response = self
            .http
            .delete(self.url(&format!("v1beta/{}", media.name)))
            .header("x-goog-api-key", &self.config.api_key)
            .send()
            .await?;
        if !response.status().is_success() && response.status() != reqwest::StatusCode::NOT_FOUND {
            warn!(file = %media.name, status = %response.status(), "Failed to delete uploaded media");
            return Err(AiError::from_response(SERVICE, response).await);
        }
        Ok(())
    }

    async fn generate_json(&self, prompt: &ModelPrompt) -> AiResult<serde_json::Value> {
        let started = Instant::now();
        let url = self.url(&format!("v1beta/models/{}:generateContent", self.config.model));

        let result: AiResult<serde_json::Value> = async {
            let response = self
                .http
                .post(&url)
                .header("x-goog-api-key", &self.config.api_key)
                .json(&Self::build_request(prompt))
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(AiError::from_response(SERVICE, response).await);
            }

            let text = Self::response_text(response.json().await?)?;
            serde_json::from_str(strip_code_fences(&text)).map_err(|e| {
                AiError::invalid_response(SERVICE, format!("response is not valid JSON: {}", e))
            })
        }
        .await;

        record_call(SERVICE, result.is_ok(), started);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GeminiClient {
        GeminiClient::new(GeminiConfig {
            api_key: "test-key".to_string(),
            model: "gemini-test".to_string(),
            base_url: server.uri(),
            timeout: Duration::from_secs(5),
            upload_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(10),
            max_processing_wait: Duration::from_secs(2),
        })
        .unwrap()
    }

    #[derive(JsonSchema)]
    #[allow(dead_code)]
    struct Inner {
        value: u32,
    }

    #[derive(JsonSchema)]
    #[allow(dead_code)]
    struct Outer {
        items: Vec<Inner>,
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  {\"a\":1} "), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n[]\n```"), "[]");
    }

    #[test]
    fn test_response_schema_is_inlined() {
        let schema = response_schema::<Outer>();
        assert!(schema.get("$schema").is_none());
        assert!(schema.get("definitions").is_none());
        assert_eq!(schema["properties"]["items"]["items"]["type"], "object");
    }

    #[tokio::test]
    async fn test_generate_json_sends_schema_and_parses_fenced_output() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-test:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(json!({
                "contents": [{"role": "user", "parts": [
                    {"fileData": {"mimeType": "video/mp4", "fileUri": "https://files/abc"}},
                    {"text": "pick clips"}
                ]}],
                "generationConfig": {"responseMimeType": "application/json"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [{"text": "```json\n{\"clips\": []}\n```"}]}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let prompt = ModelPrompt {
            media: Some(MediaRef {
                name: "files/abc".to_string(),
                uri: "https://files/abc".to_string(),
                mime_type: "video/mp4".to_string(),
            }),
            text: "pick clips".to_string(),
            schema: json!({"type": "object"}),
        };
        let value = client(&server).generate_json(&prompt).await.unwrap();
        assert_eq!(value, json!({"clips": []}));
    }

    #[tokio::test]
    async fn test_generate_json_does_not_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .expect(1)
            .mount(&server)
            .await;

        let prompt = ModelPrompt {
            media: None,
            text: "x".to_string(),
            schema: json!({}),
        };
        let err = client(&server).generate_json(&prompt).await.unwrap_err();
        assert!(matches!(err, AiError::Http { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_blocked_prompt_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "promptFeedback": {"blockReason": "SAFETY"}
            })))
            .mount(&server)
            .await;

        let prompt = ModelPrompt {
            media: None,
            text: "x".to_string(),
            schema: json!({}),
        };
        let err = client(&server).generate_json(&prompt).await.unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[tokio::test]
    async fn test_upload_media_waits_for_active() {
        let server = MockServer::start().await;
        let upload_url = format!("{}/resumable/session-1", server.uri());

        Mock::given(method("POST"))
            .and(path("/upload/v1beta/files"))
            .and(header("X-Goog-Upload-Command", "start"))
            .respond_with(ResponseTemplate::new(200).insert_header("x-goog-upload-url", upload_url.as_str()))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/resumable/session-1"))
            .and(header("X-Goog-Upload-Command", "upload, finalize"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"file": {
                "name": "files/abc", "uri": "https://files/abc",
                "mimeType": "video/mp4", "state": "PROCESSING"
            }})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1beta/files/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "files/abc", "uri": "https://files/abc",
                "mimeType": "video/mp4", "state": "ACTIVE"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("source.mp4");
        tokio::fs::write(&video, b"not really a video").await.unwrap();

        let media = client(&server).upload_media(&video, "video/mp4").await.unwrap();
        assert_eq!(media.name, "files/abc");
        assert_eq!(media.uri, "https://files/abc");
    }
}
