//! Firestore REST API client.
//!
//! - Token caching with refresh margin, one forced refresh on expired tokens
//! - Pooled HTTP client with request and connect timeouts
//! - Tracing span and metrics per request
//! - Transactions: begin, transactional reads, commit, rollback

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use gcp_auth::{CustomServiceAccount, TokenProvider};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::{debug, info_span, Instrument};

use crate::error::{FirestoreError, FirestoreResult};
use crate::metrics::record_request;
use crate::retry::RetryConfig;
use crate::token_cache::TokenCache;
use crate::types::{
    BeginTransactionRequest, BeginTransactionResponse, CommitRequest, CommitResponse, Document,
    RollbackRequest, RunQueryRequest, RunQueryResponse, StructuredQuery, Value, Write,
};

/// Bearer token the Firestore emulator accepts for admin access.
const EMULATOR_TOKEN: &str = "owner";

/// Max writes per commit.
pub const MAX_WRITES_PER_COMMIT: usize = 500;

#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    pub project_id: String,
    /// Database ID (usually "(default)")
    pub database_id: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub retry: RetryConfig,
    /// `host:port` of a local emulator; skips service-account auth
    pub emulator_host: Option<String>,
}

impl FirestoreConfig {
    pub fn from_env() -> FirestoreResult<Self> {
        let project_id = std::env::var("GCP_PROJECT_ID")
            .or_else(|_| std::env::var("FIREBASE_PROJECT_ID"))
            .map_err(|_| {
                FirestoreError::auth_error(
                    "GCP_PROJECT_ID or FIREBASE_PROJECT_ID must be set to access Firestore",
                )
            })?;

        if project_id.trim().is_empty() {
            return Err(FirestoreError::auth_error(
                "GCP_PROJECT_ID or FIREBASE_PROJECT_ID cannot be empty",
            ));
        }

        let connect_timeout_secs: u64 = std::env::var("FIRESTORE_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        Ok(Self {
            project_id,
            database_id: std::env::var("FIRESTORE_DATABASE_ID")
                .unwrap_or_else(|_| "(default)".to_string()),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            retry: RetryConfig::from_env(),
            emulator_host: std::env::var("FIRESTORE_EMULATOR_HOST")
                .ok()
                .filter(|h| !h.trim().is_empty()),
        })
    }

    /// Resource prefix for document names.
    pub fn documents_root(&self) -> String {
        format!(
            "projects/{}/databases/{}/documents",
            self.project_id, self.database_id
        )
    }
}

#[derive(Clone)]
pub struct FirestoreClient {
    http: Client,
    config: FirestoreConfig,
    base_url: String,
    token_cache: Arc<TokenCache>,
}

impl FirestoreClient {
    pub async fn new(config: FirestoreConfig) -> FirestoreResult<Self> {
        let (endpoint, tokens) = match &config.emulator_host {
            Some(host) => (format!("http://{}", host), TokenCache::fixed(EMULATOR_TOKEN)),
            None => (
                "https://firestore.googleapis.com".to_string(),
                TokenCache::new(Self::create_auth_provider()?),
            ),
        };
        Self::with_endpoint(config, &endpoint, tokens)
    }

    /// Client against an explicit endpoint (emulator, mock server).
    pub fn with_endpoint(
        config: FirestoreConfig,
        endpoint: &str,
        token_cache: TokenCache,
    ) -> FirestoreResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("reelcut-firestore/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FirestoreError::Network)?;

        let base_url = format!(
            "{}/v1/{}",
            endpoint.trim_end_matches('/'),
            config.documents_root()
        );

        Ok(Self {
            http,
            config,
            base_url,
            token_cache: Arc::new(token_cache),
        })
    }

    pub async fn from_env() -> FirestoreResult<Self> {
        Self::new(FirestoreConfig::from_env()?).await
    }

    fn create_auth_provider() -> FirestoreResult<Arc<dyn TokenProvider>> {
        let service_account = CustomServiceAccount::from_env().map_err(|e| {
            FirestoreError::auth_error(format!("Failed to load service account: {}", e))
        })?;

        match service_account {
            Some(sa) => Ok(Arc::new(sa)),
            None => Err(FirestoreError::auth_error(
                "GOOGLE_APPLICATION_CREDENTIALS not set. \
                 Set it to the path of your service account JSON file.",
            )),
        }
    }

    pub fn config(&self) -> &FirestoreConfig {
        &self.config
    }

    /// Full resource name, as used in writes and transactional deletes.
    pub fn document_name(&self, collection: &str, doc_id: &str) -> String {
        format!("{}/{}/{}", self.config.documents_root(), collection, doc_id)
    }

    fn document_url(&self, collection: &str, doc_id: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            collection,
            urlencoding::encode(doc_id)
        )
    }

    fn is_access_token_expired(body: &str) -> bool {
        body.contains("ACCESS_TOKEN_EXPIRED") || body.contains("\"UNAUTHENTICATED\"")
    }

    /// Send with a bearer token, refreshing once if the token was rejected as expired.
    async fn send_authorized<F>(&self, url: &str, build: F) -> FirestoreResult<Response>
    where
        F: Fn(&str) -> RequestBuilder,
    {
        let token = self.token_cache.get_token().await?;
        let response = build(&token).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if !Self::is_access_token_expired(&body) {
            return Err(FirestoreError::from_http_status(
                401,
                format!("{} failed: {}", url, body),
            ));
        }

        debug!("Access token expired, refreshing");
        self.token_cache.invalidate().await;
        let token = self.token_cache.get_token().await?;
        Ok(build(&token).send().await?)
    }

    pub async fn get_document(
        &self,
        collection: &str,
        doc_id: &str,
    ) -> FirestoreResult<Option<Document>> {
        let url = self.document_url(collection, doc_id);

        self.execute_request("get_document", collection, Some(doc_id), async {
            let response = self
                .send_authorized(&url, |token| self.http.get(&url).bearer_auth(token))
                .await?;

            match response.status() {
                StatusCode::OK => Ok(Some(response.json().await?)),
                StatusCode::NOT_FOUND => Ok(None),
                status => Err(Self::error_from_response(status, &url, response).await),
            }
        })
        .await
    }

    pub async fn create_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
    ) -> FirestoreResult<Document> {
        let url = format!(
            "{}/{}?documentId={}",
            self.base_url,
            collection,
            urlencoding::encode(doc_id)
        );
        let body = Document::new(fields);

        self.execute_request("create_document", collection, Some(doc_id), async {
            let response = self
                .send_authorized(&url, |token| self.http.post(&url).bearer_auth(token).json(&body))
                .await?;

            match response.status() {
                StatusCode::OK | StatusCode::CREATED => Ok(response.json().await?),
                StatusCode::CONFLICT => Err(FirestoreError::AlreadyExists(format!(
                    "{}/{}",
                    collection, doc_id
                ))),
                status => Err(Self::error_from_response(status, &url, response).await),
            }
        })
        .await
    }

    /// Merge `fields` into an existing document. With a mask, only the masked
    /// paths are written; a masked path absent from `fields` is deleted.
    pub async fn update_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
        update_mask: Option<Vec<String>>,
    ) -> FirestoreResult<Document> {
        self.patch_document("update_document", collection, doc_id, fields, update_mask, None)
            .await
    }

    /// Update that only applies if the document is still at `update_time`.
    pub async fn update_document_with_precondition(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
        update_mask: Option<Vec<String>>,
        update_time: &str,
    ) -> FirestoreResult<Document> {
        self.patch_document(
            "update_document_precondition",
            collection,
            doc_id,
            fields,
            update_mask,
            Some(update_time),
        )
        .await
    }

    async fn patch_document(
        &self,
        operation: &str,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
        update_mask: Option<Vec<String>>,
        update_time: Option<&str>,
    ) -> FirestoreResult<Document> {
        let mut params: Vec<String> = update_mask
            .unwrap_or_default()
            .iter()
            .map(|f| format!("updateMask.fieldPaths={}", f))
            .collect();
        match update_time {
            Some(ts) => params.push(format!(
                "currentDocument.updateTime={}",
                urlencoding::encode(ts)
            )),
            // Never create a document through an update
            None => params.push("currentDocument.exists=true".to_string()),
        }
        let url = format!("{}?{}", self.document_url(collection, doc_id), params.join("&"));
        let body = Document::new(fields);

        self.execute_request(operation, collection, Some(doc_id), async {
            let response = self
                .send_authorized(&url, |token| self.http.patch(&url).bearer_auth(token).json(&body))
                .await?;

            match response.status() {
                StatusCode::OK => Ok(response.json().await?),
                StatusCode::NOT_FOUND => Err(FirestoreError::not_found(format!(
                    "{}/{}",
                    collection, doc_id
                ))),
                StatusCode::PRECONDITION_FAILED | StatusCode::CONFLICT => {
                    let body = response.text().await.unwrap_or_default();
                    Err(FirestoreError::PreconditionFailed(body))
                }
                StatusCode::BAD_REQUEST => {
                    let body = response.text().await.unwrap_or_default();
                    if body.contains("FAILED_PRECONDITION") {
                        Err(FirestoreError::PreconditionFailed(body))
                    } else {
                        Err(FirestoreError::request_failed(format!("{} failed: {}", url, body)))
                    }
                }
                status => Err(Self::error_from_response(status, &url, response).await),
            }
        })
        .await
    }

    /// Delete a document. Deleting a missing document succeeds.
    pub async fn delete_document(&self, collection: &str, doc_id: &str) -> FirestoreResult<()> {
        let url = self.document_url(collection, doc_id);

        self.execute_request("delete_document", collection, Some(doc_id), async {
            let response = self
                .send_authorized(&url, |token| self.http.delete(&url).bearer_auth(token))
                .await?;

            match response.status() {
                StatusCode::OK | StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => Ok(()),
                status => Err(Self::error_from_response(status, &url, response).await),
            }
        })
        .await
    }

    /// Run a query over top-level collections, optionally inside a transaction.
    pub async fn run_query(
        &self,
        query: StructuredQuery,
        transaction: Option<&str>,
    ) -> FirestoreResult<Vec<Document>> {
        let url = format!("{}:runQuery", self.base_url);
        let collection = query
            .from
            .first()
            .map(|c| c.collection_id.clone())
            .unwrap_or_default();
        let request = RunQueryRequest {
            structured_query: query,
            transaction: transaction.map(str::to_string),
        };

        self.execute_request("run_query", &collection, None, async {
            let response = self
                .send_authorized(&url, |token| self.http.post(&url).bearer_auth(token).json(&request))
                .await?;

            match response.status() {
                StatusCode::OK => {
                    let body = response.text().await.unwrap_or_default();
                    // runQuery streams a JSON array of result frames
                    let frames: Vec<RunQueryResponse> = serde_json::from_str(&body).map_err(|e| {
                        FirestoreError::InvalidResponse(format!(
                            "runQuery: {} (body prefix: {})",
                            e,
                            body.chars().take(200).collect::<String>()
                        ))
                    })?;
                    Ok(frames.into_iter().filter_map(|f| f.document).collect())
                }
                status => Err(Self::error_from_response(status, &url, response).await),
            }
        })
        .await
    }

    /// Start a read-write transaction and return its id.
    pub async fn begin_transaction(&self) -> FirestoreResult<String> {
        let url = format!("{}:beginTransaction", self.base_url);
        let request = BeginTransactionRequest::default();

        self.execute_request("begin_transaction", "transaction", None, async {
            let response = self
                .send_authorized(&url, |token| self.http.post(&url).bearer_auth(token).json(&request))
                .await?;

            match response.status() {
                StatusCode::OK => {
                    let begun: BeginTransactionResponse = response.json().await?;
                    Ok(begun.transaction)
                }
                status => Err(Self::error_from_response(status, &url, response).await),
            }
        })
        .await
    }

    /// Apply writes atomically, inside `transaction` if given.
    pub async fn commit(
        &self,
        writes: Vec<Write>,
        transaction: Option<String>,
    ) -> FirestoreResult<CommitResponse> {
        if writes.len() > MAX_WRITES_PER_COMMIT {
            return Err(FirestoreError::request_failed(format!(
                "commit of {} writes exceeds the {} write limit",
                writes.len(),
                MAX_WRITES_PER_COMMIT
            )));
        }

        let url = format!("{}:commit", self.base_url);
        let request = CommitRequest { writes, transaction };

        self.execute_request("commit", "transaction", None, async {
            let response = self
                .send_authorized(&url, |token| self.http.post(&url).bearer_auth(token).json(&request))
                .await?;

            match response.status() {
                StatusCode::OK => Ok(response.json().await?),
                StatusCode::CONFLICT => {
                    let body = response.text().await.unwrap_or_default();
                    Err(FirestoreError::transaction_failed(body))
                }
                status => Err(Self::error_from_response(status, &url, response).await),
            }
        })
        .await
    }

    pub async fn rollback(&self, transaction: String) -> FirestoreResult<()> {
        let url = format!("{}:rollback", self.base_url);
        let request = RollbackRequest { transaction };

        self.execute_request("rollback", "transaction", None, async {
            let response = self
                .send_authorized(&url, |token| self.http.post(&url).bearer_auth(token).json(&request))
                .await?;

            match response.status() {
                StatusCode::OK => Ok(()),
                status => Err(Self::error_from_response(status, &url, response).await),
            }
        })
        .await
    }

    pub async fn with_retry<T, F, Fut>(&self, operation: &str, op: F) -> FirestoreResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = FirestoreResult<T>>,
    {
        crate::retry::with_retry(&self.config.retry, operation, op).await
    }

    async fn execute_request<T, F>(
        &self,
        operation: &str,
        collection: &str,
        doc_id: Option<&str>,
        fut: F,
    ) -> FirestoreResult<T>
    where
        F: std::future::Future<Output = FirestoreResult<T>>,
    {
        let span = match doc_id {
            Some(id) => info_span!("firestore_request", operation = %operation, collection = %collection, doc_id = %id),
            None => info_span!("firestore_request", operation = %operation, collection = %collection),
        };

        let start = Instant::now();
        let result = fut.instrument(span).await;
        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.http_status().unwrap_or(500),
        };
        record_request(operation, status, start.elapsed().as_millis() as f64);

        result
    }

    async fn error_from_response(status: StatusCode, url: &str, response: Response) -> FirestoreError {
        let body = response.text().await.unwrap_or_default();
        FirestoreError::from_http_status(status.as_u16(), format!("{} failed: {}", url, body))
    }
}
