//! Shot-boundary detection service client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use reelcut_models::ShotBoundary;

use crate::error::{AiError, AiResult};
use crate::retry::with_retry;

const SERVICE: &str = "shots";

/// Configuration for the shot-detection service.
#[derive(Debug, Clone)]
pub struct ShotServiceConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
}

impl ShotServiceConfig {
    pub fn from_env() -> AiResult<Self> {
        let base_url = std::env::var("SHOT_SERVICE_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| AiError::config_error("SHOT_SERVICE_URL not set"))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(
                std::env::var("SHOT_SERVICE_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            ),
            max_retries: std::env::var("SHOT_SERVICE_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
        })
    }
}

/// Scene-cut detection over a remote video.
#[async_trait]
pub trait ShotDetector: Send + Sync {
    async fn detect_shots(&self, video_url: &str) -> AiResult<Vec<ShotBoundary>>;
}

#[derive(Debug, Serialize)]
struct DetectShotsRequest<'a> {
    video_url: &'a str,
}

#[derive(Debug, Deserialize)]
struct DetectShotsResponse {
    #[serde(default)]
    shots: Vec<ShotBoundary>,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

pub struct ShotServiceClient {
    http: Client,
    config: ShotServiceConfig,
}

impl ShotServiceClient {
    pub fn new(config: ShotServiceConfig) -> AiResult<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    pub fn from_env() -> AiResult<Self> {
        Self::new(ShotServiceConfig::from_env()?)
    }

    /// Check if the service is up. Never fails; an unreachable service is unhealthy.
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/health", self.config.base_url);
        match self.http.get(&url).send().await {
            Ok(response) if response.status().is_success() => response
                .json::<HealthResponse>()
                .await
                .map(|h| h.status == "healthy" || h.status == "ok")
                .unwrap_or(false),
            Ok(response) => {
                warn!("Shot service health check failed: {}", response.status());
                false
            }
            Err(e) => {
                warn!("Shot service health check error: {}", e);
                false
            }
        }
    }
}

#[async_trait]
impl ShotDetector for ShotServiceClient {
    async fn detect_shots(&self, video_url: &str) -> AiResult<Vec<ShotBoundary>> {
        let url = format!("{}/detect-shots", self.config.base_url);
        debug!("Sending shot detection request to {}", url);

        let parsed: DetectShotsResponse = with_retry(SERVICE, self.config.max_retries, || async {
            let response = self
                .http
                .post(&url)
                .json(&DetectShotsRequest { video_url })
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(AiError::from_response(SERVICE, response).await);
            }
            Ok::<DetectShotsResponse, AiError>(response.json().await?)
        })
        .await?;

        let mut shots: Vec<ShotBoundary> = parsed
            .shots
            .into_iter()
            .filter(|s| s.start_time.is_finite() && s.end_time.is_finite() && s.end_time >= s.start_time)
            .collect();
        shots.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        Ok(shots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, max_retries: u32) -> ShotServiceClient {
        ShotServiceClient::new(ShotServiceConfig {
            base_url: server.uri(),
            timeout: Duration::from_secs(5),
            max_retries,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_detect_shots_sorts_and_drops_garbage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/detect-shots"))
            .and(body_json(json!({"video_url": "https://cdn/v.mp4"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "shots": [
                    {"startTime": 8.0, "endTime": 15.0},
                    {"startTime": 0.0, "endTime": 8.0},
                    {"startTime": 20.0, "endTime": 19.0}
                ]
            })))
            .mount(&server)
            .await;

        let shots = client(&server, 0).detect_shots("https://cdn/v.mp4").await.unwrap();
        assert_eq!(
            shots,
            vec![
                ShotBoundary { start_time: 0.0, end_time: 8.0 },
                ShotBoundary { start_time: 8.0, end_time: 15.0 },
            ]
        );
    }

    #[tokio::test]
    async fn test_detect_shots_retries_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"shots": []})))
            .mount(&server)
            .await;

        let shots = client(&server, 1).detect_shots("https://cdn/v.mp4").await.unwrap();
        assert!(shots.is_empty());
    }

    #[tokio::test]
    async fn test_health_check() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
            .mount(&server)
            .await;
        assert!(client(&server, 0).health_check().await);
    }

    #[test]
    #[serial]
    fn test_config_from_env() {
        std::env::remove_var("SHOT_SERVICE_URL");
        assert!(ShotServiceConfig::from_env().is_err());

        std::env::set_var("SHOT_SERVICE_URL", "http://shots:8001/");
        std::env::set_var("SHOT_SERVICE_TIMEOUT", "60");
        let config = ShotServiceConfig::from_env().unwrap();
        assert_eq!(config.base_url, "http://shots:8001");
        assert_eq!(config.timeout, Duration::from_secs(60));
        std::env::remove_var("SHOT_SERVICE_URL");
        std::env::remove_var("SHOT_SERVICE_TIMEOUT");
    }
}
