//! recommender.rs
//!
//! Client for the external recommendation service, which owns embedding
//! generation and personalized event ranking. Both calls are best-effort:
//! event creation proceeds without an embedding and the recommendations
//! endpoint degrades to an empty list, so a dead service never takes the API
//! down with it. Outbound calls go through a circuit breaker so a dead
//! service is not hammered on every request.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::{CircuitBreakerConfig, RecommenderConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation, requests allowed.
    Closed,
    /// Too many consecutive failures, requests blocked until the timeout.
    Open,
    /// Timeout elapsed, one probe request allowed through.
    HalfOpen,
}

pub struct CircuitBreaker {
    state: RwLock<CircuitState>,
    failure_count: AtomicU32,
    last_failure: Mutex<Option<Instant>>,
    failure_threshold: u32,
    timeout: Duration,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, timeout: Duration) -> Self {
        Self {
            state: RwLock::new(CircuitState::Closed),
            failure_count: AtomicU32::new(0),
            last_failure: Mutex::new(None),
            failure_threshold,
            timeout,
        }
    }

    pub fn can_execute(&self) -> bool {
        let state = *self.state.read().unwrap();
        match state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let elapsed = self
                    .last_failure
                    .lock()
                    .unwrap()
                    .map(|at| at.elapsed())
                    .unwrap_or(Duration::MAX);
                if elapsed >= self.timeout {
                    *self.state.write().unwrap() = CircuitState::HalfOpen;
                    info!("recommender circuit breaker transitioning to HalfOpen");
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut state = self.state.write().unwrap();
        if *state == CircuitState::HalfOpen {
            info!("recommender circuit breaker recovered, closing");
        }
        *state = CircuitState::Closed;
        self.failure_count.store(0, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        let failures = self.failure_count.fetch_add(1, Ordering::Relaxed) + 1;
        *self.last_failure.lock().unwrap() = Some(Instant::now());

        let mut state = self.state.write().unwrap();
        match *state {
            CircuitState::Closed if failures >= self.failure_threshold => {
                *state = CircuitState::Open;
                error!(
                    "recommender circuit breaker OPENED after {} failures",
                    failures
                );
            }
            CircuitState::HalfOpen => {
                *state = CircuitState::Open;
                warn!("recommender probe failed, reopening circuit breaker");
            }
            _ => {}
        }
    }

    pub fn state(&self) -> CircuitState {
        *self.state.read().unwrap()
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    title: &'a str,
    description: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct RecommendRequest {
    user_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RecommendResponse {
    recommendations: Vec<serde_json::Value>,
}

#[derive(Clone)]
pub struct RecommenderClient {
    http_client: reqwest::Client,
    base_url: String,
    breaker: std::sync::Arc<CircuitBreaker>,
}

impl RecommenderClient {
    pub fn from_config(config: &RecommenderConfig, breaker: &CircuitBreakerConfig) -> Self {
        Self {
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_seconds))
                .build()
                .expect("Failed to create HTTP client"),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            breaker: std::sync::Arc::new(CircuitBreaker::new(
                breaker.failure_threshold,
                Duration::from_secs(breaker.timeout_seconds),
            )),
        }
    }

    /// Ask the service for an embedding of a new event. Best-effort: returns
    /// `None` on any failure and the event is stored without one.
    pub async fn generate_embedding(&self, title: &str, description: &str) -> Option<Vec<f32>> {
        if !self.breaker.can_execute() {
            warn!("recommender circuit breaker open, skipping embedding generation");
            return None;
        }

        let result = self
            .http_client
            .post(format!("{}/generate-embedding", self.base_url))
            .json(&EmbeddingRequest { title, description })
            .send()
            .await
            .and_then(|resp| resp.error_for_status());

        match result {
            Ok(resp) => match resp.json::<EmbeddingResponse>().await {
                Ok(body) => {
                    self.breaker.record_success();
                    Some(body.embedding)
                }
                Err(err) => {
                    self.breaker.record_failure();
                    error!("embedding response parse failed: {:?}", err);
                    None
                }
            },
            Err(err) => {
                self.breaker.record_failure();
                error!("embedding generation failed: {:?}", err);
                None
            }
        }
    }

    /// Personalized event recommendations. Degrades to an empty list when the
    /// service is unavailable.
    pub async fn recommend(&self, user_id: Option<i64>) -> Vec<serde_json::Value> {
        if !self.breaker.can_execute() {
            warn!("recommender circuit breaker open, returning no recommendations");
            return vec![];
        }

        let result = self
            .http_client
            .post(format!("{}/recommend", self.base_url))
            .json(&RecommendRequest { user_id })
            .send()
            .await
            .and_then(|resp| resp.error_for_status());

        match result {
            Ok(resp) => match resp.json::<RecommendResponse>().await {
                Ok(body) => {
                    self.breaker.record_success();
                    body.recommendations
                }
                Err(err) => {
                    self.breaker.record_failure();
                    error!("recommendations parse failed: {:?}", err);
                    vec![]
                }
            },
            Err(err) => {
                self.breaker.record_failure();
                error!("recommendations request failed: {:?}", err);
                vec![]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base_url: &str, failure_threshold: u32) -> RecommenderClient {
        RecommenderClient::from_config(
            &RecommenderConfig {
                base_url: base_url.to_string(),
                timeout_seconds: 5,
            },
            &CircuitBreakerConfig {
                failure_threshold,
                timeout_seconds: 60,
            },
        )
    }

    #[tokio::test]
    async fn returns_embedding_from_the_service() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/generate-embedding"))
            .and(body_json(json!({
                "title": "Jazz Night",
                "description": "An evening of jazz"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "embedding": [0.1, 0.2, 0.3]
            })))
            .mount(&server)
            .await;

        let client = client(&server.uri(), 5);
        let embedding = client
            .generate_embedding("Jazz Night", "An evening of jazz")
            .await;
        assert_eq!(embedding, Some(vec![0.1, 0.2, 0.3]));
    }

    #[tokio::test]
    async fn recommendations_degrade_to_empty_on_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/recommend"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client(&server.uri(), 5);
        assert!(client.recommend(Some(1)).await.is_empty());
    }

    #[tokio::test]
    async fn breaker_opens_after_threshold_and_blocks_further_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/recommend"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;

        let client = client(&server.uri(), 2);
        client.recommend(None).await;
        client.recommend(None).await;
        assert_eq!(client.breaker.state(), CircuitState::Open);

        // Third call is short-circuited; the mock's expect(2) verifies the
        // server never saw it.
        assert!(client.recommend(None).await.is_empty());
    }
}
