//! Mock backend implementation for testing
//!
//! A configurable backend that can succeed, fail, or take its time without
//! any network access. It records every publish call so dispatch tests can
//! check which credentials were actually used.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::time::sleep;

use crate::backends::Backend;
use crate::error::{PublishError, TransportError};
use crate::types::{Credential, CredentialKey, PublishRequest, PublishResponse, PublishResult};

/// Configuration for mock backend behavior
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Registry name (e.g., "mock-facebook")
    pub name: String,

    pub label: String,

    /// Error returned for every publish; `None` means success
    pub error: Option<PublishError>,

    /// Errors returned for specific credential ids, checked before `error`
    pub credential_errors: HashMap<String, PublishError>,

    /// Delay before completing a publish (simulates network latency)
    pub delay: Duration,

    /// Destinations reported by `list_destinations`
    pub destinations: Vec<String>,

    /// Number of times publish has been called
    pub publish_call_count: Arc<Mutex<usize>>,

    /// Credential and subject of every publish call
    pub published: Arc<Mutex<Vec<(CredentialKey, Option<String>)>>>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            label: "Mock".to_string(),
            error: None,
            credential_errors: HashMap::new(),
            delay: Duration::from_millis(0),
            destinations: Vec::new(),
            publish_call_count: Arc::new(Mutex::new(0)),
            published: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mock backend for testing
#[derive(Debug, Clone)]
pub struct MockBackend {
    config: MockConfig,
}

impl MockBackend {
    pub fn new(config: MockConfig) -> Self {
        Self { config }
    }

    /// Create a mock backend that always succeeds
    pub fn success(name: &str) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            ..Default::default()
        })
    }

    /// Create a mock backend that fails every publish with `error`
    pub fn failure(name: &str, error: PublishError) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            error: Some(error),
            ..Default::default()
        })
    }

    /// Create a mock backend that rejects with HTTP `status`
    pub fn status_failure(name: &str, status: u16) -> Self {
        Self::failure(
            name,
            PublishError::Transport(TransportError::Status {
                status,
                body: format!("mock {} response", status),
            }),
        )
    }

    /// Create a mock backend with a delay
    pub fn with_delay(name: &str, delay: Duration) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            delay,
            ..Default::default()
        })
    }

    /// Fail only publishes made with credential `credential_id`
    pub fn failing_for(mut self, credential_id: &str, error: PublishError) -> Self {
        self.config
            .credential_errors
            .insert(credential_id.to_string(), error);
        self
    }

    pub fn with_destinations(mut self, destinations: Vec<String>) -> Self {
        self.config.destinations = destinations;
        self
    }

    /// Get the number of times publish was called
    pub fn publish_call_count(&self) -> usize {
        *lock(&self.config.publish_call_count)
    }

    /// Credential keys and subject ids of all publish calls, in call order
    pub fn published(&self) -> Vec<(CredentialKey, Option<String>)> {
        lock(&self.config.published).clone()
    }
}

#[async_trait]
impl Backend for MockBackend {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn label(&self) -> &str {
        &self.config.label
    }

    async fn list_destinations(
        &self,
        _credential: &Credential,
        _request: &PublishRequest,
    ) -> Vec<String> {
        self.config.destinations.clone()
    }

    async fn publish(&self, credential: &Credential, request: &PublishRequest) -> PublishResult {
        *lock(&self.config.publish_call_count) += 1;
        lock(&self.config.published).push((credential.key(), request.subject_id.clone()));

        if !self.config.delay.is_zero() {
            sleep(self.config.delay).await;
        }

        if let Some(error) = self.config.credential_errors.get(&credential.id) {
            return Err(error.clone());
        }

        match &self.config.error {
            Some(error) => Err(error.clone()),
            None => Ok(PublishResponse {
                status: 200,
                body: json!({
                    "id": format!("{}-{}", self.config.name, uuid::Uuid::new_v4()),
                }),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_success() {
        let backend = MockBackend::success("test");
        let credential = Credential::new("1", "test", "alice", "Alice", "tok");
        let request = PublishRequest::new("9", "Hello", "http://x/9");

        let response = backend.publish(&credential, &request).await.unwrap();
        assert_eq!(response.status, 200);
        assert!(response.body["id"].as_str().unwrap().starts_with("test-"));
        assert_eq!(backend.publish_call_count(), 1);
        assert_eq!(
            backend.published(),
            vec![(CredentialKey::new("test", "1"), Some("9".to_string()))]
        );
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let backend = MockBackend::status_failure("test", 500);
        let credential = Credential::new("1", "test", "alice", "Alice", "tok");
        let request = PublishRequest::new("9", "Hello", "http://x/9");

        let result = backend.publish(&credential, &request).await;
        assert!(matches!(
            result,
            Err(PublishError::Transport(TransportError::Status { status: 500, .. }))
        ));
        assert_eq!(backend.publish_call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_failing_for_one_credential() {
        let backend = MockBackend::success("test").failing_for(
            "2",
            PublishError::EmptyEndpoint {
                platform: "test".to_string(),
            },
        );
        let request = PublishRequest::new("9", "Hello", "http://x/9");

        let ok = Credential::new("1", "test", "alice", "Alice", "tok");
        let bad = Credential::new("2", "test", "alice", "Alice", "tok");
        assert!(backend.publish(&ok, &request).await.is_ok());
        assert!(backend.publish(&bad, &request).await.is_err());
    }

    #[tokio::test]
    async fn test_mock_destinations() {
        let backend = MockBackend::success("test")
            .with_destinations(vec!["a.example".to_string(), "b.example".to_string()]);
        let credential = Credential::new("1", "test", "alice", "Alice", "tok");
        let request = PublishRequest::new("9", "Hello", "http://x/9");

        assert_eq!(
            backend.list_destinations(&credential, &request).await,
            vec!["a.example", "b.example"]
        );
        assert!(MockBackend::success("test")
            .list_destinations(&credential, &request)
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn test_clones_share_call_counts() {
        let backend = MockBackend::success("test");
        let clone = backend.clone();
        let credential = Credential::new("1", "test", "alice", "Alice", "tok");
        let request = PublishRequest::new("9", "Hello", "http://x/9");

        clone.publish(&credential, &request).await.unwrap();
        assert_eq!(backend.publish_call_count(), 1);
    }
}
