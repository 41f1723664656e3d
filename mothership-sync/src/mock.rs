//! In-memory transport
//!
//! Serves a seeded config document, applies writes roughly the way the
//! backend does, and records every request. Used by tests and by the shell's
//! offline mode.

use crate::error::{SyncError, SyncResult};
use crate::patch::set_in_place;
use crate::path::FieldPath;
use crate::transport::{ConfigTransport, Endpoint};
use parking_lot::Mutex;
use reqwest::Method;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// What the backend answers to a processed submission: every optional field
/// it did not produce is `null`
fn default_process_reply() -> Value {
    json!({
        "status": "success",
        "message": "Content processed successfully",
        "creative": null,
        "polish": null,
        "video_urls": null
    })
}

/// A request seen by the transport
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: Method,
    pub endpoint: Endpoint,
    pub body: Option<Value>,
}

#[derive(Default)]
struct MockState {
    document: Value,
    requests: Vec<RecordedRequest>,
    failing: HashSet<Endpoint>,
    responses: HashMap<Endpoint, Value>,
}

/// Recording [`ConfigTransport`] backed by a JSON document
#[derive(Default)]
pub struct RecordingTransport {
    state: Mutex<MockState>,
    latency: Option<Duration>,
}

impl RecordingTransport {
    pub fn new(document: Value) -> Self {
        Self {
            state: Mutex::new(MockState {
                document,
                ..Default::default()
            }),
            latency: None,
        }
    }

    /// Delay every response by `latency` (tokio time)
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make every request to `endpoint` answer HTTP 500
    pub fn fail(&self, endpoint: Endpoint) {
        self.state.lock().failing.insert(endpoint);
    }

    /// Undo [`RecordingTransport::fail`]
    pub fn recover(&self, endpoint: &Endpoint) {
        self.state.lock().failing.remove(endpoint);
    }

    /// Canned response body for `endpoint` (used for `/api/process`)
    pub fn respond_with(&self, endpoint: Endpoint, body: Value) {
        self.state.lock().responses.insert(endpoint, body);
    }

    /// Current server-side document
    pub fn document(&self) -> Value {
        self.state.lock().document.clone()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().requests.clone()
    }

    /// Requests with the given method and endpoint
    pub fn requests_to(&self, method: &Method, endpoint: &Endpoint) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| &r.method == method && &r.endpoint == endpoint)
            .collect()
    }

    /// Number of writes (anything but GET)
    pub fn write_count(&self) -> usize {
        self.state
            .lock()
            .requests
            .iter()
            .filter(|r| r.method != Method::GET)
            .count()
    }

    pub fn clear_requests(&self) {
        self.state.lock().requests.clear();
    }

    fn merge_section(document: &mut Value, section: &[&str], body: &Value) {
        let Some(fields) = body.as_object() else {
            return;
        };
        for (field, value) in fields {
            let result = FieldPath::from_segments(section.iter().copied().chain([field.as_str()]))
                .and_then(|path| set_in_place(document, &path, value.clone()));
            if let Err(e) = result {
                tracing::warn!("Mock transport rejected {}.{}: {}", section.join("."), field, e);
            }
        }
    }

    fn put_entry(document: &mut Value, section: &str, key: &str, value: Value) {
        let result = FieldPath::from_segments([section, key])
            .and_then(|path| set_in_place(document, &path, value));
        if let Err(e) = result {
            tracing::warn!("Mock transport rejected {}.{}: {}", section, key, e);
        }
    }

    fn apply_write(state: &mut MockState, endpoint: &Endpoint, body: &Value) -> Value {
        let document = &mut state.document;
        match endpoint {
            Endpoint::Captions => Self::merge_section(document, &["captions"], body),
            Endpoint::Music => Self::merge_section(document, &["music"], body),
            Endpoint::Audio => Self::merge_section(document, &["audio"], body),
            Endpoint::Voice => Self::merge_section(document, &["audio", "voice"], body),
            Endpoint::Prompts(category) => Self::put_entry(document, "prompts", category, body.clone()),
            Endpoint::Value(path) => {
                if let Err(e) = set_in_place(document, path, body.clone()) {
                    tracing::warn!("Mock transport rejected {}: {}", path, e);
                }
            }
            Endpoint::Memory => {
                if let (Some(key), Some(value)) = (body.get("key").and_then(Value::as_str), body.get("value")) {
                    Self::put_entry(document, "memory", key, value.clone());
                }
            }
            Endpoint::Process => {
                return state
                    .responses
                    .get(endpoint)
                    .cloned()
                    .unwrap_or_else(default_process_reply);
            }
            Endpoint::Config => {}
        }
        json!({ "success": true })
    }

    fn read(state: &MockState, endpoint: &Endpoint) -> Value {
        let document = &state.document;
        match endpoint {
            Endpoint::Config => document.clone(),
            Endpoint::Memory => document.get("memory").cloned().unwrap_or_else(|| json!({})),
            Endpoint::Captions => document.get("captions").cloned().unwrap_or_else(|| json!({})),
            Endpoint::Music => document.get("music").cloned().unwrap_or_else(|| json!({})),
            Endpoint::Audio => document.get("audio").cloned().unwrap_or_else(|| json!({})),
            Endpoint::Voice => document
                .get("audio")
                .and_then(|a| a.get("voice"))
                .cloned()
                .unwrap_or_else(|| json!({})),
            Endpoint::Prompts(category) => document
                .get("prompts")
                .and_then(|p| p.get(category))
                .cloned()
                .unwrap_or_else(|| json!({})),
            Endpoint::Value(path) => crate::patch::get_at(document, path).cloned().unwrap_or(Value::Null),
            Endpoint::Process => state.responses.get(endpoint).cloned().unwrap_or(Value::Null),
        }
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn check_failure(state: &MockState, endpoint: &Endpoint) -> SyncResult<()> {
        if state.failing.contains(endpoint) {
            return Err(SyncError::Status {
                status: 500,
                endpoint: endpoint.to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ConfigTransport for RecordingTransport {
    async fn get(&self, endpoint: &Endpoint) -> SyncResult<Value> {
        self.state.lock().requests.push(RecordedRequest {
            method: Method::GET,
            endpoint: endpoint.clone(),
            body: None,
        });
        self.simulate_latency().await;

        let state = self.state.lock();
        Self::check_failure(&state, endpoint)?;
        Ok(Self::read(&state, endpoint))
    }

    async fn send(&self, method: Method, endpoint: &Endpoint, body: &Value) -> SyncResult<Value> {
        self.state.lock().requests.push(RecordedRequest {
            method: method.clone(),
            endpoint: endpoint.clone(),
            body: Some(body.clone()),
        });
        self.simulate_latency().await;

        let mut state = self.state.lock();
        Self::check_failure(&state, endpoint)?;
        Ok(Self::apply_write(&mut state, endpoint, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_and_applies_writes() {
        let transport = RecordingTransport::new(json!({ "music": { "volume": 0.2, "track_id": "abc" } }));

        transport
            .send(Method::PUT, &Endpoint::Music, &json!({ "volume": 0.8 }))
            .await
            .unwrap();

        assert_eq!(transport.document()["music"], json!({ "volume": 0.8, "track_id": "abc" }));
        assert_eq!(transport.write_count(), 1);
        assert_eq!(transport.requests_to(&Method::PUT, &Endpoint::Music).len(), 1);
    }

    #[tokio::test]
    async fn test_failing_endpoint() {
        let transport = RecordingTransport::new(json!({}));
        transport.fail(Endpoint::Config);

        let err = transport.get(&Endpoint::Config).await.unwrap_err();
        assert!(matches!(err, SyncError::Status { status: 500, .. }));

        transport.recover(&Endpoint::Config);
        assert!(transport.get(&Endpoint::Config).await.is_ok());
    }
}
