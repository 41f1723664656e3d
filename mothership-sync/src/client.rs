//! Sync client
//!
//! Thin layer over a [`ConfigTransport`]: one request per call, no retry,
//! no serialization of overlapping writes. Whichever response resolves last
//! decides what the user is told.

use crate::error::SyncResult;
use crate::patch::{apply_edits, PendingEdit};
use crate::transport::{ConfigTransport, Endpoint};
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Clone)]
pub struct SyncClient {
    transport: Arc<dyn ConfigTransport>,
}

impl SyncClient {
    pub fn new(transport: Arc<dyn ConfigTransport>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Arc<dyn ConfigTransport> {
        &self.transport
    }

    pub async fn get(&self, endpoint: &Endpoint) -> SyncResult<Value> {
        self.transport.get(endpoint).await
    }

    /// Idempotent update of one endpoint
    pub async fn put(&self, endpoint: &Endpoint, payload: &Value) -> SyncResult<Value> {
        debug!("PUT {} {}", endpoint, payload);
        self.transport.send(Method::PUT, endpoint, payload).await
    }

    pub async fn post(&self, endpoint: &Endpoint, payload: &Value) -> SyncResult<Value> {
        debug!("POST {}", endpoint);
        self.transport.send(Method::POST, endpoint, payload).await
    }

    /// Persist one free-text field to the memory document
    pub async fn remember(&self, key: &str, value: &str) -> SyncResult<Value> {
        self.post(&Endpoint::Memory, &json!({ "key": key, "value": value }))
            .await
    }

    /// Rewrite a whole prompt category with `edits` applied.
    ///
    /// The backend replaces the category document wholesale, so the current
    /// copy is fetched first and the edits are replayed on top of it. The
    /// GET and PUT are not atomic: a write from another session landing in
    /// between is overwritten. If the GET fails nothing is written, since a
    /// document rebuilt from scratch would drop every sibling field.
    pub async fn fetch_patch_replace(&self, category: &str, edits: &[PendingEdit]) -> SyncResult<Value> {
        let endpoint = Endpoint::Prompts(category.to_string());
        let current = self.transport.get(&endpoint).await?;
        let current = if current.is_null() { json!({}) } else { current };

        let replacement = apply_edits(&current, edits)?;
        info!(
            "Replacing prompts for {} ({} edit(s) applied)",
            category,
            edits.len()
        );
        self.put(&endpoint, &replacement).await?;
        Ok(replacement)
    }
}
