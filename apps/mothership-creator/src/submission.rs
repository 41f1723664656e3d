//! Content submission
//!
//! Validates the creator form, posts it to `/api/process`, drives the
//! loading/success overlays and remembers the submitted text so it can be
//! restored next session.

use crate::events::{CreatorEvent, EventSink};
use mothership_sync::{Endpoint, MemoryDocument, NotificationCenter, SyncClient, SyncError, SyncResult};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Genre choices (value, label)
pub const GENRES: [(&str, &str); 2] = [
    ("military_animation", "Military Animation"),
    ("realistic", "Realistic"),
];

/// Memory keys written after a successful submission
pub const MEMORY_KEY_MOTHERSHIP: &str = "last_mothership";
pub const MEMORY_KEY_PROMPT: &str = "last_prompt";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoFormat {
    #[default]
    Mobile,
    Landscape,
}

impl VideoFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "mobile" => Some(VideoFormat::Mobile),
            "landscape" => Some(VideoFormat::Landscape),
            _ => None,
        }
    }
}

/// The creator form
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmissionForm {
    /// Headline content
    pub mothership: String,
    pub genre: String,
    pub prompt: String,
    pub video_format: VideoFormat,
}

impl SubmissionForm {
    /// First missing required field, as the message shown to the user
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.mothership.trim().is_empty() {
            return Err("Please add mothership content");
        }
        if self.genre.trim().is_empty() {
            return Err("Please select a genre");
        }
        if self.prompt.trim().is_empty() {
            return Err("Please add a prompt");
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct ProcessOptions {
    video_format: VideoFormat,
}

#[derive(Debug, Serialize)]
struct ProcessRequest<'a> {
    mothership: &'a str,
    prompt: &'a str,
    genre: &'a str,
    options: ProcessOptions,
}

/// `/api/process` response. The backend sends `null` for anything it did
/// not produce.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProcessResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    /// Generated creative pass
    #[serde(default)]
    pub creative: Option<Value>,
    /// Generated polish pass
    #[serde(default)]
    pub polish: Option<Value>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub video_urls: Vec<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl ProcessResponse {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// Which remembered field to restore
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryField {
    Mothership,
    Prompt,
}

impl MemoryField {
    pub fn label(&self) -> &'static str {
        match self {
            MemoryField::Mothership => "mothership",
            MemoryField::Prompt => "prompt",
        }
    }

    fn pick<'a>(&self, memory: &'a MemoryDocument) -> Option<&'a str> {
        match self {
            MemoryField::Mothership => memory.mothership(),
            MemoryField::Prompt => memory.prompt(),
        }
    }
}

pub struct Submitter {
    client: SyncClient,
    notifications: NotificationCenter,
    events: EventSink,
}

impl Submitter {
    pub fn new(client: SyncClient, notifications: NotificationCenter, events: EventSink) -> Self {
        Self {
            client,
            notifications,
            events,
        }
    }

    /// Submit the form. Validation failures never touch the network.
    pub async fn handle_submit(&self, form: &SubmissionForm) -> SyncResult<ProcessResponse> {
        if let Err(message) = form.validate() {
            self.notifications.error(message);
            return Err(SyncError::Validation(message.to_string()));
        }

        self.events.emit(CreatorEvent::LoadingOverlay { visible: true });
        let request = ProcessRequest {
            mothership: &form.mothership,
            prompt: &form.prompt,
            genre: &form.genre,
            options: ProcessOptions {
                video_format: form.video_format,
            },
        };

        let response = match self.process(&request).await {
            Ok(response) => response,
            Err(e) => {
                ::log::error!("Process request failed: {}", e);
                self.events.emit(CreatorEvent::LoadingOverlay { visible: false });
                self.notifications
                    .error(e.user_message("Failed to process content"));
                return Err(e);
            }
        };

        self.events.emit(CreatorEvent::LoadingOverlay { visible: false });
        self.events.emit(CreatorEvent::SuccessOverlay { visible: true });
        self.notifications.success(
            response
                .message
                .clone()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "Content successfully created!".to_string()),
        );

        self.remember(MEMORY_KEY_MOTHERSHIP, &form.mothership).await;
        self.remember(MEMORY_KEY_PROMPT, &form.prompt).await;
        self.events.emit(CreatorEvent::MemoryAvailability {
            mothership: true,
            prompt: true,
        });

        if !response.video_urls.is_empty() {
            ::log::info!("Generated videos: {:?}", response.video_urls);
            self.events.emit(CreatorEvent::VideosReady {
                urls: response.video_urls.clone(),
            });
        }
        Ok(response)
    }

    async fn process(&self, request: &ProcessRequest<'_>) -> SyncResult<ProcessResponse> {
        let body = serde_json::to_value(request)?;
        let raw = self.client.post(&Endpoint::Process, &body).await?;
        let response: ProcessResponse = serde_json::from_value(raw)?;
        if response.is_success() {
            Ok(response)
        } else {
            let message = response
                .message
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "Process completed with errors".to_string());
            Err(SyncError::Backend(message))
        }
    }

    /// Memory writes are best effort; the submission already succeeded
    async fn remember(&self, key: &str, value: &str) {
        if let Err(e) = self.client.remember(key, value).await {
            ::log::warn!("Failed to remember {}: {}", key, e);
        }
    }

    /// Fetch the saved text for `field`, notifying either way
    pub async fn load_last(&self, field: MemoryField) -> SyncResult<String> {
        let memory = match self.client.get(&Endpoint::Memory).await {
            Ok(raw) => MemoryDocument::from_value(&raw),
            Err(e) => Err(e),
        };

        let memory = match memory {
            Ok(memory) => memory,
            Err(e) => {
                ::log::error!("Failed to load last {}: {}", field.label(), e);
                self.notifications
                    .error(format!("Failed to load last {} content", field.label()));
                return Err(e);
            }
        };

        match field.pick(&memory) {
            Some(text) => {
                self.notifications
                    .success(format!("Last {} content loaded", field.label()));
                Ok(text.to_string())
            }
            None => {
                let message = format!("No saved {} content found", field.label());
                self.notifications.error(message.clone());
                Err(SyncError::Validation(message))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mothership_sync::{Method, RecordingTransport, Severity};
    use serde_json::json;
    use std::sync::Arc;

    fn submitter(transport: &Arc<RecordingTransport>) -> (Submitter, NotificationCenter, EventSink) {
        let notifications = NotificationCenter::default();
        let events = EventSink::new();
        let submitter = Submitter::new(
            SyncClient::new(transport.clone()),
            notifications.clone(),
            events.clone(),
        );
        (submitter, notifications, events)
    }

    fn filled_form() -> SubmissionForm {
        SubmissionForm {
            mothership: "Breaking: mothership spotted".to_string(),
            genre: "realistic".to_string(),
            prompt: "Make it cinematic".to_string(),
            video_format: VideoFormat::Landscape,
        }
    }

    #[tokio::test]
    async fn test_empty_mothership_sends_nothing() {
        let transport = Arc::new(RecordingTransport::new(json!({})));
        let (submitter, notifications, events) = submitter(&transport);
        let rx = events.subscribe();

        let form = SubmissionForm {
            mothership: String::new(),
            ..filled_form()
        };
        let err = submitter.handle_submit(&form).await.unwrap_err();

        assert!(matches!(err, SyncError::Validation(_)));
        assert!(transport.requests().is_empty());
        let visible = notifications.visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].severity, Severity::Error);
        assert_eq!(visible[0].message, "Please add mothership content");
        assert!(rx.is_empty());
    }

    #[tokio::test]
    async fn test_success_remembers_both_fields() {
        let transport = Arc::new(RecordingTransport::new(json!({})));
        transport.respond_with(
            Endpoint::Process,
            json!({ "status": "success", "message": "Done", "video_urls": ["out/1.mp4"] }),
        );
        let (submitter, notifications, events) = submitter(&transport);
        let rx = events.subscribe();

        let response = submitter.handle_submit(&filled_form()).await.unwrap();
        assert_eq!(response.video_urls, vec!["out/1.mp4"]);

        let process = transport.requests_to(&Method::POST, &Endpoint::Process);
        assert_eq!(
            process[0].body,
            Some(json!({
                "mothership": "Breaking: mothership spotted",
                "prompt": "Make it cinematic",
                "genre": "realistic",
                "options": { "video_format": "landscape" }
            }))
        );

        let memory_posts: Vec<_> = transport
            .requests_to(&Method::POST, &Endpoint::Memory)
            .into_iter()
            .filter_map(|r| r.body)
            .collect();
        assert_eq!(
            memory_posts,
            vec![
                json!({ "key": "last_mothership", "value": "Breaking: mothership spotted" }),
                json!({ "key": "last_prompt", "value": "Make it cinematic" }),
            ]
        );

        assert_eq!(notifications.count(Severity::Success), 1);
        assert_eq!(notifications.visible()[0].message, "Done");
        let successes = rx
            .try_iter()
            .filter(|e| *e == CreatorEvent::SuccessOverlay { visible: true })
            .count();
        assert_eq!(successes, 1);
        assert!(!events.overlay().loading);
    }

    #[tokio::test]
    async fn test_success_with_null_fields() {
        let transport = Arc::new(RecordingTransport::new(json!({})));
        transport.respond_with(
            Endpoint::Process,
            json!({
                "status": "success",
                "message": null,
                "creative": { "story": "Act one" },
                "polish": null,
                "video_urls": null
            }),
        );
        let (submitter, notifications, events) = submitter(&transport);
        let rx = events.subscribe();

        let response = submitter.handle_submit(&filled_form()).await.unwrap();

        assert!(response.video_urls.is_empty());
        assert_eq!(response.creative, Some(json!({ "story": "Act one" })));
        assert_eq!(transport.requests_to(&Method::POST, &Endpoint::Memory).len(), 2);
        assert_eq!(notifications.count(Severity::Success), 1);
        assert_eq!(notifications.visible()[0].message, "Content successfully created!");
        assert!(events.overlay().success);
        assert!(!rx
            .try_iter()
            .any(|e| matches!(e, CreatorEvent::VideosReady { .. })));
    }

    #[tokio::test]
    async fn test_default_backend_reply_is_a_success() {
        let transport = Arc::new(RecordingTransport::new(json!({})));
        let (submitter, notifications, _events) = submitter(&transport);

        let response = submitter.handle_submit(&filled_form()).await.unwrap();

        assert!(response.is_success());
        assert!(response.video_urls.is_empty());
        assert_eq!(notifications.count(Severity::Error), 0);
        assert_eq!(transport.requests_to(&Method::POST, &Endpoint::Memory).len(), 2);
    }

    #[tokio::test]
    async fn test_backend_error_status() {
        let transport = Arc::new(RecordingTransport::new(json!({})));
        transport.respond_with(Endpoint::Process, json!({ "status": "error" }));
        let (submitter, notifications, events) = submitter(&transport);

        let err = submitter.handle_submit(&filled_form()).await.unwrap_err();

        assert!(matches!(err, SyncError::Backend(_)));
        assert_eq!(notifications.visible()[0].message, "Process completed with errors");
        assert!(transport.requests_to(&Method::POST, &Endpoint::Memory).is_empty());
        assert_eq!(events.overlay(), Default::default());
    }

    #[tokio::test]
    async fn test_http_failure_clears_loading() {
        let transport = Arc::new(RecordingTransport::new(json!({})));
        transport.fail(Endpoint::Process);
        let (submitter, notifications, events) = submitter(&transport);

        assert!(submitter.handle_submit(&filled_form()).await.is_err());
        assert_eq!(notifications.visible()[0].message, "Failed to process content");
        assert!(!events.overlay().loading);
    }

    #[tokio::test]
    async fn test_load_last_fields() {
        let transport = Arc::new(RecordingTransport::new(json!({
            "memory": { "last_mothership": "Earlier headline" }
        })));
        let (submitter, notifications, _events) = submitter(&transport);

        let text = submitter.load_last(MemoryField::Mothership).await.unwrap();
        assert_eq!(text, "Earlier headline");
        assert!(submitter.load_last(MemoryField::Prompt).await.is_err());

        let messages: Vec<String> = notifications.visible().into_iter().map(|n| n.message).collect();
        assert_eq!(
            messages,
            vec!["Last mothership content loaded", "No saved prompt content found"]
        );
    }

    #[test]
    fn test_validation_order() {
        let form = SubmissionForm {
            genre: String::new(),
            prompt: String::new(),
            ..filled_form()
        };
        assert_eq!(form.validate(), Err("Please select a genre"));
        assert_eq!(VideoFormat::from_name("landscape"), Some(VideoFormat::Landscape));
    }
}
