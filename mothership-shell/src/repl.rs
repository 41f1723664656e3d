//! Line commands
//!
//! Parsing is kept separate from execution so commands can be tested without
//! a session.

use anyhow::{bail, Context, Result};
use mothership_creator::{CreatorSession, MemoryField, VideoFormat};
use mothership_sync::{FieldStatus, Section};
use serde_json::Value;
use std::collections::HashSet;

pub const HELP: &str = "\
Commands:
  show [section]                 print a section (voice, music, captions, pause_factor, prompts)
  set <section> <path> <json>    edit a field; unknown sections go through /api/config/value
  form <field> <text>            fill the creator form (mothership, genre, prompt, format)
  submit                         submit the creator form
  last mothership|prompt         restore the last submitted text into the form
  flush                          save all pending edits now
  banner                         show the selection banner
  help                           this text
  quit                           flush and exit";

#[derive(Debug, Clone, PartialEq)]
pub enum FormField {
    Mothership,
    Genre,
    Prompt,
    Format(VideoFormat),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Show(Option<Section>),
    Set {
        section: String,
        path: String,
        value: Value,
    },
    Form {
        field: FormField,
        text: String,
    },
    Submit,
    Last(MemoryField),
    Flush,
    Banner,
    Help,
    Quit,
}

/// Values that are not valid JSON are taken as plain strings
fn parse_value(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn parse_section(name: &str) -> Result<Section> {
    Section::from_key(name).with_context(|| format!("Unknown section: {}", name))
}

pub fn parse_command(line: &str) -> Result<Command> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word {
        "show" if rest.is_empty() => Command::Show(None),
        "show" => Command::Show(Some(parse_section(rest)?)),
        "set" => {
            let mut parts = rest.splitn(3, char::is_whitespace);
            let (section, path, value) = match (parts.next(), parts.next(), parts.next()) {
                (Some(section), Some(path), Some(value)) if !section.is_empty() => {
                    (section, path, value.trim())
                }
                _ => bail!("Usage: set <section> <path> <json>"),
            };
            Command::Set {
                section: section.to_string(),
                path: path.to_string(),
                value: parse_value(value),
            }
        }
        "form" => {
            let (field, text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            let text = text.trim().to_string();
            let field = match field {
                "mothership" => FormField::Mothership,
                "genre" => FormField::Genre,
                "prompt" => FormField::Prompt,
                "format" => match VideoFormat::from_name(&text) {
                    Some(format) => FormField::Format(format),
                    None => bail!("Video format must be mobile or landscape"),
                },
                other => bail!("Unknown form field: {}", other),
            };
            Command::Form { field, text }
        }
        "submit" => Command::Submit,
        "last" => match rest {
            "mothership" => Command::Last(MemoryField::Mothership),
            "prompt" => Command::Last(MemoryField::Prompt),
            _ => bail!("Usage: last mothership|prompt"),
        },
        "flush" => Command::Flush,
        "banner" => Command::Banner,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        "" => bail!("Empty command"),
        other => bail!("Unknown command: {} (try `help`)", other),
    };
    Ok(command)
}

/// Executes commands against a session and reports new notifications once
pub struct Repl<'a> {
    session: &'a CreatorSession,
    seen: HashSet<String>,
}

impl<'a> Repl<'a> {
    pub fn new(session: &'a CreatorSession) -> Self {
        Self {
            session,
            seen: HashSet::new(),
        }
    }

    pub async fn execute(&mut self, command: Command) -> Result<Vec<String>> {
        let session = self.session;
        let mut out = Vec::new();

        match command {
            Command::Show(None) => {
                out.push(format!("load state: {:?}", session.load_state()));
                out.push(format!("unsaved edits: {}", session.has_unsaved()));
                out.push(format!("form: {:?}", session.form()));
            }
            Command::Show(Some(section)) => {
                let store = session.store_for(&section);
                out.push(serde_json::to_string_pretty(&store.value())?);
                for (path, status) in store.statuses() {
                    if status != FieldStatus::Clean {
                        out.push(format!("  {} {:?}", path, status));
                    }
                }
            }
            Command::Set {
                section,
                path,
                value,
            } => match Section::from_key(&section) {
                Ok(section) => session.store_for(&section).set_str(&path, value)?,
                Err(_) => session.set_value(&format!("{}.{}", section, path), value)?,
            },
            Command::Form { field, text } => session.update_form(|form| match field {
                FormField::Mothership => form.mothership = text,
                FormField::Genre => form.genre = text,
                FormField::Prompt => form.prompt = text,
                FormField::Format(format) => form.video_format = format,
            }),
            Command::Submit => {
                // Failures are already reported as notifications
                if let Ok(response) = session.submit().await {
                    for url in response.video_urls {
                        out.push(format!("video: {}", url));
                    }
                }
            }
            Command::Last(field) => {
                if let Ok(text) = session.load_last(field).await {
                    out.push(format!("{} = {:?}", field.label(), text));
                }
            }
            Command::Flush => {
                let report = session.flush_all().await;
                out.push(format!(
                    "saved {} edit(s), {} failed",
                    report.saved, report.failed
                ));
            }
            Command::Banner => session.show_selection_banner(),
            Command::Help => out.push(HELP.to_string()),
            Command::Quit => {}
        }

        out.extend(self.drain_notifications());
        Ok(out)
    }

    /// Notifications not yet printed. Ids of notifications that are no
    /// longer visible are forgotten.
    pub fn drain_notifications(&mut self) -> Vec<String> {
        let visible = self.session.notifications().visible();
        let mut lines = Vec::new();
        for notification in &visible {
            if self.seen.insert(notification.id.clone()) {
                lines.push(format!(
                    "[{}] {}",
                    notification.severity.label(),
                    notification.message
                ));
            }
        }
        self.seen
            .retain(|id| visible.iter().any(|notification| &notification.id == id));
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mothership_sync::{FieldPath, RecordingTransport, DEFAULT_NOTIFICATION_CAP, NOTIFICATION_TTL};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_parse_set() {
        assert_eq!(
            parse_command("set music volume 0.8").unwrap(),
            Command::Set {
                section: "music".to_string(),
                path: "volume".to_string(),
                value: json!(0.8),
            }
        );
        assert_eq!(
            parse_command("set prompts military.creative.tone dramatic and dark").unwrap(),
            Command::Set {
                section: "prompts".to_string(),
                path: "military.creative.tone".to_string(),
                value: json!("dramatic and dark"),
            }
        );
        assert!(parse_command("set music volume").is_err());
    }

    #[test]
    fn test_parse_other_commands() {
        assert_eq!(parse_command("show").unwrap(), Command::Show(None));
        assert_eq!(
            parse_command("show pause_factor").unwrap(),
            Command::Show(Some(Section::PauseFactor))
        );
        assert_eq!(
            parse_command("last prompt").unwrap(),
            Command::Last(MemoryField::Prompt)
        );
        assert_eq!(
            parse_command("form format landscape").unwrap(),
            Command::Form {
                field: FormField::Format(VideoFormat::Landscape),
                text: "landscape".to_string(),
            }
        );
        assert!(parse_command("form format square").is_err());
        assert!(parse_command("launch").is_err());
        assert_eq!(parse_command("  quit ").unwrap(), Command::Quit);
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_set_and_flush() {
        let transport = Arc::new(RecordingTransport::new(json!({
            "audio": { "pause_factor": 0.25 },
            "video_generation": { "action_level": "high" }
        })));
        let session = CreatorSession::new(transport.clone(), DEFAULT_NOTIFICATION_CAP);
        session.mount().await.unwrap();
        let mut repl = Repl::new(&session);

        repl.execute(parse_command("set pause_factor pause_factor 0.5").unwrap())
            .await
            .unwrap();
        repl.execute(parse_command("set video_generation action_level low").unwrap())
            .await
            .unwrap();
        let out = repl.execute(Command::Flush).await.unwrap();

        assert_eq!(out[0], "saved 2 edit(s), 0 failed");
        assert!(out.contains(&"[success] Pause factor updated".to_string()));
        assert_eq!(
            transport.document()["video_generation"]["action_level"],
            json!("low")
        );

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(repl.drain_notifications().is_empty());
        assert_eq!(
            session
                .store_for(&Section::PauseFactor)
                .status(&FieldPath::parse("pause_factor").unwrap()),
            FieldStatus::Saved
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_notifications_are_forgotten() {
        let transport = Arc::new(RecordingTransport::new(json!({})));
        let session = CreatorSession::new(transport.clone(), DEFAULT_NOTIFICATION_CAP);
        let mut repl = Repl::new(&session);

        for _ in 0..3 {
            repl.execute(Command::Submit).await.unwrap();
        }
        assert_eq!(repl.seen.len(), 3);

        let ids: Vec<String> = session
            .notifications()
            .visible()
            .into_iter()
            .map(|n| n.id)
            .collect();
        for id in &ids[..2] {
            session.notifications().dismiss(id);
        }
        assert!(repl.drain_notifications().is_empty());
        assert_eq!(repl.seen.len(), 1);
        assert!(repl.seen.contains(&ids[2]));

        tokio::time::sleep(NOTIFICATION_TTL + Duration::from_millis(100)).await;
        assert!(repl.drain_notifications().is_empty());
        assert!(repl.seen.is_empty());
    }

    #[tokio::test]
    async fn test_execute_submit_validation() {
        let transport = Arc::new(RecordingTransport::new(json!({})));
        let session = CreatorSession::new(transport.clone(), DEFAULT_NOTIFICATION_CAP);
        let mut repl = Repl::new(&session);

        repl.execute(parse_command("form genre realistic").unwrap())
            .await
            .unwrap();
        let out = repl.execute(Command::Submit).await.unwrap();

        assert_eq!(out, vec!["[error] Please add mothership content"]);
        assert!(transport.requests().is_empty());
    }
}
