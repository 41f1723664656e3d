//! Mothership Studio shell
//!
//! Headless front end for the creator session: mounts it against the config
//! backend (or an in-memory one with `--offline`), reads line commands from
//! stdin and flushes pending autosaves before exiting.

mod config;
mod repl;

use anyhow::{Context, Result};
use clap::Parser;
use config::ShellConfig;
use mothership_creator::{CreatorSession, APP_NAME};
use mothership_sync::{ConfigTransport, HttpTransport, RecordingTransport};
use repl::{parse_command, Command, Repl};
use serde_json::json;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless Mothership creator studio", long_about = None)]
struct Args {
    /// Path to shell.toml (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Config backend base URL
    #[arg(long)]
    api_base: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Use an in-memory backend instead of HTTP
    #[arg(long)]
    offline: bool,
}

enum Input {
    Line(String),
    Interrupt,
}

/// Seed document for `--offline`
fn offline_document() -> serde_json::Value {
    json!({
        "audio": {
            "pause_factor": 0.25,
            "voice": {
                "voice_id": "AvUYKSeryCcU2BHSM8x7",
                "model_id": "eleven_flash_v2",
                "stability": 0.5,
                "similarity_boost": 0.75,
                "speed": 1.15,
                "use_speaker_boost": true,
                "output_format": "mp3_44100_128"
            }
        },
        "music": { "track_id": "Otv8MxIiv80", "start_time": 0, "trim_audio": 0.0, "volume": 0.2 },
        "captions": { "enabled": false, "style": "default" },
        "prompts": { "military": { "creative": {}, "polish": {} } },
        "memory": {}
    })
}

fn init_logger(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_millis()
        .init();
}

/// stdin is read on its own thread; Ctrl-C arrives on the same channel
fn spawn_input() -> Result<mpsc::UnboundedReceiver<Input>> {
    let (tx, rx) = mpsc::unbounded_channel();

    let interrupt = tx.clone();
    ctrlc::set_handler(move || {
        let _ = interrupt.send(Input::Interrupt);
    })
    .context("Failed to install Ctrl-C handler")?;

    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(Input::Line(line)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    ::log::warn!("Failed to read stdin: {}", e);
                    break;
                }
            }
        }
    });

    Ok(rx)
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}

fn prompt() {
    print!("> ");
    let _ = io::stdout().flush();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ShellConfig::load(args.config.as_deref())?;
    config.apply_env(|key| std::env::var(key).ok());
    if let Some(api_base) = args.api_base {
        config.api_base = api_base;
    }
    if let Some(level) = args.log_level {
        config.log_level = level;
    }
    init_logger(&config.log_level);

    let transport: Arc<dyn ConfigTransport> = if args.offline {
        ::log::info!("Running offline against an in-memory backend");
        Arc::new(RecordingTransport::new(offline_document()))
    } else {
        let transport = HttpTransport::new(&config.transport_config())
            .with_context(|| format!("Invalid API base: {}", config.api_base))?;
        Arc::new(transport)
    };

    let session = CreatorSession::new(transport, config.notification_cap);
    let mut repl = Repl::new(&session);

    println!("{} ({})", APP_NAME, config.api_base);
    if let Err(e) = session.mount().await {
        ::log::error!("Initial load failed: {}", e);
        println!("Configuration could not be loaded; edits will not be saved.");
    }
    print_lines(&repl.drain_notifications());

    let mut input = spawn_input()?;
    prompt();
    while let Some(event) = input.recv().await {
        let line = match event {
            Input::Line(line) => line,
            Input::Interrupt => {
                println!();
                break;
            }
        };
        if line.trim().is_empty() {
            prompt();
            continue;
        }

        match parse_command(&line) {
            Ok(Command::Quit) => break,
            Ok(command) => match repl.execute(command).await {
                Ok(lines) => print_lines(&lines),
                Err(e) => println!("error: {:#}", e),
            },
            Err(e) => println!("error: {:#}", e),
        }
        prompt();
    }

    let report = session.flush_all().await;
    if report.saved + report.failed > 0 {
        println!("Flushed {} edit(s), {} failed", report.saved, report.failed);
    }
    print_lines(&repl.drain_notifications());
    session.unmount();
    Ok(())
}
