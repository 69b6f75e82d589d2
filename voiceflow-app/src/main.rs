//! `voiceflow`: replay a recorded provider stream through the engine.
//!
//! ```text
//! voiceflow [--settings PATH] [--target PROCESS] [--init-settings] [STREAM.jsonl | -]
//! ```
//!
//! Each stream line is a provider event (`{"type":"turn", ...}`) or a host
//! control (`{"type":"forceEnd","submit":true}`, `{"type":"setMode","mode":"sleep"}`,
//! `{"type":"clearSession"}`), optionally with `"delayMs"` to wait before it.

mod settings;
mod text_injector;

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use voiceflow_core::{
    AutomationHandle, EngineEvent, EngineInput, ListeningMode, ProviderEvent, ProviderHandle,
    SettingsHandle, StubProvider, VoiceflowEngine,
};

use crate::text_injector::ConsoleAutomation;

#[derive(Debug, Parser)]
#[command(name = "voiceflow", about = "Replay a recorded provider stream through the engine")]
struct Args {
    /// Settings file (defaults to the platform config directory).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Process name of the simulated foreground application.
    #[arg(long)]
    target: Option<String>,

    /// Write the current (or default) settings back to disk and exit.
    #[arg(long)]
    init_settings: bool,

    /// JSONL stream to replay; omitted or `-` reads stdin.
    stream: Option<PathBuf>,
}

/// Host-side controls that can be interleaved with provider events.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum Control {
    ForceEnd {
        #[serde(default)]
        submit: bool,
    },
    SetMode {
        mode: ListeningMode,
    },
    ClearSession,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ReplayItem {
    Control(Control),
    Provider(ProviderEvent),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReplayLine {
    #[serde(default)]
    delay_ms: u64,
    #[serde(flatten)]
    item: ReplayItem,
}

impl ReplayLine {
    fn into_input(self) -> EngineInput {
        match self.item {
            ReplayItem::Provider(event) => EngineInput::Provider(event),
            ReplayItem::Control(Control::ForceEnd { submit }) => EngineInput::ForceEnd { submit },
            ReplayItem::Control(Control::SetMode { mode }) => EngineInput::SetMode(mode),
            ReplayItem::Control(Control::ClearSession) => EngineInput::ClearSession,
        }
    }
}

fn parse_stream(raw: &str) -> anyhow::Result<Vec<ReplayLine>> {
    raw.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty() && !line.trim_start().starts_with("//"))
        .map(|(n, line)| {
            serde_json::from_str::<ReplayLine>(line)
                .with_context(|| format!("stream line {}", n + 1))
        })
        .collect()
}

fn read_stream(path: Option<&PathBuf>) -> anyhow::Result<String> {
    match path {
        Some(p) if p.as_os_str() != "-" => std::fs::read_to_string(p)
            .with_context(|| format!("reading stream {}", p.display())),
        _ => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("reading stream from stdin")?;
            Ok(raw)
        }
    }
}

fn describe(event: &EngineEvent) -> String {
    match event {
        EngineEvent::KeywordTriggered { label } => format!("keyword   {label}"),
        EngineEvent::CommandExecuted { key, action } => match serde_json::to_string(action) {
            Ok(json) => format!("command   {key} {json}"),
            Err(_) => format!("command   {key}"),
        },
        EngineEvent::ModeChanged { mode } => format!("mode      {mode:?}"),
        EngineEvent::DictationTyped { text } => format!("dictation {text:?}"),
        EngineEvent::ProviderError { message } => format!("provider  error: {message}"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("voiceflow=info")),
        )
        .init();

    let args = Args::parse();
    let settings_path = args
        .settings
        .clone()
        .unwrap_or_else(settings::default_settings_path);

    if args.init_settings {
        let defaults = settings::load_settings(&settings_path);
        settings::save_settings(&settings_path, &defaults)
            .with_context(|| format!("writing {}", settings_path.display()))?;
        info!("settings written to {}", settings_path.display());
        return Ok(());
    }

    let engine_settings = settings::load_settings(&settings_path);
    let settle = Duration::from_millis(
        engine_settings
            .command_delay_ms
            .max(engine_settings.pause_delay_ms)
            .max(engine_settings.continuation_window_ms)
            .max(engine_settings.force_end_timeout_ms)
            + 100,
    );
    let lines = parse_stream(&read_stream(args.stream.as_ref())?)?;
    info!(lines = lines.len(), "replaying provider stream");

    let console = ConsoleAutomation::new(args.target.clone());
    let engine = Arc::new(VoiceflowEngine::new(
        SettingsHandle::new(engine_settings),
        AutomationHandle::new(console.clone()),
        Some(ProviderHandle::new(StubProvider::new())),
    ));

    let mut events = engine.subscribe_events();
    let forwarder = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => info!("{}", describe(&event)),
                Err(RecvError::Lagged(n)) => warn!("event log lagged by {n} events"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    engine.start()?;
    for line in lines {
        if line.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(line.delay_ms)).await;
        }
        engine.send(line.into_input())?;
    }
    tokio::time::sleep(settle).await;
    engine.stop()?;
    forwarder.abort();

    let stats = engine.diagnostics_snapshot();
    info!(
        turns = stats.turns_in,
        dropped = stats.turns_dropped,
        commands = stats.commands_executed,
        chunks = stats.chunks_typed,
        "replay finished"
    );
    println!("---\n{}", console.document());
    Ok(())
}
