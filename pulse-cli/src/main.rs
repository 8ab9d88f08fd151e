//! # Pulse CLI
//!
//! Command-line interface for the Pulse real-time client.
//!
//! This CLI provides commands for:
//! - Following one investigation's live status until completion
//! - Tailing raw data frames on any channel

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use pulse_client::{
    ConnectionStatus, InvestigationWatcher, RealtimeClient, RealtimeContext, RealtimeHandle,
};
use pulse_core::RealtimeConfig;
use pulse_telemetry::{init_logging, LogConfig};

/// Pulse - live investigation updates from the dashboard event stream
#[derive(Parser)]
#[command(name = "pulse")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// WebSocket endpoint URL
    #[arg(short, long, global = true, default_value = "ws://127.0.0.1:8080/ws")]
    endpoint: String,

    /// Bearer token appended to the connection URL
    #[arg(short, long, global = true)]
    token: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
enum Commands {
    /// Follow one investigation until it reaches a terminal state
    Watch(WatchArgs),

    /// Print every data frame on a channel
    Tail(TailArgs),
}

/// Arguments for the watch command
#[derive(Parser)]
struct WatchArgs {
    /// Investigation id to follow
    #[arg(short, long)]
    investigation: String,
}

/// Arguments for the tail command
#[derive(Parser)]
struct TailArgs {
    /// Channel to subscribe
    #[arg(short, long)]
    channel: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut log_config = LogConfig::default();
    if cli.verbose {
        log_config.level = "debug".to_string();
    }
    init_logging(&log_config)?;

    let mut builder = RealtimeConfig::builder().endpoint(cli.endpoint.clone());
    if let Some(token) = cli.token.clone() {
        builder = builder.token(token);
    }
    let config = builder.build();

    match cli.command {
        Commands::Watch(args) => watch(config, &args.investigation).await,
        Commands::Tail(args) => tail(config, &args.channel).await,
    }
}

/// Waits until the client is connected, or fails once reconnection gives up.
async fn wait_connected(handle: &RealtimeHandle) -> Result<()> {
    let mut status_rx = handle.watch_status();
    let mut left_idle = false;
    loop {
        let status = *status_rx.borrow_and_update();
        match status {
            ConnectionStatus::Connected => return Ok(()),
            ConnectionStatus::Idle if left_idle => {
                bail!("could not connect: reconnect attempts exhausted");
            }
            ConnectionStatus::Idle => {}
            _ => left_idle = true,
        }
        if status_rx.changed().await.is_err() {
            bail!("client task stopped");
        }
    }
}

async fn watch(config: RealtimeConfig, investigation_id: &str) -> Result<()> {
    let handle = RealtimeClient::spawn(config);
    handle.connect();
    wait_connected(&handle).await?;
    info!(investigation = %investigation_id, "connected, watching");

    let context = RealtimeContext::bound(handle.clone());
    let mut watcher = InvestigationWatcher::new(&context, investigation_id);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = watcher.next_event() => {
                let Some(event) = event else { break };
                let state = watcher.state();
                println!(
                    "{} {:>5.1}%  {}",
                    state.phase,
                    state.progress_pct,
                    serde_json::to_string(&event)?
                );
                if state.lifecycle.is_terminal() {
                    break;
                }
            }
        }
    }

    let state = watcher.state();
    println!("lifecycle: {:?}", state.lifecycle);
    if let Some(root_cause) = &state.root_cause {
        let confidence = state.confidence.unwrap_or(0.0);
        println!("root cause: {root_cause} (confidence {confidence:.2})");
    }
    if let Some(error) = &state.error {
        println!("error: {error}");
    }

    drop(watcher);
    handle.disconnect();
    Ok(())
}

async fn tail(config: RealtimeConfig, channel: &str) -> Result<()> {
    let handle = RealtimeClient::spawn(config);
    handle.connect();
    wait_connected(&handle).await?;

    handle.subscribe(channel);
    info!(channel = %channel, "connected, tailing");

    let mut events = handle.events();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            frame = events.recv() => match frame {
                Ok(frame) if frame.channel.as_deref() == Some(channel) => {
                    println!("{}", serde_json::to_string(&frame)?);
                }
                Ok(_) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {}
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    handle.unsubscribe(channel);
    handle.disconnect();
    Ok(())
}
