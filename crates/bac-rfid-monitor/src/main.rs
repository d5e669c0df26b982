//! # BAC RFID Monitor
//!
//! Subscribes to RFID tag reports from building access control readers and
//! prints them to the console until Enter or Ctrl+C is pressed.
//!
//! ## Usage
//!
//! `bac-rfid-monitor <serverAddress> [port]`
//!
//! Further settings come from `BAC_RFID_*` environment variables; see
//! [`config::MonitorConfig::from_env`].

use anyhow::{bail, Context, Result};
use bac_rfid_subscriber::{ConnectionManager, ConnectionState, MqttTransport};
use std::future::Future;
use tokio::sync::{oneshot, watch};
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod console;

use cli::BrokerArgs;
use config::MonitorConfig;
use console::ConsoleSink;

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(broker) = BrokerArgs::parse(&args)? else {
        println!("{}", cli::USAGE);
        return Ok(());
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting BAC RFID monitor"
    );

    let config = MonitorConfig::from_env()?;
    let endpoint = broker.endpoint()?;
    let transport = MqttTransport::new(config.transport());

    tracing::info!(
        broker = %endpoint,
        client_id = transport.client_id(),
        bac = ?config.bac,
        "Monitor configured"
    );

    let manager = ConnectionManager::new(
        config.manager(endpoint),
        transport,
        ConsoleSink::stdout(config.output),
    )
    .context("Failed to create connection manager")?;
    let handle = manager.start();

    println!("Press Enter or Ctrl+C to exit.");

    let exit = wait_for_exit(
        handle.subscribe_state(),
        spawn_keypress_listener(),
        tokio::signal::ctrl_c(),
    )
    .await;

    handle.shutdown().await;
    if exit == Exit::SubscriberStopped {
        bail!("Subscriber stopped on its own; console output is no longer writable");
    }
    Ok(())
}

/// Why the monitor is exiting.
#[derive(Debug, PartialEq, Eq)]
enum Exit {
    /// Enter or Ctrl+C
    Requested,
    /// The manager gave up without being asked to
    SubscriberStopped,
}

async fn wait_for_exit(
    mut states: watch::Receiver<ConnectionState>,
    keypress: oneshot::Receiver<()>,
    interrupt: impl Future<Output = std::io::Result<()>>,
) -> Exit {
    tokio::select! {
        Ok(()) = keypress => {
            tracing::info!("Key pressed");
            Exit::Requested
        }
        result = interrupt => {
            if let Err(err) = result {
                tracing::error!(error = %err, "Failed to listen for Ctrl+C");
            } else {
                tracing::info!("Shutdown signal received");
            }
            Exit::Requested
        }
        // A dropped sender also means the manager has finished.
        _ = states.wait_for(ConnectionState::is_stopped) => {
            tracing::error!("Subscriber stopped unexpectedly");
            Exit::SubscriberStopped
        }
    }
}

/// Resolves once a line is read from stdin.
///
/// A closed or missing stdin drops the sender, which disables that branch and
/// leaves Ctrl+C as the only way out. The read runs on a plain thread because
/// a blocking stdin read cannot be cancelled and would hold up runtime
/// shutdown.
fn spawn_keypress_listener() -> oneshot::Receiver<()> {
    let (tx, rx) = oneshot::channel();
    std::thread::spawn(move || {
        let mut line = String::new();
        if matches!(std::io::stdin().read_line(&mut line), Ok(n) if n > 0) {
            let _ = tx.send(());
        }
    });
    rx
}
