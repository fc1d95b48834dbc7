// SPDX-License-Identifier: MPL-2.0

//! Monitor program: mirror one RS90 remote and print everything it does.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example monitor -- <host> <remote_id> [<username> <password>]
//! ```
//!
//! # Example
//!
//! ```bash
//! RUST_LOG=rs90_lib=debug cargo run --example monitor -- 192.168.1.50 abc123
//! ```
//!
//! Press Ctrl+C to stop.

use std::env;

use rs90_lib::event::RemoteEvent;
use rs90_lib::state::StateChange;
use rs90_lib::{MqttBroker, Remote, RemoteConfig};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "rs90_lib=info".into()))
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() != 3 && args.len() != 5 {
        eprintln!("Usage: {} <host> <remote_id> [<username> <password>]", args[0]);
        eprintln!();
        eprintln!("Example:");
        eprintln!("  cargo run --example monitor -- 192.168.1.50 abc123");
        std::process::exit(1);
    }

    let host = &args[1];
    let remote_id = &args[2];

    println!("Connecting to MQTT broker {host}...");

    let mut builder = MqttBroker::builder().host(host);
    if args.len() == 5 {
        builder = builder.credentials(&args[3], &args[4]);
    }
    let broker = builder.build().await?;

    let remote = Remote::start(broker.clone(), RemoteConfig::new(remote_id)).await?;
    let mut events = remote.subscribe();

    println!("Mirroring remote {remote_id}, press Ctrl+C to stop.");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(RemoteEvent::KeyPressed(press)) => {
                    println!("[key] button {} (#{}) at {}", press.button, press.sequence, press.timestamp);
                }
                Ok(RemoteEvent::StateChanged { change, new_state }) => {
                    print_change(&change);
                    if change.affects_catalog() {
                        println!(
                            "        {} devices, {} macros, {} command lists",
                            new_state.devices().len(),
                            new_state.macros().len(),
                            new_state.all_device_commands().len()
                        );
                    }
                }
                Err(RecvError::Lagged(missed)) => println!("(missed {missed} events)"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    println!();
    println!("{}", serde_json::to_string_pretty(&remote.diagnostics().await?)?);

    println!("Disconnecting...");
    remote.shutdown().await?;
    broker.disconnect().await?;

    println!("Done!");
    Ok(())
}

fn print_change(change: &StateChange) {
    match change {
        StateChange::Status(status) => println!("[status] {status}"),
        StateChange::BatteryLevel(level) => println!("[battery] {level}"),
        StateChange::LastKey(_) => {}
        StateChange::RunningMacro(text) => {
            println!("[running] {}", text.as_deref().unwrap_or("-"));
        }
        StateChange::Devices(devices) => println!("[devices] {} listed", devices.len()),
        StateChange::Macros(macros) => println!("[macros] {} listed", macros.len()),
        StateChange::DeviceCommands { device, commands } => {
            println!("[commands] {device}: {}", commands.len());
        }
        StateChange::DeviceCommandsRemoved { device } => println!("[commands] {device} removed"),
        StateChange::MacroState { name, state } => println!("[macro] {name} {state}"),
        StateChange::MacroStateRemoved { name } => println!("[macro] {name} removed"),
        StateChange::RingLight { state, duration } => match duration {
            Some(duration) => println!("[ring light] {state} for {duration}s"),
            None => println!("[ring light] {state}"),
        },
        StateChange::Batch(changes) => changes.iter().for_each(print_change),
    }
}
