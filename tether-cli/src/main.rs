use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use colored::*;
use dialoguer::Select;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tether_client::{
    BusClient, BusConfig, CallConfig, CallEvent, CallOptions, CallPhase, CallSession,
    ConnectionStatus, DeviceTerminator, HttpDeviceTerminator, RtcPeerFactory,
};
use tether_core::utils::{DEFAULT_ROOM_PREFIX, HEARTBEAT_TOPIC};
use tether_core::{PeerRole, RoomId};
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;

#[derive(Parser)]
#[command(name = "cargo-tether")]
#[command(bin_name = "cargo-tether")]
enum Cli {
    Tether(TetherArgs),
}

#[derive(Args)]
struct TetherArgs {
    /// Relay WebSocket endpoint.
    #[arg(
        long,
        env = "TETHER_URL",
        default_value = "ws://127.0.0.1:3000/ws",
        global = true
    )]
    url: String,

    /// Name stamped as `source` on outgoing frames.
    #[arg(long, env = "TETHER_SOURCE", default_value = "tether-cli", global = true)]
    source: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every frame published on the given topics.
    Subscribe {
        #[arg(required = true)]
        topics: Vec<String>,
    },

    /// Publish one data frame.
    Publish {
        topic: String,

        /// Value of the frame's `type` field.
        #[arg(long = "type")]
        kind: Option<String>,

        /// Extra `key=value` field; values that parse as JSON are sent as JSON.
        #[arg(short, long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },

    /// Call a room as the initiator.
    Call {
        room: String,

        #[arg(long, default_value = DEFAULT_ROOM_PREFIX)]
        room_prefix: String,

        /// Seconds to wait for the responder before offering a retry.
        #[arg(long, default_value_t = 20)]
        timeout_secs: u64,

        /// Relay HTTP origin used to power the device off after hangup.
        #[arg(long, env = "TETHER_DEVICE_URL")]
        device_url: Option<String>,
    },
}

fn parse_field(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .ok_or_else(|| format!("expected key=value, got `{}`", s))
}

#[tokio::main]
async fn main() {
    let Cli::Tether(args) = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run(args).await {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(args: TetherArgs) -> Result<()> {
    let bus = BusClient::connect(BusConfig::new(args.url).with_source(args.source));

    let result = match args.command {
        Commands::Subscribe { topics } => subscribe(&bus, topics).await,
        Commands::Publish {
            topic,
            kind,
            fields,
        } => publish(&bus, &topic, kind, fields).await,
        Commands::Call {
            room,
            room_prefix,
            timeout_secs,
            device_url,
        } => {
            let config = CallConfig {
                room_prefix,
                negotiation_timeout: Duration::from_secs(timeout_secs),
                ..CallConfig::default()
            };
            call(&bus, RoomId::new(room), config, device_url).await
        }
    };

    bus.shutdown().await;
    result
}

async fn subscribe(bus: &BusClient, topics: Vec<String>) -> Result<()> {
    let mut frames = bus.frames();
    let mut status = bus.status();
    bus.subscribe(topics.iter().cloned())?;
    println!("{} {}", "Subscribed to".green().bold(), topics.join(", "));

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            frame = frames.recv() => match frame {
                Ok(frame) => {
                    if frame.topic() == HEARTBEAT_TOPIC && !topics.iter().any(|t| t == HEARTBEAT_TOPIC) {
                        continue;
                    }
                    println!("{} {}", format!("[{}]", frame.topic()).cyan(), frame.to_text()?);
                }
                Err(RecvError::Lagged(n)) => println!("{}", format!("skipped {} frame(s)", n).yellow()),
                Err(RecvError::Closed) => break,
            },

            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *status.borrow_and_update();
                print_status(current);
                if current == ConnectionStatus::Unreachable {
                    bail!("relay unreachable");
                }
            }

            _ = &mut ctrl_c => break,
        }
    }

    let stats = serde_json::to_string(&bus.stats())?;
    println!("{}", stats.dimmed());
    Ok(())
}

async fn publish(
    bus: &BusClient,
    topic: &str,
    kind: Option<String>,
    fields: Vec<(String, String)>,
) -> Result<()> {
    let mut frame = bus.message(topic);
    if let Some(kind) = kind {
        frame.insert("type", kind);
    }
    for (key, value) in fields {
        let value = serde_json::from_str::<Value>(&value).unwrap_or(Value::String(value));
        frame.insert(key, value);
    }

    tokio::time::timeout(
        Duration::from_secs(10),
        bus.wait_for(ConnectionStatus::Connected),
    )
    .await
    .context("relay did not accept a connection in time")??;

    bus.publish(&frame)?;
    println!("{} {}", "Published".green().bold(), frame.to_text()?);
    Ok(())
}

async fn call(
    bus: &BusClient,
    room: RoomId,
    config: CallConfig,
    device_url: Option<String>,
) -> Result<()> {
    let terminator = device_url
        .map(|url| Arc::new(HttpDeviceTerminator::new(url)) as Arc<dyn DeviceTerminator>);
    let options = CallOptions {
        config,
        terminator,
        ..CallOptions::default()
    };

    println!("{} {}", "Calling".green().bold(), room);
    let (handle, mut events) = CallSession::spawn(
        bus.clone(),
        room,
        PeerRole::Initiator,
        Arc::new(RtcPeerFactory::default()),
        options,
    );

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut hanging_up = false;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    break;
                };
                match event {
                    CallEvent::Phase(phase) => print_phase(phase),
                    CallEvent::NegotiationTimeout => {
                        println!("{}", "No answer from the room.".yellow());
                        let outcome = if prompt_retry().await? {
                            handle.retry()
                        } else {
                            handle.hangup()
                        };
                        if outcome.is_err() {
                            break;
                        }
                    }
                    CallEvent::Occupied => println!("{}", "Room is busy with another call.".red().bold()),
                    CallEvent::RemoteMute { audio_muted, video_muted } => {
                        println!("remote audio {} / video {}", on_off(!audio_muted), on_off(!video_muted));
                    }
                    CallEvent::PeerState(state) => println!("{}", format!("peer {:?}", state).dimmed()),
                    CallEvent::OwnershipLost => println!("{}", "Another surface took over this room.".yellow()),
                    CallEvent::DevicePoweredOff => println!("{}", "Device powered off.".green()),
                    CallEvent::DeviceOffFailed(reason) => println!("{} {}", "Device stayed on:".yellow(), reason),
                }
            }

            _ = &mut ctrl_c, if !hanging_up => {
                hanging_up = true;
                debug!("Hangup requested from terminal");
                if handle.hangup().is_err() {
                    break;
                }
            }
        }
    }

    Ok(())
}

async fn prompt_retry() -> Result<bool> {
    let choice = tokio::task::spawn_blocking(|| {
        Select::new()
            .with_prompt("Retry the call?")
            .items(&["Retry", "Cancel"])
            .default(0)
            .interact()
    })
    .await
    .context("prompt task failed")?
    .context("prompt failed")?;
    Ok(choice == 0)
}

fn print_status(status: ConnectionStatus) {
    let label = format!("{:?}", status).to_lowercase();
    let label = match status {
        ConnectionStatus::Connected => label.green(),
        ConnectionStatus::Connecting => label.cyan(),
        ConnectionStatus::Disconnected => label.yellow(),
        ConnectionStatus::Unreachable => label.red().bold(),
    };
    println!("{} {}", "bus".dimmed(), label);
}

fn print_phase(phase: CallPhase) {
    let label = format!("{:?}", phase);
    let label = match phase {
        CallPhase::InCall => label.green().bold(),
        CallPhase::TimedOut | CallPhase::Ended => label.yellow(),
        _ => label.cyan(),
    };
    println!("{} {}", "call".dimmed(), label);
}

fn on_off(on: bool) -> ColoredString {
    if on { "on".green() } else { "off".red() }
}
