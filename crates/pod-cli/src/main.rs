use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pod_core::{FrameInput, Pipeline, PipelineConfig};
use pod_link::{CrtpPacket, RawPacket};
use std::io::BufRead;
use std::path::PathBuf;
use zbus::proxy;

#[derive(Parser)]
#[command(name = "pod", about = "Pod gesture and follow pipeline CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the wire bytes of a setpoint packet
    Encode {
        #[command(subcommand)]
        packet: PacketArgs,
    },
    /// Decode a packet given as hex bytes (e.g. "70 05 00 00 ...")
    Decode {
        hex: String,
    },
    /// Run recorded landmark frames through the pipeline offline
    Replay {
        /// Newline-delimited JSON frames
        path: PathBuf,
        /// Pipeline tuning file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Print every frame, not only those with a gesture
        #[arg(long)]
        all: bool,
    },
    /// Show daemon status
    Status,
    /// Reset the daemon's gesture recognizer and filters
    Reset,
}

#[derive(Subcommand)]
enum PacketArgs {
    /// Velocity + height setpoint (generic commander, hover type)
    Hover {
        #[arg(allow_hyphen_values = true)]
        vx: f32,
        #[arg(allow_hyphen_values = true)]
        vy: f32,
        #[arg(allow_hyphen_values = true)]
        vyaw: f32,
        height: f32,
    },
    /// Legacy attitude setpoint
    Setpoint {
        #[arg(allow_hyphen_values = true)]
        roll: f32,
        #[arg(allow_hyphen_values = true)]
        pitch: f32,
        #[arg(allow_hyphen_values = true)]
        yaw: f32,
        thrust: u16,
    },
}

#[proxy(
    interface = "org.pod.Pilot1",
    default_service = "org.pod.Pilot1",
    default_path = "/org/pod/Pilot1"
)]
trait Pilot {
    async fn status(&self) -> zbus::Result<String>;
    async fn reset(&self) -> zbus::Result<()>;
    async fn link_connected(&self) -> zbus::Result<bool>;
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Encode { packet } => {
            let packet = match packet {
                PacketArgs::Hover {
                    vx,
                    vy,
                    vyaw,
                    height,
                } => CrtpPacket::hover(vx, vy, vyaw, height),
                PacketArgs::Setpoint {
                    roll,
                    pitch,
                    yaw,
                    thrust,
                } => CrtpPacket::commander(roll, pitch, yaw, thrust),
            };
            println!("{}", format_hex(&packet.encode()));
        }
        Commands::Decode { hex } => {
            let bytes = parse_hex(&hex)?;
            let raw = RawPacket::parse(&bytes)?;
            println!(
                "header: port={:?} channel={}{}",
                raw.header.port,
                raw.header.channel,
                if raw.header.is_null() { " (null)" } else { "" }
            );
            match raw.decode_payload() {
                Ok(payload) => println!("{}", serde_json::to_string_pretty(&payload)?),
                Err(e) => println!("payload: {} bytes, not decoded ({e})", raw.payload.len()),
            }
        }
        Commands::Replay { path, config, all } => {
            let config = match config {
                Some(p) => PipelineConfig::load(&p)?,
                None => PipelineConfig::default(),
            };
            replay(&path, &config, all)?;
        }
        Commands::Status => {
            let proxy = connect().await?;
            let status = proxy.status().await.context("Status() call failed")?;
            let value: serde_json::Value = serde_json::from_str(&status)?;
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        Commands::Reset => {
            let proxy = connect().await?;
            proxy.reset().await.context("Reset() call failed")?;
            println!("pipeline reset");
        }
    }

    Ok(())
}

async fn connect() -> Result<PilotProxy<'static>> {
    let conn = zbus::Connection::session()
        .await
        .context("failed to connect to session bus")?;
    PilotProxy::new(&conn)
        .await
        .context("podd not reachable on org.pod.Pilot1")
}

fn replay(path: &std::path::Path, config: &PipelineConfig, all: bool) -> Result<()> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let mut pipeline = Pipeline::new(config)?;
    let mut events = 0u64;

    for (n, line) in std::io::BufReader::new(file).lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let frame: FrameInput = serde_json::from_str(line)
            .with_context(|| format!("{}:{}: malformed frame", path.display(), n + 1))?;
        let out = pipeline.process(&frame);
        if out.event.is_some() {
            events += 1;
        }
        if all || out.event.is_some() {
            println!(
                "{}",
                serde_json::json!({ "line": n + 1, "output": out })
            );
        }
    }

    let status = pipeline.status();
    eprintln!(
        "{} frames, {} gestures, final state {}",
        status.frames,
        events,
        status.gesture_state.as_str()
    );
    Ok(())
}

fn format_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Accepts "7005..", "70 05 ..", or "0x70,0x05".
fn parse_hex(input: &str) -> Result<Vec<u8>> {
    let digits: String = input
        .split(|c: char| c.is_whitespace() || c == ',' || c == ':')
        .map(|tok| tok.trim_start_matches("0x").trim_start_matches("0X"))
        .collect();
    if !digits.is_ascii() {
        bail!("non-hex characters in input");
    }
    if digits.len() % 2 != 0 {
        bail!("odd number of hex digits");
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .with_context(|| format!("invalid hex byte {:?}", &digits[i..i + 2]))
        })
        .collect()
}
