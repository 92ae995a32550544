use anyhow::Result;
use pod_core::FlightCommand;
use pod_link::{CommandLink, LinkState, SerialTransport};
use tokio::sync::{mpsc, watch};
use tracing_subscriber::EnvFilter;

mod config;
mod dbus_interface;
mod dispatch;
mod engine;
mod source;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "podd starting");

    let config = config::Config::from_env();
    let pipeline_config = config.pipeline()?;
    tracing::info!(
        device = %config.serial_device,
        source = %config.frame_source,
        sink = ?config.input_sink,
        "configuration loaded"
    );

    let (cmd_tx, cmd_rx) = watch::channel(FlightCommand::hold(pipeline_config.control.target_height));
    let (event_tx, event_rx) = mpsc::channel(16);
    let (link_tx, link_rx) = watch::channel(LinkState::Disconnected);

    let engine = engine::spawn_engine(
        &pipeline_config,
        engine::EngineOutputs {
            commands: cmd_tx,
            events: event_tx,
        },
    )?;

    let link = CommandLink::new(SerialTransport::new(
        &config.serial_device,
        config.reconnect_interval,
    ));
    tokio::spawn(dispatch::run_command_dispatch(cmd_rx, link, link_tx));
    tokio::spawn(dispatch::run_event_sink(
        event_rx,
        config.input_sink,
        config.input_shell.clone(),
    ));

    // Keep the connection alive for the daemon's lifetime.
    let _dbus = if config.dbus_enabled {
        let service = dbus_interface::PodService {
            engine: engine.clone(),
            link: link_rx,
        };
        match register_dbus(service).await {
            Ok(conn) => {
                tracing::info!("D-Bus interface registered at org.pod.Pilot1");
                Some(conn)
            }
            Err(e) => {
                tracing::warn!(error = %e, "D-Bus registration failed; continuing without it");
                None
            }
        }
    } else {
        None
    };

    tracing::info!("podd ready");

    tokio::select! {
        result = source::run_frame_source(&config.frame_source, engine) => {
            match result {
                Ok(stats) => tracing::info!(frames = stats.frames, "frame source finished"),
                Err(e) => tracing::error!(error = %e, "frame source failed"),
            }
        }
        _ = tokio::signal::ctrl_c() => {}
    }

    tracing::info!("podd shutting down");
    Ok(())
}

async fn register_dbus(service: dbus_interface::PodService) -> zbus::Result<zbus::Connection> {
    zbus::connection::Builder::session()?
        .name("org.pod.Pilot1")?
        .serve_at("/org/pod/Pilot1", service)?
        .build()
        .await
}
