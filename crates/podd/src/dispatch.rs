//! Output side of the daemon: flight commands to the link, gestures to the
//! input-injection sink.

use crate::config::InputSinkMode;
use pod_core::{sink, FlightCommand, GestureEvent};
use pod_link::{CommandLink, CrtpPacket, LinkState, Transport};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, watch};

/// Send every new command over the link until the engine goes away.
///
/// The watch channel holds one value, so if sending lags behind the frame
/// rate the intermediate commands are skipped and only the newest goes out.
pub async fn run_command_dispatch<T: Transport>(
    mut commands: watch::Receiver<FlightCommand>,
    mut link: CommandLink<T>,
    link_state: watch::Sender<LinkState>,
) {
    while commands.changed().await.is_ok() {
        let cmd = *commands.borrow_and_update();
        let packet = CrtpPacket::hover(cmd.vx, cmd.vy, cmd.vyaw, cmd.target_height);
        let state = link.dispatch(&packet);
        link_state.send_if_modified(|current| {
            if *current != state {
                *current = state;
                true
            } else {
                false
            }
        });
    }
    let stats = link.stats();
    tracing::info!(sent = stats.sent, dropped = stats.dropped, "command dispatch stopped");
}

/// Deliver gesture events according to `mode`.
pub async fn run_event_sink(
    mut events: mpsc::Receiver<GestureEvent>,
    mode: InputSinkMode,
    shell: String,
) {
    while let Some(event) = events.recv().await {
        let command = sink::shell_command(&event);
        match mode {
            InputSinkMode::Off => {}
            InputSinkMode::Log => {
                tracing::info!(command = command.trim_end(), "input event");
            }
            InputSinkMode::Shell => {
                if let Err(e) = inject(&shell, &command).await {
                    tracing::warn!(shell = %shell, error = %e, "input injection failed");
                }
            }
        }
    }
}

/// Run `shell` and write one command to its stdin.
///
/// `shell` is split on whitespace into program and arguments, so values
/// like `su` or `adb shell` both work.
async fn inject(shell: &str, command: &str) -> std::io::Result<()> {
    let mut argv = shell.split_whitespace();
    let program = argv.next().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty input shell")
    })?;
    let mut child = tokio::process::Command::new(program)
        .args(argv)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .spawn()?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(command.as_bytes()).await?;
        stdin.flush().await?;
        // dropping stdin closes the pipe so the shell exits
    }
    let status = child.wait().await?;
    if !status.success() {
        tracing::debug!(?status, "input shell exited with failure");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pod_link::TransportError;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Shared(Arc<Mutex<Vec<Vec<u8>>>>);

    impl Transport for Shared {
        fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
            self.0.lock().unwrap().push(bytes.to_vec());
            Ok(())
        }

        fn is_connected(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn test_dispatch_encodes_hover_packets() {
        let sent = Shared::default();
        let (cmd_tx, cmd_rx) = watch::channel(FlightCommand::hold(0.5));
        let (state_tx, state_rx) = watch::channel(LinkState::Disconnected);

        let task = tokio::spawn(run_command_dispatch(
            cmd_rx,
            CommandLink::new(sent.clone()),
            state_tx,
        ));

        let cmd = FlightCommand {
            vx: -0.15,
            vy: 0.0,
            vyaw: 10.0,
            target_height: 0.5,
        };
        cmd_tx.send(cmd).unwrap();
        // closing the sender ends the dispatch loop after the pending value
        drop(cmd_tx);
        task.await.unwrap();

        let packets = sent.0.lock().unwrap();
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0], CrtpPacket::hover(-0.15, 0.0, 10.0, 0.5).encode());
        assert_eq!(*state_rx.borrow(), LinkState::Connected);
    }

    #[tokio::test]
    async fn test_shell_sink_writes_commands_to_stdin() {
        use pod_core::ScreenPoint;

        let out = std::env::temp_dir().join(format!("podd-sink-{}", std::process::id()));
        let _ = std::fs::remove_file(&out);

        let (tx, rx) = mpsc::channel(4);
        tx.send(GestureEvent::Press {
            point: ScreenPoint::new(10, 20),
        })
        .await
        .unwrap();
        tx.send(GestureEvent::Back).await.unwrap();
        drop(tx);
        // each event runs its own `tee -a`, which appends its stdin to the file
        run_event_sink(rx, InputSinkMode::Shell, format!("tee -a {}", out.display())).await;

        let received = std::fs::read_to_string(&out).unwrap();
        std::fs::remove_file(&out).unwrap();
        assert_eq!(received, "input tap 10 100\ninput keyevent KEYCODE_BACK\n");
    }

    #[tokio::test]
    async fn test_shell_sink_survives_missing_shell() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(GestureEvent::Back).await.unwrap();
        drop(tx);
        run_event_sink(rx, InputSinkMode::Shell, "/nonexistent/su".into()).await;
    }

    #[tokio::test]
    async fn test_empty_shell_is_rejected() {
        let err = inject("  ", "input keyevent KEYCODE_BACK\n").await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_event_sink_drains() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(GestureEvent::Back).await.unwrap();
        drop(tx);
        run_event_sink(rx, InputSinkMode::Off, "sh".into()).await;
    }
}
