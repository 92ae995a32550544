//! Best-effort byte transport to the flight controller.
//!
//! Sends never block and never retry: a packet that cannot be written right
//! now is dropped, because the next frame's command supersedes it anyway.

use crate::crtp::CrtpPacket;
use nix::sys::termios::{self, BaudRate, ControlFlags, SetArg};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("link not connected")]
    NotConnected,
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to configure {path}: {source}")]
    Configure { path: String, source: nix::Error },
    #[error("link busy; packet dropped")]
    WouldBlock,
    #[error("short write: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },
    #[error("write failed: {0}")]
    Write(std::io::Error),
}

/// Connection state reported to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkState {
    Connected,
    #[default]
    Disconnected,
}

impl LinkState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
        }
    }
}

/// Something that can push bytes toward the vehicle.
pub trait Transport: Send {
    /// Write one complete packet. Must not block.
    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError>;
    fn is_connected(&self) -> bool;
}

/// Raw serial tty (USB CDC radio dongle or direct controller link),
/// 115200 8N1, no flow control, non-blocking writes.
///
/// The device is opened lazily and reopened after a failure, at most once
/// per `reconnect_interval`.
pub struct SerialTransport {
    path: String,
    file: Option<File>,
    reconnect_interval: Duration,
    last_attempt: Option<Instant>,
}

impl SerialTransport {
    pub fn new(path: &str, reconnect_interval: Duration) -> Self {
        Self {
            path: path.to_string(),
            file: None,
            reconnect_interval,
            last_attempt: None,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Open and configure the tty now.
    pub fn connect(&mut self) -> Result<(), TransportError> {
        self.last_attempt = Some(Instant::now());
        let file = open_raw_tty(&self.path)?;
        tracing::info!(device = %self.path, "serial link opened");
        self.file = Some(file);
        Ok(())
    }

    pub fn disconnect(&mut self) {
        if self.file.take().is_some() {
            tracing::info!(device = %self.path, "serial link closed");
        }
    }

    fn reconnect_due(&self) -> bool {
        match self.last_attempt {
            None => true,
            Some(t) => t.elapsed() >= self.reconnect_interval,
        }
    }
}

impl Transport for SerialTransport {
    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        if self.file.is_none() {
            if !self.reconnect_due() {
                return Err(TransportError::NotConnected);
            }
            self.connect()?;
        }
        let Some(file) = self.file.as_mut() else {
            return Err(TransportError::NotConnected);
        };

        match write_frame(file, bytes) {
            Ok(()) => Ok(()),
            Err(TransportError::Write(e)) => {
                // device unplugged or similar: drop the fd and reopen later
                tracing::warn!(device = %self.path, error = %e, "serial write failed; closing link");
                self.file = None;
                self.last_attempt = Some(Instant::now());
                Err(TransportError::Write(e))
            }
            Err(e @ TransportError::ShortWrite { .. }) => {
                // a torn frame desyncs the receiver; start over on a fresh fd
                tracing::warn!(device = %self.path, error = %e, "partial packet on the wire; closing link");
                self.file = None;
                self.last_attempt = Some(Instant::now());
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    fn is_connected(&self) -> bool {
        self.file.is_some()
    }
}

/// Retries allowed to finish a packet the tty accepted only in part.
const PARTIAL_WRITE_RETRIES: u32 = 5;
/// Roughly the time to drain one hover packet at 115200 baud.
const PARTIAL_WRITE_BACKOFF: Duration = Duration::from_millis(2);

/// Write one whole packet.
///
/// Nothing written and the device busy: `WouldBlock`, the packet is dropped
/// cleanly. Once any byte is out the rest must follow, so the remainder is
/// retried briefly before giving up with `ShortWrite`.
fn write_frame<W: Write>(w: &mut W, bytes: &[u8]) -> Result<(), TransportError> {
    let mut written = 0;
    let mut retries = 0;
    while written < bytes.len() {
        match w.write(&bytes[written..]) {
            Ok(0) => {
                return Err(TransportError::ShortWrite {
                    written,
                    expected: bytes.len(),
                })
            }
            Ok(n) => written += n,
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                if written == 0 {
                    return Err(TransportError::WouldBlock);
                }
                if retries == PARTIAL_WRITE_RETRIES {
                    return Err(TransportError::ShortWrite {
                        written,
                        expected: bytes.len(),
                    });
                }
                retries += 1;
                std::thread::sleep(PARTIAL_WRITE_BACKOFF);
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(TransportError::Write(e)),
        }
    }
    Ok(())
}

fn open_raw_tty(path: &str) -> Result<File, TransportError> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(libc::O_NOCTTY | libc::O_NONBLOCK)
        .open(path)
        .map_err(|source| TransportError::Open {
            path: path.to_string(),
            source,
        })?;

    let configure = |file: &File| -> nix::Result<()> {
        let mut tio = termios::tcgetattr(file)?;
        termios::cfmakeraw(&mut tio);
        termios::cfsetspeed(&mut tio, BaudRate::B115200)?;
        tio.control_flags.remove(ControlFlags::CSTOPB | ControlFlags::PARENB | ControlFlags::CRTSCTS);
        tio.control_flags.insert(ControlFlags::CS8 | ControlFlags::CLOCAL | ControlFlags::CREAD);
        termios::tcsetattr(file, SetArg::TCSANOW, &tio)
    };
    configure(&file).map_err(|source| TransportError::Configure {
        path: path.to_string(),
        source,
    })?;
    Ok(file)
}

/// Counters for packets handed to the link.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LinkStats {
    pub sent: u64,
    pub dropped: u64,
}

/// Fire-and-forget packet dispatch over any [`Transport`].
pub struct CommandLink<T: Transport> {
    transport: T,
    state: LinkState,
    stats: LinkStats,
}

impl<T: Transport> CommandLink<T> {
    pub fn new(transport: T) -> Self {
        let state = if transport.is_connected() {
            LinkState::Connected
        } else {
            LinkState::Disconnected
        };
        Self {
            transport,
            state,
            stats: LinkStats::default(),
        }
    }

    /// Encode and send. Failures are logged and the packet is dropped.
    /// Returns the link state after the attempt.
    pub fn dispatch(&mut self, packet: &CrtpPacket) -> LinkState {
        let bytes = packet.encode();
        match self.transport.send(&bytes) {
            Ok(()) => self.stats.sent += 1,
            Err(TransportError::NotConnected) => self.stats.dropped += 1,
            Err(e) => {
                self.stats.dropped += 1;
                tracing::debug!(error = %e, "packet dropped");
            }
        }

        let state = if self.transport.is_connected() {
            LinkState::Connected
        } else {
            LinkState::Disconnected
        };
        if state != self.state {
            match state {
                LinkState::Connected => tracing::info!("command link up"),
                LinkState::Disconnected => tracing::warn!("command link down; commands will be dropped"),
            }
            self.state = state;
        }
        state
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// In-memory transport that records packets while "plugged in".
    struct Recorder {
        connected: bool,
        sent: Vec<Vec<u8>>,
    }

    impl Transport for Recorder {
        fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
            if !self.connected {
                return Err(TransportError::NotConnected);
            }
            self.sent.push(bytes.to_vec());
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.connected
        }
    }

    #[test]
    fn test_dispatch_sends_encoded_packet() {
        let mut link = CommandLink::new(Recorder { connected: true, sent: vec![] });
        let packet = CrtpPacket::hover(0.15, 0.0, 0.0, 0.5);
        assert_eq!(link.dispatch(&packet), LinkState::Connected);
        assert_eq!(link.transport().sent, vec![packet.encode()]);
        assert_eq!(link.stats(), LinkStats { sent: 1, dropped: 0 });
    }

    #[test]
    fn test_dispatch_drops_when_disconnected() {
        let mut link = CommandLink::new(Recorder { connected: false, sent: vec![] });
        let packet = CrtpPacket::hover(0.0, 0.0, 0.0, 0.5);
        for _ in 0..3 {
            assert_eq!(link.dispatch(&packet), LinkState::Disconnected);
        }
        assert!(link.transport().sent.is_empty());
        assert_eq!(link.stats(), LinkStats { sent: 0, dropped: 3 });
    }

    /// Writer that accepts at most `chunk` bytes per call and reports busy
    /// for the next `busy` calls after each partial write.
    struct Choppy {
        chunk: usize,
        busy: u32,
        pending_busy: u32,
        out: Vec<u8>,
    }

    impl Write for Choppy {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.pending_busy > 0 {
                self.pending_busy -= 1;
                return Err(ErrorKind::WouldBlock.into());
            }
            let n = buf.len().min(self.chunk);
            self.out.extend_from_slice(&buf[..n]);
            self.pending_busy = self.busy;
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_partial_write_is_completed() {
        let bytes = CrtpPacket::hover(0.15, 0.0, 10.0, 0.5).encode();
        let mut w = Choppy { chunk: 5, busy: 1, pending_busy: 0, out: vec![] };
        write_frame(&mut w, &bytes).unwrap();
        assert_eq!(w.out, bytes);
    }

    #[test]
    fn test_busy_device_drops_whole_packet() {
        let mut w = Choppy { chunk: 64, busy: 0, pending_busy: 1, out: vec![] };
        assert!(matches!(write_frame(&mut w, &[0x70, 0x05]), Err(TransportError::WouldBlock)));
        assert!(w.out.is_empty());
    }

    #[test]
    fn test_stalled_partial_write_reports_short_write() {
        let mut w = Choppy { chunk: 4, busy: u32::MAX, pending_busy: 0, out: vec![] };
        let err = write_frame(&mut w, &[0u8; 18]).unwrap_err();
        assert!(matches!(err, TransportError::ShortWrite { written: 4, expected: 18 }));
    }

    #[test]
    fn test_serial_missing_device_is_throttled() {
        let mut t = SerialTransport::new("/nonexistent/ttyPOD0", Duration::from_secs(60));
        assert!(matches!(t.send(&[0x70]), Err(TransportError::Open { .. })));
        // second attempt inside the reconnect interval does not touch the fs
        assert!(matches!(t.send(&[0x70]), Err(TransportError::NotConnected)));
        assert!(!t.is_connected());
    }

    #[test]
    fn test_serial_link_never_panics_when_absent() {
        let mut link = CommandLink::new(SerialTransport::new(
            "/nonexistent/ttyPOD1",
            Duration::from_millis(0),
        ));
        let packet = CrtpPacket::hover(0.0, 0.0, 0.0, 0.5);
        assert_eq!(link.dispatch(&packet), LinkState::Disconnected);
        assert_eq!(link.dispatch(&packet), LinkState::Disconnected);
        assert_eq!(link.stats().dropped, 2);
    }
}
