//! Landmark frame intake: newline-delimited JSON from stdin or a file/FIFO.

use crate::engine::EngineHandle;
use pod_core::FrameInput;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

/// Counts for one source run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SourceStats {
    pub frames: u64,
    pub malformed: u64,
}

/// Open the configured source (`-` for stdin) and feed it to the engine.
pub async fn run_frame_source(path: &str, engine: EngineHandle) -> anyhow::Result<SourceStats> {
    if path == "-" {
        tracing::info!("reading landmark frames from stdin");
        feed(BufReader::new(tokio::io::stdin()), &engine).await
    } else {
        tracing::info!(path, "reading landmark frames");
        let file = tokio::fs::File::open(path).await?;
        feed(BufReader::new(file), &engine).await
    }
}

/// Feed every line of `reader` to the engine until EOF.
///
/// Malformed lines are logged and skipped; a frame producer glitch must not
/// take the pipeline down.
pub async fn feed<R>(reader: R, engine: &EngineHandle) -> anyhow::Result<SourceStats>
where
    R: AsyncBufRead + Unpin,
{
    let mut stats = SourceStats::default();
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<FrameInput>(line) {
            Ok(frame) => {
                engine.submit(frame).await?;
                stats.frames += 1;
            }
            Err(e) => {
                stats.malformed += 1;
                tracing::warn!(error = %e, "malformed frame skipped");
            }
        }
    }
    tracing::info!(frames = stats.frames, malformed = stats.malformed, "frame source ended");
    Ok(stats)
}
