use pod_core::{FlightCommand, FrameInput, GestureEvent, Pipeline, PipelineConfig, PipelineStatus};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("pipeline config: {0}")]
    Config(#[from] pod_core::ConfigError),
    #[error("failed to spawn engine thread: {0}")]
    Spawn(std::io::Error),
    #[error("engine thread exited")]
    ChannelClosed,
}

/// Messages sent to the engine thread.
enum EngineRequest {
    Frame(Box<FrameInput>),
    Reset {
        reply: oneshot::Sender<()>,
    },
    Status {
        reply: oneshot::Sender<PipelineStatus>,
    },
}

/// Where the engine publishes its results.
pub struct EngineOutputs {
    /// Latest command only; a slow dispatcher sees the newest value.
    pub commands: watch::Sender<FlightCommand>,
    /// Discrete gestures, dropped if the sink falls behind.
    pub events: mpsc::Sender<GestureEvent>,
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
}

impl EngineHandle {
    /// Queue one frame for processing. Waits if the engine is behind.
    pub async fn submit(&self, frame: FrameInput) -> Result<(), EngineError> {
        self.tx
            .send(EngineRequest::Frame(Box::new(frame)))
            .await
            .map_err(|_| EngineError::ChannelClosed)
    }

    /// Restart the session: gesture recognizer to `Wait`, filters cleared.
    pub async fn reset(&self) -> Result<(), EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Reset { reply: reply_tx })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)
    }

    pub async fn status(&self) -> Result<PipelineStatus, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Status { reply: reply_tx })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)
    }
}

/// Spawn the pipeline on a dedicated OS thread.
///
/// Builds the pipeline synchronously so a bad config fails at startup,
/// then processes requests until every handle is dropped.
pub fn spawn_engine(
    config: &PipelineConfig,
    outputs: EngineOutputs,
) -> Result<EngineHandle, EngineError> {
    let mut pipeline = Pipeline::new(config)?;
    tracing::info!(
        screen_width = config.screen.width,
        screen_height = config.screen.height,
        near = config.control.near_threshold,
        far = config.control.far_threshold,
        "pipeline ready"
    );

    let (tx, mut rx) = mpsc::channel::<EngineRequest>(4);

    std::thread::Builder::new()
        .name("pod-engine".into())
        .spawn(move || {
            tracing::info!("engine thread started");
            while let Some(req) = rx.blocking_recv() {
                match req {
                    EngineRequest::Frame(frame) => run_frame(&mut pipeline, &frame, &outputs),
                    EngineRequest::Reset { reply } => {
                        pipeline.reset();
                        // publish the hold command so the vehicle stops following
                        outputs.commands.send_replace(pipeline.status().last_command);
                        let _ = reply.send(());
                    }
                    EngineRequest::Status { reply } => {
                        let _ = reply.send(pipeline.status());
                    }
                }
            }
            pipeline.reset();
            tracing::info!("engine thread exiting");
        })
        .map_err(EngineError::Spawn)?;

    Ok(EngineHandle { tx })
}

fn run_frame(pipeline: &mut Pipeline, frame: &FrameInput, outputs: &EngineOutputs) {
    let out = pipeline.process(frame);

    if let Some(event) = out.event {
        tracing::info!(event = ?event, "gesture");
        if let Err(e) = outputs.events.try_send(event) {
            tracing::warn!(error = %e, "gesture sink behind; event dropped");
        }
    }
    // never blocks; receivers only ever see the latest command
    outputs.commands.send_replace(out.command);
}
