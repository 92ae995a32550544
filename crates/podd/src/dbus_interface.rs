use crate::engine::EngineHandle;
use pod_link::LinkState;
use tokio::sync::watch;
use zbus::interface;

/// D-Bus interface for the pod daemon.
///
/// Bus name: org.pod.Pilot1
/// Object path: /org/pod/Pilot1
pub struct PodService {
    pub engine: EngineHandle,
    pub link: watch::Receiver<LinkState>,
}

#[interface(name = "org.pod.Pilot1")]
impl PodService {
    /// Return daemon status as JSON.
    async fn status(&self) -> zbus::fdo::Result<String> {
        let pipeline = self
            .engine
            .status()
            .await
            .map_err(|e| zbus::fdo::Error::Failed(e.to_string()))?;
        let link = *self.link.borrow();
        Ok(serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "link": link.as_str(),
            "pipeline": pipeline,
        })
        .to_string())
    }

    /// Return the recognizer to `Wait` and clear all filters.
    async fn reset(&self) -> zbus::fdo::Result<()> {
        tracing::info!("reset requested");
        self.engine
            .reset()
            .await
            .map_err(|e| zbus::fdo::Error::Failed(e.to_string()))
    }

    /// Whether the command link to the vehicle is currently open.
    async fn link_connected(&self) -> bool {
        *self.link.borrow() == LinkState::Connected
    }
}
