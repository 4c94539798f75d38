//! Scene host orchestrator
//!
//! Owns the live model and at most one worklet. Model loads are published to
//! the worklet as model-change events; worklet writes come back through a
//! per-worklet dispatch task that enforces capabilities.

use crate::config::{HostConfig, ReplacementPolicy};
use crate::dispatch::{Dispatcher, SharedScene};
use crate::error::HostError;
use parking_lot::RwLock;
use sgw_rpc::ToWorklet;
use sgw_scene::{Generation, Model, ModelGraph, SceneExporter};
use sgw_worklet::{
    BridgeEvent, ScriptElement, ScriptFetcher, Worklet, WorkletExit, WorkletId, WorkletManager,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

struct ActiveWorklet {
    worklet: Worklet,
    dispatch: JoinHandle<()>,
}

impl ActiveWorklet {
    async fn shutdown(self) -> Option<WorkletExit> {
        let exit = self.worklet.terminate().await;
        self.dispatch.abort();
        exit
    }
}

/// The host a worklet script is attached to
pub struct SceneHost {
    config: HostConfig,
    manager: WorkletManager,
    events: broadcast::Sender<BridgeEvent>,
    scene: SharedScene,
    generation: AtomicU64,
    active: Mutex<Option<ActiveWorklet>>,
}

impl std::fmt::Debug for SceneHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneHost")
            .field("config", &self.config)
            .field("generation", &self.generation())
            .finish_non_exhaustive()
    }
}

impl SceneHost {
    #[must_use]
    pub fn new(config: HostConfig, fetcher: impl ScriptFetcher + 'static) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let manager = WorkletManager::new(config.worklet.clone(), fetcher, events.clone());
        Self {
            config,
            manager,
            events,
            scene: Arc::new(RwLock::new(None)),
            generation: AtomicU64::new(0),
            active: Mutex::new(None),
        }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Receive host events from now on
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.events.subscribe()
    }

    /// Generation of the loaded model (`Generation(0)` before the first load)
    #[must_use]
    pub fn generation(&self) -> Generation {
        Generation(self.generation.load(Ordering::SeqCst))
    }

    /// Identity of the active worklet, if any
    pub async fn active_worklet(&self) -> Option<WorkletId> {
        self.active.lock().await.as_ref().map(|a| a.worklet.id())
    }

    /// Read the live model
    pub fn with_model<R>(&self, f: impl FnOnce(&ModelGraph) -> R) -> Option<R> {
        self.scene.read().as_ref().map(f)
    }

    /// Attach a script element
    ///
    /// Elements whose `type` is not the worklet marker are ignored and yield
    /// `Ok(None)`. If a model is already loaded the new worklet receives a
    /// model-change event for it straight away.
    ///
    /// # Errors
    /// - `HostError::Capability` if the `allow` attribute is rejected (strict parsing)
    /// - `HostError::WorkletAlreadyActive` under the `reject` replacement policy
    /// - `HostError::Worklet` if the worklet cannot be created; any active
    ///   worklet is left running
    pub async fn attach_script(
        &self,
        element: &ScriptElement,
    ) -> Result<Option<WorkletId>, HostError> {
        if !element.is_worklet() {
            tracing::debug!(script_type = %element.script_type, "ignoring non-worklet script");
            return Ok(None);
        }
        let capabilities = self.config.capability_parsing.parse(&element.allow)?;

        let mut active = self.active.lock().await;
        if let (Some(current), ReplacementPolicy::Reject) =
            (active.as_ref(), self.config.replacement)
        {
            let current = current.worklet.id();
            tracing::warn!(worklet = %current, "worklet already active; new script rejected");
            return Err(HostError::WorkletAlreadyActive(current));
        }

        // a failed create leaves the active worklet in place
        let (worklet, endpoint) = self.manager.create(element.source(), capabilities).await?;
        let (to_worklet, from_worklet) = endpoint.into_parts();
        let dispatcher = Dispatcher {
            worklet: worklet.id(),
            capabilities,
            live: worklet.live_flag(),
            scene: Arc::clone(&self.scene),
            to_worklet,
            from_worklet,
            events: self.events.clone(),
        };
        let dispatch = tokio::spawn(dispatcher.run());

        if let Some(previous) = active.take() {
            tracing::info!(
                worklet = %previous.worklet.id(),
                replacement = %worklet.id(),
                "replacing active worklet"
            );
            previous.shutdown().await;
        }

        let current = self.scene.read().as_ref().map(ModelGraph::summary);
        if let Some(summary) = current {
            tracing::debug!(worklet = %worklet.id(), generation = %summary.generation, "sending current model");
            worklet.notify(ToWorklet::ModelChange(summary));
        }

        let id = worklet.id();
        *active = Some(ActiveWorklet { worklet, dispatch });
        Ok(Some(id))
    }

    /// Install a fully built model and announce it
    ///
    /// The graph is validated and installed before `Load` is emitted and
    /// before the worklet hears about it, so listeners only ever see a model
    /// whose references all resolve.
    ///
    /// # Errors
    /// `HostError::Scene` if the model has dangling references; the previous
    /// model stays live.
    pub async fn load_model(
        &self,
        model: Model,
        url: Option<String>,
    ) -> Result<Generation, HostError> {
        let active = self.active.lock().await;
        let generation = self.generation().next();
        let graph = ModelGraph::new(generation, url.clone(), model)?;
        let summary = graph.summary();
        *self.scene.write() = Some(graph);
        self.generation.store(generation.0, Ordering::SeqCst);

        tracing::info!(%generation, url = url.as_deref().unwrap_or("-"), "model loaded");
        let _ = self.events.send(BridgeEvent::Load { generation, url });

        if let Some(active) = active.as_ref() {
            if !active.worklet.notify(ToWorklet::ModelChange(summary)) {
                tracing::debug!(worklet = %active.worklet.id(), "worklet not live; model-change skipped");
            }
        }
        Ok(generation)
    }

    /// Parse a glTF JSON document and load it
    ///
    /// # Errors
    /// `HostError::Scene` if the document is malformed or has dangling references.
    pub async fn load_gltf(
        &self,
        document: &str,
        url: Option<String>,
    ) -> Result<Generation, HostError> {
        let model = Model::from_gltf_json(document)?;
        self.load_model(model, url).await
    }

    /// Tear down the active worklet, if any
    pub async fn terminate_worklet(&self) -> Option<WorkletExit> {
        let previous = self.active.lock().await.take()?;
        previous.shutdown().await
    }

    /// Terminate the worklet and stop accepting its traffic
    pub async fn shutdown(&self) {
        if let Some(exit) = self.terminate_worklet().await {
            tracing::info!(rejected = ?exit.rejected, "host shut down");
        }
    }

    /// Serialize the live model
    ///
    /// # Errors
    /// - `HostError::NoModel` before the first load
    /// - `HostError::Scene` if the exporter fails
    pub fn export_scene(&self, exporter: &dyn SceneExporter) -> Result<Vec<u8>, HostError> {
        let scene = self.scene.read();
        let graph = scene.as_ref().ok_or(HostError::NoModel)?;
        Ok(exporter.export(graph.model())?)
    }
}
