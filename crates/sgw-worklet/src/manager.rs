//! Worklet creation
//!
//! Each worklet gets a dedicated OS thread that owns its rhai engine. The
//! manager resolves the script source, starts the thread, and waits for the
//! top level to finish before reporting the worklet as created.

use crate::config::WorkletConfig;
use crate::error::WorkletError;
use crate::events::{BridgeEvent, WorkletId};
use crate::fetch::ScriptFetcher;
use crate::sandbox::{Flow, SandboxRuntime};
use crate::script::ScriptSource;
use crate::worklet::{Worklet, WorkletExit};
use sgw_capability::CapabilitySet;
use sgw_rpc::{HostEndpoint, WorkletEndpoint};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::{broadcast, oneshot};

/// Creates worklets sharing one configuration and fetcher
#[derive(Debug, Clone)]
pub struct WorkletManager {
    config: WorkletConfig,
    fetcher: Arc<dyn ScriptFetcher>,
    events: broadcast::Sender<BridgeEvent>,
}

impl WorkletManager {
    #[must_use]
    pub fn new(
        config: WorkletConfig,
        fetcher: impl ScriptFetcher + 'static,
        events: broadcast::Sender<BridgeEvent>,
    ) -> Self {
        Self::with_shared_fetcher(config, Arc::new(fetcher), events)
    }

    #[must_use]
    pub fn with_shared_fetcher(
        config: WorkletConfig,
        fetcher: Arc<dyn ScriptFetcher>,
        events: broadcast::Sender<BridgeEvent>,
    ) -> Self {
        Self {
            config,
            fetcher,
            events,
        }
    }

    /// Start a worklet running `source` with `capabilities`
    ///
    /// Emits `WorkletCreated` exactly once, after the script's top level has
    /// run. The returned endpoint carries the worklet's requests and
    /// messages; the caller owns dispatching them.
    ///
    /// # Errors
    /// - `WorkletError::ScriptLoad` if an external script cannot be fetched
    /// - `WorkletError::Script` if the script fails to compile or run its top level
    /// - `WorkletError::Spawn` / `WorkletError::Bootstrap` if the thread fails
    pub async fn create(
        &self,
        source: ScriptSource,
        capabilities: CapabilitySet,
    ) -> Result<(Worklet, HostEndpoint), WorkletError> {
        let code = match source {
            ScriptSource::Inline(code) => code,
            ScriptSource::Url(url) => match self.fetcher.fetch(&url).await {
                Ok(code) => code,
                Err(source) => {
                    tracing::warn!(%url, error = %source, "worklet script load failed");
                    return Err(WorkletError::ScriptLoad { url, source });
                }
            },
        };

        let id = WorkletId::new();
        let (host, endpoint) = sgw_rpc::channel();
        let abort = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = oneshot::channel();
        let (exit_tx, exit_rx) = oneshot::channel();

        let mut builder = std::thread::Builder::new().name(format!("worklet-{}", id.short()));
        if let Some(size) = self.config.thread_stack_size {
            builder = builder.stack_size(size);
        }
        let thread = SandboxThread {
            id,
            code,
            capabilities,
            endpoint,
            config: self.config.clone(),
            abort: Arc::clone(&abort),
        };
        builder.spawn(move || thread.run(ready_tx, exit_tx))?;

        match ready_rx.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(worklet = %id, error = %e, "worklet bootstrap failed");
                return Err(e);
            }
            Err(_) => return Err(WorkletError::Bootstrap),
        }

        let worklet = Worklet::new(
            id,
            capabilities,
            host.sender(),
            abort,
            exit_rx,
            self.events.clone(),
            self.config.terminate_timeout(),
        );
        tracing::info!(worklet = %id, %capabilities, "worklet created");
        let _ = self.events.send(BridgeEvent::WorkletCreated { worklet: id });
        Ok((worklet, host))
    }
}

/// Everything moved onto the sandbox thread
struct SandboxThread {
    id: WorkletId,
    code: String,
    capabilities: CapabilitySet,
    endpoint: WorkletEndpoint,
    config: WorkletConfig,
    abort: Arc<AtomicBool>,
}

impl SandboxThread {
    fn run(
        mut self,
        ready: oneshot::Sender<Result<(), WorkletError>>,
        exit: oneshot::Sender<WorkletExit>,
    ) {
        let runtime = SandboxRuntime::new(
            self.id,
            &self.code,
            self.capabilities,
            self.endpoint.outbox(),
            &self.config,
            self.abort,
        );
        let mut runtime = match runtime {
            Ok(runtime) => runtime,
            Err(e) => {
                let _ = ready.send(Err(e));
                return;
            }
        };
        if ready.send(Ok(())).is_err() {
            // creator gave up waiting
            runtime.terminate();
            return;
        }

        while let Some(message) = self.endpoint.recv() {
            if runtime.handle(message) == Flow::Stop {
                break;
            }
        }
        let rejected = runtime.terminate();
        tracing::debug!(worklet = %self.id, rejected, "worklet thread exiting");
        let _ = exit.send(WorkletExit {
            rejected: Some(rejected),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::fetch::FileFetcher;
    use sgw_rpc::{FromWorklet, ToWorklet};
    use sgw_scene::{Generation, Material, Model, ModelSummary};
    use std::time::Duration;

    fn manager(dir: &std::path::Path) -> (WorkletManager, broadcast::Receiver<BridgeEvent>) {
        let (events, rx) = broadcast::channel(16);
        (
            WorkletManager::new(WorkletConfig::default(), FileFetcher::new(dir), events),
            rx,
        )
    }

    fn summary() -> ModelSummary {
        ModelSummary {
            generation: Generation(1),
            url: None,
            model: Model::new().with_material(Material::new("m")),
        }
    }

    #[tokio::test]
    async fn inline_worklet_emits_created_once() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, mut events) = manager(dir.path());
        let (worklet, _host) = manager
            .create(ScriptSource::Inline("let x = 1;".into()), CapabilitySet::empty())
            .await
            .unwrap();

        assert_eq!(
            events.recv().await.unwrap(),
            BridgeEvent::WorkletCreated {
                worklet: worklet.id()
            }
        );
        assert!(events.try_recv().is_err());
        assert!(worklet.is_live());
    }

    #[tokio::test]
    async fn external_worklet_is_fetched() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("w.rhai"),
            r#"add_event_listener("model-change", |e| post_message(e.generation));"#,
        )
        .unwrap();
        let (manager, _events) = manager(dir.path());
        let (worklet, mut host) = manager
            .create(
                ScriptSource::Url("w.rhai".into()),
                CapabilitySet::parse("messaging"),
            )
            .await
            .unwrap();

        assert!(worklet.notify(ToWorklet::ModelChange(summary())));
        let message = tokio::time::timeout(Duration::from_secs(5), host.recv())
            .await
            .unwrap();
        assert_eq!(message, Some(FromWorklet::PostMessage(serde_json::json!(1))));
    }

    #[tokio::test]
    async fn missing_script_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, mut events) = manager(dir.path());
        let err = manager
            .create(ScriptSource::Url("absent.rhai".into()), CapabilitySet::empty())
            .await
            .unwrap_err();

        assert!(err.is_script_load());
        assert!(matches!(
            err,
            WorkletError::ScriptLoad {
                source: FetchError::Io { .. },
                ..
            }
        ));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn failing_top_level_is_not_created() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, mut events) = manager(dir.path());
        let err = manager
            .create(
                ScriptSource::Inline(r#"throw "boom";"#.into()),
                CapabilitySet::empty(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, WorkletError::Script(_)));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn terminate_is_idempotent_and_reports() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, mut events) = manager(dir.path());
        let (worklet, _host) = manager
            .create(ScriptSource::Inline(String::new()), CapabilitySet::empty())
            .await
            .unwrap();
        let _ = events.recv().await;

        assert_eq!(worklet.terminate().await, Some(WorkletExit { rejected: Some(0) }));
        assert!(worklet.terminate().await.is_none());
        assert!(!worklet.is_live());
        assert!(!worklet.notify(ToWorklet::ModelChange(summary())));
        assert_eq!(
            events.recv().await.unwrap(),
            BridgeEvent::WorkletTerminated {
                worklet: worklet.id(),
                rejected: Some(0)
            }
        );
    }

    #[tokio::test]
    async fn terminate_interrupts_busy_scripts() {
        let dir = tempfile::tempdir().unwrap();
        let (events, _rx) = broadcast::channel(16);
        let config = WorkletConfig::default().with_max_operations(0);
        let manager = WorkletManager::new(config, FileFetcher::new(dir.path()), events);
        let (worklet, _host) = manager
            .create(
                ScriptSource::Inline(r#"add_event_listener("model-change", |e| { loop { } });"#.into()),
                CapabilitySet::empty(),
            )
            .await
            .unwrap();

        worklet.notify(ToWorklet::ModelChange(summary()));
        tokio::time::sleep(Duration::from_millis(20)).await;
        let exit = worklet.terminate().await;
        assert_eq!(exit, Some(WorkletExit { rejected: Some(0) }));
    }
}
