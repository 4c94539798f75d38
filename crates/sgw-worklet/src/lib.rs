//! SGW Worklet - sandboxed script contexts bound to a scene
//!
//! A worklet is a rhai script running on its own OS thread. It sees the
//! loaded model only through proxy objects rebuilt from each model-change
//! notification, and every write it makes travels to the host as an RPC
//! request that the host may deny.
//!
//! # Example
//!
//! ```rust,ignore
//! use sgw_worklet::{FileFetcher, ScriptSource, WorkletConfig, WorkletManager};
//! use sgw_capability::CapabilitySet;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (events, _) = tokio::sync::broadcast::channel(64);
//! let manager = WorkletManager::new(WorkletConfig::default(), FileFetcher::new("."), events);
//!
//! let source = ScriptSource::Inline(r#"add_event_listener("model-change", |e| print(e.model.generation));"#.into());
//! let (worklet, endpoint) = manager.create(source, CapabilitySet::parse("messaging")).await?;
//! // hand `endpoint` to a dispatch loop, then eventually:
//! worklet.terminate().await;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod error;
pub mod events;
pub mod fetch;
pub mod manager;
pub mod sandbox;
pub mod script;
pub mod worklet;

pub use config::WorkletConfig;
pub use error::{FetchError, WorkletError};
pub use events::{BridgeEvent, WorkletId};
pub use fetch::{FileFetcher, ScriptFetcher};
pub use manager::WorkletManager;
pub use sandbox::{Flow, SandboxRuntime};
pub use script::{ScriptElement, ScriptSource, WORKLET_SCRIPT_TYPE};
pub use worklet::{Worklet, WorkletExit};
