//! SGW Host - owner of the live model and its worklet
//!
//! Provides:
//! - [`SceneHost`]: model loads, worklet attachment and teardown
//! - [`dispatch_request`]: the capability gate in front of every model write
//! - [`HostConfig`]: TOML-backed configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use sgw_host::{HostConfig, SceneHost};
//! use sgw_worklet::{FileFetcher, ScriptElement};
//!
//! # async fn example(model: sgw_scene::Model) -> Result<(), sgw_host::HostError> {
//! let host = SceneHost::new(HostConfig::default(), FileFetcher::new("."));
//! let mut events = host.subscribe();
//! host.attach_script(&ScriptElement::external("material-properties; messaging", "tint.rhai"))
//!     .await?;
//! host.load_model(model, Some("scene.gltf".into())).await?;
//! while let Ok(event) = events.recv().await {
//!     println!("{}", event.name());
//! }
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod dispatch;
pub mod error;
pub mod host;

pub use config::{CapabilityParsing, HostConfig, ReplacementPolicy};
pub use dispatch::dispatch_request;
pub use error::HostError;
pub use host::SceneHost;
