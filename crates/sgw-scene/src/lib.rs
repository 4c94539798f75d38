//! SGW Scene - the material graph a worklet can see and change
//!
//! Provides:
//! - [`Model`]: the glTF-shaped material/texture/image graph of a loaded model
//! - [`ModelGraph`]: a model stamped with its load [`Generation`], the unit
//!   of ownership for the host
//! - [`NodeRef`]: stable addressing of proxy nodes across the sandbox boundary
//! - [`Mutation`]: the closed set of writes a worklet may request
//! - [`SceneExporter`]: the export collaborator
//!
//! Rendering, geometry and binary glTF are not modelled here; only the
//! material subset that worklets operate on.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod error;
pub mod export;
pub mod graph;
pub mod model;
pub mod mutation;

pub use error::SceneError;
pub use export::{GltfJsonExporter, SceneExporter};
pub use graph::{Generation, ModelGraph, ModelSummary, NodeKind, NodeRef};
pub use model::{Image, Material, Model, PbrMetallicRoughness, Texture, TextureInfo};
pub use mutation::Mutation;
