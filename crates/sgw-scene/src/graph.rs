//! Generation-stamped model graph and proxy node addressing

use crate::error::SceneError;
use crate::model::{Image, Material, Model, Texture};
use crate::mutation::Mutation;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Load counter; every completed model load gets a new generation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Generation(pub u64);

impl Generation {
    /// Following generation
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of proxy node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Material,
    Texture,
    Image,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NodeKind::Material => "material",
            NodeKind::Texture => "texture",
            NodeKind::Image => "image",
        })
    }
}

/// Address of a proxy node
///
/// Carries the generation it was resolved against so a reference taken
/// before a model swap can never reach into the replacement model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeRef {
    pub generation: Generation,
    pub kind: NodeKind,
    pub index: u32,
}

impl NodeRef {
    #[inline]
    #[must_use]
    pub const fn new(generation: Generation, kind: NodeKind, index: u32) -> Self {
        Self {
            generation,
            kind,
            index,
        }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}@{}", self.kind, self.index, self.generation)
    }
}

/// Model-change payload: everything the sandbox needs to rebuild its proxies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub generation: Generation,
    pub url: Option<String>,
    pub model: Model,
}

/// A fully loaded model owned by one generation
#[derive(Debug, Clone, PartialEq)]
pub struct ModelGraph {
    generation: Generation,
    url: Option<String>,
    model: Model,
}

impl ModelGraph {
    /// Stamp a loaded model with its generation
    ///
    /// # Errors
    /// - `SceneError::DanglingReference` if the model is not fully resolvable
    pub fn new(generation: Generation, url: Option<String>, model: Model) -> Result<Self, SceneError> {
        model.validate_references()?;
        Ok(Self {
            generation,
            url,
            model,
        })
    }

    /// Rebuild a graph from a model-change payload
    #[must_use]
    pub fn from_summary(summary: ModelSummary) -> Self {
        Self {
            generation: summary.generation,
            url: summary.url,
            model: summary.model,
        }
    }

    /// Model-change payload for this graph
    #[must_use]
    pub fn summary(&self) -> ModelSummary {
        ModelSummary {
            generation: self.generation,
            url: self.url.clone(),
            model: self.model.clone(),
        }
    }

    #[inline]
    #[must_use]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    #[inline]
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Resolve a node in this generation, if it exists
    #[must_use]
    pub fn node(&self, kind: NodeKind, index: usize) -> Option<NodeRef> {
        let len = match kind {
            NodeKind::Material => self.model.materials.len(),
            NodeKind::Texture => self.model.textures.len(),
            NodeKind::Image => self.model.images.len(),
        };
        let index = u32::try_from(index).ok()?;
        ((index as usize) < len).then_some(NodeRef::new(self.generation, kind, index))
    }

    pub fn material(&self, index: usize) -> Option<&Material> {
        self.model.materials.get(index)
    }

    pub fn texture(&self, index: usize) -> Option<&Texture> {
        self.model.textures.get(index)
    }

    pub fn image(&self, index: usize) -> Option<&Image> {
        self.model.images.get(index)
    }

    /// Apply a mutation to the node at `target`
    ///
    /// Addressing and arguments are checked before anything is written, so a
    /// failed call leaves the model untouched.
    ///
    /// # Errors
    /// - `SceneError::StaleGeneration` if `target` predates this generation
    /// - `SceneError::KindMismatch` if the mutation does not apply to `target.kind`
    /// - `SceneError::NodeNotFound` if the index is out of range
    /// - `SceneError::InvalidArgument` if the mutation's value is rejected
    pub fn apply(&mut self, target: NodeRef, mutation: &Mutation) -> Result<(), SceneError> {
        if target.generation != self.generation {
            return Err(SceneError::StaleGeneration {
                current: self.generation,
                found: target.generation,
            });
        }
        let expected = mutation.target_kind();
        if target.kind != expected {
            return Err(SceneError::KindMismatch {
                mutation: mutation.name(),
                expected,
                found: target.kind,
            });
        }
        mutation.validate()?;

        let not_found = || SceneError::NodeNotFound {
            kind: target.kind,
            index: target.index,
        };
        let index = target.index as usize;
        match mutation {
            Mutation::SetBaseColorFactor(rgba) => {
                let material = self.model.materials.get_mut(index).ok_or_else(not_found)?;
                material.pbr_metallic_roughness.base_color_factor = *rgba;
            }
            Mutation::SetMetallicFactor(value) => {
                let material = self.model.materials.get_mut(index).ok_or_else(not_found)?;
                material.pbr_metallic_roughness.metallic_factor = *value;
            }
            Mutation::SetRoughnessFactor(value) => {
                let material = self.model.materials.get_mut(index).ok_or_else(not_found)?;
                material.pbr_metallic_roughness.roughness_factor = *value;
            }
            Mutation::SetImageUri(uri) => {
                let image = self.model.images.get_mut(index).ok_or_else(not_found)?;
                image.uri = Some(uri.clone());
            }
        }
        tracing::trace!(%target, op = mutation.name(), "mutation applied");
        Ok(())
    }
}
