//! glTF-shaped material graph
//!
//! Field names follow glTF 2.0 so a model can be read from, and written back
//! to, the `materials`/`textures`/`images` arrays of a glTF JSON document.

use crate::error::SceneError;
use crate::graph::NodeKind;
use serde::{Deserialize, Serialize};

/// Material graph of a loaded model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub materials: Vec<Material>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub textures: Vec<Texture>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<Image>,
}

impl Model {
    /// Empty model
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the material subset of a glTF JSON document
    ///
    /// Unrelated glTF sections (meshes, nodes, buffers...) are ignored.
    ///
    /// # Errors
    /// - `SceneError::Parse` if the document is not valid glTF JSON
    /// - `SceneError::DanglingReference` if a texture or image index is out of range
    pub fn from_gltf_json(document: &str) -> Result<Self, SceneError> {
        let model: Model = serde_json::from_str(document)?;
        model.validate_references()?;
        tracing::debug!(
            materials = model.materials.len(),
            textures = model.textures.len(),
            images = model.images.len(),
            "parsed glTF material graph"
        );
        Ok(model)
    }

    /// Add a material (builder style)
    #[must_use]
    pub fn with_material(mut self, material: Material) -> Self {
        self.materials.push(material);
        self
    }

    /// Add a texture (builder style)
    #[must_use]
    pub fn with_texture(mut self, texture: Texture) -> Self {
        self.textures.push(texture);
        self
    }

    /// Add an image (builder style)
    #[must_use]
    pub fn with_image(mut self, image: Image) -> Self {
        self.images.push(image);
        self
    }

    /// Ensure every texture/image index resolves
    ///
    /// # Errors
    /// - `SceneError::DanglingReference` naming the first unresolved index
    pub fn validate_references(&self) -> Result<(), SceneError> {
        for (i, material) in self.materials.iter().enumerate() {
            let pbr = &material.pbr_metallic_roughness;
            for info in [&pbr.base_color_texture, &pbr.metallic_roughness_texture]
                .into_iter()
                .flatten()
            {
                if info.index >= self.textures.len() {
                    return Err(SceneError::DanglingReference {
                        from: format!("material {i}"),
                        kind: NodeKind::Texture,
                        index: info.index,
                    });
                }
            }
        }
        for (i, texture) in self.textures.iter().enumerate() {
            if let Some(source) = texture.source {
                if source >= self.images.len() {
                    return Err(SceneError::DanglingReference {
                        from: format!("texture {i}"),
                        kind: NodeKind::Image,
                        index: source,
                    });
                }
            }
        }
        Ok(())
    }
}

/// A glTF material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub pbr_metallic_roughness: PbrMetallicRoughness,
    #[serde(default = "default_emissive")]
    pub emissive_factor: [f64; 3],
}

impl Material {
    /// Material with default PBR values
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            pbr_metallic_roughness: PbrMetallicRoughness::default(),
            emissive_factor: default_emissive(),
        }
    }

    /// Set base color factor (builder style)
    #[must_use]
    pub fn with_base_color_factor(mut self, factor: [f64; 4]) -> Self {
        self.pbr_metallic_roughness.base_color_factor = factor;
        self
    }

    /// Set base color texture (builder style)
    #[must_use]
    pub fn with_base_color_texture(mut self, texture: usize) -> Self {
        self.pbr_metallic_roughness.base_color_texture = Some(TextureInfo::new(texture));
        self
    }
}

/// Metallic-roughness block of a material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PbrMetallicRoughness {
    #[serde(default = "default_base_color")]
    pub base_color_factor: [f64; 4],
    #[serde(default = "one")]
    pub metallic_factor: f64,
    #[serde(default = "one")]
    pub roughness_factor: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_color_texture: Option<TextureInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metallic_roughness_texture: Option<TextureInfo>,
}

impl Default for PbrMetallicRoughness {
    fn default() -> Self {
        Self {
            base_color_factor: default_base_color(),
            metallic_factor: 1.0,
            roughness_factor: 1.0,
            base_color_texture: None,
            metallic_roughness_texture: None,
        }
    }
}

/// Reference from a material slot to a texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextureInfo {
    pub index: usize,
    #[serde(default)]
    pub tex_coord: u32,
}

impl TextureInfo {
    #[inline]
    #[must_use]
    pub fn new(index: usize) -> Self {
        Self {
            index,
            tex_coord: 0,
        }
    }
}

/// A glTF texture
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Texture {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampler: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<usize>,
}

impl Texture {
    /// Texture sampling the given image
    #[must_use]
    pub fn from_image(source: usize) -> Self {
        Self {
            name: None,
            sampler: None,
            source: Some(source),
        }
    }
}

/// A glTF image
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl Image {
    /// Image loaded from a URI
    #[must_use]
    pub fn from_uri(uri: impl Into<String>) -> Self {
        Self {
            name: None,
            uri: Some(uri.into()),
            mime_type: None,
        }
    }
}

fn default_base_color() -> [f64; 4] {
    [1.0, 1.0, 1.0, 1.0]
}

fn default_emissive() -> [f64; 3] {
    [0.0, 0.0, 0.0]
}

fn one() -> f64 {
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DOCUMENT: &str = r#"{
        "asset": { "version": "2.0" },
        "meshes": [ { "primitives": [] } ],
        "materials": [
            { "name": "grey", "pbrMetallicRoughness": { "baseColorFactor": [0.5, 0.5, 0.5, 1.0] } },
            { "pbrMetallicRoughness": { "baseColorTexture": { "index": 0 } } }
        ],
        "textures": [ { "source": 0, "sampler": 0 } ],
        "images": [ { "uri": "albedo.png", "mimeType": "image/png" } ]
    }"#;

    #[test]
    fn loads_material_subset() {
        let model = Model::from_gltf_json(DOCUMENT).unwrap();
        assert_eq!(model.materials.len(), 2);
        assert_eq!(
            model.materials[0].pbr_metallic_roughness.base_color_factor,
            [0.5, 0.5, 0.5, 1.0]
        );
        assert_eq!(model.materials[0].name.as_deref(), Some("grey"));
        assert_eq!(
            model.materials[1].pbr_metallic_roughness.base_color_texture,
            Some(TextureInfo::new(0))
        );
        assert_eq!(model.images[0].uri.as_deref(), Some("albedo.png"));
    }

    #[test]
    fn applies_gltf_defaults() {
        let model = Model::from_gltf_json(r#"{ "materials": [ {} ] }"#).unwrap();
        let pbr = &model.materials[0].pbr_metallic_roughness;
        assert_eq!(pbr.base_color_factor, [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(pbr.metallic_factor, 1.0);
        assert_eq!(pbr.roughness_factor, 1.0);
        assert_eq!(model.materials[0].emissive_factor, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn rejects_dangling_texture() {
        let err = Model::from_gltf_json(
            r#"{ "materials": [ { "pbrMetallicRoughness": { "baseColorTexture": { "index": 3 } } } ] }"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SceneError::DanglingReference { kind: NodeKind::Texture, index: 3, .. }
        ));
    }

    #[test]
    fn rejects_dangling_image() {
        let err = Model::from_gltf_json(r#"{ "textures": [ { "source": 1 } ], "images": [ {} ] }"#)
            .unwrap_err();
        assert!(matches!(
            err,
            SceneError::DanglingReference { kind: NodeKind::Image, index: 1, .. }
        ));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            Model::from_gltf_json("{ materials: ").unwrap_err(),
            SceneError::Parse(_)
        ));
    }
}
