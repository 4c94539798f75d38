//! Export collaborator
//!
//! Serializes the current material graph after worklet mutations. Only the
//! glTF JSON form is produced here; binary containers belong to the
//! rendering side.

use crate::error::SceneError;
use crate::model::Model;

/// Produces a serialized scene from a loaded model
pub trait SceneExporter: Send + Sync {
    /// MIME type of the produced document
    fn mime_type(&self) -> &'static str;

    /// Serialize `model`
    ///
    /// # Errors
    /// - `SceneError::Export` if serialization fails
    fn export(&self, model: &Model) -> Result<Vec<u8>, SceneError>;
}

/// glTF 2.0 JSON exporter for the material subset
#[derive(Debug, Clone, Copy, Default)]
pub struct GltfJsonExporter {
    pretty: bool,
}

impl GltfJsonExporter {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit indented JSON
    #[inline]
    #[must_use]
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }
}

impl SceneExporter for GltfJsonExporter {
    fn mime_type(&self) -> &'static str {
        "model/gltf+json"
    }

    fn export(&self, model: &Model) -> Result<Vec<u8>, SceneError> {
        let mut document =
            serde_json::to_value(model).map_err(|e| SceneError::Export(e.to_string()))?;
        if let Some(object) = document.as_object_mut() {
            object.insert(
                "asset".to_string(),
                serde_json::json!({ "version": "2.0", "generator": concat!("sgw-scene ", env!("CARGO_PKG_VERSION")) }),
            );
        }
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(&document)
        } else {
            serde_json::to_vec(&document)
        };
        bytes.map_err(|e| SceneError::Export(e.to_string()))
    }
}
