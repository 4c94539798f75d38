//! Testing utilities for the SGW workspace
//!
//! Model fixtures, an in-memory script fetcher and event helpers.

#![allow(missing_docs)]

use async_trait::async_trait;
use sgw_scene::{Image, Material, Model, Texture};
use sgw_worklet::{BridgeEvent, FetchError, ScriptFetcher};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::broadcast;

/// How long helpers wait before giving up
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Single textured material with the given base color
pub fn tinted_model(name: &str, rgba: [f64; 4], image_uri: &str) -> Model {
    Model::new()
        .with_material(
            Material::new(name)
                .with_base_color_factor(rgba)
                .with_base_color_texture(0),
        )
        .with_texture(Texture::from_image(0))
        .with_image(Image::from_uri(image_uri))
}

/// Uniform grey `[0.5, 0.5, 0.5, 1]`
pub fn grey_model() -> Model {
    tinted_model("grey", [0.5, 0.5, 0.5, 1.0], "grey.png")
}

/// Uniform white `[1, 1, 1, 1]`
pub fn white_model() -> Model {
    tinted_model("white", [1.0, 1.0, 1.0, 1.0], "white.png")
}

/// glTF JSON for the grey model, as an external loader would deliver it
pub fn grey_gltf() -> String {
    r#"{
        "asset": { "version": "2.0" },
        "materials": [{
            "name": "grey",
            "pbrMetallicRoughness": {
                "baseColorFactor": [0.5, 0.5, 0.5, 1.0],
                "baseColorTexture": { "index": 0 }
            }
        }],
        "textures": [{ "source": 0 }],
        "images": [{ "uri": "grey.png" }]
    }"#
    .to_string()
}

/// Serves scripts from memory
#[derive(Debug, Clone, Default)]
pub struct MapFetcher {
    scripts: HashMap<String, String>,
}

impl MapFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_script(mut self, url: impl Into<String>, code: impl Into<String>) -> Self {
        self.scripts.insert(url.into(), code.into());
        self
    }
}

#[async_trait]
impl ScriptFetcher for MapFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.scripts
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(url.to_string()))
    }
}

/// Next event, or `None` on timeout or a closed channel
pub async fn next_event(events: &mut broadcast::Receiver<BridgeEvent>) -> Option<BridgeEvent> {
    next_matching(events, EVENT_TIMEOUT, |_| true).await
}

/// Next event accepted by `accept`, skipping the rest
pub async fn next_matching(
    events: &mut broadcast::Receiver<BridgeEvent>,
    timeout: Duration,
    accept: impl Fn(&BridgeEvent) -> bool,
) -> Option<BridgeEvent> {
    let wait = async {
        loop {
            match events.recv().await {
                Ok(event) if accept(&event) => return Some(event),
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    };
    tokio::time::timeout(timeout, wait).await.ok().flatten()
}

/// Payload of the next worklet message within `timeout`
pub async fn next_message(
    events: &mut broadcast::Receiver<BridgeEvent>,
    timeout: Duration,
) -> Option<serde_json::Value> {
    match next_matching(events, timeout, |e| matches!(e, BridgeEvent::Message { .. })).await {
        Some(BridgeEvent::Message { data, .. }) => Some(data),
        _ => None,
    }
}

/// Decode a message produced by `post_message(to_json(..))`
pub fn decode_json_message<T: serde::de::DeserializeOwned>(data: &serde_json::Value) -> Option<T> {
    serde_json::from_str(data.as_str()?).ok()
}
