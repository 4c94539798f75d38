//! Proxy objects exposed to worklet scripts
//!
//! Reads are served from a per-event mirror of the model. Writes become RPC
//! requests stamped with the mirror's generation, so a proxy kept across a
//! model swap addresses a node the host no longer has.

use super::pending::Pending;
use super::Shared;
use rhai::{Array, Dynamic, ImmutableString, FLOAT, INT};
use sgw_rpc::RpcFailure;
use sgw_scene::{
    Image, Material, ModelGraph, Mutation, NodeKind, NodeRef, PbrMetallicRoughness, Texture,
    TextureInfo,
};
use std::cell::RefCell;
use std::rc::Rc;

/// Sandbox-local copy of one model generation
pub(crate) struct Mirror {
    pub(crate) graph: RefCell<ModelGraph>,
}

/// Shared plumbing behind every node proxy
#[derive(Clone)]
struct Handle {
    shared: Rc<Shared>,
    mirror: Rc<Mirror>,
    index: u32,
}

impl Handle {
    fn at(&self, index: usize) -> Option<Self> {
        Some(Self {
            shared: Rc::clone(&self.shared),
            mirror: Rc::clone(&self.mirror),
            index: u32::try_from(index).ok()?,
        })
    }

    fn slot(&self) -> usize {
        self.index as usize
    }

    fn index(&self) -> INT {
        INT::from(self.index)
    }

    fn issue(&self, kind: NodeKind, mutation: Mutation) -> Pending {
        let target = NodeRef::new(self.mirror.graph.borrow().generation(), kind, self.index);
        Pending::issue(&self.shared, &self.mirror, target, mutation)
    }

    fn reject(&self, reason: &str) -> Pending {
        Pending::rejected(&self.shared, &RpcFailure::invalid_target(reason))
    }
}

fn text(value: Option<&String>) -> Dynamic {
    value.map_or(Dynamic::UNIT, |s| Dynamic::from(s.clone()))
}

fn floats(values: &[f64]) -> Array {
    values.iter().copied().map(Dynamic::from_float).collect()
}

#[allow(clippy::cast_precision_loss)]
fn number(value: &Dynamic) -> Option<f64> {
    value
        .as_float()
        .ok()
        .or_else(|| value.as_int().ok().map(|i| i as FLOAT))
}

fn rgba(values: &Array) -> Option<[f64; 4]> {
    if values.len() != 4 {
        return None;
    }
    let mut out = [0.0; 4];
    for (slot, value) in out.iter_mut().zip(values) {
        *slot = number(value)?;
    }
    Some(out)
}

/// Argument of `model-change` listeners
#[derive(Clone)]
pub(crate) struct ModelChangeEvent {
    model: ModelProxy,
}

impl ModelChangeEvent {
    pub(crate) fn new(shared: &Rc<Shared>, graph: ModelGraph) -> Self {
        Self {
            model: ModelProxy {
                shared: Rc::clone(shared),
                mirror: Rc::new(Mirror {
                    graph: RefCell::new(graph),
                }),
            },
        }
    }

    pub(crate) fn model(&mut self) -> ModelProxy {
        self.model.clone()
    }

    pub(crate) fn generation(&mut self) -> INT {
        self.model.generation()
    }
}

/// Root of the proxy graph
#[derive(Clone)]
pub(crate) struct ModelProxy {
    shared: Rc<Shared>,
    mirror: Rc<Mirror>,
}

impl ModelProxy {
    fn root(&self) -> Handle {
        Handle {
            shared: Rc::clone(&self.shared),
            mirror: Rc::clone(&self.mirror),
            index: 0,
        }
    }

    fn nodes<T: Clone + 'static>(&self, count: usize, wrap: impl Fn(Handle) -> T) -> Array {
        let root = self.root();
        (0..count)
            .filter_map(|i| root.at(i))
            .map(|handle| Dynamic::from(wrap(handle)))
            .collect()
    }

    pub(crate) fn materials(&mut self) -> Array {
        let count = self.mirror.graph.borrow().model().materials.len();
        self.nodes(count, MaterialProxy)
    }

    pub(crate) fn textures(&mut self) -> Array {
        let count = self.mirror.graph.borrow().model().textures.len();
        self.nodes(count, TextureProxy)
    }

    pub(crate) fn images(&mut self) -> Array {
        let count = self.mirror.graph.borrow().model().images.len();
        self.nodes(count, ImageProxy)
    }

    pub(crate) fn generation(&mut self) -> INT {
        let generation = self.mirror.graph.borrow().generation().0;
        INT::try_from(generation).unwrap_or(INT::MAX)
    }

    pub(crate) fn url(&mut self) -> Dynamic {
        self.mirror
            .graph
            .borrow()
            .url()
            .map_or(Dynamic::UNIT, |url| Dynamic::from(url.to_string()))
    }
}

#[derive(Clone)]
pub(crate) struct MaterialProxy(Handle);

impl MaterialProxy {
    fn read<R>(&self, f: impl FnOnce(&Material) -> R) -> Option<R> {
        self.0.mirror.graph.borrow().material(self.0.slot()).map(f)
    }

    pub(crate) fn name(&mut self) -> Dynamic {
        self.read(|m| text(m.name.as_ref())).unwrap_or(Dynamic::UNIT)
    }

    pub(crate) fn index(&mut self) -> INT {
        self.0.index()
    }

    pub(crate) fn pbr_metallic_roughness(&mut self) -> PbrProxy {
        PbrProxy(self.0.clone())
    }

    pub(crate) fn emissive_factor(&mut self) -> Array {
        self.read(|m| floats(&m.emissive_factor)).unwrap_or_default()
    }
}

/// Metallic-roughness block of the material at the handle's index
#[derive(Clone)]
pub(crate) struct PbrProxy(Handle);

impl PbrProxy {
    fn read<R>(&self, f: impl FnOnce(&PbrMetallicRoughness) -> R) -> Option<R> {
        self.0
            .mirror
            .graph
            .borrow()
            .material(self.0.slot())
            .map(|m| f(&m.pbr_metallic_roughness))
    }

    fn texture_info(&self, info: Option<TextureInfo>) -> Dynamic {
        info.and_then(|info| {
            let handle = self.0.at(info.index)?;
            Some(Dynamic::from(TextureInfoProxy {
                handle,
                tex_coord: info.tex_coord,
            }))
        })
        .unwrap_or(Dynamic::UNIT)
    }

    pub(crate) fn base_color_factor(&mut self) -> Array {
        self.read(|p| floats(&p.base_color_factor)).unwrap_or_default()
    }

    pub(crate) fn metallic_factor(&mut self) -> Dynamic {
        self.read(|p| p.metallic_factor)
            .map_or(Dynamic::UNIT, Dynamic::from_float)
    }

    pub(crate) fn roughness_factor(&mut self) -> Dynamic {
        self.read(|p| p.roughness_factor)
            .map_or(Dynamic::UNIT, Dynamic::from_float)
    }

    pub(crate) fn base_color_texture(&mut self) -> Dynamic {
        let info = self.read(|p| p.base_color_texture).flatten();
        self.texture_info(info)
    }

    pub(crate) fn metallic_roughness_texture(&mut self) -> Dynamic {
        let info = self.read(|p| p.metallic_roughness_texture).flatten();
        self.texture_info(info)
    }

    pub(crate) fn set_base_color_factor(&mut self, values: Array) -> Pending {
        match rgba(&values) {
            Some(rgba) => self
                .0
                .issue(NodeKind::Material, Mutation::SetBaseColorFactor(rgba)),
            None => self
                .0
                .reject("set_base_color_factor expects an array of four numbers"),
        }
    }

    pub(crate) fn set_metallic_factor(&mut self, value: Dynamic) -> Pending {
        match number(&value) {
            Some(v) => self
                .0
                .issue(NodeKind::Material, Mutation::SetMetallicFactor(v)),
            None => self.0.reject("set_metallic_factor expects a number"),
        }
    }

    pub(crate) fn set_roughness_factor(&mut self, value: Dynamic) -> Pending {
        match number(&value) {
            Some(v) => self
                .0
                .issue(NodeKind::Material, Mutation::SetRoughnessFactor(v)),
            None => self.0.reject("set_roughness_factor expects a number"),
        }
    }
}

/// Texture slot of a material
#[derive(Clone)]
pub(crate) struct TextureInfoProxy {
    handle: Handle,
    tex_coord: u32,
}

impl TextureInfoProxy {
    pub(crate) fn texture(&mut self) -> Dynamic {
        let exists = self
            .handle
            .mirror
            .graph
            .borrow()
            .texture(self.handle.slot())
            .is_some();
        if exists {
            Dynamic::from(TextureProxy(self.handle.clone()))
        } else {
            Dynamic::UNIT
        }
    }

    pub(crate) fn index(&mut self) -> INT {
        self.handle.index()
    }

    pub(crate) fn tex_coord(&mut self) -> INT {
        INT::from(self.tex_coord)
    }
}

#[derive(Clone)]
pub(crate) struct TextureProxy(Handle);

impl TextureProxy {
    fn read<R>(&self, f: impl FnOnce(&Texture) -> R) -> Option<R> {
        self.0.mirror.graph.borrow().texture(self.0.slot()).map(f)
    }

    pub(crate) fn name(&mut self) -> Dynamic {
        self.read(|t| text(t.name.as_ref())).unwrap_or(Dynamic::UNIT)
    }

    pub(crate) fn index(&mut self) -> INT {
        self.0.index()
    }

    pub(crate) fn source(&mut self) -> Dynamic {
        let source = self.read(|t| t.source).flatten();
        let Some(handle) = source.and_then(|index| self.0.at(index)) else {
            return Dynamic::UNIT;
        };
        let exists = handle.mirror.graph.borrow().image(handle.slot()).is_some();
        if exists {
            Dynamic::from(ImageProxy(handle))
        } else {
            Dynamic::UNIT
        }
    }
}

#[derive(Clone)]
pub(crate) struct ImageProxy(Handle);

impl ImageProxy {
    fn read<R>(&self, f: impl FnOnce(&Image) -> R) -> Option<R> {
        self.0.mirror.graph.borrow().image(self.0.slot()).map(f)
    }

    pub(crate) fn name(&mut self) -> Dynamic {
        self.read(|i| text(i.name.as_ref())).unwrap_or(Dynamic::UNIT)
    }

    pub(crate) fn uri(&mut self) -> Dynamic {
        self.read(|i| text(i.uri.as_ref())).unwrap_or(Dynamic::UNIT)
    }

    pub(crate) fn mime_type(&mut self) -> Dynamic {
        self.read(|i| text(i.mime_type.as_ref()))
            .unwrap_or(Dynamic::UNIT)
    }

    pub(crate) fn index(&mut self) -> INT {
        self.0.index()
    }

    pub(crate) fn set_uri(&mut self, uri: ImmutableString) -> Pending {
        self.0
            .issue(NodeKind::Image, Mutation::SetImageUri(uri.to_string()))
    }
}
