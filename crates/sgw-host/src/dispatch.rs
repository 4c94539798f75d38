//! Request dispatch
//!
//! The only code path that writes the live model on behalf of a worklet.

use parking_lot::RwLock;
use sgw_capability::{Capability, CapabilitySet};
use sgw_rpc::{FromWorklet, RpcFailure, RpcRequest, RpcResponse, ToWorklet};
use sgw_scene::ModelGraph;
use sgw_worklet::{BridgeEvent, WorkletId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

/// The live scene, shared between the host and dispatch tasks
pub(crate) type SharedScene = Arc<RwLock<Option<ModelGraph>>>;

/// Decide one request against a worklet's capabilities and the live graph
///
/// The capability check happens before the graph is touched, and
/// [`ModelGraph::apply`] validates fully before writing, so a failed request
/// never partially applies.
#[must_use]
pub fn dispatch_request(
    capabilities: CapabilitySet,
    graph: Option<&mut ModelGraph>,
    request: &RpcRequest,
) -> RpcResponse {
    let required = request.required_capability();
    if !capabilities.contains(required) {
        return RpcResponse::failed(
            request.id,
            RpcFailure::CapabilityDenied {
                capability: required,
            },
        );
    }
    let Some(graph) = graph else {
        return RpcResponse::failed(request.id, RpcFailure::invalid_target("no model loaded"));
    };
    match graph.apply(request.target, &request.mutation) {
        Ok(()) => RpcResponse::applied(request.id),
        Err(e) => RpcResponse::failed(request.id, RpcFailure::invalid_target(e)),
    }
}

/// Drains one worklet's outbound queue
pub(crate) struct Dispatcher {
    pub(crate) worklet: WorkletId,
    pub(crate) capabilities: CapabilitySet,
    pub(crate) live: Arc<AtomicBool>,
    pub(crate) scene: SharedScene,
    pub(crate) to_worklet: mpsc::UnboundedSender<ToWorklet>,
    pub(crate) from_worklet: mpsc::UnboundedReceiver<FromWorklet>,
    pub(crate) events: broadcast::Sender<BridgeEvent>,
}

impl Dispatcher {
    pub(crate) async fn run(mut self) {
        while let Some(message) = self.from_worklet.recv().await {
            self.handle(message);
        }
        tracing::debug!(worklet = %self.worklet, "dispatch loop finished");
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn emit(&self, event: BridgeEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    fn handle(&self, message: FromWorklet) {
        match message {
            FromWorklet::Request(request) => self.request(&request),
            FromWorklet::PostMessage(data) => {
                if !self.is_live() {
                    tracing::debug!(worklet = %self.worklet, "dropping message from terminated worklet");
                } else if !self.capabilities.contains(Capability::Messaging) {
                    tracing::warn!(worklet = %self.worklet, "message without messaging capability dropped");
                } else {
                    self.emit(BridgeEvent::Message {
                        worklet: self.worklet,
                        data,
                    });
                }
            }
            FromWorklet::ScriptError(message) => {
                if self.is_live() {
                    tracing::warn!(worklet = %self.worklet, %message, "worklet script error");
                    self.emit(BridgeEvent::ScriptError {
                        worklet: self.worklet,
                        message,
                    });
                }
            }
        }
    }

    fn request(&self, request: &RpcRequest) {
        if !self.is_live() {
            tracing::debug!(worklet = %self.worklet, request = %request.id, "dropping request from terminated worklet");
            return;
        }
        let response = {
            let mut scene = self.scene.write();
            dispatch_request(self.capabilities, scene.as_mut(), request)
        };
        match &response.result {
            Ok(()) => {
                tracing::debug!(
                    worklet = %self.worklet,
                    request = %request.id,
                    node = %request.target,
                    mutation = %request.mutation,
                    "mutation applied"
                );
                self.emit(BridgeEvent::SceneMutated {
                    worklet: self.worklet,
                    target: request.target,
                    mutation: request.mutation.clone(),
                });
            }
            Err(failure) => tracing::debug!(
                worklet = %self.worklet,
                request = %request.id,
                %failure,
                "mutation refused"
            ),
        }
        if self.to_worklet.send(ToWorklet::Response(response)).is_err() {
            tracing::debug!(worklet = %self.worklet, "worklet gone before response");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use sgw_rpc::RequestId;
    use sgw_scene::{Generation, Image, Material, Model, Mutation, NodeKind, NodeRef, Texture};

    fn graph() -> ModelGraph {
        let model = Model::new()
            .with_material(Material::new("m").with_base_color_factor([0.5, 0.5, 0.5, 1.0]))
            .with_texture(Texture::from_image(0))
            .with_image(Image::from_uri("a.png"));
        ModelGraph::new(Generation(3), None, model).unwrap()
    }

    fn request(kind: NodeKind, generation: u64, mutation: Mutation) -> RpcRequest {
        RpcRequest {
            id: RequestId(7),
            target: NodeRef::new(Generation(generation), kind, 0),
            mutation,
        }
    }

    #[test]
    fn denied_without_capability_and_untouched() {
        let mut graph = graph();
        let req = request(
            NodeKind::Material,
            3,
            Mutation::SetBaseColorFactor([1.0, 0.0, 0.0, 1.0]),
        );
        let response = dispatch_request(CapabilitySet::parse("textures"), Some(&mut graph), &req);
        assert_eq!(
            response.result,
            Err(RpcFailure::CapabilityDenied {
                capability: Capability::MaterialProperties
            })
        );
        assert_eq!(
            graph.material(0).unwrap().pbr_metallic_roughness.base_color_factor,
            [0.5, 0.5, 0.5, 1.0]
        );
    }

    #[test]
    fn applies_with_capability() {
        let mut graph = graph();
        let req = request(NodeKind::Image, 3, Mutation::SetImageUri("b.png".into()));
        let response = dispatch_request(CapabilitySet::parse("textures"), Some(&mut graph), &req);
        assert!(response.is_applied());
        assert_eq!(response.id, RequestId(7));
        assert_eq!(graph.image(0).unwrap().uri.as_deref(), Some("b.png"));
    }

    #[test]
    fn stale_and_missing_targets_are_invalid() {
        let mut graph = graph();
        let stale = request(NodeKind::Image, 2, Mutation::SetImageUri("b.png".into()));
        let response = dispatch_request(CapabilitySet::all(), Some(&mut graph), &stale);
        assert!(matches!(response.result, Err(RpcFailure::InvalidTarget { .. })));

        let response = dispatch_request(CapabilitySet::all(), None, &stale);
        assert!(matches!(response.result, Err(RpcFailure::InvalidTarget { .. })));
    }

    #[test]
    fn out_of_range_factor_is_invalid() {
        let mut graph = graph();
        let req = request(NodeKind::Material, 3, Mutation::SetMetallicFactor(2.0));
        let response = dispatch_request(CapabilitySet::all(), Some(&mut graph), &req);
        assert!(matches!(response.result, Err(RpcFailure::InvalidTarget { .. })));
        assert!((graph.material(0).unwrap().pbr_metallic_roughness.metallic_factor - 1.0).abs() < f64::EPSILON);
    }

    fn without_material_properties() -> impl Strategy<Value = CapabilitySet> {
        prop::sample::subsequence(vec![Capability::Textures, Capability::Messaging], 0..=2)
            .prop_map(CapabilitySet::from)
    }

    fn material_mutation() -> impl Strategy<Value = Mutation> {
        let unit = 0.0..=1.0f64;
        prop_oneof![
            prop::array::uniform4(unit.clone()).prop_map(Mutation::SetBaseColorFactor),
            unit.clone().prop_map(Mutation::SetMetallicFactor),
            unit.prop_map(Mutation::SetRoughnessFactor),
        ]
    }

    proptest! {
        #[test]
        fn material_writes_need_material_properties(
            caps in without_material_properties(),
            mutation in material_mutation(),
        ) {
            let mut graph = graph();
            let before = graph.model().clone();
            let req = request(NodeKind::Material, 3, mutation);

            let response = dispatch_request(caps, Some(&mut graph), &req);
            prop_assert_eq!(
                response.result,
                Err(RpcFailure::CapabilityDenied {
                    capability: Capability::MaterialProperties
                })
            );
            prop_assert_eq!(graph.model(), &before);
        }
    }
}
