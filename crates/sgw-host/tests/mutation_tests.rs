//! Capability-gated mutations and model swaps end to end

use pretty_assertions::assert_eq;
use sgw_host::{HostConfig, HostError, SceneHost};
use sgw_scene::{Generation, GltfJsonExporter, Model, Mutation, NodeKind};
use sgw_test_utils::{
    decode_json_message, grey_gltf, grey_model, next_matching, next_message, white_model,
    MapFetcher,
};
use sgw_worklet::{BridgeEvent, ScriptElement};
use std::collections::HashSet;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);
const QUIET: Duration = Duration::from_millis(400);

async fn attached(allow: &str, script: &str) -> (SceneHost, tokio::sync::broadcast::Receiver<BridgeEvent>) {
    let host = SceneHost::new(HostConfig::default(), MapFetcher::new());
    let events = host.subscribe();
    host.attach_script(&ScriptElement::inline(allow, script))
        .await
        .unwrap()
        .unwrap();
    (host, events)
}

fn base_color(host: &SceneHost) -> [f64; 4] {
    host.with_model(|g| g.material(0).unwrap().pbr_metallic_roughness.base_color_factor)
        .unwrap()
}

#[tokio::test]
async fn model_swap_sends_one_fresh_notification() {
    let (host, mut events) = attached(
        "material-properties; messaging",
        r#"
            add_event_listener("model-change", |event| {
                let pbr = event.model.materials[0].pbr_metallic_roughness;
                post_message(to_json(pbr.base_color_factor));
            });
        "#,
    )
    .await;
    let worklet = host.active_worklet().await;

    host.load_model(grey_model(), Some("grey.gltf".into())).await.unwrap();
    let first: Vec<f64> = decode_json_message(&next_message(&mut events, WAIT).await.unwrap()).unwrap();
    assert_eq!(first, vec![0.5, 0.5, 0.5, 1.0]);

    host.load_model(white_model(), Some("white.gltf".into())).await.unwrap();
    let second: Vec<f64> = decode_json_message(&next_message(&mut events, WAIT).await.unwrap()).unwrap();
    assert_eq!(second, vec![1.0, 1.0, 1.0, 1.0]);

    assert!(next_message(&mut events, QUIET).await.is_none());
    assert_eq!(host.active_worklet().await, worklet);
    assert_eq!(host.generation(), Generation(2));
}

#[tokio::test]
async fn load_event_follows_installation() {
    let host = SceneHost::new(HostConfig::default(), MapFetcher::new());
    let mut events = host.subscribe();

    let generation = host
        .load_gltf(&grey_gltf(), Some("grey.gltf".into()))
        .await
        .unwrap();
    assert_eq!(
        next_matching(&mut events, WAIT, |_| true).await,
        Some(BridgeEvent::Load {
            generation,
            url: Some("grey.gltf".into())
        })
    );
    assert_eq!(base_color(&host), [0.5, 0.5, 0.5, 1.0]);
}

#[tokio::test]
async fn dangling_model_keeps_previous_one() {
    let host = SceneHost::new(HostConfig::default(), MapFetcher::new());
    host.load_model(grey_model(), None).await.unwrap();

    let mut broken = white_model();
    broken.textures[0].source = Some(9);
    let err = host.load_model(broken, None).await.unwrap_err();

    assert!(matches!(err, HostError::Scene(_)));
    assert_eq!(host.generation(), Generation(1));
    assert_eq!(base_color(&host), [0.5, 0.5, 0.5, 1.0]);
}

#[tokio::test]
async fn base_color_denied_without_material_properties() {
    let (host, mut events) = attached(
        "textures; messaging",
        r#"
            add_event_listener("model-change", |event| {
                event.model.materials[0].pbr_metallic_roughness
                    .set_base_color_factor([1, 0, 0, 1])
                    .then(|result| post_message("applied"), |err| post_message(err));
            });
        "#,
    )
    .await;

    host.load_model(grey_model(), None).await.unwrap();
    let message = next_message(&mut events, WAIT).await.unwrap();
    assert_eq!(
        message,
        serde_json::json!("capability denied: material-properties is required")
    );
    assert_eq!(base_color(&host), [0.5, 0.5, 0.5, 1.0]);
}

#[tokio::test]
async fn base_color_applies_with_material_properties() {
    let (host, mut events) = attached(
        "material-properties; messaging",
        r#"
            add_event_listener("model-change", |event| {
                let pbr = event.model.materials[0].pbr_metallic_roughness;
                pbr.set_base_color_factor([1, 0, 0, 1]).then(|result| {
                    post_message(to_json(pbr.base_color_factor));
                });
            });
        "#,
    )
    .await;

    host.load_model(grey_model(), None).await.unwrap();
    let mutated = next_matching(&mut events, WAIT, |e| {
        matches!(e, BridgeEvent::SceneMutated { .. })
    })
    .await;
    assert!(matches!(
        mutated,
        Some(BridgeEvent::SceneMutated {
            mutation: Mutation::SetBaseColorFactor(_),
            ..
        })
    ));

    let seen: Vec<f64> = decode_json_message(&next_message(&mut events, WAIT).await.unwrap()).unwrap();
    assert_eq!(seen, vec![1.0, 0.0, 0.0, 1.0]);
    assert_eq!(base_color(&host), [1.0, 0.0, 0.0, 1.0]);
}

#[tokio::test]
async fn texture_uri_resolves_with_textures() {
    let (host, mut events) = attached(
        "textures; messaging",
        r#"
            add_event_listener("model-change", |event| {
                let texture = event.model.materials[0].pbr_metallic_roughness.base_color_texture.texture;
                let image = texture.source;
                image.set_uri("swapped.png").then(|result| post_message(image.uri));
            });
        "#,
    )
    .await;

    host.load_model(grey_model(), None).await.unwrap();
    assert_eq!(
        next_message(&mut events, WAIT).await,
        Some(serde_json::json!("swapped.png"))
    );
    let uri = host.with_model(|g| g.image(0).unwrap().uri.clone()).unwrap();
    assert_eq!(uri.as_deref(), Some("swapped.png"));
}

#[tokio::test]
async fn texture_uri_without_textures_never_completes() {
    let (host, mut events) = attached(
        "material-properties; messaging",
        r#"
            add_event_listener("model-change", |event| {
                event.model.images[0].set_uri("swapped.png").then(|result| post_message("done"));
            });
        "#,
    )
    .await;

    host.load_model(grey_model(), None).await.unwrap();
    assert!(next_message(&mut events, QUIET).await.is_none());
    let uri = host.with_model(|g| g.image(0).unwrap().uri.clone()).unwrap();
    assert_eq!(uri.as_deref(), Some("grey.png"));

    // a denied call does not block later notifications
    host.load_model(white_model(), None).await.unwrap();
    assert!(next_matching(&mut events, WAIT, |e| matches!(e, BridgeEvent::Load { .. }))
        .await
        .is_some());
}

#[tokio::test]
async fn proxy_from_previous_model_is_stale() {
    let (host, mut events) = attached(
        "material-properties; messaging",
        r#"
            let kept = [];
            add_event_listener("model-change", |event| {
                if kept.is_empty() {
                    kept.push(event.model.materials[0].pbr_metallic_roughness);
                    post_message("kept");
                } else {
                    kept[0].set_roughness_factor(0.25).on_reject(|err| post_message(err));
                }
            });
        "#,
    )
    .await;

    host.load_model(grey_model(), None).await.unwrap();
    assert_eq!(next_message(&mut events, WAIT).await, Some(serde_json::json!("kept")));

    host.load_model(white_model(), None).await.unwrap();
    let message = next_message(&mut events, WAIT).await.unwrap();
    assert!(message.as_str().unwrap().starts_with("invalid target"), "{message}");
    let roughness = host
        .with_model(|g| g.material(0).unwrap().pbr_metallic_roughness.roughness_factor)
        .unwrap();
    assert!((roughness - 1.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn concurrent_requests_resolve_independently() {
    let (host, mut events) = attached(
        "material-properties; textures; messaging",
        r#"
            add_event_listener("model-change", |event| {
                let model = event.model;
                let pbr = model.materials[0].pbr_metallic_roughness;
                pbr.set_metallic_factor(0.25).then(|result| post_message("metallic"));
                pbr.set_roughness_factor(0.75).then(|result| post_message("roughness"));
                model.images[0].set_uri("x.png").then(|result| post_message("uri"));
            });
        "#,
    )
    .await;

    host.load_model(grey_model(), None).await.unwrap();
    let mut seen = HashSet::new();
    for _ in 0..3 {
        let message = next_message(&mut events, WAIT).await.unwrap();
        seen.insert(message.as_str().unwrap().to_string());
    }
    let expected: HashSet<String> = ["metallic", "roughness", "uri"].map(String::from).into();
    assert_eq!(seen, expected);

    let (metallic, roughness) = host
        .with_model(|g| {
            let pbr = &g.material(0).unwrap().pbr_metallic_roughness;
            (pbr.metallic_factor, pbr.roughness_factor)
        })
        .unwrap();
    assert!((metallic - 0.25).abs() < f64::EPSILON);
    assert!((roughness - 0.75).abs() < f64::EPSILON);
}

#[tokio::test]
async fn messaging_is_required_to_post() {
    let (host, mut events) = attached(
        "material-properties",
        r#"add_event_listener("model-change", |event| post_message("hello"));"#,
    )
    .await;

    host.load_model(grey_model(), None).await.unwrap();
    let error = next_matching(&mut events, WAIT, |e| {
        matches!(e, BridgeEvent::ScriptError { .. } | BridgeEvent::Message { .. })
    })
    .await;
    let Some(BridgeEvent::ScriptError { message, .. }) = error else {
        panic!("expected script error, got {error:?}");
    };
    assert!(message.contains("messaging"), "{message}");
}

#[tokio::test]
async fn script_errors_do_not_kill_the_worklet() {
    let (host, mut events) = attached(
        "messaging",
        r#"
            let count = 0;
            add_event_listener("model-change", |event| {
                count += 1;
                if count == 1 { throw "first load"; }
                post_message(count);
            });
        "#,
    )
    .await;

    host.load_model(grey_model(), None).await.unwrap();
    assert!(next_matching(&mut events, WAIT, |e| matches!(e, BridgeEvent::ScriptError { .. }))
        .await
        .is_some());

    host.load_model(white_model(), None).await.unwrap();
    assert_eq!(next_message(&mut events, WAIT).await, Some(serde_json::json!(2)));
}

#[tokio::test]
async fn export_reflects_applied_mutations() {
    let (host, mut events) = attached(
        "material-properties; messaging",
        r#"
            add_event_listener("model-change", |event| {
                event.model.materials[0].pbr_metallic_roughness
                    .set_base_color_factor([0.2, 0.4, 0.6, 1.0])
                    .then(|result| post_message("ok"));
            });
        "#,
    )
    .await;

    assert!(matches!(
        host.export_scene(&GltfJsonExporter::new()),
        Err(HostError::NoModel)
    ));

    host.load_model(grey_model(), None).await.unwrap();
    assert!(next_message(&mut events, WAIT).await.is_some());

    let bytes = host.export_scene(&GltfJsonExporter::new()).unwrap();
    let document = std::str::from_utf8(&bytes).unwrap();
    let exported = Model::from_gltf_json(document).unwrap();
    assert_eq!(
        exported.materials[0].pbr_metallic_roughness.base_color_factor,
        [0.2, 0.4, 0.6, 1.0]
    );
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["asset"]["version"], "2.0");
    assert!(host
        .with_model(|g| g.node(NodeKind::Material, 0).is_some())
        .unwrap());
}
