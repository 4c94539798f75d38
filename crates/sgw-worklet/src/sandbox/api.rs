//! Functions and types registered on the sandbox engine

use super::pending::Pending;
use super::proxy::{
    ImageProxy, MaterialProxy, ModelChangeEvent, ModelProxy, PbrProxy, TextureInfoProxy,
    TextureProxy,
};
use super::Shared;
use rhai::{Dynamic, Engine, EvalAltResult, FnPtr, ImmutableString};
use sgw_capability::Capability;
use sgw_rpc::{FromWorklet, RpcFailure};
use std::rc::Rc;

type ScriptResult<T> = Result<T, Box<EvalAltResult>>;

pub(super) fn register(engine: &mut Engine, shared: &Rc<Shared>) {
    register_proxies(engine);
    register_globals(engine, shared);
}

fn register_proxies(engine: &mut Engine) {
    engine
        .register_type_with_name::<ModelChangeEvent>("ModelChangeEvent")
        .register_get("model", ModelChangeEvent::model)
        .register_get("generation", ModelChangeEvent::generation);

    engine
        .register_type_with_name::<ModelProxy>("Model")
        .register_get("materials", ModelProxy::materials)
        .register_get("textures", ModelProxy::textures)
        .register_get("images", ModelProxy::images)
        .register_get("generation", ModelProxy::generation)
        .register_get("url", ModelProxy::url);

    engine
        .register_type_with_name::<MaterialProxy>("Material")
        .register_get("name", MaterialProxy::name)
        .register_get("index", MaterialProxy::index)
        .register_get("pbr_metallic_roughness", MaterialProxy::pbr_metallic_roughness)
        .register_get("emissive_factor", MaterialProxy::emissive_factor);

    engine
        .register_type_with_name::<PbrProxy>("PbrMetallicRoughness")
        .register_get("base_color_factor", PbrProxy::base_color_factor)
        .register_get("metallic_factor", PbrProxy::metallic_factor)
        .register_get("roughness_factor", PbrProxy::roughness_factor)
        .register_get("base_color_texture", PbrProxy::base_color_texture)
        .register_get(
            "metallic_roughness_texture",
            PbrProxy::metallic_roughness_texture,
        )
        .register_fn("set_base_color_factor", PbrProxy::set_base_color_factor)
        .register_fn("set_metallic_factor", PbrProxy::set_metallic_factor)
        .register_fn("set_roughness_factor", PbrProxy::set_roughness_factor);

    engine
        .register_type_with_name::<TextureInfoProxy>("TextureInfo")
        .register_get("texture", TextureInfoProxy::texture)
        .register_get("index", TextureInfoProxy::index)
        .register_get("tex_coord", TextureInfoProxy::tex_coord);

    engine
        .register_type_with_name::<TextureProxy>("Texture")
        .register_get("name", TextureProxy::name)
        .register_get("index", TextureProxy::index)
        .register_get("source", TextureProxy::source);

    engine
        .register_type_with_name::<ImageProxy>("Image")
        .register_get("name", ImageProxy::name)
        .register_get("uri", ImageProxy::uri)
        .register_get("mime_type", ImageProxy::mime_type)
        .register_get("index", ImageProxy::index)
        .register_fn("set_uri", ImageProxy::set_uri);

    // `catch` is reserved in rhai, hence `on_reject`
    engine
        .register_type_with_name::<Pending>("Pending")
        .register_fn("then", Pending::then)
        .register_fn("then", Pending::then_or)
        .register_fn("on_reject", Pending::on_reject)
        .register_get("is_settled", Pending::is_settled)
        .register_get("id", Pending::id);
}

fn register_globals(engine: &mut Engine, shared: &Rc<Shared>) {
    let state = Rc::clone(shared);
    engine.register_fn(
        "add_event_listener",
        move |event: ImmutableString, callback: FnPtr| {
            tracing::trace!(worklet = %state.worklet, event = %event, "listener added");
            state
                .listeners
                .borrow_mut()
                .push((event.to_string(), callback));
        },
    );

    let state = Rc::clone(shared);
    engine.register_fn("post_message", move |value: Dynamic| -> ScriptResult<()> {
        post_message(&state, &value)
    });

    let state = Rc::clone(shared);
    engine.register_fn("log", move |value: Dynamic| {
        let line = value.to_string();
        tracing::info!(target: "sgw::sandbox", worklet = %state.worklet, "{line}");
        state.console_line(line);
    });

    engine.register_fn("to_json", |value: Dynamic| -> ScriptResult<String> {
        let json: serde_json::Value = rhai::serde::from_dynamic(&value)?;
        serde_json::to_string(&json).map_err(|e| e.to_string().into())
    });

    engine.register_fn(
        "parse_json",
        |text: ImmutableString| -> ScriptResult<Dynamic> {
            let json: serde_json::Value =
                serde_json::from_str(&text).map_err(|e| -> Box<EvalAltResult> {
                    format!("invalid JSON: {e}").into()
                })?;
            rhai::serde::to_dynamic(json)
        },
    );
}

fn post_message(shared: &Shared, value: &Dynamic) -> ScriptResult<()> {
    if !shared.capabilities.contains(Capability::Messaging) {
        let denied = RpcFailure::CapabilityDenied {
            capability: Capability::Messaging,
        };
        return Err(denied.to_string().into());
    }
    if shared.terminated.get() {
        return Ok(());
    }
    let data: serde_json::Value = rhai::serde::from_dynamic(value)?;
    shared.send(FromWorklet::PostMessage(data));
    Ok(())
}
