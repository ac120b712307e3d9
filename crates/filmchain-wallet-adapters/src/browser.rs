//! `window.ethereum` access for the wasm32 runtime.

use serde_json::Value;
use wasm_bindgen::{JsCast, JsValue};

use filmchain_wallet_core::PortError;

use crate::jsonrpc::{chain_id_from_f64, parse_chain_id_str};

pub(crate) fn browser_provider() -> Result<JsValue, PortError> {
    let window =
        web_sys::window().ok_or_else(|| PortError::Transport("missing window".to_owned()))?;
    let provider = get_prop(&window.into(), "ethereum")?;
    if provider.is_null() || provider.is_undefined() {
        return Err(PortError::NotFound("window.ethereum missing".to_owned()));
    }
    Ok(provider)
}

pub(crate) fn get_prop(target: &JsValue, key: &str) -> Result<JsValue, PortError> {
    js_sys::Reflect::get(target, &JsValue::from_str(key))
        .map_err(|e| PortError::Transport(format!("read provider property {key} failed: {e:?}")))
}

pub(crate) fn get_function(target: &JsValue, key: &str) -> Option<js_sys::Function> {
    get_prop(target, key)
        .ok()
        .and_then(|v| v.dyn_into::<js_sys::Function>().ok())
}

/// `provider.request({ method, params })`, awaiting the returned promise.
pub(crate) async fn request(method: &str, params: Value) -> Result<Value, PortError> {
    let provider = browser_provider()?;
    let request_fn = get_function(&provider, "request").ok_or(PortError::NotImplemented(
        "window.ethereum.request is unavailable",
    ))?;

    let request = serde_json::json!({
        "method": method,
        "params": params,
    });
    let request_js = serde_wasm_bindgen::to_value(&request)
        .map_err(|e| PortError::Transport(format!("failed to encode wasm request: {e}")))?;
    let promise_js = request_fn
        .call1(&provider, &request_js)
        .map_err(|e| PortError::Transport(format!("provider request dispatch failed: {e:?}")))?;
    let promise = promise_js
        .dyn_into::<js_sys::Promise>()
        .map_err(|_| PortError::Transport("provider request did not return Promise".to_owned()))?;
    let result_js = wasm_bindgen_futures::JsFuture::from(promise)
        .await
        .map_err(|e| js_error(method, &e))?;
    serde_wasm_bindgen::from_value(result_js)
        .map_err(|e| PortError::Transport(format!("failed to decode wasm response: {e}")))
}

/// EIP-1193 rejections carry `{ code, message }`; keep the code.
fn js_error(method: &str, err: &JsValue) -> PortError {
    let code = get_prop(err, "code").ok().and_then(|c| c.as_f64());
    let message = get_prop(err, "message")
        .ok()
        .and_then(|m| m.as_string())
        .unwrap_or_else(|| format!("{method} rejected: {err:?}"));
    match code {
        Some(code) => PortError::Rpc {
            code: code as i64,
            message,
        },
        None => PortError::Transport(message),
    }
}

pub(crate) fn js_chain_id_to_u64(value: &JsValue) -> Result<u64, PortError> {
    if let Some(s) = value.as_string() {
        return parse_chain_id_str(&s);
    }
    if let Some(num) = value.as_f64() {
        return chain_id_from_f64(num);
    }
    Err(PortError::Validation("invalid JS chain id".to_owned()))
}
