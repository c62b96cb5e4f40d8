//! Conversions between JSON values and JS values.

use framelink_runtime::{Error, Result};
use serde::Serialize;
use serde_json::Value;
use wasm_bindgen::JsValue;

/// Converts `value` into a plain JS value; objects become plain objects, not `Map`s.
pub(crate) fn to_js(value: &Value) -> Result<JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|err| Error::Transport(format!("message is not transferable: {err}")))
}

pub(crate) fn from_js(value: JsValue) -> Option<Value> {
    serde_wasm_bindgen::from_value(value).ok()
}

pub(crate) fn transport_error(context: &str, err: JsValue) -> Error {
    Error::Transport(format!("{context}: {}", stringify_js_error(err)))
}

pub(crate) fn stringify_js_error(err: JsValue) -> String {
    err.as_string()
        .or_else(|| js_sys::JSON::stringify(&err).ok()?.as_string())
        .unwrap_or_else(|| format!("{:?}", err))
}
