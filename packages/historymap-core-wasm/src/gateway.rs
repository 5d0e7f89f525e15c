// Request gateway client. The transport lives on the JS side; rejections
// carry an HTTP status (0 for timeouts/network failures) that is mapped to
// the error taxonomy here. No request is retried automatically.
use thiserror::Error;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

use crate::records::{LayerRecord, StyleRecord};

#[wasm_bindgen]
extern "C" {
    // JavaScript helpers performing the actual HTTP requests
    #[wasm_bindgen(js_namespace = gatewayBridge, js_name = postJson, catch)]
    fn post_json(route: &str, body: &str) -> Result<js_sys::Promise, JsValue>;

    #[wasm_bindgen(js_namespace = gatewayBridge, js_name = getJson, catch)]
    fn get_json(url: &str) -> Result<js_sys::Promise, JsValue>;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("No resource at this end point: {0}")]
    NotFound(String),
    #[error("The server returned an error, please wait a bit and try again.")]
    Server,
    #[error("The request timed out, either the server is down, or there is an issue with the connection.")]
    Connection,
    #[error("The server response could not be read: {0}")]
    Malformed(String),
}

impl From<GatewayError> for JsValue {
    fn from(err: GatewayError) -> JsValue {
        JsValue::from_str(&err.to_string())
    }
}

/// Map an HTTP status to the failure taxonomy. Status 0 is how the bridge
/// reports timeouts and connection-level failures.
pub fn classify_status(status: u16, route: &str) -> GatewayError {
    match status {
        404 => GatewayError::NotFound(route.to_string()),
        500..=599 => GatewayError::Server,
        _ => GatewayError::Connection,
    }
}

fn classify_rejection(value: JsValue, route: &str) -> GatewayError {
    let status = js_sys::Reflect::get(&value, &JsValue::from_str("status"))
        .ok()
        .and_then(|v| v.as_f64())
        .or_else(|| value.as_f64())
        .unwrap_or(0.0) as u16;
    classify_status(status, route)
}

async fn await_text(
    promise: Result<js_sys::Promise, JsValue>,
    route: &str,
) -> Result<String, GatewayError> {
    let promise = promise.map_err(|e| classify_rejection(e, route))?;
    let value = JsFuture::from(promise)
        .await
        .map_err(|e| classify_rejection(e, route))?;
    value
        .as_string()
        .ok_or_else(|| GatewayError::Malformed(format!("non-text response from {}", route)))
}

pub async fn post_text(route: &str, body: &str) -> Result<String, GatewayError> {
    await_text(post_json(route, body), route).await
}

pub async fn get_text(url: &str) -> Result<String, GatewayError> {
    await_text(get_json(url), url).await
}

pub async fn get_layer_by_id(record_id: &str) -> Result<LayerRecord, GatewayError> {
    let body = serde_json::json!({ "_id": record_id }).to_string();
    let text = post_text("./getLayerById", &body).await?;
    serde_json::from_str(&text).map_err(|e| GatewayError::Malformed(e.to_string()))
}

pub async fn get_style_by_id(record_id: &str) -> Result<StyleRecord, GatewayError> {
    let body = serde_json::json!({ "_id": record_id }).to_string();
    let text = post_text("./getStyleById", &body).await?;
    serde_json::from_str(&text).map_err(|e| GatewayError::Malformed(e.to_string()))
}

/// Persist a layer record. The response is a rendered toggle-widget
/// fragment for the host to insert, not the record itself.
pub async fn save_layer(record: &LayerRecord) -> Result<String, GatewayError> {
    let body = serde_json::to_string(record).map_err(|e| GatewayError::Malformed(e.to_string()))?;
    post_text("./saveLayer", &body).await
}

pub async fn save_style(record: &StyleRecord) -> Result<String, GatewayError> {
    let body = serde_json::to_string(record).map_err(|e| GatewayError::Malformed(e.to_string()))?;
    post_text("./saveStyle", &body).await
}

pub async fn delete_layer(record_id: &str) -> Result<String, GatewayError> {
    let body = serde_json::json!({ "id": record_id }).to_string();
    post_text("./deleteLayer", &body).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert_eq!(
            classify_status(404, "./getLayerById"),
            GatewayError::NotFound("./getLayerById".to_string())
        );
        assert_eq!(classify_status(500, "./saveLayer"), GatewayError::Server);
        assert_eq!(classify_status(503, "./saveLayer"), GatewayError::Server);
        assert_eq!(classify_status(0, "./saveLayer"), GatewayError::Connection);
    }

    #[test]
    fn messages_are_user_facing() {
        assert_eq!(
            classify_status(502, "x").to_string(),
            "The server returned an error, please wait a bit and try again."
        );
        assert!(classify_status(404, "./getLayerById")
            .to_string()
            .contains("./getLayerById"));
    }
}
