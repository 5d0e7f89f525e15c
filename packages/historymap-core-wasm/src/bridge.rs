// Bindings to the map surface bridge. Each surface ("beforeMap",
// "afterMap") is addressed by name; the JS side owns the actual map
// instances, popup wiring and DOM.
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    /// Add a drawable layer to a surface. The returned promise resolves
    /// once the surface reports the layer's source data as loaded.
    #[wasm_bindgen(js_namespace = mapBridge, js_name = addDrawableLayer, catch)]
    pub fn add_drawable_layer(surface: &str, descriptor: JsValue)
        -> Result<js_sys::Promise, JsValue>;

    #[wasm_bindgen(js_namespace = mapBridge, js_name = setVisibility)]
    pub fn set_visibility(surface: &str, layer_id: &str, visibility: &str);

    #[wasm_bindgen(js_namespace = mapBridge, js_name = setFilter)]
    pub fn set_filter(surface: &str, layer_id: &str, filter: JsValue);

    #[wasm_bindgen(js_namespace = mapBridge, js_name = hasLayer)]
    pub fn has_layer(surface: &str, layer_id: &str) -> bool;

    /// Flat `[xMin, yMin, xMax, yMax]` array, or undefined while the
    /// source is still loading.
    #[wasm_bindgen(js_namespace = mapBridge, js_name = getSourceBounds)]
    pub fn get_source_bounds(surface: &str, layer_id: &str) -> JsValue;

    #[wasm_bindgen(js_namespace = mapBridge, js_name = fitBounds)]
    pub fn fit_bounds(surface: &str, bounds: JsValue, options: JsValue);

    #[wasm_bindgen(js_namespace = mapBridge, js_name = easeTo)]
    pub fn ease_to(surface: &str, lng: f64, lat: f64, zoom: f64, pitch: f64);

    #[wasm_bindgen(js_namespace = mapBridge, js_name = setStyle)]
    pub fn set_style(surface: &str, style_url: &str);

    /// Checked state of the layer-toggle checkbox bound to a record, or
    /// undefined when that control no longer exists in the DOM.
    #[wasm_bindgen(js_namespace = mapBridge, js_name = checkboxState)]
    pub fn checkbox_state(record_id: &str) -> JsValue;
}
