use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{future_to_promise, JsFuture};

// Create a console module for logging
pub mod console;
// Bindings to the map surface bridge
mod bridge;
// Axis-aligned bounds aggregation
pub mod bounds;
// Historical feature datasets for the side panel
pub mod datasets;
// Request gateway client and error taxonomy
pub mod gateway;
// In-flight fetch tracking for ensure_layer_active
mod inflight;
// Persisted record models
pub mod records;
// The layer registry core
pub mod registry;
// The temporal slider
pub mod slider;

use bounds::Bounds;
use gateway::GatewayError;
use records::LayerRecord;
use registry::{DrawableLayerId, LayerRegistry};
use slider::TimelineSlider;

// Enable better panic messages in console during development
#[cfg(feature = "console_error_panic_hook")]
pub use console_error_panic_hook::set_once as set_panic_hook;

// Use the bindings from our console module
#[macro_export]
macro_rules! console_log {
    ($($t:tt)*) => (crate::console::log(&format!($($t)*)))
}

#[macro_export]
macro_rules! console_warn {
    ($($t:tt)*) => (crate::console::warn(&format!($($t)*)))
}

#[macro_export]
macro_rules! console_error {
    ($($t:tt)*) => (crate::console::error(&format!($($t)*)))
}

use std::sync::Once;
static INIT: Once = Once::new();

// This sets up the wasm_bindgen start functionality
#[wasm_bindgen(start)]
pub fn start() {
    INIT.call_once(|| {
        // Set the panic hook for better error messages
        #[cfg(feature = "console_error_panic_hook")]
        console_error_panic_hook::set_once();

        console_log!("historymap core initialized");
    });
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    // Plain objects rather than JS Maps, since descriptors and filter
    // expressions go straight into the map library
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Derive, register and add every drawable layer of a record, resolving
/// once all target surfaces report their source data loaded.
async fn create_layer(record: &LayerRecord) -> Result<(), JsValue> {
    let derived = registry::derive_drawable_layers(record);
    let key = record.registry_key();
    let added = LayerRegistry::with_mut(|r| {
        r.register(&key, derived.iter().map(|(id, _)| id.clone()).collect())
    });

    let mut waits = Vec::new();
    for (id, descriptor) in &derived {
        if !added.contains(id) {
            // already realized in an earlier registration
            continue;
        }
        let descriptor_js = to_js(descriptor)?;
        let promise = bridge::add_drawable_layer(id.surface(), descriptor_js)?;
        waits.push(JsFuture::from(promise));
    }

    // all-complete join: creations fire in any order, completion gates on
    // every one of them
    let results = futures::future::join_all(waits).await;
    for result in results {
        result?;
    }
    Ok(())
}

async fn fetch_and_create(record_id: String) -> Result<JsValue, JsValue> {
    let record = gateway::get_layer_by_id(&record_id)
        .await
        .map_err(JsValue::from)?;
    create_layer(&record).await?;
    Ok(JsValue::UNDEFINED)
}

/// Make a record's layers active: a known id toggles visibility, an
/// unknown one is fetched, derived and added to its target surfaces.
/// Concurrent calls for the same unknown id join the first call's work.
#[wasm_bindgen]
pub async fn ensure_layer_active(record_id: String) -> Result<(), JsValue> {
    if LayerRegistry::with(|r| r.contains(&record_id)) {
        console_log!("has layer {}", record_id);
        toggle_visibility();
        return Ok(());
    }

    if let Some(pending) = inflight::get(&record_id) {
        JsFuture::from(pending).await?;
        return Ok(());
    }

    let promise = future_to_promise(fetch_and_create(record_id.clone()));
    inflight::insert(&record_id, promise.clone());
    let result = JsFuture::from(promise).await;
    inflight::remove(&record_id);
    result.map(|_| ())
}

/// Persist a new or edited layer record, then realize it on its target
/// surfaces. A record with no target surfaces aborts the save unless the
/// host passes `allow_no_surfaces` after its confirmation prompt.
/// Resolves with the rendered toggle-widget fragment from the gateway.
#[wasm_bindgen]
pub async fn add_layer(record: JsValue, allow_no_surfaces: bool) -> Result<String, JsValue> {
    let record: LayerRecord = serde_wasm_bindgen::from_value(record)
        .map_err(|e| JsValue::from(GatewayError::Malformed(e.to_string())))?;

    if record.target_surfaces.is_empty() && !allow_no_surfaces {
        return Err(JsValue::from_str(
            "You have selected no maps to display this layer; the save was aborted.",
        ));
    }

    let fragment = gateway::save_layer(&record).await.map_err(JsValue::from)?;
    create_layer(&record).await?;
    Ok(fragment)
}

/// Sweep every registered record's checkbox and push its state to all the
/// record's drawable layers. Records whose control has left the DOM are
/// skipped with a warning.
#[wasm_bindgen]
pub fn toggle_visibility() {
    let entries = LayerRegistry::with(|r| r.entries_snapshot());
    for (record_id, drawables) in entries {
        let state = bridge::checkbox_state(&record_id);
        let Some(checked) = state.as_bool() else {
            console_warn!(
                "no layer control found for record {}, skipping visibility update",
                record_id
            );
            continue;
        };
        let visibility = if checked { "visible" } else { "none" };
        for id in &drawables {
            bridge::set_visibility(id.surface(), id.as_str(), visibility);
        }
    }
}

/// Apply the point-in-time date filter for `min_day` to every registered
/// drawable layer. The max bound rides along from the slider but the
/// containment test only needs the selected instant. Drawable layers the
/// surface has not realized yet are skipped with a warning.
#[wasm_bindgen]
pub fn apply_date_filter(min_day: i32, _max_day: i32) {
    let expr = registry::date_filter_expr(min_day);
    let filter_js = match to_js(&expr) {
        Ok(v) => v,
        Err(e) => {
            console_error!("could not build date filter: {:?}", e);
            return;
        }
    };

    let drawables = LayerRegistry::with(|r| r.all_drawables());
    for id in &drawables {
        let surface = id.surface();
        if !bridge::has_layer(surface, id.as_str()) {
            console_warn!("{} doesn't have {}", surface, id);
            continue;
        }
        bridge::set_filter(surface, id.as_str(), filter_js.clone());
    }
    LayerRegistry::with_mut(|r| r.note_filter(min_day));
}

fn fit_options() -> Result<JsValue, JsValue> {
    to_js(&serde_json::json!({ "bearing": 0, "padding": 15 }))
}

fn source_bounds(id: &DrawableLayerId) -> Option<Bounds> {
    let raw = bridge::get_source_bounds(id.surface(), id.as_str());
    let flat: Vec<f64> = serde_wasm_bindgen::from_value(raw).ok()?;
    Bounds::from_flat(&flat)
}

/// Fit a surface's viewport to one drawable layer's source bounds.
#[wasm_bindgen]
pub fn zoom_to_layer(drawable_id: &str) -> Result<(), JsValue> {
    let id = DrawableLayerId::from_string(drawable_id.to_string());
    let bounds = source_bounds(&id).ok_or_else(|| {
        JsValue::from_str(&format!("no source bounds available for {}", drawable_id))
    })?;
    bridge::fit_bounds(id.surface(), to_js(&bounds.to_corners())?, fit_options()?);
    Ok(())
}

/// Fit the viewport to the combined bounds of a feature group's drawable
/// layers. Layers without loaded bounds are skipped; the fit runs on the
/// last layer's surface (both surfaces share a viewport size).
#[wasm_bindgen]
pub fn zoom_to_feature_group(drawable_ids: JsValue) -> Result<(), JsValue> {
    let ids: Vec<String> = serde_wasm_bindgen::from_value(drawable_ids)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    let mut boxes = Vec::new();
    let mut target_surface = None;
    for raw in &ids {
        let id = DrawableLayerId::from_string(raw.clone());
        match source_bounds(&id) {
            Some(b) => boxes.push(b.to_corners()),
            None => console_warn!("no bounds yet for {}, leaving it out of the fit", raw),
        }
        target_surface = Some(id.surface().to_string());
    }

    let Some(surface) = target_surface else {
        return Ok(());
    };
    let Some(combined) = bounds::combine(&boxes) else {
        console_warn!("no loaded bounds in feature group, nothing to fit");
        return Ok(());
    };
    bridge::fit_bounds(&surface, to_js(&combined.to_corners())?, fit_options()?);
    Ok(())
}

/// Pan/zoom a surface to a point of interest (zoom 16, flat pitch).
#[wasm_bindgen]
pub fn ease_to_point(surface: &str, lng: f64, lat: f64) {
    bridge::ease_to(surface, lng, lat, 16.0, 0.0);
}

/// Swap the style of one surface.
#[wasm_bindgen]
pub fn apply_style(surface: &str, style_url: &str) {
    bridge::set_style(surface, style_url);
}

/// Fetch a layer record for the edit form.
#[wasm_bindgen]
pub async fn get_layer_record(record_id: String) -> Result<JsValue, JsValue> {
    let record = gateway::get_layer_by_id(&record_id)
        .await
        .map_err(JsValue::from)?;
    to_js(&record)
}

/// Fetch a style record for the edit form.
#[wasm_bindgen]
pub async fn get_style_record(record_id: String) -> Result<JsValue, JsValue> {
    let record = gateway::get_style_by_id(&record_id)
        .await
        .map_err(JsValue::from)?;
    to_js(&record)
}

/// Delete a persisted layer record. The registry entry (if any) is left in
/// place; its drawable layers live until the page reloads.
#[wasm_bindgen]
pub async fn delete_layer_record(record_id: String) -> Result<String, JsValue> {
    gateway::delete_layer(&record_id).await.map_err(JsValue::from)
}

/// Persist a style record.
#[wasm_bindgen]
pub async fn save_style_record(record: JsValue) -> Result<String, JsValue> {
    let record: records::StyleRecord = serde_wasm_bindgen::from_value(record)
        .map_err(|e| JsValue::from(GatewayError::Malformed(e.to_string())))?;
    gateway::save_style(&record).await.map_err(JsValue::from)
}

// Function to get registry statistics
#[wasm_bindgen]
pub fn registry_stats() -> Result<JsValue, JsValue> {
    let mut stats = LayerRegistry::with(|r| r.stats());
    stats.in_flight = inflight::count();
    to_js(&stats)
}

// ========== Temporal slider exports ==========

/// Set up the timeline slider. Dates are compact strings, either YYYY or
/// YYYYMMDD; a malformed value rejects and leaves any previous slider as is.
#[wasm_bindgen]
pub fn init_slider(min_date: &str, max_date: &str, track_width: f64) -> Result<(), JsValue> {
    let timeline = TimelineSlider::new(min_date, max_date, track_width).map_err(|e| {
        console_error!("{}", e);
        JsValue::from_str(&e.to_string())
    })?;
    slider::install(timeline);
    Ok(())
}

#[wasm_bindgen]
pub fn slider_drag_start(x: f64) {
    if slider::with_installed(|s| s.begin_drag(x)).is_none() {
        console_warn!("slider_drag_start before init_slider");
    }
}

/// Move the slider handle. Filtering is live: each movement pushes the
/// newly selected date into the registry's filter. Returns the date-panel
/// label, or nothing while the slider is idle.
#[wasm_bindgen]
pub fn slider_drag_move(x: f64) -> Option<String> {
    let update = slider::with_installed(|s| {
        s.drag_to(x).map(|day| (day, s.max_compact(), s.label()))
    })?;
    let (day, max_day, label) = update?;
    apply_date_filter(day, max_day);
    Some(label)
}

#[wasm_bindgen]
pub fn slider_drag_end() {
    if slider::with_installed(|s| s.end_drag()).is_none() {
        console_warn!("slider_drag_end before init_slider");
    }
}

#[wasm_bindgen]
pub fn slider_current_date() -> Option<i32> {
    slider::with_installed(|s| s.selected_compact())
}

#[wasm_bindgen]
pub fn slider_label() -> Option<String> {
    slider::with_installed(|s| s.label())
}

#[wasm_bindgen]
pub fn slider_max_date() -> Option<i32> {
    slider::with_installed(|s| s.max_compact())
}

#[wasm_bindgen]
pub fn slider_set_track_width(width: f64) {
    if slider::with_installed(|s| s.set_track_width(width)).is_none() {
        console_warn!("slider_set_track_width before init_slider");
    }
}

/// Year labels for the timeline ruler.
#[wasm_bindgen]
pub fn slider_year_ticks() -> Result<JsValue, JsValue> {
    match slider::with_installed(|s| s.year_ticks()) {
        Some(ticks) => to_js(&ticks),
        None => Err(JsValue::from_str("slider not initialized")),
    }
}

// ========== Feature dataset exports ==========

/// Load one historical dataset (a JSON array) under its dataset name.
#[wasm_bindgen]
pub fn register_feature_dataset(name: &str, json: &str) -> Result<(), JsValue> {
    let entries: Vec<serde_json::Value> = serde_json::from_str(json)
        .map_err(|e| JsValue::from_str(&format!("could not parse dataset {}: {}", name, e)))?;
    console_log!("registered dataset {} with {} entries", name, entries.len());
    datasets::FeatureDatasets::with_mut(|d| d.register(name, entries));
    Ok(())
}

/// Look up a lot by title for the side panel. The feature group's display
/// name is normalized into the dataset key. Returns undefined on a miss.
#[wasm_bindgen]
pub fn find_feature_lot(feature_group: &str, lot_title: &str) -> Result<JsValue, JsValue> {
    let key = datasets::dataset_key(feature_group);
    datasets::FeatureDatasets::with(|d| match d.find_lot(&key, lot_title) {
        Some(entry) => to_js(entry),
        None => Ok(JsValue::UNDEFINED),
    })
}
