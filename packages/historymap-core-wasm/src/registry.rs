// Layer registry: owns the correspondence between persisted layer records
// and the drawable layers derived from them across the two map surfaces.
use lazy_static::lazy_static;
use parking_lot::ReentrantMutex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::cell::RefCell;
use std::collections::HashMap;

use crate::records::{GeometrySpec, LayerRecord};

/// Identity of one surface-native drawable layer, formatted
/// `borough/featureGroup/name/geometryKind/surfaceName`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DrawableLayerId(String);

impl DrawableLayerId {
    pub fn new(record: &LayerRecord, spec: &GeometrySpec, surface: &str) -> Self {
        DrawableLayerId(format!(
            "{}/{}/{}/{}/{}",
            record.borough,
            record.feature_group,
            record.name,
            spec.kind.as_str(),
            surface
        ))
    }

    pub fn from_string(id: String) -> Self {
        DrawableLayerId(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The surface that owns this drawable layer: the trailing segment.
    pub fn surface(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or("")
    }
}

impl std::fmt::Display for DrawableLayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Synthesize the surface-native descriptor for one (surface, geometry
/// spec) pair of a record. Interaction flags travel in `metadata` so the
/// host can wire popup and side-panel handlers when it adds the layer.
pub fn layer_descriptor(
    record: &LayerRecord,
    spec: &GeometrySpec,
    id: &DrawableLayerId,
) -> serde_json::Value {
    let kind = spec.kind.as_str();
    let mut paint = serde_json::Map::new();
    paint.insert(format!("{}-color", kind), json!(spec.color()));
    paint.insert(format!("{}-opacity", kind), json!(spec.opacity()));
    match kind {
        "line" => {
            if let Some(width) = spec.width() {
                paint.insert("line-width".to_string(), json!(width));
            }
        }
        "circle" => {
            if let Some(width) = spec.width() {
                paint.insert("circle-radius".to_string(), json!(width));
            }
        }
        _ => {}
    }

    json!({
        "id": id.as_str(),
        "type": kind,
        "name": record.name,
        "metadata": {
            "_id": record.id.clone().unwrap_or_default(),
            "hover": record.hover_enabled(),
            "click": record.click_enabled(),
            "sidebar": record.sidebar_enabled(),
            "sliderFilter": record.slider_filter_enabled(),
        },
        "source": {
            "url": record.source_ref(),
            "type": "vector"
        },
        "source-layer": record.source_layer,
        "layout": {
            "visibility": "visible"
        },
        "paint": paint,
    })
}

/// Derive every drawable layer of a record: one per target surface per
/// geometry spec, in record order.
pub fn derive_drawable_layers(
    record: &LayerRecord,
) -> Vec<(DrawableLayerId, serde_json::Value)> {
    let mut derived = Vec::with_capacity(record.target_surfaces.len() * record.geometry.len());
    for surface in &record.target_surfaces {
        for spec in &record.geometry {
            let id = DrawableLayerId::new(record, spec, surface);
            let descriptor = layer_descriptor(record, spec, &id);
            derived.push((id, descriptor));
        }
    }
    derived
}

/// The filter expression applied to time-bounded layers: a feature is
/// visible at `day` when DayStart <= day <= DayEnd.
pub fn date_filter_expr(day: i32) -> serde_json::Value {
    json!(["all", ["<=", "DayStart", day], [">=", "DayEnd", day]])
}

/// Whether a feature with the given day bounds passes the filter for `day`.
pub fn filter_matches(day_start: i32, day_end: i32, day: i32) -> bool {
    day_start <= day && day_end >= day
}

#[derive(Serialize, Deserialize)]
pub struct RegistryStats {
    pub records: usize,
    pub drawable_layers: usize,
    pub in_flight: usize,
    pub last_filter_day: Option<i32>,
}

/// Registry state: one entry per persisted record id, owning the ordered
/// list of drawable-layer identities derived from it. Entries live for the
/// page session; drawable layers are never removed, only toggled.
pub struct LayerRegistry {
    entries: HashMap<String, Vec<DrawableLayerId>>,
    last_filter_day: Option<i32>,
}

lazy_static! {
    static ref LAYER_REGISTRY: ReentrantMutex<RefCell<LayerRegistry>> =
        ReentrantMutex::new(RefCell::new(LayerRegistry::new()));
}

impl LayerRegistry {
    pub fn new() -> Self {
        LayerRegistry {
            entries: HashMap::new(),
            last_filter_day: None,
        }
    }

    pub fn with<F, R>(f: F) -> R
    where
        F: FnOnce(&LayerRegistry) -> R,
    {
        let guard = LAYER_REGISTRY.lock();
        let borrow = guard.borrow();
        f(&borrow)
    }

    pub fn with_mut<F, R>(f: F) -> R
    where
        F: FnOnce(&mut LayerRegistry) -> R,
    {
        let guard = LAYER_REGISTRY.lock();
        let mut borrow = guard.borrow_mut();
        f(&mut borrow)
    }

    pub fn contains(&self, record_id: &str) -> bool {
        self.entries.contains_key(record_id)
    }

    /// Register drawable layers for a record. Idempotent: an existing entry
    /// keeps its drawables, and re-registered identities are not duplicated.
    /// Returns the identities that were actually new.
    pub fn register(
        &mut self,
        record_id: &str,
        drawables: Vec<DrawableLayerId>,
    ) -> Vec<DrawableLayerId> {
        let entry = self.entries.entry(record_id.to_string()).or_default();
        let mut added = Vec::new();
        for id in drawables {
            if !entry.contains(&id) {
                entry.push(id.clone());
                added.push(id);
            }
        }
        added
    }

    pub fn drawables_for(&self, record_id: &str) -> Option<&[DrawableLayerId]> {
        self.entries.get(record_id).map(|v| v.as_slice())
    }

    /// Snapshot of every entry, for visibility sweeps over the UI controls.
    pub fn entries_snapshot(&self) -> Vec<(String, Vec<DrawableLayerId>)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Every registered drawable layer, across all records.
    pub fn all_drawables(&self) -> Vec<DrawableLayerId> {
        self.entries.values().flatten().cloned().collect()
    }

    pub fn record_count(&self) -> usize {
        self.entries.len()
    }

    pub fn drawable_count(&self) -> usize {
        self.entries.values().map(|v| v.len()).sum()
    }

    pub fn note_filter(&mut self, day: i32) {
        self.last_filter_day = Some(day);
    }

    pub fn last_filter_day(&self) -> Option<i32> {
        self.last_filter_day
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            records: self.record_count(),
            drawable_layers: self.drawable_count(),
            // tracked separately, filled in by the caller
            in_flight: 0,
            last_filter_day: self.last_filter_day,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slider::date_from_compact;

    fn sample_record() -> LayerRecord {
        serde_json::from_value(json!({
            "_id": "64ff00aa",
            "name": "Dutch Grant Lot",
            "feature group": "Dutch Grants",
            "borough": "Manhattan",
            "layer source url": "mapbox://nittyjee.abc123",
            "source layer": "grant-lots",
            "target map": ["beforeMap", "afterMap"],
            "type": [
                { "type": "fill", "color": "#ffff7f", "opacity": "0.6" },
                { "type": "line", "width": "2" }
            ],
            "hover": 1,
            "click": 1
        }))
        .unwrap()
    }

    #[test]
    fn derivation_is_surfaces_times_specs() {
        let record = sample_record();
        let derived = derive_drawable_layers(&record);
        assert_eq!(derived.len(), 4);
        let ids: Vec<&str> = derived.iter().map(|(id, _)| id.as_str()).collect();
        assert!(ids.contains(&"Manhattan/Dutch Grants/Dutch Grant Lot/fill/beforeMap"));
        assert!(ids.contains(&"Manhattan/Dutch Grants/Dutch Grant Lot/line/afterMap"));
        // all identities unique
        let mut deduped = ids.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), ids.len());
    }

    #[test]
    fn drawable_id_reports_its_surface() {
        let record = sample_record();
        let derived = derive_drawable_layers(&record);
        let surfaces: Vec<&str> = derived.iter().map(|(id, _)| id.surface()).collect();
        assert_eq!(surfaces, vec!["beforeMap", "beforeMap", "afterMap", "afterMap"]);
    }

    #[test]
    fn descriptor_carries_paint_and_metadata() {
        let record = sample_record();
        let derived = derive_drawable_layers(&record);
        let (_, fill) = &derived[0];
        assert_eq!(fill["type"], "fill");
        assert_eq!(fill["paint"]["fill-color"], "#ffff7f");
        assert_eq!(fill["paint"]["fill-opacity"], 0.6);
        assert_eq!(fill["layout"]["visibility"], "visible");
        assert_eq!(fill["source"]["url"], "mapbox://nittyjee.abc123");
        assert_eq!(fill["source-layer"], "grant-lots");
        assert_eq!(fill["metadata"]["hover"], true);
        assert_eq!(fill["metadata"]["sidebar"], false);

        let (_, line) = &derived[1];
        assert_eq!(line["paint"]["line-width"], 2.0);
        // no width given means no radius entry, and defaults apply
        assert_eq!(line["paint"]["line-color"], crate::records::DEFAULT_COLOR);
    }

    #[test]
    fn registration_is_idempotent() {
        let record = sample_record();
        let ids: Vec<DrawableLayerId> = derive_drawable_layers(&record)
            .into_iter()
            .map(|(id, _)| id)
            .collect();

        let mut registry = LayerRegistry::new();
        let added = registry.register("64ff00aa", ids.clone());
        assert_eq!(added.len(), 4);
        assert!(registry.contains("64ff00aa"));

        let re_added = registry.register("64ff00aa", ids);
        assert!(re_added.is_empty());
        assert_eq!(registry.drawable_count(), 4);
        assert_eq!(registry.record_count(), 1);
    }

    #[test]
    fn filter_expression_shape() {
        let expr = date_filter_expr(16550101);
        assert_eq!(
            expr,
            json!(["all", ["<=", "DayStart", 16550101], [">=", "DayEnd", 16550101]])
        );
    }

    #[test]
    fn filter_is_point_in_time_containment() {
        assert!(filter_matches(16500101, 16600101, 16550101));
        assert!(!filter_matches(16500101, 16600101, 16700101));
        // inclusive at both ends
        assert!(filter_matches(16500101, 16600101, 16500101));
        assert!(filter_matches(16500101, 16600101, 16600101));
    }

    #[test]
    fn malformed_date_leaves_last_filter_unchanged() {
        let mut registry = LayerRegistry::new();
        registry.note_filter(16500101);
        // the caller only pushes a filter when parsing succeeds
        if let Ok(day) = date_from_compact("") {
            registry.note_filter(day);
        }
        assert_eq!(registry.last_filter_day(), Some(16500101));
    }

    #[test]
    fn stats_reflect_registry_contents() {
        let record = sample_record();
        let ids: Vec<DrawableLayerId> = derive_drawable_layers(&record)
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        let mut registry = LayerRegistry::new();
        registry.register("64ff00aa", ids);
        registry.note_filter(16400101);
        let stats = registry.stats();
        assert_eq!(stats.records, 1);
        assert_eq!(stats.drawable_layers, 4);
        assert_eq!(stats.last_filter_day, Some(16400101));
    }
}
