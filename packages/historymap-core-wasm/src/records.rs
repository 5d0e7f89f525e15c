// Persisted record models, deserialized from the gateway's JSON responses.
// Field names follow the wire format produced by the layer/style forms, so
// several keys contain spaces.
use serde::{Deserialize, Serialize};

/// Geometry kinds a layer record can be rendered as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometryKind {
    Circle,
    Line,
    Fill,
}

impl GeometryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeometryKind::Circle => "circle",
            GeometryKind::Line => "line",
            GeometryKind::Fill => "fill",
        }
    }
}

/// One geometry representation of a layer. The form stores appearance
/// values as free text, so color/opacity/width arrive as optional strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeometrySpec {
    #[serde(rename = "type")]
    pub kind: GeometryKind,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub opacity: Option<String>,
    #[serde(default)]
    pub width: Option<String>,
}

pub const DEFAULT_COLOR: &str = "#AAAAAA";
pub const DEFAULT_OPACITY: f64 = 0.5;

impl GeometrySpec {
    /// Paint color, falling back to the default gray.
    pub fn color(&self) -> &str {
        match self.color.as_deref() {
            Some(c) if !c.is_empty() => c,
            _ => DEFAULT_COLOR,
        }
    }

    /// Paint opacity, falling back to 0.5 when absent or unparseable.
    pub fn opacity(&self) -> f64 {
        self.opacity
            .as_deref()
            .and_then(|s| s.trim().parse::<f64>().ok())
            .unwrap_or(DEFAULT_OPACITY)
    }

    /// Line width / circle radius. Only meaningful for those kinds.
    pub fn width(&self) -> Option<f64> {
        self.width
            .as_deref()
            .and_then(|s| s.trim().parse::<f64>().ok())
    }
}

/// A persisted layer record as stored by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerRecord {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "feature group", default)]
    pub feature_group: String,
    #[serde(default)]
    pub borough: String,
    #[serde(rename = "layer source url", default)]
    pub source_url: String,
    // Older records carry the tileset reference under "database" instead
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(rename = "source layer", default)]
    pub source_layer: String,
    #[serde(rename = "drupal node id", default, skip_serializing_if = "Option::is_none")]
    pub drupal_node_id: Option<String>,
    #[serde(rename = "target map", default)]
    pub target_surfaces: Vec<String>,
    #[serde(rename = "type", default)]
    pub geometry: Vec<GeometrySpec>,
    // Interaction flags are persisted as 0/1 by the form
    #[serde(default)]
    pub hover: u8,
    #[serde(default)]
    pub click: u8,
    #[serde(default)]
    pub sidebar: u8,
    #[serde(rename = "sliderCheckBox", default)]
    pub slider_filter: u8,
}

impl LayerRecord {
    /// Key under which the registry tracks this record. Falls back to
    /// `featureGroup/name` for records that have not been saved yet and so
    /// carry no gateway id.
    pub fn registry_key(&self) -> String {
        match &self.id {
            Some(id) if !id.is_empty() => id.clone(),
            _ => format!("{}/{}", self.feature_group, self.name),
        }
    }

    /// The tileset reference the drawable layers should read from.
    pub fn source_ref(&self) -> &str {
        match self.database.as_deref() {
            Some(db) if !db.is_empty() => db,
            _ => &self.source_url,
        }
    }

    pub fn hover_enabled(&self) -> bool {
        self.hover != 0
    }

    pub fn click_enabled(&self) -> bool {
        self.click != 0
    }

    pub fn sidebar_enabled(&self) -> bool {
        self.sidebar != 0
    }

    pub fn slider_filter_enabled(&self) -> bool {
        self.slider_filter != 0
    }
}

/// A persisted style record ("map" in the operator forms).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleRecord {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "feature group", default)]
    pub feature_group: String,
    #[serde(default)]
    pub borough: String,
    #[serde(rename = "style source url", default)]
    pub style_source_url: String,
    #[serde(rename = "drupal node id", default, skip_serializing_if = "Option::is_none")]
    pub drupal_node_id: Option<String>,
    #[serde(rename = "ease to point", default)]
    pub ease_to_point: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r##"{
            "_id": "64ff00aa",
            "name": "Dutch Grant Lot",
            "feature group": "Dutch Grants",
            "borough": "Manhattan",
            "layer source url": "mapbox://nittyjee.abc123",
            "source layer": "grant-lots",
            "target map": ["beforeMap", "afterMap"],
            "type": [
                { "type": "fill", "color": "#ffff7f", "opacity": "0.6", "width": "" },
                { "type": "line", "color": "", "opacity": "", "width": "2" }
            ],
            "hover": 1,
            "click": 1,
            "sidebar": 0,
            "sliderCheckBox": 1
        }"##
    }

    #[test]
    fn parses_wire_format() {
        let record: LayerRecord = serde_json::from_str(sample_json()).unwrap();
        assert_eq!(record.id.as_deref(), Some("64ff00aa"));
        assert_eq!(record.feature_group, "Dutch Grants");
        assert_eq!(record.target_surfaces, vec!["beforeMap", "afterMap"]);
        assert_eq!(record.geometry.len(), 2);
        assert_eq!(record.geometry[0].kind, GeometryKind::Fill);
        assert!(record.hover_enabled());
        assert!(record.click_enabled());
        assert!(!record.sidebar_enabled());
        assert!(record.slider_filter_enabled());
    }

    #[test]
    fn appearance_defaults_apply() {
        let record: LayerRecord = serde_json::from_str(sample_json()).unwrap();
        let fill = &record.geometry[0];
        assert_eq!(fill.color(), "#ffff7f");
        assert!((fill.opacity() - 0.6).abs() < 1e-9);
        assert_eq!(fill.width(), None);

        let line = &record.geometry[1];
        assert_eq!(line.color(), DEFAULT_COLOR);
        assert!((line.opacity() - DEFAULT_OPACITY).abs() < 1e-9);
        assert_eq!(line.width(), Some(2.0));
    }

    #[test]
    fn registry_key_falls_back_for_unsaved_records() {
        let mut record: LayerRecord = serde_json::from_str(sample_json()).unwrap();
        assert_eq!(record.registry_key(), "64ff00aa");
        record.id = None;
        assert_eq!(record.registry_key(), "Dutch Grants/Dutch Grant Lot");
    }

    #[test]
    fn legacy_database_field_wins_over_source_url() {
        let mut record: LayerRecord = serde_json::from_str(sample_json()).unwrap();
        assert_eq!(record.source_ref(), "mapbox://nittyjee.abc123");
        record.database = Some("mapbox://nittyjee.legacy".to_string());
        assert_eq!(record.source_ref(), "mapbox://nittyjee.legacy");
    }
}
