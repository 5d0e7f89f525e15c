// Explicit registry of historical feature datasets (grant lots, tax lots),
// keyed by a normalized feature-group name. Datasets are loaded once at
// startup by the host; the side panel then resolves lots by title here.
use lazy_static::lazy_static;
use parking_lot::ReentrantMutex;
use std::cell::RefCell;
use std::collections::HashMap;

pub struct FeatureDatasets {
    datasets: HashMap<String, Vec<serde_json::Value>>,
}

impl FeatureDatasets {
    pub fn new() -> Self {
        FeatureDatasets {
            datasets: HashMap::new(),
        }
    }

    pub fn with<F, R>(f: F) -> R
    where
        F: FnOnce(&FeatureDatasets) -> R,
    {
        let guard = FEATURE_DATASETS.lock();
        let borrow = guard.borrow();
        f(&borrow)
    }

    pub fn with_mut<F, R>(f: F) -> R
    where
        F: FnOnce(&mut FeatureDatasets) -> R,
    {
        let guard = FEATURE_DATASETS.lock();
        let mut borrow = guard.borrow_mut();
        f(&mut borrow)
    }

    pub fn register(&mut self, name: &str, entries: Vec<serde_json::Value>) {
        self.datasets.insert(name.to_string(), entries);
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.datasets.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    /// Find the first entry of a dataset whose title matches `lot_title`.
    pub fn find_lot(&self, dataset: &str, lot_title: &str) -> Option<&serde_json::Value> {
        self.datasets
            .get(dataset)?
            .iter()
            .find(|entry| entry_title(entry) == Some(lot_title))
    }
}

lazy_static! {
    static ref FEATURE_DATASETS: ReentrantMutex<RefCell<FeatureDatasets>> =
        ReentrantMutex::new(RefCell::new(FeatureDatasets::new()));
}

/// Titles come in two shapes across the feeds: a plain string, or an array
/// of `{ "value": … }` objects where the first entry holds the title.
fn entry_title(entry: &serde_json::Value) -> Option<&str> {
    match entry.get("title") {
        Some(serde_json::Value::String(s)) => Some(s.as_str()),
        Some(serde_json::Value::Array(items)) => {
            items.first()?.get("value")?.as_str()
        }
        _ => None,
    }
}

/// Normalize a feature-group display name into its dataset key, e.g.
/// "Dutch Grants" -> "Dutch_Grants". Strips everything that is not a letter
/// or space, then joins the first two words with an underscore.
pub fn dataset_key(feature_group: &str) -> String {
    let cleaned: String = feature_group
        .chars()
        .filter(|c| c.is_ascii_alphabetic() || *c == ' ')
        .collect();
    cleaned.replacen(' ', "_", 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn finds_lot_by_plain_title() {
        let mut d = FeatureDatasets::new();
        d.register(
            "Dutch_Grants",
            vec![
                json!({ "title": "A1", "to_party": "Jan Jansen" }),
                json!({ "title": "B2", "to_party": "Pieter Claessen" }),
            ],
        );
        let lot = d.find_lot("Dutch_Grants", "B2").unwrap();
        assert_eq!(lot["to_party"], "Pieter Claessen");
        assert!(d.find_lot("Dutch_Grants", "Z9").is_none());
    }

    #[test]
    fn finds_lot_by_wrapped_title() {
        let mut d = FeatureDatasets::new();
        d.register(
            "Castello_Taxlots",
            vec![json!({ "title": [{ "value": "Director General DWIC" }] })],
        );
        assert!(d
            .find_lot("Castello_Taxlots", "Director General DWIC")
            .is_some());
    }

    #[test]
    fn unknown_dataset_yields_none() {
        let d = FeatureDatasets::new();
        assert!(d.find_lot("Unknown", "A1").is_none());
    }

    #[test]
    fn dataset_keys_are_normalized() {
        assert_eq!(dataset_key("Dutch Grants"), "Dutch_Grants");
        assert_eq!(dataset_key("Castello Taxlots (1660)"), "Castello_Taxlots ");
    }
}
