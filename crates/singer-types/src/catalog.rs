//! Singer discovery catalog model.
//!
//! Only the parts the orchestrator reports on are typed; schemas stay as
//! raw JSON. The catalog file itself is always written verbatim from the
//! tap's output, never re-serialized from these types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Catalog emitted by a tap in discovery mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub streams: Vec<CatalogStream>,
}

/// One stream of a [`Catalog`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogStream {
    pub tap_stream_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<String>,
    #[serde(default)]
    pub schema: Value,
    #[serde(default)]
    pub metadata: Vec<MetadataEntry>,
}

/// Selection metadata attached to a stream (empty breadcrumb) or to one
/// of its properties (`["properties", "<field>"]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    #[serde(default)]
    pub breadcrumb: Vec<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl MetadataEntry {
    fn selected(&self) -> bool {
        self.metadata
            .get("selected")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

impl CatalogStream {
    /// Whether the stream-level metadata marks this stream for replication.
    #[must_use]
    pub fn is_selected(&self) -> bool {
        self.metadata
            .iter()
            .filter(|m| m.breadcrumb.is_empty())
            .any(MetadataEntry::selected)
    }

    /// Number of properties declared by the stream schema.
    #[must_use]
    pub fn property_count(&self) -> usize {
        self.schema
            .get("properties")
            .and_then(Value::as_object)
            .map_or(0, Map::len)
    }

    /// Names of properties whose metadata marks them as selected.
    #[must_use]
    pub fn selected_properties(&self) -> Vec<&str> {
        self.metadata
            .iter()
            .filter(|m| m.selected())
            .filter_map(|m| match m.breadcrumb.as_slice() {
                [_, field, ..] => Some(field.as_str()),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Catalog {
        serde_json::from_value(serde_json::json!({
            "streams": [{
                "tap_stream_id": "orders",
                "schema": {"properties": {"id": {}, "total": {}, "note": {}}},
                "metadata": [
                    {"breadcrumb": [], "metadata": {"selected": true}},
                    {"breadcrumb": ["properties", "id"], "metadata": {"selected": true}},
                    {"breadcrumb": ["properties", "total"], "metadata": {"selected": true}},
                    {"breadcrumb": ["properties", "note"], "metadata": {"inclusion": "available"}}
                ]
            }, {
                "tap_stream_id": "customers",
                "schema": {"properties": {"id": {}}},
                "metadata": [
                    {"breadcrumb": [], "metadata": {"selected": false}}
                ]
            }]
        }))
        .unwrap()
    }

    #[test]
    fn selection_summary() {
        let catalog = sample();
        let orders = &catalog.streams[0];
        assert!(orders.is_selected());
        assert_eq!(orders.property_count(), 3);
        assert_eq!(orders.selected_properties(), vec!["id", "total"]);

        let customers = &catalog.streams[1];
        assert!(!customers.is_selected());
        assert_eq!(customers.property_count(), 1);
        assert!(customers.selected_properties().is_empty());
    }

    #[test]
    fn missing_metadata_tolerated() {
        let catalog: Catalog =
            serde_json::from_str(r#"{"streams":[{"tap_stream_id":"events"}]}"#).unwrap();
        let events = &catalog.streams[0];
        assert!(!events.is_selected());
        assert_eq!(events.property_count(), 0);
    }
}
