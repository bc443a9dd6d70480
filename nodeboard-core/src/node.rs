//! Canvas nodes - positioned, sized, typed items owned by a graph.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::merge::deep_merge;
use crate::{GraphError, GraphResult};

/// Default width for node types registered without one.
pub const DEFAULT_NODE_WIDTH: f64 = 100.0;

/// Default height for node types registered without one.
pub const DEFAULT_NODE_HEIGHT: f64 = 100.0;

/// Default geometry registered for a node type.
///
/// Extra registration fields are kept alongside for the rendering layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDefaults {
    /// Default X position.
    pub x: f64,
    /// Default Y position.
    pub y: f64,
    /// Default width.
    pub width: f64,
    /// Default height.
    pub height: f64,
    /// Any other registration fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for NodeDefaults {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: DEFAULT_NODE_WIDTH,
            height: DEFAULT_NODE_HEIGHT,
            extra: Map::new(),
        }
    }
}

/// Options for adding a node. Unset geometry falls back to the type defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddNodeOptions {
    /// Explicit id; generated when absent or empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Registered type name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    /// X position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    /// Y position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    /// Width.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    /// Height.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    /// Payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
}

impl AddNodeOptions {
    /// Options for a node of the given type.
    #[must_use]
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: Some(component.into()),
            ..Self::default()
        }
    }

    /// Use an explicit id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Place the node.
    #[must_use]
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    /// Size the node.
    #[must_use]
    pub fn sized(mut self, width: f64, height: f64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Attach a payload.
    #[must_use]
    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = Some(data);
        self
    }
}

/// Partial geometry/payload update.
///
/// Converts into the JSON mapping accepted by
/// [`Graph::update_node_by_id`](crate::Graph::update_node_by_id).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeUpdate {
    /// New X position.
    pub x: Option<f64>,
    /// New Y position.
    pub y: Option<f64>,
    /// New width.
    pub width: Option<f64>,
    /// New height.
    pub height: Option<f64>,
    /// Payload fields, deep-merged into the existing payload.
    pub data: Option<Map<String, Value>>,
}

impl NodeUpdate {
    /// Move to a position.
    #[must_use]
    pub fn position(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }

    /// Move and resize.
    #[must_use]
    pub fn bounds(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            width: Some(width),
            height: Some(height),
            data: None,
        }
    }
}

impl From<NodeUpdate> for Value {
    fn from(update: NodeUpdate) -> Self {
        let mut map = Map::new();
        let fields = [
            ("x", update.x),
            ("y", update.y),
            ("width", update.width),
            ("height", update.height),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                map.insert(key.to_string(), json!(value));
            }
        }
        if let Some(data) = update.data {
            map.insert("data".to_string(), Value::Object(data));
        }
        Value::Object(map)
    }
}

/// A canvas node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier within the graph.
    pub id: String,
    /// Registered type name.
    pub component: String,
    /// X position (pixels from left).
    pub x: f64,
    /// Y position (pixels from top).
    pub y: f64,
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
    /// Arbitrary payload.
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl Node {
    /// Build a node from explicit options, falling back to type defaults.
    ///
    /// An explicit `0` is a real value, not "unset".
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        component: impl Into<String>,
        options: &AddNodeOptions,
        defaults: &NodeDefaults,
    ) -> Self {
        Self {
            id: id.into(),
            component: component.into(),
            x: options.x.unwrap_or(defaults.x),
            y: options.y.unwrap_or(defaults.y),
            width: options.width.unwrap_or(defaults.width),
            height: options.height.unwrap_or(defaults.height),
            data: options.data.clone().unwrap_or_default(),
        }
    }

    /// Current position.
    #[must_use]
    pub fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    /// Move the node.
    pub fn set_position(&mut self, x: f64, y: f64) -> &mut Self {
        self.x = x;
        self.y = y;
        self
    }

    /// Current size.
    #[must_use]
    pub fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    /// Resize the node.
    pub fn set_size(&mut self, width: f64, height: f64) -> &mut Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set one payload field.
    pub fn set_data(&mut self, key: impl Into<String>, value: Value) -> &mut Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Assign several payload fields, replacing each one wholesale.
    pub fn assign_data(&mut self, fields: Map<String, Value>) -> &mut Self {
        self.data.extend(fields);
        self
    }

    /// One payload field.
    #[must_use]
    pub fn data_value(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// The whole payload.
    #[must_use]
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// JSON form `{id, component, x, y, width, height, data}`.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "component": self.component,
            "x": self.x,
            "y": self.y,
            "width": self.width,
            "height": self.height,
            "data": self.data,
        })
    }

    /// This node with `updates` deep-merged in. `self` is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidUpdate`] if `updates` is not a mapping,
    /// tries to change the id, or produces an ill-typed node.
    pub fn merged_with(&self, updates: &Value) -> GraphResult<Self> {
        if !updates.is_object() {
            return Err(GraphError::InvalidUpdate(
                "updates must be a mapping".to_string(),
            ));
        }
        let mut merged = self.to_json();
        deep_merge(&mut merged, updates);
        if merged.get("id").and_then(Value::as_str) != Some(self.id.as_str()) {
            return Err(GraphError::InvalidUpdate(format!(
                "id of node '{}' cannot change",
                self.id
            )));
        }
        serde_json::from_value(merged).map_err(|e| GraphError::InvalidUpdate(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Node {
        let options = AddNodeOptions::new("box").with_data(
            json!({"a": 1, "b": {"c": 2}})
                .as_object()
                .cloned()
                .unwrap_or_default(),
        );
        Node::new("node-1", "box", &options, &NodeDefaults::default())
    }

    #[test]
    fn test_defaults_fill_unset_geometry() {
        let defaults = NodeDefaults {
            x: 5.0,
            width: 40.0,
            ..NodeDefaults::default()
        };
        let options = AddNodeOptions::new("box").at(0.0, 7.0);
        let node = Node::new("n", "box", &options, &defaults);
        assert_eq!(node.position(), (0.0, 7.0));
        assert_eq!(node.size(), (40.0, DEFAULT_NODE_HEIGHT));
        assert!(node.data().is_empty());
    }

    #[test]
    fn test_explicit_zero_size_is_kept() {
        let options = AddNodeOptions::new("box").sized(0.0, 0.0);
        let node = Node::new("n", "box", &options, &NodeDefaults::default());
        assert_eq!(node.size(), (0.0, 0.0));
    }

    #[test]
    fn test_partial_update_keeps_nested_fields() {
        let node = sample();
        let updated = node
            .merged_with(&json!({"data": {"b": {"d": 3}}}))
            .expect("valid update");
        assert_eq!(
            Value::Object(updated.data.clone()),
            json!({"a": 1, "b": {"c": 2, "d": 3}})
        );
        assert_eq!(updated.size(), node.size());
        // original untouched
        assert_eq!(node.data_value("b"), Some(&json!({"c": 2})));
    }

    #[test]
    fn test_invalid_updates_are_rejected() {
        let node = sample();
        assert!(matches!(
            node.merged_with(&json!({"x": "left"})),
            Err(GraphError::InvalidUpdate(_))
        ));
        assert!(matches!(
            node.merged_with(&json!({"id": "other"})),
            Err(GraphError::InvalidUpdate(_))
        ));
        assert!(matches!(
            node.merged_with(&json!(3)),
            Err(GraphError::InvalidUpdate(_))
        ));
    }

    #[test]
    fn test_node_update_into_value() {
        let value: Value = NodeUpdate::position(50.0, 20.0).into();
        assert_eq!(value, json!({"x": 50.0, "y": 20.0}));
    }

    #[test]
    fn test_data_helpers() {
        let mut node = sample();
        node.set_data("label", json!("hello"))
            .set_position(3.0, 4.0)
            .set_size(10.0, 20.0);
        let mut fields = Map::new();
        fields.insert("b".to_string(), json!(null));
        node.assign_data(fields);
        assert_eq!(node.data_value("label"), Some(&json!("hello")));
        assert_eq!(node.data_value("b"), Some(&Value::Null));
        assert_eq!(node.to_json()["x"], json!(3.0));
    }
}
