//! Hierarchical configuration store with change notification.
//!
//! The configuration is a JSON tree addressed by dotted paths such as
//! `snapline.tolerance`. It always equals the deep merge of every change
//! applied, in order, over [`default_config`]. `null` marks a field as
//! unset: path lookups treat a null segment as missing.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::background::BackgroundOptions;
use crate::error::ListenerResult;
use crate::merge::{deep_merge, deep_merged};
use crate::render::MountTarget;

/// Default canvas width in pixels.
pub const DEFAULT_WIDTH: f64 = 800.0;

/// Default canvas height in pixels.
pub const DEFAULT_HEIGHT: f64 = 600.0;

/// Default snapline class name.
pub const DEFAULT_SNAPLINE_CLASS: &str = "snapline";

/// Default snap distance in pixels.
pub const DEFAULT_SNAP_TOLERANCE: f64 = 5.0;

/// Errors raised by configuration mutations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A path-form set was given an empty path.
    #[error("configuration path must not be empty")]
    EmptyPath,
    /// A mapping-form set was given something other than an object.
    #[error("configuration update must be a mapping")]
    NotAMapping,
    /// A configuration section could not be read as the requested type.
    #[error("configuration section '{path}' is malformed: {source}")]
    Deserialize {
        /// Dotted path of the section.
        path: String,
        /// Underlying serde error.
        source: serde_json::Error,
    },
}

/// The fixed default template every configuration starts from.
#[must_use]
pub fn default_config() -> Value {
    json!({
        "width": DEFAULT_WIDTH,
        "height": DEFAULT_HEIGHT,
        "parent": true,
        "snapline": {
            "enable": true,
            "className": DEFAULT_SNAPLINE_CLASS,
            "tolerance": DEFAULT_SNAP_TOLERANCE,
            "resizing": true,
            "center": true
        },
        "background": {
            "color": null,
            "image": null,
            "position": null,
            "size": null,
            "repeat": null,
            "opacity": 1,
            "quality": 1,
            "angle": 0
        }
    })
}

/// Snapline options accepted at construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnaplineOptions {
    /// Show alignment guides while dragging.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable: Option<bool>,
    /// Class name given to rendered guides.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    /// Snap distance in pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<f64>,
    /// Also snap while resizing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resizing: Option<bool>,
    /// Align against the canvas center.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub center: Option<bool>,
}

/// Construction input for a graph.
///
/// Unset fields take the values of [`default_config`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphOptions {
    /// Where the rendering layer mounts the canvas. Required.
    #[serde(skip)]
    pub container: Option<MountTarget>,
    /// Canvas width in pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    /// Canvas height in pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    /// Keep nodes inside the canvas while dragging.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<bool>,
    /// Snapline overrides.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapline: Option<SnaplineOptions>,
    /// Background overrides.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<BackgroundOptions>,
}

impl GraphOptions {
    /// Options mounting into `container`, everything else defaulted.
    #[must_use]
    pub fn new(container: impl Into<MountTarget>) -> Self {
        Self {
            container: Some(container.into()),
            ..Self::default()
        }
    }

    /// The override mapping merged over the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the options cannot be serialized.
    pub fn overrides(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Typed view of the `snapline` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SnaplineConfig {
    /// Whether guides are tracked and shown.
    pub enable: bool,
    /// Class name given to rendered guides, if any.
    pub class_name: Option<String>,
    /// Snap distance in pixels.
    pub tolerance: f64,
    /// Whether resizing snaps too.
    pub resizing: bool,
    /// Whether the canvas center is a snap target.
    pub center: bool,
}

impl Default for SnaplineConfig {
    fn default() -> Self {
        Self {
            enable: true,
            class_name: Some(DEFAULT_SNAPLINE_CLASS.to_string()),
            tolerance: DEFAULT_SNAP_TOLERANCE,
            resizing: true,
            center: true,
        }
    }
}

impl SnaplineConfig {
    /// The class name guides are rendered with.
    #[must_use]
    pub fn class_name_or_default(&self) -> &str {
        match self.class_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => DEFAULT_SNAPLINE_CLASS,
        }
    }
}

/// Payload delivered to change listeners.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigChange {
    /// Configuration before the change.
    pub old_config: Value,
    /// Configuration after the change.
    pub new_config: Value,
    /// The input that caused the change.
    pub changed_config: Value,
}

/// Outcome of [`ConfigStore::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// True when no errors were found.
    pub valid: bool,
    /// Human readable problems.
    pub errors: Vec<String>,
}

type ChangeCallback = Rc<dyn Fn(&ConfigChange) -> ListenerResult>;

#[derive(Default)]
struct ChangeListeners {
    next_id: u64,
    entries: Vec<(u64, ChangeCallback)>,
}

/// Handle returned by [`ConfigStore::on_change`].
///
/// Dropping the handle keeps the listener registered.
#[derive(Debug)]
pub struct ConfigSubscription {
    id: u64,
    listeners: Weak<RefCell<ChangeListeners>>,
}

impl ConfigSubscription {
    /// Remove the listener. Returns false if it was already gone.
    pub fn unsubscribe(self) -> bool {
        let Some(listeners) = self.listeners.upgrade() else {
            return false;
        };
        let mut listeners = listeners.borrow_mut();
        let before = listeners.entries.len();
        listeners.entries.retain(|(id, _)| *id != self.id);
        listeners.entries.len() != before
    }
}

/// Hierarchical key-path configuration.
pub struct ConfigStore {
    config: Value,
    listeners: Rc<RefCell<ChangeListeners>>,
}

impl fmt::Debug for ChangeListeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeListeners")
            .field("count", &self.entries.len())
            .finish()
    }
}

impl fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigStore")
            .field("config", &self.config)
            .field("listeners", &self.listeners.borrow())
            .finish()
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(&Value::Null)
    }
}

impl ConfigStore {
    /// Create a store from the defaults deep-merged with `overrides`.
    #[must_use]
    pub fn new(overrides: &Value) -> Self {
        Self {
            config: deep_merged(&default_config(), &[overrides]),
            listeners: Rc::default(),
        }
    }

    /// The whole configuration tree.
    #[must_use]
    pub fn all(&self) -> &Value {
        &self.config
    }

    /// Look up a dotted path. An empty path yields the whole tree.
    ///
    /// Returns `None` as soon as a segment is missing or null.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Value> {
        if path.is_empty() {
            return Some(&self.config);
        }
        let mut value = &self.config;
        for segment in path.split('.') {
            let next = match value {
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => value.get(segment),
            };
            value = match next {
                None | Some(Value::Null) => return None,
                Some(next) => next,
            };
        }
        Some(value)
    }

    /// Look up a dotted path, falling back to `default`.
    #[must_use]
    pub fn get_or(&self, path: &str, default: impl Into<Value>) -> Value {
        self.get(path).cloned().unwrap_or_else(|| default.into())
    }

    /// Look up a dotted path and deserialize it.
    ///
    /// Returns `None` when the path is missing or has the wrong shape.
    #[must_use]
    pub fn get_as<T: DeserializeOwned>(&self, path: &str) -> Option<T> {
        self.get(path)
            .and_then(|value| T::deserialize(value).ok())
    }

    /// Deserialize a section, reporting malformed data.
    ///
    /// A missing section deserializes from an empty mapping so serde
    /// defaults apply.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Deserialize`] if the section has the wrong shape.
    pub fn section<T: DeserializeOwned>(&self, path: &str) -> Result<T, ConfigError> {
        let empty = Value::Object(Map::new());
        let value = self.get(path).unwrap_or(&empty);
        T::deserialize(value).map_err(|source| ConfigError::Deserialize {
            path: path.to_string(),
            source,
        })
    }

    /// Set a single value at a dotted path.
    ///
    /// Missing or non-mapping intermediate levels are replaced by empty
    /// mappings; sibling keys are kept.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyPath`] for an empty path.
    pub fn set(&mut self, path: &str, value: Value) -> Result<(), ConfigError> {
        if path.is_empty() {
            return Err(ConfigError::EmptyPath);
        }
        let old_config = self.config.clone();

        let mut segments: Vec<&str> = path.split('.').collect();
        let last = segments.pop().unwrap_or(path);
        let mut target = &mut self.config;
        for segment in segments {
            target = ensure_object(target)
                .entry(segment.to_string())
                .or_insert(Value::Null);
        }
        ensure_object(target).insert(last.to_string(), value.clone());

        let mut changed = Map::new();
        changed.insert(path.to_string(), value);
        tracing::debug!(path, "configuration value set");
        self.notify(old_config, Value::Object(changed));
        Ok(())
    }

    /// Deep-merge a partial mapping into the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotAMapping`] if `partial` is not an object.
    pub fn set_mapping(&mut self, partial: Value) -> Result<(), ConfigError> {
        if !partial.is_object() {
            return Err(ConfigError::NotAMapping);
        }
        let old_config = self.config.clone();
        deep_merge(&mut self.config, &partial);
        tracing::debug!("configuration mapping merged");
        self.notify(old_config, partial);
        Ok(())
    }

    /// Alias for [`ConfigStore::set_mapping`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotAMapping`] if `partial` is not an object.
    pub fn merge(&mut self, partial: Value) -> Result<(), ConfigError> {
        self.set_mapping(partial)
    }

    /// Discard every change and start over from the defaults merged with
    /// `preserve`.
    pub fn reset(&mut self, preserve: Option<Value>) {
        let preserve = preserve.unwrap_or_else(|| Value::Object(Map::new()));
        let old_config = std::mem::replace(
            &mut self.config,
            deep_merged(&default_config(), &[&preserve]),
        );
        tracing::debug!("configuration reset");
        self.notify(old_config, preserve);
    }

    /// Register a change listener.
    ///
    /// Listener errors are logged and never stop later listeners.
    pub fn on_change<F>(&self, callback: F) -> ConfigSubscription
    where
        F: Fn(&ConfigChange) -> ListenerResult + 'static,
    {
        let mut listeners = self.listeners.borrow_mut();
        listeners.next_id += 1;
        let id = listeners.next_id;
        listeners.entries.push((id, Rc::new(callback)));
        ConfigSubscription {
            id,
            listeners: Rc::downgrade(&self.listeners),
        }
    }

    /// Number of registered change listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().entries.len()
    }

    fn notify(&self, old_config: Value, changed_config: Value) {
        let callbacks: Vec<ChangeCallback> = self
            .listeners
            .borrow()
            .entries
            .iter()
            .map(|(_, callback)| Rc::clone(callback))
            .collect();
        if callbacks.is_empty() {
            return;
        }
        let change = ConfigChange {
            old_config,
            new_config: self.config.clone(),
            changed_config,
        };
        for callback in callbacks {
            if let Err(e) = callback(&change) {
                tracing::error!("Error in config change callback: {e}");
            }
        }
    }

    /// Check the configuration without changing it.
    #[must_use]
    pub fn validate(&self) -> ValidationReport {
        let mut errors = Vec::new();

        let positive = |path: &str| {
            self.get(path)
                .and_then(Value::as_f64)
                .is_some_and(|v| v > 0.0)
        };
        if !(positive("width") && positive("height")) {
            errors.push("Width and height must be positive numbers".to_string());
        }

        match self.get("snapline.tolerance").and_then(Value::as_f64) {
            Some(tolerance) if tolerance >= 0.0 => {}
            _ => errors.push("Snapline tolerance must be a non-negative number".to_string()),
        }

        if let Some(opacity) = self.get("background.opacity") {
            match opacity.as_f64() {
                Some(o) if (0.0..=1.0).contains(&o) => {}
                _ => errors.push("Background opacity must be between 0 and 1".to_string()),
            }
        }

        ValidationReport {
            valid: errors.is_empty(),
            errors,
        }
    }

    /// A plain-data snapshot with unset (null) fields dropped.
    #[must_use]
    pub fn to_json(&self) -> Value {
        strip_unset(&self.config)
    }

    /// Canvas width in pixels.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.get("width")
            .and_then(Value::as_f64)
            .unwrap_or(DEFAULT_WIDTH)
    }

    /// Canvas height in pixels.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.get("height")
            .and_then(Value::as_f64)
            .unwrap_or(DEFAULT_HEIGHT)
    }

    /// Whether nodes are confined to the canvas.
    #[must_use]
    pub fn parent(&self) -> bool {
        self.get("parent")
            .and_then(Value::as_bool)
            .unwrap_or(true)
    }

    /// Typed snapline section.
    ///
    /// Each field is read on its own: a malformed field falls back to its
    /// default without touching the others. An unset or malformed class
    /// name reads as `None`.
    #[must_use]
    pub fn snapline(&self) -> SnaplineConfig {
        let defaults = SnaplineConfig::default();
        SnaplineConfig {
            enable: self.field_or("snapline.enable", defaults.enable),
            class_name: self.field_or("snapline.className", None),
            tolerance: self.field_or("snapline.tolerance", defaults.tolerance),
            resizing: self.field_or("snapline.resizing", defaults.resizing),
            center: self.field_or("snapline.center", defaults.center),
        }
    }

    fn field_or<T: DeserializeOwned>(&self, path: &str, fallback: T) -> T {
        let Some(value) = self.get(path) else {
            return fallback;
        };
        T::deserialize(value).unwrap_or_else(|e| {
            tracing::warn!(path, "{e}; using default");
            fallback
        })
    }
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just replaced by a mapping"),
    }
}

fn strip_unset(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), strip_unset(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(strip_unset).collect()),
        other => other.clone(),
    }
}
