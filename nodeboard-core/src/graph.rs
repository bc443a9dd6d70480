//! The graph engine: node collection, type registry, snap guides and
//! background, tied together by the event bus and configuration store.
//!
//! ## Lifecycle events
//!
//! | Event               | Payload                          | Cancellable |
//! |---------------------|----------------------------------|-------------|
//! | `initialized`       | `container, width, height`       | no          |
//! | `node:beforeadd`    | `node, options`                  | yes         |
//! | `node:add`          | `node, index`                    | no          |
//! | `cell:add`          | `cell, index`                    | no          |
//! | `node:beforeupdate` | `node, oldNode, updates`         | yes         |
//! | `node:update`       | `node, oldNode, updates`         | no          |
//! | `node:beforeremove` | `node`                           | yes         |
//! | `node:remove`       | `node, index`                    | no          |
//! | `cell:remove`       | `cell, index`                    | no          |
//! | `config:change`     | `oldConfig, newConfig, changedConfig` | no     |
//! | `beforedestroy`     | -                                | yes         |
//! | `destroy`           | `nodes, registeredNodes`         | no          |
//!
//! A "before" event is cancelled when any listener calls
//! [`Event::stop_propagation`](crate::Event::stop_propagation).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::background::{cleared_background, BackgroundConfig, BackgroundOptions, BackgroundStyle};
use crate::bus::{Callback, EventBus, ListenOptions, ListenerId};
use crate::config::{ConfigError, ConfigStore, GraphOptions};
use crate::interaction::{InteractionEvent, WidgetProps};
use crate::merge::deep_merge;
use crate::node::{AddNodeOptions, Node, NodeDefaults};
use crate::render::{Component, MountTarget, Renderer, DEFAULT_SNAPLINE_STYLE};
use crate::snapline::{overlay_lines, GuideOverlay, SnaplineData};
use crate::{GraphError, GraphResult};

static GRAPH_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Options for registering a node type.
#[derive(Debug, Clone, Default)]
pub struct RegisterOptions {
    /// Renderable for nodes of this type. Required.
    pub component: Option<Component>,
    /// Default X position (0 when unset).
    pub x: Option<f64>,
    /// Default Y position (0 when unset).
    pub y: Option<f64>,
    /// Default width (100 when unset).
    pub width: Option<f64>,
    /// Default height (100 when unset).
    pub height: Option<f64>,
    /// Extra fields stored with the defaults.
    pub extra: Map<String, Value>,
}

impl RegisterOptions {
    /// Register `component` with default geometry.
    #[must_use]
    pub fn new(component: Component) -> Self {
        Self {
            component: Some(component),
            ..Self::default()
        }
    }

    /// Default size for new nodes.
    #[must_use]
    pub fn sized(mut self, width: f64, height: f64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Default position for new nodes.
    #[must_use]
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }
}

/// A registered node type.
#[derive(Debug, Clone)]
pub struct NodeType {
    /// Renderable handed to the rendering layer.
    pub component: Component,
    /// Geometry consulted when a node of this type is added.
    pub defaults: NodeDefaults,
}

/// The canvas state engine.
pub struct Graph {
    id: String,
    container: MountTarget,
    config: ConfigStore,
    bus: EventBus,
    registry: HashMap<String, NodeType>,
    nodes: Vec<Node>,
    node_id_counter: u64,
    snapline_data: SnaplineData,
    background_style: BackgroundStyle,
    renderer: Option<Box<dyn Renderer>>,
    default_snapline_style_added: bool,
    destroyed: bool,
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("id", &self.id)
            .field("container", &self.container)
            .field("nodes", &self.nodes)
            .field("registered", &self.registry.keys().collect::<Vec<_>>())
            .field("mounted", &self.renderer.is_some())
            .field("destroyed", &self.destroyed)
            .finish_non_exhaustive()
    }
}

impl Graph {
    /// Create a headless graph.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::MissingContainer`] without a mount target.
    pub fn new(options: GraphOptions) -> GraphResult<Self> {
        Self::build(options, None)
    }

    /// Create a graph and mount `renderer` into its container.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::MissingContainer`] without a mount target.
    pub fn with_renderer(options: GraphOptions, renderer: Box<dyn Renderer>) -> GraphResult<Self> {
        Self::build(options, Some(renderer))
    }

    fn build(options: GraphOptions, renderer: Option<Box<dyn Renderer>>) -> GraphResult<Self> {
        let container = options.container.clone().ok_or(GraphError::MissingContainer)?;
        let config = ConfigStore::new(&options.overrides()?);
        let bus = EventBus::new();

        let forward = bus.clone();
        config.on_change(move |change| {
            forward.trigger("config:change", serde_json::to_value(change)?);
            Ok(())
        });

        let id = format!("graph-{}", GRAPH_COUNTER.fetch_add(1, Ordering::Relaxed) + 1);
        let mut context = Map::new();
        context.insert("graph".to_string(), json!(id));
        context.insert("container".to_string(), json!(container));
        bus.set_context(context);

        let mut graph = Self {
            id,
            container,
            config,
            bus,
            registry: HashMap::new(),
            nodes: Vec::new(),
            node_id_counter: 0,
            snapline_data: SnaplineData::cleared(),
            background_style: BackgroundStyle::default(),
            renderer,
            default_snapline_style_added: false,
            destroyed: false,
        };
        graph.init()?;
        Ok(graph)
    }

    fn init(&mut self) -> GraphResult<()> {
        let (width, height) = (self.config.width(), self.config.height());

        let class_name = self.config.snapline().class_name;
        if class_name.as_deref().unwrap_or_default().is_empty() {
            self.add_default_snapline_style();
        }

        self.bus.trigger(
            "initialized",
            json!({"container": self.container, "width": width, "height": height}),
        );

        if let Some(renderer) = self.renderer.as_mut() {
            renderer.mount(&self.container, width, height);
        }
        tracing::info!(graph = %self.id, container = %self.container, width, height, "Graph mounted");

        if self.config.get("background").is_some() {
            self.apply_background()?;
        }
        Ok(())
    }

    fn add_default_snapline_style(&mut self) {
        if self.default_snapline_style_added {
            return;
        }
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.install_default_snapline_style(DEFAULT_SNAPLINE_STYLE);
        }
        self.default_snapline_style_added = true;
    }

    /// Identifier of this graph, also present in every event as `graph`.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The container the graph is mounted into.
    #[must_use]
    pub fn container(&self) -> &MountTarget {
        &self.container
    }

    /// Whether the default snapline stylesheet was requested.
    #[must_use]
    pub fn uses_default_snapline_style(&self) -> bool {
        self.default_snapline_style_added
    }

    /// Whether a renderer is currently mounted.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.renderer.is_some()
    }

    /// Whether [`Graph::destroy`] completed.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    /// The configuration store.
    #[must_use]
    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    /// Mutable access to the configuration store.
    ///
    /// Changes are re-dispatched as `config:change`.
    pub fn config_mut(&mut self) -> &mut ConfigStore {
        &mut self.config
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// A handle to the event bus. Clones share listeners with the graph.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.bus
    }

    /// Register a listener. See [`EventBus::on`].
    pub fn on(
        &self,
        event_name: &str,
        callback: impl Into<Callback>,
        options: ListenOptions,
    ) -> ListenerId {
        self.bus.on(event_name, callback, options)
    }

    /// Register a one-shot listener. See [`EventBus::once`].
    pub fn once(&self, event_name: &str, callback: impl Into<Callback>) -> ListenerId {
        self.bus.once(event_name, callback)
    }

    /// Remove listeners by name. See [`EventBus::off`].
    pub fn off(&self, event_name: &str) {
        self.bus.off(event_name);
    }

    /// Remove listeners by callback. See [`EventBus::off_callback`].
    pub fn off_callback(&self, event_name: &str, callback: &Callback) {
        self.bus.off_callback(event_name, callback);
    }

    /// Remove one listener by id. See [`EventBus::off_id`].
    pub fn off_id(&self, id: ListenerId) -> bool {
        self.bus.off_id(id)
    }

    /// Dispatch an event. See [`EventBus::trigger`].
    pub fn trigger(&self, event_name: &str, data: Value) -> bool {
        self.bus.trigger(event_name, data)
    }

    // ------------------------------------------------------------------
    // Registry
    // ------------------------------------------------------------------

    /// Register (or re-register) a node type.
    ///
    /// Re-registering replaces the renderable and the defaults used by
    /// future adds; live nodes keep their geometry.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::MissingComponent`] without a component.
    pub fn register_node(&mut self, name: &str, options: RegisterOptions) -> GraphResult<()> {
        let component = options.component.ok_or(GraphError::MissingComponent)?;
        let defaults = NodeDefaults {
            x: options.x.unwrap_or(0.0),
            y: options.y.unwrap_or(0.0),
            width: options.width.unwrap_or(crate::node::DEFAULT_NODE_WIDTH),
            height: options.height.unwrap_or(crate::node::DEFAULT_NODE_HEIGHT),
            extra: options.extra,
        };
        tracing::debug!(name, ?defaults, "node type registered");
        self.registry
            .insert(name.to_string(), NodeType { component, defaults });
        Ok(())
    }

    /// A registered node type.
    #[must_use]
    pub fn node_type(&self, name: &str) -> Option<&NodeType> {
        self.registry.get(name)
    }

    /// Names of all registered node types.
    pub fn registered_types(&self) -> impl Iterator<Item = &str> {
        self.registry.keys().map(String::as_str)
    }

    // ------------------------------------------------------------------
    // Nodes
    // ------------------------------------------------------------------

    /// Add a node.
    ///
    /// Returns `Ok(None)` when a `node:beforeadd` listener cancelled it.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::MissingComponent`] without a component,
    /// [`GraphError::UnregisteredType`] for an unknown type and
    /// [`GraphError::DuplicateNodeId`] when the explicit id is taken.
    pub fn add_node(&mut self, options: AddNodeOptions) -> GraphResult<Option<Node>> {
        let component = options
            .component
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or(GraphError::MissingComponent)?;
        let Some(defaults) = self.registry.get(component).map(|t| t.defaults.clone()) else {
            return Err(GraphError::UnregisteredType(component.to_string()));
        };

        let id = match options.id.as_deref() {
            Some(id) if !id.is_empty() => {
                if self.index_of(id).is_some() {
                    return Err(GraphError::DuplicateNodeId(id.to_string()));
                }
                id.to_string()
            }
            _ => self.next_node_id(),
        };
        let node = Node::new(id, component, &options, &defaults);

        let payload = json!({"node": node.to_json(), "options": serde_json::to_value(&options)?});
        if self.bus.trigger("node:beforeadd", payload) {
            tracing::warn!(node = %node.id, "add cancelled by node:beforeadd listener");
            return Ok(None);
        }

        self.nodes.push(node.clone());
        let index = self.nodes.len() - 1;
        tracing::debug!(node = %node.id, index, "node added");

        self.bus
            .trigger("node:add", json!({"node": node.to_json(), "index": index}));
        self.bus
            .trigger("cell:add", json!({"cell": node.to_json(), "index": index}));
        Ok(Some(node))
    }

    fn next_node_id(&mut self) -> String {
        loop {
            self.node_id_counter += 1;
            let candidate = format!("node-{}", self.node_id_counter);
            if self.index_of(&candidate).is_none() {
                return candidate;
            }
        }
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|node| node.id == id)
    }

    /// A live node.
    #[must_use]
    pub fn get_node_by_id(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// All live nodes in insertion order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Number of live nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Deep-merge `updates` into a node.
    ///
    /// Unknown ids are ignored. A `node:beforeupdate` listener may cancel.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidUpdate`] if the update is not a mapping,
    /// changes the id, or yields an ill-typed node. The node is untouched.
    pub fn update_node_by_id(&mut self, id: &str, updates: impl Into<Value>) -> GraphResult<()> {
        let Some(index) = self.index_of(id) else {
            tracing::trace!(node = id, "update ignored, no such node");
            return Ok(());
        };
        let updates = updates.into();
        let old_node = self.nodes[index].clone();
        let updated = old_node.merged_with(&updates)?;

        let before = json!({
            "node": old_node.to_json(),
            "oldNode": old_node.to_json(),
            "updates": updates,
        });
        if self.bus.trigger("node:beforeupdate", before) {
            tracing::warn!(node = id, "update cancelled by node:beforeupdate listener");
            return Ok(());
        }

        // listeners cannot touch the collection, so the index is still valid
        self.nodes[index] = updated;
        tracing::trace!(node = id, "node updated");

        self.bus.trigger(
            "node:update",
            json!({
                "node": self.nodes[index].to_json(),
                "oldNode": old_node.to_json(),
                "updates": updates,
            }),
        );
        Ok(())
    }

    /// Remove a node, keeping the order of the others.
    ///
    /// Unknown ids are ignored. A `node:beforeremove` listener may cancel.
    /// Returns the removed node.
    pub fn remove_node_by_id(&mut self, id: &str) -> Option<Node> {
        let index = self.index_of(id)?;
        if self
            .bus
            .trigger("node:beforeremove", json!({"node": self.nodes[index].to_json()}))
        {
            tracing::warn!(node = id, "remove cancelled by node:beforeremove listener");
            return None;
        }

        let node = self.nodes.remove(index);
        tracing::debug!(node = id, index, "node removed");

        self.bus
            .trigger("node:remove", json!({"node": node.to_json(), "index": index}));
        self.bus
            .trigger("cell:remove", json!({"cell": node.to_json(), "index": index}));
        Some(node)
    }

    // ------------------------------------------------------------------
    // Interaction and snap guides
    // ------------------------------------------------------------------

    /// Props fed to the widget wrapping a node.
    #[must_use]
    pub fn widget_props(&self, id: &str) -> Option<WidgetProps> {
        let node = self.get_node_by_id(id)?;
        Some(WidgetProps {
            x: node.x,
            y: node.y,
            w: node.width,
            h: node.height,
            parent: self.config.parent(),
            snapline: self.config.snapline(),
        })
    }

    /// Apply a widget callback for node `id`.
    ///
    /// Drag and resize events update the node; their `*Stop` variants
    /// then clear the guides. Guide geometry is ingested only while
    /// snaplines are enabled.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`Graph::update_node_by_id`].
    pub fn handle_interaction(&mut self, id: &str, event: &InteractionEvent) -> GraphResult<()> {
        if let InteractionEvent::RefLineParams(data) = event {
            if self.config.snapline().enable {
                self.process_snapline_data(data.clone());
            } else {
                tracing::warn!(node = id, "guide data ignored, snaplines disabled");
            }
            return Ok(());
        }
        if let Some(update) = event.geometry_update() {
            self.update_node_by_id(id, update)?;
        }
        if event.ends_interaction() {
            self.clear_snaplines();
        }
        Ok(())
    }

    /// Replace the guides and enforce center priority.
    pub fn process_snapline_data(&mut self, data: SnaplineData) {
        self.snapline_data = data;
        self.snapline_data.enforce_center_priority();
    }

    /// Hide all six guides.
    pub fn clear_snaplines(&mut self) {
        self.snapline_data = SnaplineData::cleared();
    }

    /// Current guides.
    #[must_use]
    pub fn snapline_data(&self) -> &SnaplineData {
        &self.snapline_data
    }

    /// Guides to draw; empty while snaplines are disabled.
    #[must_use]
    pub fn guide_overlay(&self) -> Vec<GuideOverlay> {
        let snapline = self.config.snapline();
        if !snapline.enable {
            return Vec::new();
        }
        overlay_lines(
            &self.snapline_data,
            snapline.class_name_or_default(),
            self.config.width(),
            self.config.height(),
        )
    }

    // ------------------------------------------------------------------
    // Background
    // ------------------------------------------------------------------

    /// Merge `options` into the background section and derive its style.
    ///
    /// # Errors
    ///
    /// Returns an error if the merged section is malformed. The
    /// configuration and the current style are then left unchanged.
    pub fn draw_background(&mut self, options: &BackgroundOptions) -> GraphResult<BackgroundStyle> {
        let mut background = self
            .config
            .get("background")
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));
        deep_merge(&mut background, &serde_json::to_value(options)?);
        let config = BackgroundConfig::deserialize(&background).map_err(|source| {
            ConfigError::Deserialize {
                path: "background".to_string(),
                source,
            }
        })?;

        self.config.set("background", background)?;
        let style = BackgroundStyle::from_config(&config);
        self.paint(&style);
        Ok(style)
    }

    /// Reset the background section and derive the "no background" style.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be written.
    pub fn clear_background(&mut self) -> GraphResult<BackgroundStyle> {
        self.config.set("background", cleared_background())?;
        let style = BackgroundStyle::cleared();
        self.paint(&style);
        Ok(style)
    }

    /// The most recently derived background style.
    #[must_use]
    pub fn background_style(&self) -> &BackgroundStyle {
        &self.background_style
    }

    fn apply_background(&mut self) -> GraphResult<BackgroundStyle> {
        let config: BackgroundConfig = self.config.section("background")?;
        let style = BackgroundStyle::from_config(&config);
        self.paint(&style);
        Ok(style)
    }

    fn paint(&mut self, style: &BackgroundStyle) {
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.paint_background(style);
        }
        self.background_style = style.clone();
    }

    // ------------------------------------------------------------------
    // Teardown
    // ------------------------------------------------------------------

    /// Tear the graph down unless a `beforedestroy` listener cancels.
    ///
    /// Returns whether teardown happened.
    pub fn destroy(&mut self) -> bool {
        if self.bus.trigger("beforedestroy", Value::Null) {
            tracing::warn!(graph = %self.id, "destroy cancelled by beforedestroy listener");
            return false;
        }

        let nodes: Vec<Value> = self.nodes.iter().map(Node::to_json).collect();
        let registered: Map<String, Value> = self
            .registry
            .iter()
            .map(|(name, node_type)| {
                let defaults = serde_json::to_value(&node_type.defaults).unwrap_or_default();
                (name.clone(), defaults)
            })
            .collect();
        self.bus.trigger(
            "destroy",
            json!({"nodes": nodes, "registeredNodes": registered}),
        );

        if let Some(mut renderer) = self.renderer.take() {
            renderer.unmount();
        }
        self.nodes.clear();
        self.registry.clear();
        self.bus.clear();
        self.destroyed = true;
        tracing::info!(graph = %self.id, "Graph destroyed");
        true
    }
}
