//! Script model and replay.

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Context;
use nodeboard_core::{
    AddNodeOptions, BackgroundOptions, BackgroundStyle, Component, Event, Graph, GraphOptions,
    GuideOverlay, InteractionEvent, ListenOptions, MountTarget, Node, RecordingRenderer,
    RegisterOptions, RenderCall, SnaplineData, ValidationReport,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Events copied into [`Report::events`].
pub const RECORDED_EVENTS: &[&str] = &[
    "node:beforeadd",
    "node:add",
    "node:beforeupdate",
    "node:update",
    "node:beforeremove",
    "node:remove",
    "config:change",
    "beforedestroy",
    "destroy",
];

/// A script: construction options plus the steps to replay.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Script {
    /// Graph options; the container comes from the command line.
    #[serde(default)]
    pub options: GraphOptions,
    /// Operations, applied in order.
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// One scripted operation.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Step {
    /// Register a node type.
    Register {
        /// Type name.
        name: String,
        /// Default X position.
        #[serde(default)]
        x: Option<f64>,
        /// Default Y position.
        #[serde(default)]
        y: Option<f64>,
        /// Default width.
        #[serde(default)]
        width: Option<f64>,
        /// Default height.
        #[serde(default)]
        height: Option<f64>,
        /// Extra registration fields.
        #[serde(default)]
        extra: Map<String, Value>,
    },
    /// Add a node.
    Add(AddNodeOptions),
    /// Deep-merge an update into a node.
    Update {
        /// Node id.
        id: String,
        /// Partial node mapping.
        updates: Value,
    },
    /// Remove a node.
    Remove {
        /// Node id.
        id: String,
    },
    /// Feed a widget callback for a node.
    Interact {
        /// Node id.
        id: String,
        /// The widget callback.
        event: InteractionEvent,
    },
    /// Draw a background.
    Background(BackgroundOptions),
    /// Reset the background.
    ClearBackground,
    /// Change the configuration: `path` + `value`, or a mapping in `value`.
    Config {
        /// Dotted path; absent to merge `value` as a mapping.
        #[serde(default)]
        path: Option<String>,
        /// New value or partial mapping.
        value: Value,
    },
    /// Cancel the next occurrence of a "before" event.
    Veto {
        /// Event name, e.g. `node:beforeremove`.
        event: String,
    },
    /// Tear the graph down.
    Destroy,
}

impl Step {
    /// The `op` tag of this step.
    #[must_use]
    pub fn op(&self) -> &'static str {
        match self {
            Self::Register { .. } => "register",
            Self::Add(_) => "add",
            Self::Update { .. } => "update",
            Self::Remove { .. } => "remove",
            Self::Interact { .. } => "interact",
            Self::Background(_) => "background",
            Self::ClearBackground => "clearBackground",
            Self::Config { .. } => "config",
            Self::Veto { .. } => "veto",
            Self::Destroy => "destroy",
        }
    }
}

/// State of the graph after a replay.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Graph identifier.
    pub graph: String,
    /// Live nodes in insertion order.
    pub nodes: Vec<Node>,
    /// Current snap guides.
    pub snaplines: SnaplineData,
    /// Guides the rendering layer would draw.
    pub guides: Vec<GuideOverlay>,
    /// Current background style.
    pub background: BackgroundStyle,
    /// Configuration with unset fields dropped.
    pub config: Value,
    /// Validation of the final configuration.
    pub validation: ValidationReport,
    /// Every recorded event, in dispatch order.
    pub events: Vec<Value>,
    /// Every call the renderer received.
    pub render_calls: Vec<RenderCall>,
    /// Whether the graph was destroyed.
    pub destroyed: bool,
}

/// Replay `script` against a graph mounted into `container`.
///
/// # Errors
///
/// Returns an error if the graph cannot be created or a step fails.
/// Steps after the failing one are not applied.
pub fn run_script(script: &Script, container: &str) -> anyhow::Result<Report> {
    let recorder = RecordingRenderer::new();
    let options = GraphOptions {
        container: Some(MountTarget::new(container)),
        ..script.options.clone()
    };
    let mut graph = Graph::with_renderer(options, Box::new(recorder.clone()))
        .context("failed to create graph")?;
    let events = record_events(&graph);

    for (index, step) in script.steps.iter().enumerate() {
        tracing::debug!(step = index + 1, op = step.op(), "applying step");
        apply(&mut graph, step)
            .with_context(|| format!("step {} ({}) failed", index + 1, step.op()))?;
    }

    let events = events.borrow().clone();
    tracing::info!(
        nodes = graph.node_count(),
        events = events.len(),
        "Script replayed"
    );
    Ok(Report {
        graph: graph.id().to_string(),
        nodes: graph.nodes().to_vec(),
        snaplines: graph.snapline_data().clone(),
        guides: graph.guide_overlay(),
        background: graph.background_style().clone(),
        config: graph.config().to_json(),
        validation: graph.config().validate(),
        events,
        render_calls: recorder.calls(),
        destroyed: graph.is_destroyed(),
    })
}

fn record_events(graph: &Graph) -> Rc<RefCell<Vec<Value>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    for name in RECORDED_EVENTS {
        let sink = Rc::clone(&log);
        graph.on(
            name,
            move |event: &Event| {
                sink.borrow_mut().push(Value::Object(event.fields().clone()));
                Ok(())
            },
            ListenOptions::default(),
        );
    }
    log
}

fn apply(graph: &mut Graph, step: &Step) -> anyhow::Result<()> {
    match step {
        Step::Register {
            name,
            x,
            y,
            width,
            height,
            extra,
        } => {
            let options = RegisterOptions {
                component: Some(Component::new(name.clone())),
                x: *x,
                y: *y,
                width: *width,
                height: *height,
                extra: extra.clone(),
            };
            graph.register_node(name, options)?;
        }
        Step::Add(options) => {
            if graph.add_node(options.clone())?.is_none() {
                tracing::info!("add was cancelled");
            }
        }
        Step::Update { id, updates } => graph.update_node_by_id(id, updates.clone())?,
        Step::Remove { id } => {
            if graph.remove_node_by_id(id).is_none() {
                tracing::info!(node = %id, "nothing removed");
            }
        }
        Step::Interact { id, event } => graph.handle_interaction(id, event)?,
        Step::Background(options) => {
            graph.draw_background(options)?;
        }
        Step::ClearBackground => {
            graph.clear_background()?;
        }
        Step::Config {
            path: Some(path),
            value,
        } => graph.config_mut().set(path, value.clone())?,
        Step::Config { path: None, value } => graph.config_mut().set_mapping(value.clone())?,
        Step::Veto { event } => {
            graph.once(event, |event: &Event| {
                event.stop_propagation();
                Ok(())
            });
        }
        Step::Destroy => {
            if !graph.destroy() {
                tracing::info!("destroy was cancelled");
            }
        }
    }
    Ok(())
}
