//! # Nodeboard Core
//!
//! State and event engine for node-based visual canvases.
//! Holds the nodes, the node type registry, the configuration and the snap
//! guides, and tells the outside world about every change through a
//! namespaced event bus. Rendering is left to a [`Renderer`] implementation.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                    Graph                    │
//! ├─────────────────────────────────────────────┤
//! │  Registry        │  Nodes                   │
//! │  - Node types    │  - Add / update / remove │
//! │  - Defaults      │  - Interaction callbacks │
//! ├─────────────────────────────────────────────┤
//! │  ConfigStore     │  EventBus                │
//! │  - Dotted paths  │  - Namespaces            │
//! │  - Deep merge    │  - Cancellation          │
//! ├─────────────────────────────────────────────┤
//! │  Snaplines       │  Background              │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use nodeboard_core::{AddNodeOptions, Component, Graph, GraphOptions, RegisterOptions};
//!
//! let mut graph = Graph::new(GraphOptions::new("#app")).unwrap();
//! graph
//!     .register_node("box", RegisterOptions::new(Component::new("box")))
//!     .unwrap();
//! let node = graph.add_node(AddNodeOptions::new("box")).unwrap().unwrap();
//! assert_eq!(node.id, "node-1");
//! assert_eq!(node.size(), (100.0, 100.0));
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod background;
pub mod bus;
pub mod config;
pub mod error;
pub mod graph;
pub mod interaction;
pub mod merge;
pub mod node;
pub mod render;
pub mod snapline;

pub use background::{
    BackgroundConfig, BackgroundOptions, BackgroundPosition, BackgroundSize, BackgroundStyle,
};
pub use bus::{Callback, Event, EventBus, ListenOptions, ListenerId, ListenerInfo};
pub use config::{
    ConfigChange, ConfigError, ConfigStore, ConfigSubscription, GraphOptions, SnaplineConfig,
    SnaplineOptions, ValidationReport,
};
pub use error::{GraphError, GraphResult, ListenerError, ListenerResult};
pub use graph::{Graph, NodeType, RegisterOptions};
pub use interaction::{DragPosition, InteractionEvent, ResizeBounds, WidgetProps};
pub use node::{AddNodeOptions, Node, NodeDefaults, NodeUpdate};
pub use render::{Component, MountTarget, RecordingRenderer, RenderCall, Renderer};
pub use snapline::{GuideOverlay, Orientation, SnapLine, SnaplineData};

/// Nodeboard core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
