//! Seam to the rendering layer that turns graph state into pixels.
//!
//! The engine never paints anything itself. It mounts a [`Renderer`] on
//! construction, hands it derived presentational output, and unmounts it
//! on teardown. Without a renderer the graph runs headless.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::background::BackgroundStyle;

/// Stylesheet the rendering layer installs when no snapline class is configured.
pub const DEFAULT_SNAPLINE_STYLE: &str = ".snapline {\n  background-color: #5cb85c;\n}";

/// Identifies the container the canvas is mounted into.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MountTarget(String);

impl MountTarget {
    /// Create a mount target from a container identifier (e.g. a selector).
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The container identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MountTarget {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for MountTarget {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for MountTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque renderable registered for a node type.
///
/// The engine only stores and hands it back; the rendering layer decides
/// what it is.
#[derive(Clone)]
pub struct Component(Rc<dyn Any>);

impl Component {
    /// Wrap any value as a renderable.
    #[must_use]
    pub fn new<T: Any>(renderable: T) -> Self {
        Self(Rc::new(renderable))
    }

    /// Borrow the renderable as `T`, if it is one.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Component(..)")
    }
}

/// The rendering layer as seen from the engine.
pub trait Renderer {
    /// Attach to the container.
    fn mount(&mut self, target: &MountTarget, width: f64, height: f64);

    /// Detach from the container.
    fn unmount(&mut self);

    /// Apply a derived background style to the container.
    fn paint_background(&mut self, _style: &BackgroundStyle) {}

    /// Install the fallback snapline stylesheet.
    fn install_default_snapline_style(&mut self, _css: &str) {}
}

/// A call received by a [`RecordingRenderer`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "call", rename_all = "camelCase")]
pub enum RenderCall {
    /// `mount` was called.
    Mount {
        /// Container.
        target: MountTarget,
        /// Width in pixels.
        width: f64,
        /// Height in pixels.
        height: f64,
    },
    /// `unmount` was called.
    Unmount,
    /// `paint_background` was called.
    PaintBackground {
        /// The painted style.
        style: BackgroundStyle,
    },
    /// `install_default_snapline_style` was called.
    InstallSnaplineStyle,
}

/// Renderer that only records what it was asked to do.
///
/// Clones share the same log, so a clone can be inspected after the
/// original was handed to a graph.
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    calls: Rc<RefCell<Vec<RenderCall>>>,
}

impl RecordingRenderer {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<RenderCall> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: RenderCall) {
        tracing::trace!(?call, "render call");
        self.calls.borrow_mut().push(call);
    }
}

impl Renderer for RecordingRenderer {
    fn mount(&mut self, target: &MountTarget, width: f64, height: f64) {
        self.record(RenderCall::Mount {
            target: target.clone(),
            width,
            height,
        });
    }

    fn unmount(&mut self) {
        self.record(RenderCall::Unmount);
    }

    fn paint_background(&mut self, style: &BackgroundStyle) {
        self.record(RenderCall::PaintBackground {
            style: style.clone(),
        });
    }

    fn install_default_snapline_style(&mut self, _css: &str) {
        self.record(RenderCall::InstallSnaplineStyle);
    }
}
