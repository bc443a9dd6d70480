//! Interaction events produced by the drag/resize widget, and the props the
//! graph feeds back to it.

use serde::{Deserialize, Serialize};

use crate::config::SnaplineConfig;
use crate::node::NodeUpdate;
use crate::snapline::SnaplineData;

/// Position reported while or after dragging.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DragPosition {
    /// X position.
    pub x: f64,
    /// Y position.
    pub y: f64,
}

/// Bounds reported while or after resizing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResizeBounds {
    /// X position.
    pub x: f64,
    /// Y position.
    pub y: f64,
    /// Width.
    pub w: f64,
    /// Height.
    pub h: f64,
}

/// A callback fired by the interactive widget wrapping one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum InteractionEvent {
    /// Continuous drag movement.
    Dragging(DragPosition),
    /// Drag finished.
    DragStop(DragPosition),
    /// Continuous resize.
    Resizing(ResizeBounds),
    /// Resize finished.
    ResizeStop(ResizeBounds),
    /// Raw guide geometry computed by the widget.
    RefLineParams(SnaplineData),
}

impl InteractionEvent {
    /// The geometry update this event applies to its node, if any.
    #[must_use]
    pub fn geometry_update(&self) -> Option<NodeUpdate> {
        match self {
            Self::Dragging(p) | Self::DragStop(p) => Some(NodeUpdate::position(p.x, p.y)),
            Self::Resizing(b) | Self::ResizeStop(b) => {
                Some(NodeUpdate::bounds(b.x, b.y, b.w, b.h))
            }
            Self::RefLineParams(_) => None,
        }
    }

    /// Whether this event ends a drag or resize.
    #[must_use]
    pub const fn ends_interaction(&self) -> bool {
        matches!(self, Self::DragStop(_) | Self::ResizeStop(_))
    }
}

/// Props the graph feeds to the widget wrapping a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetProps {
    /// X position.
    pub x: f64,
    /// Y position.
    pub y: f64,
    /// Width.
    pub w: f64,
    /// Height.
    pub h: f64,
    /// Keep the node inside its container.
    pub parent: bool,
    /// Snapline settings.
    pub snapline: SnaplineConfig,
}
