//! Snap guide data ingested from the interactive widget.
//!
//! Each axis carries three guides. The third one is the center guide and
//! wins over the two edge guides of the same axis.

use serde::{Deserialize, Serialize};

/// Number of guides per axis.
pub const GUIDES_PER_AXIS: usize = 3;

/// Index of the center guide within an axis.
pub const CENTER_GUIDE: usize = 2;

/// A single alignment guide.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SnapLine {
    /// Whether the guide is shown.
    pub display: bool,
    /// CSS offset of the guide.
    pub position: String,
    /// CSS offset where the guide starts.
    pub origin: String,
    /// CSS length of the guide.
    pub line_length: String,
}

/// Vertical and horizontal guides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnaplineData {
    /// Vertical guides.
    #[serde(rename = "vLine", default)]
    pub v_line: [SnapLine; GUIDES_PER_AXIS],
    /// Horizontal guides.
    #[serde(rename = "hLine", default)]
    pub h_line: [SnapLine; GUIDES_PER_AXIS],
}

impl SnaplineData {
    /// All six guides hidden.
    #[must_use]
    pub fn cleared() -> Self {
        Self::default()
    }

    /// Hide the edge guides of any axis whose center guide is shown.
    pub fn enforce_center_priority(&mut self) {
        prioritize_center(&mut self.v_line);
        prioritize_center(&mut self.h_line);
    }

    /// Whether any guide is shown.
    #[must_use]
    pub fn any_displayed(&self) -> bool {
        self.v_line.iter().chain(&self.h_line).any(|line| line.display)
    }
}

fn prioritize_center(lines: &mut [SnapLine; GUIDES_PER_AXIS]) {
    if lines[CENTER_GUIDE].display {
        for line in &mut lines[..CENTER_GUIDE] {
            line.display = false;
        }
    }
}

/// Axis of a guide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Runs top to bottom.
    Vertical,
    /// Runs left to right.
    Horizontal,
}

/// A guide as the rendering layer should draw it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuideOverlay {
    /// Axis of the guide.
    pub orientation: Orientation,
    /// Index within its axis.
    pub index: usize,
    /// Class name to render with.
    pub class_name: String,
    /// CSS left offset.
    pub left: String,
    /// CSS top offset.
    pub top: String,
    /// CSS width.
    pub width: String,
    /// CSS height.
    pub height: String,
}

/// Overlay lines for every displayed guide, vertical ones first.
///
/// Vertical guides span the container height, horizontal ones its width.
#[must_use]
pub fn overlay_lines(
    data: &SnaplineData,
    class_name: &str,
    container_width: f64,
    container_height: f64,
) -> Vec<GuideOverlay> {
    let vertical = data
        .v_line
        .iter()
        .enumerate()
        .filter(|(_, line)| line.display)
        .map(|(index, line)| GuideOverlay {
            orientation: Orientation::Vertical,
            index,
            class_name: class_name.to_string(),
            left: line.position.clone(),
            top: "0".to_string(),
            width: "1px".to_string(),
            height: format!("{container_height}px"),
        });
    let horizontal = data
        .h_line
        .iter()
        .enumerate()
        .filter(|(_, line)| line.display)
        .map(|(index, line)| GuideOverlay {
            orientation: Orientation::Horizontal,
            index,
            class_name: class_name.to_string(),
            left: "0".to_string(),
            top: line.position.clone(),
            width: format!("{container_width}px"),
            height: "1px".to_string(),
        });
    vertical.chain(horizontal).collect()
}
