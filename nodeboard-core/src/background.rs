//! Background configuration and its presentational derivation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Background position: a pre-formatted value or a pixel pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BackgroundPosition {
    /// Pixel offsets, rendered as `"{x}px {y}px"`.
    Pixels {
        /// Horizontal offset.
        x: f64,
        /// Vertical offset.
        y: f64,
    },
    /// Any CSS position value, used verbatim.
    Formatted(String),
}

/// Background size: a pre-formatted value or a pixel pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BackgroundSize {
    /// Pixel dimensions, rendered as `"{width}px {height}px"`.
    Pixels {
        /// Width.
        width: f64,
        /// Height.
        height: f64,
    },
    /// Any CSS size value, used verbatim.
    Formatted(String),
}

impl BackgroundPosition {
    fn to_css(&self) -> Option<String> {
        match self {
            Self::Pixels { x, y } => Some(format!("{x}px {y}px")),
            Self::Formatted(s) if s.is_empty() => None,
            Self::Formatted(s) => Some(s.clone()),
        }
    }
}

impl BackgroundSize {
    fn to_css(&self) -> Option<String> {
        match self {
            Self::Pixels { width, height } => Some(format!("{width}px {height}px")),
            Self::Formatted(s) if s.is_empty() => None,
            Self::Formatted(s) => Some(s.clone()),
        }
    }
}

/// Partial background settings; unset fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackgroundOptions {
    /// Fill color.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Image URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Image position.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<BackgroundPosition>,
    /// Image size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<BackgroundSize>,
    /// Image repeat mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeat: Option<String>,
    /// Opacity in `[0, 1]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    /// Image quality factor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<f64>,
    /// Rotation in degrees.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub angle: Option<f64>,
}

/// Typed view of the `background` configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    /// Fill color.
    pub color: Option<String>,
    /// Image URL.
    pub image: Option<String>,
    /// Image position.
    pub position: Option<BackgroundPosition>,
    /// Image size.
    pub size: Option<BackgroundSize>,
    /// Image repeat mode.
    pub repeat: Option<String>,
    /// Opacity in `[0, 1]`.
    pub opacity: f64,
    /// Image quality factor.
    pub quality: f64,
    /// Rotation in degrees.
    pub angle: f64,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            color: None,
            image: None,
            position: None,
            size: None,
            repeat: None,
            opacity: 1.0,
            quality: 1.0,
            angle: 0.0,
        }
    }
}

/// The all-default background section, with every optional field unset.
#[must_use]
pub fn cleared_background() -> Value {
    serde_json::json!({
        "color": null,
        "image": null,
        "position": null,
        "size": null,
        "repeat": null,
        "opacity": 1,
        "quality": 1,
        "angle": 0
    })
}

/// Presentational output derived from a background configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundStyle {
    /// CSS background color.
    pub background_color: String,
    /// CSS background image.
    pub background_image: String,
    /// Container opacity.
    pub opacity: f64,
    /// CSS background position, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_position: Option<String>,
    /// CSS background size, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_size: Option<String>,
    /// CSS background repeat, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_repeat: Option<String>,
}

impl BackgroundStyle {
    /// Derive the style for a background configuration.
    #[must_use]
    pub fn from_config(config: &BackgroundConfig) -> Self {
        let non_empty = |value: &Option<String>| value.clone().filter(|s| !s.is_empty());
        Self {
            background_color: non_empty(&config.color).unwrap_or_else(|| "transparent".to_string()),
            background_image: non_empty(&config.image)
                .map_or_else(|| "none".to_string(), |url| format!("url({url})")),
            opacity: config.opacity,
            background_position: config.position.as_ref().and_then(BackgroundPosition::to_css),
            background_size: config.size.as_ref().and_then(BackgroundSize::to_css),
            background_repeat: non_empty(&config.repeat),
        }
    }

    /// The "no background" style.
    #[must_use]
    pub fn cleared() -> Self {
        Self {
            background_color: "transparent".to_string(),
            background_image: "none".to_string(),
            opacity: 1.0,
            background_position: Some("0 0".to_string()),
            background_size: Some("auto".to_string()),
            background_repeat: Some("repeat".to_string()),
        }
    }
}

impl Default for BackgroundStyle {
    fn default() -> Self {
        Self::from_config(&BackgroundConfig::default())
    }
}
