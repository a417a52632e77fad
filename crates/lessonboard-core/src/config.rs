//! Editor configuration.
//!
//! Every field has a default, so a config file only needs the values it
//! overrides.

use crate::scene::TraversalLimits;
use crate::transform::ResizeConstraints;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Invalid value: {0}")]
    Invalid(String),
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipboardConfig {
    /// Offset added per paste, on both axes.
    pub paste_step: f64,
    /// Delays after which pasted media re-apply their properties.
    pub media_reapply_delays_ms: Vec<u64>,
    /// Snapshot drawables with no tagged owner into static images.
    pub snapshot_unknown: bool,
    /// How many ancestors to search for a tagged owner.
    pub max_classify_depth: usize,
}

impl Default for ClipboardConfig {
    fn default() -> Self {
        Self {
            paste_step: 20.0,
            media_reapply_delays_ms: vec![50, 250],
            snapshot_unknown: true,
            max_classify_depth: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerConfig {
    pub refresh_debounce_ms: u64,
    /// Nodes stacked above this are UI overlays.
    pub overlay_z_threshold: i32,
    /// Nodes more transparent than this are hidden helpers.
    pub min_alpha: f64,
    /// Thumbnail edge length in pixels.
    pub thumbnail_size: u32,
    /// Name fragments that mark transient UI nodes. Matched case-insensitively.
    pub denylist: Vec<String>,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            refresh_debounce_ms: 40,
            overlay_z_threshold: 1000,
            min_alpha: 0.01,
            thumbnail_size: 48,
            denylist: [
                "cursor",
                "guide",
                "overlay",
                "handle",
                "anchor",
                "marquee",
                "preview",
                "selection-",
                "snap-",
                "drag-",
                "resize-",
                "grid",
                "ruler",
                "highlight",
                "ghost",
                "tooltip",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    pub min_width: f64,
    pub min_height: f64,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            min_width: 1.0,
            min_height: 1.0,
        }
    }
}

impl TransformConfig {
    /// Constraints for an interactive resize.
    pub fn constraints(&self, maintain_aspect_ratio: bool) -> ResizeConstraints {
        ResizeConstraints {
            min_width: self.min_width,
            min_height: self.min_height,
            maintain_aspect_ratio,
            ..ResizeConstraints::default()
        }
    }
}

/// Configuration for an editor session.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub clipboard: ClipboardConfig,
    pub layers: LayerConfig,
    pub traversal: TraversalLimits,
    pub transform: TransformConfig,
}

impl EditorConfig {
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> ConfigResult<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded editor config from {}", path.display());
        Ok(config)
    }

    pub fn to_json(&self) -> ConfigResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn validate(&self) -> ConfigResult<()> {
        if !self.clipboard.paste_step.is_finite() {
            return Err(ConfigError::Invalid("clipboard.paste_step".into()));
        }
        if self.traversal.max_depth == 0 || self.traversal.max_nodes == 0 {
            return Err(ConfigError::Invalid("traversal limits must be positive".into()));
        }
        if self.transform.min_width < 0.0 || self.transform.min_height < 0.0 {
            return Err(ConfigError::Invalid("transform minimum sizes".into()));
        }
        if self.layers.thumbnail_size == 0 {
            return Err(ConfigError::Invalid("layers.thumbnail_size".into()));
        }
        Ok(())
    }
}
