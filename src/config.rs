//! Server and layout configuration parsed from environment variables.
//!
//! Layout defaults are compiled in, may be replaced process-wide through
//! `LAYOUT_*` environment variables, and every field can be overridden again
//! for a single import through [`LayoutOverrides`].

use serde::{Deserialize, Serialize};

pub const DEFAULT_HORIZONTAL_SPACING: f64 = 60.0;
pub const DEFAULT_VERTICAL_SPACING: f64 = 120.0;
pub const DEFAULT_MAX_COLUMNS: usize = 3;
pub const DEFAULT_GROUP_PADDING_TOP: f64 = 40.0;
pub const DEFAULT_GROUP_PADDING_SIDE: f64 = 20.0;
pub const DEFAULT_MIN_CONTAINER_WIDTH: f64 = 200.0;
pub const DEFAULT_MIN_CONTAINER_HEIGHT: f64 = 120.0;
pub const DEFAULT_GROUP_SPACING: f64 = 80.0;
pub const DEFAULT_ORPHAN_ROW_SPACING: f64 = 80.0;
pub const DEFAULT_CONTAINER_PADDING: f64 = 40.0;
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_STORE_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_UNDO_DEPTH: usize = 50;

// =============================================================================
// SERVER
// =============================================================================

/// Process-level settings for the HTTP server binary.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub port: u16,
    /// Base URL of a remote diagram service. `None` keeps documents in memory.
    pub store_url: Option<String>,
    pub store_timeout_secs: u64,
    /// Undoable commands kept per diagram; older ones are discarded.
    pub undo_depth: usize,
    pub layout: LayoutConfig,
}

impl ServerConfig {
    /// Build server config from environment variables.
    ///
    /// Optional:
    /// - `PORT`: default 3000
    /// - `DIAGRAM_STORE_URL`: remote diagram service; in-memory store when unset or blank
    /// - `DIAGRAM_STORE_TIMEOUT_SECS`: default 30
    /// - `UNDO_DEPTH`: default 50, at least 1
    /// - `LAYOUT_*`: see [`LayoutConfig::from_env`]
    #[must_use]
    pub fn from_env() -> Self {
        let store_url = std::env::var("DIAGRAM_STORE_URL")
            .ok()
            .map(|v| v.trim().trim_end_matches('/').to_owned())
            .filter(|v| !v.is_empty());
        Self {
            port: env_parse("PORT", DEFAULT_PORT),
            store_url,
            store_timeout_secs: env_parse("DIAGRAM_STORE_TIMEOUT_SECS", DEFAULT_STORE_TIMEOUT_SECS),
            undo_depth: env_parse("UNDO_DEPTH", DEFAULT_UNDO_DEPTH).max(1),
            layout: LayoutConfig::from_env(),
        }
    }
}

// =============================================================================
// LAYOUT
// =============================================================================

/// Per-side padding inside a group box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Padding {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Padding {
    #[must_use]
    pub fn horizontal(&self) -> f64 {
        self.left + self.right
    }

    #[must_use]
    pub fn vertical(&self) -> f64 {
        self.top + self.bottom
    }
}

impl Default for Padding {
    fn default() -> Self {
        Self {
            top: DEFAULT_GROUP_PADDING_TOP,
            right: DEFAULT_GROUP_PADDING_SIDE,
            bottom: DEFAULT_GROUP_PADDING_SIDE,
            left: DEFAULT_GROUP_PADDING_SIDE,
        }
    }
}

/// Numeric knobs shared by both layout engines.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Gap between nodes on a flow row and between grid columns.
    pub horizontal_spacing: f64,
    /// Distance between flow rows and gap between grid rows.
    pub vertical_spacing: f64,
    /// Grid column cap for group children and orphans.
    pub max_columns: usize,
    pub group_padding: Padding,
    pub min_container_width: f64,
    pub min_container_height: f64,
    /// Gap between top-level groups.
    pub group_spacing: f64,
    /// Gap between the top-level groups and the orphan grid below them.
    pub orphan_row_spacing: f64,
    /// Margin between imported content and its summary container.
    pub container_padding: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            horizontal_spacing: DEFAULT_HORIZONTAL_SPACING,
            vertical_spacing: DEFAULT_VERTICAL_SPACING,
            max_columns: DEFAULT_MAX_COLUMNS,
            group_padding: Padding::default(),
            min_container_width: DEFAULT_MIN_CONTAINER_WIDTH,
            min_container_height: DEFAULT_MIN_CONTAINER_HEIGHT,
            group_spacing: DEFAULT_GROUP_SPACING,
            orphan_row_spacing: DEFAULT_ORPHAN_ROW_SPACING,
            container_padding: DEFAULT_CONTAINER_PADDING,
        }
    }
}

impl LayoutConfig {
    /// Build the process-wide defaults from environment variables.
    ///
    /// Optional (compiled default when absent or unparsable):
    /// - `LAYOUT_HORIZONTAL_SPACING`, `LAYOUT_VERTICAL_SPACING`
    /// - `LAYOUT_MAX_COLUMNS`
    /// - `LAYOUT_GROUP_PADDING_TOP`, `_RIGHT`, `_BOTTOM`, `_LEFT`
    /// - `LAYOUT_MIN_CONTAINER_WIDTH`, `LAYOUT_MIN_CONTAINER_HEIGHT`
    /// - `LAYOUT_GROUP_SPACING`, `LAYOUT_ORPHAN_ROW_SPACING`
    /// - `LAYOUT_CONTAINER_PADDING`
    #[must_use]
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            horizontal_spacing: env_parse("LAYOUT_HORIZONTAL_SPACING", d.horizontal_spacing),
            vertical_spacing: env_parse("LAYOUT_VERTICAL_SPACING", d.vertical_spacing),
            max_columns: env_parse("LAYOUT_MAX_COLUMNS", d.max_columns).max(1),
            group_padding: Padding {
                top: env_parse("LAYOUT_GROUP_PADDING_TOP", d.group_padding.top),
                right: env_parse("LAYOUT_GROUP_PADDING_RIGHT", d.group_padding.right),
                bottom: env_parse("LAYOUT_GROUP_PADDING_BOTTOM", d.group_padding.bottom),
                left: env_parse("LAYOUT_GROUP_PADDING_LEFT", d.group_padding.left),
            },
            min_container_width: env_parse("LAYOUT_MIN_CONTAINER_WIDTH", d.min_container_width),
            min_container_height: env_parse("LAYOUT_MIN_CONTAINER_HEIGHT", d.min_container_height),
            group_spacing: env_parse("LAYOUT_GROUP_SPACING", d.group_spacing),
            orphan_row_spacing: env_parse("LAYOUT_ORPHAN_ROW_SPACING", d.orphan_row_spacing),
            container_padding: env_parse("LAYOUT_CONTAINER_PADDING", d.container_padding),
        }
    }

    /// Apply per-call overrides on top of this config.
    #[must_use]
    pub fn with_overrides(mut self, o: &LayoutOverrides) -> Self {
        if let Some(v) = o.horizontal_spacing {
            self.horizontal_spacing = v;
        }
        if let Some(v) = o.vertical_spacing {
            self.vertical_spacing = v;
        }
        if let Some(v) = o.max_columns {
            self.max_columns = v.max(1);
        }
        if let Some(v) = o.group_padding {
            self.group_padding = v;
        }
        if let Some(v) = o.min_container_width {
            self.min_container_width = v;
        }
        if let Some(v) = o.min_container_height {
            self.min_container_height = v;
        }
        if let Some(v) = o.group_spacing {
            self.group_spacing = v;
        }
        if let Some(v) = o.orphan_row_spacing {
            self.orphan_row_spacing = v;
        }
        if let Some(v) = o.container_padding {
            self.container_padding = v;
        }
        self
    }
}

/// All-optional mirror of [`LayoutConfig`] accepted per request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutOverrides {
    pub horizontal_spacing: Option<f64>,
    pub vertical_spacing: Option<f64>,
    pub max_columns: Option<usize>,
    pub group_padding: Option<Padding>,
    pub min_container_width: Option<f64>,
    pub min_container_height: Option<f64>,
    pub group_spacing: Option<f64>,
    pub orphan_row_spacing: Option<f64>,
    pub container_padding: Option<f64>,
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
