//! Declarative board topology loaded from YAML or JSON.
//!
//! # Example YAML
//!
//! ```yaml
//! name: plant
//! min_interval_ms: 250
//! kind_bindings:
//!   pump:
//!     view_type: status
//!     params: { attribute: load, warning: 70, critical: 90 }
//! groups:
//!   - name: yard
//!     boundary:
//!       - { lat: 0.0, lon: 0.0 }
//!       - { lat: 0.0, lon: 10.0 }
//!       - { lat: 10.0, lon: 10.0 }
//!   - name: dock
//!     static_elements:
//!       - view_type: element
//!         params: { accepts: crane }
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::board::aggregator::Board;
use crate::elements::{ElementFactory, DEFAULT_VIEW_TYPE};
use crate::error::{BoardError, Result};
use crate::groups::{Boundary, ContainsFn, Group};

fn default_min_interval_ms() -> u64 {
    1000
}

fn default_view_type() -> String {
    DEFAULT_VIEW_TYPE.to_string()
}

/// Top-level board description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardConfig {
    pub name: String,
    /// Minimum spacing between notifications, in milliseconds.
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
    /// Record kind to the view type (and parameters) manufactured for it.
    #[serde(default)]
    pub kind_bindings: BTreeMap<String, KindBindingConfig>,
    /// Segments in admission order.
    #[serde(default)]
    pub groups: Vec<GroupConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KindBindingConfig {
    pub view_type: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupConfig {
    pub name: String,
    /// When present the segment is geo-fenced to this polygon.
    #[serde(default)]
    pub boundary: Option<Boundary>,
    #[serde(default)]
    pub static_elements: Vec<StaticElementConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticElementConfig {
    #[serde(default = "default_view_type")]
    pub view_type: String,
    #[serde(default)]
    pub params: Value,
}

impl BoardConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from disk; `.json` files are read as JSON, `.yaml`/`.yml` as
    /// YAML.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&content),
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content),
            other => Err(BoardError::UnsupportedFormat {
                format: other.unwrap_or("").to_string(),
            }),
        }
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

impl Board {
    /// Build a board from `config`.
    ///
    /// Every static element is built up front, so an unknown view type
    /// fails here rather than on first use. `contains` is required as soon
    /// as one segment declares a boundary.
    pub fn from_config(
        config: &BoardConfig,
        mut factory: ElementFactory,
        contains: Option<ContainsFn>,
    ) -> Result<Board> {
        for (kind, binding) in &config.kind_bindings {
            factory.bind_kind(kind, &binding.view_type, binding.params.clone())?;
        }

        let mut groups = Vec::with_capacity(config.groups.len());
        for group_config in &config.groups {
            let mut group = match (&group_config.boundary, &contains) {
                (Some(boundary), Some(contains)) => {
                    Group::geo(&group_config.name, boundary.clone(), contains.clone())
                }
                (Some(_), None) => {
                    log::warn!(
                        "segment '{}' has a boundary but no containment test was supplied",
                        group_config.name
                    );
                    return Err(BoardError::MissingGeometry {
                        group: group_config.name.clone(),
                    });
                }
                (None, _) => Group::new(&group_config.name),
            };
            for element in &group_config.static_elements {
                group.add_static_element(factory.create(&element.view_type, &element.params, true)?);
            }
            groups.push(group);
        }

        let mut board = Board::new(&config.name, config.min_interval()).with_factory(factory);
        for group in groups {
            board.add_group(group);
        }
        log::debug!(
            "built board '{}' with {} segment(s)",
            config.name,
            board.groups().len()
        );
        Ok(board)
    }
}
