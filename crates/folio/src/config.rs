//! Configuration types for building Folio documents.
//!
//! All types implement [`serde::Deserialize`] so a front end can load them
//! from a file. Every field has a default, so a partial file is valid.
//!
//! # Example
//!
//! ```
//! # use folio::config::{AppConfig, ClusterRankPolicy};
//! let config = AppConfig::default();
//! assert_eq!(config.layout().crossing_passes, 8);
//! assert_eq!(config.layout().cluster_ranks, ClusterRankPolicy::Approximate);
//! assert!(config.validation().strict_fields);
//! ```

use serde::Deserialize;

use folio_core::diagram::MixedEdgePolicy;
use folio_parser::{DEFAULT_MAX_DEPTH, ParseConfig};

/// Top-level configuration for a [`DocumentBuilder`](crate::DocumentBuilder).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AppConfig {
    /// Layout engine settings.
    #[serde(default)]
    layout: LayoutConfig,

    /// Diagram validation settings.
    #[serde(default)]
    diagram: DiagramConfig,

    /// Data and table validation settings.
    #[serde(default)]
    validation: ValidationConfig,
}

impl AppConfig {
    pub fn new(layout: LayoutConfig, diagram: DiagramConfig, validation: ValidationConfig) -> Self {
        Self {
            layout,
            diagram,
            validation,
        }
    }

    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    pub fn diagram(&self) -> &DiagramConfig {
        &self.diagram
    }

    pub fn validation(&self) -> &ValidationConfig {
        &self.validation
    }

    /// Settings for the parsing and validation stages.
    pub fn parse_config(&self) -> ParseConfig {
        ParseConfig::new(
            self.validation.strict_fields,
            self.validation.max_depth,
            self.diagram.mixed_edges,
        )
    }
}

/// What to do with a cluster whose members sit on non-adjacent ranks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterRankPolicy {
    /// Move the members onto one contiguous band and warn.
    #[default]
    Approximate,
    /// Report an error and skip the diagram's layout.
    Reject,
}

/// Spacing, sizing and iteration limits used by every layout engine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Gap between neighboring nodes in a layer.
    pub node_separation: f32,
    /// Gap between layers.
    pub rank_separation: f32,
    /// Space left around the whole drawing.
    pub margin: f32,
    /// Space between a cluster's border and its contents.
    pub cluster_padding: f32,
    /// Estimated width of one label character at the default font size.
    pub char_width: f32,
    pub min_node_width: f32,
    pub min_node_height: f32,
    /// Space between a label and its node's border.
    pub node_padding: f32,
    /// Upper bound on barycenter passes; each pass sweeps down then up.
    pub crossing_passes: usize,
    /// Upper bound on force-directed iterations.
    pub force_iterations: usize,
    /// Force-directed placement stops once no node moves farther than this.
    pub convergence_threshold: f32,
    /// Seed for the initial jitter of force-directed placement.
    pub seed: u64,
    pub cluster_ranks: ClusterRankPolicy,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_separation: 40.0,
            rank_separation: 60.0,
            margin: 20.0,
            cluster_padding: 16.0,
            char_width: 8.0,
            min_node_width: 60.0,
            min_node_height: 36.0,
            node_padding: 10.0,
            crossing_passes: 8,
            force_iterations: 300,
            convergence_threshold: 0.5,
            seed: 0x5eed,
            cluster_ranks: ClusterRankPolicy::default(),
        }
    }
}

/// Diagram validation settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DiagramConfig {
    /// Whether one graph may mix `->` and `--` edges.
    pub mixed_edges: MixedEdgePolicy,
}

/// Data and table validation settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Report unknown data fields as errors instead of warnings.
    pub strict_fields: bool,
    /// Maximum nesting depth of a single value.
    pub max_depth: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            strict_fields: true,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [layout]
            crossing_passes = 3
            cluster_ranks = "reject"

            [diagram]
            mixed_edges = "reject"
            "#,
        )
        .expect("Failed to parse config");

        assert_eq!(config.layout().crossing_passes, 3);
        assert_eq!(config.layout().cluster_ranks, ClusterRankPolicy::Reject);
        assert_eq!(config.layout().node_separation, 40.0);
        assert_eq!(config.diagram().mixed_edges, MixedEdgePolicy::Reject);
        assert!(config.validation().strict_fields);
    }

    #[test]
    fn test_parse_config() {
        let config = AppConfig::new(
            LayoutConfig::default(),
            DiagramConfig::default(),
            ValidationConfig {
                strict_fields: false,
                max_depth: 4,
            },
        );
        let parse = config.parse_config();
        assert!(!parse.strict_fields);
        assert_eq!(parse.max_depth, 4);
        assert_eq!(parse.mixed_edges, MixedEdgePolicy::Allow);
    }

    #[test]
    fn test_unknown_policy_is_rejected() {
        let result: Result<AppConfig, _> = toml::from_str("[layout]\ncluster_ranks = \"maybe\"\n");
        assert!(result.is_err());
    }
}
