use crate::ir::{FlowKind, NodeCategory};
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateConfig {
    /// Node count above which the degradation pass runs.
    pub max_nodes: usize,
    /// Link count above which the degradation pass runs.
    pub max_links: usize,
    pub no_entity_id: String,
    pub no_entity_label: String,
    pub unspecified_method: String,
    pub default_income_label: String,
    pub default_expense_label: String,
    pub default_credit_label: String,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            max_nodes: 100,
            max_links: 200,
            no_entity_id: "no-entity".to_string(),
            no_entity_label: "Unassigned".to_string(),
            unspecified_method: "unspecified".to_string(),
            default_income_label: "Other income".to_string(),
            default_expense_label: "Other expenses".to_string(),
            default_credit_label: "Other credit".to_string(),
        }
    }
}

impl AggregateConfig {
    pub fn default_label(&self, kind: FlowKind) -> &str {
        match kind {
            FlowKind::Income => &self.default_income_label,
            FlowKind::Expense => &self.default_expense_label,
            FlowKind::Credit => &self.default_credit_label,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub width: f32,
    pub height: f32,
    pub node_width: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
    pub margin_right: f32,
    pub min_node_height: f32,
    pub node_gap: f32,
    /// Horizontal fraction for the first control point; the second sits at `1 - curvature`.
    pub curvature: f32,
    pub min_link_width: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 600.0,
            node_width: 20.0,
            margin_top: 20.0,
            margin_bottom: 20.0,
            margin_left: 10.0,
            margin_right: 10.0,
            min_node_height: 25.0,
            node_gap: 5.0,
            curvature: 0.4,
            min_link_width: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionConfig {
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub zoom_step: f32,
    pub pan_limit_x: f32,
    pub pan_limit_y: f32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0.5,
            max_zoom: 3.0,
            zoom_step: 1.2,
            pan_limit_x: 300.0,
            pan_limit_y: 200.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub theme: Theme,
    pub aggregate: AggregateConfig,
    pub layout: LayoutConfig,
    pub interaction: InteractionConfig,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let layout = &self.layout;
        let sizes = [
            ("layout.width", layout.width),
            ("layout.height", layout.height),
            ("layout.nodeWidth", layout.node_width),
            ("layout.marginTop", layout.margin_top),
            ("layout.marginBottom", layout.margin_bottom),
            ("layout.marginLeft", layout.margin_left),
            ("layout.marginRight", layout.margin_right),
            ("layout.minNodeHeight", layout.min_node_height),
            ("layout.nodeGap", layout.node_gap),
            ("layout.minLinkWidth", layout.min_link_width),
        ];
        for (name, value) in sizes {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        if !(0.0..=0.5).contains(&layout.curvature) {
            return Err(ConfigError::Invalid(format!(
                "layout.curvature must be within [0, 0.5], got {}",
                layout.curvature
            )));
        }
        let interaction = &self.interaction;
        if !(interaction.min_zoom > 0.0 && interaction.min_zoom <= interaction.max_zoom) {
            return Err(ConfigError::Invalid(format!(
                "interaction zoom bounds are inverted or non-positive: [{}, {}]",
                interaction.min_zoom, interaction.max_zoom
            )));
        }
        if !(interaction.zoom_step > 1.0) {
            return Err(ConfigError::Invalid(format!(
                "interaction.zoomStep must be greater than 1, got {}",
                interaction.zoom_step
            )));
        }
        let limits = [
            ("interaction.panLimitX", interaction.pan_limit_x),
            ("interaction.panLimitY", interaction.pan_limit_y),
        ];
        for (name, value) in limits {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct AggregateConfigFile {
    max_nodes: Option<usize>,
    max_links: Option<usize>,
    no_entity_id: Option<String>,
    no_entity_label: Option<String>,
    unspecified_method: Option<String>,
    default_income_label: Option<String>,
    default_expense_label: Option<String>,
    default_credit_label: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct LayoutConfigFile {
    width: Option<f32>,
    height: Option<f32>,
    node_width: Option<f32>,
    margin_top: Option<f32>,
    margin_bottom: Option<f32>,
    margin_left: Option<f32>,
    margin_right: Option<f32>,
    min_node_height: Option<f32>,
    node_gap: Option<f32>,
    curvature: Option<f32>,
    min_link_width: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct InteractionConfigFile {
    min_zoom: Option<f32>,
    max_zoom: Option<f32>,
    zoom_step: Option<f32>,
    pan_limit_x: Option<f32>,
    pan_limit_y: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ThemeColorsFile {
    income: Option<String>,
    expense: Option<String>,
    credit: Option<String>,
    amount: Option<String>,
    link_color: Option<String>,
    dimmed_opacity: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    colors: Option<ThemeColorsFile>,
    aggregate: Option<AggregateConfigFile>,
    layout: Option<LayoutConfigFile>,
    interaction: Option<InteractionConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&contents).map_err(|err| match err {
        ConfigError::Parse { message, .. } => ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        },
        other => other,
    })
}

/// Parses JSON5 config text and merges it over the defaults.
pub fn parse_config(contents: &str) -> Result<Config, ConfigError> {
    let parsed: ConfigFile = json5::from_str(contents).map_err(|err| ConfigError::Parse {
        path: PathBuf::from("<inline>"),
        message: err.to_string(),
    })?;
    let mut config = Config::default();

    if let Some(theme_name) = parsed.theme.as_deref() {
        config.theme = match theme_name {
            "muted" => Theme::muted(),
            "default" | "dashboard" => Theme::dashboard(),
            other => {
                return Err(ConfigError::Invalid(format!("unknown theme '{other}'")));
            }
        };
    }

    if let Some(colors) = parsed.colors {
        let overrides = [
            (NodeCategory::Income, colors.income),
            (NodeCategory::Expense, colors.expense),
            (NodeCategory::Credit, colors.credit),
            (NodeCategory::Amount, colors.amount),
        ];
        for (category, color) in overrides {
            if let Some(color) = color {
                config.theme.set_color(category, color);
            }
        }
        if let Some(v) = colors.link_color {
            config.theme.link_color = v;
        }
        if let Some(v) = colors.dimmed_opacity {
            config.theme.dimmed_opacity = v.clamp(0.0, 1.0);
        }
    }

    if let Some(aggregate) = parsed.aggregate {
        let target = &mut config.aggregate;
        if let Some(v) = aggregate.max_nodes {
            target.max_nodes = v;
        }
        if let Some(v) = aggregate.max_links {
            target.max_links = v;
        }
        if let Some(v) = aggregate.no_entity_id {
            target.no_entity_id = v;
        }
        if let Some(v) = aggregate.no_entity_label {
            target.no_entity_label = v;
        }
        if let Some(v) = aggregate.unspecified_method {
            target.unspecified_method = v;
        }
        if let Some(v) = aggregate.default_income_label {
            target.default_income_label = v;
        }
        if let Some(v) = aggregate.default_expense_label {
            target.default_expense_label = v;
        }
        if let Some(v) = aggregate.default_credit_label {
            target.default_credit_label = v;
        }
    }

    if let Some(layout) = parsed.layout {
        let target = &mut config.layout;
        if let Some(v) = layout.width {
            target.width = v;
        }
        if let Some(v) = layout.height {
            target.height = v;
        }
        if let Some(v) = layout.node_width {
            target.node_width = v;
        }
        if let Some(v) = layout.margin_top {
            target.margin_top = v;
        }
        if let Some(v) = layout.margin_bottom {
            target.margin_bottom = v;
        }
        if let Some(v) = layout.margin_left {
            target.margin_left = v;
        }
        if let Some(v) = layout.margin_right {
            target.margin_right = v;
        }
        if let Some(v) = layout.min_node_height {
            target.min_node_height = v;
        }
        if let Some(v) = layout.node_gap {
            target.node_gap = v;
        }
        if let Some(v) = layout.curvature {
            target.curvature = v;
        }
        if let Some(v) = layout.min_link_width {
            target.min_link_width = v;
        }
    }

    if let Some(interaction) = parsed.interaction {
        let target = &mut config.interaction;
        if let Some(v) = interaction.min_zoom {
            target.min_zoom = v;
        }
        if let Some(v) = interaction.max_zoom {
            target.max_zoom = v;
        }
        if let Some(v) = interaction.zoom_step {
            target.zoom_step = v;
        }
        if let Some(v) = interaction.pan_limit_x {
            target.pan_limit_x = v;
        }
        if let Some(v) = interaction.pan_limit_y {
            target.pan_limit_y = v;
        }
    }

    config.validate()?;
    Ok(config)
}
