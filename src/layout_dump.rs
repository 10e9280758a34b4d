use crate::engine::{DiagramStats, FlowDiagram};
use crate::interaction::{DiagramVisuals, InteractionState, Transform};
use crate::ir::{FlowKind, NodeCategory};
use crate::theme::Theme;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Read-only snapshot handed to the drawing surface.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDump {
    pub width: f32,
    pub height: f32,
    /// Bottom edge of the lowest node; exceeds `height` when minimum heights overflow the canvas.
    pub content_height: f32,
    pub total_income: f64,
    pub type_totals: BTreeMap<FlowKind, f64>,
    pub transform: Transform,
    pub legend: Vec<LegendDump>,
    pub nodes: Vec<NodeDump>,
    pub links: Vec<LinkDump>,
    pub stats: DiagramStats,
}

#[derive(Debug, Serialize)]
pub struct LegendDump {
    pub category: NodeCategory,
    pub label: String,
    pub color: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDump {
    pub id: String,
    pub name: String,
    pub category: NodeCategory,
    pub color: String,
    pub level: usize,
    pub value: f64,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub opacity: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkDump {
    pub source: String,
    pub target: String,
    pub value: f64,
    pub width: f32,
    pub path: Option<String>,
    pub color: String,
    pub opacity: f32,
}

impl LayoutDump {
    pub fn from_diagram(diagram: &FlowDiagram, state: &InteractionState, theme: &Theme) -> Self {
        let layout = &diagram.layout;
        let visuals: DiagramVisuals = state.visuals(layout);
        let opacity = |dimmed: bool| if dimmed { theme.dimmed_opacity } else { 1.0 };

        let nodes = layout
            .nodes
            .iter()
            .zip(&visuals.nodes)
            .map(|(node, visual)| NodeDump {
                id: node.id.clone(),
                name: node.display_name.clone(),
                category: node.category,
                color: theme.style(node.category).color.clone(),
                level: node.level.index(),
                value: node.value,
                x: node.x,
                y: node.y,
                width: node.width,
                height: node.height,
                opacity: opacity(visual.dimmed),
            })
            .collect();

        let links = layout
            .links
            .iter()
            .zip(&visuals.links)
            .map(|(link, visual)| {
                let color = layout
                    .node(&link.source)
                    .filter(|node| node.level.index() > 0)
                    .map(|node| theme.style(node.category).color.clone())
                    .unwrap_or_else(|| theme.link_color.clone());
                LinkDump {
                    source: link.source.clone(),
                    target: link.target.clone(),
                    value: link.value,
                    width: link.width,
                    path: link.path.as_ref().map(|path| path.to_svg()),
                    color,
                    opacity: opacity(visual.dimmed),
                }
            })
            .collect();

        let legend = NodeCategory::ALL
            .iter()
            .map(|category| {
                let style = theme.style(*category);
                LegendDump {
                    category: *category,
                    label: style.label.clone(),
                    color: style.color.clone(),
                }
            })
            .collect();

        LayoutDump {
            width: layout.width,
            height: layout.height,
            content_height: layout.content_bottom(),
            total_income: layout.total_income,
            type_totals: diagram.type_totals.clone(),
            transform: visuals.transform,
            legend,
            nodes,
            links,
            stats: diagram.stats,
        }
    }
}

/// Writes pretty JSON to `path`, or to stdout when `path` is `None`.
pub fn write_layout_dump(path: Option<&Path>, dump: &LayoutDump) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            let file = File::create(path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, dump)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            serde_json::to_writer_pretty(&mut writer, dump)?;
            writer.write_all(b"\n")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::engine::compute_flow_diagram;
    use crate::ir::FlowRecord;

    #[test]
    fn dump_serializes_geometry_and_dimming() {
        let records = vec![
            FlowRecord::new(100.0).with_entity("p1").with_category("rent"),
            FlowRecord::new(-30.0).with_entity("p2").with_category("tax"),
        ];
        let config = Config::default();
        let diagram = compute_flow_diagram(&records, &config);
        let mut state = InteractionState::default();
        state.hover_node("entity:p1");
        let dump = LayoutDump::from_diagram(&diagram, &state, &config.theme);

        let json = serde_json::to_value(&dump).unwrap();
        assert_eq!(json["totalIncome"], 100.0);
        assert_eq!(json["typeTotals"]["expense"], 30.0);
        assert_eq!(json["legend"].as_array().unwrap().len(), 4);

        let p2 = dump.nodes.iter().find(|node| node.id == "entity:p2").unwrap();
        assert_eq!(p2.opacity, config.theme.dimmed_opacity);
        let p1 = dump.nodes.iter().find(|node| node.id == "entity:p1").unwrap();
        assert_eq!(p1.opacity, 1.0);
        assert!(dump.links.iter().all(|link| link.path.as_deref().is_some_and(|d| d.starts_with('M'))));
        assert!(json["contentHeight"].as_f64().unwrap() <= f64::from(config.layout.height));
    }

    #[test]
    fn content_height_reports_overflowing_columns() {
        let records: Vec<FlowRecord> = (0..40)
            .map(|i| {
                FlowRecord::new(10.0 + f64::from(i))
                    .with_entity(format!("unit-{i}"))
                    .with_category("rent")
            })
            .collect();
        let config = Config::default();
        let diagram = compute_flow_diagram(&records, &config);
        let dump = LayoutDump::from_diagram(&diagram, &InteractionState::default(), &config.theme);
        assert!(dump.content_height > dump.height);
        let lowest = dump
            .nodes
            .iter()
            .map(|node| node.y + node.height)
            .fold(0.0, f32::max);
        assert_eq!(dump.content_height, lowest);
    }
}
