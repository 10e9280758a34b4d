use std::collections::HashSet;

use tracing::trace;

use crate::config::LayoutConfig;
use crate::ir::{FlowGraph, FlowNode};

/// Positions every linked node. Returns fresh copies plus the column count.
pub(super) fn place_columns(graph: &FlowGraph, config: &LayoutConfig) -> (Vec<FlowNode>, usize) {
    let linked: HashSet<&str> = graph
        .links
        .iter()
        .flat_map(|link| [link.source.as_str(), link.target.as_str()])
        .collect();
    let visible: Vec<&FlowNode> = graph
        .nodes
        .iter()
        .filter(|node| linked.contains(node.id.as_str()))
        .collect();

    let Some(max_level) = visible.iter().map(|node| node.level.index()).max() else {
        return (Vec::new(), 0);
    };
    let num_columns = max_level + 1;

    let mut columns: Vec<Vec<&FlowNode>> = vec![Vec::new(); num_columns];
    for node in visible.iter().copied() {
        columns[node.level.index()].push(node);
    }
    for column in &mut columns {
        // Stable: equal values keep insertion order.
        column.sort_by(|a, b| b.value.total_cmp(&a.value));
    }

    let usable_width = (config.width - config.margin_left - config.margin_right).max(0.0);
    let gap_x = if num_columns > 1 {
        ((usable_width - config.node_width * num_columns as f32) / (num_columns - 1) as f32)
            .max(0.0)
    } else {
        0.0
    };
    let available_height = (config.height - config.margin_top - config.margin_bottom).max(0.0);

    let mut placed = Vec::with_capacity(visible.len());
    for (level, column) in columns.iter().enumerate() {
        if column.is_empty() {
            continue;
        }
        let total: f64 = column.iter().map(|node| node.value).sum();
        if !(total.is_finite() && total > 0.0) {
            trace!(column = level, "skipping column without positive total");
            continue;
        }
        let x = config.margin_left + level as f32 * (config.node_width + gap_x);
        let gaps = config.node_gap * (column.len() - 1) as f32;
        let node_space = (available_height - gaps).max(0.0);

        let mut cursor = config.margin_top;
        for node in column {
            let share = (node.value / total) as f32;
            let height = (node_space * share).max(config.min_node_height);
            placed.push(FlowNode {
                x,
                y: cursor,
                width: config.node_width,
                height,
                ..(*node).clone()
            });
            cursor += height + config.node_gap;
        }
    }
    (placed, num_columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{FlowLink, Level, NodeCategory};

    fn node(id: &str, level: Level, value: f64) -> FlowNode {
        FlowNode::new(id, id, NodeCategory::Income, level, value)
    }

    fn graph(nodes: Vec<FlowNode>, links: Vec<FlowLink>) -> FlowGraph {
        FlowGraph {
            nodes,
            links,
            total_income: 0.0,
        }
    }

    #[test]
    fn larger_values_stack_first_and_ties_keep_order() {
        let g = graph(
            vec![
                node("e", Level::Entity, 30.0),
                node("b", Level::Type, 10.0),
                node("c", Level::Type, 10.0),
                node("a", Level::Type, 10.0),
            ],
            vec![
                FlowLink::new("e", "b", 10.0),
                FlowLink::new("e", "c", 10.0),
                FlowLink::new("e", "a", 10.0),
            ],
        );
        let (nodes, columns) = place_columns(&g, &LayoutConfig::default());
        assert_eq!(columns, 2);
        let order: Vec<&str> = nodes
            .iter()
            .filter(|n| n.level == Level::Type)
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(order, vec!["b", "c", "a"]);
    }

    #[test]
    fn small_nodes_get_minimum_height() {
        let g = graph(
            vec![
                node("e", Level::Entity, 1001.0),
                node("big", Level::Type, 1000.0),
                node("tiny", Level::Type, 1.0),
            ],
            vec![
                FlowLink::new("e", "big", 1000.0),
                FlowLink::new("e", "tiny", 1.0),
            ],
        );
        let config = LayoutConfig::default();
        let (nodes, _) = place_columns(&g, &config);
        let tiny = nodes.iter().find(|n| n.id == "tiny").unwrap();
        let big = nodes.iter().find(|n| n.id == "big").unwrap();
        assert_eq!(tiny.height, config.min_node_height);
        assert!((tiny.y - (big.y + big.height + config.node_gap)).abs() < 1e-3);
    }

    #[test]
    fn isolated_nodes_are_not_placed() {
        let g = graph(
            vec![
                node("e", Level::Entity, 5.0),
                node("t", Level::Type, 5.0),
                node("lonely", Level::Category, 9.0),
            ],
            vec![FlowLink::new("e", "t", 5.0)],
        );
        let (nodes, columns) = place_columns(&g, &LayoutConfig::default());
        assert_eq!(columns, 2);
        assert!(nodes.iter().all(|n| n.id != "lonely"));
    }

    #[test]
    fn zero_total_column_is_skipped() {
        let g = graph(
            vec![node("e", Level::Entity, 0.0), node("t", Level::Type, 5.0)],
            vec![FlowLink::new("e", "t", 5.0)],
        );
        let (nodes, _) = place_columns(&g, &LayoutConfig::default());
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].id, "t");
        assert!(nodes[0].height.is_finite());
    }

    #[test]
    fn columns_span_the_canvas() {
        let g = graph(
            vec![
                node("e", Level::Entity, 5.0),
                node("t", Level::Type, 5.0),
                node("c", Level::Category, 5.0),
                node("m", Level::Method, 5.0),
            ],
            vec![
                FlowLink::new("e", "t", 5.0),
                FlowLink::new("t", "c", 5.0),
                FlowLink::new("c", "m", 5.0),
            ],
        );
        let config = LayoutConfig::default();
        let (nodes, columns) = place_columns(&g, &config);
        assert_eq!(columns, 4);
        let first = nodes.iter().find(|n| n.id == "e").unwrap();
        let last = nodes.iter().find(|n| n.id == "m").unwrap();
        assert_eq!(first.x, config.margin_left);
        assert!((last.x + last.width - (config.width - config.margin_right)).abs() < 1e-3);
    }
}
