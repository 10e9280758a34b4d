use std::collections::HashMap;

use tracing::trace;

use crate::config::LayoutConfig;
use crate::ir::{FlowLink, FlowNode, LinkPath};

/// Slices each node's height among its links and builds S-curves between
/// the slices. Links with an unknown endpoint or a non-positive value are dropped.
pub(super) fn route_links(
    nodes: &[FlowNode],
    links: &[FlowLink],
    config: &LayoutConfig,
) -> Vec<FlowLink> {
    let index: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| (node.id.as_str(), idx))
        .collect();

    struct Routable {
        link_idx: usize,
        from: usize,
        to: usize,
    }

    let mut routable = Vec::with_capacity(links.len());
    for (link_idx, link) in links.iter().enumerate() {
        let (Some(&from), Some(&to)) = (
            index.get(link.source.as_str()),
            index.get(link.target.as_str()),
        ) else {
            trace!(source = %link.source, target = %link.target, "dropping dangling link");
            continue;
        };
        let usable = link.value.is_finite()
            && link.value > 0.0
            && nodes[from].value > 0.0
            && nodes[to].value > 0.0;
        if !usable {
            trace!(source = %link.source, target = %link.target, "dropping zero-value link");
            continue;
        }
        routable.push(Routable { link_idx, from, to });
    }

    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    let mut incoming: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    for (slot, route) in routable.iter().enumerate() {
        outgoing[route.from].push(slot);
        incoming[route.to].push(slot);
    }
    // Stack slices in the vertical order of the opposite endpoint to avoid crossings.
    for slots in &mut outgoing {
        slots.sort_by(|a, b| nodes[routable[*a].to].y.total_cmp(&nodes[routable[*b].to].y));
    }
    for slots in &mut incoming {
        slots.sort_by(|a, b| {
            nodes[routable[*a].from]
                .y
                .total_cmp(&nodes[routable[*b].from].y)
        });
    }

    let mut source_mid = vec![0.0f32; routable.len()];
    let mut source_slice = vec![0.0f32; routable.len()];
    for (node_idx, slots) in outgoing.iter().enumerate() {
        let node = &nodes[node_idx];
        let mut offset = 0.0f32;
        for &slot in slots {
            let ratio = (links[routable[slot].link_idx].value / node.value) as f32;
            let slice = node.height * ratio;
            source_mid[slot] = node.y + offset + slice / 2.0;
            source_slice[slot] = slice;
            offset += slice;
        }
    }

    let mut target_mid = vec![0.0f32; routable.len()];
    let mut target_slice = vec![0.0f32; routable.len()];
    for (node_idx, slots) in incoming.iter().enumerate() {
        let node = &nodes[node_idx];
        let mut offset = 0.0f32;
        for &slot in slots {
            let ratio = (links[routable[slot].link_idx].value / node.value) as f32;
            let slice = node.height * ratio;
            target_mid[slot] = node.y + offset + slice / 2.0;
            target_slice[slot] = slice;
            offset += slice;
        }
    }

    routable
        .iter()
        .enumerate()
        .map(|(slot, route)| {
            let link = &links[route.link_idx];
            let source = &nodes[route.from];
            let target = &nodes[route.to];
            let width = stroke_width(
                link.value,
                source_slice[slot],
                target_slice[slot],
                source.height.min(target.height),
                config.min_link_width,
            );
            let path = curve_between(
                (source.x + source.width, source_mid[slot]),
                (target.x, target_mid[slot]),
                config.curvature,
            );
            FlowLink {
                width,
                path: Some(path),
                ..link.clone()
            }
        })
        .collect()
}

/// Never wider than either slice, except that tiny flows keep a
/// `log10(value)`-driven floor, itself capped by the smaller endpoint.
pub(super) fn stroke_width(
    value: f64,
    source_slice: f32,
    target_slice: f32,
    endpoint_cap: f32,
    min_width: f32,
) -> f32 {
    let capacity = source_slice.min(target_slice);
    let floor = (value.log10() as f32).max(min_width);
    capacity.max(floor).min(endpoint_cap).max(0.0)
}

pub(super) fn curve_between(start: (f32, f32), end: (f32, f32), curvature: f32) -> LinkPath {
    let dx = end.0 - start.0;
    LinkPath {
        start,
        control1: (start.0 + dx * curvature, start.1),
        control2: (start.0 + dx * (1.0 - curvature), end.1),
        end,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Level, NodeCategory};

    fn placed(id: &str, level: Level, value: f64, x: f32, y: f32, height: f32) -> FlowNode {
        FlowNode {
            x,
            y,
            width: 20.0,
            height,
            ..FlowNode::new(id, id, NodeCategory::Income, level, value)
        }
    }

    #[test]
    fn control_points_sit_at_forty_and_sixty_percent() {
        let path = curve_between((0.0, 10.0), (100.0, 90.0), 0.4);
        let close =
            |a: (f32, f32), b: (f32, f32)| (a.0 - b.0).abs() < 1e-3 && (a.1 - b.1).abs() < 1e-3;
        assert!(close(path.control1, (40.0, 10.0)), "{:?}", path.control1);
        assert!(close(path.control2, (60.0, 90.0)), "{:?}", path.control2);
        assert_eq!(path.end, (100.0, 90.0));
    }

    #[test]
    fn slices_split_source_height_proportionally() {
        let nodes = vec![
            placed("s", Level::Entity, 100.0, 0.0, 0.0, 200.0),
            placed("a", Level::Type, 75.0, 300.0, 0.0, 150.0),
            placed("b", Level::Type, 25.0, 300.0, 160.0, 50.0),
        ];
        let links = vec![
            FlowLink::new("s", "b", 25.0),
            FlowLink::new("s", "a", 75.0),
        ];
        let routed = route_links(&nodes, &links, &LayoutConfig::default());
        assert_eq!(routed.len(), 2);
        // "a" sits higher, so its slice is stacked first.
        let to_a = routed.iter().find(|l| l.target == "a").unwrap();
        let to_b = routed.iter().find(|l| l.target == "b").unwrap();
        assert_eq!(to_a.path.unwrap().start, (20.0, 75.0));
        assert_eq!(to_b.path.unwrap().start, (20.0, 175.0));
        assert_eq!(to_a.path.unwrap().end, (300.0, 75.0));
        assert_eq!(to_a.width, 150.0);
        assert_eq!(to_b.width, 50.0);
    }

    #[test]
    fn dangling_and_zero_links_are_dropped() {
        let nodes = vec![
            placed("s", Level::Entity, 10.0, 0.0, 0.0, 50.0),
            placed("t", Level::Type, 10.0, 100.0, 0.0, 50.0),
        ];
        let links = vec![
            FlowLink::new("s", "t", 10.0),
            FlowLink::new("s", "ghost", 4.0),
            FlowLink::new("s", "t", 0.0),
        ];
        let routed = route_links(&nodes, &links, &LayoutConfig::default());
        assert_eq!(routed.len(), 1);
        assert_eq!(routed[0].target, "t");
    }

    #[test]
    fn tiny_flows_keep_a_visible_floor() {
        let width = stroke_width(5000.0, 0.2, 0.3, 25.0, 1.0);
        assert!((width - 5000f64.log10() as f32).abs() < 1e-4);
        assert_eq!(stroke_width(0.5, 0.01, 0.01, 25.0, 1.0), 1.0);
        assert_eq!(stroke_width(1e9, 0.1, 0.1, 4.0, 1.0), 4.0);
        assert_eq!(stroke_width(10.0, 30.0, 12.0, 40.0, 1.0), 12.0);
    }
}
