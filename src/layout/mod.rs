mod columns;
mod routing;
pub(crate) mod types;
pub use types::*;
use columns::*;
use routing::*;

use tracing::debug;

use crate::config::LayoutConfig;
use crate::ir::FlowGraph;

/// Positions nodes column by column and routes every link between them.
///
/// The input graph is never touched; the returned layout owns fresh copies.
pub fn compute_flow_layout(graph: &FlowGraph, config: &LayoutConfig) -> FlowLayout {
    let (nodes, columns) = place_columns(graph, config);
    let links = route_links(&nodes, &graph.links, config);
    debug!(
        nodes = nodes.len(),
        links = links.len(),
        dropped_links = graph.links.len() - links.len(),
        columns,
        "computed flow layout"
    );
    FlowLayout {
        width: config.width,
        height: config.height,
        node_width: config.node_width,
        columns,
        nodes,
        links,
        total_income: graph.total_income,
    }
}
