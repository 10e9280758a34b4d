use std::collections::BTreeMap;
use std::time::Instant;

use serde::Serialize;
use tracing::info;

use crate::aggregate::aggregate_with_report;
use crate::config::Config;
use crate::ir::{FlowKind, FlowRecord};
use crate::layout::{FlowLayout, compute_flow_layout};

/// Size and cost of one computation, for a caller-side performance indicator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramStats {
    pub node_count: usize,
    pub link_count: usize,
    pub compute_time_ms: f64,
    pub degraded: bool,
    pub collapsed_nodes: usize,
    pub records_skipped: usize,
}

#[derive(Debug, Clone)]
pub struct FlowDiagram {
    pub layout: FlowLayout,
    pub type_totals: BTreeMap<FlowKind, f64>,
    pub stats: DiagramStats,
}

impl FlowDiagram {
    pub fn total_income(&self) -> f64 {
        self.layout.total_income
    }
}

/// Aggregates `records` and lays the result out. Never fails; dirty records
/// are skipped or bucketed.
pub fn compute_flow_diagram(records: &[FlowRecord], config: &Config) -> FlowDiagram {
    let started = Instant::now();
    let (graph, report) = aggregate_with_report(records, &config.aggregate);
    let type_totals = FlowKind::ALL
        .iter()
        .map(|kind| (*kind, graph.type_total(*kind)))
        .collect();
    let layout = compute_flow_layout(&graph, &config.layout);
    let stats = DiagramStats {
        node_count: layout.nodes.len(),
        link_count: layout.links.len(),
        compute_time_ms: started.elapsed().as_secs_f64() * 1000.0,
        degraded: report.degraded,
        collapsed_nodes: report.collapsed_nodes,
        records_skipped: report.records_skipped,
    };
    info!(
        nodes = stats.node_count,
        links = stats.link_count,
        ms = stats.compute_time_ms,
        degraded = stats.degraded,
        "flow diagram ready"
    );
    FlowDiagram {
        layout,
        type_totals,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_match_layout() {
        let records = vec![
            FlowRecord::new(10.0).with_entity("a"),
            FlowRecord::new(-4.0).with_entity("a"),
            FlowRecord::new(f64::NAN),
        ];
        let diagram = compute_flow_diagram(&records, &Config::default());
        assert_eq!(diagram.stats.node_count, diagram.layout.nodes.len());
        assert_eq!(diagram.stats.link_count, diagram.layout.links.len());
        assert_eq!(diagram.stats.records_skipped, 1);
        assert!(!diagram.stats.degraded);
        assert!(diagram.stats.compute_time_ms >= 0.0);
        assert_eq!(diagram.type_totals[&FlowKind::Income], 10.0);
        assert_eq!(diagram.type_totals[&FlowKind::Expense], 4.0);
        assert_eq!(diagram.type_totals[&FlowKind::Credit], 0.0);
        assert_eq!(diagram.total_income(), 10.0);
    }
}
