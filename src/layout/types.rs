use crate::ir::{FlowLink, FlowNode, Level, LinkId};

/// A positioned, routed snapshot. Produced fresh by every layout pass.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowLayout {
    pub width: f32,
    pub height: f32,
    pub node_width: f32,
    pub columns: usize,
    pub nodes: Vec<FlowNode>,
    pub links: Vec<FlowLink>,
    pub total_income: f64,
}

impl FlowLayout {
    pub fn node(&self, id: &str) -> Option<&FlowNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn link(&self, id: &LinkId) -> Option<&FlowLink> {
        self.links
            .iter()
            .find(|link| link.source == id.source && link.target == id.target)
    }

    /// Nodes of one column, top to bottom.
    pub fn column(&self, level: Level) -> Vec<&FlowNode> {
        let mut nodes: Vec<&FlowNode> = self
            .nodes
            .iter()
            .filter(|node| node.level == level)
            .collect();
        nodes.sort_by(|a, b| a.y.total_cmp(&b.y));
        nodes
    }

    pub fn incident_links<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a FlowLink> {
        self.links
            .iter()
            .filter(move |link| link.source == node_id || link.target == node_id)
    }

    /// Bottom edge of the lowest node; may exceed `height` when minimum heights pile up.
    pub fn content_bottom(&self) -> f32 {
        self.nodes
            .iter()
            .map(|node| node.y + node.height)
            .fold(0.0, f32::max)
    }
}
