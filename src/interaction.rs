//! Hover, highlight, zoom and pan state layered over a finished layout.
//!
//! Nothing here writes to a [`FlowLayout`]; visuals are re-derived from
//! scratch on every call.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::config::InteractionConfig;
use crate::ir::{LinkId, NodeCategory};
use crate::layout::FlowLayout;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Transform {
    pub zoom: f32,
    pub pan_x: f32,
    pub pan_y: f32,
}

impl Transform {
    pub fn apply(&self, point: (f32, f32)) -> (f32, f32) {
        (
            point.0 * self.zoom + self.pan_x,
            point.1 * self.zoom + self.pan_y,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InteractionState {
    config: InteractionConfig,
    highlighted_category: Option<NodeCategory>,
    hovered_node: Option<String>,
    hovered_link: Option<LinkId>,
    zoom: f32,
    pan: (f32, f32),
}

impl Default for InteractionState {
    fn default() -> Self {
        Self::new(InteractionConfig::default())
    }
}

impl InteractionState {
    pub fn new(config: InteractionConfig) -> Self {
        Self {
            config,
            highlighted_category: None,
            hovered_node: None,
            hovered_link: None,
            zoom: 1.0,
            pan: (0.0, 0.0),
        }
    }

    pub fn highlighted_category(&self) -> Option<NodeCategory> {
        self.highlighted_category
    }

    pub fn hovered_node(&self) -> Option<&str> {
        self.hovered_node.as_deref()
    }

    pub fn hovered_link(&self) -> Option<&LinkId> {
        self.hovered_link.as_ref()
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn pan(&self) -> (f32, f32) {
        self.pan
    }

    pub fn transform(&self) -> Transform {
        Transform {
            zoom: self.zoom,
            pan_x: self.pan.0,
            pan_y: self.pan.1,
        }
    }

    /// Hovering a node clears any hovered link.
    pub fn hover_node(&mut self, id: impl Into<String>) {
        self.hovered_node = Some(id.into());
        self.hovered_link = None;
    }

    pub fn hover_link(&mut self, id: LinkId) {
        self.hovered_link = Some(id);
        self.hovered_node = None;
    }

    pub fn clear_hover(&mut self) {
        self.hovered_node = None;
        self.hovered_link = None;
    }

    pub fn highlight_category(&mut self, category: Option<NodeCategory>) {
        self.highlighted_category = category;
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        if zoom.is_finite() {
            self.zoom = zoom.clamp(self.config.min_zoom, self.config.max_zoom);
        }
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom * self.config.zoom_step);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom / self.config.zoom_step);
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        if !(dx.is_finite() && dy.is_finite()) {
            return;
        }
        let limit_x = self.config.pan_limit_x;
        let limit_y = self.config.pan_limit_y;
        self.pan = (
            (self.pan.0 + dx).clamp(-limit_x, limit_x),
            (self.pan.1 + dy).clamp(-limit_y, limit_y),
        );
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.config.clone());
    }

    /// The hovered node plus every node one link away from it.
    pub fn connected_nodes(&self, layout: &FlowLayout) -> BTreeSet<String> {
        let mut connected = BTreeSet::new();
        if let Some(hovered) = self.hovered_node.as_deref() {
            if layout.node(hovered).is_none() {
                return connected;
            }
            connected.insert(hovered.to_string());
            for link in layout.incident_links(hovered) {
                connected.insert(link.source.clone());
                connected.insert(link.target.clone());
            }
        } else if let Some(link) = self.hovered_link.as_ref() {
            if layout.link(link).is_some() {
                connected.insert(link.source.clone());
                connected.insert(link.target.clone());
            }
        }
        connected
    }

    /// Derives per-element dim flags. Hover wins over category highlight.
    pub fn visuals(&self, layout: &FlowLayout) -> DiagramVisuals {
        let focus = self.connected_nodes(layout);
        let hovering = !focus.is_empty();

        let nodes = layout
            .nodes
            .iter()
            .map(|node| {
                let dimmed = if hovering {
                    !focus.contains(&node.id)
                } else if let Some(category) = self.highlighted_category {
                    node.category != category
                } else {
                    false
                };
                NodeVisual {
                    id: node.id.clone(),
                    dimmed,
                }
            })
            .collect();

        let links = layout
            .links
            .iter()
            .map(|link| {
                let dimmed = if let Some(hovered) = self.hovered_node.as_deref().filter(|_| hovering)
                {
                    link.source != hovered && link.target != hovered
                } else if let Some(id) = self.hovered_link.as_ref().filter(|_| hovering) {
                    link.source != id.source || link.target != id.target
                } else if let Some(category) = self.highlighted_category {
                    let touches = |id: &str| {
                        layout
                            .node(id)
                            .is_some_and(|node| node.category == category)
                    };
                    !(touches(&link.source) || touches(&link.target))
                } else {
                    false
                };
                LinkVisual {
                    id: link.id(),
                    dimmed,
                }
            })
            .collect();

        DiagramVisuals {
            nodes,
            links,
            transform: self.transform(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeVisual {
    pub id: String,
    pub dimmed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkVisual {
    pub id: LinkId,
    pub dimmed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagramVisuals {
    pub nodes: Vec<NodeVisual>,
    pub links: Vec<LinkVisual>,
    pub transform: Transform,
}

impl DiagramVisuals {
    pub fn node_dimmed(&self, id: &str) -> bool {
        self.nodes
            .iter()
            .find(|visual| visual.id == id)
            .is_some_and(|visual| visual.dimmed)
    }

    pub fn link_dimmed(&self, source: &str, target: &str) -> bool {
        self.links
            .iter()
            .find(|visual| visual.id.source == source && visual.id.target == target)
            .is_some_and(|visual| visual.dimmed)
    }
}
