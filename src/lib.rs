pub mod aggregate;
pub mod classify;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod engine;
pub mod filter;
pub mod interaction;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod theme;

pub use aggregate::{AggregationReport, aggregate, aggregate_with_report};
pub use classify::{Classification, classify};
#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, ConfigError, load_config, parse_config};
pub use engine::{DiagramStats, FlowDiagram, compute_flow_diagram};
pub use filter::{RecordFilter, StatusFilter};
pub use interaction::{DiagramVisuals, InteractionState};
pub use ir::{FlowGraph, FlowKind, FlowLink, FlowNode, FlowRecord, Level, LinkId, NodeCategory};
pub use layout::{FlowLayout, compute_flow_layout};
pub use theme::Theme;
