use crate::config::load_config;
use crate::engine::compute_flow_diagram;
use crate::filter::{RecordFilter, StatusFilter};
use crate::interaction::InteractionState;
use crate::ir::{FlowRecord, LinkId, NodeCategory};
use crate::layout_dump::{LayoutDump, write_layout_dump};
use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to read records from {source_name}: {source}")]
    Read {
        source_name: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse records from {source_name}: {source}")]
    Parse {
        source_name: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Parser, Debug)]
#[command(
    name = "cfsankey",
    version,
    about = "Lay out a cashflow Sankey diagram from flow records"
)]
pub struct Args {
    /// Input JSON array of flow records, or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file for the layout JSON. Defaults to stdout.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Config file (JSON5)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Canvas width
    #[arg(short = 'w', long = "width")]
    pub width: Option<f32>,

    /// Canvas height
    #[arg(short = 'H', long = "height")]
    pub height: Option<f32>,

    /// Record status to keep
    #[arg(long = "status", value_enum, default_value = "all")]
    pub status: StatusArg,

    /// First day of the window (YYYY-MM-DD, inclusive)
    #[arg(long = "from")]
    pub from: Option<NaiveDate>,

    /// Last day of the window (YYYY-MM-DD, inclusive)
    #[arg(long = "to")]
    pub to: Option<NaiveDate>,

    /// Node id to hover; its one-hop neighborhood stays opaque
    #[arg(long = "hover")]
    pub hover: Option<String>,

    /// Link to hover, as SOURCE_ID=>TARGET_ID
    #[arg(long = "hover-link")]
    pub hover_link: Option<String>,

    /// Category to highlight
    #[arg(long = "highlight", value_enum)]
    pub highlight: Option<CategoryArg>,

    /// Zoom factor (clamped to the configured bounds)
    #[arg(long = "zoom")]
    pub zoom: Option<f32>,

    /// Verbose logging to stderr
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum StatusArg {
    Pending,
    Completed,
    All,
}

impl From<StatusArg> for StatusFilter {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Pending => StatusFilter::Pending,
            StatusArg::Completed => StatusFilter::Completed,
            StatusArg::All => StatusFilter::All,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum CategoryArg {
    Income,
    Expense,
    Credit,
    Amount,
}

impl From<CategoryArg> for NodeCategory {
    fn from(arg: CategoryArg) -> Self {
        match arg {
            CategoryArg::Income => NodeCategory::Income,
            CategoryArg::Expense => NodeCategory::Expense,
            CategoryArg::Credit => NodeCategory::Credit,
            CategoryArg::Amount => NodeCategory::Amount,
        }
    }
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = load_config(args.config.as_deref())?;
    if let Some(width) = args.width {
        config.layout.width = width;
    }
    if let Some(height) = args.height {
        config.layout.height = height;
    }
    config.validate()?;

    let records = read_records(args.input.as_deref())?;
    let filter = RecordFilter {
        status: args.status.into(),
        from: args.from,
        to: args.to,
    };
    let selected = filter.apply(&records);
    debug!(
        total = records.len(),
        selected = selected.len(),
        "filtered flow records"
    );

    let diagram = compute_flow_diagram(&selected, &config);

    let mut state = InteractionState::new(config.interaction.clone());
    if let Some(node) = args.hover {
        state.hover_node(node);
    }
    if let Some(link) = args.hover_link.as_deref() {
        state.hover_link(parse_link_id(link)?);
    }
    state.highlight_category(args.highlight.map(NodeCategory::from));
    if let Some(zoom) = args.zoom {
        state.set_zoom(zoom);
    }

    let dump = LayoutDump::from_diagram(&diagram, &state, &config.theme);
    write_layout_dump(args.output.as_deref(), &dump)?;
    info!(
        nodes = diagram.stats.node_count,
        links = diagram.stats.link_count,
        ms = diagram.stats.compute_time_ms,
        "wrote layout"
    );
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("CFSANKEY_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn read_records(path: Option<&Path>) -> Result<Vec<FlowRecord>, InputError> {
    let (source_name, text) = match path {
        Some(path) if path != Path::new("-") => {
            let text = std::fs::read_to_string(path).map_err(|source| InputError::Read {
                source_name: path.display().to_string(),
                source,
            })?;
            (path.display().to_string(), text)
        }
        _ => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .map_err(|source| InputError::Read {
                    source_name: "stdin".to_string(),
                    source,
                })?;
            ("stdin".to_string(), buf)
        }
    };
    parse_records(&text).map_err(|source| InputError::Parse {
        source_name,
        source,
    })
}

/// Accepts a bare array or an object with a `records` array.
pub fn parse_records(text: &str) -> Result<Vec<FlowRecord>, serde_json::Error> {
    #[derive(serde::Deserialize)]
    #[serde(untagged)]
    enum RecordsFile {
        Bare(Vec<FlowRecord>),
        Wrapped { records: Vec<FlowRecord> },
    }
    Ok(match serde_json::from_str::<RecordsFile>(text)? {
        RecordsFile::Bare(records) => records,
        RecordsFile::Wrapped { records } => records,
    })
}

fn parse_link_id(text: &str) -> Result<LinkId> {
    let (source, target) = text
        .split_once("=>")
        .ok_or_else(|| anyhow::anyhow!("hover link must look like SOURCE=>TARGET, got '{text}'"))?;
    Ok(LinkId::new(source.trim(), target.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_and_wrapped_record_lists() {
        let bare = parse_records(r#"[{"amount": 5}, {"amount": -2, "kind": "expense"}]"#).unwrap();
        assert_eq!(bare.len(), 2);
        let wrapped = parse_records(r#"{"records": [{"amount": 1.5}]}"#).unwrap();
        assert_eq!(wrapped[0].amount, 1.5);
    }

    #[test]
    fn one_bad_amount_does_not_reject_the_batch() {
        let records =
            parse_records(r#"[{"amount": 100}, {"amount": null}, {"categoryLabel": "rent"}]"#)
                .unwrap();
        assert_eq!(records.len(), 3);
        let diagram = compute_flow_diagram(&records, &crate::config::Config::default());
        assert_eq!(diagram.stats.records_skipped, 2);
        assert_eq!(diagram.total_income(), 100.0);
    }

    #[test]
    fn parses_hover_link_ids() {
        let id = parse_link_id("type:income => category:income:rent").unwrap();
        assert_eq!(id, LinkId::new("type:income", "category:income:rent"));
        assert!(parse_link_id("type:income").is_err());
    }

    #[test]
    fn args_parse_filters() {
        let args = Args::try_parse_from([
            "cfsankey",
            "-i",
            "records.json",
            "--status",
            "completed",
            "--from",
            "2024-01-01",
            "--highlight",
            "credit",
        ])
        .unwrap();
        assert!(matches!(args.status, StatusArg::Completed));
        assert_eq!(args.from, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert!(matches!(args.highlight, Some(CategoryArg::Credit)));
    }
}
