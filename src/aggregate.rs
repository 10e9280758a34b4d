use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::Hash;

use tracing::{debug, info, trace};

use crate::classify::classify_record;
use crate::config::AggregateConfig;
use crate::ir::{FlowGraph, FlowKind, FlowLink, FlowNode, FlowRecord, Level, NodeCategory};

/// Running sums that remember first-insertion order.
#[derive(Debug)]
struct Buckets<K> {
    index: HashMap<K, usize>,
    entries: Vec<(K, f64)>,
}

impl<K: Clone + Eq + Hash> Buckets<K> {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }

    fn add(&mut self, key: K, amount: f64) {
        match self.index.get(&key) {
            Some(&idx) => self.entries[idx].1 += amount,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, amount));
            }
        }
    }

    fn iter(&self) -> impl Iterator<Item = &(K, f64)> {
        self.entries.iter().filter(|(_, total)| *total > 0.0)
    }
}

type CategoryKey = (FlowKind, String);
type LeafKey = (FlowKind, String, String);

/// Percent-escapes the id separators so free-text parts cannot run into each other.
fn id_part(raw: &str) -> Cow<'_, str> {
    if !raw.contains(['%', ':', '~']) {
        return Cow::Borrowed(raw);
    }
    let mut escaped = String::with_capacity(raw.len() + 8);
    for ch in raw.chars() {
        match ch {
            '%' => escaped.push_str("%25"),
            ':' => escaped.push_str("%3A"),
            '~' => escaped.push_str("%7E"),
            other => escaped.push(other),
        }
    }
    Cow::Owned(escaped)
}

pub fn entity_node_id(entity: &str) -> String {
    format!("entity:{}", id_part(entity))
}

pub fn type_node_id(kind: FlowKind) -> String {
    format!("type:{}", kind.as_str())
}

pub fn category_node_id(kind: FlowKind, label: &str) -> String {
    format!("category:{}:{}", kind.as_str(), id_part(label))
}

pub fn method_node_id(kind: FlowKind, label: &str, method: &str) -> String {
    format!(
        "method:{}:{}:{}",
        kind.as_str(),
        id_part(label),
        id_part(method)
    )
}

fn collapsed_node_id(parent_id: &str, month: &str) -> String {
    let rest = parent_id.strip_prefix("category:").unwrap_or(parent_id);
    format!("method:{rest}:~{month}")
}

pub fn kind_label(kind: FlowKind) -> &'static str {
    match kind {
        FlowKind::Income => "Income",
        FlowKind::Expense => "Expenses",
        FlowKind::Credit => "Credit",
    }
}

/// Counters describing one aggregation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AggregationReport {
    pub records_seen: usize,
    pub records_skipped: usize,
    pub nodes_before_collapse: usize,
    pub links_before_collapse: usize,
    pub collapsed_nodes: usize,
    pub degraded: bool,
}

pub fn aggregate(records: &[FlowRecord], config: &AggregateConfig) -> FlowGraph {
    aggregate_with_report(records, config).0
}

pub fn aggregate_with_report(
    records: &[FlowRecord],
    config: &AggregateConfig,
) -> (FlowGraph, AggregationReport) {
    let mut report = AggregationReport {
        records_seen: records.len(),
        ..Default::default()
    };

    let mut entities: Buckets<String> = Buckets::new();
    let mut types: Buckets<FlowKind> = Buckets::new();
    let mut categories: Buckets<CategoryKey> = Buckets::new();
    let mut leaves: Buckets<LeafKey> = Buckets::new();
    let mut entity_type: Buckets<(String, FlowKind)> = Buckets::new();
    let mut leaf_months: HashMap<LeafKey, BTreeMap<String, f64>> = HashMap::new();

    for (idx, record) in records.iter().enumerate() {
        let Some(classified) = classify_record(record, config) else {
            trace!(record = idx, amount = record.amount, "skipping uncountable record");
            report.records_skipped += 1;
            continue;
        };
        let amount = classified.amount;
        let kind = classified.kind;
        let leaf_key = (kind, classified.category.clone(), classified.method);

        entities.add(classified.entity.clone(), amount);
        types.add(kind, amount);
        categories.add((kind, classified.category), amount);
        entity_type.add((classified.entity, kind), amount);
        *leaf_months
            .entry(leaf_key.clone())
            .or_default()
            .entry(classified.month)
            .or_insert(0.0) += amount;
        leaves.add(leaf_key, amount);
    }

    let mut entity_shares: HashMap<&str, [f64; 3]> = HashMap::new();
    for ((entity, kind), total) in entity_type.iter() {
        let slot = FlowKind::ALL
            .iter()
            .position(|candidate| candidate == kind)
            .unwrap_or(0);
        entity_shares.entry(entity.as_str()).or_insert([0.0; 3])[slot] += *total;
    }

    let mut nodes = Vec::new();
    for (entity, total) in entities.iter() {
        let category = entity_shares
            .get(entity.as_str())
            .map(dominant_kind)
            .map(NodeCategory::from)
            .unwrap_or(NodeCategory::Amount);
        let display_name = if *entity == config.no_entity_id {
            config.no_entity_label.clone()
        } else {
            entity.clone()
        };
        nodes.push(FlowNode::new(
            entity_node_id(entity),
            display_name,
            category,
            Level::Entity,
            *total,
        ));
    }
    for (kind, total) in types.iter() {
        nodes.push(FlowNode::new(
            type_node_id(*kind),
            kind_label(*kind),
            NodeCategory::from(*kind),
            Level::Type,
            *total,
        ));
    }
    for ((kind, label), total) in categories.iter() {
        nodes.push(FlowNode::new(
            category_node_id(*kind, label),
            label.clone(),
            NodeCategory::from(*kind),
            Level::Category,
            *total,
        ));
    }
    let mut node_months: HashMap<String, String> = HashMap::new();
    for (key, total) in leaves.iter() {
        let (kind, label, method) = key;
        let id = method_node_id(*kind, label, method);
        if let Some(month) = leaf_months.get(key).map(dominant_month) {
            node_months.insert(id.clone(), month);
        }
        nodes.push(FlowNode::new(
            id,
            method.clone(),
            NodeCategory::Amount,
            Level::Method,
            *total,
        ));
    }

    let mut links = Vec::new();
    for ((entity, kind), total) in entity_type.iter() {
        links.push(FlowLink::new(
            entity_node_id(entity),
            type_node_id(*kind),
            *total,
        ));
    }
    for ((kind, label), total) in categories.iter() {
        links.push(FlowLink::new(
            type_node_id(*kind),
            category_node_id(*kind, label),
            *total,
        ));
    }
    for ((kind, label, method), total) in leaves.iter() {
        links.push(FlowLink::new(
            category_node_id(*kind, label),
            method_node_id(*kind, label, method),
            *total,
        ));
    }

    report.nodes_before_collapse = nodes.len();
    report.links_before_collapse = links.len();

    let mut graph = FlowGraph {
        nodes,
        links,
        total_income: 0.0,
    };

    if graph.nodes.len() > config.max_nodes || graph.links.len() > config.max_links {
        report.degraded = true;
        report.collapsed_nodes = collapse_amount_nodes(&mut graph, &node_months);
        info!(
            nodes_before = report.nodes_before_collapse,
            links_before = report.links_before_collapse,
            nodes_after = graph.nodes.len(),
            links_after = graph.links.len(),
            "degradation pass collapsed amount nodes"
        );
    }

    drop_isolated_nodes(&mut graph);
    graph.total_income = graph
        .nodes_at(Level::Type)
        .filter(|node| node.category == NodeCategory::Income)
        .map(|node| node.value)
        .sum();

    debug!(
        records = report.records_seen,
        skipped = report.records_skipped,
        nodes = graph.nodes.len(),
        links = graph.links.len(),
        total_income = graph.total_income,
        "aggregated flow records"
    );
    (graph, report)
}

fn dominant_kind(shares: &[f64; 3]) -> FlowKind {
    let mut best = 0;
    for idx in 1..shares.len() {
        if shares[idx] > shares[best] {
            best = idx;
        }
    }
    FlowKind::ALL[best]
}

/// Month carrying the largest amount; the earliest month wins ties.
fn dominant_month(months: &BTreeMap<String, f64>) -> String {
    let mut best: Option<(&String, f64)> = None;
    for (month, total) in months {
        if best.is_none_or(|(_, current)| *total > current) {
            best = Some((month, *total));
        }
    }
    best.map(|(month, _)| month.clone()).unwrap_or_default()
}

/// Merges level-3 amount nodes sharing a parent and a calendar month into one
/// synthetic node per group. Returns the number of nodes removed.
fn collapse_amount_nodes(graph: &mut FlowGraph, node_months: &HashMap<String, String>) -> usize {
    let mut parent_of: HashMap<&str, &str> = HashMap::new();
    for link in &graph.links {
        parent_of.insert(link.target.as_str(), link.source.as_str());
    }

    let mut groups: BTreeMap<(String, String), Vec<String>> = BTreeMap::new();
    for node in &graph.nodes {
        if node.level != Level::Method || node.category != NodeCategory::Amount {
            continue;
        }
        let (Some(parent), Some(month)) = (parent_of.get(node.id.as_str()), node_months.get(&node.id))
        else {
            continue;
        };
        groups
            .entry(((*parent).to_string(), month.clone()))
            .or_default()
            .push(node.id.clone());
    }

    let mut replacement: HashMap<String, String> = HashMap::new();
    let mut synthetic: HashMap<String, FlowNode> = HashMap::new();
    for ((parent, month), members) in &groups {
        if members.len() < 2 {
            continue;
        }
        let id = collapsed_node_id(parent, month);
        let name = format!("{month} ({} methods)", members.len());
        synthetic.insert(
            id.clone(),
            FlowNode::new(id.clone(), name, NodeCategory::Amount, Level::Method, 0.0),
        );
        for member in members {
            replacement.insert(member.clone(), id.clone());
        }
    }
    if replacement.is_empty() {
        return 0;
    }
    for node in &graph.nodes {
        if let Some(merged) = replacement
            .get(&node.id)
            .and_then(|target| synthetic.get_mut(target))
        {
            merged.value += node.value;
        }
    }

    let before = graph.nodes.len();
    let mut emitted: HashSet<String> = HashSet::new();
    let mut nodes = Vec::with_capacity(before);
    for node in graph.nodes.drain(..) {
        match replacement.get(&node.id) {
            Some(target) => {
                if emitted.insert(target.clone()) {
                    if let Some(merged) = synthetic.remove(target) {
                        nodes.push(merged);
                    }
                }
            }
            None => nodes.push(node),
        }
    }
    graph.nodes = nodes;

    let mut link_index: HashMap<(String, String), usize> = HashMap::new();
    let mut links: Vec<FlowLink> = Vec::with_capacity(graph.links.len());
    for mut link in graph.links.drain(..) {
        if let Some(target) = replacement.get(&link.target) {
            link.target = target.clone();
        }
        let key = (link.source.clone(), link.target.clone());
        match link_index.get(&key) {
            Some(&idx) => links[idx].value += link.value,
            None => {
                link_index.insert(key, links.len());
                links.push(link);
            }
        }
    }
    graph.links = links;

    before - graph.nodes.len()
}

fn drop_isolated_nodes(graph: &mut FlowGraph) {
    let touched: HashSet<&str> = graph
        .links
        .iter()
        .flat_map(|link| [link.source.as_str(), link.target.as_str()])
        .collect();
    graph.nodes.retain(|node| {
        let kept = touched.contains(node.id.as_str());
        if !kept {
            trace!(node = %node.id, "dropping isolated node");
        }
        kept
    });
}
