use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub const UNDATED_MONTH: &str = "undated";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowKind {
    Income,
    Expense,
    Credit,
}

impl FlowKind {
    pub const ALL: [FlowKind; 3] = [FlowKind::Income, FlowKind::Expense, FlowKind::Credit];

    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "income" => Some(Self::Income),
            "expense" => Some(Self::Expense),
            "credit" => Some(Self::Credit),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
            Self::Credit => "credit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowStatus {
    Pending,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeCategory {
    Income,
    Expense,
    Credit,
    Amount,
}

impl NodeCategory {
    pub const ALL: [NodeCategory; 4] = [
        NodeCategory::Income,
        NodeCategory::Expense,
        NodeCategory::Credit,
        NodeCategory::Amount,
    ];

    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "amount" => Some(Self::Amount),
            other => FlowKind::from_token(other).map(Self::from),
        }
    }
}

impl From<FlowKind> for NodeCategory {
    fn from(kind: FlowKind) -> Self {
        match kind {
            FlowKind::Income => Self::Income,
            FlowKind::Expense => Self::Expense,
            FlowKind::Credit => Self::Credit,
        }
    }
}

/// Column rank of a node. The discriminant is the column index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Entity = 0,
    Type = 1,
    Category = 2,
    Method = 3,
}

impl Level {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn next(self) -> Option<Level> {
        match self {
            Self::Entity => Some(Self::Type),
            Self::Type => Some(Self::Category),
            Self::Category => Some(Self::Method),
            Self::Method => None,
        }
    }

    /// Recovers the level from a structural node id prefix.
    pub fn from_node_id(id: &str) -> Option<Level> {
        let (prefix, _) = id.split_once(':')?;
        match prefix {
            "entity" => Some(Self::Entity),
            "type" => Some(Self::Type),
            "category" => Some(Self::Category),
            "method" => Some(Self::Method),
            _ => None,
        }
    }
}

/// One transaction-like input fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowRecord {
    /// `NaN` when the input carried no usable number; such records are skipped.
    #[serde(default = "missing_amount", deserialize_with = "lenient_amount")]
    pub amount: f64,
    #[serde(default, deserialize_with = "lenient_kind")]
    pub kind: Option<FlowKind>,
    #[serde(default)]
    pub category_label: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub source_entity_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: Option<FlowStatus>,
}

impl FlowRecord {
    pub fn new(amount: f64) -> Self {
        Self {
            amount,
            kind: None,
            category_label: None,
            payment_method: None,
            source_entity_id: None,
            date: None,
            status: None,
        }
    }

    pub fn with_kind(mut self, kind: FlowKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_category(mut self, label: impl Into<String>) -> Self {
        self.category_label = Some(label.into());
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.payment_method = Some(method.into());
        self
    }

    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.source_entity_id = Some(entity.into());
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        self
    }

    pub fn with_status(mut self, status: FlowStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Calendar month bucket (`YYYY-MM`), or `undated`.
    pub fn month_key(&self) -> String {
        match self.date {
            Some(date) => format!("{:04}-{:02}", date.year(), date.month()),
            None => UNDATED_MONTH.to_string(),
        }
    }
}

fn missing_amount() -> f64 {
    f64::NAN
}

fn lenient_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::Number(number)) => number.as_f64().unwrap_or(f64::NAN),
        Some(serde_json::Value::String(text)) => text.trim().parse().unwrap_or(f64::NAN),
        _ => f64::NAN,
    })
}

fn lenient_kind<'de, D>(deserializer: D) -> Result<Option<FlowKind>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(|value| value.as_str())
        .and_then(FlowKind::from_token))
}

fn lenient_status<'de, D>(deserializer: D) -> Result<Option<FlowStatus>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(|value| value.as_str()).and_then(|text| {
        match text.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(FlowStatus::Pending),
            "completed" => Some(FlowStatus::Completed),
            _ => None,
        }
    }))
}

fn lenient_date<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(|value| value.as_str())
        .and_then(parse_timestamp))
}

/// Accepts RFC 3339 timestamps and bare `YYYY-MM-DD` dates.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct LinkId {
    pub source: String,
    pub target: String,
}

impl LinkId {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Aggregated node. Geometry stays zero until a layout pass produces a
/// positioned copy.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowNode {
    pub id: String,
    pub display_name: String,
    pub category: NodeCategory,
    pub value: f64,
    pub level: Level,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl FlowNode {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        category: NodeCategory,
        level: Level,
        value: f64,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            category,
            value,
            level,
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
        }
    }
}

/// Cubic Bézier from the right edge of the source to the left edge of the target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkPath {
    pub start: (f32, f32),
    pub control1: (f32, f32),
    pub control2: (f32, f32),
    pub end: (f32, f32),
}

impl LinkPath {
    pub fn to_svg(&self) -> String {
        format!(
            "M{:.2},{:.2} C{:.2},{:.2} {:.2},{:.2} {:.2},{:.2}",
            self.start.0,
            self.start.1,
            self.control1.0,
            self.control1.1,
            self.control2.0,
            self.control2.1,
            self.end.0,
            self.end.1
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlowLink {
    pub source: String,
    pub target: String,
    pub value: f64,
    pub width: f32,
    pub path: Option<LinkPath>,
}

impl FlowLink {
    pub fn new(source: impl Into<String>, target: impl Into<String>, value: f64) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            value,
            width: 0.0,
            path: None,
        }
    }

    pub fn id(&self) -> LinkId {
        LinkId::new(self.source.clone(), self.target.clone())
    }
}

/// Output of one aggregation pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FlowGraph {
    pub nodes: Vec<FlowNode>,
    pub links: Vec<FlowLink>,
    pub total_income: f64,
}

impl FlowGraph {
    pub fn node(&self, id: &str) -> Option<&FlowNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn nodes_at(&self, level: Level) -> impl Iterator<Item = &FlowNode> {
        self.nodes.iter().filter(move |node| node.level == level)
    }

    /// Sum of level-1 node values for one kind.
    pub fn type_total(&self, kind: FlowKind) -> f64 {
        self.nodes_at(Level::Type)
            .filter(|node| node.category == NodeCategory::from(kind))
            .map(|node| node.value)
            .sum()
    }
}
