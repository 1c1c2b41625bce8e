use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Rank of a unit in the two-level hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitRank {
    /// Top-level unit, a direct child of the implicit root.
    Area,
    /// Second-level unit owning items directly.
    Group,
}

/// A hierarchy node as read from the record source. Never mutated here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: String,
    pub rank: UnitRank,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    /// Designated owner (e.g. an assigned reviewer); groups only.
    #[serde(default)]
    pub owner: Option<String>,
}

fn default_active() -> bool {
    true
}

impl Unit {
    pub fn area(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            rank: UnitRank::Area,
            parent: None,
            active: true,
            owner: None,
        }
    }

    pub fn group(id: impl Into<String>, parent: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            rank: UnitRank::Group,
            parent: Some(parent.into()),
            active: true,
            owner: None,
        }
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Label shown in charts. Inactive units are parenthesized.
    pub fn display_label(&self) -> String {
        if self.active {
            self.id.clone()
        } else {
            format!("({})", self.id)
        }
    }
}

/// Strips the inactive decoration from a display label, giving the unit id.
pub fn canonical_key(label: &str) -> &str {
    label
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .unwrap_or(label)
}

/// A weighted element (a document) owned by one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub unit: String,
    /// Missing, null or empty sizes count as zero.
    #[serde(default, deserialize_with = "lenient_size")]
    pub size: f64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub revised_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub replaced_by: Option<String>,
}

fn lenient_size<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}

impl Item {
    pub fn new(id: impl Into<String>, unit: impl Into<String>, size: f64) -> Self {
        Self {
            id: id.into(),
            unit: unit.into(),
            size,
            name: None,
            approved_at: None,
            revised_at: None,
            state: None,
            replaced_by: None,
        }
    }

    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// Everything one run reads from the record source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    pub units: Vec<Unit>,
    pub items: Vec<Item>,
}

/// Numeric column selected for a reallocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Count,
    Size,
}

impl Metric {
    pub const ALL: [Metric; 2] = [Metric::Count, Metric::Size];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Count => "count",
            Metric::Size => "size",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowKind {
    Area,
    Owner,
    Group,
    Item,
}

/// One node of the aggregated hierarchy.
///
/// `name` and `parent` are display labels; `key` and `bucket` are canonical
/// unit ids and are what every lookup compares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRow {
    pub name: String,
    pub count: u64,
    pub size: f64,
    pub parent: String,
    pub bucket: String,
    pub key: String,
    pub kind: RowKind,
}

impl AggregateRow {
    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Count => self.count as f64,
            Metric::Size => self.size,
        }
    }
}

/// Data-quality findings that do not stop an aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AggregateWarning {
    /// An owner appears under more than one area and got a minted label.
    AmbiguousOwner {
        owner: String,
        area: String,
        label: String,
    },
    /// Item whose unit is not a known group; it is not counted.
    UnattributedItem { item: String, unit: String },
    /// Item of a group whose parent is not a known area; it is not counted.
    DetachedGroup {
        item: String,
        group: String,
        parent: Option<String>,
    },
}

/// Output of the aggregator: ordered rows plus the root sentinel they hang off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateTable {
    pub root: String,
    pub rows: Vec<AggregateRow>,
    #[serde(default)]
    pub warnings: Vec<AggregateWarning>,
}

impl AggregateTable {
    pub fn areas(&self) -> impl Iterator<Item = &AggregateRow> {
        self.rows.iter().filter(move |row| row.bucket == self.root)
    }

    pub fn groups(&self) -> impl Iterator<Item = &AggregateRow> {
        self.rows.iter().filter(|row| row.kind == RowKind::Group)
    }

    /// Looks a unit row up by id; decorated labels resolve to their id.
    pub fn find(&self, name: &str) -> Option<&AggregateRow> {
        let key = canonical_key(name);
        self.rows
            .iter()
            .find(|row| row.key == key && matches!(row.kind, RowKind::Area | RowKind::Group))
    }

    /// Like [`AggregateTable::find`] but only matches group rows, so an area
    /// sharing the id never shadows the group.
    pub fn find_group(&self, name: &str) -> Option<&AggregateRow> {
        let key = canonical_key(name);
        self.groups().find(|row| row.key == key)
    }
}

/// A before-layer or after-layer area in the flow diagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowNode {
    pub key: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowEdge {
    pub source: String,
    pub target: String,
    pub value: f64,
    /// Moved group's label, empty for the residual edge.
    pub label: String,
}

impl FlowEdge {
    pub fn is_residual(&self) -> bool {
        self.label.is_empty()
    }
}

/// Remapping entry that produced no edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkippedMove {
    UnknownGroup { group: String, target: String },
    UnknownTarget { group: String, target: String },
}

/// Conserved flow table for one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowTable {
    pub metric: Metric,
    pub nodes: Vec<FlowNode>,
    pub edges: Vec<FlowEdge>,
    #[serde(default)]
    pub skipped: Vec<SkippedMove>,
}

impl FlowTable {
    pub fn outflow(&self, area: &str) -> f64 {
        self.edges
            .iter()
            .filter(|edge| edge.source == area)
            .map(|edge| edge.value)
            .sum()
    }

    pub fn inflow(&self, area: &str) -> f64 {
        self.edges
            .iter()
            .filter(|edge| edge.target == area)
            .map(|edge| edge.value)
            .sum()
    }
}

/// What a transform step hands to the load step.
#[derive(Debug, Clone)]
pub struct StatsResult {
    pub table: AggregateTable,
    pub flows: Vec<FlowTable>,
}
