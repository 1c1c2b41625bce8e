//! Chart-ready payloads for the rendering layer.
//!
//! Sunburst rows follow the `names`/`parents`/`values` contract with
//! `branchvalues = "total"`: an explicit root row carries the grand total and
//! is labelled with the metric name. Sankey payloads follow the
//! `node`/`link` layout of a flow diagram whose `2×K` nodes are the areas
//! before and after the move.

use crate::domain::model::{AggregateTable, FlowTable, Metric, RowKind};
use crate::utils::error::Result;
use serde::Serialize;

const PALETTE: [&str; 10] = [
    "#636EFA", "#EF553B", "#00CC96", "#AB63FA", "#FFA15A", "#19D3F3", "#FF6692", "#B6E880",
    "#FF97FF", "#FECB52",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SunburstRow {
    pub name: String,
    pub parent: String,
    pub value: f64,
    pub kind: Option<RowKind>,
}

pub fn sunburst_rows(table: &AggregateTable, metric: Metric) -> Vec<SunburstRow> {
    let root = metric.as_str().to_string();
    let total: f64 = table.areas().map(|area| area.value(metric)).sum();

    let mut rows = vec![SunburstRow {
        name: root.clone(),
        parent: String::new(),
        value: total,
        kind: None,
    }];
    rows.extend(table.rows.iter().map(|row| SunburstRow {
        name: row.name.clone(),
        parent: if row.parent == table.root {
            root.clone()
        } else {
            row.parent.clone()
        },
        value: row.value(metric),
        kind: Some(row.kind),
    }));
    rows
}

pub fn sunburst_csv(table: &AggregateTable, metric: Metric) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in sunburst_rows(table, metric) {
        writer.serialize(row)?;
    }
    writer.into_inner().map_err(|e| e.into_error().into())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SankeyNodes {
    pub label: Vec<String>,
    pub color: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SankeyLinks {
    pub source: Vec<usize>,
    pub target: Vec<usize>,
    pub value: Vec<f64>,
    pub label: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SankeyPayload {
    pub metric: Metric,
    pub node: SankeyNodes,
    pub link: SankeyLinks,
}

/// Area `i` is node `i` in the before layer and node `K + i` in the after
/// layer; both share a colour.
pub fn sankey_payload(flows: &FlowTable) -> SankeyPayload {
    let k = flows.nodes.len();
    let index = |key: &str| flows.nodes.iter().position(|node| node.key == key);

    let labels: Vec<String> = flows.nodes.iter().map(|node| node.label.clone()).collect();
    let colors: Vec<String> = (0..k)
        .map(|i| PALETTE[i % PALETTE.len()].to_string())
        .collect();

    let mut link = SankeyLinks {
        source: Vec::with_capacity(flows.edges.len()),
        target: Vec::with_capacity(flows.edges.len()),
        value: Vec::with_capacity(flows.edges.len()),
        label: Vec::with_capacity(flows.edges.len()),
    };
    for edge in &flows.edges {
        let (Some(source), Some(target)) = (index(&edge.source), index(&edge.target)) else {
            continue;
        };
        link.source.push(source);
        link.target.push(k + target);
        link.value.push(edge.value);
        link.label.push(edge.label.clone());
    }

    SankeyPayload {
        metric: flows.metric,
        node: SankeyNodes {
            label: labels.iter().chain(labels.iter()).cloned().collect(),
            color: colors.iter().chain(colors.iter()).cloned().collect(),
        },
        link,
    }
}

pub fn flows_csv(flows: &FlowTable) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for edge in &flows.edges {
        writer.serialize(edge)?;
    }
    writer.into_inner().map_err(|e| e.into_error().into())
}
