use crate::core::remapping::Remapping;
use crate::domain::model::{
    canonical_key, AggregateTable, FlowEdge, FlowNode, FlowTable, Metric, SkippedMove,
};
use std::collections::HashMap;

/// Simulates moving groups to new areas and returns the conserved flow for
/// `metric`.
///
/// Explicit moves come first, in remapping order, followed by one residual
/// `area -> area` edge per area carrying whatever was not moved out. The
/// outflow of every area therefore equals its aggregated total. Rules naming a
/// group or target area missing from `table` are skipped and listed in
/// [`FlowTable::skipped`].
pub fn reallocate(table: &AggregateTable, remapping: &Remapping, metric: Metric) -> FlowTable {
    let nodes: Vec<FlowNode> = table
        .areas()
        .map(|area| FlowNode {
            key: area.key.clone(),
            label: area.name.clone(),
        })
        .collect();

    let mut moved_out: HashMap<&str, f64> = HashMap::new();
    let mut edges = Vec::with_capacity(remapping.len() + nodes.len());
    let mut skipped = Vec::new();

    for rule in remapping.rules() {
        let Some(group) = table.find_group(&rule.group) else {
            tracing::debug!("Remapped group '{}' not in table, skipped", rule.group);
            skipped.push(SkippedMove::UnknownGroup {
                group: rule.group.clone(),
                target: rule.target.clone(),
            });
            continue;
        };

        let target = canonical_key(&rule.target);
        if !nodes.iter().any(|node| node.key == target) {
            tracing::debug!(
                "Target area '{}' for group '{}' not in table, skipped",
                rule.target,
                rule.group
            );
            skipped.push(SkippedMove::UnknownTarget {
                group: rule.group.clone(),
                target: rule.target.clone(),
            });
            continue;
        }

        let value = group.value(metric);
        *moved_out.entry(group.bucket.as_str()).or_insert(0.0) += value;
        edges.push(FlowEdge {
            source: group.bucket.clone(),
            target: target.to_string(),
            value,
            label: group.name.clone(),
        });
    }

    for area in table.areas() {
        let moved = moved_out.get(area.key.as_str()).copied().unwrap_or(0.0);
        edges.push(FlowEdge {
            source: area.key.clone(),
            target: area.key.clone(),
            value: area.value(metric) - moved,
            label: String::new(),
        });
    }

    if !skipped.is_empty() {
        tracing::warn!(
            "{} of {} remapping rules matched nothing for metric '{}'",
            skipped.len(),
            remapping.len(),
            metric
        );
    }

    FlowTable {
        metric,
        nodes,
        edges,
        skipped,
    }
}
