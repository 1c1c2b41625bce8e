use crate::core::window::Window;
use crate::domain::model::{
    AggregateRow, AggregateTable, AggregateWarning, Item, RowKind, Unit, UnitRank,
};
use crate::utils::error::{FlowError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateOptions {
    /// Parent label of area rows.
    pub root: String,
    /// Drop items that another item replaces.
    pub exclude_replaced: bool,
    /// Emit rows (parenthesized) for inactive groups.
    pub include_inactive: bool,
    /// Emit one leaf row per item under its group.
    pub include_items: bool,
    /// Hang groups under their designated owner instead of the area.
    pub owner_as_parent: bool,
    /// Reserved id meaning "unattributed"; such units never get a row.
    pub unattributed: String,
    /// Emit zero rows for areas without items so they remain flow targets.
    pub include_empty_areas: bool,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            root: "root".to_string(),
            exclude_replaced: true,
            include_inactive: true,
            include_items: false,
            owner_as_parent: false,
            unattributed: "none".to_string(),
            include_empty_areas: false,
        }
    }
}

#[derive(Default)]
struct Totals {
    count: u64,
    size: f64,
}

impl Totals {
    fn of(items: &[&Item]) -> Self {
        Self {
            count: items.len() as u64,
            size: items.iter().map(|item| item.size).sum(),
        }
    }

    fn add(&mut self, other: &Totals) {
        self.count += other.count;
        self.size += other.size;
    }
}

/// Mints one label per (owner, area) pair. The first area an owner is seen
/// under keeps the bare name, later ones get an ordinal suffix.
#[derive(Default)]
struct OwnerLabels {
    labels: HashMap<(String, String), String>,
    areas_seen: HashMap<String, usize>,
}

impl OwnerLabels {
    fn label(&mut self, owner: &str, area: &str, warnings: &mut Vec<AggregateWarning>) -> String {
        let key = (owner.to_string(), area.to_string());
        if let Some(label) = self.labels.get(&key) {
            return label.clone();
        }

        let ordinal = self.areas_seen.entry(owner.to_string()).or_insert(0);
        *ordinal += 1;
        let label = if *ordinal == 1 {
            owner.to_string()
        } else {
            tracing::warn!(
                "Owner '{}' is associated with area '{}' as well; labelled '{} [{}]'",
                owner,
                area,
                owner,
                ordinal
            );
            let label = format!("{} [{}]", owner, ordinal);
            warnings.push(AggregateWarning::AmbiguousOwner {
                owner: owner.to_string(),
                area: area.to_string(),
                label: label.clone(),
            });
            label
        };
        self.labels.insert(key, label.clone());
        label
    }
}

/// Builds the hierarchy table: per area, the area row, its owner rows (when
/// groups hang under owners), then its group rows each followed by its
/// optional item rows.
///
/// Every selected item is attributed to exactly one group before any row is
/// emitted; an item claimed by two different groups fails with
/// [`FlowError::InconsistentTotals`]. Groups without items get no row, nor do
/// areas unless `include_empty_areas` is set.
/// Items of the sentinel unit still count towards its parent area, so callers
/// that want them gone must filter them out beforehand. Items of groups
/// without a known area are reported as [`AggregateWarning::DetachedGroup`].
/// With `include_items`, items in no emitted group hang directly under
/// their area.
pub fn aggregate(
    items: &[Item],
    units: &[Unit],
    window: &Window,
    options: &AggregateOptions,
) -> Result<AggregateTable> {
    let groups: HashMap<&str, &Unit> = units
        .iter()
        .filter(|unit| unit.rank == UnitRank::Group)
        .map(|unit| (unit.id.as_str(), unit))
        .collect();

    let areas: Vec<&Unit> = units
        .iter()
        .filter(|unit| unit.rank == UnitRank::Area && unit.id != options.unattributed)
        .collect();

    let mut warnings = Vec::new();
    let selected = items.iter().filter(|item| {
        window.contains(item) && !(options.exclude_replaced && item.replaced_by.is_some())
    });

    // Partition: item id -> owning group, asserted once up front.
    let mut attributed: HashMap<&str, &str> = HashMap::new();
    let mut by_group: HashMap<&str, Vec<&Item>> = HashMap::new();
    for item in selected {
        let Some(group) = groups.get(item.unit.as_str()) else {
            tracing::debug!("Item '{}' references unknown group '{}'", item.id, item.unit);
            warnings.push(AggregateWarning::UnattributedItem {
                item: item.id.clone(),
                unit: item.unit.clone(),
            });
            continue;
        };
        let parent = group.parent.as_deref();
        if parent == Some(options.unattributed.as_str()) {
            continue;
        }
        if !parent.is_some_and(|parent| areas.iter().any(|area| area.id == parent)) {
            tracing::debug!(
                "Item '{}' belongs to group '{}' whose area {:?} is unknown",
                item.id,
                item.unit,
                parent
            );
            warnings.push(AggregateWarning::DetachedGroup {
                item: item.id.clone(),
                group: item.unit.clone(),
                parent: parent.map(str::to_string),
            });
            continue;
        }
        match attributed.get(item.id.as_str()) {
            Some(first) if *first != item.unit => {
                return Err(FlowError::InconsistentTotals {
                    item: item.id.clone(),
                    first: first.to_string(),
                    second: item.unit.clone(),
                });
            }
            Some(_) => {
                tracing::debug!("Skipping repeated record for item '{}'", item.id);
                continue;
            }
            None => {
                attributed.insert(&item.id, &item.unit);
                by_group.entry(item.unit.as_str()).or_default().push(item);
            }
        }
    }

    let mut owner_labels = OwnerLabels::default();
    let mut rows = Vec::new();
    for area in areas {
        let children: Vec<&Unit> = units
            .iter()
            .filter(|unit| {
                unit.rank == UnitRank::Group && unit.parent.as_deref() == Some(area.id.as_str())
            })
            .collect();

        let area_items: Vec<&Item> = children
            .iter()
            .filter_map(|group| by_group.get(group.id.as_str()))
            .flatten()
            .copied()
            .collect();
        if area_items.is_empty() && !options.include_empty_areas {
            tracing::debug!("Area '{}' has no items in window, skipped", area.id);
            continue;
        }

        let area_label = area.display_label();
        let area_totals = Totals::of(&area_items);
        rows.push(AggregateRow {
            name: area_label.clone(),
            count: area_totals.count,
            size: area_totals.size,
            parent: options.root.clone(),
            bucket: options.root.clone(),
            key: area.id.clone(),
            kind: RowKind::Area,
        });

        let mut owners: Vec<(String, Totals)> = Vec::new();
        let mut group_rows = Vec::new();
        let mut attributed_totals = Totals::default();
        let mut remainder: Vec<&Item> = Vec::new();
        for group in children {
            let Some(group_items) = by_group.get(group.id.as_str()) else {
                continue;
            };
            if group.id == options.unattributed || (!group.active && !options.include_inactive) {
                remainder.extend(group_items.iter().copied());
                continue;
            }

            let totals = Totals::of(group_items);
            attributed_totals.add(&totals);

            let parent = match (&group.owner, options.owner_as_parent) {
                (Some(owner), true) => {
                    let label = owner_labels.label(owner, &area.id, &mut warnings);
                    match owners.iter_mut().find(|(existing, _)| *existing == label) {
                        Some((_, owner_totals)) => owner_totals.add(&totals),
                        None => {
                            let mut owner_totals = Totals::default();
                            owner_totals.add(&totals);
                            owners.push((label.clone(), owner_totals));
                        }
                    }
                    label
                }
                _ => area_label.clone(),
            };

            let group_label = group.display_label();
            group_rows.push(AggregateRow {
                name: group_label.clone(),
                count: totals.count,
                size: totals.size,
                parent,
                bucket: area.id.clone(),
                key: group.id.clone(),
                kind: RowKind::Group,
            });

            if options.include_items {
                group_rows.extend(group_items.iter().map(|item| AggregateRow {
                    name: item.label().to_string(),
                    count: 1,
                    size: item.size,
                    parent: group_label.clone(),
                    bucket: area.id.clone(),
                    key: item.id.clone(),
                    kind: RowKind::Item,
                }));
            }
        }

        debug_assert!(attributed_totals.count <= area_totals.count);
        tracing::debug!(
            "Area '{}': {} items ({} in group rows), size {}",
            area.id,
            area_totals.count,
            attributed_totals.count,
            area_totals.size
        );

        rows.extend(owners.into_iter().map(|(label, totals)| AggregateRow {
            key: label.clone(),
            name: label,
            count: totals.count,
            size: totals.size,
            parent: area_label.clone(),
            bucket: area.id.clone(),
            kind: RowKind::Owner,
        }));
        rows.extend(group_rows);
        if options.include_items {
            rows.extend(remainder.iter().map(|item| AggregateRow {
                name: item.label().to_string(),
                count: 1,
                size: item.size,
                parent: area_label.clone(),
                bucket: area.id.clone(),
                key: item.id.clone(),
                kind: RowKind::Item,
            }));
        }
    }

    tracing::info!(
        "Aggregated {} items into {} rows ({} warnings)",
        attributed.len(),
        rows.len(),
        warnings.len()
    );

    Ok(AggregateTable {
        root: options.root.clone(),
        rows,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(group: &str, sizes: &[f64]) -> Vec<Item> {
        sizes
            .iter()
            .enumerate()
            .map(|(i, size)| Item::new(format!("{}-{}", group, i), group, *size))
            .collect()
    }

    fn row<'a>(table: &'a AggregateTable, name: &str) -> &'a AggregateRow {
        table
            .rows
            .iter()
            .find(|row| row.name == name)
            .unwrap_or_else(|| panic!("no row named {}", name))
    }

    #[test]
    fn test_area_and_group_rows_in_rank_order() {
        let units = vec![
            Unit::area("a"),
            Unit::group("g1", "a"),
            Unit::group("g2", "a"),
        ];
        let mut records = items("g1", &[10.0, 10.0, 10.0]);
        records.extend(items("g2", &[5.0, 5.0]));

        let table =
            aggregate(&records, &units, &Window::all(), &AggregateOptions::default()).unwrap();

        let names: Vec<&str> = table.rows.iter().map(|row| row.name.as_str()).collect();
        assert_eq!(names, vec!["a", "g1", "g2"]);
        assert_eq!(row(&table, "a").count, 5);
        assert_eq!(row(&table, "a").size, 40.0);
        assert_eq!(row(&table, "a").parent, "root");
        assert_eq!(row(&table, "g1").parent, "a");
        assert_eq!(row(&table, "g1").bucket, "a");
        assert_eq!(row(&table, "g2").size, 10.0);
    }

    #[test]
    fn test_empty_units_are_omitted() {
        let units = vec![
            Unit::area("a"),
            Unit::group("g1", "a"),
            Unit::group("empty", "a"),
            Unit::area("b"),
        ];
        let records = items("g1", &[1.0]);

        let table =
            aggregate(&records, &units, &Window::all(), &AggregateOptions::default()).unwrap();

        assert_eq!(table.rows.len(), 2);
        assert!(table.find("b").is_none());
        assert!(table.find("empty").is_none());
    }

    #[test]
    fn test_empty_area_kept_on_request() {
        let units = vec![Unit::area("a"), Unit::group("g1", "a"), Unit::area("b")];
        let records = items("g1", &[1.0]);
        let options = AggregateOptions {
            include_empty_areas: true,
            ..AggregateOptions::default()
        };

        let table = aggregate(&records, &units, &Window::all(), &options).unwrap();

        let b = row(&table, "b");
        assert_eq!((b.count, b.size), (0, 0.0));
        assert_eq!(table.areas().count(), 2);
    }

    #[test]
    fn test_inactive_group_is_decorated_and_counted() {
        let units = vec![
            Unit::area("a"),
            Unit::group("g1", "a"),
            Unit::group("g2", "a").inactive(),
        ];
        let mut records = items("g1", &[10.0]);
        records.extend(items("g2", &[5.0, 5.0]));

        let table =
            aggregate(&records, &units, &Window::all(), &AggregateOptions::default()).unwrap();

        assert_eq!(row(&table, "(g2)").key, "g2");
        assert_eq!(row(&table, "a").count, 3);
        assert_eq!(table.find("(g2)").map(|row| row.size), Some(10.0));
    }

    #[test]
    fn test_inactive_group_can_be_left_in_remainder() {
        let units = vec![Unit::area("a"), Unit::group("g2", "a").inactive()];
        let records = items("g2", &[5.0, 5.0]);
        let options = AggregateOptions {
            include_inactive: false,
            ..AggregateOptions::default()
        };

        let table = aggregate(&records, &units, &Window::all(), &options).unwrap();

        assert_eq!(table.rows.len(), 1);
        assert_eq!(row(&table, "a").size, 10.0);
    }

    #[test]
    fn test_item_in_two_groups_fails() {
        let units = vec![
            Unit::area("a"),
            Unit::group("g1", "a"),
            Unit::group("g2", "a"),
        ];
        let records = vec![Item::new("doc", "g1", 3.0), Item::new("doc", "g2", 3.0)];

        let err = aggregate(&records, &units, &Window::all(), &AggregateOptions::default())
            .unwrap_err();

        assert!(matches!(err, FlowError::InconsistentTotals { ref item, .. } if item == "doc"));
    }

    #[test]
    fn test_repeated_record_counts_once() {
        let units = vec![Unit::area("a"), Unit::group("g1", "a")];
        let records = vec![Item::new("doc", "g1", 3.0), Item::new("doc", "g1", 3.0)];

        let table =
            aggregate(&records, &units, &Window::all(), &AggregateOptions::default()).unwrap();

        assert_eq!(row(&table, "g1").count, 1);
    }

    #[test]
    fn test_replaced_items_are_excluded() {
        let units = vec![Unit::area("a"), Unit::group("g1", "a")];
        let mut old = Item::new("old", "g1", 7.0);
        old.replaced_by = Some("new".to_string());
        let records = vec![old, Item::new("new", "g1", 9.0)];

        let table =
            aggregate(&records, &units, &Window::all(), &AggregateOptions::default()).unwrap();
        assert_eq!(row(&table, "g1").size, 9.0);

        let keep_all = AggregateOptions {
            exclude_replaced: false,
            ..AggregateOptions::default()
        };
        let table = aggregate(&records, &units, &Window::all(), &keep_all).unwrap();
        assert_eq!(row(&table, "g1").size, 16.0);
    }

    #[test]
    fn test_sentinel_unit_gets_no_row_but_counts_to_area() {
        let units = vec![
            Unit::area("a"),
            Unit::group("g1", "a"),
            Unit::group("none", "a"),
        ];
        let mut records = items("g1", &[1.0]);
        records.extend(items("none", &[4.0]));

        let table =
            aggregate(&records, &units, &Window::all(), &AggregateOptions::default()).unwrap();

        assert!(table.find("none").is_none());
        assert_eq!(row(&table, "a").size, 5.0);
    }

    #[test]
    fn test_leaf_rows_follow_their_group() {
        let units = vec![Unit::area("a"), Unit::group("g1", "a")];
        let mut records = items("g1", &[2.0, 3.0]);
        records[0].name = Some("RFC 9000".to_string());
        let options = AggregateOptions {
            include_items: true,
            ..AggregateOptions::default()
        };

        let table = aggregate(&records, &units, &Window::all(), &options).unwrap();

        let names: Vec<&str> = table.rows.iter().map(|row| row.name.as_str()).collect();
        assert_eq!(names, vec!["a", "g1", "RFC 9000", "g1-1"]);
        assert_eq!(row(&table, "RFC 9000").parent, "g1");
        assert_eq!(row(&table, "g1-1").count, 1);
    }

    #[test]
    fn test_owner_collisions_get_ordinal_labels() {
        let units = vec![
            Unit::area("a"),
            Unit::area("b"),
            Unit::area("c"),
            Unit::group("g1", "a").with_owner("alice"),
            Unit::group("g2", "a").with_owner("alice"),
            Unit::group("g3", "b").with_owner("alice"),
            Unit::group("g4", "c").with_owner("alice"),
        ];
        let mut records = Vec::new();
        for group in ["g1", "g2", "g3", "g4"] {
            records.extend(items(group, &[1.0]));
        }
        let options = AggregateOptions {
            owner_as_parent: true,
            ..AggregateOptions::default()
        };

        let table = aggregate(&records, &units, &Window::all(), &options).unwrap();

        assert_eq!(row(&table, "g1").parent, "alice");
        assert_eq!(row(&table, "g2").parent, "alice");
        assert_eq!(row(&table, "g3").parent, "alice [2]");
        assert_eq!(row(&table, "g4").parent, "alice [3]");

        let alice = row(&table, "alice");
        assert_eq!(alice.kind, RowKind::Owner);
        assert_eq!(alice.parent, "a");
        assert_eq!(alice.count, 2);
        assert_eq!(table.warnings.len(), 2);
        assert!(table.warnings.contains(&AggregateWarning::AmbiguousOwner {
            owner: "alice".to_string(),
            area: "c".to_string(),
            label: "alice [3]".to_string(),
        }));
    }

    #[test]
    fn test_group_without_known_area_is_reported() {
        let mut floating = Unit::group("g8", "a");
        floating.parent = None;
        let units = vec![
            Unit::area("a"),
            Unit::group("g1", "a"),
            Unit::group("g9", "gone"),
            floating,
        ];
        let records = vec![
            Item::new("d1", "g1", 1.0),
            Item::new("d2", "g9", 1.0),
            Item::new("d3", "g8", 1.0),
        ];

        let table =
            aggregate(&records, &units, &Window::all(), &AggregateOptions::default()).unwrap();

        assert_eq!(row(&table, "a").count, 1);
        assert_eq!(
            table.warnings,
            vec![
                AggregateWarning::DetachedGroup {
                    item: "d2".to_string(),
                    group: "g9".to_string(),
                    parent: Some("gone".to_string()),
                },
                AggregateWarning::DetachedGroup {
                    item: "d3".to_string(),
                    group: "g8".to_string(),
                    parent: None,
                },
            ]
        );
    }

    #[test]
    fn test_remainder_items_hang_under_area() {
        let units = vec![
            Unit::area("a"),
            Unit::group("g1", "a"),
            Unit::group("g2", "a").inactive(),
            Unit::group("none", "a"),
        ];
        let records = vec![
            Item::new("d1", "g1", 1.0),
            Item::new("d2", "g2", 2.0),
            Item::new("d3", "none", 3.0),
        ];
        let options = AggregateOptions {
            include_items: true,
            include_inactive: false,
            ..AggregateOptions::default()
        };

        let table = aggregate(&records, &units, &Window::all(), &options).unwrap();

        let names: Vec<&str> = table.rows.iter().map(|row| row.name.as_str()).collect();
        assert_eq!(names, vec!["a", "g1", "d1", "d2", "d3"]);
        assert_eq!(row(&table, "d2").parent, "a");
        assert_eq!(row(&table, "d3").parent, "a");
        assert_eq!(row(&table, "d1").parent, "g1");
        assert_eq!(row(&table, "a").size, 6.0);
    }

    #[test]
    fn test_unknown_unit_is_reported() {
        let units = vec![Unit::area("a"), Unit::group("g1", "a")];
        let records = vec![Item::new("stray", "gone", 1.0)];

        let table =
            aggregate(&records, &units, &Window::all(), &AggregateOptions::default()).unwrap();

        assert!(table.rows.is_empty());
        assert_eq!(
            table.warnings,
            vec![AggregateWarning::UnattributedItem {
                item: "stray".to_string(),
                unit: "gone".to_string(),
            }]
        );
    }
}
