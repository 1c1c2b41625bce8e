use area_flow::domain::model::RowKind;
use area_flow::{
    aggregate, reallocate, AggregateOptions, AggregateTable, DuplicatePolicy, FlowError, Item,
    Metric, Remapping, Unit, Window,
};
use std::collections::HashMap;

fn docs(group: &str, sizes: &[f64]) -> Vec<Item> {
    sizes
        .iter()
        .enumerate()
        .map(|(i, size)| Item::new(format!("draft-{}-{}", group, i), group, *size))
        .collect()
}

/// Three areas, one inactive group, one empty group and an uneven spread.
fn fixture() -> (Vec<Unit>, Vec<Item>) {
    let units = vec![
        Unit::area("art"),
        Unit::group("httpbis", "art"),
        Unit::group("core", "art"),
        Unit::group("webtrans", "art").inactive(),
        Unit::area("int"),
        Unit::group("lisp", "int"),
        Unit::group("empty", "int"),
        Unit::area("tsv"),
        Unit::group("ippm", "tsv"),
        Unit::group("bmwg", "tsv"),
    ];
    let mut items = Vec::new();
    items.extend(docs("httpbis", &[40.0, 12.0, 7.0]));
    items.extend(docs("core", &[22.0, 18.0]));
    items.extend(docs("webtrans", &[9.0]));
    items.extend(docs("lisp", &[30.0, 31.0, 5.0, 2.0]));
    items.extend(docs("ippm", &[11.0]));
    items.extend(docs("bmwg", &[3.0, 4.0]));
    (units, items)
}

fn fixture_table() -> AggregateTable {
    let (units, items) = fixture();
    aggregate(&items, &units, &Window::all(), &AggregateOptions::default()).unwrap()
}

fn remappings() -> Vec<Remapping> {
    let pairs: Vec<Vec<(&str, &str)>> = vec![
        vec![],
        vec![("httpbis", "tsv")],
        vec![("httpbis", "tsv"), ("core", "tsv"), ("webtrans", "tsv")],
        vec![("ippm", "int"), ("bmwg", "int"), ("lisp", "int"), ("core", "int")],
        vec![("lisp", "art"), ("ippm", "art"), ("nonexistent", "int"), ("bmwg", "ops")],
    ];
    pairs
        .into_iter()
        .map(|pairs| Remapping::from_pairs(pairs, DuplicatePolicy::Reject).unwrap())
        .collect()
}

#[test]
fn test_aggregation_conserves_totals() {
    let table = fixture_table();

    for area in table.areas() {
        let (count, size) = table
            .groups()
            .filter(|group| group.bucket == area.key)
            .fold((0, 0.0), |(count, size), group| {
                (count + group.count, size + group.size)
            });
        assert_eq!(count, area.count, "count of {}", area.name);
        assert_eq!(size, area.size, "size of {}", area.name);
    }
}

#[test]
fn test_every_item_lands_in_one_group_and_one_area() {
    let (units, items) = fixture();
    let options = AggregateOptions {
        include_items: true,
        ..AggregateOptions::default()
    };
    let table = aggregate(&items, &units, &Window::all(), &options).unwrap();

    let mut seen: HashMap<&str, usize> = HashMap::new();
    for leaf in table.rows.iter().filter(|row| row.kind == RowKind::Item) {
        *seen.entry(leaf.key.as_str()).or_default() += 1;
        let group = table.find(&leaf.parent).unwrap();
        assert_eq!(group.kind, RowKind::Group);
        assert_eq!(group.bucket, leaf.bucket);
    }

    assert_eq!(seen.len(), items.len());
    assert!(seen.values().all(|times| *times == 1));
    let area_total: u64 = table.areas().map(|area| area.count).sum();
    assert_eq!(area_total, items.len() as u64);
}

#[test]
fn test_reallocation_conserves_every_source() {
    let table = fixture_table();

    for remapping in remappings() {
        for metric in Metric::ALL {
            let flows = reallocate(&table, &remapping, metric);
            for area in table.areas() {
                assert_eq!(
                    flows.outflow(&area.key),
                    area.value(metric),
                    "{} outflow of {} under {:?}",
                    metric,
                    area.key,
                    remapping
                );
            }
            let before: f64 = table.areas().map(|area| area.value(metric)).sum();
            let after: f64 = flows.edges.iter().map(|edge| edge.value).sum();
            assert_eq!(before, after);
        }
    }
}

#[test]
fn test_reallocation_is_idempotent() {
    let table = fixture_table();

    for remapping in remappings() {
        let first = reallocate(&table, &remapping, Metric::Size);
        let second = reallocate(&table, &remapping, Metric::Size);
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
    }
}

#[test]
fn test_missing_group_leaves_other_edges_alone() {
    let table = fixture_table();
    let base = Remapping::from_pairs([("httpbis", "tsv")], DuplicatePolicy::Reject).unwrap();
    let with_missing = Remapping::from_pairs(
        [("httpbis", "tsv"), ("concluded-wg", "int")],
        DuplicatePolicy::Reject,
    )
    .unwrap();

    let expected = reallocate(&table, &base, Metric::Count);
    let actual = reallocate(&table, &with_missing, Metric::Count);

    assert_eq!(actual.edges, expected.edges);
    assert_eq!(actual.skipped.len(), 1);
}

#[test]
fn test_move_between_areas_scenario() {
    let units = vec![
        Unit::area("A"),
        Unit::group("g1", "A"),
        Unit::group("g2", "A"),
        Unit::area("B"),
    ];
    let mut items = docs("g1", &[10.0, 10.0, 10.0]);
    items.extend(docs("g2", &[5.0, 5.0]));
    let options = AggregateOptions {
        include_empty_areas: true,
        ..AggregateOptions::default()
    };
    let table = aggregate(&items, &units, &Window::all(), &options).unwrap();
    let remapping = Remapping::from_pairs([("g1", "B")], DuplicatePolicy::Reject).unwrap();

    let flows = reallocate(&table, &remapping, Metric::Size);

    let edges: Vec<(&str, &str, f64, &str)> = flows
        .edges
        .iter()
        .map(|edge| {
            (
                edge.source.as_str(),
                edge.target.as_str(),
                edge.value,
                edge.label.as_str(),
            )
        })
        .collect();
    assert_eq!(
        edges,
        vec![("A", "B", 30.0, "g1"), ("A", "A", 10.0, ""), ("B", "B", 0.0, "")]
    );
    assert_eq!(flows.nodes.len(), 2);
}

#[test]
fn test_inactive_group_scenario() {
    let units = vec![
        Unit::area("A"),
        Unit::group("g1", "A"),
        Unit::group("g2", "A").inactive(),
    ];
    let mut items = docs("g1", &[10.0]);
    items.extend(docs("g2", &[5.0, 5.0]));

    let table = aggregate(&items, &units, &Window::all(), &AggregateOptions::default()).unwrap();

    let names: Vec<&str> = table.rows.iter().map(|row| row.name.as_str()).collect();
    assert_eq!(names, vec!["A", "g1", "(g2)"]);
    assert_eq!(table.find("A").unwrap().count, 3);
    assert_eq!(table.find("A").unwrap().size, 20.0);
}

#[test]
fn test_partition_violation_fails_loudly() {
    let (units, mut items) = fixture();
    items.push(Item::new("draft-lisp-0", "ippm", 1.0));

    let err = aggregate(&items, &units, &Window::all(), &AggregateOptions::default()).unwrap_err();

    match err {
        FlowError::InconsistentTotals {
            item,
            first,
            second,
        } => {
            assert_eq!(item, "draft-lisp-0");
            assert_eq!(first, "lisp");
            assert_eq!(second, "ippm");
        }
        other => panic!("unexpected error: {other}"),
    }
}
