use serde::{Deserialize, Serialize};

use crate::filter::ItemFilter;
use crate::model::{Catalogs, WorkItem};

/// Group keys for items lacking a value on the grouped dimension.
pub const NO_STAGE_KEY: &str = "no-stage";
pub const NO_TAG_KEY: &str = "no-tag";
pub const UNASSIGNED_KEY: &str = "unassigned";

/// Position sentinel for the synthetic no-stage group; sorts last.
const NO_STAGE_POSITION: i64 = i64::MAX;

/// The dimension a collection of items is fanned out across.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Stage,
    TypeTag,
    Assignee,
}

/// One bucket of a dimensional fan-out.
///
/// For multi-valued dimensions (type tag, assignee) an item appears in one
/// group per value it holds, so summed group counts exceed the unique item
/// count whenever items carry several values. Percentage computations must
/// divide by the unique item count, not the summed group counts; see
/// [`duplication_factor`].
#[derive(Debug, Clone, Serialize)]
pub struct DimensionGroup<'a> {
    pub key: String,
    pub label: String,
    pub items: Vec<&'a WorkItem>,
}

impl DimensionGroup<'_> {
    pub fn count(&self) -> usize {
        self.items.len()
    }
}

/// Fan a collection of items out into groups along one dimension.
///
/// Items with zero values for the dimension land in a single synthetic
/// bucket (`no-stage` / `no-tag` / `unassigned`). Stage groups are ordered by
/// catalog position ascending (no-stage last); tag and assignee groups by
/// item count descending, with ties broken by label.
pub fn group_by<'a>(
    items: &'a [WorkItem],
    dimension: Dimension,
    catalogs: &Catalogs,
    filter: &ItemFilter,
) -> Vec<DimensionGroup<'a>> {
    // Key order of first appearance; sorted below.
    let mut keys: Vec<String> = Vec::new();
    let mut groups: std::collections::HashMap<String, Vec<&'a WorkItem>> =
        std::collections::HashMap::new();

    let mut insert = |key: String, item: &'a WorkItem| {
        let bucket = groups.entry(key.clone()).or_insert_with(|| {
            keys.push(key);
            Vec::new()
        });
        bucket.push(item);
    };

    for item in items.iter().filter(|i| filter.retains(i)) {
        match dimension {
            Dimension::Stage => {
                // An unresolvable stage id is bucketed with the stage-less items.
                let key = item
                    .stage_id
                    .as_deref()
                    .filter(|id| catalogs.stage(id).is_some())
                    .unwrap_or(NO_STAGE_KEY);
                insert(key.to_string(), item);
            }
            Dimension::TypeTag => {
                if item.type_tag_ids.is_empty() {
                    insert(NO_TAG_KEY.to_string(), item);
                } else {
                    for id in &item.type_tag_ids {
                        insert(id.clone(), item);
                    }
                }
            }
            Dimension::Assignee => {
                if item.assignee_ids.is_empty() {
                    insert(UNASSIGNED_KEY.to_string(), item);
                } else {
                    for id in &item.assignee_ids {
                        insert(id.clone(), item);
                    }
                }
            }
        }
    }

    let mut out: Vec<DimensionGroup<'a>> = keys
        .into_iter()
        .map(|key| {
            let items = groups.remove(&key).unwrap_or_default();
            let label = label_for(&key, dimension, catalogs);
            DimensionGroup { key, label, items }
        })
        .collect();

    match dimension {
        Dimension::Stage => {
            out.sort_by(|a, b| {
                let pa = stage_position(&a.key, catalogs);
                let pb = stage_position(&b.key, catalogs);
                pa.cmp(&pb).then_with(|| a.label.cmp(&b.label))
            });
        }
        Dimension::TypeTag | Dimension::Assignee => {
            out.sort_by(|a, b| {
                b.count()
                    .cmp(&a.count())
                    .then_with(|| a.label.cmp(&b.label))
            });
        }
    }

    out
}

/// Duplication diagnostic: summed group counts over the unique item count.
/// 1.0 means no multi-valued fan-out happened; 0.0 when there are no items.
pub fn duplication_factor(groups: &[DimensionGroup<'_>], unique_items: usize) -> f64 {
    if unique_items == 0 {
        return 0.0;
    }
    let summed: usize = groups.iter().map(|g| g.count()).sum();
    summed as f64 / unique_items as f64
}

fn stage_position(key: &str, catalogs: &Catalogs) -> i64 {
    catalogs
        .stage(key)
        .map(|s| s.position)
        .unwrap_or(NO_STAGE_POSITION)
}

fn label_for(key: &str, dimension: Dimension, catalogs: &Catalogs) -> String {
    match dimension {
        Dimension::Stage => {
            if key == NO_STAGE_KEY {
                "No stage".to_string()
            } else {
                catalogs
                    .stage(key)
                    .map(|s| s.name.clone())
                    .unwrap_or_else(|| key.to_string())
            }
        }
        Dimension::TypeTag => {
            if key == NO_TAG_KEY {
                "No tag".to_string()
            } else {
                catalogs
                    .type_tag(key)
                    .map(|t| t.name.clone())
                    .unwrap_or_else(|| key.to_string())
            }
        }
        Dimension::Assignee => {
            if key == UNASSIGNED_KEY {
                "Unassigned".to_string()
            } else {
                catalogs
                    .assignee(key)
                    .map(|a| a.name.clone())
                    .unwrap_or_else(|| key.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_util::{day, item};
    use crate::model::{Assignee, Stage, TypeTag};

    fn catalogs() -> Catalogs {
        Catalogs {
            stages: vec![
                Stage {
                    id: "s-done".into(),
                    name: "Done".into(),
                    position: 3,
                },
                Stage {
                    id: "s-todo".into(),
                    name: "To Do".into(),
                    position: 1,
                },
                Stage {
                    id: "s-doing".into(),
                    name: "Doing".into(),
                    position: 2,
                },
            ],
            type_tags: vec![
                TypeTag {
                    id: "tt-bug".into(),
                    name: "Bug".into(),
                    color: None,
                },
                TypeTag {
                    id: "tt-feat".into(),
                    name: "Feature".into(),
                    color: None,
                },
            ],
            assignees: vec![
                Assignee {
                    id: "a1".into(),
                    name: "Alice".into(),
                },
                Assignee {
                    id: "a2".into(),
                    name: "Bob".into(),
                },
            ],
        }
    }

    fn tagged(id: &str, tags: &[&str]) -> crate::model::WorkItem {
        let mut it = item(id, day(2025, 1, 1));
        it.type_tag_ids = tags.iter().map(|t| t.to_string()).collect();
        it
    }

    #[test]
    fn test_multi_tag_item_lands_in_every_tag_group() {
        let items = vec![
            tagged("t1", &["tt-bug", "tt-feat"]),
            tagged("t2", &["tt-bug"]),
            tagged("t3", &[]),
        ];
        let groups = group_by(&items, Dimension::TypeTag, &catalogs(), &ItemFilter::default());

        let bug = groups.iter().find(|g| g.key == "tt-bug").unwrap();
        let feat = groups.iter().find(|g| g.key == "tt-feat").unwrap();
        let none = groups.iter().find(|g| g.key == NO_TAG_KEY).unwrap();
        assert_eq!(bug.count(), 2);
        assert_eq!(feat.count(), 1);
        assert_eq!(none.count(), 1);

        // Summed counts equal the total number of tag references, not |items|.
        let summed: usize = groups.iter().map(|g| g.count()).sum();
        assert_eq!(summed, 4);
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn test_duplication_factor() {
        let items = vec![tagged("t1", &["tt-bug", "tt-feat"]), tagged("t2", &["tt-bug"])];
        let groups = group_by(&items, Dimension::TypeTag, &catalogs(), &ItemFilter::default());
        assert_eq!(duplication_factor(&groups, items.len()), 1.5);
        assert_eq!(duplication_factor(&groups, 0), 0.0);
    }

    #[test]
    fn test_stage_groups_sorted_by_position() {
        let mut a = item("t1", day(2025, 1, 1));
        a.stage_id = Some("s-done".into());
        let mut b = item("t2", day(2025, 1, 1));
        b.stage_id = Some("s-todo".into());
        let c = item("t3", day(2025, 1, 1));
        let mut d = item("t4", day(2025, 1, 1));
        d.stage_id = Some("s-doing".into());

        let items = vec![a, b, c, d];
        let groups = group_by(&items, Dimension::Stage, &catalogs(), &ItemFilter::default());
        let keys: Vec<&str> = groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["s-todo", "s-doing", "s-done", NO_STAGE_KEY]);
        assert_eq!(groups[3].label, "No stage");
    }

    #[test]
    fn test_unresolvable_stage_id_goes_to_no_stage() {
        let mut a = item("t1", day(2025, 1, 1));
        a.stage_id = Some("s-ghost".into());
        let items = vec![a];
        let groups = group_by(&items, Dimension::Stage, &catalogs(), &ItemFilter::default());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].key, NO_STAGE_KEY);
    }

    #[test]
    fn test_assignee_groups_sorted_by_count_then_name() {
        let mut a = item("t1", day(2025, 1, 1));
        a.assignee_ids = vec!["a1".into(), "a2".into()];
        let mut b = item("t2", day(2025, 1, 1));
        b.assignee_ids = vec!["a2".into()];
        let c = item("t3", day(2025, 1, 1));
        let d = item("t4", day(2025, 1, 1));

        let items = vec![a, b, c, d];
        let groups = group_by(&items, Dimension::Assignee, &catalogs(), &ItemFilter::default());
        // Unassigned has 2, Bob 2, Alice 1. Count tie between Bob and
        // Unassigned breaks on label.
        let labels: Vec<&str> = groups.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, vec!["Bob", "Unassigned", "Alice"]);
    }

    #[test]
    fn test_filter_excludes_archived() {
        let mut a = tagged("t1", &["tt-bug"]);
        a.is_archived = true;
        let b = tagged("t2", &["tt-bug"]);
        let items = vec![a, b];
        let groups = group_by(&items, Dimension::TypeTag, &catalogs(), &ItemFilter::default());
        assert_eq!(groups[0].count(), 1);
    }
}
