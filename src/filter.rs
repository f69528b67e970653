use serde::{Deserialize, Serialize};

use crate::model::WorkItem;

/// Explicit filter configuration for an analysis run.
///
/// Every recognized key is enumerated here with its default; unknown keys in
/// deserialized input are rejected rather than silently ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ItemFilter {
    /// Keep only items in one of these stages. `None` keeps all stages.
    pub stage_ids: Option<Vec<String>>,
    /// Keep only items carrying at least one of these type tags.
    pub type_tag_ids: Option<Vec<String>>,
    /// Keep only items with at least one of these assignees.
    pub assignee_ids: Option<Vec<String>>,
    /// Archived items are dropped from every analysis unless this is set.
    pub include_archived: bool,
    /// Policy flag: whether archived-but-open items count toward
    /// work-in-progress tallies. Only observed when archived items are
    /// retained at all.
    pub count_archived_wip: bool,
}

impl ItemFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an item survives this filter.
    pub fn retains(&self, item: &WorkItem) -> bool {
        if item.is_archived && !self.include_archived {
            return false;
        }
        if let Some(ref ids) = self.stage_ids {
            match item.stage_id {
                Some(ref sid) if ids.contains(sid) => {}
                _ => return false,
            }
        }
        if let Some(ref ids) = self.type_tag_ids {
            if !item.type_tag_ids.iter().any(|t| ids.contains(t)) {
                return false;
            }
        }
        if let Some(ref ids) = self.assignee_ids {
            if !item.assignee_ids.iter().any(|a| ids.contains(a)) {
                return false;
            }
        }
        true
    }

    /// Whether an item may count toward in-progress tallies.
    /// Archived-but-open items are excluded unless the policy flag is set.
    pub fn counts_toward_wip(&self, item: &WorkItem) -> bool {
        !item.is_archived || self.count_archived_wip
    }

    /// The retained subset, preserving input order.
    pub fn apply<'a>(&self, items: &'a [WorkItem]) -> Vec<&'a WorkItem> {
        items.iter().filter(|i| self.retains(i)).collect()
    }
}
