use serde::{Deserialize, Serialize};

use crate::model::WorkItem;
use crate::period::Period;

/// How a work item relates to an analysis period.
///
/// Exactly one status (or none) applies to any item/period pair; the rules in
/// [`classify`] overlap, so evaluation order is the tie-break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Completed,
    New,
    InProgress,
}

/// Classify one item against one period.
///
/// Priority order:
/// 1. completion instant inside the window → `Completed`
/// 2. creation instant inside the window → `New`
/// 3. created on or before the window end and not completed by it → `InProgress`
/// 4. otherwise → `None` (e.g. created after the window ends)
///
/// Fails closed: an item whose creation instant cannot be resolved is `None`,
/// even when its completion instant would fall inside the window.
pub fn classify(item: &WorkItem, period: &Period) -> Option<ItemStatus> {
    let created = item.creation_instant()?;
    let completed = item.completion_instant();

    if let Some(done) = completed {
        if period.contains(done) {
            return Some(ItemStatus::Completed);
        }
    }

    if period.contains(created) {
        return Some(ItemStatus::New);
    }

    let open_past_end = match completed {
        None => true,
        Some(done) => done.date_naive() > period.end,
    };
    if created.date_naive() <= period.end && open_past_end {
        return Some(ItemStatus::InProgress);
    }

    None
}
