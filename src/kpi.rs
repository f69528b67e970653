use serde::{Deserialize, Serialize};

use crate::filter::ItemFilter;
use crate::model::WorkItem;
use crate::period::Period;

/// Round to two decimals, the precision all per-day and per-item averages
/// are reported at.
pub(crate) fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Scalar flow metrics for one item collection over one period.
///
/// The three totals are independent tallies, not a partition: an item created
/// inside the window and still open at its end counts as both `total_new` and
/// `total_in_progress`, while an item completed inside the window never
/// counts as in-progress.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowKpis {
    pub total_new: u64,
    pub total_completed: u64,
    pub total_in_progress: u64,
    pub avg_new_per_day: f64,
    pub avg_completed_per_day: f64,
    /// Mean creation→completion duration in days over items completed in the
    /// window with usable instants; 0 when none qualify.
    pub avg_process_time_days: f64,
    pub period_days: i64,
}

impl FlowKpis {
    /// Completed ÷ new as a percentage. The `max(_, 1)` divisor keeps the
    /// ratio defined over an empty intake instead of failing.
    pub fn throughput_rate(&self) -> f64 {
        round2(self.total_completed as f64 / self.total_new.max(1) as f64 * 100.0)
    }

    /// Daily completion rate minus daily intake rate. Positive means the
    /// backlog is draining.
    pub fn net_flow(&self) -> f64 {
        round2(self.avg_completed_per_day - self.avg_new_per_day)
    }

    /// Work-in-progress per completed item, with the same `max(_, 1)` guard.
    pub fn wip_throughput_ratio(&self) -> f64 {
        round2(self.total_in_progress as f64 / self.total_completed.max(1) as f64)
    }
}

/// Compute the flow KPI bundle for a period.
///
/// Items the filter drops, and items whose creation instant cannot be
/// resolved, contribute to no tally. Archived-but-open items are kept out of
/// the in-progress count unless the filter's WIP policy flag says otherwise.
pub fn compute_flow_kpis(items: &[WorkItem], period: &Period, filter: &ItemFilter) -> FlowKpis {
    let mut total_new = 0u64;
    let mut total_completed = 0u64;
    let mut total_in_progress = 0u64;
    let mut process_days: Vec<f64> = Vec::new();

    for item in items.iter().filter(|i| filter.retains(i)) {
        let created = match item.creation_instant() {
            Some(at) => at,
            None => continue, // unusable for temporal analysis
        };
        let completed = item.completion_instant();

        let completed_in = completed.map(|at| period.contains(at)).unwrap_or(false);
        if completed_in {
            total_completed += 1;
            if let Some(days) = item.cycle_time_days() {
                process_days.push(days);
            }
        }
        if period.contains(created) {
            total_new += 1;
        }
        let open_past_end = match completed {
            None => true,
            Some(at) => at.date_naive() > period.end,
        };
        if created.date_naive() <= period.end && open_past_end && filter.counts_toward_wip(item) {
            total_in_progress += 1;
        }
    }

    let period_days = period.days();
    let avg_process_time_days = if process_days.is_empty() {
        0.0
    } else {
        round2(process_days.iter().sum::<f64>() / process_days.len() as f64)
    };

    let kpis = FlowKpis {
        total_new,
        total_completed,
        total_in_progress,
        avg_new_per_day: round2(total_new as f64 / period_days as f64),
        avg_completed_per_day: round2(total_completed as f64 / period_days as f64),
        avg_process_time_days,
        period_days,
    };
    log::debug!(
        "flow KPIs for {}: new={} completed={} wip={}",
        period.label,
        kpis.total_new,
        kpis.total_completed,
        kpis.total_in_progress
    );
    kpis
}

/// A stored metric that disagrees with its recomputation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsistencyWarning {
    pub metric: String,
    pub stored: f64,
    pub recomputed: f64,
}

/// Tolerance for the stored-vs-recomputed average check.
pub const CONSISTENCY_TOLERANCE: f64 = 0.01;

/// Re-derive the per-day averages from the totals and flag drift beyond the
/// tolerance. Catches totals and averages ever being computed from different
/// filtered sets; reported as warnings, never raised.
pub fn check_kpi_consistency(kpis: &FlowKpis) -> Vec<ConsistencyWarning> {
    let mut warnings = Vec::new();
    let days = kpis.period_days.max(1) as f64;

    let recomputed = round2(kpis.total_new as f64 / days);
    if (kpis.avg_new_per_day - recomputed).abs() > CONSISTENCY_TOLERANCE {
        warnings.push(ConsistencyWarning {
            metric: "avg_new_per_day".to_string(),
            stored: kpis.avg_new_per_day,
            recomputed,
        });
    }

    let recomputed = round2(kpis.total_completed as f64 / days);
    if (kpis.avg_completed_per_day - recomputed).abs() > CONSISTENCY_TOLERANCE {
        warnings.push(ConsistencyWarning {
            metric: "avg_completed_per_day".to_string(),
            stored: kpis.avg_completed_per_day,
            recomputed,
        });
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_util::{completed_item, day, item};
    use chrono::NaiveDate;

    fn period(start: (i32, u32, u32), end: (i32, u32, u32)) -> Period {
        Period::new(
            NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap(),
            NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap(),
            "test",
        )
    }

    #[test]
    fn test_overlapping_tallies_scenario() {
        let items = vec![
            completed_item("a", day(2025, 1, 1), day(2025, 1, 1)),
            item("b", day(2025, 1, 1)),
            completed_item("c", day(2025, 1, 10), day(2025, 1, 10)),
        ];
        let p = period((2025, 1, 1), (2025, 1, 5));
        let kpis = compute_flow_kpis(&items, &p, &ItemFilter::default());

        assert_eq!(kpis.total_new, 2);
        assert_eq!(kpis.total_completed, 1);
        assert_eq!(kpis.total_in_progress, 1);
        assert_eq!(kpis.period_days, 5);
        assert_eq!(kpis.avg_new_per_day, 0.4);
        assert_eq!(kpis.avg_completed_per_day, 0.2);
    }

    #[test]
    fn test_cycle_time_single_item() {
        let items = vec![completed_item("a", day(2025, 1, 1), day(2025, 1, 6))];
        let p = period((2025, 1, 1), (2025, 1, 31));
        let kpis = compute_flow_kpis(&items, &p, &ItemFilter::default());
        assert_eq!(kpis.avg_process_time_days, 5.00);
    }

    #[test]
    fn test_cycle_time_zero_when_no_completions() {
        let items = vec![item("a", day(2025, 1, 1))];
        let p = period((2025, 1, 1), (2025, 1, 31));
        let kpis = compute_flow_kpis(&items, &p, &ItemFilter::default());
        assert_eq!(kpis.avg_process_time_days, 0.0);
    }

    #[test]
    fn test_negative_duration_excluded_from_cycle_time_only() {
        // Completion inside the window but earlier than creation: the item
        // still counts as completed, but its duration is unusable.
        let bad = completed_item("a", day(2025, 1, 20), day(2025, 1, 10));
        let good = completed_item("b", day(2025, 1, 1), day(2025, 1, 3));
        let p = period((2025, 1, 1), (2025, 1, 31));
        let kpis = compute_flow_kpis(&[bad, good], &p, &ItemFilter::default());
        assert_eq!(kpis.total_completed, 2);
        assert_eq!(kpis.avg_process_time_days, 2.0);
    }

    #[test]
    fn test_unresolvable_creation_contributes_nothing() {
        let mut ghost = completed_item("not-hex", day(2025, 1, 1), day(2025, 1, 2));
        ghost.created_at = None;
        let p = period((2025, 1, 1), (2025, 1, 31));
        let kpis = compute_flow_kpis(&[ghost], &p, &ItemFilter::default());
        assert_eq!(kpis.total_new, 0);
        assert_eq!(kpis.total_completed, 0);
        assert_eq!(kpis.total_in_progress, 0);
    }

    #[test]
    fn test_division_guards() {
        let kpis = FlowKpis {
            total_new: 0,
            total_completed: 0,
            total_in_progress: 3,
            period_days: 1,
            ..Default::default()
        };
        // max(x,1) guards: defined everywhere, never NaN.
        assert_eq!(kpis.throughput_rate(), 0.0);
        assert_eq!(kpis.wip_throughput_ratio(), 3.0);

        let kpis = FlowKpis {
            total_new: 4,
            total_completed: 2,
            total_in_progress: 1,
            period_days: 1,
            ..Default::default()
        };
        assert_eq!(kpis.throughput_rate(), 50.0);
        assert_eq!(kpis.wip_throughput_ratio(), 0.5);
    }

    #[test]
    fn test_net_flow() {
        let kpis = FlowKpis {
            avg_new_per_day: 0.4,
            avg_completed_per_day: 0.2,
            ..Default::default()
        };
        assert_eq!(kpis.net_flow(), -0.2);
    }

    #[test]
    fn test_archived_wip_policy() {
        let mut archived_open = item("a", day(2025, 1, 1));
        archived_open.is_archived = true;
        let p = period((2025, 1, 1), (2025, 1, 5));

        // Archived items are dropped entirely by default.
        let kpis = compute_flow_kpis(
            std::slice::from_ref(&archived_open),
            &p,
            &ItemFilter::default(),
        );
        assert_eq!(kpis.total_new, 0);

        // Included but still out of the WIP tally.
        let filter = ItemFilter {
            include_archived: true,
            ..Default::default()
        };
        let kpis = compute_flow_kpis(std::slice::from_ref(&archived_open), &p, &filter);
        assert_eq!(kpis.total_new, 1);
        assert_eq!(kpis.total_in_progress, 0);

        // Policy flag opts archived-but-open items back in.
        let filter = ItemFilter {
            include_archived: true,
            count_archived_wip: true,
            ..Default::default()
        };
        let kpis = compute_flow_kpis(std::slice::from_ref(&archived_open), &p, &filter);
        assert_eq!(kpis.total_in_progress, 1);
    }

    #[test]
    fn test_consistency_check_clean() {
        let items = vec![
            completed_item("a", day(2025, 1, 1), day(2025, 1, 2)),
            item("b", day(2025, 1, 3)),
        ];
        let p = period((2025, 1, 1), (2025, 1, 7));
        let kpis = compute_flow_kpis(&items, &p, &ItemFilter::default());
        assert!(check_kpi_consistency(&kpis).is_empty());
    }

    #[test]
    fn test_consistency_check_flags_drift() {
        let kpis = FlowKpis {
            total_new: 10,
            avg_new_per_day: 5.0, // should be 1.0 over 10 days
            period_days: 10,
            ..Default::default()
        };
        let warnings = check_kpi_consistency(&kpis);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].metric, "avg_new_per_day");
        assert_eq!(warnings[0].recomputed, 1.0);
    }
}
