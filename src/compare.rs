use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::classify::{classify, ItemStatus};
use crate::date_util::{last_day_of_month, month_start, week_monday};
use crate::filter::ItemFilter;
use crate::group::{group_by, Dimension, DimensionGroup};
use crate::kpi::{compute_flow_kpis, round2, FlowKpis};
use crate::model::{Catalogs, WorkItem};
use crate::period::Period;
use crate::series::Granularity;

/// Direction of a period-over-period change, relative to what "good" means
/// for the metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Declining,
    Flat,
}

/// Whether a larger value of a metric is desirable. Always passed explicitly
/// per metric, never inferred from the values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricDirection {
    HigherIsBetter,
    LowerIsBetter,
}

/// A period-over-period change for one scalar metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    pub absolute: f64,
    pub percentage: f64,
    pub trend: Trend,
}

/// Compare a current value against the previous period's.
///
/// Percentage rule: when the previous value is zero the percentage is 100 for
/// any positive current value and 0 otherwise, so the metric stays defined.
pub fn delta(current: f64, previous: f64, direction: MetricDirection) -> Delta {
    let absolute = current - previous;
    let percentage = if previous != 0.0 {
        round2(absolute / previous * 100.0)
    } else if current > 0.0 {
        100.0
    } else {
        0.0
    };

    let trend = if absolute == 0.0 {
        Trend::Flat
    } else {
        let grew = absolute > 0.0;
        match direction {
            MetricDirection::HigherIsBetter => {
                if grew {
                    Trend::Improving
                } else {
                    Trend::Declining
                }
            }
            MetricDirection::LowerIsBetter => {
                if grew {
                    Trend::Declining
                } else {
                    Trend::Improving
                }
            }
        }
    };

    Delta {
        absolute: round2(absolute),
        percentage,
        trend,
    }
}

/// Build `count` consecutive, non-overlapping calendar periods of one
/// granularity, walking backward from the period containing `reference`.
/// Most recent first.
pub fn build_periods(granularity: Granularity, count: usize, reference: NaiveDate) -> Vec<Period> {
    let mut periods = Vec::with_capacity(count);
    match granularity {
        Granularity::Daily => {
            let mut d = reference;
            for _ in 0..count {
                periods.push(Period::new(d, d, d.format("%Y-%m-%d").to_string()));
                d -= Duration::days(1);
            }
        }
        Granularity::Weekly => {
            let mut monday = week_monday(reference);
            for _ in 0..count {
                let iw = monday.iso_week();
                periods.push(Period::new(
                    monday,
                    monday + Duration::days(6),
                    format!("{}-W{:02}", iw.year(), iw.week()),
                ));
                monday -= Duration::days(7);
            }
        }
        Granularity::Monthly => {
            let mut first = month_start(reference);
            for _ in 0..count {
                periods.push(Period::new(
                    first,
                    last_day_of_month(first.year(), first.month()),
                    format!("{}-{:02}", first.year(), first.month()),
                ));
                first = month_start(first - Duration::days(1));
            }
        }
    }
    periods
}

/// The leading group of one dimension within one period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupHighlight {
    pub key: String,
    pub label: String,
    pub count: u64,
    /// The ranking metric: completion rate (%) for stages, item count for
    /// type tags and assignees.
    pub metric: f64,
}

/// Deltas against the next-older comparison row, one per headline metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowDeltas {
    pub total_new: Delta,
    pub total_completed: Delta,
    pub total_in_progress: Delta,
    pub throughput_rate: Delta,
    pub net_flow: Delta,
    pub avg_process_time_days: Delta,
    pub wip_throughput_ratio: Delta,
}

/// One period's worth of a horizontal comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub period: Period,
    pub kpis: FlowKpis,
    pub top_stage: Option<GroupHighlight>,
    pub top_type_tag: Option<GroupHighlight>,
    pub top_assignee: Option<GroupHighlight>,
    /// `None` for the oldest row, which has nothing to compare against.
    pub deltas: Option<RowDeltas>,
}

/// Compute one comparison row per period (periods ordered most-recent first,
/// as produced by [`build_periods`]), including period-over-period deltas.
pub fn build_rows(
    items: &[WorkItem],
    periods: &[Period],
    catalogs: &Catalogs,
    filter: &ItemFilter,
) -> Vec<ComparisonRow> {
    let mut rows: Vec<ComparisonRow> = periods
        .iter()
        .map(|period| {
            let kpis = compute_flow_kpis(items, period, filter);

            // Items that have any status in this period; the grouper runs
            // over this subset only.
            let relevant: Vec<WorkItem> = items
                .iter()
                .filter(|i| filter.retains(i))
                .filter(|i| classify(i, period).is_some())
                .cloned()
                .collect();

            let stage_groups = group_by(&relevant, Dimension::Stage, catalogs, filter);
            let tag_groups = group_by(&relevant, Dimension::TypeTag, catalogs, filter);
            let assignee_groups = group_by(&relevant, Dimension::Assignee, catalogs, filter);

            ComparisonRow {
                period: period.clone(),
                kpis,
                top_stage: top_by_completion_rate(&stage_groups, period),
                top_type_tag: top_by_count(&tag_groups),
                top_assignee: top_by_count(&assignee_groups),
                deltas: None,
            }
        })
        .collect();

    for i in 0..rows.len() {
        let Some(prev) = rows.get(i + 1).map(|r| r.kpis.clone()) else {
            continue;
        };
        let cur = &rows[i].kpis;
        rows[i].deltas = Some(RowDeltas {
            total_new: delta(
                cur.total_new as f64,
                prev.total_new as f64,
                MetricDirection::HigherIsBetter,
            ),
            total_completed: delta(
                cur.total_completed as f64,
                prev.total_completed as f64,
                MetricDirection::HigherIsBetter,
            ),
            total_in_progress: delta(
                cur.total_in_progress as f64,
                prev.total_in_progress as f64,
                MetricDirection::HigherIsBetter,
            ),
            throughput_rate: delta(
                cur.throughput_rate(),
                prev.throughput_rate(),
                MetricDirection::HigherIsBetter,
            ),
            net_flow: delta(
                cur.net_flow(),
                prev.net_flow(),
                MetricDirection::HigherIsBetter,
            ),
            avg_process_time_days: delta(
                cur.avg_process_time_days,
                prev.avg_process_time_days,
                MetricDirection::LowerIsBetter,
            ),
            wip_throughput_ratio: delta(
                cur.wip_throughput_ratio(),
                prev.wip_throughput_ratio(),
                MetricDirection::LowerIsBetter,
            ),
        });
    }

    rows
}

fn top_by_completion_rate(
    groups: &[DimensionGroup<'_>],
    period: &Period,
) -> Option<GroupHighlight> {
    groups
        .iter()
        .map(|g| {
            let completed = g
                .items
                .iter()
                .filter(|i| classify(i, period) == Some(ItemStatus::Completed))
                .count();
            GroupHighlight {
                key: g.key.clone(),
                label: g.label.clone(),
                count: g.count() as u64,
                metric: round2(completed as f64 / g.count().max(1) as f64 * 100.0),
            }
        })
        .max_by(cmp_highlight)
}

fn top_by_count(groups: &[DimensionGroup<'_>]) -> Option<GroupHighlight> {
    groups
        .iter()
        .map(|g| GroupHighlight {
            key: g.key.clone(),
            label: g.label.clone(),
            count: g.count() as u64,
            metric: g.count() as f64,
        })
        .max_by(cmp_highlight)
}

// Rank by metric, then count; label ties resolve to the lexicographically
// smallest label.
fn cmp_highlight(a: &GroupHighlight, b: &GroupHighlight) -> std::cmp::Ordering {
    a.metric
        .total_cmp(&b.metric)
        .then_with(|| a.count.cmp(&b.count))
        .then_with(|| b.label.cmp(&a.label))
}

/// One point of an assignee × type-tag evolution series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvolutionPoint {
    pub count: u64,
    pub avg_cycle_time_days: f64,
}

/// One type tag's series for one assignee, aligned by period index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagEvolution {
    pub type_tag_id: String,
    pub type_tag_name: String,
    /// One point per period, same order as the input periods.
    pub points: Vec<EvolutionPoint>,
}

/// Per-assignee evolution across periods.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssigneeEvolution {
    pub assignee_id: String,
    pub assignee_name: String,
    pub tags: Vec<TagEvolution>,
}

/// For each assignee, for each type tag they completed work under, a
/// fixed-length series (one point per period) of completed count and average
/// cycle time. Points align by period index, so adjacent points are
/// period-over-period comparable.
///
/// Only catalog assignees and tags appear; an assignee with no completed
/// work in any period is omitted, as is a tag with no completions for that
/// assignee.
pub fn build_dimension_evolution(
    items: &[WorkItem],
    periods: &[Period],
    catalogs: &Catalogs,
    filter: &ItemFilter,
) -> Vec<AssigneeEvolution> {
    let mut out = Vec::new();

    for assignee in &catalogs.assignees {
        let mut tags = Vec::new();
        for tag in &catalogs.type_tags {
            let points: Vec<EvolutionPoint> = periods
                .iter()
                .map(|period| {
                    let mut count = 0u64;
                    let mut cycle_days = Vec::new();
                    for item in items
                        .iter()
                        .filter(|i| filter.retains(i))
                        .filter(|i| i.assignee_ids.contains(&assignee.id))
                        .filter(|i| i.type_tag_ids.contains(&tag.id))
                    {
                        if classify(item, period) == Some(ItemStatus::Completed) {
                            count += 1;
                            if let Some(days) = item.cycle_time_days() {
                                cycle_days.push(days);
                            }
                        }
                    }
                    let avg = if cycle_days.is_empty() {
                        0.0
                    } else {
                        round2(cycle_days.iter().sum::<f64>() / cycle_days.len() as f64)
                    };
                    EvolutionPoint {
                        count,
                        avg_cycle_time_days: avg,
                    }
                })
                .collect();

            if points.iter().any(|p| p.count > 0) {
                tags.push(TagEvolution {
                    type_tag_id: tag.id.clone(),
                    type_tag_name: tag.name.clone(),
                    points,
                });
            }
        }

        if !tags.is_empty() {
            tags.sort_by(|a, b| {
                let ta: u64 = a.points.iter().map(|p| p.count).sum();
                let tb: u64 = b.points.iter().map(|p| p.count).sum();
                tb.cmp(&ta).then_with(|| a.type_tag_name.cmp(&b.type_tag_name))
            });
            out.push(AssigneeEvolution {
                assignee_id: assignee.id.clone(),
                assignee_name: assignee.name.clone(),
                tags,
            });
        }
    }

    out.sort_by(|a, b| a.assignee_name.cmp(&b.assignee_name));
    out
}
