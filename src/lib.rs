pub mod classify;
pub mod compare;
pub mod date_util;
pub mod error;
pub mod filter;
pub mod group;
pub mod kpi;
pub mod model;
pub mod period;
pub mod series;
pub mod validate;

pub use classify::{classify, ItemStatus};
pub use compare::{
    build_dimension_evolution, build_periods, build_rows, delta, AssigneeEvolution, ComparisonRow,
    Delta, EvolutionPoint, GroupHighlight, MetricDirection, RowDeltas, TagEvolution, Trend,
};
pub use error::{Error, Result};
pub use filter::ItemFilter;
pub use group::{group_by, duplication_factor, Dimension, DimensionGroup};
pub use kpi::{check_kpi_consistency, compute_flow_kpis, ConsistencyWarning, FlowKpis};
pub use model::{Assignee, Catalogs, ItemEvent, ItemEventKind, Stage, TypeTag, WorkItem};
pub use period::{Period, PeriodSpec, MAX_CUSTOM_SPAN_DAYS};
pub use series::{
    bucket_range, bucketize, items_in_bucket, BucketAttribution, Granularity, TimeSeries,
};
pub use validate::{validate_items, DataQualityIssue, IssueKind, Severity, ValidationReport};

use chrono::NaiveDate;

/// Main entry point: one frozen snapshot of work items and their catalogs.
///
/// Every method is a pure function of the snapshot plus its arguments and
/// allocates fresh output, so any number of them can run concurrently over
/// the same snapshot. Re-fetching upstream data means building a new
/// snapshot, never mutating this one.
pub struct FlowSnapshot {
    items: Vec<WorkItem>,
    catalogs: Catalogs,
}

impl FlowSnapshot {
    pub fn new(items: Vec<WorkItem>, catalogs: Catalogs) -> Self {
        Self { items, catalogs }
    }

    pub fn items(&self) -> &[WorkItem] {
        &self.items
    }

    pub fn catalogs(&self) -> &Catalogs {
        &self.catalogs
    }

    /// Earliest resolvable creation date across the snapshot; anchors the
    /// `all` period selector.
    pub fn earliest_created(&self) -> Option<NaiveDate> {
        self.items
            .iter()
            .filter_map(|i| i.creation_instant())
            .map(|at| at.date_naive())
            .min()
    }

    /// Resolve a period selector against an explicit reference date.
    pub fn resolve_period(&self, spec: &PeriodSpec, reference: NaiveDate) -> Result<Period> {
        spec.resolve(reference, self.earliest_created())
    }

    pub fn kpis(&self, period: &Period, filter: &ItemFilter) -> FlowKpis {
        compute_flow_kpis(&self.items, period, filter)
    }

    pub fn group(&self, dimension: Dimension, filter: &ItemFilter) -> Vec<DimensionGroup<'_>> {
        group_by(&self.items, dimension, &self.catalogs, filter)
    }

    pub fn series(
        &self,
        period: &Period,
        granularity: Option<Granularity>,
        filter: &ItemFilter,
    ) -> TimeSeries {
        bucketize(&self.items, period, granularity, filter)
    }

    pub fn comparison_rows(
        &self,
        granularity: Granularity,
        count: usize,
        reference: NaiveDate,
        filter: &ItemFilter,
    ) -> Vec<ComparisonRow> {
        let periods = build_periods(granularity, count, reference);
        build_rows(&self.items, &periods, &self.catalogs, filter)
    }

    pub fn dimension_evolution(
        &self,
        granularity: Granularity,
        count: usize,
        reference: NaiveDate,
        filter: &ItemFilter,
    ) -> Vec<AssigneeEvolution> {
        let periods = build_periods(granularity, count, reference);
        build_dimension_evolution(&self.items, &periods, &self.catalogs, filter)
    }

    /// Data-quality scan plus the KPI consistency check for one period.
    pub fn validation_report(
        &self,
        period: &Period,
        reference: NaiveDate,
        filter: &ItemFilter,
    ) -> ValidationReport {
        let mut report = validate_items(&self.items, reference);
        let kpis = self.kpis(period, filter);
        report.extend_with_consistency(&check_kpi_consistency(&kpis));
        report
    }
}
