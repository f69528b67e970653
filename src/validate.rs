use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::kpi::ConsistencyWarning;
use crate::model::WorkItem;

/// How badly a data-quality anomaly damages temporal analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Unusable for temporal analysis; the item is excluded from the
    /// affected metric.
    Critical,
    /// Usable but suspect.
    Warning,
    /// Cosmetic.
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    MissingCreatedAt,
    NegativeDuration,
    CompleteWithoutInstant,
    FutureCompletion,
    DueBeforeCreated,
    ConsistencyDrift,
}

/// One detected anomaly. Anomalies are never raised as errors; they are
/// collected here while the affected item is quietly excluded from whichever
/// metric it would corrupt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataQualityIssue {
    pub item_id: Option<String>,
    pub severity: Severity,
    pub kind: IssueKind,
    pub message: String,
}

/// The validation report for one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub issues: Vec<DataQualityIssue>,
    pub critical_count: usize,
    pub warning_count: usize,
    pub info_count: usize,
}

impl ValidationReport {
    pub fn push(&mut self, issue: DataQualityIssue) {
        match issue.severity {
            Severity::Critical => self.critical_count += 1,
            Severity::Warning => self.warning_count += 1,
            Severity::Info => self.info_count += 1,
        }
        self.issues.push(issue);
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Fold KPI consistency-check findings into the report as warnings.
    pub fn extend_with_consistency(&mut self, warnings: &[ConsistencyWarning]) {
        for w in warnings {
            self.push(DataQualityIssue {
                item_id: None,
                severity: Severity::Warning,
                kind: IssueKind::ConsistencyDrift,
                message: format!(
                    "{} stored as {} but recomputes to {}",
                    w.metric, w.stored, w.recomputed
                ),
            });
        }
    }
}

/// Scan a snapshot for data-quality anomalies.
///
/// `reference` is the analysis run's anchor date; completions after it are
/// flagged as future-dated. A single bad item never aborts the scan.
pub fn validate_items(items: &[WorkItem], reference: NaiveDate) -> ValidationReport {
    let mut report = ValidationReport::default();

    for item in items {
        let created = item.creation_instant();
        let completed = item.completion_instant();

        if created.is_none() {
            report.push(DataQualityIssue {
                item_id: Some(item.id.clone()),
                severity: Severity::Critical,
                kind: IssueKind::MissingCreatedAt,
                message: format!("item '{}' has no resolvable creation instant", item.name),
            });
        }

        if item.is_complete && item.completed_at.is_none() {
            report.push(DataQualityIssue {
                item_id: Some(item.id.clone()),
                severity: Severity::Warning,
                kind: IssueKind::CompleteWithoutInstant,
                message: format!(
                    "item '{}' is flagged complete but has no completion instant",
                    item.name
                ),
            });
        }

        if let (Some(c), Some(done)) = (created, completed) {
            if done < c {
                report.push(DataQualityIssue {
                    item_id: Some(item.id.clone()),
                    severity: Severity::Critical,
                    kind: IssueKind::NegativeDuration,
                    message: format!(
                        "item '{}' completed {} before its creation {}",
                        item.name,
                        done.date_naive(),
                        c.date_naive()
                    ),
                });
            }
        }

        if let Some(done) = completed {
            if done.date_naive() > reference {
                report.push(DataQualityIssue {
                    item_id: Some(item.id.clone()),
                    severity: Severity::Warning,
                    kind: IssueKind::FutureCompletion,
                    message: format!(
                        "item '{}' has a completion dated {} after the reference {}",
                        item.name,
                        done.date_naive(),
                        reference
                    ),
                });
            }
        }

        if let (Some(c), Some(due)) = (created, item.due_at) {
            if due < c {
                report.push(DataQualityIssue {
                    item_id: Some(item.id.clone()),
                    severity: Severity::Info,
                    kind: IssueKind::DueBeforeCreated,
                    message: format!("item '{}' was due before it was created", item.name),
                });
            }
        }
    }

    if report.critical_count > 0 {
        log::warn!(
            "{} item(s) excluded from temporal analysis due to critical data-quality issues",
            report.critical_count
        );
    }

    report
}
