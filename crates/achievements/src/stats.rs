//! Statistics aggregator
//!
//! Composes independent sub-queries over both stores into one report.
//! Each sub-query degrades to its zero value on failure so a flaky
//! store never takes the whole report down; degradations are logged.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::store::{ContentStore, ReferenceStore, StatusSummary};
use meritrack_common::Result;

/// Trailing window for the overall per-month breakdown
const OVERALL_WINDOW_MONTHS: u32 = 6;
/// Trailing window for a single student's per-month breakdown
const STUDENT_WINDOW_MONTHS: u32 = 12;
/// Size of the leaderboard
const TOP_STUDENT_LIMIT: i64 = 5;

/// One leaderboard entry, resolved to display data
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopStudent {
    pub student_id: Uuid,
    pub name: String,
    pub program_study: String,
    pub total_points: i64,
}

/// Workflow counts plus the awarded points total
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStats {
    #[serde(flatten)]
    pub statuses: StatusSummary,
    pub total_points: i64,
}

/// The composed statistics report
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsReport {
    /// Counts per achievement type
    pub per_type: HashMap<String, i64>,
    /// Competition counts per level; unset levels bucket as "unknown"
    pub per_level: HashMap<String, i64>,
    /// Counts per "YYYY-MM" over the trailing window
    pub per_period: BTreeMap<String, i64>,
    /// Points leaderboard; empty for per-student reports
    pub top_students: Vec<TopStudent>,
    pub summary: SummaryStats,
}

/// Builds statistics reports over both stores
pub struct StatisticsAggregator {
    refs: Arc<dyn ReferenceStore>,
    content: Arc<dyn ContentStore>,
}

impl StatisticsAggregator {
    pub fn new(refs: Arc<dyn ReferenceStore>, content: Arc<dyn ContentStore>) -> Self {
        Self { refs, content }
    }

    /// System-wide report with the points leaderboard
    pub async fn overall(&self) -> Result<StatsReport> {
        let mut report = self.base_report(None, OVERALL_WINDOW_MONTHS).await;
        report.top_students = self.leaderboard().await;
        Ok(report)
    }

    /// One student's report; a longer window, no leaderboard
    pub async fn for_student(&self, student_id: Uuid) -> Result<StatsReport> {
        Ok(self
            .base_report(Some(student_id), STUDENT_WINDOW_MONTHS)
            .await)
    }

    async fn base_report(&self, student_id: Option<Uuid>, window_months: u32) -> StatsReport {
        let per_type = degrade(
            self.content.counts_by_type(student_id).await,
            "per-type counts",
        );
        let per_level = degrade(
            self.content.counts_by_level(student_id).await,
            "per-level counts",
        );
        let per_period = degrade(
            self.content.counts_by_month(student_id, window_months).await,
            "per-period counts",
        );
        let statuses = degrade(
            self.refs.status_summary(student_id).await,
            "status summary",
        );
        let total_points = degrade(self.content.total_points(student_id).await, "points total");

        StatsReport {
            per_type,
            per_level,
            per_period,
            top_students: Vec::new(),
            summary: SummaryStats {
                statuses,
                total_points,
            },
        }
    }

    /// Rank students by awarded points and resolve their display data;
    /// entries whose student cannot be resolved are skipped.
    async fn leaderboard(&self) -> Vec<TopStudent> {
        let ranked = degrade(
            self.content.top_students(TOP_STUDENT_LIMIT).await,
            "top students",
        );

        let mut resolved = Vec::with_capacity(ranked.len());
        for (student_id, total_points) in ranked {
            match self.refs.student_display(student_id).await {
                Ok(Some((name, program_study))) => resolved.push(TopStudent {
                    student_id,
                    name,
                    program_study,
                    total_points,
                }),
                Ok(None) => {
                    warn!(%student_id, "ranked student has no profile, skipping");
                }
                Err(err) => {
                    warn!(%student_id, error = %err, "student resolution failed, skipping");
                }
            }
        }
        resolved
    }
}

/// Collapse a failed sub-query to its zero value, with a log trail
fn degrade<T: Default>(result: Result<T>, what: &str) -> T {
    match result {
        Ok(value) => value,
        Err(err) => {
            warn!(error = %err, "statistics sub-query degraded: {}", what);
            T::default()
        }
    }
}
