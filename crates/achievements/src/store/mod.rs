//! Store adapters for the two halves of an achievement
//!
//! The core components speak to the stores through the
//! [`ReferenceStore`] and [`ContentStore`] traits; production
//! adapters live in [`postgres`] and [`mongo`], tests use in-memory
//! implementations.

pub mod mongo;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use crate::model::{AchievementDoc, AchievementStatus, Attachment};
use meritrack_common::Result;

pub use mongo::MongoContentStore;
pub use postgres::PgReferenceStore;

/// Inputs for a new reference row; status always starts as draft
#[derive(Debug, Clone)]
pub struct NewReference {
    pub student_id: Uuid,
    pub content_id: String,
    pub title: String,
}

/// A reference row joined with the identity data callers render
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceDetail {
    pub id: Uuid,
    pub student_id: Uuid,
    pub content_id: String,
    pub title: String,
    pub status: AchievementStatus,
    pub submitted_at: Option<DateTime<Utc>>,
    pub verified_at: Option<DateTime<Utc>>,
    pub verified_by: Option<Uuid>,
    pub rejection_note: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    // Joined display data
    pub student_name: String,
    pub matriculation_id: String,
    pub advisor_id: Option<Uuid>,
    pub verifier_name: Option<String>,
}

/// One row of a listing, with the owning student's display data
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceListItem {
    pub id: Uuid,
    pub student_id: Uuid,
    pub content_id: String,
    pub title: String,
    pub status: AchievementStatus,
    pub submitted_at: Option<DateTime<Utc>>,
    pub verified_at: Option<DateTime<Utc>>,
    pub verified_by: Option<Uuid>,
    pub rejection_note: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub student_name: String,
    pub matriculation_id: String,
}

/// Additive role-based visibility filters
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleScope {
    /// Restrict to records owned by this student
    pub student_id: Option<Uuid>,
    /// Restrict to records of this lecturer's advisees
    pub advisor_id: Option<Uuid>,
}

impl RoleScope {
    /// Admin scope: no restriction
    pub fn unrestricted() -> Self {
        Self::default()
    }

    pub fn for_student(id: Uuid) -> Self {
        Self {
            student_id: Some(id),
            ..Self::default()
        }
    }

    pub fn for_advisor(id: Uuid) -> Self {
        Self {
            advisor_id: Some(id),
            ..Self::default()
        }
    }
}

/// Sort columns permitted in listings.
///
/// A fixed allow-list because the sort column is interpolated into the
/// ORDER BY clause and cannot be bound as a query argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortColumn {
    Title,
    Status,
    #[default]
    CreatedAt,
}

impl SortColumn {
    /// Map a requested name onto the allow-list; anything else falls
    /// back to created_at.
    pub fn parse(requested: Option<&str>) -> Self {
        match requested {
            Some("title") => SortColumn::Title,
            Some("status") => SortColumn::Status,
            Some("created_at") => SortColumn::CreatedAt,
            _ => SortColumn::CreatedAt,
        }
    }

    /// Qualified column for the reference listing query
    pub fn column(&self) -> &'static str {
        match self {
            SortColumn::Title => "ar.title",
            SortColumn::Status => "ar.status",
            SortColumn::CreatedAt => "ar.created_at",
        }
    }
}

/// A fully validated listing query
#[derive(Debug, Clone)]
pub struct ListQuery {
    pub scope: RoleScope,
    pub search: Option<String>,
    pub sort: SortColumn,
    pub ascending: bool,
    pub limit: u64,
    pub offset: u64,
}

/// Point-in-time workflow counts from the reference store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSummary {
    pub total_achievements: i64,
    pub total_verified: i64,
    pub total_pending: i64,
    pub total_rejected: i64,
}

/// Relational store: one row per achievement.
///
/// Status writes are conditional on the expected current status and
/// return the linked content id; `None` means the row was not in the
/// expected state when the write landed.
#[async_trait]
pub trait ReferenceStore: Send + Sync {
    /// Insert a draft row, returning its generated id
    async fn insert(&self, new_ref: NewReference) -> Result<Uuid>;

    /// Joined fetch; soft-deleted rows read as absent
    async fn find_detail(&self, id: Uuid) -> Result<Option<ReferenceDetail>>;

    /// draft -> submitted
    async fn mark_submitted(&self, id: Uuid, at: DateTime<Utc>) -> Result<Option<String>>;

    /// submitted -> verified
    async fn mark_verified(
        &self,
        id: Uuid,
        lecturer_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<String>>;

    /// submitted -> rejected
    async fn mark_rejected(
        &self,
        id: Uuid,
        lecturer_id: Uuid,
        note: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<String>>;

    /// draft -> deleted (soft)
    async fn mark_deleted(&self, id: Uuid, at: DateTime<Utc>) -> Result<Option<String>>;

    /// Filtered/sorted/paginated listing plus the total matching count
    async fn list(&self, query: &ListQuery) -> Result<(Vec<ReferenceListItem>, u64)>;

    /// Workflow counts, optionally scoped to one student
    async fn status_summary(&self, student_id: Option<Uuid>) -> Result<StatusSummary>;

    /// Resolve a student id to (full name, program of study)
    async fn student_display(&self, student_id: Uuid) -> Result<Option<(String, String)>>;
}

/// Document store: one content document per achievement
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Insert a document, returning its generated id in hex form
    async fn insert(&self, doc: &AchievementDoc) -> Result<String>;

    /// Point lookup by id
    async fn find(&self, content_id: &str) -> Result<Option<AchievementDoc>>;

    /// Hard delete; only used to compensate a failed reference insert
    async fn delete(&self, content_id: &str) -> Result<()>;

    /// Set awarded points (verification propagation)
    async fn set_points(&self, content_id: &str, points: i32) -> Result<()>;

    /// Flag the document deleted alongside its reference
    async fn soft_delete(&self, content_id: &str, at: DateTime<Utc>) -> Result<()>;

    /// Append one attachment to the ordered list
    async fn push_attachment(&self, content_id: &str, attachment: &Attachment) -> Result<()>;

    /// Counts grouped by achievement type
    async fn counts_by_type(&self, student_id: Option<Uuid>) -> Result<HashMap<String, i64>>;

    /// Counts grouped by competition level (competitions only);
    /// missing levels bucket as "unknown"
    async fn counts_by_level(&self, student_id: Option<Uuid>) -> Result<HashMap<String, i64>>;

    /// Counts grouped by calendar year-month ("YYYY-MM") over the
    /// trailing window
    async fn counts_by_month(
        &self,
        student_id: Option<Uuid>,
        months: u32,
    ) -> Result<BTreeMap<String, i64>>;

    /// Students ranked by summed points > 0, descending
    async fn top_students(&self, limit: i64) -> Result<Vec<(Uuid, i64)>>;

    /// Sum of points > 0, optionally scoped to one student
    async fn total_points(&self, student_id: Option<Uuid>) -> Result<i64>;
}
