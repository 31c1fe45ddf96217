//! Postgres adapter for the reference store
//!
//! Row access goes through SeaORM; the joined listing, the joined
//! detail fetch and the conditional status writes use raw statements
//! because they mix joins, RETURNING and dynamic predicates the ORM
//! does not express well.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, DbBackend, Set, Statement, Value};
use uuid::Uuid;

use crate::model::{reference, AchievementStatus};
use crate::store::{
    ListQuery, NewReference, ReferenceDetail, ReferenceListItem, ReferenceStore, StatusSummary,
};
use meritrack_common::{AppError, DbPool, Result};

/// Reference store backed by Postgres
#[derive(Clone)]
pub struct PgReferenceStore {
    pool: DbPool,
}

impl PgReferenceStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn stmt(sql: impl Into<String>, values: Vec<Value>) -> Statement {
        Statement::from_sql_and_values(DbBackend::Postgres, sql.into(), values)
    }

    /// Conditional status write; returns the content id when exactly
    /// one row moved out of `expected`.
    async fn conditional_update(
        &self,
        sql: &str,
        values: Vec<Value>,
    ) -> Result<Option<String>> {
        use sea_orm::ConnectionTrait;

        let row = self.pool.conn().query_one(Self::stmt(sql, values)).await?;

        match row {
            Some(row) => Ok(Some(row.try_get::<String>("", "content_id")?)),
            None => Ok(None),
        }
    }
}

fn parse_status(raw: &str) -> Result<AchievementStatus> {
    raw.parse().map_err(|e| AppError::Internal {
        message: format!("reference row with {}", e),
    })
}

/// Build the conjunction predicate for a listing query.
///
/// Returns the WHERE clause (without the keyword) and its bound
/// values; `$n` numbering starts at 1. Always excludes soft-deleted
/// rows; the search argument is bound once and reused for both the
/// title and the status match.
fn build_predicate(query: &ListQuery) -> (String, Vec<Value>) {
    let mut conditions: Vec<String> = Vec::new();
    let mut values: Vec<Value> = Vec::new();
    let mut arg = 1;

    if let Some(student_id) = query.scope.student_id {
        conditions.push(format!("ar.student_id = ${arg}"));
        values.push(student_id.into());
        arg += 1;
    }

    if let Some(advisor_id) = query.scope.advisor_id {
        conditions.push(format!("s.advisor_id = ${arg}"));
        values.push(advisor_id.into());
        arg += 1;
    }

    conditions.push(format!("ar.status != ${arg}"));
    values.push(AchievementStatus::Deleted.as_str().into());
    arg += 1;

    if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
        conditions.push(format!(
            "(LOWER(ar.title) LIKE ${arg} OR LOWER(ar.status) LIKE ${arg})"
        ));
        values.push(format!("%{}%", search.to_lowercase()).into());
    }

    (conditions.join(" AND "), values)
}

const LIST_COLUMNS: &str = "\
    ar.id, ar.student_id, ar.content_id, ar.title, ar.status, \
    ar.submitted_at, ar.verified_at, ar.verified_by, ar.rejection_note, \
    ar.created_at, ar.updated_at, \
    u.full_name, s.student_id";

#[async_trait]
impl ReferenceStore for PgReferenceStore {
    async fn insert(&self, new_ref: NewReference) -> Result<Uuid> {
        let now = Utc::now();
        let id = Uuid::new_v4();

        let row = reference::ActiveModel {
            id: Set(id),
            student_id: Set(new_ref.student_id),
            content_id: Set(new_ref.content_id),
            title: Set(new_ref.title),
            status: Set(AchievementStatus::Draft.as_str().to_string()),
            submitted_at: Set(None),
            verified_at: Set(None),
            verified_by: Set(None),
            rejection_note: Set(String::new()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let inserted = row.insert(self.pool.conn()).await?;
        Ok(inserted.id)
    }

    async fn find_detail(&self, id: Uuid) -> Result<Option<ReferenceDetail>> {
        use sea_orm::ConnectionTrait;

        let sql = r#"
            SELECT
                ar.id, ar.student_id, ar.content_id, ar.title, ar.status,
                ar.submitted_at, ar.verified_at, ar.verified_by, ar.rejection_note,
                ar.created_at, ar.updated_at,
                u.full_name, s.student_id, s.advisor_id,
                vu.full_name AS verifier_name
            FROM achievement_references ar
            JOIN students s ON ar.student_id = s.id
            JOIN users u ON s.user_id = u.id
            LEFT JOIN lecturers vl ON ar.verified_by = vl.id
            LEFT JOIN users vu ON vl.user_id = vu.id
            WHERE ar.id = $1 AND ar.status != 'deleted'
        "#;

        let row = self
            .pool
            .conn()
            .query_one(Self::stmt(sql, vec![id.into()]))
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let status: String = row.try_get_by_index(4)?;

        Ok(Some(ReferenceDetail {
            id: row.try_get_by_index(0)?,
            student_id: row.try_get_by_index(1)?,
            content_id: row.try_get_by_index(2)?,
            title: row.try_get_by_index(3)?,
            status: parse_status(&status)?,
            submitted_at: row.try_get_by_index::<Option<DateTime<Utc>>>(5)?,
            verified_at: row.try_get_by_index::<Option<DateTime<Utc>>>(6)?,
            verified_by: row.try_get_by_index::<Option<Uuid>>(7)?,
            rejection_note: row.try_get_by_index(8)?,
            created_at: row.try_get_by_index::<DateTime<Utc>>(9)?,
            updated_at: row.try_get_by_index::<DateTime<Utc>>(10)?,
            student_name: row.try_get_by_index(11)?,
            matriculation_id: row.try_get_by_index(12)?,
            advisor_id: row.try_get_by_index::<Option<Uuid>>(13)?,
            verifier_name: row.try_get_by_index::<Option<String>>(14)?,
        }))
    }

    async fn mark_submitted(&self, id: Uuid, at: DateTime<Utc>) -> Result<Option<String>> {
        let sql = r#"
            UPDATE achievement_references
            SET status = 'submitted', submitted_at = $2, updated_at = $2
            WHERE id = $1 AND status = 'draft'
            RETURNING content_id
        "#;

        self.conditional_update(sql, vec![id.into(), at.into()]).await
    }

    async fn mark_verified(
        &self,
        id: Uuid,
        lecturer_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<String>> {
        let sql = r#"
            UPDATE achievement_references
            SET status = 'verified', verified_by = $2, verified_at = $3, updated_at = $3
            WHERE id = $1 AND status = 'submitted'
            RETURNING content_id
        "#;

        self.conditional_update(sql, vec![id.into(), lecturer_id.into(), at.into()])
            .await
    }

    async fn mark_rejected(
        &self,
        id: Uuid,
        lecturer_id: Uuid,
        note: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<String>> {
        let sql = r#"
            UPDATE achievement_references
            SET status = 'rejected', verified_by = $2, verified_at = $3,
                rejection_note = $4, updated_at = $3
            WHERE id = $1 AND status = 'submitted'
            RETURNING content_id
        "#;

        self.conditional_update(
            sql,
            vec![id.into(), lecturer_id.into(), at.into(), note.into()],
        )
        .await
    }

    async fn mark_deleted(&self, id: Uuid, at: DateTime<Utc>) -> Result<Option<String>> {
        let sql = r#"
            UPDATE achievement_references
            SET status = 'deleted', updated_at = $2
            WHERE id = $1 AND status = 'draft'
            RETURNING content_id
        "#;

        self.conditional_update(sql, vec![id.into(), at.into()]).await
    }

    async fn list(&self, query: &ListQuery) -> Result<(Vec<ReferenceListItem>, u64)> {
        use sea_orm::ConnectionTrait;

        let (predicate, values) = build_predicate(query);

        // Total over the same predicate, minus limit/offset, so the
        // count reflects the full filtered set
        let count_sql = format!(
            "SELECT COUNT(*) FROM achievement_references ar \
             JOIN students s ON ar.student_id = s.id \
             WHERE {predicate}"
        );

        let total = self
            .pool
            .conn()
            .query_one(Self::stmt(count_sql, values.clone()))
            .await?
            .map(|row| row.try_get_by_index::<i64>(0))
            .transpose()?
            .unwrap_or(0);

        let direction = if query.ascending { "ASC" } else { "DESC" };
        let list_sql = format!(
            "SELECT {LIST_COLUMNS} \
             FROM achievement_references ar \
             JOIN students s ON ar.student_id = s.id \
             JOIN users u ON s.user_id = u.id \
             WHERE {predicate} \
             ORDER BY {column} {direction} \
             LIMIT {limit} OFFSET {offset}",
            column = query.sort.column(),
            limit = query.limit,
            offset = query.offset,
        );

        let rows = self.pool.conn().query_all(Self::stmt(list_sql, values)).await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let status: String = row.try_get_by_index(4)?;
            items.push(ReferenceListItem {
                id: row.try_get_by_index(0)?,
                student_id: row.try_get_by_index(1)?,
                content_id: row.try_get_by_index(2)?,
                title: row.try_get_by_index(3)?,
                status: parse_status(&status)?,
                submitted_at: row.try_get_by_index::<Option<DateTime<Utc>>>(5)?,
                verified_at: row.try_get_by_index::<Option<DateTime<Utc>>>(6)?,
                verified_by: row.try_get_by_index::<Option<Uuid>>(7)?,
                rejection_note: row.try_get_by_index(8)?,
                created_at: row.try_get_by_index::<DateTime<Utc>>(9)?,
                updated_at: row.try_get_by_index::<DateTime<Utc>>(10)?,
                student_name: row.try_get_by_index(11)?,
                matriculation_id: row.try_get_by_index(12)?,
            });
        }

        Ok((items, total as u64))
    }

    async fn status_summary(&self, student_id: Option<Uuid>) -> Result<StatusSummary> {
        use sea_orm::ConnectionTrait;

        let sql = r#"
            SELECT
                COUNT(*) FILTER (WHERE status != 'deleted')  AS total,
                COUNT(*) FILTER (WHERE status = 'verified')  AS verified,
                COUNT(*) FILTER (WHERE status = 'submitted') AS pending,
                COUNT(*) FILTER (WHERE status = 'rejected')  AS rejected
            FROM achievement_references
            WHERE $1::uuid IS NULL OR student_id = $1
        "#;

        let row = self
            .pool
            .conn()
            .query_one(Self::stmt(sql, vec![student_id.into()]))
            .await?;

        match row {
            Some(row) => Ok(StatusSummary {
                total_achievements: row.try_get_by_index(0)?,
                total_verified: row.try_get_by_index(1)?,
                total_pending: row.try_get_by_index(2)?,
                total_rejected: row.try_get_by_index(3)?,
            }),
            None => Ok(StatusSummary::default()),
        }
    }

    async fn student_display(&self, student_id: Uuid) -> Result<Option<(String, String)>> {
        use sea_orm::ConnectionTrait;

        let sql = r#"
            SELECT u.full_name, s.program_study
            FROM students s
            JOIN users u ON s.user_id = u.id
            WHERE s.id = $1
        "#;

        let row = self
            .pool
            .conn()
            .query_one(Self::stmt(sql, vec![student_id.into()]))
            .await?;

        match row {
            Some(row) => Ok(Some((
                row.try_get_by_index(0)?,
                row.try_get_by_index(1)?,
            ))),
            None => Ok(None),
        }
    }
}
