//! In-memory store implementations for component tests

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::{DateTime, Months, Utc};
use uuid::Uuid;

use crate::model::{
    AchievementBody, AchievementDoc, AchievementStatus, Attachment, CompetitionDetails,
};
use crate::store::{
    ContentStore, ListQuery, NewReference, ReferenceDetail, ReferenceListItem, ReferenceStore,
    SortColumn, StatusSummary,
};
use meritrack_common::{AppError, Result, StoreKind};

pub struct StudentProfile {
    pub name: String,
    pub matriculation_id: String,
    pub program_study: String,
    pub advisor_id: Option<Uuid>,
}

struct RefRow {
    student_id: Uuid,
    content_id: String,
    title: String,
    status: AchievementStatus,
    submitted_at: Option<DateTime<Utc>>,
    verified_at: Option<DateTime<Utc>>,
    verified_by: Option<Uuid>,
    rejection_note: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct MemoryReferenceStore {
    rows: Mutex<HashMap<Uuid, RefRow>>,
    students: Mutex<HashMap<Uuid, StudentProfile>>,
    pub fail_insert: AtomicBool,
}

impl MemoryReferenceStore {
    pub fn add_student(
        &self,
        id: Uuid,
        name: &str,
        matriculation_id: &str,
        program_study: &str,
        advisor_id: Option<Uuid>,
    ) {
        self.students.lock().unwrap().insert(
            id,
            StudentProfile {
                name: name.to_string(),
                matriculation_id: matriculation_id.to_string(),
                program_study: program_study.to_string(),
                advisor_id,
            },
        );
    }

    fn detail_of(&self, id: Uuid, row: &RefRow) -> Option<ReferenceDetail> {
        let students = self.students.lock().unwrap();
        let student = students.get(&row.student_id)?;
        Some(ReferenceDetail {
            id,
            student_id: row.student_id,
            content_id: row.content_id.clone(),
            title: row.title.clone(),
            status: row.status,
            submitted_at: row.submitted_at,
            verified_at: row.verified_at,
            verified_by: row.verified_by,
            rejection_note: row.rejection_note.clone(),
            created_at: row.created_at,
            updated_at: row.updated_at,
            student_name: student.name.clone(),
            matriculation_id: student.matriculation_id.clone(),
            advisor_id: student.advisor_id,
            verifier_name: None,
        })
    }

    fn transition(
        &self,
        id: Uuid,
        expected: AchievementStatus,
        apply: impl FnOnce(&mut RefRow),
    ) -> Result<Option<String>> {
        let mut rows = self.rows.lock().unwrap();
        match rows.get_mut(&id) {
            Some(row) if row.status == expected => {
                apply(row);
                row.updated_at = Utc::now();
                Ok(Some(row.content_id.clone()))
            }
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl ReferenceStore for MemoryReferenceStore {
    async fn insert(&self, new_ref: NewReference) -> Result<Uuid> {
        if self.fail_insert.load(Ordering::Relaxed) {
            return Err(AppError::dependency(
                StoreKind::Reference,
                "insert failed (injected)",
            ));
        }

        let id = Uuid::new_v4();
        let now = Utc::now();
        self.rows.lock().unwrap().insert(
            id,
            RefRow {
                student_id: new_ref.student_id,
                content_id: new_ref.content_id,
                title: new_ref.title,
                status: AchievementStatus::Draft,
                submitted_at: None,
                verified_at: None,
                verified_by: None,
                rejection_note: String::new(),
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }

    async fn find_detail(&self, id: Uuid) -> Result<Option<ReferenceDetail>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .get(&id)
            .filter(|row| row.status != AchievementStatus::Deleted)
            .and_then(|row| self.detail_of(id, row)))
    }

    async fn mark_submitted(&self, id: Uuid, at: DateTime<Utc>) -> Result<Option<String>> {
        self.transition(id, AchievementStatus::Draft, |row| {
            row.status = AchievementStatus::Submitted;
            row.submitted_at = Some(at);
        })
    }

    async fn mark_verified(
        &self,
        id: Uuid,
        lecturer_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<String>> {
        self.transition(id, AchievementStatus::Submitted, |row| {
            row.status = AchievementStatus::Verified;
            row.verified_by = Some(lecturer_id);
            row.verified_at = Some(at);
        })
    }

    async fn mark_rejected(
        &self,
        id: Uuid,
        lecturer_id: Uuid,
        note: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<String>> {
        self.transition(id, AchievementStatus::Submitted, |row| {
            row.status = AchievementStatus::Rejected;
            row.verified_by = Some(lecturer_id);
            row.verified_at = Some(at);
            row.rejection_note = note.to_string();
        })
    }

    async fn mark_deleted(&self, id: Uuid, _at: DateTime<Utc>) -> Result<Option<String>> {
        self.transition(id, AchievementStatus::Draft, |row| {
            row.status = AchievementStatus::Deleted;
        })
    }

    async fn list(&self, query: &ListQuery) -> Result<(Vec<ReferenceListItem>, u64)> {
        let rows = self.rows.lock().unwrap();
        let students = self.students.lock().unwrap();

        let mut matched: Vec<ReferenceListItem> = rows
            .iter()
            .filter(|(_, row)| row.status != AchievementStatus::Deleted)
            .filter(|(_, row)| {
                query
                    .scope
                    .student_id
                    .map_or(true, |s| row.student_id == s)
            })
            .filter(|(_, row)| {
                query.scope.advisor_id.map_or(true, |a| {
                    students
                        .get(&row.student_id)
                        .is_some_and(|p| p.advisor_id == Some(a))
                })
            })
            .filter(|(_, row)| {
                query.search.as_deref().map_or(true, |term| {
                    let term = term.to_lowercase();
                    row.title.to_lowercase().contains(&term)
                        || row.status.as_str().contains(&term)
                })
            })
            .filter_map(|(id, row)| {
                let student = students.get(&row.student_id)?;
                Some(ReferenceListItem {
                    id: *id,
                    student_id: row.student_id,
                    content_id: row.content_id.clone(),
                    title: row.title.clone(),
                    status: row.status,
                    submitted_at: row.submitted_at,
                    verified_at: row.verified_at,
                    verified_by: row.verified_by,
                    rejection_note: row.rejection_note.clone(),
                    created_at: row.created_at,
                    updated_at: row.updated_at,
                    student_name: student.name.clone(),
                    matriculation_id: student.matriculation_id.clone(),
                })
            })
            .collect();

        matched.sort_by(|a, b| {
            let ord = match query.sort {
                SortColumn::Title => a.title.cmp(&b.title),
                SortColumn::Status => a.status.as_str().cmp(b.status.as_str()),
                SortColumn::CreatedAt => a.created_at.cmp(&b.created_at),
            };
            if query.ascending {
                ord
            } else {
                ord.reverse()
            }
        });

        let total = matched.len() as u64;
        let page: Vec<_> = matched
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn status_summary(&self, student_id: Option<Uuid>) -> Result<StatusSummary> {
        let rows = self.rows.lock().unwrap();
        let mut summary = StatusSummary::default();
        for row in rows
            .values()
            .filter(|row| student_id.map_or(true, |s| row.student_id == s))
        {
            match row.status {
                AchievementStatus::Deleted => continue,
                AchievementStatus::Verified => summary.total_verified += 1,
                AchievementStatus::Submitted => summary.total_pending += 1,
                AchievementStatus::Rejected => summary.total_rejected += 1,
                AchievementStatus::Draft => {}
            }
            summary.total_achievements += 1;
        }
        Ok(summary)
    }

    async fn student_display(&self, student_id: Uuid) -> Result<Option<(String, String)>> {
        let students = self.students.lock().unwrap();
        Ok(students
            .get(&student_id)
            .map(|p| (p.name.clone(), p.program_study.clone())))
    }
}

#[derive(Default)]
pub struct MemoryContentStore {
    docs: Mutex<HashMap<String, AchievementDoc>>,
    pub fail_insert: AtomicBool,
    pub fail_delete: AtomicBool,
    pub fail_set_points: AtomicBool,
    pub fail_stats: AtomicBool,
}

impl MemoryContentStore {
    pub fn len(&self) -> usize {
        self.docs.lock().unwrap().len()
    }

    fn scoped(doc: &AchievementDoc, student_id: Option<Uuid>) -> bool {
        student_id.map_or(true, |s| doc.student_id == s.to_string())
    }

    fn check_stats(&self) -> Result<()> {
        if self.fail_stats.load(Ordering::Relaxed) {
            return Err(AppError::dependency(
                StoreKind::Content,
                "aggregation failed (injected)",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn insert(&self, doc: &AchievementDoc) -> Result<String> {
        if self.fail_insert.load(Ordering::Relaxed) {
            return Err(AppError::dependency(
                StoreKind::Content,
                "insert failed (injected)",
            ));
        }
        let oid = ObjectId::new();
        let mut stored = doc.clone();
        stored.id = Some(oid);
        self.docs.lock().unwrap().insert(oid.to_hex(), stored);
        Ok(oid.to_hex())
    }

    async fn find(&self, content_id: &str) -> Result<Option<AchievementDoc>> {
        Ok(self.docs.lock().unwrap().get(content_id).cloned())
    }

    async fn delete(&self, content_id: &str) -> Result<()> {
        if self.fail_delete.load(Ordering::Relaxed) {
            return Err(AppError::dependency(
                StoreKind::Content,
                "delete failed (injected)",
            ));
        }
        self.docs.lock().unwrap().remove(content_id);
        Ok(())
    }

    async fn set_points(&self, content_id: &str, points: i32) -> Result<()> {
        if self.fail_set_points.load(Ordering::Relaxed) {
            return Err(AppError::dependency(
                StoreKind::Content,
                "update failed (injected)",
            ));
        }
        let mut docs = self.docs.lock().unwrap();
        let doc = docs.get_mut(content_id).ok_or_else(|| {
            AppError::dependency(StoreKind::Content, "content record missing")
        })?;
        doc.points = points;
        Ok(())
    }

    async fn soft_delete(&self, content_id: &str, at: DateTime<Utc>) -> Result<()> {
        let mut docs = self.docs.lock().unwrap();
        let doc = docs.get_mut(content_id).ok_or_else(|| {
            AppError::dependency(StoreKind::Content, "content record missing")
        })?;
        doc.is_deleted = true;
        doc.deleted_at = Some(bson::DateTime::from_chrono(at));
        Ok(())
    }

    async fn push_attachment(&self, content_id: &str, attachment: &Attachment) -> Result<()> {
        let mut docs = self.docs.lock().unwrap();
        let doc = docs.get_mut(content_id).ok_or_else(|| {
            AppError::dependency(StoreKind::Content, "content record missing")
        })?;
        doc.attachments.push(attachment.clone());
        Ok(())
    }

    async fn counts_by_type(&self, student_id: Option<Uuid>) -> Result<HashMap<String, i64>> {
        self.check_stats()?;
        let docs = self.docs.lock().unwrap();
        let mut counts = HashMap::new();
        for doc in docs.values().filter(|d| Self::scoped(d, student_id)) {
            *counts
                .entry(doc.body.achievement_type().to_string())
                .or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn counts_by_level(&self, student_id: Option<Uuid>) -> Result<HashMap<String, i64>> {
        self.check_stats()?;
        let docs = self.docs.lock().unwrap();
        let mut counts = HashMap::new();
        for doc in docs.values().filter(|d| Self::scoped(d, student_id)) {
            if let Some(level) = doc.body.competition_level() {
                let key = if level.is_empty() { "unknown" } else { level };
                *counts.entry(key.to_string()).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    async fn counts_by_month(
        &self,
        student_id: Option<Uuid>,
        months: u32,
    ) -> Result<BTreeMap<String, i64>> {
        self.check_stats()?;
        let now = Utc::now();
        let since = now.checked_sub_months(Months::new(months)).unwrap_or(now);

        let docs = self.docs.lock().unwrap();
        let mut counts = BTreeMap::new();
        for doc in docs.values().filter(|d| Self::scoped(d, student_id)) {
            let created = doc.created_at.to_chrono();
            if created < since {
                continue;
            }
            let key = format!("{}", created.format("%Y-%m"));
            *counts.entry(key).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn top_students(&self, limit: i64) -> Result<Vec<(Uuid, i64)>> {
        self.check_stats()?;
        let docs = self.docs.lock().unwrap();
        let mut totals: HashMap<Uuid, i64> = HashMap::new();
        for doc in docs.values().filter(|d| d.points > 0) {
            let Ok(student_id) = doc.student_id.parse::<Uuid>() else {
                continue;
            };
            *totals.entry(student_id).or_insert(0) += i64::from(doc.points);
        }

        let mut ranked: Vec<_> = totals.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(limit as usize);
        Ok(ranked)
    }

    async fn total_points(&self, student_id: Option<Uuid>) -> Result<i64> {
        self.check_stats()?;
        let docs = self.docs.lock().unwrap();
        Ok(docs
            .values()
            .filter(|d| d.points > 0 && Self::scoped(d, student_id))
            .map(|d| i64::from(d.points))
            .sum())
    }
}

/// A competition document owned by `student_id`
pub fn competition_doc(student_id: Uuid, title: &str, level: &str) -> AchievementDoc {
    AchievementDoc::new(
        student_id.to_string(),
        title,
        "",
        AchievementBody::Competition(CompetitionDetails {
            competition_name: title.to_string(),
            competition_level: level.to_string(),
            rank: None,
            medal_type: None,
            custom_fields: Default::default(),
        }),
    )
}
