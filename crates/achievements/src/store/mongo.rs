//! MongoDB adapter for the content store
//!
//! Point operations go through the typed collection wrapper; the
//! statistics queries are aggregation pipelines, built as plain
//! documents so their shape stays testable without a server.

use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Bson, Document};
use chrono::{DateTime, Months, Utc};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use crate::model::{AchievementDoc, Attachment};
use crate::store::ContentStore;
use meritrack_common::{AppError, MongoClient, Result, StoreKind, ACHIEVEMENTS_COLLECTION};

/// Content store backed by MongoDB
#[derive(Clone)]
pub struct MongoContentStore {
    collection: meritrack_common::db::MongoCollection<AchievementDoc>,
}

impl MongoContentStore {
    /// Open the achievements collection, creating its indexes
    pub async fn new(client: &MongoClient) -> Result<Self> {
        let collection = client.collection(ACHIEVEMENTS_COLLECTION).await?;
        Ok(Self { collection })
    }

    fn object_id(content_id: &str) -> Result<ObjectId> {
        ObjectId::parse_str(content_id).map_err(|_| AppError::InvalidId {
            id: content_id.to_string(),
        })
    }
}

/// Read a grouped count regardless of the accumulator's integer width
fn read_i64(doc: &Document, key: &str) -> i64 {
    match doc.get(key) {
        Some(Bson::Int64(n)) => *n,
        Some(Bson::Int32(n)) => i64::from(*n),
        Some(Bson::Double(n)) => *n as i64,
        _ => 0,
    }
}

fn type_counts_pipeline(student_id: Option<Uuid>) -> Vec<Document> {
    let mut pipeline = Vec::new();
    if let Some(student_id) = student_id {
        pipeline.push(doc! { "$match": { "studentId": student_id.to_string() } });
    }
    pipeline.push(doc! {
        "$group": { "_id": "$achievementType", "count": { "$sum": 1 } }
    });
    pipeline
}

fn level_counts_pipeline(student_id: Option<Uuid>) -> Vec<Document> {
    let mut filter = doc! { "achievementType": "competition" };
    if let Some(student_id) = student_id {
        filter.insert("studentId", student_id.to_string());
    }
    vec![
        doc! { "$match": filter },
        doc! {
            "$group": { "_id": "$details.competitionLevel", "count": { "$sum": 1 } }
        },
    ]
}

fn month_counts_pipeline(student_id: Option<Uuid>, since: DateTime<Utc>) -> Vec<Document> {
    let mut filter = doc! { "createdAt": { "$gte": bson::DateTime::from_chrono(since) } };
    if let Some(student_id) = student_id {
        filter.insert("studentId", student_id.to_string());
    }
    vec![
        doc! { "$match": filter },
        doc! {
            "$group": {
                "_id": {
                    "year": { "$year": "$createdAt" },
                    "month": { "$month": "$createdAt" },
                },
                "count": { "$sum": 1 },
            }
        },
        doc! { "$sort": { "_id.year": 1, "_id.month": 1 } },
    ]
}

fn top_students_pipeline(limit: i64) -> Vec<Document> {
    vec![
        doc! { "$match": { "points": { "$gt": 0 } } },
        doc! {
            "$group": { "_id": "$studentId", "totalPoints": { "$sum": "$points" } }
        },
        doc! { "$sort": { "totalPoints": -1 } },
        doc! { "$limit": limit },
    ]
}

fn total_points_pipeline(student_id: Option<Uuid>) -> Vec<Document> {
    let mut filter = doc! { "points": { "$gt": 0 } };
    if let Some(student_id) = student_id {
        filter.insert("studentId", student_id.to_string());
    }
    vec![
        doc! { "$match": filter },
        doc! { "$group": { "_id": null, "total": { "$sum": "$points" } } },
    ]
}

#[async_trait]
impl ContentStore for MongoContentStore {
    async fn insert(&self, doc: &AchievementDoc) -> Result<String> {
        let id = self.collection.insert_one(doc).await?;
        Ok(id.to_hex())
    }

    async fn find(&self, content_id: &str) -> Result<Option<AchievementDoc>> {
        let id = Self::object_id(content_id)?;
        self.collection.find_one(doc! { "_id": id }).await
    }

    async fn delete(&self, content_id: &str) -> Result<()> {
        let id = Self::object_id(content_id)?;
        self.collection.delete_one(doc! { "_id": id }).await?;
        Ok(())
    }

    async fn set_points(&self, content_id: &str, points: i32) -> Result<()> {
        let id = Self::object_id(content_id)?;
        let result = self
            .collection
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "points": points, "updatedAt": bson::DateTime::now() } },
            )
            .await?;

        if result.matched_count == 0 {
            return Err(AppError::dependency(
                StoreKind::Content,
                format!("content record {} missing", content_id),
            ));
        }
        Ok(())
    }

    async fn soft_delete(&self, content_id: &str, at: DateTime<Utc>) -> Result<()> {
        let id = Self::object_id(content_id)?;
        let at = bson::DateTime::from_chrono(at);
        let result = self
            .collection
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "isDeleted": true, "deletedAt": at, "updatedAt": at } },
            )
            .await?;

        if result.matched_count == 0 {
            return Err(AppError::dependency(
                StoreKind::Content,
                format!("content record {} missing", content_id),
            ));
        }
        Ok(())
    }

    async fn push_attachment(&self, content_id: &str, attachment: &Attachment) -> Result<()> {
        let id = Self::object_id(content_id)?;
        let attachment = bson::to_bson(attachment)
            .map_err(|e| AppError::dependency(StoreKind::Content, e.to_string()))?;

        let result = self
            .collection
            .update_one(
                doc! { "_id": id },
                doc! {
                    "$push": { "attachments": attachment },
                    "$set": { "updatedAt": bson::DateTime::now() },
                },
            )
            .await?;

        if result.matched_count == 0 {
            return Err(AppError::dependency(
                StoreKind::Content,
                format!("content record {} missing", content_id),
            ));
        }
        Ok(())
    }

    async fn counts_by_type(&self, student_id: Option<Uuid>) -> Result<HashMap<String, i64>> {
        let rows = self
            .collection
            .aggregate(type_counts_pipeline(student_id))
            .await?;

        let mut counts = HashMap::with_capacity(rows.len());
        for row in &rows {
            let key = row.get_str("_id").unwrap_or_default().to_string();
            counts.insert(key, read_i64(row, "count"));
        }
        Ok(counts)
    }

    async fn counts_by_level(&self, student_id: Option<Uuid>) -> Result<HashMap<String, i64>> {
        let rows = self
            .collection
            .aggregate(level_counts_pipeline(student_id))
            .await?;

        let mut counts = HashMap::with_capacity(rows.len());
        for row in &rows {
            // Absent or empty levels bucket together
            let key = match row.get_str("_id") {
                Ok("") | Err(_) => "unknown".to_string(),
                Ok(level) => level.to_string(),
            };
            *counts.entry(key).or_insert(0) += read_i64(row, "count");
        }
        Ok(counts)
    }

    async fn counts_by_month(
        &self,
        student_id: Option<Uuid>,
        months: u32,
    ) -> Result<BTreeMap<String, i64>> {
        let now = Utc::now();
        let since = now.checked_sub_months(Months::new(months)).unwrap_or(now);

        let rows = self
            .collection
            .aggregate(month_counts_pipeline(student_id, since))
            .await?;

        let mut counts = BTreeMap::new();
        for row in &rows {
            let Ok(id) = row.get_document("_id") else {
                continue;
            };
            let year = read_i64(id, "year");
            let month = read_i64(id, "month");
            counts.insert(format!("{}-{:02}", year, month), read_i64(row, "count"));
        }
        Ok(counts)
    }

    async fn top_students(&self, limit: i64) -> Result<Vec<(Uuid, i64)>> {
        let rows = self.collection.aggregate(top_students_pipeline(limit)).await?;

        let mut ranked = Vec::with_capacity(rows.len());
        for row in &rows {
            // Ids that fail to parse are skipped, not fatal
            let Ok(raw) = row.get_str("_id") else { continue };
            let Ok(student_id) = raw.parse::<Uuid>() else {
                continue;
            };
            ranked.push((student_id, read_i64(row, "totalPoints")));
        }
        Ok(ranked)
    }

    async fn total_points(&self, student_id: Option<Uuid>) -> Result<i64> {
        let rows = self
            .collection
            .aggregate(total_points_pipeline(student_id))
            .await?;

        Ok(rows.first().map(|row| read_i64(row, "total")).unwrap_or(0))
    }
}
