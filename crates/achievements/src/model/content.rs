//! Achievement content document
//!
//! The open-ended half of an achievement: the type-varying details
//! bag, attachments, tags and the awarded points. Exactly one of
//! these documents exists per non-deleted reference row; `points` is
//! authoritative on this side only.

use bson::{doc, oid::ObjectId, Bson, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use meritrack_common::db::IntoIndexes;

/// One achievement content document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementDoc {
    /// Store-generated id, immutable once assigned
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    /// Owning student's relational id (UUID string)
    pub student_id: String,

    pub title: String,

    #[serde(default)]
    pub description: String,

    /// Type tag plus the matching details shape
    #[serde(flatten)]
    pub body: AchievementBody,

    #[serde(default)]
    pub attachments: Vec<Attachment>,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Awarded points; meaningful only once the reference is verified
    #[serde(default)]
    pub points: i32,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_deleted: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime>,

    pub created_at: DateTime,

    pub updated_at: DateTime,
}

impl AchievementDoc {
    /// Create a fresh document with current timestamps and no points
    pub fn new(
        student_id: String,
        title: impl Into<String>,
        description: impl Into<String>,
        body: AchievementBody,
    ) -> Self {
        let now = DateTime::now();
        Self {
            id: None,
            student_id,
            title: title.into(),
            description: description.into(),
            body,
            attachments: Vec::new(),
            tags: Vec::new(),
            points: 0,
            is_deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// The polymorphic details bag, keyed by `achievementType`.
///
/// Serializes as `{ "achievementType": "...", "details": { ... } }`,
/// so only the fields relevant to the type are ever populated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "achievementType", content = "details", rename_all = "camelCase")]
pub enum AchievementBody {
    Competition(CompetitionDetails),
    Publication(PublicationDetails),
    Organization(OrganizationDetails),
    Certification(CertificationDetails),
    Other(OtherDetails),
}

impl AchievementBody {
    /// The type tag as it appears in the store
    pub fn achievement_type(&self) -> &'static str {
        match self {
            AchievementBody::Competition(_) => "competition",
            AchievementBody::Publication(_) => "publication",
            AchievementBody::Organization(_) => "organization",
            AchievementBody::Certification(_) => "certification",
            AchievementBody::Other(_) => "other",
        }
    }

    /// Competition level, if this is a competition
    pub fn competition_level(&self) -> Option<&str> {
        match self {
            AchievementBody::Competition(d) => Some(d.competition_level.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitionDetails {
    pub competition_name: String,

    /// e.g. regional, national, international; empty buckets as "unknown"
    #[serde(default)]
    pub competition_level: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub medal_type: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_fields: BTreeMap<String, Bson>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicationDetails {
    pub publication_type: String,

    pub publication_title: String,

    #[serde(default)]
    pub authors: Vec<String>,

    #[serde(default)]
    pub publisher: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub issn: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_fields: BTreeMap<String, Bson>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationDetails {
    pub organization_name: String,

    pub position: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<Period>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_fields: BTreeMap<String, Bson>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Period {
    pub start: DateTime,
    pub end: DateTime,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificationDetails {
    pub certification_name: String,

    pub issued_by: String,

    #[serde(default)]
    pub certification_number: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<DateTime>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_fields: BTreeMap<String, Bson>,
}

/// Free-form shape for achievements outside the named categories
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtherDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_date: Option<DateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub organizer: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_fields: BTreeMap<String, Bson>,
}

/// One uploaded evidence file, appended in order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub file_name: String,
    pub file_url: String,
    pub file_type: String,
    pub uploaded_at: DateTime,
}

impl IntoIndexes for AchievementDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Per-student lookups and grouping
            (doc! { "studentId": 1 }, None),
            // Type/level statistics
            (doc! { "achievementType": 1 }, None),
            // Points ranking ($match points > 0)
            (doc! { "points": -1 }, None),
            // Period statistics
            (doc! { "createdAt": -1 }, None),
        ]
    }
}
