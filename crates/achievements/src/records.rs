//! Hybrid record access
//!
//! A full achievement is the reference row joined with its content
//! document. The reference is authoritative for existence: a missing
//! content document behind a live reference is a store fault, not a
//! not-found.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::model::{AchievementDoc, Attachment};
use crate::store::{ContentStore, ReferenceDetail, ReferenceStore};
use meritrack_common::{AppError, Result, StoreKind};

/// Both halves of one achievement
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementRecord {
    pub reference: ReferenceDetail,
    pub content: AchievementDoc,
}

/// Reads and amends full achievement records
pub struct AchievementRecords {
    refs: Arc<dyn ReferenceStore>,
    content: Arc<dyn ContentStore>,
}

impl AchievementRecords {
    pub fn new(refs: Arc<dyn ReferenceStore>, content: Arc<dyn ContentStore>) -> Self {
        Self { refs, content }
    }

    /// Fetch one achievement with its content document
    pub async fn detail(&self, id: Uuid) -> Result<AchievementRecord> {
        let reference = self
            .refs
            .find_detail(id)
            .await?
            .ok_or(AppError::AchievementNotFound { id: id.to_string() })?;

        let content = self
            .content
            .find(&reference.content_id)
            .await?
            .ok_or_else(|| {
                AppError::dependency(
                    StoreKind::Content,
                    format!("content record {} missing", reference.content_id),
                )
            })?;

        Ok(AchievementRecord { reference, content })
    }

    /// Append one evidence file to an achievement's attachment list
    pub async fn append_attachment(
        &self,
        id: Uuid,
        file_name: impl Into<String>,
        file_url: impl Into<String>,
        file_type: impl Into<String>,
    ) -> Result<Attachment> {
        let file_url = file_url.into();
        if file_url.trim().is_empty() {
            return Err(AppError::Validation {
                message: "attachment url must not be empty".into(),
                field: Some("fileUrl".into()),
            });
        }

        let reference = self
            .refs
            .find_detail(id)
            .await?
            .ok_or(AppError::AchievementNotFound { id: id.to_string() })?;

        let attachment = Attachment {
            file_name: file_name.into(),
            file_url,
            file_type: file_type.into(),
            uploaded_at: bson::DateTime::from_chrono(Utc::now()),
        };

        self.content
            .push_attachment(&reference.content_id, &attachment)
            .await?;

        Ok(attachment)
    }
}
