//! Two-store creation saga
//!
//! An achievement is born in two writes: the content document first,
//! then the reference row pointing at it. If the second write fails
//! the first is compensated with a hard delete, so no content document
//! is left without a reference. Compensation failure is logged and
//! swallowed; the caller still sees the original insert error.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::model::{AchievementDoc, AchievementStatus};
use crate::store::{ContentStore, NewReference, ReferenceStore};
use meritrack_common::{AppError, Result};

/// Outcome of a successful creation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedAchievement {
    pub reference_id: Uuid,
    pub content_id: String,
    pub status: AchievementStatus,
}

/// Coordinates achievement creation across both stores
pub struct CreationSaga {
    refs: Arc<dyn ReferenceStore>,
    content: Arc<dyn ContentStore>,
}

impl CreationSaga {
    pub fn new(refs: Arc<dyn ReferenceStore>, content: Arc<dyn ContentStore>) -> Self {
        Self { refs, content }
    }

    /// Create an achievement in draft state.
    ///
    /// The reference row is derived from the document, so the two
    /// sides cannot disagree on owner or title at birth.
    pub async fn create(&self, doc: AchievementDoc) -> Result<CreatedAchievement> {
        if doc.title.trim().is_empty() {
            return Err(AppError::Validation {
                message: "title must not be empty".into(),
                field: Some("title".into()),
            });
        }

        let student_id = doc
            .student_id
            .parse::<Uuid>()
            .map_err(|_| AppError::InvalidId {
                id: doc.student_id.clone(),
            })?;

        let content_id = self.content.insert(&doc).await?;

        let new_ref = NewReference {
            student_id,
            content_id: content_id.clone(),
            title: doc.title.clone(),
        };

        let reference_id = match self.refs.insert(new_ref).await {
            Ok(id) => id,
            Err(err) => {
                // Compensate the content write; its failure must not
                // mask the original error
                if let Err(comp_err) = self.content.delete(&content_id).await {
                    warn!(
                        content_id = %content_id,
                        error = %comp_err,
                        "compensation delete failed, content document orphaned"
                    );
                }
                return Err(err);
            }
        };

        info!(
            reference_id = %reference_id,
            content_id = %content_id,
            student_id = %student_id,
            "achievement created"
        );

        Ok(CreatedAchievement {
            reference_id,
            content_id,
            status: AchievementStatus::Draft,
        })
    }
}
