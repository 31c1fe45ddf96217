//! Status transition coordinator
//!
//! All status changes funnel through here: caller checks first for
//! precise errors, then a conditional store write that only lands if
//! the row is still in the expected state. A conditional write that
//! matches nothing means a concurrent transition won, and reads as a
//! state conflict.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::model::AchievementStatus;
use crate::store::{ContentStore, ReferenceDetail, ReferenceStore};
use meritrack_common::{AppError, Result};

const MAX_REJECTION_NOTE: usize = 1000;

/// Outcome of a completed transition
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionOutcome {
    pub id: Uuid,
    pub status: AchievementStatus,
}

/// Coordinates the achievement status lifecycle
pub struct StatusCoordinator {
    refs: Arc<dyn ReferenceStore>,
    content: Arc<dyn ContentStore>,
}

impl StatusCoordinator {
    pub fn new(refs: Arc<dyn ReferenceStore>, content: Arc<dyn ContentStore>) -> Self {
        Self { refs, content }
    }

    async fn load(&self, id: Uuid) -> Result<ReferenceDetail> {
        self.refs
            .find_detail(id)
            .await?
            .ok_or(AppError::AchievementNotFound { id: id.to_string() })
    }

    fn ensure_owner(detail: &ReferenceDetail, caller_student_id: Uuid) -> Result<()> {
        if detail.student_id != caller_student_id {
            return Err(AppError::forbidden(
                "achievement belongs to a different student",
            ));
        }
        Ok(())
    }

    fn ensure_advisor(detail: &ReferenceDetail, caller_lecturer_id: Uuid) -> Result<()> {
        if detail.advisor_id != Some(caller_lecturer_id) {
            return Err(AppError::forbidden(
                "only the student's advisor may review this achievement",
            ));
        }
        Ok(())
    }

    /// Guard a transition against the legal table; each target state
    /// has exactly one legal source, so this pins the expected status
    fn ensure_can_move(detail: &ReferenceDetail, to: AchievementStatus) -> Result<()> {
        if !detail.status.can_transition(to) {
            return Err(AppError::conflict(format!(
                "achievement is {}, cannot move to {}",
                detail.status, to
            )));
        }
        Ok(())
    }

    /// draft -> submitted, by the owning student
    pub async fn request_verification(
        &self,
        id: Uuid,
        caller_student_id: Uuid,
    ) -> Result<TransitionOutcome> {
        let detail = self.load(id).await?;
        Self::ensure_owner(&detail, caller_student_id)?;
        Self::ensure_can_move(&detail, AchievementStatus::Submitted)?;

        let moved = self.refs.mark_submitted(id, Utc::now()).await?;
        if moved.is_none() {
            return Err(AppError::conflict(
                "achievement was modified concurrently, only drafts can be submitted",
            ));
        }

        match detail.advisor_id {
            Some(advisor_id) => info!(
                achievement_id = %id,
                advisor_id = %advisor_id,
                title = %detail.title,
                "notify advisor: verification requested"
            ),
            None => warn!(
                achievement_id = %id,
                student_id = %detail.student_id,
                "verification requested but student has no advisor"
            ),
        }

        Ok(TransitionOutcome {
            id,
            status: AchievementStatus::Submitted,
        })
    }

    /// submitted -> verified, by the student's advisor; awarded points
    /// propagate to the content document
    pub async fn verify(
        &self,
        id: Uuid,
        caller_lecturer_id: Uuid,
        points: i32,
    ) -> Result<TransitionOutcome> {
        if points <= 0 {
            return Err(AppError::Validation {
                message: "points must be greater than 0".into(),
                field: Some("points".into()),
            });
        }

        let detail = self.load(id).await?;
        Self::ensure_advisor(&detail, caller_lecturer_id)?;
        Self::ensure_can_move(&detail, AchievementStatus::Verified)?;

        let content_id = self
            .refs
            .mark_verified(id, caller_lecturer_id, Utc::now())
            .await?
            .ok_or_else(|| {
                AppError::conflict(
                    "achievement was modified concurrently, only submitted achievements can be verified",
                )
            })?;

        // Reference is committed at this point; a failed points write
        // must surface so the caller knows the content side lagged
        if let Err(err) = self.content.set_points(&content_id, points).await {
            error!(
                achievement_id = %id,
                content_id = %content_id,
                error = %err,
                "verified but points propagation failed"
            );
            return Err(err);
        }

        info!(
            achievement_id = %id,
            student_id = %detail.student_id,
            points,
            "notify student: achievement verified"
        );

        Ok(TransitionOutcome {
            id,
            status: AchievementStatus::Verified,
        })
    }

    /// submitted -> rejected, by the student's advisor, with a note
    pub async fn reject(
        &self,
        id: Uuid,
        caller_lecturer_id: Uuid,
        note: &str,
    ) -> Result<TransitionOutcome> {
        let note = note.trim();
        if note.is_empty() {
            return Err(AppError::Validation {
                message: "rejection note must not be empty".into(),
                field: Some("note".into()),
            });
        }
        if note.chars().count() > MAX_REJECTION_NOTE {
            return Err(AppError::Validation {
                message: format!("rejection note exceeds {} characters", MAX_REJECTION_NOTE),
                field: Some("note".into()),
            });
        }

        let detail = self.load(id).await?;
        Self::ensure_advisor(&detail, caller_lecturer_id)?;
        Self::ensure_can_move(&detail, AchievementStatus::Rejected)?;

        let moved = self
            .refs
            .mark_rejected(id, caller_lecturer_id, note, Utc::now())
            .await?;
        if moved.is_none() {
            return Err(AppError::conflict(
                "achievement was modified concurrently, only submitted achievements can be rejected",
            ));
        }

        info!(
            achievement_id = %id,
            student_id = %detail.student_id,
            "notify student: achievement rejected"
        );

        Ok(TransitionOutcome {
            id,
            status: AchievementStatus::Rejected,
        })
    }

    /// draft -> deleted, by the owning student; the content document
    /// is flagged deleted alongside
    pub async fn delete(&self, id: Uuid, caller_student_id: Uuid) -> Result<TransitionOutcome> {
        let detail = self.load(id).await?;
        Self::ensure_owner(&detail, caller_student_id)?;
        Self::ensure_can_move(&detail, AchievementStatus::Deleted)?;

        let content_id = self
            .refs
            .mark_deleted(id, Utc::now())
            .await?
            .ok_or_else(|| {
                AppError::conflict(
                    "achievement was modified concurrently, only drafts can be deleted",
                )
            })?;

        if let Err(err) = self.content.soft_delete(&content_id, Utc::now()).await {
            error!(
                achievement_id = %id,
                content_id = %content_id,
                error = %err,
                "reference deleted but content flag failed"
            );
            return Err(err);
        }

        info!(
            achievement_id = %id,
            student_id = %detail.student_id,
            "achievement deleted by owner"
        );

        Ok(TransitionOutcome {
            id,
            status: AchievementStatus::Deleted,
        })
    }
}
