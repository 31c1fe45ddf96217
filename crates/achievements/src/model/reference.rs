//! Achievement reference entity
//!
//! One row per achievement: workflow metadata plus the pointer into
//! the content document store. The title is duplicated here for
//! searchability and never re-synchronized after creation.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "achievement_references")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub student_id: Uuid,

    /// Hex form of the content document's ObjectId (cross-store link)
    pub content_id: String,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    /// One of draft | submitted | verified | rejected | deleted
    pub status: String,

    pub submitted_at: Option<DateTimeWithTimeZone>,

    pub verified_at: Option<DateTimeWithTimeZone>,

    pub verified_by: Option<Uuid>,

    /// Empty unless status is rejected
    #[sea_orm(column_type = "Text")]
    pub rejection_note: String,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::student::Entity",
        from = "Column::StudentId",
        to = "super::student::Column::Id"
    )]
    Student,

    #[sea_orm(
        belongs_to = "super::lecturer::Entity",
        from = "Column::VerifiedBy",
        to = "super::lecturer::Column::Id"
    )]
    Verifier,
}

impl Related<super::student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
