//! Data models: relational entities and document schemas

pub mod content;
pub mod lecturer;
pub mod reference;
pub mod status;
pub mod student;
pub mod user;

pub use content::{
    AchievementBody, AchievementDoc, Attachment, CertificationDetails, CompetitionDetails,
    OrganizationDetails, OtherDetails, Period, PublicationDetails,
};
pub use status::AchievementStatus;

// Entity aliases for query building
pub use lecturer::Entity as LecturerEntity;
pub use reference::Entity as ReferenceEntity;
pub use student::Entity as StudentEntity;
pub use user::Entity as UserEntity;

pub use lecturer::Model as Lecturer;
pub use reference::Model as Reference;
pub use student::Model as Student;
pub use user::Model as User;
