//! Meritrack achievement coordination
//!
//! Student achievements live in two stores: a relational reference
//! row (ownership, title, workflow status) and a document holding the
//! open-ended content (typed details, attachments, points). This
//! crate keeps the two consistent:
//!
//! - [`saga::CreationSaga`] creates both halves, compensating on failure
//! - [`workflow::StatusCoordinator`] drives the status lifecycle
//! - [`query::QueryEngine`] lists references under role scopes
//! - [`records::AchievementRecords`] joins both halves for reads
//! - [`stats::StatisticsAggregator`] composes reports across stores

pub mod model;
pub mod query;
pub mod records;
pub mod saga;
pub mod stats;
pub mod store;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testutil;

pub use model::{AchievementDoc, AchievementStatus};
pub use query::{ListParams, Page, QueryEngine};
pub use records::{AchievementRecord, AchievementRecords};
pub use saga::{CreatedAchievement, CreationSaga};
pub use stats::{StatisticsAggregator, StatsReport, TopStudent};
pub use store::{MongoContentStore, PgReferenceStore, RoleScope};
pub use workflow::{StatusCoordinator, TransitionOutcome};
