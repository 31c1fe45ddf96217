//! Role-scoped listing with search, sort and pagination

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::store::{ListQuery, ReferenceListItem, ReferenceStore, RoleScope, SortColumn};
use meritrack_common::{AppError, Result};

/// Caller-supplied listing parameters, pre-validation
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListParams {
    pub page: u64,
    pub limit: u64,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub search: Option<String>,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            sort_by: None,
            order: None,
            search: None,
        }
    }
}

/// One page of results plus pagination metadata
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
}

/// Validated listing over the reference store
pub struct QueryEngine {
    refs: Arc<dyn ReferenceStore>,
}

impl QueryEngine {
    pub fn new(refs: Arc<dyn ReferenceStore>) -> Self {
        Self { refs }
    }

    /// List achievements visible under `scope`.
    ///
    /// Sort names outside the allow-list fall back to creation time;
    /// order is descending unless "asc" is requested explicitly.
    pub async fn list(
        &self,
        scope: RoleScope,
        params: &ListParams,
    ) -> Result<Page<ReferenceListItem>> {
        if params.limit == 0 {
            return Err(AppError::Validation {
                message: "limit must be at least 1".into(),
                field: Some("limit".into()),
            });
        }
        if params.page == 0 {
            return Err(AppError::Validation {
                message: "page numbering starts at 1".into(),
                field: Some("page".into()),
            });
        }

        // Caller-supplied numbers; the offset must not wrap
        let offset = (params.page - 1)
            .checked_mul(params.limit)
            .ok_or_else(|| AppError::Validation {
                message: "page and limit combine out of range".into(),
                field: Some("page".into()),
            })?;

        let ascending = params
            .order
            .as_deref()
            .is_some_and(|o| o.eq_ignore_ascii_case("asc"));

        let query = ListQuery {
            scope,
            search: params.search.clone().filter(|s| !s.trim().is_empty()),
            sort: SortColumn::parse(params.sort_by.as_deref()),
            ascending,
            limit: params.limit,
            offset,
        };

        let (items, total) = self.refs.list(&query).await?;

        Ok(Page {
            items,
            page: params.page,
            limit: params.limit,
            total,
            total_pages: total_pages(total, params.limit),
        })
    }
}

/// Ceiling division; an empty result set has zero pages
fn total_pages(total: u64, limit: u64) -> u64 {
    if total == 0 {
        0
    } else {
        (total + limit - 1) / limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages_rounds_up() {
        assert_eq!(total_pages(23, 10), 3);
        assert_eq!(total_pages(20, 10), 2);
        assert_eq!(total_pages(1, 10), 1);
        assert_eq!(total_pages(0, 10), 0);
    }

    #[test]
    fn test_default_params() {
        let params = ListParams::default();
        assert_eq!(params.page, 1);
        assert_eq!(params.limit, 10);
        assert!(params.sort_by.is_none());
    }
}

#[cfg(test)]
mod list_tests {
    use super::*;
    use crate::store::NewReference;
    use crate::testutil::MemoryReferenceStore;
    use uuid::Uuid;

    async fn seed(refs: &MemoryReferenceStore, student: Uuid, titles: &[&str]) {
        for title in titles {
            refs.insert(NewReference {
                student_id: student,
                content_id: "0".repeat(24),
                title: title.to_string(),
            })
            .await
            .unwrap();
        }
    }

    fn engine(refs: Arc<MemoryReferenceStore>) -> QueryEngine {
        QueryEngine::new(refs)
    }

    #[tokio::test]
    async fn test_pagination_metadata() {
        let refs = Arc::new(MemoryReferenceStore::default());
        let student = Uuid::new_v4();
        refs.add_student(student, "Ani Lestari", "2110551001", "Informatics", None);
        let titles: Vec<String> = (0..23).map(|i| format!("Achievement {i:02}")).collect();
        seed(&refs, student, &titles.iter().map(String::as_str).collect::<Vec<_>>()).await;

        let engine = engine(refs);
        let first = engine
            .list(RoleScope::unrestricted(), &ListParams::default())
            .await
            .unwrap();
        assert_eq!(first.items.len(), 10);
        assert_eq!(first.total, 23);
        assert_eq!(first.total_pages, 3);

        let last = engine
            .list(
                RoleScope::unrestricted(),
                &ListParams {
                    page: 3,
                    ..ListParams::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(last.items.len(), 3);
        assert_eq!(last.total, 23);
    }

    #[tokio::test]
    async fn test_zero_limit_and_zero_page_are_invalid() {
        let engine = engine(Arc::new(MemoryReferenceStore::default()));

        let err = engine
            .list(
                RoleScope::unrestricted(),
                &ListParams {
                    limit: 0,
                    ..ListParams::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        let err = engine
            .list(
                RoleScope::unrestricted(),
                &ListParams {
                    page: 0,
                    ..ListParams::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_overflowing_page_is_invalid() {
        let engine = engine(Arc::new(MemoryReferenceStore::default()));

        let err = engine
            .list(
                RoleScope::unrestricted(),
                &ListParams {
                    page: u64::MAX,
                    ..ListParams::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_empty_result_has_zero_pages() {
        let engine = engine(Arc::new(MemoryReferenceStore::default()));
        let page = engine
            .list(RoleScope::unrestricted(), &ListParams::default())
            .await
            .unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total, 0);
        assert_eq!(page.total_pages, 0);
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let refs = Arc::new(MemoryReferenceStore::default());
        let student = Uuid::new_v4();
        refs.add_student(student, "Ani Lestari", "2110551001", "Informatics", None);
        seed(&refs, student, &["Robotics Olympiad", "Essay Contest"]).await;

        let engine = engine(refs);
        let page = engine
            .list(
                RoleScope::unrestricted(),
                &ListParams {
                    search: Some("OLYMP".into()),
                    ..ListParams::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].title, "Robotics Olympiad");
    }

    #[tokio::test]
    async fn test_role_scopes_partition_visibility() {
        let refs = Arc::new(MemoryReferenceStore::default());
        let advisor = Uuid::new_v4();
        let advisee = Uuid::new_v4();
        let other = Uuid::new_v4();
        refs.add_student(advisee, "Ani Lestari", "2110551001", "Informatics", Some(advisor));
        refs.add_student(other, "Budi Santoso", "2110551002", "Mathematics", None);
        seed(&refs, advisee, &["Robotics Olympiad"]).await;
        seed(&refs, other, &["Essay Contest"]).await;

        let engine = engine(refs);
        let params = ListParams::default();

        let own = engine
            .list(RoleScope::for_student(advisee), &params)
            .await
            .unwrap();
        assert_eq!(own.total, 1);
        assert_eq!(own.items[0].student_id, advisee);

        let advised = engine
            .list(RoleScope::for_advisor(advisor), &params)
            .await
            .unwrap();
        assert_eq!(advised.total, 1);
        assert_eq!(advised.items[0].student_id, advisee);

        let all = engine
            .list(RoleScope::unrestricted(), &params)
            .await
            .unwrap();
        assert_eq!(all.total, 2);
    }

    #[tokio::test]
    async fn test_explicit_ascending_title_sort() {
        let refs = Arc::new(MemoryReferenceStore::default());
        let student = Uuid::new_v4();
        refs.add_student(student, "Ani Lestari", "2110551001", "Informatics", None);
        seed(&refs, student, &["Zeta Hackathon", "Alpha Seminar", "Mid Contest"]).await;

        let engine = engine(refs);
        let page = engine
            .list(
                RoleScope::unrestricted(),
                &ListParams {
                    sort_by: Some("title".into()),
                    order: Some("ASC".into()),
                    ..ListParams::default()
                },
            )
            .await
            .unwrap();

        let titles: Vec<_> = page.items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, ["Alpha Seminar", "Mid Contest", "Zeta Hackathon"]);
    }
}
