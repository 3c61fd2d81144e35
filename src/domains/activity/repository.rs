use crate::domains::activity::types::{ActivityListQuery, RawActivityRecord};
use crate::errors::{DbError, DomainError, DomainResult};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{query, query_as, query_scalar, SqlitePool};

const RECORD_COLUMNS: &str =
    "activity_id, description, type, planned_start_date, planned_end_date, progress";

/// Trait defining activity repository operations
#[async_trait]
pub trait ActivityRepository: Send + Sync {
    /// Activities of one project, filtered and ordered as the query asks
    async fn find_for_project(&self, list_query: &ActivityListQuery) -> DomainResult<Vec<RawActivityRecord>>;

    async fn find_by_id(&self, activity_id: &str) -> DomainResult<RawActivityRecord>;

    async fn count_for_project(&self, project_id: &str) -> DomainResult<i64>;

    /// Insert or replace downloaded activities in a single transaction
    async fn save_records(&self, project_id: &str, records: &[RawActivityRecord]) -> DomainResult<u64>;
}

/// SQLite implementation for ActivityRepository
#[derive(Debug, Clone)]
pub struct SqliteActivityRepository {
    pool: SqlitePool,
}

impl SqliteActivityRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActivityRepository for SqliteActivityRepository {
    async fn find_for_project(&self, list_query: &ActivityListQuery) -> DomainResult<Vec<RawActivityRecord>> {
        let pattern = list_query.search_pattern();

        let mut sql = format!(
            "SELECT {} FROM activities WHERE project_id = ? AND deleted_at IS NULL",
            RECORD_COLUMNS
        );
        if pattern.is_some() {
            sql.push_str(" AND (description LIKE ? OR type LIKE ?)");
        }
        // The sort column comes from a closed enum, never from caller text
        sql.push_str(" ORDER BY ");
        sql.push_str(&list_query.order_by_clause());

        log::debug!(
            "Loading activities for project {} (sort: {}, filter: {:?})",
            list_query.project_id,
            list_query.sort.as_str(),
            pattern
        );

        let mut q = query_as::<_, RawActivityRecord>(&sql).bind(&list_query.project_id);
        if let Some(pattern) = &pattern {
            q = q.bind(pattern).bind(pattern);
        }

        let records = q.fetch_all(&self.pool).await.map_err(DbError::from)?;
        log::debug!("Loaded {} activities for project {}", records.len(), list_query.project_id);
        Ok(records)
    }

    async fn find_by_id(&self, activity_id: &str) -> DomainResult<RawActivityRecord> {
        let sql = format!(
            "SELECT {} FROM activities WHERE activity_id = ? AND deleted_at IS NULL",
            RECORD_COLUMNS
        );
        query_as::<_, RawActivityRecord>(&sql)
            .bind(activity_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)?
            .ok_or_else(|| DomainError::EntityNotFound("Activity".to_string(), activity_id.to_string()))
    }

    async fn count_for_project(&self, project_id: &str) -> DomainResult<i64> {
        let total: i64 = query_scalar(
            "SELECT COUNT(*) FROM activities WHERE project_id = ? AND deleted_at IS NULL",
        )
        .bind(project_id)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(total)
    }

    async fn save_records(&self, project_id: &str, records: &[RawActivityRecord]) -> DomainResult<u64> {
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;
        let now = Utc::now().to_rfc3339();
        let mut saved = 0u64;

        for record in records {
            let result = query(
                r#"
                INSERT INTO activities (
                    activity_id, project_id, description, type,
                    planned_start_date, planned_end_date, progress,
                    created_at, updated_at, deleted_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, NULL)
                ON CONFLICT(activity_id) DO UPDATE SET
                    project_id = excluded.project_id,
                    description = excluded.description,
                    type = excluded.type,
                    planned_start_date = excluded.planned_start_date,
                    planned_end_date = excluded.planned_end_date,
                    progress = excluded.progress,
                    updated_at = excluded.updated_at,
                    deleted_at = NULL
                "#,
            )
            .bind(&record.activity_id)
            .bind(project_id)
            .bind(&record.description)
            .bind(&record.activity_type)
            .bind(&record.planned_start_date)
            .bind(&record.planned_end_date)
            .bind(&record.progress)
            .bind(&now)
            .bind(&now)
            .execute(&mut *tx)
            .await;

            match result {
                Ok(done) => saved += done.rows_affected(),
                Err(e) => {
                    let _ = tx.rollback().await;
                    return Err(DbError::from(e).into());
                }
            }
        }

        tx.commit().await.map_err(DbError::from)?;
        log::info!("Stored {} activities for project {}", saved, project_id);
        Ok(saved)
    }
}
