use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use thiserror::Error;
use crate::core::store::{MatchStore, ProfileStore, StoreError};
use crate::models::{MatchRecord, MatchStatus, PairKey, Preferences, UserProfile};

/// Errors that can occur when interacting with PostgreSQL
#[derive(Debug, Error)]
pub enum PostgresError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),
}

impl From<PostgresError> for StoreError {
    fn from(value: PostgresError) -> Self {
        StoreError::Backend(value.to_string())
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(value: sqlx::Error) -> Self {
        PostgresError::from(value).into()
    }
}

/// Match status as stored in the `match_status` enum type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "match_status", rename_all = "lowercase")]
pub enum DbMatchStatus {
    Pending,
    Liked,
    Matched,
    Rejected,
}

impl From<MatchStatus> for DbMatchStatus {
    fn from(value: MatchStatus) -> Self {
        match value {
            MatchStatus::Pending => DbMatchStatus::Pending,
            MatchStatus::Liked => DbMatchStatus::Liked,
            MatchStatus::Matched => DbMatchStatus::Matched,
            MatchStatus::Rejected => DbMatchStatus::Rejected,
        }
    }
}

impl From<DbMatchStatus> for MatchStatus {
    fn from(value: DbMatchStatus) -> Self {
        match value {
            DbMatchStatus::Pending => MatchStatus::Pending,
            DbMatchStatus::Liked => MatchStatus::Liked,
            DbMatchStatus::Matched => MatchStatus::Matched,
            DbMatchStatus::Rejected => MatchStatus::Rejected,
        }
    }
}

const MATCH_COLUMNS: &str = r#"
    id, user_a_id, user_b_id, user_a_liked, user_b_liked, initiated_by, rejected_by,
    compatibility_score, status, matched_at, created_at, updated_at, version
"#;

/// PostgreSQL-backed profile and match store
///
/// Profiles live in `users` (written by the user-management subsystem);
/// match records live in `matches` with one row per canonical pair.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect and run pending migrations
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, PostgresError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a store from settings, applying defaults for missing values
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, PostgresError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert(&self, record: &MatchRecord) -> Result<Option<PgRow>, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO matches (
                id, user_a_id, user_b_id, user_a_liked, user_b_liked, initiated_by, rejected_by,
                compatibility_score, status, matched_at, created_at, updated_at, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, 1)
            ON CONFLICT (user_a_id, user_b_id) DO NOTHING
            RETURNING {}
            "#,
            MATCH_COLUMNS
        );

        sqlx::query(&query)
            .bind(record.id)
            .bind(&record.user_a_id)
            .bind(&record.user_b_id)
            .bind(record.user_a_liked)
            .bind(record.user_b_liked)
            .bind(&record.initiated_by)
            .bind(&record.rejected_by)
            .bind(record.compatibility_score)
            .bind(DbMatchStatus::from(record.status))
            .bind(record.matched_at)
            .bind(record.created_at)
            .bind(record.updated_at)
            .fetch_optional(&self.pool)
            .await
    }

    async fn update(&self, record: &MatchRecord) -> Result<Option<PgRow>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE matches SET
                user_a_liked = $2,
                user_b_liked = $3,
                rejected_by = $4,
                status = $5,
                matched_at = $6,
                updated_at = $7,
                version = version + 1
            WHERE id = $1 AND version = $8
            RETURNING {}
            "#,
            MATCH_COLUMNS
        );

        sqlx::query(&query)
            .bind(record.id)
            .bind(record.user_a_liked)
            .bind(record.user_b_liked)
            .bind(&record.rejected_by)
            .bind(DbMatchStatus::from(record.status))
            .bind(record.matched_at)
            .bind(record.updated_at)
            .bind(record.version)
            .fetch_optional(&self.pool)
            .await
    }

    /// Health check for the database connection
    pub async fn ping(&self) -> Result<bool, PostgresError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}

fn profile_from_row(row: &PgRow) -> UserProfile {
    let preferences: Option<serde_json::Value> = row.get("preferences");
    UserProfile {
        user_id: row.get("id"),
        name: row.get("name"),
        is_active: row.get("is_active"),
        preferences: preferences.as_ref().map(Preferences::from_value).unwrap_or_default(),
        created_at: row.get("created_at"),
    }
}

fn record_from_row(row: &PgRow) -> MatchRecord {
    let status: DbMatchStatus = row.get("status");
    MatchRecord {
        id: row.get("id"),
        user_a_id: row.get("user_a_id"),
        user_b_id: row.get("user_b_id"),
        user_a_liked: row.get("user_a_liked"),
        user_b_liked: row.get("user_b_liked"),
        initiated_by: row.get("initiated_by"),
        rejected_by: row.get("rejected_by"),
        compatibility_score: row.get("compatibility_score"),
        status: status.into(),
        matched_at: row.get("matched_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        version: row.get("version"),
    }
}

#[async_trait]
impl ProfileStore for PostgresStore {
    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        let query = r#"
            SELECT id, name, is_active, preferences, created_at
            FROM users
            WHERE id = $1
        "#;

        let row = sqlx::query(query).bind(user_id).fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(profile_from_row))
    }

    async fn get_profiles(&self, user_ids: &[String]) -> Result<Vec<UserProfile>, StoreError> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = r#"
            SELECT id, name, is_active, preferences, created_at
            FROM users
            WHERE id = ANY($1)
        "#;

        let rows = sqlx::query(query).bind(user_ids).fetch_all(&self.pool).await?;
        let mut by_id: HashMap<String, UserProfile> = rows
            .iter()
            .map(profile_from_row)
            .map(|p| (p.user_id.clone(), p))
            .collect();

        Ok(user_ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }
}

#[async_trait]
impl MatchStore for PostgresStore {
    async fn find_record(&self, user_a: &str, user_b: &str) -> Result<Option<MatchRecord>, StoreError> {
        let query = format!(
            r#"
            SELECT {}
            FROM matches
            WHERE user_a_id = $1 AND user_b_id = $2
            "#,
            MATCH_COLUMNS
        );

        // Canonical order is byte order, same as the COLLATE "C" columns
        let pair = PairKey::new(user_a, user_b);
        let row = sqlx::query(&query)
            .bind(&pair.low)
            .bind(&pair.high)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(record_from_row))
    }

    async fn save(&self, record: MatchRecord) -> Result<MatchRecord, StoreError> {
        let row = if record.version == 0 {
            self.insert(&record).await?
        } else {
            self.update(&record).await?
        };

        match row {
            Some(row) => {
                let saved = record_from_row(&row);
                tracing::debug!("Saved match record {} ({}) v{}", saved.id, saved.status, saved.version);
                Ok(saved)
            }
            None => Err(StoreError::Conflict(record.pair().to_string())),
        }
    }

    async fn find_candidate_users(
        &self,
        excluding_user_id: &str,
        excluding_paired_with: &HashSet<String>,
    ) -> Result<Vec<String>, StoreError> {
        let query = r#"
            SELECT u.id
            FROM users u
            WHERE u.is_active = TRUE
              AND u.id <> $1
              AND NOT (u.id = ANY($2))
              AND NOT EXISTS (
                  SELECT 1 FROM matches m
                  WHERE (m.user_a_id = $1 AND m.user_b_id = u.id)
                     OR (m.user_b_id = $1 AND m.user_a_id = u.id)
              )
            ORDER BY u.created_at DESC
        "#;

        let excluded: Vec<String> = excluding_paired_with.iter().cloned().collect();
        let rows = sqlx::query(query)
            .bind(excluding_user_id)
            .bind(&excluded)
            .fetch_all(&self.pool)
            .await?;

        let ids: Vec<String> = rows.iter().map(|row| row.get("id")).collect();
        tracing::debug!("Found {} candidate users for {}", ids.len(), excluding_user_id);
        Ok(ids)
    }

    async fn find_by_user(&self, user_id: &str) -> Result<Vec<MatchRecord>, StoreError> {
        let query = format!(
            r#"
            SELECT {}
            FROM matches
            WHERE user_a_id = $1 OR user_b_id = $1
            ORDER BY created_at DESC
            "#,
            MATCH_COLUMNS
        );

        let rows = sqlx::query(&query).bind(user_id).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(record_from_row).collect())
    }

    async fn find_by_user_and_status(
        &self,
        user_id: &str,
        status: MatchStatus,
    ) -> Result<Vec<MatchRecord>, StoreError> {
        let query = format!(
            r#"
            SELECT {}
            FROM matches
            WHERE (user_a_id = $1 OR user_b_id = $1) AND status = $2
            ORDER BY created_at DESC
            "#,
            MATCH_COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(user_id)
            .bind(DbMatchStatus::from(status))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(record_from_row).collect())
    }

    async fn health_check(&self) -> bool {
        match self.ping().await {
            Ok(healthy) => healthy,
            Err(e) => {
                tracing::error!("PostgreSQL health check failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_conversion() {
        for status in [MatchStatus::Pending, MatchStatus::Liked, MatchStatus::Matched, MatchStatus::Rejected] {
            assert_eq!(MatchStatus::from(DbMatchStatus::from(status)), status);
        }
    }

    #[test]
    fn test_postgres_error_maps_to_backend() {
        let err: StoreError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, StoreError::Backend(_)));
    }

    async fn connect() -> PostgresStore {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL not set");
        PostgresStore::from_settings(&url, Some(2), Some(1), None, None)
            .await
            .expect("Failed to connect")
    }

    async fn insert_users(store: &PostgresStore, ids: &[&str]) {
        for id in ids {
            sqlx::query("INSERT INTO users (id, name) VALUES ($1, $1)")
                .bind(id)
                .execute(&store.pool)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    #[ignore = "Requires PostgreSQL (DATABASE_URL)"]
    async fn test_save_is_versioned() {
        let store = connect().await;

        let run = uuid::Uuid::new_v4().simple().to_string();
        let (a, b) = (format!("a-{}", run), format!("b-{}", run));
        insert_users(&store, &[&a, &b]).await;

        let now = chrono::Utc::now();
        let first = store.save(MatchRecord::liked(&b, &a, 60.0, now)).await.unwrap();
        assert_eq!(first.version, 1);
        assert!(matches!(
            store.save(MatchRecord::liked(&a, &b, 60.0, now)).await,
            Err(StoreError::Conflict(_))
        ));

        let mut stale = first.clone();
        let mut current = store.find_record(&a, &b).await.unwrap().unwrap();
        assert!(current.apply_like(&a, now));
        let matched = store.save(current).await.unwrap();
        assert_eq!(matched.status, MatchStatus::Matched);
        assert_eq!(matched.version, 2);

        assert!(stale.apply_pass(&a, now));
        assert!(matches!(store.save(stale).await, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    #[ignore = "Requires PostgreSQL (DATABASE_URL)"]
    async fn test_mixed_case_ids_use_byte_order() {
        use crate::core::{CompatibilityScorer, CoordinatorOptions, MatchCoordinator};
        use std::sync::Arc;

        let store = Arc::new(connect().await);
        let run = uuid::Uuid::new_v4().simple().to_string();
        // Uppercase sorts before lowercase bytewise but after it under most locales
        let (lower, upper) = (format!("alice-{}", run), format!("Bob-{}", run));
        insert_users(&store, &[&lower, &upper]).await;

        let coordinator = MatchCoordinator::new(
            store.clone(),
            store.clone(),
            CompatibilityScorer::default(),
            CoordinatorOptions::default(),
        );

        let liked = coordinator.like(&lower, &upper).await.unwrap();
        assert_eq!(liked.user_a_id, upper);
        assert_eq!(liked.user_b_id, lower);

        let found = store.find_record(&lower, &upper).await.unwrap().unwrap();
        assert_eq!(found.id, liked.id);

        let matched = coordinator.like(&upper, &lower).await.unwrap();
        assert_eq!(matched.status, MatchStatus::Matched);
    }

    #[tokio::test]
    #[ignore = "Requires PostgreSQL (DATABASE_URL)"]
    async fn test_schema_script_is_rerunnable() {
        let store = connect().await;
        let script = include_str!("../../migrations/20250101000000_create_roommate_matching.sql");

        sqlx::raw_sql(script).execute(&store.pool).await.unwrap();
        assert!(store.ping().await.unwrap());
    }
}
