//! PostgreSQL entity repository
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS entities (
//!     id TEXT PRIMARY KEY,
//!     role TEXT NOT NULL,
//!     created_at TIMESTAMPTZ NOT NULL,
//!     description TEXT NOT NULL
//! );
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};

use crate::config::DatabaseSettings;
use crate::entity::{Entity, Role};
use crate::error::BoxError;
use crate::repository::EntityRepository;

/// Repository backed by a PostgreSQL `entities` table
#[derive(Clone)]
pub struct PgEntityRepository {
    pool: PgPool,
}

impl PgEntityRepository {
    /// Connect and make sure the schema exists
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, BoxError> {
        let url = settings
            .url
            .as_deref()
            .ok_or("database url is not configured")?;
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .connect(url)
            .await?;
        Self::from_pool(pool).await
    }

    /// Use an existing pool
    pub async fn from_pool(pool: PgPool) -> Result<Self, BoxError> {
        let repo = Self { pool };
        repo.init_schema().await?;
        Ok(repo)
    }

    async fn init_schema(&self) -> Result<(), BoxError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS entities (
                id TEXT PRIMARY KEY,
                role TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                description TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn row_to_entity(row: &PgRow) -> Result<Entity, BoxError> {
        let role: String = row.try_get("role")?;
        let role = Role::from_stored(&role).ok_or_else(|| format!("unknown role: {role}"))?;
        let created_at: DateTime<Utc> = row.try_get("created_at")?;

        Ok(Entity {
            id: row.try_get("id")?,
            role,
            created_at,
            description: row.try_get("description")?,
        })
    }
}

#[async_trait]
impl EntityRepository for PgEntityRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Entity>, BoxError> {
        let row = sqlx::query(
            "SELECT id, role, created_at, description FROM entities WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_entity).transpose()
    }

    async fn insert(&self, entity: &Entity) -> Result<(), BoxError> {
        sqlx::query(
            "INSERT INTO entities (id, role, created_at, description) VALUES ($1, $2, $3, $4)",
        )
        .bind(&entity.id)
        .bind(entity.role.as_str())
        .bind(entity.created_at)
        .bind(&entity.description)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_description(&self, id: &str, description: &str) -> Result<(), BoxError> {
        sqlx::query("UPDATE entities SET description = $2 WHERE id = $1")
            .bind(id)
            .bind(description)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
