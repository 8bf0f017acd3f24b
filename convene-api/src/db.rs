//! PostgreSQL persistence.
//!
//! `DbClient` implements `Store` over a deadpool connection pool. Every
//! statement filters on both the row id and the owner.

use std::time::Duration;

use async_trait::async_trait;
use convene_core::{
    Agent, AgentDetail, AgentSummary, EntityId, EntityType, Meeting, MeetingDetail, PageWindow,
    StorageError, StorageResult, Timestamp,
};
use convene_storage::{AgentFilter, AgentUpdate, MeetingFilter, MeetingUpdate, Store};
use deadpool_postgres::{
    Config, ManagerConfig, Object, Pool, PoolConfig, RecyclingMethod, Runtime, Timeouts,
};
use tokio_postgres::{NoTls, Row};

use crate::error::{ApiError, ApiResult};

const SCHEMA: &str = include_str!("../migrations/0001_init.sql");

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Database connection configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// Wait/create/recycle timeout for pooled connections
    pub timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "convene".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: 16,
            timeout: Duration::from_secs(30),
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("CONVENE_DB_HOST").unwrap_or(defaults.host),
            port: std::env::var("CONVENE_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            dbname: std::env::var("CONVENE_DB_NAME").unwrap_or(defaults.dbname),
            user: std::env::var("CONVENE_DB_USER").unwrap_or(defaults.user),
            password: std::env::var("CONVENE_DB_PASSWORD").unwrap_or_default(),
            max_size: std::env::var("CONVENE_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_size),
            timeout: std::env::var("CONVENE_DB_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }

    /// Create a connection pool from this configuration.
    pub fn create_pool(&self) -> ApiResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut pool_cfg = PoolConfig::new(self.max_size);
        pool_cfg.timeouts = Timeouts {
            wait: Some(self.timeout),
            create: Some(self.timeout),
            recycle: Some(self.timeout),
        };
        cfg.pool = Some(pool_cfg);

        cfg.create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ApiError::internal_error(format!("Failed to create pool: {}", e)))
    }
}

// ============================================================================
// HELPERS
// ============================================================================

/// Escape `%`, `_` and `\` so search text matches literally under ILIKE.
pub fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn like_pattern(search: Option<&str>) -> Option<String> {
    search.map(|s| format!("%{}%", escape_like(s)))
}

fn query_failed(entity_type: EntityType) -> impl Fn(tokio_postgres::Error) -> StorageError {
    move |e| StorageError::QueryFailed {
        entity_type,
        reason: e.to_string(),
    }
}

fn insert_failed(entity_type: EntityType) -> impl Fn(tokio_postgres::Error) -> StorageError {
    move |e| StorageError::InsertFailed {
        entity_type,
        reason: e.to_string(),
    }
}

fn agent_from_row(row: &Row) -> Result<Agent, tokio_postgres::Error> {
    Ok(Agent {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        instructions: row.try_get("instructions")?,
        user_id: row.try_get("user_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn agent_detail_from_row(row: &Row) -> Result<AgentDetail, tokio_postgres::Error> {
    Ok(AgentDetail {
        agent: agent_from_row(row)?,
        meeting_count: row.try_get("meeting_count")?,
    })
}

fn meeting_from_row(row: &Row) -> Result<Meeting, tokio_postgres::Error> {
    Ok(Meeting {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        user_id: row.try_get("user_id")?,
        agent_id: row.try_get("agent_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn meeting_detail_from_row(row: &Row) -> Result<MeetingDetail, tokio_postgres::Error> {
    let meeting = meeting_from_row(row)?;
    let agent = AgentSummary {
        id: meeting.agent_id,
        name: row.try_get("agent_name")?,
    };
    Ok(MeetingDetail { meeting, agent })
}

const AGENT_COLUMNS: &str = "id, name, instructions, user_id, created_at, updated_at";
const MEETING_COLUMNS: &str = "id, name, user_id, agent_id, created_at, updated_at";

const AGENT_DETAIL_SELECT: &str = "SELECT a.id, a.name, a.instructions, a.user_id, \
     a.created_at, a.updated_at, \
     (SELECT COUNT(*) FROM meetings m WHERE m.agent_id = a.id AND m.user_id = a.user_id) \
     AS meeting_count \
     FROM agents a";

const MEETING_DETAIL_SELECT: &str = "SELECT m.id, m.name, m.user_id, m.agent_id, \
     m.created_at, m.updated_at, a.name AS agent_name \
     FROM meetings m JOIN agents a ON a.id = m.agent_id";

// ============================================================================
// DATABASE CLIENT
// ============================================================================

/// Store backed by PostgreSQL.
#[derive(Clone)]
pub struct DbClient {
    pool: Pool,
}

impl DbClient {
    /// Create a new database client with the given pool.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create a new database client from configuration.
    pub fn from_config(config: &DbConfig) -> ApiResult<Self> {
        Ok(Self::new(config.create_pool()?))
    }

    /// Get the current pool size for observability.
    pub fn pool_size(&self) -> usize {
        self.pool.status().size
    }

    async fn get_conn(&self) -> StorageResult<Object> {
        self.pool.get().await.map_err(|e| StorageError::Unavailable {
            reason: e.to_string(),
        })
    }

    /// Create tables and indexes when missing.
    pub async fn migrate(&self) -> ApiResult<()> {
        let conn = self.pool.get().await?;
        conn.batch_execute(SCHEMA).await?;
        tracing::info!("Schema migration applied");
        Ok(())
    }
}

#[async_trait]
impl Store for DbClient {
    async fn health_check(&self) -> StorageResult<()> {
        let conn = self.get_conn().await?;
        conn.query_one("SELECT 1", &[])
            .await
            .map_err(|e| StorageError::Unavailable {
                reason: e.to_string(),
            })?;
        Ok(())
    }

    // ========================================================================
    // AGENTS
    // ========================================================================

    async fn agent_insert(&self, agent: &Agent) -> StorageResult<Agent> {
        let conn = self.get_conn().await?;
        let sql = format!(
            "INSERT INTO agents ({cols}) VALUES ($1, $2, $3, $4, $5, $6) RETURNING {cols}",
            cols = AGENT_COLUMNS
        );
        let row = conn
            .query_one(
                sql.as_str(),
                &[
                    &agent.id,
                    &agent.name,
                    &agent.instructions,
                    &agent.user_id,
                    &agent.created_at,
                    &agent.updated_at,
                ],
            )
            .await
            .map_err(insert_failed(EntityType::Agent))?;
        agent_from_row(&row).map_err(insert_failed(EntityType::Agent))
    }

    async fn agent_get(&self, id: EntityId, user_id: &str) -> StorageResult<Option<AgentDetail>> {
        let conn = self.get_conn().await?;
        let sql = format!("{} WHERE a.id = $1 AND a.user_id = $2", AGENT_DETAIL_SELECT);
        let row = conn
            .query_opt(sql.as_str(), &[&id, &user_id])
            .await
            .map_err(query_failed(EntityType::Agent))?;
        row.as_ref()
            .map(agent_detail_from_row)
            .transpose()
            .map_err(query_failed(EntityType::Agent))
    }

    async fn agent_list(
        &self,
        filter: &AgentFilter,
        window: PageWindow,
    ) -> StorageResult<Vec<AgentDetail>> {
        let conn = self.get_conn().await?;
        let sql = format!(
            "{} WHERE a.user_id = $1 AND ($2::text IS NULL OR a.name ILIKE $2 ESCAPE '\\') \
             ORDER BY a.created_at DESC, a.id DESC LIMIT $3 OFFSET $4",
            AGENT_DETAIL_SELECT
        );
        let pattern = like_pattern(filter.search.as_deref());
        let rows = conn
            .query(
                sql.as_str(),
                &[&filter.user_id, &pattern, &window.limit, &window.offset],
            )
            .await
            .map_err(query_failed(EntityType::Agent))?;
        rows.iter()
            .map(agent_detail_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(query_failed(EntityType::Agent))
    }

    async fn agent_count(&self, filter: &AgentFilter) -> StorageResult<i64> {
        let conn = self.get_conn().await?;
        let pattern = like_pattern(filter.search.as_deref());
        let row = conn
            .query_one(
                "SELECT COUNT(*) FROM agents \
                 WHERE user_id = $1 AND ($2::text IS NULL OR name ILIKE $2 ESCAPE '\\')",
                &[&filter.user_id, &pattern],
            )
            .await
            .map_err(query_failed(EntityType::Agent))?;
        row.try_get(0).map_err(query_failed(EntityType::Agent))
    }

    async fn agent_update(
        &self,
        id: EntityId,
        user_id: &str,
        update: &AgentUpdate,
        updated_at: Timestamp,
    ) -> StorageResult<Option<Agent>> {
        let conn = self.get_conn().await?;
        let sql = format!(
            "UPDATE agents SET name = COALESCE($3, name), \
             instructions = COALESCE($4, instructions), updated_at = $5 \
             WHERE id = $1 AND user_id = $2 RETURNING {}",
            AGENT_COLUMNS
        );
        let row = conn
            .query_opt(
                sql.as_str(),
                &[&id, &user_id, &update.name, &update.instructions, &updated_at],
            )
            .await
            .map_err(query_failed(EntityType::Agent))?;
        row.as_ref()
            .map(agent_from_row)
            .transpose()
            .map_err(query_failed(EntityType::Agent))
    }

    async fn agent_delete(&self, id: EntityId, user_id: &str) -> StorageResult<Option<Agent>> {
        let conn = self.get_conn().await?;
        let sql = format!(
            "DELETE FROM agents WHERE id = $1 AND user_id = $2 RETURNING {}",
            AGENT_COLUMNS
        );
        let row = conn
            .query_opt(sql.as_str(), &[&id, &user_id])
            .await
            .map_err(query_failed(EntityType::Agent))?;
        row.as_ref()
            .map(agent_from_row)
            .transpose()
            .map_err(query_failed(EntityType::Agent))
    }

    // ========================================================================
    // MEETINGS
    // ========================================================================

    async fn meeting_insert(&self, meeting: &Meeting) -> StorageResult<Meeting> {
        let conn = self.get_conn().await?;
        let sql = format!(
            "INSERT INTO meetings ({cols}) VALUES ($1, $2, $3, $4, $5, $6) RETURNING {cols}",
            cols = MEETING_COLUMNS
        );
        let row = conn
            .query_one(
                sql.as_str(),
                &[
                    &meeting.id,
                    &meeting.name,
                    &meeting.user_id,
                    &meeting.agent_id,
                    &meeting.created_at,
                    &meeting.updated_at,
                ],
            )
            .await
            .map_err(insert_failed(EntityType::Meeting))?;
        meeting_from_row(&row).map_err(insert_failed(EntityType::Meeting))
    }

    async fn meeting_get(
        &self,
        id: EntityId,
        user_id: &str,
    ) -> StorageResult<Option<MeetingDetail>> {
        let conn = self.get_conn().await?;
        let sql = format!("{} WHERE m.id = $1 AND m.user_id = $2", MEETING_DETAIL_SELECT);
        let row = conn
            .query_opt(sql.as_str(), &[&id, &user_id])
            .await
            .map_err(query_failed(EntityType::Meeting))?;
        row.as_ref()
            .map(meeting_detail_from_row)
            .transpose()
            .map_err(query_failed(EntityType::Meeting))
    }

    async fn meeting_list(
        &self,
        filter: &MeetingFilter,
        window: PageWindow,
    ) -> StorageResult<Vec<MeetingDetail>> {
        let conn = self.get_conn().await?;
        let sql = format!(
            "{} WHERE m.user_id = $1 AND ($2::text IS NULL OR m.name ILIKE $2 ESCAPE '\\') \
             AND ($3::uuid IS NULL OR m.agent_id = $3) \
             ORDER BY m.created_at DESC, m.id DESC LIMIT $4 OFFSET $5",
            MEETING_DETAIL_SELECT
        );
        let pattern = like_pattern(filter.search.as_deref());
        let rows = conn
            .query(
                sql.as_str(),
                &[
                    &filter.user_id,
                    &pattern,
                    &filter.agent_id,
                    &window.limit,
                    &window.offset,
                ],
            )
            .await
            .map_err(query_failed(EntityType::Meeting))?;
        rows.iter()
            .map(meeting_detail_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(query_failed(EntityType::Meeting))
    }

    async fn meeting_count(&self, filter: &MeetingFilter) -> StorageResult<i64> {
        let conn = self.get_conn().await?;
        let pattern = like_pattern(filter.search.as_deref());
        let row = conn
            .query_one(
                "SELECT COUNT(*) FROM meetings \
                 WHERE user_id = $1 AND ($2::text IS NULL OR name ILIKE $2 ESCAPE '\\') \
                 AND ($3::uuid IS NULL OR agent_id = $3)",
                &[&filter.user_id, &pattern, &filter.agent_id],
            )
            .await
            .map_err(query_failed(EntityType::Meeting))?;
        row.try_get(0).map_err(query_failed(EntityType::Meeting))
    }

    async fn meeting_update(
        &self,
        id: EntityId,
        user_id: &str,
        update: &MeetingUpdate,
        updated_at: Timestamp,
    ) -> StorageResult<Option<Meeting>> {
        let conn = self.get_conn().await?;
        let sql = format!(
            "UPDATE meetings SET name = COALESCE($3, name), \
             agent_id = COALESCE($4, agent_id), updated_at = $5 \
             WHERE id = $1 AND user_id = $2 RETURNING {}",
            MEETING_COLUMNS
        );
        let row = conn
            .query_opt(
                sql.as_str(),
                &[&id, &user_id, &update.name, &update.agent_id, &updated_at],
            )
            .await
            .map_err(query_failed(EntityType::Meeting))?;
        row.as_ref()
            .map(meeting_from_row)
            .transpose()
            .map_err(query_failed(EntityType::Meeting))
    }

    async fn meeting_delete(&self, id: EntityId, user_id: &str) -> StorageResult<Option<Meeting>> {
        let conn = self.get_conn().await?;
        let sql = format!(
            "DELETE FROM meetings WHERE id = $1 AND user_id = $2 RETURNING {}",
            MEETING_COLUMNS
        );
        let row = conn
            .query_opt(sql.as_str(), &[&id, &user_id])
            .await
            .map_err(query_failed(EntityType::Meeting))?;
        row.as_ref()
            .map(meeting_from_row)
            .transpose()
            .map_err(query_failed(EntityType::Meeting))
    }
}
