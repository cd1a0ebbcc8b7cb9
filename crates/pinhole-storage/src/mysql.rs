use async_trait::async_trait;
use jiff::Timestamp;
use pinhole_core::repository::{Repository, Result, UrlMapping};
use pinhole_core::{ShortCode, StorageError};
use sqlx::mysql::{MySqlPoolOptions, MySqlRow};
use sqlx::{MySqlPool, Row};
use std::time::Duration;
use tracing::{debug, info};

const MAX_CONNECTIONS: u32 = 25;
const MIN_CONNECTIONS: u32 = 10;
const MAX_LIFETIME: Duration = Duration::from_secs(5 * 60);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// MySQL implementation of the repository contract.
///
/// Mappings live in the `urls` table. Uniqueness of `short_code` is enforced
/// by a unique key; a violation surfaces as [`StorageError::Duplicate`].
#[derive(Debug, Clone)]
pub struct MySqlRepository {
    pool: MySqlPool,
}

impl MySqlRepository {
    /// Creates a repository from an existing MySQL connection pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Creates a repository by opening a new MySQL connection pool.
    ///
    /// Fails if no connection can be established within five seconds.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .min_connections(MIN_CONNECTIONS)
            .max_lifetime(MAX_LIFETIME)
            .acquire_timeout(CONNECT_TIMEOUT)
            .connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        info!(max_connections = MAX_CONNECTIONS, "connected to mysql");
        Ok(Self::new(pool))
    }

    /// Applies the embedded schema migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StorageError::Operation(format!("migration failed: {e}")))?;
        debug!("mysql schema is up to date");
        Ok(())
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Closes every connection in the pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

fn row_to_mapping(row: MySqlRow) -> Result<UrlMapping> {
    let short_code: String = row.try_get("short_code").map_err(map_sqlx_error)?;
    let long_url: String = row.try_get("long_url").map_err(map_sqlx_error)?;
    let created_at: i64 = row.try_get("created_at").map_err(map_sqlx_error)?;
    let clicks: u64 = row.try_get("clicks").map_err(map_sqlx_error)?;

    let short_code = ShortCode::new(&short_code).map_err(|e| {
        StorageError::InvalidData(format!("invalid short_code '{short_code}': {e}"))
    })?;
    let created_at = Timestamp::from_millisecond(created_at).map_err(|e| {
        StorageError::InvalidData(format!("invalid created_at timestamp '{created_at}': {e}"))
    })?;

    Ok(UrlMapping {
        short_code,
        long_url,
        created_at,
        clicks,
    })
}

#[async_trait]
impl Repository for MySqlRepository {
    async fn save_mapping(&self, code: &ShortCode, long_url: &str) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO urls (short_code, long_url, created_at, clicks)
            VALUES (?, ?, ?, 0)
            "#,
        )
        .bind(code.as_str())
        .bind(long_url)
        .bind(Timestamp::now().as_millisecond())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Err(StorageError::Duplicate(code.to_string())),
            Err(err) => Err(map_sqlx_error(err)),
        }
    }

    async fn find_by_long_url(&self, long_url: &str) -> Result<Option<UrlMapping>> {
        sqlx::query(
            r#"
            SELECT short_code, long_url, created_at, clicks
            FROM urls
            WHERE long_url = ?
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(long_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?
        .map(row_to_mapping)
        .transpose()
    }

    async fn find_by_short_code(&self, code: &ShortCode) -> Result<Option<UrlMapping>> {
        sqlx::query(
            r#"
            SELECT short_code, long_url, created_at, clicks
            FROM urls
            WHERE short_code = ?
            LIMIT 1
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?
        .map(row_to_mapping)
        .transpose()
    }

    async fn increment_clicks(&self, code: &ShortCode) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE urls
            SET clicks = clicks + 1
            WHERE short_code = ?
            "#,
        )
        .bind(code.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(code.to_string()));
        }

        Ok(())
    }
}
