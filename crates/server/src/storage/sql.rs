//! [`SqlStore`]: sqlx-backed session factory for PostgreSQL and SQLite.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Postgres, Sqlite};
use tracing::info;

use super::{NewSecretRecord, SecretRecord, Session, SessionFactory, StorageError};

const PG_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS tbl_passwords (\
     id BIGSERIAL PRIMARY KEY, \
     link TEXT NOT NULL UNIQUE, \
     password TEXT NOT NULL)";

const SQLITE_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS tbl_passwords (\
     id INTEGER PRIMARY KEY AUTOINCREMENT, \
     link TEXT NOT NULL UNIQUE, \
     password TEXT NOT NULL)";

/// Backend engine selected by the configured provider id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// `pg`, `postgres` or `postgresql`.
    Postgres,
    /// `sqlite`.
    Sqlite,
}

impl FromStr for Provider {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pg" | "postgres" | "postgresql" => Ok(Provider::Postgres),
            "sqlite" => Ok(Provider::Sqlite),
            other => Err(StorageError::UnsupportedProvider(other.to_owned())),
        }
    }
}

/// Pool sizing for [`SqlStore::connect`].
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Upper bound on simultaneously open sessions.
    pub max_connections: u32,
    /// How long [`SessionFactory::open`] waits for a free connection.
    pub acquire_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            max_connections: 10,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone)]
enum Pool {
    Postgres(PgPool),
    Sqlite(SqlitePool),
}

/// Session factory over a sqlx connection pool.
///
/// Each [`open`](SessionFactory::open) checks one connection out of the pool;
/// dropping the resulting session checks it back in.
#[derive(Debug, Clone)]
pub struct SqlStore {
    pool: Pool,
}

impl SqlStore {
    /// Connect to the backend named by `provider`.
    ///
    /// # Errors
    ///
    /// [`StorageError::UnsupportedProvider`] for an unknown provider id,
    /// [`StorageError::Unknown`] if the connection string is invalid or the
    /// backend is unreachable.
    pub async fn connect(
        provider: &str,
        url: &str,
        opts: &StoreOptions,
    ) -> Result<Self, StorageError> {
        let provider: Provider = provider.parse()?;
        info!(
            provider = ?provider,
            url = %mask_password(url),
            max_connections = opts.max_connections,
            "connecting to storage"
        );

        let pool = match provider {
            Provider::Postgres => {
                let pool = PgPoolOptions::new()
                    .max_connections(opts.max_connections)
                    .acquire_timeout(opts.acquire_timeout)
                    .connect(url)
                    .await
                    .map_err(unknown)?;
                Pool::Postgres(pool)
            }
            Provider::Sqlite => {
                let connect_opts = SqliteConnectOptions::from_str(url)
                    .map_err(unknown)?
                    .create_if_missing(true);
                let mut pool_opts = SqlitePoolOptions::new()
                    .max_connections(opts.max_connections)
                    .acquire_timeout(opts.acquire_timeout);
                if is_sqlite_memory(url) {
                    // Every in-memory connection is its own database; pin one.
                    pool_opts = pool_opts
                        .max_connections(1)
                        .min_connections(1)
                        .idle_timeout(None)
                        .max_lifetime(None);
                }
                let pool = pool_opts
                    .connect_with(connect_opts)
                    .await
                    .map_err(unknown)?;
                Pool::Sqlite(pool)
            }
        };

        info!("storage connected");
        Ok(Self { pool })
    }

    /// Create the secrets table if it does not exist yet.
    pub async fn migrate(&self) -> Result<(), StorageError> {
        let result = match &self.pool {
            Pool::Postgres(pool) => sqlx::query(PG_SCHEMA).execute(pool).await.map(|_| ()),
            Pool::Sqlite(pool) => sqlx::query(SQLITE_SCHEMA).execute(pool).await.map(|_| ()),
        };
        result.map_err(unknown)
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        match &self.pool {
            Pool::Postgres(pool) => pool.close().await,
            Pool::Sqlite(pool) => pool.close().await,
        }
        info!("storage pool closed");
    }
}

#[async_trait]
impl SessionFactory for SqlStore {
    async fn open(&self) -> Result<Box<dyn Session>, StorageError> {
        let session = match &self.pool {
            Pool::Postgres(pool) => SqlSession::Postgres(pool.acquire().await.map_err(unknown)?),
            Pool::Sqlite(pool) => SqlSession::Sqlite(pool.acquire().await.map_err(unknown)?),
        };
        Ok(Box::new(session))
    }
}

/// One checked-out connection. Returned to the pool on drop.
enum SqlSession {
    Postgres(PoolConnection<Postgres>),
    Sqlite(PoolConnection<Sqlite>),
}

#[async_trait]
impl Session for SqlSession {
    async fn insert(&mut self, record: &NewSecretRecord) -> Result<(), StorageError> {
        let result = match self {
            SqlSession::Postgres(conn) => {
                sqlx::query("INSERT INTO tbl_passwords (link, password) VALUES ($1, $2)")
                    .bind(&record.link)
                    .bind(&record.ciphertext)
                    .execute(&mut **conn)
                    .await
                    .map(|_| ())
            }
            SqlSession::Sqlite(conn) => {
                sqlx::query("INSERT INTO tbl_passwords (link, password) VALUES (?, ?)")
                    .bind(&record.link)
                    .bind(&record.ciphertext)
                    .execute(&mut **conn)
                    .await
                    .map(|_| ())
            }
        };
        result.map_err(classify_write)
    }

    async fn find_by_link(&mut self, link: &str) -> Result<SecretRecord, StorageError> {
        let found = match self {
            SqlSession::Postgres(conn) => {
                sqlx::query_as::<_, SecretRecord>(
                    "SELECT id, link, password FROM tbl_passwords WHERE link = $1",
                )
                .bind(link)
                .fetch_optional(&mut **conn)
                .await
            }
            SqlSession::Sqlite(conn) => {
                sqlx::query_as::<_, SecretRecord>(
                    "SELECT id, link, password FROM tbl_passwords WHERE link = ?",
                )
                .bind(link)
                .fetch_optional(&mut **conn)
                .await
            }
        };
        found.map_err(unknown)?.ok_or(StorageError::NotFound)
    }

    async fn ping(&mut self) -> Result<(), StorageError> {
        let result = match self {
            SqlSession::Postgres(conn) => {
                sqlx::query("SELECT 1").execute(&mut **conn).await.map(|_| ())
            }
            SqlSession::Sqlite(conn) => {
                sqlx::query("SELECT 1").execute(&mut **conn).await.map(|_| ())
            }
        };
        result.map_err(unknown)
    }
}

fn unknown(e: sqlx::Error) -> StorageError {
    StorageError::Unknown(e.to_string())
}

fn classify_write(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::UniqueViolation,
        _ => unknown(e),
    }
}

fn is_sqlite_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// Mask the password portion of a database URL for safe logging.
fn mask_password(url: &str) -> String {
    if let Some(at_pos) = url.find('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            let scheme_end = url.find("://").map(|p| p + 3).unwrap_or(0);
            if colon_pos > scheme_end {
                return format!("{}:****@{}", &url[..colon_pos], &url[at_pos + 1..]);
            }
        }
    }
    url.to_string()
}
