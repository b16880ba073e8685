use crate::config::DatabaseConfig;
use crate::db::schema::SQLITE_INIT;
use crate::error::AutodocError;
use backon::{ConstantBuilder, Retryable};
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Sqlite, SqliteConnection, SqlitePool};
use std::ops::{Deref, DerefMut};
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Bounded, lazily created set of database connections.
///
/// Cloning is cheap and every clone shares the same underlying pool, so one
/// instance built at startup can be handed to every component that needs it.
#[derive(Clone)]
pub struct ConnectionPool {
    shared: Arc<Shared>,
}

struct Shared {
    settings: DatabaseConfig,
    pool: RwLock<Option<SqlitePool>>,
    leased: AtomicUsize,
}

/// A connection checked out of [`ConnectionPool`].
///
/// Owned by exactly one caller; dropping it hands the connection back.
pub struct Lease {
    conn: PoolConnection<Sqlite>,
    shared: Arc<Shared>,
}

impl Deref for Lease {
    type Target = SqliteConnection;

    fn deref(&self) -> &SqliteConnection {
        &self.conn
    }
}

impl DerefMut for Lease {
    fn deref_mut(&mut self) -> &mut SqliteConnection {
        &mut self.conn
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.shared.leased.fetch_sub(1, Ordering::AcqRel);
    }
}

impl ConnectionPool {
    /// Build an unconnected pool; nothing is opened until [`connect`](Self::connect)
    /// or the first [`acquire`](Self::acquire).
    pub fn new(settings: DatabaseConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                settings,
                pool: RwLock::new(None),
                leased: AtomicUsize::new(0),
            }),
        }
    }

    pub fn settings(&self) -> &DatabaseConfig {
        &self.shared.settings
    }

    /// Create the bounded pool. No-op while a pool already exists.
    pub async fn connect(&self) -> Result<(), AutodocError> {
        let mut slot = self.shared.pool.write().await;
        if slot.is_some() {
            return Ok(());
        }

        let settings = &self.shared.settings;
        let connect_opts = SqliteConnectOptions::from_str(&settings.url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            // write transactions queue on the lock for as long as an acquire may wait
            .busy_timeout(settings.connect_timeout());
        let max = settings.max_connections.max(1);
        let min = settings.min_connections.min(max);
        let pool = SqlitePoolOptions::new()
            .min_connections(min)
            .max_connections(max)
            .acquire_timeout(settings.connect_timeout())
            .connect_lazy_with(connect_opts);

        *slot = Some(pool);
        info!(min, max, url = %settings.url, "[DB] Connection pool created.");
        Ok(())
    }

    pub async fn is_connected(&self) -> bool {
        self.shared.pool.read().await.is_some()
    }

    /// Number of leases currently held by callers.
    pub fn outstanding(&self) -> usize {
        self.shared.leased.load(Ordering::Acquire)
    }

    /// Check out one connection, retrying transient failures with a fixed
    /// backoff. After `connect_retries` failed attempts the caller gets
    /// [`AutodocError::PoolExhausted`]; permanent failures (bad path,
    /// unreadable database) are returned on the first attempt.
    pub async fn acquire(&self) -> Result<Lease, AutodocError> {
        let pool = self.handle().await?;
        let settings = &self.shared.settings;
        let max_attempts = settings.connect_retries.max(1);
        let policy = ConstantBuilder::default()
            .with_delay(settings.retry_backoff())
            .with_max_times((max_attempts - 1) as usize);

        let attempts = AtomicU32::new(0);
        let conn = (|| async {
            attempts.fetch_add(1, Ordering::Relaxed);
            pool.acquire().await
        })
        .retry(policy)
        .when(is_transient)
        .notify(|err: &sqlx::Error, dur: Duration| {
            warn!(
                attempt = attempts.load(Ordering::Relaxed),
                error = %err,
                "[DB] Connection attempt failed, retrying in {:?}",
                dur
            );
        })
        .await
        .map_err(|err| {
            let attempts = attempts.load(Ordering::Relaxed);
            if is_transient(&err) {
                error!(attempts, error = %err, "[DB] Could not get DB connection after retries.");
                AutodocError::PoolExhausted { attempts }
            } else {
                error!(error = %err, "[DB] Connection failed permanently.");
                AutodocError::Database(err)
            }
        })?;

        self.shared.leased.fetch_add(1, Ordering::AcqRel);
        Ok(Lease {
            conn,
            shared: self.shared.clone(),
        })
    }

    /// Hand a lease back. After [`close_all`](Self::close_all) the connection
    /// is discarded instead of pooled.
    pub async fn release(&self, lease: Lease) {
        if self.shared.pool.read().await.is_none() {
            warn!("[DB] Pool already closed; discarding released connection.");
        } else {
            debug!("[DB] Connection released back to pool.");
        }
        drop(lease);
    }

    /// Drain and invalidate the pool. Waits for outstanding leases to come
    /// back. A later `connect`/`acquire` builds a fresh pool.
    pub async fn close_all(&self) {
        let taken = self.shared.pool.write().await.take();
        if let Some(pool) = taken {
            pool.close().await;
            info!("[DB] All connections closed.");
        }
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), AutodocError> {
        let mut lease = self.acquire().await?;
        let outcome = async {
            // sqlx::query runs one statement at a time
            for stmt in SQLITE_INIT.split(';') {
                let s = stmt.trim();
                if s.is_empty() {
                    continue;
                }
                sqlx::query(s).execute(&mut *lease).await?;
            }
            Ok::<(), AutodocError>(())
        }
        .await;
        self.release(lease).await;
        outcome
    }

    async fn handle(&self) -> Result<SqlitePool, AutodocError> {
        if let Some(pool) = self.shared.pool.read().await.as_ref() {
            return Ok(pool.clone());
        }
        self.connect().await?;
        self.shared
            .pool
            .read()
            .await
            .clone()
            .ok_or(AutodocError::PoolExhausted { attempts: 0 })
    }
}

/// Timeouts and I/O hiccups can clear up on their own; everything else
/// (bad URL, missing directory, corrupt file) will fail again.
fn is_transient(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::PoolTimedOut | sqlx::Error::Io(_))
}
