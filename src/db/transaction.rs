//! Scoped unit of work: acquire, run, commit or roll back, release.

use crate::db::pool::ConnectionPool;
use crate::error::AutodocError;
use futures::future::BoxFuture;
use sqlx::{Connection, SqliteConnection};
use tracing::{debug, error, warn};

/// How the transaction takes its locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Begin {
    /// Plain `BEGIN`: locks are taken on first read/write.
    Deferred,
    /// `BEGIN IMMEDIATE`: the write lock is held from the start, so
    /// concurrent writers queue on the busy timeout instead of failing
    /// mid-block.
    Immediate,
}

impl ConnectionPool {
    /// Run `block` inside one transaction on one leased connection.
    ///
    /// `Ok` commits, `Err` rolls back and hands the same error back. The lease
    /// is returned to the pool exactly once on every path, including a failed
    /// `BEGIN`, `COMMIT` or `ROLLBACK`.
    ///
    /// ```ignore
    /// let project = pool
    ///     .transaction(move |conn| Box::pin(async move {
    ///         ProjectRepo::new(conn).get(id).await
    ///     }))
    ///     .await?;
    /// ```
    pub async fn transaction<T, F>(&self, block: F) -> Result<T, AutodocError>
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut SqliteConnection) -> BoxFuture<'c, Result<T, AutodocError>>
            + Send,
    {
        self.scoped(Begin::Deferred, block).await
    }

    /// Like [`transaction`](Self::transaction), but takes the write lock
    /// before `block` runs. Use it for every block that writes.
    pub async fn write_transaction<T, F>(&self, block: F) -> Result<T, AutodocError>
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut SqliteConnection) -> BoxFuture<'c, Result<T, AutodocError>>
            + Send,
    {
        self.scoped(Begin::Immediate, block).await
    }

    async fn scoped<T, F>(&self, begin: Begin, block: F) -> Result<T, AutodocError>
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut SqliteConnection) -> BoxFuture<'c, Result<T, AutodocError>>
            + Send,
    {
        let mut lease = self.acquire().await?;
        let outcome = run_scoped(&mut lease, begin, block).await;
        self.release(lease).await;
        outcome
    }
}

async fn run_scoped<T, F>(
    conn: &mut SqliteConnection,
    begin: Begin,
    block: F,
) -> Result<T, AutodocError>
where
    F: for<'c> FnOnce(&'c mut SqliteConnection) -> BoxFuture<'c, Result<T, AutodocError>>,
{
    let mut tx = match begin {
        Begin::Deferred => conn.begin().await?,
        Begin::Immediate => conn.begin_with("BEGIN IMMEDIATE").await?,
    };
    match block(&mut *tx).await {
        Ok(value) => {
            tx.commit().await?;
            debug!(?begin, "[DB] Transaction committed.");
            Ok(value)
        }
        Err(err) => {
            warn!(?begin, error = %err, "[DB] Rolling back transaction.");
            if let Err(rollback_err) = tx.rollback().await {
                error!(error = %rollback_err, "[DB] Rollback failed.");
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::DatabaseConfig;
    use crate::db::pool::ConnectionPool;
    use crate::error::AutodocError;
    use tempfile::TempDir;

    async fn pool(dir: &TempDir) -> ConnectionPool {
        let pool = ConnectionPool::new(DatabaseConfig {
            url: format!("sqlite://{}", dir.path().join("tx.db").display()),
            min_connections: 0,
            max_connections: 2,
            connect_retries: 2,
            connect_timeout_secs: 1,
            retry_backoff_ms: 10,
        });
        pool.init_schema().await.unwrap();
        pool
    }

    async fn project_count(pool: &ConnectionPool) -> i64 {
        pool.transaction(|conn| {
            Box::pin(async move {
                let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM projects")
                    .fetch_one(&mut *conn)
                    .await?;
                Ok::<_, AutodocError>(n)
            })
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn success_commits_and_releases() {
        let dir = TempDir::new().unwrap();
        let pool = pool(&dir).await;

        let id = pool
            .transaction(|conn| {
                Box::pin(async move {
                    let (id,): (i64,) = sqlx::query_as(
                        "INSERT INTO projects (name, description) VALUES ('Alpha', '') RETURNING id",
                    )
                    .fetch_one(&mut *conn)
                    .await?;
                    Ok::<_, AutodocError>(id)
                })
            })
            .await
            .unwrap();

        assert!(id > 0);
        assert_eq!(project_count(&pool).await, 1);
        assert_eq!(pool.outstanding(), 0);
    }

    #[tokio::test]
    async fn failure_rolls_back_and_returns_same_error() {
        let dir = TempDir::new().unwrap();
        let pool = pool(&dir).await;

        let err = pool
            .transaction(|conn| {
                Box::pin(async move {
                    sqlx::query("INSERT INTO projects (name, description) VALUES ('Alpha', '')")
                        .execute(&mut *conn)
                        .await?;
                    Err::<(), _>(AutodocError::not_found("project", 42))
                })
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AutodocError::NotFound { resource: "project", ref id } if id == "42"
        ));
        assert_eq!(project_count(&pool).await, 0);
        assert_eq!(pool.outstanding(), 0);
    }

    #[tokio::test]
    async fn database_error_inside_block_rolls_back() {
        let dir = TempDir::new().unwrap();
        let pool = pool(&dir).await;

        let err = pool
            .transaction(|conn| {
                Box::pin(async move {
                    sqlx::query("INSERT INTO projects (name, description) VALUES ('Alpha', '')")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("INSERT INTO no_such_table (x) VALUES (1)")
                        .execute(&mut *conn)
                        .await?;
                    Ok::<_, AutodocError>(())
                })
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AutodocError::Database(_)));
        assert_eq!(project_count(&pool).await, 0);
        assert_eq!(pool.outstanding(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn write_transactions_queue_instead_of_failing() {
        let dir = TempDir::new().unwrap();
        let pool = pool(&dir).await;

        let mut tasks = Vec::new();
        for name in ["Alpha", "Beta"] {
            let pool = pool.clone();
            tasks.push(tokio::spawn(async move {
                pool.write_transaction(move |conn| {
                    Box::pin(async move {
                        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM projects")
                            .fetch_one(&mut *conn)
                            .await?;
                        // hold the lock across a slow step between read and write
                        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                        sqlx::query("INSERT INTO projects (name, description) VALUES (?, '')")
                            .bind(name)
                            .execute(&mut *conn)
                            .await?;
                        Ok::<_, AutodocError>(n)
                    })
                })
                .await
            }));
        }

        let mut seen = Vec::new();
        for task in tasks {
            seen.push(task.await.unwrap().expect("write transaction"));
        }
        seen.sort();

        assert_eq!(seen, vec![0, 1]);
        assert_eq!(project_count(&pool).await, 2);
        assert_eq!(pool.outstanding(), 0);
    }
}
