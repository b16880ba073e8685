#![allow(dead_code)]

use async_trait::async_trait;
use autodoc::AutodocError;
use autodoc::config::DatabaseConfig;
use autodoc::db::ConnectionPool;
use autodoc::remote::{AccessToken, RemoteItem, RemoteStore, TokenProvider};
use autodoc::service::Orchestrator;
use chrono::{Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration as StdDuration;
use tempfile::TempDir;

/// In-memory remote store. Ids are handed out as `F1, F2, ...` for folders
/// and `D1, D2, ...` for files, with URLs `u1, u2, ...` / `du1, du2, ...`.
#[derive(Default)]
pub struct FakeRemote {
    state: Mutex<FakeState>,
}

#[derive(Default)]
struct FakeState {
    folders: HashMap<String, String>,
    files: HashMap<String, FakeFile>,
    next_folder: u32,
    next_file: u32,
    failing: HashSet<&'static str>,
    calls: Vec<String>,
    latency: StdDuration,
}

#[derive(Clone, Debug)]
pub struct FakeFile {
    pub folder_id: String,
    pub filename: String,
    pub content: Vec<u8>,
    pub url: String,
    pub version: u32,
}

impl FakeRemote {
    /// Make every later call of `operation` fail with a 500.
    pub fn fail(&self, operation: &'static str) {
        self.state.lock().unwrap().failing.insert(operation);
    }

    /// Delay every call, as a slow remote store would.
    pub fn slow(&self, latency: StdDuration) {
        self.state.lock().unwrap().latency = latency;
    }

    pub fn seed_folder(&self, id: &str, name: &str) {
        self.state
            .lock()
            .unwrap()
            .folders
            .insert(id.to_string(), name.to_string());
    }

    pub fn seed_file(&self, id: &str, folder_id: &str, content: &[u8]) {
        self.state.lock().unwrap().files.insert(
            id.to_string(),
            FakeFile {
                folder_id: folder_id.to_string(),
                filename: format!("{id}.bin"),
                content: content.to_vec(),
                url: format!("url-{id}"),
                version: 1,
            },
        );
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn folder_name(&self, id: &str) -> Option<String> {
        self.state.lock().unwrap().folders.get(id).cloned()
    }

    pub fn file(&self, id: &str) -> Option<FakeFile> {
        self.state.lock().unwrap().files.get(id).cloned()
    }

    pub fn folder_count(&self) -> usize {
        self.state.lock().unwrap().folders.len()
    }

    pub fn file_count(&self) -> usize {
        self.state.lock().unwrap().files.len()
    }

    async fn enter(&self, operation: &'static str, detail: &str) -> Result<(), AutodocError> {
        let latency = self.state.lock().unwrap().latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("{operation}:{detail}"));
        if state.failing.contains(operation) {
            return Err(AutodocError::RemoteWrite {
                operation,
                status: 500,
                body: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for FakeRemote {
    async fn create_folder(
        &self,
        _token: &AccessToken,
        name: &str,
    ) -> Result<RemoteItem, AutodocError> {
        self.enter("create_folder", name).await?;
        let mut state = self.state.lock().unwrap();
        state.next_folder += 1;
        let n = state.next_folder;
        let id = format!("F{n}");
        state.folders.insert(id.clone(), name.to_string());
        Ok(RemoteItem {
            id,
            url: format!("u{n}"),
        })
    }

    async fn rename_folder(
        &self,
        _token: &AccessToken,
        folder_id: &str,
        new_name: &str,
    ) -> Result<String, AutodocError> {
        self.enter("rename_folder", folder_id).await?;
        let mut state = self.state.lock().unwrap();
        match state.folders.get_mut(folder_id) {
            Some(name) => {
                *name = new_name.to_string();
                Ok(format!("u/{new_name}"))
            }
            None => Err(AutodocError::RemoteWrite {
                operation: "rename folder",
                status: 404,
                body: String::new(),
            }),
        }
    }

    async fn delete_folder(
        &self,
        _token: &AccessToken,
        folder_id: &str,
    ) -> Result<(), AutodocError> {
        self.enter("delete_folder", folder_id).await?;
        let mut state = self.state.lock().unwrap();
        // absent folders count as deleted
        state.folders.remove(folder_id);
        state.files.retain(|_, f| f.folder_id != folder_id);
        Ok(())
    }

    async fn upload_file(
        &self,
        _token: &AccessToken,
        folder_id: &str,
        filename: &str,
        content: Vec<u8>,
    ) -> Result<RemoteItem, AutodocError> {
        self.enter("upload_file", filename).await?;
        let mut state = self.state.lock().unwrap();
        state.next_file += 1;
        let n = state.next_file;
        let id = format!("D{n}");
        let url = format!("du{n}");
        state.files.insert(
            id.clone(),
            FakeFile {
                folder_id: folder_id.to_string(),
                filename: filename.to_string(),
                content,
                url: url.clone(),
                version: 1,
            },
        );
        Ok(RemoteItem { id, url })
    }

    async fn replace_file_content(
        &self,
        _token: &AccessToken,
        file_id: &str,
        content: Vec<u8>,
    ) -> Result<String, AutodocError> {
        self.enter("replace_file_content", file_id).await?;
        let mut state = self.state.lock().unwrap();
        match state.files.get_mut(file_id) {
            Some(file) => {
                file.content = content;
                file.version += 1;
                Ok(format!("{}?v={}", file.url, file.version))
            }
            None => Err(AutodocError::RemoteWrite {
                operation: "replace file",
                status: 404,
                body: String::new(),
            }),
        }
    }

    async fn delete_file(&self, _token: &AccessToken, file_id: &str) -> Result<(), AutodocError> {
        self.enter("delete_file", file_id).await?;
        self.state.lock().unwrap().files.remove(file_id);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeTokens {
    issued: AtomicUsize,
    deny: Mutex<bool>,
    stale: Mutex<bool>,
}

impl FakeTokens {
    pub fn issued(&self) -> usize {
        self.issued.load(Ordering::SeqCst)
    }

    pub fn deny(&self) {
        *self.deny.lock().unwrap() = true;
    }

    /// Hand out tokens that expired a minute ago.
    pub fn issue_stale(&self) {
        *self.stale.lock().unwrap() = true;
    }
}

#[async_trait]
impl TokenProvider for FakeTokens {
    async fn access_token(&self) -> Result<AccessToken, AutodocError> {
        if *self.deny.lock().unwrap() {
            return Err(AutodocError::Auth("identity endpoint returned 401".to_string()));
        }
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let lifetime = if *self.stale.lock().unwrap() {
            Duration::minutes(-1)
        } else {
            Duration::minutes(60)
        };
        Ok(AccessToken::new(format!("tok-{n}"), Some(Utc::now() + lifetime)))
    }
}

pub struct Harness {
    pub dir: TempDir,
    pub pool: ConnectionPool,
    pub remote: Arc<FakeRemote>,
    pub tokens: Arc<FakeTokens>,
    pub orchestrator: Arc<Orchestrator>,
}

pub fn database_config(dir: &TempDir) -> DatabaseConfig {
    DatabaseConfig {
        url: format!("sqlite://{}", dir.path().join("autodoc.db").display()),
        min_connections: 0,
        max_connections: 2,
        connect_retries: 3,
        connect_timeout_secs: 5,
        retry_backoff_ms: 10,
    }
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_upload_limit(autodoc::config::SMALL_FILE_LIMIT).await
    }

    pub async fn with_upload_limit(limit: usize) -> Self {
        let dir = TempDir::new().expect("tempdir");
        let pool = ConnectionPool::new(database_config(&dir));
        pool.init_schema().await.expect("schema");
        let remote = Arc::new(FakeRemote::default());
        let tokens = Arc::new(FakeTokens::default());
        let orchestrator = Orchestrator::new(pool.clone(), remote.clone(), tokens.clone())
            .with_upload_limit(limit);
        Self {
            dir,
            pool,
            remote,
            tokens,
            orchestrator: Arc::new(orchestrator),
        }
    }

    /// Run raw SQL outside the orchestrator.
    pub async fn exec(&self, sql: &str) {
        let mut lease = self.pool.acquire().await.expect("lease");
        sqlx::query(sql).execute(&mut *lease).await.expect("exec");
        self.pool.release(lease).await;
    }

    pub async fn count(&self, table: &str) -> i64 {
        let mut lease = self.pool.acquire().await.expect("lease");
        let (n,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&mut *lease)
            .await
            .expect("count");
        self.pool.release(lease).await;
        n
    }
}
