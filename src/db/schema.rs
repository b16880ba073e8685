//! SQL DDL for the project and document tables.
//! SQLite-first design; can be adapted for other RDBMS.

/// SQLite schema with:
/// - `projects.remote_folder_id` / `remote_url` NULL until the remote folder exists
/// - `documents.project_id` referencing `projects(id)`, cascading on delete
///   (deleting a remote folder removes its files too)
/// - `documents.created_at` stored as RFC3339 text
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS projects (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    remote_url TEXT NULL,
    remote_folder_id TEXT NULL
);

CREATE TABLE IF NOT EXISTS documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    url TEXT NULL,
    remote_file_id TEXT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_documents_project_id ON documents(project_id);
"#;
