use rusqlite::Connection;
use tracing::info;

use crate::error::Result;

const SCHEMA_VERSION: i32 = 1;

pub fn init_schema(conn: &Connection) -> Result<()> {
    let current_version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if current_version == 0 {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                parent_id INTEGER REFERENCES tasks(id),
                header TEXT NOT NULL CHECK (header <> ''),
                type TEXT,
                reviewer TEXT,
                target TEXT,
                "limit" TEXT,
                status TEXT NOT NULL DEFAULT 'IN PROGRESS',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                CHECK (parent_id IS NULL OR parent_id <> id)
            );

            CREATE INDEX IF NOT EXISTS idx_tasks_parent ON tasks(parent_id);
            CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status);

            PRAGMA journal_mode = WAL;
            "#,
        )?;

        // Fresh database gets the latest schema version
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        info!(version = SCHEMA_VERSION, "initialized task schema");
    }

    Ok(())
}

pub fn open_db(path: &std::path::Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    init_schema(&conn)?;
    Ok(conn)
}
