use rusqlite::Connection;

use crate::{Error, Result};

/// Highest schema version this binary understands. Opening a database whose
/// recorded version exceeds this fails instead of guessing.
pub const SCHEMA_VERSION: i64 = 2;

// Numbered migrations, applied in order inside one transaction per step.
// MIGRATIONS[n] takes the schema from version n to n+1.
const MIGRATIONS: &[&str] = &[
    // v0 -> v1: base schema
    r#"
    CREATE TABLE IF NOT EXISTS meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE sessions (
        id TEXT PRIMARY KEY,
        shell TEXT,
        host TEXT,
        user TEXT,
        started_ms INTEGER NOT NULL,
        ended_ms INTEGER,
        project_types TEXT NOT NULL DEFAULT '[]'
    );

    CREATE TABLE command_events (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        session_id TEXT NOT NULL,
        command_id TEXT NOT NULL,
        ts_ms INTEGER NOT NULL,
        cwd TEXT NOT NULL,
        repo_key TEXT,
        branch TEXT,
        cmd_raw TEXT NOT NULL,
        cmd_norm TEXT NOT NULL,
        cmd_truncated INTEGER NOT NULL DEFAULT 0,
        template_id TEXT NOT NULL,
        exit_code INTEGER,
        duration_ms INTEGER,
        UNIQUE(session_id, command_id)
    );
    CREATE INDEX idx_events_session_ts ON command_events(session_id, ts_ms DESC);
    CREATE INDEX idx_events_template ON command_events(template_id);
    CREATE INDEX idx_events_cwd ON command_events(cwd);

    CREATE TABLE command_templates (
        template_id TEXT PRIMARY KEY,
        cmd_norm TEXT NOT NULL,
        slot_count INTEGER NOT NULL DEFAULT 0,
        first_seen_ms INTEGER NOT NULL,
        last_seen_ms INTEGER NOT NULL
    );
    CREATE INDEX idx_templates_norm ON command_templates(cmd_norm);

    CREATE TABLE command_stat (
        scope TEXT NOT NULL,
        template_id TEXT NOT NULL,
        score REAL NOT NULL DEFAULT 0,
        success_count INTEGER NOT NULL DEFAULT 0,
        failure_count INTEGER NOT NULL DEFAULT 0,
        last_seen_ms INTEGER NOT NULL,
        PRIMARY KEY (scope, template_id)
    );
    CREATE INDEX idx_command_stat_scope_score ON command_stat(scope, score DESC);

    CREATE TABLE transition_stat (
        scope TEXT NOT NULL,
        prev_template_id TEXT NOT NULL,
        next_template_id TEXT NOT NULL,
        weight REAL NOT NULL DEFAULT 0,
        count INTEGER NOT NULL DEFAULT 0,
        last_seen_ms INTEGER NOT NULL,
        PRIMARY KEY (scope, prev_template_id, next_template_id)
    );
    CREATE INDEX idx_transition_scope_prev ON transition_stat(scope, prev_template_id, weight DESC);

    CREATE TABLE slot_stat (
        scope TEXT NOT NULL,
        template_id TEXT NOT NULL,
        slot_index INTEGER NOT NULL,
        value TEXT NOT NULL,
        weight REAL NOT NULL DEFAULT 0,
        count INTEGER NOT NULL DEFAULT 0,
        last_seen_ms INTEGER NOT NULL,
        PRIMARY KEY (scope, template_id, slot_index, value)
    );
    "#,
    // v1 -> v2: user-action-driven adjustment tables
    r#"
    CREATE TABLE dismissal_stat (
        scope TEXT NOT NULL,
        template_id TEXT NOT NULL,
        count INTEGER NOT NULL DEFAULT 0,
        last_seen_ms INTEGER NOT NULL,
        PRIMARY KEY (scope, template_id)
    );

    CREATE TABLE feedback_stat (
        scope TEXT NOT NULL,
        template_id TEXT NOT NULL,
        action TEXT NOT NULL,
        count INTEGER NOT NULL DEFAULT 0,
        last_seen_ms INTEGER NOT NULL,
        PRIMARY KEY (scope, template_id, action)
    );
    "#,
];

fn current_version(conn: &Connection) -> Result<i64> {
    let exists: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'meta'",
        [],
        |row| row.get(0),
    )?;
    if exists == 0 {
        return Ok(0);
    }
    let version: Option<String> = conn
        .query_row(
            "SELECT value FROM meta WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .map(Some)
        .or_else(|err| match err {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(other),
        })?;
    Ok(version.and_then(|v| v.parse().ok()).unwrap_or(0))
}

/// Apply pending migrations in order. Fails with `Error::Migration` when the
/// on-disk version is newer than this binary knows about.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    let version = current_version(conn)?;

    if version > SCHEMA_VERSION {
        return Err(Error::Migration(format!(
            "database schema version {} is newer than supported version {}",
            version, SCHEMA_VERSION
        )));
    }

    for (index, migration) in MIGRATIONS.iter().enumerate().skip(version as usize) {
        let target = index as i64 + 1;
        let tx = conn.transaction()?;
        tx.execute_batch(migration)?;
        tx.execute(
            "INSERT INTO meta (key, value) VALUES ('schema_version', ?1)
             ON CONFLICT(key) DO UPDATE SET value = ?1",
            [target.to_string()],
        )?;
        tx.commit()?;
    }

    Ok(())
}
