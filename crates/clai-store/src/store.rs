use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Transaction};
use std::path::Path;

use clai_types::stats::{clamp, decay_factor};
use clai_types::{CommandEvent, CommandTemplate, QueryFilter, Session};

use crate::records::{
    ApplyOutcome, CommandStatRow, EventApply, SlotStatRow, TransitionRow,
};
use crate::schema;
use crate::{Error, Result};

/// Default busy timeout for transient writer/reader contention.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 50;

/// The store owns the underlying connection exclusively; other components
/// reach it through the runtime's capability handles. All mutations take
/// `&mut self` so a single writer is enforced by ownership.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(db_path: &Path) -> Result<Self> {
        Self::open_with_busy_timeout(db_path, DEFAULT_BUSY_TIMEOUT_MS)
    }

    pub fn open_with_busy_timeout(db_path: &Path, busy_timeout_ms: u64) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut conn = Connection::open(db_path)?;
        configure(&conn, busy_timeout_ms)?;
        schema::migrate(&mut conn)?;
        Ok(Self { conn })
    }

    /// Read-only companion connection for the reader pool. Never migrates;
    /// fails if the writer has not initialized the schema yet.
    pub fn open_reader(db_path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        configure(&conn, DEFAULT_BUSY_TIMEOUT_MS)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        configure(&conn, DEFAULT_BUSY_TIMEOUT_MS)?;
        schema::migrate(&mut conn)?;
        Ok(Self { conn })
    }

    pub fn schema_version(&self) -> Result<i64> {
        let version: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM meta WHERE key = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(version.and_then(|v| v.parse().ok()).unwrap_or(0))
    }

    // --- meta -----------------------------------------------------------

    pub fn meta_get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .prepare_cached("SELECT value FROM meta WHERE key = ?1")?
            .query_row([key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    pub fn meta_set(&mut self, key: &str, value: &str) -> Result<()> {
        self.conn
            .prepare_cached(
                "INSERT INTO meta (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = ?2",
            )?
            .execute(params![key, value])?;
        Ok(())
    }

    // --- sessions -------------------------------------------------------

    pub fn upsert_session(&mut self, session: &Session) -> Result<()> {
        let project_types = serde_json::to_string(&session.project_types)
            .map_err(|e| Error::Query(e.to_string()))?;
        self.conn
            .prepare_cached(
                r#"
                INSERT INTO sessions (id, shell, host, user, started_ms, ended_ms, project_types)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(id) DO UPDATE SET
                    shell = COALESCE(?2, shell),
                    host = COALESCE(?3, host),
                    user = COALESCE(?4, user),
                    project_types = ?7
                "#,
            )?
            .execute(params![
                &session.id,
                &session.shell,
                &session.host,
                &session.user,
                session.started_ms,
                session.ended_ms,
                &project_types,
            ])?;
        Ok(())
    }

    /// Soft-end a session. Returns false when the session is unknown.
    pub fn end_session(&mut self, session_id: &str, ended_ms: i64) -> Result<bool> {
        let changed = self
            .conn
            .prepare_cached("UPDATE sessions SET ended_ms = ?2 WHERE id = ?1")?
            .execute(params![session_id, ended_ms])?;
        Ok(changed > 0)
    }

    pub fn get_session(&self, session_id: &str) -> Result<Option<Session>> {
        let session = self
            .conn
            .prepare_cached(
                "SELECT id, shell, host, user, started_ms, ended_ms, project_types
                 FROM sessions WHERE id = ?1",
            )?
            .query_row([session_id], |row| {
                let project_types: String = row.get(6)?;
                Ok(Session {
                    id: row.get(0)?,
                    shell: row.get(1)?,
                    host: row.get(2)?,
                    user: row.get(3)?,
                    started_ms: row.get(4)?,
                    ended_ms: row.get(5)?,
                    project_types: serde_json::from_str(&project_types).unwrap_or_default(),
                })
            })
            .optional()?;
        Ok(session)
    }

    /// Resolve a session id prefix (supports short ids in queries).
    /// Exactly one match wins; more than one is `Error::AmbiguousPrefix`.
    pub fn resolve_session_prefix(&self, prefix: &str) -> Result<Option<String>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT id FROM sessions
             WHERE substr(id, 1, length(?1)) = ?1
             LIMIT 2",
        )?;
        let mut matches: Vec<String> = stmt
            .query_map([prefix], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        match matches.len() {
            0 => Ok(None),
            1 => Ok(Some(matches.remove(0))),
            _ => Err(Error::AmbiguousPrefix(prefix.to_string())),
        }
    }

    // --- event apply ----------------------------------------------------

    /// Commit one finalized command event and every aggregate row it
    /// touches, atomically. A `(session_id, command_id)` pair that was
    /// already finalized commits nothing and reports `Duplicate`.
    pub fn apply_command_end(&mut self, apply: &EventApply) -> Result<ApplyOutcome> {
        let tx = self.conn.transaction()?;

        let inserted = tx
            .prepare_cached(
                r#"
                INSERT INTO command_events
                    (session_id, command_id, ts_ms, cwd, repo_key, branch,
                     cmd_raw, cmd_norm, cmd_truncated, template_id, exit_code, duration_ms)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                ON CONFLICT(session_id, command_id) DO NOTHING
                "#,
            )?
            .execute(params![
                &apply.event.session_id,
                &apply.event.command_id,
                apply.event.ts_ms,
                &apply.event.cwd,
                &apply.event.repo_key,
                &apply.event.branch,
                &apply.event.cmd_raw,
                &apply.event.cmd_norm,
                apply.event.cmd_truncated,
                &apply.event.template_id,
                apply.event.exit_code,
                apply.event.duration_ms,
            ])?;

        if inserted == 0 {
            // Idempotence: a replayed command_end is a counted no-op.
            return Ok(ApplyOutcome::Duplicate);
        }
        let event_id = tx.last_insert_rowid();

        upsert_template(&tx, apply)?;

        // None (imported history with unknown outcome) contributes score
        // mass without moving the success ratio.
        let success = apply.event.exit_code.map(|code| code == 0);
        for scope in &apply.scopes {
            upsert_command_stat(&tx, scope, apply, success)?;
            if let Some(prev) = &apply.prev_template_id {
                upsert_transition_stat(&tx, scope, prev, apply)?;
            }
            upsert_slot_stats(&tx, scope, apply)?;
        }

        tx.commit()?;
        Ok(ApplyOutcome::Applied(event_id))
    }

    // --- feedback -------------------------------------------------------

    /// Record a user reaction against a template in every given scope.
    /// Dismissals additionally bump `dismissal_stat`.
    pub fn record_feedback(
        &mut self,
        scopes: &[String],
        template_id: &str,
        action: &str,
        ts_ms: i64,
    ) -> Result<()> {
        let tx = self.conn.transaction()?;
        for scope in scopes {
            tx.prepare_cached(
                r#"
                INSERT INTO feedback_stat (scope, template_id, action, count, last_seen_ms)
                VALUES (?1, ?2, ?3, 1, ?4)
                ON CONFLICT(scope, template_id, action) DO UPDATE SET
                    count = count + 1,
                    last_seen_ms = MAX(last_seen_ms, ?4)
                "#,
            )?
            .execute(params![scope, template_id, action, ts_ms])?;

            if action == "dismissed" {
                tx.prepare_cached(
                    r#"
                    INSERT INTO dismissal_stat (scope, template_id, count, last_seen_ms)
                    VALUES (?1, ?2, 1, ?3)
                    ON CONFLICT(scope, template_id) DO UPDATE SET
                        count = count + 1,
                        last_seen_ms = MAX(last_seen_ms, ?3)
                    "#,
                )?
                .execute(params![scope, template_id, ts_ms])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    // --- ranking reads --------------------------------------------------

    /// Top command stats for one scope, optionally filtered to templates
    /// whose normalized text starts with `prefix`. Ordered for
    /// deterministic candidate assembly.
    pub fn top_stats(
        &self,
        scope: &str,
        prefix: Option<&str>,
        cap: usize,
    ) -> Result<Vec<CommandStatRow>> {
        let mut stmt = self.conn.prepare_cached(
            r#"
            SELECT s.template_id, t.cmd_norm, s.score, s.success_count,
                   s.failure_count, s.last_seen_ms
            FROM command_stat s
            JOIN command_templates t ON t.template_id = s.template_id
            WHERE s.scope = ?1
              AND (?2 IS NULL
                   OR substr(t.cmd_norm, 1, length(?2)) = ?2
                   OR instr(t.cmd_norm, ' ' || ?2) > 0)
            ORDER BY s.score DESC, s.last_seen_ms DESC, s.template_id ASC
            LIMIT ?3
            "#,
        )?;
        let rows = stmt
            .query_map(params![scope, prefix, cap as i64], |row| {
                Ok(CommandStatRow {
                    template_id: row.get(0)?,
                    cmd_norm: row.get(1)?,
                    score: row.get(2)?,
                    success_count: row.get(3)?,
                    failure_count: row.get(4)?,
                    last_seen_ms: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Transitions out of `prev_template_id` in one scope, optionally
    /// prefix-filtered on the successor's normalized text.
    pub fn transitions_from(
        &self,
        scope: &str,
        prev_template_id: &str,
        prefix: Option<&str>,
        cap: usize,
    ) -> Result<Vec<TransitionRow>> {
        let mut stmt = self.conn.prepare_cached(
            r#"
            SELECT x.next_template_id, t.cmd_norm, x.weight, x.count, x.last_seen_ms
            FROM transition_stat x
            JOIN command_templates t ON t.template_id = x.next_template_id
            WHERE x.scope = ?1 AND x.prev_template_id = ?2
              AND (?3 IS NULL
                   OR substr(t.cmd_norm, 1, length(?3)) = ?3
                   OR instr(t.cmd_norm, ' ' || ?3) > 0)
            ORDER BY x.weight DESC, x.last_seen_ms DESC, x.next_template_id ASC
            LIMIT ?4
            "#,
        )?;
        let rows = stmt
            .query_map(
                params![scope, prev_template_id, prefix, cap as i64],
                |row| {
                    Ok(TransitionRow {
                        next_template_id: row.get(0)?,
                        cmd_norm: row.get(1)?,
                        weight: row.get(2)?,
                        count: row.get(3)?,
                        last_seen_ms: row.get(4)?,
                    })
                },
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn template_by_id(&self, template_id: &str) -> Result<Option<CommandTemplate>> {
        let template = self
            .conn
            .prepare_cached(
                "SELECT template_id, cmd_norm, slot_count, first_seen_ms, last_seen_ms
                 FROM command_templates WHERE template_id = ?1",
            )?
            .query_row([template_id], |row| {
                Ok(CommandTemplate {
                    template_id: row.get(0)?,
                    cmd_norm: row.get(1)?,
                    slot_count: row.get::<_, i64>(2)? as usize,
                    first_seen_ms: row.get(3)?,
                    last_seen_ms: row.get(4)?,
                })
            })
            .optional()?;
        Ok(template)
    }

    pub fn template_by_norm(&self, cmd_norm: &str) -> Result<Option<CommandTemplate>> {
        let template = self
            .conn
            .prepare_cached(
                "SELECT template_id, cmd_norm, slot_count, first_seen_ms, last_seen_ms
                 FROM command_templates WHERE cmd_norm = ?1",
            )?
            .query_row([cmd_norm], |row| {
                Ok(CommandTemplate {
                    template_id: row.get(0)?,
                    cmd_norm: row.get(1)?,
                    slot_count: row.get::<_, i64>(2)? as usize,
                    first_seen_ms: row.get(3)?,
                    last_seen_ms: row.get(4)?,
                })
            })
            .optional()?;
        Ok(template)
    }

    /// Slot values seen for a template in one scope, strongest first. Used
    /// to render concrete commands from templated candidates.
    pub fn slot_values(&self, scope: &str, template_id: &str) -> Result<Vec<SlotStatRow>> {
        let mut stmt = self.conn.prepare_cached(
            r#"
            SELECT slot_index, value, weight, count, last_seen_ms
            FROM slot_stat
            WHERE scope = ?1 AND template_id = ?2
            ORDER BY slot_index ASC, weight DESC, last_seen_ms DESC, value ASC
            "#,
        )?;
        let rows = stmt
            .query_map(params![scope, template_id], |row| {
                Ok(SlotStatRow {
                    slot_index: row.get(0)?,
                    value: row.get(1)?,
                    weight: row.get(2)?,
                    count: row.get(3)?,
                    last_seen_ms: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Dismissal counts for every template in a scope.
    pub fn dismissals_for_scope(&self, scope: &str) -> Result<Vec<(String, i64)>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT template_id, count FROM dismissal_stat WHERE scope = ?1")?;
        let rows = stmt
            .query_map([scope], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // --- history query --------------------------------------------------

    /// History search. `filter.session_id` must already be resolved to an
    /// exact id by the caller (see `resolve_session_prefix`).
    pub fn query_commands(&self, filter: &QueryFilter) -> Result<Vec<CommandEvent>> {
        let mut sql = String::from(
            "SELECT id, session_id, command_id, ts_ms, cwd, repo_key, branch,
                    cmd_raw, cmd_norm, cmd_truncated, template_id, exit_code, duration_ms
             FROM command_events WHERE 1 = 1",
        );
        let mut values: Vec<rusqlite::types::Value> = Vec::new();

        if let Some(session_id) = &filter.session_id {
            values.push(session_id.clone().into());
            sql.push_str(&format!(" AND session_id = ?{}", values.len()));
        }
        if let Some(cwd) = &filter.cwd {
            values.push(cwd.clone().into());
            sql.push_str(&format!(" AND cwd = ?{}", values.len()));
        }
        if let Some(repo_key) = &filter.repo_key {
            values.push(repo_key.clone().into());
            sql.push_str(&format!(" AND repo_key = ?{}", values.len()));
        }
        if let Some(prefix) = &filter.prefix {
            values.push(prefix.clone().into());
            sql.push_str(&format!(
                " AND substr(cmd_norm, 1, length(?{n})) = ?{n}",
                n = values.len()
            ));
        }
        if let Some(substring) = &filter.substring {
            values.push(format!("%{}%", escape_like(substring)).into());
            sql.push_str(&format!(" AND cmd_raw LIKE ?{} ESCAPE '\\'", values.len()));
        }
        if filter.success_only {
            sql.push_str(" AND exit_code = 0");
        }
        if filter.failure_only {
            sql.push_str(" AND exit_code IS NOT NULL AND exit_code != 0");
        }

        values.push((filter.limit as i64).into());
        sql.push_str(&format!(" ORDER BY ts_ms DESC, id DESC LIMIT ?{}", values.len()));
        values.push((filter.offset as i64).into());
        sql.push_str(&format!(" OFFSET ?{}", values.len()));

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(values.iter()), |row| {
                Ok(CommandEvent {
                    id: row.get(0)?,
                    session_id: row.get(1)?,
                    command_id: row.get(2)?,
                    ts_ms: row.get(3)?,
                    cwd: row.get(4)?,
                    repo_key: row.get(5)?,
                    branch: row.get(6)?,
                    cmd_raw: row.get(7)?,
                    cmd_norm: row.get(8)?,
                    cmd_truncated: row.get(9)?,
                    template_id: row.get(10)?,
                    exit_code: row.get(11)?,
                    duration_ms: row.get(12)?,
                    ephemeral: false,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // --- maintenance ----------------------------------------------------

    pub fn event_count(&self) -> Result<i64> {
        let count = self
            .conn
            .prepare_cached("SELECT COUNT(*) FROM command_events")?
            .query_row([], |row| row.get(0))?;
        Ok(count)
    }

    /// Retention pruning: drop events older than `cutoff_ms`, then enforce
    /// `max_rows` by dropping the oldest remainder. Returns rows removed.
    pub fn prune_events(&mut self, cutoff_ms: i64, max_rows: usize) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut removed = tx
            .prepare_cached("DELETE FROM command_events WHERE ts_ms < ?1")?
            .execute([cutoff_ms])?;

        removed += tx
            .prepare_cached(
                r#"
                DELETE FROM command_events WHERE id IN (
                    SELECT id FROM command_events
                    ORDER BY ts_ms DESC, id DESC
                    LIMIT -1 OFFSET ?1
                )
                "#,
            )?
            .execute([max_rows as i64])?;
        tx.commit()?;
        Ok(removed)
    }
}

fn configure(conn: &Connection, busy_timeout_ms: u64) -> Result<()> {
    conn.busy_timeout(std::time::Duration::from_millis(busy_timeout_ms))?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.set_prepared_statement_cache_capacity(64);
    Ok(())
}

fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn upsert_template(tx: &Transaction<'_>, apply: &EventApply) -> Result<()> {
    tx.prepare_cached(
        r#"
        INSERT INTO command_templates (template_id, cmd_norm, slot_count, first_seen_ms, last_seen_ms)
        VALUES (?1, ?2, ?3, ?4, ?4)
        ON CONFLICT(template_id) DO UPDATE SET
            last_seen_ms = MAX(last_seen_ms, ?4)
        "#,
    )?
    .execute(params![
        &apply.event.template_id,
        &apply.event.cmd_norm,
        apply.slots.len() as i64,
        apply.event.ts_ms,
    ])?;
    Ok(())
}

fn upsert_command_stat(
    tx: &Transaction<'_>,
    scope: &str,
    apply: &EventApply,
    success: Option<bool>,
) -> Result<()> {
    let ts = apply.event.ts_ms;
    let tuning = apply.tuning;
    let (success_inc, failure_inc) = match success {
        Some(true) => (1, 0),
        Some(false) => (0, 1),
        None => (0, 0),
    };

    let new_score = if apply.defer_decay {
        // Burst fast path: plain increment, clamp inline. The decay skipped
        // here is bounded by the burst window and settles on the next
        // slow-path touch of the row.
        None
    } else {
        let old: Option<(f64, i64)> = tx
            .prepare_cached(
                "SELECT score, last_seen_ms FROM command_stat
                 WHERE scope = ?1 AND template_id = ?2",
            )?
            .query_row(params![scope, &apply.event.template_id], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .optional()?;
        let decayed = match old {
            Some((score, last_seen)) => score * decay_factor(ts - last_seen, tuning.half_life_ms),
            None => 0.0,
        };
        Some(clamp(decayed + 1.0, tuning.score_min, tuning.score_max))
    };

    match new_score {
        Some(score) => {
            tx.prepare_cached(
                r#"
                INSERT INTO command_stat (scope, template_id, score, success_count, failure_count, last_seen_ms)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(scope, template_id) DO UPDATE SET
                    score = ?3,
                    success_count = success_count + ?4,
                    failure_count = failure_count + ?5,
                    last_seen_ms = MAX(last_seen_ms, ?6)
                "#,
            )?
            .execute(params![
                scope,
                &apply.event.template_id,
                score,
                success_inc,
                failure_inc,
                ts,
            ])?;
        }
        None => {
            tx.prepare_cached(
                r#"
                INSERT INTO command_stat (scope, template_id, score, success_count, failure_count, last_seen_ms)
                VALUES (?1, ?2, 1.0, ?3, ?4, ?5)
                ON CONFLICT(scope, template_id) DO UPDATE SET
                    score = MIN(score + 1.0, ?6),
                    success_count = success_count + ?3,
                    failure_count = failure_count + ?4,
                    last_seen_ms = MAX(last_seen_ms, ?5)
                "#,
            )?
            .execute(params![
                scope,
                &apply.event.template_id,
                success_inc,
                failure_inc,
                ts,
                apply.tuning.score_max,
            ])?;
        }
    }
    Ok(())
}

fn upsert_transition_stat(
    tx: &Transaction<'_>,
    scope: &str,
    prev_template_id: &str,
    apply: &EventApply,
) -> Result<()> {
    let ts = apply.event.ts_ms;
    let tuning = apply.tuning;

    if apply.defer_decay {
        tx.prepare_cached(
            r#"
            INSERT INTO transition_stat (scope, prev_template_id, next_template_id, weight, count, last_seen_ms)
            VALUES (?1, ?2, ?3, 1.0, 1, ?4)
            ON CONFLICT(scope, prev_template_id, next_template_id) DO UPDATE SET
                weight = MIN(weight + 1.0, ?5),
                count = count + 1,
                last_seen_ms = MAX(last_seen_ms, ?4)
            "#,
        )?
        .execute(params![
            scope,
            prev_template_id,
            &apply.event.template_id,
            ts,
            tuning.score_max,
        ])?;
        return Ok(());
    }

    let old: Option<(f64, i64)> = tx
        .prepare_cached(
            "SELECT weight, last_seen_ms FROM transition_stat
             WHERE scope = ?1 AND prev_template_id = ?2 AND next_template_id = ?3",
        )?
        .query_row(params![scope, prev_template_id, &apply.event.template_id], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .optional()?;
    let decayed = match old {
        Some((weight, last_seen)) => weight * decay_factor(ts - last_seen, tuning.half_life_ms),
        None => 0.0,
    };
    let weight = clamp(decayed + 1.0, tuning.score_min, tuning.score_max);

    tx.prepare_cached(
        r#"
        INSERT INTO transition_stat (scope, prev_template_id, next_template_id, weight, count, last_seen_ms)
        VALUES (?1, ?2, ?3, ?4, 1, ?5)
        ON CONFLICT(scope, prev_template_id, next_template_id) DO UPDATE SET
            weight = ?4,
            count = count + 1,
            last_seen_ms = MAX(last_seen_ms, ?5)
        "#,
    )?
    .execute(params![
        scope,
        prev_template_id,
        &apply.event.template_id,
        weight,
        ts,
    ])?;
    Ok(())
}

fn upsert_slot_stats(tx: &Transaction<'_>, scope: &str, apply: &EventApply) -> Result<()> {
    let ts = apply.event.ts_ms;

    for slot in &apply.slots {
        tx.prepare_cached(
            r#"
            INSERT INTO slot_stat (scope, template_id, slot_index, value, weight, count, last_seen_ms)
            VALUES (?1, ?2, ?3, ?4, 1.0, 1, ?5)
            ON CONFLICT(scope, template_id, slot_index, value) DO UPDATE SET
                weight = weight + 1.0,
                count = count + 1,
                last_seen_ms = MAX(last_seen_ms, ?5)
            "#,
        )?
        .execute(params![
            scope,
            &apply.event.template_id,
            slot.index as i64,
            &slot.value,
            ts,
        ])?;

        // Cardinality cap, LRU by last_seen_ms.
        tx.prepare_cached(
            r#"
            DELETE FROM slot_stat
            WHERE scope = ?1 AND template_id = ?2 AND slot_index = ?3
              AND value NOT IN (
                  SELECT value FROM slot_stat
                  WHERE scope = ?1 AND template_id = ?2 AND slot_index = ?3
                  ORDER BY last_seen_ms DESC, value ASC
                  LIMIT ?4
              )
            "#,
        )?
        .execute(params![
            scope,
            &apply.event.template_id,
            slot.index as i64,
            apply.tuning.slot_value_cap as i64,
        ])?;
    }
    Ok(())
}
