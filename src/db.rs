use std::time::Duration;

use rusqlite::types::ToSql;
use rusqlite::{params, Connection, DatabaseName, OptionalExtension, Result};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub const CURRENT_SCHEMA_VERSION: i64 = 1;

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: [Migration; 1] = [Migration {
    version: 1,
    name: "baseline_activity_schema_v1",
    sql: r#"
CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS activity (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    activity_type TEXT NOT NULL,
    scheduled_date TEXT NOT NULL,
    duration_minutes INTEGER NOT NULL,
    priority TEXT NOT NULL,
    status TEXT NOT NULL,
    planned_hectares REAL,
    completed_hectares REAL,
    notes TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_activity_scheduled_date ON activity(scheduled_date);
CREATE INDEX IF NOT EXISTS idx_activity_status ON activity(status);
"#,
}];

pub fn open_connection(path: &str) -> Result<Connection> {
    let mut conn = Connection::open(path)?;
    configure_for_speed(&conn)?;
    apply_migrations(&mut conn)?;
    Ok(conn)
}

fn configure_for_speed(conn: &Connection) -> Result<()> {
    conn.pragma_update(None::<DatabaseName>, "journal_mode", "WAL")?;
    conn.pragma_update(None::<DatabaseName>, "synchronous", "NORMAL")?;
    conn.pragma_update(None::<DatabaseName>, "foreign_keys", "ON")?;
    conn.pragma_update(None::<DatabaseName>, "temp_store", "MEMORY")?;
    conn.pragma_update(None::<DatabaseName>, "busy_timeout", 5000i64)?;
    conn.busy_timeout(Duration::from_millis(5000))?;
    Ok(())
}

fn apply_migrations(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL
);
"#,
    )?;

    for migration in MIGRATIONS {
        let already_applied: Option<i64> = tx
            .query_row(
                "SELECT version FROM schema_migrations WHERE version = ?1",
                params![migration.version],
                |row| row.get(0),
            )
            .optional()?;

        if already_applied.is_some() {
            continue;
        }

        tx.execute_batch(migration.sql)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
            params![migration.version, migration.name, now_utc_rfc3339()],
        )?;
    }

    tx.execute(
        r#"
INSERT INTO meta (key, value)
VALUES ('schema_version', ?1)
ON CONFLICT(key) DO UPDATE SET value = excluded.value
"#,
        params![CURRENT_SCHEMA_VERSION.to_string()],
    )?;

    tx.commit()
}

pub fn now_utc_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .expect("RFC3339 formatting for UTC timestamp should never fail")
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActivityRecord {
    pub id: String,
    pub name: String,
    pub activity_type: String,
    pub scheduled_date: String,
    pub duration_minutes: i64,
    pub priority: String,
    pub status: String,
    pub planned_hectares: Option<f64>,
    pub completed_hectares: Option<f64>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

pub struct NewActivityRow<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub activity_type: &'a str,
    pub scheduled_date: &'a str,
    pub duration_minutes: i64,
    pub priority: &'a str,
    pub status: &'a str,
    pub planned_hectares: Option<f64>,
    pub created_at: &'a str,
}

/// Partial update. `None` fields are left untouched; `updated_at` is
/// always refreshed.
#[derive(Debug, Clone, Default)]
pub struct ActivityPatch {
    pub name: Option<String>,
    pub activity_type: Option<String>,
    pub scheduled_date: Option<String>,
    pub duration_minutes: Option<i64>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub planned_hectares: Option<f64>,
    pub completed_hectares: Option<f64>,
    pub notes: Option<String>,
}

/// AND-combined filter over activities; results always come back ordered
/// by `scheduled_date` ascending.
#[derive(Debug, Clone, Default)]
pub struct ActivityQuery {
    pub name_like: Option<String>,
    pub scheduled_gte: Option<String>,
    pub scheduled_lte: Option<String>,
    pub scheduled_lt: Option<String>,
    pub status_in: Vec<String>,
    pub id_not: Option<String>,
    pub activity_type: Option<String>,
}

pub fn insert_activity(conn: &Connection, row: &NewActivityRow<'_>) -> Result<()> {
    conn.execute(
        r#"
INSERT INTO activity (
    id, name, activity_type, scheduled_date, duration_minutes,
    priority, status, planned_hectares, created_at, updated_at
)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
"#,
        params![
            row.id,
            row.name,
            row.activity_type,
            row.scheduled_date,
            row.duration_minutes,
            row.priority,
            row.status,
            row.planned_hectares,
            row.created_at,
        ],
    )?;
    Ok(())
}

pub fn get_activity(conn: &Connection, id: &str) -> Result<Option<ActivityRecord>> {
    conn.query_row(
        &format!("SELECT {ACTIVITY_COLUMNS} FROM activity WHERE id = ?1"),
        params![id],
        row_to_activity,
    )
    .optional()
}

pub fn update_activity(
    conn: &Connection,
    id: &str,
    patch: &ActivityPatch,
) -> Result<Option<ActivityRecord>> {
    let mut assignments: Vec<&'static str> = Vec::new();
    let mut values: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(name) = patch.name.as_deref() {
        assignments.push("name = ?");
        values.push(Box::new(name.to_string()));
    }
    if let Some(kind) = patch.activity_type.as_deref() {
        assignments.push("activity_type = ?");
        values.push(Box::new(kind.to_string()));
    }
    if let Some(date) = patch.scheduled_date.as_deref() {
        assignments.push("scheduled_date = ?");
        values.push(Box::new(date.to_string()));
    }
    if let Some(duration) = patch.duration_minutes {
        assignments.push("duration_minutes = ?");
        values.push(Box::new(duration));
    }
    if let Some(priority) = patch.priority.as_deref() {
        assignments.push("priority = ?");
        values.push(Box::new(priority.to_string()));
    }
    if let Some(status) = patch.status.as_deref() {
        assignments.push("status = ?");
        values.push(Box::new(status.to_string()));
    }
    if let Some(planned) = patch.planned_hectares {
        assignments.push("planned_hectares = ?");
        values.push(Box::new(planned));
    }
    if let Some(completed) = patch.completed_hectares {
        assignments.push("completed_hectares = ?");
        values.push(Box::new(completed));
    }
    if let Some(notes) = patch.notes.as_deref() {
        assignments.push("notes = ?");
        values.push(Box::new(notes.to_string()));
    }

    assignments.push("updated_at = ?");
    values.push(Box::new(now_utc_rfc3339()));

    let sql = format!(
        "UPDATE activity SET {} WHERE id = ?",
        assignments.join(", ")
    );
    values.push(Box::new(id.to_string()));

    let param_refs: Vec<&dyn ToSql> = values.iter().map(|value| value.as_ref()).collect();
    let changed = conn.execute(&sql, &param_refs[..])?;
    if changed == 0 {
        return Ok(None);
    }
    get_activity(conn, id)
}

pub fn delete_activity(conn: &Connection, id: &str) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM activity WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}

pub fn query_activities(conn: &Connection, query: &ActivityQuery) -> Result<Vec<ActivityRecord>> {
    let mut clauses: Vec<String> = Vec::new();
    let mut values: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(fragment) = query.name_like.as_deref() {
        clauses.push("name LIKE ?".to_string());
        values.push(Box::new(format!("%{fragment}%")));
    }
    if let Some(bound) = query.scheduled_gte.as_deref() {
        clauses.push("scheduled_date >= ?".to_string());
        values.push(Box::new(bound.to_string()));
    }
    if let Some(bound) = query.scheduled_lte.as_deref() {
        clauses.push("scheduled_date <= ?".to_string());
        values.push(Box::new(bound.to_string()));
    }
    if let Some(bound) = query.scheduled_lt.as_deref() {
        clauses.push("scheduled_date < ?".to_string());
        values.push(Box::new(bound.to_string()));
    }
    if !query.status_in.is_empty() {
        let placeholders = vec!["?"; query.status_in.len()].join(", ");
        clauses.push(format!("status IN ({placeholders})"));
        for status in &query.status_in {
            values.push(Box::new(status.clone()));
        }
    }
    if let Some(excluded) = query.id_not.as_deref() {
        clauses.push("id != ?".to_string());
        values.push(Box::new(excluded.to_string()));
    }
    if let Some(kind) = query.activity_type.as_deref() {
        clauses.push("activity_type = ?".to_string());
        values.push(Box::new(kind.to_string()));
    }

    let mut sql = format!("SELECT {ACTIVITY_COLUMNS} FROM activity");
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY scheduled_date ASC, id ASC");

    let param_refs: Vec<&dyn ToSql> = values.iter().map(|value| value.as_ref()).collect();
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(&param_refs[..])?;
    let mut result = Vec::new();
    while let Some(row) = rows.next()? {
        result.push(row_to_activity(row)?);
    }

    Ok(result)
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BlockTotals {
    pub total_activities: i64,
    pub completed_activities: i64,
    pub total_planned_hectares: f64,
    pub total_completed_hectares: f64,
}

/// Aggregates over every activity whose name mentions the block,
/// regardless of status or cycle.
pub fn block_totals(conn: &Connection, block: u32) -> Result<BlockTotals> {
    conn.query_row(
        r#"
SELECT
    COUNT(*),
    COALESCE(SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END), 0),
    COALESCE(SUM(COALESCE(planned_hectares, 0.0)), 0.0),
    COALESCE(SUM(COALESCE(completed_hectares, 0.0)), 0.0)
FROM activity
WHERE name LIKE ?1
"#,
        params![format!("%Bloque {block}%")],
        |row| {
            Ok(BlockTotals {
                total_activities: row.get(0)?,
                completed_activities: row.get(1)?,
                total_planned_hectares: row.get(2)?,
                total_completed_hectares: row.get(3)?,
            })
        },
    )
}

const ACTIVITY_COLUMNS: &str = "id, name, activity_type, scheduled_date, duration_minutes, \
     priority, status, planned_hectares, completed_hectares, notes, created_at, updated_at";

fn row_to_activity(row: &rusqlite::Row<'_>) -> Result<ActivityRecord> {
    Ok(ActivityRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        activity_type: row.get(2)?,
        scheduled_date: row.get(3)?,
        duration_minutes: row.get(4)?,
        priority: row.get(5)?,
        status: row.get(6)?,
        planned_hectares: row.get(7)?,
        completed_hectares: row.get(8)?,
        notes: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}
