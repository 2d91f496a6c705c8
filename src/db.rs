// ==========================================
// 任务规划控制台 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键 + busy_timeout）
// - 本地后端的建表语句集中于此，幂等执行
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 建立本地后端所需的全部表（幂等）
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
          version INTEGER PRIMARY KEY,
          applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
          scope_id TEXT NOT NULL DEFAULT 'global',
          key TEXT NOT NULL,
          value TEXT NOT NULL,
          updated_at TEXT NOT NULL DEFAULT (datetime('now')),
          PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS mission (
          mission_id INTEGER PRIMARY KEY AUTOINCREMENT,
          name TEXT NOT NULL,
          status TEXT NOT NULL DEFAULT 'planning',
          duration_weeks INTEGER NOT NULL CHECK(duration_weeks >= 1),
          crew_hours_per_week REAL NOT NULL CHECK(crew_hours_per_week >= 0),
          crew_count INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS catalog_entity (
          entity_id INTEGER NOT NULL,
          kind TEXT NOT NULL CHECK(kind IN ('material', 'method', 'output', 'item', 'substitute')),
          name TEXT NOT NULL,
          category TEXT NOT NULL DEFAULT '',
          PRIMARY KEY (kind, entity_id)
        );

        CREATE TABLE IF NOT EXISTS job (
          job_id INTEGER PRIMARY KEY AUTOINCREMENT,
          mission_id INTEGER NOT NULL REFERENCES mission(mission_id),
          status TEXT NOT NULL,
          total_weeks INTEGER NOT NULL CHECK(total_weeks >= 1),
          weights_json TEXT NOT NULL,
          name TEXT NOT NULL,
          description TEXT,
          result_summary_json TEXT,
          result_bundle_json TEXT,
          solver_status TEXT,
          created_at TEXT NOT NULL,
          started_at TEXT,
          completed_at TEXT,
          error_message TEXT
        );

        CREATE TABLE IF NOT EXISTS job_enabled_entity (
          job_id INTEGER NOT NULL REFERENCES job(job_id) ON DELETE CASCADE,
          kind TEXT NOT NULL,
          entity_id INTEGER NOT NULL,
          PRIMARY KEY (job_id, kind, entity_id),
          FOREIGN KEY (kind, entity_id) REFERENCES catalog_entity(kind, entity_id)
        );

        CREATE TABLE IF NOT EXISTS job_inventory (
          job_id INTEGER NOT NULL REFERENCES job(job_id) ON DELETE CASCADE,
          kind TEXT NOT NULL,
          entity_id INTEGER NOT NULL,
          quantity REAL NOT NULL CHECK(quantity >= 0),
          PRIMARY KEY (job_id, kind, entity_id)
        );

        CREATE TABLE IF NOT EXISTS job_item_demand (
          entry_id INTEGER PRIMARY KEY AUTOINCREMENT,
          job_id INTEGER NOT NULL REFERENCES job(job_id) ON DELETE CASCADE,
          item_id INTEGER NOT NULL,
          week INTEGER NOT NULL,
          amount REAL NOT NULL CHECK(amount >= 0)
        );

        CREATE TABLE IF NOT EXISTS job_deadline (
          entry_id INTEGER PRIMARY KEY AUTOINCREMENT,
          job_id INTEGER NOT NULL REFERENCES job(job_id) ON DELETE CASCADE,
          item_id INTEGER NOT NULL,
          week INTEGER NOT NULL,
          amount REAL NOT NULL CHECK(amount >= 0)
        );

        CREATE TABLE IF NOT EXISTS job_week_resource (
          job_id INTEGER NOT NULL REFERENCES job(job_id) ON DELETE CASCADE,
          week INTEGER NOT NULL,
          crew_hours REAL NOT NULL CHECK(crew_hours >= 0),
          energy REAL NOT NULL CHECK(energy >= 0),
          PRIMARY KEY (job_id, week)
        );

        CREATE TABLE IF NOT EXISTS job_method_capacity (
          job_id INTEGER NOT NULL REFERENCES job(job_id) ON DELETE CASCADE,
          method_id INTEGER NOT NULL,
          week INTEGER NOT NULL,
          max_capacity_kg REAL NOT NULL CHECK(max_capacity_kg >= 0),
          available INTEGER NOT NULL DEFAULT 1,
          PRIMARY KEY (job_id, method_id, week)
        );

        CREATE INDEX IF NOT EXISTS idx_job_mission ON job(mission_id);
        CREATE INDEX IF NOT EXISTS idx_job_status ON job(status);
        CREATE INDEX IF NOT EXISTS idx_item_demand_job ON job_item_demand(job_id);
        CREATE INDEX IF NOT EXISTS idx_deadline_job ON job_deadline(job_id);
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();

        assert_eq!(read_schema_version(&conn).unwrap(), None);
        ensure_schema(&conn).unwrap();
        ensure_schema(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }
}
