// ==========================================
// 生产计划排队系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键、busy_timeout）
// - 统一建表入口, 应用启动与测试共用同一份 schema
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

/// 建表（幂等）并登记 schema_version
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_scope (
            scope_id TEXT PRIMARY KEY,
            scope_type TEXT NOT NULL,
            scope_key TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(scope_type, scope_key)
        );

        INSERT OR IGNORE INTO config_scope (scope_id, scope_type, scope_key)
        VALUES ('global', 'GLOBAL', 'global');

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL REFERENCES config_scope(scope_id) ON DELETE CASCADE,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS unit_capacity (
            unit_name TEXT PRIMARY KEY,
            day_shift_capacity_kg REAL NOT NULL DEFAULT 0,
            night_shift_capacity_kg REAL NOT NULL DEFAULT 0,
            current_queue_weight REAL NOT NULL DEFAULT 0,
            queue_count INTEGER NOT NULL DEFAULT 0,
            available_capacity REAL NOT NULL DEFAULT 0,
            is_active INTEGER NOT NULL DEFAULT 1,
            last_updated TEXT
        );

        CREATE TABLE IF NOT EXISTS planning_sheet (
            sheet_id TEXT PRIMARY KEY,
            sales_order TEXT,
            customer TEXT,
            delivery_date TEXT,
            total_quantity REAL NOT NULL DEFAULT 0,
            total_weight REAL NOT NULL DEFAULT 0,
            allocated_unit TEXT,
            unit_capacity_day REAL,
            unit_capacity_night REAL,
            estimated_production_days REAL,
            planning_status TEXT NOT NULL DEFAULT 'DRAFT',
            doc_status TEXT NOT NULL DEFAULT 'DRAFT',
            queue_position INTEGER,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_planning_sheet_unit_status
          ON planning_sheet(allocated_unit, doc_status, planning_status);

        -- 同一机组在队计划单的序号唯一（并发取号的最后一道防线）
        CREATE UNIQUE INDEX IF NOT EXISTS uq_planning_sheet_active_position
          ON planning_sheet(allocated_unit, queue_position)
          WHERE doc_status = 'COMMITTED'
            AND planning_status IN ('FINALIZED', 'IN_PRODUCTION')
            AND queue_position IS NOT NULL;

        CREATE TABLE IF NOT EXISTS planning_sheet_item (
            sheet_id TEXT NOT NULL REFERENCES planning_sheet(sheet_id) ON DELETE CASCADE,
            row_index INTEGER NOT NULL,
            item_code TEXT,
            item_name TEXT NOT NULL,
            qty REAL NOT NULL DEFAULT 0,
            weight_per_roll REAL,
            no_of_rolls REAL,
            total_weight REAL,
            gsm REAL NOT NULL DEFAULT 0,
            quality TEXT,
            color TEXT,
            allocated_to_unit TEXT,
            PRIMARY KEY (sheet_id, row_index)
        );
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
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

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
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

        assert_eq!(
            read_schema_version(&conn).unwrap(),
            Some(CURRENT_SCHEMA_VERSION)
        );
    }
}
