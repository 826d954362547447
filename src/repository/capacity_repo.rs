// ==========================================
// 生产计划排队系统 - 机组产能数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::capacity::UnitCapacity;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"
    SELECT
        unit_name, day_shift_capacity_kg, night_shift_capacity_kg,
        current_queue_weight, queue_count, available_capacity,
        is_active, last_updated
    FROM unit_capacity
"#;

// ==========================================
// UnitCapacityRepository - 机组产能仓储
// ==========================================

/// 机组产能仓储
/// 职责: 管理unit_capacity表的读写
pub struct UnitCapacityRepository {
    conn: Arc<Mutex<Connection>>,
}

impl UnitCapacityRepository {
    /// 创建新的机组产能仓储实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按机组名称查询产能记录
    ///
    /// # 返回
    /// - Ok(Some(UnitCapacity)): 找到记录
    /// - Ok(None): 未找到
    /// - Err: 数据库错误
    pub fn find_by_unit(&self, unit_name: &str) -> RepositoryResult<Option<UnitCapacity>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE unit_name = ?1", SELECT_COLUMNS);
        let record = conn
            .query_row(&sql, params![unit_name], map_row)
            .optional()?;
        Ok(record)
    }

    /// 查询全部机组产能记录（按机组名称排序）
    pub fn list_all(&self) -> RepositoryResult<Vec<UnitCapacity>> {
        let conn = self.get_conn()?;
        let sql = format!("{} ORDER BY unit_name", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map([], map_row)?
            .collect::<SqliteResult<Vec<UnitCapacity>>>()?;
        Ok(records)
    }

    /// 查询启用中的机组产能记录
    pub fn list_active(&self) -> RepositoryResult<Vec<UnitCapacity>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE is_active = 1 ORDER BY unit_name", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map([], map_row)?
            .collect::<SqliteResult<Vec<UnitCapacity>>>()?;
        Ok(records)
    }

    /// 整条写回产能记录（不存在则插入）
    pub fn upsert(&self, record: &UnitCapacity) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        write_capacity(&conn, record)?;
        Ok(())
    }

    /// 批量写回产能记录（单事务）
    ///
    /// # 返回
    /// - Ok(usize): 写入的记录数
    pub fn upsert_batch(&self, records: &[UnitCapacity]) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let mut count = 0;
        for record in records {
            count += write_capacity(&tx, record)?;
        }

        tx.commit()?;
        Ok(count)
    }
}

/// 写回一条产能记录（供其他仓储在同一事务中复用）
pub(crate) fn write_capacity(conn: &Connection, record: &UnitCapacity) -> SqliteResult<usize> {
    conn.execute(
        r#"
        INSERT INTO unit_capacity (
            unit_name, day_shift_capacity_kg, night_shift_capacity_kg,
            current_queue_weight, queue_count, available_capacity,
            is_active, last_updated
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(unit_name) DO UPDATE SET
            day_shift_capacity_kg = excluded.day_shift_capacity_kg,
            night_shift_capacity_kg = excluded.night_shift_capacity_kg,
            current_queue_weight = excluded.current_queue_weight,
            queue_count = excluded.queue_count,
            available_capacity = excluded.available_capacity,
            is_active = excluded.is_active,
            last_updated = excluded.last_updated
        "#,
        params![
            record.unit_name,
            record.day_shift_capacity_kg,
            record.night_shift_capacity_kg,
            record.current_queue_weight,
            record.queue_count,
            record.available_capacity,
            record.is_active,
            record.last_updated,
        ],
    )
}

fn map_row(row: &Row<'_>) -> SqliteResult<UnitCapacity> {
    Ok(UnitCapacity {
        unit_name: row.get(0)?,
        day_shift_capacity_kg: row.get(1)?,
        night_shift_capacity_kg: row.get(2)?,
        current_queue_weight: row.get(3)?,
        queue_count: row.get(4)?,
        available_capacity: row.get(5)?,
        is_active: row.get(6)?,
        last_updated: row.get(7)?,
    })
}
