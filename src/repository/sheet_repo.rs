// ==========================================
// 生产计划排队系统 - 计划单数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 约束: 计划单与明细整体写入（单事务），明细按 row_index 保序
// ==========================================

use crate::domain::capacity::UnitCapacity;
use crate::domain::sheet::{PlanningSheet, QueueEntry, SheetItem};
use crate::domain::types::{DocStatus, PlanningStatus};
use crate::repository::capacity_repo::write_capacity;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// PlanningSheetRepository - 计划单仓储
// ==========================================
pub struct PlanningSheetRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PlanningSheetRepository {
    /// 创建新的PlanningSheetRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 保存计划单（不存在则插入，存在则整体覆盖，明细重写）
    pub fn save(&self, sheet: &PlanningSheet) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        write_sheet(&tx, sheet)?;
        tx.commit()?;
        Ok(())
    }

    /// 保存计划单并同时写回机组产能记录（单事务，任一失败全部回滚）
    ///
    /// 用于定稿/作废等同时改变在队集合与台账的操作
    pub fn save_with_capacity(
        &self,
        sheet: &PlanningSheet,
        capacity: Option<&UnitCapacity>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        write_sheet(&tx, sheet)?;
        if let Some(record) = capacity {
            write_capacity(&tx, record)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// 按sheet_id查询计划单（含明细）
    ///
    /// # 返回
    /// - `Ok(Some(PlanningSheet))`: 找到计划单
    /// - `Ok(None)`: 未找到
    pub fn find_by_id(&self, sheet_id: &str) -> RepositoryResult<Option<PlanningSheet>> {
        let conn = self.get_conn()?;

        let sheet = conn
            .query_row(
                r#"SELECT sheet_id, sales_order, customer, delivery_date,
                          total_quantity, total_weight, allocated_unit,
                          unit_capacity_day, unit_capacity_night, estimated_production_days,
                          planning_status, doc_status, queue_position,
                          created_at, updated_at
                   FROM planning_sheet
                   WHERE sheet_id = ?1"#,
                params![sheet_id],
                map_sheet_row,
            )
            .optional()?;

        let mut sheet = match sheet {
            Some(s) => s,
            None => return Ok(None),
        };

        let mut stmt = conn.prepare(
            r#"SELECT item_code, item_name, qty, weight_per_roll, no_of_rolls,
                      total_weight, gsm, quality, color, allocated_to_unit
               FROM planning_sheet_item
               WHERE sheet_id = ?1
               ORDER BY row_index"#,
        )?;
        sheet.items = stmt
            .query_map(params![sheet_id], map_item_row)?
            .collect::<SqliteResult<Vec<SheetItem>>>()?;

        Ok(Some(sheet))
    }

    /// 查询机组队列（仅已提交计划单）
    ///
    /// # 参数
    /// - `unit`: 机组名称
    /// - `statuses`: 计划状态集合
    /// - `exclude_sheet_id`: 需排除的计划单（通常是当前计划单自身）
    ///
    /// # 返回
    /// 按 queue_position 升序排列
    pub fn find_queue_by_unit(
        &self,
        unit: &str,
        statuses: &[PlanningStatus],
        exclude_sheet_id: Option<&str>,
    ) -> RepositoryResult<Vec<QueueEntry>> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.get_conn()?;

        let placeholders = (0..statuses.len())
            .map(|i| format!("?{}", i + 4))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            r#"SELECT sheet_id, customer, total_weight, queue_position,
                      delivery_date, planning_status
               FROM planning_sheet
               WHERE allocated_unit = ?1
                 AND doc_status = ?2
                 AND (?3 IS NULL OR sheet_id <> ?3)
                 AND planning_status IN ({})
               ORDER BY queue_position ASC, created_at ASC"#,
            placeholders
        );

        let mut values: Vec<Option<String>> = vec![
            Some(unit.to_string()),
            Some(DocStatus::Committed.as_str().to_string()),
            exclude_sheet_id.map(str::to_string),
        ];
        values.extend(statuses.iter().map(|s| Some(s.as_str().to_string())));

        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map(params_from_iter(values.iter()), |row| {
                Ok(QueueEntry {
                    sheet_id: row.get(0)?,
                    customer: row.get(1)?,
                    total_weight: row.get(2)?,
                    queue_position: row.get(3)?,
                    delivery_date: row.get(4)?,
                    planning_status: PlanningStatus::from_str(&row.get::<_, String>(5)?),
                })
            })?
            .collect::<SqliteResult<Vec<QueueEntry>>>()?;

        Ok(entries)
    }

    /// 查询尚未分配机组的计划单（草稿或已提交，不含作废），供人工处理
    pub fn list_unallocated(&self) -> RepositoryResult<Vec<QueueEntry>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT sheet_id, customer, total_weight, queue_position,
                      delivery_date, planning_status
               FROM planning_sheet
               WHERE allocated_unit IS NULL AND doc_status <> 'CANCELLED'
               ORDER BY created_at ASC"#,
        )?;
        let entries = stmt
            .query_map([], |row| {
                Ok(QueueEntry {
                    sheet_id: row.get(0)?,
                    customer: row.get(1)?,
                    total_weight: row.get(2)?,
                    queue_position: row.get(3)?,
                    delivery_date: row.get(4)?,
                    planning_status: PlanningStatus::from_str(&row.get::<_, String>(5)?),
                })
            })?
            .collect::<SqliteResult<Vec<QueueEntry>>>()?;
        Ok(entries)
    }
}

/// 写入计划单主表 + 重写明细
fn write_sheet(conn: &Connection, sheet: &PlanningSheet) -> SqliteResult<()> {
    conn.execute(
        r#"INSERT INTO planning_sheet (
                sheet_id, sales_order, customer, delivery_date,
                total_quantity, total_weight, allocated_unit,
                unit_capacity_day, unit_capacity_night, estimated_production_days,
                planning_status, doc_status, queue_position,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            ON CONFLICT(sheet_id) DO UPDATE SET
                sales_order = excluded.sales_order,
                customer = excluded.customer,
                delivery_date = excluded.delivery_date,
                total_quantity = excluded.total_quantity,
                total_weight = excluded.total_weight,
                allocated_unit = excluded.allocated_unit,
                unit_capacity_day = excluded.unit_capacity_day,
                unit_capacity_night = excluded.unit_capacity_night,
                estimated_production_days = excluded.estimated_production_days,
                planning_status = excluded.planning_status,
                doc_status = excluded.doc_status,
                queue_position = excluded.queue_position,
                updated_at = excluded.updated_at"#,
        params![
            sheet.sheet_id,
            sheet.sales_order,
            sheet.customer,
            sheet.delivery_date,
            sheet.total_quantity,
            sheet.total_weight,
            sheet.allocated_unit,
            sheet.unit_capacity_day,
            sheet.unit_capacity_night,
            sheet.estimated_production_days,
            sheet.planning_status.as_str(),
            sheet.doc_status.as_str(),
            sheet.queue_position,
            sheet.created_at,
            sheet.updated_at,
        ],
    )?;

    conn.execute(
        "DELETE FROM planning_sheet_item WHERE sheet_id = ?1",
        params![sheet.sheet_id],
    )?;

    let mut stmt = conn.prepare(
        r#"INSERT INTO planning_sheet_item (
                sheet_id, row_index, item_code, item_name, qty,
                weight_per_roll, no_of_rolls, total_weight, gsm,
                quality, color, allocated_to_unit
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"#,
    )?;
    for (row_index, item) in sheet.items.iter().enumerate() {
        stmt.execute(params![
            sheet.sheet_id,
            row_index as i64,
            item.item_code,
            item.item_name,
            item.qty,
            item.weight_per_roll,
            item.no_of_rolls,
            item.total_weight,
            item.gsm,
            item.quality,
            item.color,
            item.allocated_to_unit,
        ])?;
    }

    Ok(())
}

fn map_sheet_row(row: &Row<'_>) -> SqliteResult<PlanningSheet> {
    Ok(PlanningSheet {
        sheet_id: row.get(0)?,
        sales_order: row.get(1)?,
        customer: row.get(2)?,
        delivery_date: row.get(3)?,
        items: Vec::new(),
        total_quantity: row.get(4)?,
        total_weight: row.get(5)?,
        allocated_unit: row.get(6)?,
        unit_capacity_day: row.get(7)?,
        unit_capacity_night: row.get(8)?,
        estimated_production_days: row.get(9)?,
        planning_status: PlanningStatus::from_str(&row.get::<_, String>(10)?),
        doc_status: DocStatus::from_str(&row.get::<_, String>(11)?),
        queue_position: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

fn map_item_row(row: &Row<'_>) -> SqliteResult<SheetItem> {
    Ok(SheetItem {
        item_code: row.get(0)?,
        item_name: row.get(1)?,
        qty: row.get(2)?,
        weight_per_roll: row.get(3)?,
        no_of_rolls: row.get(4)?,
        total_weight: row.get(5)?,
        gsm: row.get(6)?,
        quality: row.get(7)?,
        color: row.get(8)?,
        allocated_to_unit: row.get(9)?,
    })
}
