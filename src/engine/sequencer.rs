// ==========================================
// 生产计划排队系统 - 排队序号引擎
// ==========================================
// 规则: 新序号 = 本机组在队计划单(已定稿/生产中)最大序号 + 1, 无则为 1
// 红线: 序号只在定稿时分配一次; 作废/完工不重排、不压缩
// 并发: "读最大值 → 写新序号" 必须按机组串行 (UnitLocks)
// ==========================================

use crate::domain::sheet::QueueEntry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// QueueSequencer - 排队序号引擎
// ==========================================
pub struct QueueSequencer {
    // 无状态引擎
}

impl QueueSequencer {
    pub fn new() -> Self {
        Self {}
    }

    /// 计算下一个排队序号
    ///
    /// # 参数
    /// - `others`: 同机组的其他在队计划单（不含当前计划单）
    pub fn next_position(&self, others: &[QueueEntry]) -> i64 {
        others
            .iter()
            .map(|entry| entry.queue_position.unwrap_or(0))
            .max()
            .unwrap_or(0)
            + 1
    }
}

impl Default for QueueSequencer {
    fn default() -> Self {
        Self::new()
    }
}

// ==========================================
// UnitLocks - 按机组串行化
// ==========================================
// 定稿取号与产能台账重算在同一机组上互斥, 不同机组之间互不阻塞
#[derive(Default)]
pub struct UnitLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl UnitLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取机组锁句柄（首次访问时创建）
    pub fn handle(&self, unit: &str) -> Result<Arc<Mutex<()>>, String> {
        let mut map = self
            .locks
            .lock()
            .map_err(|e| format!("机组锁表获取失败: {}", e))?;
        Ok(map
            .entry(unit.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone())
    }
}

/// 锁住机组句柄
pub fn lock_unit(handle: &Arc<Mutex<()>>) -> Result<MutexGuard<'_, ()>, String> {
    handle
        .lock()
        .map_err(|e| format!("机组锁获取失败: {}", e))
}
