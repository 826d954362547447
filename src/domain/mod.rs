// ==========================================
// 生产计划排队系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体与类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod capacity;
pub mod sheet;
pub mod types;

// 重导出核心类型
pub use capacity::{CapacitySnapshot, DailyCapacity, UnitCapacity};
pub use sheet::{PlanningSheet, QueueEntry, SheetItem};
pub use types::{DocStatus, PlanningStatus};
