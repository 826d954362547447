// ==========================================
// 生产计划排队系统 - API 层
// ==========================================
// 职责: 请求级工作单元, 供命令行与调度器调用
// ==========================================

pub mod capacity_api;
pub mod error;
pub mod queue_api;
pub mod sheet_api;

// 重导出核心类型
pub use capacity_api::CapacityApi;
pub use error::{ApiError, ApiResult};
pub use queue_api::{QueueApi, UnitQueueStatus};
pub use sheet_api::PlanningSheetApi;
