// ==========================================
// 生产计划排队系统 - 应用层
// ==========================================
// 职责: 组装仓储/引擎/API 与调度器, 供命令行入口使用
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};
