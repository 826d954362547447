// ==========================================
// 生产计划排队系统 - 配置层
// ==========================================
// 职责: 系统配置管理 (分配规则集、调度间隔)
// 存储: config_kv 表
// ==========================================

pub mod allocation_rules;
pub mod config_manager;
pub mod planning_config_trait;

// 重导出核心配置管理器
pub use allocation_rules::{AllocationRule, AllocationRuleSet};
pub use config_manager::{config_keys, ConfigManager};
pub use planning_config_trait::PlanningConfigReader;
