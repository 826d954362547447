// ==========================================
// 生产计划排队系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite + tokio
// 系统定位: 计划单机组分配 + 机组排队 + 产能台账
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 调度层 - 周期任务
pub mod scheduler;

// 应用层 - 组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{DocStatus, PlanningStatus};

// 领域实体
pub use domain::{CapacitySnapshot, PlanningSheet, QueueEntry, SheetItem, UnitCapacity};

// 引擎
pub use engine::{
    CapacityLedger, CompletionPredicate, QueueSequencer, SheetAggregator, TextClassifier,
    UnitAllocator,
};

// 配置
pub use config::{AllocationRule, AllocationRuleSet, ConfigManager};

// API
pub use api::{ApiError, ApiResult, CapacityApi, PlanningSheetApi, QueueApi, UnitQueueStatus};

// 调度
pub use scheduler::PlanningScheduler;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "生产计划排队系统";
