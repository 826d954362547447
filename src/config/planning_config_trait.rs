// ==========================================
// 生产计划排队系统 - 计划配置读取 Trait
// ==========================================
// 职责: 定义调度与分配所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::config::allocation_rules::AllocationRuleSet;
use async_trait::async_trait;
use std::error::Error;
use std::time::Duration;

// ==========================================
// PlanningConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait PlanningConfigReader: Send + Sync {
    /// 获取机组分配规则集
    ///
    /// # 默认值
    /// - 内置 v1 规则集（配置缺失或非法时）
    async fn get_allocation_rules(&self) -> Result<AllocationRuleSet, Box<dyn Error + Send + Sync>>;

    /// 产能台账全量重算间隔
    ///
    /// # 默认值
    /// - 86400 秒（每日）
    async fn get_capacity_recompute_interval(&self) -> Result<Duration, Box<dyn Error + Send + Sync>>;

    /// 生产队列刷新间隔
    ///
    /// # 默认值
    /// - 3600 秒（每小时）
    async fn get_queue_refresh_interval(&self) -> Result<Duration, Box<dyn Error + Send + Sync>>;
}
