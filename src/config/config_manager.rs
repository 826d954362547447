// ==========================================
// 生产计划排队系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写
// 存储: config_kv 表 (key-value + scope, 当前仅使用 global)
// ==========================================

use crate::config::allocation_rules::AllocationRuleSet;
use crate::config::planning_config_trait::PlanningConfigReader;
use crate::db::open_sqlite_connection;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::error::Error;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// 默认产能台账重算间隔（秒）
pub const DEFAULT_CAPACITY_RECOMPUTE_SECS: u64 = 86_400;

/// 默认队列刷新间隔（秒）
pub const DEFAULT_QUEUE_REFRESH_SECS: u64 = 3_600;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(
        conn: Arc<Mutex<Connection>>,
    ) -> Result<Self, Box<dyn Error + Send + Sync>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(
        &self,
        key: &str,
    ) -> Result<Option<String>, Box<dyn Error + Send + Sync>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入 global scope 配置（存在则覆盖）
    pub fn set_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at)
             VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at",
            params![key, value],
        )?;
        Ok(())
    }

    /// 读取配置值，带默认值
    fn get_config_or_default(
        &self,
        key: &str,
        default: &str,
    ) -> Result<String, Box<dyn Error + Send + Sync>> {
        Ok(self
            .get_global_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 加载机组分配规则集
    ///
    /// 配置缺失 → 内置 v1; JSON 非法或校验失败 → 记录告警并回退内置 v1
    pub fn load_rule_set(&self) -> Result<AllocationRuleSet, Box<dyn Error + Send + Sync>> {
        let raw = match self.get_global_config_value(config_keys::ALLOCATION_RULES)? {
            Some(v) if !v.trim().is_empty() => v,
            _ => return Ok(AllocationRuleSet::builtin()),
        };

        let parsed = serde_json::from_str::<AllocationRuleSet>(&raw)
            .map_err(|e| e.to_string())
            .and_then(|rules| rules.validate().map(|_| rules));

        match parsed {
            Ok(rules) => {
                tracing::debug!(version = %rules.version, rules = rules.rules.len(), "已加载分配规则集");
                Ok(rules)
            }
            Err(e) => {
                tracing::warn!(
                    config_key = config_keys::ALLOCATION_RULES,
                    error = %e,
                    "分配规则配置无效，回退到内置规则集"
                );
                Ok(AllocationRuleSet::builtin())
            }
        }
    }

    /// 读取以秒为单位的间隔配置（非法或为 0 时取默认值）
    fn get_interval_secs(&self, key: &str, default: u64) -> Result<Duration, Box<dyn Error + Send + Sync>> {
        let value = self.get_config_or_default(key, &default.to_string())?;
        let secs = match value.trim().parse::<u64>() {
            Ok(v) if v > 0 => v,
            _ => {
                tracing::warn!(config_key = key, value = %value, "间隔配置无效，使用默认值");
                default
            }
        };
        Ok(Duration::from_secs(secs))
    }
}

// ==========================================
// PlanningConfigReader Trait 实现
// ==========================================
#[async_trait]
impl PlanningConfigReader for ConfigManager {
    async fn get_allocation_rules(&self) -> Result<AllocationRuleSet, Box<dyn Error + Send + Sync>> {
        self.load_rule_set()
    }

    async fn get_capacity_recompute_interval(&self) -> Result<Duration, Box<dyn Error + Send + Sync>> {
        self.get_interval_secs(
            config_keys::CAPACITY_RECOMPUTE_INTERVAL_SECS,
            DEFAULT_CAPACITY_RECOMPUTE_SECS,
        )
    }

    async fn get_queue_refresh_interval(&self) -> Result<Duration, Box<dyn Error + Send + Sync>> {
        self.get_interval_secs(
            config_keys::QUEUE_REFRESH_INTERVAL_SECS,
            DEFAULT_QUEUE_REFRESH_SECS,
        )
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 机组分配规则集 (JSON)
    pub const ALLOCATION_RULES: &str = "allocation_rules";

    // 调度间隔（秒）
    pub const CAPACITY_RECOMPUTE_INTERVAL_SECS: &str = "capacity_recompute_interval_secs";
    pub const QUEUE_REFRESH_INTERVAL_SECS: &str = "queue_refresh_interval_secs";
}
