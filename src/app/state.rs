// ==========================================
// 生产计划排队系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// 说明: 全部仓储共享同一个 SQLite 连接; 分配规则集启动时加载一次
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{CapacityApi, PlanningSheetApi, QueueApi};
use crate::config::{ConfigManager, PlanningConfigReader};
use crate::db::{ensure_schema, open_sqlite_connection};
use crate::engine::{CompletionPredicate, NoCompletionPredicate, UnitAllocator, UnitLocks};
use crate::repository::{PlanningSheetRepository, UnitCapacityRepository};
use crate::scheduler::PlanningScheduler;

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// 计划单API
    pub sheet_api: Arc<PlanningSheetApi>,

    /// 机组队列API
    pub queue_api: Arc<QueueApi>,

    /// 机组产能API
    pub capacity_api: Arc<CapacityApi>,

    /// 启动时加载的分配规则集版本
    pub rule_set_version: String,
}

impl AppState {
    /// 创建新的AppState实例（完工判定使用空实现）
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: String) -> Result<Self, String> {
        Self::with_completion_predicate(db_path, Arc::new(NoCompletionPredicate))
    }

    /// 创建AppState并指定完工判定实现
    ///
    /// 该方法会：
    /// 1. 打开数据库并建表
    /// 2. 加载分配规则集
    /// 3. 初始化Repository与API
    pub fn with_completion_predicate(
        db_path: String,
        completion: Arc<dyn CompletionPredicate>,
    ) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        ensure_schema(&conn).map_err(|e| format!("数据库建表失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 配置
        // ==========================================
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        let rule_set = config_manager
            .load_rule_set()
            .map_err(|e| format!("分配规则加载失败: {}", e))?;
        let rule_set_version = rule_set.version.clone();
        tracing::info!(
            version = %rule_set_version,
            rules = rule_set.rules.len(),
            "分配规则集已加载"
        );

        // ==========================================
        // Repository / Engine
        // ==========================================
        let sheet_repo = Arc::new(PlanningSheetRepository::new(conn.clone()));
        let capacity_repo = Arc::new(UnitCapacityRepository::from_connection(conn.clone()));
        let allocator = Arc::new(UnitAllocator::new(Arc::new(rule_set)));
        let unit_locks = Arc::new(UnitLocks::new());

        // ==========================================
        // API
        // ==========================================
        let sheet_api = Arc::new(PlanningSheetApi::new(
            sheet_repo.clone(),
            capacity_repo.clone(),
            allocator.clone(),
            unit_locks.clone(),
        ));
        let queue_api = Arc::new(QueueApi::new(
            sheet_repo.clone(),
            capacity_repo.clone(),
            allocator,
            unit_locks.clone(),
            completion,
        ));
        let capacity_api = Arc::new(CapacityApi::new(sheet_repo, capacity_repo, unit_locks));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            config_manager,
            sheet_api,
            queue_api,
            capacity_api,
            rule_set_version,
        })
    }

    /// 按配置的间隔创建周期任务调度器
    pub async fn build_scheduler(&self) -> Result<PlanningScheduler, String> {
        let capacity_interval = self
            .config_manager
            .get_capacity_recompute_interval()
            .await
            .map_err(|e| format!("读取台账重算间隔失败: {}", e))?;
        let refresh_interval = self
            .config_manager
            .get_queue_refresh_interval()
            .await
            .map_err(|e| format!("读取队列刷新间隔失败: {}", e))?;

        Ok(PlanningScheduler::new(
            self.queue_api.clone(),
            capacity_interval,
            refresh_interval,
        ))
    }
}

/// 获取默认数据库路径
///
/// 优先级: 环境变量 PRODUCTION_PLANNING_DB → 用户数据目录 → 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("PRODUCTION_PLANNING_DB") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./production_planning.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("production-planning");
        // 目录创建失败时回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("production_planning.db");
        }
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }

    #[test]
    fn test_app_state_uses_builtin_rules_on_fresh_db() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let state = AppState::new(file.path().to_string_lossy().to_string()).unwrap();
        assert_eq!(state.rule_set_version, "v1");
        assert_eq!(
            state.queue_api.get_recommendation("PLATINUM", 70.0).as_deref(),
            Some("Unit 1")
        );
    }
}
