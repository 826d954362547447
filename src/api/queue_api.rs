// ==========================================
// 生产计划排队系统 - 机组队列 API
// ==========================================
// 职责:
// - 机组队列状态查询 (按序号升序 + 产能快照)
// - 机组推荐 (纯规则求值)
// - 产能台账重算 (单机组 / 全部启用机组, 每日任务)
// - 生产队列刷新 (每小时任务, 只汇报完工候选, 不做状态转换)
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::capacity::{CapacitySnapshot, UnitCapacity};
use crate::domain::sheet::QueueEntry;
use crate::domain::types::PlanningStatus;
use crate::engine::completion::inspect_unit;
use crate::engine::sequencer::lock_unit;
use crate::engine::{CapacityLedger, CompletionPredicate, UnitAllocator, UnitLocks, UnitRefreshReport};
use crate::repository::{PlanningSheetRepository, UnitCapacityRepository};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// 机组队列状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitQueueStatus {
    pub unit: String,
    /// 在队计划单（按排队序号升序）
    pub sheets: Vec<QueueEntry>,
    /// 产能快照（机组无产能记录时为 None）
    pub capacity: Option<CapacitySnapshot>,
}

// ==========================================
// QueueApi - 机组队列API
// ==========================================
pub struct QueueApi {
    sheet_repo: Arc<PlanningSheetRepository>,
    capacity_repo: Arc<UnitCapacityRepository>,
    allocator: Arc<UnitAllocator>,
    unit_locks: Arc<UnitLocks>,
    completion: Arc<dyn CompletionPredicate>,
    ledger: CapacityLedger,
}

impl QueueApi {
    pub fn new(
        sheet_repo: Arc<PlanningSheetRepository>,
        capacity_repo: Arc<UnitCapacityRepository>,
        allocator: Arc<UnitAllocator>,
        unit_locks: Arc<UnitLocks>,
        completion: Arc<dyn CompletionPredicate>,
    ) -> Self {
        Self {
            sheet_repo,
            capacity_repo,
            allocator,
            unit_locks,
            completion,
            ledger: CapacityLedger::new(),
        }
    }

    /// 查询机组队列状态
    pub fn get_unit_queue_status(&self, unit: &str) -> ApiResult<UnitQueueStatus> {
        if unit.trim().is_empty() {
            return Err(ApiError::InvalidInput("机组名称不能为空".to_string()));
        }

        let sheets =
            self.sheet_repo
                .find_queue_by_unit(unit, &PlanningStatus::queued_states(), None)?;
        let capacity = self
            .capacity_repo
            .find_by_unit(unit)?
            .map(|record| CapacitySnapshot::from(&record));

        Ok(UnitQueueStatus {
            unit: unit.to_string(),
            sheets,
            capacity,
        })
    }

    /// 按 (品质, 克重) 推荐机组（不加权、不修改任何状态）
    pub fn get_recommendation(&self, quality: &str, gsm: f64) -> Option<String> {
        self.allocator.recommend(quality, gsm)
    }

    /// 重算单个机组的产能台账
    ///
    /// # 错误
    /// - NotFound: 机组无产能记录
    #[instrument(skip(self))]
    pub fn recompute_unit(&self, unit: &str) -> ApiResult<UnitCapacity> {
        let handle = self
            .unit_locks
            .handle(unit)
            .map_err(ApiError::InternalError)?;
        let _guard = lock_unit(&handle).map_err(ApiError::InternalError)?;

        let record = self
            .capacity_repo
            .find_by_unit(unit)?
            .ok_or_else(|| ApiError::NotFound(format!("机组{}无产能记录", unit)))?;
        let active =
            self.sheet_repo
                .find_queue_by_unit(unit, &PlanningStatus::queued_states(), None)?;

        let updated = self
            .ledger
            .recompute(&record, &active, chrono::Local::now().naive_local());
        self.capacity_repo.upsert(&updated)?;
        Ok(updated)
    }

    /// 重算全部启用机组的产能台账（每日任务）
    ///
    /// 单个机组失败时记录错误并继续, 返回成功重算的记录
    #[instrument(skip(self))]
    pub fn recompute_all_active_units(&self) -> ApiResult<Vec<UnitCapacity>> {
        let units = self.capacity_repo.list_active()?;
        let mut updated = Vec::with_capacity(units.len());

        for record in units {
            match self.recompute_unit(&record.unit_name) {
                Ok(capacity) => updated.push(capacity),
                Err(e) => warn!(unit = %record.unit_name, error = %e, "机组台账重算失败"),
            }
        }

        info!(units = updated.len(), "启用机组台账重算完成");
        Ok(updated)
    }

    /// 刷新生产队列（每小时任务）
    ///
    /// 对每个启用机组的生产中计划单询问完工判定, 只返回候选, 不做状态转换
    #[instrument(skip(self), fields(predicate = %self.completion.name()))]
    pub fn refresh_production_queue(&self) -> ApiResult<Vec<UnitRefreshReport>> {
        let units = self.capacity_repo.list_active()?;
        let mut reports = Vec::with_capacity(units.len());

        for record in units {
            let in_production = self.sheet_repo.find_queue_by_unit(
                &record.unit_name,
                &[PlanningStatus::InProduction],
                None,
            )?;
            let report = inspect_unit(self.completion.as_ref(), &record.unit_name, &in_production);
            if !report.completion_candidates.is_empty() {
                info!(
                    unit = %report.unit,
                    candidates = report.completion_candidates.len(),
                    "发现完工候选计划单（未做状态转换）"
                );
            }
            reports.push(report);
        }

        Ok(reports)
    }
}
