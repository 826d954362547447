// ==========================================
// 生产计划排队系统 - 机组产能 API
// ==========================================
// 职责: 机组产能初始化数据维护 (手工录入 / CSV 导入)
// 说明: 写入产能参数后立即按当前在队集合重算负荷, 保持台账一致
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::capacity::UnitCapacity;
use crate::domain::types::PlanningStatus;
use crate::engine::sequencer::lock_unit;
use crate::engine::{CapacityLedger, UnitLocks};
use crate::importer::CsvLoader;
use crate::repository::{PlanningSheetRepository, UnitCapacityRepository};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument};

// ==========================================
// CapacityApi - 机组产能API
// ==========================================
pub struct CapacityApi {
    sheet_repo: Arc<PlanningSheetRepository>,
    capacity_repo: Arc<UnitCapacityRepository>,
    unit_locks: Arc<UnitLocks>,
    ledger: CapacityLedger,
    loader: CsvLoader,
}

impl CapacityApi {
    pub fn new(
        sheet_repo: Arc<PlanningSheetRepository>,
        capacity_repo: Arc<UnitCapacityRepository>,
        unit_locks: Arc<UnitLocks>,
    ) -> Self {
        Self {
            sheet_repo,
            capacity_repo,
            unit_locks,
            ledger: CapacityLedger::new(),
            loader: CsvLoader::new(),
        }
    }

    /// 列出全部机组产能记录
    pub fn list_unit_capacities(&self) -> ApiResult<Vec<UnitCapacity>> {
        Ok(self.capacity_repo.list_all()?)
    }

    /// 新增或更新机组产能参数
    ///
    /// # 参数
    /// - unit_name: 机组名称
    /// - day_kg / night_kg: 白班 / 夜班产能 (kg/天, 不可为负)
    /// - is_active: 是否启用
    #[instrument(skip(self))]
    pub fn upsert_unit_capacity(
        &self,
        unit_name: &str,
        day_kg: f64,
        night_kg: f64,
        is_active: bool,
    ) -> ApiResult<UnitCapacity> {
        if unit_name.trim().is_empty() {
            return Err(ApiError::InvalidInput("机组名称不能为空".to_string()));
        }
        if !(day_kg >= 0.0 && night_kg >= 0.0) {
            return Err(ApiError::InvalidInput(format!(
                "产能不能为负: day={}, night={}",
                day_kg, night_kg
            )));
        }

        let mut record = UnitCapacity::new(unit_name.trim(), day_kg, night_kg);
        record.is_active = is_active;
        self.write_recomputed(record)
    }

    /// 从 CSV 导入机组产能参数
    ///
    /// # 返回
    /// - 写入后的记录（负荷已按当前在队集合重算）
    pub fn import_unit_capacities<P: AsRef<Path>>(&self, path: P) -> ApiResult<Vec<UnitCapacity>> {
        let records = self.loader.load_unit_capacities(path)?;
        let mut written = Vec::with_capacity(records.len());
        for record in records {
            written.push(self.write_recomputed(record)?);
        }
        info!(units = written.len(), "机组产能导入完成");
        Ok(written)
    }

    fn write_recomputed(&self, record: UnitCapacity) -> ApiResult<UnitCapacity> {
        let handle = self
            .unit_locks
            .handle(&record.unit_name)
            .map_err(ApiError::InternalError)?;
        let _guard = lock_unit(&handle).map_err(ApiError::InternalError)?;

        let active = self.sheet_repo.find_queue_by_unit(
            &record.unit_name,
            &PlanningStatus::queued_states(),
            None,
        )?;
        let updated = self
            .ledger
            .recompute(&record, &active, chrono::Local::now().naive_local());
        self.capacity_repo.upsert(&updated)?;
        Ok(updated)
    }
}
