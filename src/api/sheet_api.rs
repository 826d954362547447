// ==========================================
// 生产计划排队系统 - 计划单 API
// ==========================================
// 职责: 计划单生命周期的请求级工作单元
// - 保存: 校验 → 汇总 → 品质识别 → 自动分配 → 预计天数
// - 定稿: 机组锁内取号 → 提交 → 台账重算 (单事务)
// - 开始生产 / 作废 / 人工指定机组 / 分配预览
// 红线: 已提交计划单不可做普通保存; 排队序号只分配一次
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::capacity::{DailyCapacity, UnitCapacity};
use crate::domain::sheet::{PlanningSheet, QueueEntry, SheetItem};
use crate::domain::types::{DocStatus, PlanningStatus};
use crate::engine::aggregator::estimate_production_days;
use crate::engine::allocator::apply_unit;
use crate::engine::sequencer::lock_unit;
use crate::engine::{
    AllocationOutcome, AllocationPreview, CapacityLedger, QueueSequencer, SheetAggregator,
    TextClassifier, UnitAllocator, UnitLocks,
};
use crate::repository::{PlanningSheetRepository, UnitCapacityRepository};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{info, instrument, warn};

// ==========================================
// PlanningSheetApi - 计划单API
// ==========================================
pub struct PlanningSheetApi {
    sheet_repo: Arc<PlanningSheetRepository>,
    capacity_repo: Arc<UnitCapacityRepository>,
    allocator: Arc<UnitAllocator>,
    unit_locks: Arc<UnitLocks>,
    aggregator: SheetAggregator,
    classifier: TextClassifier,
    sequencer: QueueSequencer,
    ledger: CapacityLedger,
}

impl PlanningSheetApi {
    /// 创建新的PlanningSheetApi实例
    ///
    /// # 参数
    /// - sheet_repo: 计划单仓储
    /// - capacity_repo: 机组产能仓储
    /// - allocator: 机组分配引擎（持有启动时加载的规则集）
    /// - unit_locks: 机组锁（与 QueueApi 共享）
    pub fn new(
        sheet_repo: Arc<PlanningSheetRepository>,
        capacity_repo: Arc<UnitCapacityRepository>,
        allocator: Arc<UnitAllocator>,
        unit_locks: Arc<UnitLocks>,
    ) -> Self {
        Self {
            sheet_repo,
            capacity_repo,
            allocator,
            unit_locks,
            aggregator: SheetAggregator::new(),
            classifier: TextClassifier::new(),
            sequencer: QueueSequencer::new(),
            ledger: CapacityLedger::new(),
        }
    }

    // ==========================================
    // 查询接口
    // ==========================================

    /// 按ID读取计划单
    pub fn get_sheet(&self, sheet_id: &str) -> ApiResult<PlanningSheet> {
        self.sheet_repo
            .find_by_id(sheet_id)?
            .ok_or_else(|| ApiError::NotFound(format!("计划单(id={})不存在", sheet_id)))
    }

    /// 整单分配预览（不修改、不保存）
    pub fn preview_allocation(&self, sheet_id: &str) -> ApiResult<AllocationPreview> {
        let mut sheet = self.get_sheet(sheet_id)?;
        self.aggregator.calculate_totals(&mut sheet, None);
        self.classifier.classify_items(&mut sheet.items);
        Ok(self.allocator.preview(&sheet))
    }

    /// 查询尚未分配机组的计划单
    pub fn list_unallocated(&self) -> ApiResult<Vec<QueueEntry>> {
        Ok(self.sheet_repo.list_unallocated()?)
    }

    // ==========================================
    // 编辑接口
    // ==========================================

    /// 新建草稿计划单并保存
    ///
    /// # 参数
    /// - customer: 客户
    /// - delivery_date: 交货日期
    /// - sales_order: 来源销售订单
    /// - items: 明细（至少一行）
    pub fn create_draft(
        &self,
        customer: Option<String>,
        delivery_date: Option<NaiveDate>,
        sales_order: Option<String>,
        items: Vec<SheetItem>,
    ) -> ApiResult<PlanningSheet> {
        let mut sheet = PlanningSheet::new_draft(customer, delivery_date);
        sheet.sales_order = sales_order;
        sheet.items = items;
        self.save_sheet(sheet)
    }

    /// 保存草稿计划单
    ///
    /// 机组、产能快照、计划状态、排队序号不取自入参:
    /// 已存在的单据沿用库中值, 新单据回到草稿初值
    ///
    /// # 错误
    /// - ValidationError: 明细为空或数值为负
    /// - InvalidStateTransition: 计划单已提交或已作废
    #[instrument(skip(self, sheet), fields(sheet_id = %sheet.sheet_id, items = sheet.items.len()))]
    pub fn save_sheet(&self, mut sheet: PlanningSheet) -> ApiResult<PlanningSheet> {
        ensure_editable(&sheet)?;
        match self.sheet_repo.find_by_id(&sheet.sheet_id)? {
            Some(stored) => {
                ensure_editable(&stored)?;
                sheet.carry_allocation_from(&stored);
            }
            None => sheet.reset_allocation(),
        }

        self.prepare(&mut sheet)?;
        sheet.updated_at = chrono::Local::now().naive_local();
        self.sheet_repo.save(&sheet)?;

        info!(
            sheet_id = %sheet.sheet_id,
            total_weight = sheet.total_weight,
            unit = ?sheet.allocated_unit,
            "计划单已保存"
        );
        Ok(sheet)
    }

    /// 人工指定机组（用于自动分配未命中的草稿计划单）
    ///
    /// # 错误
    /// - NotFound: 计划单不存在或机组无产能记录
    /// - InvalidStateTransition: 计划单已提交或已作废
    #[instrument(skip(self))]
    pub fn assign_unit(&self, sheet_id: &str, unit: &str) -> ApiResult<PlanningSheet> {
        let mut sheet = self.get_sheet(sheet_id)?;
        ensure_editable(&sheet)?;

        let capacity = self
            .capacity_repo
            .find_by_unit(unit)?
            .ok_or_else(|| ApiError::NotFound(format!("机组{}无产能记录", unit)))?;

        if let Some(previous) = &sheet.allocated_unit {
            if previous != unit {
                warn!(from = %previous, to = %unit, "人工覆盖已分配机组");
            }
        }

        apply_unit(&mut sheet, &capacity);
        self.aggregator
            .calculate_totals(&mut sheet, Some(capacity.combined_capacity_kg()));
        sheet.updated_at = chrono::Local::now().naive_local();
        self.sheet_repo.save(&sheet)?;

        info!(sheet_id = %sheet.sheet_id, unit = %unit, "计划单已人工指定机组");
        Ok(sheet)
    }

    // ==========================================
    // 生命周期接口
    // ==========================================

    /// 定稿（提交）计划单
    ///
    /// 已分配机组时: 机组锁内计算排队序号, 计划单与台账同一事务写入
    /// 未分配机组时: 仅提交, 不取号、不重算台账
    ///
    /// # 错误
    /// - InvalidStateTransition: 计划单不是草稿
    /// - ValidationError: 明细为空
    #[instrument(skip(self))]
    pub fn finalize_sheet(&self, sheet_id: &str) -> ApiResult<PlanningSheet> {
        let mut sheet = self.get_sheet(sheet_id)?;
        if sheet.doc_status != DocStatus::Draft || sheet.planning_status != PlanningStatus::Draft {
            return Err(ApiError::InvalidStateTransition {
                from: format!("{}/{}", sheet.doc_status, sheet.planning_status),
                to: PlanningStatus::Finalized.to_string(),
            });
        }

        self.prepare(&mut sheet)?;
        sheet.doc_status = DocStatus::Committed;
        sheet.planning_status = PlanningStatus::Finalized;
        sheet.updated_at = chrono::Local::now().naive_local();

        let unit = match sheet.allocated_unit.clone() {
            Some(unit) => unit,
            None => {
                self.sheet_repo.save(&sheet)?;
                warn!(sheet_id = %sheet.sheet_id, "计划单未分配机组，定稿但不入队");
                return Ok(sheet);
            }
        };

        let handle = self
            .unit_locks
            .handle(&unit)
            .map_err(ApiError::InternalError)?;
        let _guard = lock_unit(&handle).map_err(ApiError::InternalError)?;

        let others = self.sheet_repo.find_queue_by_unit(
            &unit,
            &PlanningStatus::queued_states(),
            Some(&sheet.sheet_id),
        )?;
        let position = self.sequencer.next_position(&others);
        sheet.queue_position = Some(position);

        let mut active = others;
        active.push(QueueEntry::from(&sheet));
        let capacity = self.recomputed_capacity(&unit, &active)?;
        self.sheet_repo.save_with_capacity(&sheet, capacity.as_ref())?;

        info!(
            sheet_id = %sheet.sheet_id,
            unit = %unit,
            queue_position = position,
            queue_count = active.len(),
            "计划单已定稿入队"
        );
        Ok(sheet)
    }

    /// 开始生产: 已定稿 → 生产中（在队集合不变, 无需重算台账）
    #[instrument(skip(self))]
    pub fn start_production(&self, sheet_id: &str) -> ApiResult<PlanningSheet> {
        let mut sheet = self.get_sheet(sheet_id)?;
        if sheet.doc_status != DocStatus::Committed
            || sheet.planning_status != PlanningStatus::Finalized
        {
            return Err(ApiError::InvalidStateTransition {
                from: format!("{}/{}", sheet.doc_status, sheet.planning_status),
                to: PlanningStatus::InProduction.to_string(),
            });
        }

        sheet.planning_status = PlanningStatus::InProduction;
        sheet.updated_at = chrono::Local::now().naive_local();
        self.sheet_repo.save(&sheet)?;

        info!(sheet_id = %sheet.sheet_id, unit = ?sheet.allocated_unit, "计划单开始生产");
        Ok(sheet)
    }

    /// 作废已提交计划单
    ///
    /// 在队计划单作废后重算所属机组台账; 其他计划单序号不变
    #[instrument(skip(self))]
    pub fn cancel_sheet(&self, sheet_id: &str) -> ApiResult<PlanningSheet> {
        let mut sheet = self.get_sheet(sheet_id)?;
        if sheet.doc_status != DocStatus::Committed {
            return Err(ApiError::InvalidStateTransition {
                from: sheet.doc_status.to_string(),
                to: DocStatus::Cancelled.to_string(),
            });
        }

        let was_active = sheet.is_active();
        sheet.doc_status = DocStatus::Cancelled;
        sheet.updated_at = chrono::Local::now().naive_local();

        match sheet.allocated_unit.clone() {
            Some(unit) if was_active => {
                let handle = self
                    .unit_locks
                    .handle(&unit)
                    .map_err(ApiError::InternalError)?;
                let _guard = lock_unit(&handle).map_err(ApiError::InternalError)?;

                let active = self.sheet_repo.find_queue_by_unit(
                    &unit,
                    &PlanningStatus::queued_states(),
                    Some(&sheet.sheet_id),
                )?;
                let capacity = self.recomputed_capacity(&unit, &active)?;
                self.sheet_repo.save_with_capacity(&sheet, capacity.as_ref())?;
            }
            _ => self.sheet_repo.save(&sheet)?,
        }

        info!(sheet_id = %sheet.sheet_id, was_active, "计划单已作废");
        Ok(sheet)
    }

    // ==========================================
    // 内部流程
    // ==========================================

    /// 保存前流程: 校验 → 汇总 → 品质识别 → 自动分配 → 预计天数
    fn prepare(&self, sheet: &mut PlanningSheet) -> ApiResult<()> {
        if sheet.items.is_empty() {
            return Err(ApiError::ValidationError(
                "计划单至少需要一行明细".to_string(),
            ));
        }
        validate_item_values(&sheet.items)?;

        let existing_capacity = match &sheet.allocated_unit {
            Some(unit) => self.capacity_repo.find_by_unit(unit)?,
            None => None,
        };
        self.aggregator.calculate_totals(
            sheet,
            existing_capacity.as_ref().map(|c| c.combined_capacity_kg()),
        );

        let classified = self.classifier.classify_items(&mut sheet.items);
        if classified > 0 {
            tracing::debug!(classified, "已从品名识别品质");
        }

        let capacity_repo = &self.capacity_repo;
        let outcome = self
            .allocator
            .allocate(sheet, |unit| capacity_repo.find_by_unit(unit))?;

        if let AllocationOutcome::Allocated { .. } = outcome {
            // 同一次保存内用刚复制的产能快照给出预计天数
            let combined = sheet.unit_capacity_day.unwrap_or(0.0)
                + sheet.unit_capacity_night.unwrap_or(0.0);
            if let Some(days) = estimate_production_days(sheet.total_weight, combined) {
                sheet.estimated_production_days = Some(days);
            }
        }
        Ok(())
    }

    /// 按在队集合重算机组台账（机组无产能记录时返回 None）
    fn recomputed_capacity(
        &self,
        unit: &str,
        active: &[QueueEntry],
    ) -> ApiResult<Option<UnitCapacity>> {
        match self.capacity_repo.find_by_unit(unit)? {
            Some(record) => {
                let now = chrono::Local::now().naive_local();
                Ok(Some(self.ledger.recompute(&record, active, now)))
            }
            None => {
                warn!(unit = %unit, "机组无产能记录，跳过台账重算");
                Ok(None)
            }
        }
    }
}

/// 明细数值不能为负（克重、数量、重量、卷数）
fn validate_item_values(items: &[SheetItem]) -> ApiResult<()> {
    for (idx, item) in items.iter().enumerate() {
        let fields = [
            ("gsm", Some(item.gsm)),
            ("qty", Some(item.qty)),
            ("total_weight", item.total_weight),
            ("weight_per_roll", item.weight_per_roll),
            ("no_of_rolls", item.no_of_rolls),
        ];
        for (field, value) in fields {
            if let Some(v) = value.filter(|v| *v < 0.0) {
                return Err(ApiError::ValidationError(format!(
                    "第{}行明细 {} 不能为负: {}",
                    idx + 1,
                    field,
                    v
                )));
            }
        }
    }
    Ok(())
}

/// 仅草稿单据允许普通编辑
fn ensure_editable(sheet: &PlanningSheet) -> ApiResult<()> {
    if sheet.is_editable() {
        Ok(())
    } else {
        Err(ApiError::InvalidStateTransition {
            from: sheet.doc_status.to_string(),
            to: "EDIT".to_string(),
        })
    }
}
