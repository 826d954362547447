// ==========================================
// 生产计划排队系统 - 计划单领域模型
// ==========================================
// 聚合根: PlanningSheet, 持有有序的 SheetItem 明细
// 明细顺序为插入顺序, 对分配规则无语义
// ==========================================

use crate::domain::types::{DocStatus, PlanningStatus};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// SheetItem - 计划单明细
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetItem {
    pub item_code: Option<String>,
    pub item_name: String,
    pub qty: f64,

    // ===== 重量 =====
    pub weight_per_roll: Option<f64>, // 单卷重 (kg)
    pub no_of_rolls: Option<f64>,     // 卷数
    pub total_weight: Option<f64>,    // 总重 (kg), 缺省时由 单卷重×卷数 回填

    // ===== 材料属性 =====
    pub gsm: f64,                // 克重 (g/m²)
    pub quality: Option<String>, // 品质等级
    pub color: Option<String>,   // 颜色

    // ===== 分配结果 =====
    pub allocated_to_unit: Option<String>,
}

impl SheetItem {
    pub fn new(item_name: impl Into<String>, qty: f64, gsm: f64) -> Self {
        Self {
            item_code: None,
            item_name: item_name.into(),
            qty,
            weight_per_roll: None,
            no_of_rolls: None,
            total_weight: None,
            gsm,
            quality: None,
            color: None,
            allocated_to_unit: None,
        }
    }

    /// 有效总重（未设置按 0 计）
    pub fn weight_or_zero(&self) -> f64 {
        self.total_weight.unwrap_or(0.0)
    }

    /// 品质是否已设置（空串视为未设置）
    pub fn has_quality(&self) -> bool {
        self.quality.as_deref().map_or(false, |q| !q.trim().is_empty())
    }
}

// ==========================================
// PlanningSheet - 计划单
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanningSheet {
    pub sheet_id: String,
    pub sales_order: Option<String>,
    pub customer: Option<String>,
    pub delivery_date: Option<NaiveDate>,

    pub items: Vec<SheetItem>,

    // ===== 汇总 =====
    pub total_quantity: f64,
    pub total_weight: f64,

    // ===== 机组分配 =====
    pub allocated_unit: Option<String>,
    pub unit_capacity_day: Option<f64>,   // 分配时复制的白班产能快照
    pub unit_capacity_night: Option<f64>, // 分配时复制的夜班产能快照
    pub estimated_production_days: Option<f64>,

    // ===== 生命周期 =====
    pub planning_status: PlanningStatus,
    pub doc_status: DocStatus,
    pub queue_position: Option<i64>,

    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl PlanningSheet {
    /// 创建草稿计划单
    pub fn new_draft(customer: Option<String>, delivery_date: Option<NaiveDate>) -> Self {
        let now = chrono::Local::now().naive_local();
        Self {
            sheet_id: uuid::Uuid::new_v4().to_string(),
            sales_order: None,
            customer,
            delivery_date,
            items: Vec::new(),
            total_quantity: 0.0,
            total_weight: 0.0,
            allocated_unit: None,
            unit_capacity_day: None,
            unit_capacity_night: None,
            estimated_production_days: None,
            planning_status: PlanningStatus::Draft,
            doc_status: DocStatus::Draft,
            queue_position: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// 是否参与产能与排队计算（已提交且在队）
    pub fn is_active(&self) -> bool {
        self.doc_status == DocStatus::Committed && self.planning_status.is_queued()
    }

    /// 是否允许普通编辑
    pub fn is_editable(&self) -> bool {
        self.doc_status == DocStatus::Draft
    }

    /// 沿用已保存版本的机组分配与生命周期字段
    ///
    /// 普通保存只改业务内容; 机组只能经自动分配或人工指定写入
    pub fn carry_allocation_from(&mut self, stored: &PlanningSheet) {
        self.allocated_unit = stored.allocated_unit.clone();
        self.unit_capacity_day = stored.unit_capacity_day;
        self.unit_capacity_night = stored.unit_capacity_night;
        self.estimated_production_days = stored.estimated_production_days;
        self.planning_status = stored.planning_status;
        self.queue_position = stored.queue_position;
        self.created_at = stored.created_at;
        self.stamp_items_with_unit();
    }

    /// 新单据: 机组分配与生命周期字段回到草稿初值
    pub fn reset_allocation(&mut self) {
        self.allocated_unit = None;
        self.unit_capacity_day = None;
        self.unit_capacity_night = None;
        self.estimated_production_days = None;
        self.planning_status = PlanningStatus::Draft;
        self.queue_position = None;
        self.stamp_items_with_unit();
    }

    fn stamp_items_with_unit(&mut self) {
        for item in self.items.iter_mut() {
            item.allocated_to_unit = self.allocated_unit.clone();
        }
    }
}

// ==========================================
// QueueEntry - 机组队列行（轻量投影）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub sheet_id: String,
    pub customer: Option<String>,
    pub total_weight: f64,
    pub queue_position: Option<i64>,
    pub delivery_date: Option<NaiveDate>,
    pub planning_status: PlanningStatus,
}

impl From<&PlanningSheet> for QueueEntry {
    fn from(sheet: &PlanningSheet) -> Self {
        Self {
            sheet_id: sheet.sheet_id.clone(),
            customer: sheet.customer.clone(),
            total_weight: sheet.total_weight,
            queue_position: sheet.queue_position,
            delivery_date: sheet.delivery_date,
            planning_status: sheet.planning_status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet_with_item() -> PlanningSheet {
        let mut sheet = PlanningSheet::new_draft(Some("ACME".to_string()), None);
        sheet.items.push(SheetItem::new("SILVER ROLL", 1.0, 25.0));
        sheet
    }

    #[test]
    fn test_carry_allocation_ignores_incoming_unit() {
        let mut stored = sheet_with_item();
        stored.allocated_unit = Some("Unit 2".to_string());
        stored.unit_capacity_day = Some(1000.0);
        stored.unit_capacity_night = Some(500.0);

        let mut incoming = stored.clone();
        incoming.allocated_unit = Some("Unit 99".to_string());
        incoming.unit_capacity_day = Some(1.0);
        incoming.queue_position = Some(7);
        incoming.planning_status = PlanningStatus::InProduction;
        incoming.items.push(SheetItem::new("EXTRA", 1.0, 25.0));

        incoming.carry_allocation_from(&stored);

        assert_eq!(incoming.allocated_unit.as_deref(), Some("Unit 2"));
        assert_eq!(incoming.unit_capacity_day, Some(1000.0));
        assert_eq!(incoming.queue_position, None);
        assert_eq!(incoming.planning_status, PlanningStatus::Draft);
        assert!(incoming
            .items
            .iter()
            .all(|i| i.allocated_to_unit.as_deref() == Some("Unit 2")));
    }

    #[test]
    fn test_reset_allocation_restores_draft_defaults() {
        let mut sheet = sheet_with_item();
        sheet.allocated_unit = Some("Unit 99".to_string());
        sheet.unit_capacity_night = Some(10.0);
        sheet.estimated_production_days = Some(3.0);
        sheet.planning_status = PlanningStatus::Finalized;
        sheet.queue_position = Some(1);
        sheet.items[0].allocated_to_unit = Some("Unit 99".to_string());

        sheet.reset_allocation();

        assert!(sheet.allocated_unit.is_none());
        assert!(sheet.unit_capacity_night.is_none());
        assert!(sheet.estimated_production_days.is_none());
        assert_eq!(sheet.planning_status, PlanningStatus::Draft);
        assert!(sheet.queue_position.is_none());
        assert!(sheet.items[0].allocated_to_unit.is_none());
    }
}
