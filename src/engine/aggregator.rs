// ==========================================
// 生产计划排队系统 - 计划单汇总引擎
// ==========================================
// 职责: 明细重量回填 + 汇总数量/重量 + 预计生产天数
// 红线: 明细总重一经设置不再重算
// 降级: 产能为 0 / 缺失时不给出预计天数, 不报错
// ==========================================

use crate::domain::sheet::{PlanningSheet, SheetItem};
use tracing::instrument;

/// 汇总结果（便于日志与测试观察）
#[derive(Debug, Clone, PartialEq)]
pub struct SheetTotals {
    pub total_quantity: f64,
    pub total_weight: f64,
    pub backfilled_items: usize,
}

// ==========================================
// SheetAggregator - 计划单汇总引擎
// ==========================================
pub struct SheetAggregator {
    // 无状态引擎
}

impl SheetAggregator {
    pub fn new() -> Self {
        Self {}
    }

    /// 重新计算计划单汇总
    ///
    /// # 参数
    /// - `sheet`: 计划单（会被修改）
    /// - `combined_capacity_kg`: 已分配机组的 白班+夜班 日产能（未分配或无记录时为 None）
    #[instrument(skip(self, sheet), fields(sheet_id = %sheet.sheet_id, items = sheet.items.len()))]
    pub fn calculate_totals(
        &self,
        sheet: &mut PlanningSheet,
        combined_capacity_kg: Option<f64>,
    ) -> SheetTotals {
        let mut total_quantity = 0.0;
        let mut total_weight = 0.0;
        let mut backfilled_items = 0;

        for item in sheet.items.iter_mut() {
            if backfill_item_weight(item) {
                backfilled_items += 1;
            }
            total_quantity += item.qty;
            total_weight += item.weight_or_zero();
        }

        sheet.total_quantity = total_quantity;
        sheet.total_weight = total_weight;

        if sheet.allocated_unit.is_some() {
            if let Some(days) = combined_capacity_kg
                .and_then(|capacity| estimate_production_days(total_weight, capacity))
            {
                sheet.estimated_production_days = Some(days);
            }
        }

        SheetTotals {
            total_quantity,
            total_weight,
            backfilled_items,
        }
    }
}

impl Default for SheetAggregator {
    fn default() -> Self {
        Self::new()
    }
}

/// 明细总重回填: 总重未设置(或为0)且 单卷重、卷数 均非零时, 总重 = 单卷重 × 卷数
///
/// 返回是否发生回填
pub fn backfill_item_weight(item: &mut SheetItem) -> bool {
    if item.weight_or_zero() != 0.0 {
        return false;
    }
    match (item.weight_per_roll, item.no_of_rolls) {
        (Some(per_roll), Some(rolls)) if per_roll != 0.0 && rolls != 0.0 => {
            item.total_weight = Some(per_roll * rolls);
            true
        }
        _ => false,
    }
}

/// 预计生产天数 = 总重 / 合计日产能, 保留两位小数
///
/// 总重为 0 或产能非正时返回 None
pub fn estimate_production_days(total_weight: f64, combined_capacity_kg: f64) -> Option<f64> {
    if total_weight == 0.0 || combined_capacity_kg <= 0.0 {
        return None;
    }
    Some(round2(total_weight / combined_capacity_kg))
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(qty: f64, per_roll: Option<f64>, rolls: Option<f64>, total: Option<f64>) -> SheetItem {
        let mut item = SheetItem::new("ITEM", qty, 40.0);
        item.weight_per_roll = per_roll;
        item.no_of_rolls = rolls;
        item.total_weight = total;
        item
    }

    #[test]
    fn test_totals_with_backfill_and_explicit_weights() {
        let aggregator = SheetAggregator::new();
        let mut sheet = PlanningSheet::new_draft(None, None);
        sheet.items = vec![
            item(10.0, Some(25.0), Some(4.0), None), // 回填 100
            item(5.0, Some(25.0), Some(4.0), Some(60.0)), // 显式值保留
            item(2.0, None, Some(3.0), None),        // 因子缺失, 保持未设置
        ];

        let totals = aggregator.calculate_totals(&mut sheet, None);

        assert_eq!(totals.backfilled_items, 1);
        assert_eq!(sheet.items[0].total_weight, Some(100.0));
        assert_eq!(sheet.items[1].total_weight, Some(60.0));
        assert_eq!(sheet.items[2].total_weight, None);
        assert_eq!(sheet.total_quantity, 17.0);
        assert_eq!(sheet.total_weight, 160.0);
    }

    #[test]
    fn test_zero_weight_counts_as_unset_for_backfill() {
        let mut it = item(1.0, Some(12.5), Some(2.0), Some(0.0));
        assert!(backfill_item_weight(&mut it));
        assert_eq!(it.total_weight, Some(25.0));
    }

    #[test]
    fn test_zero_factor_does_not_backfill() {
        let mut it = item(1.0, Some(12.5), Some(0.0), None);
        assert!(!backfill_item_weight(&mut it));
        assert_eq!(it.total_weight, None);
    }

    #[test]
    fn test_estimated_days_rounded_to_two_places() {
        let aggregator = SheetAggregator::new();
        let mut sheet = PlanningSheet::new_draft(None, None);
        sheet.allocated_unit = Some("Unit 1".to_string());
        sheet.items = vec![item(1.0, None, None, Some(1000.0))];

        aggregator.calculate_totals(&mut sheet, Some(300.0));

        assert_eq!(sheet.estimated_production_days, Some(3.33));
    }

    #[test]
    fn test_zero_capacity_leaves_estimate_unchanged() {
        let aggregator = SheetAggregator::new();
        let mut sheet = PlanningSheet::new_draft(None, None);
        sheet.allocated_unit = Some("Unit 1".to_string());
        sheet.estimated_production_days = Some(1.5);
        sheet.items = vec![item(1.0, None, None, Some(1000.0))];

        aggregator.calculate_totals(&mut sheet, Some(0.0));

        assert_eq!(sheet.estimated_production_days, Some(1.5));
    }

    #[test]
    fn test_unallocated_sheet_gets_no_estimate() {
        let aggregator = SheetAggregator::new();
        let mut sheet = PlanningSheet::new_draft(None, None);
        sheet.items = vec![item(1.0, None, None, Some(1000.0))];

        aggregator.calculate_totals(&mut sheet, Some(500.0));

        assert_eq!(sheet.estimated_production_days, None);
    }
}
