// ==========================================
// 生产计划排队系统 - 产能台账引擎
// ==========================================
// 规则:
// - 在队总重 = Σ 在队计划单总重 (已提交 + 已定稿/生产中)
// - 在队数量 = 在队计划单数
// - 可用产能 = 白班 + 夜班 - 在队总重 (允许为负, 超负荷不拦截)
// 全量重算, 非增量: 在队集合不变时重复调用结果一致
// ==========================================

use crate::domain::capacity::{DailyCapacity, UnitCapacity};
use crate::domain::sheet::QueueEntry;
use chrono::NaiveDateTime;
use tracing::instrument;

// ==========================================
// CapacityLedger - 产能台账引擎
// ==========================================
pub struct CapacityLedger {
    // 无状态引擎
}

impl CapacityLedger {
    pub fn new() -> Self {
        Self {}
    }

    /// 按在队计划单全量重算机组产能记录
    ///
    /// # 参数
    /// - `record`: 当前产能记录（产能参数、启用标志沿用）
    /// - `active`: 该机组全部在队计划单
    /// - `now`: 重算时间戳
    #[instrument(skip(self, record, active), fields(unit = %record.unit_name, active = active.len()))]
    pub fn recompute(
        &self,
        record: &UnitCapacity,
        active: &[QueueEntry],
        now: NaiveDateTime,
    ) -> UnitCapacity {
        let current_queue_weight: f64 = active.iter().map(|entry| entry.total_weight).sum();

        let mut updated = record.clone();
        updated.current_queue_weight = current_queue_weight;
        updated.queue_count = active.len() as i64;
        updated.available_capacity = record.combined_capacity_kg() - current_queue_weight;
        updated.last_updated = Some(now);

        if updated.is_overcommitted() {
            tracing::warn!(
                unit = %updated.unit_name,
                available = updated.available_capacity,
                "机组在队负荷超过合计日产能"
            );
        }

        updated
    }
}

impl Default for CapacityLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::PlanningStatus;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 1)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap()
    }

    fn entry(id: &str, weight: f64, status: PlanningStatus) -> QueueEntry {
        QueueEntry {
            sheet_id: id.to_string(),
            customer: None,
            total_weight: weight,
            queue_position: None,
            delivery_date: None,
            planning_status: status,
        }
    }

    #[test]
    fn test_recompute_sums_active_weight() {
        let ledger = CapacityLedger::new();
        let record = UnitCapacity::new("Unit 1", 600.0, 400.0);
        let active = vec![
            entry("A", 300.0, PlanningStatus::Finalized),
            entry("B", 200.0, PlanningStatus::InProduction),
        ];

        let updated = ledger.recompute(&record, &active, now());

        assert_eq!(updated.current_queue_weight, 500.0);
        assert_eq!(updated.queue_count, 2);
        assert_eq!(updated.available_capacity, 500.0);
        assert_eq!(updated.last_updated, Some(now()));
        assert_eq!(updated.day_shift_capacity_kg, 600.0);
    }

    #[test]
    fn test_overcommitment_yields_negative_available() {
        let ledger = CapacityLedger::new();
        let record = UnitCapacity::new("Unit 2", 100.0, 50.0);
        let active = vec![entry("A", 400.0, PlanningStatus::Finalized)];

        let updated = ledger.recompute(&record, &active, now());

        assert_eq!(updated.available_capacity, -250.0);
        assert!(updated.is_overcommitted());
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let ledger = CapacityLedger::new();
        let record = UnitCapacity::new("Unit 3", 500.0, 500.0);
        let active = vec![entry("A", 120.5, PlanningStatus::Finalized)];

        let first = ledger.recompute(&record, &active, now());
        let second = ledger.recompute(&first, &active, now());

        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_active_set_resets_load() {
        let ledger = CapacityLedger::new();
        let mut record = UnitCapacity::new("Unit 4", 300.0, 0.0);
        record.current_queue_weight = 999.0;
        record.queue_count = 7;

        let updated = ledger.recompute(&record, &[], now());

        assert_eq!(updated.current_queue_weight, 0.0);
        assert_eq!(updated.queue_count, 0);
        assert_eq!(updated.available_capacity, 300.0);
    }
}
