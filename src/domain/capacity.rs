// ==========================================
// 生产计划排队系统 - 机组产能领域模型
// ==========================================
// 每个机组一条记录, 以机组名称为键
// 由外部初始化数据创建, 由产能台账全量重算回写
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// UnitCapacity - 机组产能记录
// ==========================================
// 允许超负荷: available_capacity 可以为负
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitCapacity {
    pub unit_name: String,

    // ===== 产能参数 =====
    pub day_shift_capacity_kg: f64,   // 白班产能 (kg/天)
    pub night_shift_capacity_kg: f64, // 夜班产能 (kg/天)

    // ===== 在队负荷 =====
    pub current_queue_weight: f64, // 在队计划单总重
    pub queue_count: i64,          // 在队计划单数量
    pub available_capacity: f64,   // 合计产能 - 在队总重

    pub is_active: bool,
    pub last_updated: Option<NaiveDateTime>,
}

impl UnitCapacity {
    /// 新建机组产能记录（负荷为空）
    pub fn new(unit_name: impl Into<String>, day_kg: f64, night_kg: f64) -> Self {
        Self {
            unit_name: unit_name.into(),
            day_shift_capacity_kg: day_kg,
            night_shift_capacity_kg: night_kg,
            current_queue_weight: 0.0,
            queue_count: 0,
            available_capacity: day_kg + night_kg,
            is_active: true,
            last_updated: None,
        }
    }
}

// ==========================================
// Trait: DailyCapacity
// ==========================================
// 用途: 预计生产天数 / 台账重算共用的产能口径
pub trait DailyCapacity {
    /// 白班 + 夜班合计日产能
    fn combined_capacity_kg(&self) -> f64;

    /// 是否已超负荷
    fn is_overcommitted(&self) -> bool;
}

impl DailyCapacity for UnitCapacity {
    fn combined_capacity_kg(&self) -> f64 {
        self.day_shift_capacity_kg + self.night_shift_capacity_kg
    }

    fn is_overcommitted(&self) -> bool {
        self.available_capacity < 0.0
    }
}

// ==========================================
// CapacitySnapshot - 队列查询返回的产能快照
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacitySnapshot {
    pub day_shift_capacity_kg: f64,
    pub night_shift_capacity_kg: f64,
    pub current_queue_weight: f64,
    pub available_capacity: f64,
}

impl From<&UnitCapacity> for CapacitySnapshot {
    fn from(c: &UnitCapacity) -> Self {
        Self {
            day_shift_capacity_kg: c.day_shift_capacity_kg,
            night_shift_capacity_kg: c.night_shift_capacity_kg,
            current_queue_weight: c.current_queue_weight,
            available_capacity: c.available_capacity,
        }
    }
}
