// ==========================================
// 生产计划排队系统 - 机组分配引擎
// ==========================================
// 输入: 计划单明细 (品质 / 克重 / 总重) + 有序分配规则集
// 输出: 目标机组 + 产能快照 + 明细分配标记
// ==========================================
// 规则:
// 1) 主导品质 = 按总重加权累计最大的非空品质; 并列时取最先出现者
// 2) 平均克重 = Σ(克重×重量) / Σ重量; 总重为 0 时取 0
// 3) 规则按顺序求值, 首条命中即返回
// 4) 目标机组无产能记录 → 静默放弃分配 (不是错误)
// ==========================================

use crate::config::AllocationRuleSet;
use crate::domain::capacity::UnitCapacity;
use crate::domain::sheet::{PlanningSheet, SheetItem};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

/// 计划单品质画像
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityProfile {
    pub dominant_quality: String,
    pub avg_gsm: f64,
    pub total_weight: f64,
}

/// 自动分配结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocationOutcome {
    /// 已分配到机组
    Allocated { unit: String },
    /// 已有机组, 不再自动分配
    AlreadyAllocated { unit: String },
    /// 无规则命中, 留待人工处理
    NoRuleMatched,
    /// 命中机组但无产能记录, 留待人工处理
    MissingCapacity { unit: String },
}

impl AllocationOutcome {
    pub fn unit(&self) -> Option<&str> {
        match self {
            AllocationOutcome::Allocated { unit } | AllocationOutcome::AlreadyAllocated { unit } => {
                Some(unit.as_str())
            }
            _ => None,
        }
    }
}

/// 单行明细的推荐机组（预览用）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecommendation {
    pub row_index: usize,
    pub quality: Option<String>,
    pub gsm: f64,
    pub recommended_unit: Option<String>,
}

/// 整单分配预览（不修改任何状态）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationPreview {
    pub rule_set_version: String,
    pub profile: QualityProfile,
    pub recommended_unit: Option<String>,
    pub items: Vec<ItemRecommendation>,
}

/// 计算品质画像
///
/// 用按首次出现顺序排列的累计表代替无序映射, 保证并列时结果可复现
pub fn compute_profile(items: &[SheetItem]) -> QualityProfile {
    let mut accumulated: Vec<(String, f64)> = Vec::new();
    let mut total_weight = 0.0;
    let mut weighted_gsm = 0.0;

    for item in items {
        let quality = item
            .quality
            .as_deref()
            .map(|q| q.trim().to_uppercase())
            .unwrap_or_default();
        let weight = item.weight_or_zero();

        if !quality.is_empty() {
            match accumulated.iter_mut().find(|(q, _)| *q == quality) {
                Some((_, w)) => *w += weight,
                None => accumulated.push((quality, weight)),
            }
        }
        total_weight += weight;
        weighted_gsm += item.gsm * weight;
    }

    let avg_gsm = if total_weight > 0.0 {
        weighted_gsm / total_weight
    } else {
        0.0
    };

    // 严格大于才替换: 并列时保留最先出现的品质
    let mut dominant: Option<(&str, f64)> = None;
    for (quality, weight) in &accumulated {
        match dominant {
            Some((_, best)) if *weight <= best => {}
            _ => dominant = Some((quality.as_str(), *weight)),
        }
    }

    QualityProfile {
        dominant_quality: dominant.map(|(q, _)| q.to_string()).unwrap_or_default(),
        avg_gsm,
        total_weight,
    }
}

// ==========================================
// UnitAllocator - 机组分配引擎
// ==========================================
pub struct UnitAllocator {
    rules: Arc<AllocationRuleSet>,
}

impl UnitAllocator {
    pub fn new(rules: Arc<AllocationRuleSet>) -> Self {
        Self { rules }
    }

    pub fn rule_set(&self) -> &AllocationRuleSet {
        &self.rules
    }

    /// 纯函数推荐: 只按 (品质, 克重) 求值规则, 不做加权
    pub fn recommend(&self, quality: &str, gsm: f64) -> Option<String> {
        self.rules.evaluate(quality, gsm).map(str::to_string)
    }

    /// 按明细加权画像推荐机组（不校验产能记录）
    pub fn recommend_for_items(&self, items: &[SheetItem]) -> (QualityProfile, Option<String>) {
        let profile = compute_profile(items);
        let unit = self.recommend(&profile.dominant_quality, profile.avg_gsm);
        (profile, unit)
    }

    /// 整单分配预览
    ///
    /// 行级推荐仅对 品质已设置且克重非零 的明细给出
    pub fn preview(&self, sheet: &PlanningSheet) -> AllocationPreview {
        let (profile, recommended_unit) = self.recommend_for_items(&sheet.items);
        let items = sheet
            .items
            .iter()
            .enumerate()
            .map(|(row_index, item)| ItemRecommendation {
                row_index,
                quality: item.quality.clone(),
                gsm: item.gsm,
                recommended_unit: if item.has_quality() && item.gsm != 0.0 {
                    self.recommend(item.quality.as_deref().unwrap_or_default(), item.gsm)
                } else {
                    None
                },
            })
            .collect();

        AllocationPreview {
            rule_set_version: self.rules.version.clone(),
            profile,
            recommended_unit,
            items,
        }
    }

    /// 自动分配（仅当计划单尚无机组时执行）
    ///
    /// # 参数
    /// - `sheet`: 计划单（命中时被修改）
    /// - `lookup`: 按机组名读取产能记录
    #[instrument(skip(self, sheet, lookup), fields(sheet_id = %sheet.sheet_id, rule_set = %self.rules.version))]
    pub fn allocate<F, E>(&self, sheet: &mut PlanningSheet, lookup: F) -> Result<AllocationOutcome, E>
    where
        F: FnOnce(&str) -> Result<Option<UnitCapacity>, E>,
    {
        if let Some(unit) = &sheet.allocated_unit {
            return Ok(AllocationOutcome::AlreadyAllocated { unit: unit.clone() });
        }
        if sheet.items.is_empty() {
            return Ok(AllocationOutcome::NoRuleMatched);
        }

        let (profile, unit) = self.recommend_for_items(&sheet.items);
        let unit = match unit {
            Some(unit) => unit,
            None => {
                tracing::info!(
                    dominant_quality = %profile.dominant_quality,
                    avg_gsm = profile.avg_gsm,
                    "无分配规则命中，计划单保持未分配"
                );
                return Ok(AllocationOutcome::NoRuleMatched);
            }
        };

        match lookup(&unit)? {
            Some(capacity) => {
                apply_unit(sheet, &capacity);
                tracing::info!(
                    unit = %unit,
                    dominant_quality = %profile.dominant_quality,
                    avg_gsm = profile.avg_gsm,
                    "计划单已分配机组"
                );
                Ok(AllocationOutcome::Allocated { unit })
            }
            None => {
                tracing::warn!(unit = %unit, "命中机组无产能记录，放弃分配");
                Ok(AllocationOutcome::MissingCapacity { unit })
            }
        }
    }
}

/// 将机组写入计划单: 机组名 + 产能快照 + 每行明细分配标记
pub fn apply_unit(sheet: &mut PlanningSheet, capacity: &UnitCapacity) {
    sheet.allocated_unit = Some(capacity.unit_name.clone());
    sheet.unit_capacity_day = Some(capacity.day_shift_capacity_kg);
    sheet.unit_capacity_night = Some(capacity.night_shift_capacity_kg);
    for item in sheet.items.iter_mut() {
        item.allocated_to_unit = Some(capacity.unit_name.clone());
    }
}
