// ==========================================
// 生产计划排队系统 - 领域类型定义
// ==========================================
// 计划状态与单据状态是两条正交的生命周期:
// - PlanningStatus: 业务进度 (草稿 → 已定稿 → 生产中 → 已完成)
// - DocStatus: 单据提交语义 (草稿 / 已提交 / 已作废)
// 只有 "已提交 + 已定稿/生产中" 的计划单参与产能与排队计算
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 计划状态 (Planning Status)
// ==========================================
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanningStatus {
    Draft,        // 草稿
    Finalized,    // 已定稿(已入队)
    InProduction, // 生产中
    Completed,    // 已完成(目前没有任何转换可达)
}

impl PlanningStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanningStatus::Draft => "DRAFT",
            PlanningStatus::Finalized => "FINALIZED",
            PlanningStatus::InProduction => "IN_PRODUCTION",
            PlanningStatus::Completed => "COMPLETED",
        }
    }

    /// 从字符串解析状态
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "FINALIZED" => PlanningStatus::Finalized,
            "IN_PRODUCTION" => PlanningStatus::InProduction,
            "COMPLETED" => PlanningStatus::Completed,
            _ => PlanningStatus::Draft, // 默认值
        }
    }

    /// 是否属于机组的在队状态（计入产能与排队）
    pub fn is_queued(&self) -> bool {
        matches!(self, PlanningStatus::Finalized | PlanningStatus::InProduction)
    }

    /// 在队状态集合（用于仓储查询）
    pub fn queued_states() -> [PlanningStatus; 2] {
        [PlanningStatus::Finalized, PlanningStatus::InProduction]
    }
}

impl fmt::Display for PlanningStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 单据状态 (Document Status)
// ==========================================
// 草稿可编辑; 提交后不可做普通编辑; 作废后退出所有计算
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocStatus {
    Draft,     // 草稿
    Committed, // 已提交
    Cancelled, // 已作废
}

impl DocStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocStatus::Draft => "DRAFT",
            DocStatus::Committed => "COMMITTED",
            DocStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "COMMITTED" => DocStatus::Committed,
            "CANCELLED" => DocStatus::Cancelled,
            _ => DocStatus::Draft,
        }
    }
}

impl fmt::Display for DocStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_planning_status_roundtrip_with_db_strings() {
        for status in [
            PlanningStatus::Draft,
            PlanningStatus::Finalized,
            PlanningStatus::InProduction,
            PlanningStatus::Completed,
        ] {
            assert_eq!(PlanningStatus::from_str(status.as_str()), status);
        }
        assert_eq!(PlanningStatus::from_str("unknown"), PlanningStatus::Draft);
    }

    #[test]
    fn test_only_finalized_and_in_production_are_queued() {
        assert!(!PlanningStatus::Draft.is_queued());
        assert!(PlanningStatus::Finalized.is_queued());
        assert!(PlanningStatus::InProduction.is_queued());
        assert!(!PlanningStatus::Completed.is_queued());
    }

    #[test]
    fn test_doc_status_serde_format() {
        let json = serde_json::to_string(&DocStatus::Committed).unwrap();
        assert_eq!(json, "\"COMMITTED\"");
        assert_eq!(DocStatus::from_str("cancelled"), DocStatus::Cancelled);
    }
}
