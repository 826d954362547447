// ==========================================
// 生产计划排队系统 - 完工判定扩展点
// ==========================================
// 职责: 每小时队列刷新时, 对"生产中"计划单询问是否已完工
// 说明: 完工口径尚未定义, 默认实现从不判定完工;
//       刷新流程只汇报候选, 不做任何状态转换
// ==========================================

use crate::domain::sheet::QueueEntry;
use serde::{Deserialize, Serialize};

/// 完工判定 Trait
///
/// 由后续组件实现（例如对接报工数据）
pub trait CompletionPredicate: Send + Sync {
    /// 判定名称（写入日志）
    fn name(&self) -> &str;

    /// 该生产中计划单是否已完工
    fn is_complete(&self, unit: &str, entry: &QueueEntry) -> bool;
}

/// 空判定: 从不认为完工
#[derive(Debug, Clone, Default)]
pub struct NoCompletionPredicate;

impl CompletionPredicate for NoCompletionPredicate {
    fn name(&self) -> &str {
        "none"
    }

    fn is_complete(&self, _unit: &str, _entry: &QueueEntry) -> bool {
        false
    }
}

/// 单机组刷新结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitRefreshReport {
    pub unit: String,
    /// 生产中计划单
    pub in_production: Vec<String>,
    /// 判定为已完工的候选（不做状态转换）
    pub completion_candidates: Vec<String>,
}

/// 对一个机组的生产中计划单执行完工判定
pub fn inspect_unit(
    predicate: &dyn CompletionPredicate,
    unit: &str,
    in_production: &[QueueEntry],
) -> UnitRefreshReport {
    let completion_candidates = in_production
        .iter()
        .filter(|entry| predicate.is_complete(unit, entry))
        .map(|entry| entry.sheet_id.clone())
        .collect();

    UnitRefreshReport {
        unit: unit.to_string(),
        in_production: in_production.iter().map(|e| e.sheet_id.clone()).collect(),
        completion_candidates,
    }
}
