// ==========================================
// 生产计划排队系统 - 引擎层
// ==========================================
// 职责: 实现分配/排队/台账规则, 不拼 SQL
// 红线: Engine 不访问数据库, 只处理内存中的领域对象
// ==========================================

pub mod aggregator;
pub mod allocator;
pub mod capacity_ledger;
pub mod classifier;
pub mod completion;
pub mod sequencer;

// 重导出核心引擎
pub use aggregator::{estimate_production_days, SheetAggregator, SheetTotals};
pub use allocator::{
    compute_profile, AllocationOutcome, AllocationPreview, ItemRecommendation, QualityProfile,
    UnitAllocator,
};
pub use capacity_ledger::CapacityLedger;
pub use classifier::{ItemClassification, TextClassifier};
pub use completion::{CompletionPredicate, NoCompletionPredicate, UnitRefreshReport};
pub use sequencer::{QueueSequencer, UnitLocks};
