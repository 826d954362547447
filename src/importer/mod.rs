// ==========================================
// 生产计划排队系统 - 导入层
// ==========================================
// 职责: 外部 CSV 数据导入
// - 机组产能初始化数据
// - 销售订单明细 → 草稿计划单
// ==========================================

pub mod csv_loader;
pub mod error;

// 重导出核心类型
pub use csv_loader::CsvLoader;
pub use error::{ImportError, ImportResult};
