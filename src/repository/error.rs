// ==========================================
// 生产计划排队系统 - 仓储层错误类型
// ==========================================
// 约束失败按 SQLite 扩展错误码归类:
// - 排队序号唯一索引冲突 → UniqueConstraintViolation
// - 明细外键失效 → ForeignKeyViolation
// ==========================================

use rusqlite::ffi;
use thiserror::Error;

/// 仓储层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    #[error("唯一约束违反: {0}")]
    UniqueConstraintViolation(String),

    #[error("外键约束违反: {0}")]
    ForeignKeyViolation(String),
}

impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(failure, msg) = &err {
            let detail = msg.clone().unwrap_or_else(|| failure.to_string());
            match failure.extended_code {
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    return RepositoryError::UniqueConstraintViolation(detail);
                }
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                    return RepositoryError::ForeignKeyViolation(detail);
                }
                _ => {}
            }
        }
        RepositoryError::DatabaseQueryError(err.to_string())
    }
}

/// Result 类型别名
pub type RepositoryResult<T> = Result<T, RepositoryError>;
