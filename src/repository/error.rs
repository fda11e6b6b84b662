// ==========================================
// 分班选课系统 - 仓储层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 对应错误分类中的 IOFailure
// ==========================================

use thiserror::Error;

/// 仓储层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    // ===== 文件错误 =====
    #[error("文件读写失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV 解析失败: {0}")]
    Csv(#[from] csv::Error),

    #[error("原子替换文件失败: {0}")]
    Persist(#[from] tempfile::PersistError),

    // ===== 数据库错误 =====
    #[error("数据库查询失败: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    // ===== 数据质量错误 =====
    #[error("字段值错误 ({record}.{field}): {message}")]
    FieldValueError {
        record: String,
        field: String,
        message: String,
    },

    // ===== 记录定位错误 =====
    #[error("记录未找到: {entity} with key={key}")]
    NotFound { entity: String, key: String },

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RepositoryError {
    pub fn field_value(record: &str, field: &str, message: impl Into<String>) -> Self {
        RepositoryError::FieldValueError {
            record: record.to_string(),
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn not_found(entity: &str, key: impl Into<String>) -> Self {
        RepositoryError::NotFound {
            entity: entity.to_string(),
            key: key.into(),
        }
    }
}

/// Result 类型别名
pub type RepositoryResult<T> = Result<T, RepositoryError>;
