// ==========================================
// 分班选课系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 名册 / 课表目录 / 审计日志的持久化, 屏蔽 CSV 与 SQLite 细节
// 约束: SQL 查询全部参数化; CSV 更新走原子替换
// ==========================================

pub mod csv_repo;
pub mod error;
pub mod record_repo;
pub mod sqlite_repo;

// 重导出核心仓储
pub use csv_repo::{CsvAuditRepository, CsvCatalogRepository, CsvEnrollmentRepository, CsvRecordSet};
pub use error::{RepositoryError, RepositoryResult};
pub use record_repo::{AuditRepository, CatalogRepository, EnrollmentRepository};
pub use sqlite_repo::{
    seed_from, SqliteAuditRepository, SqliteCatalogRepository, SqliteEnrollmentRepository,
};
