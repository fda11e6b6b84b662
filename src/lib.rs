// ==========================================
// 分班选课系统 - 核心库
// ==========================================
// 技术栈: Rust + CSV / SQLite
// 系统定位: 选课请求引擎 (容量均衡 + 课表冲突 + 可撤销审计)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 应用层 - 组装与服务句柄
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{
    AuditRecord, ChangeKind, EnrollmentChange, EnrollmentRecord, EnrollmentRequest, LectureKind,
    LectureOccurrence, SectionEnrollment, SectionSchedule, SortOrder, Student,
};

// 引擎
pub use engine::{
    AuditLog, AuditMode, BalanceValidator, CollisionDetector, EngineError, RejectReason,
    RejectionCategory, RequestEngine, RequestOutcome, RosterStore,
};

// 配置与应用
pub use app::{AppState, EnrollmentHandle};
pub use config::{ConfigManager, EngineConfig};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "分班选课请求引擎";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
