// ==========================================
// 分班选课系统 - 引擎层
// ==========================================
// 职责: 课表冲突检测、名册存储、均衡校验、请求编排、审计日志
// 红线: Engine 不拼 SQL / 不读写文件, 所有拒绝都必须输出 reason
// ==========================================

pub mod audit_log;
pub mod balance;
pub mod collision;
pub mod error;
pub mod outcome;
pub mod request_engine;
pub mod roster;

// 重导出核心引擎
pub use audit_log::AuditLog;
pub use balance::{BalanceCheck, BalanceValidator};
pub use collision::CollisionDetector;
pub use error::{EngineError, EngineResult};
pub use outcome::{Acceptance, RejectReason, RejectionCategory, RequestOutcome};
pub use request_engine::{AuditMode, RequestEngine};
pub use roster::{OccupancyMap, RosterStore};
