// ==========================================
// 分班选课系统 - 应用层
// ==========================================
// 职责: 组装存储与引擎, 对外提供单写者服务句柄
// ==========================================

pub mod handle;
pub mod state;

// 重导出
pub use handle::EnrollmentHandle;
pub use state::AppState;
