// ==========================================
// 分班选课系统 - 引擎层错误类型
// ==========================================
// 只有异常情况走 Err; 业务拒绝见 RequestOutcome
// ==========================================

use crate::config::ConfigError;
use crate::repository::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("持久化读写失败: {0}")]
    Repository(#[from] RepositoryError),

    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    #[error("选课服务已停止")]
    ServiceStopped,
}

pub type EngineResult<T> = Result<T, EngineError>;
