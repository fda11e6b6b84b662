// ==========================================
// 分班选课系统 - 配置层
// ==========================================
// 职责: 引擎参数 (容量上限 / 选课上限 / 专业代码) 与存储位置
// 来源: JSON 配置文件 → 环境变量覆写 → 单键覆写
// ==========================================

pub mod config_manager;

// 重导出核心配置管理器
pub use config_manager::{
    config_keys, ConfigError, ConfigManager, EngineConfig, StorageBackend, StorageConfig,
};
