// ==========================================
// 分班选课系统 - 配置管理器
// ==========================================
// 职责: 配置加载、校验、按键查询与覆写
// 存储: JSON 文件 (缺失键取默认值)
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 默认容量上限 (单个配对最多人数)
pub const DEFAULT_CAPACITY_CAP: u32 = 30;
/// 默认选课上限 (每个学生最多课程单元数)
pub const DEFAULT_MAX_ENROLLMENTS: usize = 7;
/// 默认专业代码
pub const DEFAULT_PROGRAM_CODE: &str = "LEIC";

/// 环境变量: 配置文件路径
pub const ENV_CONFIG_PATH: &str = "ENROLLMENT_CONFIG";
/// 环境变量: 数据目录覆写
pub const ENV_DATA_DIR: &str = "ENROLLMENT_DATA_DIR";

// ==========================================
// ConfigError - 配置错误
// ==========================================
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件读取失败 ({path}): {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("配置解析失败: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("配置值无效: {0}")]
    Invalid(String),
}

// ==========================================
// StorageBackend - 存储后端
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Csv,
    Sqlite,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Csv => "csv",
            StorageBackend::Sqlite => "sqlite",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Some(StorageBackend::Csv),
            "sqlite" => Some(StorageBackend::Sqlite),
            _ => None,
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// StorageConfig - 存储位置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub data_dir: PathBuf,
    pub roster_file: String,
    pub schedule_file: String,
    pub pairing_file: String,
    pub audit_file: String,
    pub sqlite_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Csv,
            data_dir: default_data_dir(),
            roster_file: "students_classes.csv".to_string(),
            schedule_file: "classes.csv".to_string(),
            pairing_file: "classes_per_uc.csv".to_string(),
            audit_file: "RequestHistory.csv".to_string(),
            sqlite_file: "enrollment.db".to_string(),
        }
    }
}

impl StorageConfig {
    /// 指定数据目录, 其余取默认
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    pub fn roster_path(&self) -> PathBuf {
        self.data_dir.join(&self.roster_file)
    }

    pub fn schedule_path(&self) -> PathBuf {
        self.data_dir.join(&self.schedule_file)
    }

    pub fn pairing_path(&self) -> PathBuf {
        self.data_dir.join(&self.pairing_file)
    }

    pub fn audit_path(&self) -> PathBuf {
        self.data_dir.join(&self.audit_file)
    }

    pub fn sqlite_path(&self) -> PathBuf {
        self.data_dir.join(&self.sqlite_file)
    }
}

/// 默认数据目录: <系统数据目录>/enrollment-engine, 取不到时为 ./data
fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("enrollment-engine"))
        .unwrap_or_else(|| PathBuf::from("data"))
}

// ==========================================
// EngineConfig - 引擎配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub capacity_cap: u32,
    pub max_enrollments: usize,
    pub program_code: String,
    pub storage: StorageConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            capacity_cap: DEFAULT_CAPACITY_CAP,
            max_enrollments: DEFAULT_MAX_ENROLLMENTS,
            program_code: DEFAULT_PROGRAM_CODE.to_string(),
            storage: StorageConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity_cap == 0 {
            return Err(ConfigError::Invalid("capacity_cap 必须大于 0".to_string()));
        }
        if self.max_enrollments == 0 {
            return Err(ConfigError::Invalid("max_enrollments 必须大于 0".to_string()));
        }
        if self.program_code.trim().is_empty() {
            return Err(ConfigError::Invalid("program_code 不能为空".to_string()));
        }
        Ok(())
    }
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: EngineConfig,
    source: Option<PathBuf>,
}

impl ConfigManager {
    /// 使用给定配置 (会先校验)
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            source: None,
        })
    }

    /// 从 JSON 文件加载
    ///
    /// # 参数
    /// - path: 配置文件路径
    ///
    /// # 返回
    /// - Err(Io): 文件不可读
    /// - Err(Parse): JSON 格式错误
    /// - Err(Invalid): 数值越界
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: EngineConfig = serde_json::from_str(&raw)?;
        config.validate()?;

        tracing::info!(path = %path.display(), "配置文件已加载");
        Ok(Self {
            config,
            source: Some(path.to_path_buf()),
        })
    }

    /// 从进程环境变量构建
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 按查询函数解析环境覆写
    ///
    /// - ENROLLMENT_CONFIG: 配置文件路径, 未设置则取默认配置
    /// - ENROLLMENT_DATA_DIR: 覆盖 storage.data_dir
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut manager = match lookup(ENV_CONFIG_PATH).filter(|v| !v.trim().is_empty()) {
            Some(path) => Self::load(Path::new(path.trim()))?,
            None => Self::new(EngineConfig::default())?,
        };

        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|v| !v.trim().is_empty()) {
            tracing::debug!(data_dir = %dir, "数据目录由环境变量覆写");
            manager.config.storage.data_dir = PathBuf::from(dir.trim());
        }
        Ok(manager)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn into_config(self) -> EngineConfig {
        self.config
    }

    /// 配置来源文件 (默认配置为 None)
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// 按键读取配置值 (字符串形式)
    ///
    /// # 返回
    /// - None: 未知的配置键
    pub fn get_config_value(&self, key: &str) -> Option<String> {
        let c = &self.config;
        let value = match key {
            config_keys::CAPACITY_CAP => c.capacity_cap.to_string(),
            config_keys::MAX_ENROLLMENTS => c.max_enrollments.to_string(),
            config_keys::PROGRAM_CODE => c.program_code.clone(),
            config_keys::STORAGE_BACKEND => c.storage.backend.as_str().to_string(),
            config_keys::DATA_DIR => c.storage.data_dir.display().to_string(),
            _ => return None,
        };
        Some(value)
    }

    /// 按键覆写配置值; 覆写后整体重新校验, 失败时保持原值
    pub fn set_config_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut next = self.config.clone();
        let value = value.trim();
        match key {
            config_keys::CAPACITY_CAP => {
                next.capacity_cap = parse_number(key, value)?;
            }
            config_keys::MAX_ENROLLMENTS => {
                next.max_enrollments = parse_number(key, value)?;
            }
            config_keys::PROGRAM_CODE => next.program_code = value.to_string(),
            config_keys::STORAGE_BACKEND => {
                next.storage.backend = StorageBackend::from_str(value).ok_or_else(|| {
                    ConfigError::Invalid(format!("{} 无法识别: {}", key, value))
                })?;
            }
            config_keys::DATA_DIR => next.storage.data_dir = PathBuf::from(value),
            _ => return Err(ConfigError::Invalid(format!("未知配置键: {}", key))),
        }
        next.validate()?;
        self.config = next;
        Ok(())
    }

    /// 全部配置键值的 JSON 快照
    pub fn get_config_snapshot(&self) -> Result<String, ConfigError> {
        let map: BTreeMap<&str, String> = config_keys::ALL
            .iter()
            .filter_map(|key| self.get_config_value(key).map(|v| (*key, v)))
            .collect();
        Ok(serde_json::to_string(&map)?)
    }

    /// 从快照恢复
    ///
    /// # 返回
    /// - Ok(usize): 恢复的配置项数量
    pub fn restore_config_from_snapshot(&mut self, snapshot_json: &str) -> Result<usize, ConfigError> {
        let map: BTreeMap<String, String> = serde_json::from_str(snapshot_json)?;
        let mut count = 0;
        for (key, value) in &map {
            self.set_config_value(key, value)?;
            count += 1;
        }
        Ok(count)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{} 不是有效数字: {}", key, value)))
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 均衡与上限
    pub const CAPACITY_CAP: &str = "capacity_cap";
    pub const MAX_ENROLLMENTS: &str = "max_enrollments";

    // 专业
    pub const PROGRAM_CODE: &str = "program_code";

    // 存储
    pub const STORAGE_BACKEND: &str = "storage_backend";
    pub const DATA_DIR: &str = "data_dir";

    pub const ALL: &[&str] = &[
        CAPACITY_CAP,
        MAX_ENROLLMENTS,
        PROGRAM_CODE,
        STORAGE_BACKEND,
        DATA_DIR,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.capacity_cap, 30);
        assert_eq!(config.max_enrollments, 7);
        assert_eq!(config.program_code, "LEIC");
        assert_eq!(config.storage.backend, StorageBackend::Csv);
        assert_eq!(config.storage.audit_file, "RequestHistory.csv");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"capacity_cap": 25, "storage": {"backend": "sqlite"}}"#).unwrap();
        assert_eq!(config.capacity_cap, 25);
        assert_eq!(config.max_enrollments, 7);
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.storage.roster_file, "students_classes.csv");
    }

    #[test]
    fn test_validate_rejects_zero_caps() {
        let mut config = EngineConfig::default();
        config.capacity_cap = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = EngineConfig::default();
        config.max_enrollments = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_lookup_overrides_data_dir() {
        let env: HashMap<&str, &str> = [(ENV_DATA_DIR, "/tmp/roster")].into_iter().collect();
        let manager = ConfigManager::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(manager.config().storage.data_dir, PathBuf::from("/tmp/roster"));
        assert_eq!(
            manager.config().storage.roster_path(),
            PathBuf::from("/tmp/roster/students_classes.csv")
        );
        assert!(manager.source().is_none());
    }

    #[test]
    fn test_set_config_value_keeps_old_value_on_error() {
        let mut manager = ConfigManager::new(EngineConfig::default()).unwrap();
        manager.set_config_value(config_keys::CAPACITY_CAP, "12").unwrap();
        assert_eq!(manager.config().capacity_cap, 12);

        assert!(manager.set_config_value(config_keys::CAPACITY_CAP, "0").is_err());
        assert!(manager.set_config_value(config_keys::MAX_ENROLLMENTS, "many").is_err());
        assert!(manager.set_config_value("unknown", "1").is_err());
        assert_eq!(manager.config().capacity_cap, 12);
        assert_eq!(manager.config().max_enrollments, 7);
    }

    #[test]
    fn test_snapshot_restore() {
        let mut source = ConfigManager::new(EngineConfig::default()).unwrap();
        source.set_config_value(config_keys::MAX_ENROLLMENTS, "5").unwrap();
        source.set_config_value(config_keys::STORAGE_BACKEND, "SQLite").unwrap();
        let snapshot = source.get_config_snapshot().unwrap();

        let mut target = ConfigManager::new(EngineConfig::default()).unwrap();
        let restored = target.restore_config_from_snapshot(&snapshot).unwrap();
        assert_eq!(restored, config_keys::ALL.len());
        assert_eq!(target.config().max_enrollments, 5);
        assert_eq!(target.config().storage.backend, StorageBackend::Sqlite);
    }
}
