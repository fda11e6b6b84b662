// ==========================================
// 分班选课系统 - 应用状态
// ==========================================
// 职责: 按配置选择存储后端, 组装仓储与请求引擎
// ==========================================

use std::sync::{Arc, Mutex};

use crate::config::{EngineConfig, StorageBackend};
use crate::db::{ensure_schema, open_sqlite_connection};
use crate::engine::{EngineResult, RequestEngine};
use crate::repository::{
    seed_from, CsvRecordSet, RepositoryError, SqliteAuditRepository, SqliteCatalogRepository,
    SqliteEnrollmentRepository,
};

/// 应用状态
///
/// 持有配置与唯一的请求引擎
pub struct AppState {
    pub config: EngineConfig,
    pub engine: RequestEngine,
}

impl AppState {
    /// 打开数据目录并加载名册
    ///
    /// # 说明
    /// - Csv: 直接读写数据目录下的 CSV 文件
    /// - Sqlite: 打开数据目录下的数据库; 库为空且存在 CSV 名册时先导入 CSV
    pub fn open(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let storage = &config.storage;
        tracing::info!(
            backend = %storage.backend,
            data_dir = %storage.data_dir.display(),
            "初始化AppState"
        );

        let engine = match storage.backend {
            StorageBackend::Csv => {
                let set = CsvRecordSet::from_storage(storage);
                RequestEngine::open(
                    &config,
                    &set.catalog,
                    Box::new(set.enrollments),
                    Box::new(set.audit),
                )?
            }
            StorageBackend::Sqlite => {
                std::fs::create_dir_all(&storage.data_dir).map_err(RepositoryError::from)?;
                let conn = open_sqlite_connection(&storage.sqlite_path()).map_err(RepositoryError::from)?;
                ensure_schema(&conn).map_err(RepositoryError::from)?;
                let conn = Arc::new(Mutex::new(conn));

                if storage.roster_path().exists() {
                    let csv = CsvRecordSet::from_storage(storage);
                    let seeded = seed_from(&conn, &csv.catalog, &csv.enrollments, &csv.audit)?;
                    if seeded > 0 {
                        tracing::info!(rows = seeded, "已从 CSV 导入 SQLite");
                    }
                }

                let catalog = SqliteCatalogRepository::new(conn.clone());
                RequestEngine::open(
                    &config,
                    &catalog,
                    Box::new(SqliteEnrollmentRepository::new(conn.clone())),
                    Box::new(SqliteAuditRepository::new(conn)),
                )?
            }
        };

        Ok(Self { config, engine })
    }

    pub fn into_engine(self) -> RequestEngine {
        self.engine
    }
}
