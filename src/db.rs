// ==========================================
// 分班选课系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout, 减少偶发 busy 错误
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::path::Path;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 建表（幂等）并登记 schema_version
///
/// 表:
/// - enrollment: 名册, 键 (student_id, course_unit)
/// - lecture / valid_pairing: 课表目录 (只读)
/// - audit_log: 审计日志, seq 自增决定顺序
/// - seed_marker: 种子导入标记 (至多一行, 与导入同一事务写入)
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE TABLE IF NOT EXISTS enrollment (
            row_id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id TEXT NOT NULL,
            student_name TEXT NOT NULL,
            course_unit TEXT NOT NULL,
            section TEXT NOT NULL,
            UNIQUE(student_id, course_unit)
        );
        CREATE TABLE IF NOT EXISTS lecture (
            lecture_id INTEGER PRIMARY KEY AUTOINCREMENT,
            section TEXT NOT NULL,
            course_unit TEXT NOT NULL,
            weekday TEXT NOT NULL,
            start_hour REAL NOT NULL,
            duration REAL NOT NULL,
            kind TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS valid_pairing (
            course_unit TEXT NOT NULL,
            section TEXT NOT NULL,
            PRIMARY KEY (course_unit, section)
        );
        CREATE TABLE IF NOT EXISTS audit_log (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id TEXT NOT NULL,
            student_name TEXT NOT NULL,
            kind TEXT NOT NULL,
            course_unit TEXT NOT NULL,
            source_section TEXT NOT NULL,
            dest_section TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS seed_marker (
            marker_id INTEGER PRIMARY KEY CHECK (marker_id = 1),
            seeded_at TEXT NOT NULL DEFAULT (datetime('now')),
            row_count INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_enrollment_student ON enrollment(student_id);
        "#,
    )?;

    if read_schema_version(conn)?.unwrap_or(0) < CURRENT_SCHEMA_VERSION {
        conn.execute(
            "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
            [CURRENT_SCHEMA_VERSION],
        )?;
    }
    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}
