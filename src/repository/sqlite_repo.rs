// ==========================================
// 分班选课系统 - SQLite 记录仓储
// ==========================================
// 与 CSV 仓储实现同一组 Repository Trait
// 红线: Repository 不做业务逻辑, 只做数据映射
// ==========================================

#[cfg(test)]
mod tests;

use crate::domain::{
    parse_weekday, weekday_name, AuditRecord, EnrollmentRecord, LectureKind, LectureOccurrence,
    SectionEnrollment,
};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::record_repo::{
    check_duration, AuditRepository, CatalogRepository, EnrollmentRepository,
};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use std::sync::{Arc, Mutex, MutexGuard};

fn lock(conn: &Arc<Mutex<Connection>>) -> RepositoryResult<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|e| RepositoryError::LockError(e.to_string()))
}

// ==========================================
// SqliteCatalogRepository - 课表目录
// ==========================================
pub struct SqliteCatalogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCatalogRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }
}

impl CatalogRepository for SqliteCatalogRepository {
    fn load_lectures(&self) -> RepositoryResult<Vec<(String, LectureOccurrence)>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(
            r#"
            SELECT section, course_unit, weekday, start_hour, duration, kind
            FROM lecture
            ORDER BY lecture_id
            "#,
        )?;

        let raw = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, f64>(3)?,
                    row.get::<_, f64>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })?
            .collect::<SqliteResult<Vec<_>>>()?;

        raw.into_iter()
            .map(|(section, course_unit, weekday, start_hour, duration, kind)| {
                let weekday = parse_weekday(&weekday).ok_or_else(|| {
                    RepositoryError::field_value("lecture", "weekday", format!("无法识别: {}", weekday))
                })?;
                let kind = LectureKind::from_str(&kind).ok_or_else(|| {
                    RepositoryError::field_value("lecture", "kind", format!("无法识别: {}", kind))
                })?;
                check_duration("lecture", "duration", duration)?;
                Ok((
                    section,
                    LectureOccurrence::new(course_unit, weekday, start_hour, duration, kind),
                ))
            })
            .collect()
    }

    fn load_pairings(&self) -> RepositoryResult<Vec<SectionEnrollment>> {
        let conn = lock(&self.conn)?;
        let mut stmt =
            conn.prepare("SELECT section, course_unit FROM valid_pairing ORDER BY course_unit, section")?;
        let pairings = stmt
            .query_map([], |row| {
                Ok(SectionEnrollment::new(
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                ))
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(pairings)
    }
}

// ==========================================
// SqliteEnrollmentRepository - 名册
// ==========================================
pub struct SqliteEnrollmentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteEnrollmentRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }
}

impl EnrollmentRepository for SqliteEnrollmentRepository {
    fn load_all(&self) -> RepositoryResult<Vec<EnrollmentRecord>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(
            r#"
            SELECT student_id, student_name, course_unit, section
            FROM enrollment
            ORDER BY student_id, row_id
            "#,
        )?;
        let records = stmt
            .query_map([], |row| {
                Ok(EnrollmentRecord {
                    student_id: row.get(0)?,
                    student_name: row.get(1)?,
                    course_unit: row.get(2)?,
                    section: row.get(3)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(records)
    }

    fn append(&self, record: &EnrollmentRecord) -> RepositoryResult<()> {
        let conn = lock(&self.conn)?;
        conn.execute(
            r#"
            INSERT INTO enrollment (student_id, student_name, course_unit, section)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                record.student_id,
                record.student_name,
                record.course_unit,
                record.section
            ],
        )?;
        Ok(())
    }

    fn update_section(
        &self,
        student_id: &str,
        course_unit: &str,
        new_section: &str,
    ) -> RepositoryResult<()> {
        let conn = lock(&self.conn)?;
        let rows = conn.execute(
            "UPDATE enrollment SET section = ?3 WHERE student_id = ?1 AND course_unit = ?2",
            params![student_id, course_unit, new_section],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found(
                "enrollment",
                format!("{}/{}", student_id, course_unit),
            ));
        }
        Ok(())
    }

    fn delete(&self, student_id: &str, course_unit: &str) -> RepositoryResult<()> {
        let conn = lock(&self.conn)?;
        let rows = conn.execute(
            "DELETE FROM enrollment WHERE student_id = ?1 AND course_unit = ?2",
            params![student_id, course_unit],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found(
                "enrollment",
                format!("{}/{}", student_id, course_unit),
            ));
        }
        Ok(())
    }
}

// ==========================================
// SqliteAuditRepository - 审计日志
// ==========================================
pub struct SqliteAuditRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteAuditRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }
}

type AuditColumns = (String, String, String, String, String, String);

fn audit_from_columns(cols: AuditColumns) -> RepositoryResult<AuditRecord> {
    let (student_id, student_name, kind, course_unit, source, dest) = cols;
    AuditRecord::from_parts(&student_id, &student_name, &kind, &course_unit, &source, &dest)
        .ok_or_else(|| {
            RepositoryError::field_value(
                "audit_log",
                "kind",
                format!("无效的审计记录: kind={}, uc={}", kind, course_unit),
            )
        })
}

impl AuditRepository for SqliteAuditRepository {
    fn load_all(&self) -> RepositoryResult<Vec<AuditRecord>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(
            r#"
            SELECT student_id, student_name, kind, course_unit, source_section, dest_section
            FROM audit_log
            ORDER BY seq
            "#,
        )?;
        let raw = stmt
            .query_map([], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            })?
            .collect::<SqliteResult<Vec<AuditColumns>>>()?;
        raw.into_iter().map(audit_from_columns).collect()
    }

    fn append(&self, record: &AuditRecord) -> RepositoryResult<()> {
        let conn = lock(&self.conn)?;
        conn.execute(
            r#"
            INSERT INTO audit_log (student_id, student_name, kind, course_unit, source_section, dest_section)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                record.student_id,
                record.student_name,
                record.kind().as_str(),
                record.course_unit(),
                record.source_section(),
                record.dest_section(),
            ],
        )?;
        Ok(())
    }

    fn delete_at(&self, seq: usize) -> RepositoryResult<AuditRecord> {
        if seq == 0 {
            return Err(RepositoryError::not_found("audit_log", "0"));
        }
        let mut conn = lock(&self.conn)?;
        let tx = conn.transaction()?;

        let found: Option<(i64, AuditColumns)> = tx
            .query_row(
                r#"
                SELECT seq, student_id, student_name, kind, course_unit, source_section, dest_section
                FROM audit_log
                ORDER BY seq
                LIMIT 1 OFFSET ?1
                "#,
                params![(seq - 1) as i64],
                |row| {
                    Ok((
                        row.get(0)?,
                        (
                            row.get(1)?,
                            row.get(2)?,
                            row.get(3)?,
                            row.get(4)?,
                            row.get(5)?,
                            row.get(6)?,
                        ),
                    ))
                },
            )
            .optional()?;

        let (row_seq, cols) =
            found.ok_or_else(|| RepositoryError::not_found("audit_log", seq.to_string()))?;
        tx.execute("DELETE FROM audit_log WHERE seq = ?1", params![row_seq])?;
        tx.commit()?;

        audit_from_columns(cols)
    }
}

// ==========================================
// 种子数据导入
// ==========================================

/// 将另一组仓储 (通常是 CSV) 的记录导入空库
///
/// # 返回
/// - Ok(0): 已导入过 (seed_marker 存在) 或库中已有任何数据, 未导入
/// - Ok(n): 导入的记录总数; 标记与数据在同一事务中写入
pub fn seed_from(
    conn: &Arc<Mutex<Connection>>,
    catalog: &dyn CatalogRepository,
    enrollments: &dyn EnrollmentRepository,
    audit: &dyn AuditRepository,
) -> RepositoryResult<usize> {
    let lectures = catalog.load_lectures()?;
    let pairings = catalog.load_pairings()?;
    let roster = enrollments.load_all()?;
    let history = audit.load_all()?;

    let mut guard = lock(conn)?;
    if let Some(seeded_at) = seeded_at(&guard)? {
        tracing::info!(seeded_at = %seeded_at, "SQLite 已导入过种子数据, 跳过");
        return Ok(0);
    }
    // 无标记但已有数据 (旧库或手工写入) 同样不导入
    let existing = existing_rows(&guard)?;
    if existing > 0 {
        tracing::info!(rows = existing, "SQLite 已有数据, 跳过种子导入");
        return Ok(0);
    }

    let tx = guard.transaction()?;
    let mut count = 0;
    for (section, lecture) in &lectures {
        tx.execute(
            r#"
            INSERT INTO lecture (section, course_unit, weekday, start_hour, duration, kind)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                section,
                lecture.course_unit,
                weekday_name(lecture.weekday),
                lecture.start_hour,
                lecture.duration,
                lecture.kind.as_str(),
            ],
        )?;
        count += 1;
    }
    for pairing in &pairings {
        count += tx.execute(
            "INSERT OR IGNORE INTO valid_pairing (course_unit, section) VALUES (?1, ?2)",
            params![pairing.course_unit, pairing.section],
        )?;
    }
    for record in &roster {
        tx.execute(
            r#"
            INSERT INTO enrollment (student_id, student_name, course_unit, section)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                record.student_id,
                record.student_name,
                record.course_unit,
                record.section
            ],
        )?;
        count += 1;
    }
    for record in &history {
        tx.execute(
            r#"
            INSERT INTO audit_log (student_id, student_name, kind, course_unit, source_section, dest_section)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                record.student_id,
                record.student_name,
                record.kind().as_str(),
                record.course_unit(),
                record.source_section(),
                record.dest_section(),
            ],
        )?;
        count += 1;
    }
    tx.execute(
        "INSERT INTO seed_marker (marker_id, row_count) VALUES (1, ?1)",
        params![count as i64],
    )?;
    tx.commit()?;

    tracing::info!(
        lectures = lectures.len(),
        pairings = pairings.len(),
        enrollments = roster.len(),
        audit = history.len(),
        "SQLite 种子数据导入完成"
    );
    Ok(count)
}

/// 种子导入时间 (未导入过为 None)
fn seeded_at(conn: &Connection) -> RepositoryResult<Option<String>> {
    Ok(conn
        .query_row("SELECT seeded_at FROM seed_marker WHERE marker_id = 1", [], |row| row.get(0))
        .optional()?)
}

fn existing_rows(conn: &Connection) -> RepositoryResult<i64> {
    let mut total = 0;
    for table in ["lecture", "valid_pairing", "enrollment", "audit_log"] {
        let rows: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
        total += rows;
    }
    Ok(total)
}
