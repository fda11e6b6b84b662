// ==========================================
// 分班选课系统 - CSV 文件记录仓储
// ==========================================
// 格式: 逗号分隔, 首行为表头
// 写入: 追加直接写文件尾; 更新/删除先写同目录临时文件, 再原子 rename 覆盖
// ==========================================


use crate::config::StorageConfig;
use crate::domain::{
    parse_weekday, weekday_name, AuditRecord, EnrollmentRecord, LectureKind, LectureOccurrence,
    SectionEnrollment,
};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::record_repo::{
    check_duration, AuditRepository, CatalogRepository, EnrollmentRepository,
};
use csv::{ReaderBuilder, Trim, WriterBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

// ==========================================
// 行结构 (与文件表头对齐)
// ==========================================

trait CsvRow: Serialize + DeserializeOwned {
    const HEADER: &'static [&'static str];
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EnrollmentRow {
    #[serde(rename = "StudentCode")]
    student_id: String,
    #[serde(rename = "StudentName")]
    student_name: String,
    #[serde(rename = "UcCode")]
    course_unit: String,
    #[serde(rename = "ClassCode")]
    section: String,
}

impl CsvRow for EnrollmentRow {
    const HEADER: &'static [&'static str] = &["StudentCode", "StudentName", "UcCode", "ClassCode"];
}

impl From<&EnrollmentRecord> for EnrollmentRow {
    fn from(r: &EnrollmentRecord) -> Self {
        Self {
            student_id: r.student_id.clone(),
            student_name: r.student_name.clone(),
            course_unit: r.course_unit.clone(),
            section: r.section.clone(),
        }
    }
}

impl From<EnrollmentRow> for EnrollmentRecord {
    fn from(r: EnrollmentRow) -> Self {
        Self {
            student_id: r.student_id,
            student_name: r.student_name,
            course_unit: r.course_unit,
            section: r.section,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LectureRow {
    #[serde(rename = "ClassCode")]
    section: String,
    #[serde(rename = "UcCode")]
    course_unit: String,
    #[serde(rename = "Weekday")]
    weekday: String,
    #[serde(rename = "StartHour")]
    start_hour: f64,
    #[serde(rename = "Duration")]
    duration: f64,
    #[serde(rename = "Type")]
    kind: String,
}

impl CsvRow for LectureRow {
    const HEADER: &'static [&'static str] =
        &["ClassCode", "UcCode", "Weekday", "StartHour", "Duration", "Type"];
}

impl LectureRow {
    fn into_lecture(self) -> RepositoryResult<(String, LectureOccurrence)> {
        let weekday = parse_weekday(&self.weekday).ok_or_else(|| {
            RepositoryError::field_value("lecture", "Weekday", format!("无法识别: {}", self.weekday))
        })?;
        let kind = LectureKind::from_str(&self.kind).ok_or_else(|| {
            RepositoryError::field_value("lecture", "Type", format!("无法识别: {}", self.kind))
        })?;
        check_duration("lecture", "Duration", self.duration)?;
        let lecture = LectureOccurrence::new(self.course_unit, weekday, self.start_hour, self.duration, kind);
        Ok((self.section, lecture))
    }

    fn from_lecture(section: &str, lecture: &LectureOccurrence) -> Self {
        Self {
            section: section.to_string(),
            course_unit: lecture.course_unit.clone(),
            weekday: weekday_name(lecture.weekday).to_string(),
            start_hour: lecture.start_hour,
            duration: lecture.duration,
            kind: lecture.kind.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PairingRow {
    #[serde(rename = "UcCode")]
    course_unit: String,
    #[serde(rename = "ClassCode")]
    section: String,
}

impl CsvRow for PairingRow {
    const HEADER: &'static [&'static str] = &["UcCode", "ClassCode"];
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AuditRow {
    #[serde(rename = "StudentCode")]
    student_id: String,
    #[serde(rename = "StudentName")]
    student_name: String,
    #[serde(rename = "Type")]
    kind: String,
    #[serde(rename = "UcCode")]
    course_unit: String,
    #[serde(rename = "StartCode")]
    source_section: String,
    #[serde(rename = "EndCode")]
    dest_section: String,
}

impl CsvRow for AuditRow {
    const HEADER: &'static [&'static str] =
        &["StudentCode", "StudentName", "Type", "UcCode", "StartCode", "EndCode"];
}

impl From<&AuditRecord> for AuditRow {
    fn from(r: &AuditRecord) -> Self {
        Self {
            student_id: r.student_id.clone(),
            student_name: r.student_name.clone(),
            kind: r.kind().as_str().to_string(),
            course_unit: r.course_unit().to_string(),
            source_section: r.source_section().to_string(),
            dest_section: r.dest_section().to_string(),
        }
    }
}

impl AuditRow {
    fn into_record(self) -> RepositoryResult<AuditRecord> {
        AuditRecord::from_parts(
            &self.student_id,
            &self.student_name,
            &self.kind,
            &self.course_unit,
            &self.source_section,
            &self.dest_section,
        )
        .ok_or_else(|| {
            RepositoryError::field_value(
                "audit",
                "Type",
                format!("无效的审计记录: kind={}, uc={}", self.kind, self.course_unit),
            )
        })
    }
}

// ==========================================
// 文件读写工具
// ==========================================

fn read_rows<T: CsvRow>(path: &Path) -> RepositoryResult<Vec<T>> {
    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(file);

    let mut rows = Vec::new();
    for result in reader.deserialize() {
        rows.push(result?);
    }
    Ok(rows)
}

/// 读取可选文件: 文件不存在视为空
fn read_rows_or_empty<T: CsvRow>(path: &Path) -> RepositoryResult<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    read_rows(path)
}

/// 整体重写: 同目录临时文件 → fsync → rename
fn rewrite_atomically<T: CsvRow>(path: &Path, rows: &[T]) -> RepositoryResult<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let temp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .from_writer(temp.as_file());
        writer.write_record(T::HEADER)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
    }
    temp.as_file().sync_all()?;
    temp.persist(path)?;
    Ok(())
}

/// 追加单行; 新文件先写表头
fn append_row<T: CsvRow>(path: &Path, row: &T) -> RepositoryResult<()> {
    let needs_header = std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    {
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(&file);
        if needs_header {
            writer.write_record(T::HEADER)?;
        }
        writer.serialize(row)?;
        writer.flush()?;
    }
    file.sync_data()?;
    Ok(())
}

// ==========================================
// CsvCatalogRepository - 课表目录
// ==========================================
pub struct CsvCatalogRepository {
    schedule_path: PathBuf,
    pairing_path: PathBuf,
}

impl CsvCatalogRepository {
    pub fn new(schedule_path: impl Into<PathBuf>, pairing_path: impl Into<PathBuf>) -> Self {
        Self {
            schedule_path: schedule_path.into(),
            pairing_path: pairing_path.into(),
        }
    }

    /// 导出课表 (用于生成种子数据)
    pub fn write_lectures(&self, lectures: &[(String, LectureOccurrence)]) -> RepositoryResult<()> {
        let rows: Vec<LectureRow> = lectures
            .iter()
            .map(|(section, lecture)| LectureRow::from_lecture(section, lecture))
            .collect();
        rewrite_atomically(&self.schedule_path, &rows)
    }

    /// 导出有效配对 (用于生成种子数据)
    pub fn write_pairings(&self, pairings: &[SectionEnrollment]) -> RepositoryResult<()> {
        let rows: Vec<PairingRow> = pairings
            .iter()
            .map(|p| PairingRow {
                course_unit: p.course_unit.clone(),
                section: p.section.clone(),
            })
            .collect();
        rewrite_atomically(&self.pairing_path, &rows)
    }
}

impl CatalogRepository for CsvCatalogRepository {
    fn load_lectures(&self) -> RepositoryResult<Vec<(String, LectureOccurrence)>> {
        read_rows::<LectureRow>(&self.schedule_path)?
            .into_iter()
            .map(LectureRow::into_lecture)
            .collect()
    }

    fn load_pairings(&self) -> RepositoryResult<Vec<SectionEnrollment>> {
        Ok(read_rows::<PairingRow>(&self.pairing_path)?
            .into_iter()
            .map(|r| SectionEnrollment::new(r.section, r.course_unit))
            .collect())
    }
}

// ==========================================
// CsvEnrollmentRepository - 名册
// ==========================================
pub struct CsvEnrollmentRepository {
    path: PathBuf,
}

impl CsvEnrollmentRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 整体写入名册 (用于生成种子数据)
    pub fn write_all(&self, records: &[EnrollmentRecord]) -> RepositoryResult<()> {
        let rows: Vec<EnrollmentRow> = records.iter().map(EnrollmentRow::from).collect();
        rewrite_atomically(&self.path, &rows)
    }
}

impl EnrollmentRepository for CsvEnrollmentRepository {
    fn load_all(&self) -> RepositoryResult<Vec<EnrollmentRecord>> {
        Ok(read_rows::<EnrollmentRow>(&self.path)?
            .into_iter()
            .map(EnrollmentRecord::from)
            .collect())
    }

    fn append(&self, record: &EnrollmentRecord) -> RepositoryResult<()> {
        let mut rows = read_rows_or_empty::<EnrollmentRow>(&self.path)?;
        let insert_at = rows
            .iter()
            .rposition(|r| r.student_id == record.student_id)
            .map(|i| i + 1)
            .unwrap_or(rows.len());
        rows.insert(insert_at, EnrollmentRow::from(record));
        rewrite_atomically(&self.path, &rows)
    }

    fn update_section(
        &self,
        student_id: &str,
        course_unit: &str,
        new_section: &str,
    ) -> RepositoryResult<()> {
        let mut rows = read_rows::<EnrollmentRow>(&self.path)?;
        let row = rows
            .iter_mut()
            .find(|r| r.student_id == student_id && r.course_unit == course_unit)
            .ok_or_else(|| {
                RepositoryError::not_found("enrollment", format!("{}/{}", student_id, course_unit))
            })?;
        row.section = new_section.to_string();
        rewrite_atomically(&self.path, &rows)
    }

    fn delete(&self, student_id: &str, course_unit: &str) -> RepositoryResult<()> {
        let mut rows = read_rows::<EnrollmentRow>(&self.path)?;
        let before = rows.len();
        rows.retain(|r| !(r.student_id == student_id && r.course_unit == course_unit));
        if rows.len() == before {
            return Err(RepositoryError::not_found(
                "enrollment",
                format!("{}/{}", student_id, course_unit),
            ));
        }
        rewrite_atomically(&self.path, &rows)
    }
}

// ==========================================
// CsvAuditRepository - 审计日志
// ==========================================
// 文件不存在视为空日志
pub struct CsvAuditRepository {
    path: PathBuf,
}

impl CsvAuditRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AuditRepository for CsvAuditRepository {
    fn load_all(&self) -> RepositoryResult<Vec<AuditRecord>> {
        read_rows_or_empty::<AuditRow>(&self.path)?
            .into_iter()
            .map(AuditRow::into_record)
            .collect()
    }

    fn append(&self, record: &AuditRecord) -> RepositoryResult<()> {
        append_row(&self.path, &AuditRow::from(record))
    }

    fn delete_at(&self, seq: usize) -> RepositoryResult<AuditRecord> {
        let mut rows = read_rows_or_empty::<AuditRow>(&self.path)?;
        if seq == 0 || seq > rows.len() {
            return Err(RepositoryError::not_found("audit", seq.to_string()));
        }
        let removed = rows.remove(seq - 1);
        rewrite_atomically(&self.path, &rows)?;
        removed.into_record()
    }
}

// ==========================================
// CsvRecordSet - 一个数据目录下的全部 CSV 仓储
// ==========================================
pub struct CsvRecordSet {
    pub catalog: CsvCatalogRepository,
    pub enrollments: CsvEnrollmentRepository,
    pub audit: CsvAuditRepository,
}

impl CsvRecordSet {
    pub fn from_storage(storage: &StorageConfig) -> Self {
        Self {
            catalog: CsvCatalogRepository::new(storage.schedule_path(), storage.pairing_path()),
            enrollments: CsvEnrollmentRepository::new(storage.roster_path()),
            audit: CsvAuditRepository::new(storage.audit_path()),
        }
    }
}
