// ==========================================
// 分班选课系统 - 持久化记录 Repository Trait
// ==========================================
// 职责: 定义名册 / 课表目录 / 审计日志的数据访问接口
// 红线: Repository 不含业务规则, 只做记录的追加、按键更新、按键删除
// 约束: 每次变更对单条变更而言是崩溃一致的
// ==========================================

use crate::domain::{AuditRecord, EnrollmentRecord, LectureOccurrence, SectionEnrollment};
use crate::repository::error::{RepositoryError, RepositoryResult};

/// 周课时长校验 (各后端读取课表时共用)
///
/// # 返回
/// - Err(FieldValueError): 时长为 NaN 或不大于 0
pub(crate) fn check_duration(record: &str, field: &str, duration: f64) -> RepositoryResult<()> {
    if duration.is_nan() || duration <= 0.0 {
        return Err(RepositoryError::field_value(
            record,
            field,
            format!("必须为正数: {}", duration),
        ));
    }
    Ok(())
}

// ==========================================
// CatalogRepository Trait
// ==========================================
// 用途: 课表与有效配对 (只读, 启动时加载一次)
// 实现者: CsvCatalogRepository / SqliteCatalogRepository
pub trait CatalogRepository: Send {
    /// 读取全部周课
    ///
    /// # 返回
    /// - Vec<(班级代码, 周课)>
    fn load_lectures(&self) -> RepositoryResult<Vec<(String, LectureOccurrence)>>;

    /// 读取全部有效的 (班级, 课程单元) 配对
    fn load_pairings(&self) -> RepositoryResult<Vec<SectionEnrollment>>;
}

// ==========================================
// EnrollmentRepository Trait
// ==========================================
// 用途: 名册记录 (每个学生每门课程单元一行)
// 键: (student_id, course_unit)
pub trait EnrollmentRepository: Send {
    /// 读取全部名册记录 (同一学生的行相邻)
    fn load_all(&self) -> RepositoryResult<Vec<EnrollmentRecord>>;

    /// 追加一行 (紧跟该学生已有的行)
    fn append(&self, record: &EnrollmentRecord) -> RepositoryResult<()>;

    /// 按键更新班级
    ///
    /// # 返回
    /// - Err(NotFound): 键不存在
    fn update_section(
        &self,
        student_id: &str,
        course_unit: &str,
        new_section: &str,
    ) -> RepositoryResult<()>;

    /// 按键删除
    ///
    /// # 返回
    /// - Err(NotFound): 键不存在
    fn delete(&self, student_id: &str, course_unit: &str) -> RepositoryResult<()>;
}

// ==========================================
// AuditRepository Trait
// ==========================================
// 用途: 审计日志 (只追加, 撤销时按位置删除)
// 键: 从 1 开始的位置
pub trait AuditRepository: Send {
    /// 按顺序读取全部审计记录
    fn load_all(&self) -> RepositoryResult<Vec<AuditRecord>>;

    /// 追加到末尾
    fn append(&self, record: &AuditRecord) -> RepositoryResult<()>;

    /// 删除第 seq 条 (从 1 开始)
    ///
    /// # 返回
    /// - Ok(record): 被删除的记录
    /// - Err(NotFound): 位置越界
    fn delete_at(&self, seq: usize) -> RepositoryResult<AuditRecord>;
}
