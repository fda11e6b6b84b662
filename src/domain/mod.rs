// ==========================================
// 分班选课系统 - 领域模型层
// ==========================================
// 职责: 定义学生、课表、选课请求、审计记录等值类型
// 红线: 不含数据访问逻辑, 不含引擎逻辑
// ==========================================

pub mod audit;
pub mod request;
pub mod schedule;
pub mod student;
pub mod types;

// 重导出核心类型
pub use audit::{AuditRecord, PLACEHOLDER};
pub use request::{ChangeKind, EnrollmentChange, EnrollmentRequest};
pub use schedule::{format_hour, LectureOccurrence, SectionSchedule};
pub use student::{EnrollmentRecord, SectionEnrollment, Student};
pub use types::{parse_weekday, weekday_index, weekday_name, LectureKind, SortOrder};
