// ==========================================
// 分班选课系统 - 请求处理结果
// ==========================================
// 业务拒绝是值, 不是错误: 只有 I/O 类异常才走 Err
// 每个拒绝原因以稳定代码开头, 后接可读说明
// ==========================================

use crate::domain::{EnrollmentChange, SectionEnrollment};
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// RejectionCategory - 拒绝分类
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionCategory {
    NotFound,          // 学生 / 记录 / 请求不存在
    Invalid,           // 课程单元或配对无效
    PolicyRejected,    // 均衡、容量、选课上限
    CollisionRejected, // 课表时间冲突
}

impl RejectionCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionCategory::NotFound => "NOT_FOUND",
            RejectionCategory::Invalid => "INVALID",
            RejectionCategory::PolicyRejected => "POLICY_REJECTED",
            RejectionCategory::CollisionRejected => "COLLISION_REJECTED",
        }
    }
}

impl fmt::Display for RejectionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// RejectReason - 拒绝原因
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum RejectReason {
    DuplicateEnrollment { course_unit: String, section: String },
    UnknownCourseUnit { course_unit: String },
    EnrollmentCap { limit: usize },
    NoVacancy { course_unit: String },
    NotEnrolled { course_unit: String, section: Option<String> },
    WouldBreakBalance { spread_before: i64, spread_after: i64, max_after: i64 },
    MismatchedPairing { course_unit: String, from_section: String, to_section: String },
    Collision { first: String, second: String },
    StudentNotFound { student_id: String },
    RecordNotFound { seq: usize },
    RequestNotFound { position: usize },
    SameSection { section: String },
}

impl RejectReason {
    /// 稳定的原因代码
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::DuplicateEnrollment { .. } => "duplicate enrollment",
            RejectReason::UnknownCourseUnit { .. } => "unknown course-unit",
            RejectReason::EnrollmentCap { .. } => "enrollment cap",
            RejectReason::NoVacancy { .. } => "no vacancy",
            RejectReason::NotEnrolled { .. } => "not enrolled",
            RejectReason::WouldBreakBalance { .. } => "would break balance",
            RejectReason::MismatchedPairing { .. } => "mismatched pairing",
            RejectReason::Collision { .. } => "collision",
            RejectReason::StudentNotFound { .. } => "student not found",
            RejectReason::RecordNotFound { .. } => "record not found",
            RejectReason::RequestNotFound { .. } => "request not found",
            RejectReason::SameSection { .. } => "same section",
        }
    }

    pub fn category(&self) -> RejectionCategory {
        match self {
            RejectReason::StudentNotFound { .. }
            | RejectReason::RecordNotFound { .. }
            | RejectReason::RequestNotFound { .. } => RejectionCategory::NotFound,
            RejectReason::UnknownCourseUnit { .. }
            | RejectReason::MismatchedPairing { .. }
            | RejectReason::NotEnrolled { .. }
            | RejectReason::DuplicateEnrollment { .. }
            | RejectReason::SameSection { .. } => RejectionCategory::Invalid,
            RejectReason::EnrollmentCap { .. }
            | RejectReason::NoVacancy { .. }
            | RejectReason::WouldBreakBalance { .. } => RejectionCategory::PolicyRejected,
            RejectReason::Collision { .. } => RejectionCategory::CollisionRejected,
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.code())?;
        match self {
            RejectReason::DuplicateEnrollment { course_unit, section } => {
                write!(f, "already enrolled in {} ({})", course_unit, section)
            }
            RejectReason::UnknownCourseUnit { course_unit } => {
                write!(f, "{} is not offered by any section", course_unit)
            }
            RejectReason::EnrollmentCap { limit } => {
                write!(f, "already enrolled in {} course-units", limit)
            }
            RejectReason::NoVacancy { course_unit } => {
                write!(f, "no section of {} has room without breaking balance or schedule", course_unit)
            }
            RejectReason::NotEnrolled { course_unit, section: Some(section) } => {
                write!(f, "not enrolled in {} ({})", course_unit, section)
            }
            RejectReason::NotEnrolled { course_unit, section: None } => {
                write!(f, "not enrolled in {}", course_unit)
            }
            RejectReason::WouldBreakBalance {
                spread_before,
                spread_after,
                max_after,
            } => write!(
                f,
                "occupancy spread {} -> {} (max {})",
                spread_before, spread_after, max_after
            ),
            RejectReason::MismatchedPairing {
                course_unit,
                from_section,
                to_section,
            } => write!(
                f,
                "{} / {} are not both valid sections of {}",
                from_section, to_section, course_unit
            ),
            RejectReason::Collision { first, second } => write!(f, "{} overlaps {}", first, second),
            RejectReason::StudentNotFound { student_id } => write!(f, "{}", student_id),
            RejectReason::RecordNotFound { seq } => write!(f, "audit record #{}", seq),
            RejectReason::RequestNotFound { position } => write!(f, "pending request #{}", position),
            RejectReason::SameSection { section } => {
                write!(f, "source and destination are both {}", section)
            }
        }
    }
}

// ==========================================
// Acceptance - 被接受的变更
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acceptance {
    pub student_id: String,
    pub student_name: String,
    pub change: EnrollmentChange,
    /// 变更落定的配对: add 为选中的班级, remove 为退出的班级, switch 为目标班级
    pub pairing: SectionEnrollment,
}

impl fmt::Display for Acceptance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}) {} [{}]",
            self.student_name, self.student_id, self.change, self.pairing
        )
    }
}

// ==========================================
// RequestOutcome
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "lowercase")]
pub enum RequestOutcome {
    Accepted(Acceptance),
    Rejected(RejectReason),
}

impl RequestOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, RequestOutcome::Accepted(_))
    }

    pub fn acceptance(&self) -> Option<&Acceptance> {
        match self {
            RequestOutcome::Accepted(a) => Some(a),
            RequestOutcome::Rejected(_) => None,
        }
    }

    pub fn rejection(&self) -> Option<&RejectReason> {
        match self {
            RequestOutcome::Accepted(_) => None,
            RequestOutcome::Rejected(r) => Some(r),
        }
    }
}

impl From<RejectReason> for RequestOutcome {
    fn from(reason: RejectReason) -> Self {
        RequestOutcome::Rejected(reason)
    }
}

impl fmt::Display for RequestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestOutcome::Accepted(a) => write!(f, "accepted: {}", a),
            RequestOutcome::Rejected(r) => write!(f, "rejected: {}", r),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_start_with_code() {
        let reasons = vec![
            RejectReason::NoVacancy { course_unit: "CP".into() },
            RejectReason::Collision { first: "a".into(), second: "b".into() },
            RejectReason::MismatchedPairing {
                course_unit: "PF".into(),
                from_section: "3LEIC01".into(),
                to_section: "3LEIC02".into(),
            },
            RejectReason::NotEnrolled { course_unit: "PF".into(), section: None },
        ];
        for reason in reasons {
            assert!(reason.to_string().starts_with(reason.code()));
        }
    }

    #[test]
    fn test_categories() {
        assert_eq!(
            RejectReason::StudentNotFound { student_id: "1".into() }.category(),
            RejectionCategory::NotFound
        );
        assert_eq!(
            RejectReason::EnrollmentCap { limit: 7 }.category(),
            RejectionCategory::PolicyRejected
        );
        assert_eq!(
            RejectReason::Collision { first: "a".into(), second: "b".into() }.category(),
            RejectionCategory::CollisionRejected
        );
        assert_eq!(
            RejectReason::UnknownCourseUnit { course_unit: "X".into() }.category(),
            RejectionCategory::Invalid
        );
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let outcome = RequestOutcome::from(RejectReason::RecordNotFound { seq: 4 });
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "rejected");
        assert_eq!(json["detail"]["code"], "record_not_found");
        assert!(!outcome.is_accepted());
        assert!(outcome.acceptance().is_none());
    }
}
