// ==========================================
// 分班选课系统 - 审计记录领域模型
// ==========================================
// 红线: 每个被接受的请求都必须记录, 且可通过逆操作撤销
// 对齐: studentId, studentName, kind, courseUnitCode, source, destination
// ==========================================

use crate::domain::request::{ChangeKind, EnrollmentChange};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 不适用字段的占位符
pub const PLACEHOLDER: &str = "-";

// ==========================================
// AuditRecord - 审计记录
// ==========================================
// 在日志中的位置 (从 1 开始) 即对外的记录编号
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub student_id: String,
    pub student_name: String,
    pub change: EnrollmentChange,
}

impl AuditRecord {
    pub fn new(
        student_id: impl Into<String>,
        student_name: impl Into<String>,
        change: EnrollmentChange,
    ) -> Self {
        Self {
            student_id: student_id.into(),
            student_name: student_name.into(),
            change,
        }
    }

    /// 从扁平字段还原
    ///
    /// # 返回
    /// - None: kind 无法识别, 或 switch 缺少班级
    pub fn from_parts(
        student_id: &str,
        student_name: &str,
        kind: &str,
        course_unit: &str,
        source_section: &str,
        dest_section: &str,
    ) -> Option<Self> {
        let change = match ChangeKind::from_str(kind)? {
            ChangeKind::Add => EnrollmentChange::add(course_unit),
            ChangeKind::Remove => EnrollmentChange::remove(course_unit),
            ChangeKind::Switch => {
                if is_placeholder(source_section) || is_placeholder(dest_section) {
                    return None;
                }
                EnrollmentChange::switch(course_unit, source_section, dest_section)
            }
        };
        Some(Self::new(student_id, student_name, change))
    }

    pub fn kind(&self) -> ChangeKind {
        self.change.kind()
    }

    pub fn course_unit(&self) -> &str {
        self.change.course_unit()
    }

    /// 源班级 (非 switch 为占位符)
    pub fn source_section(&self) -> &str {
        match &self.change {
            EnrollmentChange::Switch { from_section, .. } => from_section,
            _ => PLACEHOLDER,
        }
    }

    /// 目标班级 (非 switch 为占位符)
    pub fn dest_section(&self) -> &str {
        match &self.change {
            EnrollmentChange::Switch { to_section, .. } => to_section,
            _ => PLACEHOLDER,
        }
    }

    /// 带编号的可读摘要
    pub fn summary(&self, seq: usize) -> String {
        format!("#{} {}", seq, self)
    }
}

impl fmt::Display for AuditRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}) {}", self.student_name, self.student_id, self.change)
    }
}

fn is_placeholder(value: &str) -> bool {
    let v = value.trim();
    v.is_empty() || v == PLACEHOLDER
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parts_add_uses_placeholders() {
        let record = AuditRecord::from_parts("202025232", "Ana", "add", "CP", "-", "-").unwrap();
        assert_eq!(record.change, EnrollmentChange::add("CP"));
        assert_eq!(record.source_section(), PLACEHOLDER);
        assert_eq!(record.dest_section(), PLACEHOLDER);
    }

    #[test]
    fn test_from_parts_switch_requires_sections() {
        assert!(AuditRecord::from_parts("1", "A", "switch", "PF", "-", "3LEIC02").is_none());
        let record = AuditRecord::from_parts("1", "A", "switch", "PF", "3LEIC01", "3LEIC02").unwrap();
        assert_eq!(record.source_section(), "3LEIC01");
        assert_eq!(record.dest_section(), "3LEIC02");
    }

    #[test]
    fn test_from_parts_unknown_kind() {
        assert!(AuditRecord::from_parts("1", "A", "enroll", "PF", "-", "-").is_none());
    }

    #[test]
    fn test_summary_format() {
        let record = AuditRecord::new("202025232", "Ana", EnrollmentChange::switch("PF", "3LEIC01", "3LEIC02"));
        assert_eq!(record.summary(2), "#2 Ana(202025232) switch(PF) 3LEIC01 -> 3LEIC02");
    }
}
