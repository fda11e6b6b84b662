// ==========================================
// 分班选课系统 - 选课请求领域模型
// ==========================================
// 生命周期: 创建(待处理) → 接受 / 丢弃
// 红线: 请求创建后不可修改, 只能被消费
// ==========================================

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ==========================================
// ChangeKind - 请求类型标签
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Add,
    Remove,
    Switch,
}

impl ChangeKind {
    /// 转换为字符串 (用于记录存储)
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Add => "add",
            ChangeKind::Remove => "remove",
            ChangeKind::Switch => "switch",
        }
    }

    /// 从字符串解析
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim() {
            "add" => Some(ChangeKind::Add),
            "remove" => Some(ChangeKind::Remove),
            "switch" => Some(ChangeKind::Switch),
            _ => None,
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// EnrollmentChange - 选课变更 (带负载的标签联合)
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EnrollmentChange {
    /// 选一门新课程单元, 班级由引擎挑选
    Add { course_unit: String },
    /// 退出课程单元
    Remove { course_unit: String },
    /// 同一课程单元内换班
    Switch {
        course_unit: String,
        from_section: String,
        to_section: String,
    },
}

impl EnrollmentChange {
    pub fn add(course_unit: impl Into<String>) -> Self {
        EnrollmentChange::Add {
            course_unit: course_unit.into(),
        }
    }

    pub fn remove(course_unit: impl Into<String>) -> Self {
        EnrollmentChange::Remove {
            course_unit: course_unit.into(),
        }
    }

    pub fn switch(
        course_unit: impl Into<String>,
        from_section: impl Into<String>,
        to_section: impl Into<String>,
    ) -> Self {
        EnrollmentChange::Switch {
            course_unit: course_unit.into(),
            from_section: from_section.into(),
            to_section: to_section.into(),
        }
    }

    pub fn kind(&self) -> ChangeKind {
        match self {
            EnrollmentChange::Add { .. } => ChangeKind::Add,
            EnrollmentChange::Remove { .. } => ChangeKind::Remove,
            EnrollmentChange::Switch { .. } => ChangeKind::Switch,
        }
    }

    pub fn course_unit(&self) -> &str {
        match self {
            EnrollmentChange::Add { course_unit }
            | EnrollmentChange::Remove { course_unit }
            | EnrollmentChange::Switch { course_unit, .. } => course_unit,
        }
    }

    /// 结构逆操作: add ↔ remove, switch 交换源/目标班级
    pub fn inverse(&self) -> Self {
        match self {
            EnrollmentChange::Add { course_unit } => EnrollmentChange::remove(course_unit.clone()),
            EnrollmentChange::Remove { course_unit } => EnrollmentChange::add(course_unit.clone()),
            EnrollmentChange::Switch {
                course_unit,
                from_section,
                to_section,
            } => EnrollmentChange::switch(
                course_unit.clone(),
                to_section.clone(),
                from_section.clone(),
            ),
        }
    }
}

impl fmt::Display for EnrollmentChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnrollmentChange::Switch {
                course_unit,
                from_section,
                to_section,
            } => write!(f, "switch({}) {} -> {}", course_unit, from_section, to_section),
            other => write!(f, "{}({})", other.kind(), other.course_unit()),
        }
    }
}

// ==========================================
// EnrollmentRequest - 待处理选课请求
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentRequest {
    pub request_id: String,       // UUID
    pub student_id: String,
    pub change: EnrollmentChange,
    pub created_at: NaiveDateTime,
}

impl EnrollmentRequest {
    pub fn new(student_id: impl Into<String>, change: EnrollmentChange) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            student_id: student_id.into(),
            change,
            created_at: Utc::now().naive_utc(),
        }
    }
}
