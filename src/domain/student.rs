// ==========================================
// 分班选课系统 - 学生领域模型
// ==========================================
// 学生、(班级, 课程单元) 选课配对、名册记录
// 红线: 同一课程单元最多只能选一个班
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ==========================================
// SectionEnrollment - 选课配对
// ==========================================
// 字段顺序决定派生的 Ord: 先课程单元, 再班级
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SectionEnrollment {
    pub course_unit: String, // 课程单元代码 (如 L.EIC001)
    pub section: String,     // 班级代码 (如 1LEIC01)
}

impl SectionEnrollment {
    pub fn new(section: impl Into<String>, course_unit: impl Into<String>) -> Self {
        Self {
            course_unit: course_unit.into(),
            section: section.into(),
        }
    }
}

impl fmt::Display for SectionEnrollment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.section, self.course_unit)
    }
}

// ==========================================
// Student - 学生
// ==========================================
// 仅在名册加载时创建, 之后只由请求引擎修改, 从不删除
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    pub name: String,
    enrollments: BTreeSet<SectionEnrollment>,
}

impl Student {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            enrollments: BTreeSet::new(),
        }
    }

    /// 入学年份: 学号前四位 (如 202025232 → 2020)
    pub fn year(&self) -> &str {
        self.id.get(..4).unwrap_or(&self.id)
    }

    pub fn enrollments(&self) -> &BTreeSet<SectionEnrollment> {
        &self.enrollments
    }

    pub fn enrollment_count(&self) -> usize {
        self.enrollments.len()
    }

    /// 该学生在指定课程单元所在的班级
    pub fn section_for(&self, course_unit: &str) -> Option<&str> {
        self.enrollments
            .iter()
            .find(|e| e.course_unit == course_unit)
            .map(|e| e.section.as_str())
    }

    pub fn holds_course_unit(&self, course_unit: &str) -> bool {
        self.section_for(course_unit).is_some()
    }

    pub fn holds(&self, pairing: &SectionEnrollment) -> bool {
        self.enrollments.contains(pairing)
    }

    /// 加入配对; 已选同一课程单元时拒绝并返回 false
    pub fn enroll(&mut self, pairing: SectionEnrollment) -> bool {
        if self.holds_course_unit(&pairing.course_unit) {
            return false;
        }
        self.enrollments.insert(pairing)
    }

    pub fn withdraw(&mut self, pairing: &SectionEnrollment) -> bool {
        self.enrollments.remove(pairing)
    }
}

// ==========================================
// EnrollmentRecord - 名册持久化记录
// ==========================================
// 对齐: studentId, studentName, courseUnitCode, sectionCode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentRecord {
    pub student_id: String,
    pub student_name: String,
    pub course_unit: String,
    pub section: String,
}

impl EnrollmentRecord {
    pub fn new(student: &Student, pairing: &SectionEnrollment) -> Self {
        Self {
            student_id: student.id.clone(),
            student_name: student.name.clone(),
            course_unit: pairing.course_unit.clone(),
            section: pairing.section.clone(),
        }
    }

    pub fn pairing(&self) -> SectionEnrollment {
        SectionEnrollment::new(self.section.clone(), self.course_unit.clone())
    }
}
