// ==========================================
// 分班选课系统 - 课表领域模型
// ==========================================
// LectureOccurrence: 一次固定的周课 (加载后不可变)
// SectionSchedule: 一个班级的全部周课
// ==========================================

use crate::domain::types::{weekday_index, weekday_name, LectureKind};
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

// ==========================================
// LectureOccurrence - 周课
// ==========================================
// 时间单位: 小时 (可带小数, 如 10.5 = 10:30)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LectureOccurrence {
    pub course_unit: String,
    pub weekday: Weekday,
    pub start_hour: f64,
    pub duration: f64,
    pub kind: LectureKind,
}

impl LectureOccurrence {
    pub fn new(
        course_unit: impl Into<String>,
        weekday: Weekday,
        start_hour: f64,
        duration: f64,
        kind: LectureKind,
    ) -> Self {
        Self {
            course_unit: course_unit.into(),
            weekday,
            start_hour,
            duration,
            kind,
        }
    }

    pub fn end_hour(&self) -> f64 {
        self.start_hour + self.duration
    }

    /// 课表规范顺序: 星期 → 开始时间 → 时长降序
    pub fn schedule_cmp(&self, other: &Self) -> Ordering {
        weekday_index(self.weekday)
            .cmp(&weekday_index(other.weekday))
            .then(self.start_hour.total_cmp(&other.start_hour))
            .then(other.duration.total_cmp(&self.duration))
    }
}

impl fmt::Display for LectureOccurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}-{} ({})",
            weekday_name(self.weekday),
            self.course_unit,
            format_hour(self.start_hour),
            format_hour(self.end_hour()),
            self.kind
        )
    }
}

/// 10.5 → "10:30"
pub fn format_hour(hour: f64) -> String {
    let total_minutes = (hour * 60.0).round() as i64;
    format!("{:02}:{:02}", total_minutes / 60, total_minutes % 60)
}

// ==========================================
// SectionSchedule - 班级课表
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionSchedule {
    pub section: String,
    pub lectures: Vec<LectureOccurrence>,
}

impl SectionSchedule {
    /// 空课表 (班级没有建模的课程时使用)
    pub fn empty(section: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            lectures: Vec::new(),
        }
    }

    pub fn add_lecture(&mut self, lecture: LectureOccurrence) {
        self.lectures.push(lecture);
    }

    /// 只取指定课程单元的周课
    pub fn lectures_for<'a>(
        &'a self,
        course_unit: &'a str,
    ) -> impl Iterator<Item = &'a LectureOccurrence> + 'a {
        self.lectures
            .iter()
            .filter(move |l| l.course_unit == course_unit)
    }

    pub fn is_empty(&self) -> bool {
        self.lectures.is_empty()
    }

    /// 按规范顺序返回全部周课
    pub fn sorted_lectures(&self) -> Vec<LectureOccurrence> {
        let mut lectures = self.lectures.clone();
        lectures.sort_by(|a, b| a.schedule_cmp(b));
        lectures
    }
}
