// ==========================================
// 分班选课系统 - 领域类型定义
// ==========================================
// 课型、排序方式、星期顺序等基础值类型
// ==========================================

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 课型 (Lecture Kind)
// ==========================================
// 持久化编码: T / TP / PL
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LectureKind {
    Lecture,    // T  - 理论课
    Seminar,    // TP - 理论实践课
    Laboratory, // PL - 实验课
}

impl LectureKind {
    /// 转换为持久化编码
    pub fn as_str(&self) -> &'static str {
        match self {
            LectureKind::Lecture => "T",
            LectureKind::Seminar => "TP",
            LectureKind::Laboratory => "PL",
        }
    }

    /// 从持久化编码解析（兼容单字母 P）
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "T" => Some(LectureKind::Lecture),
            "TP" | "P" => Some(LectureKind::Seminar),
            "PL" => Some(LectureKind::Laboratory),
            _ => None,
        }
    }
}

impl fmt::Display for LectureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 学生列表排序方式
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortOrder {
    NameAscending,  // A → Z
    NameDescending, // Z → A
    IdAscending,    // 学号升序
    IdDescending,   // 学号降序
}

impl SortOrder {
    /// 是否按姓名排序（决定报表列顺序）
    pub fn is_alphabetic(&self) -> bool {
        matches!(self, SortOrder::NameAscending | SortOrder::NameDescending)
    }

    /// 从命令行参数解析: name / name-desc / id / id-desc
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" | "name-asc" => Some(SortOrder::NameAscending),
            "name-desc" => Some(SortOrder::NameDescending),
            "id" | "id-asc" => Some(SortOrder::IdAscending),
            "id-desc" => Some(SortOrder::IdDescending),
            _ => None,
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::NameAscending => write!(f, "A to Z"),
            SortOrder::NameDescending => write!(f, "Z to A"),
            SortOrder::IdAscending => write!(f, "numerical"),
            SortOrder::IdDescending => write!(f, "reverse numerical"),
        }
    }
}

// ==========================================
// 星期辅助函数
// ==========================================

/// 星期的规范顺序（周一 = 0）
pub fn weekday_index(day: Weekday) -> u32 {
    day.num_days_from_monday()
}

/// 星期全称（与课表记录格式一致）
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// 解析星期（接受 "Monday" / "Mon"，大小写不敏感）
pub fn parse_weekday(s: &str) -> Option<Weekday> {
    s.trim().parse::<Weekday>().ok()
}
