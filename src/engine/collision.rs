// ==========================================
// 分班选课系统 - 课表冲突检测 (纯函数)
// ==========================================
// 职责: 课表合并与同日时间重叠检测
// 红线: 无状态、无副作用、无 I/O 操作
// ==========================================

use crate::domain::{LectureOccurrence, SectionSchedule};

// ==========================================
// CollisionDetector - 纯函数工具类
// ==========================================
pub struct CollisionDetector;

impl CollisionDetector {
    /// 从学生所在的若干班级课表中, 取出指定课程单元的周课
    ///
    /// # 参数
    /// - schedules: 班级课表
    /// - course_unit: 课程单元代码
    pub fn merge_for_course_unit<'a, I>(schedules: I, course_unit: &str) -> Vec<LectureOccurrence>
    where
        I: IntoIterator<Item = &'a SectionSchedule>,
    {
        schedules
            .into_iter()
            .flat_map(|s| s.lectures_for(course_unit).cloned())
            .collect()
    }

    /// 判定周课列表中是否存在时间冲突
    ///
    /// # 规则
    /// - 按 (星期, 开始时间) 排序后, 检查同一天的相邻两节
    /// - 冲突 ⇔ prev.start + prev.duration > next.start
    /// - 空列表无冲突
    pub fn has_collision(lectures: &[LectureOccurrence]) -> bool {
        Self::find_collision(lectures).is_some()
    }

    /// 返回第一对冲突的周课 (按排序后的顺序)
    pub fn find_collision(
        lectures: &[LectureOccurrence],
    ) -> Option<(LectureOccurrence, LectureOccurrence)> {
        let mut sorted: Vec<&LectureOccurrence> = lectures.iter().collect();
        sorted.sort_by(|a, b| a.schedule_cmp(b));

        sorted
            .windows(2)
            .find(|pair| pair[0].weekday == pair[1].weekday && pair[0].end_hour() > pair[1].start_hour)
            .map(|pair| (pair[0].clone(), pair[1].clone()))
    }
}
