// ==========================================
// 分班选课系统 - 名册存储 (内存工作集)
// ==========================================
// 职责: 学生、班级课表、有效配对的内存视图 + 只读报表查询
// 红线: 启动时加载一次; 之后只有请求引擎能修改学生
// ==========================================

use crate::domain::{
    EnrollmentRecord, LectureOccurrence, SectionEnrollment, SectionSchedule, SortOrder, Student,
};
use crate::repository::{CatalogRepository, EnrollmentRepository, RepositoryResult};
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use tracing::instrument;

/// 配对 → 当前人数 (只含至少一人持有的配对)
pub type OccupancyMap = BTreeMap<SectionEnrollment, i64>;

// ==========================================
// RosterStore
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct RosterStore {
    students: BTreeMap<String, Student>,
    schedules: BTreeMap<String, SectionSchedule>,
    valid_pairings: BTreeSet<SectionEnrollment>,
    program_code: String,
}

impl RosterStore {
    /// 从仓储加载名册与课表目录
    #[instrument(skip(catalog, enrollments))]
    pub fn load(
        catalog: &dyn CatalogRepository,
        enrollments: &dyn EnrollmentRepository,
        program_code: &str,
    ) -> RepositoryResult<Self> {
        let lectures = catalog.load_lectures()?;
        let pairings = catalog.load_pairings()?;
        let records = enrollments.load_all()?;
        let store = Self::from_parts(lectures, pairings, records, program_code);

        tracing::info!(
            students = store.students.len(),
            sections = store.schedules.len(),
            pairings = store.valid_pairings.len(),
            "名册加载完成"
        );
        Ok(store)
    }

    /// 由已读取的记录构建
    ///
    /// 同一学生对同一课程单元的重复行只保留第一行
    pub fn from_parts(
        lectures: Vec<(String, LectureOccurrence)>,
        pairings: Vec<SectionEnrollment>,
        records: Vec<EnrollmentRecord>,
        program_code: &str,
    ) -> Self {
        let mut schedules: BTreeMap<String, SectionSchedule> = BTreeMap::new();
        for (section, lecture) in lectures {
            schedules
                .entry(section.clone())
                .or_insert_with(|| SectionSchedule::empty(section))
                .add_lecture(lecture);
        }

        let mut students: BTreeMap<String, Student> = BTreeMap::new();
        for record in records {
            let pairing = record.pairing();
            let student = students
                .entry(record.student_id.clone())
                .or_insert_with(|| Student::new(record.student_id, record.student_name));
            if !student.enroll(pairing.clone()) {
                tracing::warn!(
                    student_id = %student.id,
                    pairing = %pairing,
                    "名册中同一课程单元重复, 已忽略"
                );
            }
        }

        Self {
            students,
            schedules,
            valid_pairings: pairings.into_iter().collect(),
            program_code: program_code.to_string(),
        }
    }

    // ===== 基础查询 =====

    pub fn find_student(&self, id: &str) -> Option<&Student> {
        self.students.get(id)
    }

    pub(crate) fn student_mut(&mut self, id: &str) -> Option<&mut Student> {
        self.students.get_mut(id)
    }

    /// 登记没有名册行的学生 (退掉全部课程单元后名册中不再出现)
    ///
    /// # 返回
    /// - true: 新登记; false: 学生已存在
    pub(crate) fn register_student(&mut self, id: &str, name: &str) -> bool {
        if self.students.contains_key(id) {
            return false;
        }
        self.students
            .insert(id.to_string(), Student::new(id, name));
        true
    }

    /// 全部学生 (按学号升序)
    pub fn students(&self) -> impl Iterator<Item = &Student> {
        self.students.values()
    }

    pub fn student_count(&self) -> usize {
        self.students.len()
    }

    pub fn program_code(&self) -> &str {
        &self.program_code
    }

    /// 班级课表; 未建模的班级视为空课表
    pub fn section_schedule(&self, section: &str) -> Cow<'_, SectionSchedule> {
        match self.schedules.get(section) {
            Some(schedule) => Cow::Borrowed(schedule),
            None => Cow::Owned(SectionSchedule::empty(section)),
        }
    }

    pub fn is_valid_pairing(&self, section: &str, course_unit: &str) -> bool {
        self.valid_pairings
            .contains(&SectionEnrollment::new(section, course_unit))
    }

    /// 课程单元是否出现在任一有效配对中
    pub fn offers_course_unit(&self, course_unit: &str) -> bool {
        self.valid_pairings
            .iter()
            .any(|p| p.course_unit == course_unit)
    }

    /// 课程单元的全部有效班级 (班级代码升序)
    pub fn sections_for(&self, course_unit: &str) -> Vec<&str> {
        self.valid_pairings
            .iter()
            .filter(|p| p.course_unit == course_unit)
            .map(|p| p.section.as_str())
            .collect()
    }

    /// 重新计算各配对人数 (不缓存)
    pub fn occupancy(&self) -> OccupancyMap {
        let mut map = OccupancyMap::new();
        for student in self.students.values() {
            for pairing in student.enrollments() {
                *map.entry(pairing.clone()).or_insert(0) += 1;
            }
        }
        map
    }

    /// 若干配对对应的周课: 每个配对只取其班级课表中该课程单元的部分
    pub fn lectures_for_pairings<'a, I>(&self, pairings: I) -> Vec<LectureOccurrence>
    where
        I: IntoIterator<Item = &'a SectionEnrollment>,
    {
        pairings
            .into_iter()
            .flat_map(|p| {
                self.schedules
                    .get(&p.section)
                    .into_iter()
                    .flat_map(move |s| s.lectures_for(&p.course_unit).cloned())
            })
            .collect()
    }

    /// 学生课表 (按星期、开始时间排序)
    ///
    /// # 返回
    /// - None: 学生不存在
    pub fn student_schedule(&self, student_id: &str) -> Option<Vec<LectureOccurrence>> {
        let student = self.find_student(student_id)?;
        let mut lectures = self.lectures_for_pairings(student.enrollments());
        lectures.sort_by(|a, b| a.schedule_cmp(b));
        Some(lectures)
    }

    // ===== 报表查询 =====

    /// 在指定班级 (任一课程单元) 有选课的学生
    pub fn students_in_section(&self, section: &str, order: SortOrder) -> Vec<&Student> {
        self.collect_sorted(
            |s| s.enrollments().iter().any(|p| p.section == section),
            order,
        )
    }

    /// 指定入学年份的学生
    pub fn students_in_year(&self, year: &str, order: SortOrder) -> Vec<&Student> {
        self.collect_sorted(|s| s.year() == year, order)
    }

    /// 选了指定课程单元的学生
    pub fn students_in_course_unit(&self, course_unit: &str, order: SortOrder) -> Vec<&Student> {
        self.collect_sorted(|s| s.holds_course_unit(course_unit), order)
    }

    /// 指定专业的学生; 只有配置的专业代码匹配 (大小写不敏感)
    pub fn students_in_program(&self, program: &str, order: SortOrder) -> Vec<&Student> {
        if !program.trim().eq_ignore_ascii_case(&self.program_code) {
            return Vec::new();
        }
        self.collect_sorted(|_| true, order)
    }

    /// 至少选了 n 门课程单元的学生人数
    pub fn count_students_with_at_least(&self, n: usize) -> usize {
        self.students
            .values()
            .filter(|s| s.enrollment_count() >= n)
            .count()
    }

    /// 人数最多的课程单元 (并列全部返回, 按代码升序) 及其人数
    pub fn most_populated_course_units(&self) -> (Vec<String>, usize) {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for student in self.students.values() {
            for pairing in student.enrollments() {
                *counts.entry(pairing.course_unit.as_str()).or_insert(0) += 1;
            }
        }

        let max = counts.values().copied().max().unwrap_or(0);
        let winners = counts
            .into_iter()
            .filter(|(_, n)| *n == max && max > 0)
            .map(|(uc, _)| uc.to_string())
            .collect();
        (winners, max)
    }

    fn collect_sorted<F>(&self, filter: F, order: SortOrder) -> Vec<&Student>
    where
        F: Fn(&Student) -> bool,
    {
        let mut selected: Vec<&Student> = self.students.values().filter(|s| filter(s)).collect();
        match order {
            SortOrder::NameAscending => selected.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id))),
            SortOrder::NameDescending => selected.sort_by(|a, b| b.name.cmp(&a.name).then(b.id.cmp(&a.id))),
            SortOrder::IdAscending => selected.sort_by(|a, b| a.id.cmp(&b.id)),
            SortOrder::IdDescending => selected.sort_by(|a, b| b.id.cmp(&a.id)),
        }
        selected
    }
}
