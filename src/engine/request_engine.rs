// ==========================================
// 分班选课系统 - 选课请求引擎
// ==========================================
// 职责: 编排 add / remove / switch
//   快照人数 → 均衡校验 → 冲突检测 → 修改名册 → 持久化 → 审计
// 红线: 业务拒绝返回 RequestOutcome::Rejected, 只有持久化异常返回 Err
// 红线: 持久化失败不回滚内存修改, 以 error 日志记录不一致
// ==========================================


use crate::config::EngineConfig;
use crate::domain::{
    AuditRecord, EnrollmentChange, EnrollmentRecord, EnrollmentRequest, LectureOccurrence,
    SectionEnrollment, Student,
};
use crate::engine::audit_log::AuditLog;
use crate::engine::balance::{BalanceCheck, BalanceValidator};
use crate::engine::collision::CollisionDetector;
use crate::engine::error::EngineResult;
use crate::engine::outcome::{Acceptance, RejectReason, RequestOutcome};
use crate::engine::roster::RosterStore;
use crate::repository::{AuditRepository, CatalogRepository, EnrollmentRepository, RepositoryError};
use tracing::instrument;

/// 被接受的变更是否写入审计日志 (撤销时跳过)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditMode {
    Record,
    Skip,
}

// ==========================================
// RequestEngine
// ==========================================
pub struct RequestEngine {
    roster: RosterStore,
    validator: BalanceValidator,
    max_enrollments: usize,
    enrollments: Box<dyn EnrollmentRepository>,
    audit: AuditLog,
    pending: Vec<EnrollmentRequest>,
}

impl RequestEngine {
    pub fn new(
        roster: RosterStore,
        enrollments: Box<dyn EnrollmentRepository>,
        audit: AuditLog,
        config: &EngineConfig,
    ) -> Self {
        Self {
            roster,
            validator: BalanceValidator::new(config.capacity_cap),
            max_enrollments: config.max_enrollments,
            enrollments,
            audit,
            pending: Vec::new(),
        }
    }

    /// 从仓储加载名册与审计日志
    ///
    /// 名册中已无选课行的学生按审计记录重新登记
    pub fn open(
        config: &EngineConfig,
        catalog: &dyn CatalogRepository,
        enrollments: Box<dyn EnrollmentRepository>,
        audit: Box<dyn AuditRepository>,
    ) -> EngineResult<Self> {
        config.validate()?;
        let mut roster = RosterStore::load(catalog, enrollments.as_ref(), &config.program_code)?;
        let audit = AuditLog::open(audit)?;

        // 学生从不删除: 审计日志中出现过、但名册已无行的学生重新登记
        for record in audit.records() {
            if roster.register_student(&record.student_id, &record.student_name) {
                tracing::debug!(student_id = %record.student_id, "学生无名册行, 按审计记录登记");
            }
        }
        Ok(Self::new(roster, enrollments, audit, config))
    }

    pub fn roster(&self) -> &RosterStore {
        &self.roster
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit
    }

    pub fn max_enrollments(&self) -> usize {
        self.max_enrollments
    }

    // ==========================================
    // 写操作
    // ==========================================

    /// 按变更类型分派
    pub fn execute(
        &mut self,
        student_id: &str,
        change: &EnrollmentChange,
        mode: AuditMode,
    ) -> EngineResult<RequestOutcome> {
        match change {
            EnrollmentChange::Add { course_unit } => self.add(student_id, course_unit, mode),
            EnrollmentChange::Remove { course_unit } => self.remove(student_id, course_unit, mode),
            EnrollmentChange::Switch {
                course_unit,
                from_section,
                to_section,
            } => self.switch(student_id, course_unit, from_section, to_section, mode),
        }
    }

    /// 选课: 按班级代码升序尝试, 第一个通过均衡与冲突检测的班级胜出
    #[instrument(skip(self), fields(kind = "add"))]
    pub fn add(
        &mut self,
        student_id: &str,
        course_unit: &str,
        mode: AuditMode,
    ) -> EngineResult<RequestOutcome> {
        let student = match self.roster.find_student(student_id) {
            Some(s) => s.clone(),
            None => return Ok(self.reject(student_not_found(student_id))),
        };

        if let Some(section) = student.section_for(course_unit) {
            return Ok(self.reject(RejectReason::DuplicateEnrollment {
                course_unit: course_unit.to_string(),
                section: section.to_string(),
            }));
        }
        if !self.roster.offers_course_unit(course_unit) {
            return Ok(self.reject(RejectReason::UnknownCourseUnit {
                course_unit: course_unit.to_string(),
            }));
        }
        if student.enrollment_count() >= self.max_enrollments {
            return Ok(self.reject(RejectReason::EnrollmentCap {
                limit: self.max_enrollments,
            }));
        }

        let Some(pairing) = self.find_admissible_section(&student, course_unit) else {
            return Ok(self.reject(RejectReason::NoVacancy {
                course_unit: course_unit.to_string(),
            }));
        };

        self.commit_roster(student_id, |s| {
            s.enroll(pairing.clone());
        });
        let record = EnrollmentRecord::new(&student, &pairing);
        self.persist(|repo| repo.append(&record))?;

        self.accept(&student, EnrollmentChange::add(course_unit), pairing, mode)
    }

    /// 退课
    #[instrument(skip(self), fields(kind = "remove"))]
    pub fn remove(
        &mut self,
        student_id: &str,
        course_unit: &str,
        mode: AuditMode,
    ) -> EngineResult<RequestOutcome> {
        let student = match self.roster.find_student(student_id) {
            Some(s) => s.clone(),
            None => return Ok(self.reject(student_not_found(student_id))),
        };

        let Some(section) = student.section_for(course_unit) else {
            return Ok(self.reject(RejectReason::NotEnrolled {
                course_unit: course_unit.to_string(),
                section: None,
            }));
        };
        let pairing = SectionEnrollment::new(section, course_unit);

        let occupancy = self.roster.occupancy();
        let check = self.validator.check_remove(&pairing, &occupancy);
        if !check.accepted {
            return Ok(self.reject(balance_rejection(check)));
        }

        self.commit_roster(student_id, |s| {
            s.withdraw(&pairing);
        });
        self.persist(|repo| repo.delete(student_id, course_unit))?;

        self.accept(&student, EnrollmentChange::remove(course_unit), pairing, mode)
    }

    /// 换班
    #[instrument(skip(self), fields(kind = "switch"))]
    pub fn switch(
        &mut self,
        student_id: &str,
        course_unit: &str,
        from_section: &str,
        to_section: &str,
        mode: AuditMode,
    ) -> EngineResult<RequestOutcome> {
        let student = match self.roster.find_student(student_id) {
            Some(s) => s.clone(),
            None => return Ok(self.reject(student_not_found(student_id))),
        };

        if !self.roster.is_valid_pairing(from_section, course_unit)
            || !self.roster.is_valid_pairing(to_section, course_unit)
        {
            return Ok(self.reject(RejectReason::MismatchedPairing {
                course_unit: course_unit.to_string(),
                from_section: from_section.to_string(),
                to_section: to_section.to_string(),
            }));
        }
        if from_section == to_section {
            return Ok(self.reject(RejectReason::SameSection {
                section: from_section.to_string(),
            }));
        }

        let from = SectionEnrollment::new(from_section, course_unit);
        let to = SectionEnrollment::new(to_section, course_unit);
        if !student.holds(&from) {
            return Ok(self.reject(RejectReason::NotEnrolled {
                course_unit: course_unit.to_string(),
                section: Some(from_section.to_string()),
            }));
        }

        let occupancy = self.roster.occupancy();
        let check = self.validator.check_switch(&from, &to, &occupancy);
        if !check.accepted {
            return Ok(self.reject(balance_rejection(check)));
        }

        let fused = self.fuse_replacing(&student, &to);
        if let Some((first, second)) = CollisionDetector::find_collision(&fused) {
            return Ok(self.reject(RejectReason::Collision {
                first: first.to_string(),
                second: second.to_string(),
            }));
        }

        self.commit_roster(student_id, |s| {
            s.withdraw(&from);
            s.enroll(to.clone());
        });
        self.persist(|repo| repo.update_section(student_id, course_unit, to_section))?;

        let change = EnrollmentChange::switch(course_unit, from_section, to_section);
        self.accept(&student, change, to, mode)
    }

    /// 撤销第 seq 条审计记录
    ///
    /// # 规则
    /// - 以结构逆操作重新走完整校验, 逆操作不写审计
    /// - 逆操作被接受后才删除记录; 被拒绝时日志保持不变
    #[instrument(skip(self))]
    pub fn undo(&mut self, seq: usize) -> EngineResult<RequestOutcome> {
        let Some(record) = self.audit.get(seq).cloned() else {
            return Ok(self.reject(RejectReason::RecordNotFound { seq }));
        };

        let inverse = record.change.inverse();
        let outcome = self.execute(&record.student_id, &inverse, AuditMode::Skip)?;

        match &outcome {
            RequestOutcome::Accepted(_) => {
                self.audit.remove(seq).map_err(|e| {
                    tracing::error!(seq, error = %e, "逆操作已生效, 但审计记录删除失败");
                    e
                })?;
                tracing::info!(seq, record = %record, "撤销完成");
            }
            RequestOutcome::Rejected(reason) => {
                tracing::warn!(seq, record = %record, reason = %reason, "逆操作被拒绝, 审计记录保留");
            }
        }
        Ok(outcome)
    }

    // ==========================================
    // 待处理请求队列 (位置从 1 开始)
    // ==========================================

    /// 提交请求 (不校验)
    ///
    /// # 返回
    /// - 请求在队列中的位置
    pub fn submit(&mut self, request: EnrollmentRequest) -> usize {
        tracing::debug!(request_id = %request.request_id, change = %request.change, "请求已入队");
        self.pending.push(request);
        self.pending.len()
    }

    pub fn pending(&self) -> &[EnrollmentRequest] {
        &self.pending
    }

    /// 待处理请求摘要: "#n 姓名(学号) 变更"
    pub fn pending_summaries(&self) -> Vec<String> {
        self.pending
            .iter()
            .enumerate()
            .map(|(i, request)| {
                let name = self
                    .roster
                    .find_student(&request.student_id)
                    .map(|s| s.name.as_str())
                    .unwrap_or("?");
                format!("#{} {}({}) {}", i + 1, name, request.student_id, request.change)
            })
            .collect()
    }

    /// 处理指定位置的请求; 无论接受还是拒绝都出队
    pub fn process_pending(&mut self, position: usize) -> EngineResult<RequestOutcome> {
        if position == 0 || position > self.pending.len() {
            return Ok(self.reject(RejectReason::RequestNotFound { position }));
        }
        let request = self.pending.remove(position - 1);
        self.execute(&request.student_id, &request.change, AuditMode::Record)
    }

    /// 按提交顺序处理全部请求; 遇到持久化异常即停止, 其余请求留在队列中
    pub fn process_all_pending(&mut self) -> EngineResult<Vec<RequestOutcome>> {
        let mut outcomes = Vec::with_capacity(self.pending.len());
        while !self.pending.is_empty() {
            let request = self.pending.remove(0);
            outcomes.push(self.execute(&request.student_id, &request.change, AuditMode::Record)?);
        }
        tracing::info!(
            processed = outcomes.len(),
            accepted = outcomes.iter().filter(|o| o.is_accepted()).count(),
            "待处理请求已全部处理"
        );
        Ok(outcomes)
    }

    pub fn discard_pending(&mut self, position: usize) -> Result<EnrollmentRequest, RejectReason> {
        if position == 0 || position > self.pending.len() {
            return Err(RejectReason::RequestNotFound { position });
        }
        Ok(self.pending.remove(position - 1))
    }

    /// 清空队列, 返回丢弃的数量
    pub fn discard_all_pending(&mut self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        count
    }

    // ==========================================
    // 内部步骤
    // ==========================================

    /// 同一份人数快照下, 按班级升序找第一个可用班级
    fn find_admissible_section(&self, student: &Student, course_unit: &str) -> Option<SectionEnrollment> {
        let occupancy = self.roster.occupancy();
        let current = self.roster.lectures_for_pairings(student.enrollments());

        for section in self.roster.sections_for(course_unit) {
            let candidate = SectionEnrollment::new(section, course_unit);
            let check = self.validator.check_add(student, &candidate, &occupancy);
            if !check.accepted {
                tracing::debug!(section, spread_after = check.spread_after, max_after = check.max_after, "班级未通过均衡校验");
                continue;
            }

            let schedule = self.roster.section_schedule(section);
            let mut fused: Vec<LectureOccurrence> = current.clone();
            fused.extend(schedule.lectures_for(course_unit).cloned());
            if CollisionDetector::has_collision(&fused) {
                tracing::debug!(section, "班级与现有课表冲突");
                continue;
            }
            return Some(candidate);
        }
        None
    }

    /// 保留其他课程单元的周课, 换上目标班级该课程单元的周课
    fn fuse_replacing(&self, student: &Student, to: &SectionEnrollment) -> Vec<LectureOccurrence> {
        let others = student
            .enrollments()
            .iter()
            .filter(|p| p.course_unit != to.course_unit);
        let mut fused = self.roster.lectures_for_pairings(others);
        let destination = self.roster.section_schedule(&to.section);
        fused.extend(CollisionDetector::merge_for_course_unit(
            [destination.as_ref()],
            &to.course_unit,
        ));
        fused
    }

    fn commit_roster<F>(&mut self, student_id: &str, mutate: F)
    where
        F: FnOnce(&mut Student),
    {
        if let Some(student) = self.roster.student_mut(student_id) {
            mutate(student);
        }
    }

    fn persist<F>(&self, write: F) -> EngineResult<()>
    where
        F: FnOnce(&dyn EnrollmentRepository) -> Result<(), RepositoryError>,
    {
        write(self.enrollments.as_ref()).map_err(|e| {
            tracing::error!(error = %e, "名册持久化失败, 内存与存储可能不一致");
            e.into()
        })
    }

    fn accept(
        &mut self,
        student: &Student,
        change: EnrollmentChange,
        pairing: SectionEnrollment,
        mode: AuditMode,
    ) -> EngineResult<RequestOutcome> {
        if mode == AuditMode::Record {
            let record = AuditRecord::new(student.id.clone(), student.name.clone(), change.clone());
            self.audit.append(record).map_err(|e| {
                tracing::error!(error = %e, "审计日志写入失败, 变更已生效");
                e
            })?;
        }

        tracing::info!(student_id = %student.id, change = %change, pairing = %pairing, "请求已接受");
        Ok(RequestOutcome::Accepted(Acceptance {
            student_id: student.id.clone(),
            student_name: student.name.clone(),
            change,
            pairing,
        }))
    }

    fn reject(&self, reason: RejectReason) -> RequestOutcome {
        tracing::info!(code = reason.code(), reason = %reason, "请求被拒绝");
        RequestOutcome::Rejected(reason)
    }
}

fn student_not_found(student_id: &str) -> RejectReason {
    RejectReason::StudentNotFound {
        student_id: student_id.to_string(),
    }
}

fn balance_rejection(check: BalanceCheck) -> RejectReason {
    RejectReason::WouldBreakBalance {
        spread_before: check.spread_before,
        spread_after: check.spread_after,
        max_after: check.max_after,
    }
}
