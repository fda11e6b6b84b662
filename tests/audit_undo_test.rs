// ==========================================
// 审计日志与撤销集成测试
// ==========================================
// 测试目标: 撤销后记录重新编号, 名册与审计文件同步回滚;
// 逆操作被拒绝时日志保持原样
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

use enrollment_engine::{AuditMode, RejectReason};
use test_helpers::{CampusBuilder, TestCampus};

const STUDENTS: [(&str, &str); 5] = [
    ("S101", "Ana"),
    ("S102", "Bruno"),
    ("S103", "Carla"),
    ("S104", "Duarte"),
    ("S105", "Eva"),
];

/// BD 10 人、LP 1 人固定极差为 9; AM 人数在 1..=5 之间变化不影响均衡
fn undo_campus() -> TestCampus {
    let mut builder = CampusBuilder::new()
        .pairing("3LEIC09", "BD")
        .pairing("3LEIC09", "LP")
        .pairing("3LEIC01", "FSI")
        .pairing("3LEIC01", "AM")
        .crowd("P", 10, "BD", "3LEIC09")
        .enrolled("X001", "Xavier", "LP", "3LEIC09");
    for (id, name) in STUDENTS {
        builder = builder.enrolled(id, name, "FSI", "3LEIC01");
    }
    builder.build().expect("Failed to build campus")
}

#[test]
fn test_undo_middle_record_renumbers_log() {
    let campus = undo_campus();
    let mut engine = campus.open_engine().expect("Failed to open engine");

    for (id, _) in STUDENTS {
        let outcome = engine.add(id, "AM", AuditMode::Record).expect("add");
        assert!(outcome.is_accepted(), "{} add AM: {}", id, outcome);
    }
    assert_eq!(engine.audit_log().len(), 5);

    let undo = engine.undo(3).expect("undo");
    assert!(undo.is_accepted(), "undo: {}", undo);

    // 4 条记录, 编号 1..4, 原第 3 条 (Carla) 已移除
    let summaries: Vec<String> = engine.audit_log().summaries().collect();
    assert_eq!(summaries.len(), 4);
    for (i, (summary, name)) in summaries
        .iter()
        .zip(["Ana", "Bruno", "Duarte", "Eva"])
        .enumerate()
    {
        assert!(summary.starts_with(&format!("#{} ", i + 1)), "summary: {}", summary);
        assert!(summary.contains(name), "summary {} should mention {}", summary, name);
    }

    let carla = engine.roster().find_student("S103").expect("S103 exists");
    assert!(!carla.holds_course_unit("AM"));
    assert_eq!(carla.enrollment_count(), 1);

    // 文件状态与内存一致
    let audit = campus.read_audit().expect("Failed to read audit");
    assert!(!audit.contains("S103"), "audit: {}", audit);
    let roster = campus.read_roster().expect("Failed to read roster");
    assert!(!roster.contains("S103,Carla,AM"));

    let reopened = campus.open_engine().expect("Failed to reopen engine");
    assert_eq!(reopened.audit_log().len(), 4);
    assert_eq!(
        reopened.audit_log().records().iter().map(|r| r.student_id.as_str()).collect::<Vec<_>>(),
        vec!["S101", "S102", "S104", "S105"]
    );
}

#[test]
fn test_undo_does_not_record_inverse() {
    let campus = undo_campus();
    let mut engine = campus.open_engine().expect("Failed to open engine");

    engine.add("S101", "AM", AuditMode::Record).expect("add");
    engine.add("S102", "AM", AuditMode::Record).expect("add");
    assert!(engine.undo(2).expect("undo").is_accepted());

    assert_eq!(engine.audit_log().len(), 1);
    assert_eq!(engine.audit_log().records()[0].student_id, "S101");
}

#[test]
fn test_undo_unknown_record() {
    let campus = undo_campus();
    let mut engine = campus.open_engine().expect("Failed to open engine");
    engine.add("S101", "AM", AuditMode::Record).expect("add");

    for seq in [0, 2, 99] {
        let outcome = engine.undo(seq).expect("undo");
        assert_eq!(outcome.rejection(), Some(&RejectReason::RecordNotFound { seq }));
    }
    assert_eq!(engine.audit_log().len(), 1);
}

#[test]
fn test_undo_keeps_record_when_inverse_rejected() {
    // 预置的审计记录与名册不一致: S101 并未持有 AM, 逆操作 remove 被拒绝
    let campus = CampusBuilder::new()
        .pairing("3LEIC01", "FSI")
        .pairing("3LEIC01", "AM")
        .enrolled("S101", "Ana", "FSI", "3LEIC01")
        .audit("S101", "Ana", "add", "AM", "-", "-")
        .build()
        .expect("Failed to build campus");
    let audit_before = campus.read_audit().expect("Failed to read audit");
    let mut engine = campus.open_engine().expect("Failed to open engine");
    assert_eq!(engine.audit_log().len(), 1);

    let outcome = engine.undo(1).expect("undo");
    assert_eq!(outcome.rejection().map(RejectReason::code), Some("not enrolled"));
    assert_eq!(engine.audit_log().len(), 1);
    assert_eq!(campus.read_audit().expect("Failed to read audit"), audit_before);
}

#[test]
fn test_undo_switch_moves_student_back() {
    let campus = CampusBuilder::new()
        .pairing("3LEIC01", "PF")
        .pairing("3LEIC02", "PF")
        .enrolled("S101", "Ana", "PF", "3LEIC01")
        .enrolled("S102", "Bruno", "PF", "3LEIC01")
        .enrolled("S103", "Carla", "PF", "3LEIC02")
        .build()
        .expect("Failed to build campus");
    let mut engine = campus.open_engine().expect("Failed to open engine");

    let switch = engine
        .switch("S101", "PF", "3LEIC01", "3LEIC02", AuditMode::Record)
        .expect("switch");
    assert!(switch.is_accepted(), "switch: {}", switch);

    let undo = engine.undo(1).expect("undo");
    assert!(undo.is_accepted(), "undo: {}", undo);
    assert!(engine.audit_log().is_empty());

    let ana = engine.roster().find_student("S101").expect("S101 exists");
    assert_eq!(ana.section_for("PF"), Some("3LEIC01"));
}

#[test]
fn test_undo_last_remove_after_reopen() {
    let campus = CampusBuilder::new()
        .pairing("3LEIC01", "PF")
        .enrolled("S1", "Ana", "PF", "3LEIC01")
        .build()
        .expect("Failed to build campus");

    {
        let mut engine = campus.open_engine().expect("Failed to open engine");
        let remove = engine.remove("S1", "PF", AuditMode::Record).expect("remove");
        assert!(remove.is_accepted(), "remove: {}", remove);
    }
    assert!(!campus.read_roster().expect("Failed to read roster").contains("S1,"));

    // 名册已无 S1 的行, 学生仍按审计记录存在
    let mut reopened = campus.open_engine().expect("Failed to reopen engine");
    let ana = reopened.roster().find_student("S1").expect("S1 kept after reopen");
    assert_eq!(ana.enrollment_count(), 0);
    assert_eq!(ana.name, "Ana");

    let undo = reopened.undo(1).expect("undo");
    assert!(undo.is_accepted(), "undo: {}", undo);
    assert!(reopened.audit_log().is_empty());

    let roster = campus.read_roster().expect("Failed to read roster");
    assert!(roster.contains("S1,Ana,PF,3LEIC01"), "roster: {}", roster);
}
