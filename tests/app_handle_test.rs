// ==========================================
// 服务句柄集成测试
// ==========================================
// 测试目标: 单写者服务串行处理并发请求, 名册快照只反映已提交的状态
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

use enrollment_engine::domain::{EnrollmentChange, EnrollmentRequest, SortOrder};
use enrollment_engine::{EnrollmentHandle, RejectReason};
use test_helpers::{CampusBuilder, TestCampus};

fn campus() -> TestCampus {
    let mut builder = CampusBuilder::new()
        .pairing("3LEIC09", "BD")
        .pairing("3LEIC09", "LP")
        .pairing("3LEIC01", "FSI")
        .pairing("3LEIC01", "AM")
        .crowd("P", 10, "BD", "3LEIC09")
        .enrolled("X001", "Xavier", "LP", "3LEIC09");
    for i in 1..=5 {
        builder = builder.enrolled(&format!("S20{}", i), &format!("Aluno{}", i), "FSI", "3LEIC01");
    }
    builder.build().expect("Failed to build campus")
}

fn spawn_handle(campus: &TestCampus) -> EnrollmentHandle {
    let engine = campus.open_engine().expect("Failed to open engine");
    EnrollmentHandle::spawn(engine)
}

#[tokio::test]
async fn test_execute_updates_snapshot() {
    let campus = campus();
    let handle = spawn_handle(&campus);

    let before = handle.snapshot();
    let outcome = handle
        .execute("S201", EnrollmentChange::add("AM"))
        .await
        .expect("service should be running");
    assert!(outcome.is_accepted(), "add: {}", outcome);

    // 旧快照不受影响, 新快照包含变更
    assert!(!before.find_student("S201").expect("S201").holds_course_unit("AM"));
    let after = handle.snapshot();
    assert!(after.find_student("S201").expect("S201").holds_course_unit("AM"));
    assert_eq!(
        after
            .students_in_course_unit("AM", SortOrder::IdAscending)
            .iter()
            .map(|s| s.id.as_str())
            .collect::<Vec<_>>(),
        vec!["S201"]
    );

    let history = handle.history().await.expect("history");
    assert_eq!(history.len(), 1);
    assert!(history[0].starts_with("#1 "));
}

#[tokio::test]
async fn test_concurrent_requests_are_serialized() {
    let campus = campus();
    let handle = spawn_handle(&campus);

    let mut tasks = Vec::new();
    for i in 1..=5 {
        let handle = handle.clone();
        tasks.push(tokio::spawn(async move {
            handle
                .execute(format!("S20{}", i), EnrollmentChange::add("AM"))
                .await
        }));
    }
    for task in tasks {
        let outcome = task.await.expect("task panicked").expect("service stopped");
        assert!(outcome.is_accepted(), "add: {}", outcome);
    }

    let snapshot = handle.snapshot();
    assert_eq!(
        snapshot
            .students_in_course_unit("AM", SortOrder::IdAscending)
            .len(),
        5
    );
    assert_eq!(handle.history().await.expect("history").len(), 5);
}

#[tokio::test]
async fn test_pending_queue_roundtrip() {
    let campus = campus();
    let handle = spawn_handle(&campus);

    let first = handle
        .submit(EnrollmentRequest::new("S201", EnrollmentChange::add("AM")))
        .await
        .expect("submit");
    let second = handle
        .submit(EnrollmentRequest::new("S999", EnrollmentChange::add("AM")))
        .await
        .expect("submit");
    assert_eq!((first, second), (1, 2));

    let pending = handle.pending().await.expect("pending");
    assert_eq!(pending.len(), 2);
    assert!(pending[0].starts_with("#1 Aluno1(S201)"), "pending: {:?}", pending);
    assert!(pending[1].starts_with("#2 ?(S999)"), "pending: {:?}", pending);

    // 入队不改动名册
    assert!(!handle
        .snapshot()
        .find_student("S201")
        .expect("S201")
        .holds_course_unit("AM"));

    let outcomes = handle.process_all_pending().await.expect("process");
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes[0].is_accepted());
    assert_eq!(outcomes[1].rejection().map(RejectReason::code), Some("student not found"));
    assert!(handle.pending().await.expect("pending").is_empty());
    assert_eq!(handle.history().await.expect("history").len(), 1);
}

#[tokio::test]
async fn test_discard_pending() {
    let campus = campus();
    let handle = spawn_handle(&campus);

    for i in 1..=3 {
        handle
            .submit(EnrollmentRequest::new(format!("S20{}", i), EnrollmentChange::add("AM")))
            .await
            .expect("submit");
    }

    let discarded = handle.discard_pending(2).await.expect("discard");
    assert_eq!(discarded.map(|r| r.student_id), Ok("S202".to_string()));

    let missing = handle.discard_pending(5).await.expect("discard");
    assert_eq!(missing.err(), Some(RejectReason::RequestNotFound { position: 5 }));

    let outcome = handle.process_pending(0).await.expect("process");
    assert_eq!(outcome.rejection(), Some(&RejectReason::RequestNotFound { position: 0 }));

    assert_eq!(handle.discard_all_pending().await.expect("discard all"), 2);
    assert!(handle.pending().await.expect("pending").is_empty());
    assert!(handle.history().await.expect("history").is_empty());
}

#[tokio::test]
async fn test_undo_through_handle() {
    let campus = campus();
    let handle = spawn_handle(&campus);

    for i in 1..=2 {
        handle
            .execute(format!("S20{}", i), EnrollmentChange::add("AM"))
            .await
            .expect("execute");
    }
    let outcome = handle.undo(1).await.expect("undo");
    assert!(outcome.is_accepted(), "undo: {}", outcome);

    let snapshot = handle.snapshot();
    assert!(!snapshot.find_student("S201").expect("S201").holds_course_unit("AM"));
    assert!(snapshot.find_student("S202").expect("S202").holds_course_unit("AM"));

    let history = handle.history().await.expect("history");
    assert_eq!(history.len(), 1);
    assert!(history[0].contains("S202"));
}
