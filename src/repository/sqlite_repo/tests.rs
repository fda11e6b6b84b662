use super::*;
use crate::db::ensure_schema;
use crate::domain::EnrollmentChange;
use chrono::Weekday;

fn setup() -> Arc<Mutex<Connection>> {
    let conn = Connection::open_in_memory().unwrap();
    ensure_schema(&conn).unwrap();
    Arc::new(Mutex::new(conn))
}

fn record(id: &str, uc: &str, section: &str) -> EnrollmentRecord {
    EnrollmentRecord {
        student_id: id.to_string(),
        student_name: format!("S{}", id),
        course_unit: uc.to_string(),
        section: section.to_string(),
    }
}

#[test]
fn test_enrollment_crud() {
    let conn = setup();
    let repo = SqliteEnrollmentRepository::new(conn.clone());

    repo.append(&record("2", "L.EIC001", "1LEIC01")).unwrap();
    repo.append(&record("1", "L.EIC001", "1LEIC02")).unwrap();
    repo.append(&record("2", "L.EIC002", "1LEIC01")).unwrap();

    let ids: Vec<String> = repo
        .load_all()
        .unwrap()
        .into_iter()
        .map(|r| format!("{}:{}", r.student_id, r.course_unit))
        .collect();
    assert_eq!(ids, vec!["1:L.EIC001", "2:L.EIC001", "2:L.EIC002"]);

    repo.update_section("1", "L.EIC001", "1LEIC03").unwrap();
    repo.delete("2", "L.EIC002").unwrap();

    let records = repo.load_all().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].section, "1LEIC03");
}

#[test]
fn test_enrollment_missing_key_is_not_found() {
    let repo = SqliteEnrollmentRepository::new(setup());
    assert!(matches!(
        repo.update_section("1", "L.EIC001", "X"),
        Err(RepositoryError::NotFound { .. })
    ));
    assert!(matches!(
        repo.delete("1", "L.EIC001"),
        Err(RepositoryError::NotFound { .. })
    ));
}

#[test]
fn test_enrollment_unique_per_course_unit() {
    let repo = SqliteEnrollmentRepository::new(setup());
    repo.append(&record("1", "L.EIC001", "1LEIC01")).unwrap();
    let err = repo.append(&record("1", "L.EIC001", "1LEIC02")).unwrap_err();
    assert!(matches!(err, RepositoryError::Sqlite(_)));
}

#[test]
fn test_audit_order_and_delete_at() {
    let repo = SqliteAuditRepository::new(setup());
    repo.append(&AuditRecord::new("1", "A", EnrollmentChange::add("X")))
        .unwrap();
    repo.append(&AuditRecord::new(
        "1",
        "A",
        EnrollmentChange::switch("X", "1LEIC01", "1LEIC02"),
    ))
    .unwrap();
    repo.append(&AuditRecord::new("1", "A", EnrollmentChange::remove("X")))
        .unwrap();

    let removed = repo.delete_at(2).unwrap();
    assert_eq!(removed.change, EnrollmentChange::switch("X", "1LEIC01", "1LEIC02"));

    let kinds: Vec<&str> = repo
        .load_all()
        .unwrap()
        .iter()
        .map(|r| r.kind().as_str())
        .collect();
    assert_eq!(kinds, vec!["add", "remove"]);

    assert!(matches!(repo.delete_at(3), Err(RepositoryError::NotFound { .. })));
    assert!(matches!(repo.delete_at(0), Err(RepositoryError::NotFound { .. })));
}

struct FixedCatalog;

impl CatalogRepository for FixedCatalog {
    fn load_lectures(&self) -> RepositoryResult<Vec<(String, LectureOccurrence)>> {
        Ok(vec![(
            "1LEIC01".to_string(),
            LectureOccurrence::new("L.EIC001", Weekday::Wed, 9.0, 1.5, LectureKind::Lecture),
        )])
    }

    fn load_pairings(&self) -> RepositoryResult<Vec<SectionEnrollment>> {
        Ok(vec![SectionEnrollment::new("1LEIC01", "L.EIC001")])
    }
}

#[test]
fn test_seed_from_only_fills_empty_database() {
    let source_conn = setup();
    let source_roster = SqliteEnrollmentRepository::new(source_conn.clone());
    source_roster.append(&record("1", "L.EIC001", "1LEIC01")).unwrap();
    let source_audit = SqliteAuditRepository::new(source_conn);

    let target = setup();
    let seeded = seed_from(&target, &FixedCatalog, &source_roster, &source_audit).unwrap();
    assert_eq!(seeded, 3);

    let catalog = SqliteCatalogRepository::new(target.clone());
    let lectures = catalog.load_lectures().unwrap();
    assert_eq!(lectures[0].1.weekday, Weekday::Wed);
    assert_eq!(lectures[0].1.kind, LectureKind::Lecture);
    assert_eq!(catalog.load_pairings().unwrap().len(), 1);

    let again = seed_from(&target, &FixedCatalog, &source_roster, &source_audit).unwrap();
    assert_eq!(again, 0);
    assert_eq!(SqliteEnrollmentRepository::new(target).load_all().unwrap().len(), 1);
}

#[test]
fn test_seed_marker_blocks_reimport_after_roster_emptied() {
    let source_conn = setup();
    let source_roster = SqliteEnrollmentRepository::new(source_conn.clone());
    source_roster.append(&record("1", "L.EIC001", "1LEIC01")).unwrap();
    let source_audit = SqliteAuditRepository::new(source_conn);

    let target = setup();
    assert_eq!(seed_from(&target, &FixedCatalog, &source_roster, &source_audit).unwrap(), 3);

    // 名册被清空后再次打开, 不得重新导入
    let roster = SqliteEnrollmentRepository::new(target.clone());
    roster.delete("1", "L.EIC001").unwrap();
    assert_eq!(seed_from(&target, &FixedCatalog, &source_roster, &source_audit).unwrap(), 0);

    assert!(roster.load_all().unwrap().is_empty());
    let catalog = SqliteCatalogRepository::new(target);
    assert_eq!(catalog.load_lectures().unwrap().len(), 1);
}

#[test]
fn test_seed_skips_database_with_existing_catalog() {
    let target = setup();
    SqliteAuditRepository::new(target.clone())
        .append(&AuditRecord::new("1", "S1", EnrollmentChange::add("L.EIC001")))
        .unwrap();

    let source_conn = setup();
    let source_roster = SqliteEnrollmentRepository::new(source_conn.clone());
    source_roster.append(&record("1", "L.EIC001", "1LEIC01")).unwrap();
    let source_audit = SqliteAuditRepository::new(source_conn);

    assert_eq!(seed_from(&target, &FixedCatalog, &source_roster, &source_audit).unwrap(), 0);
    assert!(SqliteCatalogRepository::new(target).load_lectures().unwrap().is_empty());
}

#[test]
fn test_load_lectures_rejects_non_positive_duration() {
    let conn = setup();
    for duration in [0.0, -1.0] {
        conn.lock()
            .unwrap()
            .execute(
                "INSERT INTO lecture (section, course_unit, weekday, start_hour, duration, kind) \
                 VALUES ('1LEIC01', 'L.EIC001', 'Monday', 9.0, ?1, 'T')",
                params![duration],
            )
            .unwrap();
        let result = SqliteCatalogRepository::new(conn.clone()).load_lectures();
        assert!(matches!(
            result,
            Err(RepositoryError::FieldValueError { ref field, .. }) if field == "duration"
        ));
        conn.lock().unwrap().execute("DELETE FROM lecture", []).unwrap();
    }
}
