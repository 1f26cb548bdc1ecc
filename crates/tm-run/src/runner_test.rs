use super::*;
use tm_core::{parse_migration, CoreError, StepResult};
use tm_db::dialect::SqliteDialect;
use tm_db::{SqliteBackend, TableName, DEFAULT_LEDGER_TABLE};

// ── Helpers ────────────────────────────────────────────────────────────

fn declarative(version: i64, up: &str, down: &str) -> MigrationUnit {
    let content = format!("-- +tidemark Up\n{up}\n-- +tidemark Down\n{down}\n");
    let parsed = parse_migration("test.sql", &content).unwrap();
    MigrationUnit::declarative(version, format!("migrations/{version:05}_t{version}.sql"), parsed)
}

fn table_unit(version: i64) -> MigrationUnit {
    declarative(
        version,
        &format!("CREATE TABLE t{version} (id INTEGER);"),
        &format!("DROP TABLE t{version};"),
    )
}

fn sequence(units: Vec<MigrationUnit>) -> MigrationSequence {
    MigrationSequence::new(units).unwrap()
}

fn ledger(db: &SqliteBackend) -> Ledger<'_> {
    Ledger::new(db, &SqliteDialect, TableName::parse(DEFAULT_LEDGER_TABLE).unwrap())
}

fn table_exists(db: &SqliteBackend, name: &str) -> bool {
    db.query_i64(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        &[name.into()],
    )
    .unwrap()
        > 0
}

fn create_proc(db: &dyn Database) -> StepResult {
    db.execute_batch("CREATE TABLE proc_t (id INTEGER)")?;
    db.execute_batch("INSERT INTO proc_t VALUES (1)")?;
    Ok(())
}

fn drop_proc(db: &dyn Database) -> StepResult {
    db.execute_batch("DROP TABLE proc_t")?;
    Ok(())
}

fn failing_proc(db: &dyn Database) -> StepResult {
    db.execute_batch("CREATE TABLE half_done (id INTEGER)")?;
    Err("refusing to continue".into())
}

// ── up / up_to ─────────────────────────────────────────────────────────

#[test]
fn test_up_applies_in_order() {
    let db = SqliteBackend::in_memory().unwrap();
    let seq = sequence(vec![table_unit(3), table_unit(1), table_unit(2)]);
    let mut runner = Runner::new(ledger(&db), &seq);

    let report = runner.up().unwrap();
    assert_eq!(report.applied(), vec![1, 2, 3]);
    assert_eq!(runner.state(), &RunnerState::Idle);
    assert!(table_exists(&db, "t1") && table_exists(&db, "t2") && table_exists(&db, "t3"));

    let rows = runner.ledger().rows_above(0).unwrap();
    let versions: Vec<i64> = rows.iter().map(|r| r.version).collect();
    assert_eq!(versions, vec![1, 2, 3]);
    assert!(rows.iter().all(|r| r.is_applied));
}

#[test]
fn test_up_twice_is_a_no_op() {
    let db = SqliteBackend::in_memory().unwrap();
    let seq = sequence(vec![table_unit(1)]);
    let mut runner = Runner::new(ledger(&db), &seq);

    runner.up().unwrap();
    assert!(runner.up().unwrap().is_empty());
    assert_eq!(runner.ledger().rows_above(0).unwrap().len(), 1);
}

#[test]
fn test_up_to_stops_at_target() {
    let db = SqliteBackend::in_memory().unwrap();
    let seq = sequence(vec![table_unit(1), table_unit(2), table_unit(5)]);
    let mut runner = Runner::new(ledger(&db), &seq);

    assert_eq!(runner.up_to(3).unwrap().applied(), vec![1, 2]);
    assert!(!table_exists(&db, "t5"));
    assert_eq!(runner.up().unwrap().applied(), vec![5]);
}

// ── down / down_to / redo / reset ──────────────────────────────────────

#[test]
fn test_down_rolls_back_highest() {
    let db = SqliteBackend::in_memory().unwrap();
    let seq = sequence(vec![table_unit(1), table_unit(2), table_unit(3)]);
    let mut runner = Runner::new(ledger(&db), &seq);
    runner.up().unwrap();

    let report = runner.down().unwrap();
    assert_eq!(report.rolled_back(), vec![3]);
    assert_eq!(runner.state(), &RunnerState::RolledBack(3));
    assert!(!table_exists(&db, "t3"));
    assert_eq!(runner.ledger().current_version().unwrap(), 2);

    let latest = runner.ledger().latest(3).unwrap().unwrap();
    assert!(!latest.is_applied);
}

#[test]
fn test_down_on_empty_ledger_does_nothing() {
    let db = SqliteBackend::in_memory().unwrap();
    let seq = sequence(vec![table_unit(1)]);
    let mut runner = Runner::new(ledger(&db), &seq);

    assert!(runner.down().unwrap().is_empty());
    assert!(runner.redo().unwrap().is_empty());
    assert!(runner.ledger().rows_above(0).unwrap().is_empty());
}

#[test]
fn test_down_without_unit_for_current_version() {
    let db = SqliteBackend::in_memory().unwrap();
    let full = sequence(vec![table_unit(1), table_unit(2)]);
    Runner::new(ledger(&db), &full).up().unwrap();

    let partial = sequence(vec![table_unit(1)]);
    let err = Runner::new(ledger(&db), &partial).down().unwrap_err();
    assert!(matches!(
        err,
        RunError::Core(CoreError::MigrationNotFound { version: 2 })
    ));
}

#[test]
fn test_down_to_rolls_back_descending() {
    let db = SqliteBackend::in_memory().unwrap();
    let seq = sequence(vec![table_unit(1), table_unit(2), table_unit(3)]);
    let mut runner = Runner::new(ledger(&db), &seq);
    runner.up().unwrap();

    assert_eq!(runner.down_to(1).unwrap().rolled_back(), vec![3, 2]);
    assert_eq!(runner.ledger().current_version().unwrap(), 1);
    assert!(runner.down_to(1).unwrap().is_empty());
}

#[test]
fn test_down_to_stops_at_version_without_unit() {
    let db = SqliteBackend::in_memory().unwrap();
    let seq = sequence(vec![table_unit(1), table_unit(2)]);
    let mut runner = Runner::new(ledger(&db), &seq);
    runner.up().unwrap();
    runner.ledger().append(5, true).unwrap();

    let report = runner.down_to(0).unwrap();
    assert!(report.is_empty());
    assert_eq!(runner.ledger().current_version().unwrap(), 5);
    assert!(table_exists(&db, "t2"));

    // down still reports the missing unit
    assert!(matches!(
        runner.down(),
        Err(RunError::Core(CoreError::MigrationNotFound { version: 5 }))
    ));
}

#[test]
fn test_redo_appends_two_rows() {
    let db = SqliteBackend::in_memory().unwrap();
    let seq = sequence(vec![table_unit(1), table_unit(2)]);
    let mut runner = Runner::new(ledger(&db), &seq);
    runner.up().unwrap();
    let original = runner.ledger().latest(2).unwrap().unwrap();

    let report = runner.redo().unwrap();
    let directions: Vec<Direction> = report.steps.iter().map(|s| s.direction).collect();
    assert_eq!(directions, vec![Direction::Rollback, Direction::Apply]);

    let history = runner.ledger().history(2).unwrap();
    assert_eq!(history.len(), 3);
    let latest = runner.ledger().latest(2).unwrap().unwrap();
    assert!(latest.is_applied);
    assert!(latest.id > original.id);
    assert!(latest.tstamp > original.tstamp);
    assert!(table_exists(&db, "t2"));
}

#[test]
fn test_reset_rolls_back_everything() {
    let db = SqliteBackend::in_memory().unwrap();
    let seq = sequence(vec![table_unit(1), table_unit(2), table_unit(3)]);
    let mut runner = Runner::new(ledger(&db), &seq);
    runner.up().unwrap();
    runner.down().unwrap();

    assert_eq!(runner.reset().unwrap().rolled_back(), vec![2, 1]);
    assert_eq!(runner.ledger().current_version().unwrap(), 0);
    assert!(runner.reset().unwrap().is_empty());
}

// ── Failure handling ───────────────────────────────────────────────────

#[test]
fn test_failing_step_leaves_no_trace() {
    let db = SqliteBackend::in_memory().unwrap();
    let seq = sequence(vec![
        table_unit(1),
        declarative(
            2,
            "CREATE TABLE half (id INTEGER);\nINSERT INTO missing VALUES (1);",
            "DROP TABLE half;",
        ),
        table_unit(3),
    ]);
    let mut runner = Runner::new(ledger(&db), &seq);

    let err = runner.up().unwrap_err();
    assert!(matches!(err, RunError::Execution { version: 2, ref origin, .. } if origin.ends_with("00002_t2.sql")));
    assert!(matches!(runner.state(), RunnerState::Failed(2, _)));

    assert!(table_exists(&db, "t1"));
    assert!(!table_exists(&db, "half"));
    assert!(!table_exists(&db, "t3"));
    assert_eq!(runner.ledger().current_version().unwrap(), 1);
    assert!(runner.ledger().history(2).unwrap().is_empty());
}

#[test]
fn test_missing_up_section_fails_before_touching_database() {
    let db = SqliteBackend::in_memory().unwrap();
    let parsed = parse_migration("down_only.sql", "-- +tidemark Down\nSELECT 1;\n").unwrap();
    let seq = sequence(vec![MigrationUnit::declarative(1, "00001_down_only.sql", parsed)]);
    let mut runner = Runner::new(ledger(&db), &seq);

    let err = runner.up().unwrap_err();
    assert!(matches!(
        err,
        RunError::Core(CoreError::MissingSection { ref section, .. }) if section == "Up"
    ));
    assert!(runner.ledger().rows_above(0).unwrap().is_empty());
}

#[test]
fn test_empty_rollback_section_still_records_rollback() {
    let db = SqliteBackend::in_memory().unwrap();
    let seq = sequence(vec![declarative(1, "CREATE TABLE keep (id INTEGER);", "")]);
    let mut runner = Runner::new(ledger(&db), &seq);
    runner.up().unwrap();

    assert_eq!(runner.down().unwrap().rolled_back(), vec![1]);
    assert!(table_exists(&db, "keep"));
    assert_eq!(runner.ledger().current_version().unwrap(), 0);
}

#[test]
fn test_non_transactional_failure_keeps_earlier_statements() {
    let db = SqliteBackend::in_memory().unwrap();
    let parsed = parse_migration(
        "notx.sql",
        "-- +tidemark NO TRANSACTION\n-- +tidemark Up\nCREATE TABLE first (id INTEGER);\nINSERT INTO missing VALUES (1);\n-- +tidemark Down\n",
    )
    .unwrap();
    let seq = sequence(vec![MigrationUnit::declarative(1, "00001_notx.sql", parsed)]);
    let mut runner = Runner::new(ledger(&db), &seq);

    assert!(runner.up().is_err());
    assert!(table_exists(&db, "first"));
    assert!(runner.ledger().rows_above(0).unwrap().is_empty());
}

// ── Procedural units ───────────────────────────────────────────────────

#[test]
fn test_procedural_apply_and_rollback() {
    let db = SqliteBackend::in_memory().unwrap();
    let seq = sequence(vec![
        table_unit(1),
        MigrationUnit::procedural(2, "seed_proc", create_proc, drop_proc, true),
    ]);
    let mut runner = Runner::new(ledger(&db), &seq);

    assert_eq!(runner.up().unwrap().applied(), vec![1, 2]);
    assert_eq!(db.query_i64("SELECT COUNT(*) FROM proc_t", &[]).unwrap(), 1);

    let report = runner.down().unwrap();
    assert_eq!(report.steps[0].source, "seed_proc");
    assert!(!table_exists(&db, "proc_t"));
}

#[test]
fn test_procedural_failure_rolls_back() {
    let db = SqliteBackend::in_memory().unwrap();
    let seq = sequence(vec![MigrationUnit::procedural(
        1,
        "explodes",
        failing_proc,
        drop_proc,
        true,
    )]);
    let mut runner = Runner::new(ledger(&db), &seq);

    let err = runner.up().unwrap_err();
    assert!(err.to_string().contains("refusing to continue"));
    assert!(!table_exists(&db, "half_done"));
    assert!(runner.ledger().rows_above(0).unwrap().is_empty());
}
