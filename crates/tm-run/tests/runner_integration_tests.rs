//! End-to-end tests: collect migrations from disk and run them on real backends

use std::fs;
use std::path::Path;
use tm_core::{collect, Registry, StepResult, MAX_VERSION, MIN_VERSION};
use tm_db::{
    Database, DialectKind, DuckDbBackend, Ledger, SqliteBackend, TableName, DEFAULT_LEDGER_TABLE,
};
use tm_run::{check, status, RunError, Runner};

const FIXTURES: &str = "tests/fixtures/basic";

fn ledger<'a>(db: &'a dyn Database, kind: DialectKind) -> Ledger<'a> {
    Ledger::new(
        db,
        kind.adapter(),
        TableName::parse(DEFAULT_LEDGER_TABLE).unwrap(),
    )
}

fn write(dir: &Path, name: &str, up: &str, down: &str) {
    fs::write(
        dir.join(name),
        format!("-- +tidemark Up\n{up}\n-- +tidemark Down\n{down}\n"),
    )
    .unwrap();
}

/// up, status, down, status against one backend
fn lifecycle(db: &dyn Database, kind: DialectKind) {
    let seq = collect(Path::new(FIXTURES), &Registry::new(), MIN_VERSION, MAX_VERSION).unwrap();
    assert_eq!(seq.versions(), vec![1, 2, 3]);

    let mut runner = Runner::new(ledger(db, kind), &seq);
    assert_eq!(runner.up().unwrap().applied(), vec![1, 2, 3]);

    let rows = runner.ledger().rows_above(MIN_VERSION).unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows.iter().map(|r| r.version).collect::<Vec<_>>(), vec![1, 2, 3]);
    assert!(rows.iter().all(|r| r.is_applied));
    assert_eq!(
        db.query_i64("SELECT COUNT(*) FROM posts WHERE body = 'first; post'", &[])
            .unwrap(),
        1
    );

    let statuses = status(runner.ledger(), &seq, false).unwrap();
    assert!(statuses.iter().all(|s| s.applied_at.is_some()));

    assert_eq!(runner.down().unwrap().rolled_back(), vec![3]);
    let rows = runner.ledger().rows_above(MIN_VERSION).unwrap();
    assert_eq!(rows.len(), 4);
    assert_eq!((rows[3].version, rows[3].is_applied), (3, false));

    let statuses = status(runner.ledger(), &seq, false).unwrap();
    let applied: Vec<bool> = statuses.iter().map(|s| s.is_applied()).collect();
    assert_eq!(applied, vec![true, true, false]);
}

#[test]
fn test_lifecycle_on_duckdb() {
    let db = DuckDbBackend::in_memory().unwrap();
    lifecycle(&db, DialectKind::DuckDb);
}

#[test]
fn test_lifecycle_on_sqlite() {
    let db = SqliteBackend::in_memory().unwrap();
    lifecycle(&db, DialectKind::Sqlite3);
}

#[test]
fn test_ledger_survives_reconnect() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.db");
    let seq = collect(Path::new(FIXTURES), &Registry::new(), MIN_VERSION, MAX_VERSION).unwrap();

    {
        let db = SqliteBackend::new(path.to_str().unwrap()).unwrap();
        Runner::new(ledger(&db, DialectKind::Sqlite3), &seq)
            .up_to(2)
            .unwrap();
    }

    let db = SqliteBackend::new(path.to_str().unwrap()).unwrap();
    let mut runner = Runner::new(ledger(&db, DialectKind::Sqlite3), &seq);
    assert_eq!(runner.ledger().current_version().unwrap(), 2);
    assert_eq!(runner.up().unwrap().applied(), vec![3]);
}

#[test]
fn test_out_of_order_file_is_detected() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "00001_a.sql", "CREATE TABLE a (id INT);", "DROP TABLE a;");
    write(dir.path(), "00003_c.sql", "CREATE TABLE c (id INT);", "DROP TABLE c;");

    let db = DuckDbBackend::in_memory().unwrap();
    let seq = collect(dir.path(), &Registry::new(), MIN_VERSION, MAX_VERSION).unwrap();
    Runner::new(ledger(&db, DialectKind::DuckDb), &seq).up().unwrap();

    // a branch merged late adds version 2 below the applied head
    write(dir.path(), "00002_b.sql", "CREATE TABLE b (id INT);", "DROP TABLE b;");
    let seq = collect(dir.path(), &Registry::new(), MIN_VERSION, MAX_VERSION).unwrap();
    let versions = ledger(&db, DialectKind::DuckDb);

    let err = check(&versions, &seq, MIN_VERSION).unwrap_err();
    assert!(matches!(err, RunError::Drift { ref versions } if versions == &vec![2]));

    // up only moves forward from the current version, so the gap remains
    assert!(Runner::new(versions, &seq).up().unwrap().is_empty());
}

#[test]
fn test_redo_end_to_end() {
    let db = DuckDbBackend::in_memory().unwrap();
    let seq = collect(Path::new(FIXTURES), &Registry::new(), MIN_VERSION, MAX_VERSION).unwrap();
    let mut runner = Runner::new(ledger(&db, DialectKind::DuckDb), &seq);
    runner.up().unwrap();
    let before = runner.ledger().latest(3).unwrap().unwrap();

    assert_eq!(runner.redo().unwrap().steps.len(), 2);

    let history = runner.ledger().history(3).unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(
        history.iter().map(|r| r.is_applied).collect::<Vec<_>>(),
        vec![true, false, true]
    );
    let after = runner.ledger().latest(3).unwrap().unwrap();
    assert!(after.id > before.id);
    assert!(after.tstamp > before.tstamp);
}

#[test]
fn test_failing_migration_on_duckdb() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "00001_ok.sql", "CREATE TABLE ok (id INT);", "DROP TABLE ok;");
    write(
        dir.path(),
        "00002_broken.sql",
        "CREATE TABLE partial (id INT);\nINSERT INTO nowhere VALUES (1);",
        "DROP TABLE partial;",
    );

    let db = DuckDbBackend::in_memory().unwrap();
    let seq = collect(dir.path(), &Registry::new(), MIN_VERSION, MAX_VERSION).unwrap();
    let mut runner = Runner::new(ledger(&db, DialectKind::DuckDb), &seq);

    let err = runner.up().unwrap_err();
    assert!(matches!(err, RunError::Execution { version: 2, .. }));
    assert_eq!(runner.ledger().current_version().unwrap(), 1);
    assert!(runner.ledger().history(2).unwrap().is_empty());
    assert_eq!(
        db.query_i64(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = 'partial'",
            &[]
        )
        .unwrap(),
        0
    );
}

fn add_flag(db: &dyn Database) -> StepResult {
    db.execute_batch("CREATE TABLE flags (name VARCHAR)")?;
    db.execute("INSERT INTO flags VALUES (?)", &["dark_mode".into()])?;
    Ok(())
}

fn drop_flag(db: &dyn Database) -> StepResult {
    db.execute_batch("DROP TABLE flags")?;
    Ok(())
}

#[test]
fn test_procedural_migration_from_registry() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "00001_a.sql", "CREATE TABLE a (id INT);", "DROP TABLE a;");
    fs::write(dir.path().join("00002_flags.rs"), "// registered in code").unwrap();

    let mut registry = Registry::new();
    registry.register(2, "00002_flags.rs", add_flag, drop_flag);

    let db = SqliteBackend::in_memory().unwrap();
    let seq = collect(dir.path(), &registry, MIN_VERSION, MAX_VERSION).unwrap();
    let mut runner = Runner::new(ledger(&db, DialectKind::Sqlite3), &seq);

    assert_eq!(runner.up().unwrap().applied(), vec![1, 2]);
    assert_eq!(db.query_i64("SELECT COUNT(*) FROM flags", &[]).unwrap(), 1);

    assert_eq!(runner.reset().unwrap().rolled_back(), vec![2, 1]);
    assert_eq!(runner.ledger().current_version().unwrap(), 0);
}
