use super::*;
use crate::migration::StepResult;
use crate::parser::parse_migration;
use tm_db::Database;

fn noop(_db: &dyn Database) -> StepResult {
    Ok(())
}

#[test]
fn test_template_from_str() {
    assert_eq!("sql".parse::<MigrationTemplate>().unwrap(), MigrationTemplate::Sql);
    assert_eq!("rs".parse::<MigrationTemplate>().unwrap(), MigrationTemplate::Rust);
    assert_eq!("Rust".parse::<MigrationTemplate>().unwrap(), MigrationTemplate::Rust);
    assert!("go".parse::<MigrationTemplate>().is_err());
}

#[test]
fn test_sql_template_parses() {
    let rendered = MigrationTemplate::Sql
        .render("00001", "00001_init.sql")
        .unwrap();
    let parsed = parse_migration("00001_init.sql", &rendered).unwrap();
    assert_eq!(parsed.apply, Some(vec![]));
    assert_eq!(parsed.rollback, Some(vec![]));
}

#[test]
fn test_rust_template_names_functions_by_version() {
    let rendered = MigrationTemplate::Rust
        .render("00007", "00007_backfill.rs")
        .unwrap();
    assert!(rendered.contains("pub fn up_00007(db: &dyn Database) -> StepResult"));
    assert!(rendered.contains("pub fn down_00007(db: &dyn Database) -> StepResult"));
    assert!(rendered.contains(
        r#"registry.register(7, "00007_backfill.rs", up_00007, down_00007);"#
    ));
}

#[test]
fn test_validate_name() {
    assert!(validate_name("add_users").is_ok());
    assert!(validate_name("AddUsers-2").is_ok());
    for bad in ["", "../escape", "a/b", "a\\b", ".hidden", "-flag", "two words"] {
        assert!(validate_name(bad).is_err(), "{bad:?} should be rejected");
    }
}

#[test]
fn test_create_first_and_next() {
    let dir = tempfile::tempdir().unwrap();
    let migrations = dir.path().join("migrations");
    let registry = Registry::new();

    let first = create_migration(&migrations, "init", MigrationTemplate::Sql, false, &registry)
        .unwrap();
    assert_eq!(first.file_name().unwrap(), "00001_init.sql");

    let second = create_migration(
        &migrations,
        "backfill",
        MigrationTemplate::Rust,
        false,
        &registry,
    )
    .unwrap();
    assert_eq!(second.file_name().unwrap(), "00002_backfill.rs");
    assert!(std::fs::read_to_string(second).unwrap().contains("up_00002"));
}

#[test]
fn test_create_follows_registry_versions() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = Registry::new();
    registry.register(9, "seed", noop, noop);

    let path = create_migration(dir.path(), "next", MigrationTemplate::Sql, false, &registry)
        .unwrap();
    assert_eq!(path.file_name().unwrap(), "00010_next.sql");
}

#[test]
fn test_create_timestamp_history() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("20230101000000_old.sql"), "").unwrap();

    let path = create_migration(dir.path(), "new", MigrationTemplate::Sql, false, &Registry::new())
        .unwrap();
    let name = path.file_name().unwrap().to_str().unwrap().to_string();
    let (version, _) = name.split_once('_').unwrap();
    assert_eq!(version.len(), 14);
    assert!(version > "20230101000000");
}

#[test]
fn test_create_forced_timestamp_over_sequence() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("00003_old.sql"), "").unwrap();

    let path = create_migration(dir.path(), "stamped", MigrationTemplate::Sql, true, &Registry::new())
        .unwrap();
    let name = path.file_name().unwrap().to_str().unwrap();
    assert!(name.ends_with("_stamped.sql"));
    assert_eq!(name.split_once('_').unwrap().0.len(), 14);
}

#[test]
fn test_write_refuses_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("00001_init.sql"), "keep me").unwrap();

    let err = write_migration(dir.path(), "00001", "init", MigrationTemplate::Sql).unwrap_err();
    assert!(matches!(err, CoreError::FileExists { ref path } if path.ends_with("00001_init.sql")));
    assert_eq!(
        std::fs::read_to_string(dir.path().join("00001_init.sql")).unwrap(),
        "keep me"
    );
}

#[test]
fn test_create_skips_past_existing_version() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("00001_init.sql"), "keep me").unwrap();

    let created =
        create_migration(dir.path(), "init", MigrationTemplate::Sql, false, &Registry::new())
            .unwrap();
    assert_eq!(created.file_name().unwrap(), "00002_init.sql");
}

#[test]
fn test_create_after_largest_version_fails() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("9223372036854775807_last.sql"), "").unwrap();

    let result =
        create_migration(dir.path(), "next", MigrationTemplate::Sql, false, &Registry::new());
    assert!(matches!(result, Err(CoreError::VersionOverflow { .. })));
}
