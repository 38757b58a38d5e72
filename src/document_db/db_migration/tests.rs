use super::*;

fn memory_db() -> SqliteConnection {
    SqliteConnection::establish(":memory:").unwrap()
}

fn schema_objects(conn: &SqliteConnection) -> Vec<String> {
    use diesel::sql_types::Text;
    #[derive(Debug, QueryableByName)]
    struct SchemaObject {
        #[sql_type = "Text"]
        name: String,
    }

    sql_query("SELECT name FROM sqlite_master ORDER BY name")
        .load::<SchemaObject>(conn)
        .unwrap()
        .into_iter()
        .map(|object| object.name)
        .collect()
}

#[test]
fn fresh_files_start_at_version_zero() {
    let conn = memory_db();

    assert_eq!(read_db_version(&conn).unwrap(), 0);
    write_db_version(&conn, 3).unwrap();
    assert_eq!(read_db_version(&conn).unwrap(), 3);
}

#[test]
fn first_step_creates_the_documents_table() {
    let conn = memory_db();
    migrate_up_from(&conn, 0).unwrap();

    let objects = schema_objects(&conn);
    assert!(objects.iter().any(|name| name == "documents"));
    assert!(objects.iter().any(|name| name == "documents_updated_at_idx"));
    assert_eq!(read_db_version(&conn).unwrap(), 1);
}

#[test]
fn no_step_leaves_the_latest_version() {
    let conn = memory_db();

    match migrate_up_from(&conn, latest_version()) {
        Err(MigrationError::UnknownDBVersion { version }) => assert_eq!(version, latest_version()),
        other => panic!("Expected an unknown version error, got {:?}", other),
    }
}

#[test]
fn upgrade_runs_once() {
    let conn = memory_db();

    assert_eq!(upgrade_db(&conn).unwrap(), latest_version());
    assert_eq!(upgrade_db(&conn).unwrap(), latest_version());
    assert_eq!(read_db_version(&conn).unwrap(), latest_version());
}

#[test]
fn refuse_files_of_newer_builds() {
    let conn = memory_db();
    write_db_version(&conn, latest_version() + 1).unwrap();

    assert!(matches!(
        upgrade_db(&conn),
        Err(MigrationError::UnknownDBVersion { .. })
    ));
    assert!(schema_objects(&conn).is_empty());
}
