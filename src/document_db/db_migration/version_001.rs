use super::*;

pub fn migrate(conn: &SqliteConnection) -> Result<()> {
    create_table_documents(&conn)?;
    create_index_documents_updated_at(&conn)?;

    Ok(())
}

// Every row holds one subtree of the document tree as JSON text, keyed by its key path.
// Rows never overlap: no stored path is an ancestor of another stored path.
fn create_table_documents(conn: &SqliteConnection) -> Result<()> {
    sql_query(
        "CREATE TABLE documents(
                path            TEXT PRIMARY KEY NOT NULL,
                value           TEXT NOT NULL,
                updated_at      TEXT NOT NULL
             )",
    )
    .execute(conn)?;

    Ok(())
}

// Allows to cheaply find recently changed documents (e.g. for change feeds).
fn create_index_documents_updated_at(conn: &SqliteConnection) -> Result<()> {
    sql_query("CREATE INDEX documents_updated_at_idx ON documents(updated_at)").execute(conn)?;
    Ok(())
}
