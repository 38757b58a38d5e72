//! Schema migrations of the document database.
//!
//! The schema version is kept in `PRAGMA user_version`. Each step in `MIGRATIONS`
//! moves the schema one version up, a fresh file starts at version 0.
mod errors;
pub use self::errors::*;
mod version_001;

use diesel::prelude::*;
use diesel::sql_query;
use diesel::sql_types::Integer;
use diesel::sqlite::SqliteConnection;

pub type DBVersion = i32;
type MigrationStep = fn(&SqliteConnection) -> Result<()>;

// Index i migrates from version i to version i + 1.
const MIGRATIONS: [MigrationStep; 1] = [version_001::migrate];

#[derive(Debug, QueryableByName)]
struct UserVersion {
    #[sql_type = "Integer"]
    user_version: DBVersion,
}

/// Version the schema has after all known migrations ran.
pub fn latest_version() -> DBVersion {
    MIGRATIONS.len() as DBVersion
}

/// Brings the schema of `conn` to `latest_version()` and returns the version.
///
/// Must run before any document is read or written. Files written by a newer
/// build (a version above the latest known one) are refused.
pub fn upgrade_db(conn: &SqliteConnection) -> Result<DBVersion> {
    let mut version = read_db_version(conn)?;
    if version > latest_version() || version < 0 {
        return Err(MigrationError::UnknownDBVersion { version });
    }

    while version < latest_version() {
        migrate_up_from(conn, version)?;
        version += 1;
        tracing::debug!(version, "migrated document database");
    }
    Ok(version)
}

// Runs the single step leaving `version`. The caller owns the transaction.
fn migrate_up_from(conn: &SqliteConnection, version: DBVersion) -> Result<()> {
    let step = MIGRATIONS
        .get(version as usize)
        .filter(|_| version >= 0)
        .ok_or(MigrationError::UnknownDBVersion { version })?;

    step(conn)?;
    write_db_version(conn, version + 1)
}

fn read_db_version(conn: &SqliteConnection) -> Result<DBVersion> {
    let rows = sql_query("PRAGMA user_version")
        .load::<UserVersion>(conn)
        .map_err(|source| MigrationError::ReadWriteDBVersion { source })?;

    Ok(rows.first().map_or(0, |row| row.user_version))
}

fn write_db_version(conn: &SqliteConnection, version: DBVersion) -> Result<()> {
    sql_query(format!("PRAGMA user_version = {}", version))
        .execute(conn)
        .map_err(|source| MigrationError::ReadWriteDBVersion { source })?;

    Ok(())
}

#[cfg(test)]
mod tests;
