use log::info;
use rusqlite::Connection;

use crate::WorkingDirectory;

/// Open (or create) the tracking database and start a dry run save point
pub fn open_db(wd: &WorkingDirectory) -> rusqlite::Result<Connection> {
    let path = &wd.path.join("pbsrun.db");
    if !path.exists() { info!("Creating new database {}", path.display()) }
    let conn = Connection::open(path)?;

    static SCHEMA: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/db/schema.sql"));
    conn.execute(SCHEMA, [])?;

    info!("Creating dry run save point");
    conn.execute("SAVEPOINT dry_run", [])?;

    Ok(conn)
}

/// Finish the save point: roll back with --dry-run, otherwise keep every change
pub fn release_or_rollback(conn: &Connection, dry_run: bool) -> rusqlite::Result<()> {
    match dry_run {
        true => {
            info!("--dry-run set, rolling back database state");
            conn.execute("ROLLBACK TO dry_run", [])?;
            conn.execute("RELEASE dry_run", [])?;
        }
        false => {
            info!("--dry-run not set, releasing dry run save point");
            conn.execute("RELEASE dry_run", [])?;
        }
    }
    Ok(())
}
