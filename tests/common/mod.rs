use anyhow::Result;
use tempfile::TempDir;

use stratumdb::database::Database;

/// Assemble a database over a fresh temp directory without running startup
/// recovery, so tests can drive the managers directly. The TempDir must be
/// kept alive for the duration of the test.
#[allow(dead_code)]
pub fn create_test_db(block_size: usize, num_buffs: usize) -> Result<(TempDir, Database)> {
    let dir = TempDir::new()?;
    let db = Database::with_config(dir.path(), block_size, num_buffs)?;
    Ok((dir, db))
}

/// Reopen a database over an existing directory, again without startup
/// recovery.
#[allow(dead_code)]
pub fn reopen_test_db(dir: &TempDir, block_size: usize, num_buffs: usize) -> Result<Database> {
    Ok(Database::with_config(dir.path(), block_size, num_buffs)?)
}
