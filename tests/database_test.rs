use anyhow::Result;
use tempfile::TempDir;

use stratumdb::{BlockId, Database};

/// Startup: a fresh directory is bootstrapped, an existing one is put
/// through recovery before use.
#[test]
fn test_bootstrap_and_reopen() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("db");
    let blk = BlockId::new("testfile", 0);

    {
        let db = Database::new(&path)?;
        let tx = db.new_tx()?;
        tx.pin(&blk)?;
        tx.set_int(&blk, 0, 123, false)?;
        tx.set_string(&blk, 20, "persisted", false)?;
        tx.commit()?;
        db.close();
    }

    // Reopening runs recovery and leaves the committed data in place.
    let db = Database::new(&path)?;
    let tx = db.new_tx()?;
    tx.pin(&blk)?;
    assert_eq!(tx.get_int(&blk, 0)?, 123);
    assert_eq!(tx.get_string(&blk, 20)?, "persisted");
    tx.commit()?;
    Ok(())
}

/// An uncommitted logged change from a previous run is rolled back by
/// startup recovery.
#[test]
fn test_reopen_undoes_unfinished_transaction() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("db");
    let blk = BlockId::new("testfile", 0);

    {
        let db = Database::new(&path)?;
        let tx = db.new_tx()?;
        tx.pin(&blk)?;
        tx.set_int(&blk, 0, 1, false)?;
        tx.commit()?;

        // Overwrite with logging, force the page out, and "crash".
        let tx = db.new_tx()?;
        tx.pin(&blk)?;
        tx.set_int(&blk, 0, 2, true)?;
        db.buffer_manager().flush_all(tx.tx_number())?;
        drop(tx);
        db.close();
    }

    let db = Database::new(&path)?;
    let tx = db.new_tx()?;
    tx.pin(&blk)?;
    assert_eq!(tx.get_int(&blk, 0)?, 1);
    tx.commit()?;
    Ok(())
}

/// Two databases over different directories are fully independent: each
/// has its own lock table, so the same block id does not conflict.
#[test]
fn test_instances_are_isolated() -> Result<()> {
    let dir_a = TempDir::new()?;
    let dir_b = TempDir::new()?;
    let db_a = Database::new(dir_a.path().join("db"))?;
    let db_b = Database::new(dir_b.path().join("db"))?;
    let blk = BlockId::new("testfile", 0);

    let tx_a = db_a.new_tx()?;
    tx_a.pin(&blk)?;
    tx_a.set_int(&blk, 0, 1, false)?; // X-lock in instance A

    // Instance B can take its own X-lock on the same block id at once.
    let tx_b = db_b.new_tx()?;
    tx_b.pin(&blk)?;
    tx_b.set_int(&blk, 0, 2, false)?;

    tx_a.commit()?;
    tx_b.commit()?;
    Ok(())
}
