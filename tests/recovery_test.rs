use anyhow::Result;

use stratumdb::{BlockId, Page};

mod common;
use common::{create_test_db, reopen_test_db};

fn read_block(db: &stratumdb::Database, blk: &BlockId) -> Result<Page> {
    let mut page = Page::new(db.file_manager().block_size());
    db.file_manager().read(blk, &mut page)?;
    Ok(page)
}

fn assert_block_holds(page: &Page, base: i32, s: &str) {
    for i in 0..6 {
        let pos = i * 4;
        assert_eq!(page.get_int(pos as usize), base + pos);
    }
    assert_eq!(page.get_string(30), s);
}

/// Two committed transactions, one rolled-back transaction, and one
/// transaction cut off by a crash. After restart and recovery, only the
/// committed values remain on disk.
#[test]
fn test_crash_recovery_restores_committed_state() -> Result<()> {
    let (dir, db) = create_test_db(400, 8)?;
    let blk0 = BlockId::new("testfile", 0);
    let blk1 = BlockId::new("testfile", 1);

    // tx1 and tx2 initialize one block each and commit. The blocks start
    // out as garbage, so the writes are unlogged.
    let tx1 = db.new_tx()?;
    let tx2 = db.new_tx()?;
    tx1.pin(&blk0)?;
    tx2.pin(&blk1)?;
    for i in 0..6 {
        let pos = i * 4;
        tx1.set_int(&blk0, pos as usize, pos, false)?;
        tx2.set_int(&blk1, pos as usize, pos, false)?;
    }
    tx1.set_string(&blk0, 30, "abc", false)?;
    tx2.set_string(&blk1, 30, "def", false)?;
    tx1.commit()?;
    tx2.commit()?;

    assert_block_holds(&read_block(&db, &blk0)?, 0, "abc");
    assert_block_holds(&read_block(&db, &blk1)?, 0, "def");

    // tx3 and tx4 overwrite everything with logging. Neither commits:
    // tx3 rolls back, tx4 is simply cut off by the crash. Both force their
    // buffers out so the uncommitted values really are on disk.
    let tx3 = db.new_tx()?;
    let tx4 = db.new_tx()?;
    tx3.pin(&blk0)?;
    tx4.pin(&blk1)?;
    for i in 0..6 {
        let pos = i * 4;
        tx3.set_int(&blk0, pos as usize, pos + 100, true)?;
        tx4.set_int(&blk1, pos as usize, pos + 100, true)?;
    }
    tx3.set_string(&blk0, 30, "uvw", true)?;
    tx4.set_string(&blk1, 30, "xyz", true)?;
    db.buffer_manager().flush_all(tx3.tx_number())?;
    db.buffer_manager().flush_all(tx4.tx_number())?;

    assert_block_holds(&read_block(&db, &blk0)?, 100, "uvw");
    assert_block_holds(&read_block(&db, &blk1)?, 100, "xyz");

    tx3.rollback()?;
    assert_block_holds(&read_block(&db, &blk0)?, 0, "abc");

    // Crash: tx4 never finishes.
    drop(tx4);
    db.close();
    drop(db);

    // Restart and recover. tx4's changes are undone from the log.
    let db = reopen_test_db(&dir, 400, 8)?;
    let tx5 = db.new_tx()?;
    tx5.recover()?;

    assert_block_holds(&read_block(&db, &blk0)?, 0, "abc");
    assert_block_holds(&read_block(&db, &blk1)?, 0, "def");
    tx5.commit()?;
    Ok(())
}

/// Recovery is idempotent: running it again over the same log leaves the
/// database unchanged.
#[test]
fn test_recovery_twice_is_a_no_op() -> Result<()> {
    let (dir, db) = create_test_db(400, 8)?;
    let blk = BlockId::new("testfile", 0);

    let tx = db.new_tx()?;
    tx.pin(&blk)?;
    tx.set_int(&blk, 0, 77, false)?;
    tx.commit()?;

    // An unfinished change that reaches disk.
    let tx = db.new_tx()?;
    tx.pin(&blk)?;
    tx.set_int(&blk, 0, 88, true)?;
    db.buffer_manager().flush_all(tx.tx_number())?;
    drop(tx);
    db.close();
    drop(db);

    let db = reopen_test_db(&dir, 400, 8)?;
    let tx = db.new_tx()?;
    tx.recover()?;
    tx.commit()?;
    assert_eq!(read_block(&db, &blk)?.get_int(0), 77);
    db.close();
    drop(db);

    let db = reopen_test_db(&dir, 400, 8)?;
    let tx = db.new_tx()?;
    tx.recover()?;
    tx.commit()?;
    assert_eq!(read_block(&db, &blk)?.get_int(0), 77);
    Ok(())
}
