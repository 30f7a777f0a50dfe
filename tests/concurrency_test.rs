use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;

use stratumdb::{BlockId, Database};

mod common;
use common::create_test_db;

/// Three transactions with interleaved shared and exclusive requests on
/// two blocks. The lock table's waiting must find a serializable schedule:
/// all three commit, none hits the timeout.
#[test]
fn test_interleaved_transactions_all_commit() -> Result<()> {
    let (_dir, db) = create_test_db(400, 8)?;
    let db = Arc::new(db);

    let a = spawn_tx(db.clone(), tx_a);
    let b = spawn_tx(db.clone(), tx_b);
    let c = spawn_tx(db.clone(), tx_c);

    a.join().unwrap()?;
    b.join().unwrap()?;
    c.join().unwrap()?;
    Ok(())
}

fn spawn_tx(
    db: Arc<Database>,
    f: fn(&Database) -> Result<()>,
) -> thread::JoinHandle<Result<()>> {
    thread::spawn(move || f(&db))
}

fn tx_a(db: &Database) -> Result<()> {
    let tx = db.new_tx()?;
    let blk1 = BlockId::new("testfile", 1);
    let blk2 = BlockId::new("testfile", 2);
    tx.pin(&blk1)?;
    tx.pin(&blk2)?;

    tx.get_int(&blk1, 0)?; // S-lock block 1
    thread::sleep(Duration::from_millis(1000));
    tx.get_int(&blk2, 0)?; // S-lock block 2
    tx.commit()?;
    Ok(())
}

fn tx_b(db: &Database) -> Result<()> {
    let tx = db.new_tx()?;
    let blk1 = BlockId::new("testfile", 1);
    let blk2 = BlockId::new("testfile", 2);
    tx.pin(&blk1)?;
    tx.pin(&blk2)?;

    tx.set_int(&blk2, 0, 0, false)?; // X-lock block 2
    thread::sleep(Duration::from_millis(1000));
    tx.get_int(&blk1, 0)?; // S-lock block 1
    tx.commit()?;
    Ok(())
}

fn tx_c(db: &Database) -> Result<()> {
    let tx = db.new_tx()?;
    let blk1 = BlockId::new("testfile", 1);
    let blk2 = BlockId::new("testfile", 2);
    tx.pin(&blk1)?;
    tx.pin(&blk2)?;

    thread::sleep(Duration::from_millis(500));
    tx.set_int(&blk1, 0, 0, false)?; // X-lock block 1
    thread::sleep(Duration::from_millis(1000));
    tx.get_int(&blk2, 0)?; // S-lock block 2
    tx.commit()?;
    Ok(())
}

/// Writes made under an exclusive lock are invisible until commit: a reader
/// blocks on its shared lock until the writer finishes.
#[test]
fn test_reader_waits_for_writer_commit() -> Result<()> {
    let (_dir, db) = create_test_db(400, 8)?;
    let db = Arc::new(db);
    let blk = BlockId::new("testfile", 5);

    // Seed a committed value.
    let tx = db.new_tx()?;
    tx.pin(&blk)?;
    tx.set_int(&blk, 0, 10, false)?;
    tx.commit()?;

    let (started_send, started_recv) = std::sync::mpsc::channel();
    let writer_db = db.clone();
    let blk2 = blk.clone();
    let writer = thread::spawn(move || -> Result<()> {
        let tx = writer_db.new_tx()?;
        tx.pin(&blk2)?;
        tx.set_int(&blk2, 0, 20, true)?;
        started_send.send(()).unwrap();
        thread::sleep(Duration::from_millis(500));
        tx.commit()?;
        Ok(())
    });

    // Once the writer holds its X-lock, read. The S-lock request waits out
    // the writer, so the committed value is observed.
    started_recv.recv().unwrap();
    let tx = db.new_tx()?;
    tx.pin(&blk)?;
    assert_eq!(tx.get_int(&blk, 0)?, 20);
    tx.commit()?;

    writer.join().unwrap()?;
    Ok(())
}
