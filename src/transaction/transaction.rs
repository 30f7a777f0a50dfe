use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use log::debug;
use thiserror::Error;

use crate::common::types::{TxNum, NO_LSN};
use crate::storage::buffer::{BufferError, BufferPoolManager, BufferPtr};
use crate::storage::file::{BlockId, FileError, FileManager};
use crate::transaction::buffer_list::BufferList;
use crate::transaction::concurrency::{ConcurrencyManager, LockError, LockTable};
use crate::transaction::recovery::RecoveryManager;
use crate::transaction::wal::LogManager;

/// Process-wide transaction number counter. Recovery only ever compares
/// transaction numbers for equality, so restarting from 1 after a process
/// restart is fine.
static NEXT_TX_NUM: AtomicU32 = AtomicU32::new(0);

/// Block number of the dummy block standing for the end of a file. Locking
/// it serializes readers of the file length against appenders.
const END_OF_FILE: i32 = -1;

fn next_tx_number() -> TxNum {
    (NEXT_TX_NUM.fetch_add(1, Ordering::SeqCst) + 1) as TxNum
}

#[derive(Error, Debug)]
pub enum TransactionError {
    #[error(transparent)]
    File(#[from] FileError),

    #[error(transparent)]
    Buffer(#[from] BufferError),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error("block {0} is not pinned by this transaction")]
    BlockNotPinned(BlockId),

    #[error("buffer is not assigned to a block")]
    BufferNotAssigned,

    #[error("unknown log record type {0}")]
    UnknownLogRecord(i32),
}

pub type Result<T> = std::result::Result<T, TransactionError>;

/// Provides transaction management for clients, ensuring that all
/// transactions are serializable and recoverable.
///
/// Reads take a shared lock on the block and writes take an exclusive one;
/// every lock is held until the transaction ends (strict two-phase
/// locking). Logged writes first record the value being overwritten, so an
/// unfinished transaction can always be undone.
///
/// A transaction is meant to be driven by a single thread. `commit` and
/// `rollback` consume it: whichever way it ends, all of its locks are
/// released and its buffers unpinned, and the object cannot be used again.
///
/// If an operation fails with a lock or buffer timeout, the caller is
/// responsible for calling [`rollback`]; nothing is rolled back
/// automatically.
///
/// [`rollback`]: Transaction::rollback
pub struct Transaction {
    fm: Arc<FileManager>,
    bm: Arc<BufferPoolManager>,
    recovery_mgr: RecoveryManager,
    concur_mgr: ConcurrencyManager,
    buffers: BufferList,
    txnum: TxNum,
}

impl Transaction {
    /// Start a new transaction: assign it the next transaction number and
    /// write its START record to the log.
    pub fn new(
        fm: Arc<FileManager>,
        lm: Arc<LogManager>,
        bm: Arc<BufferPoolManager>,
        lock_table: Arc<LockTable>,
    ) -> Result<Self> {
        let txnum = next_tx_number();
        let recovery_mgr = RecoveryManager::new(txnum, lm, bm.clone())?;
        Ok(Self {
            concur_mgr: ConcurrencyManager::new(lock_table),
            buffers: BufferList::new(bm.clone()),
            fm,
            bm,
            recovery_mgr,
            txnum,
        })
    }

    /// This transaction's number.
    pub fn tx_number(&self) -> TxNum {
        self.txnum
    }

    /// Commit the transaction: flush its modified buffers and their log
    /// records, write and flush a COMMIT record, then release all locks and
    /// unpin any pinned buffers.
    pub fn commit(self) -> Result<()> {
        self.recovery_mgr.commit()?;
        debug!("transaction {} committed", self.txnum);
        self.concur_mgr.release();
        self.buffers.unpin_all();
        Ok(())
    }

    /// Roll back the transaction: undo its modifications, write and flush a
    /// ROLLBACK record, then release all locks and unpin any pinned
    /// buffers.
    pub fn rollback(self) -> Result<()> {
        self.recovery_mgr.rollback(&self)?;
        debug!("transaction {} rolled back", self.txnum);
        self.concur_mgr.release();
        self.buffers.unpin_all();
        Ok(())
    }

    /// Recover the database: flush any leftover dirty buffers, undo every
    /// unfinished transaction found in the log, and write a quiescent
    /// checkpoint.
    ///
    /// Called on a freshly started transaction during database startup,
    /// before user transactions run.
    pub fn recover(&self) -> Result<()> {
        self.bm.flush_all(self.txnum)?;
        self.recovery_mgr.recover(self)?;
        Ok(())
    }

    /// Pin the specified block on behalf of this transaction.
    pub fn pin(&self, blk: &BlockId) -> Result<()> {
        self.buffers.pin(blk)?;
        Ok(())
    }

    /// Release one pin on the specified block.
    pub fn unpin(&self, blk: &BlockId) {
        self.buffers.unpin(blk);
    }

    /// Read the integer at `offset` of the pinned block, after obtaining a
    /// shared lock on the block.
    pub fn get_int(&self, blk: &BlockId, offset: usize) -> Result<i32> {
        self.concur_mgr.s_lock(blk)?;
        let buf = self.get_buffer(blk)?;
        let val = buf.read().contents().get_int(offset);
        Ok(val)
    }

    /// Read the string at `offset` of the pinned block, after obtaining a
    /// shared lock on the block.
    pub fn get_string(&self, blk: &BlockId, offset: usize) -> Result<String> {
        self.concur_mgr.s_lock(blk)?;
        let buf = self.get_buffer(blk)?;
        let val = buf.read().contents().get_string(offset);
        Ok(val)
    }

    /// Store an integer at `offset` of the pinned block, after obtaining an
    /// exclusive lock.
    ///
    /// When `ok_to_log` is set, the overwritten value is saved in a SETINT
    /// log record first; undo passes `false` because restoring an old value
    /// must not itself be undoable.
    pub fn set_int(&self, blk: &BlockId, offset: usize, val: i32, ok_to_log: bool) -> Result<()> {
        self.concur_mgr.x_lock(blk)?;
        let buf = self.get_buffer(blk)?;
        let mut b = buf.write();
        let lsn = if ok_to_log {
            self.recovery_mgr.set_int(&b, offset)?
        } else {
            NO_LSN
        };
        b.contents_mut().set_int(offset, val);
        b.set_modified(self.txnum, lsn);
        Ok(())
    }

    /// Store a string at `offset` of the pinned block, after obtaining an
    /// exclusive lock. See [`set_int`] for the meaning of `ok_to_log`.
    ///
    /// [`set_int`]: Transaction::set_int
    pub fn set_string(
        &self,
        blk: &BlockId,
        offset: usize,
        val: &str,
        ok_to_log: bool,
    ) -> Result<()> {
        self.concur_mgr.x_lock(blk)?;
        let buf = self.get_buffer(blk)?;
        let mut b = buf.write();
        let lsn = if ok_to_log {
            self.recovery_mgr.set_string(&b, offset)?
        } else {
            NO_LSN
        };
        b.contents_mut().set_string(offset, val);
        b.set_modified(self.txnum, lsn);
        Ok(())
    }

    /// Number of blocks in the specified file.
    ///
    /// Takes a shared lock on the end-of-file dummy block, so the size
    /// cannot change under a scan that has read it.
    pub fn size(&self, filename: &str) -> Result<i32> {
        let dummy = BlockId::new(filename, END_OF_FILE);
        self.concur_mgr.s_lock(&dummy)?;
        Ok(self.fm.length(filename)?)
    }

    /// Append a new zero-filled block to the specified file.
    ///
    /// Takes an exclusive lock on the end-of-file dummy block, serializing
    /// appenders against readers of the file length.
    pub fn append(&self, filename: &str) -> Result<BlockId> {
        let dummy = BlockId::new(filename, END_OF_FILE);
        self.concur_mgr.x_lock(&dummy)?;
        Ok(self.fm.append(filename)?)
    }

    /// Block size of the underlying file manager.
    pub fn block_size(&self) -> usize {
        self.fm.block_size()
    }

    /// Number of currently unpinned buffers in the pool.
    pub fn available_buffs(&self) -> usize {
        self.bm.available()
    }

    fn get_buffer(&self, blk: &BlockId) -> Result<BufferPtr> {
        self.buffers
            .buffer(blk)
            .ok_or_else(|| TransactionError::BlockNotPinned(blk.clone()))
    }
}
