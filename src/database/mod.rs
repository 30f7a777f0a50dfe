// Database façade: wires the storage and transaction managers together and
// handles startup.

use std::path::Path;
use std::sync::Arc;

use log::info;

use crate::storage::buffer::BufferPoolManager;
use crate::storage::file::FileManager;
use crate::transaction::concurrency::LockTable;
use crate::transaction::transaction::Result;
use crate::transaction::Transaction;
use crate::transaction::wal::LogManager;

/// Block size used when none is configured. Deliberately tiny so that tests
/// exercise block boundaries; production deployments should use the OS
/// block size.
pub const DEFAULT_BLOCK_SIZE: usize = 400;

/// Number of buffer frames used when none is configured.
pub const DEFAULT_BUFFER_POOL_SIZE: usize = 8;

/// Name of the write-ahead log file inside the database directory.
pub const LOG_FILE: &str = "stratumdb.log";

/// A database instance: one directory of block files plus the shared
/// managers that operate on it.
///
/// Each instance owns its own lock table, which is handed to every
/// transaction it creates; two instances over different directories are
/// fully independent.
pub struct Database {
    fm: Arc<FileManager>,
    lm: Arc<LogManager>,
    bm: Arc<BufferPoolManager>,
    lock_table: Arc<LockTable>,
}

impl Database {
    /// Open the database with default configuration and run startup: a new
    /// directory is bootstrapped, an existing one is recovered.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let db = Self::with_config(dir, DEFAULT_BLOCK_SIZE, DEFAULT_BUFFER_POOL_SIZE)?;
        let tx = db.new_tx()?;
        if db.fm.is_new() {
            info!("creating new database");
        } else {
            info!("recovering existing database");
            tx.recover()?;
        }
        tx.commit()?;
        Ok(db)
    }

    /// Assemble a database over `dir` with the given block size and buffer
    /// pool size, without running startup recovery. Used by tests that want
    /// to drive the managers directly.
    pub fn with_config(dir: impl AsRef<Path>, block_size: usize, num_buffs: usize) -> Result<Self> {
        let fm = Arc::new(FileManager::new(dir.as_ref(), block_size)?);
        let lm = Arc::new(LogManager::new(fm.clone(), LOG_FILE)?);
        let bm = Arc::new(BufferPoolManager::new(fm.clone(), lm.clone(), num_buffs));
        Ok(Self {
            fm,
            lm,
            bm,
            lock_table: Arc::new(LockTable::new()),
        })
    }

    /// Start a new transaction on this database.
    pub fn new_tx(&self) -> Result<Transaction> {
        Transaction::new(
            self.fm.clone(),
            self.lm.clone(),
            self.bm.clone(),
            self.lock_table.clone(),
        )
    }

    pub fn file_manager(&self) -> &Arc<FileManager> {
        &self.fm
    }

    pub fn log_manager(&self) -> &Arc<LogManager> {
        &self.lm
    }

    pub fn buffer_manager(&self) -> &Arc<BufferPoolManager> {
        &self.bm
    }

    pub fn lock_table(&self) -> &Arc<LockTable> {
        &self.lock_table
    }

    /// Close the database, releasing cached file handles.
    pub fn close(&self) {
        self.fm.close();
    }
}
