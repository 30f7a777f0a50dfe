pub mod log_record;

pub use log_record::LogRecord;

use std::collections::HashSet;
use std::sync::Arc;

use log::debug;

use crate::common::types::{Lsn, TxNum};
use crate::storage::buffer::{Buffer, BufferPoolManager};
use crate::storage::file::manager::Result as FileResult;
use crate::transaction::transaction::{Transaction, TransactionError};
use crate::transaction::wal::LogManager;

/// The per-transaction half of undo-only recovery.
///
/// Each transaction owns one of these; its construction writes the START
/// record. During normal operation it logs the old value of every
/// modification; at the end of the transaction it writes the COMMIT or
/// ROLLBACK marker. [`recover`] is the system-wide startup pass that undoes
/// every transaction the log shows as unfinished.
///
/// [`recover`]: RecoveryManager::recover
pub struct RecoveryManager {
    lm: Arc<LogManager>,
    bm: Arc<BufferPoolManager>,
    txnum: TxNum,
}

impl RecoveryManager {
    /// Create the recovery manager for a transaction, writing its START
    /// record to the log.
    pub(crate) fn new(
        txnum: TxNum,
        lm: Arc<LogManager>,
        bm: Arc<BufferPoolManager>,
    ) -> FileResult<Self> {
        LogRecord::write_start(&lm, txnum)?;
        Ok(Self { lm, bm, txnum })
    }

    /// Commit: force the transaction's dirty pages to disk, then write and
    /// flush the COMMIT record.
    ///
    /// The page flush happens first. The log records describing those pages
    /// precede the COMMIT record, so once COMMIT is durable the whole
    /// transaction is, and recovery never needs to redo anything.
    pub(crate) fn commit(&self) -> Result<(), TransactionError> {
        self.bm.flush_all(self.txnum)?;
        let lsn = LogRecord::write_commit(&self.lm, self.txnum)?;
        self.lm.flush(lsn)?;
        Ok(())
    }

    /// Roll back: undo this transaction's modifications, flush, then write
    /// and flush the ROLLBACK record.
    pub(crate) fn rollback(&self, tx: &Transaction) -> Result<(), TransactionError> {
        self.do_rollback(tx)?;
        self.bm.flush_all(self.txnum)?;
        let lsn = LogRecord::write_rollback(&self.lm, self.txnum)?;
        self.lm.flush(lsn)?;
        Ok(())
    }

    /// Recover the database: undo every unfinished transaction in the log,
    /// then write a quiescent checkpoint.
    ///
    /// Called during startup, before user transactions begin.
    pub(crate) fn recover(&self, tx: &Transaction) -> Result<(), TransactionError> {
        self.do_recover(tx)?;
        self.bm.flush_all(self.txnum)?;
        let lsn = LogRecord::write_checkpoint(&self.lm)?;
        self.lm.flush(lsn)?;
        Ok(())
    }

    /// Write a SETINT record holding the integer currently stored at the
    /// given offset of the buffer, and return the record's LSN.
    pub(crate) fn set_int(&self, buf: &Buffer, offset: usize) -> Result<Lsn, TransactionError> {
        let old_val = buf.contents().get_int(offset);
        let blk = buf
            .block()
            .ok_or(TransactionError::BufferNotAssigned)?;
        Ok(LogRecord::write_set_int(
            &self.lm, self.txnum, blk, offset, old_val,
        )?)
    }

    /// Write a SETSTRING record holding the string currently stored at the
    /// given offset of the buffer, and return the record's LSN.
    pub(crate) fn set_string(&self, buf: &Buffer, offset: usize) -> Result<Lsn, TransactionError> {
        let old_val = buf.contents().get_string(offset);
        let blk = buf
            .block()
            .ok_or(TransactionError::BufferNotAssigned)?;
        Ok(LogRecord::write_set_string(
            &self.lm, self.txnum, blk, offset, &old_val,
        )?)
    }

    /// Walk the log backwards undoing this transaction's records, stopping
    /// at its START record.
    fn do_rollback(&self, tx: &Transaction) -> Result<(), TransactionError> {
        for bytes in self.lm.iter()? {
            let rec = LogRecord::from_bytes(&bytes?)?;
            if rec.tx_number() == self.txnum {
                if matches!(rec, LogRecord::Start { .. }) {
                    return Ok(());
                }
                debug!("rollback of tx {}: undoing {}", self.txnum, rec);
                rec.undo(tx)?;
            }
        }
        Ok(())
    }

    /// Walk the log backwards undoing records of unfinished transactions,
    /// stopping at a checkpoint (or the start of the log).
    ///
    /// A transaction counts as finished once its COMMIT or ROLLBACK record
    /// has been seen; everything beyond a CHECKPOINT belongs to finished
    /// transactions whose effects are already on disk.
    fn do_recover(&self, tx: &Transaction) -> Result<(), TransactionError> {
        let mut finished: HashSet<TxNum> = HashSet::new();
        for bytes in self.lm.iter()? {
            let rec = LogRecord::from_bytes(&bytes?)?;
            match &rec {
                LogRecord::Checkpoint => return Ok(()),
                LogRecord::Commit { txnum } | LogRecord::Rollback { txnum } => {
                    finished.insert(*txnum);
                }
                _ => {}
            }
            if !finished.contains(&rec.tx_number()) {
                debug!("recovery: undoing {}", rec);
                rec.undo(tx)?;
            }
        }
        Ok(())
    }
}
