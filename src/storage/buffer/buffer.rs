use std::sync::Arc;

use parking_lot::RwLock;

use crate::common::types::{Lsn, TxNum, NO_LSN, NO_TXNUM};
use crate::storage::buffer::error::Result;
use crate::storage::file::{BlockId, FileManager, Page};
use crate::transaction::wal::LogManager;

/// Shared handle to a buffer frame.
///
/// The pool hands these out from [`pin`]; the read-write lock lets
/// transactions read and modify the page contents while the pool keeps its
/// own bookkeeping consistent under the pool mutex.
///
/// [`pin`]: crate::storage::buffer::BufferPoolManager::pin
pub type BufferPtr = Arc<RwLock<Buffer>>;

/// An individual buffer frame: a page plus its status, meaning the disk
/// block currently held, the pin count, and if the page has been modified,
/// the id and LSN of the modifying transaction.
pub struct Buffer {
    fm: Arc<FileManager>,
    lm: Arc<LogManager>,
    contents: Page,
    blk: Option<BlockId>,
    pins: i32,
    txnum: TxNum,
    // The most recent LSN associated with this buffer, or NO_LSN if it has
    // not been modified. One LSN is enough: flushing the log up to it also
    // forces every earlier record.
    lsn: Lsn,
}

impl Buffer {
    pub(crate) fn new(fm: Arc<FileManager>, lm: Arc<LogManager>) -> Self {
        let block_size = fm.block_size();
        Self {
            fm,
            lm,
            contents: Page::new(block_size),
            blk: None,
            pins: 0,
            txnum: NO_TXNUM,
            lsn: NO_LSN,
        }
    }

    /// The page held by this buffer.
    pub fn contents(&self) -> &Page {
        &self.contents
    }

    /// Mutable access to the page. Callers must pair modifications with
    /// [`set_modified`] or they will be lost on eviction.
    ///
    /// [`set_modified`]: Buffer::set_modified
    pub fn contents_mut(&mut self) -> &mut Page {
        &mut self.contents
    }

    /// The block this buffer is currently assigned to, if any.
    pub fn block(&self) -> Option<&BlockId> {
        self.blk.as_ref()
    }

    /// Mark the buffer as modified by the given transaction, recording the
    /// LSN of the log record describing the change (negative if the change
    /// was not logged).
    pub fn set_modified(&mut self, txnum: TxNum, lsn: Lsn) {
        self.txnum = txnum;
        if lsn >= 0 {
            self.lsn = lsn;
        }
    }

    /// True if any transaction has this buffer pinned.
    pub fn is_pinned(&self) -> bool {
        self.pins > 0
    }

    /// Id of the transaction that dirtied this buffer, or [`NO_TXNUM`] if
    /// the buffer is clean.
    pub fn modifying_tx(&self) -> TxNum {
        self.txnum
    }

    /// Read the specified block into this buffer, flushing the previous
    /// contents first if they were dirty.
    pub(crate) fn assign_to_block(&mut self, blk: BlockId) -> Result<()> {
        self.flush()?;
        self.fm.read(&blk, &mut self.contents)?;
        self.blk = Some(blk);
        self.pins = 0;
        Ok(())
    }

    /// Write the buffer to its disk block if it is dirty.
    ///
    /// The log is flushed up to the buffer's LSN before the page is
    /// written, which is what makes the logging write-ahead.
    pub(crate) fn flush(&mut self) -> Result<()> {
        if self.txnum >= 0 {
            if let Some(blk) = &self.blk {
                self.lm.flush(self.lsn)?;
                self.fm.write(blk, &self.contents)?;
            }
            self.txnum = NO_TXNUM;
        }
        Ok(())
    }

    pub(crate) fn pin(&mut self) {
        self.pins += 1;
    }

    pub(crate) fn unpin(&mut self) {
        self.pins -= 1;
    }
}
