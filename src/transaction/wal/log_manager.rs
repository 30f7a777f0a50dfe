use std::sync::Arc;

use parking_lot::Mutex;

use crate::common::types::Lsn;
use crate::storage::file::manager::Result;
use crate::storage::file::{BlockId, FileManager, Page};
use crate::transaction::wal::LogIterator;

/// Writes log records to the log file, keeping the tail of the log in a
/// single block-sized buffer that is flushed to disk on demand.
///
/// Records are appended right to left within the buffer. The first four
/// bytes of every log block hold the "boundary": the offset of the most
/// recently written record. Storing records backwards makes it cheap to
/// read them in reverse order, which is the only order recovery needs.
pub struct LogManager {
    fm: Arc<FileManager>,
    log_file: String,
    state: Mutex<LogState>,
}

struct LogState {
    log_page: Page,
    current_blk: BlockId,
    latest_lsn: Lsn,
    last_saved_lsn: Lsn,
}

impl LogManager {
    /// Open the log manager for the given log file, creating the file's
    /// first block if the log is empty, or positioning at the last block if
    /// it is not.
    pub fn new(fm: Arc<FileManager>, log_file: &str) -> Result<Self> {
        let mut log_page = Page::new(fm.block_size());
        let log_size = fm.length(log_file)?;

        let current_blk = if log_size == 0 {
            Self::append_new_block(&fm, log_file, &mut log_page)?
        } else {
            let blk = BlockId::new(log_file, log_size - 1);
            fm.read(&blk, &mut log_page)?;
            blk
        };

        Ok(Self {
            fm,
            log_file: log_file.to_string(),
            state: Mutex::new(LogState {
                log_page,
                current_blk,
                latest_lsn: 0,
                last_saved_lsn: 0,
            }),
        })
    }

    /// Append a record to the log and return its LSN.
    ///
    /// The record is only guaranteed to be on disk after a [`flush`] with an
    /// LSN at least this large.
    ///
    /// [`flush`]: LogManager::flush
    pub fn append(&self, record: &[u8]) -> Result<Lsn> {
        let mut state = self.state.lock();

        let mut boundary = state.log_page.get_int(0);
        let bytes_needed = 4 + record.len() as i32;
        if boundary - bytes_needed < 4 {
            // The record doesn't fit, so move to the next block.
            Self::force_flush(&self.fm, &mut state)?;
            state.current_blk =
                Self::append_new_block(&self.fm, &self.log_file, &mut state.log_page)?;
            boundary = state.log_page.get_int(0);
        }

        let recpos = (boundary - bytes_needed) as usize;
        state.log_page.set_bytes(recpos, record);
        state.log_page.set_int(0, recpos as i32); // the new boundary
        state.latest_lsn += 1;
        Ok(state.latest_lsn)
    }

    /// Ensure the record with the given LSN (and everything before it) is
    /// on disk.
    pub fn flush(&self, lsn: Lsn) -> Result<()> {
        let mut state = self.state.lock();
        if lsn >= state.last_saved_lsn {
            Self::force_flush(&self.fm, &mut state)?;
        }
        Ok(())
    }

    /// Iterate over the log records in reverse order, newest first.
    ///
    /// The log is force-flushed first so the iterator sees every record
    /// appended so far.
    pub fn iter(&self) -> Result<LogIterator> {
        let mut state = self.state.lock();
        Self::force_flush(&self.fm, &mut state)?;
        LogIterator::new(self.fm.clone(), state.current_blk.clone())
    }

    fn append_new_block(fm: &FileManager, log_file: &str, log_page: &mut Page) -> Result<BlockId> {
        let blk = fm.append(log_file)?;
        log_page.set_int(0, fm.block_size() as i32);
        fm.write(&blk, log_page)?;
        Ok(blk)
    }

    fn force_flush(fm: &FileManager, state: &mut LogState) -> Result<()> {
        fm.write(&state.current_blk, &state.log_page)?;
        state.last_saved_lsn = state.latest_lsn;
        Ok(())
    }
}
