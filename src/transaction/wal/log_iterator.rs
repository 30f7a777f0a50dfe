use std::sync::Arc;

use crate::storage::file::manager::{FileError, Result};
use crate::storage::file::{BlockId, FileManager, Page};

/// Iterates over the records of the log file in reverse order, starting at
/// the most recent record and moving backwards block by block.
///
/// The iterator reads through its own private page, so log appends that
/// happen while it is alive do not disturb it (they also won't be seen).
pub struct LogIterator {
    fm: Arc<FileManager>,
    blk: BlockId,
    page: Page,
    current_pos: usize,
}

impl LogIterator {
    pub(crate) fn new(fm: Arc<FileManager>, blk: BlockId) -> Result<Self> {
        let page = Page::new(fm.block_size());
        let mut iter = Self {
            fm,
            blk: blk.clone(),
            page,
            current_pos: 0,
        };
        iter.move_to_block(&blk)?;
        Ok(iter)
    }

    fn has_next(&self) -> bool {
        self.current_pos < self.fm.block_size() || self.blk.number() > 0
    }

    fn read_next(&mut self) -> Result<Vec<u8>> {
        if self.current_pos == self.fm.block_size() {
            let prev = BlockId::new(self.blk.filename(), self.blk.number() - 1);
            self.move_to_block(&prev)?;
            self.blk = prev;
        }
        let rec = self.page.get_bytes(self.current_pos).to_vec();
        self.current_pos += 4 + rec.len();
        Ok(rec)
    }

    /// Position at the boundary of the given block, i.e. at its most recent
    /// record.
    fn move_to_block(&mut self, blk: &BlockId) -> Result<()> {
        self.fm.read(blk, &mut self.page)?;
        self.current_pos = self.page.get_int(0) as usize;
        Ok(())
    }
}

impl Iterator for LogIterator {
    type Item = std::result::Result<Vec<u8>, FileError>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.has_next() {
            return None;
        }
        Some(self.read_next())
    }
}
