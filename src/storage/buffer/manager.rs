use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, RwLock};

use crate::common::types::TxNum;
use crate::storage::buffer::error::{BufferError, Result};
use crate::storage::buffer::{Buffer, BufferPtr};
use crate::storage::file::{BlockId, FileManager};
use crate::transaction::wal::LogManager;

/// How long a pin request may wait for a frame before giving up.
const MAX_WAIT_TIME: Duration = Duration::from_secs(10);

/// Manages the pinning and unpinning of buffers to blocks.
///
/// The pool is a fixed array of frames. Replacement is deliberately naive:
/// the first unpinned frame in index order is the victim. A pin request that
/// finds every frame pinned waits on a pool-wide condvar that is signaled
/// whenever some frame's pin count drops to zero; if no frame frees up
/// within [`MAX_WAIT_TIME`] the request fails with
/// [`BufferError::BufferAbort`].
pub struct BufferPoolManager {
    pool: Vec<BufferPtr>,
    num_available: Mutex<usize>,
    available_cond: Condvar,
}

impl BufferPoolManager {
    /// Create a pool with the given number of frames.
    pub fn new(fm: Arc<FileManager>, lm: Arc<LogManager>, num_buffs: usize) -> Self {
        let pool = (0..num_buffs)
            .map(|_| Arc::new(RwLock::new(Buffer::new(fm.clone(), lm.clone()))))
            .collect();
        Self {
            pool,
            num_available: Mutex::new(num_buffs),
            available_cond: Condvar::new(),
        }
    }

    /// Number of unpinned frames.
    pub fn available(&self) -> usize {
        *self.num_available.lock()
    }

    /// Flush the dirty buffers modified by the specified transaction.
    pub fn flush_all(&self, txnum: TxNum) -> Result<()> {
        let _guard = self.num_available.lock();
        for buf in &self.pool {
            let mut b = buf.write();
            if b.modifying_tx() == txnum {
                b.flush()?;
            }
        }
        Ok(())
    }

    /// Pin a buffer to the specified block, waiting if necessary for a frame
    /// to become available.
    pub fn pin(&self, blk: &BlockId) -> Result<BufferPtr> {
        let deadline = Instant::now() + MAX_WAIT_TIME;
        let mut avail = self.num_available.lock();
        loop {
            if let Some(buf) = self.try_to_pin(blk, &mut avail)? {
                return Ok(buf);
            }
            if self
                .available_cond
                .wait_until(&mut avail, deadline)
                .timed_out()
            {
                return Err(BufferError::BufferAbort);
            }
        }
    }

    /// Unpin the specified buffer. If its pin count reaches zero, waiting
    /// pin requests are woken up.
    pub fn unpin(&self, buf: &BufferPtr) {
        let mut avail = self.num_available.lock();
        let mut b = buf.write();
        b.unpin();
        if !b.is_pinned() {
            *avail += 1;
            self.available_cond.notify_all();
        }
    }

    /// Try to pin a buffer to the block: reuse the frame already holding the
    /// block if there is one, otherwise claim the first unpinned frame.
    /// Returns `None` if every frame is pinned.
    fn try_to_pin(&self, blk: &BlockId, avail: &mut usize) -> Result<Option<BufferPtr>> {
        let buf = match self.find_existing(blk) {
            Some(buf) => buf,
            None => match self.choose_unpinned() {
                Some(buf) => {
                    buf.write().assign_to_block(blk.clone())?;
                    buf
                }
                None => return Ok(None),
            },
        };

        let mut b = buf.write();
        if !b.is_pinned() {
            // First pinner takes the frame out of the available count.
            *avail -= 1;
        }
        b.pin();
        drop(b);
        Ok(Some(buf))
    }

    fn find_existing(&self, blk: &BlockId) -> Option<BufferPtr> {
        self.pool
            .iter()
            .find(|buf| buf.read().block() == Some(blk))
            .cloned()
    }

    fn choose_unpinned(&self) -> Option<BufferPtr> {
        self.pool
            .iter()
            .find(|buf| !buf.read().is_pinned())
            .cloned()
    }
}
