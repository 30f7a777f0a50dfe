use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::storage::buffer::error::Result;
use crate::storage::buffer::{BufferPoolManager, BufferPtr};
use crate::storage::file::BlockId;

/// The buffers currently pinned by one transaction.
///
/// The map resolves a block to its buffer; the pin list remembers each pin
/// individually (a block pinned twice appears twice), so the transaction can
/// release exactly what it took, and release everything at once when it
/// ends.
pub struct BufferList {
    bm: Arc<BufferPoolManager>,
    state: Mutex<BufferListState>,
}

#[derive(Default)]
struct BufferListState {
    buffers: HashMap<BlockId, BufferPtr>,
    pins: Vec<BlockId>,
}

impl BufferList {
    pub fn new(bm: Arc<BufferPoolManager>) -> Self {
        Self {
            bm,
            state: Mutex::new(BufferListState::default()),
        }
    }

    /// The buffer pinned to the specified block, or `None` if this
    /// transaction has not pinned the block.
    pub fn buffer(&self, blk: &BlockId) -> Option<BufferPtr> {
        self.state.lock().buffers.get(blk).cloned()
    }

    /// Pin the block and remember the buffer.
    pub fn pin(&self, blk: &BlockId) -> Result<()> {
        let buf = self.bm.pin(blk)?;
        let mut state = self.state.lock();
        state.buffers.insert(blk.clone(), buf);
        state.pins.push(blk.clone());
        Ok(())
    }

    /// Release one pin on the block. Unknown blocks are ignored.
    pub fn unpin(&self, blk: &BlockId) {
        let mut state = self.state.lock();
        let Some(buf) = state.buffers.get(blk).cloned() else {
            return;
        };
        self.bm.unpin(&buf);
        if let Some(i) = state.pins.iter().position(|b| b == blk) {
            state.pins.remove(i);
        }
        if !state.pins.contains(blk) {
            state.buffers.remove(blk);
        }
    }

    /// Release every pin still held by this transaction.
    pub fn unpin_all(&self) {
        let mut state = self.state.lock();
        for blk in &state.pins {
            if let Some(buf) = state.buffers.get(blk) {
                self.bm.unpin(buf);
            }
        }
        state.pins.clear();
        state.buffers.clear();
    }
}
