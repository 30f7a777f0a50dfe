use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::storage::file::BlockId;
use crate::transaction::concurrency::{LockError, LockTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockType {
    Shared,
    Exclusive,
}

/// Tracks the locks held by one transaction and forwards new requests to
/// the shared lock table.
///
/// Requests are idempotent per block: a second shared request on a block
/// already held is a no-op, and an exclusive request on a block held shared
/// upgrades it. All locks are released together at transaction end, which
/// is what makes the protocol strict two-phase.
pub struct ConcurrencyManager {
    lock_table: Arc<LockTable>,
    locks: Mutex<HashMap<BlockId, LockType>>,
}

impl ConcurrencyManager {
    pub fn new(lock_table: Arc<LockTable>) -> Self {
        Self {
            lock_table,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Obtain a shared lock on the block if this transaction holds no lock
    /// on it yet.
    pub fn s_lock(&self, blk: &BlockId) -> Result<(), LockError> {
        if !self.locks.lock().contains_key(blk) {
            self.lock_table.s_lock(blk)?;
            self.locks.lock().insert(blk.clone(), LockType::Shared);
        }
        Ok(())
    }

    /// Obtain an exclusive lock on the block, first taking the shared lock
    /// if necessary and then upgrading it.
    ///
    /// Two transactions both upgrading the same block deadlock against each
    /// other; the lock table's timeout is what gets them unstuck.
    pub fn x_lock(&self, blk: &BlockId) -> Result<(), LockError> {
        let held = self.locks.lock().get(blk).copied();
        if held != Some(LockType::Exclusive) {
            self.s_lock(blk)?;
            self.lock_table.x_lock(blk)?;
            self.locks.lock().insert(blk.clone(), LockType::Exclusive);
        }
        Ok(())
    }

    /// Release every lock this transaction holds.
    pub fn release(&self) {
        let mut locks = self.locks.lock();
        for blk in locks.keys() {
            self.lock_table.unlock(blk);
        }
        locks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_s_lock_is_idempotent() {
        let lt = Arc::new(LockTable::new());
        let cm = ConcurrencyManager::new(lt.clone());
        let blk = BlockId::new("t", 0);

        cm.s_lock(&blk).unwrap();
        cm.s_lock(&blk).unwrap();

        // Only one table-level lock was taken, so one release frees it
        // for an exclusive request from another transaction.
        cm.release();
        let other = ConcurrencyManager::new(lt);
        other.x_lock(&blk).unwrap();
    }

    #[test]
    fn test_x_lock_upgrades_own_shared_lock() {
        let lt = Arc::new(LockTable::new());
        let cm = ConcurrencyManager::new(lt);
        let blk = BlockId::new("t", 0);

        cm.s_lock(&blk).unwrap();
        cm.x_lock(&blk).unwrap();
        cm.x_lock(&blk).unwrap(); // already exclusive, no-op
        cm.release();
    }
}
