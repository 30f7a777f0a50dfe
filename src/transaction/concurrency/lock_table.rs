use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::storage::file::BlockId;
use crate::transaction::concurrency::LockError;

/// How long a lock request may wait before giving up.
const MAX_WAIT_TIME: Duration = Duration::from_secs(10);

/// The lock state of one block: 0 or absent means unlocked, a positive
/// count is the number of shared holders, and -1 is a single exclusive
/// holder.
///
/// `LockTable` is shared by every transaction of a database instance. A
/// conflicting request waits on a per-block condvar that is signaled when
/// the block's last lock is released; if the lock is still unavailable when
/// the deadline passes, the request fails with [`LockError::LockAbort`].
/// Deadlocks are broken only by that timeout.
pub struct LockTable {
    state: Mutex<LockTableState>,
}

#[derive(Default)]
struct LockTableState {
    locks: HashMap<BlockId, i32>,
    waiters: HashMap<BlockId, Arc<Condvar>>,
}

impl LockTableState {
    fn count(&self, blk: &BlockId) -> i32 {
        self.locks.get(blk).copied().unwrap_or(0)
    }

    fn waiter(&mut self, blk: &BlockId) -> Arc<Condvar> {
        self.waiters
            .entry(blk.clone())
            .or_insert_with(|| Arc::new(Condvar::new()))
            .clone()
    }
}

impl LockTable {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LockTableState::default()),
        }
    }

    /// Grant a shared lock on the specified block, waiting out any
    /// exclusive holder.
    pub fn s_lock(&self, blk: &BlockId) -> Result<(), LockError> {
        let mut state = self.state.lock();
        let deadline = Instant::now() + MAX_WAIT_TIME;

        while state.count(blk) < 0 {
            let cond = state.waiter(blk);
            if cond.wait_until(&mut state, deadline).timed_out() {
                return Err(LockError::LockAbort);
            }
        }
        *state.locks.entry(blk.clone()).or_insert(0) += 1;
        Ok(())
    }

    /// Grant an exclusive lock on the specified block.
    ///
    /// The concurrency manager always obtains a shared lock before asking
    /// for the exclusive one, so the caller is among the holders already;
    /// this only has to wait until it is the sole holder.
    pub fn x_lock(&self, blk: &BlockId) -> Result<(), LockError> {
        let mut state = self.state.lock();
        let deadline = Instant::now() + MAX_WAIT_TIME;

        while state.count(blk) > 1 {
            let cond = state.waiter(blk);
            if cond.wait_until(&mut state, deadline).timed_out() {
                return Err(LockError::LockAbort);
            }
        }
        state.locks.insert(blk.clone(), -1);
        Ok(())
    }

    /// Release one lock on the specified block, waking that block's
    /// waiters to retry.
    ///
    /// Waiters are woken on every release, not just the last one: a
    /// transaction waiting to upgrade becomes runnable as soon as it is the
    /// sole remaining holder, which happens while the block still has a
    /// lock entry.
    pub fn unlock(&self, blk: &BlockId) {
        let mut state = self.state.lock();
        let count = state.count(blk);
        if count > 1 {
            state.locks.insert(blk.clone(), count - 1);
            if let Some(cond) = state.waiters.get(blk) {
                cond.notify_all();
            }
        } else {
            state.locks.remove(blk);
            if let Some(cond) = state.waiters.remove(blk) {
                cond.notify_all();
            }
        }
    }
}

impl Default for LockTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_shared_locks_are_compatible() {
        let lt = LockTable::new();
        let blk = BlockId::new("t", 1);
        lt.s_lock(&blk).unwrap();
        lt.s_lock(&blk).unwrap();
        assert_eq!(lt.state.lock().count(&blk), 2);

        lt.unlock(&blk);
        assert_eq!(lt.state.lock().count(&blk), 1);
        lt.unlock(&blk);
        assert_eq!(lt.state.lock().count(&blk), 0);
    }

    #[test]
    fn test_upgrade_sole_holder() {
        let lt = LockTable::new();
        let blk = BlockId::new("t", 1);
        lt.s_lock(&blk).unwrap();
        lt.x_lock(&blk).unwrap();
        assert_eq!(lt.state.lock().count(&blk), -1);
    }

    #[test]
    fn test_x_lock_waits_for_other_readers() {
        let lt = Arc::new(LockTable::new());
        let blk = BlockId::new("t", 1);

        // Two shared holders: us and a peer that releases shortly.
        lt.s_lock(&blk).unwrap();
        lt.s_lock(&blk).unwrap();

        let lt2 = lt.clone();
        let blk2 = blk.clone();
        let releaser = thread::spawn(move || {
            thread::sleep(Duration::from_millis(200));
            lt2.unlock(&blk2);
        });

        // Blocks until the peer unlocks, then succeeds.
        lt.x_lock(&blk).unwrap();
        assert_eq!(lt.state.lock().count(&blk), -1);
        releaser.join().unwrap();
    }

    #[test]
    fn test_s_lock_waits_for_writer() {
        let lt = Arc::new(LockTable::new());
        let blk = BlockId::new("t", 2);

        lt.s_lock(&blk).unwrap();
        lt.x_lock(&blk).unwrap();

        let lt2 = lt.clone();
        let blk2 = blk.clone();
        let reader = thread::spawn(move || {
            lt2.s_lock(&blk2).unwrap();
        });

        thread::sleep(Duration::from_millis(200));
        lt.unlock(&blk);
        reader.join().unwrap();
        assert_eq!(lt.state.lock().count(&blk), 1);
    }
}
