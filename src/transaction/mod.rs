// Transaction management: write-ahead logging, locking, recovery, and the
// transaction façade that ties them together.

pub mod buffer_list;
pub mod concurrency;
pub mod recovery;
pub mod transaction;
pub mod wal;

// Public exports
pub use concurrency::{ConcurrencyManager, LockError, LockTable};
pub use recovery::{LogRecord, RecoveryManager};
pub use transaction::{Transaction, TransactionError};
