// Export public modules
pub mod common;
pub mod database;
pub mod record;
pub mod storage;
pub mod transaction;

// Re-export key items for convenient access
pub use database::Database;
pub use storage::buffer::{BufferError, BufferPoolManager};
pub use storage::file::{BlockId, FileError, FileManager, Page};
pub use transaction::wal::LogManager;
pub use transaction::{LockTable, Transaction, TransactionError};
