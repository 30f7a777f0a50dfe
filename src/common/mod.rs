pub mod types;

pub use types::{Lsn, TxNum, NO_LSN, NO_TXNUM};
