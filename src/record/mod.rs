// Heap-file record storage: fixed-size slotted pages layered on top of the
// transaction API.

pub mod layout;
pub mod record_page;
pub mod rid;
pub mod schema;
pub mod table_scan;
pub mod value;

pub use layout::Layout;
pub use record_page::RecordPage;
pub use rid::Rid;
pub use schema::{FieldType, Schema};
pub use table_scan::TableScan;
pub use value::Value;

use thiserror::Error;

use crate::transaction::TransactionError;

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("schema has no field named {0}")]
    FieldNotFound(String),

    #[error("value type does not match the type of field {0}")]
    TypeMismatch(String),

    #[error(transparent)]
    Tx(#[from] TransactionError),
}

pub type Result<T> = std::result::Result<T, RecordError>;
