use thiserror::Error;

use crate::storage::file::FileError;

#[derive(Error, Debug)]
pub enum BufferError {
    /// No buffer could be pinned within the wait deadline. The requesting
    /// transaction is expected to roll back.
    #[error("no available buffers")]
    BufferAbort,

    #[error(transparent)]
    File(#[from] FileError),
}

pub type Result<T> = std::result::Result<T, BufferError>;
