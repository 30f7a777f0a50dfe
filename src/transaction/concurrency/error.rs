use thiserror::Error;

#[derive(Error, Debug)]
pub enum LockError {
    /// The lock could not be obtained within the wait deadline. The
    /// requesting transaction is expected to roll back.
    #[error("lock could not be obtained")]
    LockAbort,
}
