pub mod buffer;
pub mod error;
pub mod manager;

pub use buffer::{Buffer, BufferPtr};
pub use error::BufferError;
pub use manager::BufferPoolManager;
