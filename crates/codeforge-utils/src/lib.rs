pub mod atomic_write;
pub mod error;
pub mod redaction;
pub mod types;

pub use error::{CodeforgeError, UserFriendlyError};
