// Public API
mod error;
pub use self::error::{Failure, SchedulerError};

mod handle;
pub use self::handle::{Handle, OnError, OnSuccess};

pub mod id;
pub use self::id::Id;

mod token;
pub use self::token::{ErrorFirstToken, ResumeToken, UncheckedToken};

// Re-exports
pub(crate) use self::handle::TokenSlot;
