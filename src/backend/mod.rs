pub mod error;
pub mod memory;
pub mod query;
pub mod rest;
pub mod traits;

pub use error::{BackendError, ErrorCode};
pub use memory::MemoryBackend;
pub use query::{Filter, Query, Select};
pub use rest::RestBackend;
pub use traits::{Backend, Returning};
