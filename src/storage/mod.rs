pub mod traits;

pub mod memory;

#[cfg(feature = "db")]
pub mod database;

pub use memory::MemoryStorage;
pub use traits::Storage;

#[cfg(feature = "db")]
pub use database::{DatabaseManager, DatabaseStorage};
