pub mod memory;
pub mod sqlite;
pub mod store;

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;
pub use store::{ActivityStore, PersonDirectory, PlatformStore};
