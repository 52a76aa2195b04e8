pub mod models;
pub mod repositories;
pub mod store;

pub use repositories::JokeRepository;
pub use store::{DocumentStore, FirestoreStore, MemoryStore};
