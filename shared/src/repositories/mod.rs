pub mod joke;

pub use joke::{JokeRepository, RepoError};
