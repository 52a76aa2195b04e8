pub mod health;
pub mod jokes;
