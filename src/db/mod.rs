mod pool;
pub mod vibe_repository;

pub use pool::create_pool;
pub use vibe_repository::{PgVibeRepository, VibeRepository};
