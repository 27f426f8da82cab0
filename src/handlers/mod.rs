pub mod health;
pub mod vibes;
