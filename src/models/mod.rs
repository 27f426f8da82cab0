pub mod vibe;
