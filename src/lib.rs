/// Fableweaver - Personalized Story Generation Core
///
/// Core library providing the five-phase story generation pipeline,
/// character pool matching, personality trait evolution, and
/// per-phase quality scoring.

pub mod config;
pub mod core;
pub mod database;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
