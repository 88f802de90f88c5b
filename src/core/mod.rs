
pub mod logging;
pub mod characters;
pub mod personality;
pub mod pipeline;
pub mod scoring;
pub mod services;
