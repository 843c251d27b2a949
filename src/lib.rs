// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod app_dirs;
pub mod color;
pub mod config;
pub mod engine;
pub mod evaluate;
pub mod export;
pub mod profile;
pub mod runtime;
pub mod stimulus;
pub mod summary;
pub mod timer;
pub mod util;
pub mod words;
