// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod app;
pub mod app_dirs;
pub mod config;
pub mod error;
pub mod game;
pub mod logging;
pub mod quiz;
pub mod runtime;
pub mod session;
pub mod storage;
pub mod timer;
pub mod ui;
