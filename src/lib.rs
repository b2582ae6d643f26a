// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod api;
pub mod app;
pub mod app_dirs;
pub mod config;
pub mod leaderboard;
pub mod passage;
pub mod runtime;
pub mod session;
pub mod ui;

/// Runner tick interval; ten ticks make up one countdown second.
pub const TICK_RATE_MS: u64 = 100;
