//! CLI output formatting
//!
//! Provides human-readable terminal display for assignments, rotation
//! status and history.

pub mod display;

pub use display::render_history;
pub use display::render_report;
pub use display::render_status;
