//! TUI module for the marketplace client
//!
//! Terminal user interface using Ratatui: a searchable user directory, the
//! conversation transcript, and a compose box, fed by the REST API and the
//! live push channel.

mod app;
mod compose;
mod messages;
mod sidebar;
mod ui;

pub use app::run;
