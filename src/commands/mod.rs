//! Application command handlers for aura.
//!
//! # Commands
//! - `play`: Player page with the live visualization (default)
//! - `news`: Headline list page
//! - `snapshot`: Render one visualization frame to a PNG file
//! - `config`: Open configuration file in the user's preferred editor
//! - `list_devices`: List audio capture devices
//! - `logs`: Display recent log entries

pub mod config;
pub mod list_devices;
pub mod logs;
pub mod news;
pub mod play;
pub mod snapshot;

pub use config::handle_config;
pub use list_devices::handle_list_devices;
pub use logs::handle_logs;
pub use news::handle_news;
pub use play::handle_play;
pub use snapshot::{handle_snapshot, SnapshotOptions};
