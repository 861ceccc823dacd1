//! Audio playback: sources, the transport driving the external player, and
//! the player page.

pub mod locate;
pub mod source;
pub mod transport;
pub mod ui;

pub use source::{build_catalog, AudioSource};
pub use transport::PlayerBackend;
pub use ui::PlayerPage;
