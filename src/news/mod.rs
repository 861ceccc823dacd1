//! Headline feed and the news page.

pub mod feed;
pub mod ui;

pub use ui::NewsPage;
