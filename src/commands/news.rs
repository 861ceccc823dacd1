//! Session starting on the news page.

use super::play::run_session;
use crate::ui::Page;

/// Opens the headline list. Tab switches to the player.
///
/// # Errors
/// - Same as `handle_play`
pub async fn handle_news() -> anyhow::Result<()> {
    run_session(Page::News, None).await
}
