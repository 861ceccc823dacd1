//! Two-page terminal shell.
//!
//! Owns the terminal and the active page, polls input without blocking so
//! the animation driver keeps its cadence, and presents a frame on every
//! turn of the loop. Switching pages drops the old page entirely.

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Padding, Tabs},
};
use std::io::{self, Stdout};
use std::time::Duration;

use crate::config::AuraConfig;
use crate::news::NewsPage;
use crate::player::{AudioSource, PlayerBackend, PlayerPage};

pub const BG: Color = Color::Rgb(15, 23, 42);
pub const PANEL_BG: Color = Color::Rgb(51, 65, 85);
pub const FG: Color = Color::Rgb(255, 255, 255);
pub const MUTED: Color = Color::Rgb(148, 163, 184);
pub const ACCENT: Color = Color::Rgb(244, 114, 182);

/// Presentation cadence of the shell loop.
const UI_TICK: Duration = Duration::from_millis(16);

/// What a page asks the shell to do after a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageAction {
    None,
    SwitchPage,
    Quit,
}

/// Page selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Page {
    #[default]
    Player,
    News,
}

impl Page {
    pub const ALL: [Page; 2] = [Page::Player, Page::News];

    pub fn title(self) -> &'static str {
        match self {
            Page::Player => "Player",
            Page::News => "News",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Page::Player => Page::News,
            Page::News => Page::Player,
        }
    }
}

enum ActivePage {
    Player(PlayerPage),
    News(NewsPage),
}

impl ActivePage {
    fn kind(&self) -> Page {
        match self {
            ActivePage::Player(_) => Page::Player,
            ActivePage::News(_) => Page::News,
        }
    }
}

/// Terminal application shell.
pub struct Shell {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    config: AuraConfig,
    catalog: Vec<AudioSource>,
    backend: PlayerBackend,
}

impl Shell {
    /// Enters the alternate screen.
    ///
    /// # Errors
    /// - If raw mode or the alternate screen cannot be entered
    pub fn new(config: AuraConfig, catalog: Vec<AudioSource>, backend: PlayerBackend) -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        let backend_term = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend_term)?;

        Ok(Self {
            terminal,
            config,
            catalog,
            backend,
        })
    }

    fn open(&self, page: Page) -> ActivePage {
        tracing::debug!("Opening {} page", page.title());
        match page {
            Page::Player => {
                let mut player =
                    PlayerPage::new(&self.config, self.catalog.clone(), self.backend.clone());
                player.activate();
                ActivePage::Player(player)
            }
            Page::News => ActivePage::News(NewsPage::new(&self.config.news)),
        }
    }

    /// Runs until the user quits. Must be awaited inside a `LocalSet`.
    ///
    /// # Errors
    /// - If drawing or reading terminal events fails
    pub async fn run(&mut self, start: Page) -> Result<()> {
        let mut page = self.open(start);

        'outer: loop {
            match &mut page {
                ActivePage::Player(player) => player.update(),
                ActivePage::News(news) => news.update(),
            }

            self.draw(&mut page)?;

            while event::poll(Duration::ZERO)? {
                let Event::Key(key) = event::read()? else {
                    continue;
                };
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match dispatch(&mut page, key) {
                    PageAction::None => {}
                    PageAction::SwitchPage => {
                        let next = page.kind().next();
                        page = self.open(next);
                    }
                    PageAction::Quit => break 'outer,
                }
            }

            tokio::time::sleep(UI_TICK).await;
        }

        drop(page);
        tracing::info!("Shell exited");
        Ok(())
    }

    fn draw(&mut self, page: &mut ActivePage) -> Result<()> {
        let current = page.kind();
        self.terminal.draw(|frame| {
            let area = frame.area();
            let root = Block::default()
                .style(Style::default().bg(BG).fg(FG))
                .padding(Padding::horizontal(1));
            frame.render_widget(&root, area);
            let inner = root.inner(area);

            let [content_area, nav_area] =
                Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).areas(inner);

            match page {
                ActivePage::Player(player) => player.render(frame, content_area),
                ActivePage::News(news) => news.render(frame, content_area),
            }

            frame.render_widget(navigation(current), nav_area);
        })?;
        Ok(())
    }

    /// Restores the terminal.
    ///
    /// # Errors
    /// - If terminal mode cannot be disabled
    pub fn cleanup(&mut self) -> Result<()> {
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        tracing::debug!("Shell terminal cleanup complete");
        Ok(())
    }

    /// Terminal handle for showing a final error before cleanup.
    pub fn terminal_mut(&mut self) -> &mut Terminal<CrosstermBackend<Stdout>> {
        &mut self.terminal
    }
}

impl Drop for Shell {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

fn dispatch(page: &mut ActivePage, key: KeyEvent) -> PageAction {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return PageAction::Quit;
    }
    match page {
        ActivePage::Player(player) => player.handle_key(key),
        ActivePage::News(news) => news.handle_key(key),
    }
}

/// Bottom navigation bar with the active page highlighted.
fn navigation(current: Page) -> Tabs<'static> {
    let selected = Page::ALL.iter().position(|p| *p == current).unwrap_or(0);
    Tabs::new(Page::ALL.iter().map(|p| p.title()))
        .select(selected)
        .style(Style::default().fg(MUTED))
        .highlight_style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD))
        .divider(" ")
        .padding("   ", "   ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;

    #[test]
    fn test_page_cycle() {
        assert_eq!(Page::Player.next(), Page::News);
        assert_eq!(Page::News.next(), Page::Player);
        assert_eq!(Page::default(), Page::Player);
    }

    #[test]
    fn test_ctrl_c_quits_any_page() {
        let mut page = ActivePage::News(NewsPage::with_headlines(Vec::new()));
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(dispatch(&mut page, key), PageAction::Quit);
    }

    #[test]
    fn test_navigation_highlights_current_page() {
        let mut terminal = Terminal::new(TestBackend::new(30, 1)).unwrap();
        terminal
            .draw(|frame| frame.render_widget(navigation(Page::News), frame.area()))
            .unwrap();

        let buffer = terminal.backend().buffer();
        let text: String = buffer.content().iter().map(|c| c.symbol()).collect();
        let news_x = text.find("News").unwrap() as u16;
        let player_x = text.find("Player").unwrap() as u16;
        assert_eq!(buffer.cell((news_x, 0)).unwrap().fg, ACCENT);
        assert_eq!(buffer.cell((player_x, 0)).unwrap().fg, MUTED);
    }
}
