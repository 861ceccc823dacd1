//! News page: a scrollable list of top headlines.
//!
//! Headlines are fetched once when the page is created. Enter opens the
//! selected article in the system browser.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, HighlightSpacing, List, ListItem, ListState, Padding, Paragraph, Wrap},
};
use std::process::{Command, ExitStatus, Stdio};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::feed::{fetch_headlines, FeedError, Headline};
use crate::config::NewsConfig;
use crate::ui::shell::{PageAction, ACCENT, FG, MUTED, PANEL_BG};

enum FeedState {
    Loading(oneshot::Receiver<Result<Vec<Headline>, FeedError>>),
    Loaded(Vec<Headline>),
    Failed(String),
}

/// Interactive headline list.
pub struct NewsPage {
    state: FeedState,
    list_state: ListState,
    notification: Option<String>,
}

impl NewsPage {
    /// Creates the page and starts fetching in the background.
    pub fn new(config: &NewsConfig) -> Self {
        let (tx, rx) = oneshot::channel();
        let config = config.clone();
        tokio::spawn(async move {
            let result = fetch_headlines(&config).await;
            if let Err(e) = &result {
                tracing::error!("Error fetching news: {}", e);
            }
            let _ = tx.send(result);
        });

        Self {
            state: FeedState::Loading(rx),
            list_state: ListState::default(),
            notification: None,
        }
    }

    /// Creates a page with headlines already at hand.
    pub fn with_headlines(headlines: Vec<Headline>) -> Self {
        let mut page = Self {
            state: FeedState::Loaded(Vec::new()),
            list_state: ListState::default(),
            notification: None,
        };
        page.set_loaded(headlines);
        page
    }

    fn set_loaded(&mut self, headlines: Vec<Headline>) {
        self.list_state
            .select(if headlines.is_empty() { None } else { Some(0) });
        self.state = FeedState::Loaded(headlines);
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, FeedState::Loading(_))
    }

    /// Picks up the fetch result once it arrives.
    pub fn update(&mut self) {
        let FeedState::Loading(rx) = &mut self.state else {
            return;
        };
        match rx.try_recv() {
            Ok(Ok(headlines)) => self.set_loaded(headlines),
            Ok(Err(e)) => self.state = FeedState::Failed(e.to_string()),
            Err(oneshot::error::TryRecvError::Empty) => {}
            Err(oneshot::error::TryRecvError::Closed) => {
                self.state = FeedState::Failed("News request was cancelled".to_string());
            }
        }
    }

    fn selected(&self) -> Option<&Headline> {
        match &self.state {
            FeedState::Loaded(headlines) => self.list_state.selected().and_then(|i| headlines.get(i)),
            _ => None,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> PageAction {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return PageAction::Quit,
            KeyCode::Tab => return PageAction::SwitchPage,
            KeyCode::Up => self.list_state.select_previous(),
            KeyCode::Down => self.list_state.select_next(),
            KeyCode::Enter => {
                if let Some(url) = self.selected().map(|h| h.url.clone()) {
                    self.notification = Some(match open_in_browser(&url) {
                        Ok(()) => "Opened in browser".to_string(),
                        Err(e) => {
                            tracing::warn!("Failed to open {}: {}", url, e);
                            url
                        }
                    });
                }
            }
            _ => {}
        }
        PageAction::None
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect) {
        let [title_area, list_area, footer_area] = Layout::vertical([
            Constraint::Length(2),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .areas(area);

        frame.render_widget(
            Paragraph::new(Line::styled(
                " Top Headlines",
                Style::default().fg(FG).add_modifier(Modifier::BOLD),
            )),
            title_area,
        );

        match &self.state {
            FeedState::Loading(_) => {
                frame.render_widget(
                    Paragraph::new("Loading news...")
                        .style(Style::default().fg(MUTED))
                        .alignment(Alignment::Center),
                    list_area,
                );
            }
            FeedState::Failed(message) => {
                frame.render_widget(
                    Paragraph::new(message.as_str())
                        .style(Style::default().fg(MUTED))
                        .alignment(Alignment::Center)
                        .wrap(Wrap { trim: true }),
                    list_area,
                );
            }
            FeedState::Loaded(headlines) => {
                let text_width = list_area.width.saturating_sub(6) as usize;
                let items: Vec<ListItem> = headlines
                    .iter()
                    .map(|headline| {
                        let date = headline
                            .published_at
                            .map(|d| d.format("%Y-%m-%d").to_string())
                            .unwrap_or_default();
                        let gap = text_width
                            .saturating_sub(headline.source_name.chars().count() + date.chars().count())
                            .max(1);
                        ListItem::new(vec![
                            Line::styled(headline.title.clone(), Style::default().fg(FG).add_modifier(Modifier::BOLD)),
                            Line::from(vec![
                                Span::styled(headline.source_name.clone(), Style::default().fg(MUTED)),
                                Span::raw(" ".repeat(gap)),
                                Span::styled(date, Style::default().fg(MUTED)),
                            ]),
                            Line::from(""),
                        ])
                    })
                    .collect();

                let list = List::new(items)
                    .block(
                        Block::default()
                            .borders(Borders::ALL)
                            .border_style(Style::default().fg(PANEL_BG))
                            .padding(Padding::horizontal(1)),
                    )
                    .highlight_style(Style::default().bg(PANEL_BG))
                    .highlight_symbol("> ")
                    .highlight_spacing(HighlightSpacing::Always);
                frame.render_stateful_widget(list, list_area, &mut self.list_state);
            }
        }

        let footer = match &self.notification {
            Some(message) => Paragraph::new(message.as_str()).style(Style::default().fg(ACCENT)),
            None => Paragraph::new("↑↓ select, ↵ open, tab player, q quit").style(Style::default().fg(MUTED)),
        };
        frame.render_widget(footer.alignment(Alignment::Center), footer_area);
    }
}

/// Opens `url` with the platform's URL handler.
fn open_in_browser(url: &str) -> std::io::Result<()> {
    let (program, args): (&str, &[&str]) = if cfg!(target_os = "macos") {
        ("open", &[])
    } else if cfg!(target_os = "windows") {
        ("cmd", &["/C", "start", ""])
    } else {
        ("xdg-open", &[])
    };
    launch_detached(program, args, url).map(|_| ())
}

/// Spawns `program` and waits for it on the blocking pool so it is reaped.
fn launch_detached(
    program: &str,
    args: &[&str],
    target: &str,
) -> std::io::Result<JoinHandle<std::io::Result<ExitStatus>>> {
    let mut child = Command::new(program)
        .args(args)
        .arg(target)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    Ok(tokio::task::spawn_blocking(move || child.wait()))
}
