//! Full-screen error display.
//!
//! Used when a page fails to start (no player binary, no capture device)
//! so the message is readable before the terminal is restored.

use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    widgets::{Paragraph, Wrap},
};
use std::io::{self, Stdout};

const ERROR_BG: Color = Color::Rgb(136, 19, 55);
const ERROR_FG: Color = Color::Rgb(255, 255, 255);

/// Paints `message` centred on a full-area error background.
pub fn render_error(frame: &mut Frame, message: &str) {
    let area = frame.area();
    frame.render_widget(
        ratatui::widgets::Block::default().style(Style::default().bg(ERROR_BG)),
        area,
    );

    let text_width = (u32::from(area.width) * 80 / 100) as u16;
    let lines = vec![
        Line::from(Span::styled(
            "Aura Player",
            Style::default().fg(ERROR_FG).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(message, Style::default().fg(ERROR_FG))),
        Line::from(""),
        Line::from(Span::styled(
            "Press any key to exit",
            Style::default().fg(ERROR_FG).add_modifier(Modifier::DIM),
        )),
    ];

    let paragraph = Paragraph::new(lines)
        .style(Style::default().bg(ERROR_BG))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });

    let top = area.y + area.height / 3;
    let centered = Rect {
        x: area.x + (area.width - text_width) / 2,
        y: top,
        width: text_width,
        height: area.height.saturating_sub(top - area.y),
    };
    frame.render_widget(paragraph, centered);
}

/// Waits for a key press, redrawing `message` until then.
///
/// # Errors
/// - If terminal rendering or event polling fails
pub fn wait_for_dismiss<B: Backend>(terminal: &mut Terminal<B>, message: &str) -> anyhow::Result<()> {
    loop {
        terminal.draw(|frame| render_error(frame, message))?;

        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    break;
                }
            }
        }
    }
    Ok(())
}

/// Standalone error screen with its own alternate screen.
pub struct ErrorScreen {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl ErrorScreen {
    /// Enters alternate screen mode for the error display.
    ///
    /// # Errors
    /// - If raw mode or the alternate screen cannot be entered
    pub fn new() -> anyhow::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(ErrorScreen { terminal })
    }

    /// Shows `error_message` until a key is pressed.
    ///
    /// # Errors
    /// - If terminal rendering fails
    pub fn show_error(&mut self, error_message: &str) -> anyhow::Result<()> {
        wait_for_dismiss(&mut self.terminal, error_message)
    }

    /// Restores the terminal.
    ///
    /// # Errors
    /// - If terminal mode cannot be disabled
    pub fn cleanup(&mut self) -> anyhow::Result<()> {
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Drop for ErrorScreen {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

/// Shows `message` on a standalone error screen, logging if even that fails.
pub fn show_fatal(message: &str) {
    let result = ErrorScreen::new().and_then(|mut screen| screen.show_error(message));
    if let Err(e) = result {
        tracing::error!("Failed to show error screen: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;

    #[test]
    fn test_render_error_shows_message() {
        let mut terminal = Terminal::new(TestBackend::new(60, 12)).unwrap();
        terminal
            .draw(|frame| render_error(frame, "ffplay not found"))
            .unwrap();

        let buffer = terminal.backend().buffer();
        let text: String = buffer.content().iter().map(|c| c.symbol()).collect();
        assert!(text.contains("ffplay not found"));
        assert!(text.contains("Press any key to exit"));
        assert_eq!(buffer.cell((0, 0)).unwrap().bg, ERROR_BG);
    }
}
