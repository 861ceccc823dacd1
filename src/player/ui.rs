//! Player page: visualization, now-playing line, transport controls and the
//! source catalog.
//!
//! The page owns one `Visualizer`. The animation driver repaints it at the
//! configured frame rate while the shell presents the latest surface on every
//! draw. Dropping the page stops the driver and the player process.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, HighlightSpacing, LineGauge, List, ListItem, ListState, Padding, Paragraph},
};
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

use super::locate::find_binary;
use super::source::AudioSource;
use super::transport::{format_time, probe_duration, PlayerBackend, Transport, SEEK_STEP};
use crate::config::{AuraConfig, VisualizationMode};
use crate::ui::halfblock::{HalfBlock, TerminalHost};
use crate::ui::shell::{PageAction, ACCENT, FG, MUTED, PANEL_BG};
use crate::visualizer::{
    frame_interval, AnimationDriver, CaptureTap, DriverHandle, SignalSource, SurfaceHost,
    TickOutcome, Visualizer,
};

const STATUS_TTL: Duration = Duration::from_secs(4);

/// Interactive player page.
pub struct PlayerPage {
    catalog: Vec<AudioSource>,
    list_state: ListState,
    transport: Transport,
    visualizer: Rc<RefCell<Visualizer>>,
    host: Rc<TerminalHost>,
    driver: Option<DriverHandle>,
    frame_interval: Duration,
    device: String,
    ffprobe: Option<PathBuf>,
    pending_duration: Option<oneshot::Receiver<Option<Duration>>>,
    status: Option<(String, Instant)>,
}

impl PlayerPage {
    /// Builds the page with the first catalog entry selected.
    ///
    /// Nothing is attached to the audio device until the first play gesture.
    pub fn new(config: &AuraConfig, catalog: Vec<AudioSource>, backend: PlayerBackend) -> Self {
        let mut list_state = ListState::default();
        if !catalog.is_empty() {
            list_state.select(Some(0));
        }

        let ffprobe = find_binary("ffprobe").ok();
        if ffprobe.is_none() {
            tracing::debug!("ffprobe not found, durations will be unknown");
        }

        let mut page = Self {
            catalog,
            list_state,
            transport: Transport::new(backend),
            visualizer: Rc::new(RefCell::new(Visualizer::new(&config.visualizer))),
            host: Rc::new(TerminalHost::new(config.visualizer.supersample)),
            driver: None,
            frame_interval: frame_interval(config.visualizer.frame_rate),
            device: config.audio.device.clone(),
            ffprobe,
            pending_duration: None,
            status: None,
        };

        if let Some(first) = page.catalog.first().cloned() {
            page.select_source(first);
        }
        page
    }

    /// Starts the animation loop. Must run inside the shell's `LocalSet`.
    pub fn activate(&mut self) {
        if self.driver.is_some() {
            return;
        }

        let view = Rc::downgrade(&self.visualizer);
        let host = Rc::clone(&self.host);
        self.driver = Some(AnimationDriver::start(self.frame_interval, move || {
            let Some(view) = view.upgrade() else {
                return;
            };
            let Ok(mut view) = view.try_borrow_mut() else {
                return;
            };
            match view.tick(host.geometry()) {
                TickOutcome::Rendered => {}
                TickOutcome::Skipped(reason) => tracing::trace!("Frame skipped: {:?}", reason),
            }
        }));
    }

    /// Stops the animation loop and playback.
    pub fn teardown(&mut self) {
        if let Some(mut driver) = self.driver.take() {
            driver.stop();
        }
        self.transport.pause();
        tracing::debug!("Player view torn down");
    }

    fn select_source(&mut self, source: AudioSource) {
        self.transport.select(source.clone());
        self.pending_duration = self.ffprobe.clone().map(|ffprobe| {
            let (tx, rx) = oneshot::channel();
            tokio::task::spawn_blocking(move || {
                let _ = tx.send(probe_duration(&ffprobe, &source.location));
            });
            rx
        });
    }

    /// Attaches the analysis tap on the first play gesture.
    fn ensure_tap(&mut self) {
        let mut view = self.visualizer.borrow_mut();
        if view.is_tap_attached() {
            return;
        }

        let device = self.device.clone();
        let result = view.attach_tap(move || {
            let tap = CaptureTap::open(&device)?;
            Ok(Box::new(tap) as Box<dyn SignalSource>)
        });
        drop(view);

        if let Err(e) = result {
            tracing::warn!("Visualizer unavailable: {:#}", e);
            self.set_status(format!("Visualizer unavailable: {e}"));
        }
    }

    fn set_status(&mut self, message: String) {
        self.status = Some((message, Instant::now()));
    }

    /// Collects background results and detects the end of playback.
    pub fn update(&mut self) {
        if let Some(rx) = self.pending_duration.as_mut() {
            match rx.try_recv() {
                Ok(duration) => {
                    self.transport.set_duration(duration);
                    self.pending_duration = None;
                }
                Err(oneshot::error::TryRecvError::Empty) => {}
                Err(oneshot::error::TryRecvError::Closed) => self.pending_duration = None,
            }
        }

        if self.transport.poll() {
            tracing::info!("Playback finished");
        }

        if self
            .status
            .as_ref()
            .is_some_and(|(_, at)| at.elapsed() >= STATUS_TTL)
        {
            self.status = None;
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> PageAction {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return PageAction::Quit,
            KeyCode::Tab => return PageAction::SwitchPage,
            KeyCode::Char(' ') => {
                self.ensure_tap();
                if let Err(e) = self.transport.toggle() {
                    tracing::error!("Playback failed: {:#}", e);
                    self.set_status(format!("Playback failed: {e}"));
                }
            }
            KeyCode::Left => self.seek(-SEEK_STEP.as_secs_f64()),
            KeyCode::Right => self.seek(SEEK_STEP.as_secs_f64()),
            KeyCode::Up => self.list_state.select_previous(),
            KeyCode::Down => self.list_state.select_next(),
            KeyCode::Enter => {
                if let Some(source) = self
                    .list_state
                    .selected()
                    .and_then(|idx| self.catalog.get(idx))
                    .cloned()
                {
                    self.select_source(source);
                }
            }
            KeyCode::Char('v') => {
                let mut view = self.visualizer.borrow_mut();
                let mode = match view.mode() {
                    VisualizationMode::Waveform => VisualizationMode::Spectrum,
                    VisualizationMode::Spectrum => VisualizationMode::Waveform,
                };
                view.set_mode(mode);
                drop(view);
                self.set_status(format!("Visualization: {mode}"));
            }
            _ => {}
        }
        PageAction::None
    }

    fn seek(&mut self, delta: f64) {
        if let Err(e) = self.transport.seek_by(delta) {
            tracing::error!("Seek failed: {:#}", e);
            self.set_status(format!("Seek failed: {e}"));
        }
    }

    /// Renders the page into `area`.
    pub fn render(&mut self, frame: &mut Frame, area: Rect) {
        let catalog_height = (self.catalog.len() as u16).saturating_add(2).min(8);
        let [header_area, visual_area, title_area, progress_area, controls_area, catalog_area, footer_area] =
            Layout::vertical([
                Constraint::Length(2),
                Constraint::Min(4),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(catalog_height),
                Constraint::Length(1),
            ])
            .areas(area);

        let header = Paragraph::new(vec![
            Line::styled(
                "Aura Player",
                Style::default().fg(FG).add_modifier(Modifier::BOLD),
            ),
            Line::styled("Your daily audio & news companion", Style::default().fg(MUTED)),
        ])
        .alignment(Alignment::Center);
        frame.render_widget(header, header_area);

        self.host.set_area(visual_area);
        {
            let view = self.visualizer.borrow();
            frame.render_widget(
                HalfBlock::new(view.surface().pixmap()).background(15, 23, 42),
                visual_area,
            );
            if !view.is_tap_attached() {
                let hint = Paragraph::new("press space to play")
                    .style(Style::default().fg(MUTED))
                    .alignment(Alignment::Center);
                let hint_area = Rect {
                    y: visual_area.y + visual_area.height / 2,
                    height: 1.min(visual_area.height),
                    ..visual_area
                };
                frame.render_widget(hint, hint_area);
            }
        }

        let state = self.transport.state();
        let title = state
            .source
            .as_ref()
            .map_or("No source selected", |source| source.label.as_str());
        frame.render_widget(
            Paragraph::new(Line::styled(
                title.to_string(),
                Style::default().fg(FG).add_modifier(Modifier::BOLD),
            ))
            .alignment(Alignment::Center),
            title_area,
        );

        let total = state.duration.unwrap_or_default();
        let ratio = if total.is_zero() {
            0.0
        } else {
            (state.current_time.as_secs_f64() / total.as_secs_f64()).clamp(0.0, 1.0)
        };
        let [elapsed_area, gauge_area, total_area] = Layout::horizontal([
            Constraint::Length(7),
            Constraint::Min(1),
            Constraint::Length(7),
        ])
        .areas(progress_area);
        frame.render_widget(
            Paragraph::new(format_time(state.current_time))
                .style(Style::default().fg(MUTED))
                .alignment(Alignment::Center),
            elapsed_area,
        );
        frame.render_widget(
            LineGauge::default()
                .ratio(ratio)
                .label("")
                .filled_style(Style::default().fg(ACCENT))
                .unfilled_style(Style::default().fg(PANEL_BG)),
            gauge_area,
        );
        frame.render_widget(
            Paragraph::new(format_time(total))
                .style(Style::default().fg(MUTED))
                .alignment(Alignment::Center),
            total_area,
        );

        let indicator = if state.is_playing { "⏸  Pause" } else { "▶  Play" };
        frame.render_widget(
            Paragraph::new(Line::styled(
                indicator,
                Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
            ))
            .alignment(Alignment::Center),
            controls_area,
        );

        let items: Vec<ListItem> = self
            .catalog
            .iter()
            .map(|source| ListItem::new(Line::styled(source.label.clone(), Style::default().fg(FG))))
            .collect();
        let list = List::new(items)
            .block(
                Block::default()
                    .title(" Choose a Podcast ")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(PANEL_BG))
                    .padding(Padding::horizontal(1)),
            )
            .highlight_style(Style::default().bg(PANEL_BG))
            .highlight_symbol("> ")
            .highlight_spacing(HighlightSpacing::Always);
        frame.render_stateful_widget(list, catalog_area, &mut self.list_state);

        let footer = match &self.status {
            Some((message, _)) => Paragraph::new(message.as_str()).style(Style::default().fg(ACCENT)),
            None => Paragraph::new("space play/pause, ←→ seek, ↑↓ ↵ source, v mode, tab news, q quit")
                .style(Style::default().fg(MUTED)),
        };
        frame.render_widget(footer.alignment(Alignment::Center), footer_area);
    }
}

impl Drop for PlayerPage {
    fn drop(&mut self) {
        self.teardown();
    }
}
