//! Application state and TUI event loop.
//!
//! [`App`] owns the theme, the caller-supplied [`DashboardState`] and the
//! last computed [`DashboardView`]. Every key press maps to a
//! [`KeyAction`]; filter changes go through [`session::handle`] and the
//! view is rebuilt from the cached record set.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Frame, Terminal};

use manifest_data::analysis::{build_view, DashboardView};
use manifest_data::reader::RecordSource;
use manifest_runtime::data_manager::{DataManager, LoadedData};
use manifest_runtime::session::{self, DashboardState, Interaction};

use crate::dashboard_view::{self, HeaderInfo};
use crate::themes::Theme;

/// Years moved by one press of an age key.
pub const AGE_STEP: f64 = 1.0;

// ── KeyAction ─────────────────────────────────────────────────────────────────

/// What a key press asks the application to do.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyAction {
    Interact(Interaction),
    /// Drop the cached record set and fetch again.
    Reload,
    Quit,
}

/// Map a key event to an action; unbound keys map to `None`.
pub fn map_key(key: KeyEvent) -> Option<KeyAction> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    let nudge = |min_delta, max_delta| {
        Some(KeyAction::Interact(Interaction::NudgeAge {
            min_delta,
            max_delta,
        }))
    };
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(KeyAction::Quit)
        }
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Some(KeyAction::Quit),
        KeyCode::Char('c') => Some(KeyAction::Interact(Interaction::CycleClass)),
        KeyCode::Char('g') => Some(KeyAction::Interact(Interaction::CycleGender)),
        KeyCode::Char('[') => nudge(-AGE_STEP, 0.0),
        KeyCode::Char(']') => nudge(AGE_STEP, 0.0),
        KeyCode::Char('{') => nudge(0.0, -AGE_STEP),
        KeyCode::Char('}') => nudge(0.0, AGE_STEP),
        KeyCode::Char('x') => Some(KeyAction::Interact(Interaction::ResetFilters)),
        KeyCode::Char('r') => Some(KeyAction::Reload),
        _ => None,
    }
}

// ── App ───────────────────────────────────────────────────────────────────────

/// Root application state for the dashboard TUI.
pub struct App {
    pub theme: Theme,
    pub state: DashboardState,
    /// Set to `true` to break out of the event loop on the next iteration.
    pub should_quit: bool,
    data: Option<Arc<LoadedData>>,
    view: Option<DashboardView>,
    /// Message of the last failed load; the dashboard is replaced while set.
    load_error: Option<String>,
    /// Non-fatal message shown in the header.
    status: Option<String>,
}

impl App {
    pub fn new(theme_name: &str, state: DashboardState) -> Self {
        Self {
            theme: Theme::from_name(theme_name),
            state,
            should_quit: false,
            data: None,
            view: None,
            load_error: None,
            status: None,
        }
    }

    pub fn view(&self) -> Option<&DashboardView> {
        self.view.as_ref()
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    // ── Event loop ────────────────────────────────────────────────────────────

    /// Run the dashboard until `q`, `Esc` or `Ctrl+C`.
    ///
    /// Input is polled with a 250 ms timeout on the current thread. The
    /// record set is re-requested from `manager` after each key press, so an
    /// expired cache is refetched on the next interaction.
    pub fn run<S: RecordSource>(mut self, manager: &mut DataManager<S>) -> io::Result<()> {
        self.refresh(manager, false);

        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let tick_rate = Duration::from_millis(250);

        let result = loop {
            if let Err(e) = terminal.draw(|frame| self.render(frame)) {
                break Err(e);
            }

            match event::poll(tick_rate) {
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) => self.on_key(key, manager),
                    Ok(_) => {}
                    Err(e) => break Err(e),
                },
                Ok(false) => {}
                Err(e) => break Err(e),
            }

            if self.should_quit {
                break Ok(());
            }
        };

        // Restore terminal state unconditionally.
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    /// Apply one key press.
    pub fn on_key<S: RecordSource>(&mut self, key: KeyEvent, manager: &mut DataManager<S>) {
        match map_key(key) {
            Some(KeyAction::Quit) => self.should_quit = true,
            Some(KeyAction::Reload) => {
                manager.invalidate();
                self.refresh(manager, false);
            }
            Some(KeyAction::Interact(interaction)) => {
                self.refresh(manager, false);
                self.apply(&interaction);
            }
            None => {}
        }
    }

    /// Fetch (or reuse) the record set and rebuild the view when it changed.
    pub fn refresh<S: RecordSource>(&mut self, manager: &mut DataManager<S>, force: bool) {
        match manager.get_data(force) {
            Ok(data) => {
                let unchanged = self
                    .data
                    .as_ref()
                    .is_some_and(|current| Arc::ptr_eq(current, &data));
                self.load_error = None;
                if !unchanged {
                    self.data = Some(data);
                    self.rebuild_view();
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "could not load records");
                self.load_error = Some(e.to_string());
                self.data = None;
                self.view = None;
            }
        }
    }

    /// Apply a filter interaction to the current state.
    pub fn apply(&mut self, interaction: &Interaction) {
        let options = self
            .view
            .as_ref()
            .map(|v| v.options.clone())
            .unwrap_or_default();

        match session::handle(self.state.clone(), interaction, &options) {
            Ok(state) => {
                self.state = state;
                self.status = None;
                self.rebuild_view();
            }
            Err(e) => self.status = Some(e.to_string()),
        }
    }

    fn rebuild_view(&mut self) {
        self.view = self
            .data
            .as_ref()
            .map(|data| build_view(data.table(), &self.state.filter));
    }

    /// Render the current application state into `frame`.
    pub fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        if let Some(message) = &self.load_error {
            dashboard_view::render_load_error(frame, area, message, &self.theme);
            return;
        }

        match (&self.view, &self.data) {
            (Some(view), Some(data)) => {
                let header = HeaderInfo {
                    source: data.source.clone(),
                    loaded_at: Some(data.loaded_at),
                    status: self.status.clone(),
                };
                dashboard_view::render_dashboard(frame, area, view, &header, &self.theme);
            }
            _ => dashboard_view::render_no_data(frame, area, &self.theme),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
