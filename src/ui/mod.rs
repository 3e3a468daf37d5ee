pub mod candlestick;
mod render;

use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, MouseButton, MouseEventKind};
use ratatui::{backend::Backend, layout::Rect, widgets::ListState, Terminal};
use tracing::info;

use crate::analysis::{run_analysis, AnalysisRequest, AnalysisRun, Notice, RunEvent};
use crate::config::AppConfig;
use crate::market::MarketDataProvider;
use crate::returns::{InvestmentAmount, Severity};

pub use render::ui;

const POLL_INTERVAL_MS: u64 = 250;

/// Tracks clickable UI regions for mouse interaction
#[derive(Default, Clone)]
pub struct ClickableRegions {
    /// Ticker list rows: (rect, candidate_index)
    pub ticker_rows: Vec<(Rect, usize)>,
    /// Report tabs: (rect, report_index)
    pub report_tabs: Vec<(Rect, usize)>,
    pub amount_field: Rect,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputMode {
    Normal,
    EditAmount(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    None,
    Quit,
    Analyze,
}

pub struct App {
    pub candidates: Vec<String>,
    /// Parallel to `candidates`
    pub selected: Vec<bool>,
    pub list_state: ListState,
    /// Amount for the next run
    pub amount: InputAmount,
    pub input_mode: InputMode,
    /// Result of the last completed run
    pub run: Option<AnalysisRun>,
    /// Notices of the current or last run, in arrival order
    pub notices: Vec<Notice>,
    pub active_report: usize,
    pub is_fetching: bool,
    pub status: Option<(Severity, String)>,
    pub clickable_regions: ClickableRegions,
}

/// The amount field: committed value plus whether it differs from the last run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputAmount {
    pub value: InvestmentAmount,
    pub pending: bool,
}

impl App {
    pub fn new(config: &AppConfig) -> Self {
        let selected = config
            .candidates
            .iter()
            .map(|c| config.preselected.contains(c))
            .collect();

        let mut list_state = ListState::default();
        list_state.select(Some(0));

        App {
            candidates: config.candidates.clone(),
            selected,
            list_state,
            amount: InputAmount {
                value: config.amount,
                pending: false,
            },
            input_mode: InputMode::Normal,
            run: None,
            notices: Vec::new(),
            active_report: 0,
            is_fetching: false,
            status: None,
            clickable_regions: ClickableRegions::default(),
        }
    }

    /// Selected tickers in list order
    pub fn selection(&self) -> Vec<&str> {
        self.candidates
            .iter()
            .zip(&self.selected)
            .filter(|(_, &on)| on)
            .map(|(c, _)| c.as_str())
            .collect()
    }

    pub fn request(&self) -> AnalysisRequest {
        AnalysisRequest::new(self.selection(), self.amount.value)
    }

    pub fn toggle(&mut self, idx: usize) {
        if let Some(on) = self.selected.get_mut(idx) {
            *on = !*on;
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected.iter_mut().for_each(|on| *on = false);
    }

    fn next_row(&mut self) {
        if self.candidates.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => (i + 1).min(self.candidates.len() - 1),
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    fn prev_row(&mut self) {
        let i = match self.list_state.selected() {
            Some(i) => i.saturating_sub(1),
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    fn report_count(&self) -> usize {
        self.run.as_ref().map(|r| r.reports.len()).unwrap_or(0)
    }

    fn next_report(&mut self) {
        let count = self.report_count();
        if count > 0 {
            self.active_report = (self.active_report + 1) % count;
        }
    }

    fn prev_report(&mut self) {
        let count = self.report_count();
        if count > 0 {
            self.active_report = if self.active_report == 0 { count - 1 } else { self.active_report - 1 };
        }
    }

    fn step_amount(&mut self, steps: i64) {
        self.amount.value = self.amount.value.stepped(steps);
        self.amount.pending = true;
    }

    /// Drop the previous result; nothing carries over between runs
    pub fn begin_run(&mut self) {
        self.run = None;
        self.notices.clear();
        self.active_report = 0;
        self.is_fetching = true;
        self.status = None;
    }

    pub fn record_event(&mut self, event: &RunEvent<'_>) {
        match event {
            RunEvent::Fetching(symbol) => {
                self.status = Some((Severity::Info, format!("Fetching data for {}...", symbol)));
            }
            RunEvent::Notice(notice) => self.notices.push((*notice).clone()),
        }
    }

    pub fn finish_run(&mut self, run: AnalysisRun) {
        let analyzed = run.reports.len();
        let skipped = run.skipped().count();
        self.status = Some(if analyzed == 0 {
            (Severity::Warning, "No ticker could be analyzed".to_string())
        } else {
            (Severity::Success, format!("Analyzed {} ticker(s), skipped {}", analyzed, skipped))
        });
        self.run = Some(run);
        self.is_fetching = false;
        self.amount.pending = false;
    }
}

pub fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    provider: &dyn MarketDataProvider,
) -> Result<()> {
    // Preselected tickers from the command line are analyzed right away
    if !app.selection().is_empty() {
        analyze(terminal, app, provider)?;
    }

    loop {
        terminal.draw(|f| ui(f, app))?;

        if event::poll(Duration::from_millis(POLL_INTERVAL_MS))? {
            let action = match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => handle_input(app, key.code),
                Event::Mouse(mouse) => handle_mouse(app, mouse.kind, mouse.column, mouse.row),
                _ => Action::None,
            };

            match action {
                Action::Quit => return Ok(()),
                Action::Analyze => analyze(terminal, app, provider)?,
                Action::None => {}
            }
        }
    }
}

/// Blocking run over the current selection, redrawing after every event
fn analyze<B: Backend>(terminal: &mut Terminal<B>, app: &mut App, provider: &dyn MarketDataProvider) -> Result<()> {
    let request = app.request();
    if request.tickers().is_empty() {
        app.status = Some((Severity::Warning, "Select at least one ticker (Space)".to_string()));
        return Ok(());
    }

    info!(tickers = ?request.tickers(), "starting analysis from dashboard");
    app.begin_run();

    let mut draw_error = None;
    let run = run_analysis(provider, &request, |event| {
        app.record_event(&event);
        if draw_error.is_none() {
            if let Err(err) = terminal.draw(|f| ui(f, app)) {
                draw_error = Some(err);
            }
        }
    });
    app.finish_run(run);

    match draw_error {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}

pub fn handle_input(app: &mut App, key: KeyCode) -> Action {
    match &mut app.input_mode {
        InputMode::Normal => match key {
            KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
            KeyCode::Down | KeyCode::Char('j') => {
                app.next_row();
                Action::None
            }
            KeyCode::Up | KeyCode::Char('k') => {
                app.prev_row();
                Action::None
            }
            KeyCode::Char(' ') => {
                if let Some(idx) = app.list_state.selected() {
                    app.toggle(idx);
                }
                Action::None
            }
            KeyCode::Char('c') => {
                app.clear_selection();
                Action::None
            }
            KeyCode::Enter | KeyCode::Char('r') => Action::Analyze,
            KeyCode::Char('i') | KeyCode::Char('$') => {
                app.input_mode = InputMode::EditAmount(format!("{:.2}", app.amount.value.value()));
                Action::None
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                app.step_amount(1);
                Action::None
            }
            KeyCode::Char('-') => {
                app.step_amount(-1);
                Action::None
            }
            KeyCode::Right | KeyCode::Char('l') | KeyCode::Tab => {
                app.next_report();
                Action::None
            }
            KeyCode::Left | KeyCode::Char('h') | KeyCode::BackTab => {
                app.prev_report();
                Action::None
            }
            _ => Action::None,
        },
        InputMode::EditAmount(buffer) => match key {
            KeyCode::Esc => {
                app.input_mode = InputMode::Normal;
                Action::None
            }
            KeyCode::Enter => match InvestmentAmount::parse(buffer) {
                Ok(amount) => {
                    app.amount.value = amount;
                    app.input_mode = InputMode::Normal;
                    Action::Analyze
                }
                Err(err) => {
                    app.status = Some((Severity::Error, err.to_string()));
                    Action::None
                }
            },
            KeyCode::Backspace => {
                buffer.pop();
                Action::None
            }
            KeyCode::Char(c) if c.is_ascii_digit() || c == '.' => {
                buffer.push(c);
                Action::None
            }
            _ => Action::None,
        },
    }
}

/// Check if a point (x, y) is inside a Rect
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

pub fn handle_mouse(app: &mut App, kind: MouseEventKind, x: u16, y: u16) -> Action {
    if !matches!(kind, MouseEventKind::Down(MouseButton::Left)) {
        return Action::None;
    }
    if !matches!(app.input_mode, InputMode::Normal) {
        return Action::None;
    }

    let regions = app.clickable_regions.clone();

    if let Some((_, idx)) = regions.ticker_rows.iter().find(|(rect, _)| point_in_rect(x, y, *rect)) {
        app.list_state.select(Some(*idx));
        app.toggle(*idx);
        return Action::None;
    }

    if let Some((_, idx)) = regions.report_tabs.iter().find(|(rect, _)| point_in_rect(x, y, *rect)) {
        app.active_report = *idx;
        return Action::None;
    }

    if point_in_rect(x, y, regions.amount_field) {
        app.input_mode = InputMode::EditAmount(format!("{:.2}", app.amount.value.value()));
    }

    Action::None
}
