/// Main TUI application
///
/// Registry requests run on spawned tasks and report back over a channel that
/// the event loop drains between frames, so drawing and log output continue
/// while an action is in flight.

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::collections::VecDeque;
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info};

use crate::core::actions::{self, ActionReport, LifecycleAction};
use crate::core::form::RegistrationForm;
use crate::core::log_stream::{LogPanels, ToggleResult};
use crate::core::models::ClientRecord;
use crate::core::registry::{RegistryApi, RegistryError};
use crate::screens::Dashboard;
use crate::utils::{LIST_LOAD_FAILED, LOGS_DISABLED};

/// A finished background request
enum Update {
    Action {
        success_status: String,
        report: ActionReport,
    },
    Reload {
        result: Result<Vec<ClientRecord>, RegistryError>,
        status: Option<String>,
    },
}

pub struct App {
    api: Arc<dyn RegistryApi>,
    dashboard: Dashboard,
    log_panels: LogPanels,
    form: RegistrationForm,
    show_form: bool,
    // Oldest first; the front one is shown and blocks input
    alerts: VecDeque<String>,
    selected_index: usize,
    status_message: Option<String>,
    show_help: bool,
    should_quit: bool,
    updates_tx: UnboundedSender<Update>,
    updates_rx: UnboundedReceiver<Update>,
    pending: usize,
}

impl App {
    pub fn new(api: Arc<dyn RegistryApi>, base_url: &str, log_streaming: bool) -> Self {
        let (updates_tx, updates_rx) = unbounded_channel();
        Self {
            api,
            dashboard: Dashboard::new(base_url),
            log_panels: LogPanels::new(log_streaming),
            form: RegistrationForm::new(),
            show_form: false,
            alerts: VecDeque::new(),
            selected_index: 0,
            status_message: None,
            show_help: false,
            should_quit: false,
            updates_tx,
            updates_rx,
            pending: 0,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        // Setup terminal
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        // Initial data load
        self.spawn_reload(None);

        let result = self.run_loop(&mut terminal);

        // Restore terminal
        self.log_panels.reset();
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn run_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        loop {
            self.poll_background();

            terminal.draw(|f| self.render(f))?;

            if event::poll(Duration::from_millis(100))? {
                if let Event::Key(key_event) = event::read()? {
                    self.handle_key(key_event);
                }
            }

            if self.should_quit {
                break;
            }
        }

        Ok(())
    }

    /// Apply finished requests and queued log chunks (non-blocking)
    pub fn poll_background(&mut self) {
        while let Ok(update) = self.updates_rx.try_recv() {
            self.pending = self.pending.saturating_sub(1);
            self.apply_update(update);
        }
        self.log_panels.drain_events();
    }

    /// Requests still in flight
    pub fn pending_requests(&self) -> usize {
        self.pending
    }

    fn spawn_update<F>(&mut self, task: F)
    where
        F: Future<Output = Update> + Send + 'static,
    {
        let tx = self.updates_tx.clone();
        self.pending += 1;
        tokio::spawn(async move {
            // The receiver only goes away together with the app
            let _ = tx.send(task.await);
        });
    }

    fn spawn_reload(&mut self, status: Option<String>) {
        let api = self.api.clone();
        self.spawn_update(async move {
            Update::Reload {
                result: actions::reload(api.as_ref()).await,
                status,
            }
        });
    }

    fn selected_service(&self) -> Option<String> {
        self.dashboard
            .clients()
            .get(self.selected_index)
            .map(|c| c.service_name.clone())
    }

    fn set_status(&mut self, message: String) {
        self.status_message = Some(message);
    }

    fn clear_status(&mut self) {
        self.status_message = None;
    }

    fn apply_update(&mut self, update: Update) {
        match update {
            Update::Action {
                success_status,
                report,
            } => {
                let success = report.outcome.is_success();
                self.apply_report(report);
                if self.dashboard.load_error().is_none() {
                    if success {
                        self.set_status(success_status);
                    } else {
                        self.clear_status();
                    }
                }
            }
            Update::Reload { result, status } => {
                self.apply_reload(result);
                if let Some(status) = status {
                    if self.dashboard.load_error().is_none() {
                        self.set_status(status);
                    }
                }
            }
        }
    }

    /// Replace what is shown with a fresh list. Log panels belong to the old
    /// list and are dropped with it.
    fn apply_reload(&mut self, result: Result<Vec<ClientRecord>, RegistryError>) {
        self.log_panels.reset();
        match result {
            Ok(clients) => self.dashboard.update_clients(Ok(clients)),
            Err(e) => {
                self.set_status(format!("{}: {}", LIST_LOAD_FAILED, e));
                self.dashboard.update_clients(Err(e.to_string()));
            }
        }

        let count = self.dashboard.clients().len();
        if self.selected_index >= count {
            self.selected_index = count.saturating_sub(1);
        }
    }

    fn apply_report(&mut self, report: ActionReport) {
        if let Some(alert) = report.outcome.alert {
            self.alerts.push_back(alert);
        }
        self.apply_reload(report.clients);
    }

    pub fn handle_key(&mut self, key_event: KeyEvent) {
        let key = key_event.code;

        // An open alert swallows every key until it is dismissed
        if !self.alerts.is_empty() {
            if matches!(key, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
                self.alerts.pop_front();
            }
            return;
        }

        if self.show_form {
            self.handle_form_key(key_event);
            return;
        }

        if self.show_help {
            self.show_help = false;
            return;
        }

        self.clear_status();

        match key {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Char('c') if key_event.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Char('?') | KeyCode::F(1) => {
                self.show_help = true;
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected_index = self.selected_index.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                let count = self.dashboard.clients().len();
                if self.selected_index + 1 < count {
                    self.selected_index += 1;
                }
            }
            KeyCode::Char('s') => self.handle_lifecycle(LifecycleAction::Start),
            KeyCode::Char('x') => self.handle_lifecycle(LifecycleAction::Stop),
            KeyCode::Char('d') | KeyCode::Delete => self.handle_lifecycle(LifecycleAction::Delete),
            KeyCode::Char('l') => self.toggle_logs(),
            KeyCode::Char('n') => {
                self.show_form = true;
            }
            KeyCode::Char('r') => {
                self.spawn_reload(Some("Liste neu geladen".to_string()));
            }
            KeyCode::Char('t') => {
                let dark = !self.dashboard.is_dark();
                self.dashboard.set_dark(dark);
            }
            _ => {}
        }
    }

    fn handle_lifecycle(&mut self, action: LifecycleAction) {
        let Some(service) = self.selected_service() else {
            return;
        };

        debug!(service = %service, action = action.label(), "dispatching action");
        self.set_status(format!("{}: {} ...", action.label(), service));

        let api = self.api.clone();
        self.spawn_update(async move {
            let report = actions::run_action_then_reload(api.as_ref(), action, &service).await;
            Update::Action {
                success_status: format!("✓ {}: {}", action.label(), service),
                report,
            }
        });
    }

    fn handle_form_key(&mut self, key_event: KeyEvent) {
        match key_event.code {
            KeyCode::Esc => {
                self.show_form = false;
            }
            KeyCode::Enter => {
                let submission = self.form.submit(self.api.clone());
                self.show_form = false;
                self.spawn_update(async move {
                    Update::Action {
                        success_status: "✓ Client registriert".to_string(),
                        report: submission.await,
                    }
                });
            }
            KeyCode::Tab | KeyCode::Down => self.form.next_field(),
            KeyCode::BackTab | KeyCode::Up => self.form.prev_field(),
            KeyCode::Backspace => self.form.backspace(),
            KeyCode::Char(c) => self.form.insert_char(c),
            _ => {}
        }
    }

    fn toggle_logs(&mut self) {
        let Some(service) = self.selected_service() else {
            return;
        };

        match self.log_panels.toggle(self.api.clone(), &service) {
            ToggleResult::Shown => info!(service = %service, "showing logs"),
            ToggleResult::Hidden => info!(service = %service, "hiding logs"),
            ToggleResult::Disabled => self.set_status(LOGS_DISABLED.to_string()),
        }
    }

    fn render(&self, frame: &mut ratatui::Frame) {
        self.dashboard.render(
            frame,
            self.selected_index,
            self.status_message.as_deref(),
            &self.log_panels,
            self.show_form.then_some(&self.form),
            self.alerts.front().map(String::as_str),
            self.show_help,
        );
    }
}
