/// Main dashboard screen

use chrono::{DateTime, Local};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::core::form::RegistrationForm;
use crate::core::log_stream::{LogPanel, LogPanels};
use crate::core::models::ClientRecord;
use crate::utils::{
    format_port, ALERT_DISMISS, ALERT_TITLE, FORM_HINT, FORM_TITLE, LIST_EMPTY, LIST_LOAD_FAILED,
};

/// Colors for the light and dark presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub background: Color,
    pub foreground: Color,
    pub accent: Color,
    pub muted: Color,
    pub highlight: Color,
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            background: Color::Black,
            foreground: Color::White,
            accent: Color::Cyan,
            muted: Color::DarkGray,
            highlight: Color::Rgb(40, 40, 60),
        }
    }

    pub fn light() -> Self {
        Self {
            background: Color::White,
            foreground: Color::Black,
            accent: Color::Blue,
            muted: Color::Gray,
            highlight: Color::Rgb(210, 220, 240),
        }
    }

    pub fn for_mode(dark: bool) -> Self {
        if dark {
            Self::dark()
        } else {
            Self::light()
        }
    }
}

/// One list row: "orders — 🟢 läuft   HTTP 8080 | HTTPS 8443 | Lease 30s/90s"
pub fn client_line(record: &ClientRecord, theme: &Theme) -> Line<'static> {
    let status_color = if record.running { Color::Green } else { Color::Red };

    let mut spans = vec![
        Span::styled(
            record.service_name.clone(),
            Style::default().fg(theme.foreground).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" — "),
        Span::styled(record.status_label(), Style::default().fg(status_color)),
    ];

    if record.http_port.is_some() || record.secure_port.is_some() {
        spans.push(Span::styled(
            format!(
                "   HTTP {} | HTTPS {}",
                format_port(record.http_port),
                format_port(record.secure_port)
            ),
            Style::default().fg(theme.muted),
        ));
    }
    if let Some(lease) = record.lease_info {
        spans.push(Span::styled(
            format!(
                " | Lease {}s/{}s",
                lease.renewal_interval_in_secs, lease.duration_in_secs
            ),
            Style::default().fg(theme.muted),
        ));
    }

    Line::from(spans)
}

/// Rows for the client list, one per record in registry order
pub fn client_items(clients: &[ClientRecord], log_panels: &LogPanels, theme: &Theme) -> Vec<ListItem<'static>> {
    clients
        .iter()
        .map(|record| {
            let mut line = client_line(record, theme);
            if log_panels.is_visible(&record.service_name) {
                line.spans.push(Span::styled("  [Logs]", Style::default().fg(theme.accent)));
            }
            ListItem::new(line)
        })
        .collect()
}

pub struct Dashboard {
    pub title: String,
    clients: Vec<ClientRecord>,
    load_error: Option<String>,
    last_reload: Option<DateTime<Local>>,
    dark_mode: bool,
    base_url: String,
}

impl Dashboard {
    pub fn new(base_url: &str) -> Self {
        Self {
            title: "Service Registry Dashboard".to_string(),
            clients: Vec::new(),
            load_error: None,
            last_reload: None,
            dark_mode: false,
            base_url: base_url.to_string(),
        }
    }

    /// Replace the displayed list wholesale. A failed load leaves it empty.
    pub fn update_clients(&mut self, result: Result<Vec<ClientRecord>, String>) {
        match result {
            Ok(clients) => {
                self.clients = clients;
                self.load_error = None;
            }
            Err(e) => {
                self.clients.clear();
                self.load_error = Some(e);
            }
        }
        self.last_reload = Some(Local::now());
    }

    pub fn clients(&self) -> &[ClientRecord] {
        &self.clients
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn is_dark(&self) -> bool {
        self.dark_mode
    }

    pub fn set_dark(&mut self, dark: bool) {
        self.dark_mode = dark;
    }

    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &self,
        frame: &mut Frame,
        selected_index: usize,
        status_message: Option<&str>,
        log_panels: &LogPanels,
        form: Option<&RegistrationForm>,
        alert: Option<&str>,
        show_help: bool,
    ) {
        let theme = Theme::for_mode(self.dark_mode);
        let area = frame.size();

        frame.render_widget(
            Block::default().style(Style::default().bg(theme.background).fg(theme.foreground)),
            area,
        );

        let visible_logs = log_panels.visible();

        let mut constraints = vec![Constraint::Length(3), Constraint::Min(5)];
        if !visible_logs.is_empty() {
            constraints.push(Constraint::Percentage(50));
        }
        constraints.push(Constraint::Length(3));

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        self.render_header(frame, chunks[0], &theme);
        self.render_client_list(frame, chunks[1], selected_index, log_panels, &theme);

        let footer_area = if visible_logs.is_empty() {
            chunks[2]
        } else {
            self.render_log_panels(frame, chunks[2], &visible_logs, &theme);
            chunks[3]
        };
        self.render_footer(frame, footer_area, status_message, log_panels.is_enabled(), &theme);

        if let Some(form) = form {
            self.render_form(frame, form, &theme);
        }
        if show_help {
            self.render_help(frame, log_panels.is_enabled(), &theme);
        }
        // Alerts sit above everything else
        if let Some(alert) = alert {
            self.render_alert(frame, alert, &theme);
        }
    }

    fn render_header(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let reloaded = self
            .last_reload
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());

        let header = Paragraph::new(Line::from(vec![
            Span::styled(
                self.title.as_str(),
                Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("   {}   Stand: {}", self.base_url, reloaded),
                Style::default().fg(theme.muted),
            ),
        ]))
        .block(Block::default().borders(Borders::ALL));

        frame.render_widget(header, area);
    }

    fn render_client_list(&self, frame: &mut Frame, area: Rect, selected_index: usize, log_panels: &LogPanels, theme: &Theme) {
        let title = format!(" Clients ({}) ", self.clients.len());

        if self.clients.is_empty() {
            let text = match &self.load_error {
                Some(e) => Line::from(Span::styled(
                    format!("{}: {}", LIST_LOAD_FAILED, e),
                    Style::default().fg(Color::Red),
                )),
                None => Line::from(Span::styled(LIST_EMPTY, Style::default().fg(theme.muted))),
            };
            let paragraph = Paragraph::new(text)
                .block(Block::default().borders(Borders::ALL).title(title))
                .wrap(Wrap { trim: true });
            frame.render_widget(paragraph, area);
            return;
        }

        let list = List::new(client_items(&self.clients, log_panels, theme))
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(Style::default().bg(theme.highlight).add_modifier(Modifier::BOLD))
            .highlight_symbol("▶ ");

        let mut state = ListState::default();
        state.select(Some(selected_index.min(self.clients.len() - 1)));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn render_log_panels(&self, frame: &mut Frame, area: Rect, panels: &[(&str, &LogPanel)], theme: &Theme) {
        let constraints: Vec<Constraint> = panels
            .iter()
            .map(|_| Constraint::Ratio(1, panels.len() as u32))
            .collect();
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(constraints)
            .split(area);

        for ((name, panel), chunk) in panels.iter().zip(chunks.iter()) {
            let line_count = panel.content().lines().count();
            let inner_height = chunk.height.saturating_sub(2) as usize;
            // Follow the tail
            let scroll = line_count.saturating_sub(inner_height);

            let state = if panel.is_finished() { " (beendet)" } else { "" };
            let paragraph = Paragraph::new(panel.content())
                .style(Style::default().fg(theme.foreground))
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(theme.accent))
                        .title(format!(" Logs: {}{} ", name, state)),
                )
                .scroll((scroll.min(u16::MAX as usize) as u16, 0));

            frame.render_widget(paragraph, *chunk);
        }
    }

    fn render_footer(&self, frame: &mut Frame, area: Rect, status_message: Option<&str>, logs_enabled: bool, theme: &Theme) {
        let footer_text = match status_message {
            Some(status) => status.to_string(),
            None if logs_enabled => {
                "[s]tart | [x] stop | [d] löschen | [l]ogs | [n]eu | [r]eload | [t]heme | [?] Hilfe | [q] beenden".to_string()
            }
            None => "[s]tart | [x] stop | [d] löschen | [n]eu | [r]eload | [t]heme | [?] Hilfe | [q] beenden".to_string(),
        };

        let footer = Paragraph::new(footer_text)
            .alignment(Alignment::Center)
            .style(if status_message.is_some() {
                Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(theme.muted)
            })
            .block(Block::default().borders(Borders::ALL));

        frame.render_widget(footer, area);
    }

    fn render_form(&self, frame: &mut Frame, form: &RegistrationForm, theme: &Theme) {
        let modal_area = centered_rect(frame.size(), 70, 14);
        frame.render_widget(Clear, modal_area);

        let mut lines = vec![Line::from("")];
        for (label, value, focused) in form.rows() {
            let label_style = if focused {
                Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(theme.muted)
            };
            let cursor = if focused { "▏" } else { "" };
            lines.push(Line::from(vec![
                Span::styled(format!("{:>14}: ", label), label_style),
                Span::styled(format!("{}{}", value, cursor), Style::default().fg(theme.foreground)),
            ]));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(FORM_HINT, Style::default().fg(theme.muted))));

        let modal = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(theme.accent))
                .title(FORM_TITLE)
                .style(Style::default().bg(theme.background)),
        );
        frame.render_widget(modal, modal_area);
    }

    fn render_help(&self, frame: &mut Frame, logs_enabled: bool, theme: &Theme) {
        let popup_area = centered_rect(frame.size(), 60, 16);
        frame.render_widget(Clear, popup_area);

        let heading = Style::default().fg(theme.accent).add_modifier(Modifier::BOLD);
        let mut help_text = vec![
            Line::from(Span::styled("Tastenkürzel", heading)),
            Line::from(""),
            Line::from("  [↑ ↓]          Client auswählen"),
            Line::from("  [s]            Client starten"),
            Line::from("  [x]            Client stoppen"),
            Line::from("  [d] / [Entf]   Client löschen"),
        ];
        if logs_enabled {
            help_text.push(Line::from("  [l]            Logs ein-/ausblenden"));
        }
        help_text.extend([
            Line::from("  [n]            Neuen Client registrieren"),
            Line::from("  [r]            Liste neu laden"),
            Line::from("  [t]            Hell/Dunkel umschalten"),
            Line::from("  [?]            Diese Hilfe"),
            Line::from("  [q] / [Esc]    Beenden"),
        ]);

        let popup = Paragraph::new(help_text).block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Hilfe ")
                .style(Style::default().bg(theme.background).fg(theme.foreground)),
        );
        frame.render_widget(popup, popup_area);
    }

    fn render_alert(&self, frame: &mut Frame, message: &str, theme: &Theme) {
        let modal_area = centered_rect(frame.size(), 60, 7);
        frame.render_widget(Clear, modal_area);

        let lines = vec![
            Line::from(""),
            Line::from(Span::styled(
                message.to_string(),
                Style::default().fg(theme.foreground).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(Span::styled(ALERT_DISMISS, Style::default().fg(theme.muted))),
        ];

        let modal = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Double)
                    .border_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
                    .title(ALERT_TITLE)
                    .style(Style::default().bg(theme.background)),
            );
        frame.render_widget(modal, modal_area);
    }
}

/// A rectangle `width_percent` wide and `height` rows tall, centered in `area`
fn centered_rect(area: Rect, width_percent: u16, height: u16) -> Rect {
    let width = (u32::from(area.width) * u32::from(width_percent) / 100) as u16;
    let width = width.max(20).min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
