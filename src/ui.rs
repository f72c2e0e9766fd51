use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use smart_park::{
    analyze_or_fallback, compute_cost, export_to_dir, task_sections, AdminCredentials,
    AnalysisRequest, AnalysisResult, Analyst, Invoice, ParkingLot, Role, SlotStatus,
    TransactionStatus, View,
};

const MAX_PLATE_LEN: usize = 16;
const MAX_LABEL_LEN: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Landing,
    Login,
    Main,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateMode {
    Entry,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginField {
    Username,
    Password,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Success(String),
    Error(String),
}

pub struct App {
    pub lot: ParkingLot,
    pub admin: AdminCredentials,
    pub analyst: Arc<dyn Analyst>,
    pub export_dir: PathBuf,

    pub screen: Screen,
    pub role: Role,
    pub current_view: View,
    pub should_quit: bool,

    // Login form
    pub login_user: String,
    pub login_password: String,
    pub login_field: LoginField,
    pub login_error: Option<String>,

    // Kiosk
    pub gate_mode: GateMode,
    pub plate_input: String,
    pub pending_invoice: Option<Invoice>,
    pub message: Option<Message>,

    // Map
    pub slot_state: TableState,

    // Reports
    pub analysis: Option<AnalysisResult>,

    // Settings
    pub pending_rate: u64,
    pub new_slot_label: String,
    pub new_slot_floor: i32,
}

impl App {
    pub fn new(
        lot: ParkingLot,
        admin: AdminCredentials,
        analyst: Arc<dyn Analyst>,
        export_dir: PathBuf,
    ) -> Self {
        let mut slot_state = TableState::default();
        if !lot.slots().is_empty() {
            slot_state.select(Some(0));
        }
        let pending_rate = lot.minute_rate();

        Self {
            lot,
            admin,
            analyst,
            export_dir,
            screen: Screen::Landing,
            role: Role::User,
            current_view: View::EntryExit,
            should_quit: false,
            login_user: String::new(),
            login_password: String::new(),
            login_field: LoginField::Username,
            login_error: None,
            gate_mode: GateMode::Entry,
            plate_input: String::new(),
            pending_invoice: None,
            message: None,
            slot_state,
            analysis: None,
            pending_rate,
            new_slot_label: String::new(),
            new_slot_floor: 1,
        }
    }

    // ========================================================================
    // NAVIGATION
    // ========================================================================

    pub fn launch(&mut self, role: Role) {
        self.role = role;
        self.current_view = role.landing_view();
        self.screen = Screen::Main;
        self.message = None;
    }

    pub fn go_home(&mut self) {
        self.screen = Screen::Landing;
        self.pending_invoice = None;
        self.plate_input.clear();
    }

    pub fn next_view(&mut self) {
        let views = self.role.views();
        if let Some(i) = views.iter().position(|v| *v == self.current_view) {
            self.current_view = views[(i + 1) % views.len()];
        }
    }

    pub fn previous_view(&mut self) {
        let views = self.role.views();
        if let Some(i) = views.iter().position(|v| *v == self.current_view) {
            self.current_view = views[(i + views.len() - 1) % views.len()];
        }
    }

    pub fn submit_login(&mut self) {
        match self.admin.authenticate(&self.login_user, &self.login_password) {
            Ok(role) => {
                self.login_user.clear();
                self.login_password.clear();
                self.login_error = None;
                self.launch(role);
            }
            Err(e) => {
                self.login_password.clear();
                self.login_error = Some(e.to_string());
            }
        }
    }

    // ========================================================================
    // KIOSK
    // ========================================================================

    pub fn toggle_gate_mode(&mut self) {
        self.gate_mode = match self.gate_mode {
            GateMode::Entry => GateMode::Exit,
            GateMode::Exit => GateMode::Entry,
        };
    }

    pub fn submit_plate(&mut self) {
        if self.plate_input.trim().is_empty() {
            return;
        }
        let plate = std::mem::take(&mut self.plate_input);

        match self.gate_mode {
            GateMode::Entry => match self.lot.enter(&plate) {
                Ok(slot) => {
                    self.message = Some(Message::Success(format!(
                        "Entry registered. Please park in slot {}",
                        slot.label
                    )))
                }
                Err(e) => self.message = Some(Message::Error(e.to_string())),
            },
            GateMode::Exit => match self.lot.request_exit(&plate) {
                Ok(invoice) => {
                    self.message = None;
                    self.pending_invoice = Some(invoice);
                }
                Err(e) => self.message = Some(Message::Error(e.to_string())),
            },
        }
    }

    pub fn confirm_payment(&mut self) {
        let Some(invoice) = self.pending_invoice.take() else {
            return;
        };

        self.message = Some(match self.lot.confirm_exit(&invoice) {
            Ok(_) => Message::Success(format!(
                "Exit completed. Amount received: {} SDG",
                invoice.total_cost
            )),
            Err(e) => Message::Error(e.to_string()),
        });
    }

    pub fn cancel_payment(&mut self) {
        self.pending_invoice = None;
    }

    // ========================================================================
    // MAP
    // ========================================================================

    pub fn next_slot(&mut self) {
        let len = self.lot.slots().len();
        if len == 0 {
            return;
        }
        let i = self.slot_state.selected().map_or(0, |i| (i + 1) % len);
        self.slot_state.select(Some(i));
    }

    pub fn previous_slot(&mut self) {
        let len = self.lot.slots().len();
        if len == 0 {
            return;
        }
        let i = self
            .slot_state
            .selected()
            .map_or(0, |i| if i == 0 { len - 1 } else { i - 1 });
        self.slot_state.select(Some(i));
    }

    /// Admin only: flip the selected slot between `status` and AVAILABLE
    pub fn toggle_selected_status(&mut self, status: SlotStatus) {
        if self.role != Role::Admin {
            return;
        }
        let Some(slot) = self
            .slot_state
            .selected()
            .and_then(|i| self.lot.slots().get(i))
        else {
            return;
        };

        let target = if slot.status == status {
            SlotStatus::Available
        } else {
            status
        };
        let id = slot.id;

        self.message = Some(match self.lot.set_slot_status(id, target) {
            Ok(slot) => Message::Success(format!("Slot {} is now {}", slot.label, slot.status)),
            Err(e) => Message::Error(e.to_string()),
        });
    }

    // ========================================================================
    // REPORTS
    // ========================================================================

    /// Ask the analyst; blocks the UI until it answers or fails
    pub fn run_analysis(&mut self) {
        let request = AnalysisRequest::from_lot(&self.lot);
        let result = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime.block_on(analyze_or_fallback(self.analyst.as_ref(), &request)),
            Err(e) => {
                tracing::warn!(error = %e, "could not start runtime for analysis");
                AnalysisResult::fallback()
            }
        };
        self.analysis = Some(result);
    }

    pub fn export(&mut self) {
        self.message = Some(match export_to_dir(self.lot.transactions(), &self.export_dir) {
            Ok(paths) => Message::Success(format!(
                "Exported {} transactions to {}",
                self.lot.transactions().len(),
                paths
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
            Err(e) => Message::Error(format!("Export failed: {:#}", e)),
        });
    }

    // ========================================================================
    // SETTINGS
    // ========================================================================

    pub fn apply_rate(&mut self) {
        self.message = Some(match self.lot.set_minute_rate(self.pending_rate) {
            Ok(()) => Message::Success(format!(
                "Minute rate updated to {} SDG",
                self.pending_rate
            )),
            Err(e) => Message::Error(e.to_string()),
        });
    }

    pub fn add_slot(&mut self) {
        let label = if self.new_slot_label.trim().is_empty() {
            self.lot.suggested_label()
        } else {
            std::mem::take(&mut self.new_slot_label)
        };

        self.message = Some(match self.lot.add_slot(&label, self.new_slot_floor) {
            Ok(slot) => Message::Success(format!("Slot {} added on floor {}", slot.label, slot.floor)),
            Err(e) => Message::Error(e.to_string()),
        });
    }

    // ========================================================================
    // INPUT
    // ========================================================================

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        match self.screen {
            Screen::Landing => self.handle_landing_key(key),
            Screen::Login => self.handle_login_key(key),
            Screen::Main if self.pending_invoice.is_some() => self.handle_payment_key(key),
            Screen::Main => self.handle_main_key(key),
        }
    }

    fn handle_landing_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('1') => self.launch(Role::User),
            KeyCode::Char('2') => {
                self.login_error = None;
                self.login_field = LoginField::Username;
                self.screen = Screen::Login;
            }
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            _ => {}
        }
    }

    fn login_input(&mut self) -> &mut String {
        match self.login_field {
            LoginField::Username => &mut self.login_user,
            LoginField::Password => &mut self.login_password,
        }
    }

    fn handle_login_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.screen = Screen::Landing,
            KeyCode::Enter => self.submit_login(),
            KeyCode::Tab | KeyCode::Up | KeyCode::Down => {
                self.login_field = match self.login_field {
                    LoginField::Username => LoginField::Password,
                    LoginField::Password => LoginField::Username,
                };
            }
            KeyCode::Backspace => {
                self.login_input().pop();
            }
            KeyCode::Char(c) => {
                let input = self.login_input();
                if input.len() < 32 {
                    input.push(c);
                }
            }
            _ => {}
        }
    }

    fn handle_payment_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter | KeyCode::Char('p') => self.confirm_payment(),
            KeyCode::Esc | KeyCode::Char('c') => self.cancel_payment(),
            _ => {}
        }
    }

    fn handle_main_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Tab => return self.next_view(),
            KeyCode::BackTab => return self.previous_view(),
            KeyCode::Esc => return self.go_home(),
            _ => {}
        }

        match self.current_view {
            View::EntryExit => match key.code {
                KeyCode::F(2) => self.toggle_gate_mode(),
                KeyCode::Enter => self.submit_plate(),
                KeyCode::Backspace => {
                    self.plate_input.pop();
                }
                KeyCode::Char(c)
                    if (c.is_alphanumeric() || c == '-' || c == ' ')
                        && self.plate_input.len() < MAX_PLATE_LEN =>
                {
                    self.plate_input.push(c.to_ascii_uppercase());
                }
                _ => {}
            },
            View::Settings => match key.code {
                KeyCode::Up => self.pending_rate = self.pending_rate.saturating_add(1),
                KeyCode::Down => self.pending_rate = self.pending_rate.saturating_sub(1).max(1),
                KeyCode::Right => self.new_slot_floor = self.new_slot_floor.saturating_add(1),
                KeyCode::Left => self.new_slot_floor = (self.new_slot_floor - 1).max(1),
                KeyCode::F(3) => self.apply_rate(),
                KeyCode::Enter => self.add_slot(),
                KeyCode::Backspace => {
                    self.new_slot_label.pop();
                }
                KeyCode::Char(c)
                    if (c.is_alphanumeric() || c == '-')
                        && self.new_slot_label.len() < MAX_LABEL_LEN =>
                {
                    self.new_slot_label.push(c.to_ascii_uppercase());
                }
                _ => {}
            },
            View::Map => match key.code {
                KeyCode::Down | KeyCode::Char('j') => self.next_slot(),
                KeyCode::Up | KeyCode::Char('k') => self.previous_slot(),
                KeyCode::Char('m') => self.toggle_selected_status(SlotStatus::Maintenance),
                KeyCode::Char('r') => self.toggle_selected_status(SlotStatus::Reserved),
                KeyCode::Char('q') => self.should_quit = true,
                _ => {}
            },
            View::Reports => match key.code {
                KeyCode::Char('a') => self.run_analysis(),
                KeyCode::Char('x') => self.export(),
                KeyCode::Char('q') => self.should_quit = true,
                _ => {}
            },
            View::Dashboard | View::Tasks => {
                if key.code == KeyCode::Char('q') {
                    self.should_quit = true;
                }
            }
        }
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        tracing::error!(error = %err, "terminal UI stopped");
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        // Redraw once a second so parking timers keep ticking
        if event::poll(StdDuration::from_secs(1))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key);
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let area = f.size();
    match app.screen {
        Screen::Landing => return render_landing(f, area),
        Screen::Login => return render_login(f, area, app),
        Screen::Main => {}
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(area);

    render_header(f, chunks[0], app);

    match app.current_view {
        View::Dashboard => render_dashboard(f, chunks[1], app),
        View::Map => render_map(f, chunks[1], app),
        View::EntryExit => render_entry_exit(f, chunks[1], app),
        View::Reports => render_reports(f, chunks[1], app),
        View::Tasks => render_tasks(f, chunks[1]),
        View::Settings => render_settings(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);

    if let Some(invoice) = &app.pending_invoice {
        render_payment_modal(f, invoice);
    }
}

fn render_landing(f: &mut Frame, area: Rect) {
    let content = vec![
        Line::from(""),
        Line::from(Span::styled(
            "SmartPark",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from("Smart parking management"),
        Line::from(""),
        Line::from(vec![
            Span::styled("  1  ", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
            Span::raw("Driver / visitor  (map and entry/exit kiosk)"),
        ]),
        Line::from(vec![
            Span::styled("  2  ", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
            Span::raw("Administrator     (login required)"),
        ]),
        Line::from(""),
        Line::from(Span::styled("q  Quit", Style::default().fg(Color::DarkGray))),
    ];

    let landing = Paragraph::new(content).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(landing, centered_rect(60, 50, area));
}

fn render_login(f: &mut Frame, area: Rect, app: &App) {
    let field_style = |field: LoginField| {
        if app.login_field == field {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        }
    };

    let mut content = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled("Username: ", field_style(LoginField::Username)),
            Span::raw(app.login_user.clone()),
        ]),
        Line::from(vec![
            Span::styled("Password: ", field_style(LoginField::Password)),
            Span::raw("*".repeat(app.login_password.chars().count())),
        ]),
        Line::from(""),
    ];
    if let Some(error) = &app.login_error {
        content.push(Line::from(Span::styled(error.clone(), Style::default().fg(Color::Red))));
    }
    content.push(Line::from(Span::styled(
        "Tab switch field | Enter login | Esc back",
        Style::default().fg(Color::DarkGray),
    )));

    let login = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Administrator login "),
    );
    f.render_widget(login, centered_rect(50, 40, area));
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let stats = app.lot.stats();

    let mut tab_spans = vec![];
    for (i, view) in app.role.views().iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *view == app.current_view {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(view.title(), style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Free: {}", stats.available),
        Style::default().fg(Color::Green),
    ));
    tab_spans.push(Span::raw("  "));
    tab_spans.push(Span::styled(
        format!("Busy: {}", stats.occupied),
        Style::default().fg(Color::Red),
    ));
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        match app.role {
            Role::Admin => "Administrator",
            Role::User => "Driver",
        },
        Style::default().fg(Color::White),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_dashboard(f: &mut Frame, area: Rect, app: &App) {
    let stats = app.lot.stats();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(0)])
        .split(area);

    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(25); 4])
        .split(chunks[0]);

    let card_values = [
        ("Total slots", stats.total_slots.to_string(), Color::Blue),
        (
            "Occupied",
            format!("{} ({}%)", stats.occupied, stats.occupancy_percent),
            Color::Red,
        ),
        ("Available", stats.available.to_string(), Color::Green),
        ("Revenue", format!("{} SDG", stats.revenue), Color::Yellow),
    ];
    for (i, (title, value, color)) in card_values.into_iter().enumerate() {
        let card = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(value, Style::default().fg(color).add_modifier(Modifier::BOLD))),
        ])
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title(format!(" {} ", title)));
        f.render_widget(card, cards[i]);
    }

    let header = Row::new(
        ["Plate", "Event", "Time", "Slot", "Cost"]
            .iter()
            .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))),
    )
    .style(Style::default().bg(Color::DarkGray));

    let recent = app.lot.recent_transactions(8);
    let rows = recent.iter().map(|tx| {
        let (event, color) = match tx.status {
            TransactionStatus::Active => ("Entry", Color::Blue),
            TransactionStatus::Completed => ("Exit", Color::Green),
        };
        Row::new(vec![
            Cell::from(tx.plate_number.clone()),
            Cell::from(event).style(Style::default().fg(color)),
            Cell::from(tx.entry_time.format("%H:%M").to_string()),
            Cell::from(tx.slot_label.clone()),
            Cell::from(tx.cost.map(|c| format!("{} SDG", c)).unwrap_or_default()),
        ])
    });

    let title = if recent.is_empty() {
        " Latest activity - no transactions yet "
    } else {
        " Latest activity "
    };

    let table = Table::new(
        rows,
        [
            Constraint::Length(14),
            Constraint::Length(8),
            Constraint::Length(8),
            Constraint::Length(10),
            Constraint::Length(12),
        ],
    )
    .header(header)
    .block(Block::default().borders(Borders::ALL).title(title));

    f.render_widget(table, chunks[1]);
}

fn render_map(f: &mut Frame, area: Rect, app: &mut App) {
    let now = app.lot.now();
    let rate = app.lot.minute_rate();

    let header = Row::new(
        ["Slot", "Floor", "Status", "Plate", "Parked", "Due"]
            .iter()
            .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))),
    )
    .style(Style::default().bg(Color::DarkGray))
    .height(1);

    let rows = app.lot.slots().iter().map(|slot| {
        let color = status_color(slot.status);
        let (parked, due) = match slot.entry_time {
            Some(entry) => (
                format_elapsed(now - entry),
                format!("{} SDG", compute_cost(entry, now, rate)),
            ),
            None => (String::new(), String::new()),
        };

        Row::new(vec![
            Cell::from(slot.label.clone()),
            Cell::from(slot.floor.to_string()),
            Cell::from(slot.status.as_str()).style(Style::default().fg(color)),
            Cell::from(slot.occupied_by.clone().unwrap_or_default()),
            Cell::from(parked),
            Cell::from(due),
        ])
        .height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(10),
            Constraint::Length(7),
            Constraint::Length(13),
            Constraint::Length(14),
            Constraint::Length(10),
            Constraint::Length(12),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(format!(" Live slot map - {} SDG / minute ", rate)),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.slot_state);
}

fn render_entry_exit(f: &mut Frame, area: Rect, app: &App) {
    let available = app.lot.stats().available;

    let mode_span = |mode: GateMode, label: &'static str| {
        if app.gate_mode == mode {
            Span::styled(
                format!(" {} ", label),
                Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD),
            )
        } else {
            Span::styled(format!(" {} ", label), Style::default().fg(Color::DarkGray))
        }
    };

    let mut content = vec![
        Line::from(""),
        Line::from(Span::styled(
            "Self-service gate",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![
            mode_span(GateMode::Entry, "ENTRY - new ticket"),
            Span::raw("   "),
            mode_span(GateMode::Exit, "EXIT - pay and leave"),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::raw("Plate number: "),
            Span::styled(
                format!("{}_", app.plate_input),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            format!("{} slots available", available),
            Style::default().fg(if available > 0 { Color::Green } else { Color::Red }),
        )),
        Line::from(""),
    ];

    if let Some(line) = message_line(&app.message) {
        content.push(line);
    }

    let kiosk = Paragraph::new(content)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(" Entry / Exit "));
    f.render_widget(kiosk, area);
}

fn render_payment_modal(f: &mut Frame, invoice: &Invoice) {
    let area = centered_rect(50, 50, f.size());

    let row = |label: &str, value: String| {
        Line::from(vec![
            Span::styled(format!("{:<16}", label), Style::default().fg(Color::DarkGray)),
            Span::raw(value),
        ])
    };

    let content = vec![
        Line::from(""),
        row("Plate", invoice.plate_number.clone()),
        row("Slot", invoice.slot_label.clone()),
        row("Entry", invoice.entry_time.format("%H:%M:%S").to_string()),
        row("Exit", invoice.exit_time.format("%H:%M:%S").to_string()),
        row("Duration", format!("{} min", invoice.duration_minutes)),
        row("Rate", format!("{} SDG / min", invoice.rate_per_minute)),
        Line::from(""),
        Line::from(vec![
            Span::styled(format!("{:<16}", "TOTAL"), Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(
                format!("{} SDG", invoice.total_cost),
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "Enter/p pay and open gate | Esc/c cancel",
            Style::default().fg(Color::Yellow),
        )),
    ];

    let modal = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green))
            .title(" Invoice "),
    );

    f.render_widget(Clear, area);
    f.render_widget(modal, area);
}

fn render_reports(f: &mut Frame, area: Rect, app: &App) {
    let stats = app.lot.stats();
    let completed = app
        .lot
        .transactions()
        .iter()
        .filter(|tx| tx.status == TransactionStatus::Completed)
        .count();

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    let mut summary = vec![
        Line::from(""),
        Line::from(format!("  Total slots:        {}", stats.total_slots)),
        Line::from(format!("  Occupied:           {}", stats.occupied)),
        Line::from(format!("  Available:          {}", stats.available)),
        Line::from(format!("  Reserved:           {}", stats.reserved)),
        Line::from(format!("  Maintenance:        {}", stats.maintenance)),
        Line::from(format!("  Occupancy:          {}%", stats.occupancy_percent)),
        Line::from(""),
        Line::from(format!("  Transactions:       {}", app.lot.transactions().len())),
        Line::from(format!("  Completed:          {}", completed)),
        Line::from(Span::styled(
            format!("  Revenue:            {} SDG", stats.revenue),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    if let Some(line) = message_line(&app.message) {
        summary.push(line);
    }

    let summary = Paragraph::new(summary)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(" Summary "));
    f.render_widget(summary, chunks[0]);

    let analysis = match &app.analysis {
        Some(result) => {
            let mut lines = vec![
                Line::from(""),
                Line::from(vec![
                    Span::raw("  Efficiency score: "),
                    Span::styled(
                        format!("{:.0}/100", result.efficiency_score),
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    ),
                ]),
                Line::from(format!("  Peak time:        {}", result.peak_time_prediction)),
                Line::from(format!("  Pricing:          {}", result.pricing_suggestion)),
                Line::from(""),
                Line::from("  Recommendations:"),
            ];
            lines.extend(
                result
                    .recommendations
                    .iter()
                    .map(|r| Line::from(format!("    • {}", r))),
            );
            lines
        }
        None => vec![
            Line::from(""),
            Line::from("  Press 'a' to analyze occupancy and revenue."),
        ],
    };

    let analysis = Paragraph::new(analysis)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(" AI analysis "));
    f.render_widget(analysis, chunks[1]);
}

fn render_tasks(f: &mut Frame, area: Rect) {
    let mut lines = vec![];
    for (i, section) in task_sections().iter().enumerate() {
        lines.push(Line::from(Span::styled(
            format!("{}. {}", i + 1, section.title),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )));
        let (mark, color) = if section.done {
            ("✔", Color::Green)
        } else {
            ("○", Color::DarkGray)
        };
        for item in section.items {
            lines.push(Line::from(vec![
                Span::styled(format!("   {} ", mark), Style::default().fg(color)),
                Span::raw(*item),
            ]));
        }
        lines.push(Line::from(""));
    }

    let tasks = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Project tasks "));
    f.render_widget(tasks, area);
}

fn render_settings(f: &mut Frame, area: Rect, app: &App) {
    let label_preview = if app.new_slot_label.is_empty() {
        Span::styled(
            format!("{} (suggested)", app.lot.suggested_label()),
            Style::default().fg(Color::DarkGray),
        )
    } else {
        Span::styled(
            format!("{}_", app.new_slot_label),
            Style::default().fg(Color::Yellow),
        )
    };

    let mut content = vec![
        Line::from(""),
        Line::from(Span::styled("  Pricing", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))),
        Line::from(format!("  Current rate:  {} SDG / minute", app.lot.minute_rate())),
        Line::from(vec![
            Span::raw("  New rate:      "),
            Span::styled(
                format!("{} SDG / minute", app.pending_rate),
                Style::default().fg(Color::Yellow),
            ),
            Span::styled("   (↑/↓ change, F3 save)", Style::default().fg(Color::DarkGray)),
        ]),
        Line::from(""),
        Line::from(Span::styled("  Add slot", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))),
        Line::from(vec![Span::raw("  Label:         "), label_preview]),
        Line::from(vec![
            Span::raw(format!("  Floor:         {}", app.new_slot_floor)),
            Span::styled("   (←/→ change, Enter add)", Style::default().fg(Color::DarkGray)),
        ]),
        Line::from(format!("  Slots in lot:  {}", app.lot.slots().len())),
        Line::from(""),
    ];
    if let Some(line) = message_line(&app.message) {
        content.push(line);
    }

    let settings = Paragraph::new(content)
        .block(Block::default().borders(Borders::ALL).title(" System settings "));
    f.render_widget(settings, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let hints: &[(&str, &str)] = match app.current_view {
        View::EntryExit => &[("type", "plate"), ("Enter", "submit"), ("F2", "entry/exit")],
        View::Map if app.role == Role::Admin => {
            &[("↑/↓", "select"), ("m", "maintenance"), ("r", "reserve"), ("q", "quit")]
        }
        View::Map => &[("↑/↓", "select"), ("q", "quit")],
        View::Reports => &[("a", "analyze"), ("x", "export"), ("q", "quit")],
        View::Settings => &[("type", "label"), ("Enter", "add slot"), ("F3", "save rate")],
        View::Dashboard | View::Tasks => &[("q", "quit")],
    };

    let mut status_spans = vec![];
    for (key, action) in hints.iter().chain([("Tab", "view"), ("Esc", "home")].iter()) {
        status_spans.push(Span::styled(format!(" {}", key), Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(format!(" {} |", action)));
    }

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn message_line(message: &Option<Message>) -> Option<Line<'static>> {
    match message {
        Some(Message::Success(text)) => Some(Line::from(Span::styled(
            format!("✔ {}", text),
            Style::default().fg(Color::Green),
        ))),
        Some(Message::Error(text)) => Some(Line::from(Span::styled(
            format!("✖ {}", text),
            Style::default().fg(Color::Red),
        ))),
        None => None,
    }
}

fn status_color(status: SlotStatus) -> Color {
    match status {
        SlotStatus::Available => Color::Green,
        SlotStatus::Occupied => Color::Red,
        SlotStatus::Reserved => Color::Yellow,
        SlotStatus::Maintenance => Color::DarkGray,
    }
}

fn format_elapsed(elapsed: chrono::Duration) -> String {
    let minutes = elapsed.num_minutes().max(0);
    format!("{}h {}m", minutes / 60, minutes % 60)
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use smart_park::{GeminiAnalyst, SlotRegistry};

    fn app(slots: u32) -> App {
        App::new(
            ParkingLot::new(SlotRegistry::with_capacity(slots), 10),
            AdminCredentials::default(),
            Arc::new(GeminiAnalyst::new(None, "test-model")),
            std::env::temp_dir(),
        )
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[test]
    fn test_driver_only_cycles_allowed_views() {
        let mut app = app(2);
        press(&mut app, KeyCode::Char('1'));

        assert_eq!(app.screen, Screen::Main);
        assert_eq!(app.current_view, View::EntryExit);

        press(&mut app, KeyCode::Tab);
        assert_eq!(app.current_view, View::Map);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.current_view, View::EntryExit);
    }

    #[test]
    fn test_admin_login_flow() {
        let mut app = app(2);
        press(&mut app, KeyCode::Char('2'));
        assert_eq!(app.screen, Screen::Login);

        type_text(&mut app, "admin");
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "0000");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.screen, Screen::Login);
        assert!(app.login_error.is_some());

        type_text(&mut app, "1234");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.screen, Screen::Main);
        assert_eq!(app.role, Role::Admin);
        assert_eq!(app.current_view, View::Dashboard);
    }

    #[test]
    fn test_kiosk_entry_and_paid_exit() {
        let mut app = app(2);
        press(&mut app, KeyCode::Char('1'));

        type_text(&mut app, "ksa-1234");
        press(&mut app, KeyCode::Enter);
        assert!(matches!(app.message, Some(Message::Success(_))));
        assert_eq!(app.lot.stats().occupied, 1);

        press(&mut app, KeyCode::F(2));
        type_text(&mut app, "KSA-1234");
        press(&mut app, KeyCode::Enter);
        let invoice = app.pending_invoice.clone().unwrap();
        assert_eq!(invoice.plate_number, "KSA-1234");
        assert_eq!(app.lot.stats().occupied, 1);

        press(&mut app, KeyCode::Enter);
        assert!(app.pending_invoice.is_none());
        assert_eq!(app.lot.stats().occupied, 0);
        assert_eq!(app.lot.stats().revenue, invoice.total_cost);
    }

    #[test]
    fn test_cancelled_payment_keeps_vehicle() {
        let mut app = app(2);
        press(&mut app, KeyCode::Char('1'));
        type_text(&mut app, "P1");
        press(&mut app, KeyCode::Enter);

        press(&mut app, KeyCode::F(2));
        type_text(&mut app, "P1");
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Esc);

        assert!(app.pending_invoice.is_none());
        assert_eq!(app.screen, Screen::Main);
        assert_eq!(app.lot.stats().occupied, 1);
    }

    #[test]
    fn test_driver_cannot_change_slot_status() {
        let mut app = app(2);
        press(&mut app, KeyCode::Char('1'));
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.current_view, View::Map);

        press(&mut app, KeyCode::Char('m'));
        assert_eq!(app.lot.slots()[0].status, SlotStatus::Available);
    }

    #[test]
    fn test_settings_rate_and_slot() {
        let mut app = app(2);
        app.launch(Role::Admin);
        app.current_view = View::Settings;

        press(&mut app, KeyCode::Up);
        press(&mut app, KeyCode::Up);
        press(&mut app, KeyCode::F(3));
        assert_eq!(app.lot.minute_rate(), 12);

        press(&mut app, KeyCode::Enter);
        assert_eq!(app.lot.slots().len(), 3);
        assert_eq!(app.lot.slots()[2].label, "A-3");
    }
}
