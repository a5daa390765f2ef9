// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod console;

pub use console::*;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use orderdesk_app::{
    ClockPreview, ControlName, ControlState, HostPage, Job, JobReport, JobResult, LookupOutcome,
    OrderStatus, RenumberAction, Session, StateStore, Tint, Transport, UpdateOutcome,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap};
use std::io;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

const POLL_INTERVAL: Duration = Duration::from_millis(120);
const STATUS_CLEAR_AFTER: Duration = Duration::from_secs(4);
const PENDING_MARK: &str = "…";
const EXPANDED_MARK: &str = "▾";
const COLLAPSED_MARK: &str = "▸";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
    JobDone(JobResult),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Focus {
    #[default]
    Grid,
    Sections,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum DialogStage {
    Input,
    Confirm { prompt: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RenumberDialog {
    action: RenumberAction,
    input: String,
    stage: DialogStage,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct ViewData {
    focus: Focus,
    selected_row: usize,
    selected_section: usize,
    dialog: Option<RenumberDialog>,
    help_visible: bool,
    status_line: Option<String>,
    status_token: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum KeyOutcome {
    Continue,
    Spawn(Job),
    Quit,
}

pub fn run_app<S: StateStore>(
    session: &mut Session<ConsolePage, S>,
    transport: Arc<dyn Transport + Send + Sync>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::default();
    let (internal_tx, internal_rx) = mpsc::channel();
    let started = Instant::now();

    let restored = session.ready();
    if !restored.is_empty() {
        debug!(sections = ?restored, "restored expanded sections");
    }

    let mut result = Ok(());
    loop {
        session.tick(started.elapsed());
        process_internal_events(session, &mut view_data, &internal_tx, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, session, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let wait = poll_timeout(session, started.elapsed());
        let has_event = event::poll(wait).context("poll event")?;
        if has_event {
            match event::read().context("read event")? {
                Event::Key(key) => {
                    match handle_key_event(session, &mut view_data, &internal_tx, key) {
                        KeyOutcome::Continue => {}
                        KeyOutcome::Spawn(job) => spawn_job(job, &transport, &internal_tx),
                        KeyOutcome::Quit => break,
                    }
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }

    // Capture once more so a quit inside the settle window is not lost.
    session.form_submitted();

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn poll_timeout<S: StateStore>(session: &Session<ConsolePage, S>, now: Duration) -> Duration {
    session
        .timers()
        .next_deadline()
        .map(|deadline| deadline.saturating_sub(now).min(POLL_INTERVAL))
        .unwrap_or(POLL_INTERVAL)
}

fn spawn_job(
    job: Job,
    transport: &Arc<dyn Transport + Send + Sync>,
    internal_tx: &Sender<InternalEvent>,
) {
    let transport = Arc::clone(transport);
    let sender = internal_tx.clone();
    thread::spawn(move || {
        let result = job.execute(transport.as_ref());
        let _ = sender.send(InternalEvent::JobDone(result));
    });
}

fn process_internal_events<S: StateStore>(
    session: &mut Session<ConsolePage, S>,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                view_data.status_line = None;
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::JobDone(result) => {
                if let Some(report) = session.complete(result) {
                    report_job(view_data, tx, &report);
                }
            }
        }
    }
}

fn report_job(view_data: &mut ViewData, tx: &Sender<InternalEvent>, report: &JobReport) {
    match report {
        JobReport::Update(Some(UpdateOutcome::Failed(error))) => {
            emit_status(view_data, tx, format!("update not delivered: {error}"));
        }
        JobReport::Lookup(LookupOutcome::Failed { reason }) => {
            emit_status(view_data, tx, format!("price lookup failed: {reason}"));
        }
        JobReport::Lookup(LookupOutcome::Superseded) => {
            debug!("dropped price for a superseded selection");
        }
        JobReport::Visit {
            url,
            started: false,
        } => {
            emit_status(view_data, tx, format!("renumber job not started: {url}"));
        }
        _ => {}
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(STATUS_CLEAR_AFTER);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    view_data.status_line = Some(message.into());
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn handle_key_event<S: StateStore>(
    session: &mut Session<ConsolePage, S>,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> KeyOutcome {
    if key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q'))
    {
        return KeyOutcome::Quit;
    }

    if view_data.dialog.is_some() {
        return handle_dialog_key(session, view_data, internal_tx, key);
    }

    if view_data.help_visible {
        view_data.help_visible = false;
        return KeyOutcome::Continue;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return KeyOutcome::Quit,
        KeyCode::Char('?') => view_data.help_visible = true,
        KeyCode::Tab => {
            view_data.focus = match view_data.focus {
                Focus::Grid => Focus::Sections,
                Focus::Sections => Focus::Grid,
            };
        }
        KeyCode::Char('s') => {
            let captured = session.form_submitted();
            emit_status(
                view_data,
                internal_tx,
                format!("saved layout: {} open section(s)", captured.len()),
            );
        }
        KeyCode::Char('R') => open_renumber_dialog(view_data, RenumberAction::Orders),
        KeyCode::Char('K') => open_renumber_dialog(view_data, RenumberAction::Skus),
        KeyCode::Char('z') => change_zone(session, view_data, internal_tx, 1),
        KeyCode::Char('Z') => change_zone(session, view_data, internal_tx, -1),
        _ => {
            return match view_data.focus {
                Focus::Grid => handle_grid_key(session, view_data, internal_tx, key),
                Focus::Sections => {
                    handle_sections_key(session, view_data, key);
                    KeyOutcome::Continue
                }
            };
        }
    }
    KeyOutcome::Continue
}

fn handle_grid_key<S: StateStore>(
    session: &mut Session<ConsolePage, S>,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> KeyOutcome {
    let rows = session.page().map(ConsolePage::row_count).unwrap_or(0);
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            view_data.selected_row = move_cursor(view_data.selected_row, 1, rows);
            KeyOutcome::Continue
        }
        KeyCode::Char('k') | KeyCode::Up => {
            view_data.selected_row = move_cursor(view_data.selected_row, -1, rows);
            KeyOutcome::Continue
        }
        KeyCode::Char('l') | KeyCode::Right => {
            rotate_status(session, view_data, internal_tx, 1)
        }
        KeyCode::Char('h') | KeyCode::Left => {
            rotate_status(session, view_data, internal_tx, -1)
        }
        KeyCode::Char(']') => change_product(session, view_data, internal_tx, 1),
        KeyCode::Char('[') => change_product(session, view_data, internal_tx, -1),
        _ => KeyOutcome::Continue,
    }
}

fn handle_sections_key<S: StateStore>(
    session: &mut Session<ConsolePage, S>,
    view_data: &mut ViewData,
    key: KeyEvent,
) {
    let count = session
        .page()
        .map(|page| page.section_views().len())
        .unwrap_or(0);
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            view_data.selected_section = move_cursor(view_data.selected_section, 1, count);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            view_data.selected_section = move_cursor(view_data.selected_section, -1, count);
        }
        KeyCode::Enter | KeyCode::Char(' ') => {
            let toggled = session
                .page_mut()
                .is_some_and(|page| page.toggle_section(view_data.selected_section));
            if toggled {
                session.section_toggled();
            }
        }
        _ => {}
    }
}

/// Applies an operator edit and hands the change to the session, the way a
/// browser fires `change` after the value moved.
fn apply_edit<S: StateStore>(
    session: &mut Session<ConsolePage, S>,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    control: &ControlName,
    value: &str,
) -> KeyOutcome {
    let Some(page) = session.page_mut() else {
        return KeyOutcome::Continue;
    };
    if !page.edit(control, value) {
        emit_status(view_data, internal_tx, format!("{control} is saving; wait"));
        return KeyOutcome::Continue;
    }
    match session.control_changed(control) {
        Some(job) => KeyOutcome::Spawn(job),
        None => KeyOutcome::Continue,
    }
}

fn rotate_status<S: StateStore>(
    session: &mut Session<ConsolePage, S>,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    delta: isize,
) -> KeyOutcome {
    let Some(page) = session.page() else {
        return KeyOutcome::Continue;
    };
    let control = page.status_control(view_data.selected_row);
    let Some(current) = page.control_value(&control) else {
        return KeyOutcome::Continue;
    };
    let next = OrderStatus::parse(&current)
        .unwrap_or(OrderStatus::Created)
        .rotate(delta);
    apply_edit(session, view_data, internal_tx, &control, next.as_str())
}

fn change_product<S: StateStore>(
    session: &mut Session<ConsolePage, S>,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    delta: isize,
) -> KeyOutcome {
    let Some(page) = session.page() else {
        return KeyOutcome::Continue;
    };
    let control = page.product_control(view_data.selected_row);
    let Some(current) = page.control_value(&control) else {
        return KeyOutcome::Continue;
    };
    let next = page
        .cycle_product(current.trim().parse().ok(), delta)
        .map(|id| id.to_string())
        .unwrap_or_default();
    apply_edit(session, view_data, internal_tx, &control, &next)
}

/// Moves the site time zone selector and redraws the clock preview.
fn change_zone<S: StateStore>(
    session: &mut Session<ConsolePage, S>,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    delta: isize,
) {
    let Some(page) = session.page_mut() else {
        return;
    };
    let zone = cycle_zone(page.time_zone().as_deref(), delta);
    if !page.select_time_zone(zone) {
        emit_status(view_data, internal_tx, "this page has no time zone selector");
        return;
    }
    if let Some(preview) = session.zone_changed() {
        debug!(zone = %preview.zone, valid = preview.valid, "time zone changed");
    }
}

fn open_renumber_dialog(view_data: &mut ViewData, action: RenumberAction) {
    view_data.dialog = Some(RenumberDialog {
        action,
        input: String::new(),
        stage: DialogStage::Input,
    });
}

fn handle_dialog_key<S: StateStore>(
    session: &mut Session<ConsolePage, S>,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> KeyOutcome {
    let Some(dialog) = view_data.dialog.as_mut() else {
        return KeyOutcome::Continue;
    };
    let confirming = matches!(dialog.stage, DialogStage::Confirm { .. });
    match key.code {
        KeyCode::Esc => view_data.dialog = None,
        KeyCode::Char('n') if confirming => view_data.dialog = None,
        KeyCode::Char('y') | KeyCode::Enter if confirming => {
            let action = dialog.action;
            let input = dialog.input.clone();
            view_data.dialog = None;
            if let Some(page) = session.page_mut() {
                page.arm_confirm(true);
            }
            match session.request_renumber(action, &input) {
                Ok(Some(job)) => {
                    if let Job::Visit { url } = &job {
                        info!(url = %url, "renumber requested");
                        emit_status(view_data, internal_tx, format!("requested {url}"));
                    }
                    return KeyOutcome::Spawn(job);
                }
                Ok(None) => {}
                Err(error) => emit_status(view_data, internal_tx, error.to_string()),
            }
        }
        KeyCode::Char(ch) if !confirming && ch.is_ascii_digit() => dialog.input.push(ch),
        KeyCode::Backspace if !confirming => {
            dialog.input.pop();
        }
        KeyCode::Enter => match dialog.input.trim().parse::<u64>() {
            Ok(start) => {
                dialog.stage = DialogStage::Confirm {
                    prompt: dialog.action.prompt(start),
                };
            }
            Err(_) => emit_status(view_data, internal_tx, "enter a start number first"),
        },
        _ => {}
    }
    KeyOutcome::Continue
}

fn move_cursor(current: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    current.saturating_add_signed(delta).min(len - 1)
}

fn render<S: StateStore>(
    frame: &mut ratatui::Frame<'_>,
    session: &Session<ConsolePage, S>,
    view_data: &ViewData,
) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
            Constraint::Length(2),
        ])
        .split(frame.area());

    let Some(page) = session.page() else {
        let empty = Paragraph::new("no page attached")
            .block(Block::default().title("orderdesk").borders(Borders::ALL));
        frame.render_widget(empty, frame.area());
        return;
    };

    let in_flight = session.dispatcher().in_flight_count();
    let mut header = vec![Span::raw(header_text(page, in_flight))];
    if let Some(clock) = page.clock() {
        header.push(Span::raw(" | "));
        header.push(Span::styled(clock.text.clone(), clock_style(clock)));
    }
    let header = Paragraph::new(Line::from(header))
        .block(Block::default().title("orderdesk").borders(Borders::ALL));
    frame.render_widget(header, layout[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(layout[1]);
    render_grid(frame, body[0], page, view_data);
    render_sections(frame, body[1], page, view_data);

    let toast = match page.toast() {
        Some(toast) => Paragraph::new(toast.message.clone()).style(
            Style::default()
                .fg(Color::White)
                .bg(hex_color(toast.severity.surface_color()))
                .add_modifier(Modifier::BOLD),
        ),
        None => Paragraph::new(String::new()),
    };
    frame.render_widget(toast.block(Block::default().borders(Borders::ALL)), layout[2]);

    let status = Paragraph::new(status_text(view_data)).style(Style::default().fg(Color::Yellow));
    frame.render_widget(status, layout[3]);

    if let Some(dialog) = &view_data.dialog {
        let area = centered_rect(60, 35, frame.area());
        frame.render_widget(Clear, area);
        let title = match dialog.action {
            RenumberAction::Skus => "renumber SKUs",
            RenumberAction::Orders => "renumber orders",
        };
        let widget = Paragraph::new(dialog_text(dialog))
            .wrap(Wrap { trim: false })
            .block(Block::default().title(title).borders(Borders::ALL));
        frame.render_widget(widget, area);
    }

    if view_data.help_visible {
        let area = centered_rect(70, 50, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn render_grid(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    page: &ConsolePage,
    view_data: &ViewData,
) {
    let header = Row::new(["order", "customer", "status", "product", "price"].map(|label| {
        Cell::from(label).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    }));

    let rows = (0..page.row_count()).map(|row| {
        let selected = row == view_data.selected_row && view_data.focus == Focus::Grid;
        let identity = page.control_value(&page.identity_control(row)).unwrap_or_default();
        let product = page.control_value(&page.product_control(row)).unwrap_or_default();
        let product_label = product
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(|id| page.product_name(id))
            .map(str::to_owned)
            .unwrap_or(product);

        let cells = vec![
            Cell::from(format!("#{identity}")),
            Cell::from(page.customer(row).unwrap_or_default().to_owned()),
            control_cell(page.control(&page.status_control(row))),
            Cell::from(product_label),
            control_cell(page.control(&page.price_control(row))),
        ];
        let style = if selected {
            Style::default().bg(Color::DarkGray)
        } else {
            Style::default()
        };
        Row::new(cells).style(style)
    });

    let widths = [
        Constraint::Length(8),
        Constraint::Min(10),
        Constraint::Length(14),
        Constraint::Min(14),
        Constraint::Length(12),
    ];
    let table = Table::new(rows, widths).header(header).block(
        Block::default()
            .borders(Borders::ALL)
            .title(page.path())
            .border_style(focus_border(view_data.focus == Focus::Grid)),
    );
    frame.render_widget(table, area);
}

fn render_sections(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    page: &ConsolePage,
    view_data: &ViewData,
) {
    let lines = page
        .section_views()
        .iter()
        .map(|section| {
            let line = Line::from(section_line_text(section.expanded, &section.title));
            if view_data.focus == Focus::Sections && section.index == view_data.selected_section {
                line.style(Style::default().fg(Color::Black).bg(Color::Cyan))
            } else {
                line
            }
        })
        .collect::<Vec<_>>();
    let widget = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("sections")
            .border_style(focus_border(view_data.focus == Focus::Sections)),
    );
    frame.render_widget(widget, area);
}

fn focus_border(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    }
}

fn control_cell(control: Option<&ConsoleControl>) -> Cell<'static> {
    let Some(control) = control else {
        return Cell::from(String::new());
    };
    Cell::from(control_text(control)).style(control_style(control))
}

fn control_text(control: &ConsoleControl) -> String {
    match control.state {
        ControlState::Pending => format!("{} {PENDING_MARK}", control.value),
        ControlState::Editable => control.value.clone(),
    }
}

/// Tint maps to the cell background; a disabled control is dimmed.
fn control_style(control: &ConsoleControl) -> Style {
    let mut style = Style::default();
    if let Some(tint) = control.tint {
        style = style.bg(tint_color(tint)).fg(Color::Black);
    }
    if control.state.is_disabled() {
        style = style.fg(Color::DarkGray).add_modifier(Modifier::DIM);
    }
    style
}

/// A valid preview is bold in its color; the invalid-zone warning is plain.
fn clock_style(clock: &ClockPreview) -> Style {
    match clock.color() {
        Some(color) => Style::default()
            .fg(hex_color(color))
            .add_modifier(Modifier::BOLD),
        None => Style::default(),
    }
}

fn tint_color(tint: Tint) -> Color {
    hex_color(tint.color())
}

fn hex_color(hex: &str) -> Color {
    let digits = hex.trim_start_matches('#');
    if digits.len() != 6 {
        return Color::Reset;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&digits[range], 16).ok();
    match (channel(0..2), channel(2..4), channel(4..6)) {
        (Some(r), Some(g), Some(b)) => Color::Rgb(r, g, b),
        _ => Color::Reset,
    }
}

fn section_line_text(expanded: bool, title: &str) -> String {
    let mark = if expanded { EXPANDED_MARK } else { COLLAPSED_MARK };
    format!("{mark} {title}")
}

fn header_text(page: &ConsolePage, in_flight: usize) -> String {
    if in_flight == 0 {
        format!("{} | {} orders", page.path(), page.row_count())
    } else {
        format!(
            "{} | {} orders | {in_flight} saving",
            page.path(),
            page.row_count()
        )
    }
}

fn dialog_text(dialog: &RenumberDialog) -> String {
    match &dialog.stage {
        DialogStage::Input => format!(
            "start number: {}_\n\nenter continue | esc cancel",
            dialog.input
        ),
        DialogStage::Confirm { prompt } => format!("{prompt}\n\ny confirm | n cancel"),
    }
}

fn status_text(view_data: &ViewData) -> String {
    let default = match view_data.focus {
        Focus::Grid => {
            "j/k row | h/l status | [/] product | R/K renumber | z zone | tab sections | ? help"
        }
        Focus::Sections => "j/k section | space toggle | tab grid | s save | ? help | q quit",
    };
    match &view_data.status_line {
        Some(status) => format!("{status} | {default}"),
        None => default.to_owned(),
    }
}

fn help_overlay_text() -> &'static str {
    "grid: j/k move | h/l previous/next status | [/] previous/next product\n\
sections: j/k move | space or enter toggle\n\
global: tab switch focus | s submit (save section layout) | z/Z time zone | ctrl+q quit\n\
renumber: R orders | K SKUs | digits then enter, y confirm, esc cancel\n\
any key closes this help"
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
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
        .split(popup_layout[1])[1]
}
