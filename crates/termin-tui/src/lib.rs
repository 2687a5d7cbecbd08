// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use termin_app::{
    Column, ConfigKey, Controller, EditView, EntryGateway, HeaderCell, ImportOutcome, LoadOutcome,
    LoadRequest, NoticeLevel, Screen, ScreenBody, SortDirection, SpecialFilter, current_period,
};
use time::OffsetDateTime;
use tracing::debug;

const STATUS_CLEAR_AFTER: Duration = Duration::from_secs(4);
const SORT_MARK_ASC: &str = "▲";
const SORT_MARK_DESC: &str = "▼";
const FILTER_MARK: &str = "~";

/// Gateway handle that loads can be cloned onto worker threads with.
pub trait WorkerGateway: EntryGateway + Clone + Send + 'static {}

impl<T: EntryGateway + Clone + Send + 'static> WorkerGateway for T {}

#[derive(Debug)]
enum InternalEvent {
    ClearStatus { token: u64 },
    Loaded(LoadOutcome),
    ImportFinished(ImportOutcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum EditFocus {
    #[default]
    Comment,
    Ok,
}

impl EditFocus {
    const fn next(self) -> Self {
        match self {
            Self::Comment => Self::Ok,
            Self::Ok => Self::Comment,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct ConfigUiState {
    entries: Vec<(ConfigKey, String)>,
    cursor: usize,
    editing: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
enum InputMode {
    #[default]
    Browse,
    Filter {
        column: Column,
        buffer: String,
    },
    Import {
        buffer: String,
        error: Option<String>,
    },
    Config(ConfigUiState),
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct ViewData {
    selected_row: usize,
    selected_col: usize,
    input: InputMode,
    edit_focus: EditFocus,
    status_line: Option<String>,
    status_token: u64,
}

impl ViewData {
    fn selected_column(&self) -> Column {
        Column::ALL
            .get(self.selected_col)
            .copied()
            .unwrap_or(Column::Datei)
    }
}

pub fn run_app<G: WorkerGateway>(controller: &mut Controller<G>) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::default();
    let (internal_tx, internal_rx) = mpsc::channel();

    match controller.start() {
        Ok(requests) => dispatch_loads(controller, &internal_tx, requests),
        Err(error) => emit_status(&mut view_data, &internal_tx, format!("{error:#}")),
    }

    let mut result = Ok(());
    loop {
        process_internal_events(controller, &mut view_data, &internal_tx, &internal_rx);

        let screen = termin_app::render(&controller.view());
        if let Err(error) = terminal.draw(|frame| render(frame, &screen, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = match event::poll(Duration::from_millis(120)).context("poll event") {
            Ok(has_event) => has_event,
            Err(error) => {
                result = Err(error);
                break;
            }
        };
        if !has_event {
            continue;
        }
        match event::read().context("read event") {
            Ok(Event::Key(key)) => {
                if handle_key_event(controller, &mut view_data, &internal_tx, key) {
                    break;
                }
            }
            Ok(_) => {}
            Err(error) => {
                result = Err(error);
                break;
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn process_internal_events<G: WorkerGateway>(
    controller: &mut Controller<G>,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        handle_internal_event(controller, view_data, tx, event);
    }
}

fn handle_internal_event<G: WorkerGateway>(
    controller: &mut Controller<G>,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    event: InternalEvent,
) {
    match event {
        InternalEvent::ClearStatus { token } if token == view_data.status_token => {
            view_data.status_line = None;
        }
        InternalEvent::ClearStatus { .. } => {}
        InternalEvent::Loaded(outcome) => {
            let follow_up = controller.apply(outcome);
            dispatch_loads(controller, tx, follow_up);
            clamp_selection(controller, view_data);
        }
        InternalEvent::ImportFinished(outcome) => match controller.finish_import(outcome) {
            Ok(requests) => {
                view_data.selected_row = 0;
                dispatch_loads(controller, tx, requests);
            }
            Err(error) => emit_status(view_data, tx, format!("{error:#}")),
        },
    }
}

/// Run each load on its own thread; outcomes come back as internal events.
fn dispatch_loads<G: WorkerGateway>(
    controller: &Controller<G>,
    tx: &Sender<InternalEvent>,
    requests: Vec<LoadRequest>,
) {
    for request in requests {
        let gateway = controller.gateway().clone();
        let sender = tx.clone();
        debug!(request_id = request.request_id(), "dispatching load");
        thread::spawn(move || {
            let outcome = request.execute(&gateway);
            let _ = sender.send(InternalEvent::Loaded(outcome));
        });
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

/// Hand the loads of a successful action to the workers, or surface its error.
fn follow<G: WorkerGateway>(
    controller: &Controller<G>,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    outcome: Result<Vec<LoadRequest>>,
) {
    match outcome {
        Ok(requests) => dispatch_loads(controller, tx, requests),
        Err(error) => emit_status(view_data, tx, format!("{error:#}")),
    }
}

fn clamp_selection<G: EntryGateway>(controller: &Controller<G>, view_data: &mut ViewData) {
    let rows = controller.display().rows.len();
    view_data.selected_row = view_data.selected_row.min(rows.saturating_sub(1));
}

/// Returns true when the operator asked to quit.
fn handle_key_event<G: WorkerGateway>(
    controller: &mut Controller<G>,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('q') {
        return true;
    }

    if controller.session().is_some() {
        handle_edit_key(controller, view_data, internal_tx, key);
        return false;
    }

    match std::mem::take(&mut view_data.input) {
        InputMode::Browse => return handle_browse_key(controller, view_data, internal_tx, key),
        InputMode::Filter { column, buffer } => {
            handle_filter_key(controller, view_data, internal_tx, key, column, buffer);
        }
        InputMode::Import { buffer, error } => {
            handle_import_key(controller, view_data, internal_tx, key, buffer, error);
        }
        InputMode::Config(config) => {
            handle_config_key(controller, view_data, internal_tx, key, config);
        }
        InputMode::Help => {
            if !matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
                view_data.input = InputMode::Help;
            }
        }
    }
    false
}

fn handle_browse_key<G: WorkerGateway>(
    controller: &mut Controller<G>,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('?') => view_data.input = InputMode::Help,
        KeyCode::Char('j') | KeyCode::Down => {
            let last = controller.display().rows.len().saturating_sub(1);
            view_data.selected_row = (view_data.selected_row + 1).min(last);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            view_data.selected_row = view_data.selected_row.saturating_sub(1);
        }
        KeyCode::Char('l') | KeyCode::Right => {
            view_data.selected_col = (view_data.selected_col + 1).min(Column::ALL.len() - 1);
        }
        KeyCode::Char('h') | KeyCode::Left => {
            view_data.selected_col = view_data.selected_col.saturating_sub(1);
        }
        KeyCode::Char('n') | KeyCode::PageDown => {
            let outcome = controller.next_page();
            view_data.selected_row = 0;
            follow(controller, view_data, tx, outcome);
        }
        KeyCode::Char('p') | KeyCode::PageUp => {
            let outcome = controller.prev_page();
            view_data.selected_row = 0;
            follow(controller, view_data, tx, outcome);
        }
        KeyCode::Char('g') | KeyCode::Home => {
            let outcome = controller.first_page();
            view_data.selected_row = 0;
            follow(controller, view_data, tx, outcome);
        }
        KeyCode::Char('G') | KeyCode::End => {
            let outcome = controller.last_page();
            view_data.selected_row = 0;
            follow(controller, view_data, tx, outcome);
        }
        KeyCode::Char('s') => {
            let outcome = controller.set_sort(view_data.selected_column());
            follow(controller, view_data, tx, outcome);
        }
        KeyCode::Char('/') => {
            let column = view_data.selected_column();
            if column.is_filterable() {
                let buffer = controller
                    .query()
                    .filters
                    .column(column)
                    .unwrap_or_default()
                    .to_owned();
                view_data.input = InputMode::Filter { column, buffer };
            } else {
                emit_status(
                    view_data,
                    tx,
                    format!("{} cannot be filtered", column.label()),
                );
            }
        }
        KeyCode::Char('m') => {
            let outcome = controller.toggle_special_filter(SpecialFilter::MissingFiles);
            view_data.selected_row = 0;
            follow(controller, view_data, tx, outcome);
        }
        KeyCode::Char('x') => {
            let outcome = controller.toggle_special_filter(SpecialFilter::RejectedFiles);
            view_data.selected_row = 0;
            follow(controller, view_data, tx, outcome);
        }
        KeyCode::Char('r') => {
            let outcome = controller.reset_filters();
            view_data.selected_row = 0;
            follow(controller, view_data, tx, outcome);
        }
        KeyCode::Char('R') => {
            let outcome = controller.reload();
            follow(controller, view_data, tx, outcome);
        }
        KeyCode::Char('t') => {
            let target = controller.query().mode.other();
            let outcome = controller.switch_mode(target);
            view_data.selected_row = 0;
            follow(controller, view_data, tx, outcome);
        }
        KeyCode::Char(']') => {
            let outcome = controller.cycle_dataset(true);
            view_data.selected_row = 0;
            follow(controller, view_data, tx, outcome);
        }
        KeyCode::Char('[') => {
            let outcome = controller.cycle_dataset(false);
            view_data.selected_row = 0;
            follow(controller, view_data, tx, outcome);
        }
        KeyCode::Enter => {
            let Some(id) = controller
                .display()
                .rows
                .get(view_data.selected_row)
                .map(|entry| entry.id.clone())
            else {
                return false;
            };
            view_data.edit_focus = EditFocus::Comment;
            if let Err(error) = controller.open_entry(&id) {
                emit_status(view_data, tx, format!("{error:#}"));
            }
        }
        KeyCode::Char('i') => {
            if let Some(dataset) = &controller.display().busy {
                emit_status(view_data, tx, format!("import of {dataset} in progress"));
            } else {
                view_data.input = InputMode::Import {
                    buffer: current_period(OffsetDateTime::now_utc()).to_string(),
                    error: None,
                };
            }
        }
        KeyCode::Char('c') => match controller.load_config() {
            Ok(values) => {
                let entries = ConfigKey::ALL
                    .into_iter()
                    .map(|key| {
                        let value = values.get(key.as_str()).cloned().unwrap_or_default();
                        (key, value)
                    })
                    .collect();
                view_data.input = InputMode::Config(ConfigUiState {
                    entries,
                    cursor: 0,
                    editing: None,
                });
            }
            Err(error) => emit_status(view_data, tx, format!("{error:#}")),
        },
        KeyCode::Esc => {
            view_data.status_line = None;
            controller.dismiss_notice();
        }
        _ => {}
    }
    false
}

/// Every keystroke narrows the listing; stale responses are dropped by the
/// controller.
fn handle_filter_key<G: WorkerGateway>(
    controller: &mut Controller<G>,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
    column: Column,
    mut buffer: String,
) {
    match key.code {
        KeyCode::Enter | KeyCode::Esc => return,
        KeyCode::Backspace => {
            if buffer.pop().is_none() {
                view_data.input = InputMode::Filter { column, buffer };
                return;
            }
        }
        KeyCode::Char(ch) => buffer.push(ch),
        _ => {
            view_data.input = InputMode::Filter { column, buffer };
            return;
        }
    }

    let outcome = controller.set_filter(column, &buffer);
    view_data.selected_row = 0;
    follow(controller, view_data, tx, outcome);
    view_data.input = InputMode::Filter { column, buffer };
}

fn handle_import_key<G: WorkerGateway>(
    controller: &mut Controller<G>,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
    mut buffer: String,
    error: Option<String>,
) {
    match key.code {
        KeyCode::Esc => {}
        KeyCode::Backspace => {
            buffer.pop();
            view_data.input = InputMode::Import {
                buffer,
                error: None,
            };
        }
        KeyCode::Char(ch) => {
            buffer.push(ch);
            view_data.input = InputMode::Import {
                buffer,
                error: None,
            };
        }
        KeyCode::Enter => match controller.begin_import(&buffer) {
            Ok(request) => {
                let gateway = controller.gateway().clone();
                let sender = tx.clone();
                emit_status(view_data, tx, format!("importing {}", request.dataset));
                thread::spawn(move || {
                    let outcome = request.execute(&gateway);
                    let _ = sender.send(InternalEvent::ImportFinished(outcome));
                });
            }
            Err(failure) => {
                view_data.input = InputMode::Import {
                    buffer,
                    error: Some(format!("{failure:#}")),
                };
            }
        },
        _ => view_data.input = InputMode::Import { buffer, error },
    }
}

fn handle_config_key<G: WorkerGateway>(
    controller: &mut Controller<G>,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
    mut config: ConfigUiState,
) {
    if let Some(mut buffer) = config.editing.take() {
        match key.code {
            KeyCode::Esc => {}
            KeyCode::Backspace => {
                buffer.pop();
                config.editing = Some(buffer);
            }
            KeyCode::Char(ch) => {
                buffer.push(ch);
                config.editing = Some(buffer);
            }
            KeyCode::Enter => {
                if let Some((config_key, value)) = config.entries.get_mut(config.cursor) {
                    match controller.save_config(*config_key, &buffer) {
                        Ok(()) => *value = buffer.trim().to_owned(),
                        Err(error) => {
                            emit_status(view_data, tx, format!("{error:#}"));
                            config.editing = Some(buffer);
                        }
                    }
                }
            }
            _ => config.editing = Some(buffer),
        }
        view_data.input = InputMode::Config(config);
        return;
    }

    match key.code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('c') => return,
        KeyCode::Char('j') | KeyCode::Down => {
            config.cursor = (config.cursor + 1).min(config.entries.len().saturating_sub(1));
        }
        KeyCode::Char('k') | KeyCode::Up => config.cursor = config.cursor.saturating_sub(1),
        KeyCode::Enter => {
            config.editing = config
                .entries
                .get(config.cursor)
                .map(|(_, value)| value.clone());
        }
        _ => {}
    }
    view_data.input = InputMode::Config(config);
}

fn handle_edit_key<G: WorkerGateway>(
    controller: &mut Controller<G>,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    match key.code {
        KeyCode::Esc => {
            controller.cancel_entry();
        }
        KeyCode::Tab | KeyCode::BackTab => view_data.edit_focus = view_data.edit_focus.next(),
        KeyCode::Enter => match controller.commit_entry() {
            Ok(requests) => dispatch_loads(controller, tx, requests),
            Err(error) => emit_status(view_data, tx, format!("{error:#}")),
        },
        code => {
            let focus = view_data.edit_focus;
            let Some(session) = controller.session_mut() else {
                return;
            };
            match (focus, code) {
                (EditFocus::Comment, KeyCode::Char(ch)) => session.push_comment_char(ch),
                (EditFocus::Comment, KeyCode::Backspace) => session.pop_comment_char(),
                (EditFocus::Ok, KeyCode::Char(' ')) => session.toggle_ok(),
                (EditFocus::Ok, KeyCode::Char('y')) => session.set_ok(true),
                (EditFocus::Ok, KeyCode::Char('n')) => session.set_ok(false),
                _ => {}
            }
        }
    }
}

fn render(frame: &mut ratatui::Frame<'_>, screen: &Screen, view_data: &ViewData) {
    let area = frame.area();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(2),
        ])
        .split(area);

    let header = Paragraph::new(render_header_text(screen)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" termin | {} ", screen.mode.label())),
    );
    frame.render_widget(header, chunks[0]);

    render_body(frame, chunks[1], screen, view_data);

    let pager = Paragraph::new(render_pager_text(screen));
    frame.render_widget(pager, chunks[2]);

    let status_style = match &screen.notice {
        Some(notice) if view_data.status_line.is_none() && notice.level == NoticeLevel::Error => {
            Style::default().fg(Color::Red)
        }
        _ => Style::default(),
    };
    let status = Paragraph::new(status_text(screen, view_data))
        .style(status_style)
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(status, chunks[3]);

    if let Some(edit) = &screen.edit {
        render_overlay(
            frame,
            area,
            &format!(" entry {} ", edit.id),
            render_edit_overlay_text(edit, view_data.edit_focus),
            (70, 70),
        );
        return;
    }

    match &view_data.input {
        InputMode::Browse => {}
        InputMode::Filter { column, buffer } => render_overlay(
            frame,
            area,
            " filter ",
            format!("{}: {buffer}_", column.label()),
            (50, 20),
        ),
        InputMode::Import { buffer, error } => render_overlay(
            frame,
            area,
            &format!(" import into {} ", screen.mode.label()),
            render_import_prompt_text(buffer, error.as_deref()),
            (50, 25),
        ),
        InputMode::Config(config) => render_overlay(
            frame,
            area,
            " server configuration ",
            render_config_overlay_text(config),
            (60, 35),
        ),
        InputMode::Help => render_overlay(
            frame,
            area,
            " help ",
            help_overlay_text().to_owned(),
            (70, 80),
        ),
    }
}

fn render_overlay(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    title: &str,
    text: String,
    (percent_x, percent_y): (u16, u16),
) {
    let popup = centered_rect(percent_x, percent_y, area);
    frame.render_widget(Clear, popup);
    let paragraph = Paragraph::new(text)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(title.to_owned()));
    frame.render_widget(paragraph, popup);
}

fn render_body(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    screen: &Screen,
    view_data: &ViewData,
) {
    let block = Block::default().borders(Borders::ALL).title(table_title(screen));
    let rows = match &screen.body {
        ScreenBody::Rows(rows) => rows,
        body => {
            let text = body_message_text(body).unwrap_or_default();
            let paragraph = Paragraph::new(text).wrap(Wrap { trim: true }).block(block);
            frame.render_widget(paragraph, area);
            return;
        }
    };

    let header = Row::new(
        screen
            .header
            .iter()
            .enumerate()
            .map(|(index, cell)| {
                let style = if index == view_data.selected_col {
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().add_modifier(Modifier::BOLD)
                };
                Cell::from(header_label(cell)).style(style)
            })
            .collect::<Vec<_>>(),
    );

    let body_rows = rows.iter().enumerate().map(|(row_index, row)| {
        let base = if row.rejected {
            Style::default().fg(Color::Magenta)
        } else if row.missing {
            Style::default().fg(Color::Red)
        } else {
            Style::default()
        };
        let cells = row
            .cells
            .iter()
            .enumerate()
            .map(|(col_index, cell)| {
                let selected = row_index == view_data.selected_row;
                let style = if selected && col_index == view_data.selected_col {
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::Cyan)
                        .add_modifier(Modifier::BOLD)
                } else if selected {
                    base.bg(Color::DarkGray)
                } else {
                    base
                };
                Cell::from(cell.text().to_owned()).style(style)
            })
            .collect::<Vec<_>>();
        Row::new(cells)
    });

    let widths = [
        Constraint::Min(24),
        Constraint::Length(18),
        Constraint::Length(12),
        Constraint::Length(8),
        Constraint::Length(8),
        Constraint::Length(5),
    ];
    let table = Table::new(body_rows, widths).header(header).block(block);
    frame.render_widget(table, area);
}

fn table_title(screen: &Screen) -> String {
    match &screen.dataset {
        Some(dataset) => format!(
            " {dataset} | page {}/{} ",
            screen.current_page,
            screen.total_pages.max(1)
        ),
        None => " no dataset ".to_owned(),
    }
}

fn header_label(cell: &HeaderCell) -> String {
    let mut label = cell.label.to_owned();
    match cell.sort {
        Some(SortDirection::Asc) => label.push_str(SORT_MARK_ASC),
        Some(SortDirection::Desc) => label.push_str(SORT_MARK_DESC),
        None => {}
    }
    if let Some(filter) = &cell.filter {
        label.push_str(&format!(" {FILTER_MARK}{filter}"));
    }
    label
}

fn body_message_text(body: &ScreenBody) -> Option<String> {
    match body {
        ScreenBody::Rows(_) => None,
        ScreenBody::Loading => Some("loading...".to_owned()),
        ScreenBody::Empty => Some("no entries match the current filters".to_owned()),
        ScreenBody::Message(message) => Some(message.clone()),
        ScreenBody::NoData { call_to_action } => {
            Some(format!("{call_to_action} Press i to import."))
        }
    }
}

fn render_header_text(screen: &Screen) -> String {
    let catalog = if screen.catalog.is_empty() {
        "none".to_owned()
    } else {
        screen
            .catalog
            .iter()
            .map(|dataset| {
                if screen.dataset.as_ref() == Some(dataset) {
                    format!("[{dataset}]")
                } else {
                    dataset.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    };

    let summary = &screen.summary;
    let counts = match &summary.error {
        Some(error) => format!("statistics unavailable: {error}"),
        None => format!(
            "entries {} | missing {} ({:.2}%)",
            summary.total, summary.missing_count, summary.missing_percentage
        ),
    };

    let specials = screen
        .special_filters
        .iter()
        .filter(|(_, active)| *active)
        .map(|(filter, _)| filter.label())
        .collect::<Vec<_>>();
    if specials.is_empty() {
        format!("datasets: {catalog} | {counts}")
    } else {
        format!("datasets: {catalog} | {counts} | only {}", specials.join(", "))
    }
}

fn render_pager_text(screen: &Screen) -> String {
    if screen.pager.is_empty() {
        return String::new();
    }
    let mut parts = Vec::with_capacity(screen.pager.pages.len() + 2);
    parts.push(if screen.pager.has_prev { "<" } else { " " }.to_owned());
    for page in &screen.pager.pages {
        if *page == screen.current_page {
            parts.push(format!("[{page}]"));
        } else {
            parts.push(page.to_string());
        }
    }
    parts.push(if screen.pager.has_next { ">" } else { " " }.to_owned());
    parts.join(" ").trim_end().to_owned()
}

fn render_edit_overlay_text(edit: &EditView, focus: EditFocus) -> String {
    let mut lines = edit
        .details
        .iter()
        .map(|(key, value)| format!("{key}: {value}"))
        .collect::<Vec<_>>();
    lines.push(String::new());

    let comment_cursor = if focus == EditFocus::Comment { "_" } else { "" };
    let marker = |field: EditFocus| if field == focus { ">" } else { " " };
    lines.push(format!(
        "{} comment: {}{comment_cursor}",
        marker(EditFocus::Comment),
        edit.comment
    ));
    lines.push(format!(
        "{} ok: [{}]",
        marker(EditFocus::Ok),
        if edit.ok { "x" } else { " " }
    ));
    lines.push(String::new());
    if let Some(error) = &edit.error {
        lines.push(format!("error: {error}"));
    }
    let dirty = if edit.dirty { " (modified)" } else { "" };
    lines.push(format!("enter save | esc cancel | tab switch field{dirty}"));
    lines.join("\n")
}

fn render_import_prompt_text(buffer: &str, error: Option<&str>) -> String {
    let mut text = format!("period (YYYYMM): {buffer}_\n\nenter import | esc cancel");
    if let Some(error) = error {
        text.push_str(&format!("\n\n{error}"));
    }
    text
}

fn render_config_overlay_text(config: &ConfigUiState) -> String {
    let mut lines = config
        .entries
        .iter()
        .enumerate()
        .map(|(index, (key, value))| {
            let selected = index == config.cursor;
            let marker = if selected { ">" } else { " " };
            match &config.editing {
                Some(buffer) if selected => format!("{marker} {}: {buffer}_", key.label()),
                _ => format!("{marker} {}: {value}", key.label()),
            }
        })
        .collect::<Vec<_>>();
    lines.push(String::new());
    lines.push(if config.editing.is_some() {
        "enter save | esc discard".to_owned()
    } else {
        "j/k move | enter edit | esc close".to_owned()
    });
    lines.join("\n")
}

fn help_overlay_text() -> &'static str {
    "navigation\n  j/k  rows        h/l  columns\n  n/p  next/previous page   g/G  first/last page\n  [ ]  previous/next dataset\n\nquery\n  s    sort by column (again flips)\n  /    filter column\n  m    only missing files    x  only rejected files\n  r    reset filters\n\nactions\n  enter  open entry          i  import period\n  t      switch WPI/eMISO    c  server configuration\n  R      reload              esc  dismiss message\n  q      quit                ?  close help"
}

fn status_text(screen: &Screen, view_data: &ViewData) -> String {
    if let Some(busy) = &screen.busy {
        return format!("{busy}...");
    }
    if let Some(status) = &view_data.status_line {
        return status.clone();
    }
    if let Some(notice) = &screen.notice {
        return notice.message.clone();
    }
    match &view_data.input {
        InputMode::Filter { .. } => "type to filter | enter/esc done".to_owned(),
        _ => "? help | q quit".to_owned(),
    }
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
