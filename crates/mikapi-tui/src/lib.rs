// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use mikapi_app::validation::{format_amount, parse_price, parse_quantity};
use mikapi_app::{
    AppCommand, AppEvent, AppMode, AppState, Customer, CustomerDetail, CustomerId, InputKind,
    LedgerDraft, LineAmount, OrderField, OrderId, Page, SaveReport, SettlementSummary,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Tabs};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

const NO_CUSTOMER_SELECTED: &str = "no customer selected -- pick one from the open tabs list";
const STATUS_CLEAR_AFTER: Duration = Duration::from_secs(4);

/// Everything the pages need from storage.
pub trait AppRuntime {
    fn load_customers(&mut self, settled: bool) -> Result<Vec<Customer>>;
    fn load_settlements(&mut self) -> Result<Vec<SettlementSummary>>;
    fn load_customer_detail(&mut self, customer_id: CustomerId) -> Result<Option<CustomerDetail>>;
    fn create_customer(&mut self, name: &str) -> Result<Option<Customer>>;
    fn mark_settled(&mut self, customer_id: CustomerId) -> Result<()>;
    fn save_ledger(&mut self, ledger: &mut LedgerDraft) -> Result<SaveReport>;
    fn delete_order(&mut self, order_id: OrderId) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiOptions {
    pub currency: String,
}

impl Default for UiOptions {
    fn default() -> Self {
        Self {
            currency: "¥".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum DetailView {
    Missing(String),
    Loaded(LedgerDraft),
}

impl Default for DetailView {
    fn default() -> Self {
        Self::Missing(NO_CUSTOMER_SELECTED.to_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct ViewData {
    currency: String,
    open_customers: Vec<Customer>,
    settlements: Vec<SettlementSummary>,
    list_cursor: usize,
    detail: DetailView,
    row_cursor: usize,
    field_cursor: usize,
    dirty: bool,
    input: String,
    status_token: u64,
}

impl ViewData {
    fn new(options: &UiOptions) -> Self {
        Self {
            currency: options.currency.clone(),
            ..Self::default()
        }
    }

    fn ledger(&self) -> Option<&LedgerDraft> {
        match &self.detail {
            DetailView::Loaded(ledger) => Some(ledger),
            DetailView::Missing(_) => None,
        }
    }

    fn ledger_mut(&mut self) -> Option<&mut LedgerDraft> {
        match &mut self.detail {
            DetailView::Loaded(ledger) => Some(ledger),
            DetailView::Missing(_) => None,
        }
    }

    fn selected_field(&self) -> OrderField {
        OrderField::ALL[self.field_cursor.min(OrderField::ALL.len() - 1)]
    }

    fn list_len(&self, page: Page) -> usize {
        match page {
            Page::Open => self.open_customers.len(),
            Page::Settled => self.settlements.len(),
            Page::Detail => self.ledger().map_or(0, |ledger| ledger.rows.len()),
        }
    }

    fn selected_list_customer(&self, page: Page) -> Option<&Customer> {
        match page {
            Page::Open => self.open_customers.get(self.list_cursor),
            Page::Settled => self
                .settlements
                .get(self.list_cursor)
                .map(|summary| &summary.customer),
            Page::Detail => None,
        }
    }
}

pub fn run_app<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    options: &UiOptions,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::new(options);
    let (internal_tx, internal_rx) = mpsc::channel();

    if let Err(error) = refresh_view_data(state, runtime, &mut view_data) {
        tracing::warn!(error = %format!("{error:#}"), "initial load failed");
        state.dispatch(AppCommand::SetStatus(format!("load failed: {error}")));
    }

    let mut result = Ok(());
    loop {
        process_internal_events(state, &view_data, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data)) {
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
        if has_event {
            match event::read().context("read event") {
                Ok(Event::Key(key)) => {
                    if handle_key_event(state, runtime, &mut view_data, &internal_tx, key) {
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
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn process_internal_events(
    state: &mut AppState,
    view_data: &ViewData,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(AppCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
        }
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
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    state.dispatch(AppCommand::SetStatus(message.into()));
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn emit_failure(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    action: &str,
    error: &anyhow::Error,
) {
    tracing::warn!(action, error = %format!("{error:#}"), "action failed");
    emit_status(state, view_data, internal_tx, format!("{action} failed: {error:#}"));
}

fn handle_key_event<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if let AppMode::Input(kind) = state.mode {
        handle_input_key(state, runtime, view_data, internal_tx, kind, key);
        return false;
    }

    match state.session.page {
        Page::Open | Page::Settled => handle_list_key(state, runtime, view_data, internal_tx, key),
        Page::Detail => handle_detail_key(state, runtime, view_data, internal_tx, key),
    }
    false
}

fn handle_input_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    kind: InputKind,
    key: KeyEvent,
) {
    match key.code {
        KeyCode::Esc => {
            view_data.input.clear();
            state.dispatch(AppCommand::EndInput);
        }
        KeyCode::Enter => commit_input(state, runtime, view_data, internal_tx, kind),
        KeyCode::Backspace => {
            view_data.input.pop();
        }
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            view_data.input.push(ch);
        }
        _ => {}
    }
}

fn begin_input(state: &mut AppState, view_data: &mut ViewData, kind: InputKind) {
    view_data.input = match kind {
        InputKind::NewCustomer => String::new(),
        InputKind::CustomerName => view_data
            .ledger()
            .map(|ledger| ledger.name.clone())
            .unwrap_or_default(),
        InputKind::Memo => view_data
            .ledger()
            .map(|ledger| ledger.memo.clone())
            .unwrap_or_default(),
        InputKind::OrderCell(field) => view_data
            .ledger()
            .and_then(|ledger| ledger.rows.get(view_data.row_cursor))
            .map(|row| row.field_text(field))
            .unwrap_or_default(),
    };
    state.dispatch(AppCommand::BeginInput(kind));
}

fn commit_input<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    kind: InputKind,
) {
    let input = view_data.input.clone();

    if kind == InputKind::NewCustomer {
        state.dispatch(AppCommand::EndInput);
        view_data.input.clear();
        match runtime.create_customer(&input) {
            Ok(Some(customer)) => {
                dispatch_and_refresh(
                    state,
                    runtime,
                    view_data,
                    AppCommand::OpenCustomer(customer.id),
                    internal_tx,
                );
                emit_status(
                    state,
                    view_data,
                    internal_tx,
                    format!("created {}", customer.name),
                );
            }
            Ok(None) => {}
            Err(error) => emit_failure(state, view_data, internal_tx, "create", &error),
        }
        return;
    }

    let row_cursor = view_data.row_cursor;
    let Some(ledger) = view_data.ledger_mut() else {
        state.dispatch(AppCommand::EndInput);
        return;
    };

    let applied = match kind {
        InputKind::NewCustomer => Ok(()),
        InputKind::CustomerName => {
            ledger.name = input.trim().to_owned();
            Ok(())
        }
        InputKind::Memo => {
            ledger.memo = input;
            Ok(())
        }
        InputKind::OrderCell(field) => match ledger.rows.get_mut(row_cursor) {
            None => Ok(()),
            Some(row) => match field {
                OrderField::Item => {
                    row.item = input.trim().to_owned();
                    Ok(())
                }
                OrderField::Quantity => parse_quantity(&input).map(|quantity| {
                    row.quantity = quantity;
                }),
                OrderField::Price => parse_price(&input).map(|price| {
                    row.price = price;
                }),
            },
        },
    };

    match applied {
        Ok(()) => {
            view_data.dirty = true;
            view_data.input.clear();
            state.dispatch(AppCommand::EndInput);
        }
        // Stay in input mode so the value can be corrected.
        Err(error) => emit_status(state, view_data, internal_tx, error.to_string()),
    }
}

fn handle_list_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return;
    }
    let page = state.session.page;
    match key.code {
        KeyCode::Tab | KeyCode::BackTab => {
            dispatch_and_refresh(state, runtime, view_data, AppCommand::NextPage, internal_tx);
        }
        KeyCode::Char('j') | KeyCode::Down => move_list_cursor(view_data, page, 1),
        KeyCode::Char('k') | KeyCode::Up => move_list_cursor(view_data, page, -1),
        KeyCode::Char('g') => view_data.list_cursor = 0,
        KeyCode::Char('G') => {
            view_data.list_cursor = view_data.list_len(page).saturating_sub(1);
        }
        KeyCode::Enter => {
            let Some(customer_id) = view_data
                .selected_list_customer(page)
                .map(|customer| customer.id)
            else {
                emit_status(state, view_data, internal_tx, "nothing to open");
                return;
            };
            dispatch_and_refresh(
                state,
                runtime,
                view_data,
                AppCommand::OpenCustomer(customer_id),
                internal_tx,
            );
        }
        KeyCode::Char('n') if page == Page::Open => {
            begin_input(state, view_data, InputKind::NewCustomer);
        }
        KeyCode::Char('s') if page == Page::Open => {
            let Some(customer) = view_data.selected_list_customer(page).cloned() else {
                emit_status(state, view_data, internal_tx, "no customer to settle");
                return;
            };
            settle_customer(state, runtime, view_data, internal_tx, &customer);
        }
        KeyCode::Char('r') => reload(state, runtime, view_data, internal_tx),
        _ => {}
    }
}

fn handle_detail_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    if key.code == KeyCode::Esc {
        if view_data.dirty {
            emit_status(state, view_data, internal_tx, "discarded unsaved changes");
        }
        dispatch_and_refresh(state, runtime, view_data, AppCommand::CloseDetail, internal_tx);
        return;
    }
    if key.code == KeyCode::Tab || key.code == KeyCode::BackTab {
        emit_status(state, view_data, internal_tx, "close detail first (esc)");
        return;
    }
    if key.code == KeyCode::Char('r') {
        let dirty = view_data.dirty;
        match refresh_view_data(state, runtime, view_data) {
            Ok(()) if dirty => emit_status(
                state,
                view_data,
                internal_tx,
                "reloaded, discarded unsaved changes",
            ),
            Ok(()) => emit_status(state, view_data, internal_tx, "reloaded"),
            Err(error) => {
                view_data.dirty = dirty;
                emit_failure(state, view_data, internal_tx, "load", &error);
            }
        }
        return;
    }

    let row_count = view_data.list_len(Page::Detail);
    let Some(ledger) = view_data.ledger() else {
        return;
    };
    let settled = ledger.settled;
    let field = view_data.selected_field();

    match (key.code, key.modifiers) {
        (KeyCode::Char('s'), modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
            confirm_ledger(state, runtime, view_data, internal_tx);
        }
        (KeyCode::Char('c'), KeyModifiers::NONE) => {
            confirm_ledger(state, runtime, view_data, internal_tx);
        }
        (KeyCode::Char('j') | KeyCode::Down, _) => {
            view_data.row_cursor = step_cursor(view_data.row_cursor, row_count, 1);
        }
        (KeyCode::Char('k') | KeyCode::Up, _) => {
            view_data.row_cursor = step_cursor(view_data.row_cursor, row_count, -1);
        }
        (KeyCode::Char('h') | KeyCode::Left, _) => {
            view_data.field_cursor = view_data.field_cursor.saturating_sub(1);
        }
        (KeyCode::Char('l') | KeyCode::Right, _) => {
            view_data.field_cursor = (view_data.field_cursor + 1).min(OrderField::ALL.len() - 1);
        }
        (KeyCode::Char('e') | KeyCode::Enter, _) => {
            if row_count == 0 {
                emit_status(state, view_data, internal_tx, "no rows -- press a to add one");
                return;
            }
            begin_input(state, view_data, InputKind::OrderCell(field));
        }
        (KeyCode::Char('+') | KeyCode::Char('='), _) => adjust_selected_row(view_data, field, 1),
        (KeyCode::Char('-'), _) => adjust_selected_row(view_data, field, -1),
        (KeyCode::Char('a'), _) => {
            if let Some(ledger) = view_data.ledger_mut() {
                let index = ledger.add_row();
                view_data.row_cursor = index;
                view_data.field_cursor = 0;
                view_data.dirty = true;
            }
        }
        (KeyCode::Char('d'), _) => delete_selected_row(state, runtime, view_data, internal_tx),
        (KeyCode::Char('N'), _) => begin_input(state, view_data, InputKind::CustomerName),
        (KeyCode::Char('M'), _) => begin_input(state, view_data, InputKind::Memo),
        (KeyCode::Char('S'), _) => {
            if settled {
                emit_status(state, view_data, internal_tx, "already settled");
                return;
            }
            let Some(customer_id) = state.session.selected_customer() else {
                return;
            };
            let name = view_data
                .ledger()
                .map(|ledger| ledger.name.clone())
                .unwrap_or_default();
            match runtime.mark_settled(customer_id) {
                Ok(()) => {
                    if let Some(ledger) = view_data.ledger_mut() {
                        ledger.settled = true;
                    }
                    emit_status(state, view_data, internal_tx, format!("{name} settled"));
                }
                Err(error) => emit_failure(state, view_data, internal_tx, "settle", &error),
            }
        }
        _ => {}
    }
}

fn adjust_selected_row(view_data: &mut ViewData, field: OrderField, direction: i64) {
    let row_cursor = view_data.row_cursor;
    let Some(row) = view_data
        .ledger_mut()
        .and_then(|ledger| ledger.rows.get_mut(row_cursor))
    else {
        return;
    };
    match (field, direction.is_positive()) {
        (OrderField::Price, _) => row.step_price(direction),
        (_, true) => row.increment_quantity(),
        (_, false) => row.decrement_quantity(),
    }
    view_data.dirty = true;
}

fn delete_selected_row<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let row_cursor = view_data.row_cursor;
    let Some(row) = view_data
        .ledger()
        .and_then(|ledger| ledger.rows.get(row_cursor))
        .cloned()
    else {
        emit_status(state, view_data, internal_tx, "no row to delete");
        return;
    };

    if let Some(order_id) = row.id
        && let Err(error) = runtime.delete_order(order_id)
    {
        emit_failure(state, view_data, internal_tx, "delete", &error);
        return;
    }

    if let Some(ledger) = view_data.ledger_mut() {
        ledger.remove_row(row_cursor);
    }
    let remaining = view_data.list_len(Page::Detail);
    view_data.row_cursor = view_data.row_cursor.min(remaining.saturating_sub(1));

    let label = if row.item.is_empty() {
        "row".to_owned()
    } else {
        row.item.clone()
    };
    let message = if row.is_saved() {
        format!("deleted {label}")
    } else {
        format!("removed unsaved {label}")
    };
    emit_status(state, view_data, internal_tx, message);
}

fn confirm_ledger<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let Some(ledger) = view_data.ledger_mut() else {
        return;
    };
    match runtime.save_ledger(ledger) {
        Ok(report) => {
            let written = report.rows_written();
            let noun = if written == 1 { "row" } else { "rows" };
            if let Err(error) = refresh_view_data(state, runtime, view_data) {
                emit_failure(state, view_data, internal_tx, "reload", &error);
                return;
            }
            emit_status(
                state,
                view_data,
                internal_tx,
                format!("saved {written} {noun}"),
            );
        }
        // The draft keeps its edits; ids of rows written before the failure were filled in.
        Err(error) => emit_failure(state, view_data, internal_tx, "save", &error),
    }
}

fn settle_customer<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    customer: &Customer,
) {
    if let Err(error) = runtime.mark_settled(customer.id) {
        emit_failure(state, view_data, internal_tx, "settle", &error);
        return;
    }
    if let Err(error) = refresh_view_data(state, runtime, view_data) {
        emit_failure(state, view_data, internal_tx, "reload", &error);
        return;
    }
    emit_status(
        state,
        view_data,
        internal_tx,
        format!("{} settled", customer.name),
    );
}

fn reload<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    match refresh_view_data(state, runtime, view_data) {
        Ok(()) => emit_status(state, view_data, internal_tx, "reloaded"),
        Err(error) => emit_failure(state, view_data, internal_tx, "load", &error),
    }
}

fn move_list_cursor(view_data: &mut ViewData, page: Page, delta: isize) {
    view_data.list_cursor = step_cursor(view_data.list_cursor, view_data.list_len(page), delta);
}

fn step_cursor(cursor: usize, len: usize, delta: isize) -> usize {
    if len == 0 {
        return 0;
    }
    cursor.saturating_add_signed(delta).min(len - 1)
}

fn dispatch_and_refresh<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    command: AppCommand,
    internal_tx: &Sender<InternalEvent>,
) {
    let events = state.dispatch(command);
    if should_refresh_view(&events) {
        view_data.list_cursor = 0;
        view_data.row_cursor = 0;
        view_data.field_cursor = 0;
        if let Err(error) = refresh_view_data(state, runtime, view_data) {
            emit_failure(state, view_data, internal_tx, "load", &error);
        }
    }
}

fn should_refresh_view(events: &[AppEvent]) -> bool {
    events.iter().any(|event| {
        matches!(
            event,
            AppEvent::PageChanged(_) | AppEvent::CustomerOpened(_)
        )
    })
}

fn refresh_view_data<R: AppRuntime>(
    state: &AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
) -> Result<()> {
    match state.session.page {
        Page::Open => {
            view_data.open_customers = runtime.load_customers(false)?;
        }
        Page::Settled => {
            view_data.settlements = runtime.load_settlements()?;
        }
        Page::Detail => {
            view_data.dirty = false;
            view_data.detail = match state.session.selected_customer() {
                None => DetailView::default(),
                Some(customer_id) => match runtime.load_customer_detail(customer_id)? {
                    Some(detail) => {
                        DetailView::Loaded(LedgerDraft::from_detail(&detail.customer, &detail.orders))
                    }
                    None => DetailView::Missing(format!(
                        "customer {customer_id} not found -- it may have been removed"
                    )),
                },
            };
        }
    }
    let len = view_data.list_len(state.session.page);
    match state.session.page {
        Page::Detail => view_data.row_cursor = view_data.row_cursor.min(len.saturating_sub(1)),
        _ => view_data.list_cursor = view_data.list_cursor.min(len.saturating_sub(1)),
    }
    Ok(())
}

fn render(frame: &mut ratatui::Frame<'_>, state: &AppState, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    if state.session.page == Page::Detail {
        let breadcrumb = Paragraph::new(breadcrumb_text(state, view_data))
            .block(Block::default().title("mikapi").borders(Borders::ALL));
        frame.render_widget(breadcrumb, layout[0]);
    } else {
        let selected = Page::LISTS
            .iter()
            .position(|page| *page == state.session.page)
            .unwrap_or(0);
        let titles = Page::LISTS
            .iter()
            .map(|page| page_title(*page, view_data))
            .collect::<Vec<String>>();
        let tabs = Tabs::new(titles)
            .block(Block::default().title("mikapi").borders(Borders::ALL))
            .style(Style::default().fg(Color::White))
            .highlight_style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
            .select(selected);
        frame.render_widget(tabs, layout[0]);
    }

    match state.session.page {
        Page::Open => render_open_page(frame, layout[1], view_data),
        Page::Settled => render_settled_page(frame, layout[1], view_data),
        Page::Detail => render_detail_page(frame, layout[1], view_data),
    }

    let status = Paragraph::new(status_text(state))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, layout[2]);

    if let AppMode::Input(kind) = state.mode {
        let area = centered_rect(60, 20, frame.area());
        frame.render_widget(Clear, area);
        let input = Paragraph::new(format!("{}_\n\nenter save | esc cancel", view_data.input))
            .block(
                Block::default()
                    .title(kind.prompt())
                    .borders(Borders::ALL)
                    .style(Style::default().fg(Color::Cyan)),
            );
        frame.render_widget(input, area);
    }
}

fn page_title(page: Page, view_data: &ViewData) -> String {
    match page {
        Page::Open if !view_data.open_customers.is_empty() => {
            format!("{} ({})", page.label(), view_data.open_customers.len())
        }
        Page::Settled if !view_data.settlements.is_empty() => {
            format!("{} ({})", page.label(), view_data.settlements.len())
        }
        _ => page.label().to_owned(),
    }
}

fn breadcrumb_text(state: &AppState, view_data: &ViewData) -> String {
    let origin = state.session.origin.label();
    match view_data.ledger() {
        Some(ledger) => format!("{origin} > {}", display_name(&ledger.name)),
        None => format!("{origin} > detail"),
    }
}

fn display_name(name: &str) -> &str {
    if name.trim().is_empty() {
        "(unnamed)"
    } else {
        name
    }
}

fn selected_style() -> Style {
    Style::default().bg(Color::DarkGray)
}

fn render_open_page(frame: &mut ratatui::Frame<'_>, area: Rect, view_data: &ViewData) {
    if view_data.open_customers.is_empty() {
        let empty = Paragraph::new("no open tabs -- press n to add a customer")
            .block(Block::default().borders(Borders::ALL).title("open tabs"));
        frame.render_widget(empty, area);
        return;
    }

    let header = Row::new(["id", "name", "memo", "since"].map(|label| {
        Cell::from(label).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    }));
    let rows = view_data
        .open_customers
        .iter()
        .enumerate()
        .map(|(index, customer)| {
            let row = Row::new(open_row_cells(customer));
            if index == view_data.list_cursor {
                row.style(selected_style())
            } else {
                row
            }
        });
    let widths = [
        Constraint::Length(6),
        Constraint::Min(12),
        Constraint::Min(16),
        Constraint::Length(17),
    ];
    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(Block::default().borders(Borders::ALL).title("open tabs"));
    frame.render_widget(table, area);
}

fn open_row_cells(customer: &Customer) -> [String; 4] {
    let since = customer
        .created_at
        .and_then(|created| {
            created
                .format(&time::macros::format_description!(
                    "[year]-[month]-[day] [hour]:[minute]"
                ))
                .ok()
        })
        .unwrap_or_default();
    [
        customer.id.to_string(),
        display_name(&customer.name).to_owned(),
        customer.memo_text().to_owned(),
        since,
    ]
}

fn render_settled_page(frame: &mut ratatui::Frame<'_>, area: Rect, view_data: &ViewData) {
    if view_data.settlements.is_empty() {
        let empty = Paragraph::new("nothing settled yet")
            .block(Block::default().borders(Borders::ALL).title("settled"));
        frame.render_widget(empty, area);
        return;
    }

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    let header = Row::new(["name", "lines", "total"].map(|label| {
        Cell::from(label).style(Style::default().add_modifier(Modifier::BOLD))
    }));
    let rows = view_data
        .settlements
        .iter()
        .enumerate()
        .map(|(index, summary)| {
            let row = Row::new([
                display_name(&summary.customer.name).to_owned(),
                summary.orders.len().to_string(),
                format_amount(&view_data.currency, summary.total),
            ]);
            if index == view_data.list_cursor {
                row.style(selected_style())
            } else {
                row
            }
        });
    let widths = [
        Constraint::Min(12),
        Constraint::Length(6),
        Constraint::Length(14),
    ];
    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(Block::default().borders(Borders::ALL).title("settled"));
    frame.render_widget(table, columns[0]);

    let detail = view_data
        .settlements
        .get(view_data.list_cursor)
        .map(|summary| settlement_text(summary, &view_data.currency))
        .unwrap_or_default();
    let orders = Paragraph::new(detail).block(Block::default().borders(Borders::ALL).title("orders"));
    frame.render_widget(orders, columns[1]);
}

fn settlement_text(summary: &SettlementSummary, currency: &str) -> String {
    let mut lines = Vec::with_capacity(summary.orders.len() + 2);
    if summary.orders.is_empty() {
        lines.push("no orders".to_owned());
    }
    for order in &summary.orders {
        lines.push(format!(
            "{} x{} @ {} = {}",
            order.item,
            order.quantity,
            format_amount(currency, order.price),
            amount_text(currency, order.amount())
        ));
    }
    lines.push(String::new());
    lines.push(format!("total {}", format_amount(currency, summary.total)));
    lines.join("\n")
}

fn render_detail_page(frame: &mut ratatui::Frame<'_>, area: Rect, view_data: &ViewData) {
    let ledger = match &view_data.detail {
        DetailView::Missing(message) => {
            let warning = Paragraph::new(message.as_str())
                .style(Style::default().fg(Color::Yellow))
                .block(Block::default().borders(Borders::ALL).title("detail"));
            frame.render_widget(warning, area);
            return;
        }
        DetailView::Loaded(ledger) => ledger,
    };

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(3)])
        .split(area);

    let summary = Paragraph::new(detail_header_text(ledger, &view_data.currency, view_data.dirty))
        .block(Block::default().borders(Borders::ALL).title("customer"));
    frame.render_widget(summary, layout[0]);

    let header = Row::new(
        OrderField::ALL
            .iter()
            .map(|field| field.label())
            .chain(["amount"])
            .map(|label| {
                Cell::from(label).style(
                    Style::default()
                        .fg(Color::White)
                        .add_modifier(Modifier::BOLD),
                )
            }),
    );
    let rows = ledger.rows.iter().enumerate().map(|(row_index, row)| {
        let selected_row = row_index == view_data.row_cursor;
        let mut cells = OrderField::ALL
            .iter()
            .enumerate()
            .map(|(column_index, field)| {
                let text = match field {
                    OrderField::Price => format_amount(&view_data.currency, row.price),
                    other => row.field_text(*other),
                };
                let mut style = Style::default();
                if !row.is_saved() {
                    style = style.fg(Color::Green);
                }
                if selected_row {
                    style = style.bg(Color::DarkGray);
                }
                if selected_row && column_index == view_data.field_cursor {
                    style = Style::default()
                        .fg(Color::Black)
                        .bg(Color::Cyan)
                        .add_modifier(Modifier::BOLD);
                }
                Cell::from(text).style(style)
            })
            .collect::<Vec<_>>();
        cells.push(Cell::from(amount_text(&view_data.currency, row.amount())));
        Row::new(cells)
    });
    let widths = [
        Constraint::Min(16),
        Constraint::Length(6),
        Constraint::Length(12),
        Constraint::Length(14),
    ];
    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(Block::default().borders(Borders::ALL).title("orders"));
    frame.render_widget(table, layout[1]);
}

fn amount_text(currency: &str, amount: Option<i64>) -> String {
    match amount {
        Some(amount) => format_amount(currency, amount),
        None => "overflow".to_owned(),
    }
}

fn detail_header_text(ledger: &LedgerDraft, currency: &str, dirty: bool) -> String {
    let state = if ledger.settled { "settled" } else { "open" };
    let unsaved = if dirty { " | unsaved changes" } else { "" };
    [
        format!("{} ({state}){unsaved}", display_name(&ledger.name)),
        format!("memo: {}", ledger.memo),
        format!("total {}", amount_text(currency, ledger.total())),
    ]
    .join("\n")
}

fn status_text(state: &AppState) -> String {
    let mode = match state.mode {
        AppMode::Nav => "NAV",
        AppMode::Input(_) => "EDIT",
    };
    let hints = match (state.mode, state.session.page) {
        (AppMode::Input(_), _) => "enter save | esc cancel",
        (AppMode::Nav, Page::Open) => "j/k | enter open | n new | s settle | tab settled | r | ctrl+q",
        (AppMode::Nav, Page::Settled) => "j/k | enter open | tab open tabs | r | ctrl+q",
        (AppMode::Nav, Page::Detail) => {
            "j/k/h/l | e edit | +/- | a add | d del | N name | M memo | c confirm | S settle | esc"
        }
    };
    match &state.status_line {
        Some(status) => format!("{mode} | {status} | {hints}"),
        None => format!("{mode} | {hints}"),
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
