// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{AppMode, CustomerId, InputKind, Page};

/// Navigation context handed to every page handler. The detail page reads its
/// customer from here; nothing else holds the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub page: Page,
    pub customer: Option<CustomerId>,
    pub origin: Page,
}

impl Default for Session {
    fn default() -> Self {
        Self::list(Page::Open)
    }
}

impl Session {
    pub const fn list(page: Page) -> Self {
        Self {
            page,
            customer: None,
            origin: page,
        }
    }

    pub const fn detail(customer: CustomerId, origin: Page) -> Self {
        Self {
            page: Page::Detail,
            customer: Some(customer),
            origin,
        }
    }

    pub fn selected_customer(&self) -> Option<CustomerId> {
        if self.page == Page::Detail {
            self.customer
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub session: Session,
    pub mode: AppMode,
    pub status_line: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            session: Session::default(),
            mode: AppMode::Nav,
            status_line: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    NextPage,
    ShowPage(Page),
    OpenCustomer(CustomerId),
    CloseDetail,
    BeginInput(InputKind),
    EndInput,
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    PageChanged(Page),
    CustomerOpened(CustomerId),
    ModeChanged(AppMode),
    StatusUpdated(String),
    StatusCleared,
}

impl AppState {
    pub fn with_start_page(page: Page) -> Self {
        Self {
            session: Session::list(page),
            ..Self::default()
        }
    }

    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::NextPage => {
                let next = match self.session.page {
                    Page::Open => Page::Settled,
                    Page::Settled => Page::Open,
                    Page::Detail => self.session.origin,
                };
                self.show(Session::list(next))
            }
            AppCommand::ShowPage(Page::Detail) => {
                // No selection is a valid state; the detail page warns.
                let session = Session {
                    page: Page::Detail,
                    ..self.session
                };
                self.show(session)
            }
            AppCommand::ShowPage(page) => self.show(Session::list(page)),
            AppCommand::OpenCustomer(customer_id) => {
                let origin = match self.session.page {
                    Page::Detail => self.session.origin,
                    page => page,
                };
                let mut events = self.show(Session::detail(customer_id, origin));
                events.push(AppEvent::CustomerOpened(customer_id));
                events
            }
            AppCommand::CloseDetail => {
                let origin = self.session.origin;
                self.show(Session::list(origin))
            }
            AppCommand::BeginInput(kind) => {
                self.mode = AppMode::Input(kind);
                vec![AppEvent::ModeChanged(self.mode)]
            }
            AppCommand::EndInput => {
                self.mode = AppMode::Nav;
                vec![AppEvent::ModeChanged(self.mode)]
            }
            AppCommand::SetStatus(message) => vec![self.set_status(message)],
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    fn show(&mut self, session: Session) -> Vec<AppEvent> {
        self.session = session;
        let mut events = vec![AppEvent::PageChanged(session.page)];
        if self.mode != AppMode::Nav {
            self.mode = AppMode::Nav;
            events.push(AppEvent::ModeChanged(self.mode));
        }
        events
    }

    fn set_status(&mut self, message: String) -> AppEvent {
        self.status_line = Some(message.clone());
        AppEvent::StatusUpdated(message)
    }
}

#[cfg(test)]
mod tests {
    use super::{AppCommand, AppEvent, AppState, Session};
    use crate::{AppMode, CustomerId, InputKind, Page};

    #[test]
    fn next_page_toggles_between_list_pages() {
        let mut state = AppState::default();

        let events = state.dispatch(AppCommand::NextPage);
        assert_eq!(state.session, Session::list(Page::Settled));
        assert_eq!(events, vec![AppEvent::PageChanged(Page::Settled)]);

        state.dispatch(AppCommand::NextPage);
        assert_eq!(state.session.page, Page::Open);
    }

    #[test]
    fn opening_a_customer_remembers_the_origin_page() {
        let mut state = AppState::with_start_page(Page::Settled);

        let events = state.dispatch(AppCommand::OpenCustomer(CustomerId::new(7)));
        assert_eq!(state.session.page, Page::Detail);
        assert_eq!(state.session.selected_customer(), Some(CustomerId::new(7)));
        assert_eq!(
            events,
            vec![
                AppEvent::PageChanged(Page::Detail),
                AppEvent::CustomerOpened(CustomerId::new(7)),
            ],
        );

        state.dispatch(AppCommand::CloseDetail);
        assert_eq!(state.session, Session::list(Page::Settled));
        assert_eq!(state.session.selected_customer(), None);
    }

    #[test]
    fn detail_without_selection_is_allowed() {
        let mut state = AppState::default();
        state.dispatch(AppCommand::ShowPage(Page::Detail));
        assert_eq!(state.session.page, Page::Detail);
        assert_eq!(state.session.selected_customer(), None);
    }

    #[test]
    fn page_change_leaves_input_mode() {
        let mut state = AppState::default();
        state.dispatch(AppCommand::BeginInput(InputKind::NewCustomer));
        assert_eq!(state.mode, AppMode::Input(InputKind::NewCustomer));

        let events = state.dispatch(AppCommand::NextPage);
        assert_eq!(state.mode, AppMode::Nav);
        assert!(events.contains(&AppEvent::ModeChanged(AppMode::Nav)));
    }

    #[test]
    fn status_set_and_clear() {
        let mut state = AppState::default();
        let events = state.dispatch(AppCommand::SetStatus("Tanaka settled".to_owned()));
        assert_eq!(state.status_line.as_deref(), Some("Tanaka settled"));
        assert_eq!(
            events,
            vec![AppEvent::StatusUpdated("Tanaka settled".to_owned())]
        );

        state.dispatch(AppCommand::ClearStatus);
        assert!(state.status_line.is_none());
    }
}
