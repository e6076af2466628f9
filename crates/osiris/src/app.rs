use crate::launch::{SessionKind, SessionRequest};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use osiris_core::{Entity, ListSurface, RowView, SharedState, StatusLine};
use ratatui::widgets::ListState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Search(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAction {
    None,
    Quit,
    Refresh,
    Launch(SessionRequest),
}

/// What the terminal shows. Rows arrive through the UI queue; selection
/// and search state live in [`SharedState`] and are mirrored here.
pub struct Dashboard {
    pub rows: Vec<RowView>,
    pub list_state: ListState,
    pub status: StatusLine,
    pub mode: InputMode,
    pub notice: Option<String>,
    state: SharedState,
}

impl Dashboard {
    pub fn new(state: SharedState) -> Self {
        Self {
            rows: Vec::new(),
            list_state: ListState::default(),
            status: StatusLine::Loading,
            mode: InputMode::Normal,
            notice: None,
            state,
        }
    }

    pub fn selected_entity(&self) -> Option<Entity> {
        self.state.selected_entity()
    }

    pub fn search_query(&self) -> String {
        self.state.search_query()
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> KeyAction {
        if let InputMode::Search(buffer) = &mut self.mode {
            match key.code {
                KeyCode::Esc => self.mode = InputMode::Normal,
                KeyCode::Enter => {
                    let query = buffer.trim().to_string();
                    self.mode = InputMode::Normal;
                    self.commit_search(&query);
                }
                KeyCode::Backspace => {
                    buffer.pop();
                }
                KeyCode::Char(ch) => buffer.push(ch),
                _ => {}
            }
            return KeyAction::None;
        }

        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return KeyAction::Quit;
        }
        self.notice = None;
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => return KeyAction::Quit,
            KeyCode::Down | KeyCode::Char('j') => {
                let selected = self.state.move_selection(1);
                self.list_state.select(selected);
            }
            KeyCode::Up | KeyCode::Char('k') => {
                let selected = self.state.move_selection(-1);
                self.list_state.select(selected);
            }
            KeyCode::Char(' ') => return KeyAction::Refresh,
            KeyCode::Char('/') => self.mode = InputMode::Search(String::new()),
            KeyCode::Char('n') | KeyCode::Char('N') => self.search_next(),
            KeyCode::Char('s') | KeyCode::Char('S') => return self.launch(SessionKind::Ssh),
            KeyCode::Char('r') | KeyCode::Char('R') => return self.launch(SessionKind::Rdp),
            _ => {}
        }
        KeyAction::None
    }

    fn commit_search(&mut self, query: &str) {
        self.state.set_search_query(query);
        self.search_next();
    }

    fn search_next(&mut self) {
        let query = self.state.search_query();
        if query.is_empty() {
            return;
        }
        match self.state.search_next() {
            Some(index) => self.list_state.select(Some(index)),
            None => self.notice = Some(format!("No match for '{query}'")),
        }
    }

    fn launch(&mut self, kind: SessionKind) -> KeyAction {
        match self.state.selected_entity() {
            Some(entity) => KeyAction::Launch(SessionRequest {
                kind,
                address: entity.address,
            }),
            None => KeyAction::None,
        }
    }
}

impl ListSurface for Dashboard {
    fn clear(&mut self) {
        self.rows.clear();
        self.list_state.select(None);
    }

    fn append_row(&mut self, row: RowView) {
        self.rows.push(row);
    }

    fn set_selection(&mut self, index: Option<usize>) {
        self.list_state.select(index);
    }

    fn set_status(&mut self, status: StatusLine) {
        self.status = status;
    }
}
