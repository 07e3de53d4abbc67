//! Application state and event handling.

use std::collections::VecDeque;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use tasking_proto::task::TaskId;

use crate::controller::TaskSelectionController;
use crate::selection::SelectOutcome;
use crate::sync::{SyncCommand, SyncEvent};

/// Number of status messages kept for the message line.
const MAX_MESSAGES: usize = 50;

/// Which part of the screen receives key presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelFocus {
    /// Task list (default).
    List,
    /// Search box above the list.
    Search,
}

/// Main application state.
pub struct App {
    /// The task selection controller.
    pub controller: TaskSelectionController,
    /// Which panel is focused.
    pub focus: PanelFocus,
    /// Highlighted row on the current list page.
    pub cursor: usize,
    /// Search text being edited.
    pub search_input: String,
    /// Recent status messages, newest last.
    pub messages: VecDeque<String>,
    /// Whether the client is talking to a backend.
    pub online: bool,
    /// Timestamp display format (chrono).
    pub timestamp_format: String,
    /// Whether the app should quit.
    pub should_quit: bool,
}

impl App {
    /// Wraps a controller.
    #[must_use]
    pub fn new(controller: TaskSelectionController) -> Self {
        Self {
            controller,
            focus: PanelFocus::List,
            cursor: 0,
            search_input: String::new(),
            messages: VecDeque::new(),
            online: false,
            timestamp_format: "%Y-%m-%d %H:%M".to_string(),
            should_quit: false,
        }
    }

    /// Sets the timestamp display format.
    #[must_use]
    pub fn with_timestamp_format(mut self, format: &str) -> Self {
        format.clone_into(&mut self.timestamp_format);
        self
    }

    /// Marks the app as connected to a backend.
    #[must_use]
    pub const fn with_online(mut self, online: bool) -> Self {
        self.online = online;
        self
    }

    /// Appends a status message.
    pub fn push_message(&mut self, message: String) {
        if self.messages.len() == MAX_MESSAGES {
            self.messages.pop_front();
        }
        self.messages.push_back(message);
    }

    /// The newest status message.
    #[must_use]
    pub fn last_message(&self) -> Option<&str> {
        self.messages.back().map(String::as_str)
    }

    /// Task id under the list cursor.
    #[must_use]
    pub fn cursor_task(&self) -> Option<TaskId> {
        self.controller
            .list_page()
            .rows
            .get(self.cursor)
            .map(|row| row.id)
    }

    /// Handle a key event.
    ///
    /// Returns a command when the key needs the backend.
    pub fn handle_key_event(&mut self, key: KeyEvent) -> Option<SyncCommand> {
        if let (KeyCode::Char('c'), KeyModifiers::CONTROL) = (key.code, key.modifiers) {
            self.should_quit = true;
            return None;
        }

        match self.focus {
            PanelFocus::List => self.handle_list_key(key),
            PanelFocus::Search => {
                self.handle_search_key(key);
                None
            }
        }
    }

    fn handle_list_key(&mut self, key: KeyEvent) -> Option<SyncCommand> {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Up | KeyCode::Char('k') => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => self.move_cursor_down(),
            KeyCode::Left | KeyCode::Char('h') => {
                self.controller.prev_page();
                self.cursor = 0;
            }
            KeyCode::Right | KeyCode::Char('l') => {
                self.controller.next_page();
                self.cursor = 0;
            }
            KeyCode::Enter | KeyCode::Char(' ') => self.select_under_cursor(),
            KeyCode::Char('f') => {
                self.controller.cycle_filter();
                self.cursor = 0;
            }
            KeyCode::Char('s') => self.controller.toggle_sort(),
            KeyCode::Char('m') => self.controller.toggle_display_mode(),
            KeyCode::Char('/') => self.focus = PanelFocus::Search,
            KeyCode::Char('a') => return self.footer_command(),
            KeyCode::Char('u') => return self.release_command(),
            KeyCode::Char('r') => {
                self.push_message("Reloading tasks".to_string());
                return Some(SyncCommand::Reload);
            }
            _ => {}
        }
        None
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter | KeyCode::Esc => self.focus = PanelFocus::List,
            KeyCode::Char(c) => {
                self.search_input.push(c);
                self.apply_search();
            }
            KeyCode::Backspace => {
                self.search_input.pop();
                self.apply_search();
            }
            _ => {}
        }
    }

    fn apply_search(&mut self) {
        self.controller.set_search(&self.search_input);
        self.cursor = 0;
    }

    fn move_cursor_down(&mut self) {
        let rows = self.controller.list_page().rows.len();
        if self.cursor + 1 < rows {
            self.cursor += 1;
        }
    }

    fn select_under_cursor(&mut self) {
        let Some(id) = self.cursor_task() else {
            return;
        };
        if self.controller.select_task(id) == SelectOutcome::Cleared {
            self.push_message(format!("Task #{id} deselected"));
        }
    }

    fn footer_command(&mut self) -> Option<SyncCommand> {
        let footer = self.controller.footer();
        let action = footer.action.filter(|_| footer.enabled)?;
        if action.is_resume() {
            self.push_message(format!("{}: {}", action.label(), format_ids(&footer.targets)));
            return None;
        }
        let (task_ids, kind) = self.controller.lock_request()?;
        self.push_message(format!("Locking {}", format_ids(&task_ids)));
        Some(SyncCommand::Lock { task_ids, kind })
    }

    fn release_command(&mut self) -> Option<SyncCommand> {
        let Some(task_ids) = self.controller.release_request() else {
            self.push_message("No locks to release".to_string());
            return None;
        };
        self.push_message(format!("Releasing {}", format_ids(&task_ids)));
        Some(SyncCommand::Unlock { task_ids })
    }

    /// Applies one coordinator event.
    pub fn apply_sync_event(&mut self, event: SyncEvent) {
        match event {
            SyncEvent::ProjectLoaded(project) => {
                self.push_message(format!("Project #{} loaded", project.project_id));
                self.controller.on_project_loaded(project);
            }
            SyncEvent::TasksLoaded(Ok(tasks)) => {
                self.push_message(format!("{} tasks loaded", tasks.len()));
                self.controller.on_tasks_loaded(Ok(tasks));
            }
            SyncEvent::TasksLoaded(Err(e)) => {
                self.push_message(format!("Could not load tasks: {e} (press r to retry)"));
                self.controller.on_tasks_loaded(Err(e));
            }
            SyncEvent::Activity { seq, snapshot } => {
                self.controller.on_activity(seq, snapshot);
            }
            SyncEvent::PollFailed { seq, error } => {
                self.controller.on_poll_failed(seq, &error);
            }
            SyncEvent::LockChanged { task_ids, kind } => {
                match kind {
                    Some(_) => self.push_message(format!("Locked {}", format_ids(&task_ids))),
                    None => self.push_message(format!("Released {}", format_ids(&task_ids))),
                }
                self.controller.on_lock_changed(&task_ids, kind);
            }
            SyncEvent::Error(msg) => self.push_message(msg),
        }
        let rows = self.controller.list_page().rows.len();
        self.cursor = self.cursor.min(rows.saturating_sub(1));
    }
}

/// `#1, #2, #3`
fn format_ids(ids: &[TaskId]) -> String {
    ids.iter()
        .map(|id| format!("#{id}"))
        .collect::<Vec<_>>()
        .join(", ")
}
