use super::model::{TuiModel, ViewState};
use crossterm::event::{KeyCode, KeyModifiers};
use gitpulse_core::app::{Command, RepoRegistry, Scope};
use std::path::PathBuf;

/// What a key press asks of the coordinating loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TuiMessage {
    Command(Command),
    /// Handled inside the model, nothing else to do
    None,
}

/// The Update function - maps key presses onto model changes and commands
pub struct TuiUpdate;

impl TuiUpdate {
    pub fn handle_key(
        model: &mut TuiModel,
        registry: &RepoRegistry,
        key: KeyCode,
        modifiers: KeyModifiers,
    ) -> TuiMessage {
        if let Some(msg) = Self::handle_global_keys(model, key, modifiers) {
            return msg;
        }

        match model.state.clone() {
            ViewState::List => Self::handle_list_keys(model, registry, key),
            ViewState::Detail { path } => Self::handle_detail_keys(model, key, path),
            ViewState::Quit => TuiMessage::None,
        }
    }

    /// Keys that mean the same thing on every screen
    fn handle_global_keys(model: &mut TuiModel, key: KeyCode, modifiers: KeyModifiers) -> Option<TuiMessage> {
        match key {
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                Some(TuiMessage::Command(Command::Quit))
            }
            KeyCode::Char('q') if !modifiers.contains(KeyModifiers::CONTROL) => {
                Some(TuiMessage::Command(Command::Quit))
            }
            // Help is dismissed by any other key
            _ if model.show_help => {
                model.show_help = false;
                Some(TuiMessage::None)
            }
            KeyCode::Char('?') => {
                model.show_help = true;
                Some(TuiMessage::None)
            }
            KeyCode::Char('s') => Some(TuiMessage::Command(Command::Rescan)),
            _ => None,
        }
    }

    fn handle_list_keys(model: &mut TuiModel, registry: &RepoRegistry, key: KeyCode) -> TuiMessage {
        match key {
            KeyCode::Up | KeyCode::Char('k') => {
                model.move_selection(registry, -1);
                TuiMessage::None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                model.move_selection(registry, 1);
                TuiMessage::None
            }
            KeyCode::Home => {
                model.select_first(registry);
                TuiMessage::None
            }
            KeyCode::End => {
                model.select_last(registry);
                TuiMessage::None
            }
            KeyCode::Enter | KeyCode::Right | KeyCode::Char('l') => {
                if let Some(path) = model.selected.clone() {
                    model.state = ViewState::Detail { path };
                }
                TuiMessage::None
            }
            KeyCode::Esc => TuiMessage::Command(Command::Quit),
            KeyCode::Char('r') => TuiMessage::Command(Command::Refresh { scope: Scope::All }),
            KeyCode::Char('f') => TuiMessage::Command(Command::Fetch { scope: Scope::All }),
            KeyCode::Char('o') | KeyCode::Char('g') => match model.selected.clone() {
                Some(path) => TuiMessage::Command(Command::OpenExternal { path }),
                None => TuiMessage::None,
            },
            _ => TuiMessage::None,
        }
    }

    fn handle_detail_keys(model: &mut TuiModel, key: KeyCode, path: PathBuf) -> TuiMessage {
        match key {
            KeyCode::Esc | KeyCode::Left | KeyCode::Backspace | KeyCode::Char('h') | KeyCode::Char('b') => {
                if model.single_repo() {
                    // Nothing to go back to
                    TuiMessage::Command(Command::Quit)
                } else {
                    model.selected = Some(path);
                    model.state = ViewState::List;
                    TuiMessage::None
                }
            }
            KeyCode::Char('r') => TuiMessage::Command(Command::Refresh {
                scope: Scope::One(path),
            }),
            KeyCode::Char('f') => TuiMessage::Command(Command::Fetch {
                scope: Scope::One(path),
            }),
            KeyCode::Char('o') | KeyCode::Char('g') => TuiMessage::Command(Command::OpenExternal { path }),
            _ => TuiMessage::None,
        }
    }
}
