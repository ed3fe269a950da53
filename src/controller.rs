use std::time::Duration;
use tracing::trace;

use crate::domain::{Message, SheetConfig, SheetError};
use crate::model::Model;
use ratatui::crossterm::event::{self, Event, KeyCode, KeyModifiers};

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &SheetConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, SheetError> {
        if !event::poll(Duration::from_millis(self.event_poll_time))? {
            return Ok(None);
        }
        let message = match event::read()? {
            Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                if model.raw_keyevents() {
                    Some(Message::RawKey(key))
                } else {
                    self.handle_key(key)
                }
            }
            Event::Resize(width, height) => Some(Message::Resize(width as usize, height as usize)),
            _ => None,
        };
        Ok(message)
    }

    fn handle_key(&self, key: event::KeyEvent) -> Option<Message> {
        let message = match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Message::Quit),
            (KeyCode::Char('q'), _) => Some(Message::Quit),
            (KeyCode::Up, _) | (KeyCode::Char('k'), KeyModifiers::NONE) => Some(Message::MoveUp),
            (KeyCode::Down, _) | (KeyCode::Char('j'), KeyModifiers::NONE) => Some(Message::MoveDown),
            (KeyCode::Left, _) | (KeyCode::Char('h'), KeyModifiers::NONE) => Some(Message::MoveLeft),
            (KeyCode::Right, _) | (KeyCode::Char('l'), KeyModifiers::NONE) => {
                Some(Message::MoveRight)
            }
            (KeyCode::PageUp, _) => Some(Message::MovePageUp),
            (KeyCode::PageDown, _) => Some(Message::MovePageDown),
            (KeyCode::Home, _) => Some(Message::MoveBeginning),
            (KeyCode::End, _) => Some(Message::MoveEnd),
            (KeyCode::Enter, _) => Some(Message::Enter),
            (KeyCode::Esc, _) => Some(Message::Exit),
            (KeyCode::Delete, _) | (KeyCode::Char('x'), _) => Some(Message::Delete),
            (KeyCode::Char('r'), _) => Some(Message::SelectRow),
            (KeyCode::Char('c'), _) => Some(Message::SelectColumn),
            (KeyCode::Char('s'), _) => Some(Message::Sort),
            (KeyCode::Char('a'), _) => Some(Message::AddRow),
            (KeyCode::Char('A'), _) => Some(Message::AddColumn),
            (KeyCode::Char('v'), _) => Some(Message::ColumnMenu),
            (KeyCode::Tab, _) => Some(Message::NextTab),
            (KeyCode::BackTab, _) => Some(Message::PrevTab),
            (KeyCode::Char('/'), _) => Some(Message::Search),
            (KeyCode::Char('e'), _) => Some(Message::Export),
            (KeyCode::Char('y'), _) => Some(Message::CopyCell),
            (KeyCode::Char('Y'), _) => Some(Message::CopyRow),
            (KeyCode::Char('?'), _) => Some(Message::Help),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}
