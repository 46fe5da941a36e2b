use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEventKind};

use crate::app::model::Focus;
use crate::app::{App, Message, Model};

use super::event_loop::ResizeDebouncer;

const PAGE_SCROLL_LINES: u16 = 10;

impl App {
    pub(super) fn handle_event(
        event: &Event,
        model: &Model,
        now_ms: u64,
        resize_debouncer: &mut ResizeDebouncer,
    ) -> Option<Message> {
        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => Self::handle_key(*key, model),
            Event::Mouse(mouse) => match mouse.kind {
                MouseEventKind::ScrollUp => Some(Message::ScrollUp(3)),
                MouseEventKind::ScrollDown => Some(Message::ScrollDown(3)),
                _ => None,
            },
            Event::Resize(w, h) => {
                crate::perf::log_event("event.resize.queue", format!("width={w} height={h}"));
                resize_debouncer.queue(*w, *h, now_ms);
                None
            }
            _ => None,
        }
    }

    pub(super) fn handle_key(key: KeyEvent, model: &Model) -> Option<Message> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        if ctrl {
            return match key.code {
                KeyCode::Char('c' | 'q') => Some(Message::Quit),
                KeyCode::Char('u') => Some(Message::ClearField),
                KeyCode::Char('y') => Some(Message::CopyRawPayload),
                KeyCode::Char('s') => Some(Message::ExportSvg),
                KeyCode::Char('a') => Some(Message::CursorHome),
                KeyCode::Char('e') => Some(Message::CursorEnd),
                _ => None,
            };
        }

        match key.code {
            KeyCode::Esc => {
                if model.banner.is_some() {
                    Some(Message::DismissBanner)
                } else {
                    Some(Message::Quit)
                }
            }
            KeyCode::Tab => Some(Message::FocusNext),
            KeyCode::BackTab => Some(Message::FocusPrev),
            KeyCode::Enter => Some(Message::Submit),
            KeyCode::Up => Some(Message::ScrollUp(1)),
            KeyCode::Down => Some(Message::ScrollDown(1)),
            KeyCode::PageUp => Some(Message::ScrollUp(PAGE_SCROLL_LINES)),
            KeyCode::PageDown => Some(Message::ScrollDown(PAGE_SCROLL_LINES)),
            _ if model.focus == Focus::Generate => match key.code {
                KeyCode::Char(' ') => Some(Message::Submit),
                _ => None,
            },
            KeyCode::Left => Some(Message::CursorLeft),
            KeyCode::Right => Some(Message::CursorRight),
            KeyCode::Home => Some(Message::CursorHome),
            KeyCode::End => Some(Message::CursorEnd),
            KeyCode::Backspace => Some(Message::DeleteBack),
            KeyCode::Delete => Some(Message::DeleteForward),
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::ALT) => {
                Some(Message::InsertChar(c))
            }
            _ => None,
        }
    }
}
