use std::collections::VecDeque;

/// Wire values for [`Event`] kinds.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    None = 0,
    Quit = 1,
    ContentLoaded = 2,
    ScriptNotify = 3,
}

/// An event surfaced by [`Window::poll`](crate::Window::poll).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Nothing happened during a non-blocking poll.
    None,
    /// The window was closed and the message loop has ended.
    Quit,
    /// The document finished parsing (`DOMContentLoaded`).
    ContentLoaded,
    /// The page called `window.external.notify(text)`.
    ScriptNotify(String),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::None => EventKind::None,
            Self::Quit => EventKind::Quit,
            Self::ContentLoaded => EventKind::ContentLoaded,
            Self::ScriptNotify(_) => EventKind::ScriptNotify,
        }
    }

    pub fn payload(&self) -> Option<&str> {
        match self {
            Self::ScriptNotify(text) => Some(text),
            _ => None,
        }
    }

    pub fn into_payload(self) -> Option<String> {
        match self {
            Self::ScriptNotify(text) => Some(text),
            _ => None,
        }
    }
}

/// FIFO buffer of events raised by control handlers on the UI thread.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<Event>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: Event) {
        self.events.push_back(event);
    }

    pub fn pop(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
