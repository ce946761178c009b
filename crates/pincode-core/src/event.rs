use crossterm::event::{Event, KeyEvent, KeyEventKind, MouseEvent};

/// Terminal events produced by the runtime's event loop.
///
/// The runtime hands every event to [`Model::event`](crate::Model::event),
/// which maps it into the application's message type. Each variant wraps the
/// corresponding [`crossterm::event::Event`] payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalEvent {
    /// A key press or repeat. Releases are filtered out by the runtime.
    Key(KeyEvent),
    /// A mouse event.
    Mouse(MouseEvent),
    /// Terminal resized to (columns, rows).
    Resize(u16, u16),
    /// Terminal window gained focus.
    FocusGained,
    /// Terminal window lost focus.
    FocusLost,
    /// Bracketed paste content.
    Paste(String),
}

impl TerminalEvent {
    /// Convert a crossterm event, dropping key releases (Windows reports both
    /// press and release, which would double every keystroke).
    pub fn from_crossterm(event: Event) -> Option<Self> {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Release => None,
            other => Some(other.into()),
        }
    }
}

impl From<Event> for TerminalEvent {
    fn from(event: Event) -> Self {
        match event {
            Event::Key(k) => TerminalEvent::Key(k),
            Event::Mouse(m) => TerminalEvent::Mouse(m),
            Event::Resize(w, h) => TerminalEvent::Resize(w, h),
            Event::FocusGained => TerminalEvent::FocusGained,
            Event::FocusLost => TerminalEvent::FocusLost,
            Event::Paste(s) => TerminalEvent::Paste(s),
        }
    }
}
