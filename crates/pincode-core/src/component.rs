use crate::command::Command;
use ratatui::{layout::Rect, Frame};

/// A reusable sub-model that renders into a given [`Rect`] area.
///
/// `Component` mirrors [`Model`](crate::Model) with two differences:
/// [`view`](Component::view) receives the area to draw into, and every method
/// gets the shared [`Context`](Component::Context) the component lives in
/// (for the pincode widget, the document its markup is mounted into). The
/// parent owns the context and lends it out per call, so several components
/// can share one tree without interior mutability.
///
/// Parents wrap the component's message in one of their own variants and
/// lift returned commands with [`Command::map`]:
///
/// ```ignore
/// fn update(&mut self, msg: AppMsg) -> Command<AppMsg> {
///     match msg {
///         AppMsg::Pin(m) => self.pin.update(&mut self.doc, m).map(AppMsg::Pin),
///     }
/// }
/// ```
pub trait Component: Send + 'static {
    /// The component's internal message type.
    type Message: Send + 'static;

    /// State shared between the parent and its components.
    type Context;

    /// Process a message, mutate state, and return a [`Command`] for side effects.
    fn update(&mut self, cx: &mut Self::Context, msg: Self::Message) -> Command<Self::Message>;

    /// Render into `area` of the [`Frame`]. Implementations must confine
    /// drawing to that rectangle.
    fn view(&self, cx: &Self::Context, frame: &mut Frame, area: Rect);

    /// Whether this component currently has focus. Parents use it to route
    /// keyboard input.
    fn focused(&self, cx: &Self::Context) -> bool {
        let _ = cx;
        false
    }
}
