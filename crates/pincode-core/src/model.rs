use crate::command::Command;
use crate::event::TerminalEvent;
use ratatui::Frame;

/// The top-level application trait, following the [Elm Architecture].
///
/// The runtime drives an **init -> update -> view** cycle:
///
/// 1. [`init`](Model::init) creates the initial state and may return a
///    [`Command`] for early side effects.
/// 2. [`view`](Model::view) renders the current state to a [`ratatui::Frame`].
/// 3. Terminal input is offered to [`event`](Model::event), which turns it
///    into a message (or ignores it).
/// 4. [`update`](Model::update) processes each message, mutates state, and
///    optionally returns a [`Command`] for further work.
///
/// # Example
///
/// ```
/// use pincode_core::{Command, Model, TerminalEvent};
/// use ratatui::Frame;
/// use ratatui::widgets::Paragraph;
///
/// struct Digits { typed: String }
///
/// enum Msg { Digit(char) }
///
/// impl Model for Digits {
///     type Message = Msg;
///     type Flags = ();
///
///     fn init(_: ()) -> (Self, Command<Msg>) {
///         (Digits { typed: String::new() }, Command::none())
///     }
///
///     fn update(&mut self, msg: Msg) -> Command<Msg> {
///         let Msg::Digit(c) = msg;
///         self.typed.push(c);
///         Command::none()
///     }
///
///     fn view(&self, frame: &mut Frame) {
///         frame.render_widget(Paragraph::new(self.typed.as_str()), frame.area());
///     }
///
///     fn event(&self, event: TerminalEvent) -> Option<Msg> {
///         match event {
///             TerminalEvent::Key(key) => key.code.as_char().filter(char::is_ascii_digit).map(Msg::Digit),
///             _ => None,
///         }
///     }
/// }
/// ```
///
/// [Elm Architecture]: https://guide.elm-lang.org/architecture/
pub trait Model: Sized + Send + 'static {
    /// The application's message type.
    type Message: Send + 'static;

    /// Initialization data passed to [`Model::init`]. Use `()` when none is
    /// needed.
    type Flags: Send + 'static;

    /// Create the initial model state and an optional startup command.
    fn init(flags: Self::Flags) -> (Self, Command<Self::Message>);

    /// Process a message, mutate state, and return a command for side effects.
    fn update(&mut self, msg: Self::Message) -> Command<Self::Message>;

    /// Render the current state. Must be a pure function of `&self`.
    fn view(&self, frame: &mut Frame);

    /// Map a terminal event into a message. The default ignores everything.
    fn event(&self, event: TerminalEvent) -> Option<Self::Message> {
        let _ = event;
        None
    }
}
