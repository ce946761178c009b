//! Headless helpers for exercising models and components without a terminal.

use crate::command::{Command, CommandInner};
use crate::event::TerminalEvent;
use crate::model::Model;
use futures::future::BoxFuture;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::Terminal;
use std::collections::VecDeque;

/// A headless test harness that drives a [`Model`] without a real terminal.
///
/// Immediate messages ([`Command::message`]) are queued and flushed with
/// [`drain_messages`](TestProgram::drain_messages). Futures and timers are
/// held until [`settle`](TestProgram::settle) awaits them, which pairs well
/// with `#[tokio::test(start_paused = true)]`: paused time auto-advances, so
/// a 500 ms timer resolves instantly and deterministically.
///
/// ```ignore
/// let mut prog = TestProgram::<App>::new(());
/// prog.event(TerminalEvent::Key(key(KeyCode::Char('1'))));
/// assert!(prog.render_string(40, 3).contains("1"));
/// prog.settle().await;
/// ```
pub struct TestProgram<M: Model> {
    model: M,
    pending_messages: VecDeque<M::Message>,
    pending_futures: Vec<BoxFuture<'static, M::Message>>,
    quit: bool,
}

impl<M: Model> TestProgram<M> {
    /// Create a test program by calling [`Model::init`] with the given flags.
    pub fn new(flags: M::Flags) -> Self {
        let (model, init_cmd) = M::init(flags);
        let mut program = Self {
            model,
            pending_messages: VecDeque::new(),
            pending_futures: Vec::new(),
            quit: false,
        };
        program.collect(init_cmd);
        program
    }

    /// Send a message, triggering a single update cycle.
    pub fn send(&mut self, msg: M::Message) {
        let cmd = self.model.update(msg);
        self.collect(cmd);
    }

    /// Offer a terminal event to [`Model::event`] and send the resulting
    /// message, if any. Returns whether a message was produced.
    pub fn event(&mut self, event: TerminalEvent) -> bool {
        match self.model.event(event) {
            Some(msg) => {
                self.send(msg);
                true
            }
            None => false,
        }
    }

    /// Process queued immediate messages until no new ones are produced.
    pub fn drain_messages(&mut self) {
        while let Some(msg) = self.pending_messages.pop_front() {
            let cmd = self.model.update(msg);
            self.collect(cmd);
        }
    }

    /// Await every pending future (including timers started by the messages
    /// they produce) and feed the results back through `update`.
    pub async fn settle(&mut self) {
        loop {
            self.drain_messages();
            if self.pending_futures.is_empty() {
                break;
            }
            let futures = std::mem::take(&mut self.pending_futures);
            for msg in futures::future::join_all(futures).await {
                self.send(msg);
            }
        }
    }

    /// Number of futures waiting for [`settle`](TestProgram::settle).
    pub fn pending_futures(&self) -> usize {
        self.pending_futures.len()
    }

    /// Whether any command so far asked the program to quit.
    pub fn quit_requested(&self) -> bool {
        self.quit
    }

    /// Shared reference to the model for assertions.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Mutable reference to the model for direct test setup.
    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    /// Render the model to a ratatui [`Buffer`] of the given dimensions.
    pub fn render(&self, width: u16, height: u16) -> Buffer {
        render_with(width, height, |frame| self.model.view(frame))
    }

    /// Render the model and return the visible content as a plain string,
    /// rows separated by newlines.
    pub fn render_string(&self, width: u16, height: u16) -> String {
        buffer_to_string(&self.render(width, height))
    }

    fn collect(&mut self, cmd: Command<M::Message>) {
        match cmd.inner {
            CommandInner::None => {}
            CommandInner::Message(msg) => self.pending_messages.push_back(msg),
            CommandInner::Quit => self.quit = true,
            CommandInner::Future(fut) => self.pending_futures.push(fut),
            CommandInner::Batch(cmds) => {
                for cmd in cmds {
                    self.collect(cmd);
                }
            }
        }
    }
}

/// Execute a command outside any runtime and return the messages it
/// produces, in order. Futures are awaited; quit is ignored.
///
/// Useful for testing a [`Component`](crate::Component) directly:
///
/// ```
/// use pincode_core::{testing::resolve, Command};
///
/// let msgs = futures::executor::block_on(resolve(Command::batch([
///     Command::message(1),
///     Command::perform(async { 2 }, |n| n),
/// ])));
/// assert_eq!(msgs, vec![1, 2]);
/// ```
pub async fn resolve<Msg: Send + 'static>(cmd: Command<Msg>) -> Vec<Msg> {
    let mut out = Vec::new();
    let mut futures = Vec::new();
    flatten(cmd, &mut out, &mut futures);
    out.extend(futures::future::join_all(futures).await);
    out
}

fn flatten<Msg: Send + 'static>(
    cmd: Command<Msg>,
    out: &mut Vec<Msg>,
    futures: &mut Vec<BoxFuture<'static, Msg>>,
) {
    match cmd.inner {
        CommandInner::None | CommandInner::Quit => {}
        CommandInner::Message(msg) => out.push(msg),
        CommandInner::Future(fut) => futures.push(fut),
        CommandInner::Batch(cmds) => {
            for cmd in cmds {
                flatten(cmd, out, futures);
            }
        }
    }
}

/// Draw into a headless [`TestBackend`](ratatui::backend::TestBackend) and
/// return the buffer.
pub fn render_with(width: u16, height: u16, draw: impl FnOnce(&mut ratatui::Frame)) -> Buffer {
    let backend = ratatui::backend::TestBackend::new(width, height);
    let mut terminal = Terminal::new(backend).unwrap();
    terminal.draw(draw).unwrap();
    terminal.backend().buffer().clone()
}

/// Flatten a buffer into rows of symbols separated by newlines.
pub fn buffer_to_string(buf: &Buffer) -> String {
    let area: Rect = buf.area;
    let mut output = String::new();
    for y in area.top()..area.bottom() {
        for x in area.left()..area.right() {
            output.push_str(buf[(x, y)].symbol());
        }
        if y + 1 < area.bottom() {
            output.push('\n');
        }
    }
    output
}
