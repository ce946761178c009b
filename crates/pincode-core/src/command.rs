use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A side effect returned from [`Model::update`](crate::Model::update),
/// [`Component::update`](crate::Component::update), or [`Model::init`](crate::Model::init).
///
/// Commands are descriptions, not actions: nothing runs until the runtime (or
/// [`TestProgram`](crate::testing::TestProgram)) executes them. Deferred work
/// such as the re-mask timer of a secure pincode is expressed as a
/// [`tick`](Command::tick) whose message comes back through `update`.
///
/// # Examples
///
/// ```
/// use pincode_core::Command;
/// use std::time::Duration;
///
/// #[derive(Debug, PartialEq)]
/// enum Msg { Masked(u64) }
///
/// let cmd: Command<Msg> = Command::none();
/// assert!(cmd.is_none());
///
/// let timer = Command::tick(Duration::from_millis(500), |_| Msg::Masked(1));
/// assert!(!timer.is_none());
/// ```
pub struct Command<Msg: Send + 'static> {
    pub(crate) inner: CommandInner<Msg>,
}

pub(crate) enum CommandInner<Msg: Send + 'static> {
    None,
    Message(Msg),
    Quit,
    Future(BoxFuture<'static, Msg>),
    Batch(Vec<Command<Msg>>),
}

impl<Msg: Send + 'static> Command<Msg> {
    /// No-op command.
    pub fn none() -> Self {
        Command {
            inner: CommandInner::None,
        }
    }

    /// Deliver a message on the next loop iteration.
    pub fn message(msg: Msg) -> Self {
        Command {
            inner: CommandInner::Message(msg),
        }
    }

    /// Stop the program after the current update.
    pub fn quit() -> Self {
        Command {
            inner: CommandInner::Quit,
        }
    }

    /// Run an async future and map its output to a message.
    pub fn perform<F, T>(future: F, map: impl FnOnce(T) -> Msg + Send + 'static) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Command {
            inner: CommandInner::Future(Box::pin(async move { map(future.await) })),
        }
    }

    /// One-shot timer: fires once after `duration`.
    pub fn tick(duration: Duration, map: impl FnOnce(Instant) -> Msg + Send + 'static) -> Self {
        Command {
            inner: CommandInner::Future(Box::pin(async move {
                tokio::time::sleep(duration).await;
                map(Instant::now())
            })),
        }
    }

    /// Run several commands concurrently. Empty batches collapse to
    /// [`none`](Command::none) and single-element batches to that element.
    pub fn batch(cmds: impl IntoIterator<Item = Command<Msg>>) -> Self {
        let mut cmds: Vec<_> = cmds.into_iter().filter(|cmd| !cmd.is_none()).collect();
        match cmds.len() {
            0 => Command::none(),
            1 => cmds.pop().unwrap_or_else(Command::none),
            _ => Command {
                inner: CommandInner::Batch(cmds),
            },
        }
    }

    /// Transform the message type (for component composition).
    pub fn map<NewMsg: Send + 'static>(
        self,
        f: impl Fn(Msg) -> NewMsg + Send + Sync + 'static,
    ) -> Command<NewMsg> {
        self.map_with(Arc::new(f))
    }

    fn map_with<NewMsg: Send + 'static>(
        self,
        f: Arc<dyn Fn(Msg) -> NewMsg + Send + Sync>,
    ) -> Command<NewMsg> {
        match self.inner {
            CommandInner::None => Command::none(),
            CommandInner::Message(msg) => Command::message(f(msg)),
            CommandInner::Quit => Command::quit(),
            CommandInner::Future(fut) => Command {
                inner: CommandInner::Future(Box::pin(async move { f(fut.await) })),
            },
            CommandInner::Batch(cmds) => Command {
                inner: CommandInner::Batch(
                    cmds.into_iter().map(|cmd| cmd.map_with(f.clone())).collect(),
                ),
            },
        }
    }

    // --- Inspection methods (useful for testing) ---

    /// Returns `true` if this is a no-op command.
    pub fn is_none(&self) -> bool {
        matches!(self.inner, CommandInner::None)
    }

    /// Returns `true` if this command stops the program.
    pub fn is_quit(&self) -> bool {
        matches!(self.inner, CommandInner::Quit)
    }

    /// If this command is an immediate message, return it.
    pub fn into_message(self) -> Option<Msg> {
        match self.inner {
            CommandInner::Message(msg) => Some(msg),
            _ => None,
        }
    }

    /// If this command is a batch, return the inner commands.
    pub fn into_batch(self) -> Option<Vec<Command<Msg>>> {
        match self.inner {
            CommandInner::Batch(cmds) => Some(cmds),
            _ => None,
        }
    }
}

impl<Msg: Send + 'static> Default for Command<Msg> {
    fn default() -> Self {
        Command::none()
    }
}

impl<Msg: Send + 'static> std::fmt::Debug for Command<Msg> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            CommandInner::None => f.write_str("Command::None"),
            CommandInner::Message(_) => f.write_str("Command::Message(..)"),
            CommandInner::Quit => f.write_str("Command::Quit"),
            CommandInner::Future(_) => f.write_str("Command::Future(..)"),
            CommandInner::Batch(cmds) => f.debug_tuple("Command::Batch").field(cmds).finish(),
        }
    }
}
