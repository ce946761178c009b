use crate::command::{Command, CommandInner};
use crate::event::TerminalEvent;
use crate::model::Model;
use crossterm::{
    cursor,
    event::{
        DisableBracketedPaste, DisableFocusChange, DisableMouseCapture, EnableBracketedPaste,
        EnableFocusChange, EnableMouseCapture, EventStream,
    },
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen, SetTitle,
    },
};
use futures::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{stdout, Stdout};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing_subscriber::EnvFilter;

/// Errors that can occur while initializing or running a [`Program`].
#[derive(Debug, thiserror::Error)]
pub enum ProgramError {
    /// An I/O error from terminal setup, rendering, or teardown.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The log file subscriber could not be installed.
    #[error("failed to install log subscriber: {0}")]
    Log(String),
}

/// Configuration options for a [`Program`].
///
/// Use struct update syntax to override only what you need:
///
/// ```
/// use pincode_core::ProgramOptions;
///
/// let opts = ProgramOptions {
///     mouse_capture: true,
///     title: Some("Verify".into()),
///     ..ProgramOptions::default()
/// };
/// assert!(opts.bracketed_paste);
/// ```
#[derive(Debug, Clone)]
pub struct ProgramOptions {
    /// Target frames per second (default: 60, clamped to 1..=120).
    pub fps: u32,
    /// Start in the alternate screen (default: true).
    pub alt_screen: bool,
    /// Capture mouse clicks (default: false).
    pub mouse_capture: bool,
    /// Deliver pastes as a single [`TerminalEvent::Paste`] (default: true).
    pub bracketed_paste: bool,
    /// Report terminal focus changes as [`TerminalEvent::FocusGained`] and
    /// [`TerminalEvent::FocusLost`] (default: true).
    pub focus_reporting: bool,
    /// Terminal title.
    pub title: Option<String>,
    /// Restore the terminal before the panic message is printed (default: true).
    pub catch_panics: bool,
    /// Quit on SIGINT delivered outside raw mode (default: true).
    pub handle_signals: bool,
    /// Send `tracing` output to this file. The terminal is owned by the UI,
    /// so logs cannot go to stdout or stderr.
    pub log_file: Option<PathBuf>,
}

impl Default for ProgramOptions {
    fn default() -> Self {
        Self {
            fps: 60,
            alt_screen: true,
            mouse_capture: false,
            bracketed_paste: true,
            focus_reporting: true,
            title: None,
            catch_panics: true,
            handle_signals: true,
            log_file: None,
        }
    }
}

/// The program runtime. Manages terminal setup, the event loop, and the
/// full [`Model`] lifecycle.
///
/// ```no_run
/// # use pincode_core::{Program, ProgramError, Model};
/// # async fn demo<M: Model<Flags = ()>>() -> Result<(), ProgramError> {
/// let model = Program::<M>::new(())?.run().await?;
/// # let _ = model;
/// # Ok(())
/// # }
/// ```
pub struct Program<M: Model> {
    model: M,
    terminal: Terminal<CrosstermBackend<Stdout>>,
    msg_tx: mpsc::UnboundedSender<M::Message>,
    msg_rx: mpsc::UnboundedReceiver<M::Message>,
    options: ProgramOptions,
    needs_redraw: bool,
    should_quit: bool,
}

impl<M: Model> Program<M> {
    /// Create a new program with default options.
    pub fn new(flags: M::Flags) -> Result<Self, ProgramError> {
        Self::with_options(flags, ProgramOptions::default())
    }

    /// Create a new program with custom options.
    pub fn with_options(flags: M::Flags, options: ProgramOptions) -> Result<Self, ProgramError> {
        if let Some(path) = &options.log_file {
            log_to_file(path)?;
        }
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        let (model, init_cmd) = M::init(flags);
        let terminal = init_terminal(&options)?;

        let mut program = Self {
            model,
            terminal,
            msg_tx,
            msg_rx,
            options,
            needs_redraw: true,
            should_quit: false,
        };
        tracing::debug!("program initialized");
        program.execute_command(init_cmd);
        Ok(program)
    }

    /// Run the program until the model returns [`Command::quit`]. Returns the
    /// final model.
    pub async fn run(mut self) -> Result<M, ProgramError> {
        let result = self.event_loop().await;
        tracing::debug!("shutting down");
        restore_terminal(self.options.alt_screen)?;
        result.map(|()| self.model)
    }

    async fn event_loop(&mut self) -> Result<(), ProgramError> {
        self.render()?;

        let fps = self.options.fps.clamp(1, 120);
        let mut frame_interval = tokio::time::interval(Duration::from_secs_f64(1.0 / f64::from(fps)));
        frame_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut events = EventStream::new();
        let handle_signals = self.options.handle_signals;

        while !self.should_quit {
            tokio::select! {
                biased;

                _ = tokio::signal::ctrl_c(), if handle_signals => {
                    tracing::info!("received ctrl+c signal");
                    return Ok(());
                }

                Some(msg) = self.msg_rx.recv() => {
                    self.process_message(msg);
                }

                event = events.next() => match event {
                    Some(Ok(event)) => self.process_event(event),
                    Some(Err(err)) => return Err(err.into()),
                    None => return Ok(()),
                },

                _ = frame_interval.tick() => {
                    if self.needs_redraw {
                        self.render()?;
                        self.needs_redraw = false;
                    }
                }
            }
        }
        Ok(())
    }

    fn process_event(&mut self, event: crossterm::event::Event) {
        let Some(event) = TerminalEvent::from_crossterm(event) else {
            return;
        };
        if matches!(event, TerminalEvent::Resize(..)) {
            self.needs_redraw = true;
        }
        if let Some(msg) = self.model.event(event) {
            self.process_message(msg);
        }
    }

    fn process_message(&mut self, msg: M::Message) {
        let cmd = self.model.update(msg);
        self.execute_command(cmd);
        self.needs_redraw = true;
    }

    fn execute_command(&mut self, cmd: Command<M::Message>) {
        match cmd.inner {
            CommandInner::None => {}
            CommandInner::Message(msg) => {
                let _ = self.msg_tx.send(msg);
            }
            CommandInner::Quit => {
                self.should_quit = true;
            }
            CommandInner::Future(fut) => {
                let tx = self.msg_tx.clone();
                tokio::spawn(async move {
                    let _ = tx.send(fut.await);
                });
            }
            CommandInner::Batch(cmds) => {
                for cmd in cmds {
                    self.execute_command(cmd);
                }
            }
        }
    }

    fn render(&mut self) -> Result<(), ProgramError> {
        self.terminal.draw(|frame| self.model.view(frame))?;
        Ok(())
    }
}

fn init_terminal(options: &ProgramOptions) -> Result<Terminal<CrosstermBackend<Stdout>>, ProgramError> {
    // Installed once so repeated programs don't stack hooks.
    if options.catch_panics {
        use std::sync::Once;
        static HOOK_INSTALLED: Once = Once::new();
        let alt_screen = options.alt_screen;
        HOOK_INSTALLED.call_once(|| {
            let original_hook = std::panic::take_hook();
            std::panic::set_hook(Box::new(move |info| {
                let _ = restore_terminal(alt_screen);
                original_hook(info);
            }));
        });
    }

    enable_raw_mode()?;
    let mut writer = stdout();
    if options.alt_screen {
        execute!(writer, EnterAlternateScreen)?;
    }
    if options.bracketed_paste {
        execute!(writer, EnableBracketedPaste)?;
    }
    if options.mouse_capture {
        execute!(writer, EnableMouseCapture)?;
    }
    if options.focus_reporting {
        execute!(writer, EnableFocusChange)?;
    }
    if let Some(title) = &options.title {
        execute!(writer, SetTitle(title))?;
    }
    execute!(writer, cursor::Hide)?;

    Ok(Terminal::new(CrosstermBackend::new(writer))?)
}

fn restore_terminal(alt_screen: bool) -> Result<(), std::io::Error> {
    // Best effort: keep going so as much state as possible is restored.
    let raw = disable_raw_mode();
    let mut writer = stdout();
    execute!(writer, DisableBracketedPaste).ok();
    execute!(writer, DisableMouseCapture).ok();
    execute!(writer, DisableFocusChange).ok();
    execute!(writer, cursor::Show).ok();
    if alt_screen {
        execute!(writer, LeaveAlternateScreen).ok();
    }
    raw
}

/// Route `tracing` output to `path` (opened in append mode).
///
/// The filter comes from `RUST_LOG` and defaults to `info`. Fails if a
/// global subscriber is already installed.
///
/// ```no_run
/// pincode_core::log_to_file("pincode.log").unwrap();
/// tracing::info!("written to pincode.log");
/// ```
pub fn log_to_file(path: impl AsRef<Path>) -> Result<(), ProgramError> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|err| ProgramError::Log(err.to_string()))
}
