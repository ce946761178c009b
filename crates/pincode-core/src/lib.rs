//! Elm-style runtime layer for the **pincode** widget.
//!
//! `pincode-core` provides the traits and types that connect a widget's state
//! machine to a terminal. The design follows the [Elm Architecture]: state
//! changes happen in `update`, rendering in `view`, and every side effect
//! (including the re-mask timer of a secure pincode) is described by a
//! [`Command`] that the runtime executes.
//!
//! # Key types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`Model`] | Top-level application trait (init / update / view / event) |
//! | [`Component`] | Reusable sub-model that renders into a [`ratatui::layout::Rect`] |
//! | [`Command`] | Describes a side effect to be executed by the runtime |
//! | [`TerminalEvent`] | Keyboard, mouse, paste, and resize input |
//! | [`Program`] | Wires a [`Model`] to a real terminal and drives the event loop |
//! | [`TestProgram`](testing::TestProgram) | Headless harness for unit-testing a [`Model`] |
//!
//! [Elm Architecture]: https://guide.elm-lang.org/architecture/

pub mod command;
pub mod component;
pub mod event;
pub mod model;
pub mod runtime;
pub mod testing;

pub use command::Command;
pub use component::Component;
pub use event::TerminalEvent;
pub use model::Model;
pub use runtime::{log_to_file, Program, ProgramError, ProgramOptions};

/// Run an application with default options.
pub async fn run<M: Model>(flags: M::Flags) -> Result<M, ProgramError> {
    Program::<M>::new(flags)?.run().await
}

/// Run with custom options.
pub async fn run_with<M: Model>(
    flags: M::Flags,
    options: ProgramOptions,
) -> Result<M, ProgramError> {
    Program::<M>::with_options(flags, options)?.run().await
}
