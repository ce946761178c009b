//! **pincode** -- a segmented PIN/OTP entry widget for [`ratatui`].
//!
//! A pincode takes over one `<input>` element in a [`Document`]: the input
//! keeps the value and caret, and a row of cells mirrors it, one character
//! per cell. Typing, backspace, paste, arrow navigation, and clicks all go
//! through the input so the value stays in a single place. Secure mode shows
//! the newest character for a moment and then masks it.
//!
//! This is the umbrella crate. It re-exports [`pincode_core`] (the Elm-style
//! runtime), [`pincode_dom`] (the element tree), and the [`ratatui`],
//! [`crossterm`], and [`tokio`] versions it is built against.
//!
//! # Quick start
//!
//! ```
//! use pincode::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
//! use pincode::{Document, PincodeOptions, PincodeRegistry};
//!
//! let mut doc = Document::new();
//! let input = doc.create_element_with("input", &[("id", "otp")]);
//! doc.append_child(doc.body(), input).unwrap();
//!
//! let mut pincodes = PincodeRegistry::new();
//! let otp = pincodes
//!     .create(&mut doc, "#otp", PincodeOptions::new().length(4).auto_focus(true))
//!     .unwrap();
//!
//! for c in "12a3".chars() {
//!     pincodes.dispatch_key(&mut doc, KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
//! }
//! assert_eq!(pincodes.get(otp).unwrap().value(&doc), "123");
//! ```
//!
//! The `otp` demo in the repository wires two widgets into a full terminal
//! application.

pub mod config;
pub mod error;
pub mod input;
pub mod registry;
pub mod reveal;
pub mod sync;

pub use config::{OnComplete, OnInput, OnLoad, PincodeConfig, PincodeOptions};
pub use error::PincodeError;
pub use input::{Message, PincodeInput, PincodeStyle, Target};
pub use registry::{InstanceId, PincodeRegistry, Routed};
pub use reveal::{RevealHandle, REVEAL_DELAY};

pub use pincode_core::*;
pub use pincode_dom::{
    Document, DomError, Element, EventType, NodeId, StyleRules, StyleValue, StylesheetInjector,
};

/// Crate version, logged once when the first widget is created.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Re-export dependencies for use in the demo and downstream crates
pub use crossterm;
pub use ratatui;
pub use tokio;
