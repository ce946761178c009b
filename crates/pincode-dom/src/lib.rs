//! Retained element tree backing the **pincode** widget.
//!
//! The widget is specified against a browser document: it resolves its target
//! by selector, replaces it with generated markup, toggles CSS classes, writes
//! a `<style>` block, and reacts to native focus and key handling.
//! `pincode-dom` provides exactly that surface, and nothing more, as an
//! arena-allocated tree that can be inspected from tests and rendered by
//! ratatui views.
//!
//! # Key types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`Document`] | Arena of elements with `<head>`/`<body>`, focus, and listener bookkeeping |
//! | [`Element`] | Read-only view of one element (tag, attributes, classes, text) |
//! | [`SelectorList`] | Parsed subset of CSS selectors used for lookups |
//! | [`StyleRules`] | Nested selector → declaration mapping turned into CSS text |
//! | [`StylesheetInjector`] | Writes and removes scoped `<style>` elements |
//!
//! # Example
//!
//! ```
//! use pincode_dom::Document;
//!
//! let mut doc = Document::new();
//! let input = doc.create_element_with("input", &[("id", "otp"), ("maxlength", "4")]);
//! doc.append_child(doc.body(), input).unwrap();
//!
//! assert_eq!(doc.query_selector("#otp", None).unwrap(), Some(input));
//! assert_eq!(doc.max_length(input), Some(4));
//! ```

mod document;
mod error;
mod node;
mod selector;
mod stylesheet;

pub use document::{Document, EventType, FocusChange, FocusKind, ListenerKey};
pub use error::DomError;
pub use node::{Element, InputControl};
pub use selector::SelectorList;
pub use stylesheet::{StyleRules, StyleValue, StylesheetInjector};

/// Handle to an element slot in a [`Document`] arena.
///
/// Ids are never reused: once an element is removed, its id stays dead and
/// every lookup through it returns `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}
