use crate::document::{EventType, ListenerKey};
use crate::NodeId;

/// Value and caret state of an `<input>` element.
///
/// Positions are measured in `char`s, never bytes. The caret is always
/// clamped to `0..=len`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputControl {
    value: String,
    caret: usize,
}

impl InputControl {
    /// Current value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Number of characters in the value.
    pub fn len(&self) -> usize {
        self.value.chars().count()
    }

    /// Whether the value is empty.
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Caret position (the collapsed selection start).
    pub fn caret(&self) -> usize {
        self.caret
    }

    /// Replace the value programmatically. Like a browser, this moves the
    /// caret to the end and ignores `maxlength`.
    pub(crate) fn set_value(&mut self, value: &str) {
        self.value = value.to_owned();
        self.caret = self.len();
    }

    pub(crate) fn set_caret(&mut self, pos: usize) {
        self.caret = pos.min(self.len());
    }

    /// Insert user-typed text at the caret, keeping at most `max_len`
    /// characters in total. Returns `true` if anything was inserted.
    pub(crate) fn insert(&mut self, text: &str, max_len: Option<usize>) -> bool {
        let len = self.len();
        let room = max_len.map_or(usize::MAX, |max| max.saturating_sub(len));
        let inserted: String = text.chars().take(room).collect();
        if inserted.is_empty() {
            return false;
        }
        let byte_at = self
            .value
            .char_indices()
            .nth(self.caret)
            .map_or(self.value.len(), |(i, _)| i);
        self.value.insert_str(byte_at, &inserted);
        self.caret += inserted.chars().count();
        true
    }
}

/// One element in a [`Document`](crate::Document).
///
/// Elements are read through this type; every mutation goes through the
/// owning document so that parent/child links stay consistent.
#[derive(Debug, Clone)]
pub struct Element {
    pub(crate) tag: String,
    pub(crate) attributes: Vec<(String, String)>,
    pub(crate) classes: Vec<String>,
    pub(crate) text: String,
    pub(crate) control: Option<InputControl>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) listeners: Vec<(EventType, ListenerKey)>,
}

impl Element {
    pub(crate) fn new(tag: &str) -> Self {
        let tag = tag.to_ascii_lowercase();
        let control = (tag == "input").then(InputControl::default);
        Self {
            tag,
            attributes: Vec::new(),
            classes: Vec::new(),
            text: String::new(),
            control,
            parent: None,
            children: Vec::new(),
            listeners: Vec::new(),
        }
    }

    /// Lower-case tag name.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The `id` attribute, if set.
    pub fn id(&self) -> Option<&str> {
        self.attribute("id")
    }

    /// Look up an attribute. Classes live in [`classes`](Element::classes).
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// All attributes except `class`, in insertion order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Class list in insertion order.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Whether the class list contains `class`.
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Text content of this element (children are not included).
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Parent element, `None` for the root and for detached elements.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child elements in order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Input state, present only on `<input>` elements.
    pub fn control(&self) -> Option<&InputControl> {
        self.control.as_ref()
    }

    /// Whether this is an `<input>` whose type accepts typed text.
    ///
    /// A missing or unknown `type` falls back to `text`, as in HTML.
    pub fn is_text_control(&self) -> bool {
        if self.control.is_none() {
            return false;
        }
        match self.attribute("type") {
            None => true,
            Some(ty) => !NON_TEXT_INPUT_TYPES.contains(&ty.to_ascii_lowercase().as_str()),
        }
    }
}

/// Input types that are known and do not take text.
const NON_TEXT_INPUT_TYPES: &[&str] = &[
    "checkbox", "radio", "button", "submit", "reset", "file", "image", "hidden", "range",
    "color", "date", "datetime-local", "month", "time", "week",
];
