use std::collections::VecDeque;
use std::fmt::Write as _;

use crate::error::DomError;
use crate::node::{Element, InputControl};
use crate::selector::SelectorList;
use crate::NodeId;

/// Elements that never have children or a closing tag when serialized.
const VOID_ELEMENTS: &[&str] = &["input", "br", "img", "meta", "link", "hr"];

/// Event kinds a listener can be attached for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// The value of an input changed.
    Input,
    /// A key was pressed while the element had focus.
    KeyDown,
    /// Clipboard text is being inserted.
    Paste,
    /// The element gained focus.
    Focus,
    /// The element lost focus.
    Blur,
    /// The element was clicked.
    Click,
}

/// Opaque owner token recorded with a listener.
///
/// The document never calls into listeners itself; the host looks up which
/// owner registered for an element and routes the event to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerKey(pub u64);

/// Whether a [`FocusChange`] gained or lost focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusKind {
    /// The element became the active element.
    Focus,
    /// The element stopped being the active element.
    Blur,
}

/// A queued focus transition, drained with [`Document::take_focus_changes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusChange {
    /// The element that gained or lost focus.
    pub node: NodeId,
    /// Which way focus moved.
    pub kind: FocusKind,
}

/// An arena-allocated element tree with `<html>`, `<head>`, and `<body>`.
///
/// The document also tracks the active (focused) element, queues focus
/// transitions for the host to dispatch, and records which owners listen on
/// which elements.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Option<Element>>,
    root: NodeId,
    head: NodeId,
    body: NodeId,
    active: Option<NodeId>,
    focus_changes: VecDeque<FocusChange>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document holding `<html><head></head><body></body></html>`.
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            head: NodeId(0),
            body: NodeId(0),
            active: None,
            focus_changes: VecDeque::new(),
        };
        doc.root = doc.create_element("html");
        doc.head = doc.create_element("head");
        doc.body = doc.create_element("body");
        doc.link(doc.root, doc.head, None);
        doc.link(doc.root, doc.body, None);
        doc
    }

    /// The `<html>` element.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The `<head>` element.
    pub fn head(&self) -> NodeId {
        self.head
    }

    /// The `<body>` element.
    pub fn body(&self) -> NodeId {
        self.body
    }

    // --- creation and lookup ------------------------------------------------

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(Element::new(tag)));
        id
    }

    /// Create a detached element with attributes. A `class` attribute is
    /// split into the class list.
    pub fn create_element_with(&mut self, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let id = self.create_element(tag);
        if let Some(el) = self.get_mut(id) {
            for (name, value) in attrs {
                if *name == "class" {
                    el.classes = value.split_whitespace().map(str::to_owned).collect();
                } else {
                    el.attributes.push(((*name).to_owned(), (*value).to_owned()));
                }
            }
        }
        id
    }

    /// Read an element. `None` once it has been removed.
    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        self.nodes.get_mut(id.index()).and_then(Option::as_mut)
    }

    fn require(&mut self, id: NodeId) -> Result<&mut Element, DomError> {
        self.get_mut(id).ok_or(DomError::MissingNode(id))
    }

    /// Whether `id` refers to a live element (attached or not).
    pub fn contains(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    /// Whether `id` is reachable from the `<html>` root.
    pub fn is_connected(&self, id: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(node) = cursor {
            if node == self.root {
                return true;
            }
            cursor = self.parent(node);
        }
        false
    }

    /// Parent of `id`.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.element(id).and_then(Element::parent)
    }

    /// Children of `id`; empty for removed elements.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.element(id).map_or(&[], Element::children)
    }

    /// The sibling following `id` under the same parent.
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let siblings = self.children(self.parent(id)?);
        let pos = siblings.iter().position(|&c| c == id)?;
        siblings.get(pos + 1).copied()
    }

    /// All descendants of `scope` in document order, excluding `scope`.
    pub fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(scope).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// First element matching `selector` below `scope` (the whole document
    /// when `None`).
    pub fn query_selector(
        &self,
        selector: &str,
        scope: Option<NodeId>,
    ) -> Result<Option<NodeId>, DomError> {
        let list = SelectorList::parse(selector)?;
        Ok(self
            .descendants(scope.unwrap_or(self.root))
            .into_iter()
            .find(|&node| list.matches(self, node)))
    }

    /// Every element matching `selector` below `scope`, in document order.
    pub fn query_selector_all(
        &self,
        selector: &str,
        scope: Option<NodeId>,
    ) -> Result<Vec<NodeId>, DomError> {
        let list = SelectorList::parse(selector)?;
        Ok(self
            .descendants(scope.unwrap_or(self.root))
            .into_iter()
            .filter(|&node| list.matches(self, node))
            .collect())
    }

    /// Connected element whose `id` attribute equals `id`.
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|&node| self.element(node).and_then(Element::id) == Some(id))
    }

    // --- tree mutation ------------------------------------------------------

    /// Append `child` as the last child of `parent`, moving it if attached.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` into `parent` before `reference`, or at the end when
    /// `reference` is `None` or not a child of `parent`.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        self.require(parent)?;
        self.require(child)?;
        let mut cursor = Some(parent);
        while let Some(node) = cursor {
            if node == child {
                return Err(DomError::Cycle(child));
            }
            cursor = self.parent(node);
        }
        self.unlink(child);
        self.link(parent, child, reference);
        Ok(())
    }

    /// Detach `node` from its parent. The element stays alive and can be
    /// re-inserted.
    pub fn detach(&mut self, node: NodeId) -> Result<(), DomError> {
        self.require(node)?;
        self.unlink(node);
        Ok(())
    }

    /// Detach `node` and free it together with its whole subtree.
    ///
    /// If the active element is inside the subtree, the document simply has
    /// no active element afterwards; no blur is queued.
    pub fn remove(&mut self, node: NodeId) -> Result<(), DomError> {
        self.require(node)?;
        self.unlink(node);
        let mut doomed = self.descendants(node);
        doomed.push(node);
        if self.active.is_some_and(|active| doomed.contains(&active)) {
            self.active = None;
        }
        self.focus_changes.retain(|change| !doomed.contains(&change.node));
        for id in doomed {
            if let Some(slot) = self.nodes.get_mut(id.index()) {
                *slot = None;
            }
        }
        Ok(())
    }

    fn unlink(&mut self, child: NodeId) {
        let Some(parent) = self.parent(child) else {
            return;
        };
        if let Some(el) = self.get_mut(parent) {
            el.children.retain(|&c| c != child);
        }
        if let Some(el) = self.get_mut(child) {
            el.parent = None;
        }
    }

    fn link(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        if let Some(el) = self.get_mut(parent) {
            let at = reference
                .and_then(|r| el.children.iter().position(|&c| c == r))
                .unwrap_or(el.children.len());
            el.children.insert(at, child);
        }
        if let Some(el) = self.get_mut(child) {
            el.parent = Some(parent);
        }
    }

    // --- attributes, classes, text -----------------------------------------

    /// Attribute value of `node`.
    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node)?.attribute(name)
    }

    /// Set (or replace) an attribute. `class` replaces the class list.
    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let el = self.require(node)?;
        if name == "class" {
            el.classes = value.split_whitespace().map(str::to_owned).collect();
            return Ok(());
        }
        match el.attributes.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value.to_owned(),
            None => el.attributes.push((name.to_owned(), value.to_owned())),
        }
        Ok(())
    }

    /// Remove an attribute; a no-op when absent.
    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<(), DomError> {
        let el = self.require(node)?;
        if name == "class" {
            el.classes.clear();
        } else {
            el.attributes.retain(|(k, _)| k != name);
        }
        Ok(())
    }

    /// Add `class` unless already present.
    pub fn add_class(&mut self, node: NodeId, class: &str) -> Result<(), DomError> {
        let el = self.require(node)?;
        if !el.has_class(class) {
            el.classes.push(class.to_owned());
        }
        Ok(())
    }

    /// Remove `class` if present.
    pub fn remove_class(&mut self, node: NodeId, class: &str) -> Result<(), DomError> {
        self.require(node)?.classes.retain(|c| c != class);
        Ok(())
    }

    /// Flip `class`; returns whether it is present afterwards.
    pub fn toggle_class(&mut self, node: NodeId, class: &str) -> Result<bool, DomError> {
        let el = self.require(node)?;
        if el.has_class(class) {
            el.classes.retain(|c| c != class);
            Ok(false)
        } else {
            el.classes.push(class.to_owned());
            Ok(true)
        }
    }

    /// Whether `node` carries `class`.
    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.element(node).is_some_and(|el| el.has_class(class))
    }

    /// Text content of `node` (empty for removed elements).
    pub fn text(&self, node: NodeId) -> &str {
        self.element(node).map_or("", Element::text)
    }

    /// Replace the text content of `node`.
    pub fn set_text(&mut self, node: NodeId, text: &str) -> Result<(), DomError> {
        let el = self.require(node)?;
        if el.text != text {
            el.text = text.to_owned();
        }
        Ok(())
    }

    // --- input controls -----------------------------------------------------

    /// Value and caret of an `<input>`.
    pub fn control(&self, node: NodeId) -> Option<&InputControl> {
        self.element(node)?.control()
    }

    fn control_mut(&mut self, node: NodeId) -> Result<&mut InputControl, DomError> {
        self.require(node)?
            .control
            .as_mut()
            .ok_or(DomError::NotAControl(node))
    }

    /// Current value of an `<input>`.
    pub fn value(&self, node: NodeId) -> Option<&str> {
        self.control(node).map(InputControl::value)
    }

    /// Assign the value of an `<input>`; the caret moves to the end.
    pub fn set_value(&mut self, node: NodeId, value: &str) -> Result<(), DomError> {
        self.control_mut(node)?.set_value(value);
        Ok(())
    }

    /// Caret position (selection start) of an `<input>`.
    pub fn caret(&self, node: NodeId) -> Option<usize> {
        self.control(node).map(InputControl::caret)
    }

    /// Collapse the selection of an `<input>` to `pos`, clamped to the value.
    pub fn set_caret(&mut self, node: NodeId, pos: usize) -> Result<(), DomError> {
        self.control_mut(node)?.set_caret(pos);
        Ok(())
    }

    /// The `maxlength` attribute, when set to a positive integer.
    pub fn max_length(&self, node: NodeId) -> Option<usize> {
        self.attribute(node, "maxlength")?
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|&n| n > 0)
    }

    /// Native text insertion at the caret, as performed for user typing.
    /// Honors `maxlength`. Returns whether the value changed.
    pub fn insert_text(&mut self, node: NodeId, text: &str) -> Result<bool, DomError> {
        let max = self.max_length(node);
        Ok(self.control_mut(node)?.insert(text, max))
    }

    // --- focus --------------------------------------------------------------

    /// The element that currently has focus.
    pub fn active_element(&self) -> Option<NodeId> {
        self.active
    }

    /// Give focus to a connected `<input>`. Returns `false` when focus did not
    /// move (already focused, or not focusable). The previously focused
    /// element is blurred first.
    pub fn focus(&mut self, node: NodeId) -> Result<bool, DomError> {
        let focusable = self.require(node)?.control.is_some();
        if !focusable || !self.is_connected(node) || self.active == Some(node) {
            return Ok(false);
        }
        if let Some(previous) = self.active.take() {
            self.focus_changes.push_back(FocusChange {
                node: previous,
                kind: FocusKind::Blur,
            });
        }
        self.active = Some(node);
        self.focus_changes.push_back(FocusChange {
            node,
            kind: FocusKind::Focus,
        });
        Ok(true)
    }

    /// Remove focus from `node` if it has it. Returns whether it did.
    pub fn blur(&mut self, node: NodeId) -> bool {
        if self.active != Some(node) {
            return false;
        }
        self.active = None;
        self.focus_changes.push_back(FocusChange {
            node,
            kind: FocusKind::Blur,
        });
        true
    }

    /// Drain queued focus transitions in the order they happened.
    pub fn take_focus_changes(&mut self) -> Vec<FocusChange> {
        self.focus_changes.drain(..).collect()
    }

    // --- listeners ----------------------------------------------------------

    /// Record that `owner` listens for `event` on `node`.
    pub fn add_event_listener(
        &mut self,
        node: NodeId,
        event: EventType,
        owner: ListenerKey,
    ) -> Result<(), DomError> {
        let el = self.require(node)?;
        if !el.listeners.contains(&(event, owner)) {
            el.listeners.push((event, owner));
        }
        Ok(())
    }

    /// Owners listening for `event` on `node`.
    pub fn listeners(&self, node: NodeId, event: EventType) -> impl Iterator<Item = ListenerKey> + '_ {
        self.element(node)
            .map(|el| el.listeners.as_slice())
            .unwrap_or_default()
            .iter()
            .filter(move |(kind, _)| *kind == event)
            .map(|(_, owner)| *owner)
    }

    // --- serialization ------------------------------------------------------

    /// Serialize `node` and its subtree as HTML (attributes in insertion
    /// order, `class` last). Input values are not serialized.
    pub fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out);
        out
    }

    fn write_html(&self, node: NodeId, out: &mut String) {
        let Some(el) = self.element(node) else {
            return;
        };
        let _ = write!(out, "<{}", el.tag());
        for (name, value) in el.attributes() {
            let _ = write!(out, " {name}=\"{}\"", escape(value));
        }
        if !el.classes().is_empty() {
            let _ = write!(out, " class=\"{}\"", escape(&el.classes().join(" ")));
        }
        out.push('>');
        if VOID_ELEMENTS.contains(&el.tag()) {
            return;
        }
        out.push_str(&escape(el.text()));
        for &child in el.children() {
            self.write_html(child, out);
        }
        let _ = write!(out, "</{}>", el.tag());
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input_in_body(doc: &mut Document) -> NodeId {
        let input = doc.create_element_with("input", &[("id", "pin")]);
        doc.append_child(doc.body(), input).unwrap();
        input
    }

    #[test]
    fn new_document_has_head_and_body() {
        let doc = Document::new();
        assert_eq!(doc.children(doc.root()), &[doc.head(), doc.body()]);
        assert_eq!(doc.outer_html(doc.root()), "<html><head></head><body></body></html>");
    }

    #[test]
    fn insert_before_and_next_sibling() {
        let mut doc = Document::new();
        let a = doc.create_element("p");
        let b = doc.create_element("p");
        let c = doc.create_element("p");
        doc.append_child(doc.body(), a).unwrap();
        doc.append_child(doc.body(), c).unwrap();
        doc.insert_before(doc.body(), b, Some(c)).unwrap();
        assert_eq!(doc.children(doc.body()), &[a, b, c]);
        assert_eq!(doc.next_sibling(a), Some(b));
        assert_eq!(doc.next_sibling(c), None);
    }

    #[test]
    fn append_moves_attached_child() {
        let mut doc = Document::new();
        let a = doc.create_element("div");
        let b = doc.create_element("div");
        let leaf = doc.create_element("span");
        doc.append_child(doc.body(), a).unwrap();
        doc.append_child(doc.body(), b).unwrap();
        doc.append_child(a, leaf).unwrap();
        doc.append_child(b, leaf).unwrap();
        assert!(doc.children(a).is_empty());
        assert_eq!(doc.parent(leaf), Some(b));
    }

    #[test]
    fn cycles_are_rejected() {
        let mut doc = Document::new();
        let outer = doc.create_element("div");
        let inner = doc.create_element("div");
        doc.append_child(outer, inner).unwrap();
        assert_eq!(doc.append_child(inner, outer), Err(DomError::Cycle(outer)));
    }

    #[test]
    fn remove_frees_subtree() {
        let mut doc = Document::new();
        let wrap = doc.create_element("div");
        let input = doc.create_element("input");
        doc.append_child(doc.body(), wrap).unwrap();
        doc.append_child(wrap, input).unwrap();
        doc.focus(input).unwrap();
        doc.remove(wrap).unwrap();
        assert!(!doc.contains(wrap));
        assert!(!doc.contains(input));
        assert_eq!(doc.active_element(), None);
        assert_eq!(doc.remove(wrap), Err(DomError::MissingNode(wrap)));
    }

    #[test]
    fn class_list_operations() {
        let mut doc = Document::new();
        let div = doc.create_element_with("div", &[("class", "a b")]);
        doc.add_class(div, "c").unwrap();
        doc.add_class(div, "a").unwrap();
        doc.remove_class(div, "b").unwrap();
        assert_eq!(doc.element(div).unwrap().classes(), &["a", "c"]);
        assert!(!doc.toggle_class(div, "a").unwrap());
        assert!(doc.toggle_class(div, "z").unwrap());
        assert!(doc.has_class(div, "z"));
    }

    #[test]
    fn max_length_parsing() {
        let mut doc = Document::new();
        let input = input_in_body(&mut doc);
        assert_eq!(doc.max_length(input), None);
        doc.set_attribute(input, "maxlength", "0").unwrap();
        assert_eq!(doc.max_length(input), None);
        doc.set_attribute(input, "maxlength", "4").unwrap();
        assert_eq!(doc.max_length(input), Some(4));
    }

    #[test]
    fn insert_text_honors_maxlength() {
        let mut doc = Document::new();
        let input = input_in_body(&mut doc);
        doc.set_attribute(input, "maxlength", "3").unwrap();
        assert!(doc.insert_text(input, "12").unwrap());
        assert!(doc.insert_text(input, "34").unwrap());
        assert!(!doc.insert_text(input, "5").unwrap());
        assert_eq!(doc.value(input), Some("123"));
    }

    #[test]
    fn value_on_non_input_is_an_error() {
        let mut doc = Document::new();
        let div = doc.create_element("div");
        assert_eq!(doc.set_value(div, "1"), Err(DomError::NotAControl(div)));
        assert_eq!(doc.value(div), None);
    }

    #[test]
    fn focus_moves_and_queues_changes() {
        let mut doc = Document::new();
        let first = input_in_body(&mut doc);
        let second = input_in_body(&mut doc);
        assert!(doc.focus(first).unwrap());
        assert!(!doc.focus(first).unwrap());
        assert!(doc.focus(second).unwrap());
        assert!(doc.blur(second));
        assert!(!doc.blur(second));
        let changes = doc.take_focus_changes();
        assert_eq!(
            changes,
            vec![
                FocusChange { node: first, kind: FocusKind::Focus },
                FocusChange { node: first, kind: FocusKind::Blur },
                FocusChange { node: second, kind: FocusKind::Focus },
                FocusChange { node: second, kind: FocusKind::Blur },
            ]
        );
        assert!(doc.take_focus_changes().is_empty());
    }

    #[test]
    fn detached_and_non_input_elements_do_not_take_focus() {
        let mut doc = Document::new();
        let detached = doc.create_element("input");
        let div = doc.create_element("div");
        doc.append_child(doc.body(), div).unwrap();
        assert!(!doc.focus(detached).unwrap());
        assert!(!doc.focus(div).unwrap());
        assert_eq!(doc.active_element(), None);
    }

    #[test]
    fn listeners_are_filtered_by_event() {
        let mut doc = Document::new();
        let input = input_in_body(&mut doc);
        doc.add_event_listener(input, EventType::KeyDown, ListenerKey(7)).unwrap();
        doc.add_event_listener(input, EventType::KeyDown, ListenerKey(7)).unwrap();
        doc.add_event_listener(input, EventType::Paste, ListenerKey(9)).unwrap();
        let keydown: Vec<_> = doc.listeners(input, EventType::KeyDown).collect();
        assert_eq!(keydown, vec![ListenerKey(7)]);
        assert_eq!(doc.listeners(input, EventType::Click).count(), 0);
    }

    #[test]
    fn query_selector_scoping() {
        let mut doc = Document::new();
        let a = doc.create_element_with("div", &[("class", "grid")]);
        let b = doc.create_element_with("div", &[("class", "grid")]);
        let scope = doc.create_element("section");
        doc.append_child(doc.body(), a).unwrap();
        doc.append_child(doc.body(), scope).unwrap();
        doc.append_child(scope, b).unwrap();
        assert_eq!(doc.query_selector(".grid", None).unwrap(), Some(a));
        assert_eq!(doc.query_selector(".grid", Some(scope)).unwrap(), Some(b));
        assert_eq!(doc.query_selector_all(".grid", None).unwrap(), vec![a, b]);
        assert!(doc.query_selector("..", None).is_err());
    }

    #[test]
    fn outer_html_serializes_attributes_and_text() {
        let mut doc = Document::new();
        let div = doc.create_element_with("div", &[("data-index", "0"), ("class", "cell")]);
        let span = doc.create_element("span");
        doc.append_child(div, span).unwrap();
        doc.set_text(span, "<1>").unwrap();
        assert_eq!(
            doc.outer_html(div),
            "<div data-index=\"0\" class=\"cell\"><span>&lt;1&gt;</span></div>"
        );
    }
}
