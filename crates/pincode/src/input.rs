//! The pincode widget: one input element mirrored into a row of cells.

use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use pincode_core::{Command, Component};
use pincode_dom::{Document, DomError, EventType, InputControl, NodeId, StylesheetInjector};
use ratatui::layout::{Alignment, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, BorderType, Paragraph};
use ratatui::Frame;
use unicode_width::UnicodeWidthChar;

use crate::config::{PincodeConfig, PincodeOptions};
use crate::error::PincodeError;
use crate::registry::InstanceId;
use crate::reveal::{RevealHandle, RevealTimer};
use crate::sync;

/// Class of the element that replaces the input in the document.
pub const WRAPPER_CLASS: &str = "pincodeInput";
/// Class of the container holding the cells.
pub const GRID_CLASS: &str = "pincode";
/// Class of every cell.
pub const CELL_CLASS: &str = "pincode-grid";
/// Class added to the input itself.
pub const INPUT_CLASS: &str = "pincode-input";
/// Class toggled on the highlighted cell.
pub const FOCUS_CLASS: &str = "pincode-focus";
/// Id prefix of per-widget `<style>` elements.
pub const STYLE_ID_PREFIX: &str = "pincodeInput-style-";

const CELL_HEIGHT: u16 = 3;

pub(crate) fn stylesheet() -> StylesheetInjector {
    StylesheetInjector::new(STYLE_ID_PREFIX)
        .with_replace_rule(format!(".{WRAPPER_CLASS}"), format!(".{WRAPPER_CLASS}-"))
}

/// Which element to turn into a pincode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<'a> {
    /// First element matching a selector.
    Selector(&'a str),
    /// A node already in hand.
    Node(NodeId),
}

impl<'a> From<&'a str> for Target<'a> {
    fn from(selector: &'a str) -> Self {
        Target::Selector(selector)
    }
}

impl From<NodeId> for Target<'_> {
    fn from(node: NodeId) -> Self {
        Target::Node(node)
    }
}

/// Messages for the pincode widget. Each one corresponds to an event the
/// widget listens for on its input or cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// A key pressed while the input has focus. Unless the widget handles
    /// it, the key's native effect (typing, caret movement) is applied and
    /// followed by [`Message::Input`] processing.
    Key(KeyEvent),
    /// The input's value was changed by something other than the widget.
    Input,
    /// Clipboard text pasted into the input.
    Paste(String),
    /// The input gained focus.
    Focus,
    /// The input lost focus.
    Blur,
    /// A cell was clicked.
    CellClick(usize),
    /// The secure-mode reveal delay elapsed.
    RevealElapsed(RevealHandle),
}

/// Style configuration for the rendered cells.
#[derive(Debug, Clone)]
pub struct PincodeStyle {
    /// Border of an empty cell.
    pub border: Style,
    /// Border of a cell that shows a character.
    pub filled: Style,
    /// Border of the highlighted cell.
    pub focused: Style,
    /// Cell text.
    pub text: Style,
    /// Columns between cells.
    pub gap: u16,
}

impl Default for PincodeStyle {
    fn default() -> Self {
        Self {
            border: Style::default().fg(Color::DarkGray),
            filled: Style::default().fg(Color::Gray),
            focused: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            text: Style::default().add_modifier(Modifier::BOLD),
            gap: 1,
        }
    }
}

enum KeyOutcome {
    /// The widget handled the key; skip the native effect.
    Prevented(Command<Message>),
    /// Let the key do what it would do in a plain input.
    Default,
}

/// A segmented PIN/OTP entry mounted into a [`Document`].
///
/// The input element stays authoritative for the value and caret; the
/// widget keeps one `span` per cell in sync with it and renders the cells
/// with ratatui. Instances are created and destroyed through
/// [`PincodeRegistry`](crate::PincodeRegistry).
pub struct PincodeInput {
    id: InstanceId,
    config: PincodeConfig,
    input: NodeId,
    wrapper: NodeId,
    cells: Vec<NodeId>,
    spans: Vec<NodeId>,
    length: usize,
    active: usize,
    on_input: Option<crate::config::OnInput>,
    on_complete: Option<crate::config::OnComplete>,
    reveal: RevealTimer,
    style: PincodeStyle,
}

impl PincodeInput {
    pub(crate) fn mount(
        doc: &mut Document,
        target: Target<'_>,
        options: PincodeOptions,
        id: InstanceId,
    ) -> Result<Self, PincodeError> {
        let input = match target {
            Target::Selector(selector) => doc.query_selector(selector, None)?,
            Target::Node(node) => doc.contains(node).then_some(node),
        }
        .ok_or(PincodeError::ElementNotFound)?;
        if !doc.element(input).is_some_and(|el| el.is_text_control()) {
            return Err(PincodeError::NotAnInput);
        }

        let config = PincodeConfig::default().merge(options);
        let length = doc.max_length(input).unwrap_or(config.length);
        let scope = id.to_string();
        if !config.styles.is_empty() {
            stylesheet().inject(doc, &config.styles, &scope)?;
        }

        let wrapper_classes = format!("{WRAPPER_CLASS} {WRAPPER_CLASS}-{scope}");
        let wrapper = doc.create_element_with("div", &[("class", wrapper_classes.as_str())]);
        let grid = doc.create_element_with("div", &[("class", GRID_CLASS)]);
        let mut cells = Vec::with_capacity(length);
        let mut spans = Vec::with_capacity(length);
        for i in 0..length {
            let index = i.to_string();
            let cell = doc.create_element_with("div", &[("class", CELL_CLASS), ("data-index", index.as_str())]);
            let span = doc.create_element("span");
            doc.append_child(cell, span)?;
            doc.append_child(grid, cell)?;
            cells.push(cell);
            spans.push(span);
        }

        // The wrapper takes the input's place in its parent.
        let parent = doc.parent(input);
        let next = doc.next_sibling(input);
        doc.detach(input)?;
        if let Some(parent) = parent {
            doc.insert_before(parent, wrapper, next)?;
        }

        doc.add_class(input, INPUT_CLASS)?;
        doc.remove_attribute(input, "hidden")?;
        doc.set_attribute(input, "type", if config.secure { "password" } else { "text" })?;
        doc.set_attribute(input, "pattern", "[0-9]*")?;
        doc.set_attribute(input, "inputmode", "numeric")?;
        doc.set_attribute(input, "maxlength", &length.to_string())?;
        doc.set_attribute(input, "autocomplete", "off")?;
        doc.append_child(wrapper, input)?;
        doc.append_child(wrapper, grid)?;

        let key = id.listener_key();
        for &cell in &cells {
            doc.add_event_listener(cell, EventType::Click, key)?;
        }
        for event in [
            EventType::Input,
            EventType::KeyDown,
            EventType::Paste,
            EventType::Focus,
            EventType::Blur,
        ] {
            doc.add_event_listener(input, event, key)?;
        }

        let mut widget = Self {
            id,
            on_input: config.on_input.clone(),
            on_complete: config.on_complete.clone(),
            config,
            input,
            wrapper,
            cells,
            spans,
            length,
            active: 0,
            reveal: RevealTimer::default(),
            style: PincodeStyle::default(),
        };
        if widget.config.auto_focus {
            widget.set_active_cell(doc, 0)?;
        }
        tracing::debug!(id = %id, cells = length, "mounted pincode input");
        Ok(widget)
    }

    /// Registry id of this widget.
    pub fn id(&self) -> InstanceId {
        self.id
    }

    /// The merged configuration.
    pub fn config(&self) -> &PincodeConfig {
        &self.config
    }

    /// The authoritative input element.
    pub fn input(&self) -> NodeId {
        self.input
    }

    /// The element that replaced the input in the document.
    pub fn wrapper(&self) -> NodeId {
        self.wrapper
    }

    /// Cell elements in order.
    pub fn cells(&self) -> &[NodeId] {
        &self.cells
    }

    /// Number of cells. Fixed at construction.
    pub fn cell_count(&self) -> usize {
        self.length
    }

    /// Index of the active cell (may equal the cell count when full).
    pub fn active_index(&self) -> usize {
        self.active
    }

    /// The input's current value.
    pub fn value<'d>(&self, doc: &'d Document) -> &'d str {
        doc.value(self.input).unwrap_or_default()
    }

    /// Whether the input is the document's active element.
    pub fn is_focused(&self, doc: &Document) -> bool {
        doc.active_element() == Some(self.input)
    }

    /// Empty the value and reset the active cell to 0, running the regular
    /// input handling (callbacks included) and cancelling any pending
    /// re-mask. No cell stays highlighted, even while the input has focus.
    pub fn clear(&mut self, doc: &mut Document) -> Result<Command<Message>, PincodeError> {
        let cmd = self.clear_value(doc)?;
        self.remove_highlight(doc)?;
        Ok(cmd)
    }

    /// Replace the input callback. Nothing fires until the next reconcile.
    pub fn set_on_input(&mut self, f: impl Fn(&str, Option<usize>) + Send + Sync + 'static) {
        self.on_input = Some(Arc::new(f));
    }

    /// Replace the completion callback. Nothing fires until the next reconcile.
    pub fn set_on_complete(&mut self, f: impl Fn(&str) + Send + Sync + 'static) {
        self.on_complete = Some(Arc::new(f));
    }

    /// Set the cell style.
    pub fn set_style(&mut self, style: PincodeStyle) {
        self.style = style;
    }

    /// The cell style.
    pub fn style(&self) -> &PincodeStyle {
        &self.style
    }

    // --- layout -------------------------------------------------------------

    fn cell_width(&self) -> u16 {
        let glyph = self.config.placeholder.width().unwrap_or(1).max(1);
        u16::try_from(glyph).unwrap_or(1).saturating_add(4)
    }

    /// Columns needed to show every cell.
    pub fn preferred_width(&self) -> u16 {
        let count = u16::try_from(self.length).unwrap_or(u16::MAX);
        count
            .saturating_mul(self.cell_width())
            .saturating_add(count.saturating_sub(1).saturating_mul(self.style.gap))
    }

    /// Rows needed to show the cells.
    pub fn preferred_height(&self) -> u16 {
        CELL_HEIGHT
    }

    /// Screen rectangles of the cells inside `area`, left to right. Cells
    /// that do not fit are omitted.
    pub fn cell_rects(&self, area: Rect) -> Vec<Rect> {
        let height = CELL_HEIGHT.min(area.height);
        let width = self.cell_width();
        let mut rects = Vec::new();
        if height == 0 {
            return rects;
        }
        let mut x = area.x;
        for _ in 0..self.length {
            if x.saturating_add(width) > area.right() {
                break;
            }
            rects.push(Rect::new(x, area.y, width, height));
            x = x.saturating_add(width).saturating_add(self.style.gap);
        }
        rects
    }

    /// Index of the cell under a mouse position, when the widget is drawn in
    /// `area`.
    pub fn cell_at(&self, area: Rect, column: u16, row: u16) -> Option<usize> {
        let position = Position::new(column, row);
        self.cell_rects(area).iter().position(|rect| rect.contains(position))
    }

    // --- event handlers -----------------------------------------------------

    fn handle(&mut self, doc: &mut Document, msg: Message) -> Result<Command<Message>, DomError> {
        match msg {
            Message::Key(key) => self.key_down(doc, key),
            Message::Input => self.input_event(doc),
            Message::Paste(text) => self.paste(doc, &text),
            Message::Focus => {
                doc.focus(self.input)?;
                self.refresh_highlight(doc)?;
                Ok(Command::none())
            }
            Message::Blur => {
                self.remove_highlight(doc)?;
                Ok(Command::none())
            }
            Message::CellClick(index) => {
                self.cell_click(doc, index)?;
                Ok(Command::none())
            }
            Message::RevealElapsed(handle) => {
                self.reveal_elapsed(doc, handle)?;
                Ok(Command::none())
            }
        }
    }

    fn key_down(&mut self, doc: &mut Document, key: KeyEvent) -> Result<Command<Message>, DomError> {
        if key.kind == KeyEventKind::Release {
            return Ok(Command::none());
        }
        tracing::trace!(id = %self.id, code = ?key.code, "keydown");
        match self.keydown_handler(doc, key)? {
            KeyOutcome::Prevented(cmd) => Ok(cmd),
            KeyOutcome::Default => self.native_key(doc, key),
        }
    }

    fn keydown_handler(&mut self, doc: &mut Document, key: KeyEvent) -> Result<KeyOutcome, DomError> {
        let command_key = key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::SUPER | KeyModifiers::META);
        if command_key && matches!(key.code, KeyCode::Char('v' | 'V')) {
            return Ok(KeyOutcome::Default);
        }

        if self.config.navigation_active() {
            let last = self.length - 1;
            match key.code {
                KeyCode::Left => {
                    if self.active > 0 {
                        self.set_active_cell(doc, self.active - 1)?;
                    }
                    return Ok(KeyOutcome::Prevented(Command::none()));
                }
                KeyCode::Right => {
                    if self.active < last {
                        self.set_active_cell(doc, self.active + 1)?;
                    }
                    return Ok(KeyOutcome::Prevented(Command::none()));
                }
                KeyCode::Up => {
                    self.set_active_cell(doc, 0)?;
                    return Ok(KeyOutcome::Prevented(Command::none()));
                }
                KeyCode::Down => {
                    self.set_active_cell(doc, last)?;
                    return Ok(KeyOutcome::Prevented(Command::none()));
                }
                KeyCode::Backspace => {
                    let cmd = if self.active > 0 {
                        self.delete_at_active(doc)?
                    } else {
                        self.backspace(doc)?
                    };
                    return Ok(KeyOutcome::Prevented(cmd));
                }
                KeyCode::Esc if self.config.allow_escape => {
                    return Ok(KeyOutcome::Prevented(self.escape(doc)?));
                }
                _ => {}
            }
        } else {
            match key.code {
                KeyCode::Backspace => return Ok(KeyOutcome::Prevented(self.backspace(doc)?)),
                KeyCode::Esc if self.config.allow_escape => {
                    return Ok(KeyOutcome::Prevented(self.escape(doc)?));
                }
                _ => {}
            }
        }

        if self.config.force_digits && !is_digit_key(key) {
            return Ok(KeyOutcome::Prevented(Command::none()));
        }
        Ok(KeyOutcome::Default)
    }

    /// What the key would do to a plain, unhandled input.
    fn native_key(&mut self, doc: &mut Document, key: KeyEvent) -> Result<Command<Message>, DomError> {
        if key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER | KeyModifiers::META)
        {
            return Ok(Command::none());
        }
        let (caret, len) = doc
            .control(self.input)
            .map_or((0, 0), |control| (control.caret(), control.len()));
        match key.code {
            KeyCode::Char(c) => {
                if doc.insert_text(self.input, c.encode_utf8(&mut [0; 4]))? {
                    return self.input_event(doc);
                }
            }
            KeyCode::Left => doc.set_caret(self.input, caret.saturating_sub(1))?,
            KeyCode::Right => doc.set_caret(self.input, caret + 1)?,
            KeyCode::Home => doc.set_caret(self.input, 0)?,
            KeyCode::End => doc.set_caret(self.input, len)?,
            KeyCode::Delete if caret < len => {
                let mut chars: Vec<char> = self.value(doc).chars().collect();
                chars.remove(caret);
                let value: String = chars.into_iter().collect();
                doc.set_value(self.input, &value)?;
                doc.set_caret(self.input, caret)?;
                return self.input_event(doc);
            }
            _ => {}
        }
        Ok(Command::none())
    }

    fn input_event(&mut self, doc: &mut Document) -> Result<Command<Message>, DomError> {
        let mut value = self.value(doc).to_owned();
        if self.config.force_digits && !value.is_empty() {
            let digits = sync::digits_only(&value);
            if digits != value {
                doc.set_value(self.input, &digits)?;
                value = digits;
            }
        }

        let len = value.chars().count();
        self.active = if self.config.navigation_active() {
            doc.caret(self.input).unwrap_or(len)
        } else {
            len
        };

        if len <= self.length {
            let cmd = self.reconcile(doc, Some(self.active))?;
            self.refresh_highlight(doc)?;
            Ok(cmd)
        } else {
            doc.set_value(self.input, sync::truncate_chars(&value, self.length))?;
            Ok(Command::none())
        }
    }

    fn paste(&mut self, doc: &mut Document, text: &str) -> Result<Command<Message>, DomError> {
        if !self.config.allow_paste {
            return Ok(Command::none());
        }
        let filtered = if self.config.force_digits {
            sync::digits_only(text)
        } else {
            text.to_owned()
        };
        let value = sync::truncate_chars(&filtered, self.length);
        doc.set_value(self.input, value)?;
        let cmd = self.reconcile(doc, None)?;
        self.active = value.chars().count();
        self.refresh_highlight(doc)?;
        Ok(cmd)
    }

    fn backspace(&mut self, doc: &mut Document) -> Result<Command<Message>, DomError> {
        let value = self.value(doc);
        let Some((last, _)) = value.char_indices().next_back() else {
            return Ok(Command::none());
        };
        let shortened = value[..last].to_owned();
        doc.set_value(self.input, &shortened)?;
        let cmd = self.reconcile(doc, None)?;
        self.refresh_highlight(doc)?;
        Ok(cmd)
    }

    /// Navigation-mode backspace: removes the character under the active
    /// cell, then steps back. With the active cell just past the value
    /// nothing is removed, but the step and the callbacks still happen.
    fn delete_at_active(&mut self, doc: &mut Document) -> Result<Command<Message>, DomError> {
        let affected = self.active;
        let mut chars: Vec<char> = self.value(doc).chars().collect();
        if affected < chars.len() {
            chars.remove(affected);
        }
        let value: String = chars.into_iter().collect();
        doc.set_value(self.input, &value)?;
        self.set_active_cell(doc, affected - 1)?;
        let cmd = self.reconcile(doc, Some(affected))?;
        self.refresh_highlight(doc)?;
        Ok(cmd)
    }

    fn escape(&mut self, doc: &mut Document) -> Result<Command<Message>, DomError> {
        let cmd = self.clear_value(doc)?;
        doc.blur(self.input);
        self.remove_highlight(doc)?;
        Ok(cmd)
    }

    fn clear_value(&mut self, doc: &mut Document) -> Result<Command<Message>, DomError> {
        doc.set_value(self.input, "")?;
        self.active = 0;
        let cmd = self.input_event(doc)?;
        self.reveal.cancel();
        Ok(cmd)
    }

    fn cell_click(&mut self, doc: &mut Document, index: usize) -> Result<(), DomError> {
        if index >= self.length {
            return Ok(());
        }
        if self.config.navigation_active() {
            self.set_active_cell(doc, index)
        } else {
            doc.focus(self.input)?;
            self.refresh_highlight(doc)
        }
    }

    fn reveal_elapsed(&mut self, doc: &mut Document, handle: RevealHandle) -> Result<(), DomError> {
        let Some(captured) = self.reveal.fire(handle) else {
            return Ok(());
        };
        if self.value(doc) != captured {
            return Ok(());
        }
        self.show(doc, &sync::masked(&captured, self.length, self.config.placeholder))
    }

    // --- display ------------------------------------------------------------

    fn reconcile(
        &mut self,
        doc: &mut Document,
        active_index: Option<usize>,
    ) -> Result<Command<Message>, DomError> {
        let value = self.value(doc).to_owned();
        let caret = doc.caret(self.input).unwrap_or(0);
        let plan = sync::reconcile(&value, active_index, caret, self.length, self.config.mask());

        self.reveal.cancel();
        self.show(doc, &plan.cells)?;
        if let Some(on_input) = &self.on_input {
            on_input(&value, plan.input_index);
        }
        let cmd = if plan.schedule_mask {
            self.reveal.schedule(&value, Message::RevealElapsed)
        } else {
            Command::none()
        };
        if plan.complete {
            if let Some(on_complete) = &self.on_complete {
                on_complete(&value);
            }
        }
        Ok(cmd)
    }

    fn show(&self, doc: &mut Document, cells: &[Option<char>]) -> Result<(), DomError> {
        for (&span, cell) in self.spans.iter().zip(cells) {
            let mut buf = [0; 4];
            let text: &str = match cell {
                Some(c) => c.encode_utf8(&mut buf),
                None => "",
            };
            doc.set_text(span, text)?;
        }
        Ok(())
    }

    fn set_active_cell(&mut self, doc: &mut Document, index: usize) -> Result<(), DomError> {
        self.active = index;
        doc.focus(self.input)?;
        doc.set_caret(self.input, index)?;
        self.refresh_highlight(doc)
    }

    /// Highlight the active cell while the input has focus.
    fn refresh_highlight(&mut self, doc: &mut Document) -> Result<(), DomError> {
        if !self.config.navigation_active() {
            self.active = doc.control(self.input).map_or(0, InputControl::len);
        }
        let focused = self.is_focused(doc);
        for (i, &cell) in self.cells.iter().enumerate() {
            if focused && i == self.active {
                doc.add_class(cell, FOCUS_CLASS)?;
            } else {
                doc.remove_class(cell, FOCUS_CLASS)?;
            }
        }
        Ok(())
    }

    fn remove_highlight(&self, doc: &mut Document) -> Result<(), DomError> {
        for &cell in &self.cells {
            doc.remove_class(cell, FOCUS_CLASS)?;
        }
        Ok(())
    }
}

impl Component for PincodeInput {
    type Message = Message;
    type Context = Document;

    fn update(&mut self, doc: &mut Document, msg: Message) -> Command<Message> {
        match self.handle(doc, msg) {
            Ok(cmd) => cmd,
            Err(err) => {
                tracing::warn!(id = %self.id, %err, "pincode event failed");
                Command::none()
            }
        }
    }

    fn view(&self, doc: &Document, frame: &mut Frame, area: Rect) {
        let rects = self.cell_rects(area);
        for ((&cell, &span), rect) in self.cells.iter().zip(&self.spans).zip(rects) {
            let text = doc.text(span);
            let border = if doc.has_class(cell, FOCUS_CLASS) {
                self.style.focused
            } else if text.is_empty() {
                self.style.border
            } else {
                self.style.filled
            };
            let block = Block::bordered()
                .border_type(BorderType::Rounded)
                .border_style(border);
            let paragraph = Paragraph::new(text)
                .style(self.style.text)
                .alignment(Alignment::Center)
                .block(block);
            frame.render_widget(paragraph, rect);
        }
    }

    fn focused(&self, doc: &Document) -> bool {
        self.is_focused(doc)
    }
}

fn is_digit_key(key: KeyEvent) -> bool {
    let plain = !key
        .modifiers
        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER | KeyModifiers::META);
    plain && matches!(key.code, KeyCode::Char(c) if c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;
    use pincode_core::testing::{buffer_to_string, render_with, resolve};
    use std::sync::Mutex;

    type InputLog = Arc<Mutex<Vec<(String, Option<usize>)>>>;
    type CompleteLog = Arc<Mutex<Vec<String>>>;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn key_ctrl(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::CONTROL,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    /// A `<form>` with text before and after an `<input id="pin">`.
    fn page(attrs: &[(&str, &str)]) -> (Document, NodeId, NodeId) {
        let mut doc = Document::new();
        let form = doc.create_element("form");
        doc.append_child(doc.body(), form).unwrap();
        let before = doc.create_element("label");
        let input = doc.create_element_with("input", attrs);
        let after = doc.create_element("button");
        for node in [before, input, after] {
            doc.append_child(form, node).unwrap();
        }
        (doc, form, input)
    }

    fn mount(doc: &mut Document, input: NodeId, options: PincodeOptions) -> PincodeInput {
        PincodeInput::mount(doc, Target::Node(input), options, InstanceId(0)).unwrap()
    }

    fn recorded(options: PincodeOptions) -> (PincodeOptions, InputLog, CompleteLog) {
        let inputs = InputLog::default();
        let completes = CompleteLog::default();
        let (i, c) = (inputs.clone(), completes.clone());
        let options = options
            .on_input(move |value, index| i.lock().unwrap().push((value.to_owned(), index)))
            .on_complete(move |value| c.lock().unwrap().push(value.to_owned()));
        (options, inputs, completes)
    }

    fn press(widget: &mut PincodeInput, doc: &mut Document, code: KeyCode) -> Command<Message> {
        widget.update(doc, Message::Key(key(code)))
    }

    fn type_str(widget: &mut PincodeInput, doc: &mut Document, text: &str) {
        for c in text.chars() {
            press(widget, doc, KeyCode::Char(c));
        }
    }

    fn shown(widget: &PincodeInput, doc: &Document) -> String {
        widget
            .spans
            .iter()
            .map(|&span| match doc.text(span) {
                "" => "_".to_owned(),
                text => text.to_owned(),
            })
            .collect()
    }

    fn highlighted(widget: &PincodeInput, doc: &Document) -> Vec<usize> {
        (0..widget.cell_count())
            .filter(|&i| doc.has_class(widget.cells()[i], FOCUS_CLASS))
            .collect()
    }

    #[test]
    fn mount_replaces_input_with_markup() {
        let (mut doc, form, input) = page(&[("id", "pin"), ("hidden", "")]);
        let widget = mount(&mut doc, input, PincodeOptions::new().length(3));
        assert_eq!(doc.children(form)[1], widget.wrapper());
        assert_eq!(doc.children(form).len(), 3);
        assert_eq!(
            doc.outer_html(widget.wrapper()),
            "<div class=\"pincodeInput pincodeInput-0\">\
             <input id=\"pin\" type=\"text\" pattern=\"[0-9]*\" inputmode=\"numeric\" \
             maxlength=\"3\" autocomplete=\"off\" class=\"pincode-input\">\
             <div class=\"pincode\">\
             <div data-index=\"0\" class=\"pincode-grid\"><span></span></div>\
             <div data-index=\"1\" class=\"pincode-grid\"><span></span></div>\
             <div data-index=\"2\" class=\"pincode-grid\"><span></span></div>\
             </div></div>"
        );
    }

    #[test]
    fn maxlength_attribute_wins_over_length() {
        let (mut doc, _, input) = page(&[("maxlength", "4")]);
        let widget = mount(&mut doc, input, PincodeOptions::new().length(8));
        assert_eq!(widget.cell_count(), 4);
        assert_eq!(doc.query_selector_all(".pincode-grid", None).unwrap().len(), 4);
    }

    #[test]
    fn secure_sets_password_type() {
        let (mut doc, _, input) = page(&[]);
        mount(&mut doc, input, PincodeOptions::new().secure(true));
        assert_eq!(doc.attribute(input, "type"), Some("password"));
    }

    #[test]
    fn resolution_errors() {
        let (mut doc, form, _) = page(&[("type", "checkbox"), ("id", "check")]);
        let mount_err = |doc: &mut Document, target: Target<'_>| {
            PincodeInput::mount(doc, target, PincodeOptions::new(), InstanceId(0)).err()
        };
        assert_eq!(mount_err(&mut doc, "#missing".into()), Some(PincodeError::ElementNotFound));
        assert_eq!(mount_err(&mut doc, form.into()), Some(PincodeError::NotAnInput));
        assert_eq!(mount_err(&mut doc, "#check".into()), Some(PincodeError::NotAnInput));
        assert!(matches!(
            mount_err(&mut doc, "##".into()),
            Some(PincodeError::Dom(DomError::InvalidSelector { .. }))
        ));
    }

    #[test]
    fn styles_are_injected_only_when_configured() {
        let (mut doc, _, input) = page(&[]);
        mount(&mut doc, input, PincodeOptions::new());
        assert!(doc.children(doc.head()).is_empty());

        let (mut doc, _, input) = page(&[]);
        let styles = StyleRulesFixture::grid_color("red");
        mount(&mut doc, input, PincodeOptions::new().styles(styles));
        let style = doc.get_element_by_id("pincodeInput-style-0").unwrap();
        assert_eq!(doc.text(style), ".pincodeInput-0 .pincode-grid{border-color:red;}\n");
    }

    struct StyleRulesFixture;

    impl StyleRulesFixture {
        fn grid_color(color: &str) -> pincode_dom::StyleRules {
            pincode_dom::StyleRules::new().with(
                ".pincodeInput",
                pincode_dom::StyleRules::new()
                    .with(".pincode-grid", pincode_dom::StyleRules::new().with("borderColor", color)),
            )
        }
    }

    #[test]
    fn typing_fills_cells_and_fires_callbacks() {
        let (mut doc, _, input) = page(&[]);
        let (options, inputs, completes) = recorded(PincodeOptions::new());
        let mut widget = mount(&mut doc, input, options);

        type_str(&mut widget, &mut doc, "123");
        assert_eq!(shown(&widget, &doc), "123___");
        assert_eq!(inputs.lock().unwrap().last(), Some(&("123".to_owned(), Some(3))));
        assert!(completes.lock().unwrap().is_empty());

        type_str(&mut widget, &mut doc, "456");
        assert_eq!(widget.value(&doc), "123456");
        assert_eq!(*completes.lock().unwrap(), vec!["123456".to_owned()]);

        // Full input ignores further typing.
        type_str(&mut widget, &mut doc, "7");
        assert_eq!(widget.value(&doc), "123456");
        assert_eq!(completes.lock().unwrap().len(), 1);
    }

    #[test]
    fn complete_fires_again_after_refill() {
        let (mut doc, _, input) = page(&[]);
        let (options, _, completes) = recorded(PincodeOptions::new().length(2).enable_navigation(false));
        let mut widget = mount(&mut doc, input, options);
        type_str(&mut widget, &mut doc, "12");
        press(&mut widget, &mut doc, KeyCode::Backspace);
        type_str(&mut widget, &mut doc, "3");
        assert_eq!(*completes.lock().unwrap(), vec!["12".to_owned(), "13".to_owned()]);
    }

    #[test]
    fn force_digits_suppresses_other_keys() {
        let (mut doc, _, input) = page(&[]);
        let mut widget = mount(&mut doc, input, PincodeOptions::new());
        type_str(&mut widget, &mut doc, "1a-2");
        assert_eq!(widget.value(&doc), "12");
    }

    #[test]
    fn letters_allowed_without_force_digits() {
        let (mut doc, _, input) = page(&[]);
        let mut widget = mount(&mut doc, input, PincodeOptions::new().force_digits(false));
        type_str(&mut widget, &mut doc, "a1B");
        assert_eq!(shown(&widget, &doc), "a1B___");
        assert_eq!(widget.value(&doc), "a1B");
    }

    #[test]
    fn input_event_strips_non_digits() {
        let (mut doc, _, input) = page(&[]);
        let (options, _, completes) = recorded(PincodeOptions::new());
        let mut widget = mount(&mut doc, input, options);

        doc.set_value(input, "12a3bc45").unwrap();
        widget.update(&mut doc, Message::Input);
        assert_eq!(widget.value(&doc), "12345");
        assert_eq!(shown(&widget, &doc), "12345_");
        assert!(completes.lock().unwrap().is_empty());

        type_str(&mut widget, &mut doc, "6");
        assert_eq!(*completes.lock().unwrap(), vec!["123456".to_owned()]);
    }

    #[test]
    fn input_event_truncates_overlong_values() {
        let (mut doc, _, input) = page(&[]);
        let mut widget = mount(&mut doc, input, PincodeOptions::new().length(4));
        doc.set_value(input, "123456").unwrap();
        widget.update(&mut doc, Message::Input);
        assert_eq!(widget.value(&doc), "1234");
    }

    #[test]
    fn paste_filters_then_truncates() {
        let (mut doc, _, input) = page(&[]);
        let (options, inputs, completes) = recorded(PincodeOptions::new());
        let mut widget = mount(&mut doc, input, options);
        widget.update(&mut doc, Message::Paste("12-34-56".into()));
        assert_eq!(widget.value(&doc), "123456");
        assert_eq!(shown(&widget, &doc), "123456");
        assert_eq!(*completes.lock().unwrap(), vec!["123456".to_owned()]);
        assert_eq!(inputs.lock().unwrap().last(), Some(&("123456".to_owned(), Some(5))));
        assert_eq!(widget.active_index(), 6);

        widget.update(&mut doc, Message::Paste("98765432".into()));
        assert_eq!(widget.value(&doc), "987654");
    }

    #[test]
    fn paste_can_be_disabled() {
        let (mut doc, _, input) = page(&[]);
        let mut widget = mount(&mut doc, input, PincodeOptions::new().allow_paste(false));
        widget.update(&mut doc, Message::Paste("1234".into()));
        assert_eq!(widget.value(&doc), "");
    }

    #[test]
    fn paste_shortcut_is_not_suppressed_or_typed() {
        let (mut doc, _, input) = page(&[]);
        let mut widget = mount(&mut doc, input, PincodeOptions::new());
        let cmd = widget.update(&mut doc, Message::Key(key_ctrl(KeyCode::Char('v'))));
        assert!(cmd.is_none());
        assert_eq!(widget.value(&doc), "");
    }

    #[test]
    fn backspace_without_navigation_drops_last() {
        let (mut doc, _, input) = page(&[]);
        let (options, inputs, _) = recorded(PincodeOptions::new().enable_navigation(false));
        let mut widget = mount(&mut doc, input, options);
        widget.update(&mut doc, Message::Focus);
        assert_eq!(highlighted(&widget, &doc), vec![0]);

        type_str(&mut widget, &mut doc, "123");
        assert_eq!(highlighted(&widget, &doc), vec![3]);
        press(&mut widget, &mut doc, KeyCode::Backspace);
        assert_eq!(widget.value(&doc), "12");
        assert_eq!(shown(&widget, &doc), "12____");
        assert_eq!(highlighted(&widget, &doc), vec![2]);
        assert_eq!(inputs.lock().unwrap().last(), Some(&("12".to_owned(), Some(1))));

        press(&mut widget, &mut doc, KeyCode::Backspace);
        press(&mut widget, &mut doc, KeyCode::Backspace);
        let calls = inputs.lock().unwrap().len();
        assert!(press(&mut widget, &mut doc, KeyCode::Backspace).is_none());
        assert_eq!(inputs.lock().unwrap().len(), calls);
    }

    #[test]
    fn arrows_move_active_cell_and_caret() {
        let (mut doc, _, input) = page(&[]);
        let mut widget = mount(&mut doc, input, PincodeOptions::new());
        type_str(&mut widget, &mut doc, "123");
        assert_eq!(widget.active_index(), 3);

        press(&mut widget, &mut doc, KeyCode::Left);
        assert_eq!(widget.active_index(), 2);
        assert_eq!(doc.caret(input), Some(2));
        assert!(widget.is_focused(&doc));
        assert_eq!(highlighted(&widget, &doc), vec![2]);

        press(&mut widget, &mut doc, KeyCode::Up);
        assert_eq!(widget.active_index(), 0);
        press(&mut widget, &mut doc, KeyCode::Left);
        assert_eq!(widget.active_index(), 0);

        press(&mut widget, &mut doc, KeyCode::Down);
        assert_eq!(widget.active_index(), 5);
        assert_eq!(doc.caret(input), Some(3));
        press(&mut widget, &mut doc, KeyCode::Right);
        assert_eq!(widget.active_index(), 5);
        assert_eq!(highlighted(&widget, &doc), vec![5]);
    }

    #[test]
    fn typing_inserts_at_caret_with_navigation() {
        let (mut doc, _, input) = page(&[]);
        let mut widget = mount(&mut doc, input, PincodeOptions::new());
        type_str(&mut widget, &mut doc, "12");
        press(&mut widget, &mut doc, KeyCode::Left);
        type_str(&mut widget, &mut doc, "9");
        assert_eq!(widget.value(&doc), "192");
        assert_eq!(widget.active_index(), 2);
    }

    #[test]
    fn navigation_backspace_deletes_at_active_cell() {
        let (mut doc, _, input) = page(&[]);
        let (options, inputs, _) = recorded(PincodeOptions::new());
        let mut widget = mount(&mut doc, input, options);
        type_str(&mut widget, &mut doc, "1234");
        press(&mut widget, &mut doc, KeyCode::Left);
        assert_eq!(widget.active_index(), 3);

        press(&mut widget, &mut doc, KeyCode::Backspace);
        assert_eq!(widget.value(&doc), "123");
        assert_eq!(widget.active_index(), 2);
        assert_eq!(doc.caret(input), Some(2));
        assert_eq!(shown(&widget, &doc), "123___");
        assert_eq!(inputs.lock().unwrap().last(), Some(&("123".to_owned(), Some(3))));
    }

    #[test]
    fn navigation_backspace_past_value_only_steps_back() {
        let (mut doc, _, input) = page(&[]);
        let (options, inputs, _) = recorded(PincodeOptions::new());
        let mut widget = mount(&mut doc, input, options);
        type_str(&mut widget, &mut doc, "123");
        assert_eq!(widget.active_index(), 3);

        press(&mut widget, &mut doc, KeyCode::Backspace);
        assert_eq!(widget.value(&doc), "123");
        assert_eq!(widget.active_index(), 2);
        assert_eq!(inputs.lock().unwrap().last(), Some(&("123".to_owned(), Some(3))));
    }

    #[test]
    fn navigation_backspace_at_first_cell_drops_last() {
        let (mut doc, _, input) = page(&[]);
        let mut widget = mount(&mut doc, input, PincodeOptions::new());
        type_str(&mut widget, &mut doc, "123");
        press(&mut widget, &mut doc, KeyCode::Up);
        press(&mut widget, &mut doc, KeyCode::Backspace);
        assert_eq!(widget.value(&doc), "12");
        assert_eq!(widget.active_index(), 0);
    }

    #[test]
    fn escape_clears_and_blurs() {
        let (mut doc, _, input) = page(&[]);
        let (options, inputs, _) = recorded(PincodeOptions::new());
        let mut widget = mount(&mut doc, input, options);
        widget.update(&mut doc, Message::Focus);
        type_str(&mut widget, &mut doc, "12");

        press(&mut widget, &mut doc, KeyCode::Esc);
        assert_eq!(widget.value(&doc), "");
        assert_eq!(shown(&widget, &doc), "______");
        assert!(!widget.is_focused(&doc));
        assert!(highlighted(&widget, &doc).is_empty());
        assert_eq!(inputs.lock().unwrap().last(), Some(&(String::new(), None)));
    }

    #[test]
    fn escape_can_be_disabled() {
        let (mut doc, _, input) = page(&[]);
        let mut widget = mount(&mut doc, input, PincodeOptions::new().allow_escape(false));
        type_str(&mut widget, &mut doc, "12");
        press(&mut widget, &mut doc, KeyCode::Esc);
        assert_eq!(widget.value(&doc), "12");
    }

    #[test]
    fn clear_is_idempotent() {
        let (mut doc, _, input) = page(&[]);
        let (options, _, completes) = recorded(PincodeOptions::new());
        let mut widget = mount(&mut doc, input, options);
        widget.update(&mut doc, Message::Paste("123456".into()));

        for _ in 0..2 {
            assert!(widget.clear(&mut doc).unwrap().is_none());
            assert_eq!(widget.value(&doc), "");
            assert_eq!(widget.active_index(), 0);
            assert_eq!(shown(&widget, &doc), "______");
            assert!(highlighted(&widget, &doc).is_empty());
        }
        assert_eq!(completes.lock().unwrap().len(), 1);
    }

    #[test]
    fn clear_while_focused_drops_highlight() {
        let (mut doc, _, input) = page(&[]);
        let mut widget = mount(&mut doc, input, PincodeOptions::new());
        widget.update(&mut doc, Message::Focus);
        widget.update(&mut doc, Message::Paste("123".into()));
        assert_eq!(highlighted(&widget, &doc), vec![3]);

        for _ in 0..2 {
            widget.clear(&mut doc).unwrap();
            assert_eq!(widget.value(&doc), "");
            assert_eq!(widget.active_index(), 0);
            assert!(highlighted(&widget, &doc).is_empty());
        }
        assert!(widget.is_focused(&doc));
    }

    #[test]
    fn focus_and_blur_toggle_highlight() {
        let (mut doc, _, input) = page(&[]);
        let mut widget = mount(&mut doc, input, PincodeOptions::new());
        widget.update(&mut doc, Message::Focus);
        assert!(widget.focused(&doc));
        assert_eq!(highlighted(&widget, &doc), vec![0]);
        widget.update(&mut doc, Message::Focus);
        assert_eq!(highlighted(&widget, &doc), vec![0]);

        widget.update(&mut doc, Message::Blur);
        assert!(highlighted(&widget, &doc).is_empty());
    }

    #[test]
    fn auto_focus_activates_first_cell() {
        let (mut doc, _, input) = page(&[]);
        let widget = mount(&mut doc, input, PincodeOptions::new().auto_focus(true));
        assert!(widget.is_focused(&doc));
        assert_eq!(doc.caret(input), Some(0));
        assert_eq!(highlighted(&widget, &doc), vec![0]);
    }

    #[test]
    fn cell_click_focuses_and_places_caret() {
        let (mut doc, _, input) = page(&[]);
        let mut widget = mount(&mut doc, input, PincodeOptions::new());
        widget.update(&mut doc, Message::Paste("1234".into()));
        widget.update(&mut doc, Message::CellClick(2));
        assert!(widget.is_focused(&doc));
        assert_eq!(widget.active_index(), 2);
        assert_eq!(doc.caret(input), Some(2));
        assert_eq!(highlighted(&widget, &doc), vec![2]);

        widget.update(&mut doc, Message::CellClick(9));
        assert_eq!(widget.active_index(), 2);
    }

    #[test]
    fn cell_click_without_navigation_keeps_append_position() {
        let (mut doc, _, input) = page(&[]);
        let mut widget = mount(&mut doc, input, PincodeOptions::new().enable_navigation(false));
        widget.update(&mut doc, Message::Paste("12".into()));
        widget.update(&mut doc, Message::CellClick(0));
        assert!(widget.is_focused(&doc));
        assert_eq!(highlighted(&widget, &doc), vec![2]);
    }

    #[test]
    fn replaced_callbacks_do_not_fire_retroactively() {
        let (mut doc, _, input) = page(&[]);
        let mut widget = mount(&mut doc, input, PincodeOptions::new());
        type_str(&mut widget, &mut doc, "12");

        let log = InputLog::default();
        let sink = log.clone();
        widget.set_on_input(move |value, index| sink.lock().unwrap().push((value.to_owned(), index)));
        assert!(log.lock().unwrap().is_empty());
        type_str(&mut widget, &mut doc, "3");
        assert_eq!(*log.lock().unwrap(), vec![("123".to_owned(), Some(3))]);

        let done = CompleteLog::default();
        let sink = done.clone();
        widget.set_on_complete(move |value| sink.lock().unwrap().push(value.to_owned()));
        type_str(&mut widget, &mut doc, "456");
        assert_eq!(*done.lock().unwrap(), vec!["123456".to_owned()]);
    }

    #[tokio::test(start_paused = true)]
    async fn secure_reveals_last_digit_then_masks() {
        let (mut doc, _, input) = page(&[]);
        let mut widget = mount(&mut doc, input, PincodeOptions::new().secure(true));

        let cmd = press(&mut widget, &mut doc, KeyCode::Char('7'));
        assert_eq!(shown(&widget, &doc), "7_____");

        for msg in resolve(cmd).await {
            widget.update(&mut doc, msg);
        }
        assert_eq!(shown(&widget, &doc), "•_____");
    }

    #[tokio::test(start_paused = true)]
    async fn newer_keystroke_supersedes_pending_mask() {
        let (mut doc, _, input) = page(&[]);
        let mut widget = mount(&mut doc, input, PincodeOptions::new().secure(true).placeholder('*'));

        let first = press(&mut widget, &mut doc, KeyCode::Char('1'));
        let second = press(&mut widget, &mut doc, KeyCode::Char('2'));
        assert_eq!(shown(&widget, &doc), "*2____");

        for msg in resolve(first).await {
            widget.update(&mut doc, msg);
        }
        assert_eq!(shown(&widget, &doc), "*2____");

        for msg in resolve(second).await {
            widget.update(&mut doc, msg);
        }
        assert_eq!(shown(&widget, &doc), "**____");
    }

    #[tokio::test(start_paused = true)]
    async fn mask_skipped_when_value_changed_meanwhile() {
        let (mut doc, _, input) = page(&[]);
        let mut widget = mount(&mut doc, input, PincodeOptions::new().secure(true));
        let cmd = press(&mut widget, &mut doc, KeyCode::Char('7'));
        doc.set_value(input, "8").unwrap();
        for msg in resolve(cmd).await {
            widget.update(&mut doc, msg);
        }
        assert_eq!(shown(&widget, &doc), "7_____");
    }

    #[test]
    fn clearing_cancels_pending_mask() {
        let (mut doc, _, input) = page(&[]);
        let mut widget = mount(&mut doc, input, PincodeOptions::new().secure(true));
        drop(press(&mut widget, &mut doc, KeyCode::Char('7')));
        assert!(widget.reveal.is_pending());
        widget.clear(&mut doc).unwrap();
        assert!(!widget.reveal.is_pending());
    }

    #[test]
    fn secure_complete_fires_before_mask() {
        let (mut doc, _, input) = page(&[]);
        let (options, inputs, completes) = recorded(PincodeOptions::new().secure(true).length(4));
        let mut widget = mount(&mut doc, input, options);
        type_str(&mut widget, &mut doc, "1234");
        assert_eq!(shown(&widget, &doc), "•••4");
        assert_eq!(*completes.lock().unwrap(), vec!["1234".to_owned()]);
        assert_eq!(inputs.lock().unwrap().last(), Some(&("1234".to_owned(), Some(4))));
    }

    #[test]
    fn secure_mode_ignores_arrows() {
        let (mut doc, _, input) = page(&[]);
        let mut widget = mount(&mut doc, input, PincodeOptions::new().secure(true));
        type_str(&mut widget, &mut doc, "12");
        press(&mut widget, &mut doc, KeyCode::Left);
        assert_eq!(widget.active_index(), 2);
        press(&mut widget, &mut doc, KeyCode::Backspace);
        assert_eq!(widget.value(&doc), "1");
        assert_eq!(shown(&widget, &doc), "1_____");
    }

    #[test]
    fn renders_one_box_per_cell() {
        let (mut doc, _, input) = page(&[]);
        let mut widget = mount(&mut doc, input, PincodeOptions::new().length(4));
        type_str(&mut widget, &mut doc, "12");

        let area = Rect::new(0, 0, widget.preferred_width(), widget.preferred_height());
        assert_eq!(area.width, 4 * 5 + 3);
        let screen = buffer_to_string(&render_with(area.width, area.height, |frame| {
            widget.view(&doc, frame, area);
        }));
        let rows: Vec<&str> = screen.lines().collect();
        assert_eq!(rows[0], "╭───╮ ╭───╮ ╭───╮ ╭───╮");
        assert_eq!(rows[1], "│ 1 │ │ 2 │ │   │ │   │");
        assert_eq!(rows[2], "╰───╯ ╰───╯ ╰───╯ ╰───╯");
    }

    #[test]
    fn hit_testing_maps_columns_to_cells() {
        let (mut doc, _, input) = page(&[]);
        let widget = mount(&mut doc, input, PincodeOptions::new().length(3));
        let area = Rect::new(2, 1, 40, 3);
        assert_eq!(widget.cell_at(area, 2, 1), Some(0));
        assert_eq!(widget.cell_at(area, 6, 3), Some(0));
        assert_eq!(widget.cell_at(area, 7, 2), None);
        assert_eq!(widget.cell_at(area, 8, 2), Some(1));
        assert_eq!(widget.cell_at(area, 14, 2), Some(2));
        assert_eq!(widget.cell_at(area, 20, 2), None);
        assert_eq!(widget.cell_at(area, 3, 4), None);
    }

    #[test]
    fn narrow_areas_drop_cells() {
        let (mut doc, _, input) = page(&[]);
        let widget = mount(&mut doc, input, PincodeOptions::new());
        assert_eq!(widget.cell_rects(Rect::new(0, 0, 12, 3)).len(), 2);
        assert!(widget.cell_rects(Rect::new(0, 0, 40, 0)).is_empty());
    }
}
