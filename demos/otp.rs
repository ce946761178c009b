//! # One-time Code Example
//!
//! Two pincodes mounted into one document:
//! - A six-digit verification code with arrow-key navigation
//! - A four-digit secure PIN that masks each digit after a short reveal
//! - Keys, pastes, and mouse clicks routed through `PincodeRegistry`
//! - `Command::map` lifting widget commands (the re-mask timer) into the app
//!
//! Run with: `cargo run --example otp`
//! Set `PINCODE_LOG=path` to write tracing output to a file.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use pincode::crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEventKind};
use pincode::ratatui::layout::{Alignment, Constraint, Layout, Rect};
use pincode::ratatui::style::{Color, Modifier, Style};
use pincode::ratatui::text::{Line, Span};
use pincode::ratatui::widgets::{Block, Paragraph};
use pincode::ratatui::Frame;
use pincode::{
    Command, Component, Document, InstanceId, Message, Model, PincodeError, PincodeOptions,
    PincodeRegistry, PincodeStyle, ProgramOptions, Routed, StyleRules, TerminalEvent,
};

/// Shared between the widget callbacks and the view.
type ActivityLog = Arc<Mutex<Vec<String>>>;

struct OtpApp {
    doc: Document,
    pincodes: PincodeRegistry,
    otp: InstanceId,
    pin: InstanceId,
    activity: ActivityLog,
    screen: Rect,
}

#[derive(Debug)]
enum Msg {
    Pincode(Routed),
    Key(KeyEvent),
    Paste(String),
    Click { column: u16, row: u16 },
    FocusNext,
    TerminalBlur,
    Resize(u16, u16),
    Quit,
}

impl OtpApp {
    fn new(activity: ActivityLog) -> Result<Self, PincodeError> {
        let mut doc = Document::new();
        let form = doc.create_element_with("form", &[("id", "verify")]);
        doc.append_child(doc.body(), form)?;
        let otp_input = doc.create_element_with("input", &[("id", "otp"), ("maxlength", "6")]);
        let pin_input = doc.create_element_with("input", &[("id", "pin"), ("hidden", "")]);
        doc.append_child(form, otp_input)?;
        doc.append_child(form, pin_input)?;

        let mut pincodes = PincodeRegistry::new();
        let log = activity.clone();
        let done = activity.clone();
        let otp = pincodes.create(
            &mut doc,
            "#otp",
            PincodeOptions::new()
                .auto_focus(true)
                .styles(StyleRules::new().with(
                    ".pincodeInput",
                    StyleRules::new().with(".pincode-grid", StyleRules::new().with("borderColor", "teal")),
                ))
                .on_input(move |value, index| push(&log, format!("code: {value:?} at {index:?}")))
                .on_complete(move |value| push(&done, format!("code complete: {value}"))),
        )?;

        let done = activity.clone();
        let pin = pincodes.create(
            &mut doc,
            "#pin",
            PincodeOptions::new()
                .length(4)
                .secure(true)
                .on_complete(move |value| push(&done, format!("PIN set ({} digits)", value.len()))),
        )?;
        if let Some(widget) = pincodes.get_mut(pin) {
            widget.set_style(PincodeStyle {
                focused: Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
                ..PincodeStyle::default()
            });
        }

        let (columns, rows) = pincode::crossterm::terminal::size().unwrap_or((80, 24));
        Ok(OtpApp {
            doc,
            pincodes,
            otp,
            pin,
            activity,
            screen: Rect::new(0, 0, columns, rows),
        })
    }

    /// Inner areas the two widgets are drawn in, for a given screen.
    fn field_areas(screen: Rect) -> [(Rect, Rect); 2] {
        let [_, otp, pin, _, _] = screen_layout(screen);
        [otp, pin].map(|area| (area, Block::bordered().inner(area)))
    }
}

fn screen_layout(area: Rect) -> [Rect; 5] {
    Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(5),
        Constraint::Length(5),
        Constraint::Fill(1),
        Constraint::Length(1),
    ])
    .areas(area)
}

fn push(log: &ActivityLog, line: String) {
    if let Ok(mut log) = log.lock() {
        log.push(line);
    }
}

impl Model for OtpApp {
    type Message = Msg;
    type Flags = OtpApp;

    fn init(app: OtpApp) -> (Self, Command<Msg>) {
        (app, Command::none())
    }

    fn update(&mut self, msg: Msg) -> Command<Msg> {
        match msg {
            Msg::Pincode((id, msg)) => self
                .pincodes
                .update(&mut self.doc, id, msg)
                .unwrap_or_default()
                .map(Msg::Pincode),
            Msg::Key(key) => {
                if self.pincodes.focused(&self.doc).is_none() && key.code == KeyCode::Char('q') {
                    return Command::quit();
                }
                self.pincodes.dispatch_key(&mut self.doc, key).map(Msg::Pincode)
            }
            Msg::Paste(text) => self.pincodes.dispatch_paste(&mut self.doc, text).map(Msg::Pincode),
            Msg::Click { column, row } => {
                let ids = [self.otp, self.pin];
                for (id, (_, inner)) in ids.into_iter().zip(Self::field_areas(self.screen)) {
                    let Some(widget) = self.pincodes.get(id) else { continue };
                    if let Some(index) = widget.cell_at(inner, column, row) {
                        let cell = widget.cells()[index];
                        return self.pincodes.dispatch_click(&mut self.doc, cell).map(Msg::Pincode);
                    }
                }
                Command::none()
            }
            Msg::FocusNext => {
                let next = match self.pincodes.focused(&self.doc) {
                    Some(id) if id == self.otp => self.pin,
                    _ => self.otp,
                };
                self.pincodes
                    .update(&mut self.doc, next, Message::Focus)
                    .unwrap_or_default()
                    .map(Msg::Pincode)
            }
            Msg::TerminalBlur => {
                let Some(id) = self.pincodes.focused(&self.doc) else {
                    return Command::none();
                };
                if let Some(widget) = self.pincodes.get(id) {
                    self.doc.blur(widget.input());
                }
                self.pincodes
                    .update(&mut self.doc, id, Message::Blur)
                    .unwrap_or_default()
                    .map(Msg::Pincode)
            }
            Msg::Resize(columns, rows) => {
                self.screen = Rect::new(0, 0, columns, rows);
                Command::none()
            }
            Msg::Quit => Command::quit(),
        }
    }

    fn view(&self, frame: &mut Frame) {
        let [title_area, _, _, log_area, help_area] = screen_layout(frame.area());

        let title = Paragraph::new("Verify your account")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .block(Block::bordered());
        frame.render_widget(title, title_area);

        let fields = [(self.otp, "Verification code"), (self.pin, "New PIN")];
        for ((id, label), (outer, inner)) in fields.into_iter().zip(Self::field_areas(frame.area())) {
            let Some(widget) = self.pincodes.get(id) else { continue };
            let border = if widget.focused(&self.doc) {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            frame.render_widget(Block::bordered().title(label).border_style(border), outer);
            widget.view(&self.doc, frame, inner);
        }

        let lines: Vec<Line> = match self.activity.lock() {
            Ok(log) => log
                .iter()
                .rev()
                .take(usize::from(log_area.height.saturating_sub(2)))
                .map(|line| Line::raw(line.clone()))
                .collect(),
            Err(_) => Vec::new(),
        };
        frame.render_widget(
            Paragraph::new(lines).block(Block::bordered().title("Activity")),
            log_area,
        );

        let key = Style::default().fg(Color::Cyan);
        let help = Paragraph::new(Line::from(vec![
            Span::styled("Tab", key),
            Span::raw(" switch  "),
            Span::styled("←/→", key),
            Span::raw(" move  "),
            Span::styled("Esc", key),
            Span::raw(" clear  "),
            Span::styled("q", key),
            Span::raw(" quit (unfocused)  "),
            Span::styled("Ctrl+C", key),
            Span::raw(" quit"),
        ]))
        .alignment(Alignment::Center);
        frame.render_widget(help, help_area);
    }

    fn event(&self, event: TerminalEvent) -> Option<Msg> {
        match event {
            TerminalEvent::Key(key) => match (key.code, key.modifiers) {
                (KeyCode::Char('c'), m) if m.contains(KeyModifiers::CONTROL) => Some(Msg::Quit),
                (KeyCode::Tab | KeyCode::BackTab, _) => Some(Msg::FocusNext),
                _ => Some(Msg::Key(key)),
            },
            TerminalEvent::Paste(text) => Some(Msg::Paste(text)),
            TerminalEvent::Mouse(mouse) => match mouse.kind {
                MouseEventKind::Down(MouseButton::Left) => Some(Msg::Click {
                    column: mouse.column,
                    row: mouse.row,
                }),
                _ => None,
            },
            TerminalEvent::FocusLost => Some(Msg::TerminalBlur),
            TerminalEvent::Resize(columns, rows) => Some(Msg::Resize(columns, rows)),
            TerminalEvent::FocusGained => None,
        }
    }
}

#[pincode::tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let activity = ActivityLog::default();
    let app = OtpApp::new(activity.clone())?;
    let options = ProgramOptions {
        mouse_capture: true,
        title: Some("pincode".into()),
        log_file: std::env::var_os("PINCODE_LOG").map(PathBuf::from),
        ..ProgramOptions::default()
    };
    pincode::run_with::<OtpApp>(app, options).await?;

    if let Ok(log) = activity.lock() {
        for line in log.iter().filter(|line| line.contains("complete")) {
            println!("{line}");
        }
    }
    Ok(())
}
