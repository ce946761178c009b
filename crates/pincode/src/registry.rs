//! Instance bookkeeping and event routing for every widget in a document.

use std::fmt;
use std::sync::Once;

use pincode_core::{Command, Component};
use pincode_dom::{Document, EventType, FocusKind, ListenerKey, NodeId};

use crossterm::event::KeyEvent;

use crate::config::PincodeOptions;
use crate::error::PincodeError;
use crate::input::{stylesheet, Message, PincodeInput, Target};

static BANNER: Once = Once::new();

/// Stable identifier of a mounted widget. Never reused within a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(pub(crate) u64);

impl InstanceId {
    pub(crate) fn listener_key(self) -> ListenerKey {
        ListenerKey(self.0)
    }
}

impl From<ListenerKey> for InstanceId {
    fn from(key: ListenerKey) -> Self {
        InstanceId(key.0)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A widget message tagged with the instance it belongs to.
pub type Routed = (InstanceId, Message);

/// Owns every [`PincodeInput`] mounted into a document.
///
/// Widgets are addressed by [`InstanceId`]. Events arriving from the host
/// application go through the `dispatch_*` helpers, which find the owning
/// widget through the listeners it registered on its elements. Focus moves
/// made by one widget are delivered to the others as
/// [`Message::Focus`]/[`Message::Blur`].
#[derive(Default)]
pub struct PincodeRegistry {
    instances: Vec<PincodeInput>,
    next_id: u64,
}

impl fmt::Debug for PincodeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PincodeRegistry")
            .field("instances", &self.ids().collect::<Vec<_>>())
            .field("next_id", &self.next_id)
            .finish()
    }
}

impl PincodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount a widget on `target` and register it.
    ///
    /// Fires `on_load` once the widget is registered. The first successful
    /// creation in the process logs the crate version.
    pub fn create<'a>(
        &mut self,
        doc: &mut Document,
        target: impl Into<Target<'a>>,
        options: PincodeOptions,
    ) -> Result<InstanceId, PincodeError> {
        let id = InstanceId(self.next_id);
        let widget = PincodeInput::mount(doc, target.into(), options, id)?;
        self.next_id += 1;
        let on_load = widget.config().on_load.clone();
        self.instances.push(widget);
        self.route_focus_changes(doc);

        if let Some(on_load) = on_load {
            on_load();
        }
        announce(&BANNER);
        Ok(id)
    }

    pub fn get(&self, id: InstanceId) -> Option<&PincodeInput> {
        self.instances.iter().find(|w| w.id() == id)
    }

    pub fn get_mut(&mut self, id: InstanceId) -> Option<&mut PincodeInput> {
        self.instances.iter_mut().find(|w| w.id() == id)
    }

    /// Deliver `msg` to one widget, then route any focus moves it caused.
    pub fn update(
        &mut self,
        doc: &mut Document,
        id: InstanceId,
        msg: Message,
    ) -> Result<Command<Routed>, PincodeError> {
        let widget = self.get_mut(id).ok_or(PincodeError::InstanceNotFound)?;
        let cmd = widget.update(doc, msg);
        self.route_focus_changes(doc);
        Ok(cmd.map(move |msg| (id, msg)))
    }

    /// Remove a widget: its stylesheet, its wrapper (input included) and its
    /// registry entry.
    pub fn destroy(&mut self, doc: &mut Document, id: InstanceId) -> Result<(), PincodeError> {
        let index = self
            .instances
            .iter()
            .position(|w| w.id() == id)
            .ok_or(PincodeError::InstanceNotFound)?;
        let widget = self.instances.remove(index);
        stylesheet().remove(doc, &id.to_string());
        if doc.contains(widget.wrapper()) {
            doc.remove(widget.wrapper())?;
        }
        // Focus held by the removed input is dropped silently.
        self.route_focus_changes(doc);
        tracing::debug!(id = %id, "destroyed pincode input");
        Ok(())
    }

    /// The widget whose input has focus.
    pub fn focused(&self, doc: &Document) -> Option<InstanceId> {
        let node = doc.active_element()?;
        let id = InstanceId::from(doc.listeners(node, EventType::KeyDown).next()?);
        self.get(id).map(|_| id)
    }

    /// Send a key press to the focused widget, if any.
    pub fn dispatch_key(&mut self, doc: &mut Document, key: KeyEvent) -> Command<Routed> {
        match self.focused(doc) {
            Some(id) => self.update(doc, id, Message::Key(key)).unwrap_or_default(),
            None => Command::none(),
        }
    }

    /// Send pasted text to the focused widget, if any.
    pub fn dispatch_paste(&mut self, doc: &mut Document, text: String) -> Command<Routed> {
        match self.focused(doc) {
            Some(id) => self.update(doc, id, Message::Paste(text)).unwrap_or_default(),
            None => Command::none(),
        }
    }

    /// Deliver a click on `node` to the widget owning that cell.
    pub fn dispatch_click(&mut self, doc: &mut Document, node: NodeId) -> Command<Routed> {
        let Some(owner) = doc.listeners(node, EventType::Click).next() else {
            return Command::none();
        };
        let Some(index) = doc
            .attribute(node, "data-index")
            .and_then(|index| index.parse().ok())
        else {
            return Command::none();
        };
        self.update(doc, owner.into(), Message::CellClick(index))
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Registered ids in creation order.
    pub fn ids(&self) -> impl Iterator<Item = InstanceId> + '_ {
        self.instances.iter().map(PincodeInput::id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PincodeInput> {
        self.instances.iter()
    }

    fn route_focus_changes(&mut self, doc: &mut Document) {
        loop {
            let changes = doc.take_focus_changes();
            if changes.is_empty() {
                return;
            }
            for change in changes {
                if change.kind == FocusKind::Focus && doc.active_element() != Some(change.node) {
                    continue;
                }
                let (event, msg) = match change.kind {
                    FocusKind::Focus => (EventType::Focus, Message::Focus),
                    FocusKind::Blur => (EventType::Blur, Message::Blur),
                };
                let owners: Vec<ListenerKey> = doc.listeners(change.node, event).collect();
                for owner in owners {
                    if let Some(widget) = self.get_mut(owner.into()) {
                        // Focus and blur handling never produces commands.
                        let _ = widget.update(doc, msg.clone());
                    }
                }
            }
        }
    }
}

fn announce(banner: &Once) {
    banner.call_once(|| {
        tracing::info!("PincodeInput is loaded, version: {}", crate::VERSION);
    });
}
