//! Typed publish/subscribe event bus scoped to a viewing session

use std::cell::RefCell;
use std::rc::Rc;

use log::warn;

use crate::sidebar::SidebarView;

/// Events exchanged between the viewer shell, the sidebar, and the
/// rendering collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerEvent {
    /// The sidebar's visible view changed (open/close/switch).
    SidebarViewChanged { view: SidebarView },
    /// The document outline finished loading; zero entries means the
    /// document has no outline.
    OutlineLoaded { outline_count: usize },
    /// The document attachments finished loading.
    AttachmentsLoaded { attachments_count: usize },
    /// Presentation mode was entered or exited.
    PresentationModeChanged {
        active: bool,
        switch_in_progress: bool,
    },
    /// A page finished a render pass. Page numbers are 1-based.
    PageRendered { page_number: usize },
    /// The current page is changing. Page numbers are 1-based.
    PageChanging { page_number: usize },
}

/// Discriminant used to subscribe to one event family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    SidebarViewChanged,
    OutlineLoaded,
    AttachmentsLoaded,
    PresentationModeChanged,
    PageRendered,
    PageChanging,
}

impl ViewerEvent {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            ViewerEvent::SidebarViewChanged { .. } => EventKind::SidebarViewChanged,
            ViewerEvent::OutlineLoaded { .. } => EventKind::OutlineLoaded,
            ViewerEvent::AttachmentsLoaded { .. } => EventKind::AttachmentsLoaded,
            ViewerEvent::PresentationModeChanged { .. } => EventKind::PresentationModeChanged,
            ViewerEvent::PageRendered { .. } => EventKind::PageRendered,
            ViewerEvent::PageChanging { .. } => EventKind::PageChanging,
        }
    }
}

/// Handle returned by [`EventBus::on`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Handler = Rc<RefCell<dyn FnMut(&ViewerEvent)>>;

struct Listener {
    id: ListenerId,
    kind: EventKind,
    handler: Handler,
}

#[derive(Default)]
struct BusInner {
    next_id: u64,
    listeners: Vec<Listener>,
}

/// Single-threaded publish/subscribe channel with named events and
/// structured payloads. Cloning the bus clones a handle to the same
/// channel; the bus lives as long as the session object that owns it.
///
/// Dispatch works off a snapshot of the listener list, so handlers may
/// subscribe, unsubscribe, or dispatch further events. A handler that
/// ends up re-entering itself is skipped for the nested invocation.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Rc<RefCell<BusInner>>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to one event family.
    pub fn on(&self, kind: EventKind, handler: impl FnMut(&ViewerEvent) + 'static) -> ListenerId {
        let mut inner = self.inner.borrow_mut();
        inner.next_id += 1;
        let id = ListenerId(inner.next_id);
        inner.listeners.push(Listener {
            id,
            kind,
            handler: Rc::new(RefCell::new(handler)),
        });
        id
    }

    /// Unsubscribe. Returns false if the listener was already gone.
    pub fn off(&self, id: ListenerId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let before = inner.listeners.len();
        inner.listeners.retain(|listener| listener.id != id);
        inner.listeners.len() != before
    }

    /// Publish an event to every listener subscribed to its kind, in
    /// subscription order.
    pub fn dispatch(&self, event: &ViewerEvent) {
        let matching: Vec<(ListenerId, Handler)> = self
            .inner
            .borrow()
            .listeners
            .iter()
            .filter(|listener| listener.kind == event.kind())
            .map(|listener| (listener.id, listener.handler.clone()))
            .collect();

        for (id, handler) in matching {
            match handler.try_borrow_mut() {
                Ok(mut handler) => (*handler)(event),
                Err(_) => warn!(
                    "listener {:?} re-entered while dispatching {:?}; nested invocation skipped",
                    id,
                    event.kind()
                ),
            }
        }
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }
}
