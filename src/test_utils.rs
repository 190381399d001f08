//! Recording stub collaborators for unit and integration tests

use std::cell::RefCell;
use std::rc::Rc;

use crate::events::{EventBus, EventKind, ViewerEvent};
use crate::rendering::{
    DocumentView, OutlineNav, PageHandle, PageImage, RenderQueue, RenderingState, ThumbnailSlot,
    ThumbnailStrip,
};
use crate::sidebar::SidebarView;

/// Shorthand for the `Rc<RefCell<_>>` wiring used throughout the crate.
pub fn shared<T>(value: T) -> Rc<RefCell<T>> {
    Rc::new(RefCell::new(value))
}

pub struct StubPage {
    number: usize,
    state: RenderingState,
    image: Option<PageImage>,
}

impl StubPage {
    fn new(number: usize) -> Self {
        Self {
            number,
            state: RenderingState::Initial,
            image: None,
        }
    }
}

impl PageHandle for StubPage {
    fn page_number(&self) -> usize {
        self.number
    }

    fn rendering_state(&self) -> RenderingState {
        self.state
    }

    fn image(&self) -> Option<&PageImage> {
        self.image.as_ref()
    }
}

/// Document viewer stub; pages start in `Initial` state and can be
/// finished one by one.
pub struct StubDocument {
    pub force_rendering_calls: usize,
    /// 1-based, like the real viewer's current page.
    pub current_page: usize,
    pages: Vec<StubPage>,
}

impl StubDocument {
    pub fn with_pages(count: usize) -> Self {
        Self {
            force_rendering_calls: 0,
            current_page: 1,
            pages: (1..=count).map(StubPage::new).collect(),
        }
    }

    /// Mark a page (0-based index) as rendered, with a placeholder image.
    pub fn finish_page(&mut self, page_index: usize) {
        if let Some(page) = self.pages.get_mut(page_index) {
            page.state = RenderingState::Finished;
            page.image = Some(PageImage {
                pixels: vec![0xFF; 4],
                width_px: 2,
                height_px: 2,
            });
        }
    }
}

impl DocumentView for StubDocument {
    fn force_rendering(&mut self) {
        self.force_rendering_calls += 1;
    }

    fn pages_count(&self) -> usize {
        self.pages.len()
    }

    fn current_page_number(&self) -> usize {
        self.current_page
    }

    fn page(&self, page_index: usize) -> Option<&dyn PageHandle> {
        self.pages.get(page_index).map(|page| page as &dyn PageHandle)
    }
}

#[derive(Default)]
pub struct StubThumbSlot {
    /// Page number whose image this slot adopted, if any.
    pub image_page: Option<usize>,
}

impl ThumbnailSlot for StubThumbSlot {
    fn set_image(&mut self, page: &dyn PageHandle) {
        self.image_page = Some(page.page_number());
    }
}

pub struct StubThumbnails {
    pub force_rendering_calls: usize,
    /// Page numbers passed to `scroll_thumbnail_into_view`, in order.
    pub scrolled_to: Vec<usize>,
    pub slots: Vec<StubThumbSlot>,
}

impl StubThumbnails {
    pub fn with_slots(count: usize) -> Self {
        Self {
            force_rendering_calls: 0,
            scrolled_to: Vec::new(),
            slots: (0..count).map(|_| StubThumbSlot::default()).collect(),
        }
    }
}

impl ThumbnailStrip for StubThumbnails {
    fn force_rendering(&mut self) {
        self.force_rendering_calls += 1;
    }

    fn thumbnail(&mut self, page_index: usize) -> Option<&mut dyn ThumbnailSlot> {
        self.slots
            .get_mut(page_index)
            .map(|slot| slot as &mut dyn ThumbnailSlot)
    }

    fn scroll_thumbnail_into_view(&mut self, page_number: usize) {
        self.scrolled_to.push(page_number);
    }
}

#[derive(Default)]
pub struct StubOutline {
    pub toggle_calls: usize,
}

impl OutlineNav for StubOutline {
    fn toggle_outline_tree(&mut self) {
        self.toggle_calls += 1;
    }
}

#[derive(Default)]
pub struct StubQueue {
    pub thumbnail_view_enabled: bool,
    pub render_calls: usize,
}

impl RenderQueue for StubQueue {
    fn set_thumbnail_view_enabled(&mut self, enabled: bool) {
        self.thumbnail_view_enabled = enabled;
    }

    fn render_highest_priority(&mut self) {
        self.render_calls += 1;
    }
}

/// Collects every event of one kind dispatched on a bus.
pub struct EventLog {
    events: Rc<RefCell<Vec<ViewerEvent>>>,
}

impl EventLog {
    pub fn attach(bus: &EventBus, kind: EventKind) -> Self {
        let events: Rc<RefCell<Vec<ViewerEvent>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        bus.on(kind, move |event| {
            sink.borrow_mut().push(event.clone());
        });
        Self { events }
    }

    pub fn events(&self) -> Vec<ViewerEvent> {
        self.events.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }

    /// Payloads of the recorded `SidebarViewChanged` events.
    pub fn views(&self) -> Vec<SidebarView> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                ViewerEvent::SidebarViewChanged { view } => Some(*view),
                _ => None,
            })
            .collect()
    }
}
