//! Sidebar view-selection state machine
//!
//! Owns the open/closed flag and the active-panel selection, translates
//! view-switch requests into class toggles on the panel and button
//! elements, and notifies the rest of the session through the event
//! bus. Rendering itself is deferred to the injected collaborators.

use std::cell::RefCell;
use std::rc::Rc;

use log::error;

use crate::events::{EventBus, EventKind, ListenerId, ViewerEvent};
use crate::rendering::{DocumentView, OutlineNav, RenderingState, ThumbnailStrip};
use crate::visual::VisualElement;

/// Class carried by a panel container while it is not the visible one.
pub const CLASS_HIDDEN: &str = "hidden";
/// Class carried by the selector button of the active panel.
pub const CLASS_ACTIVE: &str = "active";
/// Class carried by a selector button whose panel has no content.
pub const CLASS_DISABLED: &str = "disabled";

/// Probe class used once at construction to detect aliased wiring.
const WIRING_PROBE: &str = "folio-wiring-probe";

/// The sidebar views a session can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidebarView {
    None,
    Thumbnails,
    Outline,
    Attachments,
}

impl SidebarView {
    /// Decode a persisted or wire value. Returns `None` for anything
    /// outside the known range, so callers can refuse it explicitly.
    #[must_use]
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::None),
            1 => Some(Self::Thumbnails),
            2 => Some(Self::Outline),
            3 => Some(Self::Attachments),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_raw(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Thumbnails => 1,
            Self::Outline => 2,
            Self::Attachments => 3,
        }
    }
}

/// Wiring errors detected at construction. A half-wired sidebar must
/// not start mutating visuals, so these fail fast.
#[derive(Debug, thiserror::Error)]
pub enum SidebarError {
    #[error("sidebar wiring: `{0}` aliases another panel or button element")]
    AliasedElements(&'static str),
}

/// Construction dependencies of [`Sidebar`].
pub struct SidebarOptions<E: VisualElement> {
    /// The full-page document viewer.
    pub document_view: Rc<RefCell<dyn DocumentView>>,
    /// The thumbnail strip viewer.
    pub thumbnails: Rc<RefCell<dyn ThumbnailStrip>>,
    /// The outline viewer.
    pub outline: Rc<RefCell<dyn OutlineNav>>,
    /// The session event bus.
    pub event_bus: EventBus,

    pub thumbnail_button: E,
    pub outline_button: E,
    pub attachments_button: E,

    pub thumbnail_view: E,
    pub outline_view: E,
    pub attachments_view: E,

    /// Disable the content notification for documents carrying an
    /// outline or attachments. Stored configuration; the notification
    /// surface itself belongs to the host.
    pub disable_notification: bool,
}

/// The sidebar controller. One instance per document-viewing session.
pub struct Sidebar<E: VisualElement> {
    is_open: bool,
    active: SidebarView,
    is_initial_view_set: bool,
    disable_notification: bool,

    /// Invoked on every open/close/switch in place of the default
    /// render-forcing fallback, receiving whether the thumbnail view is
    /// now visible. Lets the host re-evaluate its render-priority
    /// policy.
    on_toggled: Option<Box<dyn FnMut(bool)>>,

    document_view: Rc<RefCell<dyn DocumentView>>,
    thumbnails: Rc<RefCell<dyn ThumbnailStrip>>,
    outline: Rc<RefCell<dyn OutlineNav>>,
    event_bus: EventBus,

    thumbnail_button: E,
    outline_button: E,
    attachments_button: E,

    thumbnail_view: E,
    outline_view: E,
    attachments_view: E,

    listener_ids: Vec<ListenerId>,
}

impl<E: VisualElement + 'static> Sidebar<E> {
    /// Build the controller, normalize the closed baseline (all panels
    /// hidden, thumbnails selected), and subscribe to the lifecycle
    /// events it reacts to.
    pub fn new(mut options: SidebarOptions<E>) -> Result<Rc<RefCell<Self>>, SidebarError> {
        Self::check_wiring(&mut options)?;

        let SidebarOptions {
            document_view,
            thumbnails,
            outline,
            event_bus,
            mut thumbnail_button,
            mut outline_button,
            mut attachments_button,
            mut thumbnail_view,
            mut outline_view,
            mut attachments_view,
            disable_notification,
        } = options;

        thumbnail_button.add_class(CLASS_ACTIVE);
        outline_button.remove_class(CLASS_ACTIVE);
        attachments_button.remove_class(CLASS_ACTIVE);

        thumbnail_view.add_class(CLASS_HIDDEN);
        outline_view.add_class(CLASS_HIDDEN);
        attachments_view.add_class(CLASS_HIDDEN);

        let sidebar = Rc::new(RefCell::new(Self {
            is_open: false,
            active: SidebarView::Thumbnails,
            is_initial_view_set: false,
            disable_notification,
            on_toggled: None,
            document_view,
            thumbnails,
            outline,
            event_bus,
            thumbnail_button,
            outline_button,
            attachments_button,
            thumbnail_view,
            outline_view,
            attachments_view,
            listener_ids: Vec::new(),
        }));
        Self::attach_listeners(&sidebar);
        Ok(sidebar)
    }

    /// Detect the same element handle wired into two slots. The probe
    /// goes through the capability interface only, so it works for any
    /// element type, and is removed again before returning.
    fn check_wiring(options: &mut SidebarOptions<E>) -> Result<(), SidebarError> {
        let mut elements: [(&'static str, &mut E); 6] = [
            ("thumbnail_button", &mut options.thumbnail_button),
            ("outline_button", &mut options.outline_button),
            ("attachments_button", &mut options.attachments_button),
            ("thumbnail_view", &mut options.thumbnail_view),
            ("outline_view", &mut options.outline_view),
            ("attachments_view", &mut options.attachments_view),
        ];

        let mut aliased = None;
        for (name, element) in elements.iter_mut() {
            if element.has_class(WIRING_PROBE) {
                aliased = Some(*name);
                break;
            }
            element.add_class(WIRING_PROBE);
        }
        for (_, element) in elements.iter_mut() {
            element.remove_class(WIRING_PROBE);
        }

        match aliased {
            Some(name) => Err(SidebarError::AliasedElements(name)),
            None => Ok(()),
        }
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.is_open
    }

    /// The selected panel, independent of whether the sidebar is open.
    #[must_use]
    pub fn active_view(&self) -> SidebarView {
        self.active
    }

    /// The panel the user can actually see right now.
    #[must_use]
    pub fn visible_view(&self) -> SidebarView {
        if self.is_open {
            self.active
        } else {
            SidebarView::None
        }
    }

    #[must_use]
    pub fn is_thumbnail_view_visible(&self) -> bool {
        self.is_open && self.active == SidebarView::Thumbnails
    }

    #[must_use]
    pub fn is_outline_view_visible(&self) -> bool {
        self.is_open && self.active == SidebarView::Outline
    }

    #[must_use]
    pub fn is_attachments_view_visible(&self) -> bool {
        self.is_open && self.active == SidebarView::Attachments
    }

    #[must_use]
    pub fn is_initial_view_set(&self) -> bool {
        self.is_initial_view_set
    }

    #[must_use]
    pub fn disable_notification(&self) -> bool {
        self.disable_notification
    }

    pub fn set_on_toggled(&mut self, callback: impl FnMut(bool) + 'static) {
        self.on_toggled = Some(Box::new(callback));
    }

    pub fn clear_on_toggled(&mut self) {
        self.on_toggled = None;
    }

    /// Apply the view a document requests on load. Only the first call
    /// per session does anything; it emits exactly one
    /// `sidebarviewchanged` notification.
    pub fn set_initial_view(&mut self, view: SidebarView) {
        if self.is_initial_view_set {
            return;
        }
        self.is_initial_view_set = true;

        if self.is_open && view == SidebarView::None {
            self.dispatch_view_changed();
            // The user already opened the sidebar by hand; closing it
            // out from under them on load would be poor UX.
            return;
        }
        let is_view_preserved = view == self.visible_view();
        self.switch_view(view, true);

        if is_view_preserved {
            // switch_view only notifies on an actual change; keep the
            // one-notification guarantee for the no-op case.
            self.dispatch_view_changed();
        }
    }

    /// [`set_initial_view`](Self::set_initial_view) over a persisted
    /// raw value. Unrecognized values are logged and refused.
    pub fn set_initial_view_raw(&mut self, raw: u32) {
        match SidebarView::from_raw(raw) {
            Some(view) => self.set_initial_view(view),
            None => error!("set_initial_view: {raw} is an unsupported sidebar view value"),
        }
    }

    /// Make `view` the selected panel. With `force_open`, also open a
    /// closed sidebar. `SidebarView::None` is equivalent to
    /// [`close`](Self::close).
    pub fn switch_view(&mut self, view: SidebarView, force_open: bool) {
        if view == SidebarView::None {
            self.close();
            return;
        }
        let is_view_changed = view != self.active;
        let mut should_force_rendering = false;

        self.mark_active_button(view);
        self.show_only_panel(view);

        if view == SidebarView::Thumbnails && self.is_open && is_view_changed {
            self.update_thumbnail_viewer();
            should_force_rendering = true;
        }
        // The visuals were updated for a validated view above; only now
        // record it, so `active` can never point at a refused value.
        self.active = view;

        if force_open && !self.is_open {
            self.open();
            // Opening triggers rendering and dispatches the event.
            return;
        }
        if should_force_rendering {
            self.force_rendering();
        }
        if is_view_changed {
            self.dispatch_view_changed();
        }
    }

    /// [`switch_view`](Self::switch_view) over a raw value.
    /// Unrecognized values are logged and refused; state and visuals
    /// are left untouched.
    pub fn switch_view_raw(&mut self, raw: u32, force_open: bool) {
        match SidebarView::from_raw(raw) {
            Some(view) => self.switch_view(view, force_open),
            None => error!("switch_view: {raw} is an unsupported sidebar view value"),
        }
    }

    pub fn open(&mut self) {
        if self.is_open {
            return;
        }
        self.is_open = true;
        self.set_panel_hidden(self.active, false);

        if self.active == SidebarView::Thumbnails {
            self.update_thumbnail_viewer();
        }
        self.force_rendering();
        self.dispatch_view_changed();
    }

    pub fn close(&mut self) {
        if !self.is_open {
            return;
        }
        self.is_open = false;
        self.set_panel_hidden(self.active, true);

        self.force_rendering();
        self.dispatch_view_changed();
    }

    pub fn toggle(&mut self) {
        if self.is_open {
            self.close();
        } else {
            self.open();
        }
    }

    /// Prepare for a new document: re-arm the initial-view latch,
    /// restore the thumbnails selection, and re-enable the buttons a
    /// previous document may have disabled.
    pub fn reset(&mut self) {
        self.is_initial_view_set = false;
        self.switch_view(SidebarView::Thumbnails, false);

        self.outline_button.remove_class(CLASS_DISABLED);
        self.attachments_button.remove_class(CLASS_DISABLED);
    }

    pub fn handle_thumbnail_click(&mut self) {
        self.switch_view(SidebarView::Thumbnails, false);
    }

    pub fn handle_outline_click(&mut self) {
        if self.outline_button.has_class(CLASS_DISABLED) {
            return;
        }
        self.switch_view(SidebarView::Outline, false);
    }

    pub fn handle_outline_double_click(&mut self) {
        if self.outline_button.has_class(CLASS_DISABLED) {
            return;
        }
        self.outline.borrow_mut().toggle_outline_tree();
    }

    pub fn handle_attachments_click(&mut self) {
        if self.attachments_button.has_class(CLASS_DISABLED) {
            return;
        }
        self.switch_view(SidebarView::Attachments, false);
    }

    /// Drop the bus subscriptions. Safe to call more than once; the
    /// controller stops reacting to lifecycle events afterwards.
    pub fn detach(&mut self) {
        for id in self.listener_ids.drain(..) {
            self.event_bus.off(id);
        }
    }

    fn handle_outline_loaded(&mut self, outline_count: usize) {
        if outline_count > 0 || self.outline_button.has_class(CLASS_DISABLED) {
            return;
        }
        self.outline_button.add_class(CLASS_DISABLED);

        if self.active == SidebarView::Outline {
            // The selected panel just turned out to be empty.
            self.switch_view(SidebarView::Thumbnails, false);
        }
    }

    fn handle_attachments_loaded(&mut self, attachments_count: usize) {
        if attachments_count > 0 || self.attachments_button.has_class(CLASS_DISABLED) {
            return;
        }
        self.attachments_button.add_class(CLASS_DISABLED);

        if self.active == SidebarView::Attachments {
            self.switch_view(SidebarView::Thumbnails, false);
        }
    }

    fn handle_presentation_mode_changed(&mut self, active: bool, switch_in_progress: bool) {
        if !active && !switch_in_progress && self.is_thumbnail_view_visible() {
            self.update_thumbnail_viewer();
        }
    }

    fn mark_active_button(&mut self, view: SidebarView) {
        match view {
            SidebarView::Thumbnails => {
                self.thumbnail_button.add_class(CLASS_ACTIVE);
                self.outline_button.remove_class(CLASS_ACTIVE);
                self.attachments_button.remove_class(CLASS_ACTIVE);
            }
            SidebarView::Outline => {
                self.thumbnail_button.remove_class(CLASS_ACTIVE);
                self.outline_button.add_class(CLASS_ACTIVE);
                self.attachments_button.remove_class(CLASS_ACTIVE);
            }
            SidebarView::Attachments => {
                self.thumbnail_button.remove_class(CLASS_ACTIVE);
                self.outline_button.remove_class(CLASS_ACTIVE);
                self.attachments_button.add_class(CLASS_ACTIVE);
            }
            SidebarView::None => {}
        }
    }

    /// Panel visibility is a pure function of `(is_open, selection)`:
    /// the selected panel is unhidden only while the sidebar is open.
    fn show_only_panel(&mut self, view: SidebarView) {
        let is_open = self.is_open;
        self.set_panel_hidden(SidebarView::Thumbnails, view != SidebarView::Thumbnails || !is_open);
        self.set_panel_hidden(SidebarView::Outline, view != SidebarView::Outline || !is_open);
        self.set_panel_hidden(
            SidebarView::Attachments,
            view != SidebarView::Attachments || !is_open,
        );
    }

    fn set_panel_hidden(&mut self, view: SidebarView, hidden: bool) {
        let panel = match view {
            SidebarView::Thumbnails => &mut self.thumbnail_view,
            SidebarView::Outline => &mut self.outline_view,
            SidebarView::Attachments => &mut self.attachments_view,
            SidebarView::None => return,
        };
        if hidden {
            panel.add_class(CLASS_HIDDEN);
        } else {
            panel.remove_class(CLASS_HIDDEN);
        }
    }

    fn dispatch_view_changed(&self) {
        self.event_bus.dispatch(&ViewerEvent::SidebarViewChanged {
            view: self.visible_view(),
        });
    }

    fn force_rendering(&mut self) {
        let thumbnails_visible = self.is_thumbnail_view_visible();
        if let Some(on_toggled) = self.on_toggled.as_mut() {
            on_toggled(thumbnails_visible);
        } else {
            self.document_view.borrow_mut().force_rendering();
            self.thumbnails.borrow_mut().force_rendering();
        }
    }

    /// Push every finished page's rendered output into its thumbnail
    /// slot, then scroll the strip to the current page.
    fn update_thumbnail_viewer(&mut self) {
        let document_view = self.document_view.borrow();
        let mut thumbnails = self.thumbnails.borrow_mut();

        for page_index in 0..document_view.pages_count() {
            let Some(page) = document_view.page(page_index) else {
                continue;
            };
            if page.rendering_state() == RenderingState::Finished {
                if let Some(slot) = thumbnails.thumbnail(page_index) {
                    slot.set_image(page);
                }
            }
        }
        thumbnails.scroll_thumbnail_into_view(document_view.current_page_number());
    }

    fn attach_listeners(this: &Rc<RefCell<Self>>) {
        let bus = this.borrow().event_bus.clone();
        let mut ids = Vec::with_capacity(3);

        let sidebar = Rc::downgrade(this);
        ids.push(bus.on(EventKind::OutlineLoaded, move |event| {
            let ViewerEvent::OutlineLoaded { outline_count } = event else {
                return;
            };
            if let Some(sidebar) = sidebar.upgrade() {
                sidebar.borrow_mut().handle_outline_loaded(*outline_count);
            }
        }));

        let sidebar = Rc::downgrade(this);
        ids.push(bus.on(EventKind::AttachmentsLoaded, move |event| {
            let ViewerEvent::AttachmentsLoaded { attachments_count } = event else {
                return;
            };
            if let Some(sidebar) = sidebar.upgrade() {
                sidebar
                    .borrow_mut()
                    .handle_attachments_loaded(*attachments_count);
            }
        }));

        let sidebar = Rc::downgrade(this);
        ids.push(bus.on(EventKind::PresentationModeChanged, move |event| {
            let ViewerEvent::PresentationModeChanged {
                active,
                switch_in_progress,
            } = event
            else {
                return;
            };
            if let Some(sidebar) = sidebar.upgrade() {
                sidebar
                    .borrow_mut()
                    .handle_presentation_mode_changed(*active, *switch_in_progress);
            }
        }));

        this.borrow_mut().listener_ids = ids;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{shared, EventLog, StubDocument, StubOutline, StubThumbnails};
    use crate::visual::{shared_element, SharedElement};

    struct Fixture {
        bus: EventBus,
        document: Rc<RefCell<StubDocument>>,
        thumbnails: Rc<RefCell<StubThumbnails>>,
        outline: Rc<RefCell<StubOutline>>,
        thumbnail_button: SharedElement,
        outline_button: SharedElement,
        attachments_button: SharedElement,
        thumbnail_view: SharedElement,
        outline_view: SharedElement,
        attachments_view: SharedElement,
        log: EventLog,
        sidebar: Rc<RefCell<Sidebar<SharedElement>>>,
    }

    fn fixture() -> Fixture {
        fixture_with_pages(3)
    }

    fn fixture_with_pages(pages: usize) -> Fixture {
        let bus = EventBus::new();
        let document = shared(StubDocument::with_pages(pages));
        let thumbnails = shared(StubThumbnails::with_slots(pages));
        let outline = shared(StubOutline::default());

        let thumbnail_button = shared_element();
        let outline_button = shared_element();
        let attachments_button = shared_element();
        let thumbnail_view = shared_element();
        let outline_view = shared_element();
        let attachments_view = shared_element();

        let sidebar = Sidebar::new(SidebarOptions {
            document_view: document.clone(),
            thumbnails: thumbnails.clone(),
            outline: outline.clone(),
            event_bus: bus.clone(),
            thumbnail_button: thumbnail_button.clone(),
            outline_button: outline_button.clone(),
            attachments_button: attachments_button.clone(),
            thumbnail_view: thumbnail_view.clone(),
            outline_view: outline_view.clone(),
            attachments_view: attachments_view.clone(),
            disable_notification: false,
        })
        .expect("fixture wiring is alias-free");

        let log = EventLog::attach(&bus, EventKind::SidebarViewChanged);

        Fixture {
            bus,
            document,
            thumbnails,
            outline,
            thumbnail_button,
            outline_button,
            attachments_button,
            thumbnail_view,
            outline_view,
            attachments_view,
            log,
            sidebar,
        }
    }

    fn assert_selection(fx: &Fixture, view: SidebarView, open: bool) {
        let hidden = |element: &SharedElement| element.borrow().has_class(CLASS_HIDDEN);
        let active = |element: &SharedElement| element.borrow().has_class(CLASS_ACTIVE);

        assert_eq!(
            hidden(&fx.thumbnail_view),
            !(open && view == SidebarView::Thumbnails)
        );
        assert_eq!(
            hidden(&fx.outline_view),
            !(open && view == SidebarView::Outline)
        );
        assert_eq!(
            hidden(&fx.attachments_view),
            !(open && view == SidebarView::Attachments)
        );

        assert_eq!(active(&fx.thumbnail_button), view == SidebarView::Thumbnails);
        assert_eq!(active(&fx.outline_button), view == SidebarView::Outline);
        assert_eq!(
            active(&fx.attachments_button),
            view == SidebarView::Attachments
        );
    }

    #[test]
    fn starts_closed_with_thumbnails_selected() {
        let fx = fixture();
        let sidebar = fx.sidebar.borrow();

        assert!(!sidebar.is_open());
        assert_eq!(sidebar.active_view(), SidebarView::Thumbnails);
        assert_eq!(sidebar.visible_view(), SidebarView::None);
        assert!(!sidebar.is_initial_view_set());
        drop(sidebar);

        assert_selection(&fx, SidebarView::Thumbnails, false);
        assert_eq!(fx.log.len(), 0);
    }

    #[test]
    fn open_shows_active_panel_and_notifies_once() {
        let fx = fixture();
        fx.sidebar.borrow_mut().open();

        assert!(fx.sidebar.borrow().is_open());
        assert_eq!(fx.sidebar.borrow().visible_view(), SidebarView::Thumbnails);
        assert_selection(&fx, SidebarView::Thumbnails, true);
        assert_eq!(fx.log.views(), vec![SidebarView::Thumbnails]);

        // Opening onto thumbnails refreshes the strip and scrolls it.
        assert_eq!(fx.thumbnails.borrow().scrolled_to, vec![1]);

        fx.sidebar.borrow_mut().open();
        assert_eq!(fx.log.len(), 1);
    }

    #[test]
    fn close_hides_panels_and_is_idempotent() {
        let fx = fixture();
        fx.sidebar.borrow_mut().close();
        assert_eq!(fx.log.len(), 0);

        fx.sidebar.borrow_mut().open();
        fx.sidebar.borrow_mut().close();

        assert!(!fx.sidebar.borrow().is_open());
        assert_selection(&fx, SidebarView::Thumbnails, false);
        assert_eq!(
            fx.log.views(),
            vec![SidebarView::Thumbnails, SidebarView::None]
        );
    }

    #[test]
    fn toggle_twice_returns_to_start() {
        let fx = fixture();
        fx.sidebar.borrow_mut().toggle();
        fx.sidebar.borrow_mut().toggle();

        assert!(!fx.sidebar.borrow().is_open());
        assert_eq!(fx.log.len(), 2);
    }

    #[test]
    fn switch_shows_exactly_one_panel_after_each_call() {
        let fx = fixture();
        fx.sidebar.borrow_mut().open();

        let sequence = [
            SidebarView::Outline,
            SidebarView::Attachments,
            SidebarView::Attachments,
            SidebarView::Thumbnails,
            SidebarView::Outline,
        ];
        for view in sequence {
            fx.sidebar.borrow_mut().switch_view(view, false);
            assert_eq!(fx.sidebar.borrow().active_view(), view);
            assert_selection(&fx, view, true);
        }
    }

    #[test]
    fn switch_to_same_view_emits_nothing() {
        let fx = fixture();
        fx.sidebar.borrow_mut().open();
        fx.log.clear();

        fx.sidebar
            .borrow_mut()
            .switch_view(SidebarView::Thumbnails, false);
        assert_eq!(fx.log.len(), 0);
    }

    #[test]
    fn switch_view_none_is_close() {
        let fx = fixture();
        fx.sidebar.borrow_mut().open();
        fx.sidebar.borrow_mut().switch_view(SidebarView::None, false);

        assert!(!fx.sidebar.borrow().is_open());
        // Selection survives the close for the next open.
        assert_eq!(fx.sidebar.borrow().active_view(), SidebarView::Thumbnails);
        assert_eq!(
            fx.log.views(),
            vec![SidebarView::Thumbnails, SidebarView::None]
        );
    }

    #[test]
    fn switch_while_closed_changes_selection_without_opening() {
        let fx = fixture();
        fx.sidebar.borrow_mut().switch_view(SidebarView::Outline, false);

        let sidebar = fx.sidebar.borrow();
        assert!(!sidebar.is_open());
        assert_eq!(sidebar.active_view(), SidebarView::Outline);
        drop(sidebar);

        assert_selection(&fx, SidebarView::Outline, false);
        // The visible view did not change, but the selection did.
        assert_eq!(fx.log.views(), vec![SidebarView::None]);
    }

    #[test]
    fn force_open_opens_and_notifies_once() {
        let fx = fixture();
        fx.sidebar.borrow_mut().switch_view(SidebarView::Outline, true);

        assert!(fx.sidebar.borrow().is_open());
        assert_eq!(fx.sidebar.borrow().visible_view(), SidebarView::Outline);
        assert_eq!(fx.log.views(), vec![SidebarView::Outline]);
    }

    #[test]
    fn switching_into_thumbnails_while_open_refreshes_strip() {
        let fx = fixture();
        fx.document.borrow_mut().finish_page(0);
        fx.document.borrow_mut().finish_page(2);

        fx.sidebar.borrow_mut().switch_view(SidebarView::Outline, true);
        fx.sidebar
            .borrow_mut()
            .switch_view(SidebarView::Thumbnails, false);

        let thumbnails = fx.thumbnails.borrow();
        assert_eq!(thumbnails.slots[0].image_page, Some(1));
        assert_eq!(thumbnails.slots[1].image_page, None);
        assert_eq!(thumbnails.slots[2].image_page, Some(3));
    }

    #[test]
    fn switching_away_from_thumbnails_does_not_refresh() {
        let fx = fixture();
        fx.sidebar.borrow_mut().open();
        let scrolls = fx.thumbnails.borrow().scrolled_to.len();

        fx.sidebar.borrow_mut().switch_view(SidebarView::Outline, false);
        assert_eq!(fx.thumbnails.borrow().scrolled_to.len(), scrolls);
    }

    #[test]
    fn render_forcing_falls_back_to_both_collaborators() {
        let fx = fixture();
        fx.sidebar.borrow_mut().open();

        assert_eq!(fx.document.borrow().force_rendering_calls, 1);
        assert_eq!(fx.thumbnails.borrow().force_rendering_calls, 1);
    }

    #[test]
    fn on_toggled_replaces_render_forcing_fallback() {
        let fx = fixture();
        let toggles: Rc<RefCell<Vec<bool>>> = Rc::new(RefCell::new(Vec::new()));

        let toggles_inner = toggles.clone();
        fx.sidebar.borrow_mut().set_on_toggled(move |thumbnails_visible| {
            toggles_inner.borrow_mut().push(thumbnails_visible);
        });

        fx.sidebar.borrow_mut().open();
        fx.sidebar.borrow_mut().switch_view(SidebarView::Outline, false);
        fx.sidebar.borrow_mut().close();

        assert_eq!(fx.document.borrow().force_rendering_calls, 0);
        assert_eq!(fx.thumbnails.borrow().force_rendering_calls, 0);
        // open (thumbnails visible), close (nothing visible); the
        // outline switch forces no render pass.
        assert_eq!(*toggles.borrow(), vec![true, false]);
    }

    #[test]
    fn invalid_raw_value_is_refused_without_mutation() {
        let fx = fixture();
        fx.sidebar.borrow_mut().open();
        fx.log.clear();

        let attrs_before = [
            fx.thumbnail_button.borrow().class_attr(),
            fx.outline_button.borrow().class_attr(),
            fx.attachments_button.borrow().class_attr(),
            fx.thumbnail_view.borrow().class_attr(),
            fx.outline_view.borrow().class_attr(),
            fx.attachments_view.borrow().class_attr(),
        ];

        fx.sidebar.borrow_mut().switch_view_raw(99, false);

        let sidebar = fx.sidebar.borrow();
        assert!(sidebar.is_open());
        assert_eq!(sidebar.active_view(), SidebarView::Thumbnails);
        drop(sidebar);

        let attrs_after = [
            fx.thumbnail_button.borrow().class_attr(),
            fx.outline_button.borrow().class_attr(),
            fx.attachments_button.borrow().class_attr(),
            fx.thumbnail_view.borrow().class_attr(),
            fx.outline_view.borrow().class_attr(),
            fx.attachments_view.borrow().class_attr(),
        ];
        assert_eq!(attrs_before, attrs_after);
        assert_eq!(fx.log.len(), 0);
    }

    #[test]
    fn valid_raw_value_switches() {
        let fx = fixture();
        fx.sidebar.borrow_mut().switch_view_raw(2, true);
        assert_eq!(fx.sidebar.borrow().visible_view(), SidebarView::Outline);
    }

    #[test]
    fn set_initial_view_opens_and_notifies_exactly_once() {
        let fx = fixture();
        fx.sidebar.borrow_mut().set_initial_view(SidebarView::Outline);

        let sidebar = fx.sidebar.borrow();
        assert!(sidebar.is_open());
        assert_eq!(sidebar.active_view(), SidebarView::Outline);
        assert!(sidebar.is_initial_view_set());
        drop(sidebar);
        assert_eq!(fx.log.views(), vec![SidebarView::Outline]);

        // Every later call is a total no-op.
        fx.sidebar
            .borrow_mut()
            .set_initial_view(SidebarView::Thumbnails);
        assert_eq!(fx.sidebar.borrow().active_view(), SidebarView::Outline);
        assert_eq!(fx.log.len(), 1);
    }

    #[test]
    fn set_initial_view_notifies_even_when_view_is_preserved() {
        let fx = fixture();
        fx.sidebar.borrow_mut().open();
        fx.log.clear();

        fx.sidebar
            .borrow_mut()
            .set_initial_view(SidebarView::Thumbnails);
        assert_eq!(fx.log.views(), vec![SidebarView::Thumbnails]);
    }

    #[test]
    fn set_initial_view_none_leaves_open_sidebar_open() {
        let fx = fixture();
        fx.sidebar.borrow_mut().open();
        fx.log.clear();

        fx.sidebar.borrow_mut().set_initial_view(SidebarView::None);

        assert!(fx.sidebar.borrow().is_open());
        assert_eq!(fx.log.views(), vec![SidebarView::Thumbnails]);
    }

    #[test]
    fn set_initial_view_none_while_closed_notifies_once() {
        let fx = fixture();
        fx.sidebar.borrow_mut().set_initial_view(SidebarView::None);

        assert!(!fx.sidebar.borrow().is_open());
        assert_eq!(fx.log.views(), vec![SidebarView::None]);
    }

    #[test]
    fn empty_outline_disables_button_and_leaves_unrelated_view_alone() {
        let fx = fixture();
        fx.sidebar.borrow_mut().open();

        fx.bus.dispatch(&ViewerEvent::OutlineLoaded { outline_count: 0 });

        assert!(fx.outline_button.borrow().has_class(CLASS_DISABLED));
        assert_eq!(fx.sidebar.borrow().active_view(), SidebarView::Thumbnails);
    }

    #[test]
    fn empty_outline_while_outline_active_falls_back_to_thumbnails() {
        let fx = fixture();
        fx.sidebar.borrow_mut().switch_view(SidebarView::Outline, true);

        fx.bus.dispatch(&ViewerEvent::OutlineLoaded { outline_count: 0 });

        let sidebar = fx.sidebar.borrow();
        assert!(sidebar.is_open());
        assert_eq!(sidebar.active_view(), SidebarView::Thumbnails);
        drop(sidebar);
        assert!(fx.outline_button.borrow().has_class(CLASS_DISABLED));
        assert_selection(&fx, SidebarView::Thumbnails, true);
    }

    #[test]
    fn non_empty_outline_keeps_button_enabled() {
        let fx = fixture();
        fx.bus.dispatch(&ViewerEvent::OutlineLoaded { outline_count: 7 });
        assert!(!fx.outline_button.borrow().has_class(CLASS_DISABLED));
    }

    #[test]
    fn empty_attachments_while_active_falls_back_to_thumbnails() {
        let fx = fixture();
        fx.sidebar
            .borrow_mut()
            .switch_view(SidebarView::Attachments, true);

        fx.bus.dispatch(&ViewerEvent::AttachmentsLoaded {
            attachments_count: 0,
        });

        assert!(fx.attachments_button.borrow().has_class(CLASS_DISABLED));
        assert_eq!(fx.sidebar.borrow().active_view(), SidebarView::Thumbnails);
    }

    #[test]
    fn clicks_on_disabled_buttons_are_ignored() {
        let fx = fixture();
        fx.sidebar.borrow_mut().open();
        fx.bus.dispatch(&ViewerEvent::OutlineLoaded { outline_count: 0 });
        fx.bus.dispatch(&ViewerEvent::AttachmentsLoaded {
            attachments_count: 0,
        });
        fx.log.clear();

        fx.sidebar.borrow_mut().handle_outline_click();
        fx.sidebar.borrow_mut().handle_attachments_click();
        fx.sidebar.borrow_mut().handle_outline_double_click();

        assert_eq!(fx.sidebar.borrow().active_view(), SidebarView::Thumbnails);
        assert_eq!(fx.log.len(), 0);
        assert_eq!(fx.outline.borrow().toggle_calls, 0);
    }

    #[test]
    fn outline_double_click_toggles_tree_when_enabled() {
        let fx = fixture();
        fx.sidebar.borrow_mut().handle_outline_double_click();
        assert_eq!(fx.outline.borrow().toggle_calls, 1);
    }

    #[test]
    fn reset_rearms_latch_and_reenables_buttons() {
        let fx = fixture();
        fx.sidebar.borrow_mut().set_initial_view(SidebarView::Outline);
        fx.bus.dispatch(&ViewerEvent::OutlineLoaded { outline_count: 0 });
        fx.bus.dispatch(&ViewerEvent::AttachmentsLoaded {
            attachments_count: 0,
        });

        fx.sidebar.borrow_mut().reset();

        let sidebar = fx.sidebar.borrow();
        assert!(sidebar.is_open());
        assert_eq!(sidebar.active_view(), SidebarView::Thumbnails);
        assert!(!sidebar.is_initial_view_set());
        drop(sidebar);
        assert!(!fx.outline_button.borrow().has_class(CLASS_DISABLED));
        assert!(!fx.attachments_button.borrow().has_class(CLASS_DISABLED));
        assert_selection(&fx, SidebarView::Thumbnails, true);
    }

    #[test]
    fn presentation_mode_exit_refreshes_visible_thumbnails() {
        let fx = fixture();
        fx.sidebar.borrow_mut().open();
        let scrolls = fx.thumbnails.borrow().scrolled_to.len();

        fx.bus.dispatch(&ViewerEvent::PresentationModeChanged {
            active: false,
            switch_in_progress: false,
        });
        assert_eq!(fx.thumbnails.borrow().scrolled_to.len(), scrolls + 1);

        // Entering presentation mode, or a switch in progress, does not.
        fx.bus.dispatch(&ViewerEvent::PresentationModeChanged {
            active: true,
            switch_in_progress: false,
        });
        fx.bus.dispatch(&ViewerEvent::PresentationModeChanged {
            active: false,
            switch_in_progress: true,
        });
        assert_eq!(fx.thumbnails.borrow().scrolled_to.len(), scrolls + 1);
    }

    #[test]
    fn presentation_mode_exit_ignored_when_thumbnails_not_visible() {
        let fx = fixture();
        fx.sidebar.borrow_mut().switch_view(SidebarView::Outline, true);
        let scrolls = fx.thumbnails.borrow().scrolled_to.len();

        fx.bus.dispatch(&ViewerEvent::PresentationModeChanged {
            active: false,
            switch_in_progress: false,
        });
        assert_eq!(fx.thumbnails.borrow().scrolled_to.len(), scrolls);
    }

    #[test]
    fn aliased_wiring_is_rejected_and_probe_cleaned_up() {
        let bus = EventBus::new();
        let document = shared(StubDocument::with_pages(1));
        let thumbnails = shared(StubThumbnails::with_slots(1));
        let outline = shared(StubOutline::default());

        let shared_panel = shared_element();
        let result = Sidebar::new(SidebarOptions {
            document_view: document,
            thumbnails,
            outline,
            event_bus: bus,
            thumbnail_button: shared_element(),
            outline_button: shared_element(),
            attachments_button: shared_element(),
            thumbnail_view: shared_panel.clone(),
            outline_view: shared_panel.clone(),
            attachments_view: shared_element(),
            disable_notification: false,
        });

        assert!(matches!(
            result,
            Err(SidebarError::AliasedElements("outline_view"))
        ));
        assert!(shared_panel.borrow().is_empty());
    }

    #[test]
    fn detach_stops_lifecycle_reactions() {
        let fx = fixture();
        assert_eq!(fx.bus.listener_count(), 4); // 3 sidebar + 1 log

        fx.sidebar.borrow_mut().detach();
        fx.sidebar.borrow_mut().detach();
        assert_eq!(fx.bus.listener_count(), 1);

        fx.bus.dispatch(&ViewerEvent::OutlineLoaded { outline_count: 0 });
        assert!(!fx.outline_button.borrow().has_class(CLASS_DISABLED));
    }

    #[test]
    fn dropped_sidebar_leaves_listeners_inert() {
        let fx = fixture();
        drop(fx.sidebar);

        // Weak upgrades fail; dispatch must not panic.
        fx.bus.dispatch(&ViewerEvent::OutlineLoaded { outline_count: 0 });
        fx.bus.dispatch(&ViewerEvent::PresentationModeChanged {
            active: false,
            switch_in_progress: false,
        });
    }
}
