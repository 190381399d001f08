//! Viewer shell: composition host over the rendering engine
//!
//! Wires the lifecycle events of the external engine (`pagerendered`,
//! `pagechanging`) into the thumbnail strip, installs the sidebar's
//! render-priority policy, and drives the per-document open/reset flow.
//! The shell owns its collaborators through boundary traits; it is not
//! a viewer subclass.

use std::cell::RefCell;
use std::rc::Rc;

use log::debug;

use crate::events::{EventBus, EventKind, ListenerId, ViewerEvent};
use crate::rendering::{DocumentView, RenderQueue, ThumbnailStrip};
use crate::services::Preferences;
use crate::sidebar::{Sidebar, SidebarError, SidebarOptions};
use crate::visual::VisualElement;

/// Construction dependencies of [`ViewerShell`].
pub struct ShellOptions<E: VisualElement> {
    pub sidebar: SidebarOptions<E>,
    pub render_queue: Rc<RefCell<dyn RenderQueue>>,
    pub preferences: Preferences,
}

pub struct ViewerShell<E: VisualElement + 'static> {
    event_bus: EventBus,
    sidebar: Rc<RefCell<Sidebar<E>>>,
    document_view: Rc<RefCell<dyn DocumentView>>,
    thumbnails: Rc<RefCell<dyn ThumbnailStrip>>,
    render_queue: Rc<RefCell<dyn RenderQueue>>,
    preferences: Preferences,
    listener_ids: Vec<ListenerId>,
}

impl<E: VisualElement + 'static> ViewerShell<E> {
    pub fn new(options: ShellOptions<E>) -> Result<Self, SidebarError> {
        let ShellOptions {
            sidebar: mut sidebar_options,
            render_queue,
            preferences,
        } = options;
        sidebar_options.disable_notification = preferences.disable_notification();

        let event_bus = sidebar_options.event_bus.clone();
        let document_view = sidebar_options.document_view.clone();
        let thumbnails = sidebar_options.thumbnails.clone();

        let sidebar = Sidebar::new(sidebar_options)?;

        // Render-priority policy: every open/close/switch re-evaluates
        // whether the thumbnail view competes for render slots.
        let queue = render_queue.clone();
        sidebar
            .borrow_mut()
            .set_on_toggled(move |thumbnails_visible| {
                let mut queue = queue.borrow_mut();
                queue.set_thumbnail_view_enabled(thumbnails_visible);
                queue.render_highest_priority();
            });

        let mut shell = Self {
            event_bus,
            sidebar,
            document_view,
            thumbnails,
            render_queue,
            preferences,
            listener_ids: Vec::new(),
        };
        shell.attach_listeners();
        Ok(shell)
    }

    #[must_use]
    pub fn sidebar(&self) -> &Rc<RefCell<Sidebar<E>>> {
        &self.sidebar
    }

    #[must_use]
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    #[must_use]
    pub fn render_queue(&self) -> &Rc<RefCell<dyn RenderQueue>> {
        &self.render_queue
    }

    #[must_use]
    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn preferences_mut(&mut self) -> &mut Preferences {
        &mut self.preferences
    }

    /// Point the shell at a freshly loaded document: restore the
    /// sidebar baseline, apply the initial view from preferences, then
    /// announce outline/attachments availability to the session.
    pub fn open_document(&mut self, outline_count: usize, attachments_count: usize) {
        debug!(
            "opening document: {outline_count} outline entries, {attachments_count} attachments"
        );
        self.sidebar.borrow_mut().reset();

        let initial_view = self.preferences.sidebar_view_on_load();
        self.sidebar.borrow_mut().set_initial_view_raw(initial_view);

        self.event_bus
            .dispatch(&ViewerEvent::OutlineLoaded { outline_count });
        self.event_bus.dispatch(&ViewerEvent::AttachmentsLoaded {
            attachments_count,
        });
    }

    /// Drop every bus subscription owned by the shell and its sidebar.
    pub fn detach(&mut self) {
        for id in self.listener_ids.drain(..) {
            self.event_bus.off(id);
        }
        self.sidebar.borrow_mut().detach();
    }

    fn attach_listeners(&mut self) {
        // Use the rendered page to set the corresponding thumbnail
        // image, whether or not the thumbnail view is visible.
        let document_view = self.document_view.clone();
        let thumbnails = self.thumbnails.clone();
        self.listener_ids
            .push(self.event_bus.on(EventKind::PageRendered, move |event| {
                let ViewerEvent::PageRendered { page_number } = event else {
                    return;
                };
                let page_index = page_number.saturating_sub(1);
                let document_view = document_view.borrow();
                // The document may already be gone when the event lands.
                let Some(page) = document_view.page(page_index) else {
                    return;
                };
                let mut thumbnails = thumbnails.borrow_mut();
                if let Some(slot) = thumbnails.thumbnail(page_index) {
                    slot.set_image(page);
                }
            }));

        // Keep the strip scrolled to the current page while it is the
        // visible panel.
        let sidebar = Rc::downgrade(&self.sidebar);
        let thumbnails = self.thumbnails.clone();
        self.listener_ids
            .push(self.event_bus.on(EventKind::PageChanging, move |event| {
                let ViewerEvent::PageChanging { page_number } = event else {
                    return;
                };
                let Some(sidebar) = sidebar.upgrade() else {
                    return;
                };
                if sidebar.borrow().is_thumbnail_view_visible() {
                    thumbnails
                        .borrow_mut()
                        .scroll_thumbnail_into_view(*page_number);
                }
            }));
    }
}

impl<E: VisualElement + 'static> Drop for ViewerShell<E> {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sidebar::SidebarView;
    use crate::test_utils::{shared, StubDocument, StubOutline, StubQueue, StubThumbnails};
    use crate::visual::{shared_element, SharedElement, VisualElement};

    struct Fixture {
        bus: EventBus,
        document: Rc<RefCell<StubDocument>>,
        thumbnails: Rc<RefCell<StubThumbnails>>,
        queue: Rc<RefCell<StubQueue>>,
        outline_button: SharedElement,
        attachments_button: SharedElement,
        shell: ViewerShell<SharedElement>,
    }

    fn fixture_with_prefs(preferences: Preferences) -> Fixture {
        let bus = EventBus::new();
        let document = shared(StubDocument::with_pages(4));
        let thumbnails = shared(StubThumbnails::with_slots(4));
        let outline = shared(StubOutline::default());
        let queue = shared(StubQueue::default());

        let outline_button = shared_element();
        let attachments_button = shared_element();

        let shell = ViewerShell::new(ShellOptions {
            sidebar: SidebarOptions {
                document_view: document.clone(),
                thumbnails: thumbnails.clone(),
                outline: outline.clone(),
                event_bus: bus.clone(),
                thumbnail_button: shared_element(),
                outline_button: outline_button.clone(),
                attachments_button: attachments_button.clone(),
                thumbnail_view: shared_element(),
                outline_view: shared_element(),
                attachments_view: shared_element(),
                disable_notification: false,
            },
            render_queue: queue.clone(),
            preferences,
        })
        .expect("shell wiring is alias-free");

        Fixture {
            bus,
            document,
            thumbnails,
            queue,
            outline_button,
            attachments_button,
            shell,
        }
    }

    fn fixture() -> Fixture {
        fixture_with_prefs(Preferences::ephemeral())
    }

    #[test]
    fn page_rendered_updates_thumbnail_even_while_sidebar_closed() {
        let fx = fixture();
        fx.document.borrow_mut().finish_page(1);

        fx.bus.dispatch(&ViewerEvent::PageRendered { page_number: 2 });

        assert!(!fx.shell.sidebar().borrow().is_open());
        assert_eq!(fx.thumbnails.borrow().slots[1].image_page, Some(2));
    }

    #[test]
    fn page_rendered_for_vanished_page_is_ignored() {
        let fx = fixture();
        fx.bus.dispatch(&ViewerEvent::PageRendered { page_number: 99 });

        let thumbnails = fx.thumbnails.borrow();
        assert!(thumbnails.slots.iter().all(|slot| slot.image_page.is_none()));
    }

    #[test]
    fn page_changing_scrolls_only_while_thumbnails_visible() {
        let fx = fixture();

        fx.bus.dispatch(&ViewerEvent::PageChanging { page_number: 3 });
        assert!(fx.thumbnails.borrow().scrolled_to.is_empty());

        fx.shell.sidebar().borrow_mut().open();
        fx.bus.dispatch(&ViewerEvent::PageChanging { page_number: 3 });
        assert!(fx.thumbnails.borrow().scrolled_to.contains(&3));

        fx.shell
            .sidebar()
            .borrow_mut()
            .switch_view(SidebarView::Outline, false);
        let scrolls = fx.thumbnails.borrow().scrolled_to.len();
        fx.bus.dispatch(&ViewerEvent::PageChanging { page_number: 4 });
        assert_eq!(fx.thumbnails.borrow().scrolled_to.len(), scrolls);
    }

    #[test]
    fn sidebar_toggles_drive_render_queue_policy() {
        let fx = fixture();

        fx.shell.sidebar().borrow_mut().open();
        assert!(fx.queue.borrow().thumbnail_view_enabled);
        assert_eq!(fx.queue.borrow().render_calls, 1);

        fx.shell.sidebar().borrow_mut().close();
        assert!(!fx.queue.borrow().thumbnail_view_enabled);
        assert_eq!(fx.queue.borrow().render_calls, 2);

        // With the policy installed, the fallback path stays unused.
        assert_eq!(fx.document.borrow().force_rendering_calls, 0);
        assert_eq!(fx.thumbnails.borrow().force_rendering_calls, 0);
    }

    #[test]
    fn open_document_applies_initial_view_from_preferences() {
        let mut prefs = Preferences::ephemeral();
        prefs.set_sidebar_view_on_load(SidebarView::Outline.as_raw());
        let mut fx = fixture_with_prefs(prefs);

        fx.shell.open_document(5, 2);

        let sidebar = fx.shell.sidebar().borrow();
        assert!(sidebar.is_open());
        assert_eq!(sidebar.active_view(), SidebarView::Outline);
        assert!(sidebar.is_initial_view_set());
    }

    #[test]
    fn open_document_with_corrupt_preference_keeps_sidebar_closed() {
        let mut prefs = Preferences::ephemeral();
        prefs.set_sidebar_view_on_load(99);
        let mut fx = fixture_with_prefs(prefs);

        fx.shell.open_document(5, 2);

        let sidebar = fx.shell.sidebar().borrow();
        assert!(!sidebar.is_open());
        assert!(!sidebar.is_initial_view_set());
    }

    #[test]
    fn open_document_announces_empty_panels() {
        let mut fx = fixture();
        fx.shell.open_document(0, 0);

        assert!(fx
            .outline_button
            .has_class(crate::sidebar::CLASS_DISABLED));
        assert!(fx
            .attachments_button
            .has_class(crate::sidebar::CLASS_DISABLED));
    }

    #[test]
    fn second_document_reapplies_initial_view() {
        let mut fx = fixture();
        fx.shell.open_document(3, 1);
        fx.shell
            .sidebar()
            .borrow_mut()
            .switch_view(SidebarView::Attachments, false);

        fx.shell.open_document(3, 1);

        let sidebar = fx.shell.sidebar().borrow();
        // Default preference is thumbnails.
        assert_eq!(sidebar.active_view(), SidebarView::Thumbnails);
        assert!(sidebar.is_open());
    }

    #[test]
    fn detach_drops_every_listener() {
        let mut fx = fixture();
        fx.shell.detach();
        assert_eq!(fx.bus.listener_count(), 0);

        fx.bus.dispatch(&ViewerEvent::PageRendered { page_number: 1 });
        fx.bus.dispatch(&ViewerEvent::OutlineLoaded { outline_count: 0 });
        assert!(!fx.outline_button.has_class(crate::sidebar::CLASS_DISABLED));
    }

    #[test]
    fn drop_detaches_listeners() {
        let fx = fixture();
        let bus = fx.bus.clone();
        drop(fx);
        assert_eq!(bus.listener_count(), 0);
    }
}
