//! Boundary contracts of the external rendering engine
//!
//! The engine that parses documents, lays out pages, and rasterizes
//! thumbnails lives outside this crate. These traits describe the
//! surface the sidebar and shell actually touch; hosts implement them
//! over their real viewer objects.

/// Render progress of a single page view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderingState {
    Initial,
    Running,
    Paused,
    Finished,
}

/// Rendered output of a page, as handed from the page viewer to a
/// thumbnail slot. Pixel interpretation is up to the engine; the shell
/// only moves it around.
#[derive(Clone, PartialEq, Eq)]
pub struct PageImage {
    /// Raw pixel data, engine-defined layout
    pub pixels: Vec<u8>,
    /// Image width in pixels
    pub width_px: u32,
    /// Image height in pixels
    pub height_px: u32,
}

impl std::fmt::Debug for PageImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageImage")
            .field("width_px", &self.width_px)
            .field("height_px", &self.height_px)
            .field("pixels_len", &self.pixels.len())
            .finish_non_exhaustive()
    }
}

/// One page view inside the document viewer.
pub trait PageHandle {
    /// 1-based page number.
    fn page_number(&self) -> usize;

    fn rendering_state(&self) -> RenderingState;

    /// Rendered output, available once rendering finished.
    fn image(&self) -> Option<&PageImage>;
}

/// The full-page document viewer.
pub trait DocumentView {
    /// Re-run the viewer's own pending-render pass.
    fn force_rendering(&mut self);

    fn pages_count(&self) -> usize;

    /// 1-based number of the page currently shown.
    fn current_page_number(&self) -> usize;

    /// Look up a page view by 0-based index. Returns `None` when the
    /// document was replaced or the index is out of range.
    fn page(&self, page_index: usize) -> Option<&dyn PageHandle>;
}

/// One slot in the thumbnail strip.
pub trait ThumbnailSlot {
    /// Adopt the rendered output of a finished page view.
    fn set_image(&mut self, page: &dyn PageHandle);
}

/// The thumbnail strip viewer.
pub trait ThumbnailStrip {
    /// Re-run the strip's own pending-render pass.
    fn force_rendering(&mut self);

    /// Look up a thumbnail slot by 0-based page index.
    fn thumbnail(&mut self, page_index: usize) -> Option<&mut dyn ThumbnailSlot>;

    /// Scroll so the thumbnail of the given 1-based page is in view.
    fn scroll_thumbnail_into_view(&mut self, page_number: usize);
}

/// The outline (table of contents) viewer.
pub trait OutlineNav {
    /// Expand or collapse the whole outline tree.
    fn toggle_outline_tree(&mut self);
}

/// The engine's render-priority queue. The shell re-evaluates thumbnail
/// eligibility here on every sidebar open/close/switch.
pub trait RenderQueue {
    fn set_thumbnail_view_enabled(&mut self, enabled: bool);

    fn render_highest_priority(&mut self);
}
