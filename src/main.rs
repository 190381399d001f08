use std::cell::RefCell;
use std::fs::File;
use std::io::stdout;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{error, info, LevelFilter};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame, Terminal,
};
use simplelog::{Config, WriteLogger};

use folio::rendering::{
    DocumentView, OutlineNav, PageHandle, PageImage, RenderQueue, RenderingState, ThumbnailSlot,
    ThumbnailStrip,
};
use folio::services::{DownloadManager, ExternalServices, GenericServices};
use folio::sidebar::{SidebarOptions, SidebarView, CLASS_ACTIVE, CLASS_DISABLED};
use folio::viewer::{ShellOptions, ViewerShell};
use folio::visual::{shared_element, SharedElement, VisualElement};
use folio::{EventBus, EventKind, ViewerEvent};

#[derive(Parser, Debug)]
#[command(name = "folio", about = "Sidebar shell demo over a synthetic document")]
struct Args {
    /// Number of pages in the synthetic document
    #[arg(long, default_value_t = 12)]
    pages: usize,

    /// Outline chapters (0 leaves the document without an outline)
    #[arg(long, default_value_t = 5)]
    outline: usize,

    /// Attachments (0 leaves the document without attachments)
    #[arg(long, default_value_t = 2)]
    attachments: usize,

    /// Preferences file (ephemeral when omitted)
    #[arg(long)]
    prefs: Option<PathBuf>,

    /// Download directory for attachments (defaults to the user download dir)
    #[arg(long)]
    downloads: Option<PathBuf>,

    /// Log file
    #[arg(long, default_value = "folio.log")]
    log_file: PathBuf,
}

/// Synthetic page that "renders" to a flat shade.
struct DemoPage {
    number: usize,
    state: RenderingState,
    image: Option<PageImage>,
}

impl DemoPage {
    fn new(number: usize) -> Self {
        Self {
            number,
            state: RenderingState::Initial,
            image: None,
        }
    }

    fn render(&mut self) {
        let shade = 64 + (self.number * 17 % 128) as u8;
        self.image = Some(PageImage {
            pixels: vec![shade; 40 * 56],
            width_px: 40,
            height_px: 56,
        });
        self.state = RenderingState::Finished;
    }
}

impl PageHandle for DemoPage {
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

/// Stand-in for the full-page viewer of a real engine.
struct DemoPages {
    pages: Vec<DemoPage>,
    current_page: usize,
}

impl DemoPages {
    fn new(count: usize) -> Self {
        Self {
            pages: (1..=count).map(DemoPage::new).collect(),
            current_page: 1,
        }
    }

    /// Render the next unfinished page; returns its 1-based number.
    fn render_next(&mut self) -> Option<usize> {
        let page = self
            .pages
            .iter_mut()
            .find(|page| page.state != RenderingState::Finished)?;
        page.render();
        Some(page.number)
    }

    fn set_current_page(&mut self, page_number: usize) {
        self.current_page = page_number.clamp(1, self.pages.len().max(1));
    }

    fn reset_rendering(&mut self) {
        for page in &mut self.pages {
            page.state = RenderingState::Initial;
            page.image = None;
        }
        self.current_page = 1;
    }
}

impl DocumentView for DemoPages {
    fn force_rendering(&mut self) {
        // A real engine re-runs its pending pass; here the current page
        // is rendered on the spot.
        let current = self.current_page;
        if let Some(page) = self.pages.get_mut(current.saturating_sub(1)) {
            if page.state != RenderingState::Finished {
                page.render();
            }
        }
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

struct DemoThumb {
    page_number: usize,
    image: Option<PageImage>,
}

impl ThumbnailSlot for DemoThumb {
    fn set_image(&mut self, page: &dyn PageHandle) {
        self.image = page.image().cloned();
    }
}

struct DemoThumbnails {
    slots: Vec<DemoThumb>,
    /// First slot index shown in the strip.
    top: usize,
}

impl DemoThumbnails {
    fn new(count: usize) -> Self {
        Self {
            slots: (1..=count)
                .map(|page_number| DemoThumb {
                    page_number,
                    image: None,
                })
                .collect(),
            top: 0,
        }
    }

    fn clear(&mut self) {
        for slot in &mut self.slots {
            slot.image = None;
        }
        self.top = 0;
    }
}

impl ThumbnailStrip for DemoThumbnails {
    fn force_rendering(&mut self) {
        // Thumbnails adopt page images; the strip has no pass of its own.
    }

    fn thumbnail(&mut self, page_index: usize) -> Option<&mut dyn ThumbnailSlot> {
        self.slots
            .get_mut(page_index)
            .map(|slot| slot as &mut dyn ThumbnailSlot)
    }

    fn scroll_thumbnail_into_view(&mut self, page_number: usize) {
        self.top = page_number.saturating_sub(3).min(self.slots.len().saturating_sub(1));
    }
}

struct DemoOutline {
    /// (indent level, title) pairs.
    entries: Vec<(usize, String)>,
    collapsed: bool,
    selected: usize,
}

impl DemoOutline {
    fn with_chapters(count: usize) -> Self {
        let mut entries = Vec::new();
        for i in 1..=count {
            entries.push((0, format!("Chapter {i}")));
            if i % 2 == 1 {
                entries.push((1, format!("Section {i}.1")));
                entries.push((1, format!("Section {i}.2")));
            }
        }
        Self {
            entries,
            collapsed: false,
            selected: 0,
        }
    }

    fn visible_entries(&self) -> Vec<&(usize, String)> {
        self.entries
            .iter()
            .filter(|(level, _)| !self.collapsed || *level == 0)
            .collect()
    }

    fn move_selection(&mut self, delta: i64) {
        let count = self.visible_entries().len();
        if count == 0 {
            return;
        }
        let target = (self.selected as i64 + delta).clamp(0, count as i64 - 1);
        self.selected = target as usize;
    }
}

impl OutlineNav for DemoOutline {
    fn toggle_outline_tree(&mut self) {
        self.collapsed = !self.collapsed;
        self.selected = 0;
    }
}

struct DemoQueue {
    thumbnail_view_enabled: bool,
}

impl RenderQueue for DemoQueue {
    fn set_thumbnail_view_enabled(&mut self, enabled: bool) {
        self.thumbnail_view_enabled = enabled;
    }

    fn render_highest_priority(&mut self) {
        log::debug!(
            "render pass requested (thumbnails enabled: {})",
            self.thumbnail_view_enabled
        );
    }
}

struct DemoAttachments {
    items: Vec<(String, Vec<u8>)>,
    selected: usize,
}

impl DemoAttachments {
    fn with_items(count: usize) -> Self {
        Self {
            items: (1..=count)
                .map(|i| {
                    (
                        format!("attachment-{i}.txt"),
                        format!("Synthetic attachment {i}\n").into_bytes(),
                    )
                })
                .collect(),
            selected: 0,
        }
    }

    fn move_selection(&mut self, delta: i64) {
        if self.items.is_empty() {
            return;
        }
        let target = (self.selected as i64 + delta).clamp(0, self.items.len() as i64 - 1);
        self.selected = target as usize;
    }

    fn selected_item(&self) -> Option<(String, Vec<u8>)> {
        self.items.get(self.selected).cloned()
    }
}

struct App {
    shell: ViewerShell<SharedElement>,
    bus: EventBus,
    pages: Rc<RefCell<DemoPages>>,
    thumbnails: Rc<RefCell<DemoThumbnails>>,
    outline: Rc<RefCell<DemoOutline>>,
    attachments: DemoAttachments,
    downloads: Option<Box<dyn DownloadManager>>,

    thumbnail_button: SharedElement,
    outline_button: SharedElement,
    attachments_button: SharedElement,

    /// Last `sidebarviewchanged` payload, for the status line.
    last_view: Rc<RefCell<SidebarView>>,
    status: String,
    should_quit: bool,
}

impl App {
    fn new(args: &Args) -> Result<Self> {
        let services = GenericServices {
            download_dir: args.downloads.clone(),
            preferences_path: args.prefs.clone(),
            locale: None,
        };
        let preferences = services.create_preferences()?;
        let downloads = match services.create_download_manager() {
            Ok(manager) => Some(manager),
            Err(e) => {
                error!("downloads unavailable: {e}");
                None
            }
        };

        let bus = EventBus::new();
        let pages = Rc::new(RefCell::new(DemoPages::new(args.pages.max(1))));
        let thumbnails = Rc::new(RefCell::new(DemoThumbnails::new(args.pages.max(1))));
        let outline = Rc::new(RefCell::new(DemoOutline::with_chapters(args.outline)));
        let queue = Rc::new(RefCell::new(DemoQueue {
            thumbnail_view_enabled: false,
        }));

        let thumbnail_button = shared_element();
        let outline_button = shared_element();
        let attachments_button = shared_element();

        let shell = ViewerShell::new(ShellOptions {
            sidebar: SidebarOptions {
                document_view: pages.clone(),
                thumbnails: thumbnails.clone(),
                outline: outline.clone(),
                event_bus: bus.clone(),
                thumbnail_button: thumbnail_button.clone(),
                outline_button: outline_button.clone(),
                attachments_button: attachments_button.clone(),
                thumbnail_view: shared_element(),
                outline_view: shared_element(),
                attachments_view: shared_element(),
                disable_notification: false,
            },
            render_queue: queue,
            preferences,
        })?;

        let last_view = Rc::new(RefCell::new(SidebarView::None));
        let view_sink = last_view.clone();
        bus.on(EventKind::SidebarViewChanged, move |event| {
            if let ViewerEvent::SidebarViewChanged { view } = event {
                *view_sink.borrow_mut() = *view;
            }
        });

        let mut app = Self {
            shell,
            bus,
            pages,
            thumbnails,
            outline,
            attachments: DemoAttachments::with_items(args.attachments),
            downloads,
            thumbnail_button,
            outline_button,
            attachments_button,
            last_view,
            status: String::from("tab: sidebar  t/o/a: panels  n/p: page  d: download  r: reload  q: quit"),
            should_quit: false,
        };
        app.reload_document();
        Ok(app)
    }

    fn reload_document(&mut self) {
        self.pages.borrow_mut().reset_rendering();
        self.thumbnails.borrow_mut().clear();

        let outline_count = self.outline.borrow().entries.len();
        let attachments_count = self.attachments.items.len();
        self.shell.open_document(outline_count, attachments_count);
    }

    /// Progressive rendering: one page per idle tick, announced on the bus.
    fn tick(&mut self) {
        let rendered = self.pages.borrow_mut().render_next();
        if let Some(page_number) = rendered {
            self.bus
                .dispatch(&ViewerEvent::PageRendered { page_number });
        }
    }

    fn handle_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.save_preferences();
                self.should_quit = true;
            }
            KeyCode::Tab | KeyCode::Char('b') => self.shell.sidebar().borrow_mut().toggle(),
            KeyCode::Char('t') => self.shell.sidebar().borrow_mut().handle_thumbnail_click(),
            KeyCode::Char('o') => self.shell.sidebar().borrow_mut().handle_outline_click(),
            KeyCode::Char('a') => self.shell.sidebar().borrow_mut().handle_attachments_click(),
            KeyCode::Char('O') => self
                .shell
                .sidebar()
                .borrow_mut()
                .handle_outline_double_click(),
            KeyCode::Char('n') | KeyCode::Right => self.go_to_page(1),
            KeyCode::Char('p') | KeyCode::Left => self.go_to_page(-1),
            KeyCode::Char('j') | KeyCode::Down => self.move_panel_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_panel_selection(-1),
            KeyCode::Char('d') => self.download_selected_attachment(),
            KeyCode::Char('r') => {
                self.reload_document();
                self.status = String::from("document reloaded");
            }
            _ => {}
        }
    }

    fn go_to_page(&mut self, delta: i64) {
        let (current, count) = {
            let pages = self.pages.borrow();
            (pages.current_page_number(), pages.pages_count())
        };
        let target = (current as i64 + delta).clamp(1, count as i64) as usize;
        if target != current {
            self.pages.borrow_mut().set_current_page(target);
            self.bus.dispatch(&ViewerEvent::PageChanging {
                page_number: target,
            });
        }
    }

    fn move_panel_selection(&mut self, delta: i64) {
        let visible = self.shell.sidebar().borrow().visible_view();
        match visible {
            SidebarView::Outline => self.outline.borrow_mut().move_selection(delta),
            SidebarView::Attachments => self.attachments.move_selection(delta),
            _ => self.go_to_page(delta),
        }
    }

    fn download_selected_attachment(&mut self) {
        if !self.shell.sidebar().borrow().is_attachments_view_visible() {
            return;
        }
        let Some((name, data)) = self.attachments.selected_item() else {
            return;
        };
        match self.downloads.as_mut() {
            Some(manager) => match manager.download_data(&data, &name) {
                Ok(path) => self.status = format!("saved {}", path.display()),
                Err(e) => self.status = format!("download failed: {e}"),
            },
            None => self.status = String::from("no download directory available"),
        }
    }

    fn save_preferences(&mut self) {
        let view = self.shell.sidebar().borrow().visible_view();
        let prefs = self.shell.preferences_mut();
        prefs.set_sidebar_view_on_load(view.as_raw());
        if let Err(e) = prefs.save() {
            error!("failed to save preferences: {e}");
        }
    }

    fn draw(&self, f: &mut Frame) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(4), Constraint::Length(1)])
            .split(f.area());

        let is_open = self.shell.sidebar().borrow().is_open();
        if is_open {
            let columns = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Length(32), Constraint::Min(20)])
                .split(rows[0]);
            self.draw_sidebar(f, columns[0]);
            self.draw_page(f, columns[1]);
        } else {
            self.draw_page(f, rows[0]);
        }

        let status = Line::from(vec![
            Span::styled(
                format!(" view: {:?} ", *self.last_view.borrow()),
                Style::default().fg(Color::Cyan),
            ),
            Span::raw(self.status.clone()),
        ]);
        f.render_widget(Paragraph::new(status), rows[1]);
    }

    fn draw_sidebar(&self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(3)])
            .split(area);

        let tab = |label: &str, button: &SharedElement| {
            let mut style = Style::default().fg(Color::Gray);
            if button.has_class(CLASS_ACTIVE) {
                style = Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD);
            }
            if button.has_class(CLASS_DISABLED) {
                style = Style::default().fg(Color::DarkGray);
            }
            Span::styled(format!(" {label} "), style)
        };
        let tabs = Line::from(vec![
            tab("[t]humbs", &self.thumbnail_button),
            tab("[o]utline", &self.outline_button),
            tab("[a]ttach", &self.attachments_button),
        ]);
        f.render_widget(Paragraph::new(tabs), chunks[0]);

        match self.shell.sidebar().borrow().visible_view() {
            SidebarView::Thumbnails => self.draw_thumbnails(f, chunks[1]),
            SidebarView::Outline => self.draw_outline(f, chunks[1]),
            SidebarView::Attachments => self.draw_attachments(f, chunks[1]),
            SidebarView::None => {}
        }
    }

    fn draw_thumbnails(&self, f: &mut Frame, area: Rect) {
        let thumbnails = self.thumbnails.borrow();
        let current = self.pages.borrow().current_page_number();

        let items: Vec<ListItem> = thumbnails
            .slots
            .iter()
            .skip(thumbnails.top)
            .map(|slot| {
                let marker = if slot.image.is_some() { "▉" } else { "░" };
                let mut style = Style::default();
                if slot.page_number == current {
                    style = style.fg(Color::Yellow).add_modifier(Modifier::BOLD);
                }
                ListItem::new(Line::from(Span::styled(
                    format!("{marker} page {}", slot.page_number),
                    style,
                )))
            })
            .collect();

        let list =
            List::new(items).block(Block::default().borders(Borders::ALL).title("Thumbnails"));
        f.render_widget(list, area);
    }

    fn draw_outline(&self, f: &mut Frame, area: Rect) {
        let outline = self.outline.borrow();
        let items: Vec<ListItem> = outline
            .visible_entries()
            .iter()
            .enumerate()
            .map(|(i, (level, title))| {
                let mut style = Style::default();
                if i == outline.selected {
                    style = style.fg(Color::Yellow);
                }
                ListItem::new(Line::from(Span::styled(
                    format!("{}{title}", "  ".repeat(*level)),
                    style,
                )))
            })
            .collect();

        let title = if outline.collapsed {
            "Outline (collapsed, O expands)"
        } else {
            "Outline"
        };
        let list = List::new(items).block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(list, area);
    }

    fn draw_attachments(&self, f: &mut Frame, area: Rect) {
        let items: Vec<ListItem> = self
            .attachments
            .items
            .iter()
            .enumerate()
            .map(|(i, (name, data))| {
                let mut style = Style::default();
                if i == self.attachments.selected {
                    style = style.fg(Color::Yellow);
                }
                ListItem::new(Line::from(Span::styled(
                    format!("{name} ({} bytes)", data.len()),
                    style,
                )))
            })
            .collect();

        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title("Attachments"));
        f.render_widget(list, area);
    }

    fn draw_page(&self, f: &mut Frame, area: Rect) {
        let pages = self.pages.borrow();
        let current = pages.current_page_number();
        let total = pages.pages_count();

        let (body, style) = match pages.page(current.saturating_sub(1)) {
            Some(page) if page.rendering_state() == RenderingState::Finished => {
                let fill = "▓".repeat(area.width.saturating_sub(4) as usize);
                let lines: Vec<Line> = (0..area.height.saturating_sub(2))
                    .map(|_| Line::from(fill.clone()))
                    .collect();
                (lines, Style::default().fg(Color::Gray))
            }
            _ => (
                vec![Line::from("rendering…")],
                Style::default().fg(Color::DarkGray),
            ),
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!("Page {current}/{total}"));
        f.render_widget(Paragraph::new(body).style(style).block(block), area);
    }
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| app.draw(f))?;

        if event::poll(Duration::from_millis(120))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key.code);
                }
            }
        } else {
            app.tick();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    WriteLogger::init(
        LevelFilter::Debug,
        Config::default(),
        File::create(&args.log_file)?,
    )?;
    info!(
        "starting folio demo: {} pages, {} chapters, {} attachments",
        args.pages, args.outline, args.attachments
    );

    let mut app = App::new(&args)?;

    enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(out);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}
