// Export modules for embedding hosts and for tests
pub mod events;
pub mod rendering;
pub mod services;
pub mod sidebar;
pub mod viewer;
pub mod visual;

pub mod test_utils;

// Re-export the session-facing surface
pub use events::{EventBus, EventKind, ListenerId, ViewerEvent};
pub use sidebar::{Sidebar, SidebarError, SidebarOptions, SidebarView};
pub use viewer::{ShellOptions, ViewerShell};
