//! The windowing system as seen by the tracker.
//!
//! The tracker only needs to enumerate the windows of the active workspace,
//! read two attributes of each window, and subscribe to lifecycle events.
//! These traits describe exactly that, so the tracker works against any
//! object model providing them. [`model`] is the in-process implementation
//! driven by compositor snapshots.

pub mod model;
mod signal;

pub use model::{Desktop, DesktopSnapshot, DesktopWindow, DesktopWorkspace};
pub use model::{WindowSnapshot, WorkspaceSnapshot};
pub use signal::{HandlerId, Signal};

/// Process-unique window identity.
///
/// Two handles to the same window compare equal by this id
/// regardless of their attribute values.
pub type WindowId = usize;

pub trait Window: Clone {
    fn id(&self) -> WindowId;

    fn is_minimized(&self) -> bool;

    /// Whether the window is hidden from the task switcher.
    fn skips_taskbar(&self) -> bool;

    /// Connects `f` to be called whenever `minimized` changes.
    fn connect_minimized_changed<F>(&self, f: F) -> HandlerId
    where
        F: Fn() + 'static;

    fn disconnect(&self, id: HandlerId);

    /// A window is visible if it is neither minimized nor hidden from the task switcher.
    fn is_visible(&self) -> bool {
        !self.is_minimized() && !self.skips_taskbar()
    }
}

pub trait Workspace: Clone {
    type Window: Window;

    /// Gets the workspace's windows, in stacking order.
    fn list_windows(&self) -> Vec<Self::Window>;

    fn connect_window_added<F>(&self, f: F) -> HandlerId
    where
        F: Fn(&Self::Window) + 'static;

    fn connect_window_removed<F>(&self, f: F) -> HandlerId
    where
        F: Fn(&Self::Window) + 'static;

    fn disconnect(&self, id: HandlerId);
}

pub trait WorkspaceManager {
    type Workspace: Workspace;

    /// Gets the active workspace.
    /// This is `None` before the windowing system has reported any state.
    fn active_workspace(&self) -> Option<Self::Workspace>;

    /// Connects `f` to be called after the active workspace changes.
    fn connect_workspace_switched<F>(&self, f: F) -> HandlerId
    where
        F: Fn() + 'static;

    fn disconnect(&self, id: HandlerId);
}
