use super::{HandlerId, Signal, Window, WindowId, Workspace, WorkspaceManager};
use crate::unique_id::get_unique_usize;
use indexmap::IndexMap;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, trace};

/// Full state of the windowing system at one point in time,
/// as reported by a compositor client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesktopSnapshot {
    /// Compositor id of the focused workspace.
    pub active: Option<i64>,
    pub workspaces: Vec<WorkspaceSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceSnapshot {
    /// Compositor id
    pub id: i64,
    pub name: String,
    pub windows: Vec<WindowSnapshot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSnapshot {
    /// Compositor id
    pub id: i64,
    pub minimized: bool,
    pub skip_taskbar: bool,
}

impl WindowSnapshot {
    pub const fn new(id: i64) -> Self {
        Self {
            id,
            minimized: false,
            skip_taskbar: false,
        }
    }
}

#[derive(Debug)]
struct WindowInner {
    id: WindowId,
    native_id: i64,
    minimized: Cell<bool>,
    skip_taskbar: Cell<bool>,
    minimized_changed: Signal<()>,
}

/// Shared handle to a window.
/// Clones refer to the same window.
#[derive(Debug, Clone)]
pub struct DesktopWindow {
    inner: Rc<WindowInner>,
}

impl PartialEq for DesktopWindow {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl DesktopWindow {
    pub fn new(native_id: i64) -> Self {
        Self {
            inner: Rc::new(WindowInner {
                id: get_unique_usize(),
                native_id,
                minimized: Cell::new(false),
                skip_taskbar: Cell::new(false),
                minimized_changed: Signal::default(),
            }),
        }
    }

    fn from_snapshot(snapshot: WindowSnapshot) -> Self {
        let window = Self::new(snapshot.id);
        window.inner.minimized.set(snapshot.minimized);
        window.inner.skip_taskbar.set(snapshot.skip_taskbar);
        window
    }

    /// Gets the id assigned by the compositor.
    pub fn native_id(&self) -> i64 {
        self.inner.native_id
    }

    /// Sets the minimized state,
    /// notifying listeners if it changed.
    pub fn set_minimized(&self, minimized: bool) {
        if self.inner.minimized.replace(minimized) != minimized {
            trace!("Window {} minimized: {minimized}", self.inner.native_id);
            self.inner.minimized_changed.emit(&());
        }
    }

    pub fn set_skip_taskbar(&self, skip_taskbar: bool) {
        self.inner.skip_taskbar.set(skip_taskbar);
    }

    /// Gets the number of connected `minimized-changed` handlers.
    pub fn listener_count(&self) -> usize {
        self.inner.minimized_changed.handler_count()
    }
}

impl Window for DesktopWindow {
    fn id(&self) -> WindowId {
        self.inner.id
    }

    fn is_minimized(&self) -> bool {
        self.inner.minimized.get()
    }

    fn skips_taskbar(&self) -> bool {
        self.inner.skip_taskbar.get()
    }

    fn connect_minimized_changed<F>(&self, f: F) -> HandlerId
    where
        F: Fn() + 'static,
    {
        self.inner.minimized_changed.connect(move |()| f())
    }

    fn disconnect(&self, id: HandlerId) {
        if !self.inner.minimized_changed.disconnect(id) {
            trace!("Handler {id:?} not connected to window {}", self.inner.native_id);
        }
    }
}

#[derive(Debug)]
struct WorkspaceInner {
    id: i64,
    name: RefCell<String>,
    windows: RefCell<Vec<DesktopWindow>>,
    window_added: Signal<DesktopWindow>,
    window_removed: Signal<DesktopWindow>,
}

/// Shared handle to a workspace.
/// Clones refer to the same workspace.
#[derive(Debug, Clone)]
pub struct DesktopWorkspace {
    inner: Rc<WorkspaceInner>,
}

impl DesktopWorkspace {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(WorkspaceInner {
                id,
                name: RefCell::new(name.into()),
                windows: RefCell::new(Vec::new()),
                window_added: Signal::default(),
                window_removed: Signal::default(),
            }),
        }
    }

    /// Gets the id assigned by the compositor.
    pub fn id(&self) -> i64 {
        self.inner.id
    }

    pub fn name(&self) -> String {
        self.inner.name.borrow().clone()
    }

    fn set_name(&self, name: &str) {
        if *self.inner.name.borrow() != name {
            *self.inner.name.borrow_mut() = name.to_string();
        }
    }

    pub fn contains(&self, native_id: i64) -> bool {
        self.inner
            .windows
            .borrow()
            .iter()
            .any(|window| window.native_id() == native_id)
    }

    /// Appends the window and emits `window-added`.
    /// Returns `false` without emitting if the window is already a member.
    pub fn add_window(&self, window: DesktopWindow) -> bool {
        if self.contains(window.native_id()) {
            return false;
        }

        self.inner.windows.borrow_mut().push(window.clone());
        debug!(
            "Window {} added to workspace '{}'",
            window.native_id(),
            self.name()
        );

        self.inner.window_added.emit(&window);
        true
    }

    /// Removes the window and emits `window-removed`.
    pub fn remove_window(&self, native_id: i64) -> Option<DesktopWindow> {
        let window = {
            let mut windows = self.inner.windows.borrow_mut();
            let pos = windows
                .iter()
                .position(|window| window.native_id() == native_id)?;
            windows.remove(pos)
        };

        debug!("Window {native_id} removed from workspace '{}'", self.name());

        self.inner.window_removed.emit(&window);
        Some(window)
    }

    /// Gets the number of connected `window-added` and `window-removed` handlers.
    pub fn listener_count(&self) -> usize {
        self.inner.window_added.handler_count() + self.inner.window_removed.handler_count()
    }
}

impl Workspace for DesktopWorkspace {
    type Window = DesktopWindow;

    fn list_windows(&self) -> Vec<DesktopWindow> {
        self.inner.windows.borrow().clone()
    }

    fn connect_window_added<F>(&self, f: F) -> HandlerId
    where
        F: Fn(&DesktopWindow) + 'static,
    {
        self.inner.window_added.connect(f)
    }

    fn connect_window_removed<F>(&self, f: F) -> HandlerId
    where
        F: Fn(&DesktopWindow) + 'static,
    {
        self.inner.window_removed.connect(f)
    }

    fn disconnect(&self, id: HandlerId) {
        if !self.inner.window_added.disconnect(id) && !self.inner.window_removed.disconnect(id) {
            trace!("Handler {id:?} not connected to workspace '{}'", self.name());
        }
    }
}

#[derive(Debug, Default)]
struct DesktopInner {
    workspaces: RefCell<IndexMap<i64, DesktopWorkspace>>,
    /// Every known window, by compositor id.
    windows: RefCell<HashMap<i64, DesktopWindow>>,
    active: Cell<Option<i64>>,
    workspace_switched: Signal<()>,
}

/// In-process model of the windowing system.
///
/// Compositor clients report complete [`DesktopSnapshot`]s;
/// [`Desktop::apply`] turns the difference from the current state
/// into the fine-grained events the tracker subscribes to.
#[derive(Debug, Clone, Default)]
pub struct Desktop {
    inner: Rc<DesktopInner>,
}

impl Desktop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn workspace(&self, id: i64) -> Option<DesktopWorkspace> {
        self.inner.workspaces.borrow().get(&id).cloned()
    }

    pub fn workspaces(&self) -> Vec<DesktopWorkspace> {
        self.inner.workspaces.borrow().values().cloned().collect()
    }

    /// Gets a window by its compositor id.
    pub fn window(&self, native_id: i64) -> Option<DesktopWindow> {
        self.inner.windows.borrow().get(&native_id).cloned()
    }

    /// Gets the workspace with the given id, creating it if it does not exist.
    pub fn add_workspace(&self, id: i64, name: &str) -> DesktopWorkspace {
        if let Some(workspace) = self.workspace(id) {
            workspace.set_name(name);
            return workspace;
        }

        let workspace = DesktopWorkspace::new(id, name);
        self.inner
            .workspaces
            .borrow_mut()
            .insert(id, workspace.clone());
        workspace
    }

    /// Creates a window and adds it to the workspace.
    /// Returns `None` if the workspace does not exist.
    pub fn open_window(&self, workspace_id: i64, snapshot: WindowSnapshot) -> Option<DesktopWindow> {
        let workspace = self.workspace(workspace_id)?;

        let window = DesktopWindow::from_snapshot(snapshot);
        self.inner
            .windows
            .borrow_mut()
            .insert(snapshot.id, window.clone());

        workspace.add_window(window.clone());
        Some(window)
    }

    /// Makes the workspace active and emits `workspace-switched`.
    /// Returns `false` if the workspace does not exist or is already active.
    pub fn switch_to(&self, id: i64) -> bool {
        if !self.inner.workspaces.borrow().contains_key(&id) {
            return false;
        }

        self.set_active(Some(id))
    }

    fn set_active(&self, id: Option<i64>) -> bool {
        if self.inner.active.get() == id {
            return false;
        }

        debug!("Active workspace: {:?} -> {id:?}", self.inner.active.get());
        self.inner.active.set(id);

        self.inner.workspace_switched.emit(&());
        true
    }

    /// Brings the model in line with `snapshot`.
    ///
    /// Events are emitted in this order:
    /// window removals (including windows moving elsewhere),
    /// `minimized` changes, window additions, then the workspace switch.
    /// Window handles are preserved for windows present before and after.
    pub fn apply(&self, snapshot: &DesktopSnapshot) {
        trace!("Applying snapshot: {snapshot:?}");

        let membership = snapshot
            .workspaces
            .iter()
            .flat_map(|workspace| {
                workspace
                    .windows
                    .iter()
                    .map(move |window| (window.id, workspace.id))
            })
            .collect::<HashMap<_, _>>();

        for workspace in &snapshot.workspaces {
            self.add_workspace(workspace.id, &workspace.name);
        }

        for workspace in self.workspaces() {
            let stale = workspace
                .list_windows()
                .into_iter()
                .filter(|window| membership.get(&window.native_id()) != Some(&workspace.id()));

            for window in stale {
                workspace.remove_window(window.native_id());
            }
        }

        for window in snapshot
            .workspaces
            .iter()
            .flat_map(|workspace| &workspace.windows)
        {
            match self.window(window.id) {
                Some(existing) => {
                    existing.set_skip_taskbar(window.skip_taskbar);
                    existing.set_minimized(window.minimized);
                }
                None => {
                    self.inner
                        .windows
                        .borrow_mut()
                        .insert(window.id, DesktopWindow::from_snapshot(*window));
                }
            }
        }

        for workspace_snapshot in &snapshot.workspaces {
            let Some(workspace) = self.workspace(workspace_snapshot.id) else {
                continue;
            };

            for window in &workspace_snapshot.windows {
                if let Some(window) = self.window(window.id) {
                    workspace.add_window(window);
                }
            }
        }

        self.inner.workspaces.borrow_mut().retain(|id, _| {
            snapshot
                .workspaces
                .iter()
                .any(|workspace| workspace.id == *id)
        });

        self.inner
            .windows
            .borrow_mut()
            .retain(|id, _| membership.contains_key(id));

        let active = snapshot
            .active
            .filter(|id| self.inner.workspaces.borrow().contains_key(id));

        self.set_active(active);
    }
}

impl WorkspaceManager for Desktop {
    type Workspace = DesktopWorkspace;

    fn active_workspace(&self) -> Option<DesktopWorkspace> {
        self.inner.active.get().and_then(|id| self.workspace(id))
    }

    fn connect_workspace_switched<F>(&self, f: F) -> HandlerId
    where
        F: Fn() + 'static,
    {
        self.inner.workspace_switched.connect(move |()| f())
    }

    fn disconnect(&self, id: HandlerId) {
        if !self.inner.workspace_switched.disconnect(id) {
            trace!("Handler {id:?} not connected to desktop");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace(id: i64, windows: Vec<WindowSnapshot>) -> WorkspaceSnapshot {
        WorkspaceSnapshot {
            id,
            name: id.to_string(),
            windows,
        }
    }

    fn minimized(id: i64) -> WindowSnapshot {
        WindowSnapshot {
            minimized: true,
            ..WindowSnapshot::new(id)
        }
    }

    /// Records every event emitted by the desktop, in order.
    fn record(desktop: &Desktop) -> Rc<RefCell<Vec<String>>> {
        let events = Rc::new(RefCell::new(Vec::new()));

        {
            let events = events.clone();
            desktop.connect_workspace_switched(move || events.borrow_mut().push("switch".into()));
        }

        for workspace in desktop.workspaces() {
            let ws = workspace.id();
            {
                let events = events.clone();
                workspace.connect_window_added(move |w| {
                    events.borrow_mut().push(format!("add {ws} {}", w.native_id()));
                });
            }
            {
                let events = events.clone();
                workspace.connect_window_removed(move |w| {
                    events.borrow_mut().push(format!("remove {ws} {}", w.native_id()));
                });
            }

            for window in workspace.list_windows() {
                let events = events.clone();
                let id = window.native_id();
                window.connect_minimized_changed(move || {
                    events.borrow_mut().push(format!("minimized {id}"));
                });
            }
        }

        events
    }

    #[test]
    fn initial_snapshot_populates_model() {
        let desktop = Desktop::new();

        desktop.apply(&DesktopSnapshot {
            active: Some(2),
            workspaces: vec![
                workspace(1, vec![WindowSnapshot::new(10)]),
                workspace(2, vec![WindowSnapshot::new(20), minimized(21)]),
            ],
        });

        let active = desktop.active_workspace().expect("active workspace");
        assert_eq!(active.id(), 2);

        let windows = active.list_windows();
        assert_eq!(windows.len(), 2);
        assert!(!windows[0].is_minimized());
        assert!(windows[1].is_minimized());
    }

    #[test]
    fn snapshot_diff_emits_events_in_order() {
        let desktop = Desktop::new();

        desktop.apply(&DesktopSnapshot {
            active: Some(1),
            workspaces: vec![
                workspace(1, vec![WindowSnapshot::new(10), WindowSnapshot::new(11)]),
                workspace(2, vec![]),
            ],
        });

        let events = record(&desktop);

        desktop.apply(&DesktopSnapshot {
            active: Some(2),
            workspaces: vec![
                workspace(1, vec![minimized(10)]),
                workspace(2, vec![WindowSnapshot::new(11), WindowSnapshot::new(12)]),
            ],
        });

        assert_eq!(
            *events.borrow(),
            vec![
                "remove 1 11",
                "minimized 10",
                "add 2 11",
                "add 2 12",
                "switch",
            ]
        );
    }

    #[test]
    fn window_identity_survives_moves() {
        let desktop = Desktop::new();

        desktop.apply(&DesktopSnapshot {
            active: Some(1),
            workspaces: vec![workspace(1, vec![WindowSnapshot::new(10)]), workspace(2, vec![])],
        });

        let before = desktop.window(10).expect("window");

        desktop.apply(&DesktopSnapshot {
            active: Some(1),
            workspaces: vec![workspace(1, vec![]), workspace(2, vec![WindowSnapshot::new(10)])],
        });

        let after = desktop.workspace(2).expect("workspace").list_windows();
        assert_eq!(after, vec![before]);
    }

    #[test]
    fn removed_workspace_drops_windows_and_active() {
        let desktop = Desktop::new();

        desktop.apply(&DesktopSnapshot {
            active: Some(1),
            workspaces: vec![workspace(1, vec![WindowSnapshot::new(10)])],
        });

        let events = record(&desktop);

        desktop.apply(&DesktopSnapshot::default());

        assert_eq!(*events.borrow(), vec!["remove 1 10", "switch"]);
        assert!(desktop.active_workspace().is_none());
        assert!(desktop.window(10).is_none());
        assert!(desktop.workspaces().is_empty());
    }

    #[test]
    fn unchanged_snapshot_is_silent() {
        let desktop = Desktop::new();
        let snapshot = DesktopSnapshot {
            active: Some(1),
            workspaces: vec![workspace(1, vec![WindowSnapshot::new(10), minimized(11)])],
        };

        desktop.apply(&snapshot);
        let events = record(&desktop);
        desktop.apply(&snapshot);

        assert!(events.borrow().is_empty());
    }

    #[test]
    fn switch_to_unknown_workspace() {
        let desktop = Desktop::new();
        desktop.add_workspace(1, "one");

        assert!(!desktop.switch_to(5));
        assert!(desktop.switch_to(1));
        assert!(!desktop.switch_to(1));
    }
}
