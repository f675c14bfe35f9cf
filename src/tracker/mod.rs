//! Tracks the windows of the active workspace
//! and applies a wallpaper depending on whether any of them are visible.
//!
//! While enabled, the tracker holds:
//!
//! - one `workspace-switched` subscription on the workspace manager,
//! - one `window-added` and one `window-removed` subscription on the active workspace,
//! - one `minimized-changed` subscription per window of the active workspace (the registry).
//!
//! Every event recomputes the [`Occupancy`] of the active workspace
//! and writes the matching wallpaper to the background.
//! When disabled, it holds no subscriptions at all.

mod registry;

use self::registry::Registry;
use crate::background::Background;
use crate::config::WallpaperSettings;
use crate::desktop::{HandlerId, Window, WindowId, Workspace, WorkspaceManager};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use tracing::{debug, info, trace};

/// Whether the active workspace has any visible windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupancy {
    /// No visible windows.
    Empty,
    /// One or more visible windows.
    Occupied,
}

impl Occupancy {
    pub fn of<W: Window>(windows: &[W]) -> Self {
        if visible_count(windows) == 0 {
            Self::Empty
        } else {
            Self::Occupied
        }
    }
}

/// Counts the windows which are neither minimized nor hidden from the task switcher.
pub fn visible_count<W: Window>(windows: &[W]) -> usize {
    windows.iter().filter(|window| window.is_visible()).count()
}

type WorkspaceOf<M> = <M as WorkspaceManager>::Workspace;
type WindowOf<M> = <WorkspaceOf<M> as Workspace>::Window;

#[derive(Debug, Clone, Copy, Default)]
pub struct TrackerOptions {
    /// Skip writing a wallpaper identical to the last one written.
    /// The first write after enabling always happens.
    pub skip_redundant_writes: bool,
}

pub struct WorkspaceWindowTracker<M: WorkspaceManager + 'static> {
    inner: Rc<RefCell<TrackerInner<M>>>,
}

struct TrackerInner<M: WorkspaceManager + 'static> {
    /// Handed to event handlers so they do not keep the tracker alive.
    this: Weak<RefCell<Self>>,
    manager: M,
    settings: Rc<dyn WallpaperSettings>,
    background: Rc<Background>,
    options: TrackerOptions,
    /// Present while enabled.
    session: Option<Session<M>>,
}

/// Everything held between `enable` and `disable`.
struct Session<M: WorkspaceManager + 'static> {
    settings: Rc<dyn WallpaperSettings>,
    background: Rc<Background>,
    skip_redundant_writes: bool,
    last_written: Option<String>,

    workspace_switched_id: Option<HandlerId>,

    workspace: Option<WorkspaceOf<M>>,
    window_added_id: Option<HandlerId>,
    window_removed_id: Option<HandlerId>,
    registry: Registry<WindowOf<M>>,
}

impl<M: WorkspaceManager + 'static> WorkspaceWindowTracker<M> {
    pub fn new(
        manager: M,
        settings: Rc<dyn WallpaperSettings>,
        background: Rc<Background>,
        options: TrackerOptions,
    ) -> Self {
        let inner = Rc::new_cyclic(|this| {
            RefCell::new(TrackerInner {
                this: this.clone(),
                manager,
                settings,
                background,
                options,
                session: None,
            })
        });

        Self { inner }
    }

    /// Subscribes to the workspace manager, the active workspace and its windows,
    /// then applies the wallpaper for the current state.
    ///
    /// Does nothing if already enabled.
    pub fn enable(&self) {
        let mut inner = self.inner.borrow_mut();
        let TrackerInner {
            this,
            manager,
            settings,
            background,
            options,
            session,
        } = &mut *inner;

        if session.is_some() {
            debug!("Tracker already enabled");
            return;
        }

        info!("Enabling workspace window tracker");

        let mut new_session = Session {
            settings: settings.clone(),
            background: background.clone(),
            skip_redundant_writes: options.skip_redundant_writes,
            last_written: None,
            workspace_switched_id: None,
            workspace: None,
            window_added_id: None,
            window_removed_id: None,
            registry: Registry::default(),
        };

        new_session.workspace_switched_id = Some(manager.connect_workspace_switched({
            let this = this.clone();
            move || {
                if let Some(inner) = this.upgrade() {
                    inner.borrow_mut().on_workspace_switched();
                }
            }
        }));

        new_session.attach(manager, this);
        new_session.refresh();

        *session = Some(new_session);
    }

    /// Removes every subscription and releases the workspace,
    /// along with the session's references to the settings and background.
    ///
    /// The tracker itself keeps the settings and background it was created with
    /// until it is dropped, so it can be enabled again.
    /// Safe to call at any time, any number of times.
    pub fn disable(&self) {
        let mut inner = self.inner.borrow_mut();
        let TrackerInner {
            manager, session, ..
        } = &mut *inner;

        let Some(mut session) = session.take() else {
            trace!("Tracker not enabled");
            return;
        };

        info!("Disabling workspace window tracker");

        if let Some(id) = session.workspace_switched_id.take() {
            manager.disconnect(id);
        }

        session.detach();
    }

    /// Recomputes the occupancy and applies the matching wallpaper.
    /// Does nothing while disabled.
    pub fn refresh(&self) {
        if let Some(session) = &mut self.inner.borrow_mut().session {
            session.refresh();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.borrow().session.is_some()
    }

    /// Gets the ids of the windows with a live `minimized-changed` subscription.
    pub fn tracked_windows(&self) -> Vec<WindowId> {
        self.inner
            .borrow()
            .session
            .as_ref()
            .map(|session| session.registry.ids())
            .unwrap_or_default()
    }
}

impl<M: WorkspaceManager + 'static> Drop for WorkspaceWindowTracker<M> {
    fn drop(&mut self) {
        self.disable();
    }
}

impl<M: WorkspaceManager + 'static> TrackerInner<M> {
    fn on_window_added(&mut self, window: &WindowOf<M>) {
        let Self { this, session, .. } = self;
        let Some(session) = session else {
            return;
        };

        debug!("Window {} added to active workspace", window.id());

        session.track(window, this);
        session.refresh();
    }

    fn on_window_removed(&mut self, window: &WindowOf<M>) {
        let Some(session) = &mut self.session else {
            return;
        };

        debug!("Window {} removed from active workspace", window.id());

        if !session.registry.untrack(window.id()) {
            trace!("Window {} was not tracked", window.id());
        }

        session.refresh();
    }

    fn on_minimized_changed(&mut self) {
        if let Some(session) = &mut self.session {
            session.refresh();
        }
    }

    fn on_workspace_switched(&mut self) {
        let Self {
            this,
            manager,
            session,
            ..
        } = self;
        let Some(session) = session else {
            return;
        };

        debug!("Active workspace switched");

        // old listeners must be fully detached before the new workspace is resolved
        session.detach();
        session.attach(manager, this);
        session.refresh();
    }
}

impl<M: WorkspaceManager + 'static> Session<M> {
    /// Resolves the active workspace,
    /// subscribes to its window events and tracks each of its windows.
    fn attach(&mut self, manager: &M, this: &Weak<RefCell<TrackerInner<M>>>) {
        let Some(workspace) = manager.active_workspace() else {
            debug!("No active workspace");
            return;
        };

        self.window_added_id = Some(workspace.connect_window_added({
            let this = this.clone();
            move |window| {
                if let Some(inner) = this.upgrade() {
                    inner.borrow_mut().on_window_added(window);
                }
            }
        }));

        self.window_removed_id = Some(workspace.connect_window_removed({
            let this = this.clone();
            move |window| {
                if let Some(inner) = this.upgrade() {
                    inner.borrow_mut().on_window_removed(window);
                }
            }
        }));

        for window in workspace.list_windows() {
            self.track(&window, this);
        }

        debug!("Tracking {} window(s)", self.registry.len());
        self.workspace = Some(workspace);
    }

    /// Unsubscribes from every tracked window, then from the workspace,
    /// and forgets the workspace.
    fn detach(&mut self) {
        self.registry.drain();

        if let Some(workspace) = self.workspace.take() {
            if let Some(id) = self.window_added_id.take() {
                workspace.disconnect(id);
            }

            if let Some(id) = self.window_removed_id.take() {
                workspace.disconnect(id);
            }
        }
    }

    fn track(&mut self, window: &WindowOf<M>, this: &Weak<RefCell<TrackerInner<M>>>) {
        let this = this.clone();

        let tracked = self.registry.track(window, move |window| {
            window.connect_minimized_changed(move || {
                if let Some(inner) = this.upgrade() {
                    inner.borrow_mut().on_minimized_changed();
                }
            })
        });

        if !tracked {
            trace!("Window {} already tracked", window.id());
        }
    }

    fn refresh(&mut self) {
        let Some(workspace) = &self.workspace else {
            trace!("No active workspace, skipping refresh");
            return;
        };

        let windows = workspace.list_windows();
        let occupancy = Occupancy::of(&windows);

        debug!(
            "{} of {} window(s) visible: {occupancy:?}",
            visible_count(&windows),
            windows.len()
        );

        let uri = self.settings.wallpaper(occupancy);

        if uri.is_empty() {
            debug!("No wallpaper configured for {occupancy:?}");
            return;
        }

        if self.skip_redundant_writes && self.last_written.as_deref() == Some(uri.as_str()) {
            trace!("Wallpaper unchanged, skipping write");
            return;
        }

        self.background.apply(&uri);
        self.last_written = Some(uri);
    }
}
