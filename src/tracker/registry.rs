use crate::desktop::{HandlerId, Window, WindowId};
use indexmap::IndexMap;

/// Record of the windows with a live `minimized-changed` subscription.
///
/// Keyed by window identity.
/// A window has at most one entry, so at most one live subscription.
#[derive(Debug)]
pub struct Registry<W: Window> {
    entries: IndexMap<WindowId, (W, HandlerId)>,
}

impl<W: Window> Default for Registry<W> {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }
}

impl<W: Window> Registry<W> {
    /// Subscribes to `window` using `connect` and records the handle.
    ///
    /// Returns `false` without calling `connect` if the window is already tracked.
    pub fn track<F>(&mut self, window: &W, connect: F) -> bool
    where
        F: FnOnce(&W) -> HandlerId,
    {
        if self.entries.contains_key(&window.id()) {
            return false;
        }

        let handler_id = connect(window);
        self.entries.insert(window.id(), (window.clone(), handler_id));

        true
    }

    /// Unsubscribes from the window and removes its entry.
    ///
    /// Returns `false` if the window was not tracked.
    pub fn untrack(&mut self, id: WindowId) -> bool {
        match self.entries.shift_remove(&id) {
            Some((window, handler_id)) => {
                window.disconnect(handler_id);
                true
            }
            None => false,
        }
    }

    /// Unsubscribes from every tracked window, leaving the registry empty.
    pub fn drain(&mut self) {
        for (_, (window, handler_id)) in self.entries.drain(..) {
            window.disconnect(handler_id);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Gets the tracked window ids, in the order they were tracked.
    pub fn ids(&self) -> Vec<WindowId> {
        self.entries.keys().copied().collect()
    }
}
