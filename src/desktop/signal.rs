use crate::unique_id::get_unique_usize;
use std::cell::{Cell, RefCell};
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

/// Identifies a single connected handler.
/// Returned by `connect` and consumed by `disconnect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(usize);

impl HandlerId {
    fn new() -> Self {
        Self(get_unique_usize())
    }
}

struct Handler<T: ?Sized> {
    id: HandlerId,
    connected: Cell<bool>,
    callback: Box<dyn Fn(&T)>,
}

/// Single-threaded event emitter.
///
/// Handlers run synchronously, in connection order, on the emitting thread.
/// The handler list is not borrowed while handlers run,
/// so handlers may freely connect or disconnect on the same signal.
/// A handler disconnected part way through an emission is not called
/// for the remainder of that emission.
pub struct Signal<T: ?Sized> {
    handlers: RefCell<Vec<Rc<Handler<T>>>>,
}

impl<T: ?Sized> Default for Signal<T> {
    fn default() -> Self {
        Self {
            handlers: RefCell::new(Vec::new()),
        }
    }
}

impl<T: ?Sized> Debug for Signal<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("handlers", &self.handler_count())
            .finish()
    }
}

impl<T: ?Sized> Signal<T> {
    pub fn connect<F>(&self, f: F) -> HandlerId
    where
        F: Fn(&T) + 'static,
    {
        let id = HandlerId::new();

        self.handlers.borrow_mut().push(Rc::new(Handler {
            id,
            connected: Cell::new(true),
            callback: Box::new(f),
        }));

        id
    }

    /// Disconnects the handler with the given id.
    /// Returns `false` if no such handler is connected.
    pub fn disconnect(&self, id: HandlerId) -> bool {
        let mut handlers = self.handlers.borrow_mut();

        let Some(pos) = handlers.iter().position(|handler| handler.id == id) else {
            return false;
        };

        let handler = handlers.remove(pos);
        handler.connected.set(false);

        true
    }

    pub fn emit(&self, value: &T) {
        let handlers = self.handlers.borrow().clone();

        for handler in handlers {
            if handler.connected.get() {
                (handler.callback)(value);
            }
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.borrow().len()
    }
}
