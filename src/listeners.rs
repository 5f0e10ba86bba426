//! Frame and resize listener bookkeeping

use crate::session::{FrameContext, ResizeEvent, SessionError};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

/// Frame listener signature
pub type FrameFn<S> = dyn FnMut(&mut FrameContext<'_, S>);

/// Resize listener signature
pub type ResizeFn = dyn FnMut(ResizeEvent);

/// Events a session accepts listeners for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Fired once per rendered frame, before the draw
    Render,
    /// Fired after the camera and surface were resized
    Resize,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Render => "render",
            EventKind::Resize => "resize",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "render" => Ok(EventKind::Render),
            "resize" => Ok(EventKind::Resize),
            other => Err(SessionError::UnknownEvent(other.to_string())),
        }
    }
}

/// A registered callback. Clones compare equal to each other under `same_as`.
pub enum Callback<S> {
    Render(Rc<RefCell<FrameFn<S>>>),
    Resize(Rc<RefCell<ResizeFn>>),
}

impl<S> Callback<S> {
    pub fn render<F>(f: F) -> Self
    where
        F: FnMut(&mut FrameContext<'_, S>) + 'static,
    {
        Callback::Render(Rc::new(RefCell::new(f)))
    }

    pub fn resize<F>(f: F) -> Self
    where
        F: FnMut(ResizeEvent) + 'static,
    {
        Callback::Resize(Rc::new(RefCell::new(f)))
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Callback::Render(_) => EventKind::Render,
            Callback::Resize(_) => EventKind::Resize,
        }
    }

    /// True if both refer to the same registered closure
    pub fn same_as(&self, other: &Callback<S>) -> bool {
        match (self, other) {
            (Callback::Render(a), Callback::Render(b)) => same_rc(a, b),
            (Callback::Resize(a), Callback::Resize(b)) => same_rc(a, b),
            _ => false,
        }
    }
}

impl<S> Clone for Callback<S> {
    fn clone(&self) -> Self {
        match self {
            Callback::Render(f) => Callback::Render(Rc::clone(f)),
            Callback::Resize(f) => Callback::Resize(Rc::clone(f)),
        }
    }
}

impl<S> fmt::Debug for Callback<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ptr = match self {
            Callback::Render(cb) => Rc::as_ptr(cb) as *const (),
            Callback::Resize(cb) => Rc::as_ptr(cb) as *const (),
        };
        write!(f, "Callback::{}({:p})", self.kind(), ptr)
    }
}

/// A single item or an ordered sequence of them
///
/// Used for bulk registration: registering `Many` callbacks yields `Many`
/// unsubscribe handles in the same order.
#[derive(Debug, Clone)]
pub enum OneOrMany<T> {
    Single(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> OneOrMany<U> {
        match self {
            OneOrMany::Single(item) => OneOrMany::Single(f(item)),
            OneOrMany::Many(items) => OneOrMany::Many(items.into_iter().map(f).collect()),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            OneOrMany::Single(item) => std::slice::from_ref(item).iter(),
            OneOrMany::Many(items) => items.iter(),
        }
    }

    pub fn len(&self) -> usize {
        self.iter().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Single(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }

    pub fn single(self) -> Option<T> {
        match self {
            OneOrMany::Single(item) => Some(item),
            OneOrMany::Many(_) => None,
        }
    }
}

impl<S> From<Callback<S>> for OneOrMany<Callback<S>> {
    fn from(callback: Callback<S>) -> Self {
        OneOrMany::Single(callback)
    }
}

impl<S> From<Vec<Callback<S>>> for OneOrMany<Callback<S>> {
    fn from(callbacks: Vec<Callback<S>>) -> Self {
        OneOrMany::Many(callbacks)
    }
}

fn same_rc<F: ?Sized>(a: &Rc<RefCell<F>>, b: &Rc<RefCell<F>>) -> bool {
    // compare data addresses only; vtable pointers may differ between codegen units
    Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
}

/// Ordered list of listeners that tolerates mutation while it is being walked
///
/// Every registration gets its own id, so a callback registered twice is two
/// independent entries.
pub struct ListenerList<F: ?Sized> {
    entries: RefCell<Vec<Entry<F>>>,
    next_id: Cell<u64>,
}

struct Entry<F: ?Sized> {
    id: u64,
    listener: Rc<RefCell<F>>,
}

impl<F: ?Sized> Clone for Entry<F> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            listener: Rc::clone(&self.listener),
        }
    }
}

impl<F: ?Sized> Default for ListenerList<F> {
    fn default() -> Self {
        Self {
            entries: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        }
    }
}

impl<F: ?Sized> ListenerList<F> {
    pub fn push(&self, listener: Rc<RefCell<F>>) {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.entries.borrow_mut().push(Entry { id, listener });
    }

    /// Remove the first entry identical to `listener`
    pub fn remove(&self, listener: &Rc<RefCell<F>>) -> bool {
        let mut entries = self.entries.borrow_mut();
        match entries.iter().position(|entry| same_rc(&entry.listener, listener)) {
            Some(index) => {
                entries.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, listener: &Rc<RefCell<F>>) -> bool {
        self.entries
            .borrow()
            .iter()
            .any(|entry| same_rc(&entry.listener, listener))
    }

    /// Number of times `listener` is registered
    pub fn count(&self, listener: &Rc<RefCell<F>>) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|entry| same_rc(&entry.listener, listener))
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    /// Index of the last registration of `listener`
    pub fn last_position(&self, listener: &Rc<RefCell<F>>) -> Option<usize> {
        self.entries
            .borrow()
            .iter()
            .rposition(|entry| same_rc(&entry.listener, listener))
    }

    fn is_registered(&self, id: u64) -> bool {
        self.entries.borrow().iter().any(|entry| entry.id == id)
    }

    /// Visit every registration present when the walk started, in order.
    ///
    /// The list is not borrowed while `visit` runs, so listeners may add or
    /// remove entries. Registrations removed mid-walk are skipped; ones added
    /// mid-walk (including a removed callback added again) are first visited
    /// on the next walk.
    pub fn for_each_live(&self, mut visit: impl FnMut(&Rc<RefCell<F>>)) {
        let snapshot = self.entries.borrow().clone();
        for entry in &snapshot {
            if self.is_registered(entry.id) {
                visit(&entry.listener);
            }
        }
    }
}
