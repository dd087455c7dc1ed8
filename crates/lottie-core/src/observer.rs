//! Change propagation from live animations to the geometry that depends on them.
//!
//! Animations hold weak handles to their listeners, so dropping a content node
//! is enough to stop notifications reaching it. Recomputation is pull-based:
//! a notification only flips flags.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

pub trait ChangeListener: Send + Sync {
    fn on_value_changed(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Default)]
pub struct ChangeNotifier {
    listeners: Vec<(ListenerId, Weak<dyn ChangeListener>)>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&mut self, listener: &Arc<dyn ChangeListener>) -> ListenerId {
        let id = ListenerId(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed));
        self.listeners.push((id, Arc::downgrade(listener)));
        id
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Notifies every live listener once and forgets the dropped ones.
    pub fn notify(&mut self) {
        self.listeners.retain(|(_, weak)| match weak.upgrade() {
            Some(listener) => {
                listener.on_value_changed();
                true
            }
            None => false,
        });
    }
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Shared boolean a listener sets and its owner clears on recompute.
#[derive(Debug, Clone)]
pub struct DirtyFlag(Arc<AtomicBool>);

impl DirtyFlag {
    /// New flags start dirty so the first read computes.
    pub fn new() -> Self {
        DirtyFlag(Arc::new(AtomicBool::new(true)))
    }

    pub fn mark(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_dirty(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Clears the flag, returning whether it was set.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

impl Default for DirtyFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Redraw requests raised towards the layer that owns a content node.
#[derive(Debug, Clone, Default)]
pub struct RedrawRequests(Arc<AtomicUsize>);

impl RedrawRequests {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.fetch_add(1, Ordering::AcqRel);
    }

    pub fn pending(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }

    pub fn take(&self) -> usize {
        self.0.swap(0, Ordering::AcqRel)
    }
}

/// Listener owned by a content node: marks its cached geometry dirty and
/// forwards a single redraw request per notification.
#[derive(Debug, Default)]
pub struct ContentInvalidator {
    dirty: DirtyFlag,
    redraw: Option<RedrawRequests>,
}

impl ContentInvalidator {
    pub fn new(redraw: Option<RedrawRequests>) -> Arc<Self> {
        Arc::new(ContentInvalidator {
            dirty: DirtyFlag::new(),
            redraw,
        })
    }

    pub fn dirty(&self) -> &DirtyFlag {
        &self.dirty
    }
}

impl ChangeListener for ContentInvalidator {
    fn on_value_changed(&self) {
        self.dirty.mark();
        if let Some(redraw) = &self.redraw {
            redraw.request();
        }
    }
}
