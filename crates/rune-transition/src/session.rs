//! Per-session UI state shared by overlay widgets.
//!
//! The only shared piece today is the dismiss stack: overlays register an
//! escape handler while they are open, and the host routes the escape key to
//! `DismissStack::dismiss_top`. A registration is a guard; dropping it
//! removes exactly that handler, wherever it sits in the stack.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

type DismissHandler = Box<dyn FnMut()>;

#[derive(Default)]
struct DismissEntries {
    next_id: u64,
    handlers: Vec<(u64, DismissHandler)>,
    /// Handlers taken out of `handlers` while they run, innermost last.
    running: Vec<u64>,
    /// Running handlers whose registration dropped meanwhile.
    released: Vec<u64>,
}

/// Stack of dismiss handlers, most recent on top. Clones share the stack.
#[derive(Clone, Default)]
pub struct DismissStack {
    entries: Rc<RefCell<DismissEntries>>,
}

impl std::fmt::Debug for DismissStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DismissStack")
            .field("len", &self.len())
            .finish()
    }
}

impl DismissStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a handler. It stays registered until the returned guard drops.
    #[must_use = "the handler is removed when the registration is dropped"]
    pub fn push(&self, handler: impl FnMut() + 'static) -> DismissRegistration {
        let mut entries = self.entries.borrow_mut();
        let id = entries.next_id;
        entries.next_id += 1;
        entries.handlers.push((id, Box::new(handler)));
        DismissRegistration {
            id,
            entries: Rc::clone(&self.entries),
        }
    }

    /// Run the most recently pushed handler. Returns false if the stack is
    /// empty.
    ///
    /// The handler runs outside the stack's borrow, so it may drop its own
    /// registration or push new handlers.
    ///
    /// A handler that is already running (a nested call from inside a
    /// handler) is skipped; the next one down runs instead.
    pub fn dismiss_top(&self) -> bool {
        let (id, mut handler) = {
            let mut entries = self.entries.borrow_mut();
            let Some((id, handler)) = entries.handlers.pop() else {
                return false;
            };
            entries.running.push(id);
            (id, handler)
        };
        debug!(id, "dismissing top overlay");
        handler();

        // Put the handler back unless it unregistered itself meanwhile.
        let mut entries = self.entries.borrow_mut();
        entries.running.retain(|other| *other != id);
        if entries.take_released(id) {
            // The handler may own guards of its own; drop it unborrowed.
            drop(entries);
            drop(handler);
            return true;
        }
        let at = entries
            .handlers
            .iter()
            .position(|(other, _)| *other > id)
            .unwrap_or(entries.handlers.len());
        entries.handlers.insert(at, (id, handler));
        true
    }

    /// Number of live registrations, running handlers included.
    pub fn len(&self) -> usize {
        self.entries.borrow().live()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for DismissEntries {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<u64> = self.handlers.iter().map(|(id, _)| *id).collect();
        f.debug_struct("DismissEntries")
            .field("ids", &ids)
            .field("running", &self.running)
            .finish()
    }
}

impl DismissEntries {
    fn live(&self) -> usize {
        let running = self
            .running
            .iter()
            .filter(|id| !self.released.contains(id))
            .count();
        self.handlers.len() + running
    }

    fn take_released(&mut self, id: u64) -> bool {
        match self.released.iter().position(|other| *other == id) {
            Some(pos) => {
                self.released.swap_remove(pos);
                true
            }
            None => false,
        }
    }
}

/// Guard keeping a dismiss handler registered.
#[derive(Debug)]
pub struct DismissRegistration {
    id: u64,
    entries: Rc<RefCell<DismissEntries>>,
}

impl DismissRegistration {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for DismissRegistration {
    fn drop(&mut self) {
        let mut entries = self.entries.borrow_mut();
        if let Some(pos) = entries.handlers.iter().position(|(id, _)| *id == self.id) {
            let (_, handler) = entries.handlers.remove(pos);
            drop(entries);
            drop(handler);
        } else if entries.running.contains(&self.id) {
            // `dismiss_top` holds the handler; it drops it once it returns.
            entries.released.push(self.id);
        }
    }
}

/// UI state scoped to one session (window or document).
#[derive(Debug, Default, Clone)]
pub struct UiSession {
    dismiss: DismissStack,
}

impl UiSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dismiss_stack(&self) -> &DismissStack {
        &self.dismiss
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_dismiss_runs_most_recent_handler() {
        let session = UiSession::new();
        let hits = Rc::new(RefCell::new(Vec::new()));

        let first = hits.clone();
        let _menu = session.dismiss_stack().push(move || first.borrow_mut().push("menu"));
        let second = hits.clone();
        let _dialog = session
            .dismiss_stack()
            .push(move || second.borrow_mut().push("dialog"));

        assert_eq!(session.dismiss_stack().len(), 2);
        assert!(session.dismiss_stack().dismiss_top());
        assert_eq!(*hits.borrow(), vec!["dialog"]);
        // Still registered until the guard drops.
        assert_eq!(session.dismiss_stack().len(), 2);
    }

    #[test]
    fn test_dropping_registration_removes_only_its_handler() {
        let stack = DismissStack::new();
        let ran = Rc::new(Cell::new(0));

        let counter = ran.clone();
        let bottom = stack.push(move || counter.set(counter.get() + 1));
        let middle = stack.push(|| panic!("removed handler ran"));
        let top = stack.push(|| {});

        drop(middle);
        assert_eq!(stack.len(), 2);

        drop(top);
        assert!(stack.dismiss_top());
        assert_eq!(ran.get(), 1);

        drop(bottom);
        assert!(stack.is_empty());
        assert!(!stack.dismiss_top());
    }

    #[test]
    fn test_handler_may_drop_its_own_registration() {
        let stack = DismissStack::new();
        let slot: Rc<RefCell<Option<DismissRegistration>>> = Rc::new(RefCell::new(None));

        let inner = slot.clone();
        let registration = stack.push(move || {
            inner.borrow_mut().take();
        });
        *slot.borrow_mut() = Some(registration);

        assert!(stack.dismiss_top());
        assert!(stack.is_empty());
    }

    #[test]
    fn test_nested_dismiss_after_self_release_reaches_next_handler() {
        let stack = DismissStack::new();
        let lower_hits = Rc::new(Cell::new(0));
        let counter = lower_hits.clone();
        let _lower = stack.push(move || counter.set(counter.get() + 1));

        let slot: Rc<RefCell<Option<DismissRegistration>>> = Rc::new(RefCell::new(None));
        let observed = Rc::new(RefCell::new(Vec::new()));
        let (inner, nested, seen) = (slot.clone(), stack.clone(), observed.clone());
        let registration = stack.push(move || {
            inner.borrow_mut().take();
            seen.borrow_mut().push(nested.len());
            let dismissed = nested.dismiss_top();
            seen.borrow_mut().push(usize::from(dismissed));
        });
        *slot.borrow_mut() = Some(registration);

        assert!(stack.dismiss_top());
        // len after self-release, then the nested call's result.
        assert_eq!(*observed.borrow(), vec![1, 1]);
        assert_eq!(lower_hits.get(), 1);
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn test_running_handler_counts_until_released() {
        let stack = DismissStack::new();
        let observed = Rc::new(Cell::new(0));
        let (nested, seen) = (stack.clone(), observed.clone());
        let _registration = stack.push(move || {
            seen.set(nested.len());
            // Only the running handler is registered; nothing else to dismiss.
            assert!(!nested.dismiss_top());
        });

        assert!(stack.dismiss_top());
        assert_eq!(observed.get(), 1);
        assert_eq!(stack.len(), 1);
    }
}
