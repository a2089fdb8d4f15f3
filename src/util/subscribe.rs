use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

pub type Listener<T> = Rc<dyn Fn(&T) + 'static>;

/// Single-threaded listener list.
///
/// `notify` snapshots the current listeners before calling them, so a listener may
/// subscribe or drop its own [`Subscription`] while being notified.
pub struct Listeners<T> {
    slots: Rc<RefCell<Slots<T>>>,
}

struct Slots<T> {
    next_id: u64,
    entries: Vec<(u64, Listener<T>)>,
}

impl<T: 'static> Listeners<T> {
    pub fn new() -> Self {
        Self {
            slots: Rc::new(RefCell::new(Slots {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + 'static,
    {
        let id = {
            let mut slots = self.slots.borrow_mut();
            let id = slots.next_id;
            slots.next_id += 1;
            slots.entries.push((id, Rc::new(listener)));
            id
        };

        let weak: Weak<RefCell<Slots<T>>> = Rc::downgrade(&self.slots);
        Subscription::new(move || {
            if let Some(slots) = weak.upgrade() {
                slots.borrow_mut().entries.retain(|(entry, _)| *entry != id);
            }
        })
    }

    pub fn notify(&self, value: &T) {
        let snapshot: Vec<Listener<T>> = self
            .slots
            .borrow()
            .entries
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in snapshot {
            listener(value);
        }
    }

    pub fn len(&self) -> usize {
        self.slots.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: 'static> Default for Listeners<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Listeners<T> {
    fn clone(&self) -> Self {
        Self {
            slots: Rc::clone(&self.slots),
        }
    }
}

impl<T> fmt::Debug for Listeners<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("count", &self.slots.borrow().entries.len())
            .finish()
    }
}

/// Guard returned by [`Listeners::subscribe`]; dropping it removes the listener.
#[must_use = "dropping a Subscription immediately unsubscribes the listener"]
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    fn new<F>(unsubscribe: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    pub fn cancel(mut self) {
        self.run();
    }

    fn run(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn dropping_subscription_removes_listener() {
        let listeners = Listeners::<u32>::new();
        let seen = Rc::new(Cell::new(0));
        let sink = Rc::clone(&seen);
        let subscription = listeners.subscribe(move |value| sink.set(sink.get() + *value));

        listeners.notify(&2);
        drop(subscription);
        listeners.notify(&5);

        assert_eq!(seen.get(), 2);
        assert!(listeners.is_empty());
    }

    #[test]
    fn listener_may_subscribe_during_notify() {
        let listeners = Listeners::<()>::new();
        let nested: Rc<RefCell<Vec<Subscription>>> = Rc::default();
        let calls = Rc::new(Cell::new(0));

        let inner_listeners = listeners.clone();
        let inner_nested = Rc::clone(&nested);
        let inner_calls = Rc::clone(&calls);
        let _outer = listeners.subscribe(move |_| {
            inner_calls.set(inner_calls.get() + 1);
            let counter = Rc::clone(&inner_calls);
            inner_nested
                .borrow_mut()
                .push(inner_listeners.subscribe(move |_| counter.set(counter.get() + 10)));
        });

        listeners.notify(&());
        assert_eq!(calls.get(), 1);
        assert_eq!(listeners.len(), 2);
    }
}
