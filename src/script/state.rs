use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use futures::channel::oneshot;

use crate::util::{Listeners, Subscription};

/// Shared `loaded` flag of one script acquisition.
///
/// Clones observe the same flag. Listeners run only when the value actually changes, so a
/// successful load is announced exactly once.
#[derive(Clone, Default)]
pub struct ScriptLoadState {
    loaded: Rc<Cell<bool>>,
    listeners: Listeners<bool>,
}

impl ScriptLoadState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.get()
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(bool) + 'static,
    {
        self.listeners.subscribe(move |loaded: &bool| listener(*loaded))
    }

    /// Resolves once the script has loaded. Resolves immediately when it already has, and
    /// also when the state is dropped without ever loading.
    pub fn when_loaded(&self) -> impl Future<Output = ()> + 'static {
        let (sender, receiver) = oneshot::channel::<()>();
        let subscription = if self.is_loaded() {
            let _ = sender.send(());
            None
        } else {
            let sender = RefCell::new(Some(sender));
            Some(self.subscribe(move |loaded| {
                if loaded {
                    if let Some(sender) = sender.borrow_mut().take() {
                        let _ = sender.send(());
                    }
                }
            }))
        };

        async move {
            let _subscription = subscription;
            let _ = receiver.await;
        }
    }

    /// Returns `true` when the flag changed.
    pub(crate) fn set_loaded(&self, loaded: bool) -> bool {
        if self.loaded.replace(loaded) == loaded {
            return false;
        }
        self.listeners.notify(&loaded);
        true
    }
}

impl fmt::Debug for ScriptLoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptLoadState")
            .field("loaded", &self.is_loaded())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
