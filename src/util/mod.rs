mod subscribe;

pub use subscribe::{Listener, Listeners, Subscription};
