//! Scoped injection of third-party `<script>` elements.

mod loader;
mod request;
mod state;

pub use loader::{ScriptCallbacks, ScriptEventCallback, ScriptLoader};
pub use request::{CrossOrigin, ScriptRequest};
pub use state::ScriptLoadState;
