//! Event listeners
//!
//! Listeners are shared closures. Removal matches by pointer identity,
//! the same way `removeEventListener` matches the function it was given.
//! Only the bubble phase exists: dispatch runs the target's listeners and
//! then each ancestor's, innermost first.

use crate::document::Element;
use std::fmt;
use std::sync::Arc;

/// Event callback
pub type Listener = Arc<dyn Fn(&Event) + Send + Sync>;

/// Wrap a closure as a [`Listener`]. Keep the returned value around to `off()` it later.
pub fn listener<F>(f: F) -> Listener
where
    F: Fn(&Event) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// An event travelling from its target up through the ancestors
#[derive(Clone)]
pub struct Event {
    pub event_type: String,
    /// Element the event was dispatched on
    pub target: Element,
    /// Element whose listener is currently running
    pub current_target: Element,
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("event_type", &self.event_type)
            .field("target", &self.target.id())
            .field("current_target", &self.current_target.id())
            .finish()
    }
}
