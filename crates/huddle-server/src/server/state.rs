//! Hosted server state
//!
//! Presence and the pending broadcast queue live behind one lock so that a
//! queue drain and the recipient lookup for it see the same presence.

use std::sync::Arc;

use huddle_core::ChannelMessage;
use parking_lot::{Mutex, MutexGuard};

use crate::presence::PresenceTracker;

#[derive(Debug, Default)]
pub struct ServerState {
    pub presence: PresenceTracker,
    /// Messages stored since the last broadcast tick, in arrival order
    pub pending: Vec<ChannelMessage>,
}

impl ServerState {
    /// Take every queued message, leaving the queue empty
    pub fn drain_pending(&mut self) -> Vec<ChannelMessage> {
        std::mem::take(&mut self.pending)
    }

    pub fn clear(&mut self) {
        self.presence.clear();
        self.pending.clear();
    }
}

/// Shared handle used by the dispatcher and the scheduler.
///
/// Never hold the guard across an `.await`.
#[derive(Debug, Clone, Default)]
pub struct SharedState(Arc<Mutex<ServerState>>);

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&self) -> MutexGuard<'_, ServerState> {
        self.0.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use huddle_core::BoundedName;

    #[test]
    fn test_drain_empties_queue() {
        let state = SharedState::new();
        state.lock().pending.push(ChannelMessage::new(
            1,
            2,
            3,
            BoundedName::new("a").unwrap(),
            "hi".to_string(),
        ));

        let drained = state.lock().drain_pending();
        assert_eq!(drained.len(), 1);
        assert!(state.lock().pending.is_empty());
    }
}
