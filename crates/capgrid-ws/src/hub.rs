use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use cap_core::Scope;
use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

struct Subscriber {
    id: u64,
    sender: UnboundedSender<Value>,
}

/// Handle returned by [`WsHub::subscribe`]; the id is needed to
/// unsubscribe explicitly. Dropping the receiver is enough for
/// cleanup, the dead sender is pruned on the next publish.
pub struct WsSubscription {
    pub id: u64,
    pub receiver: UnboundedReceiver<Value>,
}

/// Fan-out hub keyed by `(scope, channel)`.
#[derive(Default)]
pub struct WsHub {
    channels: RwLock<HashMap<(Scope, String), Vec<Subscriber>>>,
    next_id: AtomicU64,
}

impl WsHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscriber on `(scope, channel)`.
    pub fn subscribe(&self, scope: &Scope, channel: &str) -> WsSubscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut channels = self.channels.write().unwrap();
        channels
            .entry((scope.clone(), channel.to_string()))
            .or_default()
            .push(Subscriber { id, sender });
        WsSubscription { id, receiver }
    }

    /// Removes a subscriber. Returns `false` when it was already gone.
    pub fn unsubscribe(&self, scope: &Scope, channel: &str, id: u64) -> bool {
        let mut channels = self.channels.write().unwrap();
        let key = (scope.clone(), channel.to_string());
        let Some(subs) = channels.get_mut(&key) else {
            return false;
        };
        let before = subs.len();
        subs.retain(|s| s.id != id);
        let removed = subs.len() < before;
        if subs.is_empty() {
            channels.remove(&key);
        }
        removed
    }

    /// Delivers a payload to every live subscriber of `(scope, channel)`,
    /// pruning closed ones. Returns the number delivered.
    pub fn publish(&self, scope: &Scope, channel: &str, payload: &Value) -> usize {
        let mut channels = self.channels.write().unwrap();
        let key = (scope.clone(), channel.to_string());
        let Some(subs) = channels.get_mut(&key) else {
            return 0;
        };
        subs.retain(|s| s.sender.send(payload.clone()).is_ok());
        let delivered = subs.len();
        if subs.is_empty() {
            channels.remove(&key);
        }
        debug!(%scope, channel, delivered, "published event");
        delivered
    }
}

// ── Tests ───────────────────────────────────────────────────────────────
