//! capgrid-ws — in-process pub/sub hub for server-pushed events.
//!
//! Applets publish onto `(scope, channel)`; the host application owns
//! the actual WebSocket upgrade and pumps each subscriber's receiver
//! into its connection. Closed subscribers are pruned on the next
//! publish to their channel.

pub mod hub;

pub use hub::{WsHub, WsSubscription};
