//! Errors reported by the network and pub/sub layer.

use gossip_sim_types::{NodeId, TopicName};
use thiserror::Error;

/// Errors from node creation and connection management.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// No node with this identity is reachable.
    #[error("Peer unreachable: {0}")]
    PeerUnreachable(NodeId),

    /// A node tried to dial itself.
    #[error("Refusing to dial self: {0}")]
    DialSelf(NodeId),

    /// Another node already uses this identity.
    #[error("Duplicate node identity: {0}")]
    DuplicateIdentity(NodeId),

    /// Pub/sub was started twice on the same node.
    #[error("Pub/sub already started on {0}")]
    PubSubAlreadyStarted(NodeId),

    /// Dial failed for a transport-specific reason.
    #[error("Dial failed: {0}")]
    Dial(String),

    /// The network is shutting down.
    #[error("Network shutting down")]
    Shutdown,
}

/// Errors from pub/sub operations.
#[derive(Debug, Error)]
pub enum PubSubError {
    /// The node is already subscribed to this topic.
    #[error("Already subscribed to {0}")]
    AlreadySubscribed(TopicName),

    /// Subscribe was rejected.
    #[error("Subscribe to {topic} failed: {reason}")]
    Subscribe { topic: TopicName, reason: String },

    /// Publish was rejected.
    #[error("Publish to {topic} failed: {reason}")]
    Publish { topic: TopicName, reason: String },

    /// The subscription has been closed and will never yield another message.
    #[error("Subscription to {0} closed")]
    SubscriptionClosed(TopicName),

    /// The pub/sub service is shutting down.
    #[error("Pub/sub shutting down")]
    Shutdown,
}
