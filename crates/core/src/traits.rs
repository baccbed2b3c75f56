//! Capability traits for nodes, connections and pub/sub.

use crate::{NetworkError, PubSubError};
use async_trait::async_trait;
use gossip_sim_types::{InboundMessage, NodeAddress, NodeId, NodeKeypair, PeerInfo, TopicName};

/// A network that can host simulated nodes.
///
/// Implemented by the in-memory network for tests and the CLI. A libp2p
/// backed implementation would create one host per call.
#[async_trait]
pub trait Network: Send + Sync + 'static {
    /// The node handle this network hands out.
    type Node: NetworkNode;

    /// Create an addressable node whose identity is derived from `keypair`.
    ///
    /// The network picks the node's listen address.
    async fn create_node(&self, keypair: NodeKeypair) -> Result<Self::Node, NetworkError>;
}

/// A node hosted by a [`Network`].
///
/// Connections are bidirectional: once `a.connect(b)` succeeds, both `a` and
/// `b` report the connection.
#[async_trait]
pub trait NetworkNode: Send + Sync + 'static {
    /// The pub/sub handle started on this node.
    type PubSub: PubSub;

    /// This node's identity.
    fn id(&self) -> NodeId;

    /// Addresses this node listens on.
    fn addresses(&self) -> Vec<NodeAddress>;

    /// Identity plus addresses, as needed by a dialing peer.
    fn peer_info(&self) -> PeerInfo {
        PeerInfo::new(self.id(), self.addresses())
    }

    /// Open a connection to `peer`.
    async fn connect(&self, peer: &PeerInfo) -> Result<(), NetworkError>;

    /// Identities of all peers this node currently holds a connection to.
    fn connections(&self) -> Vec<NodeId>;

    /// Whether a connection to `peer` exists.
    fn is_connected_to(&self, peer: &NodeId) -> bool {
        self.connections().contains(peer)
    }

    /// Start the pub/sub service on this node.
    ///
    /// Called once per node, before any topic is subscribed.
    async fn start_pubsub(&self, options: PubSubOptions) -> Result<Self::PubSub, NetworkError>;
}

/// Options for starting a node's pub/sub service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PubSubOptions {
    /// Sign every published message with the node's key.
    pub sign_messages: bool,
}

impl Default for PubSubOptions {
    fn default() -> Self {
        Self {
            sign_messages: true,
        }
    }
}

/// Per-node publish/subscribe handle.
#[async_trait]
pub trait PubSub: Send + Sync + 'static {
    /// Stream of messages for one subscribed topic.
    type Subscription: Subscription;

    /// Subscribe to `topic`.
    ///
    /// After this returns, messages published on `topic` by other nodes are
    /// delivered to the returned subscription.
    async fn subscribe(&self, topic: &TopicName) -> Result<Self::Subscription, PubSubError>;

    /// Publish an opaque payload on `topic`.
    async fn publish(&self, topic: &TopicName, data: Vec<u8>) -> Result<(), PubSubError>;

    /// Topics this node is currently subscribed to, in no particular order.
    fn topics(&self) -> Vec<TopicName>;
}

/// A live subscription to one topic.
#[async_trait]
pub trait Subscription: Send + 'static {
    /// The topic this subscription receives.
    fn topic(&self) -> &TopicName;

    /// Wait for the next inbound message.
    ///
    /// May wait forever; callers bound it with a timeout. Must be cancel
    /// safe: dropping the future loses no message.
    async fn next(&mut self) -> Result<InboundMessage, PubSubError>;
}
