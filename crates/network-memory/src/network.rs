//! In-process network: node registry and connection bookkeeping.

use crate::faults::FaultPlan;
use crate::pubsub::MemoryPubSub;
use async_trait::async_trait;
use gossip_sim_core::{Network, NetworkError, NetworkNode, PubSubOptions};
use gossip_sim_types::{
    InboundMessage, NodeAddress, NodeId, NodeKeypair, PeerInfo, TopicName,
};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Configuration for the in-memory network.
#[derive(Debug, Clone)]
pub struct MemoryNetworkConfig {
    /// Per-subscription inbound buffer. Deliveries to a full buffer are dropped.
    pub subscription_capacity: NonZeroUsize,

    /// First port handed out in node addresses.
    pub first_port: u64,
}

impl Default for MemoryNetworkConfig {
    fn default() -> Self {
        Self {
            subscription_capacity: NonZeroUsize::new(1024).unwrap_or(NonZeroUsize::MIN),
            first_port: 10_000,
        }
    }
}

/// Delivery counters for the whole network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetworkStats {
    /// Connect calls made, successful or not.
    pub connect_attempts: u64,
    /// Messages accepted by `publish`.
    pub published: u64,
    /// Messages placed in a subscriber buffer.
    pub delivered: u64,
    /// Messages lost to full subscriber buffers.
    pub dropped: u64,
}

/// State of one hosted node, shared between its handle, its pub/sub
/// service and the network registry.
pub(crate) struct PeerState {
    pub(crate) id: NodeId,
    pub(crate) keypair: NodeKeypair,
    pub(crate) address: NodeAddress,
    pub(crate) connections: Mutex<BTreeSet<NodeId>>,
    /// Open subscription senders by topic.
    pub(crate) subscribers: Mutex<HashMap<TopicName, mpsc::Sender<InboundMessage>>>,
    pub(crate) pubsub_started: AtomicBool,
    pub(crate) next_seqno: AtomicU64,
}

pub(crate) struct Shared {
    pub(crate) config: MemoryNetworkConfig,
    peers: RwLock<HashMap<NodeId, Arc<PeerState>>>,
    pub(crate) faults: RwLock<FaultPlan>,
    next_port: AtomicU64,
    connect_attempts: AtomicU64,
    pub(crate) published: AtomicU64,
    pub(crate) delivered: AtomicU64,
    pub(crate) dropped: AtomicU64,
}

impl Shared {
    pub(crate) fn peer(&self, id: &NodeId) -> Option<Arc<PeerState>> {
        self.peers.read().get(id).cloned()
    }

    /// Flood `message` from `origin` along the connection graph.
    ///
    /// Every node reachable from the origin that holds an open subscription
    /// to one of the message's topics gets one copy. The origin itself is
    /// skipped.
    pub(crate) fn flood(&self, origin: &NodeId, message: &InboundMessage) {
        let mut visited = HashSet::from([*origin]);
        let mut queue = VecDeque::from([*origin]);

        while let Some(current) = queue.pop_front() {
            let Some(peer) = self.peer(&current) else {
                continue;
            };

            if current != *origin {
                self.deliver_local(&peer, message);
            }

            let neighbours: Vec<NodeId> = peer.connections.lock().iter().copied().collect();
            for next in neighbours {
                if visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }
    }

    fn deliver_local(&self, peer: &PeerState, message: &InboundMessage) {
        let mut subscribers = peer.subscribers.lock();
        for topic in &message.topics {
            let Some(sender) = subscribers.get(topic) else {
                continue;
            };

            match sender.try_send(message.clone()) {
                Ok(()) => {
                    self.delivered.fetch_add(1, Ordering::Relaxed);
                    trace!(to = %peer.id, topic = %topic, seqno = message.seqno, "Delivered");
                }
                Err(mpsc::error::TrySendError::Full(_)) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    trace!(to = %peer.id, topic = %topic, "Subscriber buffer full, dropping");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    subscribers.remove(topic);
                }
            }
        }
    }
}

/// An in-process network hosting simulated nodes.
///
/// Cheap to clone; clones share the same nodes.
#[derive(Clone)]
pub struct MemoryNetwork {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for MemoryNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryNetwork")
            .field("config", &self.shared.config)
            .field("nodes", &self.node_count())
            .finish()
    }
}

impl Default for MemoryNetwork {
    fn default() -> Self {
        Self::new(MemoryNetworkConfig::default())
    }
}

impl MemoryNetwork {
    /// Create an empty network.
    pub fn new(config: MemoryNetworkConfig) -> Self {
        let first_port = config.first_port;
        Self {
            shared: Arc::new(Shared {
                config,
                peers: RwLock::new(HashMap::new()),
                faults: RwLock::new(FaultPlan::none()),
                next_port: AtomicU64::new(first_port),
                connect_attempts: AtomicU64::new(0),
                published: AtomicU64::new(0),
                delivered: AtomicU64::new(0),
                dropped: AtomicU64::new(0),
            }),
        }
    }

    /// Replace the active fault plan.
    pub fn set_faults(&self, faults: FaultPlan) {
        *self.shared.faults.write() = faults;
    }

    /// Number of hosted nodes.
    pub fn node_count(&self) -> usize {
        self.shared.peers.read().len()
    }

    /// All connections as `(lower, higher)` identity pairs, sorted.
    pub fn edges(&self) -> Vec<(NodeId, NodeId)> {
        let peers = self.shared.peers.read();
        let mut edges = BTreeSet::new();
        for peer in peers.values() {
            for other in peer.connections.lock().iter() {
                let edge = if peer.id < *other {
                    (peer.id, *other)
                } else {
                    (*other, peer.id)
                };
                edges.insert(edge);
            }
        }
        edges.into_iter().collect()
    }

    /// Snapshot of the network-wide counters.
    pub fn stats(&self) -> NetworkStats {
        NetworkStats {
            connect_attempts: self.shared.connect_attempts.load(Ordering::Relaxed),
            published: self.shared.published.load(Ordering::Relaxed),
            delivered: self.shared.delivered.load(Ordering::Relaxed),
            dropped: self.shared.dropped.load(Ordering::Relaxed),
        }
    }

    /// Close every open subscription on `node`.
    ///
    /// Pending receives on those subscriptions fail from then on.
    pub fn close_subscriptions(&self, node: &NodeId) {
        if let Some(peer) = self.shared.peer(node) {
            peer.subscribers.lock().clear();
        }
    }
}

#[async_trait]
impl Network for MemoryNetwork {
    type Node = MemoryNode;

    async fn create_node(&self, keypair: NodeKeypair) -> Result<MemoryNode, NetworkError> {
        let id = keypair.node_id();
        let port = self.shared.next_port.fetch_add(1, Ordering::Relaxed);
        let address = NodeAddress(format!("/memory/{}", port));

        let peer = Arc::new(PeerState {
            id,
            keypair,
            address: address.clone(),
            connections: Mutex::new(BTreeSet::new()),
            subscribers: Mutex::new(HashMap::new()),
            pubsub_started: AtomicBool::new(false),
            next_seqno: AtomicU64::new(1),
        });

        {
            let mut peers = self.shared.peers.write();
            if peers.contains_key(&id) {
                return Err(NetworkError::DuplicateIdentity(id));
            }
            peers.insert(id, Arc::clone(&peer));
        }

        debug!(node = %id, %address, "Created node");

        Ok(MemoryNode {
            peer,
            shared: Arc::clone(&self.shared),
        })
    }
}

/// Handle to a node hosted by a [`MemoryNetwork`].
pub struct MemoryNode {
    peer: Arc<PeerState>,
    shared: Arc<Shared>,
}

impl std::fmt::Debug for MemoryNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryNode")
            .field("id", &self.peer.id)
            .field("address", &self.peer.address)
            .finish()
    }
}

#[async_trait]
impl NetworkNode for MemoryNode {
    type PubSub = MemoryPubSub;

    fn id(&self) -> NodeId {
        self.peer.id
    }

    fn addresses(&self) -> Vec<NodeAddress> {
        vec![self.peer.address.clone()]
    }

    async fn connect(&self, target: &PeerInfo) -> Result<(), NetworkError> {
        let attempts = self.shared.connect_attempts.fetch_add(1, Ordering::Relaxed);
        if self.shared.faults.read().connect_fails(attempts) {
            return Err(NetworkError::Dial(format!(
                "injected failure dialing {}",
                target.id
            )));
        }

        if target.id == self.peer.id {
            return Err(NetworkError::DialSelf(target.id));
        }

        let remote = self
            .shared
            .peer(&target.id)
            .ok_or(NetworkError::PeerUnreachable(target.id))?;

        if !target.addresses.is_empty() && !target.addresses.contains(&remote.address) {
            return Err(NetworkError::Dial(format!(
                "no listen address of {} matches",
                target.id
            )));
        }

        self.peer.connections.lock().insert(remote.id);
        remote.connections.lock().insert(self.peer.id);

        debug!(from = %self.peer.id, to = %remote.id, "Connected");
        Ok(())
    }

    fn connections(&self) -> Vec<NodeId> {
        self.peer.connections.lock().iter().copied().collect()
    }

    fn is_connected_to(&self, peer: &NodeId) -> bool {
        self.peer.connections.lock().contains(peer)
    }

    async fn start_pubsub(&self, options: PubSubOptions) -> Result<MemoryPubSub, NetworkError> {
        if self
            .shared
            .faults
            .read()
            .fail_pubsub_start_on
            .contains(&self.peer.id)
        {
            return Err(NetworkError::Dial(format!(
                "injected pub/sub start failure on {}",
                self.peer.id
            )));
        }

        if self.peer.pubsub_started.swap(true, Ordering::SeqCst) {
            return Err(NetworkError::PubSubAlreadyStarted(self.peer.id));
        }

        Ok(MemoryPubSub::new(
            Arc::clone(&self.peer),
            Arc::clone(&self.shared),
            options,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    async fn two_nodes(network: &MemoryNetwork) -> (MemoryNode, MemoryNode) {
        let a = network.create_node(NodeKeypair::generate()).await.unwrap();
        let b = network.create_node(NodeKeypair::generate()).await.unwrap();
        (a, b)
    }

    #[tokio::test]
    async fn test_nodes_get_distinct_addresses() {
        let network = MemoryNetwork::default();
        let (a, b) = two_nodes(&network).await;

        assert_ne!(a.id(), b.id());
        assert_ne!(a.addresses(), b.addresses());
        assert_eq!(a.addresses()[0].as_str(), "/memory/10000");
        assert_eq!(network.node_count(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_identity_rejected() {
        let network = MemoryNetwork::default();
        let keypair = NodeKeypair::from_seed(&[9; 32]);
        network.create_node(keypair.clone()).await.unwrap();

        let err = network.create_node(keypair).await.unwrap_err();
        assert!(matches!(err, NetworkError::DuplicateIdentity(_)));
    }

    #[tokio::test]
    async fn test_connect_is_symmetric() {
        let network = MemoryNetwork::default();
        let (a, b) = two_nodes(&network).await;

        a.connect(&b.peer_info()).await.unwrap();

        assert!(a.is_connected_to(&b.id()));
        assert!(b.is_connected_to(&a.id()));
        assert_eq!(b.connections(), vec![a.id()]);
        assert_eq!(network.edges().len(), 1);
    }

    #[traced_test]
    #[tokio::test]
    async fn test_connect_is_logged() {
        let network = MemoryNetwork::default();
        let (a, b) = two_nodes(&network).await;
        a.connect(&b.peer_info()).await.unwrap();

        assert!(logs_contain("Created node"));
        assert!(logs_contain("Connected"));
    }

    #[tokio::test]
    async fn test_connect_twice_keeps_single_edge() {
        let network = MemoryNetwork::default();
        let (a, b) = two_nodes(&network).await;

        a.connect(&b.peer_info()).await.unwrap();
        b.connect(&a.peer_info()).await.unwrap();

        assert_eq!(a.connections().len(), 1);
        assert_eq!(network.edges().len(), 1);
        assert_eq!(network.stats().connect_attempts, 2);
    }

    #[tokio::test]
    async fn test_dial_self_and_unknown_peer_fail() {
        let network = MemoryNetwork::default();
        let (a, _) = two_nodes(&network).await;

        let err = a.connect(&a.peer_info()).await.unwrap_err();
        assert!(matches!(err, NetworkError::DialSelf(_)));

        let stranger = NodeKeypair::generate().node_id();
        let err = a.connect(&PeerInfo::new(stranger, vec![])).await.unwrap_err();
        assert!(matches!(err, NetworkError::PeerUnreachable(_)));
        assert!(a.connections().is_empty());
    }

    #[tokio::test]
    async fn test_wrong_address_fails_dial() {
        let network = MemoryNetwork::default();
        let (a, b) = two_nodes(&network).await;

        let bogus = PeerInfo::new(b.id(), vec![NodeAddress("/memory/1".to_string())]);
        let err = a.connect(&bogus).await.unwrap_err();
        assert!(matches!(err, NetworkError::Dial(_)));
    }

    #[tokio::test]
    async fn test_injected_connect_failure() {
        let network = MemoryNetwork::default();
        let (a, b) = two_nodes(&network).await;
        network.set_faults(FaultPlan::none().with_connect_failures_after(0));

        assert!(a.connect(&b.peer_info()).await.is_err());
        assert!(a.connections().is_empty());
    }

    #[tokio::test]
    async fn test_pubsub_starts_once() {
        let network = MemoryNetwork::default();
        let (a, _) = two_nodes(&network).await;

        a.start_pubsub(PubSubOptions::default()).await.unwrap();
        let err = a.start_pubsub(PubSubOptions::default()).await.unwrap_err();
        assert!(matches!(err, NetworkError::PubSubAlreadyStarted(_)));
    }
}
