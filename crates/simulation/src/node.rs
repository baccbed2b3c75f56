//! A node taking part in an experiment.

use crate::events::EventSink;
use gossip_sim_core::{NetworkNode, PubSub};
use gossip_sim_types::{NodeId, TopicName};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Running counters of one node.
///
/// Updated concurrently by the node's actor and consumers, read by the stats
/// reporter. Only totals matter, so all accesses are relaxed.
#[derive(Debug, Default)]
pub struct NodeCounters {
    sent: AtomicU64,
    received: AtomicU64,
    publish_errors: AtomicU64,
    receive_errors: AtomicU64,
    receive_timeouts: AtomicU64,
}

impl NodeCounters {
    pub fn record_sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_publish_error(&self) {
        self.publish_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_receive_error(&self) {
        self.receive_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_receive_timeout(&self) {
        self.receive_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter.
    pub fn snapshot(&self) -> NodeStats {
        NodeStats {
            sent: self.sent.load(Ordering::Relaxed),
            received: self.received.load(Ordering::Relaxed),
            publish_errors: self.publish_errors.load(Ordering::Relaxed),
            receive_errors: self.receive_errors.load(Ordering::Relaxed),
            receive_timeouts: self.receive_timeouts.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of a node's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NodeStats {
    pub sent: u64,
    pub received: u64,
    pub publish_errors: u64,
    pub receive_errors: u64,
    pub receive_timeouts: u64,
}

/// A network node with its pub/sub handle, counters and event sink.
pub struct SimNode<H: NetworkNode> {
    index: usize,
    handle: H,
    pubsub: H::PubSub,
    counters: NodeCounters,
    sink: Arc<dyn EventSink>,
}

impl<H: NetworkNode> SimNode<H> {
    pub fn new(index: usize, handle: H, pubsub: H::PubSub, sink: Arc<dyn EventSink>) -> Self {
        Self {
            index,
            handle,
            pubsub,
            counters: NodeCounters::default(),
            sink,
        }
    }

    /// Position in the experiment's node list.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn id(&self) -> NodeId {
        self.handle.id()
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }

    pub fn pubsub(&self) -> &H::PubSub {
        &self.pubsub
    }

    pub fn counters(&self) -> &NodeCounters {
        &self.counters
    }

    /// Sink scoped to this node.
    pub fn sink(&self) -> &dyn EventSink {
        self.sink.as_ref()
    }

    /// Number of peers this node is connected to.
    pub fn degree(&self) -> usize {
        self.handle.connections().len()
    }

    /// Subscribed topics, sorted by name.
    pub fn subscriptions(&self) -> Vec<TopicName> {
        let mut topics = self.pubsub.topics();
        topics.sort();
        topics
    }

    pub fn stats(&self) -> NodeStats {
        self.counters.snapshot()
    }
}

impl<H: NetworkNode> std::fmt::Debug for SimNode<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimNode")
            .field("index", &self.index)
            .field("id", &self.id())
            .field("stats", &self.stats())
            .finish()
    }
}
