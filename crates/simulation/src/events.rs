//! Experiment events and the sinks that consume them.
//!
//! Every component reports what it does through an [`EventSink`] instead of
//! logging directly. Each node gets a child sink from
//! [`EventSink::scoped`], so its events carry the node's identity.
//! [`TracingSink`] forwards to `tracing`; [`NoopSink`] drops everything and
//! is meant for benchmark runs.

use gossip_sim_core::PubSubError;
use gossip_sim_types::{InboundMessage, NodeAddress, NodeId, TopicName};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn, Span};

/// Something that happened during an experiment.
#[derive(Debug)]
pub enum SimEvent<'a> {
    NodeCreated {
        index: usize,
        addresses: &'a [NodeAddress],
    },
    PubSubStarted,
    Connected {
        peer: NodeId,
    },
    TopologyBuilt {
        edges: usize,
    },
    Subscribed {
        topic: &'a TopicName,
    },
    SubscribeFailed {
        topic: &'a TopicName,
        error: &'a PubSubError,
    },
    TopicAssigned {
        topic: &'a TopicName,
        subscribed: usize,
        nodes: usize,
    },
    ActorStarted {
        seed: u64,
    },
    ActorStopped,
    /// The node has no subscriptions and backs off.
    Idle {
        backoff: Duration,
    },
    Publishing {
        topic: &'a TopicName,
        data: &'a [u8],
    },
    PublishFailed {
        topic: &'a TopicName,
        error: &'a PubSubError,
    },
    Received {
        message: &'a InboundMessage,
    },
    ReceiveTimeout {
        topic: &'a TopicName,
    },
    ReceiveFailed {
        topic: &'a TopicName,
        error: &'a PubSubError,
    },
    ConsumerStopped {
        topic: &'a TopicName,
    },
    SetupFailed {
        stage: &'static str,
        error: &'a dyn std::error::Error,
    },
    ExperimentStarting {
        nodes: usize,
    },
    ExperimentStopping,
    AlreadyStopped,
}

impl SimEvent<'_> {
    /// Short stable name of the event kind.
    pub fn kind(&self) -> &'static str {
        match self {
            SimEvent::NodeCreated { .. } => "node_created",
            SimEvent::PubSubStarted => "pubsub_started",
            SimEvent::Connected { .. } => "connected",
            SimEvent::TopologyBuilt { .. } => "topology_built",
            SimEvent::Subscribed { .. } => "subscribed",
            SimEvent::SubscribeFailed { .. } => "subscribe_failed",
            SimEvent::TopicAssigned { .. } => "topic_assigned",
            SimEvent::ActorStarted { .. } => "actor_started",
            SimEvent::ActorStopped => "actor_stopped",
            SimEvent::Idle { .. } => "idle",
            SimEvent::Publishing { .. } => "publishing",
            SimEvent::PublishFailed { .. } => "publish_failed",
            SimEvent::Received { .. } => "received",
            SimEvent::ReceiveTimeout { .. } => "receive_timeout",
            SimEvent::ReceiveFailed { .. } => "receive_failed",
            SimEvent::ConsumerStopped { .. } => "consumer_stopped",
            SimEvent::SetupFailed { .. } => "setup_failed",
            SimEvent::ExperimentStarting { .. } => "experiment_starting",
            SimEvent::ExperimentStopping => "experiment_stopping",
            SimEvent::AlreadyStopped => "already_stopped",
        }
    }
}

/// Receiver of experiment events.
pub trait EventSink: Send + Sync {
    /// Handle one event.
    fn emit(&self, event: SimEvent<'_>);

    /// Child sink whose events are attributed to `node`.
    fn scoped(&self, node: NodeId) -> Arc<dyn EventSink>;
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&self, _event: SimEvent<'_>) {}

    fn scoped(&self, _node: NodeId) -> Arc<dyn EventSink> {
        Arc::new(NoopSink)
    }
}

/// Forwards events to `tracing`.
///
/// Scoped sinks enter a `node` span so every event of that node carries its
/// identity.
#[derive(Debug, Clone)]
pub struct TracingSink {
    span: Span,
}

impl TracingSink {
    /// Root sink, not attributed to any node.
    pub fn new() -> Self {
        Self { span: Span::none() }
    }

    /// Root sink whose node spans are children of `span`.
    pub fn in_span(span: Span) -> Self {
        Self { span }
    }
}

impl Default for TracingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for TracingSink {
    fn emit(&self, event: SimEvent<'_>) {
        let _entered = self.span.enter();
        match event {
            SimEvent::NodeCreated { index, addresses } => {
                debug!(index, ?addresses, "Created node")
            }
            SimEvent::PubSubStarted => debug!("Started pub/sub"),
            SimEvent::Connected { peer } => debug!(%peer, "Connected"),
            SimEvent::TopologyBuilt { edges } => info!(edges, "Built random topology"),
            SimEvent::Subscribed { topic } => debug!(%topic, "Subscribed"),
            SimEvent::SubscribeFailed { topic, error } => {
                warn!(%topic, %error, "Subscribe failed")
            }
            SimEvent::TopicAssigned {
                topic,
                subscribed,
                nodes,
            } => info!(%topic, subscribed, nodes, "Assigned topic"),
            SimEvent::ActorStarted { seed } => debug!(seed, "Started random acting"),
            SimEvent::ActorStopped => debug!("Actor stopped"),
            SimEvent::Idle { backoff } => {
                trace!(backoff_ms = backoff.as_millis() as u64, "No subscriptions, idling")
            }
            SimEvent::Publishing { topic, data } => {
                trace!(%topic, len = data.len(), data = %hex::encode(data), "Publishing")
            }
            SimEvent::PublishFailed { topic, error } => {
                debug!(%topic, %error, "Publish failed")
            }
            SimEvent::Received { message } => trace!(
                from = %message.from,
                seqno = message.seqno,
                topics = ?message.topics,
                data = %hex::encode(&message.data),
                "Received"
            ),
            SimEvent::ReceiveTimeout { topic } => trace!(%topic, "Receive timed out"),
            SimEvent::ReceiveFailed { topic, error } => {
                debug!(%topic, %error, "Receive failed")
            }
            SimEvent::ConsumerStopped { topic } => trace!(%topic, "Consumer stopped"),
            SimEvent::SetupFailed { stage, error } => warn!(stage, %error, "Setup failed"),
            SimEvent::ExperimentStarting { nodes } => info!(nodes, "Starting experiment"),
            SimEvent::ExperimentStopping => info!("Stopping experiment"),
            SimEvent::AlreadyStopped => info!("Experiment already stopped"),
        }
    }

    fn scoped(&self, node: NodeId) -> Arc<dyn EventSink> {
        // An explicit `Span::none()` parent would detach the node span.
        let span = if self.span.is_none() {
            tracing::info_span!("node", id = %node.short())
        } else {
            tracing::info_span!(parent: &self.span, "node", id = %node.short())
        };
        Arc::new(TracingSink { span })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[traced_test]
    #[test]
    fn test_tracing_sink_scopes_node_events() {
        let root = TracingSink::new();
        let node = NodeId([0x11; 32]);
        let scoped = root.scoped(node);

        let topic = TopicName::from("foo");
        scoped.emit(SimEvent::Subscribed { topic: &topic });
        root.emit(SimEvent::ExperimentStarting { nodes: 3 });

        assert!(logs_contain("Subscribed"));
        assert!(logs_contain("111111111111"));
        assert!(logs_contain("Starting experiment"));
    }

    #[traced_test]
    #[test]
    fn test_node_spans_nest_under_parent_span() {
        let root = TracingSink::in_span(tracing::info_span!("experiment", run = 7));
        let scoped = root.scoped(NodeId([0x22; 32]));

        scoped.emit(SimEvent::PubSubStarted);

        assert!(logs_contain("experiment{run=7}:node{id=222222222222}"));
        assert!(logs_contain("Started pub/sub"));
    }

    #[traced_test]
    #[test]
    fn test_node_span_created_under_current_span() {
        let outer = tracing::info_span!("caller");
        let scoped = outer.in_scope(|| TracingSink::new().scoped(NodeId([0x33; 32])));

        scoped.emit(SimEvent::ActorStopped);

        assert!(logs_contain("caller:node{id=333333333333}"));
    }

    #[test]
    fn test_event_kind_names() {
        let topic = TopicName::from("foo");
        assert_eq!(SimEvent::Subscribed { topic: &topic }.kind(), "subscribed");
        assert_eq!(
            SimEvent::Idle {
                backoff: Duration::from_secs(1)
            }
            .kind(),
            "idle"
        );
        assert_eq!(SimEvent::AlreadyStopped.kind(), "already_stopped");
    }

    #[test]
    fn test_noop_sink_accepts_everything() {
        let sink = NoopSink;
        let scoped = sink.scoped(NodeId([0; 32]));
        scoped.emit(SimEvent::ExperimentStopping);
        sink.emit(SimEvent::PubSubStarted);
    }
}
