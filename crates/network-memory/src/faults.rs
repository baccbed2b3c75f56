//! On-demand failures for the in-memory network.

use gossip_sim_types::{NodeId, TopicName};
use std::collections::HashSet;

/// Which operations the in-memory network should refuse.
///
/// Faults are checked at call time, so a plan can be changed while an
/// experiment is running.
#[derive(Debug, Clone, Default)]
pub struct FaultPlan {
    /// Fail every connect attempt after this many have been made.
    pub fail_connects_after: Option<u64>,

    /// Nodes whose subscribe calls fail.
    pub fail_subscribe_on: HashSet<NodeId>,

    /// Topics no node can subscribe to.
    pub fail_subscribe_topics: HashSet<TopicName>,

    /// Nodes whose pub/sub service fails to start.
    pub fail_pubsub_start_on: HashSet<NodeId>,

    /// Fail every publish.
    pub fail_publish: bool,
}

impl FaultPlan {
    /// A plan with no faults.
    pub fn none() -> Self {
        Self::default()
    }

    /// Fail connects once `attempts` connect calls have been made.
    pub fn with_connect_failures_after(mut self, attempts: u64) -> Self {
        self.fail_connects_after = Some(attempts);
        self
    }

    /// Fail subscribe calls on `node`.
    pub fn with_subscribe_failure(mut self, node: NodeId) -> Self {
        self.fail_subscribe_on.insert(node);
        self
    }

    /// Fail subscribe calls for `topic` on every node.
    pub fn with_topic_subscribe_failure(mut self, topic: impl Into<TopicName>) -> Self {
        self.fail_subscribe_topics.insert(topic.into());
        self
    }

    /// Fail pub/sub start on `node`.
    pub fn with_pubsub_start_failure(mut self, node: NodeId) -> Self {
        self.fail_pubsub_start_on.insert(node);
        self
    }

    /// Fail every publish.
    pub fn with_publish_failures(mut self) -> Self {
        self.fail_publish = true;
        self
    }

    pub(crate) fn subscribe_fails(&self, node: &NodeId, topic: &TopicName) -> bool {
        self.fail_subscribe_on.contains(node) || self.fail_subscribe_topics.contains(topic)
    }

    pub(crate) fn connect_fails(&self, attempts_so_far: u64) -> bool {
        self.fail_connects_after
            .is_some_and(|limit| attempts_so_far >= limit)
    }
}
