//! Configuration types for an experiment.

use crate::error::ConfigError;
use crate::topology::DEFAULT_MAX_REDRAWS;
use gossip_sim_types::TopicTable;
use std::time::Duration;

/// Configuration for one experiment run.
#[derive(Clone, Debug)]
pub struct ExperimentConfig {
    /// Number of nodes to create.
    pub node_count: usize,

    /// Target number of connections per node.
    pub degree: usize,

    /// Topics and their subscription chances, assigned in table order.
    pub topics: TopicTable,

    /// Seed for the topology.
    pub seed: u64,

    /// Base seed for topic assignment; topic `i` is assigned with
    /// `base + i`. Falls back to `seed` when unset.
    pub topic_seed: Option<u64>,

    /// Publish loop parameters.
    pub actor: ActorConfig,

    /// How long a consumer waits for one message before logging a timeout.
    pub receive_timeout: Duration,

    /// Consecutive duplicate-edge redraws tolerated per node while building
    /// the topology.
    pub max_redraws: usize,

    /// Have the pub/sub layer sign published messages.
    pub sign_messages: bool,
}

impl ExperimentConfig {
    /// Create a configuration with no topics and default timings.
    pub fn new(node_count: usize, degree: usize) -> Self {
        Self {
            node_count,
            degree,
            topics: TopicTable::new(),
            seed: 123,
            topic_seed: None,
            actor: ActorConfig::default(),
            receive_timeout: Duration::from_secs(5),
            max_redraws: DEFAULT_MAX_REDRAWS,
            sign_messages: true,
        }
    }

    /// Set the topic table.
    pub fn with_topics(mut self, topics: TopicTable) -> Self {
        self.topics = topics;
        self
    }

    /// Set the setup seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Assign topics from their own seed instead of the topology seed.
    pub fn with_topic_seed(mut self, seed: u64) -> Self {
        self.topic_seed = Some(seed);
        self
    }

    /// Seed used for the topic at `position` in the table.
    pub fn topic_seed_for(&self, position: usize) -> u64 {
        self.topic_seed
            .unwrap_or(self.seed)
            .wrapping_add(position as u64)
    }

    /// Set the publish loop parameters.
    pub fn with_actor(mut self, actor: ActorConfig) -> Self {
        self.actor = actor;
        self
    }

    /// Set the consumer receive window.
    pub fn with_receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = timeout;
        self
    }

    /// Set the redraw bound used by the topology builder.
    pub fn with_max_redraws(mut self, max_redraws: usize) -> Self {
        self.max_redraws = max_redraws;
        self
    }

    /// Enable or disable message signing.
    pub fn with_message_signing(mut self, sign: bool) -> Self {
        self.sign_messages = sign;
        self
    }

    /// Check every parameter before anything is created.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_degree(self.node_count, self.degree)?;

        for topic in self.topics.iter() {
            if topic.name.as_str().is_empty() {
                return Err(ConfigError::EmptyTopicName);
            }
            check_chance(topic.name.as_str(), topic.chance)?;
        }

        if self.receive_timeout.is_zero() {
            return Err(ConfigError::ZeroReceiveTimeout);
        }

        self.actor.validate()
    }
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self::new(100, 10)
    }
}

/// Parameters of a node's publish loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActorConfig {
    /// Shortest pause between two publishes.
    pub min_delay: Duration,

    /// Longest pause between two publishes.
    pub max_delay: Duration,

    /// Pause while the node has no subscriptions.
    pub idle_backoff: Duration,

    /// Smallest payload in bytes.
    pub min_payload: usize,

    /// Largest payload in bytes.
    pub max_payload: usize,
}

impl Default for ActorConfig {
    fn default() -> Self {
        let min_delay = Duration::from_millis(100);
        Self {
            min_delay,
            max_delay: Duration::from_millis(300),
            idle_backoff: min_delay * 10,
            min_payload: 10,
            max_payload: 10,
        }
    }
}

impl ActorConfig {
    /// Set the inclusive inter-publish delay range.
    pub fn with_delay(mut self, min: Duration, max: Duration) -> Self {
        self.min_delay = min;
        self.max_delay = max;
        self
    }

    /// Set the idle back-off.
    pub fn with_idle_backoff(mut self, backoff: Duration) -> Self {
        self.idle_backoff = backoff;
        self
    }

    /// Set the inclusive payload size range.
    pub fn with_payload_size(mut self, min: usize, max: usize) -> Self {
        self.min_payload = min;
        self.max_payload = max;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_delay > self.max_delay {
            return Err(ConfigError::InvalidDelayRange {
                min: self.min_delay,
                max: self.max_delay,
            });
        }
        if self.min_payload > self.max_payload {
            return Err(ConfigError::InvalidPayloadRange {
                min: self.min_payload,
                max: self.max_payload,
            });
        }
        if self.idle_backoff.is_zero() {
            return Err(ConfigError::ZeroIdleBackoff);
        }
        Ok(())
    }
}

/// Degree must be at least 1 and the node count at least `degree + 2`.
///
/// Candidates are drawn at offsets `1..=n-2` from a node, so a node can never
/// dial its predecessor itself. With `degree == n - 1` the first node would
/// need all `n - 1` peers but can only reach `n - 2`.
pub(crate) fn check_degree(node_count: usize, degree: usize) -> Result<(), ConfigError> {
    if degree < 1 {
        return Err(ConfigError::InvalidDegree(degree));
    }
    if degree > node_count.saturating_sub(2) {
        return Err(ConfigError::InsufficientNodes {
            nodes: node_count,
            degree,
        });
    }
    Ok(())
}

pub(crate) fn check_chance(topic: &str, chance: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&chance) {
        return Err(ConfigError::InvalidChance {
            topic: topic.to_string(),
            chance,
        });
    }
    Ok(())
}
