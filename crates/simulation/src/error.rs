//! Error types for experiment setup.
//!
//! Only setup can fail. Once an experiment runs, publish and receive
//! failures are reported through events and counters instead.

use gossip_sim_core::{NetworkError, PubSubError};
use gossip_sim_types::{NodeId, TopicName};
use std::time::Duration;
use thiserror::Error;

/// Invalid experiment parameters. Detected before anything is created.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid degree {0}, must be at least 1")]
    InvalidDegree(usize),

    #[error("Not enough nodes ({nodes}) to peer them with degree {degree}, need at least degree + 2")]
    InsufficientNodes { nodes: usize, degree: usize },

    #[error("Subscription chance {chance} for topic {topic:?} is outside [0, 1]")]
    InvalidChance { topic: String, chance: f64 },

    #[error("Topic name must not be empty")]
    EmptyTopicName,

    #[error("Invalid publish delay range {min:?}..={max:?}")]
    InvalidDelayRange { min: Duration, max: Duration },

    #[error("Invalid payload size range {min}..={max}")]
    InvalidPayloadRange { min: usize, max: usize },

    #[error("Idle back-off must be non-zero")]
    ZeroIdleBackoff,

    #[error("Receive timeout must be non-zero")]
    ZeroReceiveTimeout,
}

/// Errors while building the random topology.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Too many consecutive draws hit peers the node was already connected to.
    #[error("Node {node} (index {index}) stuck at degree {degree}/{target} after {redraws} redraws")]
    RedrawLimit {
        node: NodeId,
        index: usize,
        degree: usize,
        target: usize,
        redraws: usize,
    },

    #[error("Failed to connect {from} to {to}: {source}")]
    Connect {
        from: NodeId,
        to: NodeId,
        #[source]
        source: NetworkError,
    },
}

/// Errors while assigning a topic.
#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to subscribe {node} to {topic}: {source}")]
    Subscribe {
        node: NodeId,
        topic: TopicName,
        #[source]
        source: PubSubError,
    },
}

/// Errors from [`Experiment::setup`](crate::Experiment::setup).
#[derive(Debug, Error)]
pub enum ExperimentError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to create node {index}: {source}")]
    CreateNode {
        index: usize,
        #[source]
        source: NetworkError,
    },

    #[error("Failed to start pub/sub on {node}: {source}")]
    StartPubSub {
        node: NodeId,
        #[source]
        source: NetworkError,
    },

    #[error("Topology error: {0}")]
    Topology(#[from] TopologyError),

    #[error("Subscription error: {0}")]
    Subscription(#[from] SubscriptionError),
}
