//! Randomized gossip load experiment.
//!
//! Builds a population of nodes on any [`gossip_sim_core::Network`], wires
//! them into a random graph, subscribes them to topics by chance and then
//! lets every node publish random payloads while draining whatever it
//! receives. Setup decisions are reproducible from a seed.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      Experiment                          │
//! │                                                          │
//! │  setup:  create nodes ─► start pub/sub ─► build_random_  │
//! │          graph ─► assign_subscriptions (per topic)       │
//! │                              │                           │
//! │                              ▼ spawns                    │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │  InboundConsumer  (one per node × subscription)    │  │
//! │  └────────────────────────────────────────────────────┘  │
//! │  start:                      │                           │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │  NodeActor        (one per node)                   │  │
//! │  └────────────────────────────────────────────────────┘  │
//! │                                                          │
//! │  TaskScope: one CancellationToken shared by every task   │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Every concern draws from its own [`RandomSource`]: the topology from the
//! experiment seed, topic `i` from `seed + i`, actor `n` from
//! `actor_seed + n`.

mod actor;
mod config;
mod consumer;
mod error;
mod events;
mod experiment;
mod node;
mod rng;
mod scope;
mod subscriptions;
mod topology;

#[cfg(test)]
mod test_support;

pub use actor::NodeActor;
pub use config::{ActorConfig, ExperimentConfig};
pub use consumer::{InboundConsumer, SubscriptionOf};
pub use error::{ConfigError, ExperimentError, SubscriptionError, TopologyError};
pub use events::{EventSink, NoopSink, SimEvent, TracingSink};
pub use experiment::{Experiment, ExperimentStats};
pub use node::{NodeCounters, NodeStats, SimNode};
pub use rng::RandomSource;
pub use scope::TaskScope;
pub use subscriptions::assign_subscriptions;
pub use topology::{build_random_graph, DEFAULT_MAX_REDRAWS};
