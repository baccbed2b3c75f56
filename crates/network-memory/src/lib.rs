//! In-process network transport for the gossip load simulator.
//!
//! [`MemoryNetwork`] hosts nodes in the same process. Connections are plain
//! entries in each node's peer set, and [`MemoryPubSub`] floods every
//! published message along the connection graph to all reachable
//! subscribers over bounded tokio channels. A subscriber whose channel is
//! full misses the message, the way a slow gossip peer would.
//!
//! A [`FaultPlan`] can make connect, subscribe and publish calls fail on
//! demand, which the simulation tests use to exercise error policies.

mod faults;
mod network;
mod pubsub;

pub use faults::FaultPlan;
pub use network::{MemoryNetwork, MemoryNetworkConfig, MemoryNode, NetworkStats};
pub use pubsub::{MemoryPubSub, MemorySubscription};
