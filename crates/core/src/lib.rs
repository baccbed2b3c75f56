//! Capability traits for the network driven by the simulator.
//!
//! The simulation core never talks to a concrete transport. Everything it
//! needs from the outside world is expressed here:
//!
//! - [`Network`]: create addressable nodes
//! - [`NetworkNode`]: connect to peers, list connections, start pub/sub
//! - [`PubSub`]: subscribe, publish, list subscribed topics
//! - [`Subscription`]: receive the next inbound message
//!
//! `gossip-sim-network-memory` provides an in-process implementation.

mod error;
mod traits;

pub use error::{NetworkError, PubSubError};
pub use traits::{Network, NetworkNode, PubSub, PubSubOptions, Subscription};
