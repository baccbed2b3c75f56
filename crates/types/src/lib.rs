//! Core types for the gossip load simulator.
//!
//! Shared by the collaborator traits (`gossip-sim-core`), the in-memory
//! network and the simulation itself:
//!
//! - [`NodeId`], [`NodeAddress`], [`PeerInfo`]: node identity and addressing
//! - [`NodeKeypair`]: the Ed25519 key a node identity is derived from
//! - [`TopicName`], [`Topic`], [`TopicTable`]: topics and their subscription chances
//! - [`InboundMessage`]: a message delivered to a subscription

mod crypto;
mod identifiers;
mod message;
mod topic;

pub use crypto::{NodeKeypair, SIGNATURE_BYTES};
pub use identifiers::{NodeAddress, NodeId, PeerInfo};
pub use message::InboundMessage;
pub use topic::{Topic, TopicName, TopicTable};
