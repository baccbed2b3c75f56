//! Node identity and addressing types.

use std::fmt;

/// Node identifier.
///
/// The raw Ed25519 public key of the node's keypair. Unique per node as long
/// as keypairs are freshly generated.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub [u8; 32]);

impl NodeId {
    /// Size of the identifier in bytes.
    pub const BYTES: usize = 32;

    /// Get the raw identifier bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Abbreviated hex form used in logs.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..6])
    }

    /// Full hex form.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.short())
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.short())
    }
}

/// Address a node listens on, as assigned by the network at creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeAddress(pub String);

impl NodeAddress {
    /// Get the address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything needed to dial a peer: its identity and known addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerInfo {
    pub id: NodeId,
    pub addresses: Vec<NodeAddress>,
}

impl PeerInfo {
    /// Create peer info from an identity and its addresses.
    pub fn new(id: NodeId, addresses: Vec<NodeAddress>) -> Self {
        Self { id, addresses }
    }
}
