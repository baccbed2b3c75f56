//! Node identity keys.
//!
//! Every simulated node gets a freshly generated Ed25519 keypair. The public
//! half is the node's [`NodeId`]; the secret half signs published messages
//! when the network has message signing enabled.

use crate::NodeId;
use ed25519_dalek::{Signer, Verifier};

/// Length of an Ed25519 signature in bytes.
pub const SIGNATURE_BYTES: usize = 64;

/// Ed25519 keypair owned by one simulated node.
#[derive(Clone)]
pub struct NodeKeypair(ed25519_dalek::SigningKey);

impl NodeKeypair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        NodeKeypair(ed25519_dalek::SigningKey::generate(&mut csprng))
    }

    /// Build a keypair from a fixed seed (for tests).
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        NodeKeypair(ed25519_dalek::SigningKey::from_bytes(seed))
    }

    /// The identity derived from this keypair.
    pub fn node_id(&self) -> NodeId {
        NodeId(self.0.verifying_key().to_bytes())
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_BYTES] {
        self.0.sign(message).to_bytes()
    }
}

impl std::fmt::Debug for NodeKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("NodeKeypair").field(&self.node_id()).finish()
    }
}

impl NodeId {
    /// Verify a signature made by the keypair this identity was derived from.
    ///
    /// Returns false for malformed keys or signatures.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        let Ok(key) = ed25519_dalek::VerifyingKey::from_bytes(&self.0) else {
            return false;
        };
        let Ok(signature) = ed25519_dalek::Signature::from_slice(signature) else {
            return false;
        };
        key.verify(message, &signature).is_ok()
    }
}
