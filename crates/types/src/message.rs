//! Messages delivered to subscriptions.

use crate::{NodeId, TopicName};

/// A message received on a subscription.
///
/// The payload is opaque; framing belongs to the messaging layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Node that originally published the message.
    pub from: NodeId,
    /// Publisher-local sequence number.
    pub seqno: u64,
    /// Topics the message was published on.
    pub topics: Vec<TopicName>,
    /// Opaque payload.
    pub data: Vec<u8>,
    /// Publisher signature over [`signing_bytes`](Self::signing_bytes), if signing is on.
    pub signature: Option<Vec<u8>>,
}

impl InboundMessage {
    /// Bytes covered by the publisher signature: seqno, topics, then payload.
    pub fn signing_bytes(seqno: u64, topics: &[TopicName], data: &[u8]) -> Vec<u8> {
        let topics_len: usize = topics.iter().map(|t| t.as_str().len() + 1).sum();
        let mut out = Vec::with_capacity(8 + topics_len + data.len());
        out.extend_from_slice(&seqno.to_be_bytes());
        for topic in topics {
            out.extend_from_slice(topic.as_str().as_bytes());
            out.push(0);
        }
        out.extend_from_slice(data);
        out
    }

    /// Check the publisher signature. Unsigned messages never verify.
    pub fn verify_signature(&self) -> bool {
        match &self.signature {
            Some(signature) => self.from.verify(
                &Self::signing_bytes(self.seqno, &self.topics, &self.data),
                signature,
            ),
            None => false,
        }
    }
}
