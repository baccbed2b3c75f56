//! Flooding pub/sub over the in-memory network.

use crate::network::{PeerState, Shared};
use async_trait::async_trait;
use gossip_sim_core::{PubSub, PubSubError, PubSubOptions, Subscription};
use gossip_sim_types::{InboundMessage, TopicName};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::trace;

/// Pub/sub service of one in-memory node.
pub struct MemoryPubSub {
    peer: Arc<PeerState>,
    shared: Arc<Shared>,
    options: PubSubOptions,
}

impl MemoryPubSub {
    pub(crate) fn new(peer: Arc<PeerState>, shared: Arc<Shared>, options: PubSubOptions) -> Self {
        Self {
            peer,
            shared,
            options,
        }
    }

    /// Options this service was started with.
    pub fn options(&self) -> PubSubOptions {
        self.options
    }
}

impl std::fmt::Debug for MemoryPubSub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryPubSub")
            .field("node", &self.peer.id)
            .field("options", &self.options)
            .finish()
    }
}

#[async_trait]
impl PubSub for MemoryPubSub {
    type Subscription = MemorySubscription;

    async fn subscribe(&self, topic: &TopicName) -> Result<MemorySubscription, PubSubError> {
        if self.shared.faults.read().subscribe_fails(&self.peer.id, topic) {
            return Err(PubSubError::Subscribe {
                topic: topic.clone(),
                reason: "injected failure".to_string(),
            });
        }

        let mut subscribers = self.peer.subscribers.lock();
        if subscribers.get(topic).is_some_and(|s| !s.is_closed()) {
            return Err(PubSubError::AlreadySubscribed(topic.clone()));
        }

        let (tx, rx) = mpsc::channel(self.shared.config.subscription_capacity.get());
        subscribers.insert(topic.clone(), tx);

        Ok(MemorySubscription {
            topic: topic.clone(),
            rx,
        })
    }

    async fn publish(&self, topic: &TopicName, data: Vec<u8>) -> Result<(), PubSubError> {
        if self.shared.faults.read().fail_publish {
            return Err(PubSubError::Publish {
                topic: topic.clone(),
                reason: "injected failure".to_string(),
            });
        }

        let seqno = self.peer.next_seqno.fetch_add(1, Ordering::Relaxed);
        let topics = vec![topic.clone()];
        let signature = self.options.sign_messages.then(|| {
            self.peer
                .keypair
                .sign(&InboundMessage::signing_bytes(seqno, &topics, &data))
                .to_vec()
        });

        let message = InboundMessage {
            from: self.peer.id,
            seqno,
            topics,
            data,
            signature,
        };

        trace!(from = %self.peer.id, topic = %topic, seqno, "Publishing");
        self.shared.published.fetch_add(1, Ordering::Relaxed);
        self.shared.flood(&self.peer.id, &message);
        Ok(())
    }

    fn topics(&self) -> Vec<TopicName> {
        self.peer
            .subscribers
            .lock()
            .iter()
            .filter(|(_, sender)| !sender.is_closed())
            .map(|(topic, _)| topic.clone())
            .collect()
    }
}

/// Receiving end of one in-memory subscription.
#[derive(Debug)]
pub struct MemorySubscription {
    topic: TopicName,
    rx: mpsc::Receiver<InboundMessage>,
}

#[async_trait]
impl Subscription for MemorySubscription {
    fn topic(&self) -> &TopicName {
        &self.topic
    }

    async fn next(&mut self) -> Result<InboundMessage, PubSubError> {
        self.rx
            .recv()
            .await
            .ok_or_else(|| PubSubError::SubscriptionClosed(self.topic.clone()))
    }
}

#[cfg(test)]
mod tests {
    use crate::{FaultPlan, MemoryNetwork, MemoryNode};
    use gossip_sim_core::{Network, NetworkNode, PubSub, PubSubError, PubSubOptions, Subscription};
    use gossip_sim_types::{NodeKeypair, TopicName};
    use std::num::NonZeroUsize;
    use std::time::Duration;

    async fn node(network: &MemoryNetwork) -> MemoryNode {
        network.create_node(NodeKeypair::generate()).await.unwrap()
    }

    #[tokio::test]
    async fn test_message_floods_across_hops() {
        let network = MemoryNetwork::default();
        let (a, b, c) = (node(&network).await, node(&network).await, node(&network).await);
        // a - b - c, c is two hops away from a
        a.connect(&b.peer_info()).await.unwrap();
        b.connect(&c.peer_info()).await.unwrap();

        let topic = TopicName::from("foo");
        let ps_a = a.start_pubsub(PubSubOptions::default()).await.unwrap();
        let ps_c = c.start_pubsub(PubSubOptions::default()).await.unwrap();
        let mut sub_c = ps_c.subscribe(&topic).await.unwrap();

        ps_a.publish(&topic, vec![1, 2, 3]).await.unwrap();

        let msg = tokio::time::timeout(Duration::from_secs(1), sub_c.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(msg.from, a.id());
        assert_eq!(msg.data, vec![1, 2, 3]);
        assert!(msg.verify_signature());
    }

    #[tokio::test]
    async fn test_publisher_does_not_receive_own_message() {
        let network = MemoryNetwork::default();
        let (a, b) = (node(&network).await, node(&network).await);
        a.connect(&b.peer_info()).await.unwrap();

        let topic = TopicName::from("foo");
        let ps_a = a.start_pubsub(PubSubOptions::default()).await.unwrap();
        let mut sub_a = ps_a.subscribe(&topic).await.unwrap();

        ps_a.publish(&topic, vec![0]).await.unwrap();

        let res = tokio::time::timeout(Duration::from_millis(50), sub_a.next()).await;
        assert!(res.is_err(), "publisher should not see its own message");
        assert_eq!(network.stats().delivered, 0);
    }

    #[tokio::test]
    async fn test_unsigned_when_signing_disabled() {
        let network = MemoryNetwork::default();
        let (a, b) = (node(&network).await, node(&network).await);
        a.connect(&b.peer_info()).await.unwrap();

        let topic = TopicName::from("foo");
        let ps_a = a
            .start_pubsub(PubSubOptions {
                sign_messages: false,
            })
            .await
            .unwrap();
        let ps_b = b.start_pubsub(PubSubOptions::default()).await.unwrap();
        let mut sub_b = ps_b.subscribe(&topic).await.unwrap();

        ps_a.publish(&topic, vec![5]).await.unwrap();
        let msg = sub_b.next().await.unwrap();
        assert!(msg.signature.is_none());
    }

    #[tokio::test]
    async fn test_unconnected_subscriber_gets_nothing() {
        let network = MemoryNetwork::default();
        let (a, b) = (node(&network).await, node(&network).await);

        let topic = TopicName::from("foo");
        let ps_a = a.start_pubsub(PubSubOptions::default()).await.unwrap();
        let ps_b = b.start_pubsub(PubSubOptions::default()).await.unwrap();
        let _sub_b = ps_b.subscribe(&topic).await.unwrap();

        ps_a.publish(&topic, vec![0]).await.unwrap();
        assert_eq!(network.stats().published, 1);
        assert_eq!(network.stats().delivered, 0);
    }

    #[tokio::test]
    async fn test_topics_lists_open_subscriptions() {
        let network = MemoryNetwork::default();
        let a = node(&network).await;
        let ps = a.start_pubsub(PubSubOptions::default()).await.unwrap();

        let foo = TopicName::from("foo");
        let bar = TopicName::from("bar");
        let _sub_foo = ps.subscribe(&foo).await.unwrap();
        let sub_bar = ps.subscribe(&bar).await.unwrap();

        let mut topics = ps.topics();
        topics.sort();
        assert_eq!(topics, vec![bar.clone(), foo.clone()]);

        drop(sub_bar);
        assert_eq!(ps.topics(), vec![foo.clone()]);

        let err = ps.subscribe(&foo).await.unwrap_err();
        assert!(matches!(err, PubSubError::AlreadySubscribed(_)));
    }

    #[tokio::test]
    async fn test_full_buffer_drops_messages() {
        let network = MemoryNetwork::new(crate::MemoryNetworkConfig {
            subscription_capacity: NonZeroUsize::MIN,
            ..Default::default()
        });
        let (a, b) = (node(&network).await, node(&network).await);
        a.connect(&b.peer_info()).await.unwrap();

        let topic = TopicName::from("foo");
        let ps_a = a.start_pubsub(PubSubOptions::default()).await.unwrap();
        let ps_b = b.start_pubsub(PubSubOptions::default()).await.unwrap();
        let _sub_b = ps_b.subscribe(&topic).await.unwrap();

        ps_a.publish(&topic, vec![1]).await.unwrap();
        ps_a.publish(&topic, vec![2]).await.unwrap();

        let stats = network.stats();
        assert_eq!(stats.delivered, 1);
        assert_eq!(stats.dropped, 1);
    }

    #[tokio::test]
    async fn test_smallest_buffer_still_delivers() {
        let network = MemoryNetwork::new(crate::MemoryNetworkConfig {
            subscription_capacity: NonZeroUsize::MIN,
            ..Default::default()
        });
        let (a, b) = (node(&network).await, node(&network).await);
        a.connect(&b.peer_info()).await.unwrap();

        let topic = TopicName::from("foo");
        let ps_a = a.start_pubsub(PubSubOptions::default()).await.unwrap();
        let ps_b = b.start_pubsub(PubSubOptions::default()).await.unwrap();
        let mut sub_b = ps_b.subscribe(&topic).await.unwrap();

        for round in 0..3u8 {
            ps_a.publish(&topic, vec![round]).await.unwrap();
            let msg = sub_b.next().await.unwrap();
            assert_eq!(msg.data, vec![round]);
        }
        assert_eq!(network.stats().dropped, 0);
    }

    #[tokio::test]
    async fn test_closed_subscriptions_fail_receive() {
        let network = MemoryNetwork::default();
        let a = node(&network).await;
        let ps = a.start_pubsub(PubSubOptions::default()).await.unwrap();
        let mut sub = ps.subscribe(&TopicName::from("foo")).await.unwrap();

        network.close_subscriptions(&a.id());

        let err = sub.next().await.unwrap_err();
        assert!(matches!(err, PubSubError::SubscriptionClosed(_)));
        assert!(ps.topics().is_empty());
    }

    #[tokio::test]
    async fn test_injected_publish_and_subscribe_failures() {
        let network = MemoryNetwork::default();
        let a = node(&network).await;
        let ps = a.start_pubsub(PubSubOptions::default()).await.unwrap();
        network.set_faults(
            FaultPlan::none()
                .with_publish_failures()
                .with_subscribe_failure(a.id()),
        );

        let topic = TopicName::from("foo");
        assert!(matches!(
            ps.subscribe(&topic).await.unwrap_err(),
            PubSubError::Subscribe { .. }
        ));
        assert!(matches!(
            ps.publish(&topic, vec![]).await.unwrap_err(),
            PubSubError::Publish { .. }
        ));
    }
}
