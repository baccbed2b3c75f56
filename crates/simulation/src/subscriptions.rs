//! Probabilistic topic assignment.

use crate::config::check_chance;
use crate::consumer::InboundConsumer;
use crate::error::SubscriptionError;
use crate::events::SimEvent;
use crate::node::SimNode;
use crate::rng::RandomSource;
use crate::scope::TaskScope;
use gossip_sim_core::{NetworkNode, PubSub};
use gossip_sim_types::TopicName;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, Level};

/// Subscribe each node to `topic` with probability `chance`.
///
/// One uniform draw in `[0, 1)` is taken per node, in order, whether or not
/// the node ends up subscribed; the node subscribes when the draw is below
/// `chance`. A chance of `0.0` therefore subscribes nobody and `1.0`
/// everybody.
///
/// Every successful subscription gets an [`InboundConsumer`] spawned in
/// `scope` straight away. A failed subscribe does not stop the pass: the
/// remaining nodes are still tried and the last failure is returned at the
/// end.
///
/// Returns the indices of the nodes that subscribed.
#[instrument(level = Level::DEBUG, skip_all, fields(topic = %topic, chance = chance, seed = seed))]
pub async fn assign_subscriptions<H: NetworkNode>(
    nodes: &[Arc<SimNode<H>>],
    topic: &TopicName,
    chance: f64,
    seed: u64,
    scope: &TaskScope,
    receive_window: Duration,
) -> Result<Vec<usize>, SubscriptionError> {
    check_chance(topic.as_str(), chance)?;

    let mut rng = RandomSource::new(seed);
    let mut subscribed = Vec::new();
    let mut last_error = None;

    for node in nodes {
        if rng.unit() >= chance {
            continue;
        }

        match node.pubsub().subscribe(topic).await {
            Ok(subscription) => {
                node.sink().emit(SimEvent::Subscribed { topic });
                let consumer = InboundConsumer::new(
                    Arc::clone(node),
                    subscription,
                    receive_window,
                    scope.token(),
                );
                scope.spawn(consumer.run());
                subscribed.push(node.index());
            }
            Err(error) => {
                node.sink().emit(SimEvent::SubscribeFailed {
                    topic,
                    error: &error,
                });
                last_error = Some(SubscriptionError::Subscribe {
                    node: node.id(),
                    topic: topic.clone(),
                    source: error,
                });
            }
        }
    }

    debug!(subscribed = subscribed.len(), "Topic assignment pass complete");

    match last_error {
        Some(error) => Err(error),
        None => Ok(subscribed),
    }
}
