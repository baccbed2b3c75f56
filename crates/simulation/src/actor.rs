//! Per-node publish loop.

use crate::config::ActorConfig;
use crate::events::SimEvent;
use crate::node::SimNode;
use crate::rng::RandomSource;
use gossip_sim_core::{NetworkNode, PubSub};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Publishes random payloads on the node's subscribed topics until
/// cancelled.
///
/// Each round reads the node's current subscriptions. With none, the actor
/// sleeps for the idle back-off. Otherwise it picks a topic, fills a payload
/// of random size with random bytes, publishes it and sleeps a random delay.
/// A failed publish is counted and the loop carries on.
pub struct NodeActor<H: NetworkNode> {
    node: Arc<SimNode<H>>,
    rng: RandomSource,
    config: ActorConfig,
    cancel: CancellationToken,
}

impl<H: NetworkNode> NodeActor<H> {
    pub fn new(
        node: Arc<SimNode<H>>,
        rng: RandomSource,
        config: ActorConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            node,
            rng,
            config,
            cancel,
        }
    }

    /// Run until the token is cancelled.
    pub async fn run(mut self) {
        let sink = self.node.sink();
        sink.emit(SimEvent::ActorStarted {
            seed: self.rng.seed(),
        });

        loop {
            // Sorted so the pick depends only on the seed.
            let topics = self.node.subscriptions();

            let pause = if topics.is_empty() {
                sink.emit(SimEvent::Idle {
                    backoff: self.config.idle_backoff,
                });
                self.config.idle_backoff
            } else {
                let topic = &topics[self.rng.below(topics.len())];
                let size = self
                    .rng
                    .between(self.config.min_payload, self.config.max_payload);
                let mut data = vec![0u8; size];
                self.rng.fill(&mut data);

                sink.emit(SimEvent::Publishing {
                    topic,
                    data: &data,
                });

                let result = tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => break,
                    result = self.node.pubsub().publish(topic, data) => result,
                };

                match result {
                    Ok(()) => self.node.counters().record_sent(),
                    Err(error) => {
                        self.node.counters().record_publish_error();
                        sink.emit(SimEvent::PublishFailed {
                            topic,
                            error: &error,
                        });
                    }
                }

                self.rng
                    .duration_between(self.config.min_delay, self.config.max_delay)
            };

            if !self.pause(pause).await {
                break;
            }
        }

        sink.emit(SimEvent::ActorStopped);
    }

    /// Sleep for `duration` unless cancelled first. Returns `false` on
    /// cancellation.
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }
}
