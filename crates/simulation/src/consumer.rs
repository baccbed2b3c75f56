//! Per-subscription receive loop.

use crate::events::SimEvent;
use crate::node::SimNode;
use gossip_sim_core::{NetworkNode, PubSub, Subscription};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// The subscription type handed out by a node's pub/sub service.
pub type SubscriptionOf<H> = <<H as NetworkNode>::PubSub as PubSub>::Subscription;

/// Drains one subscription of one node and counts what arrives.
///
/// Each receive is bounded by a window. A timeout is counted and the next
/// window starts right away. A receive error is counted and the consumer
/// waits out the rest of the window before trying again, so a subscription
/// that fails on every call costs one attempt per window. Message content is
/// never acted on.
pub struct InboundConsumer<H: NetworkNode> {
    node: Arc<SimNode<H>>,
    subscription: SubscriptionOf<H>,
    window: Duration,
    cancel: CancellationToken,
}

impl<H: NetworkNode> InboundConsumer<H> {
    pub fn new(
        node: Arc<SimNode<H>>,
        subscription: SubscriptionOf<H>,
        window: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            node,
            subscription,
            window,
            cancel,
        }
    }

    /// Receive until cancelled.
    pub async fn run(mut self) {
        let topic = self.subscription.topic().clone();
        let sink = self.node.sink();
        let counters = self.node.counters();

        loop {
            let deadline = Instant::now() + self.window;

            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                result = tokio::time::timeout_at(deadline, self.subscription.next()) => result,
            };

            match result {
                Ok(Ok(message)) => {
                    counters.record_received();
                    sink.emit(SimEvent::Received { message: &message });
                }
                Ok(Err(error)) => {
                    counters.record_receive_error();
                    sink.emit(SimEvent::ReceiveFailed {
                        topic: &topic,
                        error: &error,
                    });
                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => break,
                        _ = tokio::time::sleep_until(deadline) => {}
                    }
                }
                Err(_elapsed) => {
                    counters.record_receive_timeout();
                    sink.emit(SimEvent::ReceiveTimeout { topic: &topic });
                }
            }
        }

        sink.emit(SimEvent::ConsumerStopped { topic: &topic });
    }
}
