//! Experiment lifecycle: setup, start, stats and stop.

use crate::actor::NodeActor;
use crate::config::ExperimentConfig;
use crate::error::ExperimentError;
use crate::events::{EventSink, SimEvent};
use crate::node::{NodeStats, SimNode};
use crate::rng::RandomSource;
use crate::scope::TaskScope;
use crate::subscriptions::assign_subscriptions;
use crate::topology::build_random_graph;
use gossip_sim_core::{Network, NetworkNode, PubSubOptions};
use gossip_sim_types::{NodeKeypair, TopicName};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Totals over every node of an experiment.
///
/// Summed from per-node counters without a global lock, so a snapshot taken
/// while tasks run may be slightly behind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExperimentStats {
    pub nodes: usize,
    pub sent: u64,
    pub received: u64,
    pub publish_errors: u64,
    pub receive_errors: u64,
    pub receive_timeouts: u64,
}

impl ExperimentStats {
    fn add(&mut self, node: NodeStats) {
        self.nodes += 1;
        self.sent += node.sent;
        self.received += node.received;
        self.publish_errors += node.publish_errors;
        self.receive_errors += node.receive_errors;
        self.receive_timeouts += node.receive_timeouts;
    }
}

/// Nodes, topology and subscriptions produced by a successful setup.
struct Built<H: NetworkNode> {
    nodes: Vec<Arc<SimNode<H>>>,
    edges: Vec<(usize, usize)>,
    assignments: Vec<(TopicName, Vec<usize>)>,
}

/// A running (or ready to run) gossip load experiment.
///
/// Owns every node and the cancellation scope of every task spawned for
/// them. Dropping the experiment cancels the scope.
pub struct Experiment<H: NetworkNode> {
    config: ExperimentConfig,
    nodes: Vec<Arc<SimNode<H>>>,
    edges: Vec<(usize, usize)>,
    assignments: Vec<(TopicName, Vec<usize>)>,
    scope: TaskScope,
    sink: Arc<dyn EventSink>,
    stopped: AtomicBool,
}

impl<H: NetworkNode> Experiment<H> {
    /// Create the nodes, peer them and assign topics.
    ///
    /// Stages run in order: validate the config, create `node_count` nodes
    /// each with a fresh keypair, start pub/sub on every node, build the
    /// random topology from `config.seed`, then assign each topic in table
    /// order. Subscribing starts the consumers, so messages are drained as
    /// soon as setup returns.
    ///
    /// Any failure aborts setup and stops the consumers spawned so far.
    /// Topic assignment is best-effort: every topic is attempted before the
    /// last failure is returned.
    pub async fn setup<N>(
        network: &N,
        config: ExperimentConfig,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, ExperimentError>
    where
        N: Network<Node = H>,
    {
        config.validate()?;

        let scope = TaskScope::new();
        match Self::build(network, &config, sink.as_ref(), &scope).await {
            Ok(built) => Ok(Self {
                config,
                nodes: built.nodes,
                edges: built.edges,
                assignments: built.assignments,
                scope,
                sink,
                stopped: AtomicBool::new(false),
            }),
            Err(error) => {
                sink.emit(SimEvent::SetupFailed {
                    stage: setup_stage(&error),
                    error: &error,
                });
                scope.cancel();
                Err(error)
            }
        }
    }

    async fn build<N>(
        network: &N,
        config: &ExperimentConfig,
        sink: &dyn EventSink,
        scope: &TaskScope,
    ) -> Result<Built<H>, ExperimentError>
    where
        N: Network<Node = H>,
    {
        let mut handles = Vec::with_capacity(config.node_count);
        for index in 0..config.node_count {
            let handle = network
                .create_node(NodeKeypair::generate())
                .await
                .map_err(|source| ExperimentError::CreateNode { index, source })?;
            let node_sink = sink.scoped(handle.id());
            node_sink.emit(SimEvent::NodeCreated {
                index,
                addresses: &handle.addresses(),
            });
            handles.push((handle, node_sink));
        }

        let options = PubSubOptions {
            sign_messages: config.sign_messages,
        };
        let mut nodes = Vec::with_capacity(handles.len());
        for (index, (handle, node_sink)) in handles.into_iter().enumerate() {
            let pubsub = handle
                .start_pubsub(options)
                .await
                .map_err(|source| ExperimentError::StartPubSub {
                    node: handle.id(),
                    source,
                })?;
            node_sink.emit(SimEvent::PubSubStarted);
            nodes.push(Arc::new(SimNode::new(index, handle, pubsub, node_sink)));
        }

        let edges =
            build_random_graph(&nodes, config.degree, config.seed, config.max_redraws).await?;
        sink.emit(SimEvent::TopologyBuilt { edges: edges.len() });

        let mut assignments = Vec::with_capacity(config.topics.len());
        let mut last_error = None;
        for (position, topic) in config.topics.iter().enumerate() {
            let seed = config.topic_seed_for(position);
            match assign_subscriptions(
                &nodes,
                &topic.name,
                topic.chance,
                seed,
                scope,
                config.receive_timeout,
            )
            .await
            {
                Ok(members) => {
                    sink.emit(SimEvent::TopicAssigned {
                        topic: &topic.name,
                        subscribed: members.len(),
                        nodes: nodes.len(),
                    });
                    assignments.push((topic.name, members));
                }
                Err(error) => last_error = Some(ExperimentError::from(error)),
            }
        }

        match last_error {
            Some(error) => Err(error),
            None => Ok(Built {
                nodes,
                edges,
                assignments,
            }),
        }
    }

    /// Spawn one publish loop per node.
    ///
    /// Node `i` draws from `seed + i`. Must be called inside a tokio runtime.
    pub fn start(&self, seed: u64) {
        self.sink.emit(SimEvent::ExperimentStarting {
            nodes: self.nodes.len(),
        });

        for node in &self.nodes {
            let actor = NodeActor::new(
                Arc::clone(node),
                RandomSource::derived(seed, node.index() as u64),
                self.config.actor.clone(),
                self.scope.token(),
            );
            self.scope.spawn(actor.run());
        }
    }

    /// Sum of every node's counters.
    pub fn stats(&self) -> ExperimentStats {
        let mut stats = ExperimentStats::default();
        for node in &self.nodes {
            stats.add(node.stats());
        }
        stats
    }

    /// Per-node counters, in node order.
    pub fn node_stats(&self) -> Vec<NodeStats> {
        self.nodes.iter().map(|node| node.stats()).collect()
    }

    /// Cancel every task of the experiment.
    ///
    /// Returns `false` if the experiment was already stopped.
    pub fn stop(&self) -> bool {
        if self.stopped.swap(true, Ordering::AcqRel) {
            self.sink.emit(SimEvent::AlreadyStopped);
            return false;
        }

        self.sink.emit(SimEvent::ExperimentStopping);
        self.scope.cancel();
        true
    }

    /// Whether [`stop`](Self::stop) has been called.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Wait up to `grace` for every task to exit after a stop.
    ///
    /// Returns `true` once all tasks are gone, `false` on timeout.
    pub async fn wait_for_shutdown(&self, grace: Duration) -> bool {
        let finished = self.scope.wait(grace).await;
        if !finished {
            info!(
                remaining = self.scope.active(),
                "Tasks still running after grace period"
            );
        }
        finished
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    pub fn nodes(&self) -> &[Arc<SimNode<H>>] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> Option<&Arc<SimNode<H>>> {
        self.nodes.get(index)
    }

    /// Connections dialed while building the topology, as `(from, to)` node
    /// indices.
    pub fn edges(&self) -> &[(usize, usize)] {
        &self.edges
    }

    /// Subscribed node indices per topic, in topic table order.
    pub fn assignments(&self) -> &[(TopicName, Vec<usize>)] {
        &self.assignments
    }

    /// Number of actors and consumers still running.
    pub fn active_tasks(&self) -> usize {
        self.scope.active()
    }
}

impl<H: NetworkNode> Drop for Experiment<H> {
    fn drop(&mut self) {
        self.scope.cancel();
    }
}

impl<H: NetworkNode> std::fmt::Debug for Experiment<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Experiment")
            .field("nodes", &self.nodes.len())
            .field("edges", &self.edges.len())
            .field("topics", &self.assignments.len())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

fn setup_stage(error: &ExperimentError) -> &'static str {
    match error {
        ExperimentError::Config(_) => "config",
        ExperimentError::CreateNode { .. } => "create_nodes",
        ExperimentError::StartPubSub { .. } => "start_pubsub",
        ExperimentError::Topology(_) => "topology",
        ExperimentError::Subscription(_) => "subscriptions",
    }
}
