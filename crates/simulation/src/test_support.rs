//! Node fixtures on the in-memory network.

use crate::events::NoopSink;
use crate::node::SimNode;
use gossip_sim_core::{Network, NetworkNode, PubSubOptions};
use gossip_sim_network_memory::{MemoryNetwork, MemoryNode};
use gossip_sim_types::NodeKeypair;
use std::sync::Arc;

pub(crate) async fn spawn_nodes(count: usize) -> (MemoryNetwork, Vec<Arc<SimNode<MemoryNode>>>) {
    let network = MemoryNetwork::default();
    let nodes = spawn_nodes_on(&network, count).await;
    (network, nodes)
}

pub(crate) async fn spawn_nodes_on(
    network: &MemoryNetwork,
    count: usize,
) -> Vec<Arc<SimNode<MemoryNode>>> {
    let mut nodes = Vec::with_capacity(count);
    for index in 0..count {
        let handle = network
            .create_node(NodeKeypair::generate())
            .await
            .expect("create node");
        let pubsub = handle
            .start_pubsub(PubSubOptions::default())
            .await
            .expect("start pubsub");
        nodes.push(Arc::new(SimNode::new(
            index,
            handle,
            pubsub,
            Arc::new(NoopSink),
        )));
    }
    nodes
}
