//! Seeded random topology builder.

use crate::config::check_degree;
use crate::error::TopologyError;
use crate::events::SimEvent;
use crate::node::SimNode;
use crate::rng::RandomSource;
use gossip_sim_core::NetworkNode;
use std::sync::Arc;
use tracing::{debug, instrument, Level};

/// Default bound on consecutive duplicate-edge redraws for one node.
pub const DEFAULT_MAX_REDRAWS: usize = 10_000;

/// Wire `nodes` into a random graph where every node ends up with at least
/// `target_degree` connections.
///
/// Nodes are visited in order. While node `a` holds fewer than
/// `target_degree` connections, an offset is drawn from `1..=n-2` and node
/// `(a + offset) % n` is dialed unless the two are already connected. A node
/// never dials itself, and a duplicate draw is redrawn without counting
/// towards the degree.
///
/// Degree is read back from the network, so connections opened by earlier
/// nodes count for later ones.
///
/// Returns the dialed `(from, to)` index pairs in dial order. The first
/// connect failure aborts the build. More than `max_redraws` consecutive
/// duplicate draws for one node fail with [`TopologyError::RedrawLimit`].
#[instrument(level = Level::DEBUG, skip_all, fields(nodes = nodes.len(), target_degree = target_degree, seed = seed))]
pub async fn build_random_graph<H: NetworkNode>(
    nodes: &[Arc<SimNode<H>>],
    target_degree: usize,
    seed: u64,
    max_redraws: usize,
) -> Result<Vec<(usize, usize)>, TopologyError> {
    let n = nodes.len();
    check_degree(n, target_degree)?;

    let mut rng = RandomSource::new(seed);
    let mut dialed = Vec::new();

    for (index, node) in nodes.iter().enumerate() {
        let mut redraws = 0;

        loop {
            let degree = node.degree();
            if degree >= target_degree {
                break;
            }

            let offset = 1 + rng.below(n - 2);
            let target = &nodes[(index + offset) % n];
            let target_id = target.id();

            if node.handle().is_connected_to(&target_id) {
                redraws += 1;
                if redraws > max_redraws {
                    return Err(TopologyError::RedrawLimit {
                        node: node.id(),
                        index,
                        degree,
                        target: target_degree,
                        redraws: max_redraws,
                    });
                }
                continue;
            }
            redraws = 0;

            node.handle()
                .connect(&target.handle().peer_info())
                .await
                .map_err(|source| TopologyError::Connect {
                    from: node.id(),
                    to: target_id,
                    source,
                })?;

            node.sink().emit(SimEvent::Connected { peer: target_id });
            dialed.push((index, target.index()));
        }
    }

    debug!(edges = dialed.len(), "Random graph complete");
    Ok(dialed)
}
