//! Command-line plumbing for the `gossip-sim` runner.
//!
//! Topic flag parsing, the default topic set and the end-of-run report.

use gossip_sim_network_memory::NetworkStats;
use gossip_sim_simulation::ExperimentStats;
use gossip_sim_types::{TopicName, TopicTable};
use serde::Serialize;

/// Topic prefix used by the default topic set.
pub const DEFAULT_TOPIC_PREFIX: &str = "/libp2p/example/berlin/protolambda";

/// The three topics run when none are given on the command line.
pub fn default_topics() -> TopicTable {
    TopicTable::new()
        .with_topic(format!("{DEFAULT_TOPIC_PREFIX}/foo"), 0.7)
        .with_topic(format!("{DEFAULT_TOPIC_PREFIX}/bar"), 0.4)
        .with_topic(format!("{DEFAULT_TOPIC_PREFIX}/quix"), 0.8)
}

/// Parse a `name=chance` topic flag.
pub fn parse_topic(s: &str) -> Result<(TopicName, f64), String> {
    let (name, chance) = s
        .rsplit_once('=')
        .ok_or_else(|| format!("Expected NAME=CHANCE, got {:?}", s))?;

    if name.is_empty() {
        return Err("Topic name must not be empty".to_string());
    }
    let chance: f64 = chance
        .trim()
        .parse()
        .map_err(|_| format!("Invalid chance for topic {}: {:?}", name, chance))?;
    if !(0.0..=1.0).contains(&chance) {
        return Err(format!("Chance for topic {} must be in [0, 1], got {}", name, chance));
    }

    Ok((TopicName::from(name), chance))
}

/// Build the topic table from parsed flags, falling back to
/// [`default_topics`]. A repeated name keeps its first position and its last
/// chance.
pub fn topic_table(flags: Vec<(TopicName, f64)>) -> TopicTable {
    if flags.is_empty() {
        return default_topics();
    }
    flags.into_iter().collect()
}

/// Summary printed when a run ends.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Report {
    pub nodes: usize,
    pub sent: u64,
    pub received: u64,
    pub publish_errors: u64,
    pub receive_errors: u64,
    pub receive_timeouts: u64,
    /// Copies placed in subscriber buffers by the network.
    pub delivered: u64,
    /// Copies lost to full subscriber buffers.
    pub dropped: u64,
}

impl Report {
    pub fn new(experiment: ExperimentStats, network: NetworkStats) -> Self {
        Self {
            nodes: experiment.nodes,
            sent: experiment.sent,
            received: experiment.received,
            publish_errors: experiment.publish_errors,
            receive_errors: experiment.receive_errors,
            receive_timeouts: experiment.receive_timeouts,
            delivered: network.delivered,
            dropped: network.dropped,
        }
    }

    /// Print the report in human-readable form.
    pub fn print(&self) {
        println!();
        println!("=== Gossip Load Report ===");
        println!("nodes:            {}", self.nodes);
        println!("total sent:       {}", self.sent);
        println!("total received:   {}", self.received);
        if self.sent > 0 {
            println!(
                "fan-out:          {:.2} receptions per publish",
                self.received as f64 / self.sent as f64
            );
        }
        println!("publish errors:   {}", self.publish_errors);
        println!("receive errors:   {}", self.receive_errors);
        println!("receive timeouts: {}", self.receive_timeouts);
        println!("delivered:        {}", self.delivered);
        println!("dropped:          {}", self.dropped);
    }
}
