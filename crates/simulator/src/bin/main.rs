//! Gossip load simulator CLI
//!
//! Builds a random overlay of in-memory nodes, subscribes them to topics by
//! chance and lets every node publish random payloads until interrupted.
//!
//! # Example
//!
//! ```bash
//! # 100 nodes at degree 10 with the default topics, until Ctrl-C
//! gossip-sim
//!
//! # Small fixed-length run with explicit topics and a JSON report
//! gossip-sim -n 10 --degree 4 --seed 1234 --topic-seed 42 \
//!     --topic foo=0.7 --topic bar=0.4 --topic quix=0.8 --duration 30s --json
//! ```

use clap::Parser;
use gossip_sim::{parse_topic, topic_table, Report};
use gossip_sim_network_memory::{MemoryNetwork, MemoryNetworkConfig};
use gossip_sim_simulation::{
    ActorConfig, EventSink, Experiment, ExperimentConfig, NoopSink, TracingSink,
    DEFAULT_MAX_REDRAWS,
};
use gossip_sim_types::TopicName;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Gossip load simulator
///
/// Setup is reproducible from the seeds; message timing is not.
#[derive(Parser, Debug)]
#[command(name = "gossip-sim")]
#[command(version, about, long_about = None)]
struct Args {
    /// Number of nodes
    #[arg(short = 'n', long, default_value = "100")]
    nodes: usize,

    /// Target connections per node
    #[arg(long, default_value = "10")]
    degree: usize,

    /// Seed for the topology (and the topics, unless --topic-seed is given)
    #[arg(long, default_value = "123")]
    seed: u64,

    /// Base seed for topic assignment; topic i uses base + i
    #[arg(long)]
    topic_seed: Option<u64>,

    /// Base seed for the publish loops; node i uses base + i
    #[arg(long, default_value = "123")]
    actor_seed: u64,

    /// Topic as NAME=CHANCE, repeatable. Defaults to three example topics.
    #[arg(short = 't', long = "topic", value_parser = parse_topic)]
    topics: Vec<(TopicName, f64)>,

    /// Shortest pause between publishes, in milliseconds
    #[arg(long, default_value = "100")]
    min_delay_ms: u64,

    /// Longest pause between publishes, in milliseconds
    #[arg(long, default_value = "300")]
    max_delay_ms: u64,

    /// Pause of a node without subscriptions, in milliseconds. Defaults to
    /// ten times --min-delay-ms.
    #[arg(long)]
    idle_backoff_ms: Option<u64>,

    /// Smallest payload in bytes
    #[arg(long, default_value = "10")]
    min_size: usize,

    /// Largest payload in bytes
    #[arg(long, default_value = "10")]
    max_size: usize,

    /// Receive window of each subscription consumer (e.g. "5s", "500ms")
    #[arg(long, default_value = "5s")]
    receive_timeout: humantime::Duration,

    /// Stop after this long instead of waiting for Ctrl-C
    #[arg(short = 'd', long)]
    duration: Option<humantime::Duration>,

    /// How long to wait for tasks to exit after stopping
    #[arg(long, default_value = "10s")]
    grace: humantime::Duration,

    /// Per-subscription inbound buffer of the in-memory network, at least 1
    #[arg(long, default_value = "1024")]
    buffer: NonZeroUsize,

    /// Consecutive duplicate draws tolerated per node while peering
    #[arg(long, default_value_t = DEFAULT_MAX_REDRAWS)]
    max_redraws: usize,

    /// Publish unsigned messages
    #[arg(long)]
    no_sign: bool,

    /// Disable experiment event logging
    #[arg(short, long)]
    quiet: bool,

    /// Print the final report as JSON
    #[arg(long)]
    json: bool,
}

impl Args {
    fn experiment_config(&self) -> ExperimentConfig {
        let min_delay = Duration::from_millis(self.min_delay_ms);
        let idle_backoff = self
            .idle_backoff_ms
            .map(Duration::from_millis)
            .unwrap_or(min_delay * 10);

        let actor = ActorConfig::default()
            .with_delay(min_delay, Duration::from_millis(self.max_delay_ms))
            .with_idle_backoff(idle_backoff)
            .with_payload_size(self.min_size, self.max_size);

        let mut config = ExperimentConfig::new(self.nodes, self.degree)
            .with_seed(self.seed)
            .with_topics(topic_table(self.topics.clone()))
            .with_actor(actor)
            .with_receive_timeout(*self.receive_timeout)
            .with_max_redraws(self.max_redraws)
            .with_message_signing(!self.no_sign);
        if let Some(topic_seed) = self.topic_seed {
            config = config.with_topic_seed(topic_seed);
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("warn,gossip_sim=info,gossip_sim_simulation=info")
            }),
        )
        .init();

    let args = Args::parse();
    let config = args.experiment_config();

    let sink: Arc<dyn EventSink> = if args.quiet {
        Arc::new(NoopSink)
    } else {
        Arc::new(TracingSink::new())
    };

    let network = MemoryNetwork::new(MemoryNetworkConfig {
        subscription_capacity: args.buffer,
        ..Default::default()
    });

    info!(
        nodes = config.node_count,
        degree = config.degree,
        seed = config.seed,
        topics = config.topics.len(),
        "Setting up experiment"
    );
    let experiment = Experiment::setup(&network, config, sink).await?;
    experiment.start(args.actor_seed);

    match args.duration {
        Some(duration) => {
            info!(duration = %duration, "Running");
            tokio::select! {
                _ = tokio::time::sleep(*duration) => {}
                result = tokio::signal::ctrl_c() => result?,
            }
        }
        None => {
            info!("Running until Ctrl-C");
            tokio::signal::ctrl_c().await?;
        }
    }

    let report = Report::new(experiment.stats(), network.stats());
    experiment.stop();
    if !experiment.wait_for_shutdown(*args.grace).await {
        warn!(
            remaining = experiment.active_tasks(),
            "Tasks did not exit within the grace period"
        );
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report.print();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_parse() {
        let args = Args::try_parse_from(["gossip-sim"]).unwrap();
        assert_eq!(args.buffer.get(), 1024);
        assert!(args.experiment_config().validate().is_ok());
    }

    #[test]
    fn test_zero_buffer_rejected() {
        assert!(Args::try_parse_from(["gossip-sim", "--buffer", "0"]).is_err());
        let args = Args::try_parse_from(["gossip-sim", "--buffer", "1"]).unwrap();
        assert_eq!(args.buffer, NonZeroUsize::MIN);
    }

    #[test]
    fn test_topic_flags() {
        let args = Args::try_parse_from(["gossip-sim", "-t", "foo=0.5", "--topic", "bar=1"]).unwrap();
        let config = args.experiment_config();
        assert_eq!(config.topics.len(), 2);
        assert_eq!(config.topics.chance("bar"), Some(1.0));
    }
}
