//! Seed reproducibility of experiment setup.
//!
//! Node identities are random, but which node index dials which and which
//! node indices subscribe to which topic depend only on the seeds.

use gossip_sim_core::NetworkNode;
use gossip_sim_network_memory::{MemoryNetwork, MemoryNode};
use gossip_sim_simulation::{Experiment, ExperimentConfig, NoopSink};
use gossip_sim_types::{TopicName, TopicTable};
use std::collections::HashSet;
use std::sync::Arc;

fn example_topics() -> TopicTable {
    TopicTable::new()
        .with_topic("foo", 0.7)
        .with_topic("bar", 0.4)
        .with_topic("quix", 0.8)
}

async fn setup(config: ExperimentConfig) -> Experiment<MemoryNode> {
    Experiment::setup(&MemoryNetwork::default(), config, Arc::new(NoopSink))
        .await
        .expect("setup failed")
}

/// 10 nodes at degree 4 from seed 1234: every node ends with at least four
/// distinct peers and none of them is itself.
#[tokio::test]
async fn test_ten_nodes_degree_four() {
    let experiment = setup(ExperimentConfig::new(10, 4).with_seed(1234)).await;

    let expected: Vec<(usize, usize)> = vec![
        (0, 4), (0, 2), (0, 8), (0, 1),
        (1, 4), (1, 3), (1, 7),
        (2, 5), (2, 6), (2, 7),
        (3, 6), (3, 0), (3, 4),
        (4, 8),
        (5, 9), (5, 1), (5, 8),
        (6, 1), (6, 9),
        (7, 4), (7, 3),
        (8, 9),
        (9, 4),
    ];
    assert_eq!(experiment.edges(), expected.as_slice());

    let degrees: Vec<usize> = experiment.nodes().iter().map(|node| node.degree()).collect();
    assert_eq!(degrees, [5, 6, 4, 5, 6, 4, 4, 4, 4, 4]);

    for node in experiment.nodes() {
        let peers = node.handle().connections();
        assert!(peers.len() >= 4, "node {} has {} peers", node.index(), peers.len());
        assert!(!peers.contains(&node.id()));
        assert_eq!(peers.iter().collect::<HashSet<_>>().len(), peers.len());
    }
}

/// The same seed dials the same index pairs in the same order.
#[tokio::test]
async fn test_same_seed_same_topology() {
    let first = setup(ExperimentConfig::new(40, 6).with_seed(77)).await;
    let second = setup(ExperimentConfig::new(40, 6).with_seed(77)).await;
    assert_eq!(first.edges(), second.edges());

    let other = setup(ExperimentConfig::new(40, 6).with_seed(78)).await;
    assert_ne!(first.edges(), other.edges());
}

/// Topics assigned from seed 42 in table order pick fixed members, each
/// topic drawing from its own stream.
#[tokio::test]
async fn test_topic_assignment_fixture() {
    let config = || {
        ExperimentConfig::new(10, 4)
            .with_seed(1234)
            .with_topic_seed(42)
            .with_topics(example_topics())
    };

    let first = setup(config()).await;
    let second = setup(config()).await;
    assert_eq!(first.assignments(), second.assignments());

    let expected: Vec<(TopicName, Vec<usize>)> = vec![
        ("foo".into(), vec![0, 2, 3, 4, 5, 6, 9]),
        ("bar".into(), vec![0, 5]),
        ("quix".into(), vec![1, 2, 3, 5, 7, 8]),
    ];
    assert_eq!(first.assignments(), expected.as_slice());

    // Each node's subscription set agrees with the recorded assignment.
    for (topic, members) in first.assignments() {
        for node in first.nodes() {
            let subscribed = node.subscriptions().contains(topic);
            assert_eq!(subscribed, members.contains(&node.index()), "{topic} / {}", node.index());
        }
    }
}

/// Changing only the topology seed leaves topic membership untouched when
/// topics have their own seed.
#[tokio::test]
async fn test_topic_seed_independent_of_topology_seed() {
    let base = ExperimentConfig::new(12, 3)
        .with_topic_seed(42)
        .with_topics(example_topics());

    let a = setup(base.clone().with_seed(1)).await;
    let b = setup(base.with_seed(2)).await;
    assert_ne!(a.edges(), b.edges());
    assert_eq!(a.assignments(), b.assignments());
}

/// Chance 0 subscribes nobody and chance 1 subscribes everybody.
#[tokio::test]
async fn test_extreme_chances() {
    let experiment = setup(
        ExperimentConfig::new(8, 2).with_topics(
            TopicTable::new()
                .with_topic("never", 0.0)
                .with_topic("always", 1.0),
        ),
    )
    .await;

    assert_eq!(experiment.assignments()[0], (TopicName::from("never"), Vec::<usize>::new()));
    assert_eq!(
        experiment.assignments()[1],
        (TopicName::from("always"), (0..8usize).collect::<Vec<_>>())
    );
    for node in experiment.nodes() {
        assert_eq!(node.subscriptions(), vec![TopicName::from("always")]);
    }
}
