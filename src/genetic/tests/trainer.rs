use std::collections::HashSet;
use std::sync::Arc;

use crate::assert_err;
use crate::genetic::cache::population_key;
use crate::genetic::{
    DataBatch, FitnessSpec, GaError, GaTrainer, GaTrainerInput, GaTrainerState, GenomeFactory,
    GridCache, LocalGrid, MetaOptimizer, StopCondition, TrainingContext, publish_dataset,
};
use crate::nn::{Activation, LayerConfig, LossFunction, NeuralNetConfig};
use crate::tensor::Tensor;

const TARGET: [f32; 6] = [0.5, -0.25, 1.0, 0.0, -1.0, 0.75];

fn quick_input(max_cycles: usize) -> GaTrainerInput {
    GaTrainerInput {
        population_per_node: 8,
        ticks_per_cycle: 6,
        stop: StopCondition {
            max_cycles,
            target_fitness: None,
            patience: None,
        },
        seed: 17,
        ..GaTrainerInput::default()
    }
}

fn distance_context(id: &str, input: GaTrainerInput) -> TrainingContext {
    TrainingContext::new(
        id,
        GenomeFactory::Uniform {
            num_params: TARGET.len(),
            low: -2.0,
            high: 2.0,
            seed: 5,
        },
        FitnessSpec::SquaredDistance {
            target: TARGET.to_vec(),
        },
        0,
        input,
    )
}

fn grid(nodes: usize) -> Arc<dyn GridCache> {
    Arc::new(LocalGrid::new(nodes))
}

#[test]
fn test_unknown_training() {
    let cache = grid(2);
    assert_err!(GaTrainer::new(cache, "missing"), GaError::UnknownTraining("missing"));
}

#[test]
fn test_invalid_input() -> Result<(), GaError> {
    let cache = grid(1);
    let input = GaTrainerInput {
        population_per_node: 0,
        ..GaTrainerInput::default()
    };
    distance_context("t", input).publish(cache.as_ref())?;
    assert_err!(GaTrainer::new(cache, "t"), GaError::InvalidArgument(_));
    Ok(())
}

#[test]
fn test_context_lookup() -> Result<(), GaError> {
    let cache = grid(3);
    let context = distance_context("ctx", quick_input(2));
    context.publish(cache.as_ref())?;
    assert_eq!(TrainingContext::lookup(cache.as_ref(), "ctx")?, context);
    Ok(())
}

#[test]
fn test_trainer_input_defaults_from_json() {
    let input: GaTrainerInput = serde_json::from_str(r#"{"population_per_node": 5}"#).unwrap();
    assert_eq!(input.population_per_node, 5);
    let defaults = GaTrainerInput::default();
    assert_eq!(input.ticks_per_cycle, defaults.ticks_per_cycle);
    assert_eq!(input.operators, defaults.operators);
    assert_eq!(input.meta_optimizer, MetaOptimizer::BestGenome);
}

#[test]
fn test_state_machine() -> Result<(), GaError> {
    let cache = grid(2);
    distance_context("sm", quick_input(2)).publish(cache.as_ref())?;
    let mut trainer = GaTrainer::new(cache.clone(), "sm")?;
    assert_eq!(trainer.state(), GaTrainerState::Init);

    let expected = [
        GaTrainerState::LocalTick { cycle: 0 },
        GaTrainerState::AggregateBest { cycle: 0 },
        GaTrainerState::BroadcastBest { cycle: 0 },
        GaTrainerState::LocalTick { cycle: 1 },
        GaTrainerState::AggregateBest { cycle: 1 },
        GaTrainerState::BroadcastBest { cycle: 1 },
        GaTrainerState::Terminated { cycles: 2 },
        GaTrainerState::Terminated { cycles: 2 },
    ];
    for state in expected {
        assert_eq!(trainer.step()?, state);
    }
    assert_eq!(trainer.history().len(), 2);

    // 每个槽位的快照都在缓存里，且都含有全局最优
    let best = trainer.best()?;
    for slot in 0..cache.nodes() {
        assert!(cache.get(&population_key("sm", slot)).is_some());
        let snapshot = trainer.snapshot(slot)?;
        assert_eq!(snapshot.slot, slot);
        assert_eq!(snapshot.population.len(), 8);
        assert!(snapshot.population.contains(best.id));
    }
    Ok(())
}

#[test]
fn test_run_improves_best_fitness() -> Result<(), GaError> {
    let cache = grid(3);
    let mut input = quick_input(6);
    input.ticks_per_cycle = 20;
    distance_context("run", input).publish(cache.as_ref())?;
    let mut trainer = GaTrainer::new(cache, "run")?;
    let best = trainer.run()?;

    let history = trainer.history();
    assert_eq!(history.len(), 6);
    // 最优基因组不会丢失，所以全局最优单调不增
    for pair in history.windows(2) {
        assert!(pair[1].best_fitness <= pair[0].best_fitness);
    }
    assert!(history[5].best_fitness < history[0].best_fitness);
    assert_eq!(best.fitness, Some(history[5].best_fitness));
    assert_eq!(best.len(), TARGET.len());
    Ok(())
}

#[test]
fn test_genome_ids_unique_across_nodes() -> Result<(), GaError> {
    let cache = grid(3);
    distance_context("ids", quick_input(2)).publish(cache.as_ref())?;
    let mut trainer = GaTrainer::new(cache.clone(), "ids")?;
    trainer.step()?;

    let mut ids = HashSet::new();
    for slot in 0..cache.nodes() {
        for genome in trainer.snapshot(slot)?.population.genomes() {
            assert!(ids.insert(genome.id), "重复的基因组 id {}", genome.id);
            assert!(genome.is_evaluated());
        }
    }
    assert_eq!(ids.len(), 3 * 8);
    Ok(())
}

#[test]
fn test_target_fitness_stops_early() -> Result<(), GaError> {
    let cache = grid(2);
    let mut input = quick_input(50);
    input.stop.target_fitness = Some(f32::INFINITY);
    distance_context("early", input).publish(cache.as_ref())?;
    let mut trainer = GaTrainer::new(cache, "early")?;
    trainer.run()?;
    assert_eq!(trainer.state(), GaTrainerState::Terminated { cycles: 1 });
    Ok(())
}

#[test]
fn test_weighted_average_run() -> Result<(), GaError> {
    let cache = grid(2);
    let mut input = quick_input(3);
    input.meta_optimizer = MetaOptimizer::WeightedAverage;
    distance_context("wa", input).publish(cache.as_ref())?;
    let mut trainer = GaTrainer::new(cache, "wa")?;
    let best = trainer.run()?;
    assert!(best.is_evaluated());
    for pair in trainer.history().windows(2) {
        assert!(pair[1].best_fitness <= pair[0].best_fitness);
    }
    Ok(())
}

#[test]
fn test_graph_fitness_from_cached_batches() -> Result<(), GaError> {
    // y = x1 - x2 的线性回归
    let conf = NeuralNetConfig::builder()
        .seed(1)
        .activation(Activation::Identity)
        .graph_builder()
        .add_inputs(&["x"])
        .add_layer("y", LayerConfig::output(2, 1, LossFunction::Mse), &["x"])
        .set_outputs(&["y"])
        .build()
        .unwrap();
    let batches = vec![
        DataBatch::single(
            Tensor::new(&[1., 0., 0., 1.], &[2, 2]),
            Tensor::new(&[1., -1.], &[2, 1]),
        ),
        DataBatch::single(
            Tensor::new(&[2., 1., -1., 1.], &[2, 2]),
            Tensor::new(&[1., -2.], &[2, 1]),
        ),
    ];

    let cache = grid(2);
    let dataset_size = publish_dataset(cache.as_ref(), "lin", &batches)?;
    assert_eq!(dataset_size, 2);
    TrainingContext::new(
        "lin",
        GenomeFactory::from_graph(conf.clone()),
        FitnessSpec::Graph { conf },
        dataset_size,
        quick_input(4),
    )
    .publish(cache.as_ref())?;

    let mut trainer = GaTrainer::new(cache, "lin")?;
    let best = trainer.run()?;
    assert_eq!(best.len(), 3);
    let history = trainer.history();
    assert!(history[3].best_fitness <= history[0].best_fitness);
    assert!(best.fitness.is_some_and(f32::is_finite));
    Ok(())
}

#[test]
fn test_graph_fitness_missing_batches() -> Result<(), GaError> {
    let conf = NeuralNetConfig::builder()
        .graph_builder()
        .add_inputs(&["x"])
        .add_layer("y", LayerConfig::output(2, 1, LossFunction::Mse), &["x"])
        .set_outputs(&["y"])
        .build()
        .unwrap();
    let cache = grid(1);
    TrainingContext::new(
        "nobatch",
        GenomeFactory::from_graph(conf.clone()),
        FitnessSpec::Graph { conf },
        2,
        quick_input(1),
    )
    .publish(cache.as_ref())?;
    assert_err!(GaTrainer::new(cache, "nobatch"), GaError::MissingKey(_));
    Ok(())
}
