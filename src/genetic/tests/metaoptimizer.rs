use approx::assert_abs_diff_eq;

use super::evaluated;
use crate::assert_err;
use crate::genetic::{
    AggregatedStats, GaError, Genome, MetaOptimizer, NodeStats, Population, SquaredDistance,
    StopCondition,
};

fn stats(node: usize, best: Genome, mean_fitness: f32, population: usize) -> NodeStats {
    NodeStats {
        node,
        best,
        mean_fitness,
        population,
    }
}

fn history(best: &[f32]) -> Vec<AggregatedStats> {
    best.iter()
        .enumerate()
        .map(|(cycle, &f)| AggregatedStats {
            cycle,
            best_fitness: f,
            mean_fitness: f,
            genome: evaluated(cycle as u64, &[0.0], f),
        })
        .collect()
}

#[test]
fn test_extract() -> Result<(), GaError> {
    let population = Population::new(vec![evaluated(1, &[0.0], 2.0), evaluated(2, &[1.0], 4.0)]);
    let s = MetaOptimizer::BestGenome.extract(3, &population)?;
    assert_eq!(s.node, 3);
    assert_eq!(s.best.id, 1);
    assert_eq!(s.mean_fitness, 3.0);
    assert_eq!(s.population, 2);

    assert_err!(
        MetaOptimizer::BestGenome.extract(0, &Population::default()),
        GaError::EmptyPopulation(_)
    );
    Ok(())
}

#[test]
fn test_best_genome_aggregation() -> Result<(), GaError> {
    let fitness = SquaredDistance::new(vec![0.0, 0.0]);
    let all = vec![
        stats(0, evaluated(10, &[1.0, 1.0], 2.0), 3.0, 10),
        stats(1, evaluated(20, &[0.5, 0.0], 0.25), 1.0, 30),
    ];
    let aggregated = MetaOptimizer::BestGenome.aggregate(4, &all, 99, &fitness)?;
    assert_eq!(aggregated.cycle, 4);
    assert_eq!(aggregated.genome.id, 20);
    assert_eq!(aggregated.best_fitness, 0.25);
    // 按种群大小加权：(3·10 + 1·30) / 40
    assert_abs_diff_eq!(aggregated.mean_fitness, 1.5);

    assert_err!(
        MetaOptimizer::BestGenome.aggregate(0, &[], 1, &fitness),
        GaError::EmptyPopulation(_)
    );
    Ok(())
}

#[test]
fn test_weighted_average_aggregation() -> Result<(), GaError> {
    let fitness = SquaredDistance::new(vec![0.0, 0.0]);
    // 权重 1/(1+0) = 1 与 1/(1+1) = 0.5
    let all = vec![
        stats(0, evaluated(10, &[0.0, 3.0], 9.0), 9.0, 5),
        stats(1, evaluated(20, &[3.0, 0.0], 10.0), 10.0, 5),
    ];
    let aggregated = MetaOptimizer::WeightedAverage.aggregate(0, &all, 77, &fitness)?;
    assert_eq!(aggregated.genome.id, 77);
    assert_abs_diff_eq!(aggregated.genome.params[0], 1.0, epsilon = 1e-6);
    assert_abs_diff_eq!(aggregated.genome.params[1], 2.0, epsilon = 1e-6);
    // 合成的基因组已被评估：1 + 4
    assert_abs_diff_eq!(aggregated.best_fitness, 5.0, epsilon = 1e-5);
    assert_eq!(aggregated.genome.fitness, Some(aggregated.best_fitness));
    Ok(())
}

#[test]
fn test_weighted_average_keeps_better_single_genome() -> Result<(), GaError> {
    // 两个对称的解平均之后反而更差
    let fitness = SquaredDistance::new(vec![1.0]);
    let all = vec![
        stats(0, evaluated(10, &[1.0], 0.0), 0.0, 5),
        stats(1, evaluated(20, &[-1.0], 4.0), 4.0, 5),
    ];
    let aggregated = MetaOptimizer::WeightedAverage.aggregate(0, &all, 77, &fitness)?;
    assert_eq!(aggregated.genome.id, 10);
    assert_eq!(aggregated.best_fitness, 0.0);
    Ok(())
}

#[test]
fn test_weighted_average_length_mismatch() {
    let fitness = SquaredDistance::new(vec![0.0]);
    let all = vec![
        stats(0, evaluated(10, &[1.0], 1.0), 1.0, 1),
        stats(1, evaluated(20, &[1.0, 2.0], 1.0), 1.0, 1),
    ];
    assert_err!(
        MetaOptimizer::WeightedAverage.aggregate(0, &all, 1, &fitness),
        GaError::GenomeLength { expected: 1, got: 2 }
    );
}

#[test]
fn test_stop_condition() {
    let max_only = StopCondition {
        max_cycles: 3,
        target_fitness: None,
        patience: None,
    };
    assert!(!max_only.should_stop(&[]));
    assert!(!max_only.should_stop(&history(&[5.0, 4.0])));
    assert!(max_only.should_stop(&history(&[5.0, 4.0, 3.0])));

    let target = StopCondition {
        max_cycles: 100,
        target_fitness: Some(0.5),
        patience: None,
    };
    assert!(!target.should_stop(&history(&[2.0, 0.6])));
    assert!(target.should_stop(&history(&[2.0, 0.5])));

    let patience = StopCondition {
        max_cycles: 100,
        target_fitness: None,
        patience: Some(2),
    };
    assert!(!patience.should_stop(&history(&[3.0, 3.0])));
    assert!(!patience.should_stop(&history(&[3.0, 3.0, 2.0])));
    assert!(patience.should_stop(&history(&[3.0, 3.0, 2.0, 2.0, 2.0])));
}
