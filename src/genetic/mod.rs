/*
 * @Author       : 老董
 * @Date         : 2026-02-14
 * @LastEditors  : 老董
 * @LastEditTime : 2026-03-02
 * @Description  : 分布式遗传训练：基因组是计算图的扁平参数向量，
 *                 各节点在本地种群上演化，经由分区缓存交换快照并周期性地汇总全局最优
 */

pub mod cache;
mod context;
mod error;
mod fitness;
mod genome;
mod metaoptimizer;
pub mod operators;
mod population;
mod trainer;

pub use cache::{GridCache, LocalGrid, NodeId};
pub use context::TrainingContext;
pub use error::GaError;
pub use fitness::{
    DataBatch, FitnessFunction, FitnessSpec, GraphFitness, SquaredDistance, load_dataset,
    publish_dataset,
};
pub use genome::{Genome, GenomeFactory};
pub use metaoptimizer::{AggregatedStats, MetaOptimizer, NodeStats, StopCondition};
pub use operators::{EvolutionaryOperator, NodeMutation, Operator, UniformCrossover, WeightMutation};
pub use population::Population;
pub use trainer::{GaTrainer, GaTrainerInput, GaTrainerState, NodeSnapshot};

#[cfg(test)]
mod tests;
