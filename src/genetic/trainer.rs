/*
 * @Author       : 老董
 * @Date         : 2026-02-14
 * @LastEditors  : 老董
 * @LastEditTime : 2026-03-02
 * @Description  : 分布式遗传训练器。状态机：
 *                 Init -> (LocalTick -> AggregateBest -> BroadcastBest)* -> Terminated
 *
 * - Init：每个节点槽位生成并评估初始种群，快照写入缓存
 * - LocalTick：各节点并行地读快照、演化若干代、写回快照
 * - AggregateBest：元优化器从各节点提取统计量并汇总出全局最优，写入缓存
 * - BroadcastBest：各节点把全局最优拼接进本地种群；随后根据停止条件决定是否进入下一周期
 *
 * 节点之间不共享任何内存，只经由缓存交换序列化快照；全局最优每个周期汇总一次（最终一致）。
 */

use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::cache::{GridCache, best_key, get_typed, population_key, put_typed};
use super::operators::{EvolutionaryOperator, Operator, default_operators, select_operator};
use super::{
    AggregatedStats, FitnessFunction, GaError, Genome, MetaOptimizer, NodeStats, Population,
    StopCondition, TrainingContext,
};

/// 训练参数，缺省字段取默认值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaTrainerInput {
    pub population_per_node: usize,
    /// 每个周期内各节点本地演化的代数
    pub ticks_per_cycle: usize,
    pub operators: Vec<Operator>,
    pub tournament_size: usize,
    pub meta_optimizer: MetaOptimizer,
    pub stop: StopCondition,
    pub seed: u64,
}

impl Default for GaTrainerInput {
    fn default() -> Self {
        Self {
            population_per_node: 20,
            ticks_per_cycle: 10,
            operators: default_operators(),
            tournament_size: 3,
            meta_optimizer: MetaOptimizer::BestGenome,
            stop: StopCondition::default(),
            seed: 42,
        }
    }
}

impl GaTrainerInput {
    fn validate(&self) -> Result<(), GaError> {
        if self.population_per_node == 0 {
            return Err(GaError::InvalidArgument("每个节点的种群大小须大于0".to_owned()));
        }
        if self.tournament_size == 0 {
            return Err(GaError::InvalidArgument("锦标赛规模须大于0".to_owned()));
        }
        if !self.operators.iter().any(|op| op.probability() > 0.0) {
            return Err(GaError::InvalidArgument("至少需要一个概率大于0的进化算子".to_owned()));
        }
        if self.stop.max_cycles == 0 {
            return Err(GaError::InvalidArgument("最大周期数须大于0".to_owned()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GaTrainerState {
    Init,
    LocalTick { cycle: usize },
    AggregateBest { cycle: usize },
    BroadcastBest { cycle: usize },
    Terminated { cycles: usize },
}

/// 一个节点槽位写入缓存的快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub slot: usize,
    /// 本槽位下一个可用的基因组编号
    pub next_id: u64,
    pub population: Population,
}

impl NodeSnapshot {
    fn take_id(&mut self) -> u64 {
        let id = genome_id(self.slot, self.next_id);
        self.next_id += 1;
        id
    }
}

/// 各槽位的基因组 id 互不重叠；前缀0留给汇总生成的基因组
fn genome_id(slot: usize, counter: u64) -> u64 {
    ((slot as u64 + 1) << 40) + counter
}

fn node_rng(seed: u64, slot: usize, cycle: usize) -> StdRng {
    let mixed = seed
        ^ (slot as u64 + 1).wrapping_mul(0x9e37_79b9_7f4a_7c15)
        ^ (cycle as u64).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    StdRng::seed_from_u64(mixed)
}

pub struct GaTrainer {
    cache: Arc<dyn GridCache>,
    context: TrainingContext,
    fitness: Arc<dyn FitnessFunction>,
    state: GaTrainerState,
    history: Vec<AggregatedStats>,
}

impl std::fmt::Debug for GaTrainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GaTrainer")
            .field("training_id", &self.context.training_id)
            .field("nodes", &self.cache.nodes())
            .field("state", &self.state)
            .field("cycles", &self.history.len())
            .finish()
    }
}

impl GaTrainer {
    /// 从缓存查回训练上下文并构造适应度函数
    pub fn new(cache: Arc<dyn GridCache>, training_id: &str) -> Result<Self, GaError> {
        let context = TrainingContext::lookup(cache.as_ref(), training_id)?;
        context.input.validate()?;
        let fitness = context
            .fitness
            .build(cache.as_ref(), training_id, context.dataset_size)?;
        Ok(Self {
            cache,
            context,
            fitness,
            state: GaTrainerState::Init,
            history: Vec::new(),
        })
    }

    pub const fn state(&self) -> GaTrainerState {
        self.state
    }

    /// 每个周期的汇总结果
    pub fn history(&self) -> &[AggregatedStats] {
        &self.history
    }

    pub const fn context(&self) -> &TrainingContext {
        &self.context
    }

    fn input(&self) -> &GaTrainerInput {
        &self.context.input
    }

    fn slots(&self) -> usize {
        self.cache.nodes()
    }

    /// 执行一次状态转移并返回新状态；已终止时不做任何事
    pub fn step(&mut self) -> Result<GaTrainerState, GaError> {
        let next = match self.state {
            GaTrainerState::Init => {
                self.for_each_slot(|slot| self.init_slot(slot))?;
                info!(
                    training = %self.context.training_id,
                    nodes = self.slots(),
                    population = self.input().population_per_node,
                    "初始种群已生成"
                );
                GaTrainerState::LocalTick { cycle: 0 }
            }
            GaTrainerState::LocalTick { cycle } => {
                self.for_each_slot(|slot| self.local_tick(slot, cycle))?;
                GaTrainerState::AggregateBest { cycle }
            }
            GaTrainerState::AggregateBest { cycle } => {
                let stats = self.for_each_slot(|slot| self.extract_stats(slot))?;
                let aggregated = self.input().meta_optimizer.aggregate(
                    cycle,
                    &stats,
                    cycle as u64 + 1,
                    self.fitness.as_ref(),
                )?;
                put_typed(
                    self.cache.as_ref(),
                    &best_key(&self.context.training_id),
                    &aggregated.genome,
                )?;
                info!(
                    training = %self.context.training_id,
                    cycle,
                    best = aggregated.best_fitness,
                    mean = aggregated.mean_fitness,
                    "周期汇总完成"
                );
                self.history.push(aggregated);
                GaTrainerState::BroadcastBest { cycle }
            }
            GaTrainerState::BroadcastBest { cycle } => {
                let best: Genome = get_typed(self.cache.as_ref(), &best_key(&self.context.training_id))?;
                self.for_each_slot(|slot| self.splice_best(slot, &best))?;
                if self.input().stop.should_stop(&self.history) {
                    info!(training = %self.context.training_id, cycles = cycle + 1, "满足停止条件，训练结束");
                    GaTrainerState::Terminated { cycles: cycle + 1 }
                } else {
                    GaTrainerState::LocalTick { cycle: cycle + 1 }
                }
            }
            terminated @ GaTrainerState::Terminated { .. } => terminated,
        };
        self.state = next;
        Ok(next)
    }

    /// 一直运行到终止，返回全局最优基因组
    pub fn run(&mut self) -> Result<Genome, GaError> {
        while !matches!(self.state, GaTrainerState::Terminated { .. }) {
            self.step()?;
        }
        self.best()
    }

    /// 当前缓存中的全局最优基因组
    pub fn best(&self) -> Result<Genome, GaError> {
        get_typed(self.cache.as_ref(), &best_key(&self.context.training_id))
    }

    pub fn snapshot(&self, slot: usize) -> Result<NodeSnapshot, GaError> {
        get_typed(
            self.cache.as_ref(),
            &population_key(&self.context.training_id, slot),
        )
    }

    fn store(&self, snapshot: &NodeSnapshot) -> Result<(), GaError> {
        put_typed(
            self.cache.as_ref(),
            &population_key(&self.context.training_id, snapshot.slot),
            snapshot,
        )
    }

    /// 各节点槽位并行执行
    fn for_each_slot<T, F>(&self, f: F) -> Result<Vec<T>, GaError>
    where
        T: Send,
        F: Fn(usize) -> Result<T, GaError> + Sync + Send,
    {
        (0..self.slots()).into_par_iter().map(f).collect()
    }

    fn init_slot(&self, slot: usize) -> Result<(), GaError> {
        let mut snapshot = NodeSnapshot {
            slot,
            next_id: 0,
            population: Population::default(),
        };
        let genomes = (0..self.input().population_per_node)
            .map(|_| self.context.genome_factory.create(snapshot.take_id()))
            .collect::<Result<Vec<_>, _>>()?;
        snapshot.population = Population::new(genomes);
        snapshot.population.evaluate(self.fitness.as_ref())?;
        self.store(&snapshot)
    }

    fn local_tick(&self, slot: usize, cycle: usize) -> Result<(), GaError> {
        let input = self.input();
        let mut snapshot = self.snapshot(slot)?;
        let mut rng = node_rng(input.seed, slot, cycle);
        let mut replaced = 0;

        for _ in 0..input.ticks_per_cycle {
            let Some(op) = select_operator(&input.operators, &mut rng) else {
                break;
            };
            let parents = (0..op.parents_needed())
                .map(|_| snapshot.population.tournament(&mut rng, input.tournament_size))
                .collect::<Result<Vec<_>, _>>()?;
            let children = op.apply(&parents, &mut rng);

            for params in children {
                let mut child = Genome::new(snapshot.take_id(), params);
                child.fitness = Some(self.fitness.evaluate(&child.params)?);
                if snapshot.population.replace_worst(child) {
                    replaced += 1;
                }
            }
        }

        debug!(
            slot,
            cycle,
            replaced,
            best = snapshot.population.best().map(Genome::fitness_or_worst),
            "本地演化完成"
        );
        self.store(&snapshot)
    }

    fn extract_stats(&self, slot: usize) -> Result<NodeStats, GaError> {
        let snapshot = self.snapshot(slot)?;
        let node = self
            .cache
            .affinity(&population_key(&self.context.training_id, slot));
        self.input().meta_optimizer.extract(node, &snapshot.population)
    }

    fn splice_best(&self, slot: usize, best: &Genome) -> Result<(), GaError> {
        let mut snapshot = self.snapshot(slot)?;
        snapshot.population.splice(best.clone());
        self.store(&snapshot)
    }
}
