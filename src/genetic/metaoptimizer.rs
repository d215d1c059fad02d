/*
 * @Author       : 老董
 * @Date         : 2026-02-14
 * @LastEditors  : 老董
 * @LastEditTime : 2026-03-02
 * @Description  : 元优化器：从每个节点的种群提取统计量，汇总成一个全局最优基因组再分发回各节点；
 *                 以及基于汇总统计的停止条件
 */

use serde::{Deserialize, Serialize};

use super::cache::NodeId;
use super::{FitnessFunction, GaError, Genome, Population};

/// 单个节点在一个周期结束时的统计量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeStats {
    pub node: NodeId,
    pub best: Genome,
    pub mean_fitness: f32,
    pub population: usize,
}

/// 一个全局周期的汇总结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedStats {
    pub cycle: usize,
    pub best_fitness: f32,
    /// 各节点平均适应度按种群大小加权
    pub mean_fitness: f32,
    pub genome: Genome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetaOptimizer {
    /// 直接取所有节点中适应度最低的基因组
    BestGenome,
    /// 各节点最优基因组的加权平均，权重为 1/(1 + (f - f_min))
    WeightedAverage,
}

impl MetaOptimizer {
    /// 从本地种群提取统计量；种群须已评估
    pub fn extract(&self, node: NodeId, population: &Population) -> Result<NodeStats, GaError> {
        let best = population
            .best()
            .cloned()
            .ok_or_else(|| GaError::EmptyPopulation(format!("节点{node}没有可提取的基因组")))?;
        Ok(NodeStats {
            node,
            mean_fitness: population.mean_fitness().unwrap_or(best.fitness_or_worst()),
            best,
            population: population.len(),
        })
    }

    /// 汇总所有节点的统计量。新合成的基因组（加权平均）使用`aggregate_id`并立即评估
    pub fn aggregate(
        &self,
        cycle: usize,
        stats: &[NodeStats],
        aggregate_id: u64,
        fitness: &dyn FitnessFunction,
    ) -> Result<AggregatedStats, GaError> {
        let best = stats
            .iter()
            .min_by(|a, b| a.best.fitness_or_worst().total_cmp(&b.best.fitness_or_worst()))
            .ok_or_else(|| GaError::EmptyPopulation("没有任何节点上报统计量".to_owned()))?;

        let total_population: usize = stats.iter().map(|s| s.population).sum();
        let mean_fitness = if total_population == 0 {
            best.mean_fitness
        } else {
            stats.iter().map(|s| s.mean_fitness * s.population as f32).sum::<f32>()
                / total_population as f32
        };

        let mut genome = match self {
            Self::BestGenome => best.best.clone(),
            Self::WeightedAverage => weighted_average(stats, aggregate_id)?,
        };
        if !genome.is_evaluated() {
            genome.fitness = Some(fitness.evaluate(&genome.params)?);
        }
        // 合成结果比不上最好的单个基因组时保留后者
        if genome.fitness_or_worst() > best.best.fitness_or_worst() {
            genome = best.best.clone();
        }

        Ok(AggregatedStats {
            cycle,
            best_fitness: genome.fitness_or_worst(),
            mean_fitness,
            genome,
        })
    }
}

fn weighted_average(stats: &[NodeStats], id: u64) -> Result<Genome, GaError> {
    let len = stats.first().map_or(0, |s| s.best.len());
    if let Some(bad) = stats.iter().find(|s| s.best.len() != len) {
        return Err(GaError::GenomeLength {
            expected: len,
            got: bad.best.len(),
        });
    }
    let f_min = stats
        .iter()
        .map(|s| s.best.fitness_or_worst())
        .fold(f32::INFINITY, f32::min);

    let mut params = vec![0.0; len];
    let mut weight_sum = 0.0;
    for s in stats {
        let weight = 1.0 / (1.0 + (s.best.fitness_or_worst() - f_min));
        if !weight.is_finite() || weight <= 0.0 {
            continue;
        }
        for (acc, &p) in params.iter_mut().zip(&s.best.params) {
            *acc += weight * p;
        }
        weight_sum += weight;
    }
    if weight_sum <= 0.0 {
        return Err(GaError::InvalidArgument("所有节点的最优基因组都未评估，无法加权平均".to_owned()));
    }
    params.iter_mut().for_each(|p| *p /= weight_sum);
    Ok(Genome::new(id, params))
}

/// 停止条件：满足任一项即停止
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopCondition {
    pub max_cycles: usize,
    /// 全局最优适应度不高于此值
    pub target_fitness: Option<f32>,
    /// 连续这么多个周期没有改进
    pub patience: Option<usize>,
}

impl Default for StopCondition {
    fn default() -> Self {
        Self {
            max_cycles: 10,
            target_fitness: None,
            patience: None,
        }
    }
}

impl StopCondition {
    pub fn should_stop(&self, history: &[AggregatedStats]) -> bool {
        if history.len() >= self.max_cycles {
            return true;
        }
        let Some(last) = history.last() else {
            return false;
        };
        if let Some(target) = self.target_fitness {
            if last.best_fitness <= target {
                return true;
            }
        }
        if let Some(patience) = self.patience {
            if history.len() > patience {
                let before = history[history.len() - 1 - patience].best_fitness;
                let recent_best = history[history.len() - patience..]
                    .iter()
                    .map(|s| s.best_fitness)
                    .fold(f32::INFINITY, f32::min);
                if recent_best >= before {
                    return true;
                }
            }
        }
        false
    }
}
