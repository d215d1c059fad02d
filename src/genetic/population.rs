/*
 * @Author       : 老董
 * @Date         : 2026-02-14
 * @LastEditors  : 老董
 * @LastEditTime : 2026-03-02
 * @Description  : 单个节点上的种群
 */

use rand::Rng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use super::{FitnessFunction, GaError, Genome};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Population {
    genomes: Vec<Genome>,
}

impl Population {
    pub fn new(genomes: Vec<Genome>) -> Self {
        Self { genomes }
    }

    pub fn genomes(&self) -> &[Genome] {
        &self.genomes
    }

    pub fn len(&self) -> usize {
        self.genomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genomes.is_empty()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.genomes.iter().any(|g| g.id == id)
    }

    /// 评估所有尚未评估的基因组
    pub fn evaluate(&mut self, fitness: &dyn FitnessFunction) -> Result<(), GaError> {
        for genome in self.genomes.iter_mut().filter(|g| !g.is_evaluated()) {
            genome.fitness = Some(fitness.evaluate(&genome.params)?);
        }
        Ok(())
    }

    /// 适应度最低者；未评估的排在最后
    pub fn best(&self) -> Option<&Genome> {
        self.genomes
            .iter()
            .min_by(|a, b| a.fitness_or_worst().total_cmp(&b.fitness_or_worst()))
    }

    fn worst_index(&self) -> Option<usize> {
        self.genomes
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.fitness_or_worst().total_cmp(&b.fitness_or_worst()))
            .map(|(i, _)| i)
    }

    /// 已评估基因组的平均适应度
    pub fn mean_fitness(&self) -> Option<f32> {
        let values = self.genomes.iter().filter_map(|g| g.fitness).collect::<Vec<_>>();
        if values.is_empty() {
            return None;
        }
        Some(values.iter().sum::<f32>() / values.len() as f32)
    }

    /// 锦标赛选择：有放回地抽`size`个，取其中最好的
    pub fn tournament(&self, rng: &mut StdRng, size: usize) -> Result<&Genome, GaError> {
        if self.genomes.is_empty() {
            return Err(GaError::EmptyPopulation("无法进行锦标赛选择".to_owned()));
        }
        let mut winner = &self.genomes[rng.gen_range(0..self.genomes.len())];
        for _ in 1..size.max(1) {
            let candidate = &self.genomes[rng.gen_range(0..self.genomes.len())];
            if candidate.fitness_or_worst() < winner.fitness_or_worst() {
                winner = candidate;
            }
        }
        Ok(winner)
    }

    /// 子代比最差者好时替换之，返回是否发生替换。子代须已评估
    pub fn replace_worst(&mut self, child: Genome) -> bool {
        match self.worst_index() {
            Some(i) if child.fitness_or_worst() < self.genomes[i].fitness_or_worst() => {
                self.genomes[i] = child;
                true
            }
            Some(_) => false,
            None => {
                self.genomes.push(child);
                true
            }
        }
    }

    /// 把全局最优拼接进本地种群：已存在同 id 的个体时不做任何事，否则无条件顶替最差者
    pub fn splice(&mut self, genome: Genome) {
        if self.contains(genome.id) {
            return;
        }
        match self.worst_index() {
            Some(i) => self.genomes[i] = genome,
            None => self.genomes.push(genome),
        }
    }
}
