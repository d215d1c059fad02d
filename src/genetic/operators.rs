/*
 * @Author       : 老董
 * @Date         : 2026-02-14
 * @LastEditors  : 老董
 * @LastEditTime : 2026-03-02
 * @Description  : 进化算子。每个算子声明自己需要几个父代、产生几个子代、以多大概率被选中，
 *                 具体种类收拢在封闭的 Operator 枚举里，由 enum_dispatch 分发
 */

use enum_dispatch::enum_dispatch;
use rand::Rng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use super::Genome;
use crate::tensor::Tensor;

#[enum_dispatch]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operator {
    UniformCrossover(UniformCrossover),
    WeightMutation(WeightMutation),
    NodeMutation(NodeMutation),
}

#[enum_dispatch(Operator)]
pub trait EvolutionaryOperator {
    fn name(&self) -> &'static str;

    fn parents_needed(&self) -> usize;

    fn offspring_produced(&self) -> usize;

    /// 被选中的相对概率（按所有算子的总和归一化）
    fn probability(&self) -> f32;

    /// `parents`的个数须等于`parents_needed()`，返回`offspring_produced()`个参数向量
    fn apply(&self, parents: &[&Genome], rng: &mut StdRng) -> Vec<Vec<f32>>;
}

/// 逐位以 1/2 概率从两个父代中取值，两个子代互补
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniformCrossover {
    pub probability: f32,
}

impl EvolutionaryOperator for UniformCrossover {
    fn name(&self) -> &'static str {
        "UniformCrossover"
    }

    fn parents_needed(&self) -> usize {
        2
    }

    fn offspring_produced(&self) -> usize {
        2
    }

    fn probability(&self) -> f32 {
        self.probability
    }

    fn apply(&self, parents: &[&Genome], rng: &mut StdRng) -> Vec<Vec<f32>> {
        let (a, b) = (&parents[0].params, &parents[1].params);
        let mut first = Vec::with_capacity(a.len());
        let mut second = Vec::with_capacity(a.len());
        for (&x, &y) in a.iter().zip(b) {
            if rng.r#gen::<bool>() {
                first.push(x);
                second.push(y);
            } else {
                first.push(y);
                second.push(x);
            }
        }
        vec![first, second]
    }
}

/// 每个参数以`rate`的概率加上N(0, std²)的高斯噪声
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightMutation {
    pub probability: f32,
    pub rate: f32,
    pub std: f32,
}

impl EvolutionaryOperator for WeightMutation {
    fn name(&self) -> &'static str {
        "WeightMutation"
    }

    fn parents_needed(&self) -> usize {
        1
    }

    fn offspring_produced(&self) -> usize {
        1
    }

    fn probability(&self) -> f32 {
        self.probability
    }

    fn apply(&self, parents: &[&Genome], rng: &mut StdRng) -> Vec<Vec<f32>> {
        let mut child = parents[0].params.clone();
        let noise = Tensor::normal_with_rng(0.0, self.std, &[child.len()], rng).to_vec();
        for (w, n) in child.iter_mut().zip(noise) {
            if rng.r#gen::<f32>() < self.rate {
                *w += n;
            }
        }
        vec![child]
    }
}

/// 随机选一段长度为`block_size`的连续参数（对应一个节点的权重），整段重新采样
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeMutation {
    pub probability: f32,
    pub block_size: usize,
    pub std: f32,
}

impl EvolutionaryOperator for NodeMutation {
    fn name(&self) -> &'static str {
        "NodeMutation"
    }

    fn parents_needed(&self) -> usize {
        1
    }

    fn offspring_produced(&self) -> usize {
        1
    }

    fn probability(&self) -> f32 {
        self.probability
    }

    fn apply(&self, parents: &[&Genome], rng: &mut StdRng) -> Vec<Vec<f32>> {
        let mut child = parents[0].params.clone();
        let block = self.block_size.min(child.len());
        if block == 0 {
            return vec![child];
        }
        let start = rng.gen_range(0..=child.len() - block);
        let fresh = Tensor::normal_with_rng(0.0, self.std, &[block], rng).to_vec();
        child[start..start + block].copy_from_slice(&fresh);
        vec![child]
    }
}

/// 按相对概率挑一个算子；全部概率为0时返回`None`
pub fn select_operator<'a>(operators: &'a [Operator], rng: &mut StdRng) -> Option<&'a Operator> {
    let total: f32 = operators.iter().map(|op| op.probability().max(0.0)).sum();
    if total <= 0.0 {
        return None;
    }
    let mut ticket = rng.r#gen::<f32>() * total;
    for op in operators {
        let p = op.probability().max(0.0);
        if ticket < p {
            return Some(op);
        }
        ticket -= p;
    }
    operators.iter().rev().find(|op| op.probability() > 0.0)
}

pub fn default_operators() -> Vec<Operator> {
    vec![
        UniformCrossover { probability: 0.7 }.into(),
        WeightMutation {
            probability: 0.3,
            rate: 0.1,
            std: 0.1,
        }
        .into(),
        NodeMutation {
            probability: 0.1,
            block_size: 4,
            std: 0.5,
        }
        .into(),
    ]
}
