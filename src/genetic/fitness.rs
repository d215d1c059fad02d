/*
 * @Author       : 老董
 * @Date         : 2026-02-14
 * @LastEditors  : 老董
 * @LastEditTime : 2026-03-02
 * @Description  : 适应度函数。基因组的适应度越低越好：对计算图而言就是在数据批上的平均分数（损失）
 */

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::GaError;
use super::cache::{GridCache, batch_key, get_typed};
use crate::nn::{ComputationGraph, ComputationGraphConfiguration};
use crate::tensor::Tensor;

pub trait FitnessFunction: Send + Sync {
    fn evaluate(&self, params: &[f32]) -> Result<f32, GaError>;
}

/// 一个数据批：每个网络输入一个张量，每个网络输出一个标签
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataBatch {
    pub inputs: Vec<Tensor>,
    pub labels: Vec<Tensor>,
}

impl DataBatch {
    pub fn new(inputs: Vec<Tensor>, labels: Vec<Tensor>) -> Self {
        Self { inputs, labels }
    }

    pub fn single(input: Tensor, labels: Tensor) -> Self {
        Self::new(vec![input], vec![labels])
    }
}

/// 把数据集按批写入缓存，返回批数（即训练上下文里的数据集大小）
pub fn publish_dataset(cache: &dyn GridCache, training_id: &str, batches: &[DataBatch]) -> Result<usize, GaError> {
    let entries = batches
        .iter()
        .enumerate()
        .map(|(i, batch)| Ok((batch_key(training_id, i), bincode::serialize(batch)?)))
        .collect::<Result<Vec<_>, GaError>>()?;
    cache.put_all(entries);
    Ok(batches.len())
}

pub fn load_dataset(cache: &dyn GridCache, training_id: &str, dataset_size: usize) -> Result<Vec<DataBatch>, GaError> {
    (0..dataset_size)
        .map(|i| get_typed(cache, &batch_key(training_id, i)))
        .collect()
}

/// 以基因组为参数的计算图在所有数据批上的平均分数
pub struct GraphFitness {
    conf: ComputationGraphConfiguration,
    batches: Vec<DataBatch>,
}

impl GraphFitness {
    pub fn new(conf: ComputationGraphConfiguration, batches: Vec<DataBatch>) -> Self {
        Self { conf, batches }
    }
}

impl FitnessFunction for GraphFitness {
    fn evaluate(&self, params: &[f32]) -> Result<f32, GaError> {
        let expected = self.conf.num_params();
        if params.len() != expected {
            return Err(GaError::GenomeLength {
                expected,
                got: params.len(),
            });
        }
        if self.batches.is_empty() {
            return Err(GaError::InvalidArgument("适应度评估需要至少一个数据批".to_owned()));
        }
        let mut graph = ComputationGraph::new(self.conf.clone());
        graph.init_with(Some(params.to_vec()))?;
        let mut total = 0.0;
        for batch in &self.batches {
            total += graph.score(&batch.inputs, &batch.labels, false)?;
        }
        Ok(total / self.batches.len() as f32)
    }
}

/// 到目标向量的平方距离；适合不依赖数据集的演化
pub struct SquaredDistance {
    target: Vec<f32>,
}

impl SquaredDistance {
    pub fn new(target: Vec<f32>) -> Self {
        Self { target }
    }
}

impl FitnessFunction for SquaredDistance {
    fn evaluate(&self, params: &[f32]) -> Result<f32, GaError> {
        if params.len() != self.target.len() {
            return Err(GaError::GenomeLength {
                expected: self.target.len(),
                got: params.len(),
            });
        }
        Ok(params.iter().zip(&self.target).map(|(p, t)| (p - t).powi(2)).sum())
    }
}

/// 可序列化的适应度描述，随训练上下文一起发布到缓存，由各节点各自构造适应度函数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FitnessSpec {
    /// 数据批从缓存读取
    Graph { conf: ComputationGraphConfiguration },
    SquaredDistance { target: Vec<f32> },
}

impl FitnessSpec {
    pub fn build(
        &self,
        cache: &dyn GridCache,
        training_id: &str,
        dataset_size: usize,
    ) -> Result<Arc<dyn FitnessFunction>, GaError> {
        let fitness: Arc<dyn FitnessFunction> = match self {
            Self::Graph { conf } => Arc::new(GraphFitness::new(
                conf.clone(),
                load_dataset(cache, training_id, dataset_size)?,
            )),
            Self::SquaredDistance { target } => Arc::new(SquaredDistance::new(target.clone())),
        };
        Ok(fitness)
    }
}
