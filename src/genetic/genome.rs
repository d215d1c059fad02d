/*
 * @Author       : 老董
 * @Date         : 2026-02-14
 * @LastEditors  : 老董
 * @LastEditTime : 2026-03-02
 * @Description  : 基因组：编码后的参数向量（即计算图的扁平参数缓冲区）与其适应度。适应度越低越好
 */

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use super::GaError;
use crate::nn::{ComputationGraph, ComputationGraphConfiguration};
use crate::tensor::Tensor;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genome {
    pub id: u64,
    pub params: Vec<f32>,
    /// 未评估时为`None`
    pub fitness: Option<f32>,
}

impl Genome {
    pub fn new(id: u64, params: Vec<f32>) -> Self {
        Self {
            id,
            params,
            fitness: None,
        }
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub const fn is_evaluated(&self) -> bool {
        self.fitness.is_some()
    }

    /// 用于排序的适应度，未评估视为最差
    pub fn fitness_or_worst(&self) -> f32 {
        self.fitness.unwrap_or(f32::INFINITY)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), GaError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| GaError::io(path, e))?;
        Ok(bincode::serialize_into(BufWriter::new(file), self)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, GaError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| GaError::io(path, e))?;
        Ok(bincode::deserialize_from(BufReader::new(file))?)
    }
}

/// 基因组工厂：生成初始种群
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GenomeFactory {
    /// 以`seed + id`为种子初始化一张计算图，取其扁平参数
    FromGraph {
        conf: ComputationGraphConfiguration,
        seed: u64,
    },
    /// 每个参数在`[low, high]`内均匀采样
    Uniform {
        num_params: usize,
        low: f32,
        high: f32,
        seed: u64,
    },
}

impl GenomeFactory {
    pub fn from_graph(conf: ComputationGraphConfiguration) -> Self {
        let seed = conf.defaults.seed;
        Self::FromGraph { conf, seed }
    }

    pub fn num_params(&self) -> usize {
        match self {
            Self::FromGraph { conf, .. } => conf.num_params(),
            Self::Uniform { num_params, .. } => *num_params,
        }
    }

    pub fn create(&self, id: u64) -> Result<Genome, GaError> {
        let params = match self {
            Self::FromGraph { conf, seed } => {
                let mut conf = conf.clone();
                conf.defaults.seed = seed.wrapping_add(id);
                let mut graph = ComputationGraph::new(conf);
                graph.init()?;
                graph.params().to_vec()
            }
            Self::Uniform {
                num_params,
                low,
                high,
                seed,
            } => {
                if low > high {
                    return Err(GaError::InvalidArgument(format!(
                        "均匀分布的下界{low}大于上界{high}"
                    )));
                }
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(id));
                Tensor::uniform_with_rng(*low, *high, &[*num_params], &mut rng).to_vec()
            }
        };
        Ok(Genome::new(id, params))
    }
}
