/*
 * @Author       : 老董
 * @Date         : 2026-02-14
 * @LastEditors  : 老董
 * @LastEditTime : 2026-03-02
 * @Description  : 训练上下文：按训练 id 发布到缓存，各节点凭 id 查回基因组工厂、适应度描述与训练参数
 */

use serde::{Deserialize, Serialize};

use super::cache::{GridCache, context_key, get_typed, put_typed};
use super::{FitnessSpec, GaError, GaTrainerInput, GenomeFactory};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingContext {
    pub training_id: String,
    pub genome_factory: GenomeFactory,
    pub fitness: FitnessSpec,
    /// 缓存中数据批的个数
    pub dataset_size: usize,
    pub input: GaTrainerInput,
}

impl TrainingContext {
    pub fn new(
        training_id: &str,
        genome_factory: GenomeFactory,
        fitness: FitnessSpec,
        dataset_size: usize,
        input: GaTrainerInput,
    ) -> Self {
        Self {
            training_id: training_id.to_owned(),
            genome_factory,
            fitness,
            dataset_size,
            input,
        }
    }

    pub fn publish(&self, cache: &dyn GridCache) -> Result<(), GaError> {
        put_typed(cache, &context_key(&self.training_id), self)
    }

    pub fn lookup(cache: &dyn GridCache, training_id: &str) -> Result<Self, GaError> {
        match get_typed(cache, &context_key(training_id)) {
            Err(GaError::MissingKey(_)) => Err(GaError::UnknownTraining(training_id.to_owned())),
            other => other,
        }
    }
}
