/*
 * @Author       : 老董
 * @Date         : 2026-03-02
 * @Description  : 计算图作为 Model 交给求解器优化；fit 是训练入口
 */

use super::{ComputationGraph, GraphError};
use crate::nn::layers::Layer;
use crate::nn::optimize::{Model, OptimizationOutcome, ParamSpec, Solver};
use crate::tensor::Tensor;

impl Model for ComputationGraph {
    fn compute_gradient_and_score(&mut self) -> Result<f32, GraphError> {
        ComputationGraph::compute_gradient_and_score(self)
    }

    fn last_score(&self) -> f32 {
        self.score
    }

    fn num_params(&self) -> usize {
        ComputationGraph::num_params(self)
    }

    fn param_specs(&self) -> Vec<ParamSpec> {
        let mut specs = Vec::new();
        for &idx in &self.topological_order {
            let vertex = &self.vertices[idx];
            let Some(layer) = vertex.layer() else {
                continue;
            };
            let base = self.params.range(idx).start;
            let settings = layer.settings();
            for slot in layer.param_layout().slots() {
                specs.push(ParamSpec {
                    key: format!("{}_{}", vertex.name(), slot.key),
                    range: base + slot.offset..base + slot.offset + slot.len,
                    learning_rate: settings.learning_rate,
                    l1: settings.l1,
                    l2: settings.l2,
                    updater: settings.updater,
                    regularized: slot.regularized,
                });
            }
        }
        specs
    }

    fn params_and_gradients_mut(&mut self) -> Result<(&mut [f32], &[f32]), GraphError> {
        let gradients = self
            .gradients
            .as_ref()
            .ok_or_else(|| GraphError::InvalidState("梯度视图尚未分配".to_string()))?;
        Ok((self.params.buffer_mut(), gradients.buffer()))
    }

    fn batch_size(&self) -> usize {
        self.inputs
            .iter()
            .flatten()
            .next()
            .and_then(|t| t.shape().first().copied())
            .unwrap_or(1)
    }
}

impl ComputationGraph {
    /// 用给定的输入与标签训练，迭代次数取网络配置里的`iterations`
    pub fn fit(&mut self, inputs: &[Tensor], labels: &[Tensor]) -> Result<OptimizationOutcome, GraphError> {
        self.init()?;
        self.init_gradients_view()?;
        self.set_inputs(inputs)?;
        self.set_labels(labels)?;

        // 求解器暂时取出，优化时把图本身作为模型借给它
        let mut solver = self
            .solver
            .take()
            .unwrap_or_else(|| Solver::new(&self.conf.defaults));
        let outcome = solver.optimize(self);
        self.solver = Some(solver);
        outcome
    }

    /// 单输入单输出网络的便捷形式
    pub fn fit_single(&mut self, input: &Tensor, labels: &Tensor) -> Result<OptimizationOutcome, GraphError> {
        self.fit(std::slice::from_ref(input), std::slice::from_ref(labels))
    }
}
