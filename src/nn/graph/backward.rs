/*
 * @Author       : 老董
 * @Date         : 2026-03-02
 * @Description  : 反向传播与分数。
 *                 按逆拓扑顺序处理顶点：输出层先注入标签；每个顶点消费其下游误差之和，
 *                 产出参数梯度（写入扁平梯度缓冲区）与每条输入边的误差。
 *                 L1/L2 只计入第一个输出层的分数，避免多输出时重复计算。
 *                 反向的起点既可以是输出层的标签，也可以是从图外给每个网络输出注入的误差
 */

use tracing::trace;

use super::{ComputationGraph, GraphError, GraphVertex, VertexKind};
use crate::nn::layers::{Layer, LayerImpl, write_gradient};
use crate::nn::Gradient;
use crate::tensor::Tensor;

impl ComputationGraph {
    /// 把已设置的标签注入每个输出层；网络输出不是输出层时报错
    fn apply_labels(&mut self) -> Result<(), GraphError> {
        for (i, name) in self.conf.network_outputs.iter().enumerate() {
            let idx = self.index_of(name)?;
            let label = self.labels[i].clone().ok_or_else(|| {
                GraphError::InvalidState(format!("网络输出`{name}`的标签未设置"))
            })?;
            let vertex = &mut self.vertices[idx];
            if !vertex.is_output_layer() {
                return Err(GraphError::InvalidState(format!(
                    "网络输出`{name}`不是输出层，无法计算梯度或分数"
                )));
            }
            if let Some(layer) = vertex.layer_mut() {
                layer.set_labels(label)?;
            }
        }
        Ok(())
    }

    /// 反向传播（须先前向）。梯度写入扁平梯度缓冲区，同时以`<顶点名>_<参数键>`为键返回
    pub fn calc_backprop_gradients(&mut self) -> Result<Gradient, GraphError> {
        self.apply_labels()?;
        let (gradient, _) = self.backprop()?;
        Ok(gradient)
    }

    /// 以外部给定的误差 dL/da 为起点反向传播（须先前向），每个网络输出对应一个误差，不使用标签。
    /// 返回参数梯度以及按网络输入顺序排列的输入误差 dL/dx
    pub fn backprop_gradient(&mut self, epsilons: &[Tensor]) -> Result<(Gradient, Vec<Tensor>), GraphError> {
        let outputs = &self.conf.network_outputs;
        if epsilons.len() != outputs.len() {
            return Err(GraphError::LengthMismatch {
                expected: outputs.len(),
                got: epsilons.len(),
                message: "每个网络输出须对应一个误差".to_string(),
            });
        }
        let indices = outputs
            .iter()
            .map(|name| self.index_of(name))
            .collect::<Result<Vec<_>, _>>()?;
        for (idx, epsilon) in indices.into_iter().zip(epsilons) {
            let vertex = &mut self.vertices[idx];
            if let Some(LayerImpl::Output(layer)) = vertex.layer_mut() {
                layer.clear_labels();
            }
            vertex.set_external_epsilon(epsilon.clone());
        }

        let result = self.backprop();
        self.vertices
            .iter_mut()
            .for_each(GraphVertex::clear_external_epsilon);
        result
    }

    fn backprop(&mut self) -> Result<(Gradient, Vec<Tensor>), GraphError> {
        self.init_gradients_view()?;

        let Self {
            topological_order,
            vertices,
            params,
            gradients,
            inputs,
            ..
        } = self;
        let gradients = gradients
            .as_mut()
            .ok_or_else(|| GraphError::InvalidState("梯度视图尚未分配".to_string()))?;
        gradients.fill(0.0);

        let mut gradient = Gradient::new();
        let mut input_errors: Vec<Option<Tensor>> = vec![None; inputs.len()];
        for &idx in topological_order.iter().rev() {
            let vertex = &mut vertices[idx];
            if vertex.is_input_vertex() {
                continue;
            }
            // 既不通向任何下游、也不是输出层的顶点不参与反向，给上游回传全零误差
            let epsilons = if vertex.output_vertices().is_empty()
                && !vertex.is_output_layer()
                && !vertex.has_external_epsilon()
            {
                trace!(vertex = vertex.name(), "顶点没有下游，跳过反向传播");
                (0..vertex.input_vertices().len())
                    .map(|slot| {
                        vertex.input_tensor(slot).map(|t| Tensor::zeros(t.shape())).ok_or_else(|| {
                            GraphError::InvalidState(format!(
                                "无法反向传播：顶点{}的输入未设置",
                                vertex.name()
                            ))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?
            } else {
                let (local, epsilons) = vertex.do_backward(params.view(idx))?;
                if let Some(local) = local {
                    if let Some(layer) = vertex.layer() {
                        write_gradient(layer.param_layout(), &local, gradients.view_mut(idx))?;
                    }
                    gradient.merge_qualified(vertex.name(), local);
                }
                epsilons
            };

            let edges = vertex.input_vertices().to_vec();
            for (edge, epsilon) in edges.into_iter().zip(epsilons) {
                let producer = &mut vertices[edge.vertex_index];
                // 输入顶点不再反向，误差按网络输入累加
                if let VertexKind::Input { input_index } = *producer.kind() {
                    let slot = &mut input_errors[input_index];
                    match *slot {
                        Some(ref mut acc) => *acc += &epsilon,
                        None => *slot = Some(epsilon),
                    }
                    continue;
                }
                producer.set_epsilon(edge.vertex_edge_number, epsilon)?;
            }
        }

        // 没有接到任何下游的网络输入，误差为全零
        let input_errors = input_errors
            .into_iter()
            .enumerate()
            .map(|(i, error)| match error {
                Some(error) => Ok(error),
                None => inputs
                    .get(i)
                    .and_then(Option::as_ref)
                    .map(|t| Tensor::zeros(t.shape()))
                    .ok_or_else(|| GraphError::InvalidState(format!("无法反向传播：网络输入{i}未设置"))),
            })
            .collect::<Result<Vec<_>, _>>()?;

        gradient.set_flattened(gradients.buffer().to_vec());
        self.gradient = Some(gradient.clone());
        Ok((gradient, input_errors))
    }

    /// 各层 L1 正则项之和
    pub fn calc_l1(&self) -> f32 {
        self.layer_sum(|layer, view| layer.calc_l1(view))
    }

    /// 各层 L2 正则项之和
    pub fn calc_l2(&self) -> f32 {
        self.layer_sum(|layer, view| layer.calc_l2(view))
    }

    fn layer_sum<F: Fn(&LayerImpl, &[f32]) -> f32>(&self, f: F) -> f32 {
        self.vertices
            .iter()
            .filter_map(|v| v.layer().map(|layer| f(layer, self.params.view(v.index()))))
            .sum()
    }

    /// 对已完成前向且注入了标签的网络求分数，正则项只加到第一个输出层
    fn compute_score(&self, training: bool) -> Result<f32, GraphError> {
        let (l1, l2) = (self.calc_l1(), self.calc_l2());
        let mut score = 0.0;
        for (i, name) in self.conf.network_outputs.iter().enumerate() {
            let layer = self.layer(name)?;
            let (l1, l2) = if i == 0 { (l1, l2) } else { (0.0, 0.0) };
            score += layer.compute_score(l1, l2, training)?;
        }
        Ok(score)
    }

    /// 一次前向+反向，梯度写入扁平梯度缓冲区，返回分数
    pub fn compute_gradient_and_score(&mut self) -> Result<f32, GraphError> {
        self.feed_forward(true, false)?;
        self.calc_backprop_gradients()?;
        self.score = self.compute_score(true)?;
        Ok(self.score)
    }

    /// 给定输入与标签求分数（不反向传播）
    pub fn score(&mut self, inputs: &[Tensor], labels: &[Tensor], training: bool) -> Result<f32, GraphError> {
        self.set_inputs(inputs)?;
        self.set_labels(labels)?;
        self.feed_forward(training, false)?;
        self.apply_labels()?;
        self.score = self.compute_score(training)?;
        Ok(self.score)
    }
}
