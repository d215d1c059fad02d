/*
 * @Author       : 老董
 * @Date         : 2026-03-02
 * @Description  : 前向传播：按拓扑顺序逐个顶点计算，并把结果复制到每个下游顶点对应的输入槽
 */

use std::collections::HashMap;

use super::{ComputationGraph, GraphError, VertexKind};
use crate::tensor::Tensor;

impl ComputationGraph {
    /// 前向传播，返回每个被计算的顶点的激活值（键为顶点名）。
    /// `exclude_output_layers`为真时跳过输出层（不需要标签即可拿到中间激活）
    pub fn feed_forward(
        &mut self,
        training: bool,
        exclude_output_layers: bool,
    ) -> Result<HashMap<String, Tensor>, GraphError> {
        self.init()?;
        let Self {
            topological_order,
            vertices,
            params,
            inputs,
            ..
        } = self;
        vertices.iter_mut().for_each(|v| v.clear_slots());

        let mut activations = HashMap::with_capacity(vertices.len());
        for &idx in topological_order.iter() {
            let input_index = match vertices[idx].kind() {
                VertexKind::Input { input_index } => Some(*input_index),
                _ => None,
            };
            let out = match input_index {
                Some(input_index) => inputs
                    .get(input_index)
                    .and_then(Option::as_ref)
                    .cloned()
                    .ok_or_else(|| {
                        GraphError::InvalidState(format!(
                            "无法前向传播：网络输入{}未设置",
                            vertices[idx].name()
                        ))
                    })?,
                None => {
                    if exclude_output_layers && vertices[idx].is_output_layer() {
                        continue;
                    }
                    vertices[idx].do_forward(params.view(idx), training)?
                }
            };

            // 复制而非别名：下游各自可以独立修改
            let edges = vertices[idx].output_vertices().to_vec();
            for edge in edges {
                vertices[edge.vertex_index].set_input(edge.vertex_edge_number, out.clone())?;
            }
            activations.insert(vertices[idx].name().to_string(), out);
        }
        Ok(activations)
    }

    /// 设置输入并前向传播，按网络输出的声明顺序返回结果
    pub fn output(&mut self, training: bool, inputs: &[Tensor]) -> Result<Vec<Tensor>, GraphError> {
        self.set_inputs(inputs)?;
        let mut activations = self.feed_forward(training, false)?;
        self.conf
            .network_outputs
            .iter()
            .map(|name| {
                activations.remove(name).ok_or_else(|| {
                    GraphError::InvalidState(format!("网络输出`{name}`没有被计算"))
                })
            })
            .collect()
    }

    /// 单输出网络的便捷形式
    pub fn output_single(&mut self, training: bool, input: &Tensor) -> Result<Tensor, GraphError> {
        let mut outputs = self.output(training, std::slice::from_ref(input))?;
        outputs
            .pop()
            .ok_or_else(|| GraphError::InvalidState("网络没有输出".to_string()))
    }
}
