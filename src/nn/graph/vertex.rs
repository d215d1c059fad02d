/*
 * @Author       : 老董
 * @Date         : 2026-03-02
 * @Description  : 运行期顶点。每个顶点记录有序的输入边（上游顶点, 上游的第几条输出边）
 *                 与输出边（下游顶点, 下游的第几个输入槽），并持有本轮传播的输入槽与误差槽。
 *                 顶点种类是封闭枚举，前向/反向对其做穷尽匹配
 */

use crate::nn::conf::{ElementWiseOp, InputPreProcessor};
use crate::nn::graph::GraphError;
use crate::nn::layers::{Layer, LayerImpl};
use crate::nn::Gradient;
use crate::tensor::Tensor;

/// 一条边的端点：顶点下标 + 该顶点上的边编号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexIndices {
    pub vertex_index: usize,
    pub vertex_edge_number: usize,
}

impl VertexIndices {
    pub const fn new(vertex_index: usize, vertex_edge_number: usize) -> Self {
        Self {
            vertex_index,
            vertex_edge_number,
        }
    }
}

#[derive(Debug, Clone)]
pub enum VertexKind {
    /// 第`input_index`个网络输入
    Input { input_index: usize },
    Layer {
        layer: Box<LayerImpl>,
        preprocessor: Option<InputPreProcessor>,
    },
    /// `fan_in`在前向时记下，供反向使用
    ElementWise { op: ElementWiseOp, fan_in: usize },
    /// 各输入在第1维上的宽度，前向时记下
    Merge { widths: Vec<usize> },
    /// 输入在第1维上的原始形状，前向时记下
    Subset {
        from: usize,
        to: usize,
        input_shape: Vec<usize>,
    },
    Preprocessor(InputPreProcessor),
}

#[derive(Debug, Clone)]
pub struct GraphVertex {
    name: String,
    index: usize,
    input_vertices: Vec<VertexIndices>,
    output_vertices: Vec<VertexIndices>,
    inputs: Vec<Option<Tensor>>,
    epsilons: Vec<Option<Tensor>>,
    /// 从图外直接注入的误差（网络输出作为反向起点时）
    external_epsilon: Option<Tensor>,
    kind: VertexKind,
}

impl GraphVertex {
    pub(crate) fn new(name: &str, index: usize, kind: VertexKind) -> Self {
        Self {
            name: name.to_string(),
            index,
            input_vertices: Vec::new(),
            output_vertices: Vec::new(),
            inputs: Vec::new(),
            epsilons: Vec::new(),
            external_epsilon: None,
            kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn index(&self) -> usize {
        self.index
    }

    pub fn input_vertices(&self) -> &[VertexIndices] {
        &self.input_vertices
    }

    pub fn output_vertices(&self) -> &[VertexIndices] {
        &self.output_vertices
    }

    pub const fn kind(&self) -> &VertexKind {
        &self.kind
    }

    pub const fn is_input_vertex(&self) -> bool {
        matches!(self.kind, VertexKind::Input { .. })
    }

    pub fn is_output_layer(&self) -> bool {
        self.layer().is_some_and(Layer::is_output_layer)
    }

    pub fn layer(&self) -> Option<&LayerImpl> {
        match &self.kind {
            VertexKind::Layer { layer, .. } => Some(layer.as_ref()),
            _ => None,
        }
    }

    pub fn layer_mut(&mut self) -> Option<&mut LayerImpl> {
        match &mut self.kind {
            VertexKind::Layer { layer, .. } => Some(layer.as_mut()),
            _ => None,
        }
    }

    pub fn num_params(&self) -> usize {
        self.layer().map_or(0, Layer::num_params)
    }

    /// 连接输入边，同时按输入个数准备输入槽
    pub(crate) fn set_input_vertices(&mut self, edges: Vec<VertexIndices>) {
        self.inputs = vec![None; edges.len()];
        self.input_vertices = edges;
    }

    /// 追加一条输出边，返回其编号
    pub(crate) fn push_output_vertex(&mut self, edge: VertexIndices) -> usize {
        self.output_vertices.push(edge);
        self.epsilons.push(None);
        self.output_vertices.len() - 1
    }

    pub fn set_input(&mut self, slot: usize, input: Tensor) -> Result<(), GraphError> {
        let len = self.inputs.len();
        let target = self.inputs.get_mut(slot).ok_or_else(|| {
            GraphError::InvalidArgument(format!(
                "顶点{}的输入槽下标{slot}越界（共{len}个输入）",
                self.name
            ))
        })?;
        *target = Some(input);
        Ok(())
    }

    pub fn set_epsilon(&mut self, slot: usize, epsilon: Tensor) -> Result<(), GraphError> {
        let len = self.epsilons.len();
        let target = self.epsilons.get_mut(slot).ok_or_else(|| {
            GraphError::InvalidArgument(format!(
                "顶点{}的误差槽下标{slot}越界（共{len}条输出边）",
                self.name
            ))
        })?;
        *target = Some(epsilon);
        Ok(())
    }

    pub(crate) fn set_external_epsilon(&mut self, epsilon: Tensor) {
        self.external_epsilon = Some(epsilon);
    }

    pub(crate) const fn has_external_epsilon(&self) -> bool {
        self.external_epsilon.is_some()
    }

    pub(crate) fn clear_external_epsilon(&mut self) {
        self.external_epsilon = None;
    }

    /// 清空本轮传播的输入槽与误差槽（层内部的中间结果不动）
    pub(crate) fn clear_slots(&mut self) {
        self.inputs.iter_mut().for_each(|s| *s = None);
        self.epsilons.iter_mut().for_each(|s| *s = None);
        self.external_epsilon = None;
    }

    pub fn input_tensor(&self, slot: usize) -> Option<&Tensor> {
        self.inputs.get(slot).and_then(Option::as_ref)
    }

    pub fn can_do_forward(&self) -> bool {
        self.inputs.iter().all(Option::is_some)
    }

    pub fn can_do_backward(&self) -> bool {
        self.can_do_forward() && self.epsilons.iter().all(Option::is_some)
    }

    fn collected_inputs(&self) -> Result<Vec<&Tensor>, GraphError> {
        if !self.can_do_forward() {
            return Err(GraphError::InvalidState(format!(
                "无法前向传播：顶点{}的输入未设置",
                self.name
            )));
        }
        Ok(self.inputs.iter().flatten().collect())
    }

    /// 所有下游误差（连同外部注入的误差）之和；都没有时为 None
    fn summed_epsilon(&self) -> Option<Tensor> {
        let mut iter = self.epsilons.iter().flatten().chain(&self.external_epsilon);
        let first = iter.next()?.clone();
        Some(iter.fold(first, |mut acc, e| {
            acc += e;
            acc
        }))
    }

    pub(crate) fn do_forward(&mut self, params: &[f32], training: bool) -> Result<Tensor, GraphError> {
        let inputs = self.collected_inputs()?;
        let name = self.name.clone();
        let inputs: Vec<Tensor> = inputs.into_iter().cloned().collect();

        match &mut self.kind {
            VertexKind::Input { .. } => Err(GraphError::InvalidState(format!(
                "输入顶点{name}没有前向计算，其值由网络输入直接给出"
            ))),
            VertexKind::Layer {
                layer,
                preprocessor,
            } => {
                let x = match preprocessor {
                    Some(pp) => pp.pre_process(&inputs[0])?,
                    None => inputs[0].clone(),
                };
                layer.activate(&x, params, training)
            }
            VertexKind::ElementWise { op, fan_in } => {
                *fan_in = inputs.len();
                let mut iter = inputs.into_iter();
                let first = iter.next().ok_or_else(|| {
                    GraphError::InvalidState(format!("无法前向传播：顶点{name}没有输入"))
                })?;
                check_same_shapes(&name, &first, iter.as_slice())?;
                Ok(iter.fold(first, |mut acc, t| {
                    match op {
                        ElementWiseOp::Add => acc += &t,
                        ElementWiseOp::Subtract => acc -= &t,
                        ElementWiseOp::Product => acc *= &t,
                    }
                    acc
                }))
            }
            VertexKind::Merge { widths } => {
                *widths = inputs
                    .iter()
                    .map(|t| t.shape().get(1).copied().unwrap_or(0))
                    .collect();
                let refs = inputs.iter().collect::<Vec<_>>();
                Ok(Tensor::concat_axis1(&refs)?)
            }
            VertexKind::Subset {
                from,
                to,
                input_shape,
            } => {
                *input_shape = inputs[0].shape().to_vec();
                let end = to.checked_add(1).ok_or_else(|| {
                    GraphError::InvalidArgument(format!("子集范围[{from}, {to}]越界"))
                })?;
                Ok(inputs[0].slice_axis1(*from, end)?)
            }
            VertexKind::Preprocessor(pp) => pp.pre_process(&inputs[0]),
        }
    }

    /// 反向一步：返回本顶点的参数梯度（若有）以及每条输入边对应的误差
    pub(crate) fn do_backward(
        &mut self,
        params: &[f32],
    ) -> Result<(Option<Gradient>, Vec<Tensor>), GraphError> {
        if !self.can_do_backward() {
            return Err(GraphError::InvalidState(format!(
                "无法反向传播：顶点{}的输入或误差未设置",
                self.name
            )));
        }
        let epsilon = self.summed_epsilon();
        let name = self.name.clone();
        let require_epsilon = || {
            GraphError::InvalidState(format!("无法反向传播：顶点{name}没有下游误差"))
        };

        match &mut self.kind {
            VertexKind::Input { .. } => Ok((None, Vec::new())),
            VertexKind::Layer {
                layer,
                preprocessor,
            } => {
                let (gradient, mut epsilon_out) = layer.backprop_gradient(epsilon.as_ref(), params)?;
                if let Some(pp) = preprocessor {
                    epsilon_out = pp.backprop(&epsilon_out)?;
                }
                Ok((Some(gradient), vec![epsilon_out]))
            }
            VertexKind::ElementWise { op, fan_in } => {
                let epsilon = epsilon.ok_or_else(require_epsilon)?;
                let fan_in = *fan_in;
                if fan_in <= 1 {
                    return Ok((None, vec![epsilon]));
                }
                let out = match op {
                    // 加法对每个输入的偏导都是 1，误差原样复制
                    ElementWiseOp::Add => vec![epsilon; fan_in],
                    ElementWiseOp::Subtract => {
                        let negated = -&epsilon;
                        vec![epsilon, negated]
                    }
                    ElementWiseOp::Product => (0..fan_in)
                        .map(|i| {
                            self.inputs
                                .iter()
                                .flatten()
                                .enumerate()
                                .filter(|(j, _)| *j != i)
                                .fold(epsilon.clone(), |acc, (_, t)| acc * t)
                        })
                        .collect(),
                };
                Ok((None, out))
            }
            VertexKind::Merge { widths } => {
                let epsilon = epsilon.ok_or_else(require_epsilon)?;
                let mut start = 0;
                let mut out = Vec::with_capacity(widths.len());
                for &w in widths.iter() {
                    out.push(epsilon.slice_axis1(start, start + w)?);
                    start += w;
                }
                Ok((None, out))
            }
            VertexKind::Subset {
                from, input_shape, ..
            } => {
                let epsilon = epsilon.ok_or_else(require_epsilon)?;
                let mut out = Tensor::zeros(input_shape);
                out.assign_axis1(*from, &epsilon)?;
                Ok((None, vec![out]))
            }
            VertexKind::Preprocessor(pp) => {
                let epsilon = epsilon.ok_or_else(require_epsilon)?;
                Ok((None, vec![pp.backprop(&epsilon)?]))
            }
        }
    }
}

fn check_same_shapes(vertex: &str, first: &Tensor, rest: &[Tensor]) -> Result<(), GraphError> {
    match rest.iter().find(|t| !t.is_same_shape(first)) {
        Some(other) => Err(GraphError::ShapeMismatch {
            expected: first.shape().to_vec(),
            got: other.shape().to_vec(),
            message: format!("顶点{vertex}的逐元素组合要求所有输入形状一致"),
        }),
        None => Ok(()),
    }
}
