/*
 * @Author       : 老董
 * @Date         : 2026-01-27
 * @LastEditors  : 老董
 * @LastEditTime : 2026-03-02
 * @Description  : 计算图：持有顶点集合、缓存的拓扑序、唯一的扁平参数缓冲区与（惰性分配的）扁平梯度缓冲区。
 *                 每个带参数的顶点只拿到缓冲区里的一段区间，区间按拓扑顺序依次排布
 *
 * 子模块：
 * - forward.rs：前向传播
 * - backward.rs：反向传播、分数与正则项
 * - fit.rs：作为 Model 交给求解器优化
 * - model_io.rs：参数与配置的保存/加载
 */

mod arena;
mod backward;
mod error;
mod fit;
mod forward;
mod model_io;
pub(crate) mod topo;
mod vertex;

pub use error::{ConfigError, GraphError};
pub use vertex::{GraphVertex, VertexIndices, VertexKind};

use std::collections::HashMap;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::debug;

use self::arena::FlatArena;
use super::conf::{ComputationGraphConfiguration, GraphVertexConfig};
use super::layers::{Layer, LayerImpl};
use super::optimize::{IterationListener, Solver};
use super::Gradient;
use crate::tensor::Tensor;

pub struct ComputationGraph {
    conf: ComputationGraphConfiguration,
    /// 只计算一次并缓存
    topological_order: Vec<usize>,
    vertices: Vec<GraphVertex>,
    vertex_index: HashMap<String, usize>,
    params: FlatArena,
    gradients: Option<FlatArena>,
    inputs: Vec<Option<Tensor>>,
    labels: Vec<Option<Tensor>>,
    score: f32,
    rng: StdRng,
    solver: Option<Solver>,
    gradient: Option<Gradient>,
    initialized: bool,
}

impl std::fmt::Debug for ComputationGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputationGraph")
            .field("vertices", &self.vertices.len())
            .field("num_params", &self.params.len())
            .field("topological_order", &self.topological_order)
            .field("initialized", &self.initialized)
            .field("score", &self.score)
            .finish()
    }
}

impl ComputationGraph {
    pub fn new(conf: ComputationGraphConfiguration) -> Self {
        let seed = conf.defaults.seed;
        let n_inputs = conf.network_inputs.len();
        let n_outputs = conf.network_outputs.len();
        Self {
            conf,
            topological_order: Vec::new(),
            vertices: Vec::new(),
            vertex_index: HashMap::new(),
            params: FlatArena::zeros(Vec::new()),
            gradients: None,
            inputs: vec![None; n_inputs],
            labels: vec![None; n_outputs],
            score: 0.0,
            rng: StdRng::seed_from_u64(seed),
            solver: None,
            gradient: None,
            initialized: false,
        }
    }

    pub const fn conf(&self) -> &ComputationGraphConfiguration {
        &self.conf
    }

    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// 初始化：拓扑排序、创建顶点、分配并初始化参数、连接边。重复调用无副作用
    pub fn init(&mut self) -> Result<(), GraphError> {
        self.init_with(None)
    }

    /// 同`init`，但使用外部提供的参数缓冲区（长度须等于网络参数总数，参数不会被重新初始化）
    pub fn init_with(&mut self, params: Option<Vec<f32>>) -> Result<(), GraphError> {
        if self.initialized {
            return Ok(());
        }
        let order = self.conf.topological_order()?;
        let input_indices = self.conf.input_indices()?;

        let mut vertices = Vec::with_capacity(self.conf.vertices.len());
        for (index, (name, vertex_conf)) in self.conf.vertices.iter().enumerate() {
            let kind = match vertex_conf {
                GraphVertexConfig::Input => VertexKind::Input {
                    input_index: self
                        .conf
                        .network_inputs
                        .iter()
                        .position(|n| n == name)
                        .ok_or_else(|| ConfigError::UnknownInput {
                            vertex: name.clone(),
                            input: name.clone(),
                        })?,
                },
                GraphVertexConfig::Layer { conf, preprocessor } => VertexKind::Layer {
                    layer: Box::new(LayerImpl::from_settings(conf.resolve(&self.conf.defaults))),
                    preprocessor: *preprocessor,
                },
                GraphVertexConfig::ElementWise { op } => VertexKind::ElementWise { op: *op, fan_in: 0 },
                GraphVertexConfig::Merge => VertexKind::Merge { widths: Vec::new() },
                GraphVertexConfig::Subset { from, to } => VertexKind::Subset {
                    from: *from,
                    to: *to,
                    input_shape: Vec::new(),
                },
                GraphVertexConfig::Preprocessor(pp) => VertexKind::Preprocessor(*pp),
            };
            vertices.push(GraphVertex::new(name, index, kind));
        }

        // 参数视图按拓扑顺序排布
        let counts = vertices.iter().map(GraphVertex::num_params).collect::<Vec<_>>();
        let ranges = FlatArena::layout(&order, &counts);
        let total: usize = counts.iter().sum();
        let params = match params {
            Some(buffer) => {
                if buffer.len() != total {
                    return Err(GraphError::ShapeMismatch {
                        expected: vec![total],
                        got: vec![buffer.len()],
                        message: "外部提供的参数缓冲区长度与网络参数总数不一致".to_string(),
                    });
                }
                FlatArena::new(buffer, ranges)
            }
            None => {
                let mut arena = FlatArena::zeros(ranges);
                for &idx in &order {
                    if let Some(layer) = vertices[idx].layer() {
                        layer.init_params(arena.view_mut(idx), &mut self.rng)?;
                    }
                }
                arena
            }
        };

        // 按顶点下标、输入槽顺序连接边
        for (consumer, producers) in input_indices.iter().enumerate() {
            let mut edges = Vec::with_capacity(producers.len());
            for (slot, &producer) in producers.iter().enumerate() {
                let edge_number =
                    vertices[producer].push_output_vertex(VertexIndices::new(consumer, slot));
                edges.push(VertexIndices::new(producer, edge_number));
            }
            vertices[consumer].set_input_vertices(edges);
        }

        self.vertex_index = vertices
            .iter()
            .map(|v| (v.name().to_string(), v.index()))
            .collect();
        self.vertices = vertices;
        self.topological_order = order;
        self.params = params;
        self.initialized = true;
        debug!(
            vertices = self.vertices.len(),
            num_params = total,
            order = ?self.topological_order,
            "计算图初始化完成"
        );
        Ok(())
    }

    /// 分配扁平梯度缓冲区并按参数视图的区间切分，须在`init`之后调用
    pub fn init_gradients_view(&mut self) -> Result<(), GraphError> {
        if !self.initialized {
            return Err(GraphError::InvalidState(
                "必须先调用init()才能分配梯度视图".to_string(),
            ));
        }
        if self.gradients.is_none() {
            self.gradients = Some(FlatArena::zeros(self.params.ranges().to_vec()));
        }
        Ok(())
    }

    fn ensure_initialized(&self) -> Result<(), GraphError> {
        if self.initialized {
            Ok(())
        } else {
            Err(GraphError::InvalidState("计算图尚未初始化".to_string()))
        }
    }

    // ========== 输入与标签 ==========

    pub fn set_inputs(&mut self, inputs: &[Tensor]) -> Result<(), GraphError> {
        if inputs.len() != self.inputs.len() {
            return Err(GraphError::InvalidArgument(format!(
                "网络有{}个输入，实际提供了{}个",
                self.inputs.len(),
                inputs.len()
            )));
        }
        self.inputs = inputs.iter().cloned().map(Some).collect();
        Ok(())
    }

    pub fn set_input(&mut self, index: usize, input: Tensor) -> Result<(), GraphError> {
        let len = self.inputs.len();
        let slot = self.inputs.get_mut(index).ok_or_else(|| {
            GraphError::InvalidArgument(format!("输入下标{index}越界（共{len}个输入）"))
        })?;
        *slot = Some(input);
        Ok(())
    }

    pub fn set_labels(&mut self, labels: &[Tensor]) -> Result<(), GraphError> {
        if labels.len() != self.labels.len() {
            return Err(GraphError::InvalidArgument(format!(
                "网络有{}个输出，实际提供了{}组标签",
                self.labels.len(),
                labels.len()
            )));
        }
        self.labels = labels.iter().cloned().map(Some).collect();
        Ok(())
    }

    pub fn input(&self, index: usize) -> Option<&Tensor> {
        self.inputs.get(index).and_then(Option::as_ref)
    }

    // ========== 参数 ==========

    pub fn num_params(&self) -> usize {
        if self.initialized {
            self.params.len()
        } else {
            self.conf.num_params()
        }
    }

    /// 整个扁平参数缓冲区
    pub fn params(&self) -> &[f32] {
        self.params.buffer()
    }

    /// 用给定数据覆盖扁平参数缓冲区（逐元素拷贝，视图区间不变）
    pub fn set_params(&mut self, params: &[f32]) -> Result<(), GraphError> {
        self.ensure_initialized()?;
        if params.len() != self.params.len() {
            return Err(GraphError::LengthMismatch {
                expected: self.params.len(),
                got: params.len(),
                message: "参数个数与网络不一致".to_string(),
            });
        }
        self.params.buffer_mut().copy_from_slice(params);
        Ok(())
    }

    /// 某个顶点在参数缓冲区中的区间
    pub fn param_range(&self, vertex: &str) -> Result<std::ops::Range<usize>, GraphError> {
        self.ensure_initialized()?;
        Ok(self.params.range(self.index_of(vertex)?))
    }

    pub fn param_view(&self, vertex: &str) -> Result<&[f32], GraphError> {
        self.ensure_initialized()?;
        Ok(self.params.view(self.index_of(vertex)?))
    }

    /// 可写视图，写入直接落在扁平缓冲区上
    pub fn param_view_mut(&mut self, vertex: &str) -> Result<&mut [f32], GraphError> {
        self.ensure_initialized()?;
        let idx = self.index_of(vertex)?;
        Ok(self.params.view_mut(idx))
    }

    pub fn gradient_view(&self, vertex: &str) -> Result<&[f32], GraphError> {
        let idx = self.index_of(vertex)?;
        let gradients = self
            .gradients
            .as_ref()
            .ok_or_else(|| GraphError::InvalidState("梯度视图尚未分配".to_string()))?;
        Ok(gradients.view(idx))
    }

    /// 整个扁平梯度缓冲区
    pub fn flattened_gradients(&self) -> Option<&[f32]> {
        self.gradients.as_ref().map(FlatArena::buffer)
    }

    /// 拆分`<顶点名>_<参数键>`
    fn split_param_key<'a>(&self, key: &'a str) -> Result<(usize, &'a str), GraphError> {
        let (vertex, param) = key
            .rsplit_once('_')
            .ok_or_else(|| GraphError::InvalidArgument(format!("参数键`{key}`应形如<顶点名>_<参数键>")))?;
        Ok((self.index_of(vertex)?, param))
    }

    /// 所有参数按拓扑顺序列出，键为`<顶点名>_<参数键>`
    pub fn param_table(&self) -> Result<Vec<(String, Tensor)>, GraphError> {
        self.ensure_initialized()?;
        let mut table = Vec::new();
        for &idx in &self.topological_order {
            let vertex = &self.vertices[idx];
            if let Some(layer) = vertex.layer() {
                let layout = layer.param_layout();
                for slot in layout.slots() {
                    let value = layout.tensor(slot.key, self.params.view(idx))?;
                    table.push((format!("{}_{}", vertex.name(), slot.key), value));
                }
            }
        }
        Ok(table)
    }

    pub fn get_param(&self, key: &str) -> Result<Tensor, GraphError> {
        self.ensure_initialized()?;
        let (idx, param) = self.split_param_key(key)?;
        let layer = self.vertices[idx].layer().ok_or_else(|| {
            GraphError::InvalidArgument(format!("顶点`{}`没有参数", self.vertices[idx].name()))
        })?;
        layer.param_layout().tensor(param, self.params.view(idx))
    }

    pub fn set_param(&mut self, key: &str, value: &Tensor) -> Result<(), GraphError> {
        self.ensure_initialized()?;
        let (idx, param) = self.split_param_key(key)?;
        let layer = self.vertices[idx].layer().ok_or_else(|| {
            GraphError::InvalidArgument(format!("顶点`{}`没有参数", self.vertices[idx].name()))
        })?;
        layer.param_layout().write(param, value, self.params.view_mut(idx))
    }

    // ========== 顶点 ==========

    pub fn topological_order(&self) -> &[usize] {
        &self.topological_order
    }

    pub fn vertices(&self) -> &[GraphVertex] {
        &self.vertices
    }

    pub fn index_of(&self, name: &str) -> Result<usize, GraphError> {
        self.vertex_index
            .get(name)
            .copied()
            .ok_or_else(|| GraphError::InvalidArgument(format!("顶点`{name}`不存在")))
    }

    pub fn vertex(&self, name: &str) -> Result<&GraphVertex, GraphError> {
        Ok(&self.vertices[self.index_of(name)?])
    }

    pub fn layer(&self, name: &str) -> Result<&LayerImpl, GraphError> {
        self.vertex(name)?
            .layer()
            .ok_or_else(|| GraphError::InvalidArgument(format!("顶点`{name}`不是层")))
    }

    // ========== 训练 ==========

    /// 最近一次计算得到的分数
    pub const fn score_value(&self) -> f32 {
        self.score
    }

    /// 最近一次反向传播得到的梯度
    pub const fn gradient(&self) -> Option<&Gradient> {
        self.gradient.as_ref()
    }

    fn solver_mut(&mut self) -> &mut Solver {
        let defaults = &self.conf.defaults;
        self.solver.get_or_insert_with(|| Solver::new(defaults))
    }

    pub fn set_listeners(&mut self, listeners: Vec<Box<dyn IterationListener>>) {
        self.solver_mut().set_listeners(listeners);
    }

    pub fn add_listener(&mut self, listener: Box<dyn IterationListener>) {
        self.solver_mut().add_listener(listener);
    }
}
