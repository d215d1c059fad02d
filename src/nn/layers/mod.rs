/*
 * @Author       : 老董
 * @Date         : 2025-12-22
 * @LastEditors  : 老董
 * @LastEditTime : 2026-03-02
 * @Description  : 可训练层。所有层实现同一个 Layer trait，具体种类收拢在封闭的 LayerImpl 枚举里，
 *                 由 enum_dispatch 分发。层不持有参数：参数存放在图的扁平缓冲区，
 *                 每次调用时由图把本层那一段视图借给层
 */

mod convolution;
mod dense;
mod output;
mod param_layout;

pub use convolution::ConvolutionLayer;
pub use dense::DenseLayer;
pub use output::OutputLayer;
pub use param_layout::{ParamLayout, ParamSlot};

use enum_dispatch::enum_dispatch;
use rand::rngs::StdRng;

use super::conf::{LayerKind, LayerSettings};
use super::{Gradient, GraphError};
use crate::tensor::Tensor;

#[enum_dispatch]
#[derive(Debug, Clone)]
pub enum LayerImpl {
    Dense(DenseLayer),
    Output(OutputLayer),
    Convolution(ConvolutionLayer),
}

impl LayerImpl {
    pub fn from_settings(settings: LayerSettings) -> Self {
        match settings.kind {
            LayerKind::Dense { .. } => Self::Dense(DenseLayer::new(settings)),
            LayerKind::Output { .. } => Self::Output(OutputLayer::new(settings)),
            LayerKind::Convolution { .. } => Self::Convolution(ConvolutionLayer::new(settings)),
        }
    }
}

#[enum_dispatch(LayerImpl)]
pub trait Layer {
    fn layer_type(&self) -> &'static str;

    fn settings(&self) -> &LayerSettings;

    fn param_layout(&self) -> &ParamLayout;

    fn num_params(&self) -> usize {
        self.param_layout().num_params()
    }

    /// 在图分配的视图上初始化（而非仅仅变形）参数
    fn init_params(&self, view: &mut [f32], rng: &mut StdRng) -> Result<(), GraphError>;

    /// 前向计算；会记住输入与预激活值以供反向使用
    fn activate(&mut self, input: &Tensor, params: &[f32], training: bool) -> Result<Tensor, GraphError>;

    /// 给定 dL/da，返回本层参数梯度与传给输入的误差 dL/dx。
    /// 输出层忽略`epsilon`，改用标签计算
    fn backprop_gradient(
        &mut self,
        epsilon: Option<&Tensor>,
        params: &[f32],
    ) -> Result<(Gradient, Tensor), GraphError>;

    /// l1 · Σ|w|
    fn calc_l1(&self, params: &[f32]) -> f32 {
        let l1 = self.settings().l1;
        if l1 == 0.0 {
            0.0
        } else {
            l1 * self.param_layout().sum_abs(params)
        }
    }

    /// 0.5 · l2 · Σw²
    fn calc_l2(&self, params: &[f32]) -> f32 {
        let l2 = self.settings().l2;
        if l2 == 0.0 {
            0.0
        } else {
            0.5 * l2 * self.param_layout().sum_squares(params)
        }
    }

    fn is_output_layer(&self) -> bool {
        false
    }

    fn set_labels(&mut self, _labels: Tensor) -> Result<(), GraphError> {
        Err(GraphError::InvalidState(format!(
            "{}层不是输出层，不能设置标签",
            self.layer_type()
        )))
    }

    /// 平均到每个样本的分数：(损失之和 + l1 + l2) / batch
    fn compute_score(&self, _l1: f32, _l2: f32, _training: bool) -> Result<f32, GraphError> {
        Err(GraphError::InvalidState(format!(
            "{}层不是输出层，不能计算分数",
            self.layer_type()
        )))
    }

    /// 清掉前向/反向留下的中间结果
    fn clear(&mut self);
}

/// 把层返回的梯度逐变量写入该层的梯度视图
pub(crate) fn write_gradient(
    layout: &ParamLayout,
    gradient: &Gradient,
    view: &mut [f32],
) -> Result<(), GraphError> {
    for (key, g) in gradient.gradient_for_variable() {
        layout.write(key, g, view)?;
    }
    Ok(())
}

/// 全连接类的层：按布局生成 W 与 b 的初值
pub(crate) fn init_weights_and_bias(
    layout: &ParamLayout,
    settings: &LayerSettings,
    fan_in: usize,
    fan_out: usize,
    view: &mut [f32],
    rng: &mut StdRng,
) -> Result<(), GraphError> {
    let w_shape = layout.slot("W")?.shape.clone();
    let b_shape = layout.slot("b")?.shape.clone();
    let w = settings.weight_init.generate(&w_shape, fan_in, fan_out, rng);
    layout.write("W", &w, view)?;
    layout.write("b", &Tensor::full(settings.bias_init, &b_shape), view)?;
    Ok(())
}

/// 尚未前向时调用反向的统一报错
pub(crate) fn not_activated(layer: &str) -> GraphError {
    GraphError::InvalidState(format!("无法反向传播：{layer}层尚未执行前向计算"))
}
