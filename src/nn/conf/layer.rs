/*
 * @Author       : 老董
 * @Date         : 2026-03-02
 * @Description  : 网络级默认配置（NeuralNetConfig）与单层配置（LayerConfig）。
 *                 层配置里未设置的字段（None）在解析时回落到网络级默认值
 */

use serde::{Deserialize, Serialize};

use super::graph_builder::GraphBuilder;
use crate::nn::optimize::{StepFunction, TerminationCondition, Updater};
use crate::nn::{Activation, LossFunction, WeightInit};

/// 网络级默认配置，同时承载求解器相关的设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeuralNetConfig {
    pub seed: u64,
    /// 每次`fit`执行的优化迭代次数
    pub iterations: usize,
    pub activation: Activation,
    pub weight_init: WeightInit,
    pub bias_init: f32,
    pub learning_rate: f32,
    pub l1: f32,
    pub l2: f32,
    pub updater: Updater,
    /// 为真时梯度先除以批大小
    pub minibatch: bool,
    pub step_function: StepFunction,
    pub termination_conditions: Vec<TerminationCondition>,
    /// 为真时终止条件满足即提前结束；否则只记录日志，跑满迭代次数
    pub early_stop: bool,
}

impl Default for NeuralNetConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            iterations: 1,
            activation: Activation::Sigmoid,
            weight_init: WeightInit::Xavier,
            bias_init: 0.0,
            learning_rate: 0.1,
            l1: 0.0,
            l2: 0.0,
            updater: Updater::Sgd,
            minibatch: true,
            step_function: StepFunction::NegativeGradient,
            termination_conditions: vec![
                TerminationCondition::ZeroDirection,
                TerminationCondition::Eps {
                    eps: 1e-4,
                    tolerance: 1e-4,
                },
            ],
            early_stop: false,
        }
    }
}

impl NeuralNetConfig {
    pub fn builder() -> Self {
        Self::default()
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    pub fn weight_init(mut self, weight_init: WeightInit) -> Self {
        self.weight_init = weight_init;
        self
    }

    pub fn bias_init(mut self, bias_init: f32) -> Self {
        self.bias_init = bias_init;
        self
    }

    pub fn learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn l1(mut self, l1: f32) -> Self {
        self.l1 = l1;
        self
    }

    pub fn l2(mut self, l2: f32) -> Self {
        self.l2 = l2;
        self
    }

    pub fn updater(mut self, updater: Updater) -> Self {
        self.updater = updater;
        self
    }

    pub fn minibatch(mut self, minibatch: bool) -> Self {
        self.minibatch = minibatch;
        self
    }

    pub fn step_function(mut self, step_function: StepFunction) -> Self {
        self.step_function = step_function;
        self
    }

    pub fn termination_conditions(mut self, conditions: Vec<TerminationCondition>) -> Self {
        self.termination_conditions = conditions;
        self
    }

    pub fn early_stop(mut self, early_stop: bool) -> Self {
        self.early_stop = early_stop;
        self
    }

    /// 以当前配置为默认值，开始声明计算图
    pub fn graph_builder(self) -> GraphBuilder {
        GraphBuilder::new(self)
    }
}

/// 层的种类及其形状参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LayerKind {
    Dense {
        n_in: usize,
        n_out: usize,
    },
    Output {
        n_in: usize,
        n_out: usize,
        loss: LossFunction,
    },
    /// 输入输出均为 NCHW；`n_in`/`n_out`为通道数
    Convolution {
        n_in: usize,
        n_out: usize,
        kernel: [usize; 2],
        stride: [usize; 2],
        padding: [usize; 2],
    },
}

impl LayerKind {
    pub const fn n_in(&self) -> usize {
        match *self {
            Self::Dense { n_in, .. } | Self::Output { n_in, .. } | Self::Convolution { n_in, .. } => {
                n_in
            }
        }
    }

    pub const fn n_out(&self) -> usize {
        match *self {
            Self::Dense { n_out, .. }
            | Self::Output { n_out, .. }
            | Self::Convolution { n_out, .. } => n_out,
        }
    }

    pub(crate) const fn set_n_in(&mut self, value: usize) {
        match self {
            Self::Dense { n_in, .. } | Self::Output { n_in, .. } | Self::Convolution { n_in, .. } => {
                *n_in = value;
            }
        }
    }

    pub const fn is_output(&self) -> bool {
        matches!(self, Self::Output { .. })
    }

    pub const fn is_convolution(&self) -> bool {
        matches!(self, Self::Convolution { .. })
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Dense { .. } => "Dense",
            Self::Output { .. } => "Output",
            Self::Convolution { .. } => "Convolution",
        }
    }

    /// 参数个数：权重 + 偏置
    pub const fn num_params(&self) -> usize {
        match *self {
            Self::Dense { n_in, n_out } | Self::Output { n_in, n_out, .. } => n_in * n_out + n_out,
            Self::Convolution {
                n_in,
                n_out,
                kernel,
                ..
            } => n_out * n_in * kernel[0] * kernel[1] + n_out,
        }
    }
}

/// 单层配置；`None`的字段在解析时取网络级默认值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    pub kind: LayerKind,
    pub activation: Option<Activation>,
    pub weight_init: Option<WeightInit>,
    pub bias_init: Option<f32>,
    pub learning_rate: Option<f32>,
    pub l1: Option<f32>,
    pub l2: Option<f32>,
    pub updater: Option<Updater>,
}

impl LayerConfig {
    pub const fn new(kind: LayerKind) -> Self {
        Self {
            kind,
            activation: None,
            weight_init: None,
            bias_init: None,
            learning_rate: None,
            l1: None,
            l2: None,
            updater: None,
        }
    }

    /// 全连接层；`n_in`为0时在构建图时由输入类型推断
    pub const fn dense(n_in: usize, n_out: usize) -> Self {
        Self::new(LayerKind::Dense { n_in, n_out })
    }

    pub const fn output(n_in: usize, n_out: usize, loss: LossFunction) -> Self {
        Self::new(LayerKind::Output { n_in, n_out, loss })
    }

    /// 卷积层；输入通道数由输入类型推断，也可用`n_in`显式指定
    pub const fn convolution(
        n_out: usize,
        kernel: [usize; 2],
        stride: [usize; 2],
        padding: [usize; 2],
    ) -> Self {
        Self::new(LayerKind::Convolution {
            n_in: 0,
            n_out,
            kernel,
            stride,
            padding,
        })
    }

    pub const fn n_in(mut self, n_in: usize) -> Self {
        self.kind.set_n_in(n_in);
        self
    }

    pub const fn activation(mut self, activation: Activation) -> Self {
        self.activation = Some(activation);
        self
    }

    pub const fn weight_init(mut self, weight_init: WeightInit) -> Self {
        self.weight_init = Some(weight_init);
        self
    }

    pub const fn bias_init(mut self, bias_init: f32) -> Self {
        self.bias_init = Some(bias_init);
        self
    }

    pub const fn learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = Some(learning_rate);
        self
    }

    pub const fn l1(mut self, l1: f32) -> Self {
        self.l1 = Some(l1);
        self
    }

    pub const fn l2(mut self, l2: f32) -> Self {
        self.l2 = Some(l2);
        self
    }

    pub const fn updater(mut self, updater: Updater) -> Self {
        self.updater = Some(updater);
        self
    }

    pub const fn num_params(&self) -> usize {
        self.kind.num_params()
    }

    /// 用网络级默认值补齐未设置的字段
    pub fn resolve(&self, defaults: &NeuralNetConfig) -> LayerSettings {
        LayerSettings {
            kind: self.kind.clone(),
            activation: self.activation.unwrap_or(defaults.activation),
            weight_init: self.weight_init.unwrap_or(defaults.weight_init),
            bias_init: self.bias_init.unwrap_or(defaults.bias_init),
            learning_rate: self.learning_rate.unwrap_or(defaults.learning_rate),
            l1: self.l1.unwrap_or(defaults.l1),
            l2: self.l2.unwrap_or(defaults.l2),
            updater: self.updater.unwrap_or(defaults.updater),
        }
    }
}

/// 解析后的层设置，运行期的层只持有这个
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSettings {
    pub kind: LayerKind,
    pub activation: Activation,
    pub weight_init: WeightInit,
    pub bias_init: f32,
    pub learning_rate: f32,
    pub l1: f32,
    pub l2: f32,
    pub updater: Updater,
}
