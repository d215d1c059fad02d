/*
 * @Author       : 老董
 * @Date         : 2024-01-31 20:23:53
 * @LastEditors  : 老董
 * @LastEditTime : 2026-03-02
 * @Description  : 负责神经网络（neural network）的构建：配置、层、计算图、优化器
 */

mod activation;
pub mod conf;
mod gradient;
mod graph;
pub mod layers;
mod loss;
pub mod optimize;
mod weight_init;

pub use activation::Activation;
pub use conf::{
    ComputationGraphConfiguration, ElementWiseOp, GraphBuilder, GraphVertexConfig, InputPreProcessor,
    InputType, LayerConfig, LayerKind, NeuralNetConfig,
};
pub use gradient::Gradient;
pub use graph::{ComputationGraph, ConfigError, GraphError, VertexIndices};
pub use layers::{Layer, LayerImpl};
pub use loss::LossFunction;
pub use optimize::{Model, Solver, StepFunction, TerminationCondition, Updater};
pub use weight_init::WeightInit;

#[cfg(test)]
mod tests;
