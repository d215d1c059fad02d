/*
 * @Author       : 老董
 * @Date         : 2026-03-02
 * @Description  : 配置模块：网络/层/顶点配置、输入类型、预处理器与计算图构建器
 */

mod graph_builder;
mod input_type;
mod layer;
mod preprocessor;
mod vertex;

pub use graph_builder::{ComputationGraphConfiguration, GraphBuilder};
pub use input_type::InputType;
pub use layer::{LayerConfig, LayerKind, LayerSettings, NeuralNetConfig};
pub use preprocessor::InputPreProcessor;
pub use vertex::{ElementWiseOp, GraphVertexConfig};
pub(crate) use vertex::conv_output_size;
