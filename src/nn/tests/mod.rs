mod optimize;
mod params;

use crate::nn::{
    Activation, ComputationGraph, ComputationGraphConfiguration, LayerConfig, LossFunction,
    NeuralNetConfig,
};

/// x(4) -> h(Dense 4->2, identity) -> y(Output 2->1, identity, MSE)
pub(super) fn chain_conf() -> ComputationGraphConfiguration {
    NeuralNetConfig::builder()
        .seed(7)
        .activation(Activation::Identity)
        .graph_builder()
        .add_inputs(&["x"])
        .add_layer("h", LayerConfig::dense(4, 2), &["x"])
        .add_layer("y", LayerConfig::output(2, 1, LossFunction::Mse), &["h"])
        .set_outputs(&["y"])
        .build()
        .unwrap()
}

pub(super) fn chain_graph() -> ComputationGraph {
    let mut graph = ComputationGraph::new(chain_conf());
    graph.init().unwrap();
    graph
}
