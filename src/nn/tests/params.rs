use approx::assert_abs_diff_eq;

use super::{chain_conf, chain_graph};
use crate::assert_err;
use crate::nn::{
    ComputationGraph, GraphError, GraphVertexConfig, InputType, Layer, LayerConfig, LossFunction,
    NeuralNetConfig,
};
use crate::tensor::{Order, Tensor};

#[test]
fn test_views_partition_the_flat_buffer() -> Result<(), GraphError> {
    let conf = NeuralNetConfig::builder()
        .graph_builder()
        .add_inputs(&["a", "b"])
        .add_layer("ha", LayerConfig::dense(3, 4), &["a"])
        .add_layer("hb", LayerConfig::dense(2, 4), &["b"])
        .add_vertex("merge", GraphVertexConfig::Merge, &["ha", "hb"])
        .add_layer("out", LayerConfig::output(8, 2, LossFunction::Mse), &["merge"])
        .set_outputs(&["out"])
        .build()
        .unwrap();
    let expected_total = conf.num_params();
    let mut graph = ComputationGraph::new(conf);
    assert_eq!(graph.num_params(), expected_total);
    graph.init()?;
    assert_eq!(graph.num_params(), expected_total);
    assert_eq!(graph.params().len(), expected_total);

    // 各顶点视图互不重叠，且恰好铺满整个缓冲区
    let mut ranges = graph
        .vertices()
        .iter()
        .map(|v| graph.param_range(v.name()))
        .collect::<Result<Vec<_>, _>>()?;
    for (v, r) in graph.vertices().iter().zip(&ranges) {
        assert_eq!(r.len(), v.num_params(), "顶点{}", v.name());
    }
    ranges.retain(|r| !r.is_empty());
    ranges.sort_by_key(|r| r.start);
    let mut offset = 0;
    for r in &ranges {
        assert_eq!(r.start, offset);
        offset = r.end;
    }
    assert_eq!(offset, expected_total);

    // 视图按拓扑顺序排布
    let starts = graph
        .topological_order()
        .iter()
        .map(|&i| graph.param_range(graph.vertices()[i].name()).map(|r| r.start))
        .collect::<Result<Vec<_>, _>>()?;
    assert!(starts.windows(2).all(|w| w[0] <= w[1]));
    Ok(())
}

#[test]
fn test_view_writes_are_visible_in_flat_buffer() -> Result<(), GraphError> {
    let mut graph = chain_graph();
    let range = graph.param_range("h")?;
    graph.param_view_mut("h")?.fill(0.5);
    graph.param_view_mut("y")?[0] = -7.0;

    let flat = graph.params();
    assert!(flat[range.clone()].iter().all(|&v| v == 0.5));
    assert_eq!(flat[graph.param_range("y")?.start], -7.0);

    // 整体覆盖后，视图看到的是新值
    let replacement = (0..graph.num_params()).map(|i| i as f32).collect::<Vec<_>>();
    graph.set_params(&replacement)?;
    assert_eq!(graph.param_view("h")?, &replacement[range]);
    Ok(())
}

#[test]
fn test_weights_are_flattened_column_major() -> Result<(), GraphError> {
    let mut graph = chain_graph();
    let w = Tensor::new(&[1., 2., 3., 4., 5., 6., 7., 8.], &[4, 2]);
    graph.set_param("h_W", &w)?;
    graph.set_param("h_b", &Tensor::new(&[9., 10.], &[1, 2]))?;
    assert_eq!(
        graph.param_view("h")?,
        &[1., 3., 5., 7., 2., 4., 6., 8., 9., 10.]
    );
    assert_eq!(graph.get_param("h_W")?, w);

    let table = graph.param_table()?;
    let keys = table.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>();
    assert_eq!(keys, vec!["h_W", "h_b", "y_W", "y_b"]);

    let slot = graph.layer("h")?.param_layout().slot("W")?.clone();
    assert_eq!(slot.order, Order::F);
    assert_eq!(slot.shape, vec![4, 2]);

    assert_err!(graph.get_param("h_gamma"), GraphError::InvalidArgument(_));
    assert_err!(graph.get_param("x_W"), GraphError::InvalidArgument(_));
    assert_err!(
        graph.set_param("h_W", &Tensor::zeros(&[2, 4])),
        GraphError::ShapeMismatch { .. }
    );
    Ok(())
}

#[test]
fn test_init_is_idempotent_and_seeded() -> Result<(), GraphError> {
    let mut graph = chain_graph();
    let before = graph.params().to_vec();
    graph.init()?;
    assert_eq!(graph.params(), before.as_slice());

    // 相同种子得到相同初值
    let other = chain_graph();
    assert_eq!(other.params(), before.as_slice());

    // 偏置按 bias_init 初始化
    let b = graph.get_param("h_b")?;
    assert_eq!(b.to_vec(), vec![0.0, 0.0]);
    Ok(())
}

#[test]
fn test_init_with_external_buffer() -> Result<(), GraphError> {
    let mut graph = ComputationGraph::new(chain_conf());
    let buffer = (0..13).map(|i| i as f32 * 0.1).collect::<Vec<_>>();
    graph.init_with(Some(buffer.clone()))?;
    assert_eq!(graph.params(), buffer.as_slice());

    let mut graph = ComputationGraph::new(chain_conf());
    let result = graph.init_with(Some(vec![0.0; 12]));
    assert_err!(result, GraphError::ShapeMismatch { expected, got, .. } if expected == &vec![13] && got == &vec![12]);
    assert!(!graph.is_initialized());
    Ok(())
}

#[test]
fn test_set_params_length_mismatch() {
    let mut graph = chain_graph();
    assert_err!(
        graph.set_params(&[0.0; 14]),
        GraphError::LengthMismatch { expected: 13, got: 14, .. }
    );
}

#[test]
fn test_param_access_before_init() {
    let graph = ComputationGraph::new(chain_conf());
    assert_err!(graph.param_view("h"), GraphError::InvalidState(_));

    let mut graph = ComputationGraph::new(chain_conf());
    assert_err!(graph.init_gradients_view(), GraphError::InvalidState(_));
}

#[test]
fn test_gradient_views_share_parameter_ranges() -> Result<(), GraphError> {
    let mut graph = chain_graph();
    graph.init_gradients_view()?;
    assert_eq!(graph.flattened_gradients().map(<[f32]>::len), Some(13));
    assert_eq!(graph.gradient_view("h")?.len(), 10);
    assert_eq!(graph.gradient_view("y")?.len(), 3);
    assert!(graph.gradient_view("x")?.is_empty());
    Ok(())
}

#[test]
fn test_convolution_param_layout() -> Result<(), GraphError> {
    let conf = NeuralNetConfig::builder()
        .graph_builder()
        .add_inputs(&["img"])
        .add_layer("conv", LayerConfig::convolution(3, [2, 2], [1, 1], [0, 0]), &["img"])
        .add_layer("out", LayerConfig::output(0, 2, LossFunction::Mse), &["conv"])
        .set_outputs(&["out"])
        .set_input_types(&[InputType::convolutional(4, 4, 2)])
        .build()
        .unwrap();
    let mut graph = ComputationGraph::new(conf);
    graph.init()?;

    let w = graph.get_param("conv_W")?;
    assert_eq!(w.shape(), &[3, 2, 2, 2]);
    assert_eq!(graph.get_param("conv_b")?.shape(), &[1, 3]);
    assert_eq!(graph.param_view("conv")?.len(), 3 * 2 * 2 * 2 + 3);
    // 3x3 输出，3 个通道，展平后 27
    assert_eq!(graph.get_param("out_W")?.shape(), &[27, 2]);

    let l2 = graph.layer("conv")?.calc_l2(graph.param_view("conv")?);
    assert_abs_diff_eq!(l2, 0.0);
    Ok(())
}
