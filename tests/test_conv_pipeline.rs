/*
 * @Author       : 老董
 * @Date         : 2026-02-20
 * @Description  : 卷积网络端到端：构建时自动插入 flat<->image 预处理器、训练、保存并重新加载模型
 *                 网络结构：img(4x4x1, 扁平) -> conv(2@3x3) -> out(Output, Softmax, McXent)
 * @LastEditors  : 老董
 * @LastEditTime : 2026-03-02
 */
use grid_torch::nn::{
    Activation, ComputationGraph, GraphError, GraphVertexConfig, InputPreProcessor, InputType,
    LayerConfig, LossFunction, NeuralNetConfig,
};
use grid_torch::tensor::Tensor;

/// 竖线与横线两类 4x4 图案
fn get_stripes() -> (Tensor, Tensor) {
    #[rustfmt::skip]
    let images = [
        0., 1., 0., 0.,  0., 1., 0., 0.,  0., 1., 0., 0.,  0., 1., 0., 0.,
        0., 0., 1., 0.,  0., 0., 1., 0.,  0., 0., 1., 0.,  0., 0., 1., 0.,
        1., 1., 1., 1.,  0., 0., 0., 0.,  0., 0., 0., 0.,  0., 0., 0., 0.,
        0., 0., 0., 0.,  0., 0., 0., 0.,  1., 1., 1., 1.,  0., 0., 0., 0.,
    ];
    let labels = [1., 0., 1., 0., 0., 1., 0., 1.];
    (Tensor::new(&images, &[4, 16]), Tensor::new(&labels, &[4, 2]))
}

fn build_graph() -> Result<ComputationGraph, GraphError> {
    let conf = NeuralNetConfig::builder()
        .seed(9)
        .iterations(200)
        .learning_rate(0.1)
        .activation(Activation::Relu)
        .graph_builder()
        .add_inputs(&["img"])
        .add_layer("conv", LayerConfig::convolution(2, [3, 3], [1, 1], [0, 0]), &["img"])
        .add_layer(
            "out",
            LayerConfig::output(0, 2, LossFunction::McXent).activation(Activation::Softmax),
            &["conv"],
        )
        .set_outputs(&["out"])
        .set_input_types(&[InputType::convolutional_flat(4, 4, 1)])
        .build()?;
    Ok(ComputationGraph::new(conf))
}

#[test]
fn test_preprocessors_inserted_at_build() -> Result<(), GraphError> {
    let graph = build_graph()?;
    let conf = graph.conf();
    match conf.vertex("conv") {
        Some(GraphVertexConfig::Layer { preprocessor, .. }) => assert_eq!(
            *preprocessor,
            Some(InputPreProcessor::FeedForwardToCnn {
                height: 4,
                width: 4,
                channels: 1
            })
        ),
        other => panic!("conv 顶点配置异常：{other:?}"),
    }
    match conf.vertex("out") {
        Some(GraphVertexConfig::Layer { preprocessor, .. }) => assert_eq!(
            *preprocessor,
            Some(InputPreProcessor::CnnToFeedForward {
                height: 2,
                width: 2,
                channels: 2
            })
        ),
        other => panic!("out 顶点配置异常：{other:?}"),
    }
    // conv: 2·1·3·3 + 2，out: 8·2 + 2
    assert_eq!(conf.num_params(), 20 + 18);
    Ok(())
}

#[test]
fn test_conv_training_and_model_round_trip() -> Result<(), GraphError> {
    let (images, labels) = get_stripes();
    let mut graph = build_graph()?;
    graph.init()?;

    let before = graph.score(
        std::slice::from_ref(&images),
        std::slice::from_ref(&labels),
        false,
    )?;
    graph.fit_single(&images, &labels)?;
    let after = graph.score(
        std::slice::from_ref(&images),
        std::slice::from_ref(&labels),
        false,
    )?;
    assert!(after < before, "训练后分数应下降：{before} -> {after}");

    let out = graph.output_single(false, &images)?;
    assert_eq!(out.shape(), &[4, 2]);
    // softmax 每行和为1
    let values = out.to_vec();
    for row in values.chunks(2) {
        assert!((row[0] + row[1] - 1.0).abs() < 1e-5);
    }

    let dir = std::env::temp_dir().join(format!("grid_torch_conv_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("stripes");
    graph.save_model(&path)?;

    let mut restored = ComputationGraph::load_model(&path)?;
    assert_eq!(restored.params(), graph.params());
    assert_eq!(restored.output_single(false, &images)?, out);
    std::fs::remove_dir_all(dir).ok();
    Ok(())
}
