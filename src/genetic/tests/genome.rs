use crate::assert_err;
use crate::genetic::{GaError, Genome, GenomeFactory};
use crate::nn::{ComputationGraph, LayerConfig, LossFunction, NeuralNetConfig};

fn small_conf() -> crate::nn::ComputationGraphConfiguration {
    NeuralNetConfig::builder()
        .seed(3)
        .graph_builder()
        .add_inputs(&["x"])
        .add_layer("h", LayerConfig::dense(2, 3), &["x"])
        .add_layer("y", LayerConfig::output(3, 1, LossFunction::Mse), &["h"])
        .set_outputs(&["y"])
        .build()
        .unwrap()
}

#[test]
fn test_uniform_factory() -> Result<(), GaError> {
    let factory = GenomeFactory::Uniform {
        num_params: 50,
        low: -0.5,
        high: 0.25,
        seed: 11,
    };
    assert_eq!(factory.num_params(), 50);

    let genome = factory.create(1)?;
    assert_eq!(genome.id, 1);
    assert_eq!(genome.len(), 50);
    assert!(!genome.is_evaluated());
    assert!(genome.params.iter().all(|&p| (-0.5..=0.25).contains(&p)));

    // 同 id 可复现，不同 id 不同
    assert_eq!(factory.create(1)?, genome);
    assert_ne!(factory.create(2)?.params, genome.params);
    Ok(())
}

#[test]
fn test_uniform_factory_rejects_inverted_bounds() {
    let factory = GenomeFactory::Uniform {
        num_params: 3,
        low: 1.0,
        high: 0.0,
        seed: 0,
    };
    assert_err!(factory.create(0), GaError::InvalidArgument(_));
}

#[test]
fn test_graph_factory() -> Result<(), GaError> {
    let conf = small_conf();
    let factory = GenomeFactory::from_graph(conf.clone());
    assert_eq!(factory.num_params(), 2 * 3 + 3 + 3 + 1);

    let genome = factory.create(0)?;
    assert_eq!(genome.len(), factory.num_params());

    // id 0 的基因组等于用原始种子初始化的图的参数
    let mut graph = ComputationGraph::new(conf);
    graph.init()?;
    assert_eq!(genome.params.as_slice(), graph.params());

    assert_ne!(factory.create(1)?.params, genome.params);
    Ok(())
}

#[test]
fn test_fitness_ordering_helpers() {
    let mut genome = Genome::new(5, vec![0.0; 2]);
    assert_eq!(genome.fitness_or_worst(), f32::INFINITY);
    genome.fitness = Some(0.5);
    assert_eq!(genome.fitness_or_worst(), 0.5);
    assert!(!genome.is_empty());
}

#[test]
fn test_save_and_load() -> Result<(), GaError> {
    let dir = std::env::temp_dir().join(format!("grid_torch_genome_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("best.bin");

    let genome = super::evaluated(9, &[1.0, -2.0, 3.5], 0.125);
    genome.save(&path)?;
    assert_eq!(Genome::load(&path)?, genome);

    assert_err!(Genome::load(dir.join("missing.bin")), GaError::Io { .. });
    std::fs::remove_dir_all(dir).ok();
    Ok(())
}
