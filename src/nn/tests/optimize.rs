use std::cell::RefCell;
use std::rc::Rc;

use approx::assert_abs_diff_eq;

use crate::nn::optimize::{
    CollectScoresListener, GradientUpdater, Model, ParamSpec, ScoreIterationListener,
    SolverState, StepFunction, TerminationCondition, Updater,
};
use crate::nn::{
    Activation, ComputationGraph, GraphError, LayerConfig, LossFunction, NeuralNetConfig, Solver,
};
use crate::tensor::Tensor;

/// f(w) = Σ (w - target)²，梯度 2(w - target)
struct Quadratic {
    params: Vec<f32>,
    gradient: Vec<f32>,
    target: Vec<f32>,
    score: f32,
    learning_rate: f32,
    updater: Updater,
}

impl Quadratic {
    fn new(params: Vec<f32>, learning_rate: f32, updater: Updater) -> Self {
        let n = params.len();
        Self {
            params,
            gradient: vec![0.0; n],
            target: vec![0.0; n],
            score: 0.0,
            learning_rate,
            updater,
        }
    }
}

impl Model for Quadratic {
    fn compute_gradient_and_score(&mut self) -> Result<f32, GraphError> {
        self.score = 0.0;
        for i in 0..self.params.len() {
            let d = self.params[i] - self.target[i];
            self.gradient[i] = 2.0 * d;
            self.score += d * d;
        }
        Ok(self.score)
    }

    fn last_score(&self) -> f32 {
        self.score
    }

    fn num_params(&self) -> usize {
        self.params.len()
    }

    fn param_specs(&self) -> Vec<ParamSpec> {
        vec![ParamSpec {
            key: "w".to_string(),
            range: 0..self.params.len(),
            learning_rate: self.learning_rate,
            l1: 0.0,
            l2: 0.0,
            updater: self.updater,
            regularized: true,
        }]
    }

    fn params_and_gradients_mut(&mut self) -> Result<(&mut [f32], &[f32]), GraphError> {
        Ok((self.params.as_mut_slice(), self.gradient.as_slice()))
    }

    fn batch_size(&self) -> usize {
        1
    }
}

fn spec(learning_rate: f32, updater: Updater) -> ParamSpec {
    ParamSpec {
        key: "layer_W".to_string(),
        range: 0..2,
        learning_rate,
        l1: 0.0,
        l2: 0.0,
        updater,
        regularized: true,
    }
}

#[test]
fn test_eps_termination() {
    let eps = TerminationCondition::Eps {
        eps: 1e-4,
        tolerance: 1e-4,
    };
    assert!(eps.terminate(5.0, 5.0, &[1.0]));
    assert!(!eps.terminate(100.0, 1.0, &[1.0]));
    assert!(eps.terminate(1.0, 1.000_01, &[1.0]));
}

#[test]
fn test_direction_terminations() {
    assert!(TerminationCondition::ZeroDirection.terminate(1.0, 2.0, &[0.0, 0.0]));
    assert!(!TerminationCondition::ZeroDirection.terminate(1.0, 2.0, &[0.0, 1e-9]));

    let norm = TerminationCondition::Norm2 {
        gradient_tolerance: 1.0,
    };
    assert!(norm.terminate(0.0, 0.0, &[0.3, 0.4]));
    assert!(!norm.terminate(0.0, 0.0, &[3.0, 4.0]));
}

#[test]
fn test_step_functions() {
    let direction = [1.0, -2.0];
    let cases = [
        (StepFunction::NegativeGradient, [-1.0, 2.0]),
        (StepFunction::Gradient, [1.0, -2.0]),
        (StepFunction::Default, [0.5, -1.0]),
        (StepFunction::NegativeDefault, [-0.5, 1.0]),
    ];
    for (step, expected) in cases {
        let mut params = [0.0, 0.0];
        step.step(&mut params, &direction, 0.5);
        assert_eq!(params, expected, "{step:?}");
    }
}

#[test]
fn test_sgd_and_batch_averaging() {
    let mut updater = GradientUpdater::new();
    let mut g = [4.0, -8.0];
    updater.update(&spec(0.5, Updater::Sgd), &[0.0, 0.0], &mut g, 4, true);
    assert_eq!(g, [0.5, -1.0]);

    // 关闭 minibatch 时不除以批大小
    let mut g = [4.0, -8.0];
    updater.update(&spec(0.5, Updater::Sgd), &[0.0, 0.0], &mut g, 4, false);
    assert_eq!(g, [2.0, -4.0]);

    let mut g = [4.0, -8.0];
    updater.update(&spec(0.5, Updater::NoOp), &[0.0, 0.0], &mut g, 1, true);
    assert_eq!(g, [4.0, -8.0]);
}

#[test]
fn test_regularization_penalties() {
    let mut updater = GradientUpdater::new();
    let mut regularized = spec(1.0, Updater::NoOp);
    regularized.l1 = 0.1;
    regularized.l2 = 0.5;

    let mut g = [0.0, 0.0];
    updater.update(&regularized, &[2.0, -4.0], &mut g, 1, true);
    assert_abs_diff_eq!(g[0], 0.5 * 2.0 + 0.1, epsilon = 1e-6);
    assert_abs_diff_eq!(g[1], 0.5 * -4.0 - 0.1, epsilon = 1e-6);

    // w 为 0 时 L1 不贡献
    let mut g = [0.0, 0.0];
    updater.update(&regularized, &[0.0, 0.0], &mut g, 1, true);
    assert_eq!(g, [0.0, 0.0]);

    // 偏置不参与正则化
    regularized.regularized = false;
    let mut g = [0.0, 0.0];
    updater.update(&regularized, &[2.0, -4.0], &mut g, 1, true);
    assert_eq!(g, [0.0, 0.0]);
}

#[test]
fn test_nesterovs_keeps_velocity_per_key() {
    let mut updater = GradientUpdater::new();
    let s = spec(0.1, Updater::nesterovs());

    // 第一步：v = -0.1g，更新量 = -(1 + 0.9)v = 0.19g
    let mut g = [1.0, 2.0];
    updater.update(&s, &[0.0, 0.0], &mut g, 1, true);
    assert_abs_diff_eq!(g[0], 0.19, epsilon = 1e-6);
    assert_abs_diff_eq!(g[1], 0.38, epsilon = 1e-6);

    // 第二步：v_prev = -0.1，v = 0.9·(-0.1) - 0.1 = -0.19
    // 更新量 = 0.9·(-0.1) - 1.9·(-0.19) = 0.271
    let mut g = [1.0, 2.0];
    updater.update(&s, &[0.0, 0.0], &mut g, 1, true);
    assert_abs_diff_eq!(g[0], 0.271, epsilon = 1e-6);

    // 换一个键，状态重新开始
    let mut other = s.clone();
    other.key = "other_W".to_string();
    let mut g = [1.0, 2.0];
    updater.update(&other, &[0.0, 0.0], &mut g, 1, true);
    assert_abs_diff_eq!(g[0], 0.19, epsilon = 1e-6);

    updater.reset();
    let mut g = [1.0, 2.0];
    updater.update(&s, &[0.0, 0.0], &mut g, 1, true);
    assert_abs_diff_eq!(g[0], 0.19, epsilon = 1e-6);
}

#[test]
fn test_adaptive_updaters() {
    // Adam 第一步经偏差修正后约为 lr·sign(g)
    let mut updater = GradientUpdater::new();
    let mut g = [3.0, -0.5];
    updater.update(&spec(0.01, Updater::adam()), &[0.0, 0.0], &mut g, 1, true);
    assert_abs_diff_eq!(g[0], 0.01, epsilon = 1e-5);
    assert_abs_diff_eq!(g[1], -0.01, epsilon = 1e-5);

    // AdaGrad 第一步：lr·g/|g|
    let mut updater = GradientUpdater::new();
    let mut g = [4.0, -2.0];
    updater.update(&spec(0.1, Updater::adagrad()), &[0.0, 0.0], &mut g, 1, true);
    assert_abs_diff_eq!(g[0], 0.1, epsilon = 1e-5);
    assert_abs_diff_eq!(g[1], -0.1, epsilon = 1e-5);
    // 第二步：历史平方和变为 2g²
    let mut g = [4.0, -2.0];
    updater.update(&spec(0.1, Updater::adagrad()), &[0.0, 0.0], &mut g, 1, true);
    assert_abs_diff_eq!(g[0], 0.1 / 2f32.sqrt(), epsilon = 1e-5);

    // RMSProp 第一步：c = (1 - decay)g²
    let mut updater = GradientUpdater::new();
    let mut g = [1.0, -2.0];
    updater.update(
        &spec(
            0.1,
            Updater::RmsProp {
                decay: 0.75,
                epsilon: 0.0,
            },
        ),
        &[0.0, 0.0],
        &mut g,
        1,
        true,
    );
    assert_abs_diff_eq!(g[0], 0.1 / 0.25f32.sqrt(), epsilon = 1e-5);
    assert_abs_diff_eq!(g[1], -0.1 / 0.25f32.sqrt(), epsilon = 1e-5);
}

#[test]
fn test_solver_stops_early_when_enabled() -> Result<(), GraphError> {
    // 学习率 0.5 时一步就到达最小值，之后方向为 0
    let conf = NeuralNetConfig::builder().iterations(10).early_stop(true);
    let mut model = Quadratic::new(vec![1.0, -2.0], 0.5, Updater::Sgd);
    let mut solver = Solver::new(&conf);
    let outcome = solver.optimize(&mut model)?;

    assert_eq!(outcome.state, SolverState::Converged);
    assert_eq!(outcome.iterations, 2);
    assert_eq!(solver.state(), SolverState::Converged);
    assert_eq!(model.params, vec![0.0, 0.0]);
    Ok(())
}

#[test]
fn test_solver_runs_all_iterations_without_early_stop() -> Result<(), GraphError> {
    let conf = NeuralNetConfig::builder().iterations(10);
    let mut model = Quadratic::new(vec![1.0, -2.0], 0.5, Updater::Sgd);
    let mut solver = Solver::new(&conf);
    let collector = CollectScoresListener::new();
    let scores = collector.handle();
    solver.set_listeners(vec![Box::new(collector), Box::new(ScoreIterationListener::new(5))]);

    let outcome = solver.optimize(&mut model)?;
    assert_eq!(outcome.state, SolverState::IterationLimit);
    assert_eq!(outcome.iterations, 10);

    let scores = scores.borrow();
    assert_eq!(scores.len(), 10);
    assert_eq!(scores[0], (0, 5.0));
    assert!(scores[1..].iter().all(|&(_, s)| s == 0.0));
    Ok(())
}

#[test]
fn test_solver_with_adam_decreases_score() -> Result<(), GraphError> {
    let conf = NeuralNetConfig::builder().iterations(50);
    let mut model = Quadratic::new(vec![3.0, -1.0, 0.5], 0.1, Updater::adam());
    let initial = {
        let mut probe = Quadratic::new(model.params.clone(), 0.1, Updater::adam());
        probe.compute_gradient_and_score()?
    };
    let outcome = Solver::new(&conf).optimize(&mut model)?;
    assert!(outcome.score < initial);
    assert_eq!(model.num_params(), 3);
    Ok(())
}

#[test]
fn test_fit_lowers_graph_score() -> Result<(), GraphError> {
    let conf = NeuralNetConfig::builder()
        .seed(5)
        .iterations(30)
        .learning_rate(0.5)
        .activation(Activation::Tanh)
        .graph_builder()
        .add_inputs(&["x"])
        .add_layer("h", LayerConfig::dense(2, 4), &["x"])
        .add_layer(
            "out",
            LayerConfig::output(4, 1, LossFunction::Mse).activation(Activation::Identity),
            &["h"],
        )
        .set_outputs(&["out"])
        .build()
        .unwrap();
    let mut graph = ComputationGraph::new(conf);
    let x = Tensor::new(&[0.0, 1.0, 1.0, 0.0, 0.5, 0.5], &[3, 2]);
    let y = Tensor::new(&[1.0, -1.0, 0.0], &[3, 1]);

    graph.init()?;
    let before = graph.score(std::slice::from_ref(&x), std::slice::from_ref(&y), false)?;

    let history: Rc<RefCell<Vec<(usize, f32)>>> = {
        let listener = CollectScoresListener::new();
        let handle = listener.handle();
        graph.add_listener(Box::new(listener));
        handle
    };
    let outcome = graph.fit_single(&x, &y)?;
    assert_eq!(outcome.iterations, 30);
    assert_eq!(history.borrow().len(), 30);

    let after = graph.score(std::slice::from_ref(&x), std::slice::from_ref(&y), false)?;
    assert!(after < before, "训练后分数应下降：{before} -> {after}");

    // param_specs 覆盖整个参数缓冲区
    let covered: usize = graph.param_specs().iter().map(|s| s.range.len()).sum();
    assert_eq!(covered, graph.num_params());
    Ok(())
}
