/*
 * @Author       : 老董
 * @Date         : 2026-03-02
 * @Description  : 求解器。状态机：Idle → Optimizing → Converged / IterationLimit。
 *                 每次迭代：求梯度与分数 → 更新器 → 步进函数 → 通知监听器 → 检查终止条件
 */

use tracing::{debug, info};

use super::{GradientUpdater, IterationListener, Model, StepFunction, TerminationCondition};
use crate::nn::{GraphError, NeuralNetConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolverState {
    #[default]
    Idle,
    Optimizing,
    /// 某个终止条件满足且开启了提前结束
    Converged,
    /// 跑满了迭代次数
    IterationLimit,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimizationOutcome {
    pub iterations: usize,
    /// 最后一次迭代（更新参数之前）的分数
    pub score: f32,
    pub state: SolverState,
}

pub struct Solver {
    iterations: usize,
    minibatch: bool,
    step_function: StepFunction,
    termination_conditions: Vec<TerminationCondition>,
    early_stop: bool,
    updater: GradientUpdater,
    listeners: Vec<Box<dyn IterationListener>>,
    state: SolverState,
}

impl std::fmt::Debug for Solver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Solver")
            .field("iterations", &self.iterations)
            .field("state", &self.state)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Solver {
    pub fn new(conf: &NeuralNetConfig) -> Self {
        Self {
            iterations: conf.iterations,
            minibatch: conf.minibatch,
            step_function: conf.step_function,
            termination_conditions: conf.termination_conditions.clone(),
            early_stop: conf.early_stop,
            updater: GradientUpdater::new(),
            listeners: Vec::new(),
            state: SolverState::Idle,
        }
    }

    pub fn set_listeners(&mut self, listeners: Vec<Box<dyn IterationListener>>) {
        self.listeners = listeners;
    }

    pub fn add_listener(&mut self, listener: Box<dyn IterationListener>) {
        self.listeners.push(listener);
    }

    pub const fn state(&self) -> SolverState {
        self.state
    }

    /// 对模型执行若干次优化迭代
    pub fn optimize<M: Model + ?Sized>(
        &mut self,
        model: &mut M,
    ) -> Result<OptimizationOutcome, GraphError> {
        self.state = SolverState::Optimizing;
        let mut old_score = 0.0;
        let mut score = 0.0;
        let mut done = 0;

        for iteration in 0..self.iterations {
            score = model.compute_gradient_and_score()?;
            let specs = model.param_specs();
            let batch_size = model.batch_size();
            let (params, gradient) = model.params_and_gradients_mut()?;

            let mut direction = gradient.to_vec();
            for spec in &specs {
                let range = spec.range.clone();
                self.updater.update(
                    spec,
                    &params[range.clone()],
                    &mut direction[range],
                    batch_size,
                    self.minibatch,
                );
            }
            self.step_function.step(params, &direction, 1.0);
            done = iteration + 1;

            for listener in &mut self.listeners {
                listener.iteration_done(iteration, score);
            }

            // 第一次迭代没有旧分数可比
            if iteration > 0 {
                let hit = self
                    .termination_conditions
                    .iter()
                    .find(|c| c.terminate(score, old_score, &direction));
                if let Some(condition) = hit {
                    debug!(iteration, score, old_score, ?condition, "终止条件满足");
                    if self.early_stop {
                        self.state = SolverState::Converged;
                        info!(iterations = done, score, "提前结束优化");
                        return Ok(OptimizationOutcome {
                            iterations: done,
                            score,
                            state: self.state,
                        });
                    }
                }
            }
            old_score = score;
        }

        self.state = SolverState::IterationLimit;
        Ok(OptimizationOutcome {
            iterations: done,
            score,
            state: self.state,
        })
    }
}
