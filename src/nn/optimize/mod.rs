/*
 * @Author       : 老董
 * @Date         : 2025-07-24 16:30:00
 * @LastEditors  : 老董
 * @LastEditTime : 2026-03-02
 * @Description  : 优化模块：求解器、更新器、步进函数、终止条件与迭代监听器
 */

use std::ops::Range;

mod listener;
mod solver;
mod step;
mod termination;
mod updater;

pub use listener::{CollectScoresListener, IterationListener, ScoreIterationListener};
pub use solver::{OptimizationOutcome, Solver, SolverState};
pub use step::StepFunction;
pub use termination::TerminationCondition;
pub use updater::{GradientUpdater, Updater};

use crate::nn::GraphError;

/// 扁平参数缓冲区中一个参数变量的描述
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    /// 形如`<顶点名>_<参数键>`
    pub key: String,
    pub range: Range<usize>,
    pub learning_rate: f32,
    pub l1: f32,
    pub l2: f32,
    pub updater: Updater,
    /// 偏置不参与 L1/L2
    pub regularized: bool,
}

/// 可被求解器优化的模型
pub trait Model {
    /// 一次前向+反向传播，梯度写入扁平梯度缓冲区，返回分数
    fn compute_gradient_and_score(&mut self) -> Result<f32, GraphError>;
    /// 最近一次计算得到的分数
    fn last_score(&self) -> f32;
    fn num_params(&self) -> usize;
    fn param_specs(&self) -> Vec<ParamSpec>;
    /// 同时借出参数缓冲区（可写）与梯度缓冲区（只读）
    fn params_and_gradients_mut(&mut self) -> Result<(&mut [f32], &[f32]), GraphError>;
    fn batch_size(&self) -> usize;
}
