use std::cell::RefCell;
use std::rc::Rc;

use tracing::info;

/// 每次迭代结束后被通知
pub trait IterationListener {
    fn iteration_done(&mut self, iteration: usize, score: f32);
}

/// 每隔`print_iterations`次迭代记录一次分数
#[derive(Debug, Clone)]
pub struct ScoreIterationListener {
    print_iterations: usize,
}

impl ScoreIterationListener {
    pub fn new(print_iterations: usize) -> Self {
        Self {
            print_iterations: print_iterations.max(1),
        }
    }
}

impl Default for ScoreIterationListener {
    fn default() -> Self {
        Self::new(10)
    }
}

impl IterationListener for ScoreIterationListener {
    fn iteration_done(&mut self, iteration: usize, score: f32) {
        if iteration % self.print_iterations == 0 {
            info!(iteration, score, "迭代分数");
        }
    }
}

/// 收集每次迭代的分数，供调用方事后查看
#[derive(Debug, Clone, Default)]
pub struct CollectScoresListener {
    scores: Rc<RefCell<Vec<(usize, f32)>>>,
}

impl CollectScoresListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// 与监听器共享同一份记录的句柄
    pub fn handle(&self) -> Rc<RefCell<Vec<(usize, f32)>>> {
        Rc::clone(&self.scores)
    }

    pub fn scores(&self) -> Vec<(usize, f32)> {
        self.scores.borrow().clone()
    }
}

impl IterationListener for CollectScoresListener {
    fn iteration_done(&mut self, iteration: usize, score: f32) {
        self.scores.borrow_mut().push((iteration, score));
    }
}
