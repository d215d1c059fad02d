use serde::{Deserialize, Serialize};

/// 步进函数：用（已由更新器变换过的）搜索方向原地修改参数缓冲区
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StepFunction {
    /// params -= direction
    #[default]
    NegativeGradient,
    /// params += direction
    Gradient,
    /// params += step * direction
    Default,
    /// params -= step * direction
    NegativeDefault,
}

impl StepFunction {
    pub fn step(&self, params: &mut [f32], direction: &[f32], step_size: f32) {
        let scale = match self {
            Self::NegativeGradient => -1.0,
            Self::Gradient => 1.0,
            Self::Default => step_size,
            Self::NegativeDefault => -step_size,
        };
        for (p, d) in params.iter_mut().zip(direction) {
            *p += scale * d;
        }
    }
}
