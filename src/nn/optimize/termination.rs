/*
 * @Author       : 老董
 * @Date         : 2026-03-02
 * @Description  : 优化的终止条件
 */

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TerminationCondition {
    /// 相对改进足够小：2|old - new| <= tolerance * (|old| + |new| + eps)
    Eps { eps: f32, tolerance: f32 },
    /// 搜索方向全为0
    ZeroDirection,
    /// 搜索方向的 L2 范数低于阈值
    Norm2 { gradient_tolerance: f32 },
}

impl TerminationCondition {
    pub fn terminate(&self, cost: f32, old_cost: f32, direction: &[f32]) -> bool {
        match *self {
            Self::Eps { eps, tolerance } => {
                if cost == old_cost {
                    return true;
                }
                2.0 * (old_cost - cost).abs() <= tolerance * (old_cost.abs() + cost.abs() + eps)
            }
            Self::ZeroDirection => direction.iter().all(|d| *d == 0.0),
            Self::Norm2 { gradient_tolerance } => {
                direction.iter().map(|d| d * d).sum::<f32>().sqrt() < gradient_tolerance
            }
        }
    }
}
