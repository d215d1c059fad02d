/*
 * @Author       : 老董
 * @Date         : 2026-01-08
 * @LastEditors  : 老董
 * @LastEditTime : 2026-03-02
 * @Description  : 权重初始化策略。扇入/扇出由层给出，随机数统一来自图持有的 StdRng，保证可复现
 */

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::tensor::Tensor;

/// 参数初始化策略
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum WeightInit {
    /// 全零
    Zero,
    /// 常数初始化
    Constant(f32),
    /// 均匀分布 U(-1/√fan_in, 1/√fan_in)
    Uniform,
    /// 正态分布
    Normal { mean: f32, std: f32 },
    /// Xavier/Glorot 初始化（适用于 Sigmoid/Tanh）
    #[default]
    Xavier,
    /// He 初始化（适用于 `ReLU`）
    Relu,
}

impl WeightInit {
    /// 生成初始化后的 Tensor（使用指定的 RNG）
    pub fn generate(
        &self,
        shape: &[usize],
        fan_in: usize,
        fan_out: usize,
        rng: &mut StdRng,
    ) -> Tensor {
        let fan_in = fan_in.max(1) as f32;
        let fan_out = fan_out.max(1) as f32;
        match *self {
            Self::Zero => Tensor::zeros(shape),
            Self::Constant(v) => Tensor::full(v, shape),
            Self::Uniform => {
                let a = 1.0 / fan_in.sqrt();
                Tensor::uniform_with_rng(-a, a, shape, rng)
            }
            Self::Normal { mean, std } => Tensor::normal_with_rng(mean, std, shape, rng),
            Self::Xavier => {
                let std = (2.0 / (fan_in + fan_out)).sqrt();
                Tensor::normal_with_rng(0.0, std, shape, rng)
            }
            Self::Relu => {
                let std = (2.0 / fan_in).sqrt();
                Tensor::normal_with_rng(0.0, std, shape, rng)
            }
        }
    }
}
