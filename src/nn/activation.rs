/*
 * @Author       : 老董
 * @Date         : 2026-03-02
 * @Description  : 激活函数。activate 计算 a = f(z)；backprop 把 dL/da 换算为 dL/dz
 */

use serde::{Deserialize, Serialize};

use crate::tensor::Tensor;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Activation {
    Identity,
    #[default]
    Sigmoid,
    Tanh,
    Relu,
    LeakyRelu {
        alpha: f32,
    },
    /// 按行（每个样本）归一化
    Softmax,
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

impl Activation {
    pub fn activate(&self, z: &Tensor) -> Tensor {
        match *self {
            Self::Identity => z.clone(),
            Self::Sigmoid => z.map(sigmoid),
            Self::Tanh => z.map(f32::tanh),
            Self::Relu => z.map(|x| x.max(0.0)),
            Self::LeakyRelu { alpha } => z.map(|x| if x > 0.0 { x } else { alpha * x }),
            Self::Softmax => z.softmax_rows(),
        }
    }

    /// 给定预激活值`z`与 dL/da（`epsilon`），返回 dL/dz
    pub fn backprop(&self, z: &Tensor, epsilon: &Tensor) -> Tensor {
        match *self {
            Self::Identity => epsilon.clone(),
            Self::Sigmoid => z.zip_map(epsilon, |x, e| {
                let s = sigmoid(x);
                e * s * (1.0 - s)
            }),
            Self::Tanh => z.zip_map(epsilon, |x, e| {
                let t = x.tanh();
                e * (1.0 - t * t)
            }),
            Self::Relu => z.zip_map(epsilon, |x, e| if x > 0.0 { e } else { 0.0 }),
            Self::LeakyRelu { alpha } => {
                z.zip_map(epsilon, |x, e| if x > 0.0 { e } else { alpha * e })
            }
            Self::Softmax => {
                // dL/dz_i = a_i * (e_i - Σ_j e_j a_j)，逐行计算
                let a = z.softmax_rows().to_vec();
                let e = epsilon.to_vec();
                let cols = epsilon.shape().last().copied().unwrap_or(1).max(1);
                let mut out = Vec::with_capacity(e.len());
                for (a_row, e_row) in a.chunks(cols).zip(e.chunks(cols)) {
                    let weighted: f32 = a_row.iter().zip(e_row).map(|(a, e)| a * e).sum();
                    out.extend(a_row.iter().zip(e_row).map(|(a, e)| a * (e - weighted)));
                }
                Tensor::new(&out, epsilon.shape())
            }
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Sigmoid => "sigmoid",
            Self::Tanh => "tanh",
            Self::Relu => "relu",
            Self::LeakyRelu { .. } => "leakyrelu",
            Self::Softmax => "softmax",
        }
    }

    /// 按名称解析（大小写不敏感）；leakyrelu 的斜率取 0.01
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "identity" | "linear" => Some(Self::Identity),
            "sigmoid" => Some(Self::Sigmoid),
            "tanh" => Some(Self::Tanh),
            "relu" => Some(Self::Relu),
            "leakyrelu" => Some(Self::LeakyRelu { alpha: 0.01 }),
            "softmax" => Some(Self::Softmax),
            _ => None,
        }
    }
}
