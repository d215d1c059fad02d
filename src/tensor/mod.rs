/*
 * @Author       : 老董
 * @Date         : 2023-08-17 17:24:24
 * @LastEditors  : 老董
 * @LastEditTime : 2026-03-02
 * @Description  : 张量适配层：以 ndarray 为后端，只暴露计算图引擎需要的那部分张量运算
 *                 （创建、变形、取/设值、矩阵乘、逐元素映射、转置、切片、按 c/f 顺序展平）
 */

use ndarray::{Array, IxDyn};
use rand::Rng;
use rand::distributions::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

use crate::errors::TensorError;

mod ops {
    pub mod arith;
    pub mod mat_mul;
    pub mod others;
}

mod index;
mod order;
mod print;
mod shape;

pub use order::Order;

#[cfg(test)]
mod tests;

/// 定义张量的结构体。其可以是标量、向量、矩阵或更高维度的数组。
/// 计算图中的激活值约定为：全连接类 `[batch, features]`，卷积类 `[batch, channels, height, width]`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    data: Array<f32, IxDyn>,
}

impl Tensor {
    /// 创建一个张量。
    /// 注：`data`的长度必须和`shape`中所有元素的乘积相等，否则panic；需要可恢复的错误请用`try_new`。
    pub fn new(data: &[f32], shape: &[usize]) -> Tensor {
        match Self::try_new(data, shape) {
            Ok(t) => t,
            Err(e) => panic!("{}", e),
        }
    }

    pub fn try_new(data: &[f32], shape: &[usize]) -> Result<Tensor, TensorError> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(TensorError::ReshapeMismatch {
                expected,
                got: data.len(),
                shape: shape.to_vec(),
            });
        }
        let data = Array::from_shape_vec(IxDyn(shape), data.to_vec())
            .map_err(|_| TensorError::IncompatibleShape)?;
        Ok(Tensor { data })
    }

    pub fn zeros(shape: &[usize]) -> Tensor {
        Tensor {
            data: Array::zeros(IxDyn(shape)),
        }
    }

    pub fn ones(shape: &[usize]) -> Tensor {
        Tensor {
            data: Array::ones(IxDyn(shape)),
        }
    }

    /// 形状为`[1, 1]`的标量张量
    pub fn scalar(value: f32) -> Tensor {
        Tensor::new(&[value], &[1, 1])
    }

    /// 每个元素都等于`value`
    pub fn full(value: f32, shape: &[usize]) -> Tensor {
        Tensor {
            data: Array::from_elem(IxDyn(shape), value),
        }
    }

    /// 创建一个随机张量，其值在[min, max]的闭区间
    pub fn uniform_with_rng<R: Rng + ?Sized>(
        min: f32,
        max: f32,
        shape: &[usize],
        rng: &mut R,
    ) -> Tensor {
        let dist = Uniform::from(min..=max);
        let data = (0..shape.iter().product::<usize>())
            .map(|_| dist.sample(rng))
            .collect::<Vec<_>>();
        Tensor::new(&data, shape)
    }

    /// 创建一个服从正态分布的随机张量（Box-Muller）
    pub fn normal_with_rng<R: Rng + ?Sized>(
        mean: f32,
        std_dev: f32,
        shape: &[usize],
        rng: &mut R,
    ) -> Tensor {
        let data_len = shape.iter().product::<usize>();
        let mut data = Vec::with_capacity(data_len);

        while data.len() < data_len {
            let u1: f32 = rng.r#gen();
            let u2: f32 = rng.r#gen();
            let r = (-2.0 * u1.ln()).sqrt();
            let theta = 2.0 * std::f32::consts::PI * u2;
            let z0 = mean + std_dev * r * theta.cos();
            let z1 = mean + std_dev * r * theta.sin();

            if z0.is_finite() {
                data.push(z0);
            }
            if data.len() < data_len && z1.is_finite() {
                data.push(z1);
            }
        }

        Tensor::new(&data, shape)
    }

    /// 同`normal_with_rng`，使用线程随机数
    pub fn normal(mean: f32, std_dev: f32, shape: &[usize]) -> Tensor {
        Self::normal_with_rng(mean, std_dev, shape, &mut rand::thread_rng())
    }
}
