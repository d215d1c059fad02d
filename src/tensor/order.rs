/*
 * @Author       : 老董
 * @Date         : 2026-03-02
 * @Description  : 展平顺序（行优先'c' / 列优先'f'）。
 *                 参数被压进一维扁平缓冲区、再从缓冲区还原时，必须用同一个顺序，否则反向传播会被悄悄写坏。
 */

use ndarray::{Array, IxDyn, ShapeBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::Tensor;
use crate::errors::TensorError;

/// 展平顺序标记
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Order {
    /// 行优先（最后一维变化最快）
    #[default]
    C,
    /// 列优先（第一维变化最快）
    F,
}

impl Order {
    pub const fn as_char(&self) -> char {
        match self {
            Self::C => 'c',
            Self::F => 'f',
        }
    }

    pub fn from_char(c: char) -> Result<Self, TensorError> {
        match c.to_ascii_lowercase() {
            'c' => Ok(Self::C),
            'f' => Ok(Self::F),
            other => Err(TensorError::UnknownOrder(other)),
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl Tensor {
    /// 按指定顺序展平为一维数据
    pub fn flatten(&self, order: Order) -> Vec<f32> {
        match order {
            Order::C => self.data.iter().copied().collect(),
            // 轴反转后再按逻辑顺序遍历，即第一维变化最快
            Order::F => self.data.t().iter().copied().collect(),
        }
    }

    /// 按指定顺序把展平的数据写入`out`（长度须等于元素个数）
    pub fn flatten_into(&self, order: Order, out: &mut [f32]) -> Result<(), TensorError> {
        if out.len() != self.size() {
            return Err(TensorError::ReshapeMismatch {
                expected: self.size(),
                got: out.len(),
                shape: self.shape().to_vec(),
            });
        }
        let iter: Box<dyn Iterator<Item = &f32>> = match order {
            Order::C => Box::new(self.data.iter()),
            Order::F => Box::new(self.data.t().into_iter()),
        };
        for (dst, src) in out.iter_mut().zip(iter) {
            *dst = *src;
        }
        Ok(())
    }

    /// 按指定顺序把一维数据还原为张量
    pub fn from_flat(data: &[f32], shape: &[usize], order: Order) -> Result<Tensor, TensorError> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(TensorError::ReshapeMismatch {
                expected,
                got: data.len(),
                shape: shape.to_vec(),
            });
        }
        let array = match order {
            Order::C => Array::from_shape_vec(IxDyn(shape), data.to_vec()),
            Order::F => Array::from_shape_vec(IxDyn(shape).f(), data.to_vec()),
        }
        .map_err(|_| TensorError::IncompatibleShape)?;
        // 统一转为标准（行优先）内存布局，后续切片/取值无需再关心
        Ok(Tensor {
            data: array.as_standard_layout().into_owned(),
        })
    }

    /// 按指定顺序变形：先按`order`展平，再按`order`还原为新形状
    pub fn reshape_with_order(&self, order: Order, shape: &[usize]) -> Result<Tensor, TensorError> {
        let new_size: usize = shape.iter().product();
        if new_size != self.size() {
            return Err(TensorError::ReshapeMismatch {
                expected: self.size(),
                got: new_size,
                shape: shape.to_vec(),
            });
        }
        Tensor::from_flat(&self.flatten(order), shape, order)
    }
}
