use ndarray::{Axis, IxDyn, Slice, concatenate};

use super::Tensor;
use crate::errors::{Comparison, TensorError};

impl Tensor {
    /// 若为向量，`shape`可以是[n]、[1,n]、[n,1]；
    /// 若为矩阵，`shape`可以是[n,m]；
    /// 若为更高维度的数组，`shape`可以是[c,n,m,...]。
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// 张量的维（dim）数、阶（rank）数
    pub fn dimension(&self) -> usize {
        self.data.ndim()
    }

    /// 元素个数
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 判断两个张量的形状是否严格一致。如：形状为 [1, 4]，[1, 4]和[4]是不一致的，会返回false
    pub fn is_same_shape(&self, other: &Self) -> bool {
        self.shape() == other.shape()
    }

    /// 判断张量是否为标量
    pub fn is_scalar(&self) -> bool {
        self.shape().is_empty() || self.shape().iter().all(|x| *x == 1)
    }

    /// 转化为纯数（number）。若为标量，则返回Some(number)，否则返回None
    pub fn number(&self) -> Option<f32> {
        if self.is_scalar() {
            self.data.iter().next().copied()
        } else {
            None
        }
    }

    /// 按行优先顺序变形，元素个数不一致时panic
    pub fn reshape(&self, shape: &[usize]) -> Self {
        match self.try_reshape(shape) {
            Ok(t) => t,
            Err(e) => panic!("{}", e),
        }
    }

    pub fn try_reshape(&self, shape: &[usize]) -> Result<Self, TensorError> {
        let new_total: usize = shape.iter().product();
        if new_total != self.size() {
            return Err(TensorError::ReshapeMismatch {
                expected: self.size(),
                got: new_total,
                shape: shape.to_vec(),
            });
        }
        let data = self
            .data
            .as_standard_layout()
            .into_owned()
            .into_shape(IxDyn(shape))
            .map_err(|_| TensorError::IncompatibleShape)?;
        Ok(Self { data })
    }

    /// 2阶张量的转置；更高阶时反转所有轴
    pub fn transpose(&self) -> Self {
        Self {
            data: self.data.t().as_standard_layout().into_owned(),
        }
    }

    /// 沿第1维（特征/通道维）拼接，其余维度须一致
    pub fn concat_axis1(tensors: &[&Tensor]) -> Result<Tensor, TensorError> {
        if tensors.is_empty() {
            return Err(TensorError::EmptyList);
        }
        if tensors.iter().any(|t| t.dimension() < 2) {
            return Err(TensorError::ValueMustSatisfyComparison {
                value_name: "拼接张量的维数".to_string(),
                operator: Comparison::AtLeast,
                threshold: 2,
            });
        }
        let views = tensors.iter().map(|t| t.data.view()).collect::<Vec<_>>();
        let data = concatenate(Axis(1), &views).map_err(|_| TensorError::InconsitentShape)?;
        Ok(Tensor { data })
    }

    /// 沿第1维取`[start, end)`，返回拷贝
    pub fn slice_axis1(&self, start: usize, end: usize) -> Result<Tensor, TensorError> {
        let len = self.shape().get(1).copied().unwrap_or(0);
        if start > end || end > len {
            return Err(TensorError::SliceOutOfRange { start, end, len });
        }
        Ok(Tensor {
            data: self
                .data
                .slice_axis(Axis(1), Slice::from(start..end))
                .to_owned(),
        })
    }

    /// 把`src`写入本张量第1维的`[start, start + src.shape()[1])`区间
    pub fn assign_axis1(&mut self, start: usize, src: &Tensor) -> Result<(), TensorError> {
        let len = self.shape().get(1).copied().unwrap_or(0);
        let width = src.shape().get(1).copied().unwrap_or(0);
        let end = start + width;
        if end > len {
            return Err(TensorError::SliceOutOfRange { start, end, len });
        }
        let mut target = self.data.slice_axis_mut(Axis(1), Slice::from(start..end));
        if target.shape() != src.shape() {
            return Err(TensorError::InconsitentShape);
        }
        target.assign(&src.data);
        Ok(())
    }
}
