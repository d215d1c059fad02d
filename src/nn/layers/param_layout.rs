/*
 * @Author       : 老董
 * @Date         : 2026-03-02
 * @Description  : 层参数在扁平视图中的布局：每个参数变量占一段连续区间，并记录展平顺序。
 *                 层本身不持有参数，只按布局在图借给它的视图上读写
 */

use crate::nn::GraphError;
use crate::tensor::{Order, Tensor};

#[derive(Debug, Clone, PartialEq)]
pub struct ParamSlot {
    pub key: &'static str,
    pub shape: Vec<usize>,
    pub order: Order,
    /// 在本层视图中的起始位置
    pub offset: usize,
    pub len: usize,
    /// 是否计入 L1/L2（偏置不计）
    pub regularized: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamLayout {
    slots: Vec<ParamSlot>,
    total: usize,
}

impl ParamLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_slot(mut self, key: &'static str, shape: &[usize], order: Order, regularized: bool) -> Self {
        let len = shape.iter().product();
        self.slots.push(ParamSlot {
            key,
            shape: shape.to_vec(),
            order,
            offset: self.total,
            len,
            regularized,
        });
        self.total += len;
        self
    }

    pub fn slots(&self) -> &[ParamSlot] {
        &self.slots
    }

    pub fn slot(&self, key: &str) -> Result<&ParamSlot, GraphError> {
        self.slots
            .iter()
            .find(|s| s.key == key)
            .ok_or_else(|| GraphError::InvalidArgument(format!("参数键`{key}`不存在")))
    }

    pub const fn num_params(&self) -> usize {
        self.total
    }

    fn check_view(&self, len: usize) -> Result<(), GraphError> {
        if len == self.total {
            Ok(())
        } else {
            Err(GraphError::LengthMismatch {
                expected: self.total,
                got: len,
                message: "参数视图长度与层的参数个数不一致".to_string(),
            })
        }
    }

    /// 该变量在视图中的那一段
    pub fn view<'a>(&self, key: &str, view: &'a [f32]) -> Result<&'a [f32], GraphError> {
        self.check_view(view.len())?;
        let slot = self.slot(key)?;
        Ok(&view[slot.offset..slot.offset + slot.len])
    }

    /// 按记录的形状与顺序把视图中的一段还原为张量（拷贝）
    pub fn tensor(&self, key: &str, view: &[f32]) -> Result<Tensor, GraphError> {
        let slot = self.slot(key)?;
        let data = self.view(key, view)?;
        Ok(Tensor::from_flat(data, &slot.shape, slot.order)?)
    }

    /// 按记录的顺序把张量写回视图
    pub fn write(&self, key: &str, value: &Tensor, view: &mut [f32]) -> Result<(), GraphError> {
        self.check_view(view.len())?;
        let slot = self.slot(key)?;
        if value.shape() != slot.shape.as_slice() {
            return Err(GraphError::ShapeMismatch {
                expected: slot.shape.clone(),
                got: value.shape().to_vec(),
                message: format!("参数`{key}`的形状不符"),
            });
        }
        value.flatten_into(slot.order, &mut view[slot.offset..slot.offset + slot.len])?;
        Ok(())
    }

    /// Σ|w|，只统计参与正则化的变量
    pub fn sum_abs(&self, view: &[f32]) -> f32 {
        self.regularized(view).map(f32::abs).sum()
    }

    /// Σw²，只统计参与正则化的变量
    pub fn sum_squares(&self, view: &[f32]) -> f32 {
        self.regularized(view).map(|w| w * w).sum()
    }

    fn regularized<'a>(&'a self, view: &'a [f32]) -> impl Iterator<Item = f32> + 'a {
        self.slots
            .iter()
            .filter(|s| s.regularized)
            .flat_map(move |s| view.get(s.offset..s.offset + s.len).unwrap_or(&[]).iter().copied())
    }
}
