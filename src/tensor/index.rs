use super::Tensor;
use crate::errors::TensorError;

impl Tensor {
    /// 取单个元素，索引个数须等于张量阶数
    pub fn get(&self, indices: &[usize]) -> Result<f32, TensorError> {
        self.data
            .get(indices)
            .copied()
            .ok_or_else(|| TensorError::IndexOutOfRange {
                index: indices.to_vec(),
                shape: self.shape().to_vec(),
            })
    }

    /// 设置单个元素
    pub fn set(&mut self, indices: &[usize], value: f32) -> Result<(), TensorError> {
        let shape = self.shape().to_vec();
        match self.data.get_mut(indices) {
            Some(v) => {
                *v = value;
                Ok(())
            }
            None => Err(TensorError::IndexOutOfRange {
                index: indices.to_vec(),
                shape,
            }),
        }
    }

    /// 按行优先顺序取第`i`个元素
    pub fn get_flat(&self, i: usize) -> Option<f32> {
        self.data.iter().nth(i).copied()
    }
}
