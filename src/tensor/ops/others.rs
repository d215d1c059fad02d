use ndarray::{Axis, Zip};

use crate::errors::{TensorError, TensorOp};
use crate::tensor::Tensor;

impl Tensor {
    /// 逐元素映射，返回新张量
    pub fn map<F: Fn(f32) -> f32>(&self, f: F) -> Tensor {
        Tensor {
            data: self.data.mapv(f),
        }
    }

    /// 两个同形张量逐元素组合
    pub fn zip_map<F: Fn(f32, f32) -> f32>(&self, other: &Tensor, f: F) -> Tensor {
        assert!(
            self.is_same_shape(other),
            "{}",
            TensorError::OperatorError {
                operator: TensorOp::Mul,
                tensor1_shape: self.shape().to_vec(),
                tensor2_shape: other.shape().to_vec(),
            }
        );
        let mut data = self.data.clone();
        Zip::from(&mut data).and(&other.data).for_each(|a, &b| *a = f(*a, b));
        Tensor { data }
    }

    /// 对所有元素求和
    pub fn sum(&self) -> f32 {
        self.data.sum()
    }

    /// 沿第0维（batch维）求和，结果保持2阶：`[1, n]`
    pub fn sum_rows(&self) -> Tensor {
        let summed = self.data.sum_axis(Axis(0));
        let n = summed.len();
        Tensor::new(&summed.into_raw_vec(), &[1, n])
    }

    /// 把`[1, n]`的行向量加到`[b, n]`的每一行（偏置广播）
    pub fn add_row_broadcast(&self, row: &Tensor) -> Result<Tensor, TensorError> {
        let ok = self.dimension() == 2
            && row.size() == self.shape()[1]
            && (row.dimension() == 1 || row.shape()[0] == 1);
        if !ok {
            return Err(TensorError::OperatorError {
                operator: TensorOp::Add,
                tensor1_shape: self.shape().to_vec(),
                tensor2_shape: row.shape().to_vec(),
            });
        }
        let row = row.reshape(&[row.size()]);
        Ok(Tensor {
            data: &self.data + &row.data,
        })
    }

    /// 按行做 softmax（输入为`[batch, n]`），减去行最大值保证数值稳定
    pub fn softmax_rows(&self) -> Tensor {
        let mut data = self.data.clone();
        for mut row in data.rows_mut() {
            let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            row.mapv_inplace(|v| (v - max).exp());
            let sum = row.sum();
            row.mapv_inplace(|v| v / sum);
        }
        Tensor { data }
    }

    /// L2范数
    pub fn norm2(&self) -> f32 {
        self.data.iter().map(|v| v * v).sum::<f32>().sqrt()
    }

    /// 行优先顺序的拷贝
    pub fn to_vec(&self) -> Vec<f32> {
        self.data.iter().copied().collect()
    }

    /// 若内存为标准布局则返回连续切片
    pub fn as_slice(&self) -> Option<&[f32]> {
        self.data.as_slice()
    }

    pub fn as_slice_mut(&mut self) -> Option<&mut [f32]> {
        self.data.as_slice_mut()
    }
}
