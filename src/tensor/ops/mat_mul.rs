use ndarray::Ix2;

use crate::errors::{TensorError, TensorOp};
use crate::tensor::Tensor;

impl Tensor {
    /// 矩阵乘法。只接受2阶张量，且前一个张量的列数须等于后一个张量的行数，否则返回错误。
    pub fn mat_mul(&self, other: &Tensor) -> Result<Tensor, TensorError> {
        let mismatch = || TensorError::OperatorError {
            operator: TensorOp::MatMul,
            tensor1_shape: self.shape().to_vec(),
            tensor2_shape: other.shape().to_vec(),
        };
        if self.dimension() != 2 || other.dimension() != 2 || self.shape()[1] != other.shape()[0] {
            return Err(mismatch());
        }
        // 将动态维度数组转换为常量维度数组
        let a = self.data.view().into_dimensionality::<Ix2>().map_err(|_| mismatch())?;
        let b = other.data.view().into_dimensionality::<Ix2>().map_err(|_| mismatch())?;
        Ok(Tensor {
            data: a.dot(&b).into_dyn(),
        })
    }
}
