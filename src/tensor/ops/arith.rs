/*
 * @Author       : 老董
 * @Date         : 2023-08-17 17:24:24
 * @LastEditors  : 老董
 * @LastEditTime : 2026-03-02
 * @Description  : 张量的逐元素加、减、乘（及其自赋值版本），以及与纯数的运算。
 *                 两个张量参与运算时形状须严格一致（偏置的行广播见`add_row_broadcast`），否则panic。
 */

use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use crate::errors::{TensorError, TensorOp};
use crate::tensor::Tensor;

fn assert_same_shape(a: &Tensor, b: &Tensor, operator: TensorOp) {
    assert!(
        a.is_same_shape(b),
        "{}",
        TensorError::OperatorError {
            operator,
            tensor1_shape: a.shape().to_vec(),
            tensor2_shape: b.shape().to_vec(),
        }
    );
}

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $operator:expr, $op:tt) => {
        /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓（不）带引用的张量 与 （不）带引用的张量↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
        impl<'b> $trait<&'b Tensor> for &Tensor {
            type Output = Tensor;
            fn $method(self, other: &'b Tensor) -> Tensor {
                assert_same_shape(self, other, $operator);
                Tensor {
                    data: &self.data $op &other.data,
                }
            }
        }
        impl $trait<Tensor> for Tensor {
            type Output = Tensor;
            fn $method(self, other: Tensor) -> Tensor {
                &self $op &other
            }
        }
        impl<'b> $trait<&'b Tensor> for Tensor {
            type Output = Tensor;
            fn $method(self, other: &'b Tensor) -> Tensor {
                &self $op other
            }
        }
        impl $trait<Tensor> for &Tensor {
            type Output = Tensor;
            fn $method(self, other: Tensor) -> Tensor {
                self $op &other
            }
        }
        /*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑（不）带引用的张量 与 （不）带引用的张量↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

        /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓（不）带引用的张量 与 f32↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
        impl $trait<f32> for &Tensor {
            type Output = Tensor;
            fn $method(self, scalar: f32) -> Tensor {
                Tensor {
                    data: &self.data $op scalar,
                }
            }
        }
        impl $trait<f32> for Tensor {
            type Output = Tensor;
            fn $method(self, scalar: f32) -> Tensor {
                &self $op scalar
            }
        }
        /*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑（不）带引用的张量 与 f32↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/
    };
}

impl_binary_op!(Add, add, TensorOp::Add, +);
impl_binary_op!(Sub, sub, TensorOp::Sub, -);
impl_binary_op!(Mul, mul, TensorOp::Mul, *);

impl Mul<&Tensor> for f32 {
    type Output = Tensor;
    fn mul(self, tensor: &Tensor) -> Tensor {
        tensor * self
    }
}

impl Mul<Tensor> for f32 {
    type Output = Tensor;
    fn mul(self, tensor: Tensor) -> Tensor {
        &tensor * self
    }
}

macro_rules! impl_assign_op {
    ($trait:ident, $method:ident, $operator:expr, $op:tt) => {
        impl<'b> $trait<&'b Tensor> for Tensor {
            fn $method(&mut self, other: &'b Tensor) {
                assert_same_shape(self, other, $operator);
                self.data $op &other.data;
            }
        }
        impl $trait<Tensor> for Tensor {
            fn $method(&mut self, other: Tensor) {
                *self $op &other;
            }
        }
        impl $trait<f32> for Tensor {
            fn $method(&mut self, scalar: f32) {
                self.data $op scalar;
            }
        }
    };
}

impl_assign_op!(AddAssign, add_assign, TensorOp::AddAssign, +=);
impl_assign_op!(SubAssign, sub_assign, TensorOp::SubAssign, -=);
impl_assign_op!(MulAssign, mul_assign, TensorOp::MulAssign, *=);

impl Neg for &Tensor {
    type Output = Tensor;
    fn neg(self) -> Tensor {
        Tensor {
            data: self.data.mapv(|v| -v),
        }
    }
}

impl Neg for Tensor {
    type Output = Tensor;
    fn neg(self) -> Tensor {
        -&self
    }
}
