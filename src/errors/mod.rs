/*
 * @Author       : 老董
 * @Date         : 2023-08-17 17:24:24
 * @LastEditors  : 老董
 * @LastEditTime : 2026-03-02
 * @Description  : 张量层面的错误类型
 */

use thiserror::Error;
mod ops;
pub use self::ops::*;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TensorError {
    // 数字比较用
    #[error("{value_name}须{operator}{threshold}")]
    ValueMustSatisfyComparison {
        value_name: String,
        operator: Comparison,
        threshold: usize,
    },
    // 张量二元运算
    #[error(
        "形状不一致，故无法{operator}：第一个张量的形状为{tensor1_shape:?}，第二个张量的形状为{tensor2_shape:?}"
    )]
    OperatorError {
        operator: TensorOp,
        tensor1_shape: Vec<usize>,
        tensor2_shape: Vec<usize>,
    },
    // 变形/展平
    #[error("元素个数不兼容，无法变形：期望{expected}个元素，实际为{got}个，目标形状为{shape:?}")]
    ReshapeMismatch {
        expected: usize,
        got: usize,
        shape: Vec<usize>,
    },
    #[error("索引{index:?}超出形状{shape:?}的范围")]
    IndexOutOfRange { index: Vec<usize>, shape: Vec<usize> },
    #[error("切片范围{start}..{end}超出维度长度{len}")]
    SliceOutOfRange { start: usize, end: usize, len: usize },
    #[error("未知的展平顺序标记'{0}'，只支持'c'或'f'")]
    UnknownOrder(char),

    #[error("张量列表为空")]
    EmptyList,
    #[error("张量形状不一致")]
    InconsitentShape,
    #[error("张量形状不兼容")]
    IncompatibleShape,
}
