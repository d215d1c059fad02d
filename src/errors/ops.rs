use std::fmt::{self, Display};

/// 会因形状不一致而失败的张量运算
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorOp {
    Add,
    AddAssign,
    Sub,
    SubAssign,
    Mul,
    MulAssign,
    MatMul,
}

impl Display for TensorOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Add | Self::AddAssign => "相加",
            Self::Sub | Self::SubAssign => "相减",
            Self::Mul | Self::MulAssign => "逐元素相乘",
            Self::MatMul => "矩阵相乘",
        })
    }
}

/// 数值约束里的比较关系
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    AtLeast,
    AtMost,
}

impl Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AtLeast => "≥",
            Self::AtMost => "≤",
        })
    }
}
