/*
 * @Author       : 老董
 * @Date         : 2026-01-27
 * @LastEditors  : 老董
 * @LastEditTime : 2026-03-02
 * @Description  : 计算图模块的错误类型。
 *                 配置错误（ConfigError）在构建/初始化时发现，致命且不可恢复；
 *                 运行期错误（GraphError）在调用处直接返回，不做任何重试。
 */

use std::path::PathBuf;

use thiserror::Error;

use crate::errors::TensorError;

/// 配置错误：图结构本身有问题，报告出错的顶点名
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("顶点图中存在环，顶点`{vertex}`位于环上")]
    CycleDetected { vertex: String },
    #[error("顶点`{vertex}`的输入`{input}`既不是网络输入也不是已声明的顶点")]
    UnknownInput { vertex: String, input: String },
    #[error("网络输出`{0}`不是已声明的顶点")]
    UnknownOutput(String),
    #[error("名称`{0}`重复")]
    DuplicateName(String),
    #[error("顶点`{vertex}`的输入个数不合法：期望{expected}，实际为{got}")]
    InvalidInputCount {
        vertex: String,
        expected: String,
        got: usize,
    },
    #[error("顶点`{vertex}`的输入类型不匹配：{message}")]
    InputTypeMismatch { vertex: String, message: String },
    #[error("顶点`{vertex}`的`{field}`未设置或为0")]
    MissingFeatureCount { vertex: String, field: String },
    #[error("网络没有声明任何输入")]
    NoInputs,
    #[error("网络没有声明任何输出")]
    NoOutputs,
    #[error("输入类型个数须与网络输入个数一致：期望{expected}，实际为{got}")]
    InputTypeCount { expected: usize, got: usize },
}

/// 计算图运行期错误
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("配置错误：{0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    InvalidState(String),
    #[error("{0}")]
    InvalidArgument(String),
    #[error("形状不匹配：期望{expected:?}，实际为{got:?}，{message}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
        message: String,
    },
    #[error("长度不匹配：期望{expected}，实际为{got}，{message}")]
    LengthMismatch {
        expected: usize,
        got: usize,
        message: String,
    },
    #[error(transparent)]
    Tensor(#[from] TensorError),
    #[error("读写文件`{path}`失败：{source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("序列化失败：{0}")]
    Serialization(String),
}

impl GraphError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
