/*
 * @Author       : 老董
 * @Date         : 2026-02-14
 * @LastEditors  : 老董
 * @LastEditTime : 2026-03-02
 * @Description  : 遗传训练器的错误类型
 */

use std::path::PathBuf;

use thiserror::Error;

use crate::nn::GraphError;

#[derive(Error, Debug)]
pub enum GaError {
    #[error("缓存中不存在键`{0}`")]
    MissingKey(String),
    #[error("未知的训练任务`{0}`")]
    UnknownTraining(String),
    #[error("种群为空：{0}")]
    EmptyPopulation(String),
    #[error("{0}")]
    InvalidArgument(String),
    #[error("基因组长度不匹配：期望{expected}，实际为{got}")]
    GenomeLength { expected: usize, got: usize },
    #[error("序列化失败：{0}")]
    Serialization(String),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error("读写文件`{path}`失败：{source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl GaError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<bincode::Error> for GaError {
    fn from(e: bincode::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
