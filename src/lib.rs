//! # Grid Torch
//!
//! `grid_torch`项目用纯rust实现一个搭建在计算网格之上的神经网络训练框架，由两部分组成：
//! - 计算图引擎（[`nn`]）：顶点的拓扑调度、前向/反向传播、扁平参数与梯度缓冲区的视图管理、求解器；
//! - 分布式遗传训练器（[`genetic`]）：把基因组（编码后的参数向量）种群分布到各个节点上演化，
//!   节点之间只通过分区的键值缓存交换数据。
//!

pub mod errors;
pub mod genetic;
pub mod nn;
pub mod tensor;
pub mod utils;
