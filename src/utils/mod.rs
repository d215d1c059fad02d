//! # 常用接口模块
//!
//! 本模块提供单元测试用的断言宏以及日志（tracing）初始化

pub mod trace;
