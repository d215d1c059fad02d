/*
 * @Author       : 老董
 * @Date         : 2026-03-02
 * @Description  : 日志初始化。库内部只用 tracing 宏打点，是否输出、输出到哪由使用方决定；
 *                 这里给测试与示例提供一个开箱即用的 fmt 订阅器（过滤级别读 RUST_LOG，默认 info）。
 */

use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INITIALISED: OnceLock<bool> = OnceLock::new();

/// 安装全局 tracing 订阅器，可重复调用（只有第一次生效）。
/// 返回本进程是否由本函数成功安装了订阅器。
pub fn init_tracing() -> bool {
    *INITIALISED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let fmt_layer = fmt::layer().with_target(true);
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
            .is_ok()
    })
}
