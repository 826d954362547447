// ==========================================
// 生产计划排队系统 - 日志初始化
// ==========================================
// RUST_LOG: 级别过滤 (默认 info)
// PRODUCTION_PLANNING_LOG_FORMAT=json: 以 JSON 行输出 (供调度服务采集)
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// 日志格式环境变量
pub const LOG_FORMAT_ENV: &str = "PRODUCTION_PLANNING_LOG_FORMAT";

/// 初始化日志系统
///
/// # 示例
/// ```no_run
/// use production_planning::logging;
/// logging::init();
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var(LOG_FORMAT_ENV)
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// 测试用日志: debug 级别, 输出交给测试框架捕获
///
/// 可重复调用, 已初始化时忽略
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("production_planning=debug"))
        .with_test_writer()
        .try_init();
}
