use tracing_subscriber::EnvFilter;

/// 初始化日志
///
/// `RUST_LOG` 优先；未设置时使用配置中的日志级别，`verbose` 会把默认级别提升到 debug。
pub fn init(log_level: &str, verbose: bool) {
    let default_level = if verbose { "debug" } else { log_level };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("sourcing_rs={}", default_level)));

    // 测试或嵌入场景下可能已经初始化过
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
