//! 日志初始化
//!
//! 日志写到标准错误，标准输出留给命令行工具的结果。

use crate::config::{LogFormat, LoggingConfig};
use anyhow::{Context, Result};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// 按配置构造过滤器，`RUST_LOG` 存在时优先
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level)
            .with_context(|| format!("Invalid log level: {}", config.level)),
    }
}

/// 安装全局日志订阅器，只能成功调用一次
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = build_filter(config)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.with_target)
        .with_writer(std::io::stderr);

    let installed = match config.format {
        LogFormat::Full => builder.try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
    installed.map_err(|e| anyhow::anyhow!("Failed to install log subscriber: {}", e))?;

    debug!("Logging initialized ({:?}, level {})", config.format, config.level);
    Ok(())
}
