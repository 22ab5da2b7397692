//! 日志系统初始化
//!
//! 配置tracing日志框架。日志级别取自配置，`RUST_LOG` 环境变量优先。

use crate::config::LoggingConfig;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// 持有文件日志的后台写线程，丢弃时刷新剩余日志
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

/// 初始化日志系统
///
/// 重复调用是安全的：已经安装全局订阅者时保持原样。
pub fn init_logging(config: &LoggingConfig) -> LoggingGuard {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_filter()));

    let (file_layer, guard) = if config.log_to_file {
        let path = Path::new(&config.log_file_path);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let file_name = path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| "movie_bindings.log".into());
        let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
        (
            Some(fmt::layer().with_writer(writer).with_ansi(false)),
            Some(guard),
        )
    } else {
        (None, None)
    };

    let console_layer = config.log_to_console.then(fmt::layer);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();
    tracing::info!(target: "bindings", level = config.level.as_filter(), "logging initialised");

    LoggingGuard { _file: guard }
}
