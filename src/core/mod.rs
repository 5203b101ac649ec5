//! 核心模块
//!
//! 包含：
//! - `error` - 错误类型定义
//! - `macros` - 配置结构体使用的辅助宏
//! - `version` - 库版本信息
//! - [`init_logging`] - 日志系统初始化

pub mod error;
pub mod version;
#[macro_use]
pub mod macros;

// 重新导出错误类型
pub use error::{
    ConfigError, ConfigResult, EngineError, EngineResult, JsonError, JsonResult, ScriptError,
    ScriptResult, WebviewError, WebviewResult,
};
pub use version::{version, Version, VersionInfo};

use crate::config::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// 初始化日志系统
///
/// 配置 tracing 日志框架。`RUST_LOG` 环境变量优先于配置中的级别；
/// 重复调用时保留第一次安装的订阅者。
pub fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_filter()));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    tracing::debug!(target: "engine", version = %version(), "logging initialized");
}
