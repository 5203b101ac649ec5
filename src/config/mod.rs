/// 统一配置系统
///
/// 提供TOML/JSON配置文件、环境变量覆盖和验证
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub mod window;

pub use crate::core::error::{ConfigError, ConfigResult};
pub use window::WindowConfig;

use crate::impl_default;

/// 宿主主配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebviewConfig {
    /// 启用开发者工具（引擎支持时）
    #[serde(default)]
    pub debug: bool,

    /// 窗口配置
    #[serde(default)]
    pub window: WindowConfig,

    /// 初始页面内容
    #[serde(default)]
    pub content: ContentConfig,

    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl WebviewConfig {
    /// 创建默认配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 从TOML文件加载配置
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::FileError)?;
        Self::from_toml_str(&content)
    }

    /// 从TOML字符串解析配置
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 从JSON文件加载配置
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::FileError)?;
        Self::from_json_str(&content)
    }

    /// 从JSON字符串解析配置
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 保存为TOML文件
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        fs::write(path, content).map_err(ConfigError::FileError)
    }

    /// 保存为JSON文件
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        fs::write(path, content).map_err(ConfigError::FileError)
    }

    /// 从环境变量覆盖配置
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("WEBVIEW_TITLE") {
            self.window.title = val;
        }
        if let Ok(val) = env::var("WEBVIEW_WIDTH") {
            if let Ok(width) = val.parse() {
                self.window.width = width;
            }
        }
        if let Ok(val) = env::var("WEBVIEW_HEIGHT") {
            if let Ok(height) = val.parse() {
                self.window.height = height;
            }
        }
        if let Ok(val) = env::var("WEBVIEW_DEBUG") {
            self.debug = val.parse().unwrap_or(self.debug);
        }
        if let Ok(val) = env::var("WEBVIEW_URL") {
            self.content.url = Some(val);
            self.content.html = None;
        }
    }

    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        self.window.validate()?;
        self.content.validate()?;
        Ok(())
    }

    /// 自动查找并加载配置文件
    ///
    /// 按以下顺序查找：
    /// 1. ./webview.toml
    /// 2. ./webview.json
    /// 3. <用户配置目录>/webview_bridge/config.toml
    /// 4. 使用默认配置
    pub fn load_or_default() -> Self {
        if let Ok(config) = Self::from_toml_file("webview.toml") {
            tracing::info!(target: "engine", "Loaded config from webview.toml");
            return config;
        }

        if let Ok(config) = Self::from_json_file("webview.json") {
            tracing::info!(target: "engine", "Loaded config from webview.json");
            return config;
        }

        let user_path = Self::user_config_path();
        if let Ok(config) = Self::from_toml_file(&user_path) {
            tracing::info!(target: "engine", "Loaded config from {:?}", user_path);
            return config;
        }

        tracing::info!(target: "engine", "Using default configuration");
        Self::default()
    }

    fn user_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("webview_bridge")
            .join("config.toml")
    }
}

/// 初始页面内容
///
/// `url` 与 `html` 至多设置一个；都为空时加载 `about:blank`。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
}

impl ContentConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.url.is_some() && self.html.is_some() {
            return Err(ConfigError::ValidationError(
                "content.url and content.html are mutually exclusive".to_string(),
            ));
        }
        Ok(())
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: LogLevel,
}

impl_default!(LoggingConfig {
    level: LogLevel::Info,
});

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// 跟踪
    Trace,
    /// 调试
    Debug,
    /// 信息
    Info,
    /// 警告
    Warn,
    /// 错误
    Error,
}

impl LogLevel {
    /// `EnvFilter` 可识别的过滤指令
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
