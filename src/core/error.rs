//! 统一错误处理模块
//!
//! 提供整个 crate 的错误类型定义
//!
//! ## 错误类型分层
//!
//! - **JSON 层** (`JsonError`): 字符串字面量解码失败。扫描器本身从不报错，只返回 `None`
//! - **脚本层** (`ScriptError`): 脚本求值失败、UI 线程已退出等
//! - **引擎层** (`EngineError`): 引擎初始化与脚本错误
//! - **配置层** (`ConfigError`): 配置文件读取、解析与验证
//!
//! `WebviewError` 可以同时承载以上所有错误。

use thiserror::Error;

/// 顶层错误类型
#[derive(Error, Debug)]
pub enum WebviewError {
    #[error("Initialization error: {0}")]
    Init(String),

    #[error("JSON error: {0}")]
    Json(#[from] JsonError),

    #[error("Script error: {0}")]
    Script(#[from] ScriptError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// JSON 字符串字面量解码错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JsonError {
    #[error("string literal must start and end with '\"'")]
    Unquoted,

    #[error("unsupported escape '\\{escape}' at offset {offset}")]
    UnsupportedEscape { escape: char, offset: usize },

    #[error("string literal ends inside an escape sequence")]
    DanglingEscape,

    #[error("decoded string is not valid UTF-8")]
    InvalidUtf8,
}

/// 脚本系统错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    #[error("Script evaluation error: {0}")]
    Evaluation(String),

    #[error("Script thread has terminated")]
    Terminated,

    #[error("Blocking script call issued from the UI thread")]
    WouldBlock,
}

/// 引擎错误
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Engine initialization failed: {0}")]
    Init(String),

    #[error("Script error: {0}")]
    Script(#[from] ScriptError),
}

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 文件读取错误
    #[error("Config file error: {0}")]
    FileError(#[from] std::io::Error),
    /// 解析错误
    #[error("Config parse error: {0}")]
    ParseError(String),
    /// 验证错误
    #[error("Config validation error: {0}")]
    ValidationError(String),
}

/// 结果类型别名
pub type WebviewResult<T> = Result<T, WebviewError>;
pub type JsonResult<T> = Result<T, JsonError>;
pub type ScriptResult<T> = Result<T, ScriptError>;
pub type EngineResult<T> = Result<T, EngineError>;
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let json_err = JsonError::UnsupportedEscape {
            escape: 'u',
            offset: 3,
        };
        let err: WebviewError = json_err.into();
        assert!(matches!(err, WebviewError::Json(_)));

        let engine_err: EngineError = ScriptError::Terminated.into();
        assert!(matches!(engine_err, EngineError::Script(ScriptError::Terminated)));
    }

    #[test]
    fn test_error_display() {
        let err = JsonError::UnsupportedEscape {
            escape: 'u',
            offset: 5,
        };
        assert_eq!(err.to_string(), "unsupported escape '\\u' at offset 5");
        assert_eq!(
            ScriptError::Terminated.to_string(),
            "Script thread has terminated"
        );
    }
}
