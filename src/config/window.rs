use super::{ConfigError, ConfigResult};
use crate::impl_default;
use crate::platform::SizeHint;
use serde::{Deserialize, Serialize};

/// 窗口配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// 窗口标题
    pub title: String,

    /// 宽度（像素）
    pub width: u32,

    /// 高度（像素）
    pub height: u32,

    /// 尺寸约束
    #[serde(default)]
    pub size_hint: SizeHint,
}

impl_default!(WindowConfig {
    title: "webview".to_string(),
    width: 480,
    height: 320,
    size_hint: SizeHint::None,
});

impl WindowConfig {
    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::ValidationError(format!(
                "Invalid window size {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}
