//! 平台抽象层
//!
//! RPC 桥只通过 [`Engine`] 使用宿主的脚本环境。原生窗口、渲染表面和事件循环
//! 都由具体引擎实现负责。

pub mod headless;

pub use headless::HeadlessEngine;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 投递到 UI 线程执行的任务
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// 脚本侧消息的接收者，参数为原始 JSON 文本
pub type MessageHandler = Arc<dyn Fn(&str) + Send + Sync + 'static>;

/// 窗口尺寸约束
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeHint {
    /// 宽高是默认尺寸
    #[default]
    None,
    /// 宽高是最小尺寸
    Min,
    /// 宽高是最大尺寸
    Max,
    /// 用户不能调整尺寸
    Fixed,
}

// ============================================================================
// Engine Capability Surface
// ============================================================================

/// 可执行脚本的渲染表面
///
/// `dispatch` 是把工作转移到 UI 线程的唯一方式：它必须可以从任意线程并发调用，
/// 并保持同一线程提交任务的先后顺序。消息处理器在引擎选择的线程上被调用。
pub trait Engine: Send + Sync {
    /// 登记在每次页面加载时（及之前）注入的脚本
    fn init(&self, script: &str);
    /// 在当前脚本上下文中执行脚本
    fn eval(&self, script: &str);
    /// 在 UI 线程上运行 `task`
    fn dispatch(&self, task: Task);
    /// 设置脚本侧出站消息的接收者，替换之前的接收者
    fn set_message_handler(&self, handler: MessageHandler);

    fn navigate(&self, url: &str);
    fn set_html(&self, html: &str);
    fn set_title(&self, title: &str);
    fn set_size(&self, width: u32, height: u32, hint: SizeHint);

    /// 原生窗口句柄；没有原生窗口时返回 `None`
    fn window(&self) -> Option<raw_window_handle::RawWindowHandle>;
    /// 阻塞直到 [`Engine::terminate`] 被调用
    fn run(&self);
    fn terminate(&self);
}
