//! 宿主 ↔ 脚本 RPC
//!
//! - [`binding`]: 名字 → 宿主回调的绑定表
//! - [`bridge`]: 消息路由与结算
//! - `script`: 注入脚本侧的代码片段

pub mod binding;
pub mod bridge;
mod script;

pub use binding::{AsyncCallback, Binding, BindingContext, BindingTable, Callback, SyncCallback};
pub use bridge::{Bridge, Invocation, Status};
