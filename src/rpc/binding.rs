//! 绑定表：暴露给脚本的函数名 → 宿主回调

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use super::bridge::Invocation;

/// 注册时提供、调用时原样交还的不透明上下文
pub type BindingContext = Option<Arc<dyn Any + Send + Sync>>;

/// 同步回调：参数 JSON 文本 → 结果 JSON 文本
pub type SyncCallback = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// 异步回调：拿到调用句柄后可在任意线程、任意时间结算
pub type AsyncCallback = Arc<dyn Fn(Invocation) + Send + Sync>;

/// 回调只有两种调用形态
#[derive(Clone)]
pub enum Callback {
    Sync(SyncCallback),
    Async(AsyncCallback),
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callback::Sync(_) => f.write_str("Callback::Sync"),
            Callback::Async(_) => f.write_str("Callback::Async"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Binding {
    pub name: String,
    pub callback: Callback,
    pub context: BindingContext,
}

impl Binding {
    pub fn new(name: impl Into<String>, callback: Callback, context: BindingContext) -> Self {
        Self {
            name: name.into(),
            callback,
            context,
        }
    }
}

/// 名字唯一的绑定表
///
/// 查找返回快照，调用回调时不持有锁，回调里可以继续 bind/unbind。
#[derive(Default)]
pub struct BindingTable {
    entries: RwLock<HashMap<String, Binding>>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入绑定；名字已存在时保留原绑定并返回 `false`
    pub fn insert(&self, binding: Binding) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.contains_key(&binding.name) {
            return false;
        }
        entries.insert(binding.name.clone(), binding);
        true
    }

    pub fn remove(&self, name: &str) -> Option<Binding> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }

    pub fn get(&self, name: &str) -> Option<Binding> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// 已绑定的名字，按字典序
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
