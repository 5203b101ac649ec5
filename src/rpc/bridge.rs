//! 宿主 ↔ 脚本 RPC 桥
//!
//! ```text
//! host: bind("add", f) ──► BindingTable + init/eval(stub)
//! script: add(2, 3) ──► {"id":1,"method":"add","params":[2,3]} ──► on_message
//! on_message ──► f(...) ──► resolve(seq, status, result) ──► dispatch(eval(settle))
//! ```
//!
//! 每个 `Bridge` 拥有自己的绑定表，多个实例之间不共享状态。没有超时也没有取消：
//! 永远得不到 `resolve` 的调用在脚本侧一直挂起。

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use super::binding::{Binding, BindingContext, BindingTable, Callback};
use super::script;
use crate::json;
use crate::platform::Engine;

/// 调用的结算方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// 兑现 Promise
    Success,
    /// 拒绝 Promise
    Failure,
}

impl Status {
    /// 0 表示成功，其他值都表示失败
    pub fn from_code(code: i32) -> Self {
        if code == 0 {
            Status::Success
        } else {
            Status::Failure
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Status::Success => 0,
            Status::Failure => 1,
        }
    }
}

struct Inner {
    engine: Arc<dyn Engine>,
    bindings: BindingTable,
    // 串行化"改表 + 注入脚本"，保证注入顺序与表状态一致
    registration: Mutex<()>,
}

/// RPC 桥
///
/// 句柄可以克隆并跨线程使用。创建时把自己注册为引擎的消息处理器（弱引用），
/// 同一引擎上后创建的桥会取代先前的桥。
#[derive(Clone)]
pub struct Bridge {
    inner: Arc<Inner>,
}

impl Bridge {
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        let inner = Arc::new(Inner {
            engine,
            bindings: BindingTable::new(),
            registration: Mutex::new(()),
        });
        let weak: Weak<Inner> = Arc::downgrade(&inner);
        inner
            .engine
            .set_message_handler(Arc::new(move |message: &str| {
                if let Some(inner) = weak.upgrade() {
                    Bridge { inner }.on_message(message);
                }
            }));
        Self { inner }
    }

    pub fn engine(&self) -> &Arc<dyn Engine> {
        &self.inner.engine
    }

    /// 绑定同步函数，返回值立即作为成功结果结算
    pub fn bind_sync<F>(&self, name: &str, f: F) -> bool
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.bind_callback(name, Callback::Sync(Arc::new(f)), None)
    }

    /// 绑定异步函数，由回调持有的 [`Invocation`] 决定何时结算
    pub fn bind<F>(&self, name: &str, f: F, context: BindingContext) -> bool
    where
        F: Fn(Invocation) + Send + Sync + 'static,
    {
        self.bind_callback(name, Callback::Async(Arc::new(f)), context)
    }

    /// 注册绑定并向脚本侧注入桩函数
    ///
    /// 名字已绑定时什么也不做，保留原注册并返回 `false`。
    pub fn bind_callback(&self, name: &str, callback: Callback, context: BindingContext) -> bool {
        let _guard = self
            .inner
            .registration
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !self
            .inner
            .bindings
            .insert(Binding::new(name, callback, context))
        {
            tracing::debug!(target: "rpc", name, "already bound, keeping original binding");
            return false;
        }
        let js = script::bind_stub(name);
        self.inner.engine.init(&js);
        self.inner.engine.eval(&js);
        tracing::debug!(target: "rpc", name, "bound");
        true
    }

    /// 删除绑定和 `window[name]`
    ///
    /// 已经发出的调用保持挂起，不会被拒绝。名字未绑定时返回 `false`。
    pub fn unbind(&self, name: &str) -> bool {
        let _guard = self
            .inner
            .registration
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !self.inner.bindings.contains(name) {
            return false;
        }
        let js = script::unbind(name);
        self.inner.engine.init(&js);
        self.inner.engine.eval(&js);
        self.inner.bindings.remove(name);
        tracing::debug!(target: "rpc", name, "unbound");
        true
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.inner.bindings.contains(name)
    }

    pub fn bound_names(&self) -> Vec<String> {
        self.inner.bindings.names()
    }

    /// 处理脚本侧发来的一条消息
    ///
    /// 无法路由的消息（没有 `method`、方法未绑定、没有 `id`）被静默丢弃。
    /// 回调在调用本方法的线程上同步执行。
    pub fn on_message(&self, message: &str) {
        let method = match json::field(message, "method") {
            Ok(Some(method)) => method,
            Ok(None) => {
                tracing::debug!(target: "rpc", "message without method dropped");
                return;
            }
            Err(e) => {
                tracing::debug!(target: "rpc", error = %e, "undecodable method, message dropped");
                return;
            }
        };

        let Some(binding) = self.inner.bindings.get(&method) else {
            tracing::debug!(target: "rpc", method = %method, "no binding, message dropped");
            return;
        };

        let seq = match json::field(message, "id") {
            Ok(Some(seq)) => seq.into_owned(),
            Ok(None) | Err(_) => {
                tracing::warn!(target: "rpc", method = %method, "message without usable id dropped");
                return;
            }
        };

        let params = match json::field(message, "params") {
            Ok(Some(params)) => params.into_owned(),
            Ok(None) => "[]".to_string(),
            Err(e) => {
                tracing::warn!(target: "rpc", method = %method, error = %e, "undecodable params, message dropped");
                return;
            }
        };

        tracing::trace!(target: "rpc", method = %method, seq = %seq, "dispatching call");
        match binding.callback {
            Callback::Sync(f) => {
                let result = f(&params);
                self.resolve(&seq, Status::Success, &result);
            }
            Callback::Async(f) => f(Invocation {
                seq,
                params,
                context: binding.context,
                bridge: self.clone(),
            }),
        }
    }

    /// 结算脚本侧序号为 `seq` 的 Promise
    ///
    /// 可以从任意线程调用；结算脚本经 `dispatch` 在 UI 线程执行。序号未知或已结算时
    /// 脚本侧什么也不做，宿主侧状态不变。
    pub fn resolve(&self, seq: &str, status: Status, result: &str) {
        tracing::trace!(target: "rpc", seq, ?status, "resolving call");
        let js = script::settle(seq, status, result);
        let engine = Arc::clone(&self.inner.engine);
        self.inner
            .engine
            .dispatch(Box::new(move || engine.eval(&js)));
    }
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("bindings", &self.bound_names())
            .finish()
    }
}

/// 一次待结算的脚本调用
///
/// 可以移动到其他线程，稍后再结算；不结算时脚本侧 Promise 一直挂起。
pub struct Invocation {
    seq: String,
    params: String,
    context: BindingContext,
    bridge: Bridge,
}

impl Invocation {
    /// 脚本侧生成的序号，宿主不解释其内容
    pub fn seq(&self) -> &str {
        &self.seq
    }

    /// 参数数组的原始 JSON 文本
    pub fn params(&self) -> &str {
        &self.params
    }

    /// 按类型取出注册时的上下文
    pub fn context<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.context.as_deref().and_then(|ctx| ctx.downcast_ref::<T>())
    }

    pub fn raw_context(&self) -> &BindingContext {
        &self.context
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    pub fn resolve(self, status: Status, result: &str) {
        self.bridge.resolve(&self.seq, status, result);
    }

    pub fn succeed(self, result: &str) {
        self.resolve(Status::Success, result);
    }

    pub fn fail(self, result: &str) {
        self.resolve(Status::Failure, result);
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("seq", &self.seq)
            .field("params", &self.params)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{MessageHandler, SizeHint, Task};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 记录注入的脚本，dispatch 的任务就地执行
    #[derive(Default)]
    struct RecordingEngine {
        inits: Mutex<Vec<String>>,
        evals: Mutex<Vec<String>>,
        handler: Mutex<Option<MessageHandler>>,
    }

    impl RecordingEngine {
        fn deliver(&self, message: &str) {
            let handler = self.handler.lock().unwrap().clone();
            if let Some(handler) = handler {
                handler(message);
            }
        }

        fn evals(&self) -> Vec<String> {
            self.evals.lock().unwrap().clone()
        }

        fn inits(&self) -> Vec<String> {
            self.inits.lock().unwrap().clone()
        }
    }

    impl Engine for RecordingEngine {
        fn init(&self, script: &str) {
            self.inits.lock().unwrap().push(script.to_string());
        }
        fn eval(&self, script: &str) {
            self.evals.lock().unwrap().push(script.to_string());
        }
        fn dispatch(&self, task: Task) {
            task();
        }
        fn set_message_handler(&self, handler: MessageHandler) {
            *self.handler.lock().unwrap() = Some(handler);
        }
        fn navigate(&self, _url: &str) {}
        fn set_html(&self, _html: &str) {}
        fn set_title(&self, _title: &str) {}
        fn set_size(&self, _width: u32, _height: u32, _hint: SizeHint) {}
        fn window(&self) -> Option<raw_window_handle::RawWindowHandle> {
            None
        }
        fn run(&self) {}
        fn terminate(&self) {}
    }

    fn setup() -> (Arc<RecordingEngine>, Bridge) {
        let engine = Arc::new(RecordingEngine::default());
        let bridge = Bridge::new(engine.clone());
        (engine, bridge)
    }

    #[test]
    fn test_bind_injects_stub() {
        let (engine, bridge) = setup();
        assert!(bridge.bind_sync("add", |_| "0".to_string()));
        assert!(bridge.is_bound("add"));
        assert_eq!(engine.inits().len(), 1);
        assert_eq!(engine.evals(), engine.inits());
        assert!(engine.inits()[0].contains(r#"var name = "add";"#));
    }

    #[test]
    fn test_rebind_keeps_first_callback() {
        let (engine, bridge) = setup();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        {
            let first = Arc::clone(&first);
            assert!(bridge.bind_sync("x", move |_| {
                first.fetch_add(1, Ordering::SeqCst);
                "null".to_string()
            }));
        }
        {
            let second = Arc::clone(&second);
            assert!(!bridge.bind_sync("x", move |_| {
                second.fetch_add(1, Ordering::SeqCst);
                "null".to_string()
            }));
        }
        // 第二次 bind 不注入任何脚本
        assert_eq!(engine.inits().len(), 1);

        engine.deliver(r#"{"id":1,"method":"x","params":[]}"#);
        engine.deliver(r#"{"id":2,"method":"x","params":[]}"#);
        assert_eq!(first.load(Ordering::SeqCst), 2);
        assert_eq!(second.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unbind_deletes_window_member() {
        let (engine, bridge) = setup();
        bridge.bind_sync("add", |_| "0".to_string());
        assert!(bridge.unbind("add"));
        assert!(!bridge.is_bound("add"));
        assert_eq!(engine.evals().last().unwrap(), r#"delete window["add"];"#);
        assert_eq!(engine.inits().last().unwrap(), r#"delete window["add"];"#);

        // 未绑定的名字
        assert!(!bridge.unbind("add"));
        assert_eq!(engine.evals().len(), 2);
    }

    #[test]
    fn test_sync_binding_resolves_with_result() {
        let (engine, bridge) = setup();
        bridge.bind_sync("add", |params| {
            assert_eq!(params, "[2,3]");
            "5".to_string()
        });
        engine.deliver(r#"{"id":"1","method":"add","params":[2,3]}"#);
        let settle = engine.evals().last().unwrap().clone();
        assert_eq!(settle, script::settle("1", Status::Success, "5"));
    }

    #[test]
    fn test_async_binding_receives_invocation() {
        let (engine, bridge) = setup();
        let (tx, rx) = crossbeam_channel::unbounded::<Invocation>();
        bridge.bind(
            "later",
            move |call| {
                let _ = tx.send(call);
            },
            Some(Arc::new("ctx".to_string())),
        );
        engine.deliver(r#"{"id":7,"method":"later","params":["a\"b"]}"#);

        let call = rx.try_recv().unwrap();
        assert_eq!(call.seq(), "7");
        assert_eq!(call.params(), r#"["a\"b"]"#);
        assert_eq!(call.context::<String>().map(String::as_str), Some("ctx"));
        assert!(call.context::<u32>().is_none());

        let before = engine.evals().len();
        // 在另一个线程上结算
        std::thread::spawn(move || call.fail(r#""nope""#))
            .join()
            .unwrap();
        assert_eq!(engine.evals().len(), before + 1);
        assert!(engine.evals().last().unwrap().contains(r#"call.reject("nope");"#));
    }

    #[test]
    fn test_unroutable_messages_are_dropped() {
        let (engine, bridge) = setup();
        let calls = Arc::new(AtomicUsize::new(0));
        {
            let calls = Arc::clone(&calls);
            bridge.bind_sync("known", move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                "null".to_string()
            });
        }
        let baseline = engine.evals().len();
        engine.deliver(r#"{"id":1,"method":"unknown","params":[]}"#);
        engine.deliver(r#"{"id":1,"params":[]}"#);
        engine.deliver(r#"{"method":"known","params":[]}"#);
        engine.deliver("not json at all");
        engine.deliver(r#"{"id":1,"method":{"method":"known"}}"#);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(engine.evals().len(), baseline);
    }

    #[test]
    fn test_missing_params_become_empty_array() {
        let (engine, bridge) = setup();
        let (tx, rx) = crossbeam_channel::unbounded::<String>();
        bridge.bind_sync("noargs", move |params| {
            let _ = tx.send(params.to_string());
            "null".to_string()
        });
        engine.deliver(r#"{"id":3,"method":"noargs"}"#);
        assert_eq!(rx.try_recv().unwrap(), "[]");
    }

    #[test]
    fn test_resolve_unknown_seq_leaves_host_state_alone() {
        let (engine, bridge) = setup();
        bridge.bind_sync("add", |_| "0".to_string());
        let names = bridge.bound_names();
        bridge.resolve("999", Status::Success, "0");
        assert_eq!(bridge.bound_names(), names);
        assert!(engine.evals().last().unwrap().contains(r#"seq = "999""#));
    }

    #[test]
    fn test_callback_may_rebind() {
        let (engine, bridge) = setup();
        let inner = bridge.clone();
        bridge.bind_sync("once", move |_| {
            inner.unbind("once");
            "1".to_string()
        });
        engine.deliver(r#"{"id":1,"method":"once","params":[]}"#);
        assert!(!bridge.is_bound("once"));
    }

    #[test]
    fn test_unbind_racing_with_messages() {
        let (engine, bridge) = setup();
        let bound_generation = Arc::new(AtomicUsize::new(0));
        let calls = Arc::new(AtomicUsize::new(0));
        const ROUNDS: usize = 200;
        const MESSAGES: usize = 2000;

        let binder = {
            let bridge = bridge.clone();
            let bound_generation = Arc::clone(&bound_generation);
            let calls = Arc::clone(&calls);
            std::thread::spawn(move || {
                for generation in 1..=ROUNDS {
                    bound_generation.store(generation, Ordering::SeqCst);
                    let seen = Arc::clone(&bound_generation);
                    let calls = Arc::clone(&calls);
                    assert!(bridge.bind_sync("flip", move |_| {
                        // 快照最多落后于最新一次注册，绝不会超前
                        assert!(generation <= seen.load(Ordering::SeqCst));
                        calls.fetch_add(1, Ordering::SeqCst);
                        "null".to_string()
                    }));
                    assert!(bridge.unbind("flip"));
                }
            })
        };

        let sender = {
            let engine = Arc::clone(&engine);
            std::thread::spawn(move || {
                for id in 0..MESSAGES {
                    engine.deliver(&format!(r#"{{"id":{},"method":"flip","params":[]}}"#, id));
                }
            })
        };

        binder.join().unwrap();
        sender.join().unwrap();
        assert!(calls.load(Ordering::SeqCst) <= MESSAGES);
        assert!(!bridge.is_bound("flip"));

        let after = calls.load(Ordering::SeqCst);
        engine.deliver(r#"{"id":"last","method":"flip","params":[]}"#);
        assert_eq!(calls.load(Ordering::SeqCst), after);
    }

    #[test]
    fn test_bridges_do_not_share_state() {
        let a = Bridge::new(Arc::new(RecordingEngine::default()));
        let b = Bridge::new(Arc::new(RecordingEngine::default()));
        a.bind_sync("only_a", |_| "0".to_string());
        assert!(a.is_bound("only_a"));
        assert!(!b.is_bound("only_a"));
    }

    #[test]
    fn test_dropped_bridge_ignores_messages() {
        let engine = Arc::new(RecordingEngine::default());
        {
            let bridge = Bridge::new(engine.clone());
            bridge.bind_sync("add", |_| "0".to_string());
        }
        let before = engine.evals().len();
        engine.deliver(r#"{"id":1,"method":"add","params":[]}"#);
        assert_eq!(engine.evals().len(), before);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(Status::from_code(0), Status::Success);
        assert_eq!(Status::from_code(1), Status::Failure);
        assert_eq!(Status::from_code(-1), Status::Failure);
        assert_eq!(Status::Failure.code(), 1);
    }
}
