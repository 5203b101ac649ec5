//! 无窗口脚本引擎
//!
//! 用 QuickJS 实现 [`Engine`]：一个专用 UI 线程持有脚本运行时，其他线程发起的操作
//! 都作为消息进入同一个 FIFO 队列，由该线程逐条执行。页面的全局对象同时充当 `window`，
//! `window.external.invoke(text)` 是脚本到宿主的出站通道。
//!
//! 在 UI 线程上调用的 `init`/`eval` 直接生效，不经过队列。脚本执行期间（例如消息
//! 处理器里）发起的 `eval` 在外层脚本返回后立即执行，早于队列中的下一条消息。

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread::{self, ThreadId};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use rquickjs::{Context, Ctx, Function, Object, Runtime};

use super::{Engine, MessageHandler, SizeHint, Task};
use crate::core::error::{EngineError, EngineResult, ScriptError, ScriptResult};

/// 每次页面加载时在初始化脚本之前执行的前导脚本
const PRELUDE: &str = r#"
(function () {
  var sink = globalThis.__webview_log;
  delete globalThis.__webview_log;
  var render = function (value) {
    if (typeof value === 'string') return value;
    try { return JSON.stringify(value); } catch (e) { return String(value); }
  };
  var console = {};
  ['log', 'info', 'warn', 'error', 'debug'].forEach(function (level) {
    console[level] = function () {
      sink(level, Array.prototype.map.call(arguments, render).join(' '));
    };
  });
  globalThis.console = console;
})();
"#;

/// UI 线程队列中的消息
enum UiMessage {
    Init(String),
    Eval(String),
    Task(Task),
    Load(Page),
    Evaluate {
        script: String,
        reply: Sender<ScriptResult<Option<String>>>,
    },
    Barrier(Sender<()>),
    Terminate,
}

enum Page {
    Url(String),
    /// `set_html` 载入的文档，内容保存在 `Chrome` 中
    Document,
}

/// 窗口外观状态
#[derive(Debug, Clone)]
struct Chrome {
    title: String,
    size: (u32, u32, SizeHint),
    location: String,
    html: Option<String>,
}

struct Shared {
    tx: Sender<UiMessage>,
    done: Receiver<()>,
    ui_thread: ThreadId,
    debug: bool,
    handler: Arc<RwLock<Option<MessageHandler>>>,
    chrome: Arc<Mutex<Chrome>>,
}

/// 基于 QuickJS 的无窗口引擎
///
/// 句柄可以廉价克隆并在线程间共享；最后一个句柄释放或调用 `terminate` 后 UI 线程退出。
#[derive(Clone)]
pub struct HeadlessEngine {
    shared: Arc<Shared>,
}

impl HeadlessEngine {
    /// 启动 UI 线程并创建初始的空白页面
    pub fn spawn(debug: bool) -> EngineResult<Self> {
        let (tx, rx) = unbounded::<UiMessage>();
        let (done_tx, done_rx) = bounded::<()>(0);
        let (ready_tx, ready_rx) = bounded::<Result<(), String>>(1);
        let handler: Arc<RwLock<Option<MessageHandler>>> = Arc::new(RwLock::new(None));
        let chrome = Arc::new(Mutex::new(Chrome {
            title: String::new(),
            size: (0, 0, SizeHint::None),
            location: "about:blank".to_string(),
            html: None,
        }));

        let thread_handler = Arc::clone(&handler);
        let join = thread::Builder::new()
            .name("webview-ui".to_string())
            .spawn(move || {
                // 线程退出时释放 done_tx，唤醒所有 run() 调用者
                let _done = done_tx;
                let mut host = match ScriptHost::new(thread_handler, debug) {
                    Ok(host) => {
                        let _ = ready_tx.send(Ok(()));
                        host
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                host.run_loop(rx);
                tracing::debug!(target: "engine", "UI thread exiting");
            })
            .map_err(|e| EngineError::Init(format!("Failed to spawn UI thread: {}", e)))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(EngineError::Init(e)),
            Err(_) => return Err(EngineError::Init("UI thread exited during startup".into())),
        }
        let devtools = debug;
        tracing::info!(target: "engine", devtools, "headless engine started");

        Ok(Self {
            shared: Arc::new(Shared {
                tx,
                done: done_rx,
                ui_thread: join.thread().id(),
                debug,
                handler,
                chrome,
            }),
        })
    }

    /// 当前线程是否为 UI 线程
    pub fn is_ui_thread(&self) -> bool {
        thread::current().id() == self.shared.ui_thread
    }

    /// 求值表达式并返回其 `JSON.stringify` 结果
    ///
    /// 结果为 `undefined` 时返回 `None`。阻塞直到 UI 线程执行完之前排队的所有工作。
    pub fn evaluate(&self, expression: &str) -> ScriptResult<Option<String>> {
        if self.is_ui_thread() {
            return Err(ScriptError::WouldBlock);
        }
        let (reply, rx) = bounded(1);
        self.post(UiMessage::Evaluate {
            script: expression.to_string(),
            reply,
        });
        rx.recv().map_err(|_| ScriptError::Terminated)?
    }

    /// 等待之前排队的所有工作（包括由此产生的 Promise 任务）执行完毕
    pub fn flush(&self) -> ScriptResult<()> {
        if self.is_ui_thread() {
            return Err(ScriptError::WouldBlock);
        }
        let (ack, rx) = bounded(1);
        self.post(UiMessage::Barrier(ack));
        rx.recv().map_err(|_| ScriptError::Terminated)
    }

    pub fn title(&self) -> String {
        self.chrome().title.clone()
    }

    pub fn size(&self) -> (u32, u32, SizeHint) {
        self.chrome().size
    }

    pub fn location(&self) -> String {
        self.chrome().location.clone()
    }

    /// 最近一次 `set_html` 载入的文档
    pub fn html(&self) -> Option<String> {
        self.chrome().html.clone()
    }

    fn chrome(&self) -> std::sync::MutexGuard<'_, Chrome> {
        self.shared
            .chrome
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn post(&self, message: UiMessage) {
        if self.shared.tx.send(message).is_err() {
            tracing::trace!(target: "engine", "UI thread gone, message dropped");
        }
    }
}

impl Engine for HeadlessEngine {
    fn init(&self, script: &str) {
        if self.is_ui_thread() {
            register_init_script(script);
        } else {
            self.post(UiMessage::Init(script.to_string()));
        }
    }

    fn eval(&self, script: &str) {
        if self.is_ui_thread() {
            eval_in_page(script, self.shared.debug);
        } else {
            self.post(UiMessage::Eval(script.to_string()));
        }
    }

    fn dispatch(&self, task: Task) {
        self.post(UiMessage::Task(task));
    }

    fn set_message_handler(&self, handler: MessageHandler) {
        *self
            .shared
            .handler
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(handler);
    }

    fn navigate(&self, url: &str) {
        {
            let mut chrome = self.chrome();
            chrome.location = url.to_string();
            chrome.html = None;
        }
        self.post(UiMessage::Load(Page::Url(url.to_string())));
    }

    fn set_html(&self, html: &str) {
        {
            let mut chrome = self.chrome();
            chrome.location = "about:blank".to_string();
            chrome.html = Some(html.to_string());
        }
        self.post(UiMessage::Load(Page::Document));
    }

    fn set_title(&self, title: &str) {
        self.chrome().title = title.to_string();
    }

    fn set_size(&self, width: u32, height: u32, hint: SizeHint) {
        self.chrome().size = (width, height, hint);
    }

    fn window(&self) -> Option<raw_window_handle::RawWindowHandle> {
        None
    }

    fn run(&self) {
        if self.is_ui_thread() {
            tracing::warn!(target: "engine", "run() called on the UI thread; ignoring");
            return;
        }
        // UI 线程退出时发送端被释放
        let _ = self.shared.done.recv();
    }

    fn terminate(&self) {
        self.post(UiMessage::Terminate);
    }
}

// ============================================================================
// UI Thread
// ============================================================================

thread_local! {
    /// 当前页面的脚本上下文
    static PAGE: RefCell<Option<Context>> = const { RefCell::new(None) };
    /// 每次页面加载时按登记顺序执行的脚本
    static INIT_SCRIPTS: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
    /// 运行时正在执行脚本或 Promise 任务
    static RUNNING: Cell<bool> = const { Cell::new(false) };
    /// 脚本执行期间发起的 eval
    static DEFERRED: RefCell<VecDeque<String>> = const { RefCell::new(VecDeque::new()) };
}

/// 运行时占用标记；运行时锁不可重入，嵌套的 eval 必须排到外层之后
struct ScriptScope;

impl ScriptScope {
    fn enter() -> Option<Self> {
        if RUNNING.with(|running| running.replace(true)) {
            None
        } else {
            Some(ScriptScope)
        }
    }
}

impl Drop for ScriptScope {
    fn drop(&mut self) {
        RUNNING.with(|running| running.set(false));
    }
}

fn current_page() -> Option<Context> {
    PAGE.with(|page| page.borrow().clone())
}

fn register_init_script(script: &str) {
    INIT_SCRIPTS.with(|scripts| scripts.borrow_mut().push(script.to_string()));
}

/// 在当前页面中执行脚本（仅限 UI 线程）
fn eval_in_page(script: &str, debug: bool) {
    let Some(scope) = ScriptScope::enter() else {
        DEFERRED.with(|queue| queue.borrow_mut().push_back(script.to_string()));
        return;
    };
    if let Some(context) = current_page() {
        if debug {
            tracing::trace!(target: "engine", script, "eval");
        }
        context.with(|ctx| {
            if let Err(e) = ctx.eval::<(), _>(script) {
                tracing::warn!(target: "engine", error = %describe(&ctx, e), "script evaluation failed");
            }
        });
    }
    drop(scope);
    run_deferred(debug);
}

fn run_deferred(debug: bool) {
    while let Some(script) = DEFERRED.with(|queue| queue.borrow_mut().pop_front()) {
        eval_in_page(&script, debug);
    }
}

/// 只存在于 UI 线程上的脚本运行时
struct ScriptHost {
    runtime: Runtime,
    handler: Arc<RwLock<Option<MessageHandler>>>,
    debug: bool,
}

impl ScriptHost {
    fn new(handler: Arc<RwLock<Option<MessageHandler>>>, debug: bool) -> Result<Self, String> {
        let runtime = Runtime::new().map_err(|e| format!("Failed to create JS runtime: {}", e))?;
        let host = Self {
            runtime,
            handler,
            debug,
        };
        let context = host.new_page("about:blank")?;
        PAGE.with(|page| *page.borrow_mut() = Some(context));
        Ok(host)
    }

    /// 创建装好宿主全局对象的新上下文
    fn new_page(&self, location: &str) -> Result<Context, String> {
        let context = Context::full(&self.runtime)
            .map_err(|e| format!("Failed to create JS context: {}", e))?;
        context
            .with(|ctx| install_globals(&ctx, Arc::clone(&self.handler), location))
            .map_err(|e| format!("Failed to install page globals: {}", e))?;
        Ok(context)
    }

    fn run_loop(&mut self, rx: Receiver<UiMessage>) {
        for message in rx.iter() {
            match message {
                UiMessage::Init(script) => register_init_script(&script),
                UiMessage::Eval(script) => eval_in_page(&script, self.debug),
                UiMessage::Task(task) => {
                    if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
                        tracing::error!(target: "engine", "dispatched task panicked");
                    }
                }
                UiMessage::Load(page) => self.load(page),
                UiMessage::Evaluate { script, reply } => {
                    let result = self.evaluate(&script);
                    let _ = reply.send(result);
                }
                UiMessage::Barrier(ack) => {
                    let _ = ack.send(());
                }
                UiMessage::Terminate => break,
            }
            self.drain_jobs();
        }
        PAGE.with(|page| page.borrow_mut().take());
        INIT_SCRIPTS.with(|scripts| scripts.borrow_mut().clear());
        DEFERRED.with(|queue| queue.borrow_mut().clear());
    }

    fn load(&mut self, page: Page) {
        let location = match &page {
            Page::Url(url) => url.as_str(),
            Page::Document => "about:blank",
        };
        match self.new_page(location) {
            Ok(context) => PAGE.with(|page| *page.borrow_mut() = Some(context)),
            Err(e) => {
                tracing::error!(target: "engine", error = %e, "page load failed");
                return;
            }
        }
        let scripts = INIT_SCRIPTS.with(|scripts| scripts.borrow().clone());
        tracing::debug!(
            target: "engine",
            location,
            init_scripts = scripts.len(),
            "page loaded"
        );
        for script in &scripts {
            eval_in_page(script, self.debug);
        }
    }

    fn evaluate(&self, expression: &str) -> ScriptResult<Option<String>> {
        let source = serde_json::to_string(expression)
            .map_err(|e| ScriptError::Evaluation(e.to_string()))?;
        let wrapped = format!("JSON.stringify((0, eval)({}))", source);
        let context = current_page().ok_or(ScriptError::Terminated)?;
        let scope = ScriptScope::enter().ok_or(ScriptError::WouldBlock)?;
        let result = context.with(|ctx| {
            ctx.eval::<Option<String>, _>(wrapped)
                .map_err(|e| ScriptError::Evaluation(describe(&ctx, e)))
        });
        drop(scope);
        run_deferred(self.debug);
        result
    }

    /// 执行所有排队的 Promise 任务，以及任务中发起的 eval
    fn drain_jobs(&self) {
        loop {
            {
                let Some(_scope) = ScriptScope::enter() else {
                    return;
                };
                loop {
                    match self.runtime.execute_pending_job() {
                        Ok(true) => {}
                        Ok(false) => break,
                        Err(_) => tracing::warn!(target: "engine", "uncaught exception in promise job"),
                    }
                }
            }
            if DEFERRED.with(|queue| queue.borrow().is_empty()) {
                break;
            }
            run_deferred(self.debug);
        }
    }
}

fn install_globals(
    ctx: &Ctx<'_>,
    handler: Arc<RwLock<Option<MessageHandler>>>,
    location: &str,
) -> rquickjs::Result<()> {
    let global = ctx.globals();
    global.set("window", global.clone())?;

    // window.external.invoke(text)
    let external = Object::new(ctx.clone())?;
    external.set(
        "invoke",
        Function::new(ctx.clone(), move |message: String| {
            let current = handler
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            match current {
                Some(handler) => handler(&message),
                None => tracing::debug!(target: "engine", "no message handler, message dropped"),
            }
        })?,
    )?;
    global.set("external", external)?;

    let loc = Object::new(ctx.clone())?;
    loc.set("href", location)?;
    global.set("location", loc)?;

    global.set(
        "__webview_log",
        Function::new(ctx.clone(), |level: String, msg: String| match level.as_str() {
            "error" => tracing::error!(target: "script", "{}", msg),
            "warn" => tracing::warn!(target: "script", "{}", msg),
            "debug" => tracing::debug!(target: "script", "{}", msg),
            _ => tracing::info!(target: "script", "{}", msg),
        })?,
    )?;
    ctx.eval::<(), _>(PRELUDE)
}

/// 把 rquickjs 错误转换成可读信息，异常时取出异常消息
fn describe(ctx: &Ctx<'_>, err: rquickjs::Error) -> String {
    if matches!(err, rquickjs::Error::Exception) {
        let value = ctx.catch();
        if let Some(exception) = value.as_exception() {
            return exception
                .message()
                .unwrap_or_else(|| "uncaught exception".to_string());
        }
        return format!("uncaught exception: {:?}", value);
    }
    err.to_string()
}
