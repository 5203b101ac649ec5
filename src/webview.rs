//! 宿主门面：引擎 + RPC 桥 + 窗口/内容控制

use std::sync::Arc;

use crate::config::WebviewConfig;
use crate::core::error::WebviewResult;
use crate::platform::{Engine, HeadlessEngine, SizeHint};
use crate::rpc::{BindingContext, Bridge, Invocation, Status};

/// 一个页面表面及其 RPC 桥
///
/// 句柄可以克隆，克隆体共享同一引擎和绑定表。
pub struct Webview<E: Engine + 'static> {
    engine: Arc<E>,
    bridge: Bridge,
    debug: bool,
}

impl<E: Engine + 'static> Clone for Webview<E> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            bridge: self.bridge.clone(),
            debug: self.debug,
        }
    }
}

impl Webview<HeadlessEngine> {
    /// 按配置创建无窗口宿主
    pub fn headless(config: &WebviewConfig) -> WebviewResult<Self> {
        config.validate()?;
        let webview = Self::new(HeadlessEngine::spawn(config.debug)?, config.debug);
        webview.apply(config);
        Ok(webview)
    }
}

impl<E: Engine + 'static> Webview<E> {
    pub fn new(engine: E, debug: bool) -> Self {
        let engine = Arc::new(engine);
        let bridge = Bridge::new(Arc::clone(&engine) as Arc<dyn Engine>);
        Self {
            engine,
            bridge,
            debug,
        }
    }

    /// 应用配置中的窗口外观和初始内容
    pub fn apply(&self, config: &WebviewConfig) {
        let window = &config.window;
        self.set_title(&window.title);
        self.set_size(window.width, window.height, window.size_hint);
        if let Some(html) = &config.content.html {
            self.set_html(html);
        } else if let Some(url) = &config.content.url {
            self.navigate(url);
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// 加载 `url`，空串加载 `about:blank`
    pub fn navigate(&self, url: &str) {
        let url = if url.is_empty() { "about:blank" } else { url };
        tracing::debug!(target: "engine", url, "navigate");
        self.engine.navigate(url);
    }

    pub fn set_html(&self, html: &str) {
        self.engine.set_html(html);
    }

    pub fn set_title(&self, title: &str) {
        self.engine.set_title(title);
    }

    pub fn set_size(&self, width: u32, height: u32, hint: SizeHint) {
        self.engine.set_size(width, height, hint);
    }

    pub fn init(&self, script: &str) {
        self.engine.init(script);
    }

    pub fn eval(&self, script: &str) {
        self.engine.eval(script);
    }

    /// 在 UI 线程上运行 `f`
    pub fn dispatch<F>(&self, f: F)
    where
        F: FnOnce(&Webview<E>) + Send + 'static,
    {
        let webview = self.clone();
        self.engine.dispatch(Box::new(move || f(&webview)));
    }

    pub fn bind_sync<F>(&self, name: &str, f: F) -> bool
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.bridge.bind_sync(name, f)
    }

    pub fn bind<F>(&self, name: &str, f: F, context: BindingContext) -> bool
    where
        F: Fn(Invocation) + Send + Sync + 'static,
    {
        self.bridge.bind(name, f, context)
    }

    pub fn unbind(&self, name: &str) -> bool {
        self.bridge.unbind(name)
    }

    pub fn resolve(&self, seq: &str, status: Status, result: &str) {
        self.bridge.resolve(seq, status, result);
    }

    pub fn window(&self) -> Option<raw_window_handle::RawWindowHandle> {
        self.engine.window()
    }

    /// 阻塞直到 [`Webview::terminate`]
    pub fn run(&self) {
        tracing::info!(target: "engine", "entering event loop");
        self.engine.run();
        tracing::info!(target: "engine", "event loop finished");
    }

    pub fn terminate(&self) {
        self.engine.terminate();
    }
}
