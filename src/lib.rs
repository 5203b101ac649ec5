//! # Webview Bridge
//!
//! Host ↔ script RPC bridge for embedded webview surfaces.
//!
//! ## Features
//!
//! - **Zero-copy JSON scanning**: locate a direct child of the outermost container without building a tree
//! - **String codec**: decode and encode JSON string literals
//! - **Bindings**: expose host callbacks to page scripts as promise-returning functions
//! - **Headless engine**: QuickJS-backed [`platform::Engine`] with a dedicated UI thread
//!
//! ## Message flow
//!
//! Page scripts call a bound function, which posts
//! `{"id":<seq>,"method":<name>,"params":[...]}` through `window.external.invoke`.
//! The [`rpc::Bridge`] routes it to the host callback and settles the script-side
//! promise with [`rpc::Bridge::resolve`].
//!
//! ### Example
//!
//! ```no_run
//! use webview_bridge::config::WebviewConfig;
//! use webview_bridge::webview::Webview;
//!
//! let webview = Webview::headless(&WebviewConfig::default()).unwrap();
//! webview.bind_sync("add", |params| {
//!     let args: Vec<i64> = serde_json::from_str(params).unwrap_or_default();
//!     args.iter().sum::<i64>().to_string()
//! });
//! webview.eval("add(2, 3).then(function (n) { console.log(n); });");
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Errors, version info and logging setup
//! - [`config`]: Configuration loading
//! - [`json`]: Scanner and string codec
//! - [`platform`]: Engine capability interface and the headless engine
//! - [`rpc`]: Binding table and bridge
//! - [`webview`]: Host facade

/// Errors, version info and logging setup
pub mod core;
/// Configuration system
pub mod config;
/// Zero-copy JSON field extraction
pub mod json;
/// Platform abstraction layer
pub mod platform;
/// Host ↔ script RPC
pub mod rpc;
/// Host facade
pub mod webview;

pub use crate::core::error::{WebviewError, WebviewResult};
pub use crate::platform::{Engine, HeadlessEngine, SizeHint};
pub use crate::rpc::{Bridge, Invocation, Status};
pub use crate::webview::Webview;
