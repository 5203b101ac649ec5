use webview_bridge::config::WebviewConfig;
use webview_bridge::core::init_logging;
use webview_bridge::webview::Webview;

const DEMO: &str = r#"
add(2, 3)
  .then(function (sum) { console.log('2 + 3 =', sum); })
  .catch(function (err) { console.error('add failed:', err); })
  .then(function () { return quit(); });
"#;

fn main() {
    let mut config = WebviewConfig::load_or_default();
    config.apply_env_overrides();
    init_logging(&config.logging);

    let webview = match Webview::headless(&config) {
        Ok(webview) => webview,
        Err(e) => {
            eprintln!("Webview failed to start: {}", e);
            std::process::exit(1);
        }
    };

    webview.bind_sync("add", |params| {
        match serde_json::from_str::<Vec<f64>>(params) {
            Ok(args) => args.iter().sum::<f64>().to_string(),
            Err(e) => {
                tracing::warn!(target: "rpc", error = %e, "add: bad arguments");
                "null".to_string()
            }
        }
    });

    let host = webview.clone();
    webview.bind(
        "quit",
        move |call| {
            tracing::info!(target: "rpc", "quit requested by page");
            call.succeed("null");
            host.terminate();
        },
        None,
    );

    webview.eval(DEMO);
    webview.run();
}
