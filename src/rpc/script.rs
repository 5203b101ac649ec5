//! 注入脚本侧的代码片段
//!
//! 脚本侧状态保存在 `window._rpc` 中：`nextSeq` 是从 1 开始递增的序号，
//! `pending` 以序号为键保存尚未结算的 Promise。宿主字符串一律以 JSON 字符串
//! 字面量嵌入。

use super::bridge::Status;

fn js_string(s: &str) -> String {
    serde_json::Value::from(s).to_string()
}

/// 把 `window[name]` 定义为返回 Promise 的函数
pub fn bind_stub(name: &str) -> String {
    format!(
        r#"(function () {{
  var name = {name};
  var RPC = window._rpc = (window._rpc || {{}});
  if (!RPC.pending) RPC.pending = {{}};
  if (typeof RPC.nextSeq !== 'number') RPC.nextSeq = 1;
  window[name] = function () {{
    var seq = RPC.nextSeq++;
    var promise = new Promise(function (resolve, reject) {{
      RPC.pending[seq] = {{ resolve: resolve, reject: reject }};
    }});
    window.external.invoke(JSON.stringify({{
      id: seq,
      method: name,
      params: Array.prototype.slice.call(arguments)
    }}));
    return promise;
  }};
}})();"#,
        name = js_string(name)
    )
}

/// 删除 `window[name]`
pub fn unbind(name: &str) -> String {
    format!("delete window[{}];", js_string(name))
}

/// 结算序号为 `seq` 的调用；序号未知时什么也不做
///
/// `result` 必须是 JSON 文本，原样嵌入；为空时以 `undefined` 结算。
pub fn settle(seq: &str, status: Status, result: &str) -> String {
    let settle = match status {
        Status::Success => "resolve",
        Status::Failure => "reject",
    };
    format!(
        r#"(function () {{
  var rpc = window._rpc, seq = {seq};
  if (!rpc || !rpc.pending || !Object.prototype.hasOwnProperty.call(rpc.pending, seq)) return;
  var call = rpc.pending[seq];
  delete rpc.pending[seq];
  call.{settle}({result});
}})();"#,
        seq = js_string(seq),
        settle = settle,
        result = result
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_embedded_as_string_literals() {
        let stub = bind_stub("it's \"quoted\"");
        assert!(stub.contains(r#"var name = "it's \"quoted\"";"#));
        assert_eq!(unbind("add"), r#"delete window["add"];"#);
    }

    #[test]
    fn test_settle_selects_resolve_or_reject() {
        let ok = settle("1", Status::Success, "5");
        assert!(ok.contains(r#"seq = "1""#));
        assert!(ok.contains("call.resolve(5);"));

        let err = settle("2", Status::Failure, r#""boom""#);
        assert!(err.contains(r#"call.reject("boom");"#));
    }

    fn run(setup: &str, snippets: &[String], query: &str) -> String {
        let runtime = rquickjs::Runtime::new().unwrap();
        let context = rquickjs::Context::full(&runtime).unwrap();
        context.with(|ctx| {
            ctx.eval::<(), _>("var window = globalThis; window.external = { invoke: function () {} };")
                .unwrap();
            ctx.eval::<(), _>(setup).unwrap();
            for snippet in snippets {
                ctx.eval::<(), _>(snippet.as_str()).unwrap();
            }
            ctx.eval::<String, _>(query).unwrap()
        })
    }

    #[test]
    fn test_settle_tolerates_foreign_rpc_object() {
        let state = run(
            "window._rpc = { owner: 'page' };",
            &[settle("1", Status::Success, "5")],
            "JSON.stringify(window._rpc)",
        );
        assert_eq!(state, r#"{"owner":"page"}"#);
    }

    #[test]
    fn test_stub_completes_partial_rpc_object() {
        let state = run(
            "window._rpc = { owner: 'page' };",
            &[bind_stub("add"), "add(1); add(2);".to_string()],
            "JSON.stringify([window._rpc.owner, window._rpc.nextSeq, Object.keys(window._rpc.pending)])",
        );
        assert_eq!(state, r#"["page",3,["1","2"]]"#);
    }

    #[test]
    fn test_settle_only_once() {
        let state = run(
            "window.log = [];",
            &[
                bind_stub("add"),
                "add().then(function (v) { log.push(v); });".to_string(),
                settle("1", Status::Success, "5"),
                settle("1", Status::Failure, "6"),
                settle("999", Status::Success, "0"),
            ],
            "JSON.stringify(Object.keys(window._rpc.pending))",
        );
        assert_eq!(state, "[]");
    }
}
