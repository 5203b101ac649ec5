//! JSON 字符串字面量编解码
//!
//! 解码只支持 `\b \f \n \r \t \\ \/ \"`，`\u` 转义会让整个解码失败。
//! 编码刻意保持最小：只在两侧加引号，不转义任何内容。

use std::borrow::Cow;

use crate::core::error::{JsonError, JsonResult};

/// 解码带引号的 JSON 字符串字面量
///
/// 没有转义时直接借用输入，不分配内存。
pub fn unescape(literal: &[u8]) -> JsonResult<Cow<'_, str>> {
    if literal.len() < 2 || literal[0] != b'"' || literal[literal.len() - 1] != b'"' {
        return Err(JsonError::Unquoted);
    }
    let body = &literal[1..literal.len() - 1];

    if !body.contains(&b'\\') {
        return std::str::from_utf8(body)
            .map(Cow::Borrowed)
            .map_err(|_| JsonError::InvalidUtf8);
    }

    let mut out = Vec::with_capacity(body.len());
    let mut bytes = body.iter().enumerate();
    while let Some((_, &c)) = bytes.next() {
        if c != b'\\' {
            out.push(c);
            continue;
        }
        let (offset, &escape) = bytes.next().ok_or(JsonError::DanglingEscape)?;
        out.push(match escape {
            b'b' => 0x08,
            b'f' => 0x0c,
            b'n' => b'\n',
            b'r' => b'\r',
            b't' => b'\t',
            b'\\' => b'\\',
            b'/' => b'/',
            b'"' => b'"',
            other => {
                return Err(JsonError::UnsupportedEscape {
                    escape: char::from(other),
                    // 相对整个字面量（含开头引号）的偏移
                    offset: offset + 1,
                })
            }
        });
    }

    String::from_utf8(out)
        .map(Cow::Owned)
        .map_err(|_| JsonError::InvalidUtf8)
}

/// 把 `text` 包成 JSON 字符串字面量
///
/// 不转义引号、反斜杠或控制字符；调用方只能传入不需要转义的内容。
/// 需要安全嵌入任意文本时使用 `serde_json::to_string`。
pub fn escape(text: &str) -> String {
    format!("\"{}\"", text)
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn piece() -> impl Strategy<Value = (String, String)> {
        prop_oneof![
            "[a-zA-Z0-9 ]{1,6}".prop_map(|s| (s.clone(), s)),
            Just(("\\b".to_string(), "\u{8}".to_string())),
            Just(("\\f".to_string(), "\u{c}".to_string())),
            Just(("\\n".to_string(), "\n".to_string())),
            Just(("\\r".to_string(), "\r".to_string())),
            Just(("\\t".to_string(), "\t".to_string())),
            Just(("\\\\".to_string(), "\\".to_string())),
            Just(("\\/".to_string(), "/".to_string())),
            Just(("\\\"".to_string(), "\"".to_string())),
        ]
    }

    proptest! {
        #[test]
        fn supported_escapes_round_trip(pieces in prop::collection::vec(piece(), 0..16)) {
            let encoded: String = pieces.iter().map(|(e, _)| e.as_str()).collect();
            let expected: String = pieces.iter().map(|(_, d)| d.as_str()).collect();
            let literal = format!("\"{}\"", encoded);
            prop_assert_eq!(unescape(literal.as_bytes()).unwrap(), expected);
        }

        #[test]
        fn unicode_escape_always_fails(prefix in "[a-z]{0,6}", hex in "[0-9a-f]{4}") {
            let literal = format!("\"{}\\u{}\"", prefix, hex);
            let is_unsupported = matches!(
                unescape(literal.as_bytes()),
                Err(JsonError::UnsupportedEscape { escape: 'u', .. })
            );
            prop_assert!(is_unsupported);
        }
    }
}
