//! 零拷贝 JSON 工具
//!
//! - [`scanner`]: 定位最外层容器的直接子值
//! - [`codec`]: 字符串字面量编解码
//! - [`field`]: 组合扫描与解码的字段提取

pub mod codec;
pub mod scanner;

pub use codec::{escape, unescape};
pub use scanner::{find, find_str, Selector, ValueSlice};

use std::borrow::Cow;

use crate::core::error::{JsonError, JsonResult};

/// 提取一个直接子字段
///
/// - `Ok(None)`: 没有匹配
/// - `Ok(Some(_))`: 字符串值返回解码后的内容，其他值返回原文
/// - `Err(_)`: 找到了字符串值但解码失败
///
/// "不存在"和"值为空串"在这里是可区分的。
pub fn field<'a, 'k>(
    text: &'a str,
    selector: impl Into<Selector<'k>>,
) -> JsonResult<Option<Cow<'a, str>>> {
    let Some(value) = find_str(text, selector) else {
        return Ok(None);
    };
    if value.is_string() {
        return unescape(value.as_bytes()).map(Some);
    }
    // 非字符串值由 ASCII 字节或完整的括号结构组成，切片边界一定是字符边界
    value
        .as_str()
        .map(|raw| Some(Cow::Borrowed(raw)))
        .ok_or(JsonError::InvalidUtf8)
}
