//! 单遍 JSON 字段扫描器
//!
//! 在原始 JSON 文本中定位最外层容器的直接子值（按键名或位置），不构建语法树、
//! 不分配内存。扫描器只做词法和括号深度层面的检查：遇到格式错误的输入时返回
//! `None`，从不报错。
//!
//! 按位置查找时，对象中的键和值都计入下标：第 k 个成员的值下标为 `2k + 1`。

/// 查找目标：键名或从零开始的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector<'k> {
    Key(&'k str),
    Index(usize),
}

impl<'k> From<&'k str> for Selector<'k> {
    fn from(key: &'k str) -> Self {
        Selector::Key(key)
    }
}

impl From<usize> for Selector<'_> {
    fn from(index: usize) -> Self {
        Selector::Index(index)
    }
}

/// 匹配到的值在原文中的字节区间
///
/// 字符串值包含两侧引号。不持有存储，生命周期受原文约束。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueSlice<'a> {
    text: &'a [u8],
    offset: usize,
    len: usize,
}

impl<'a> ValueSlice<'a> {
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.len
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        &self.text[self.range()]
    }

    /// 原文是合法 UTF-8 时返回对应的字符串切片
    pub fn as_str(&self) -> Option<&'a str> {
        std::str::from_utf8(self.as_bytes()).ok()
    }

    /// 值是否为字符串字面量
    pub fn is_string(&self) -> bool {
        self.as_bytes().first() == Some(&b'"')
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitingValue,
    InLiteral,
    InString,
    InEscape,
    InUtf8Continuation { remaining: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    None,
    Start,
    End,
    StartStruct,
    EndStruct,
}

fn is_delimiter(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\n' | b'\r' | b',' | b':')
}

/// 在 `text` 中查找 `selector` 指定的直接子值
///
/// 只有起止都位于深度 1 的值才是候选，嵌套层中的同名键永远不会命中。
/// 时间 O(n)，额外空间 O(1)。
pub fn find<'a, 'k>(text: &'a [u8], selector: impl Into<Selector<'k>>) -> Option<ValueSlice<'a>> {
    let (key, mut index) = match selector.into() {
        Selector::Key(key) => (Some(key.as_bytes()), 1usize),
        Selector::Index(index) => (None, index),
    };

    let mut state = State::AwaitingValue;
    let mut depth: isize = 0;
    let mut key_start: Option<usize> = None;
    let mut value_start: Option<usize> = None;

    let mut i = 0;
    while i < text.len() {
        let c = text[i];
        let mut action = Action::None;
        // 字面量的结束字节需要在 AwaitingValue 状态下重新处理
        let mut consumed = true;

        match state {
            State::AwaitingValue => match c {
                c if is_delimiter(c) => {
                    i += 1;
                    continue;
                }
                b'"' => {
                    action = Action::Start;
                    state = State::InString;
                }
                b'{' | b'[' => action = Action::StartStruct,
                b'}' | b']' => action = Action::EndStruct,
                b't' | b'f' | b'n' | b'-' | b'0'..=b'9' => {
                    action = Action::Start;
                    state = State::InLiteral;
                }
                _ => return None,
            },
            State::InLiteral => {
                if is_delimiter(c) || c == b']' || c == b'}' {
                    action = Action::End;
                    state = State::AwaitingValue;
                    consumed = false;
                } else if !(32..=126).contains(&c) || c == b'"' || c == b'\\' {
                    return None;
                }
            }
            State::InString => match c {
                0..=31 | 127..=191 => return None,
                b'"' => {
                    action = Action::End;
                    state = State::AwaitingValue;
                }
                b'\\' => state = State::InEscape,
                192..=223 => state = State::InUtf8Continuation { remaining: 1 },
                224..=239 => state = State::InUtf8Continuation { remaining: 2 },
                240..=246 => state = State::InUtf8Continuation { remaining: 3 },
                247..=255 => return None,
                _ => {}
            },
            State::InEscape => match c {
                b'"' | b'\\' | b'/' | b'b' | b'f' | b'n' | b'r' | b't' | b'u' => {
                    state = State::InString;
                }
                _ => return None,
            },
            State::InUtf8Continuation { remaining } => {
                if !(128..=191).contains(&c) {
                    return None;
                }
                state = if remaining == 1 {
                    State::InString
                } else {
                    State::InUtf8Continuation {
                        remaining: remaining - 1,
                    }
                };
            }
        }

        // 当前值最后一个字节的下标
        let last = if consumed { i } else { i - 1 };

        if action == Action::EndStruct {
            depth -= 1;
        }

        if depth == 1 {
            match action {
                Action::Start | Action::StartStruct => {
                    if index == 0 {
                        value_start = Some(i);
                    } else if key.is_some() && index == 1 {
                        key_start = Some(i);
                    } else {
                        index -= 1;
                    }
                }
                Action::End | Action::EndStruct => {
                    if let (Some(start), 0) = (value_start, index) {
                        return Some(ValueSlice {
                            text,
                            offset: start,
                            len: last + 1 - start,
                        });
                    }
                    if let (Some(target), Some(start)) = (key, key_start.take()) {
                        index = if text.get(start + 1..last) == Some(target) {
                            0
                        } else {
                            2
                        };
                    }
                }
                Action::None => {}
            }
        }

        if action == Action::StartStruct {
            depth += 1;
        }

        if consumed {
            i += 1;
        }
    }

    None
}

/// [`find`] 的字符串版本
pub fn find_str<'a, 'k>(text: &'a str, selector: impl Into<Selector<'k>>) -> Option<ValueSlice<'a>> {
    find(text.as_bytes(), selector)
}
