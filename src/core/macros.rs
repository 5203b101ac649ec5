//! 核心宏定义

/// 为配置结构体实现 Default trait 的宏
///
/// 使用示例:
/// ```rust
/// use webview_bridge::impl_default;
///
/// struct Margins {
///     top: u32,
///     label: String,
/// }
///
/// impl_default!(Margins {
///     top: 8,
///     label: String::from("body"),
/// });
///
/// assert_eq!(Margins::default().top, 8);
/// ```
#[macro_export]
macro_rules! impl_default {
    ($struct_name:ident {
        $($field:ident: $value:expr),* $(,)?
    }) => {
        impl Default for $struct_name {
            fn default() -> Self {
                Self {
                    $($field: $value),*
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    struct Window {
        width: u32,
        title: String,
    }

    impl_default!(Window {
        width: 480,
        title: "webview".to_string(),
    });

    #[test]
    fn test_impl_default() {
        let w = Window::default();
        assert_eq!(w.width, 480);
        assert_eq!(w.title, "webview");
    }
}
