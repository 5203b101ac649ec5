//! 库版本信息

use std::fmt;

/// MAJOR.MINOR.PATCH 版本号
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// 完整的 SemVer 2.0.0 版本信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    pub version: Version,
    /// 预发布标签，带 "-" 前缀；没有时为空串
    pub pre_release: &'static str,
    /// 构建元数据，带 "+" 前缀；没有时为空串
    pub build_metadata: &'static str,
}

impl VersionInfo {
    /// MAJOR.MINOR.PATCH 形式的版本号
    pub fn version_number(&self) -> String {
        self.version.to_string()
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.version, self.pre_release, self.build_metadata)
    }
}

/// 返回本库的版本信息
pub fn version() -> VersionInfo {
    let pre = env!("CARGO_PKG_VERSION_PRE");
    VersionInfo {
        version: Version {
            major: parse_component(env!("CARGO_PKG_VERSION_MAJOR")),
            minor: parse_component(env!("CARGO_PKG_VERSION_MINOR")),
            patch: parse_component(env!("CARGO_PKG_VERSION_PATCH")),
        },
        pre_release: if pre.is_empty() { "" } else { concat!("-", env!("CARGO_PKG_VERSION_PRE")) },
        build_metadata: "",
    }
}

fn parse_component(s: &str) -> u32 {
    s.parse().unwrap_or(0)
}
