//! 安全的日志记录工具
//!
//! 提供敏感信息脱敏功能，确保日志和配置输出中不会泄露 access token。

use std::fmt;

use crate::config::Config;

/// 脱敏后的 secret 表示
///
/// 只显示前 4 个字符，其余替换为 `***`
#[derive(Clone, Debug)]
pub struct SensitiveValue<'a> {
    inner: &'a str,
}

impl<'a> SensitiveValue<'a> {
    /// # 示例
    /// ```
    /// use ingest_gateway::logging::SensitiveValue;
    ///
    /// let sanitized = SensitiveValue::new("0123456789abcdef");
    /// assert_eq!(format!("{}", sanitized), "0123***");
    /// ```
    pub fn new(value: &'a str) -> Self {
        Self { inner: value }
    }
}

impl<'a> fmt::Display for SensitiveValue<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const VISIBLE: usize = 4;
        // 太短的值全部脱敏
        if self.inner.len() <= VISIBLE * 2 || !self.inner.is_char_boundary(VISIBLE) {
            write!(f, "***")
        } else {
            write!(f, "{}***", &self.inner[..VISIBLE])
        }
    }
}

/// 返回一份 secret 已脱敏的配置副本，用于展示
pub fn sanitize_config(cfg: &Config) -> Config {
    let mut sanitized = cfg.clone();
    sanitized.backends.client_secret = SensitiveValue::new(&cfg.backends.client_secret).to_string();
    sanitized
}
