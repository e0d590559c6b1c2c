//! 处理器描述（HandlerDescriptor）
//!
//! 由“处理器类型标识 + 方法名”组成的结构化二元组。
//! 文本形式为 `Handler@method`，省略 `@method` 时方法名取默认的 `handle`。
//!
use crate::command::AnyCommand;
use crate::error::BusError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 默认处理方法名
pub const DEFAULT_METHOD: &str = "handle";

const METHOD_DELIMITER: char = '@';
const PATH_SEPARATOR: &str = "::";
const HANDLER_SUFFIX: &str = "Handler";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HandlerDescriptor {
    handler: String,
    method: String,
}

impl HandlerDescriptor {
    pub fn new(handler: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            handler: handler.into(),
            method: method.into(),
        }
    }

    /// 使用默认方法名 `handle`
    pub fn handle(handler: impl Into<String>) -> Self {
        Self::new(handler, DEFAULT_METHOD)
    }

    pub fn handler(&self) -> &str {
        &self.handler
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn into_parts(self) -> (String, String) {
        (self.handler, self.method)
    }

    /// 约定式映射：
    /// - 从命令名中去掉 `command_prefix` 前缀，并修剪两端的 `::`；
    /// - 追加 `Handler` 后缀，若 `handler_prefix` 非空则以 `handler_prefix::` 开头；
    /// - 方法名为 `handle`。
    ///
    /// 例如 `app::commands::CreateUser` + (`app::commands`, `app::handlers`)
    /// 得到 `app::handlers::CreateUserHandler@handle`。
    pub fn simple_mapping(
        command: &dyn AnyCommand,
        command_prefix: &str,
        handler_prefix: &str,
    ) -> Self {
        let name = command.command_name();
        let relative = name.strip_prefix(command_prefix).unwrap_or(name);
        let relative = trim_separators(relative);
        let prefix = trim_separators(handler_prefix);

        let handler = if prefix.is_empty() {
            format!("{relative}{HANDLER_SUFFIX}")
        } else {
            format!("{prefix}{PATH_SEPARATOR}{relative}{HANDLER_SUFFIX}")
        };

        Self::handle(handler)
    }
}

fn trim_separators(s: &str) -> &str {
    let mut s = s;
    while let Some(rest) = s.strip_prefix(PATH_SEPARATOR) {
        s = rest;
    }
    while let Some(rest) = s.strip_suffix(PATH_SEPARATOR) {
        s = rest;
    }
    s
}

impl FromStr for HandlerDescriptor {
    type Err = BusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (handler, method) = match s.split_once(METHOD_DELIMITER) {
            Some((handler, method)) => (handler.trim(), method.trim()),
            None => (s.trim(), DEFAULT_METHOD),
        };

        if handler.is_empty() {
            return Err(BusError::InvalidDescriptor(format!(
                "missing handler type in '{s}'"
            )));
        }
        if method.is_empty() || method.contains(METHOD_DELIMITER) {
            return Err(BusError::InvalidDescriptor(format!(
                "invalid method name in '{s}'"
            )));
        }

        Ok(Self::new(handler, method))
    }
}

impl TryFrom<String> for HandlerDescriptor {
    type Error = BusError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl TryFrom<&str> for HandlerDescriptor {
    type Error = BusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HandlerDescriptor> for String {
    fn from(value: HandlerDescriptor) -> Self {
        value.to_string()
    }
}

impl fmt::Display for HandlerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.handler, METHOD_DELIMITER, self.method)
    }
}
