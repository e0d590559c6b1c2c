use crate::descriptor::HandlerDescriptor;
use crate::error::BusResult;
use bon::Builder;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 分发器配置
///
/// 可由 JSON 反序列化，描述符使用文本形式 `Handler@method`：
/// ```rust
/// use command_bus::config::DispatcherConfig;
///
/// let config = DispatcherConfig::from_json_str(r#"{
///     "mappings": { "app::commands::CreateUser": "app::handlers::UserHandler@register" },
///     "simple_mapping": { "command_prefix": "app::commands", "handler_prefix": "app::handlers" },
///     "cache_mapper_results": true
/// }"#).unwrap();
///
/// assert_eq!(config.mappings["app::commands::CreateUser"].method(), "register");
/// ```
#[derive(Builder, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// 命令名 -> 处理器描述
    #[builder(default)]
    pub mappings: BTreeMap<String, HandlerDescriptor>,
    /// 约定式映射函数的前缀配置
    pub simple_mapping: Option<SimpleMapping>,
    /// 是否按命令名缓存映射函数的结果
    #[builder(default)]
    pub cache_mapper_results: bool,
}

impl DispatcherConfig {
    pub fn from_json_str(s: &str) -> BusResult<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

/// 约定式映射的前缀
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimpleMapping {
    pub command_prefix: String,
    pub handler_prefix: String,
}

impl SimpleMapping {
    pub fn new(command_prefix: impl Into<String>, handler_prefix: impl Into<String>) -> Self {
        Self {
            command_prefix: command_prefix.into(),
            handler_prefix: handler_prefix.into(),
        }
    }
}
