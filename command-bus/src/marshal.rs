//! 命令编组（Marshal）
//!
//! 从稀疏的具名取值源构造命令：按声明顺序逐个解析构造参数，
//! 依次尝试 覆盖值（extras）→ 取值源（source）→ 参数默认值，均不满足则失败。
//!
//! 两个查找的“存在”语义不同：
//! - extras：键存在即采用，包括 `null`；
//! - source：键存在且值非 `null` 才采用（`false`、`""` 均视为存在）。
//!
use crate::command::Command;
use crate::error::{BusError, BusResult};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::vec;
use tracing::{trace, warn};

/// 具名取值源：稀疏、可判断键是否存在的查找
pub trait ValueSource {
    fn value(&self, name: &str) -> Option<&Value>;
}

impl ValueSource for Map<String, Value> {
    fn value(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }
}

impl ValueSource for Value {
    fn value(&self, name: &str) -> Option<&Value> {
        self.as_object().and_then(|m| m.get(name))
    }
}

impl<S: std::hash::BuildHasher> ValueSource for HashMap<String, Value, S> {
    fn value(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }
}

impl ValueSource for BTreeMap<String, Value> {
    fn value(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }
}

impl<T: ValueSource + ?Sized> ValueSource for &T {
    fn value(&self, name: &str) -> Option<&Value> {
        (**self).value(name)
    }
}

/// 空取值源
#[derive(Debug, Clone, Copy, Default)]
pub struct Empty;

impl ValueSource for Empty {
    fn value(&self, _name: &str) -> Option<&Value> {
        None
    }
}

/// 构造参数描述：名称 + 可选默认值
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    name: &'static str,
    // Err 保存默认值序列化失败的原因，解析到默认值时才报告
    default: Option<Result<Value, String>>,
}

impl Parameter {
    /// 必填参数
    pub fn required(name: &'static str) -> Self {
        Self {
            name,
            default: None,
        }
    }

    /// 带默认值的参数
    ///
    /// 默认值无法序列化时记录警告；仅当解析确实落到默认值时返回 `InvalidParameter`。
    pub fn optional(name: &'static str, default: impl Serialize) -> Self {
        let default = serde_json::to_value(default).map_err(|e| {
            warn!(
                target: crate::DISPATCH_TARGET,
                parameter = name,
                error = %e,
                "default value could not be serialized"
            );
            e.to_string()
        });
        Self {
            name,
            default: Some(default),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref().and_then(|d| d.as_ref().ok())
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

/// 参数取值来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueOrigin {
    Extras,
    Source,
    Default,
}

impl ValueOrigin {
    fn as_str(self) -> &'static str {
        match self {
            Self::Extras => "extras",
            Self::Source => "source",
            Self::Default => "default",
        }
    }
}

/// 可编组的命令
///
/// 通常由 `#[derive(Marshal)]` 生成；也可手写。
pub trait Marshal: Command + Sized {
    /// 按声明顺序列出构造参数
    fn parameters() -> Vec<Parameter>;

    /// 以解析后的参数按位置构造命令
    fn from_arguments(args: Arguments) -> BusResult<Self>;
}

/// 已解析的位置参数
#[derive(Debug)]
pub struct Arguments {
    command: &'static str,
    position: usize,
    values: vec::IntoIter<(&'static str, Value)>,
}

impl Arguments {
    pub fn new(command: &'static str, values: Vec<(&'static str, Value)>) -> Self {
        Self {
            command,
            position: 0,
            values: values.into_iter(),
        }
    }

    pub fn command(&self) -> &'static str {
        self.command
    }

    pub fn remaining(&self) -> usize {
        self.values.len()
    }

    /// 取下一个位置参数并反序列化为 `T`
    pub fn take<T: DeserializeOwned>(&mut self) -> BusResult<T> {
        let Some((name, value)) = self.values.next() else {
            return Err(BusError::ParameterResolution {
                command: self.command,
                parameter: format!("#{}", self.position),
            });
        };
        self.position += 1;

        serde_json::from_value(value).map_err(|e| BusError::InvalidParameter {
            command: self.command,
            parameter: name.to_owned(),
            reason: e.to_string(),
        })
    }
}

/// 从取值源与覆盖值编组命令
pub fn marshal<C, S, E>(source: &S, extras: &E) -> BusResult<C>
where
    C: Marshal,
    S: ValueSource + ?Sized,
    E: ValueSource + ?Sized,
{
    let parameters = C::parameters();
    let mut values = Vec::with_capacity(parameters.len());

    for parameter in parameters {
        let (value, origin) = resolve_parameter(C::NAME, &parameter, source, extras)?;
        trace!(
            target: crate::DISPATCH_TARGET,
            command = C::NAME,
            parameter = parameter.name(),
            origin = origin.as_str(),
            "marshalled parameter"
        );
        values.push((parameter.name(), value));
    }

    C::from_arguments(Arguments::new(C::NAME, values))
}

/// 从覆盖值编组命令（取值源为空）
pub fn marshal_from_array<C, E>(values: &E) -> BusResult<C>
where
    C: Marshal,
    E: ValueSource + ?Sized,
{
    marshal::<C, _, _>(&Empty, values)
}

fn resolve_parameter<S, E>(
    command: &'static str,
    parameter: &Parameter,
    source: &S,
    extras: &E,
) -> BusResult<(Value, ValueOrigin)>
where
    S: ValueSource + ?Sized,
    E: ValueSource + ?Sized,
{
    if let Some(v) = extras.value(parameter.name()) {
        return Ok((v.clone(), ValueOrigin::Extras));
    }

    if let Some(v) = source.value(parameter.name()).filter(|v| !v.is_null()) {
        return Ok((v.clone(), ValueOrigin::Source));
    }

    match &parameter.default {
        Some(Ok(v)) => Ok((v.clone(), ValueOrigin::Default)),
        Some(Err(reason)) => Err(BusError::InvalidParameter {
            command,
            parameter: parameter.name().to_owned(),
            reason: format!("default value could not be serialized: {reason}"),
        }),
        None => Err(BusError::ParameterResolution {
            command,
            parameter: parameter.name().to_owned(),
        }),
    }
}
