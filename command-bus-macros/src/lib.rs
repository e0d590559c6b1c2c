use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod attrs;
mod command;
mod marshal;

/// 命令派生宏
/// 为目标类型实现 `::command_bus::command::Command`。
/// 支持参数（均写在 `#[command(...)]` 中）：
/// - `name = "..."`：命令名，默认 `模块路径::类型名`
/// - `should_queue`：标记为应当入队
/// - `queue = "..."`、`delay = <秒>`、`connection = "..."`：入队提示
/// - `self_handling`：命令自身实现了 `SelfHandling`
/// - `custom_queue`：命令自身实现了 `CustomQueueing`
#[proc_macro_derive(Command, attributes(command))]
pub fn derive_command(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    command::expand(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// 编组派生宏
/// 为具名字段结构体实现 `::command_bus::marshal::Marshal`，字段需可反序列化。
/// 字段参数：
/// - `#[marshal(rename = "key")]`：取值键名，默认字段名
/// - `#[marshal(default)]`：缺省时取 `Default::default()`（字段类型需可序列化）
/// - `#[marshal(default = expr)]`：缺省时取给定表达式
#[proc_macro_derive(Marshal, attributes(marshal))]
pub fn derive_marshal(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    marshal::expand(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
