use crate::{
    command::Command,
    error::BusResult,
    reply::{Dispatched, Reply},
};
use async_trait::async_trait;

/// 命令总线（Command Bus）
///
/// - `dispatch`：按路由规则入队或同步执行；
/// - `dispatch_now`：始终同步执行，忽略入队标记；
/// - 该 trait 带有泛型方法，通常以具体实现类型注入使用。
#[async_trait]
pub trait CommandBus: Send + Sync {
    /// 分发命令
    async fn dispatch<C: Command>(&self, cmd: C) -> BusResult<Dispatched>;

    /// 同步执行命令
    async fn dispatch_now<C: Command>(&self, cmd: C) -> BusResult<Reply>;
}
