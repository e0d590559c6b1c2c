use crate::{
    container::Container,
    error::BusResult,
    queue::{Job, Queue, Receipt},
    reply::Reply,
};
use async_trait::async_trait;
use bon::Builder;
use std::any::Any;
use std::time::Duration;

/// 应用层命令（Command）
///
/// 表达“意图”的写操作请求，由处理器（或命令自身）执行，或投递到队列延后执行。
/// - 命令构造后即不可变，分发器只会把它交给唯一的消费者（处理器或队列）；
/// - 可选能力均以带默认实现的方法表达，默认值即“不具备该能力”。
///
/// 关联常量：
/// - `NAME`：命令的稳定名称，用于映射表查找、日志与路由。避免依赖 `type_name::<T>()`。
pub trait Command: Send + Sync + 'static {
    /// 命令的稳定名称（建议常量字符串，不随重构变化）
    const NAME: &'static str;

    /// “应当入队”标记
    fn should_queue(&self) -> bool {
        false
    }

    /// 入队提示：队列名、延迟、连接
    fn queue_hints(&self) -> QueueHints {
        QueueHints::default()
    }

    /// 自处理能力：返回 `Some(self)` 表示命令即处理器
    fn as_self_handling(&self) -> Option<&dyn SelfHandling> {
        None
    }

    /// 自定义入队能力：完全接管入队方式
    fn as_custom_queueing(&self) -> Option<&dyn CustomQueueing> {
        None
    }
}

/// 自处理命令
///
/// 处理所需的依赖通过容器注入（见 [`Container::get`]）。
#[async_trait]
pub trait SelfHandling: Send + Sync {
    async fn handle(&self, container: &dyn Container) -> BusResult<Reply>;
}

/// 自定义入队
///
/// `job` 持有命令本身，实现方决定调用队列的哪个投递方法。
#[async_trait]
pub trait CustomQueueing: Send + Sync {
    async fn queue(&self, queue: &dyn Queue, job: Job) -> BusResult<Receipt>;
}

/// 命令的类型擦除视图（对象安全）
///
/// 供映射函数（mapper）与管道（pipe）在不知道具体类型时读取命令信息。
pub trait AnyCommand: Any + Send + Sync {
    fn command_name(&self) -> &'static str;

    fn is_self_handling(&self) -> bool;

    /// 自处理能力（与 [`Command::as_self_handling`] 一致）
    fn self_handling(&self) -> Option<&dyn SelfHandling>;

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync>;
}

impl<C: Command> AnyCommand for C {
    fn command_name(&self) -> &'static str {
        C::NAME
    }

    fn is_self_handling(&self) -> bool {
        self.as_self_handling().is_some()
    }

    fn self_handling(&self) -> Option<&dyn SelfHandling> {
        self.as_self_handling()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync> {
        self
    }
}

/// 入队提示
///
/// 均为可选项，缺省不是错误。
#[derive(Builder, Default, Debug, Clone, PartialEq, Eq)]
pub struct QueueHints {
    /// 目标队列名
    #[builder(into)]
    queue: Option<String>,
    /// 延迟执行时长
    delay: Option<Duration>,
    /// 队列连接标识（传给队列解析器）
    #[builder(into)]
    connection: Option<String>,
}

impl QueueHints {
    pub fn queue(&self) -> Option<&str> {
        self.queue.as_deref()
    }

    pub fn delay(&self) -> Option<Duration> {
        self.delay
    }

    pub fn connection(&self) -> Option<&str> {
        self.connection.as_deref()
    }
}
